//! The client facade: defaults, interceptor registries and verb helpers.
//!
//! # Design
//! `Client` is a cheap handle; clones share the same defaults, registries and
//! adapter. `Client::create` builds a sibling that shares nothing mutable
//! with its parent. `request` is the single entry point; `get`, `post`, `put`,
//! `delete`, `head` and `patch` merge the verb and URL over the supplied
//! config and forward to it.

use std::fmt;
use std::sync::Arc;

use futures::future::{self, FutureExt};
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use crate::adapter::{default_adapter, Adapter};
use crate::error::Error;
use crate::interceptor::Interceptors;
use crate::pipeline::{self, Chain, ResponseFuture};
use crate::types::RequestConfig;

/// HTTP client with per-instance defaults and interceptors.
#[derive(Clone)]
pub struct Client {
    inner: Arc<Inner>,
}

struct Inner {
    defaults: RequestConfig,
    interceptors: Interceptors,
    adapter: Arc<dyn Adapter>,
}

impl Client {
    /// A client with `defaults` and the environment's default adapter.
    ///
    /// On native targets that adapter is `HttpAdapter`:
    /// requests must be polled inside a tokio runtime with the time driver
    /// enabled (`enable_time` or `enable_all`), or a request with a timeout
    /// panics.
    pub fn new(defaults: RequestConfig) -> Self {
        Self::builder().defaults(defaults).build()
    }

    pub fn builder() -> ClientBuilder {
        ClientBuilder::default()
    }

    /// A sibling client with its own defaults and empty registries. The
    /// adapter is shared.
    pub fn create(&self, defaults: RequestConfig) -> Client {
        Self::builder()
            .defaults(defaults)
            .adapter_arc(Arc::clone(&self.inner.adapter))
            .build()
    }

    pub fn defaults(&self) -> &RequestConfig {
        &self.inner.defaults
    }

    pub fn interceptors(&self) -> &Interceptors {
        &self.inner.interceptors
    }

    /// Issue a request.
    ///
    /// The config is merged over the defaults and normalized, and the
    /// interceptor chain is built before this returns; the transport runs
    /// when the future is polled.
    pub fn request(&self, config: RequestConfig) -> ResponseFuture {
        let config = match pipeline::normalize(&self.inner.defaults, &config) {
            Ok(config) => config,
            Err(err) => return future::err(err).boxed(),
        };
        debug!(
            method = config.method.as_deref().unwrap_or("get"),
            url = config.url.as_deref().unwrap_or_default(),
            "request issued"
        );
        Chain::build(&self.inner.interceptors, Arc::clone(&self.inner.adapter)).run(config)
    }

    pub fn get(&self, url: &str, config: Option<RequestConfig>) -> ResponseFuture {
        self.verb("get", url, None, config)
    }

    pub fn delete(&self, url: &str, config: Option<RequestConfig>) -> ResponseFuture {
        self.verb("delete", url, None, config)
    }

    pub fn head(&self, url: &str, config: Option<RequestConfig>) -> ResponseFuture {
        self.verb("head", url, None, config)
    }

    pub fn post<T: Serialize>(&self, url: &str, data: &T, config: Option<RequestConfig>) -> ResponseFuture {
        self.verb_with_data("post", url, data, config)
    }

    pub fn put<T: Serialize>(&self, url: &str, data: &T, config: Option<RequestConfig>) -> ResponseFuture {
        self.verb_with_data("put", url, data, config)
    }

    pub fn patch<T: Serialize>(&self, url: &str, data: &T, config: Option<RequestConfig>) -> ResponseFuture {
        self.verb_with_data("patch", url, data, config)
    }

    fn verb_with_data<T: Serialize>(
        &self,
        method: &str,
        url: &str,
        data: &T,
        config: Option<RequestConfig>,
    ) -> ResponseFuture {
        match serde_json::to_value(data) {
            Ok(data) => self.verb(method, url, Some(data), config),
            Err(err) => future::err(Error::Encode(err.to_string())).boxed(),
        }
    }

    /// Merge `{method, url, data}` over `config`, so the verb and URL always
    /// win, then issue the request.
    fn verb(&self, method: &str, url: &str, data: Option<Value>, config: Option<RequestConfig>) -> ResponseFuture {
        let overrides = RequestConfig {
            method: Some(method.to_string()),
            url: Some(url.to_string()),
            data,
            ..RequestConfig::default()
        };
        match RequestConfig::merge(&config.unwrap_or_default(), &overrides) {
            Ok(config) => self.request(config),
            Err(err) => future::err(err).boxed(),
        }
    }
}

impl Default for Client {
    fn default() -> Self {
        Self::new(RequestConfig::default())
    }
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("defaults", &self.inner.defaults)
            .field("interceptors", &self.inner.interceptors)
            .field("adapter", &self.inner.adapter.name())
            .finish()
    }
}

/// Builds a [`Client`].
#[derive(Default)]
pub struct ClientBuilder {
    defaults: RequestConfig,
    adapter: Option<Arc<dyn Adapter>>,
}

impl ClientBuilder {
    pub fn defaults(mut self, defaults: RequestConfig) -> Self {
        self.defaults = defaults;
        self
    }

    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.defaults.base_url = Some(base_url.into());
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.defaults = self.defaults.header(name, value);
        self
    }

    pub fn timeout(mut self, millis: u64) -> Self {
        self.defaults.timeout = Some(millis);
        self
    }

    /// Use `adapter` instead of the one selected for the environment.
    pub fn adapter(self, adapter: impl Adapter + 'static) -> Self {
        self.adapter_arc(Arc::new(adapter))
    }

    pub fn adapter_arc(mut self, adapter: Arc<dyn Adapter>) -> Self {
        self.adapter = Some(adapter);
        self
    }

    pub fn build(self) -> Client {
        Client {
            inner: Arc::new(Inner {
                defaults: self.defaults,
                interceptors: Interceptors::default(),
                adapter: self.adapter.unwrap_or_else(default_adapter),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::AdapterFuture;
    use crate::error::TransportError;
    use crate::http::{RequestHandle, Response};
    use crate::interceptor::Interceptor;
    use crate::types::Headers;
    use futures::executor::block_on;
    use serde_json::json;

    /// Answers every request with the config it received.
    #[derive(Debug)]
    struct Echo;

    impl Adapter for Echo {
        fn name(&self) -> &'static str {
            "echo"
        }

        fn adapt(&self, config: RequestConfig) -> AdapterFuture {
            let mut headers = Headers::new();
            headers.insert("content-type".to_string(), "application/json".to_string());
            let response = Response {
                data: Value::String(serde_json::to_string(&config).unwrap()),
                status: 200,
                status_text: "OK".to_string(),
                headers,
                request: RequestHandle::new(self.name(), &config),
                config,
            };
            future::ok(response).boxed()
        }
    }

    /// Fails every request with a fixed status and text body.
    #[derive(Debug)]
    struct Status(u16, &'static str);

    impl Adapter for Status {
        fn name(&self) -> &'static str {
            "status"
        }

        fn adapt(&self, config: RequestConfig) -> AdapterFuture {
            let response = Response {
                data: Value::String(self.1.to_string()),
                status: self.0,
                status_text: String::new(),
                headers: Headers::new(),
                request: RequestHandle::new(self.name(), &config),
                config,
            };
            future::err(TransportError::status(response).into()).boxed()
        }
    }

    fn echo_client(defaults: RequestConfig) -> Client {
        Client::builder().defaults(defaults).adapter(Echo).build()
    }

    #[test]
    fn request_merges_defaults() {
        let client = echo_client(
            RequestConfig::new()
                .base_url("http://api.test")
                .header("Accept", "application/json"),
        );
        let response = block_on(client.request(RequestConfig::new().url("/users").header("X-Id", "7"))).unwrap();

        assert_eq!(response.data["url"], "http://api.test/users");
        assert_eq!(response.data["method"], "get");
        assert_eq!(response.data["headers"], json!({"Accept": "application/json", "X-Id": "7"}));
        assert_eq!(response.request.adapter, "echo");
    }

    #[test]
    fn post_encodes_json_body() {
        let client = echo_client(RequestConfig::new());
        let response = block_on(client.post("http://x/items", &json!({"a": 1}), None)).unwrap();

        assert_eq!(response.data["method"], "post");
        assert_eq!(response.data["data"], r#"{"a":1}"#);
        assert_eq!(response.data["headers"]["Content-Type"], "application/json");
    }

    #[test]
    fn post_accepts_serializable_types() {
        #[derive(Serialize)]
        struct NewItem {
            title: &'static str,
        }

        let client = echo_client(RequestConfig::new());
        let response = block_on(client.put("http://x/items/1", &NewItem { title: "t" }, None)).unwrap();
        assert_eq!(response.data["method"], "put");
        assert_eq!(response.data["data"], r#"{"title":"t"}"#);
    }

    #[test]
    fn verbs_override_config_method_and_url() {
        let client = echo_client(RequestConfig::new());
        let config = RequestConfig::new().method("post").url("http://ignored").param("q", 1);
        let response = block_on(client.delete("http://x/items/1", Some(config))).unwrap();

        assert_eq!(response.data["method"], "delete");
        assert_eq!(response.data["url"], "http://x/items/1?q=1");
    }

    #[test]
    fn head_and_patch_set_their_methods() {
        let client = echo_client(RequestConfig::new());
        let head = block_on(client.head("http://x/", None)).unwrap();
        assert_eq!(head.data["method"], "head");
        let patch = block_on(client.patch("http://x/", &json!({"done": true}), None)).unwrap();
        assert_eq!(patch.data["method"], "patch");
        assert_eq!(patch.data["data"], r#"{"done":true}"#);
    }

    #[test]
    fn get_does_not_encode_data() {
        let client = echo_client(RequestConfig::new());
        let config = RequestConfig::new().data(json!({"a": 1}));
        let response = block_on(client.get("http://x/", Some(config))).unwrap();
        assert_eq!(response.data["data"], json!({"a": 1}));
        assert!(response.data.get("headers").is_none());
    }

    #[test]
    fn interceptors_run_in_onion_order() {
        let client = echo_client(RequestConfig::new());
        let tag = |name: &'static str| {
            Interceptor::fulfilled(move |config: RequestConfig| {
                let trail = config.extra.get("trail").and_then(Value::as_str).unwrap_or_default().to_string();
                async move { Ok(config.extra("trail", format!("{trail}{name}"))) }
            })
        };
        client.interceptors().request.register(tag("A"));
        client.interceptors().request.register(tag("B"));
        client
            .interceptors()
            .response
            .register(Interceptor::fulfilled(|mut response: Response| async move {
                let trail = response.data["trail"].as_str().unwrap_or_default().to_string();
                response.data["trail"] = json!(format!("{trail}>C"));
                Ok(response)
            }));

        let response = block_on(client.get("http://x/", None)).unwrap();
        assert_eq!(response.data["trail"], "BA>C");
    }

    #[test]
    fn status_error_carries_response() {
        let client = Client::builder().adapter(Status(404, "not found")).build();
        let err = block_on(client.get("http://x/missing", None)).unwrap_err();

        assert_eq!(err.to_string(), "Request failed with status code 404");
        let response = err.response().unwrap();
        assert_eq!(response.status, 404);
        assert_eq!(response.data, "not found");
        assert_eq!(err.as_transport().unwrap().config.url.as_deref(), Some("http://x/missing"));
    }

    #[test]
    fn response_interceptor_can_recover_from_status_error() {
        let client = Client::builder().adapter(Status(503, "busy")).build();
        client.interceptors().response.register(Interceptor::new().on_rejected(|err: Error| async move {
            let unavailable = err.response().filter(|response| response.status == 503).cloned();
            match unavailable {
                Some(mut fallback) => {
                    fallback.data = json!({"cached": true});
                    Ok(fallback)
                }
                None => Err(err),
            }
        }));

        let response = block_on(client.get("http://x/", None)).unwrap();
        assert_eq!(response.data["cached"], true);
        assert_eq!(response.status, 503);
    }

    #[test]
    fn unhandled_errors_propagate_unchanged() {
        let client = Client::builder().adapter(Status(500, "boom")).build();
        client
            .interceptors()
            .response
            .register(Interceptor::fulfilled(|response: Response| async move { Ok(response) }));

        let err = block_on(client.get("http://x/", None)).unwrap_err();
        assert_eq!(err.as_transport().unwrap().status_code(), Some(500));
    }

    #[test]
    fn sibling_clients_are_independent() {
        let parent = echo_client(RequestConfig::new().base_url("http://parent"));
        parent
            .interceptors()
            .request
            .register(Interceptor::fulfilled(|config: RequestConfig| async move {
                Ok(config.header("X-Parent", "1"))
            }));
        let child = parent.create(RequestConfig::new().base_url("http://child"));

        assert_eq!(child.interceptors().request.len(), 0);
        assert_eq!(child.defaults().base_url.as_deref(), Some("http://child"));

        let response = block_on(child.get("/a", None)).unwrap();
        assert_eq!(response.data["url"], "http://child/a");
        assert!(response.data.get("headers").is_none());
        assert_eq!(response.request.adapter, "echo");

        let response = block_on(parent.get("/a", None)).unwrap();
        assert_eq!(response.data["headers"]["X-Parent"], "1");
    }

    #[test]
    fn clones_share_registries() {
        let client = echo_client(RequestConfig::new());
        let handle = client.clone();
        handle
            .interceptors()
            .request
            .register(Interceptor::fulfilled(|config: RequestConfig| async move { Ok(config) }));
        assert_eq!(client.interceptors().request.len(), 1);
    }

    #[test]
    fn chain_is_fixed_when_request_is_issued() {
        let client = echo_client(RequestConfig::new());
        let pending = client.get("http://x/", None);
        client
            .interceptors()
            .request
            .register(Interceptor::fulfilled(|_: RequestConfig| async move {
                Err(Error::interceptor("registered too late"))
            }));

        assert!(block_on(pending).is_ok());
        assert!(block_on(client.get("http://x/", None)).is_err());
    }

    #[test]
    fn builder_shortcuts_set_defaults() {
        let client = Client::builder()
            .base_url("http://api")
            .header("Authorization", "Bearer t")
            .timeout(250)
            .adapter(Echo)
            .build();
        let defaults = client.defaults();
        assert_eq!(defaults.base_url.as_deref(), Some("http://api"));
        assert_eq!(defaults.timeout, Some(250));
        assert_eq!(defaults.headers.as_ref().unwrap()["Authorization"], "Bearer t");
    }
}
