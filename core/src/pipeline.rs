//! Config normalization, chain construction and dispatch.
//!
//! # Design
//! A request runs as one chain of steps, each attached as the continuation
//! of the previous step's future:
//!
//! ```text
//! request interceptors (last registered first)
//!   -> dispatcher (fulfilled only)
//!   -> response interceptors (first registered first)
//! ```
//!
//! Registering request interceptors `A` then `B` and response interceptors
//! `A'` then `B'` yields `B -> A -> dispatch -> A' -> B'`. The dispatcher has
//! no rejection handler, so an error raised before it skips the transport and
//! travels on to the first response interceptor that handles errors.
//!
//! Normalization and chain construction happen synchronously when the
//! request is issued; only the continuations run when the returned future is
//! polled.

use std::sync::Arc;

use futures::future::{self, BoxFuture, FutureExt, TryFutureExt};
use serde_json::Value;
use tracing::{debug, warn};

use crate::adapter::Adapter;
use crate::error::Error;
use crate::http::{build_url, Response};
use crate::interceptor::{Interceptor, Interceptors, StepFuture};
use crate::types::{Headers, RequestConfig};

/// The eventual outcome of a request.
pub type ResponseFuture = BoxFuture<'static, Result<Response, Error>>;

/// Merge `config` over `defaults` and normalize the result for transport.
pub fn normalize(defaults: &RequestConfig, config: &RequestConfig) -> Result<RequestConfig, Error> {
    let mut config = RequestConfig::merge(defaults, config)?;

    let method = config.method.as_deref().unwrap_or("get").to_ascii_lowercase();
    config.method = Some(method);

    let url = config.url.as_deref().unwrap_or_default();
    let url = match config.base_url.as_deref() {
        Some(base) => format!("{base}{url}"),
        None => url.to_string(),
    };
    config.url = Some(build_url(&url, config.params.as_ref()));

    encode_body(&mut config)?;
    Ok(config)
}

/// Replace object or array `data` with its JSON text on methods that carry a
/// body, declaring the content type unless the caller already did.
fn encode_body(config: &mut RequestConfig) -> Result<(), Error> {
    if matches!(config.method.as_deref(), Some("get" | "head")) {
        return Ok(());
    }
    let body = match &config.data {
        Some(data @ (Value::Object(_) | Value::Array(_))) => {
            serde_json::to_string(data).map_err(|e| Error::Encode(e.to_string()))?
        }
        _ => return Ok(()),
    };

    let headers = config.headers.get_or_insert_with(Headers::new);
    if !headers.keys().any(|name| name.eq_ignore_ascii_case("content-type")) {
        headers.insert("Content-Type".to_string(), "application/json".to_string());
    }
    config.data = Some(Value::String(body));
    Ok(())
}

/// The steps of one request, in execution order.
pub(crate) struct Chain {
    request: Vec<Interceptor<RequestConfig>>,
    adapter: Arc<dyn Adapter>,
    response: Vec<Interceptor<Response>>,
}

impl Chain {
    /// Snapshot the registries. Interceptors registered after this call do
    /// not take part in the chain.
    pub(crate) fn build(interceptors: &Interceptors, adapter: Arc<dyn Adapter>) -> Self {
        let mut request = interceptors.request.snapshot();
        request.reverse();
        Self {
            request,
            adapter,
            response: interceptors.response.snapshot(),
        }
    }

    /// Start from a resolved future holding `config` and attach every step
    /// as the continuation of the one before it.
    pub(crate) fn run(self, config: RequestConfig) -> ResponseFuture {
        let mut pending: StepFuture<RequestConfig> = future::ok(config).boxed();
        for step in &self.request {
            pending = step.attach(pending);
        }

        let adapter = self.adapter;
        let mut pending: StepFuture<Response> = pending
            .and_then(move |config| dispatch_request(adapter, config))
            .boxed();
        for step in &self.response {
            pending = step.attach(pending);
        }
        pending
    }
}

/// Send `config` through `adapter` and parse a JSON body on success.
///
/// Adapter errors pass through unchanged.
pub fn dispatch_request(adapter: Arc<dyn Adapter>, config: RequestConfig) -> ResponseFuture {
    debug!(
        adapter = adapter.name(),
        method = config.method.as_deref().unwrap_or("get"),
        url = config.url.as_deref().unwrap_or_default(),
        "dispatching request"
    );
    adapter.adapt(config).map_ok(parse_json_body).boxed()
}

/// Replace a non-empty string body with its parsed value when the response
/// declares `application/json`. A body that fails to parse is kept as text.
pub(crate) fn parse_json_body(mut response: Response) -> Response {
    let Value::String(text) = &response.data else {
        return response;
    };
    let declares_json = response
        .header("content-type")
        .is_some_and(|content_type| content_type.contains("application/json"));
    if text.is_empty() || !declares_json {
        return response;
    }
    match serde_json::from_str::<Value>(text) {
        Ok(parsed) => response.data = parsed,
        Err(err) => warn!(url = %response.request.url, error = %err, "JSON parsing failed for response"),
    }
    response
}
