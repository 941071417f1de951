//! Transport adapters.
//!
//! # Design
//! An adapter turns a fully normalized `RequestConfig` into a `Response`. Two
//! built-in variants exist, one per environment: `XhrAdapter` drives the
//! browser's `XMLHttpRequest` on `wasm32`, `HttpAdapter` speaks HTTP over
//! sockets everywhere else. Which one a client uses by default is decided once
//! per process by probing the environment; callers may inject any other
//! `Adapter` through `ClientBuilder::adapter`.
//!
//! Every adapter follows the same contract: a 2xx status resolves, any other
//! status rejects with a `TransportError` carrying the full response, a
//! connection failure rejects without a response, and an elapsed timeout
//! rejects with code `ECONNABORTED`. Response header names are lower case.

#[cfg(not(target_arch = "wasm32"))]
mod socket;
#[cfg(target_arch = "wasm32")]
mod xhr;

#[cfg(not(target_arch = "wasm32"))]
pub use self::socket::HttpAdapter;
#[cfg(target_arch = "wasm32")]
pub use self::xhr::XhrAdapter;

use std::sync::{Arc, OnceLock};

use futures::future::{self, BoxFuture, FutureExt};
use serde_json::Value;
use tracing::debug;

use crate::error::{Error, TransportError};
use crate::http::{RequestHandle, Response};
use crate::types::{Headers, RequestConfig};

pub type AdapterFuture = BoxFuture<'static, Result<Response, Error>>;

/// Performs the transport operation for a normalized config.
pub trait Adapter: Send + Sync {
    /// Short name recorded in every `RequestHandle` this adapter produces.
    fn name(&self) -> &'static str;

    fn adapt(&self, config: RequestConfig) -> AdapterFuture;
}

/// The execution environment, as far as transport selection is concerned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    /// A global `XMLHttpRequest` constructor is available.
    Browser,
    Server,
}

impl Environment {
    /// Probe the environment. The result is computed once and cached.
    pub fn detect() -> Self {
        static DETECTED: OnceLock<Environment> = OnceLock::new();
        *DETECTED.get_or_init(Self::probe)
    }

    #[cfg(target_arch = "wasm32")]
    fn probe() -> Self {
        if xhr::is_available() {
            Environment::Browser
        } else {
            Environment::Server
        }
    }

    #[cfg(not(target_arch = "wasm32"))]
    fn probe() -> Self {
        Environment::Server
    }
}

/// The adapter for the current environment, selected on first use.
pub fn default_adapter() -> Arc<dyn Adapter> {
    static SELECTED: OnceLock<Arc<dyn Adapter>> = OnceLock::new();
    SELECTED
        .get_or_init(|| {
            let environment = Environment::detect();
            let adapter = select(environment);
            debug!(?environment, adapter = adapter.name(), "selected transport adapter");
            adapter
        })
        .clone()
}

fn select(environment: Environment) -> Arc<dyn Adapter> {
    match environment {
        #[cfg(target_arch = "wasm32")]
        Environment::Browser => Arc::new(XhrAdapter),
        #[cfg(not(target_arch = "wasm32"))]
        Environment::Server => Arc::new(HttpAdapter),
        #[allow(unreachable_patterns)]
        other => Arc::new(Unsupported(other)),
    }
}

/// Stands in when the environment offers no transport this build can use,
/// e.g. `wasm32` outside a browser. Every request fails as a network error.
#[derive(Debug)]
struct Unsupported(Environment);

impl Adapter for Unsupported {
    fn name(&self) -> &'static str {
        "unsupported"
    }

    fn adapt(&self, config: RequestConfig) -> AdapterFuture {
        let request = RequestHandle::new(self.name(), &config);
        let message = format!("No transport available in {:?} environment", self.0);
        future::err(TransportError::network(message, config, request).into()).boxed()
    }
}

/// What an adapter read off the wire, before it is checked against the
/// success range.
#[derive(Debug, Clone, Default)]
pub(crate) struct RawResponse {
    pub status: u16,
    pub status_text: String,
    pub headers: Headers,
    pub body: String,
}

impl RawResponse {
    /// Build the `Response` and settle it: 2xx resolves, anything else
    /// rejects with the response attached.
    pub(crate) fn settle(self, config: RequestConfig, request: RequestHandle) -> Result<Response, Error> {
        let response = Response {
            data: Value::String(self.body),
            status: self.status,
            status_text: self.status_text,
            headers: self
                .headers
                .into_iter()
                .map(|(name, value)| (name.to_ascii_lowercase(), value))
                .collect(),
            config,
            request,
        };
        if response.is_success() {
            Ok(response)
        } else {
            Err(TransportError::status(response).into())
        }
    }
}
