//! HTTP client with request/response interceptors and automatic JSON bodies.
//!
//! # Overview
//! A [`Client`] merges its default [`RequestConfig`] with each call's config,
//! normalizes the result (lower-case method, composed URL with query string,
//! JSON-encoded body), then runs it through an interceptor chain around a
//! transport [`Adapter`]. Callers get either a [`Response`] or an [`Error`].
//!
//! # Design
//! - Interceptors nest like an onion: request interceptors run last-registered
//!   first, response interceptors first-registered first.
//! - The transport is a trait object. The default is chosen once per process:
//!   `XMLHttpRequest` in a browser, a socket-based adapter elsewhere.
//! - There is no global client. Create one at startup with [`create_client`]
//!   and pass it where it is needed; `Client::create` makes independent
//!   siblings.
//! - Non-2xx responses reject with the full response attached, so error
//!   bodies stay inspectable.
//!
//! ```no_run
//! # async fn demo() -> Result<(), fetch_core::Error> {
//! use fetch_core::{create_client, Interceptor, RequestConfig};
//!
//! let client = create_client(RequestConfig::new().base_url("https://api.example.com"));
//! client
//!     .interceptors()
//!     .request
//!     .register(Interceptor::fulfilled(|config: RequestConfig| async move {
//!         Ok(config.header("Authorization", "Bearer token"))
//!     }));
//!
//! let created = client.post("/items", &serde_json::json!({"name": "demo"}), None).await?;
//! println!("{} {}", created.status, created.data);
//! # Ok(())
//! # }
//! ```

pub mod adapter;
pub mod client;
pub mod error;
pub mod http;
pub mod interceptor;
pub mod pipeline;
pub mod types;

pub use adapter::{default_adapter, Adapter, AdapterFuture, Environment};
#[cfg(not(target_arch = "wasm32"))]
pub use adapter::HttpAdapter;
#[cfg(target_arch = "wasm32")]
pub use adapter::XhrAdapter;
pub use client::{Client, ClientBuilder};
pub use error::{Error, TransportError, ECONNABORTED};
pub use http::{build_url, parse_headers, RequestHandle, Response};
pub use interceptor::{Interceptor, InterceptorManager, Interceptors, StepFuture};
pub use pipeline::{dispatch_request, normalize, ResponseFuture};
pub use types::{merge, Headers, RequestConfig};

/// Create a client with `defaults` and the environment's default adapter.
pub fn create_client(defaults: RequestConfig) -> Client {
    Client::new(defaults)
}
