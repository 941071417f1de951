//! Socket-based HTTP/HTTPS transport.
//!
//! # Design
//! The transfer itself is a blocking `ureq` call run on tokio's blocking
//! pool. The timeout is enforced twice: `tokio::time::timeout` rejects the
//! request exactly when the limit elapses, and the same limit on the ureq
//! agent tears down the socket of the abandoned transfer.

use std::time::Duration;

use futures::future::FutureExt;
use indexmap::map::Entry;
use tokio::runtime::Handle;
use tracing::debug;
use ureq::http::Request;

use super::{Adapter, AdapterFuture, RawResponse};
use crate::error::{Error, TransportError};
use crate::http::{RequestHandle, Response};
use crate::types::{Headers, RequestConfig};

/// Sends requests over TCP with `ureq`. Requires a tokio runtime with the
/// time driver enabled; `tokio::time::timeout` panics without it.
///
/// Redirects are not followed: a 3xx rejects like any other non-2xx status.
/// Bodies are read in full with no size cap and decoded lossily as UTF-8.
/// `status_text` is the canonical reason phrase for the status code, since
/// ureq does not expose the phrase sent on the wire.
#[derive(Debug, Clone, Copy, Default)]
pub struct HttpAdapter;

/// Why a blocking transfer failed.
enum Failure {
    Timeout,
    Network(String),
}

impl Adapter for HttpAdapter {
    fn name(&self) -> &'static str {
        "http"
    }

    fn adapt(&self, config: RequestConfig) -> AdapterFuture {
        let request = RequestHandle::new(self.name(), &config);
        transfer(config, request).boxed()
    }
}

async fn transfer(config: RequestConfig, request: RequestHandle) -> Result<Response, Error> {
    let runtime = match Handle::try_current() {
        Ok(runtime) => runtime,
        Err(err) => return Err(TransportError::network(err.to_string(), config, request).into()),
    };
    let limit = config.timeout.filter(|millis| *millis > 0).map(Duration::from_millis);

    let blocking = {
        let config = config.clone();
        let method = request.method.clone();
        runtime.spawn_blocking(move || send(&method, &config, limit))
    };
    let joined = match limit {
        Some(limit) => match tokio::time::timeout(limit, blocking).await {
            Ok(joined) => joined,
            Err(_) => return Err(TransportError::timeout(config, request).into()),
        },
        None => blocking.await,
    };

    match joined {
        Ok(Ok(raw)) => raw.settle(config, request),
        Ok(Err(Failure::Timeout)) => Err(TransportError::timeout(config, request).into()),
        Ok(Err(Failure::Network(message))) => {
            debug!(url = %request.url, %message, "transport failed");
            Err(TransportError::network(message, config, request).into())
        }
        Err(err) => Err(TransportError::network(err.to_string(), config, request).into()),
    }
}

/// Run one blocking transfer. Bodies are only sent for methods that carry
/// one; status codes are returned as data, never as errors.
fn send(method: &str, config: &RequestConfig, limit: Option<Duration>) -> Result<RawResponse, Failure> {
    let agent = ureq::Agent::config_builder()
        .http_status_as_error(false)
        .max_redirects(0)
        .timeout_global(limit)
        .build()
        .new_agent();

    let mut builder = Request::builder()
        .method(method)
        .uri(config.url.as_deref().unwrap_or_default());
    for (name, value) in config.headers.iter().flatten() {
        builder = builder.header(name.as_str(), value.as_str());
    }

    let body = match (method, &config.data) {
        ("GET" | "HEAD", _) | (_, None) => None,
        (_, Some(serde_json::Value::String(text))) => Some(text.clone()),
        (_, Some(other)) => Some(other.to_string()),
    };
    let outcome = match body {
        Some(body) => builder
            .body(body)
            .map_err(|e| Failure::Network(e.to_string()))
            .and_then(|request| agent.run(request).map_err(failure)),
        None => builder
            .body(())
            .map_err(|e| Failure::Network(e.to_string()))
            .and_then(|request| agent.run(request).map_err(failure)),
    };
    let mut response = outcome?;

    let status = response.status();
    let mut headers = Headers::new();
    for (name, value) in response.headers() {
        let value = String::from_utf8_lossy(value.as_bytes()).into_owned();
        match headers.entry(name.as_str().to_ascii_lowercase()) {
            Entry::Occupied(mut entry) => {
                let existing = entry.get_mut();
                existing.push_str(", ");
                existing.push_str(&value);
            }
            Entry::Vacant(entry) => {
                entry.insert(value);
            }
        }
    }
    let bytes = response
        .body_mut()
        .with_config()
        .limit(u64::MAX)
        .read_to_vec()
        .map_err(failure)?;
    let body = String::from_utf8_lossy(&bytes).into_owned();

    Ok(RawResponse {
        status: status.as_u16(),
        status_text: status.canonical_reason().unwrap_or_default().to_string(),
        headers,
        body,
    })
}

fn failure(err: ureq::Error) -> Failure {
    match err {
        ureq::Error::Timeout(_) => Failure::Timeout,
        ureq::Error::Io(io) if io.kind() == std::io::ErrorKind::TimedOut => Failure::Timeout,
        other => Failure::Network(other.to_string()),
    }
}
