//! Error types produced by the request pipeline.
//!
//! # Design
//! Every failure the library itself produces is a `TransportError`: the
//! transfer completed with a non-2xx status (the full `Response` is kept so
//! callers can inspect the error body), the connection failed before any
//! response, or the timeout elapsed. `Error` wraps it and adds the variants a
//! caller's own interceptor may reject with.

use thiserror::Error;

use crate::http::{RequestHandle, Response};
use crate::types::RequestConfig;

/// Error code carried by a `TransportError` when the timeout elapsed.
pub const ECONNABORTED: &str = "ECONNABORTED";

/// A failed transport operation.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct TransportError {
    pub message: String,
    pub config: RequestConfig,
    pub request: RequestHandle,
    /// Present only when the server answered with a status outside 200..300.
    pub response: Option<Box<Response>>,
    pub code: Option<String>,
}

impl TransportError {
    /// The transfer completed but the status is not a success.
    pub fn status(response: Response) -> Self {
        Self {
            message: format!("Request failed with status code {}", response.status),
            config: response.config.clone(),
            request: response.request.clone(),
            response: Some(Box::new(response)),
            code: None,
        }
    }

    /// The connection failed before a response arrived.
    pub fn network(message: impl Into<String>, config: RequestConfig, request: RequestHandle) -> Self {
        Self {
            message: message.into(),
            config,
            request,
            response: None,
            code: None,
        }
    }

    pub fn timeout(config: RequestConfig, request: RequestHandle) -> Self {
        let millis = config.timeout.unwrap_or_default();
        Self {
            message: format!("Timeout of {millis}ms exceeded"),
            config,
            request,
            response: None,
            code: Some(ECONNABORTED.to_string()),
        }
    }

    pub fn is_timeout(&self) -> bool {
        self.code.as_deref() == Some(ECONNABORTED)
    }

    /// Status code of the failed response, if the server answered.
    pub fn status_code(&self) -> Option<u16> {
        self.response.as_ref().map(|r| r.status)
    }
}

/// The rejection type of a request.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// Raised by a caller-supplied interceptor.
    #[error("{0}")]
    Interceptor(String),

    /// A config or body could not be converted to or from JSON.
    #[error("encoding failed: {0}")]
    Encode(String),
}

impl Error {
    pub fn interceptor(message: impl Into<String>) -> Self {
        Error::Interceptor(message.into())
    }

    pub fn as_transport(&self) -> Option<&TransportError> {
        match self {
            Error::Transport(err) => Some(err),
            _ => None,
        }
    }

    /// The response attached to a status failure.
    pub fn response(&self) -> Option<&Response> {
        self.as_transport()?.response.as_deref()
    }

    pub fn code(&self) -> Option<&str> {
        self.as_transport()?.code.as_deref()
    }

    pub fn is_timeout(&self) -> bool {
        self.as_transport().is_some_and(TransportError::is_timeout)
    }
}
