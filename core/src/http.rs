//! Response types and the URL/header helpers shared by the adapters.
//!
//! # Design
//! A `Response` is plain data: the adapter that produced it is described by a
//! `RequestHandle` rather than by a live transport object, so responses and
//! errors can be cloned, logged and sent across threads freely.

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use serde_json::{Map, Value};

use crate::types::{Headers, RequestConfig};

/// Characters left unescaped in a query component: alphanumerics and
/// `- _ . ! ~ * ' ( )`.
const COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

/// Describes the transport operation behind a response or error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestHandle {
    /// Name of the adapter that ran the request.
    pub adapter: &'static str,
    /// Upper-case method as sent on the wire.
    pub method: String,
    pub url: String,
}

impl RequestHandle {
    pub fn new(adapter: &'static str, config: &RequestConfig) -> Self {
        Self {
            adapter,
            method: config.method.as_deref().unwrap_or("get").to_ascii_uppercase(),
            url: config.url.clone().unwrap_or_default(),
        }
    }
}

/// A completed HTTP exchange.
#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    /// Body; the parsed JSON value when the server declared JSON, otherwise
    /// the raw text as `Value::String`.
    pub data: Value,
    pub status: u16,
    pub status_text: String,
    /// Lower-case header names.
    pub headers: Headers,
    /// The normalized config the request was sent with.
    pub config: RequestConfig,
    pub request: RequestHandle,
}

impl Response {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

/// Append `params` to `url` as a percent-encoded query string.
///
/// Keys and values are encoded independently and joined with `&`. The query
/// follows `?`, or `&` when `url` already has one. Absent or empty params
/// leave the URL unchanged.
pub fn build_url(url: &str, params: Option<&Map<String, Value>>) -> String {
    let Some(params) = params else {
        return url.to_string();
    };
    let query = params
        .iter()
        .map(|(key, value)| {
            format!(
                "{}={}",
                utf8_percent_encode(key, COMPONENT),
                utf8_percent_encode(&param_text(value), COMPONENT)
            )
        })
        .collect::<Vec<_>>()
        .join("&");
    if query.is_empty() {
        return url.to_string();
    }
    let separator = if url.contains('?') { '&' } else { '?' };
    format!("{url}{separator}{query}")
}

/// Text form of a query value: strings as-is, arrays comma-joined, anything
/// else as JSON.
fn param_text(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        Value::Array(items) => items.iter().map(param_text).collect::<Vec<_>>().join(","),
        other => other.to_string(),
    }
}

/// Parse a raw `Name: value` header block into lower-case names.
///
/// Lines without a name are dropped; colons after the first stay part of the
/// value.
pub fn parse_headers(raw: &str) -> Headers {
    raw.lines()
        .filter_map(|line| {
            let (name, value) = line.split_once(':').unwrap_or((line, ""));
            let name = name.trim();
            (!name.is_empty()).then(|| (name.to_ascii_lowercase(), value.trim().to_string()))
        })
        .collect()
}
