use std::{collections::BTreeMap, time::Duration};

use axum::{
    extract::{Path, Query},
    http::{header, HeaderMap, Method, StatusCode, Uri},
    routing::{any, get},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;

/// What `/echo` saw of the request it answered.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Echo {
    pub method: String,
    pub path: String,
    pub query: BTreeMap<String, String>,
    pub headers: BTreeMap<String, String>,
    pub body: String,
}

pub fn app() -> Router {
    Router::new()
        .route("/echo", any(echo))
        .route("/status/{code}", any(status))
        .route("/json", get(json_body))
        .route("/json/invalid", get(invalid_json))
        .route("/text", get(text_body))
        .route("/slow/{millis}", get(slow))
        .route("/binary", get(binary))
        .route("/large/{bytes}", get(large))
        .route("/redirect", get(redirect))
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

async fn echo(
    method: Method,
    uri: Uri,
    Query(query): Query<BTreeMap<String, String>>,
    headers: HeaderMap,
    body: String,
) -> Json<Echo> {
    let headers = headers
        .iter()
        .map(|(name, value)| {
            (
                name.as_str().to_string(),
                String::from_utf8_lossy(value.as_bytes()).into_owned(),
            )
        })
        .collect();
    Json(Echo {
        method: method.to_string(),
        path: uri.path().to_string(),
        query,
        headers,
        body,
    })
}

/// Answer with `code` and its lower-case reason phrase as a text body.
async fn status(Path(code): Path<u16>) -> Result<(StatusCode, String), StatusCode> {
    let status = StatusCode::from_u16(code).map_err(|_| StatusCode::BAD_REQUEST)?;
    let reason = status.canonical_reason().unwrap_or("unknown").to_lowercase();
    Ok((status, reason))
}

async fn json_body() -> Json<serde_json::Value> {
    Json(serde_json::json!({"x": 1, "items": ["a", "b"]}))
}

async fn invalid_json() -> ([(header::HeaderName, &'static str); 1], &'static str) {
    ([(header::CONTENT_TYPE, "application/json")], "{not json")
}

async fn text_body() -> ([(header::HeaderName, &'static str); 1], &'static str) {
    ([(header::CONTENT_TYPE, "text/plain")], r#"{"x":1}"#)
}

async fn slow(Path(millis): Path<u64>) -> &'static str {
    tokio::time::sleep(Duration::from_millis(millis)).await;
    "done"
}

/// Bytes that are not valid UTF-8, followed by an ASCII `A`.
async fn binary() -> ([(header::HeaderName, &'static str); 1], Vec<u8>) {
    ([(header::CONTENT_TYPE, "application/octet-stream")], vec![0xff, 0xfe, b'A'])
}

/// A body of `bytes` ASCII `a` characters.
async fn large(Path(bytes): Path<usize>) -> String {
    "a".repeat(bytes)
}

async fn redirect() -> (StatusCode, [(header::HeaderName, &'static str); 1]) {
    (StatusCode::FOUND, [(header::LOCATION, "/text")])
}
