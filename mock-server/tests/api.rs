use axum::http::{self, Request, StatusCode};
use http_body_util::BodyExt;
use mock_server::{app, Echo};
use tower::ServiceExt;

async fn body_json<T: serde::de::DeserializeOwned>(response: axum::response::Response) -> T {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

async fn body_bytes(response: axum::response::Response) -> bytes::Bytes {
    response.into_body().collect().await.unwrap().to_bytes()
}

fn content_type(response: &axum::response::Response) -> &str {
    response
        .headers()
        .get(http::header::CONTENT_TYPE)
        .unwrap()
        .to_str()
        .unwrap()
}

// --- echo ---

#[tokio::test]
async fn echo_reports_method_query_and_headers() {
    let resp = app()
        .oneshot(
            Request::builder()
                .uri("/echo?a=1&b=c%20d")
                .header("X-Trace", "abc")
                .body(String::new())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let echo: Echo = body_json(resp).await;
    assert_eq!(echo.method, "GET");
    assert_eq!(echo.path, "/echo");
    assert_eq!(echo.query["a"], "1");
    assert_eq!(echo.query["b"], "c d");
    assert_eq!(echo.headers["x-trace"], "abc");
}

#[tokio::test]
async fn echo_returns_request_body() {
    let resp = app()
        .oneshot(
            Request::builder()
                .method("PUT")
                .uri("/echo")
                .header(http::header::CONTENT_TYPE, "application/json")
                .body(r#"{"a":1}"#.to_string())
                .unwrap(),
        )
        .await
        .unwrap();

    let echo: Echo = body_json(resp).await;
    assert_eq!(echo.method, "PUT");
    assert_eq!(echo.body, r#"{"a":1}"#);
    assert_eq!(echo.headers["content-type"], "application/json");
}

// --- status ---

#[tokio::test]
async fn status_answers_with_reason_body() {
    let resp = app()
        .oneshot(Request::builder().uri("/status/404").body(String::new()).unwrap())
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    assert_eq!(&body_bytes(resp).await[..], b"not found");
}

#[tokio::test]
async fn status_accepts_any_method() {
    let resp = app()
        .oneshot(
            Request::builder()
                .method("DELETE")
                .uri("/status/503")
                .body(String::new())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn status_rejects_bad_code() {
    let resp = app()
        .oneshot(Request::builder().uri("/status/abc").body(String::new()).unwrap())
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

// --- bodies ---

#[tokio::test]
async fn json_declares_content_type() {
    let resp = app()
        .oneshot(Request::builder().uri("/json").body(String::new()).unwrap())
        .await
        .unwrap();

    assert_eq!(content_type(&resp), "application/json");
    let value: serde_json::Value = body_json(resp).await;
    assert_eq!(value["x"], 1);
}

#[tokio::test]
async fn invalid_json_is_labelled_json() {
    let resp = app()
        .oneshot(Request::builder().uri("/json/invalid").body(String::new()).unwrap())
        .await
        .unwrap();

    assert_eq!(content_type(&resp), "application/json");
    assert_eq!(&body_bytes(resp).await[..], b"{not json");
}

#[tokio::test]
async fn text_is_plain() {
    let resp = app()
        .oneshot(Request::builder().uri("/text").body(String::new()).unwrap())
        .await
        .unwrap();

    assert_eq!(content_type(&resp), "text/plain");
    assert_eq!(&body_bytes(resp).await[..], br#"{"x":1}"#);
}

// --- slow ---

#[tokio::test]
async fn slow_waits_before_answering() {
    let started = std::time::Instant::now();
    let resp = app()
        .oneshot(Request::builder().uri("/slow/30").body(String::new()).unwrap())
        .await
        .unwrap();

    assert!(started.elapsed() >= std::time::Duration::from_millis(30));
    assert_eq!(&body_bytes(resp).await[..], b"done");
}

// --- edge bodies ---

#[tokio::test]
async fn binary_is_not_utf8() {
    let resp = app()
        .oneshot(Request::builder().uri("/binary").body(String::new()).unwrap())
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let bytes = body_bytes(resp).await;
    assert_eq!(&bytes[..], &[0xff, 0xfe, b'A']);
    assert!(std::str::from_utf8(&bytes).is_err());
}

#[tokio::test]
async fn large_has_requested_length() {
    let resp = app()
        .oneshot(Request::builder().uri("/large/4096").body(String::new()).unwrap())
        .await
        .unwrap();

    let bytes = body_bytes(resp).await;
    assert_eq!(bytes.len(), 4096);
    assert!(bytes.iter().all(|b| *b == b'a'));
}

#[tokio::test]
async fn redirect_points_at_text() {
    let resp = app()
        .oneshot(Request::builder().uri("/redirect").body(String::new()).unwrap())
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::FOUND);
    assert_eq!(resp.headers()[http::header::LOCATION], "/text");
}
