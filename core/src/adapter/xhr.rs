//! Browser transport over `XMLHttpRequest`.
//!
//! The XHR object and its callbacks live on the JS side; the callbacks read
//! the finished transfer into a `RawResponse` and hand it over a oneshot
//! channel, so the returned future holds no JS values and stays `Send`.

use std::cell::RefCell;
use std::rc::Rc;

use futures::channel::oneshot;
use futures::future::{self, FutureExt};
use serde_json::Value;
use wasm_bindgen::closure::Closure;
use wasm_bindgen::{JsCast, JsValue};
use web_sys::XmlHttpRequest;

use super::{Adapter, AdapterFuture, RawResponse};
use crate::error::TransportError;
use crate::http::{parse_headers, RequestHandle};
use crate::types::RequestConfig;

/// Sends requests through the browser's `XMLHttpRequest`.
#[derive(Debug, Clone, Copy, Default)]
pub struct XhrAdapter;

enum Outcome {
    Loaded(RawResponse),
    NetworkError,
    TimedOut,
}

type Slot = Rc<RefCell<Option<oneshot::Sender<Outcome>>>>;

/// Whether the global scope exposes an `XMLHttpRequest` constructor.
pub(crate) fn is_available() -> bool {
    js_sys::Reflect::has(&js_sys::global(), &JsValue::from_str("XMLHttpRequest")).unwrap_or(false)
}

impl Adapter for XhrAdapter {
    fn name(&self) -> &'static str {
        "xhr"
    }

    fn adapt(&self, config: RequestConfig) -> AdapterFuture {
        let request = RequestHandle::new(self.name(), &config);
        let receiver = match open(&request, &config) {
            Ok(receiver) => receiver,
            Err(err) => {
                let message = err.as_string().unwrap_or_else(|| format!("{err:?}"));
                return future::err(TransportError::network(message, config, request).into()).boxed();
            }
        };
        async move {
            match receiver.await {
                Ok(Outcome::Loaded(raw)) => raw.settle(config, request),
                Ok(Outcome::TimedOut) => Err(TransportError::timeout(config, request).into()),
                Ok(Outcome::NetworkError) | Err(_) => {
                    Err(TransportError::network("Network Error", config, request).into())
                }
            }
        }
        .boxed()
    }
}

fn open(request: &RequestHandle, config: &RequestConfig) -> Result<oneshot::Receiver<Outcome>, JsValue> {
    let xhr = XmlHttpRequest::new()?;
    xhr.open_with_async(&request.method, &request.url, true)?;
    xhr.set_timeout(u32::try_from(config.timeout.unwrap_or_default()).unwrap_or(u32::MAX));
    for (name, value) in config.headers.iter().flatten() {
        xhr.set_request_header(name, value)?;
    }

    let (sender, receiver) = oneshot::channel();
    let slot: Slot = Rc::new(RefCell::new(Some(sender)));

    let loaded = {
        let xhr = xhr.clone();
        let slot = Rc::clone(&slot);
        Closure::once_into_js(move || notify(&slot, Outcome::Loaded(read(&xhr))))
    };
    let failed = {
        let slot = Rc::clone(&slot);
        Closure::once_into_js(move || notify(&slot, Outcome::NetworkError))
    };
    let timed_out = Closure::once_into_js(move || notify(&slot, Outcome::TimedOut));
    xhr.set_onload(Some(loaded.unchecked_ref()));
    xhr.set_onerror(Some(failed.unchecked_ref()));
    xhr.set_ontimeout(Some(timed_out.unchecked_ref()));

    let body = match &config.data {
        None => None,
        Some(Value::String(text)) => Some(text.clone()),
        Some(other) => Some(other.to_string()),
    };
    xhr.send_with_opt_str(body.as_deref())?;
    Ok(receiver)
}

fn notify(slot: &Slot, outcome: Outcome) {
    if let Some(sender) = slot.borrow_mut().take() {
        let _ = sender.send(outcome);
    }
}

fn read(xhr: &XmlHttpRequest) -> RawResponse {
    // Old IE reports 204 as 1223.
    let status = match xhr.status().unwrap_or_default() {
        1223 => 204,
        status => status,
    };
    RawResponse {
        status,
        status_text: xhr.status_text().unwrap_or_default(),
        headers: parse_headers(&xhr.get_all_response_headers().unwrap_or_default()),
        body: xhr.response_text().ok().flatten().unwrap_or_default(),
    }
}
