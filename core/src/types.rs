//! Request configuration and the deep merge that combines configs.
//!
//! # Design
//! `RequestConfig` names the keys the pipeline understands and carries every
//! other key in `extra`, so environment-specific options survive merging and
//! reach the adapter untouched. Merging works on the JSON mapping form of a
//! config: nested mappings merge key by key, everything else is replaced by
//! the later source. `serde_json` is built with `preserve_order`, which keeps
//! keys in first-seen order across sources.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::Error;

/// Header names to values. Request headers keep caller casing; response
/// headers are lower-cased by the adapters.
pub type Headers = IndexMap<String, String>;

/// Options for a single request, or the defaults of a client.
///
/// Every field is optional so that a partial config can override another one
/// through [`RequestConfig::merge`]. Absent fields never override.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RequestConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    #[serde(rename = "baseURL", default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,

    /// Query parameters appended to the URL during normalization.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Map<String, Value>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub headers: Option<Headers>,

    /// Request body. Objects and arrays are sent as JSON on methods that
    /// carry a body.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,

    /// Transport timeout in milliseconds. `0` disables the timeout.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<u64>,

    /// Keys the pipeline does not interpret.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl RequestConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn method(mut self, method: impl Into<String>) -> Self {
        self.method = Some(method.into());
        self
    }

    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    pub fn param(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.params
            .get_or_insert_with(Map::new)
            .insert(name.into(), value.into());
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers
            .get_or_insert_with(Headers::new)
            .insert(name.into(), value.into());
        self
    }

    pub fn data(mut self, data: impl Into<Value>) -> Self {
        self.data = Some(data.into());
        self
    }

    pub fn timeout(mut self, millis: u64) -> Self {
        self.timeout = Some(millis);
        self
    }

    pub fn extra(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }

    /// Deep-merge `overrides` on top of `base`, returning a new config.
    pub fn merge(base: &RequestConfig, overrides: &RequestConfig) -> Result<RequestConfig, Error> {
        let merged = merge([Some(&base.to_map()?), Some(&overrides.to_map()?)]);
        Self::from_map(merged)
    }

    /// The JSON mapping form of this config, using wire key names.
    pub fn to_map(&self) -> Result<Map<String, Value>, Error> {
        match serde_json::to_value(self).map_err(|e| Error::Encode(e.to_string()))? {
            Value::Object(map) => Ok(map),
            other => Err(Error::Encode(format!("config serialized to non-object: {other}"))),
        }
    }

    pub fn from_map(map: Map<String, Value>) -> Result<RequestConfig, Error> {
        Self::from_value(Value::Object(map))
    }

    /// Read a config from a JSON value, e.g. one loaded from a file.
    pub fn from_value(value: Value) -> Result<RequestConfig, Error> {
        serde_json::from_value(value).map_err(|e| Error::Encode(e.to_string()))
    }
}

/// Deep-merge JSON mappings, later sources winning per key.
///
/// `None` sources are skipped. When both the accumulated value and the
/// incoming value under a key are mappings, they are merged recursively;
/// otherwise the incoming value replaces the accumulated one (arrays
/// included). No source is modified.
pub fn merge<'a, I>(sources: I) -> Map<String, Value>
where
    I: IntoIterator<Item = Option<&'a Map<String, Value>>>,
{
    sources.into_iter().flatten().fold(Map::new(), |mut acc, source| {
        for (key, incoming) in source {
            let merged = match (acc.get(key), incoming) {
                (Some(Value::Object(current)), Value::Object(next)) => {
                    Value::Object(merge([Some(current), Some(next)]))
                }
                _ => incoming.clone(),
            };
            acc.insert(key.clone(), merged);
        }
        acc
    })
}
