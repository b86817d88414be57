//! Metadata codec.
//!
//! The backend stores user metadata as headers. Each dialect metadata entry
//! becomes one header named `<prefix><key>` whose value is `"<key>:<value>"`.
//! The key is repeated in the value because header names are
//! case-insensitive and the backend lowercases them; the value copy keeps the
//! original spelling. Empty values are stored as an empty header value, in
//! which case the key is recovered from the header name.

use std::collections::BTreeMap;

use http::header::{HeaderMap, HeaderName, HeaderValue};
use serde::{Deserialize, Serialize};

use crate::error::{CdmiError, CdmiErrorCode};

/// A string-to-string metadata mapping.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MetadataMap(BTreeMap<String, String>);

impl MetadataMap {
    /// Create an empty map.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an entry.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.insert(key.into(), value.into());
    }

    /// Look up an entry.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the map is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate over entries in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Build a map from a JSON `metadata` object. Non-string values are
    /// stored as their JSON text.
    #[must_use]
    pub fn from_json(object: &serde_json::Map<String, serde_json::Value>) -> Self {
        object
            .iter()
            .map(|(k, v)| {
                let value = match v {
                    serde_json::Value::String(s) => s.clone(),
                    other => other.to_string(),
                };
                (k.clone(), value)
            })
            .collect()
    }

    /// Decode every header under `prefix`.
    #[must_use]
    pub fn from_headers(headers: &HeaderMap, prefix: &str) -> Self {
        let mut map = Self::new();
        for (name, value) in headers {
            let Some(suffix) = name.as_str().strip_prefix(prefix) else {
                continue;
            };
            let Ok(raw) = value.to_str() else {
                continue;
            };
            if let Some((key, value)) = decode_entry(suffix, raw) {
                map.insert(key, value);
            }
        }
        map
    }

    /// Encode every entry as a header under `prefix` into `headers`.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` when a key cannot form a header name or a
    /// value cannot form a header value.
    pub fn write_headers(&self, headers: &mut HeaderMap, prefix: &str) -> Result<(), CdmiError> {
        for (key, value) in self.iter() {
            let (name, value) = encode_entry(prefix, key, value)?;
            headers.insert(name, value);
        }
        Ok(())
    }
}

impl FromIterator<(String, String)> for MetadataMap {
    fn from_iter<T: IntoIterator<Item = (String, String)>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Encode one entry as a `(header name, header value)` pair.
///
/// # Errors
///
/// Returns `InvalidArgument` when the key or value is not header-safe.
pub fn encode_entry(
    prefix: &str,
    key: &str,
    value: &str,
) -> Result<(HeaderName, HeaderValue), CdmiError> {
    let name = HeaderName::from_bytes(format!("{prefix}{key}").to_ascii_lowercase().as_bytes())
        .map_err(|e| {
            CdmiError::with_message(
                CdmiErrorCode::InvalidArgument,
                format!("metadata key is not a valid header name: {key}"),
            )
            .with_source(e)
        })?;
    let raw = if value.is_empty() {
        String::new()
    } else {
        format!("{key}:{value}")
    };
    let value = HeaderValue::from_str(&raw).map_err(|e| {
        CdmiError::with_message(
            CdmiErrorCode::InvalidArgument,
            format!("metadata value is not a valid header value for key {key}"),
        )
        .with_source(e)
    })?;
    Ok((name, value))
}

/// Decode one header under the metadata prefix.
///
/// `name_suffix` is the header name with the prefix removed. Returns `None`
/// when the header carries no usable key.
#[must_use]
pub fn decode_entry(name_suffix: &str, raw: &str) -> Option<(String, String)> {
    if raw.is_empty() {
        return (!name_suffix.is_empty()).then(|| (name_suffix.to_owned(), String::new()));
    }
    let (key, value) = raw.split_once(':').unwrap_or((raw, ""));
    if key.is_empty() {
        return None;
    }
    Some((key.to_owned(), value.to_owned()))
}
