//! Inbound body transcoding and read-query translation.
//!
//! Object writes arrive in one of three shapes:
//!
//! 1. `multipart/mixed`: JSON envelope parts plus value parts.
//! 2. A dialect JSON envelope.
//! 3. A raw payload (non-dialect writes).
//!
//! [`decode_object_body`] reduces all three to an [`ObjectBody`]. Container
//! writes only carry metadata and go through [`decode_container_body`].

use base64::Engine;
use bytes::Bytes;
use cdmi_model::error::{CdmiError, CdmiErrorCode};
use cdmi_model::headers::{ENCODING_BASE64, MULTIPART_MIXED};
use cdmi_model::metadata::MetadataMap;
use cdmi_model::representation::{ContainerEnvelope, ObjectEnvelope};

use crate::multipart::{extract_boundary, parse_mixed};

/// Query key that requests a byte sub-range of an object value.
pub const VALUE_RANGE_QUERY: &str = "value:bytes";

/// A decoded object write.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ObjectBody {
    /// Value as received. Base64 values are still encoded; see
    /// [`ObjectBody::decoded_value`].
    pub value: Option<Bytes>,
    /// Content type to store the value with.
    pub mimetype: Option<String>,
    /// Raw metadata object from the envelope.
    pub metadata: Option<serde_json::Map<String, serde_json::Value>>,
    /// `valuetransferencoding` from the envelope.
    pub value_transfer_encoding: Option<String>,
    /// Server-side copy source.
    pub copy: Option<String>,
}

impl ObjectBody {
    fn apply_envelope(&mut self, envelope: ObjectEnvelope) {
        if let Some(value) = envelope.value {
            self.value = Some(Bytes::from(value));
        }
        if envelope.mimetype.is_some() {
            self.mimetype = envelope.mimetype;
        }
        if envelope.metadata.is_some() {
            self.metadata = envelope.metadata;
        }
        if envelope.valuetransferencoding.is_some() {
            self.value_transfer_encoding = envelope.valuetransferencoding;
        }
        if envelope.copy.is_some() {
            self.copy = envelope.copy;
        }
    }

    /// Metadata entries as a [`MetadataMap`].
    #[must_use]
    pub fn metadata_map(&self) -> MetadataMap {
        self.metadata
            .as_ref()
            .map(MetadataMap::from_json)
            .unwrap_or_default()
    }

    /// Whether the value is declared as base64.
    #[must_use]
    pub fn is_base64(&self) -> bool {
        self.value_transfer_encoding
            .as_deref()
            .is_some_and(|e| e.eq_ignore_ascii_case(ENCODING_BASE64))
    }

    /// The bytes to store: the value, base64-decoded when declared so.
    ///
    /// # Errors
    ///
    /// Returns `InvalidContent` when a base64 value does not decode.
    pub fn decoded_value(&self) -> Result<Bytes, CdmiError> {
        let value = self.value.clone().unwrap_or_default();
        if !self.is_base64() {
            return Ok(value);
        }
        let compact: Vec<u8> = value
            .iter()
            .copied()
            .filter(|b| !b.is_ascii_whitespace())
            .collect();
        base64::engine::general_purpose::STANDARD
            .decode(compact)
            .map(Bytes::from)
            .map_err(|e| {
                CdmiError::with_message(
                    CdmiErrorCode::InvalidContent,
                    "value is declared base64 but does not decode",
                )
                .with_source(e)
            })
    }
}

/// Decode an object write body.
///
/// `content_type` is the request's `Content-Type`; `dialect` selects JSON
/// envelope handling for non-multi-part bodies and for envelope parts.
///
/// # Errors
///
/// Returns `InvalidBody` when the multi-part body or a JSON envelope cannot
/// be parsed.
pub fn decode_object_body(
    content_type: &str,
    body: &[u8],
    dialect: bool,
) -> Result<ObjectBody, CdmiError> {
    let raw_content_type = content_type;
    let content_type = content_type.to_ascii_lowercase();
    let mut decoded = ObjectBody::default();

    if content_type.contains(MULTIPART_MIXED) {
        let boundary = extract_boundary(raw_content_type)?;
        for part in parse_mixed(body, &boundary)? {
            if dialect && part.content_type.contains("cdmi-object") {
                decoded.apply_envelope(parse_envelope(&part.body)?);
            } else {
                decoded.value = Some(part.body);
                decoded.mimetype = Some(part.content_type);
            }
        }
    } else if dialect {
        decoded.apply_envelope(parse_envelope(body)?);
        if decoded.mimetype.is_none() {
            decoded.mimetype = Some(content_type);
        }
    } else {
        decoded.value = Some(Bytes::copy_from_slice(body));
        decoded.mimetype = Some(content_type);
    }

    Ok(decoded)
}

fn parse_envelope(body: &[u8]) -> Result<ObjectEnvelope, CdmiError> {
    serde_json::from_slice(body).map_err(|e| {
        CdmiError::with_message(
            CdmiErrorCode::InvalidBody,
            "object envelope is not valid JSON",
        )
        .with_source(e)
    })
}

/// Decode a container write body into its metadata. An empty body carries
/// no metadata.
///
/// # Errors
///
/// Returns `InvalidContent` when a non-empty body is not a JSON envelope.
pub fn decode_container_body(body: &[u8]) -> Result<MetadataMap, CdmiError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(MetadataMap::new());
    }
    let envelope: ContainerEnvelope = serde_json::from_slice(body).map_err(|e| {
        CdmiError::with_message(
            CdmiErrorCode::InvalidContent,
            "container envelope is not valid JSON",
        )
        .with_source(e)
    })?;
    Ok(envelope
        .metadata
        .as_ref()
        .map(MetadataMap::from_json)
        .unwrap_or_default())
}

/// A read query split into the backend `Range` header and the remaining
/// parameters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReadQuery {
    /// `bytes=<range>` derived from the value range parameter.
    pub range: Option<String>,
    /// All other parameters, unchanged.
    pub params: Vec<(String, String)>,
}

impl ReadQuery {
    /// Translate the client's query parameters.
    ///
    /// The value range key matches case-insensitively.
    #[must_use]
    pub fn from_params(params: &[(String, String)]) -> Self {
        let mut query = Self::default();
        for (key, value) in params {
            if key.eq_ignore_ascii_case(VALUE_RANGE_QUERY) {
                query.range = Some(format!("bytes={}", value.trim()));
            } else {
                query.params.push((key.clone(), value.clone()));
            }
        }
        query
    }
}
