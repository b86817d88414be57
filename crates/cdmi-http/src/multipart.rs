//! `multipart/mixed` parser for object writes.
//!
//! A multi-part object write carries a JSON envelope part
//! (`application/cdmi-object`) and one or more value parts. This parser works
//! on the already-collected body and returns every part in order; the body
//! transcoder decides what each part means.

use base64::Engine;
use bytes::Bytes;
use cdmi_model::error::{CdmiError, CdmiErrorCode};

/// Content type assumed for a part without a `Content-Type` header.
const DEFAULT_PART_TYPE: &str = "text/plain";

/// One decoded MIME part.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MimePart {
    /// Lowercased media type without parameters.
    pub content_type: String,
    /// Payload after transfer decoding.
    pub body: Bytes,
}

/// Extract the boundary parameter of a `multipart/*` content type.
///
/// # Errors
///
/// Returns `InvalidBody` if the content type does not parse, is not
/// multi-part, or lacks a boundary.
pub fn extract_boundary(content_type: &str) -> Result<String, CdmiError> {
    let parsed: mime::Mime = content_type.parse().map_err(|e| {
        CdmiError::with_message(
            CdmiErrorCode::InvalidBody,
            format!("unparseable content type: {content_type}"),
        )
        .with_source(e)
    })?;
    if parsed.type_() != mime::MULTIPART {
        return Err(CdmiError::with_message(
            CdmiErrorCode::InvalidBody,
            format!("expected a multipart content type, got: {content_type}"),
        ));
    }
    parsed
        .get_param(mime::BOUNDARY)
        .map(|b| b.as_str().to_owned())
        .filter(|b| !b.is_empty())
        .ok_or_else(|| {
            CdmiError::with_message(CdmiErrorCode::InvalidBody, "missing multipart boundary")
        })
}

/// Parse a `multipart/mixed` body into its parts.
///
/// # Errors
///
/// Returns `InvalidBody` if no boundary delimiter is present or a part
/// declares base64 transfer encoding with an undecodable payload.
pub fn parse_mixed(body: &[u8], boundary: &str) -> Result<Vec<MimePart>, CdmiError> {
    let delimiter = format!("--{boundary}");
    let raw_parts = split_parts(body, delimiter.as_bytes()).ok_or_else(|| {
        CdmiError::with_message(
            CdmiErrorCode::InvalidBody,
            "multipart body contains no boundary delimiter",
        )
    })?;

    raw_parts.into_iter().map(decode_part).collect()
}

fn decode_part(raw: &[u8]) -> Result<MimePart, CdmiError> {
    let (headers, payload) = split_headers_body(raw);
    let headers = String::from_utf8_lossy(headers);

    let mut content_type = DEFAULT_PART_TYPE.to_owned();
    let mut transfer_encoding = String::new();
    for line in headers.lines() {
        let Some((name, value)) = line.split_once(':') else {
            continue;
        };
        let value = value.trim();
        match name.trim().to_ascii_lowercase().as_str() {
            "content-type" => {
                content_type = value
                    .parse::<mime::Mime>()
                    .map_or_else(|_| value.to_ascii_lowercase(), |m| m.essence_str().to_owned());
            }
            "content-transfer-encoding" => transfer_encoding = value.to_ascii_lowercase(),
            _ => {}
        }
    }

    let body = if transfer_encoding == "base64" {
        let compact: Vec<u8> = payload
            .iter()
            .copied()
            .filter(|b| !b.is_ascii_whitespace())
            .collect();
        let decoded = base64::engine::general_purpose::STANDARD
            .decode(compact)
            .map_err(|e| {
                CdmiError::with_message(
                    CdmiErrorCode::InvalidBody,
                    "multipart part has invalid base64 payload",
                )
                .with_source(e)
            })?;
        Bytes::from(decoded)
    } else {
        Bytes::copy_from_slice(payload)
    };

    Ok(MimePart { content_type, body })
}

/// Split the body on the delimiter, skipping the preamble and the epilogue.
fn split_parts<'a>(body: &'a [u8], delimiter: &[u8]) -> Option<Vec<&'a [u8]>> {
    let first = find_bytes(body, delimiter)?;
    let mut remaining = &body[first + delimiter.len()..];
    let mut parts = Vec::new();

    loop {
        if remaining.starts_with(b"--") {
            break;
        }
        remaining = skip_line_break(remaining);
        match find_bytes(remaining, delimiter) {
            Some(pos) => {
                parts.push(strip_line_break(&remaining[..pos]));
                remaining = &remaining[pos + delimiter.len()..];
            }
            None => {
                let part = strip_line_break(remaining);
                if !part.is_empty() {
                    parts.push(part);
                }
                break;
            }
        }
    }

    Some(parts)
}

/// Split a part into headers and payload at the first blank line.
fn split_headers_body(part: &[u8]) -> (&[u8], &[u8]) {
    if let Some(rest) = part.strip_prefix(b"\r\n") {
        return (&[], rest);
    }
    if let Some(pos) = find_bytes(part, b"\r\n\r\n") {
        return (&part[..pos], &part[pos + 4..]);
    }
    if let Some(pos) = find_bytes(part, b"\n\n") {
        return (&part[..pos], &part[pos + 2..]);
    }
    (part, &[])
}

fn find_bytes(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() || needle.len() > haystack.len() {
        return None;
    }
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}

fn skip_line_break(data: &[u8]) -> &[u8] {
    data.strip_prefix(b"\r\n")
        .or_else(|| data.strip_prefix(b"\n"))
        .unwrap_or(data)
}

fn strip_line_break(data: &[u8]) -> &[u8] {
    data.strip_suffix(b"\r\n")
        .or_else(|| data.strip_suffix(b"\n"))
        .unwrap_or(data)
}
