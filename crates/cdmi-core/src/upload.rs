//! Segmented (partial) uploads.
//!
//! A partial upload is a sequence of object writes sharing an upload id. The
//! gateway keeps no session table; each request is mapped onto the backend's
//! large-object convention purely from its headers:
//!
//! - A request with `Content-Range: bytes=<start>-[<end>]` is stored as a
//!   segment object `<parent>/<object>_segments/<upload id>/<start>[-<end>]`,
//!   with both markers zero-padded to 20 digits so that key order is byte
//!   order.
//! - A final request (partial flag containing `false`) additionally makes the
//!   logical object a manifest pointing at the segment prefix. When the final
//!   request stored a segment, the manifest goes out as a follow-up `PUT`
//!   after the segment write; when it carries no payload, the manifest rides
//!   on the logical object write itself.
//! - A request with a payload but no range is stored as the next segment,
//!   starting one byte past the highest segment already stored.
//!
//! Segments from a sequence that never finishes are left behind; they are
//! addressed by upload id and can be collected out of band.

use cdmi_model::error::CdmiError;
use cdmi_model::headers::{CDMI_PARTIAL, CDMI_UPLOAD_ID};
use cdmi_model::path::{ResourcePath, concat_parts};
use http::{HeaderMap, header};
use tracing::debug;

use crate::probe::Prober;

const SEGMENTS_SUFFIX: &str = "_segments";

/// Upload state carried by one partial request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadSession {
    /// Client-supplied correlator.
    pub upload_id: String,
    /// This request completes the upload.
    pub is_final: bool,
    /// First byte of this request's payload, when a range was sent.
    pub range_start: Option<u64>,
    /// Last byte of this request's payload, when the range was closed.
    pub range_end: Option<u64>,
}

impl UploadSession {
    /// Derive the session from request headers.
    ///
    /// Returns `None` unless both the upload-id and the partial headers are
    /// present.
    ///
    /// # Errors
    ///
    /// Returns `InvalidRange` for a malformed `Content-Range`.
    pub fn from_headers(headers: &HeaderMap) -> Result<Option<Self>, CdmiError> {
        let header_str = |name: &str| headers.get(name).and_then(|v| v.to_str().ok());
        let (Some(upload_id), Some(partial)) = (header_str(CDMI_UPLOAD_ID), header_str(CDMI_PARTIAL))
        else {
            return Ok(None);
        };
        let (range_start, range_end) = match header_str(header::CONTENT_RANGE.as_str()) {
            Some(raw) => {
                let (start, end) = parse_content_range(raw)?;
                (Some(start), end)
            }
            None => (None, None),
        };
        Ok(Some(Self {
            upload_id: upload_id.trim().to_owned(),
            is_final: partial.to_ascii_lowercase().contains("false"),
            range_start,
            range_end,
        }))
    }

    /// The zero-padded `<start>[-<end>]` marker of this request's range.
    #[must_use]
    pub fn range_marker(&self) -> Option<String> {
        self.range_start.map(|start| segment_marker(start, self.range_end))
    }
}

/// Parse `bytes=<start>-[<end>]`.
///
/// # Errors
///
/// Returns `InvalidRange` for any other shape, when `end < start`, or when
/// the byte after `end` is not addressable.
pub fn parse_content_range(raw: &str) -> Result<(u64, Option<u64>), CdmiError> {
    let invalid = || CdmiError::invalid_range(raw.to_owned());
    let spec = raw.trim().strip_prefix("bytes=").ok_or_else(invalid)?;
    let (start, end) = spec.split_once('-').ok_or_else(invalid)?;
    let start = start.trim().parse::<u64>().map_err(|_| invalid())?;
    let end = match end.trim() {
        "" => None,
        end => {
            let end = end.parse::<u64>().map_err(|_| invalid())?;
            if end < start || end == u64::MAX {
                return Err(invalid());
            }
            Some(end)
        }
    };
    Ok((start, end))
}

/// `<start>[-<end>]`, each zero-padded to 20 digits.
#[must_use]
pub fn segment_marker(start: u64, end: Option<u64>) -> String {
    match end {
        Some(end) => format!("{start:020}-{end:020}"),
        None => format!("{start:020}"),
    }
}

/// Key prefix (inside the container) under which the segments of an upload
/// live, without a trailing slash.
#[must_use]
pub fn segment_prefix(path: &ResourcePath, upload_id: &str) -> String {
    let object = format!("{}{SEGMENTS_SUFFIX}", path.object.as_deref().unwrap_or_default());
    concat_parts(&[path.parent.as_deref().unwrap_or_default(), &object, upload_id])
}

/// The manifest header value: `<container>/<segment prefix>/`.
#[must_use]
pub fn manifest_value(path: &ResourcePath, upload_id: &str) -> String {
    format!(
        "{}/",
        concat_parts(&[
            path.container.as_deref().unwrap_or_default(),
            &segment_prefix(path, upload_id),
        ])
    )
}

/// How the manifest of a finished upload reaches the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ManifestMode {
    /// No manifest.
    None,
    /// On the main write, which targets the logical object.
    Inline,
    /// In a second, empty `PUT` to the logical object after the main write.
    FollowUp,
}

/// Where a write goes and what manifest handling follows it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WritePlan {
    /// Backend path of the main write.
    pub target_path: String,
    /// Backend path of the logical object.
    pub logical_path: String,
    /// Manifest header value, when the upload finishes with this request.
    pub manifest: Option<String>,
    /// How the manifest is delivered.
    pub mode: ManifestMode,
}

impl WritePlan {
    /// A plain write to the logical object.
    #[must_use]
    pub fn direct(path: &ResourcePath, api_prefix: &str) -> Self {
        let logical_path = path.backend_path(api_prefix);
        Self {
            target_path: logical_path.clone(),
            logical_path,
            manifest: None,
            mode: ManifestMode::None,
        }
    }

    /// Whether a manifest `PUT` must follow the main write.
    #[must_use]
    pub fn needs_follow_up(&self) -> bool {
        self.mode == ManifestMode::FollowUp
    }
}

/// Plan an object write, redirecting partial uploads to segment keys.
///
/// `payload_len` is the size of the value this request stores.
pub async fn plan_write(
    prober: &Prober<'_>,
    api_prefix: &str,
    path: &ResourcePath,
    session: Option<&UploadSession>,
    payload_len: u64,
) -> Result<WritePlan, CdmiError> {
    let Some(session) = session else {
        return Ok(WritePlan::direct(path, api_prefix));
    };

    let prefix = segment_prefix(path, &session.upload_id);
    let manifest = session
        .is_final
        .then(|| manifest_value(path, &session.upload_id));

    let overflow =
        || CdmiError::invalid_range(format!("{}: {payload_len} bytes", session.upload_id));
    if let (Some(start), None) = (session.range_start, session.range_end) {
        start.checked_add(payload_len).ok_or_else(overflow)?;
    }

    let marker = match session.range_marker() {
        Some(marker) => marker,
        None if session.is_final && payload_len == 0 => {
            let mut plan = WritePlan::direct(path, api_prefix);
            plan.manifest = manifest;
            plan.mode = ManifestMode::Inline;
            return Ok(plan);
        }
        None => {
            let start = next_segment_start(prober, path, &prefix).await?;
            let end = match payload_len {
                0 => None,
                len => Some(start.checked_add(len - 1).ok_or_else(overflow)?),
            };
            segment_marker(start, end)
        }
    };

    let target = ResourcePath {
        parent: Some(String::new()),
        object: Some(format!("{prefix}/{marker}")),
        ..path.clone()
    };
    let plan = WritePlan {
        target_path: target.backend_path(api_prefix),
        logical_path: path.backend_path(api_prefix),
        mode: if manifest.is_some() {
            ManifestMode::FollowUp
        } else {
            ManifestMode::None
        },
        manifest,
    };
    debug!(
        upload_id = %session.upload_id,
        target = %plan.target_path,
        is_final = session.is_final,
        "planned segment write"
    );
    Ok(plan)
}

/// One past the highest byte covered by the stored segments of an upload.
///
/// Fails with `InvalidRange` when a stored segment already reaches the end of
/// the addressable range.
async fn next_segment_start(
    prober: &Prober<'_>,
    path: &ResourcePath,
    prefix: &str,
) -> Result<u64, CdmiError> {
    let listing_prefix = format!("{prefix}/");
    let entries = prober
        .listing(path, Some(&listing_prefix), None)
        .await?
        .unwrap_or_default();
    let next = entries
        .iter()
        .filter_map(|entry| {
            let marker = entry.name.as_deref()?.strip_prefix(&listing_prefix)?;
            let (start, end) = match marker.split_once('-') {
                Some((start, end)) => (start.parse::<u64>().ok()?, Some(end.parse::<u64>().ok()?)),
                None => (marker.parse::<u64>().ok()?, None),
            };
            Some(match end {
                Some(end) => end.checked_add(1),
                None => start.checked_add(entry.bytes.unwrap_or(0)),
            })
        })
        .collect::<Option<Vec<_>>>()
        .ok_or_else(|| CdmiError::invalid_range(listing_prefix.clone()))?;
    Ok(next.into_iter().max().unwrap_or(0))
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;
    use cdmi_model::error::CdmiErrorCode;
    use http::HeaderValue;

    use super::*;
    use crate::backend::memory::InMemoryBackend;
    use crate::backend::{Backend, BackendRequest};

    fn path(raw: &str) -> ResourcePath {
        ResourcePath::decompose(raw, 1, "cdmi_capabilities")
    }

    fn headers(pairs: &[(&'static str, &'static str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (k, v) in pairs {
            map.insert(*k, HeaderValue::from_static(v));
        }
        map
    }

    #[test]
    fn test_should_require_both_upload_headers() {
        assert!(UploadSession::from_headers(&headers(&[("x-cdmi-uploadid", "u")]))
            .expect("ok")
            .is_none());
        let session = UploadSession::from_headers(&headers(&[
            ("x-cdmi-uploadid", "u1"),
            ("x-cdmi-partial", "false;count=3"),
            ("content-range", "bytes=0-5"),
        ]))
        .expect("ok")
        .expect("session");
        assert!(session.is_final);
        assert_eq!(session.range_start, Some(0));
        assert_eq!(session.range_end, Some(5));
    }

    #[test]
    fn test_should_reject_malformed_content_range() {
        let max = format!("bytes=0-{}", u64::MAX);
        for raw in ["bytes 0-5/10", "bytes=a-5", "bytes=9-2", "0-5", max.as_str()] {
            let err = parse_content_range(raw).unwrap_err();
            assert_eq!(err.code, CdmiErrorCode::InvalidRange, "{raw}");
        }
        assert_eq!(parse_content_range("bytes=7-").expect("open"), (7, None));
    }

    #[test]
    fn test_should_zero_pad_markers() {
        assert_eq!(segment_marker(5, None), "00000000000000000005");
        assert_eq!(
            segment_marker(0, Some(5)),
            "00000000000000000000-00000000000000000005"
        );
        assert!(segment_marker(9, None) < segment_marker(10, None));
    }

    #[test]
    fn test_should_build_segment_prefix_and_manifest() {
        let p = path("/cdmi/A/C/dir/obj");
        assert_eq!(segment_prefix(&p, "u1"), "dir/obj_segments/u1");
        assert_eq!(manifest_value(&p, "u1"), "C/dir/obj_segments/u1/");

        let p = path("/cdmi/A/C/obj");
        assert_eq!(manifest_value(&p, "u1"), "C/obj_segments/u1/");
    }

    #[tokio::test]
    async fn test_should_plan_ranged_final_write_with_follow_up() {
        let backend = InMemoryBackend::new("v1", "/auth/v1.0");
        let prober = Prober::new(&backend, "v1", None);
        let session = UploadSession {
            upload_id: "u1".to_owned(),
            is_final: true,
            range_start: Some(6),
            range_end: Some(9),
        };
        let plan = plan_write(&prober, "v1", &path("/cdmi/A/C/o"), Some(&session), 4)
            .await
            .expect("plan");
        assert_eq!(
            plan.target_path,
            "/v1/A/C/o_segments/u1/00000000000000000006-00000000000000000009"
        );
        assert_eq!(plan.logical_path, "/v1/A/C/o");
        assert_eq!(plan.manifest.as_deref(), Some("C/o_segments/u1/"));
        assert!(plan.needs_follow_up());
    }

    #[tokio::test]
    async fn test_should_put_manifest_inline_for_empty_final_request() {
        let backend = InMemoryBackend::new("v1", "/auth/v1.0");
        let prober = Prober::new(&backend, "v1", None);
        let session = UploadSession {
            upload_id: "u1".to_owned(),
            is_final: true,
            range_start: None,
            range_end: None,
        };
        let plan = plan_write(&prober, "v1", &path("/cdmi/A/C/o"), Some(&session), 0)
            .await
            .expect("plan");
        assert_eq!(plan.target_path, "/v1/A/C/o");
        assert_eq!(plan.mode, ManifestMode::Inline);
    }

    #[tokio::test]
    async fn test_should_append_unranged_payload_after_stored_segments() {
        let backend = InMemoryBackend::new("v1", "/auth/v1.0");
        backend.send(BackendRequest::put("/v1/A/C")).await.expect("container");
        backend
            .send(
                BackendRequest::put("/v1/A/C/o_segments/u1/00000000000000000000-00000000000000000005")
                    .with_body(Bytes::from_static(b"012345")),
            )
            .await
            .expect("segment");
        let prober = Prober::new(&backend, "v1", None);
        let session = UploadSession {
            upload_id: "u1".to_owned(),
            is_final: true,
            range_start: None,
            range_end: None,
        };
        let plan = plan_write(&prober, "v1", &path("/cdmi/A/C/o"), Some(&session), 3)
            .await
            .expect("plan");
        assert_eq!(
            plan.target_path,
            "/v1/A/C/o_segments/u1/00000000000000000006-00000000000000000008"
        );
        assert!(plan.needs_follow_up());
    }

    #[tokio::test]
    async fn test_should_reject_segment_past_addressable_range() {
        let backend = InMemoryBackend::new("v1", "/auth/v1.0");
        backend.send(BackendRequest::put("/v1/A/C")).await.expect("container");
        let marker = segment_marker(u64::MAX - 1, Some(u64::MAX));
        backend
            .send(
                BackendRequest::put(format!("/v1/A/C/big_segments/u/{marker}"))
                    .with_body(Bytes::from_static(b"xy")),
            )
            .await
            .expect("segment");
        let prober = Prober::new(&backend, "v1", None);
        let session = UploadSession {
            upload_id: "u".to_owned(),
            is_final: true,
            range_start: None,
            range_end: None,
        };
        let err = plan_write(&prober, "v1", &path("/cdmi/A/C/big"), Some(&session), 3)
            .await
            .unwrap_err();
        assert_eq!(err.code, CdmiErrorCode::InvalidRange);
    }

    #[tokio::test]
    async fn test_should_reject_open_range_that_overflows_with_payload() {
        let backend = InMemoryBackend::new("v1", "/auth/v1.0");
        let prober = Prober::new(&backend, "v1", None);
        let session = UploadSession {
            upload_id: "u".to_owned(),
            is_final: false,
            range_start: Some(u64::MAX - 1),
            range_end: None,
        };
        let err = plan_write(&prober, "v1", &path("/cdmi/A/C/big"), Some(&session), 5)
            .await
            .unwrap_err();
        assert_eq!(err.code, CdmiErrorCode::InvalidRange);
    }

    #[tokio::test]
    async fn test_should_write_directly_without_session() {
        let backend = InMemoryBackend::new("v1", "/auth/v1.0");
        let prober = Prober::new(&backend, "v1", None);
        let plan = plan_write(&prober, "v1", &path("/cdmi/A/C/d/o"), None, 10)
            .await
            .expect("plan");
        assert_eq!(plan, WritePlan::direct(&path("/cdmi/A/C/d/o"), "v1"));
        assert_eq!(plan.target_path, "/v1/A/C/d/o");
    }
}
