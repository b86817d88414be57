//! Resource probing against the flat backend namespace.
//!
//! The backend has no hierarchy. Whether a dialect path names an object, a
//! real container (a top-level container or a directory marker object), a
//! virtual container (no object, but deeper keys exist under its prefix) or
//! nothing at all is reconstructed here with one or two backend round trips:
//!
//! 1. `GET` on the exact path. 404 means absent; 200/204 means present, and
//!    the directory marker content type makes it a container.
//! 2. When the caller needs it, a listing of the owning container with
//!    `delimiter=/` and `prefix=<key>/`. Children under an absent path make
//!    it a virtual container.
//!
//! # Consistency
//!
//! Probes and the write that follows them are separate backend calls with no
//! lock between them. A concurrent request may create or delete a resource in
//! that window, so a probe result is a best-effort view that callers act on
//! optimistically. The backend remains the sole source of truth; no
//! per-path serialization is attempted.

use bytes::Bytes;
use cdmi_model::error::CdmiError;
use cdmi_model::headers::{APPLICATION_JSON, DIRECTORY_MARKER};
use cdmi_model::path::ResourcePath;
use cdmi_model::representation::ListingEntry;
use http::{HeaderMap, HeaderValue, StatusCode, header};
use tracing::debug;

use crate::backend::{Backend, BackendRequest, BackendResponse};
use crate::error::GatewayError;

/// One child of a container listing, with `name` and `subdir` entries unified.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChildEntry {
    /// Name relative to the listed container, without a trailing slash.
    pub name: String,
    /// Whether the child is itself a container.
    pub is_directory: bool,
}

impl ChildEntry {
    /// The name as rendered in `children`: sub-containers end in `/`.
    #[must_use]
    pub fn rendered(&self) -> String {
        if self.is_directory {
            format!("{}/", self.name)
        } else {
            self.name.clone()
        }
    }
}

/// What a probe learned about a path.
#[derive(Debug, Clone, Default)]
pub struct ProbeResult {
    /// A real backend object (or top-level container) exists at the path.
    pub exists: bool,
    /// The path is a container, real or virtual.
    pub is_container: bool,
    /// Status of the existence check, when the resource exists.
    pub status: Option<StatusCode>,
    /// Headers of the existing resource.
    pub headers: HeaderMap,
    /// Body of the existence check.
    pub body: Bytes,
    /// Children, when listed.
    pub children: Option<Vec<ChildEntry>>,
}

impl ProbeResult {
    /// Absent with no children.
    #[must_use]
    pub fn absent() -> Self {
        Self::default()
    }

    /// Present only because deeper keys exist under its prefix.
    #[must_use]
    pub fn is_virtual(&self) -> bool {
        !self.exists && self.is_container
    }

    /// Neither a real resource nor a virtual container.
    #[must_use]
    pub fn is_absent(&self) -> bool {
        !self.exists && !self.is_container
    }

    /// Rendered child names.
    #[must_use]
    pub fn rendered_children(&self) -> Vec<String> {
        self.children
            .as_deref()
            .unwrap_or_default()
            .iter()
            .map(ChildEntry::rendered)
            .collect()
    }
}

/// Whether a response carries the directory marker content type.
#[must_use]
pub fn is_directory_marker(headers: &HeaderMap) -> bool {
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct.to_ascii_lowercase().contains(DIRECTORY_MARKER))
}

/// Issues the probe requests for one inbound request.
#[derive(Debug, Clone, Copy)]
pub struct Prober<'a> {
    backend: &'a dyn Backend,
    api_prefix: &'a str,
    token: Option<&'a HeaderValue>,
}

impl<'a> Prober<'a> {
    /// Create a prober that forwards `token` on every call.
    #[must_use]
    pub fn new(backend: &'a dyn Backend, api_prefix: &'a str, token: Option<&'a HeaderValue>) -> Self {
        Self {
            backend,
            api_prefix,
            token,
        }
    }

    /// `GET` the exact backend path.
    ///
    /// Returns `None` on 404 and the response on 200/204. Any other status
    /// is surfaced to the client unchanged.
    pub async fn check_resource(&self, backend_path: &str) -> Result<Option<BackendResponse>, CdmiError> {
        let path = backend_path.trim_end_matches('/');
        let request = BackendRequest::get(path)
            .with_token(self.token)
            .with_header(header::ACCEPT, HeaderValue::from_static(APPLICATION_JSON));
        let resp = self.backend.send(request).await?;
        debug!(path, status = resp.status.as_u16(), "existence check");
        match resp.status {
            StatusCode::NOT_FOUND => Ok(None),
            StatusCode::OK | StatusCode::NO_CONTENT => Ok(Some(resp)),
            status => Err(GatewayError::UnexpectedStatus {
                status,
                path: path.to_owned(),
            }
            .into()),
        }
    }

    /// List the owning container of `path`.
    ///
    /// Returns `None` when the container does not exist. An empty listing
    /// (including a 204) is an empty vector. A body that is not a JSON
    /// listing is reported as `InconsistantState`.
    pub async fn listing(
        &self,
        path: &ResourcePath,
        prefix: Option<&str>,
        delimiter: Option<&str>,
    ) -> Result<Option<Vec<ListingEntry>>, CdmiError> {
        let container_path = path.container_backend_path(self.api_prefix);
        let mut request = BackendRequest::get(&container_path)
            .with_token(self.token)
            .with_header(header::ACCEPT, HeaderValue::from_static(APPLICATION_JSON))
            .with_query("format", "json");
        if let Some(delimiter) = delimiter {
            request = request.with_query("delimiter", delimiter);
        }
        if let Some(prefix) = prefix {
            request = request.with_query("prefix", prefix);
        }
        let resp = self.backend.send(request).await?;
        debug!(
            path = %container_path,
            prefix,
            status = resp.status.as_u16(),
            "container listing"
        );
        match resp.status {
            StatusCode::NOT_FOUND => Ok(None),
            StatusCode::NO_CONTENT => Ok(Some(Vec::new())),
            StatusCode::OK => parse_listing(&resp.body).map(Some),
            status => Err(GatewayError::UnexpectedStatus {
                status,
                path: container_path,
            }
            .into()),
        }
    }

    /// Direct children of `path`, relative to it.
    ///
    /// Entries that render to the same name are kept once, first wins; a
    /// directory marker object and the common prefix of its contents collapse
    /// into one child.
    pub async fn children(&self, path: &ResourcePath) -> Result<Option<Vec<ChildEntry>>, CdmiError> {
        let key = path.key();
        let prefix = if key.is_empty() {
            None
        } else {
            Some(format!("{key}/"))
        };
        let Some(entries) = self.listing(path, prefix.as_deref(), Some("/")).await? else {
            return Ok(None);
        };
        Ok(Some(children_from_listing(&entries, prefix.as_deref().unwrap_or(""))))
    }

    /// Determine what `path` is.
    ///
    /// When `want_children` is set, containers (real or virtual) come back
    /// with their children listed.
    pub async fn probe(&self, path: &ResourcePath, want_children: bool) -> Result<ProbeResult, CdmiError> {
        if let Some(resp) = self.check_resource(&path.backend_path(self.api_prefix)).await? {
            let is_container = is_directory_marker(&resp.headers) || !path.has_object();
            let children = if is_container && want_children {
                Some(self.children(path).await?.unwrap_or_default())
            } else {
                None
            };
            return Ok(ProbeResult {
                exists: true,
                is_container,
                status: Some(resp.status),
                headers: resp.headers,
                body: resp.body,
                children,
            });
        }

        // A missing top-level container cannot be virtual.
        if !path.has_object() {
            return Ok(ProbeResult::absent());
        }

        match self.children(path).await? {
            Some(children) if !children.is_empty() => {
                debug!(path = %path, children = children.len(), "virtual container");
                Ok(ProbeResult {
                    is_container: true,
                    children: Some(children),
                    ..ProbeResult::default()
                })
            }
            _ => Ok(ProbeResult::absent()),
        }
    }

    /// Check that a resource may be created under the parent of `path`.
    ///
    /// A nested parent must be a directory marker or a virtual container; a
    /// real non-container at the parent name is `InvalidContainerName`. A
    /// missing parent (or missing top-level container) is
    /// `NoParentContainer`.
    pub async fn check_parent(&self, path: &ResourcePath) -> Result<(), CdmiError> {
        if !path.has_object() {
            return Ok(());
        }
        let Some(parent_path) = path.parent_backend_path(self.api_prefix) else {
            return match self
                .check_resource(&path.container_backend_path(self.api_prefix))
                .await?
            {
                Some(_) => Ok(()),
                None => Err(CdmiError::no_parent_container(path.to_string())),
            };
        };

        if let Some(resp) = self.check_resource(&parent_path).await? {
            return if is_directory_marker(&resp.headers) {
                Ok(())
            } else {
                Err(cdmi_model::cdmi_error!(InvalidContainerName).with_resource(parent_path))
            };
        }

        let parent = path.parent.as_deref().unwrap_or_default();
        match self.listing(path, Some(&format!("{parent}/")), Some("/")).await? {
            Some(entries) if !entries.is_empty() => Ok(()),
            _ => Err(CdmiError::no_parent_container(parent_path)),
        }
    }

    /// Check that an object may be written at `path`.
    ///
    /// A directory marker or a virtual container at the name is a
    /// `Conflict`; an existing object is overwritten.
    pub async fn check_object_slot(&self, path: &ResourcePath) -> Result<(), CdmiError> {
        let backend_path = path.backend_path(self.api_prefix);
        if let Some(resp) = self.check_resource(&backend_path).await? {
            return if is_directory_marker(&resp.headers) {
                Err(CdmiError::conflict(backend_path))
            } else {
                Ok(())
            };
        }
        match self.children(path).await? {
            None => Err(CdmiError::no_parent_container(backend_path)),
            Some(children) if !children.is_empty() => Err(CdmiError::conflict(backend_path)),
            Some(_) => self.check_parent(path).await,
        }
    }

    /// Check that a container may be created (or updated) at `path`.
    ///
    /// An existing non-container object at the name is a `Conflict`.
    pub async fn check_container_slot(&self, path: &ResourcePath) -> Result<(), CdmiError> {
        let backend_path = path.backend_path(self.api_prefix);
        match self.check_resource(&backend_path).await? {
            Some(resp) if path.has_object() && !is_directory_marker(&resp.headers) => {
                Err(CdmiError::conflict(backend_path))
            }
            Some(_) => Ok(()),
            None => self.check_parent(path).await,
        }
    }
}

/// Parse a backend JSON listing. An empty body is an empty listing.
///
/// # Errors
///
/// Returns `InconsistantState` when the body is not a JSON listing.
pub fn parse_listing(body: &[u8]) -> Result<Vec<ListingEntry>, CdmiError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(Vec::new());
    }
    serde_json::from_slice(body)
        .map_err(|e| CdmiError::inconsistant_state("unparseable backend listing").with_source(e))
}

/// Reduce listing entries to children relative to `prefix`.
#[must_use]
pub fn children_from_listing(entries: &[ListingEntry], prefix: &str) -> Vec<ChildEntry> {
    let mut children: Vec<ChildEntry> = Vec::new();
    for entry in entries {
        let Some(full) = entry.display_name() else {
            continue;
        };
        let relative = full.strip_prefix(prefix).unwrap_or(full);
        let name = relative.trim_end_matches('/');
        if name.is_empty() {
            continue;
        }
        let child = ChildEntry {
            name: name.to_owned(),
            is_directory: relative.ends_with('/') || entry.is_directory(),
        };
        let rendered = child.rendered();
        if !children.iter().any(|c| c.rendered() == rendered) {
            children.push(child);
        }
    }
    children
}
