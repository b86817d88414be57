//! Path decomposition.
//!
//! A dialect path looks like `/<root>/<account>/<container>/<parent...>/<object>`
//! where `<root>` is the configured mount prefix (possibly several segments).
//! [`ResourcePath::decompose`] turns the part after the mount prefix into the
//! `{account, container, parent, object}` tuple the rest of the gateway works
//! with. It performs no I/O and never fails for well-formed input.

use std::fmt;

use percent_encoding::percent_decode_str;

use crate::error::{CdmiError, CdmiErrorCode};

/// Segments of a dialect request path.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResourcePath {
    /// Account segment.
    pub account: Option<String>,
    /// Top-level container segment.
    pub container: Option<String>,
    /// Slash-joined segments between container and object. An empty string
    /// means the object is a direct child of the container.
    pub parent: Option<String>,
    /// Final path segment, when the path is deeper than account/container.
    pub object: Option<String>,
    /// Whether the capability label was present.
    pub is_capability_request: bool,
}

impl ResourcePath {
    /// Decompose `path` after removing `root_len` mount-prefix segments.
    ///
    /// Leading and trailing slashes are trimmed and the rest is split on `/`
    /// without normalization, so a doubled slash before the container leaves
    /// an empty (`None`) account or container. Empty segments inside the tail
    /// are dropped when it is joined back together. If the first remaining
    /// segment is `capability_id`, it is consumed and the
    /// request is flagged as a capability request. The label is also
    /// recognized in container position (`<account>/<capability_id>/...`),
    /// which is the form the rendered `capabilitiesURI` values use.
    #[must_use]
    pub fn decompose(path: &str, root_len: usize, capability_id: &str) -> Self {
        let mut segments: Vec<&str> = path
            .trim_matches(|c| c == '/' || c == ' ')
            .split('/')
            .skip(root_len)
            .collect();
        // Pad so indexed access below never fails.
        segments.resize(segments.len().max(4), "");

        let mut is_capability_request = false;
        if segments[0] == capability_id {
            is_capability_request = true;
            segments.remove(0);
            segments.push("");
        } else if segments[1] == capability_id {
            is_capability_request = true;
            segments.remove(1);
            segments.push("");
        }

        let account = non_empty(segments[0]);
        let container = non_empty(segments[1]);
        let tail = concat_parts(&segments[2..]);

        let (parent, object) = if tail.is_empty() {
            (None, None)
        } else {
            match tail.rsplit_once('/') {
                Some((parent, object)) => (Some(parent.to_owned()), Some(object.to_owned())),
                None => (Some(String::new()), Some(tail)),
            }
        };

        Self {
            account,
            container,
            parent,
            object,
            is_capability_request,
        }
    }

    /// The `parent/object` key of this path inside its container, or an empty
    /// string for a top-level container.
    #[must_use]
    pub fn key(&self) -> String {
        concat_parts(&[
            self.parent.as_deref().unwrap_or(""),
            self.object.as_deref().unwrap_or(""),
        ])
    }

    /// The slash-joined `account/container/parent/object` tail.
    #[must_use]
    pub fn tail(&self) -> String {
        concat_parts(&[
            self.account.as_deref().unwrap_or(""),
            self.container.as_deref().unwrap_or(""),
            self.parent.as_deref().unwrap_or(""),
            self.object.as_deref().unwrap_or(""),
        ])
    }

    /// The backend path for this resource: `/<api_prefix>/<tail>`.
    #[must_use]
    pub fn backend_path(&self, api_prefix: &str) -> String {
        format!("/{}", concat_parts(&[api_prefix, &self.tail()]))
    }

    /// The backend path of the owning top-level container.
    #[must_use]
    pub fn container_backend_path(&self, api_prefix: &str) -> String {
        format!(
            "/{}",
            concat_parts(&[
                api_prefix,
                self.account.as_deref().unwrap_or(""),
                self.container.as_deref().unwrap_or(""),
            ])
        )
    }

    /// The backend path of the parent, when the resource has a non-root parent.
    #[must_use]
    pub fn parent_backend_path(&self, api_prefix: &str) -> Option<String> {
        let parent = self.parent.as_deref().filter(|p| !p.is_empty())?;
        Some(format!(
            "/{}",
            concat_parts(&[
                api_prefix,
                self.account.as_deref().unwrap_or(""),
                self.container.as_deref().unwrap_or(""),
                parent,
            ])
        ))
    }

    /// Whether the object segment is set (the path is below a top-level container).
    #[must_use]
    pub fn has_object(&self) -> bool {
        self.object.is_some()
    }
}

impl fmt::Display for ResourcePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "/{}", self.tail())
    }
}

/// Join the non-empty items with `/`.
#[must_use]
pub fn concat_parts(parts: &[&str]) -> String {
    parts
        .iter()
        .filter(|p| !p.is_empty())
        .copied()
        .collect::<Vec<_>>()
        .join("/")
}

/// Percent-decode a request path.
///
/// # Errors
///
/// Returns `InvalidURI` when the decoded bytes are not valid UTF-8.
pub fn decode_path(raw: &str) -> Result<String, CdmiError> {
    percent_decode_str(raw)
        .decode_utf8()
        .map(std::borrow::Cow::into_owned)
        .map_err(|e| CdmiError::new(CdmiErrorCode::InvalidURI).with_source(e))
}

fn non_empty(s: &str) -> Option<String> {
    if s.is_empty() {
        None
    } else {
        Some(s.to_owned())
    }
}
