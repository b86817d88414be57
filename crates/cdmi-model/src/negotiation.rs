//! Content negotiation flags derived from request headers.

use crate::headers;

/// Expected shape of the representation a handler should render.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AcceptOverride {
    /// Use what the client sent.
    #[default]
    None,
    /// Render a container representation.
    Container,
    /// Render a capability representation.
    Capability,
}

/// Routing-relevant facts about a request's headers and path.
///
/// Recomputed for every request; the router may set [`accept_override`]
/// so that handlers do not need to re-derive intent.
///
/// [`accept_override`]: NegotiationContext::accept_override
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NegotiationContext {
    /// `Content-Type` names a dialect container.
    pub content_is_container: bool,
    /// `Content-Type` names a dialect object or a multi-part body.
    pub content_is_object: bool,
    /// `Accept` names a dialect container.
    pub accept_is_container: bool,
    /// `Accept` names a dialect object.
    pub accept_is_object: bool,
    /// The raw request path ended in `/`.
    pub has_trailing_slash: bool,
    /// Value of the dialect version header, if present.
    pub dialect_version: Option<String>,
    /// Intent forced by the router.
    pub accept_override: AcceptOverride,
}

impl NegotiationContext {
    /// Derive the context from request headers and the raw path.
    #[must_use]
    pub fn from_request(headers: &http::HeaderMap, path: &str) -> Self {
        let content_type = header_lower(headers, http::header::CONTENT_TYPE.as_str());
        let accept = header_lower(headers, http::header::ACCEPT.as_str());
        let dialect_version = headers
            .get(headers::CDMI_VERSION)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.trim().to_owned())
            .filter(|v| !v.is_empty());

        Self {
            content_is_container: content_type.contains(headers::CDMI_CONTAINER),
            content_is_object: content_type.contains("multipart/")
                || content_type.contains(headers::CDMI_OBJECT),
            accept_is_container: accept.contains(headers::CDMI_CONTAINER),
            accept_is_object: accept.contains(headers::CDMI_OBJECT),
            has_trailing_slash: path.ends_with('/'),
            dialect_version,
            accept_override: AcceptOverride::None,
        }
    }

    /// Whether this is a dialect request.
    #[must_use]
    pub fn is_dialect(&self) -> bool {
        self.dialect_version.is_some()
    }

    /// Whether a read should expect a container.
    #[must_use]
    pub fn wants_container(&self) -> bool {
        self.accept_override == AcceptOverride::Container
            || self.content_is_container
            || self.accept_is_container
            || self.has_trailing_slash
    }
}

fn header_lower(headers: &http::HeaderMap, name: &str) -> String {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .to_ascii_lowercase()
}
