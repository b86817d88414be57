//! Backend object store abstraction.
//!
//! The gateway talks to a flat, Swift-like object store through its REST
//! surface: `GET`/`PUT`/`DELETE` on `/<api>/<account>/<container>/<key>`,
//! JSON listings with `delimiter`/`prefix`, and metadata carried as headers.
//! [`Backend`] is the single seam over that surface. Two implementations ship
//! with the crate:
//!
//! - [`HttpBackend`](remote::HttpBackend): forwards to a remote store.
//! - [`InMemoryBackend`](memory::InMemoryBackend): a process-local emulation
//!   used for tests and local development.

pub mod memory;
pub mod remote;

use async_trait::async_trait;
use bytes::Bytes;
use cdmi_model::headers::AUTH_TOKEN;
use http::{HeaderMap, HeaderName, HeaderValue, Method, StatusCode};
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};

use crate::error::GatewayError;

/// Characters escaped inside one backend path segment.
///
/// Everything except RFC 3986 unreserved characters is encoded, so `?`, `#`,
/// `%` and spaces in object names stay part of the key.
const SEGMENT_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

/// One outbound backend request.
#[derive(Debug, Clone)]
pub struct BackendRequest {
    /// HTTP method.
    pub method: Method,
    /// Absolute backend path, e.g. `/v1/acct/photos/cat.jpg`, unencoded.
    pub path: String,
    /// Query parameters, encoded on send.
    pub query: Vec<(String, String)>,
    /// Request headers.
    pub headers: HeaderMap,
    /// Request body.
    pub body: Bytes,
}

impl BackendRequest {
    /// A request with no query, headers or body.
    #[must_use]
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            headers: HeaderMap::new(),
            body: Bytes::new(),
        }
    }

    /// Shorthand for a `GET`.
    #[must_use]
    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    /// Shorthand for a `PUT`.
    #[must_use]
    pub fn put(path: impl Into<String>) -> Self {
        Self::new(Method::PUT, path)
    }

    /// Shorthand for a `DELETE`.
    #[must_use]
    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    /// Append a query parameter.
    #[must_use]
    pub fn with_query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    /// Append several query parameters.
    #[must_use]
    pub fn with_query_pairs(mut self, pairs: impl IntoIterator<Item = (String, String)>) -> Self {
        self.query.extend(pairs);
        self
    }

    /// Set a header.
    #[must_use]
    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Set the auth token header when a token is present.
    #[must_use]
    pub fn with_token(mut self, token: Option<&HeaderValue>) -> Self {
        if let Some(token) = token {
            self.headers
                .insert(HeaderName::from_static(AUTH_TOKEN), token.clone());
        }
        self
    }

    /// Set the body.
    #[must_use]
    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    /// The percent-encoded path plus the encoded query string.
    #[must_use]
    pub fn path_and_query(&self) -> String {
        let path = self
            .path
            .split('/')
            .map(|segment| utf8_percent_encode(segment, SEGMENT_ENCODE_SET).to_string())
            .collect::<Vec<_>>()
            .join("/");
        if self.query.is_empty() {
            return path;
        }
        let query = form_urlencoded::Serializer::new(String::new())
            .extend_pairs(self.query.iter())
            .finish();
        format!("{path}?{query}")
    }
}

/// One backend response, fully buffered.
#[derive(Debug, Clone)]
pub struct BackendResponse {
    /// Status code.
    pub status: StatusCode,
    /// Response headers.
    pub headers: HeaderMap,
    /// Response body.
    pub body: Bytes,
}

impl BackendResponse {
    /// A response with a status and no headers or body.
    #[must_use]
    pub fn status(status: StatusCode) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            body: Bytes::new(),
        }
    }

    /// A header value as a string, if present and valid.
    #[must_use]
    pub fn header_str(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// The `Content-Type` header, or an empty string.
    #[must_use]
    pub fn content_type(&self) -> &str {
        self.header_str(http::header::CONTENT_TYPE.as_str())
            .unwrap_or("")
    }
}

/// The flat object store behind the gateway.
///
/// Implementations return `Ok` for every HTTP answer, including error
/// statuses; `Err` is reserved for transport-level failures. Dropping the
/// returned future cancels the in-flight call.
#[async_trait]
pub trait Backend: Send + Sync + std::fmt::Debug {
    /// Send one request and buffer the full response.
    async fn send(&self, request: BackendRequest) -> Result<BackendResponse, GatewayError>;
}

/// Derive the token to forward to the backend from the inbound auth header.
///
/// Some token issuers prepend `<account>,` to the token. The value is split
/// on the first comma; the remainder is used unless it is empty, in which
/// case the whole value is forwarded.
#[must_use]
pub fn forward_token(inbound: Option<&HeaderValue>) -> Option<HeaderValue> {
    let inbound = inbound?;
    let Ok(raw) = inbound.to_str() else {
        return Some(inbound.clone());
    };
    match raw.split_once(',') {
        Some((_, rest)) if !rest.trim().is_empty() => {
            HeaderValue::from_str(rest.trim()).ok().or_else(|| Some(inbound.clone()))
        }
        _ => Some(inbound.clone()),
    }
}
