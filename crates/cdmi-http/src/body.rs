//! Response body type for the gateway.
//!
//! Every response the gateway produces is small enough to buffer: JSON
//! representations, text error bodies, or object values already read from the
//! backend. [`CdmiResponseBody`] therefore only has a buffered and an empty
//! mode.

use std::pin::Pin;
use std::task::{Context, Poll};

use bytes::Bytes;
use http_body_util::Full;

/// Gateway response body.
///
/// Implements [`http_body::Body`] so it can be used directly with hyper responses.
#[derive(Debug, Default)]
pub enum CdmiResponseBody {
    /// Buffered body: JSON documents, error text, object bytes.
    Buffered(Full<Bytes>),
    /// No body (204 responses, writes that return no representation).
    #[default]
    Empty,
}

impl CdmiResponseBody {
    /// Create a buffered body from bytes.
    #[must_use]
    pub fn from_bytes(data: impl Into<Bytes>) -> Self {
        Self::Buffered(Full::new(data.into()))
    }

    /// Create an empty body.
    #[must_use]
    pub fn empty() -> Self {
        Self::Empty
    }

    /// Create a buffered body from a UTF-8 string.
    #[must_use]
    pub fn from_string(s: impl Into<String>) -> Self {
        Self::Buffered(Full::new(Bytes::from(s.into())))
    }
}

impl http_body::Body for CdmiResponseBody {
    type Data = Bytes;
    type Error = std::io::Error;

    fn poll_frame(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Option<Result<http_body::Frame<Self::Data>, Self::Error>>> {
        match self.get_mut() {
            Self::Buffered(full) => Pin::new(full)
                .poll_frame(cx)
                .map_err(|never| match never {}),
            Self::Empty => Poll::Ready(None),
        }
    }

    fn is_end_stream(&self) -> bool {
        match self {
            Self::Buffered(full) => full.is_end_stream(),
            Self::Empty => true,
        }
    }

    fn size_hint(&self) -> http_body::SizeHint {
        match self {
            Self::Buffered(full) => full.size_hint(),
            Self::Empty => http_body::SizeHint::with_exact(0),
        }
    }
}

/// Collect a response body into bytes. Used by tests and by callers that
/// need to inspect a rendered response.
///
/// # Errors
///
/// Never fails for [`CdmiResponseBody`]; the error type is kept for the
/// `http_body` contract.
pub async fn collect_bytes(body: CdmiResponseBody) -> Result<Bytes, std::io::Error> {
    use http_body_util::BodyExt;
    Ok(body.collect().await?.to_bytes())
}
