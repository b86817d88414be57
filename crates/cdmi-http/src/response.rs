//! Response rendering helpers.

use bytes::Bytes;
use cdmi_model::error::CdmiError;
use serde::Serialize;

use crate::body::CdmiResponseBody;

/// Render an error as a `text/plain` response carrying the taxonomy message.
pub fn error_to_response(err: &CdmiError, request_id: &str) -> http::Response<CdmiResponseBody> {
    tracing::debug!(
        code = %err.code,
        status = err.status_code.as_u16(),
        resource = ?err.resource,
        request_id,
        "rendering error response"
    );
    http::Response::builder()
        .status(err.status_code)
        .header(http::header::CONTENT_TYPE, "text/plain")
        .body(CdmiResponseBody::from_string(err.message.clone()))
        .unwrap_or_else(|_| {
            http::Response::builder()
                .status(http::StatusCode::INTERNAL_SERVER_ERROR)
                .body(CdmiResponseBody::empty())
                .expect("static response should be valid")
        })
}

/// Serialize `value` as pretty-printed JSON.
///
/// # Errors
///
/// Returns an internal error if serialization fails.
pub fn to_pretty_json<T: Serialize>(value: &T) -> Result<Bytes, CdmiError> {
    serde_json::to_vec_pretty(value)
        .map(Bytes::from)
        .map_err(|e| CdmiError::internal("failed to render JSON body").with_source(e))
}

/// Build a JSON response with the given status and content type.
///
/// # Errors
///
/// Returns an internal error if serialization or response assembly fails.
pub fn json_response<T: Serialize>(
    status: http::StatusCode,
    content_type: &str,
    value: &T,
) -> Result<http::Response<CdmiResponseBody>, CdmiError> {
    let body = to_pretty_json(value)?;
    http::Response::builder()
        .status(status)
        .header(http::header::CONTENT_TYPE, content_type)
        .body(CdmiResponseBody::from_bytes(body))
        .map_err(|e| CdmiError::internal("failed to build response").with_source(e))
}

/// Build a response with no body.
///
/// # Errors
///
/// Returns an internal error if response assembly fails.
pub fn empty_response(
    status: http::StatusCode,
) -> Result<http::Response<CdmiResponseBody>, CdmiError> {
    http::Response::builder()
        .status(status)
        .body(CdmiResponseBody::empty())
        .map_err(|e| CdmiError::internal("failed to build response").with_source(e))
}
