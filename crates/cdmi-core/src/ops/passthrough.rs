//! Forwarding of requests outside the mount prefix.

use cdmi_http::body::CdmiResponseBody;
use cdmi_model::error::CdmiError;
use cdmi_model::path::decode_path;
use http::header;
use tracing::debug;

use crate::backend::BackendRequest;
use crate::gateway::{CdmiGateway, OperationRequest, passthrough_response};

/// Request headers that describe the inbound connection are not forwarded.
fn is_connection_header(name: &header::HeaderName) -> bool {
    name == header::HOST || name == header::CONNECTION || name == header::CONTENT_LENGTH
}

#[allow(clippy::unused_async)]
impl CdmiGateway {
    /// Forward the request to the backend as-is.
    pub(crate) async fn handle_passthrough(
        &self,
        req: &OperationRequest,
    ) -> Result<http::Response<CdmiResponseBody>, CdmiError> {
        let path = decode_path(req.parts.uri.path())?;
        let mut request = BackendRequest::new(req.parts.method.clone(), path)
            .with_query_pairs(req.ctx.query_params.iter().cloned())
            .with_body(req.body.clone());
        for (name, value) in &req.parts.headers {
            if is_connection_header(name) {
                continue;
            }
            request.headers.append(name.clone(), value.clone());
        }
        let resp = self.send(request).await?;
        debug!(
            method = %req.parts.method,
            path = req.parts.uri.path(),
            status = resp.status.as_u16(),
            "passthrough"
        );
        passthrough_response(resp)
    }
}
