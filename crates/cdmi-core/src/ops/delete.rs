//! Container and data object deletion.

use cdmi_http::body::CdmiResponseBody;
use cdmi_model::cdmi_error;
use cdmi_model::error::CdmiError;
use tracing::debug;

use super::bad_path;
use crate::backend::BackendRequest;
use crate::gateway::{CdmiGateway, OperationRequest, passthrough_response};

#[allow(clippy::unused_async)]
impl CdmiGateway {
    /// Delete a container or a data object.
    ///
    /// The owning container is listed under the resource's prefix first. A
    /// missing owning container is `NoSuchKey`; anything listed under the
    /// prefix makes the resource a non-empty container, which is refused.
    pub(crate) async fn handle_delete(
        &self,
        req: &OperationRequest,
    ) -> Result<http::Response<CdmiResponseBody>, CdmiError> {
        let path = &req.ctx.path;
        if path.container.is_none() {
            return Err(bad_path(path));
        }

        let prefix = path.has_object().then(|| format!("{}/", path.key()));
        let listing = self
            .prober(req.token.as_ref())
            .listing(path, prefix.as_deref(), Some("/"))
            .await?;
        match listing {
            None => return Err(CdmiError::no_such_key(path.to_string())),
            Some(entries) if !entries.is_empty() => {
                debug!(path = %path, children = entries.len(), "refusing to delete non-empty container");
                return Err(cdmi_error!(ContainerNotEmpty).with_resource(path.to_string()));
            }
            Some(_) => {}
        }

        let request = BackendRequest::delete(path.backend_path(self.api_prefix()))
            .with_token(req.token.as_ref());
        let resp = self.send(request).await?;
        debug!(path = %path, status = resp.status.as_u16(), "deleted");
        passthrough_response(resp)
    }
}
