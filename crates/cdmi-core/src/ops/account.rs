//! Account listing.

use cdmi_http::body::CdmiResponseBody;
use cdmi_http::response::json_response;
use cdmi_model::error::CdmiError;
use cdmi_model::headers::{APPLICATION_JSON, CDMI_CONTAINER};
use cdmi_model::metadata::MetadataMap;
use cdmi_model::representation::{COMPLETE, ContainerRepresentation};
use http::{HeaderValue, StatusCode, header};
use tracing::debug;

use crate::backend::BackendRequest;
use crate::error::GatewayError;
use crate::gateway::{CdmiGateway, OperationRequest, passthrough_response};
use crate::probe::parse_listing;

#[allow(clippy::unused_async)]
impl CdmiGateway {
    /// List the containers of an account.
    ///
    /// Dialect requests get a container representation whose children are
    /// the account's top-level containers. Other requests see the backend
    /// account listing unchanged.
    pub(crate) async fn handle_account_list(
        &self,
        req: &OperationRequest,
    ) -> Result<http::Response<CdmiResponseBody>, CdmiError> {
        let account = req.ctx.path.account.as_deref().unwrap_or_default();
        let backend_path = req.ctx.path.backend_path(self.api_prefix());

        if !req.is_dialect() {
            let request = BackendRequest::get(&backend_path)
                .with_token(req.token.as_ref())
                .with_query_pairs(req.ctx.query_params.iter().cloned());
            return passthrough_response(self.send(request).await?);
        }

        let request = BackendRequest::get(&backend_path)
            .with_token(req.token.as_ref())
            .with_header(header::ACCEPT, HeaderValue::from_static(APPLICATION_JSON))
            .with_query("format", "json");
        let resp = self.send(request).await?;
        if !matches!(resp.status, StatusCode::OK | StatusCode::NO_CONTENT) {
            return Err(GatewayError::UnexpectedStatus {
                status: resp.status,
                path: backend_path,
            }
            .into());
        }

        let children: Vec<String> = parse_listing(&resp.body)?
            .iter()
            .filter_map(|entry| entry.display_name())
            .map(|name| format!("{}/", name.trim_end_matches('/')))
            .collect();
        debug!(account, containers = children.len(), "account listed");

        let repr = ContainerRepresentation {
            object_type: CDMI_CONTAINER.to_owned(),
            object_name: format!("{account}/"),
            parent_uri: self.uri(&[]),
            capabilities_uri: self.uri(&[
                account,
                &self.config.cdmi_capability_id,
                "rootcontainer",
            ]),
            completion_status: COMPLETE.to_owned(),
            metadata: MetadataMap::new(),
            children_range: Some(format!("0-{}", children.len())),
            children: Some(children),
        };
        json_response(StatusCode::OK, CDMI_CONTAINER, &repr)
    }
}
