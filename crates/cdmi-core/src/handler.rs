//! CDMI handler implementation bridging HTTP to the gateway logic.

use std::sync::Arc;

use bytes::Bytes;
use cdmi_http::body::CdmiResponseBody;
use cdmi_http::dispatch::{CdmiHandler, HandlerFuture};
use cdmi_http::router::RoutingContext;
use cdmi_model::error::CdmiError;
use cdmi_model::operations::CdmiOperation;

use crate::gateway::{CdmiGateway, OperationRequest};

/// Handler that bridges the HTTP layer to the gateway.
#[derive(Debug, Clone)]
pub struct GatewayHandler {
    gateway: Arc<CdmiGateway>,
}

impl GatewayHandler {
    /// Create a new handler wrapping a gateway.
    #[must_use]
    pub fn new(gateway: Arc<CdmiGateway>) -> Self {
        Self { gateway }
    }

    /// Returns the wrapped gateway.
    #[must_use]
    pub fn gateway(&self) -> &CdmiGateway {
        &self.gateway
    }
}

impl CdmiHandler for GatewayHandler {
    fn handle_operation(
        &self,
        parts: http::request::Parts,
        body: Bytes,
        ctx: RoutingContext,
    ) -> HandlerFuture {
        let gateway = Arc::clone(&self.gateway);
        Box::pin(async move {
            let req = OperationRequest::new(parts, body, ctx);
            dispatch(gateway.as_ref(), &req).await
        })
    }
}

/// Dispatch a routed operation to the matching gateway method.
async fn dispatch(
    gateway: &CdmiGateway,
    req: &OperationRequest,
) -> Result<http::Response<CdmiResponseBody>, CdmiError> {
    match req.ctx.operation {
        CdmiOperation::Login => gateway.handle_login(req).await,
        CdmiOperation::AccountList => gateway.handle_account_list(req).await,
        CdmiOperation::CapabilityRead => gateway.handle_capability_read(req).await,
        CdmiOperation::Read => gateway.handle_read(req).await,
        CdmiOperation::ContainerWrite => gateway.handle_container_write(req).await,
        CdmiOperation::ObjectWrite => gateway.handle_object_write(req).await,
        CdmiOperation::NonDialectContainerWrite => {
            gateway.handle_non_dialect_container_write(req).await
        }
        CdmiOperation::NonDialectObjectWrite => gateway.handle_non_dialect_object_write(req).await,
        CdmiOperation::Delete => gateway.handle_delete(req).await,
        CdmiOperation::Passthrough => gateway.handle_passthrough(req).await,
    }
}
