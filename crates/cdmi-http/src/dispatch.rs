//! Operation dispatch: hands a routed request to the gateway logic.
//!
//! The HTTP layer knows nothing about the backend. It routes, collects the
//! body, and calls [`CdmiHandler::handle_operation`]; the implementation in
//! `cdmi-core` owns the exhaustive operation table.

use std::future::Future;
use std::pin::Pin;

use bytes::Bytes;
use cdmi_model::error::CdmiError;

use crate::body::CdmiResponseBody;
use crate::router::RoutingContext;

/// Boxed future returned by [`CdmiHandler`].
pub type HandlerFuture =
    Pin<Box<dyn Future<Output = Result<http::Response<CdmiResponseBody>, CdmiError>> + Send>>;

/// The boundary between the HTTP layer and the gateway logic.
///
/// Boxed futures keep the trait usable behind `Arc<dyn CdmiHandler>`.
pub trait CdmiHandler: Send + Sync + 'static {
    /// Handle a routed request and produce a complete response.
    fn handle_operation(
        &self,
        parts: http::request::Parts,
        body: Bytes,
        ctx: RoutingContext,
    ) -> HandlerFuture;
}

/// Dispatch a routed request to the handler.
pub async fn dispatch_operation<H: CdmiHandler + ?Sized>(
    handler: &H,
    parts: http::request::Parts,
    body: Bytes,
    ctx: RoutingContext,
) -> Result<http::Response<CdmiResponseBody>, CdmiError> {
    tracing::debug!(
        operation = %ctx.operation,
        account = ?ctx.path.account,
        container = ?ctx.path.container,
        object = ?ctx.path.object,
        "dispatching CDMI operation"
    );
    handler.handle_operation(parts, body, ctx).await
}
