//! The gateway's hyper `Service`.
//!
//! [`CdmiHttpService`] runs every request through the same pipeline:
//!
//! 1. Health check interception (`GET /health`, `GET /_health`)
//! 2. Dialect version validation, before any routing or backend call
//! 3. Routing via [`CdmiRouter`]
//! 4. Dispatch to the [`CdmiHandler`]
//! 5. Common response headers (`X-Request-Id`, `Server`, and the dialect
//!    version on dialect responses)
//! 6. Error rendering

use std::convert::Infallible;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use bytes::Bytes;
use cdmi_model::error::{CdmiError, CdmiErrorCode};
use cdmi_model::headers::CDMI_VERSION;
use http_body_util::BodyExt;
use hyper::body::Incoming;
use hyper::service::Service;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::body::CdmiResponseBody;
use crate::dispatch::{CdmiHandler, dispatch_operation};
use crate::response::error_to_response;
use crate::router::CdmiRouter;

/// Value of the `Server` response header.
pub const SERVER_NAME: &str = "cdmi-gateway";

/// Configuration for the HTTP service.
#[derive(Debug, Clone)]
pub struct CdmiHttpConfig {
    /// Mount prefix of the dialect namespace.
    pub root: String,
    /// Label that introduces the capability subtree.
    pub capability_id: String,
    /// Accepted values of the dialect version header.
    pub supported_versions: Vec<String>,
}

impl Default for CdmiHttpConfig {
    fn default() -> Self {
        Self {
            root: "cdmi".to_owned(),
            capability_id: "cdmi_capabilities".to_owned(),
            supported_versions: vec!["1.0.1".to_owned()],
        }
    }
}

impl CdmiHttpConfig {
    /// Whether `version` is one of the supported versions.
    #[must_use]
    pub fn supports_version(&self, version: &str) -> bool {
        let version = version.trim();
        self.supported_versions.iter().any(|v| v == version)
    }
}

/// The gateway HTTP service.
///
/// # Type Parameters
///
/// - `H`: the gateway logic implementing [`CdmiHandler`].
#[derive(Debug)]
pub struct CdmiHttpService<H: CdmiHandler> {
    handler: Arc<H>,
    router: CdmiRouter,
    config: Arc<CdmiHttpConfig>,
}

impl<H: CdmiHandler> CdmiHttpService<H> {
    /// Create a service that owns `handler`.
    #[must_use]
    pub fn new(handler: H, config: CdmiHttpConfig) -> Self {
        Self::from_shared(Arc::new(handler), config)
    }

    /// Create a service from a shared handler.
    #[must_use]
    pub fn from_shared(handler: Arc<H>, config: CdmiHttpConfig) -> Self {
        let router = CdmiRouter::new(&config.root, config.capability_id.clone());
        Self {
            handler,
            router,
            config: Arc::new(config),
        }
    }

    /// Process a request whose body has already been collected.
    ///
    /// The hyper entry point collects the body and then runs this same path;
    /// tests call it directly.
    pub async fn call_buffered(&self, req: http::Request<Bytes>) -> http::Response<CdmiResponseBody> {
        let request_id = Uuid::new_v4().to_string();
        let (parts, body) = req.into_parts();
        let dialect_version = supported_dialect_version(&parts.headers, &self.config);
        let response = process_request(
            parts,
            body,
            self.handler.as_ref(),
            &self.router,
            &self.config,
            &request_id,
        )
        .await;
        add_common_headers(response, &request_id, dialect_version.as_deref())
    }
}

impl<H: CdmiHandler> Clone for CdmiHttpService<H> {
    fn clone(&self) -> Self {
        Self {
            handler: Arc::clone(&self.handler),
            router: self.router.clone(),
            config: Arc::clone(&self.config),
        }
    }
}

impl<H: CdmiHandler> Service<http::Request<Incoming>> for CdmiHttpService<H> {
    type Response = http::Response<CdmiResponseBody>;
    type Error = Infallible;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn call(&self, req: http::Request<Incoming>) -> Self::Future {
        let service = self.clone();

        Box::pin(async move {
            let (parts, incoming) = req.into_parts();
            let body = match incoming.collect().await {
                Ok(collected) => collected.to_bytes(),
                Err(err) => {
                    let request_id = Uuid::new_v4().to_string();
                    error!(error = %err, request_id, "failed to collect request body");
                    let cdmi_err =
                        CdmiError::with_message(CdmiErrorCode::InvalidBody, "failed to read request body");
                    let response = error_to_response(&cdmi_err, &request_id);
                    return Ok(add_common_headers(response, &request_id, None));
                }
            };
            Ok(service
                .call_buffered(http::Request::from_parts(parts, body))
                .await)
        })
    }
}

/// Run one request through the pipeline.
async fn process_request<H: CdmiHandler>(
    parts: http::request::Parts,
    body: Bytes,
    handler: &H,
    router: &CdmiRouter,
    config: &CdmiHttpConfig,
    request_id: &str,
) -> http::Response<CdmiResponseBody> {
    let method = parts.method.clone();
    let uri = parts.uri.clone();
    debug!(%method, %uri, request_id, "processing CDMI request");

    // 1. Health check interception.
    if is_health_check(&method, uri.path()) {
        return health_check_response();
    }

    // 2. Version check.
    if let Some(version) = header_str(&parts.headers, CDMI_VERSION) {
        if !config.supports_version(version) {
            warn!(version, request_id, "unsupported dialect version");
            return error_to_response(
                &CdmiError::new(CdmiErrorCode::VersionNotSupported).with_resource(version),
                request_id,
            );
        }
    }

    // 3. Route.
    let req = http::Request::from_parts(parts, body);
    let ctx = match router.resolve(&req) {
        Ok(ctx) => ctx,
        Err(err) => {
            warn!(%method, %uri, error = %err, request_id, "failed to route CDMI request");
            return error_to_response(&err, request_id);
        }
    };

    info!(
        operation = %ctx.operation,
        account = ?ctx.path.account,
        container = ?ctx.path.container,
        object = ?ctx.path.object,
        request_id,
        "routed CDMI request"
    );

    // 4. Dispatch.
    let (parts, body) = req.into_parts();
    match dispatch_operation(handler, parts, body, ctx).await {
        Ok(response) => response,
        Err(err) => {
            debug!(error = %err, request_id, "CDMI operation returned error");
            error_to_response(&err, request_id)
        }
    }
}

fn header_str<'a>(headers: &'a http::HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

fn supported_dialect_version(headers: &http::HeaderMap, config: &CdmiHttpConfig) -> Option<String> {
    header_str(headers, CDMI_VERSION)
        .filter(|v| config.supports_version(v))
        .map(str::to_owned)
}

/// Check if the request is a health check probe.
fn is_health_check(method: &http::Method, path: &str) -> bool {
    *method == http::Method::GET && (path == "/health" || path == "/_health")
}

/// Produce a health check response.
fn health_check_response() -> http::Response<CdmiResponseBody> {
    http::Response::builder()
        .status(http::StatusCode::OK)
        .header("Content-Type", "application/json")
        .body(CdmiResponseBody::from_string(
            r#"{"status":"running","service":"cdmi"}"#,
        ))
        .expect("static health response should be valid")
}

/// Add common response headers to every response.
fn add_common_headers(
    mut response: http::Response<CdmiResponseBody>,
    request_id: &str,
    dialect_version: Option<&str>,
) -> http::Response<CdmiResponseBody> {
    let headers = response.headers_mut();

    if let Ok(hv) = http::header::HeaderValue::from_str(request_id) {
        headers.insert("x-request-id", hv);
    }
    headers.insert(
        http::header::SERVER,
        http::header::HeaderValue::from_static(SERVER_NAME),
    );
    if let Some(version) = dialect_version {
        if let Ok(hv) = http::header::HeaderValue::from_str(version) {
            headers.insert(CDMI_VERSION, hv);
        }
    }

    response
}
