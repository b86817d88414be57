//! The CDMI gateway provider.
//!
//! [`CdmiGateway`] owns the backend client and the immutable configuration.
//! Individual operations are implemented in the `ops` submodules as
//! `handle_*` methods and wired to the HTTP layer by
//! [`GatewayHandler`](crate::handler::GatewayHandler).

use std::sync::Arc;

use bytes::Bytes;
use cdmi_http::body::CdmiResponseBody;
use cdmi_http::router::RoutingContext;
use cdmi_model::error::CdmiError;
use cdmi_model::representation::dialect_uri;
use http::{HeaderValue, header};

use crate::backend::memory::InMemoryBackend;
use crate::backend::remote::HttpBackend;
use crate::backend::{Backend, BackendRequest, BackendResponse, forward_token};
use crate::config::{BackendKind, GatewayConfig};
use crate::error::GatewayError;
use crate::probe::Prober;

/// Response headers that describe the backend connection rather than the
/// resource and are not copied onto passthrough responses.
const HOP_BY_HOP: &[&str] = &[
    "connection",
    "keep-alive",
    "transfer-encoding",
    "content-length",
    "upgrade",
    "proxy-connection",
];

/// The gateway provider.
///
/// All fields are `Arc`-wrapped for cheap cloning across handler tasks.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
///
/// use cdmi_core::CdmiGateway;
/// use cdmi_core::backend::memory::InMemoryBackend;
/// use cdmi_core::config::GatewayConfig;
///
/// let gateway = CdmiGateway::new(
///     Arc::new(InMemoryBackend::new("v1", "/auth/v1.0")),
///     GatewayConfig::default(),
/// );
/// assert_eq!(gateway.config().root(), "cdmi");
/// ```
#[derive(Debug, Clone)]
pub struct CdmiGateway {
    /// The flat object store.
    pub(crate) backend: Arc<dyn Backend>,
    /// Gateway configuration.
    pub(crate) config: Arc<GatewayConfig>,
}

impl CdmiGateway {
    /// Create a gateway over an existing backend.
    #[must_use]
    pub fn new(backend: Arc<dyn Backend>, config: GatewayConfig) -> Self {
        Self {
            backend,
            config: Arc::new(config),
        }
    }

    /// Create a gateway with the backend selected by `config.backend`.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP backend client cannot be built.
    pub fn from_config(config: GatewayConfig) -> Result<Self, GatewayError> {
        let backend: Arc<dyn Backend> = match config.backend {
            BackendKind::Http => Arc::new(HttpBackend::new(
                &config.backend_url,
                config.backend_timeout(),
            )?),
            BackendKind::Memory => Arc::new(InMemoryBackend::new(
                config.api_prefix(),
                &config.backend_auth_path,
            )),
        };
        Ok(Self::new(backend, config))
    }

    /// Returns a reference to the gateway configuration.
    #[must_use]
    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    /// Returns the backend client.
    #[must_use]
    pub fn backend(&self) -> &Arc<dyn Backend> {
        &self.backend
    }

    pub(crate) fn api_prefix(&self) -> &str {
        self.config.api_prefix()
    }

    pub(crate) fn prober<'a>(&'a self, token: Option<&'a HeaderValue>) -> Prober<'a> {
        Prober::new(self.backend.as_ref(), self.api_prefix(), token)
    }

    /// Send a request to the backend, mapping transport failures.
    pub(crate) async fn send(&self, request: BackendRequest) -> Result<BackendResponse, CdmiError> {
        Ok(self.backend.send(request).await?)
    }

    /// `/<root>/<parts...>/`.
    pub(crate) fn uri(&self, parts: &[&str]) -> String {
        dialect_uri(self.config.root(), parts)
    }
}

/// A routed request as seen by the operation handlers.
#[derive(Debug)]
pub(crate) struct OperationRequest {
    pub parts: http::request::Parts,
    pub body: Bytes,
    pub ctx: RoutingContext,
    /// Token to forward to the backend.
    pub token: Option<HeaderValue>,
}

impl OperationRequest {
    pub fn new(parts: http::request::Parts, body: Bytes, ctx: RoutingContext) -> Self {
        let token = forward_token(parts.headers.get(cdmi_model::headers::AUTH_TOKEN));
        Self {
            parts,
            body,
            ctx,
            token,
        }
    }

    pub fn header_str(&self, name: &str) -> Option<&str> {
        self.parts.headers.get(name).and_then(|v| v.to_str().ok())
    }

    pub fn content_type(&self) -> &str {
        self.header_str(header::CONTENT_TYPE.as_str()).unwrap_or("")
    }

    pub fn is_dialect(&self) -> bool {
        self.ctx.negotiation.is_dialect()
    }

    /// Inbound headers whose names start with `prefix`.
    pub fn headers_with_prefix<'a>(
        &'a self,
        prefix: &'a str,
    ) -> impl Iterator<Item = (&'a http::HeaderName, &'a HeaderValue)> + 'a {
        self.parts
            .headers
            .iter()
            .filter(move |(name, _)| name.as_str().starts_with(prefix))
    }
}

/// Convert a backend response into a client response unchanged, minus the
/// connection-level headers.
pub(crate) fn passthrough_response(
    resp: BackendResponse,
) -> Result<http::Response<CdmiResponseBody>, CdmiError> {
    let mut builder = http::Response::builder().status(resp.status);
    for (name, value) in &resp.headers {
        if HOP_BY_HOP.contains(&name.as_str()) {
            continue;
        }
        builder = builder.header(name, value);
    }
    builder
        .body(CdmiResponseBody::from_bytes(resp.body))
        .map_err(|e| CdmiError::internal("failed to build passthrough response").with_source(e))
}
