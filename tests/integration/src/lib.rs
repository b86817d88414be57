//! Integration tests for the CDMI gateway.
//!
//! Every test drives the full service stack (version check, routing,
//! dispatch, rendering) through [`CdmiHttpService::call_buffered`] against
//! an in-memory backend, so no network or running server is needed.
//!
//! ```text
//! cargo test -p cdmi-integration
//! ```

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Once};

use async_trait::async_trait;
use bytes::Bytes;
use cdmi_core::backend::memory::InMemoryBackend;
use cdmi_core::backend::{Backend, BackendRequest, BackendResponse};
use cdmi_core::{CdmiGateway, GatewayConfig, GatewayError, GatewayHandler};
use cdmi_http::body::{CdmiResponseBody, collect_bytes};
use cdmi_http::service::CdmiHttpService;
use cdmi_model::headers::CDMI_VERSION;

#[cfg(test)]
mod test_account;
#[cfg(test)]
mod test_container;
#[cfg(test)]
mod test_error;
#[cfg(test)]
mod test_negotiation;
#[cfg(test)]
mod test_object;

static INIT: Once = Once::new();

/// Initialize tracing (once).
fn init_tracing() {
    INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
            )
            .with_test_writer()
            .init();
    });
}

/// Dialect version sent by test clients.
pub const VERSION: &str = "1.0.1";

/// In-memory backend that counts the calls it receives.
#[derive(Debug)]
pub struct CountingBackend {
    inner: Arc<InMemoryBackend>,
    calls: AtomicUsize,
}

impl CountingBackend {
    /// Number of backend calls so far.
    #[must_use]
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Backend for CountingBackend {
    async fn send(&self, request: BackendRequest) -> Result<BackendResponse, GatewayError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.send(request).await
    }
}

/// A gateway service wired to an in-memory backend.
#[derive(Debug)]
pub struct TestGateway {
    /// The backing store, for seeding and inspection.
    pub store: Arc<InMemoryBackend>,
    /// Call counter in front of the store.
    pub backend: Arc<CountingBackend>,
    /// The service under test.
    pub service: CdmiHttpService<GatewayHandler>,
}

impl TestGateway {
    /// A gateway with the default configuration and an open store.
    #[must_use]
    pub fn new() -> Self {
        Self::with_store(InMemoryBackend::new("v1", "/auth/v1.0"))
    }

    /// A gateway in front of `store`.
    #[must_use]
    pub fn with_store(store: InMemoryBackend) -> Self {
        init_tracing();
        let config = GatewayConfig::default();
        let store = Arc::new(store);
        let backend = Arc::new(CountingBackend {
            inner: Arc::clone(&store),
            calls: AtomicUsize::new(0),
        });
        let http_config = config.http_config();
        let gateway = CdmiGateway::new(backend.clone(), config);
        let service = CdmiHttpService::new(GatewayHandler::new(Arc::new(gateway)), http_config);
        Self {
            store,
            backend,
            service,
        }
    }

    /// Send a request through the full service.
    pub async fn call(&self, req: http::Request<Bytes>) -> http::Response<CdmiResponseBody> {
        self.service.call_buffered(req).await
    }

    /// Write straight to the store, bypassing the gateway.
    pub async fn seed(&self, path: &str, content_type: Option<&'static str>, body: &'static [u8]) {
        let mut req = BackendRequest::put(path).with_body(Bytes::from_static(body));
        if let Some(content_type) = content_type {
            req = req.with_header(
                http::header::CONTENT_TYPE,
                http::HeaderValue::from_static(content_type),
            );
        }
        let resp = self.store.send(req).await.expect("seed request");
        assert!(resp.status.is_success(), "seeding {path} failed: {}", resp.status);
    }

    /// Read straight from the store.
    pub async fn stored(&self, path: &str) -> BackendResponse {
        self.store
            .send(BackendRequest::get(path))
            .await
            .expect("store read")
    }
}

impl Default for TestGateway {
    fn default() -> Self {
        Self::new()
    }
}

/// Build a request. `dialect` adds the specification version header.
#[must_use]
pub fn request(
    method: http::Method,
    uri: &str,
    dialect: bool,
    headers: &[(&str, &str)],
    body: &'static [u8],
) -> http::Request<Bytes> {
    let mut builder = http::Request::builder()
        .method(method)
        .uri(uri)
        .header(http::header::HOST, "gw.example:8080");
    if dialect {
        builder = builder.header(CDMI_VERSION, VERSION);
    }
    for (name, value) in headers {
        builder = builder.header(*name, *value);
    }
    builder
        .body(Bytes::from_static(body))
        .expect("valid request")
}

/// Collect a response body.
pub async fn body_bytes(resp: http::Response<CdmiResponseBody>) -> Bytes {
    collect_bytes(resp.into_body()).await.expect("body")
}

/// Collect and parse a JSON response body.
pub async fn body_json(resp: http::Response<CdmiResponseBody>) -> serde_json::Value {
    let body = body_bytes(resp).await;
    serde_json::from_slice(&body).expect("JSON body")
}
