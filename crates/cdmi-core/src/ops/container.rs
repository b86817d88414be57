//! Container writes.
//!
//! Top-level containers map onto backend containers. Nested containers are
//! zero-length directory marker objects.

use cdmi_http::body::CdmiResponseBody;
use cdmi_http::request::decode_container_body;
use cdmi_http::response::{empty_response, json_response};
use cdmi_model::error::CdmiError;
use cdmi_model::headers::{
    CDMI_CONTAINER, DIRECTORY_MARKER, NATIVE_CONTAINER_META_PREFIX, NATIVE_OBJECT_META_PREFIX,
};
use cdmi_model::representation::{COMPLETE, ContainerRepresentation};
use http::{HeaderValue, StatusCode, header};
use tracing::{debug, info};

use super::{bad_path, metadata_prefix};
use crate::backend::BackendRequest;
use crate::gateway::{CdmiGateway, OperationRequest, passthrough_response};

#[allow(clippy::unused_async)]
impl CdmiGateway {
    /// Create or update a container from a dialect body.
    ///
    /// Only the `metadata` of the body is honored. The representation is
    /// returned on create; an update answers with the backend status and no
    /// body.
    pub(crate) async fn handle_container_write(
        &self,
        req: &OperationRequest,
    ) -> Result<http::Response<CdmiResponseBody>, CdmiError> {
        let path = &req.ctx.path;
        let Some(container) = path.container.as_deref() else {
            return Err(bad_path(path));
        };
        let metadata = decode_container_body(&req.body)?;
        self.prober(req.token.as_ref())
            .check_container_slot(path)
            .await?;

        let mut request = BackendRequest::put(path.backend_path(self.api_prefix()))
            .with_token(req.token.as_ref())
            .with_header(header::CONTENT_TYPE, HeaderValue::from_static(DIRECTORY_MARKER));
        metadata.write_headers(&mut request.headers, metadata_prefix(path))?;
        let resp = self.send(request).await?;
        debug!(path = %path, status = resp.status.as_u16(), "container put");

        if resp.status != StatusCode::CREATED {
            return empty_response(resp.status);
        }
        info!(path = %path, "container created");

        let account = path.account.as_deref().unwrap_or_default();
        let (object_name, parent_uri) = match path.object.as_deref() {
            Some(object) => (
                format!("{object}/"),
                self.uri(&[account, container, path.parent.as_deref().unwrap_or_default()]),
            ),
            None => (format!("{container}/"), self.uri(&[account])),
        };
        let repr = ContainerRepresentation {
            object_type: CDMI_CONTAINER.to_owned(),
            object_name,
            parent_uri,
            capabilities_uri: self.uri(&[account, &self.config.cdmi_capability_id, "container"]),
            completion_status: COMPLETE.to_owned(),
            metadata,
            children: None,
            children_range: None,
        };
        json_response(StatusCode::CREATED, CDMI_CONTAINER, &repr)
    }

    /// Create a container with backend-native semantics.
    ///
    /// Native metadata headers of the request are forwarded; the backend
    /// response is returned unchanged.
    pub(crate) async fn handle_non_dialect_container_write(
        &self,
        req: &OperationRequest,
    ) -> Result<http::Response<CdmiResponseBody>, CdmiError> {
        let path = &req.ctx.path;
        if path.container.is_none() {
            return Err(bad_path(path));
        }
        self.prober(req.token.as_ref())
            .check_container_slot(path)
            .await?;

        let native_prefix = if path.has_object() {
            NATIVE_OBJECT_META_PREFIX
        } else {
            NATIVE_CONTAINER_META_PREFIX
        };
        let mut request = BackendRequest::put(path.backend_path(self.api_prefix()))
            .with_token(req.token.as_ref())
            .with_header(header::CONTENT_TYPE, HeaderValue::from_static(DIRECTORY_MARKER));
        for (name, value) in req.headers_with_prefix(native_prefix) {
            request.headers.insert(name.clone(), value.clone());
        }
        passthrough_response(self.send(request).await?)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use bytes::Bytes;
    use cdmi_http::body::collect_bytes;
    use cdmi_http::router::CdmiRouter;
    use cdmi_model::error::CdmiErrorCode;

    use super::*;
    use crate::backend::Backend;
    use crate::backend::memory::InMemoryBackend;
    use crate::config::GatewayConfig;
    use crate::probe::is_directory_marker;

    fn setup() -> (Arc<InMemoryBackend>, CdmiGateway) {
        let backend = Arc::new(InMemoryBackend::new("v1", "/auth/v1.0"));
        let gateway = CdmiGateway::new(backend.clone(), GatewayConfig::default());
        (backend, gateway)
    }

    fn request(
        uri: &str,
        headers: &[(&'static str, &'static str)],
        body: &'static [u8],
    ) -> OperationRequest {
        let mut builder = http::Request::builder().method(http::Method::PUT).uri(uri);
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }
        let req = builder.body(()).expect("request");
        let ctx = CdmiRouter::new("cdmi", "cdmi_capabilities")
            .resolve(&req)
            .expect("route");
        let (parts, ()) = req.into_parts();
        OperationRequest::new(parts, Bytes::from_static(body), ctx)
    }

    const DIALECT: (&str, &str) = ("x-cdmi-specification-version", "1.0.1");
    const CONTAINER_TYPE: (&str, &str) = ("content-type", "application/cdmi-container");

    #[tokio::test]
    async fn test_should_create_top_level_container_with_metadata() {
        let (backend, gateway) = setup();
        let req = request(
            "/cdmi/A/photos/",
            &[DIALECT, CONTAINER_TYPE],
            br#"{"metadata":{"owner":"alice"}}"#,
        );
        let resp = gateway.handle_container_write(&req).await.expect("create");
        assert_eq!(resp.status(), StatusCode::CREATED);
        let body = collect_bytes(resp.into_body()).await.expect("body");
        let json: serde_json::Value = serde_json::from_slice(&body).expect("json");
        assert_eq!(json["objectName"], "photos/");
        assert_eq!(json["parentURI"], "/cdmi/A/");
        assert_eq!(json["capabilitiesURI"], "/cdmi/A/cdmi_capabilities/container/");
        assert_eq!(json["metadata"]["owner"], "alice");
        assert!(json.get("children").is_none());

        let stored = backend
            .send(BackendRequest::get("/v1/A/photos"))
            .await
            .expect("get");
        assert_eq!(
            stored.header_str("x-container-meta-cdmi-owner"),
            Some("owner:alice")
        );
    }

    #[tokio::test]
    async fn test_should_create_nested_container_as_marker() {
        let (backend, gateway) = setup();
        backend
            .send(BackendRequest::put("/v1/A/photos"))
            .await
            .expect("container");
        let req = request("/cdmi/A/photos/2024/", &[DIALECT, CONTAINER_TYPE], b"");
        let resp = gateway.handle_container_write(&req).await.expect("create");
        assert_eq!(resp.status(), StatusCode::CREATED);
        let body = collect_bytes(resp.into_body()).await.expect("body");
        let json: serde_json::Value = serde_json::from_slice(&body).expect("json");
        assert_eq!(json["objectName"], "2024/");
        assert_eq!(json["parentURI"], "/cdmi/A/photos/");

        let stored = backend
            .send(BackendRequest::get("/v1/A/photos/2024"))
            .await
            .expect("get");
        assert!(is_directory_marker(&stored.headers));
    }

    #[tokio::test]
    async fn test_should_answer_update_without_body() {
        let (backend, gateway) = setup();
        backend
            .send(BackendRequest::put("/v1/A/photos"))
            .await
            .expect("container");
        let req = request("/cdmi/A/photos/", &[DIALECT, CONTAINER_TYPE], b"");
        let resp = gateway.handle_container_write(&req).await.expect("update");
        assert_eq!(resp.status(), StatusCode::ACCEPTED);
        let body = collect_bytes(resp.into_body()).await.expect("body");
        assert!(body.is_empty());
    }

    #[tokio::test]
    async fn test_should_refuse_container_over_object() {
        let (backend, gateway) = setup();
        backend
            .send(BackendRequest::put("/v1/A/photos"))
            .await
            .expect("container");
        backend
            .send(BackendRequest::put("/v1/A/photos/cat.jpg").with_body(Bytes::from_static(b"x")))
            .await
            .expect("object");
        let req = request("/cdmi/A/photos/cat.jpg/", &[DIALECT, CONTAINER_TYPE], b"");
        let err = gateway.handle_container_write(&req).await.unwrap_err();
        assert_eq!(err.code, CdmiErrorCode::Conflict);
    }

    #[tokio::test]
    async fn test_should_reject_invalid_container_body() {
        let (_, gateway) = setup();
        let req = request("/cdmi/A/photos/", &[DIALECT, CONTAINER_TYPE], b"not json");
        let err = gateway.handle_container_write(&req).await.unwrap_err();
        assert_eq!(err.code, CdmiErrorCode::InvalidContent);
    }

    #[tokio::test]
    async fn test_should_forward_native_metadata_for_non_dialect_container() {
        let (backend, gateway) = setup();
        let req = request("/cdmi/A/logs/", &[("x-container-meta-team", "ops")], b"");
        let resp = gateway
            .handle_non_dialect_container_write(&req)
            .await
            .expect("create");
        assert_eq!(resp.status(), StatusCode::CREATED);
        let stored = backend
            .send(BackendRequest::get("/v1/A/logs"))
            .await
            .expect("get");
        assert_eq!(stored.header_str("x-container-meta-team"), Some("ops"));
    }
}
