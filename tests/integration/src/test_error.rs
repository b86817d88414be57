//! Error rendering, version checks, health and passthrough integration tests.

#[cfg(test)]
mod tests {
    use http::{Method, StatusCode};

    use crate::{TestGateway, body_bytes, body_json, request};

    #[tokio::test]
    async fn test_should_reject_unsupported_version_without_backend_calls() {
        let gw = TestGateway::new();
        let req = http::Request::builder()
            .method(Method::GET)
            .uri("/cdmi/A/C/o")
            .header("x-cdmi-specification-version", "9.9.9")
            .body(bytes::Bytes::new())
            .expect("request");

        let resp = gw.call(req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert_eq!(gw.backend.calls(), 0);
    }

    #[tokio::test]
    async fn test_should_render_errors_as_plain_text() {
        let gw = TestGateway::new();
        gw.seed("/v1/A/C", None, b"").await;

        let resp = gw
            .call(request(Method::GET, "/cdmi/A/C/missing", true, &[], b""))
            .await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        assert_eq!(
            resp.headers().get("content-type").expect("content type"),
            "text/plain"
        );
        assert!(resp.headers().get("x-request-id").is_some());
        assert_eq!(
            resp.headers().get("server").expect("server"),
            "cdmi-gateway"
        );
        assert_eq!(
            body_bytes(resp).await.as_ref(),
            b"The resource you requested does not exist"
        );
    }

    #[tokio::test]
    async fn test_should_reject_unsupported_method() {
        let gw = TestGateway::new();
        let resp = gw
            .call(request(Method::POST, "/cdmi/A/C/o", true, &[], b""))
            .await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert_eq!(gw.backend.calls(), 0);
    }

    #[tokio::test]
    async fn test_should_reject_invalid_envelope() {
        let gw = TestGateway::new();
        gw.seed("/v1/A/C", None, b"").await;
        let resp = gw
            .call(request(
                Method::PUT,
                "/cdmi/A/C/o",
                true,
                &[("content-type", "application/cdmi-object")],
                b"{not json",
            ))
            .await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert!(gw.store.object_keys("A", "C").is_empty());
    }

    #[tokio::test]
    async fn test_should_answer_health_without_backend() {
        let gw = TestGateway::new();
        let resp = gw
            .call(request(Method::GET, "/health", false, &[], b""))
            .await;
        assert_eq!(resp.status(), StatusCode::OK);
        let json = body_json(resp).await;
        assert_eq!(json["status"], "running");
        assert_eq!(gw.backend.calls(), 0);
    }

    #[tokio::test]
    async fn test_should_pass_through_requests_outside_mount() {
        let gw = TestGateway::new();

        let resp = gw
            .call(request(Method::PUT, "/v1/A/native", false, &[], b""))
            .await;
        assert_eq!(resp.status(), StatusCode::CREATED);
        let resp = gw
            .call(request(
                Method::PUT,
                "/v1/A/native/obj",
                false,
                &[("content-type", "text/plain"), ("x-object-meta-tag", "t1")],
                b"body",
            ))
            .await;
        assert_eq!(resp.status(), StatusCode::CREATED);

        let resp = gw
            .call(request(Method::GET, "/v1/A/native/obj", false, &[], b""))
            .await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(
            resp.headers().get("x-object-meta-tag").expect("meta"),
            "t1"
        );
        assert!(resp.headers().get("x-cdmi-specification-version").is_none());
        assert_eq!(body_bytes(resp).await.as_ref(), b"body");
    }
}
