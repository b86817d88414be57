//! Login, account listing and capability integration tests.

#[cfg(test)]
mod tests {
    use cdmi_core::backend::memory::InMemoryBackend;
    use http::{Method, StatusCode};

    use crate::{TestGateway, body_json, request};

    #[tokio::test]
    async fn test_should_login_and_use_prefixed_token() {
        let gw = TestGateway::with_store(InMemoryBackend::new("v1", "/auth/v1.0").with_required_auth(true));

        let resp = gw
            .call(request(Method::GET, "/cdmi/", false, &[("x-auth-user", "A:alice")], b""))
            .await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(
            resp.headers().get("x-storage-url").expect("storage url"),
            "http://gw.example:8080/cdmi/A"
        );
        let token = resp
            .headers()
            .get("x-auth-token")
            .and_then(|v| v.to_str().ok())
            .expect("token")
            .to_owned();
        assert!(resp.headers().get("x-storage-token").is_some());

        // Without a token the store refuses the write.
        let resp = gw
            .call(request(Method::PUT, "/cdmi/A/photos/", true, &[], b""))
            .await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

        // Tokens issued as "<account>,<token>" are forwarded without the prefix.
        let prefixed = format!("A,{token}");
        let resp = gw
            .call(request(
                Method::PUT,
                "/cdmi/A/photos/",
                true,
                &[("x-auth-token", prefixed.as_str())],
                b"",
            ))
            .await;
        assert_eq!(resp.status(), StatusCode::CREATED);

        let resp = gw
            .call(request(
                Method::GET,
                "/cdmi/A/",
                true,
                &[("x-auth-token", prefixed.as_str())],
                b"",
            ))
            .await;
        assert_eq!(resp.status(), StatusCode::OK);
        let json = body_json(resp).await;
        assert_eq!(json["children"], serde_json::json!(["photos/"]));
    }

    #[tokio::test]
    async fn test_should_pass_through_failed_login() {
        let gw = TestGateway::new();
        let resp = gw.call(request(Method::GET, "/cdmi/", false, &[], b"")).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
        assert!(resp.headers().get("x-storage-url").is_none());
    }

    #[tokio::test]
    async fn test_should_list_account_as_container() {
        let gw = TestGateway::new();
        gw.seed("/v1/A/alpha", None, b"").await;
        gw.seed("/v1/A/beta", None, b"").await;
        gw.seed("/v1/A/gamma", None, b"").await;

        let resp = gw.call(request(Method::GET, "/cdmi/A/", true, &[], b"")).await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(
            resp.headers().get("content-type").expect("content type"),
            "application/cdmi-container"
        );
        assert_eq!(
            resp.headers().get("x-cdmi-specification-version").expect("version"),
            "1.0.1"
        );
        let json = body_json(resp).await;
        assert_eq!(json["objectName"], "A/");
        assert_eq!(json["parentURI"], "/cdmi/");
        assert_eq!(
            json["children"],
            serde_json::json!(["alpha/", "beta/", "gamma/"])
        );
        assert_eq!(json["childrenRange"], "0-3");
    }

    #[tokio::test]
    async fn test_should_render_capability_tree() {
        let gw = TestGateway::new();

        let resp = gw
            .call(request(Method::GET, "/cdmi/A/cdmi_capabilities/", true, &[], b""))
            .await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(
            resp.headers().get("content-type").expect("content type"),
            "application/cdmi-capability"
        );
        let json = body_json(resp).await;
        assert_eq!(
            json["children"],
            serde_json::json!(["rootcontainer/", "container/", "dataobject/"])
        );

        let resp = gw
            .call(request(
                Method::GET,
                "/cdmi/A/cdmi_capabilities/container/",
                true,
                &[],
                b"",
            ))
            .await;
        let json = body_json(resp).await;
        assert_eq!(json["parentURI"], "/cdmi/A/cdmi_capabilities/");
        assert_eq!(json["capabilities"]["cdmi_create_container"], "true");

        let resp = gw
            .call(request(
                Method::GET,
                "/cdmi/cdmi_capabilities/A/dataobject/",
                true,
                &[],
                b"",
            ))
            .await;
        assert_eq!(resp.status(), StatusCode::OK);

        let resp = gw
            .call(request(Method::GET, "/cdmi/A/cdmi_capabilities/queue/", true, &[], b""))
            .await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        assert_eq!(body_json(resp).await, serde_json::json!({}));
        assert_eq!(gw.backend.calls(), 0);
    }
}
