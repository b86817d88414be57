//! Container/object disambiguation integration tests.

#[cfg(test)]
mod tests {
    use cdmi_model::headers::DIRECTORY_MARKER;
    use http::{Method, StatusCode};

    use crate::{TestGateway, body_json, request};

    async fn gateway_with_container() -> TestGateway {
        let gw = TestGateway::new();
        gw.seed("/v1/A/C", None, b"").await;
        gw
    }

    #[tokio::test]
    async fn test_should_pick_write_target_from_headers_then_slash() {
        let gw = gateway_with_container().await;

        // Trailing slash alone: container.
        let resp = gw
            .call(request(Method::PUT, "/cdmi/A/C/by-slash/", true, &[], b""))
            .await;
        assert_eq!(resp.status(), StatusCode::CREATED);
        assert_eq!(gw.stored("/v1/A/C/by-slash").await.content_type(), DIRECTORY_MARKER);

        // Container content type without a slash: container.
        let resp = gw
            .call(request(
                Method::PUT,
                "/cdmi/A/C/by-type",
                true,
                &[("content-type", "application/cdmi-container")],
                b"",
            ))
            .await;
        assert_eq!(resp.status(), StatusCode::CREATED);
        assert_eq!(gw.stored("/v1/A/C/by-type").await.content_type(), DIRECTORY_MARKER);

        // Container Accept without a slash: container.
        let resp = gw
            .call(request(
                Method::PUT,
                "/cdmi/A/C/by-accept-container",
                true,
                &[("accept", "application/cdmi-container")],
                b"",
            ))
            .await;
        assert_eq!(resp.status(), StatusCode::CREATED);
        assert_eq!(
            gw.stored("/v1/A/C/by-accept-container").await.content_type(),
            DIRECTORY_MARKER
        );

        // Object Accept outranks the slash.
        let resp = gw
            .call(request(
                Method::PUT,
                "/cdmi/A/C/by-accept/",
                true,
                &[("accept", "application/cdmi-object")],
                br#"{"value":"x","mimetype":"text/plain"}"#,
            ))
            .await;
        assert_eq!(resp.status(), StatusCode::CREATED);
        let stored = gw.stored("/v1/A/C/by-accept").await;
        assert_eq!(stored.content_type(), "text/plain");
        assert_eq!(stored.body.as_ref(), b"x");

        // No slash, no hints: object.
        let resp = gw
            .call(request(
                Method::PUT,
                "/cdmi/A/C/plain",
                true,
                &[],
                br#"{"value":"y","mimetype":"text/plain"}"#,
            ))
            .await;
        assert_eq!(resp.status(), StatusCode::CREATED);
        assert_eq!(gw.stored("/v1/A/C/plain").await.body.as_ref(), b"y");
    }

    #[tokio::test]
    async fn test_should_route_native_writes_by_slash() {
        let gw = gateway_with_container().await;

        let resp = gw
            .call(request(Method::PUT, "/cdmi/A/C/native/", false, &[], b""))
            .await;
        assert_eq!(resp.status(), StatusCode::CREATED);
        assert_eq!(gw.stored("/v1/A/C/native").await.content_type(), DIRECTORY_MARKER);

        let resp = gw
            .call(request(
                Method::PUT,
                "/cdmi/A/C/native/raw.txt",
                false,
                &[("content-type", "text/plain")],
                b"raw",
            ))
            .await;
        assert_eq!(resp.status(), StatusCode::CREATED);
        assert_eq!(gw.stored("/v1/A/C/native/raw.txt").await.body.as_ref(), b"raw");
    }

    #[tokio::test]
    async fn test_should_conflict_when_read_intent_mismatches() {
        let gw = gateway_with_container().await;
        gw.seed("/v1/A/C/dir", Some(DIRECTORY_MARKER), b"").await;
        gw.seed("/v1/A/C/file", Some("text/plain"), b"f").await;

        let resp = gw
            .call(request(Method::GET, "/cdmi/A/C/file/", true, &[], b""))
            .await;
        assert_eq!(resp.status(), StatusCode::CONFLICT);

        let resp = gw
            .call(request(Method::GET, "/cdmi/A/C/dir", true, &[], b""))
            .await;
        assert_eq!(resp.status(), StatusCode::CONFLICT);

        // An explicit container Accept settles the intent without a slash.
        let resp = gw
            .call(request(
                Method::GET,
                "/cdmi/A/C/dir",
                true,
                &[("accept", "application/cdmi-container")],
                b"",
            ))
            .await;
        assert_eq!(resp.status(), StatusCode::OK);
        let json = body_json(resp).await;
        assert_eq!(json["objectName"], "dir/");
    }
}
