//! Container CRUD integration tests, including virtual containers.

#[cfg(test)]
mod tests {
    use http::{Method, StatusCode};

    use crate::{TestGateway, body_bytes, body_json, request};

    const CONTAINER: (&str, &str) = ("content-type", "application/cdmi-container");

    #[tokio::test]
    async fn test_should_create_nested_containers_and_list_them() {
        let gw = TestGateway::new();

        let resp = gw
            .call(request(
                Method::PUT,
                "/cdmi/A/photos/",
                true,
                &[CONTAINER],
                br#"{"metadata":{"owner":"alice"}}"#,
            ))
            .await;
        assert_eq!(resp.status(), StatusCode::CREATED);

        let resp = gw
            .call(request(Method::PUT, "/cdmi/A/photos/2024/", true, &[CONTAINER], b""))
            .await;
        assert_eq!(resp.status(), StatusCode::CREATED);
        let json = body_json(resp).await;
        assert_eq!(json["objectName"], "2024/");
        assert_eq!(json["parentURI"], "/cdmi/A/photos/");

        let resp = gw
            .call(request(Method::GET, "/cdmi/A/photos/", true, &[], b""))
            .await;
        assert_eq!(resp.status(), StatusCode::OK);
        let json = body_json(resp).await;
        assert_eq!(json["objectType"], "application/cdmi-container");
        assert_eq!(json["metadata"]["owner"], "alice");
        assert_eq!(json["children"], serde_json::json!(["2024/"]));
        assert_eq!(json["childrenRange"], "0-1");
    }

    #[tokio::test]
    async fn test_should_read_prefix_without_marker_as_virtual_container() {
        let gw = TestGateway::new();
        gw.seed("/v1/A/C", None, b"").await;
        gw.seed("/v1/A/C/x/y/file.txt", Some("text/plain"), b"hi").await;

        let resp = gw
            .call(request(Method::GET, "/cdmi/A/C/x/", true, &[], b""))
            .await;
        assert_eq!(resp.status(), StatusCode::OK);
        let json = body_json(resp).await;
        assert_eq!(json["objectName"], "x/");
        assert_eq!(json["parentURI"], "/cdmi/A/C/");
        assert_eq!(json["children"], serde_json::json!(["y/"]));
        assert_eq!(json["metadata"], serde_json::json!({}));
    }

    #[tokio::test]
    async fn test_should_refuse_container_under_missing_parent() {
        let gw = TestGateway::new();
        gw.seed("/v1/A/C", None, b"").await;

        let resp = gw
            .call(request(Method::PUT, "/cdmi/A/C/ghost/child/", true, &[CONTAINER], b""))
            .await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        let body = body_bytes(resp).await;
        assert_eq!(body.as_ref(), b"The parent container does not exist");
    }

    #[tokio::test]
    async fn test_should_answer_container_update_without_body() {
        let gw = TestGateway::new();
        gw.seed("/v1/A/C", None, b"").await;

        let resp = gw
            .call(request(Method::PUT, "/cdmi/A/C/", true, &[CONTAINER], b"{}"))
            .await;
        assert_eq!(resp.status(), StatusCode::ACCEPTED);
        assert!(body_bytes(resp).await.is_empty());
    }

    #[tokio::test]
    async fn test_should_delete_only_empty_containers() {
        let gw = TestGateway::new();
        gw.seed("/v1/A/C", None, b"").await;
        gw.seed("/v1/A/C/dir", Some("application/directory"), b"").await;
        gw.seed("/v1/A/C/dir/file", Some("text/plain"), b"x").await;

        let resp = gw
            .call(request(Method::DELETE, "/cdmi/A/C/dir/", true, &[], b""))
            .await;
        assert_eq!(resp.status(), StatusCode::CONFLICT);

        let resp = gw
            .call(request(Method::DELETE, "/cdmi/A/C/dir/file", true, &[], b""))
            .await;
        assert_eq!(resp.status(), StatusCode::NO_CONTENT);

        let resp = gw
            .call(request(Method::DELETE, "/cdmi/A/C/dir/", true, &[], b""))
            .await;
        assert_eq!(resp.status(), StatusCode::NO_CONTENT);
        assert!(gw.store.object_keys("A", "C").is_empty());

        let resp = gw
            .call(request(Method::DELETE, "/cdmi/A/C/", true, &[], b""))
            .await;
        assert_eq!(resp.status(), StatusCode::NO_CONTENT);
        assert_eq!(gw.store.container_count("A"), 0);
    }
}
