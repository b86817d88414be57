//! Data object integration tests: envelopes, encodings, ranges, copies and
//! segmented uploads.

#[cfg(test)]
mod tests {
    use base64::Engine;
    use http::{Method, StatusCode};

    use crate::{TestGateway, body_bytes, body_json, request};

    const OBJECT: (&str, &str) = ("content-type", "application/cdmi-object");

    async fn gateway_with_container() -> TestGateway {
        let gw = TestGateway::new();
        gw.seed("/v1/A/C", None, b"").await;
        gw
    }

    #[tokio::test]
    async fn test_should_write_and_read_text_object() {
        let gw = gateway_with_container().await;

        let resp = gw
            .call(request(
                Method::PUT,
                "/cdmi/A/C/notes.txt",
                true,
                &[OBJECT],
                br#"{"value":"hello","mimetype":"text/plain","metadata":{"lang":"en"}}"#,
            ))
            .await;
        assert_eq!(resp.status(), StatusCode::CREATED);
        let json = body_json(resp).await;
        assert_eq!(json["objectName"], "notes.txt");
        assert_eq!(json["parentURI"], "/cdmi/A/C/");
        assert!(json.get("value").is_none());

        let resp = gw
            .call(request(Method::GET, "/cdmi/A/C/notes.txt", true, &[], b""))
            .await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(
            resp.headers().get("content-type").expect("content type"),
            "application/cdmi-object"
        );
        let json = body_json(resp).await;
        assert_eq!(json["value"], "hello");
        assert_eq!(json["mimetype"], "text/plain");
        assert_eq!(json["valuetransferencoding"], "utf-8");
        assert_eq!(json["valuerange"], "0-5");
        assert_eq!(json["metadata"]["lang"], "en");
    }

    #[tokio::test]
    async fn test_should_base64_encode_binary_written_natively() {
        let gw = gateway_with_container().await;

        let resp = gw
            .call(request(
                Method::PUT,
                "/cdmi/A/C/cat.jpg",
                false,
                &[("content-type", "image/jpeg")],
                b"\xff\xd8\xff\xe0",
            ))
            .await;
        assert_eq!(resp.status(), StatusCode::CREATED);

        let resp = gw
            .call(request(Method::GET, "/cdmi/A/C/cat.jpg", true, &[], b""))
            .await;
        let json = body_json(resp).await;
        assert_eq!(json["mimetype"], "image/jpeg");
        assert_eq!(json["valuetransferencoding"], "base64");
        assert_eq!(json["value"], "/9j/4A==");

        let resp = gw
            .call(request(Method::GET, "/cdmi/A/C/cat.jpg", false, &[], b""))
            .await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(body_bytes(resp).await.as_ref(), b"\xff\xd8\xff\xe0");
    }

    #[tokio::test]
    async fn test_should_store_decoded_base64_value() {
        let gw = gateway_with_container().await;
        let encoded = base64::engine::general_purpose::STANDARD.encode(b"\x00\x01binary");
        let body = format!(
            r#"{{"value":"{encoded}","valuetransferencoding":"base64","mimetype":"application/octet-stream"}}"#
        );
        let req = http::Request::builder()
            .method(Method::PUT)
            .uri("/cdmi/A/C/blob")
            .header("x-cdmi-specification-version", "1.0.1")
            .header("content-type", "application/cdmi-object")
            .body(bytes::Bytes::from(body))
            .expect("request");
        let resp = gw.call(req).await;
        assert_eq!(resp.status(), StatusCode::CREATED);

        let stored = gw.stored("/v1/A/C/blob").await;
        assert_eq!(stored.body.as_ref(), b"\x00\x01binary");
        assert_eq!(
            stored.header_str("x-object-meta-valuetransferencoding"),
            Some("base64")
        );
    }

    #[tokio::test]
    async fn test_should_read_value_range() {
        let gw = gateway_with_container().await;
        gw.seed("/v1/A/C/digits", Some("text/plain"), b"0123456789")
            .await;

        let resp = gw
            .call(request(
                Method::GET,
                "/cdmi/A/C/digits?value:bytes=2-4",
                true,
                &[],
                b"",
            ))
            .await;
        assert_eq!(resp.status(), StatusCode::PARTIAL_CONTENT);
        let json = body_json(resp).await;
        assert_eq!(json["value"], "234");
    }

    #[tokio::test]
    async fn test_should_copy_object_server_side() {
        let gw = gateway_with_container().await;
        gw.seed("/v1/A/C/src", Some("text/plain"), b"original").await;

        let resp = gw
            .call(request(
                Method::PUT,
                "/cdmi/A/C/dst",
                true,
                &[OBJECT],
                br#"{"copy":"C/src","mimetype":"text/plain"}"#,
            ))
            .await;
        assert_eq!(resp.status(), StatusCode::CREATED);
        assert_eq!(gw.stored("/v1/A/C/dst").await.body.as_ref(), b"original");
    }

    #[tokio::test]
    async fn test_should_accept_multipart_write() {
        let gw = gateway_with_container().await;
        let body: &'static [u8] = b"preamble\r\n--XYZ\r\n\
Content-Type: application/cdmi-object\r\n\r\n\
{\"metadata\":{\"k\":\"v\"}}\r\n\
--XYZ\r\n\
Content-Type: text/csv\r\n\r\n\
a,b\r\n\
--XYZ--\r\n";

        let resp = gw
            .call(request(
                Method::PUT,
                "/cdmi/A/C/table.csv",
                true,
                &[("content-type", "multipart/mixed; boundary=XYZ")],
                body,
            ))
            .await;
        assert_eq!(resp.status(), StatusCode::CREATED);

        let stored = gw.stored("/v1/A/C/table.csv").await;
        assert_eq!(stored.body.as_ref(), b"a,b");
        assert_eq!(stored.content_type(), "text/csv");
        assert_eq!(stored.header_str("x-object-meta-cdmi-k"), Some("k:v"));
    }

    #[tokio::test]
    async fn test_should_assemble_segmented_upload() {
        let gw = gateway_with_container().await;
        let upload = [("x-cdmi-uploadid", "u1"), OBJECT];

        let resp = gw
            .call(request(
                Method::PUT,
                "/cdmi/A/C/big",
                true,
                &[
                    upload[0],
                    upload[1],
                    ("x-cdmi-partial", "true"),
                    ("content-range", "bytes=0-4"),
                ],
                br#"{"value":"hello","mimetype":"text/plain"}"#,
            ))
            .await;
        assert_eq!(resp.status(), StatusCode::CREATED);

        // The final request carries no range: its payload becomes the next
        // segment and the manifest is set afterwards.
        let resp = gw
            .call(request(
                Method::PUT,
                "/cdmi/A/C/big",
                true,
                &[upload[0], upload[1], ("x-cdmi-partial", "false")],
                br#"{"value":" world","mimetype":"text/plain"}"#,
            ))
            .await;
        assert_eq!(resp.status(), StatusCode::CREATED);

        let keys = gw.store.object_keys("A", "C");
        assert_eq!(
            keys.iter().filter(|k| k.starts_with("big_segments/u1/")).count(),
            2
        );

        let resp = gw
            .call(request(Method::GET, "/cdmi/A/C/big", true, &[], b""))
            .await;
        assert_eq!(resp.status(), StatusCode::OK);
        let json = body_json(resp).await;
        assert_eq!(json["value"], "hello world");
        assert_eq!(json["valuerange"], "0-11");
    }

    #[tokio::test]
    async fn test_should_assemble_segments_sent_out_of_order() {
        let gw = gateway_with_container().await;

        let resp = gw
            .call(request(
                Method::PUT,
                "/cdmi/A/C/late",
                true,
                &[
                    ("x-cdmi-uploadid", "u2"),
                    OBJECT,
                    ("x-cdmi-partial", "true"),
                    ("content-range", "bytes=5-10"),
                ],
                br#"{"value":" world","mimetype":"text/plain"}"#,
            ))
            .await;
        assert_eq!(resp.status(), StatusCode::CREATED);

        let resp = gw
            .call(request(
                Method::PUT,
                "/cdmi/A/C/late",
                true,
                &[
                    ("x-cdmi-uploadid", "u2"),
                    OBJECT,
                    ("x-cdmi-partial", "false"),
                    ("content-range", "bytes=0-4"),
                ],
                br#"{"value":"hello","mimetype":"text/plain"}"#,
            ))
            .await;
        assert_eq!(resp.status(), StatusCode::CREATED);

        let resp = gw
            .call(request(Method::GET, "/cdmi/A/C/late", true, &[], b""))
            .await;
        assert_eq!(resp.status(), StatusCode::OK);
        let json = body_json(resp).await;
        assert_eq!(json["value"], "hello world");
    }

    #[tokio::test]
    async fn test_should_refuse_object_over_directory_marker() {
        let gw = gateway_with_container().await;
        gw.seed("/v1/A/C/dir", Some("application/directory"), b"")
            .await;

        let resp = gw
            .call(request(
                Method::PUT,
                "/cdmi/A/C/dir",
                true,
                &[OBJECT],
                br#"{"value":"x"}"#,
            ))
            .await;
        assert_eq!(resp.status(), StatusCode::CONFLICT);
    }
}
