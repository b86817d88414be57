//! Login passthrough.
//!
//! `GET /<root>/` forwards the client's credential headers to the backend
//! auth endpoint and rewrites the returned storage URL so that it points at
//! the gateway's mount prefix instead of the backend API prefix.

use cdmi_http::body::CdmiResponseBody;
use cdmi_http::response::empty_response;
use cdmi_model::error::CdmiError;
use cdmi_model::headers::{AUTH_TOKEN, STORAGE_TOKEN, STORAGE_URL};
use http::{StatusCode, header};
use tracing::debug;

use super::header_value;
use crate::backend::BackendRequest;
use crate::gateway::{CdmiGateway, OperationRequest};

#[allow(clippy::unused_async)]
impl CdmiGateway {
    /// Authenticate against the backend.
    pub(crate) async fn handle_login(
        &self,
        req: &OperationRequest,
    ) -> Result<http::Response<CdmiResponseBody>, CdmiError> {
        let mut request = BackendRequest::get(&self.config.backend_auth_path);
        for (name, value) in &req.parts.headers {
            if name == header::HOST || name == header::CONTENT_LENGTH {
                continue;
            }
            request.headers.append(name.clone(), value.clone());
        }

        let resp = self.send(request).await?;
        debug!(status = resp.status.as_u16(), "login forwarded");
        if resp.status != StatusCode::OK {
            return empty_response(resp.status);
        }

        let mut out = empty_response(StatusCode::OK)?;
        let headers = out.headers_mut();
        if let Some(token) = resp.headers.get(AUTH_TOKEN) {
            headers.insert(AUTH_TOKEN, token.clone());
        }
        if let Some(token) = resp.headers.get(STORAGE_TOKEN) {
            headers.insert(STORAGE_TOKEN, token.clone());
        }
        if let Some(storage_url) = resp.header_str(STORAGE_URL) {
            let rewritten = self.rewrite_storage_url(req, storage_url);
            headers.insert(STORAGE_URL, header_value(&rewritten, "storage URL")?);
        }
        Ok(out)
    }

    /// `<scheme>://<host>/<root>/<account part>` for a backend storage URL.
    fn rewrite_storage_url(&self, req: &OperationRequest, storage_url: &str) -> String {
        let scheme = req.parts.uri.scheme_str().unwrap_or("http");
        let host = req
            .header_str(header::HOST.as_str())
            .or_else(|| req.parts.uri.authority().map(http::uri::Authority::as_str))
            .unwrap_or("localhost");
        let marker = format!("/{}/", self.api_prefix());
        let account_part = storage_url
            .split_once(&marker)
            .map_or("", |(_, rest)| rest);
        format!("{scheme}://{host}/{}/{account_part}", self.config.root())
    }
}
