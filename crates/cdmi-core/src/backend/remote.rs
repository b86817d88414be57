//! HTTP backend client.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::debug;

use super::{Backend, BackendRequest, BackendResponse};
use crate::error::GatewayError;

/// A remote object store reached over HTTP.
///
/// Every call honors the configured timeout. The client keeps a connection
/// pool and is cheap to clone.
#[derive(Debug, Clone)]
pub struct HttpBackend {
    client: Client,
    base_url: String,
}

impl HttpBackend {
    /// Create a client for the store at `base_url`.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::InvalidBackendUrl`] if the URL is not an
    /// absolute http(s) URL, or [`GatewayError::Transport`] if the client
    /// cannot be initialized.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, GatewayError> {
        let base_url = base_url.trim().trim_end_matches('/').to_owned();
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(GatewayError::InvalidBackendUrl {
                url: base_url,
                reason: "expected an http:// or https:// URL".to_owned(),
            });
        }
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| GatewayError::Transport {
                path: base_url.clone(),
                source: Box::new(e),
            })?;
        Ok(Self { client, base_url })
    }

    /// The base URL requests are sent to.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url_for(&self, request: &BackendRequest) -> String {
        format!("{}{}", self.base_url, request.path_and_query())
    }
}

#[async_trait]
impl Backend for HttpBackend {
    async fn send(&self, request: BackendRequest) -> Result<BackendResponse, GatewayError> {
        let url = self.url_for(&request);
        debug!(method = %request.method, %url, "sending backend request");

        let path = request.path.clone();
        let map_err = |e: reqwest::Error| {
            if e.is_timeout() {
                GatewayError::Timeout { path: path.clone() }
            } else {
                GatewayError::Transport {
                    path: path.clone(),
                    source: Box::new(e),
                }
            }
        };

        let resp = self
            .client
            .request(request.method, url)
            .headers(request.headers)
            .body(request.body)
            .send()
            .await
            .map_err(map_err)?;

        let status = resp.status();
        let headers = resp.headers().clone();
        let body = resp.bytes().await.map_err(map_err)?;
        debug!(status = status.as_u16(), bytes = body.len(), "backend response");

        Ok(BackendResponse {
            status,
            headers,
            body,
        })
    }
}
