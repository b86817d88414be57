//! Gateway configuration.
//!
//! Provides [`GatewayConfig`] for configuring the CDMI gateway. Values are
//! loaded once at startup from environment variables and shared read-only
//! behind an `Arc`.

use std::time::Duration;

use cdmi_http::service::CdmiHttpConfig;
use serde::{Deserialize, Serialize};
use typed_builder::TypedBuilder;

/// Which backend implementation serves the flat object namespace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// A remote object store reached over HTTP.
    #[default]
    Http,
    /// The process-local in-memory store.
    Memory,
}

impl BackendKind {
    /// Parse a backend name. Unknown names fall back to [`BackendKind::Http`].
    #[must_use]
    pub fn parse(value: &str) -> Self {
        if value.trim().eq_ignore_ascii_case("memory") {
            Self::Memory
        } else {
            Self::Http
        }
    }
}

/// CDMI gateway configuration.
///
/// # Examples
///
/// ```
/// use cdmi_core::config::GatewayConfig;
///
/// let config = GatewayConfig::default();
/// assert_eq!(config.gateway_listen, "0.0.0.0:8080");
/// assert_eq!(config.root(), "cdmi");
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, TypedBuilder)]
#[serde(rename_all = "camelCase")]
pub struct GatewayConfig {
    /// Bind address for the gateway (e.g. `"0.0.0.0:8080"`).
    #[builder(default = String::from("0.0.0.0:8080"))]
    pub gateway_listen: String,

    /// Mount prefix of the dialect namespace. May span several segments.
    #[builder(default = String::from("cdmi"))]
    pub cdmi_root: String,

    /// Comma-separated list of accepted dialect versions.
    #[builder(default = String::from("1.0.1"))]
    pub cdmi_version_supported: String,

    /// Path label of the capability subtree.
    #[builder(default = String::from("cdmi_capabilities"))]
    pub cdmi_capability_id: String,

    /// Backend implementation.
    #[builder(default)]
    pub backend: BackendKind,

    /// Base URL of the HTTP backend.
    #[builder(default = String::from("http://127.0.0.1:8081"))]
    pub backend_url: String,

    /// API version segment prepended to every backend storage path.
    #[builder(default = String::from("v1"))]
    pub backend_api_prefix: String,

    /// Path of the backend auth endpoint.
    #[builder(default = String::from("/auth/v1.0"))]
    pub backend_auth_path: String,

    /// Per-call backend timeout in seconds.
    #[builder(default = 30)]
    pub backend_timeout_secs: u64,

    /// Log level filter string (e.g. `"info"`, `"debug"`).
    #[builder(default = String::from("info"))]
    pub log_level: String,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            gateway_listen: String::from("0.0.0.0:8080"),
            cdmi_root: String::from("cdmi"),
            cdmi_version_supported: String::from("1.0.1"),
            cdmi_capability_id: String::from("cdmi_capabilities"),
            backend: BackendKind::Http,
            backend_url: String::from("http://127.0.0.1:8081"),
            backend_api_prefix: String::from("v1"),
            backend_auth_path: String::from("/auth/v1.0"),
            backend_timeout_secs: 30,
            log_level: String::from("info"),
        }
    }
}

impl GatewayConfig {
    /// Load configuration from environment variables.
    ///
    /// Reads the following environment variables (falling back to defaults):
    ///
    /// | Variable | Default |
    /// |----------|---------|
    /// | `GATEWAY_LISTEN` | `0.0.0.0:8080` |
    /// | `CDMI_ROOT` | `cdmi` |
    /// | `CDMI_VERSION_SUPPORTED` | `1.0.1` |
    /// | `CDMI_CAPABILITY_ID` | `cdmi_capabilities` |
    /// | `CDMI_BACKEND` | `http` |
    /// | `BACKEND_URL` | `http://127.0.0.1:8081` |
    /// | `BACKEND_API_PREFIX` | `v1` |
    /// | `BACKEND_AUTH_PATH` | `/auth/v1.0` |
    /// | `BACKEND_TIMEOUT_SECS` | `30` |
    /// | `LOG_LEVEL` | `info` |
    #[must_use]
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(v) = std::env::var("GATEWAY_LISTEN") {
            config.gateway_listen = v;
        }
        if let Ok(v) = std::env::var("CDMI_ROOT") {
            config.cdmi_root = v;
        }
        if let Ok(v) = std::env::var("CDMI_VERSION_SUPPORTED") {
            config.cdmi_version_supported = v;
        }
        if let Ok(v) = std::env::var("CDMI_CAPABILITY_ID") {
            config.cdmi_capability_id = v;
        }
        if let Ok(v) = std::env::var("CDMI_BACKEND") {
            config.backend = BackendKind::parse(&v);
        }
        if let Ok(v) = std::env::var("BACKEND_URL") {
            config.backend_url = v;
        }
        if let Ok(v) = std::env::var("BACKEND_API_PREFIX") {
            config.backend_api_prefix = v;
        }
        if let Ok(v) = std::env::var("BACKEND_AUTH_PATH") {
            config.backend_auth_path = v;
        }
        if let Ok(v) = std::env::var("BACKEND_TIMEOUT_SECS") {
            if let Ok(n) = v.parse::<u64>() {
                config.backend_timeout_secs = n;
            }
        }
        if let Ok(v) = std::env::var("LOG_LEVEL") {
            config.log_level = v;
        }

        config
    }

    /// The normalized mount prefix: leading and trailing `/` and spaces removed.
    #[must_use]
    pub fn root(&self) -> &str {
        self.cdmi_root.trim_matches(|c| c == '/' || c == ' ')
    }

    /// The API prefix without surrounding slashes.
    #[must_use]
    pub fn api_prefix(&self) -> &str {
        self.backend_api_prefix.trim_matches('/')
    }

    /// Accepted dialect versions, trimmed, empty entries dropped.
    #[must_use]
    pub fn supported_versions(&self) -> Vec<String> {
        self.cdmi_version_supported
            .split(',')
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_owned)
            .collect()
    }

    /// Per-call backend timeout.
    #[must_use]
    pub fn backend_timeout(&self) -> Duration {
        Duration::from_secs(self.backend_timeout_secs)
    }

    /// The subset of settings the HTTP layer needs.
    #[must_use]
    pub fn http_config(&self) -> CdmiHttpConfig {
        CdmiHttpConfig {
            root: self.root().to_owned(),
            capability_id: self.cdmi_capability_id.clone(),
            supported_versions: self.supported_versions(),
        }
    }
}
