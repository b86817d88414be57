//! Backend client error types.
//!
//! Defines [`GatewayError`], the failures the gateway can hit while talking
//! to the backend. Converting to [`CdmiError`] via [`From`] preserves the
//! status a client should see: transport failures become 502, timeouts 504,
//! and unexpected backend statuses pass through unchanged.
//!
//! # Usage
//!
//! ```
//! use cdmi_core::error::GatewayError;
//! use cdmi_model::error::CdmiError;
//!
//! let err = GatewayError::Timeout {
//!     path: "/v1/acct/c".to_owned(),
//! };
//! let cdmi: CdmiError = err.into();
//! assert_eq!(cdmi.status_code, http::StatusCode::GATEWAY_TIMEOUT);
//! ```

use cdmi_model::error::CdmiError;

/// Backend client error type.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    /// The backend could not be reached or the exchange failed mid-flight.
    #[error("backend request to {path} failed: {source}")]
    Transport {
        /// Backend path of the failed request.
        path: String,
        /// The underlying client error.
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// The backend did not answer within the configured timeout.
    #[error("backend request to {path} timed out")]
    Timeout {
        /// Backend path of the timed out request.
        path: String,
    },

    /// The backend answered with a status the caller cannot interpret.
    #[error("backend returned {status} for {path}")]
    UnexpectedStatus {
        /// The backend status.
        status: http::StatusCode,
        /// Backend path of the request.
        path: String,
    },

    /// The configured backend URL cannot be combined with a request path.
    #[error("invalid backend url {url}: {reason}")]
    InvalidBackendUrl {
        /// The offending URL.
        url: String,
        /// Why it was rejected.
        reason: String,
    },
}

impl GatewayError {
    /// The status a client should see for this failure.
    #[must_use]
    pub fn status_code(&self) -> http::StatusCode {
        match self {
            Self::Transport { .. } | Self::InvalidBackendUrl { .. } => http::StatusCode::BAD_GATEWAY,
            Self::Timeout { .. } => http::StatusCode::GATEWAY_TIMEOUT,
            Self::UnexpectedStatus { status, .. } => *status,
        }
    }
}

impl From<GatewayError> for CdmiError {
    fn from(err: GatewayError) -> Self {
        let status = err.status_code();
        let message = match &err {
            GatewayError::UnexpectedStatus { status, .. } => status
                .canonical_reason()
                .unwrap_or("Unexpected backend status")
                .to_owned(),
            other => other.to_string(),
        };
        let resource = match &err {
            GatewayError::Transport { path, .. }
            | GatewayError::Timeout { path }
            | GatewayError::UnexpectedStatus { path, .. } => path.clone(),
            GatewayError::InvalidBackendUrl { url, .. } => url.clone(),
        };
        CdmiError::upstream(status, message)
            .with_resource(resource)
            .with_source(err)
    }
}
