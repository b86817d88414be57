//! CDMI operation handlers.
//!
//! Each submodule adds `handle_*` methods to [`crate::gateway::CdmiGateway`],
//! one per [`CdmiOperation`](cdmi_model::CdmiOperation). The
//! [`GatewayHandler`](crate::handler::GatewayHandler) dispatch table maps
//! routed requests onto them.

pub mod account;
pub mod capability;
pub mod container;
pub mod delete;
pub mod login;
pub mod object;
pub mod passthrough;
pub mod read;

use cdmi_model::error::CdmiError;
use cdmi_model::headers::{CONTAINER_META_PREFIX, OBJECT_META_PREFIX};
use cdmi_model::path::ResourcePath;
use http::HeaderValue;

/// Metadata header prefix of the backend resource behind `path`: top-level
/// containers use container metadata, everything below uses object metadata.
pub(crate) fn metadata_prefix(path: &ResourcePath) -> &'static str {
    if path.has_object() {
        OBJECT_META_PREFIX
    } else {
        CONTAINER_META_PREFIX
    }
}

/// Build a header value from client-supplied text.
pub(crate) fn header_value(value: &str, what: &str) -> Result<HeaderValue, CdmiError> {
    HeaderValue::from_str(value).map_err(|e| {
        cdmi_model::cdmi_error!(InvalidContent, format!("{what} is not a valid header value"))
            .with_source(e)
    })
}

/// Reject paths that lack the segments an operation needs.
pub(crate) fn bad_path(path: &ResourcePath) -> CdmiError {
    cdmi_model::cdmi_error!(BadRequestPath).with_resource(path.to_string())
}
