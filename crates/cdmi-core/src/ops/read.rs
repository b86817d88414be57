//! Container and data object reads.
//!
//! A read first probes the path to learn whether it names a container (real
//! or virtual) or a data object, then checks that against the intent the
//! client expressed (trailing slash or container content negotiation). A
//! mismatch in either direction is a `Conflict`.

use base64::Engine;
use bytes::Bytes;
use cdmi_http::body::CdmiResponseBody;
use cdmi_http::request::ReadQuery;
use cdmi_http::response::json_response;
use cdmi_model::error::CdmiError;
use cdmi_model::headers::{
    CDMI_CONTAINER, CDMI_OBJECT, ENCODING_BASE64, ENCODING_UTF8, JSON_UTF8, VALUE_ENCODING,
};
use cdmi_model::metadata::MetadataMap;
use cdmi_model::representation::{COMPLETE, ContainerRepresentation, ObjectRepresentation};
use http::{HeaderValue, StatusCode, header};
use tracing::debug;

use super::metadata_prefix;
use crate::backend::{BackendRequest, BackendResponse};
use crate::error::GatewayError;
use crate::gateway::{CdmiGateway, OperationRequest, passthrough_response};
use crate::probe::ProbeResult;

/// Whether an object value must be base64-encoded in a dialect response.
fn needs_base64(stored_encoding: &str, mimetype: &str, value: &[u8]) -> bool {
    stored_encoding.eq_ignore_ascii_case(ENCODING_BASE64)
        || !mimetype.to_ascii_lowercase().starts_with("text/")
        || std::str::from_utf8(value).is_err()
}

#[allow(clippy::unused_async)]
impl CdmiGateway {
    /// Read a container or a data object.
    pub(crate) async fn handle_read(
        &self,
        req: &OperationRequest,
    ) -> Result<http::Response<CdmiResponseBody>, CdmiError> {
        let path = &req.ctx.path;
        let probe = self
            .prober(req.token.as_ref())
            .probe(path, true)
            .await?;
        if probe.is_absent() {
            return Err(CdmiError::no_such_key(path.to_string()));
        }

        let wants_container = req.ctx.negotiation.wants_container();
        if probe.is_container != wants_container {
            debug!(
                path = %path,
                is_container = probe.is_container,
                wants_container,
                "read intent does not match resource type"
            );
            return Err(CdmiError::conflict(path.to_string()));
        }

        if probe.is_container {
            self.read_container(req, &probe)
        } else {
            self.read_object(req, probe).await
        }
    }

    fn read_container(
        &self,
        req: &OperationRequest,
        probe: &ProbeResult,
    ) -> Result<http::Response<CdmiResponseBody>, CdmiError> {
        let path = &req.ctx.path;
        let account = path.account.as_deref().unwrap_or_default();
        let container = path.container.as_deref().unwrap_or_default();

        let (object_name, parent_uri) = match path.object.as_deref() {
            Some(object) => (
                format!("{object}/"),
                self.uri(&[account, container, path.parent.as_deref().unwrap_or_default()]),
            ),
            None => (format!("{container}/"), self.uri(&[account])),
        };
        let children = probe.rendered_children();
        debug!(path = %path, children = children.len(), is_virtual = probe.is_virtual(), "container read");

        let repr = ContainerRepresentation {
            object_type: CDMI_CONTAINER.to_owned(),
            object_name,
            parent_uri,
            capabilities_uri: self.uri(&[account, &self.config.cdmi_capability_id, "container"]),
            completion_status: COMPLETE.to_owned(),
            metadata: MetadataMap::from_headers(&probe.headers, metadata_prefix(path)),
            children_range: Some(format!("0-{}", children.len())),
            children: Some(children),
        };
        json_response(StatusCode::OK, JSON_UTF8, &repr)
    }

    async fn read_object(
        &self,
        req: &OperationRequest,
        probe: ProbeResult,
    ) -> Result<http::Response<CdmiResponseBody>, CdmiError> {
        let path = &req.ctx.path;
        let backend_path = path.backend_path(self.api_prefix());
        let query = ReadQuery::from_params(&req.ctx.query_params);

        if !req.is_dialect() {
            let mut request = BackendRequest::get(&backend_path)
                .with_token(req.token.as_ref())
                .with_query_pairs(query.params);
            if let Some(range) = query.range.as_deref() {
                request = request.with_header(header::RANGE, range_header(range)?);
            } else if let Some(range) = req.parts.headers.get(header::RANGE) {
                request = request.with_header(header::RANGE, range.clone());
            }
            return passthrough_response(self.send(request).await?);
        }

        let (status, value) = if query.range.is_some() || !query.params.is_empty() {
            let mut request = BackendRequest::get(&backend_path)
                .with_token(req.token.as_ref())
                .with_query_pairs(query.params);
            if let Some(range) = query.range.as_deref() {
                request = request.with_header(header::RANGE, range_header(range)?);
            }
            let resp = self.send(request).await?;
            checked_value(resp, &backend_path)?
        } else {
            (probe.status.unwrap_or(StatusCode::OK), probe.body)
        };

        let account = path.account.as_deref().unwrap_or_default();
        let header_str = |name: &str| probe.headers.get(name).and_then(|v| v.to_str().ok());
        let mimetype = header_str(header::CONTENT_TYPE.as_str())
            .unwrap_or_default()
            .to_owned();
        let stored_encoding = header_str(VALUE_ENCODING).unwrap_or(ENCODING_UTF8);

        let (encoding, rendered) = if needs_base64(stored_encoding, &mimetype, &value) {
            (
                ENCODING_BASE64.to_owned(),
                base64::engine::general_purpose::STANDARD.encode(&value),
            )
        } else {
            (
                stored_encoding.to_owned(),
                String::from_utf8_lossy(&value).into_owned(),
            )
        };
        debug!(path = %path, %status, bytes = value.len(), %encoding, "object read");

        let repr = ObjectRepresentation {
            object_type: CDMI_OBJECT.to_owned(),
            object_name: path.object.clone().unwrap_or_default(),
            parent_uri: self.uri(&[
                account,
                path.container.as_deref().unwrap_or_default(),
                path.parent.as_deref().unwrap_or_default(),
            ]),
            capabilities_uri: self.uri(&[account, &self.config.cdmi_capability_id, "dataobject"]),
            completion_status: COMPLETE.to_owned(),
            metadata: MetadataMap::from_headers(&probe.headers, metadata_prefix(path)),
            mimetype: Some(mimetype),
            value_transfer_encoding: Some(encoding),
            value: Some(rendered),
            value_range: Some(format!("0-{}", value.len())),
        };
        json_response(status, CDMI_OBJECT, &repr)
    }
}

fn range_header(range: &str) -> Result<HeaderValue, CdmiError> {
    HeaderValue::from_str(range).map_err(|e| CdmiError::invalid_range(range).with_source(e))
}

/// The status and body of a successful value fetch.
fn checked_value(resp: BackendResponse, path: &str) -> Result<(StatusCode, Bytes), CdmiError> {
    match resp.status {
        StatusCode::OK | StatusCode::PARTIAL_CONTENT => Ok((resp.status, resp.body)),
        StatusCode::NOT_FOUND => Err(CdmiError::no_such_key(path)),
        StatusCode::RANGE_NOT_SATISFIABLE => Err(CdmiError::invalid_range(path)),
        status => Err(GatewayError::UnexpectedStatus {
            status,
            path: path.to_owned(),
        }
        .into()),
    }
}
