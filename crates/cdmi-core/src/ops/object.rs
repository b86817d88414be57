//! Data object writes, dialect and native.
//!
//! Both flavours share the same guards (object slot and parent checks) and
//! the same write plan, so partial uploads work with either. They differ in
//! how the body is decoded and in what the client gets back: dialect writes
//! render an object representation on create, native writes see the backend
//! response unchanged.

use bytes::Bytes;
use cdmi_http::body::CdmiResponseBody;
use cdmi_http::request::{ObjectBody, decode_object_body};
use cdmi_http::response::{empty_response, json_response};
use cdmi_model::error::CdmiError;
use cdmi_model::headers::{
    CDMI_OBJECT, COPY_FROM, ENCODING_UTF8, NATIVE_OBJECT_META_PREFIX, OBJECT_MANIFEST,
    OBJECT_META_PREFIX, VALUE_ENCODING,
};
use cdmi_model::representation::{COMPLETE, ObjectRepresentation};
use http::{HeaderMap, HeaderName, StatusCode, header};
use tracing::{debug, info};

use super::{bad_path, header_value};
use crate::backend::{BackendRequest, BackendResponse};
use crate::gateway::{CdmiGateway, OperationRequest, passthrough_response};
use crate::upload::{ManifestMode, UploadSession, WritePlan, plan_write};

/// Content type stored when the client names none.
const DEFAULT_MIMETYPE: &str = "text/plain";

fn mimetype_or_default(mimetype: Option<&str>) -> String {
    mimetype
        .map(str::trim)
        .filter(|m| !m.is_empty())
        .unwrap_or(DEFAULT_MIMETYPE)
        .to_ascii_lowercase()
}

/// Result of executing a [`WritePlan`].
struct WriteOutcome {
    /// Response of the main write, with the status of the manifest write
    /// folded in when one followed.
    response: BackendResponse,
    /// Status of the main write alone.
    main_status: StatusCode,
}

#[allow(clippy::unused_async)]
impl CdmiGateway {
    /// Create or replace a data object from a dialect body.
    pub(crate) async fn handle_object_write(
        &self,
        req: &OperationRequest,
    ) -> Result<http::Response<CdmiResponseBody>, CdmiError> {
        let path = &req.ctx.path;
        if path.container.is_none() || !path.has_object() {
            return Err(bad_path(path));
        }

        let body = if req.body.iter().all(u8::is_ascii_whitespace) {
            ObjectBody::default()
        } else {
            decode_object_body(req.content_type(), &req.body, true)?
        };
        let session = UploadSession::from_headers(&req.parts.headers)?;
        let prober = self.prober(req.token.as_ref());
        prober.check_object_slot(path).await?;

        let payload = if body.copy.is_some() {
            Bytes::new()
        } else {
            body.decoded_value()?
        };
        let plan = plan_write(
            &prober,
            self.api_prefix(),
            path,
            session.as_ref(),
            payload.len() as u64,
        )
        .await?;

        let mut headers = HeaderMap::new();
        let mimetype = mimetype_or_default(body.mimetype.as_deref());
        headers.insert(header::CONTENT_TYPE, header_value(&mimetype, "mimetype")?);
        let metadata = body.metadata_map();
        metadata.write_headers(&mut headers, OBJECT_META_PREFIX)?;
        let encoding = body
            .value_transfer_encoding
            .as_deref()
            .unwrap_or(ENCODING_UTF8)
            .to_ascii_lowercase();
        headers.insert(
            HeaderName::from_static(VALUE_ENCODING),
            header_value(&encoding, "valuetransferencoding")?,
        );
        if let Some(copy) = body.copy.as_deref() {
            headers.insert(
                HeaderName::from_static(COPY_FROM),
                header_value(copy, "copy source")?,
            );
        }

        let outcome = self.execute_write(req, &plan, headers, payload).await?;
        if outcome.main_status != StatusCode::CREATED {
            return empty_response(outcome.response.status);
        }
        info!(path = %path, target = %plan.target_path, "object written");

        let account = path.account.as_deref().unwrap_or_default();
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
            metadata,
            mimetype: None,
            value_transfer_encoding: None,
            value: None,
            value_range: None,
        };
        json_response(outcome.response.status, CDMI_OBJECT, &repr)
    }

    /// Create or replace an object with the raw request body.
    pub(crate) async fn handle_non_dialect_object_write(
        &self,
        req: &OperationRequest,
    ) -> Result<http::Response<CdmiResponseBody>, CdmiError> {
        let path = &req.ctx.path;
        if path.container.is_none() || !path.has_object() {
            return Err(bad_path(path));
        }

        let body = decode_object_body(req.content_type(), &req.body, false)?;
        let session = UploadSession::from_headers(&req.parts.headers)?;
        let prober = self.prober(req.token.as_ref());
        prober.check_object_slot(path).await?;

        let payload = body.value.clone().unwrap_or_default();
        let plan = plan_write(
            &prober,
            self.api_prefix(),
            path,
            session.as_ref(),
            payload.len() as u64,
        )
        .await?;

        let mut headers = HeaderMap::new();
        let mimetype = mimetype_or_default(body.mimetype.as_deref());
        headers.insert(header::CONTENT_TYPE, header_value(&mimetype, "mimetype")?);
        for (name, value) in req.headers_with_prefix(NATIVE_OBJECT_META_PREFIX) {
            headers.insert(name.clone(), value.clone());
        }

        let outcome = self.execute_write(req, &plan, headers, payload).await?;
        passthrough_response(outcome.response)
    }

    /// Issue the main write of `plan` and, when the plan calls for it, the
    /// manifest write that completes a partial upload.
    async fn execute_write(
        &self,
        req: &OperationRequest,
        plan: &WritePlan,
        mut headers: HeaderMap,
        payload: Bytes,
    ) -> Result<WriteOutcome, CdmiError> {
        let manifest = plan
            .manifest
            .as_deref()
            .map(|m| header_value(m, "manifest"))
            .transpose()?;
        if plan.mode == ManifestMode::Inline {
            if let Some(manifest) = manifest.clone() {
                headers.insert(HeaderName::from_static(OBJECT_MANIFEST), manifest);
            }
        }

        let mut request = BackendRequest::put(&plan.target_path)
            .with_token(req.token.as_ref())
            .with_body(payload);
        request.headers.extend(headers.clone());
        let mut response = self.send(request).await?;
        let main_status = response.status;
        debug!(target = %plan.target_path, status = main_status.as_u16(), "object put");

        if main_status.is_success() && plan.needs_follow_up() {
            if let Some(manifest) = manifest {
                headers.remove(COPY_FROM);
                headers.insert(HeaderName::from_static(OBJECT_MANIFEST), manifest);
                let mut follow_up =
                    BackendRequest::put(&plan.logical_path).with_token(req.token.as_ref());
                follow_up.headers.extend(headers);
                let manifest_resp = self.send(follow_up).await?;
                debug!(
                    path = %plan.logical_path,
                    status = manifest_resp.status.as_u16(),
                    "manifest put"
                );
                response.status = manifest_resp.status;
            }
        }

        Ok(WriteOutcome {
            response,
            main_status,
        })
    }
}
