//! Request classification.
//!
//! The [`CdmiRouter`] maps every incoming request to exactly one
//! [`CdmiOperation`] by looking at:
//!
//! - whether the path is under the configured mount prefix,
//! - the HTTP method,
//! - which of account / container / object the path carries,
//! - the dialect version header, `Accept`, `Content-Type`, and a trailing `/`.
//!
//! Anything it cannot classify is an error; there is no default handler.

use cdmi_model::error::{CdmiError, CdmiErrorCode};
use cdmi_model::negotiation::{AcceptOverride, NegotiationContext};
use cdmi_model::operations::CdmiOperation;
use cdmi_model::path::{ResourcePath, decode_path};
use http::Method;

/// Router configuration: the mount prefix and the capability label.
#[derive(Debug, Clone)]
pub struct CdmiRouter {
    /// Normalized mount prefix, e.g. `cdmi` or `api/cdmi`.
    root: String,
    /// Number of segments in `root`.
    root_len: usize,
    /// Label that introduces the capability subtree.
    capability_id: String,
}

/// The result of routing a request.
#[derive(Debug, Clone)]
pub struct RoutingContext {
    /// The chosen operation.
    pub operation: CdmiOperation,
    /// Decomposed resource path. Empty for [`CdmiOperation::Passthrough`].
    pub path: ResourcePath,
    /// Negotiation flags, including any override the router applied.
    pub negotiation: NegotiationContext,
    /// Query parameters in request order.
    pub query_params: Vec<(String, String)>,
}

impl CdmiRouter {
    /// Create a router for `root` (leading and trailing `/` and spaces are
    /// stripped) and the capability label.
    #[must_use]
    pub fn new(root: &str, capability_id: impl Into<String>) -> Self {
        let root = root.trim_matches(|c| c == '/' || c == ' ').to_owned();
        let root_len = if root.is_empty() {
            0
        } else {
            root.split('/').count()
        };
        Self {
            root,
            root_len,
            capability_id: capability_id.into(),
        }
    }

    /// The normalized mount prefix.
    #[must_use]
    pub fn root(&self) -> &str {
        &self.root
    }

    /// Whether `path` lies under the mount prefix (on a segment boundary).
    #[must_use]
    pub fn is_mounted(&self, path: &str) -> bool {
        if self.root.is_empty() {
            return true;
        }
        let trimmed = path.trim_start_matches(|c| c == '/' || c == ' ');
        trimmed
            .strip_prefix(self.root.as_str())
            .is_some_and(|rest| rest.is_empty() || rest.starts_with('/'))
    }

    /// Classify a request.
    ///
    /// # Errors
    ///
    /// - `InvalidURI` when the path does not percent-decode to UTF-8.
    /// - `BadRequest` for unsupported methods, an ambiguous dialect `PUT`,
    ///   or a `PUT`/`DELETE` without an account.
    pub fn resolve<B>(&self, req: &http::Request<B>) -> Result<RoutingContext, CdmiError> {
        let path = decode_path(req.uri().path())?;
        let query_params = parse_query_params(req.uri().query().unwrap_or(""));

        if !self.is_mounted(&path) {
            return Ok(RoutingContext {
                operation: CdmiOperation::Passthrough,
                path: ResourcePath::default(),
                negotiation: NegotiationContext::from_request(req.headers(), &path),
                query_params,
            });
        }

        let mut negotiation = NegotiationContext::from_request(req.headers(), &path);
        let resource = ResourcePath::decompose(&path, self.root_len, &self.capability_id);
        let operation = identify_operation(req.method(), &resource, &mut negotiation)?;

        Ok(RoutingContext {
            operation,
            path: resource,
            negotiation,
            query_params,
        })
    }
}

/// Pick the operation for a mounted request.
fn identify_operation(
    method: &Method,
    path: &ResourcePath,
    negotiation: &mut NegotiationContext,
) -> Result<CdmiOperation, CdmiError> {
    match *method {
        Method::GET => Ok(identify_read(path, negotiation)),
        Method::PUT => identify_write(path, negotiation),
        Method::DELETE => {
            if path.account.is_none() {
                return Err(CdmiError::bad_request("DELETE requires an account"));
            }
            Ok(CdmiOperation::Delete)
        }
        _ => Err(CdmiError::with_message(
            CdmiErrorCode::BadRequest,
            format!("method {method} is not supported"),
        )),
    }
}

fn identify_read(path: &ResourcePath, negotiation: &mut NegotiationContext) -> CdmiOperation {
    if path.is_capability_request {
        negotiation.accept_override = AcceptOverride::Capability;
        return CdmiOperation::CapabilityRead;
    }
    if path.account.is_none() {
        return CdmiOperation::Login;
    }
    if path.container.is_none() {
        if negotiation.is_dialect() {
            negotiation.accept_override = AcceptOverride::Container;
        }
        return CdmiOperation::AccountList;
    }
    if negotiation.wants_container() {
        negotiation.accept_override = AcceptOverride::Container;
    }
    CdmiOperation::Read
}

fn identify_write(
    path: &ResourcePath,
    negotiation: &mut NegotiationContext,
) -> Result<CdmiOperation, CdmiError> {
    if path.account.is_none() {
        return Err(CdmiError::bad_request("PUT requires an account"));
    }

    if !negotiation.is_dialect() {
        return Ok(if negotiation.has_trailing_slash {
            CdmiOperation::NonDialectContainerWrite
        } else {
            CdmiOperation::NonDialectObjectWrite
        });
    }

    // Headers outrank the trailing slash; the slash only decides when the
    // headers say nothing.
    let slash = negotiation.has_trailing_slash;
    let accept_object = negotiation.accept_is_object;
    if negotiation.accept_is_container
        || negotiation.content_is_container
        || (slash && !accept_object)
    {
        negotiation.accept_override = AcceptOverride::Container;
        Ok(CdmiOperation::ContainerWrite)
    } else if accept_object || negotiation.content_is_object || !slash {
        Ok(CdmiOperation::ObjectWrite)
    } else {
        Err(CdmiError::bad_request(
            "cannot tell whether a container or an object is meant",
        ))
    }
}

/// Parse a query string into decoded key/value pairs.
#[must_use]
pub fn parse_query_params(query: &str) -> Vec<(String, String)> {
    form_urlencoded::parse(query.as_bytes())
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect()
}
