//! The closed CDMI error taxonomy.
//!
//! Every failure the gateway reports on its own behalf is one of the
//! [`CdmiErrorCode`] variants below. Each code has a fixed HTTP status and a
//! fixed message, so a handler that hits a known condition can build the
//! terminal response without consulting the backend again.
//!
//! Codes that fall outside the taxonomy are carried as
//! [`CdmiErrorCode::Custom`] and default to `400 Unknown Error`. The one
//! exception is backend failure surfacing, which keeps the status the backend
//! (or the transport) produced; see [`CdmiError::upstream`].

use std::fmt;

/// Named failure conditions reported by the gateway.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum CdmiErrorCode {
    /// AccessDenied error.
    AccessDenied,
    /// ContainerAlreadyExists error.
    ContainerAlreadyExists,
    /// ContainerNotEmpty error.
    ContainerNotEmpty,
    /// Conflict error: the name exists as a different resource type.
    Conflict,
    /// InvalidArgument error.
    InvalidArgument,
    /// InvalidContainerName error.
    InvalidContainerName,
    /// InvalidURI error.
    InvalidURI,
    /// InvalidHeader error.
    InvalidHeader,
    /// InvalidContent error.
    InvalidContent,
    /// BadRequest error.
    BadRequest,
    /// NotContainer error.
    NotContainer,
    /// BadRequestPath error.
    BadRequestPath,
    /// InconsistantState error: the backend returned something unparseable.
    InconsistantState,
    /// VersionNotSupported error.
    VersionNotSupported,
    /// InvalidRange error.
    InvalidRange,
    /// InvalidBody error.
    InvalidBody,
    /// NoSuchContainer error.
    NoSuchContainer,
    /// ResourceIsNotObject error.
    ResourceIsNotObject,
    /// NoParentContainer error.
    NoParentContainer,
    /// NoSuchKey error.
    NoSuchKey,
    /// A code outside the closed set.
    Custom(&'static str),
}

impl CdmiErrorCode {
    /// Returns the error code as a string.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AccessDenied => "AccessDenied",
            Self::ContainerAlreadyExists => "ContainerAlreadyExists",
            Self::ContainerNotEmpty => "ContainerNotEmpty",
            Self::Conflict => "Conflict",
            Self::InvalidArgument => "InvalidArgument",
            Self::InvalidContainerName => "InvalidContainerName",
            Self::InvalidURI => "InvalidURI",
            Self::InvalidHeader => "InvalidHeader",
            Self::InvalidContent => "InvalidContent",
            Self::BadRequest => "BadRequest",
            Self::NotContainer => "NotContainer",
            Self::BadRequestPath => "BadRequestPath",
            Self::InconsistantState => "InconsistantState",
            Self::VersionNotSupported => "VersionNotSupported",
            Self::InvalidRange => "InvalidRange",
            Self::InvalidBody => "InvalidBody",
            Self::NoSuchContainer => "NoSuchContainer",
            Self::ResourceIsNotObject => "ResourceIsNotObject",
            Self::NoParentContainer => "NoParentContainer",
            Self::NoSuchKey => "NoSuchKey",
            Self::Custom(s) => s,
        }
    }

    /// Look up a code by its name. Unknown names become [`CdmiErrorCode::Custom`].
    #[must_use]
    pub fn from_name(name: &'static str) -> Self {
        match name {
            "AccessDenied" => Self::AccessDenied,
            "ContainerAlreadyExists" => Self::ContainerAlreadyExists,
            "ContainerNotEmpty" => Self::ContainerNotEmpty,
            "Conflict" => Self::Conflict,
            "InvalidArgument" => Self::InvalidArgument,
            "InvalidContainerName" => Self::InvalidContainerName,
            "InvalidURI" => Self::InvalidURI,
            "InvalidHeader" => Self::InvalidHeader,
            "InvalidContent" => Self::InvalidContent,
            "BadRequest" => Self::BadRequest,
            "NotContainer" => Self::NotContainer,
            "BadRequestPath" => Self::BadRequestPath,
            "InconsistantState" => Self::InconsistantState,
            "VersionNotSupported" => Self::VersionNotSupported,
            "InvalidRange" => Self::InvalidRange,
            "InvalidBody" => Self::InvalidBody,
            "NoSuchContainer" => Self::NoSuchContainer,
            "ResourceIsNotObject" => Self::ResourceIsNotObject,
            "NoParentContainer" => Self::NoParentContainer,
            "NoSuchKey" => Self::NoSuchKey,
            other => Self::Custom(other),
        }
    }

    /// Returns the HTTP status code for this error.
    #[must_use]
    pub fn default_status_code(&self) -> http::StatusCode {
        match self {
            Self::AccessDenied => http::StatusCode::FORBIDDEN,
            Self::ContainerAlreadyExists | Self::ContainerNotEmpty | Self::Conflict => {
                http::StatusCode::CONFLICT
            }
            Self::NoSuchContainer
            | Self::ResourceIsNotObject
            | Self::NoParentContainer
            | Self::NoSuchKey => http::StatusCode::NOT_FOUND,
            Self::InvalidArgument
            | Self::InvalidContainerName
            | Self::InvalidURI
            | Self::InvalidHeader
            | Self::InvalidContent
            | Self::BadRequest
            | Self::NotContainer
            | Self::BadRequestPath
            | Self::InconsistantState
            | Self::VersionNotSupported
            | Self::InvalidRange
            | Self::InvalidBody
            | Self::Custom(_) => http::StatusCode::BAD_REQUEST,
        }
    }

    /// Returns the response body message for this error.
    #[must_use]
    pub fn default_message(&self) -> &'static str {
        match self {
            Self::AccessDenied => "Access denied",
            Self::ContainerAlreadyExists => "The requested Container already exists",
            Self::ContainerNotEmpty => "The container you tried to delete is not empty",
            Self::Conflict => "The requested name already exists as a different type",
            Self::InvalidArgument => "Invalid Argument",
            Self::InvalidContainerName => "The specified container is not valid",
            Self::InvalidURI => "Required header or the URI formation is not correct.",
            Self::InvalidHeader => "CDMI required headers are not present in the request",
            Self::InvalidContent => "CDMI request body is not in a correct format",
            Self::BadRequest => "Bad request",
            Self::NotContainer => "Requested resource is not a CDMI container",
            Self::BadRequestPath => "Request url does not confirm with CDMI specification",
            Self::InconsistantState => "The storage state is inconsistant.",
            Self::VersionNotSupported => "Requested cdmi version is not supported.",
            Self::InvalidRange => "Requested Range is not valid.",
            Self::InvalidBody => "MIME message or the request body can not be parsed.",
            Self::NoSuchContainer => "The specified container does not exist",
            Self::ResourceIsNotObject => "The specified resource is not data object",
            Self::NoParentContainer => "The parent container does not exist",
            Self::NoSuchKey => "The resource you requested does not exist",
            Self::Custom(_) => "Unknown Error",
        }
    }
}

impl fmt::Display for CdmiErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A terminal CDMI error response.
#[derive(Debug)]
pub struct CdmiError {
    /// The error code.
    pub code: CdmiErrorCode,
    /// The message rendered as the response body.
    pub message: String,
    /// The resource that caused the error, for logging.
    pub resource: Option<String>,
    /// The HTTP status code.
    pub status_code: http::StatusCode,
    /// The underlying source error, if any.
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl fmt::Display for CdmiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CdmiError({}): {}", self.code, self.message)
    }
}

impl std::error::Error for CdmiError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn std::error::Error + 'static))
    }
}

impl From<CdmiErrorCode> for CdmiError {
    fn from(code: CdmiErrorCode) -> Self {
        Self::new(code)
    }
}

impl CdmiError {
    /// Create a new error from a code, using the code's status and message.
    #[must_use]
    pub fn new(code: CdmiErrorCode) -> Self {
        Self {
            status_code: code.default_status_code(),
            message: code.default_message().to_owned(),
            code,
            resource: None,
            source: None,
        }
    }

    /// Create a new error with a custom message.
    #[must_use]
    pub fn with_message(code: CdmiErrorCode, message: impl Into<String>) -> Self {
        Self {
            status_code: code.default_status_code(),
            message: message.into(),
            code,
            resource: None,
            source: None,
        }
    }

    /// Surface a backend or transport failure with the status it produced.
    #[must_use]
    pub fn upstream(status_code: http::StatusCode, message: impl Into<String>) -> Self {
        Self {
            code: CdmiErrorCode::Custom("UpstreamFailure"),
            message: message.into(),
            resource: None,
            status_code,
            source: None,
        }
    }

    /// An unexpected failure inside the gateway itself (500).
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self {
            code: CdmiErrorCode::Custom("InternalError"),
            message: message.into(),
            resource: None,
            status_code: http::StatusCode::INTERNAL_SERVER_ERROR,
            source: None,
        }
    }

    /// Set the resource that caused this error.
    #[must_use]
    pub fn with_resource(mut self, resource: impl Into<String>) -> Self {
        self.resource = Some(resource.into());
        self
    }

    /// Set the source error.
    #[must_use]
    pub fn with_source(mut self, source: impl std::error::Error + Send + Sync + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    /// Create a NoSuchKey error.
    #[must_use]
    pub fn no_such_key(path: impl Into<String>) -> Self {
        Self::new(CdmiErrorCode::NoSuchKey).with_resource(path)
    }

    /// Create a Conflict error.
    #[must_use]
    pub fn conflict(path: impl Into<String>) -> Self {
        Self::new(CdmiErrorCode::Conflict).with_resource(path)
    }

    /// Create a NoParentContainer error.
    #[must_use]
    pub fn no_parent_container(path: impl Into<String>) -> Self {
        Self::new(CdmiErrorCode::NoParentContainer).with_resource(path)
    }

    /// Create an InconsistantState error.
    #[must_use]
    pub fn inconsistant_state(detail: impl Into<String>) -> Self {
        Self::new(CdmiErrorCode::InconsistantState).with_resource(detail)
    }

    /// Create an InvalidRange error.
    #[must_use]
    pub fn invalid_range(range: impl Into<String>) -> Self {
        Self::new(CdmiErrorCode::InvalidRange).with_resource(range)
    }

    /// Create a BadRequest error.
    #[must_use]
    pub fn bad_request(detail: impl Into<String>) -> Self {
        Self::new(CdmiErrorCode::BadRequest).with_resource(detail)
    }
}

/// Create a [`CdmiError`] from an error code name.
///
/// # Examples
///
/// ```
/// use cdmi_model::cdmi_error;
/// use cdmi_model::error::CdmiErrorCode;
///
/// let err = cdmi_error!(NoParentContainer);
/// assert_eq!(err.code, CdmiErrorCode::NoParentContainer);
/// assert_eq!(err.status_code, http::StatusCode::NOT_FOUND);
///
/// let err = cdmi_error!(InvalidContent, "metadata must be an object");
/// assert_eq!(err.message, "metadata must be an object");
/// ```
#[macro_export]
macro_rules! cdmi_error {
    ($code:ident) => {
        $crate::error::CdmiError::new($crate::error::CdmiErrorCode::$code)
    };
    ($code:ident, $msg:expr) => {
        $crate::error::CdmiError::with_message($crate::error::CdmiErrorCode::$code, $msg)
    };
}
