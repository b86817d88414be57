//! The enumerated operation table.

use std::fmt;

/// Every operation the gateway can perform. The router picks exactly one
/// per request; anything it cannot classify is an error, never a fallback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CdmiOperation {
    /// Forward credentials to the backend auth endpoint.
    Login,
    /// List the containers of an account.
    AccountList,
    /// Render a static capability document.
    CapabilityRead,
    /// Read a container (real or virtual) or a data object.
    Read,
    /// Create or update a container with a dialect body.
    ContainerWrite,
    /// Create or update a data object with a dialect body.
    ObjectWrite,
    /// Create a container with backend-native semantics.
    NonDialectContainerWrite,
    /// Create an object with backend-native semantics.
    NonDialectObjectWrite,
    /// Delete a container or an object.
    Delete,
    /// Forward a request outside the mount prefix unchanged.
    Passthrough,
}

impl CdmiOperation {
    /// Returns the operation name.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Login => "Login",
            Self::AccountList => "AccountList",
            Self::CapabilityRead => "CapabilityRead",
            Self::Read => "Read",
            Self::ContainerWrite => "ContainerWrite",
            Self::ObjectWrite => "ObjectWrite",
            Self::NonDialectContainerWrite => "NonDialectContainerWrite",
            Self::NonDialectObjectWrite => "NonDialectObjectWrite",
            Self::Delete => "Delete",
            Self::Passthrough => "Passthrough",
        }
    }
}

impl fmt::Display for CdmiOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
