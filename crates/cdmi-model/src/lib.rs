//! CDMI dialect model types.
//!
//! Everything in this crate is free of I/O: the error taxonomy, the
//! operation table, path decomposition, content negotiation flags, the
//! metadata header codec, and the JSON representations.

pub mod error;
pub mod headers;
pub mod metadata;
pub mod negotiation;
pub mod operations;
pub mod path;
pub mod representation;

pub use error::{CdmiError, CdmiErrorCode};
pub use metadata::MetadataMap;
pub use negotiation::{AcceptOverride, NegotiationContext};
pub use operations::CdmiOperation;
pub use path::ResourcePath;
