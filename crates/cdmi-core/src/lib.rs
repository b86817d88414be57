//! CDMI gateway core: maps a hierarchical CDMI namespace onto a flat object
//! store.
//!
//! The backend only knows accounts, containers and flat keys. This crate
//! gives it a directory tree: nested containers are zero-length marker
//! objects, prefixes with children but no marker read as virtual
//! containers, and large writes are split into segments tied together by a
//! manifest.
//!
//! # Architecture
//!
//! ```text
//! cdmi-http (routing, negotiation, body decoding)
//!        |
//!        v
//! GatewayHandler (CdmiHandler impl, operation table)
//!        |
//!        v
//! CdmiGateway (ops::*  handle_* methods)
//!        |
//!        +--> Prober (existence, type, children)
//!        +--> upload::plan_write (segments, manifests)
//!        |
//!        v
//! Backend (HttpBackend | InMemoryBackend)
//! ```

// CdmiError carries a boxed source and is returned by value everywhere.
#![allow(clippy::result_large_err)]

pub mod backend;
pub mod config;
pub mod error;
pub mod gateway;
pub mod handler;
mod ops;
pub mod probe;
pub mod upload;

pub use config::GatewayConfig;
pub use error::GatewayError;
pub use gateway::CdmiGateway;
pub use handler::GatewayHandler;
