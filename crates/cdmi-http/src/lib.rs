//! CDMI HTTP routing, body transcoding, response rendering, and hyper service.
//!
//! - **Routing** ([`router`]): classifies a request into one
//!   [`CdmiOperation`](cdmi_model::CdmiOperation) from the method, the path
//!   shape, and the negotiation headers.
//! - **Request transcoding** ([`request`], [`multipart`]): reduces multi-part,
//!   dialect JSON, and raw bodies to one decoded form; translates the value
//!   range query into a backend `Range` header.
//! - **Responses** ([`response`], [`body`]): JSON and error rendering.
//! - **Dispatch** ([`dispatch`]): the [`CdmiHandler`](dispatch::CdmiHandler)
//!   boundary to the gateway logic.
//! - **Service** ([`service`]): the hyper `Service`.
//!
//! # Architecture
//!
//! ```text
//! HTTP Request
//!   -> CdmiHttpService (hyper Service)
//!     -> Health check interception
//!     -> Dialect version check
//!     -> CdmiRouter (operation identification)
//!     -> dispatch_operation (CdmiHandler trait)
//!     -> Common response headers (X-Request-Id, Server, version)
//!   <- HTTP Response
//! ```

// CdmiError carries a boxed source and is returned by value everywhere.
#![allow(clippy::result_large_err)]

pub mod body;
pub mod dispatch;
pub mod multipart;
pub mod request;
pub mod response;
pub mod router;
pub mod service;

pub use body::CdmiResponseBody;
pub use dispatch::{CdmiHandler, HandlerFuture};
pub use router::{CdmiRouter, RoutingContext};
pub use service::{CdmiHttpConfig, CdmiHttpService};
