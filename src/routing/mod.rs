//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! RawRequest (header bytes, body bytes)
//!     → router.rs (parse into ParsedRequest)
//!     → registry.rs (every handler, in registration order)
//!     → handler.rs (score each; winner handles)
//!     → Response (200 / 404 / 500)
//! ```
//!
//! # Design Decisions
//! - Selection by confidence score, not by path patterns
//! - Deterministic: equal scores resolve to the first registered handler
//! - Handler failures stay inside the dispatch call

pub mod handler;
pub mod registry;
pub mod router;

pub use handler::{HandlerError, HandlerResponse, RequestHandler};
pub use registry::HandlerRegistry;
pub use router::Router;
