//! Reference request handlers.
//!
//! # Confidence ladder
//! ```text
//! 1.0  EchoHandler        URIs under its prefix
//! 0.5  StatusHandler      GET /status
//! 0.1  StaticFileHandler  any GET, fallback
//! ```
//!
//! Application handlers plug in beside these by implementing
//! [`RequestHandler`](crate::routing::RequestHandler).

pub mod echo;
pub mod static_files;
pub mod status;

pub use echo::EchoHandler;
pub use static_files::StaticFileHandler;
pub use status::StatusHandler;
