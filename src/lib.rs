//! Embeddable single-threaded HTTP/1.1 server.
//!
//! Requests are framed incrementally, routed to the handler that reports the
//! highest confidence, answered once, and the connection is closed. The server
//! runs on the host's Tokio `LocalSet`, so handlers need not be `Send`.

// Core subsystems
pub mod config;
pub mod http;
pub mod net;
pub mod routing;
pub mod handlers;

// Cross-cutting concerns
pub mod lifecycle;
pub mod observability;
pub mod resilience;

pub use config::schema::{Config, ServerConfig};
pub use http::Server;
pub use net::BindError;
pub use routing::{HandlerError, HandlerRegistry, HandlerResponse, RequestHandler};
