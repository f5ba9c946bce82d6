//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     ServerConfig → default handler registry → Server (not yet bound)
//!
//! Shutdown (shutdown.rs):
//!     Server::stop → trigger → accept loop exits → listening socket closed
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → binary calls Server::stop
//! ```
//!
//! # Design Decisions
//! - Stopping closes the listener only; accepted connections finish on their own
//! - Signals are the binary's concern; an embedding host drives stop itself

pub mod shutdown;
pub mod signals;
pub mod startup;

pub use shutdown::{Shutdown, ShutdownReceiver};
pub use signals::shutdown_signal;
pub use startup::{build_server, default_registry};
