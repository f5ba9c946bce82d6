//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! Listening socket
//!     → listener.rs (port probing, accept)
//!     → tls.rs (optional handshake)
//!     → connection.rs (table entry, Reading → Writing)
//!     → Hand off to the HTTP layer
//! ```
//!
//! # Design Decisions
//! - Probing for a free port happens once, at start
//! - Each connection is tracked until its task ends
//! - TLS is optional and handled transparently

pub mod connection;
pub mod listener;
pub mod tls;

pub use connection::{ConnectionGuard, ConnectionId, ConnectionPhase, ConnectionTable};
pub use listener::{BindError, Listener};
pub use tls::{load_tls_acceptor, TlsError};
