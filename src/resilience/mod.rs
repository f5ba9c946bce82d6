//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Connection task:
//!     → timeouts.rs (optional idle deadline on each read and write)
//!     → On expiry: connection dropped, entry removed from the table
//! ```
//!
//! # Design Decisions
//! - Deadlines are opt-in; without one a silent peer holds its connection open
//! - Handler failures are isolated in the router, not here

pub mod timeouts;

pub use timeouts::within;
