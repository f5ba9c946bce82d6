//! Timeout enforcement.
//!
//! # Responsibilities
//! - Bound each socket read and write of a connection
//! - Cancel the operation cleanly on timeout
//!
//! # Design Decisions
//! - Uses Tokio's timeout facilities
//! - `None` means no deadline at all
//! - A timed-out connection is closed without a response

use std::future::Future;
use std::time::Duration;

/// Run `fut` with an optional deadline. Returns `None` if the deadline passed first.
pub async fn within<F: Future>(limit: Option<Duration>, fut: F) -> Option<F::Output> {
    match limit {
        Some(limit) => tokio::time::timeout(limit, fut).await.ok(),
        None => Some(fut.await),
    }
}
