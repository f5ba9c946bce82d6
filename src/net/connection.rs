//! Connection lifecycle tracking.
//!
//! # Responsibilities
//! - Generate unique connection IDs for tracing
//! - Track which phase each open connection is in (Reading → Writing)
//! - Remove the entry and record metrics when a connection ends
//!
//! The table lives on the server's single thread, so it uses `Rc<RefCell<_>>`
//! rather than locks. The owning server and every connection task share it.

use std::cell::RefCell;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use crate::observability::metrics;

/// Global atomic counter for connection IDs.
/// Relaxed ordering is enough since we only need uniqueness.
static CONNECTION_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Unique identifier for a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(u64);

impl ConnectionId {
    pub fn new() -> Self {
        Self(CONNECTION_ID_COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// Which half of the exchange a connection is in.
///
/// A connection is never in both phases; once writing starts, nothing more is read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionPhase {
    Reading,
    Writing,
}

#[derive(Debug, Clone, Copy)]
pub struct ConnectionEntry {
    pub peer: SocketAddr,
    pub phase: ConnectionPhase,
    pub opened_at: Instant,
}

/// Open connections of one server.
#[derive(Debug, Clone, Default)]
pub struct ConnectionTable {
    entries: Rc<RefCell<HashMap<ConnectionId, ConnectionEntry>>>,
}

impl ConnectionTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a freshly accepted connection. The entry lives as long as the guard.
    pub fn track(&self, peer: SocketAddr) -> ConnectionGuard {
        let id = ConnectionId::new();
        self.entries.borrow_mut().insert(
            id,
            ConnectionEntry {
                peer,
                phase: ConnectionPhase::Reading,
                opened_at: Instant::now(),
            },
        );
        metrics::record_connection_opened();
        tracing::trace!(connection_id = %id, peer = %peer, "Connection opened");

        ConnectionGuard {
            table: self.clone(),
            id,
        }
    }

    pub fn active_count(&self) -> usize {
        self.entries.borrow().len()
    }

    pub fn phase(&self, id: ConnectionId) -> Option<ConnectionPhase> {
        self.entries.borrow().get(&id).map(|entry| entry.phase)
    }

    /// Copy of every open connection, for introspection.
    pub fn snapshot(&self) -> Vec<(ConnectionId, ConnectionEntry)> {
        self.entries
            .borrow()
            .iter()
            .map(|(id, entry)| (*id, *entry))
            .collect()
    }

    fn set_phase(&self, id: ConnectionId, phase: ConnectionPhase) {
        if let Some(entry) = self.entries.borrow_mut().get_mut(&id) {
            entry.phase = phase;
        }
    }

    fn remove(&self, id: ConnectionId) -> Option<ConnectionEntry> {
        self.entries.borrow_mut().remove(&id)
    }
}

/// Guard that tracks a connection's lifetime.
/// Removes the table entry when dropped.
#[derive(Debug)]
pub struct ConnectionGuard {
    table: ConnectionTable,
    id: ConnectionId,
}

impl ConnectionGuard {
    pub fn id(&self) -> ConnectionId {
        self.id
    }

    /// The request is complete; from here on the connection only writes.
    pub fn begin_writing(&self) {
        self.table.set_phase(self.id, ConnectionPhase::Writing);
    }
}

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        if let Some(entry) = self.table.remove(self.id) {
            metrics::record_connection_closed();
            tracing::trace!(
                connection_id = %self.id,
                peer = %entry.peer,
                elapsed_ms = entry.opened_at.elapsed().as_millis() as u64,
                "Connection closed"
            );
        }
    }
}
