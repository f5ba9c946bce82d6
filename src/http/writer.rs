//! Incremental response flushing.
//!
//! A [`ConnectionWriter`] holds the serialized response and how much of it the
//! socket has accepted. Each writable event sends the unsent tail, capped at
//! `max_chunk` bytes; once everything is out the connection is closed.

/// Upper bound on a single send.
pub const DEFAULT_MAX_SEND_CHUNK: usize = 500 * 1024 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriterState {
    Writing,
    Closed,
}

#[derive(Debug)]
pub struct ConnectionWriter {
    bytes: Vec<u8>,
    sent: usize,
    max_chunk: usize,
    state: WriterState,
}

impl ConnectionWriter {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self::with_max_chunk(bytes, DEFAULT_MAX_SEND_CHUNK)
    }

    pub fn with_max_chunk(bytes: Vec<u8>, max_chunk: usize) -> Self {
        let state = if bytes.is_empty() {
            WriterState::Closed
        } else {
            WriterState::Writing
        };
        Self {
            bytes,
            sent: 0,
            max_chunk: max_chunk.max(1),
            state,
        }
    }

    pub fn state(&self) -> WriterState {
        self.state
    }

    /// The slice to hand to the next send.
    pub fn pending(&self) -> &[u8] {
        let end = self.bytes.len().min(self.sent.saturating_add(self.max_chunk));
        &self.bytes[self.sent..end]
    }

    /// Record that the socket accepted `n` bytes.
    pub fn advance(&mut self, n: usize) -> WriterState {
        self.sent = (self.sent + n).min(self.bytes.len());
        if self.sent == self.bytes.len() {
            self.state = WriterState::Closed;
        }
        self.state
    }

    /// A send failed; nothing more will be written.
    pub fn fail(&mut self) {
        self.state = WriterState::Closed;
    }

    pub fn sent(&self) -> usize {
        self.sent
    }

    pub fn total(&self) -> usize {
        self.bytes.len()
    }

    /// True once every byte has been accepted by the socket.
    pub fn is_flushed(&self) -> bool {
        self.sent == self.bytes.len()
    }
}
