//! Incremental request framing.
//!
//! A [`ConnectionReader`] owns the bytes received so far on one connection and
//! decides, after every read, whether a complete request is available.
//!
//! ```text
//! AwaitingHeader ──\r\n\r\n, no Content-Length──────────────▶ Complete
//!       │
//!       └──\r\n\r\n + Content-Length: N──▶ AwaitingBody ──len >= header + N──▶ Complete
//!
//! empty read / framing error (any state) ──▶ Aborted
//! ```

use thiserror::Error;

use crate::http::request::{content_length, FramingError};

/// Bytes requested from the socket per readable event.
pub const DEFAULT_RECV_BUFFER_SIZE: usize = 1024 * 1024;

const HEADER_DELIMITER: &[u8] = b"\r\n\r\n";

/// Framing state of one connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReaderState {
    AwaitingHeader,
    AwaitingBody {
        /// Offset of the `\r\n\r\n` delimiter.
        header_end: usize,
        /// Header length (delimiter included) plus `Content-Length`.
        expected_total: usize,
    },
    Complete,
    Aborted,
}

/// Outcome of feeding one read into the reader.
#[derive(Debug, PartialEq, Eq)]
pub enum Progress {
    /// Keep waiting for readable events.
    NeedMore,
    /// The request is framed; the connection should stop reading.
    Complete(RawRequest),
}

/// Header and body bytes of a framed request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawRequest {
    /// Everything before the blank line, without the trailing `\r\n\r\n`.
    pub header: Vec<u8>,
    /// Exactly `Content-Length` bytes, or empty.
    pub body: Vec<u8>,
}

/// Reasons a reader stops without producing a request.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ReadError {
    /// A zero-length read: the peer closed its side.
    #[error("peer closed the connection after {received} bytes")]
    PeerClosed { received: usize },

    #[error(transparent)]
    Framing(#[from] FramingError),

    /// Data arrived after the reader reached a terminal state.
    #[error("reader already finished")]
    Finished,
}

/// Per-connection request accumulator.
#[derive(Debug)]
pub struct ConnectionReader {
    buffer: Vec<u8>,
    state: ReaderState,
    /// How far the delimiter search has progressed.
    scanned: usize,
    max_request_bytes: Option<usize>,
}

impl ConnectionReader {
    /// Create a reader with no request size limit.
    pub fn new() -> Self {
        Self::with_limit(None)
    }

    /// Create a reader that aborts once a request would exceed `max_request_bytes`.
    pub fn with_limit(max_request_bytes: Option<usize>) -> Self {
        Self {
            buffer: Vec::new(),
            state: ReaderState::AwaitingHeader,
            scanned: 0,
            max_request_bytes,
        }
    }

    pub fn state(&self) -> ReaderState {
        self.state
    }

    /// Number of bytes accumulated so far.
    pub fn received(&self) -> usize {
        self.buffer.len()
    }

    /// Append the bytes of one read and advance the state machine.
    ///
    /// An empty `part` means the read returned zero bytes.
    pub fn receive(&mut self, part: &[u8]) -> Result<Progress, ReadError> {
        if matches!(self.state, ReaderState::Complete | ReaderState::Aborted) {
            return Err(ReadError::Finished);
        }
        if part.is_empty() {
            self.state = ReaderState::Aborted;
            return Err(ReadError::PeerClosed {
                received: self.buffer.len(),
            });
        }

        self.buffer.extend_from_slice(part);
        if let Err(err) = self.check_limit(self.buffer.len()) {
            return Err(self.abort(err));
        }

        if self.state == ReaderState::AwaitingHeader {
            let Some(header_end) = self.find_delimiter() else {
                return Ok(Progress::NeedMore);
            };
            let length = match content_length(&self.buffer[..header_end]) {
                Ok(length) => length,
                Err(err) => return Err(self.abort(err)),
            };
            match length {
                None => {
                    tracing::trace!(header_len = header_end, "End of header with no content, body is empty");
                    return Ok(Progress::Complete(self.complete(header_end, header_end + HEADER_DELIMITER.len())));
                }
                Some(length) => {
                    let Some(expected_total) = (header_end + HEADER_DELIMITER.len()).checked_add(length) else {
                        return Err(self.abort(FramingError::InvalidContentLength(length.to_string())));
                    };
                    if let Err(err) = self.check_limit(expected_total) {
                        return Err(self.abort(err));
                    }
                    tracing::trace!(body_len = length, expected_total, "Expecting request body");
                    self.state = ReaderState::AwaitingBody {
                        header_end,
                        expected_total,
                    };
                }
            }
        }

        let state = self.state;
        match state {
            ReaderState::AwaitingBody {
                header_end,
                expected_total,
            } if self.buffer.len() >= expected_total => {
                Ok(Progress::Complete(self.complete(header_end, expected_total)))
            }
            ReaderState::AwaitingBody { expected_total, .. } => {
                tracing::trace!(received = self.buffer.len(), expected_total, "Awaiting more body bytes");
                Ok(Progress::NeedMore)
            }
            _ => Ok(Progress::NeedMore),
        }
    }

    fn find_delimiter(&mut self) -> Option<usize> {
        // Resume a little before the previous end in case the delimiter straddles reads.
        let start = self.scanned.saturating_sub(HEADER_DELIMITER.len() - 1);
        let found = self.buffer[start..]
            .windows(HEADER_DELIMITER.len())
            .position(|window| window == HEADER_DELIMITER)
            .map(|offset| start + offset);
        self.scanned = self.buffer.len();
        found
    }

    fn check_limit(&self, size: usize) -> Result<(), FramingError> {
        match self.max_request_bytes {
            Some(limit) if size > limit => Err(FramingError::TooLarge { limit }),
            _ => Ok(()),
        }
    }

    fn abort(&mut self, err: FramingError) -> ReadError {
        self.state = ReaderState::Aborted;
        ReadError::Framing(err)
    }

    fn complete(&mut self, header_end: usize, total: usize) -> RawRequest {
        self.state = ReaderState::Complete;
        let mut header = std::mem::take(&mut self.buffer);
        header.truncate(total);
        let body = header.split_off(header_end + HEADER_DELIMITER.len());
        header.truncate(header_end);
        RawRequest { header, body }
    }
}

impl Default for ConnectionReader {
    fn default() -> Self {
        Self::new()
    }
}
