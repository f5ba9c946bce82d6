//! The contract between the server and pluggable content handlers.
//!
//! # Responsibilities
//! - `score`: report how well a handler can serve a request (0.0 = cannot)
//! - `handle`: produce a content type and body for a request it won
//!
//! # Design Decisions
//! - One handler instance serves every request; it must not keep per-request state
//! - `score` is called on every handler for every request, so it must be cheap
//!   and free of side effects
//! - Failures are returned, never thrown across the dispatch boundary; the
//!   router turns them into a 500 response

use serde::Serialize;
use thiserror::Error;

use crate::http::request::ParsedRequest;

/// A pluggable request handler.
pub trait RequestHandler {
    /// Short name used in logs and metric labels.
    fn name(&self) -> &str;

    /// Confidence in `[0.0, 1.0]` that this handler can serve `request`.
    fn score(&self, request: &ParsedRequest) -> f64;

    /// Serve `request`. An empty body is answered with 404.
    fn handle(&self, request: &ParsedRequest) -> Result<HandlerResponse, HandlerError>;
}

/// What a handler returns on success.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandlerResponse {
    pub content_type: String,
    pub body: Vec<u8>,
}

impl HandlerResponse {
    pub fn new(content_type: impl Into<String>, body: impl Into<Vec<u8>>) -> Self {
        Self {
            content_type: content_type.into(),
            body: body.into(),
        }
    }

    /// `text/plain` body.
    pub fn text(body: impl Into<Vec<u8>>) -> Self {
        Self::new("text/plain", body)
    }

    /// Serialize `value` as an `application/json` body.
    pub fn json<T: Serialize + ?Sized>(value: &T) -> Result<Self, HandlerError> {
        Ok(Self::new("application/json", serde_json::to_vec(value)?))
    }

    /// Nothing to serve; the router answers 404.
    pub fn empty() -> Self {
        Self::new("text/plain", Vec::new())
    }
}

/// Errors raised inside `handle`.
#[derive(Debug, Error)]
pub enum HandlerError {
    #[error("{0}")]
    Failed(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    /// The handler panicked; the payload message is preserved.
    #[error("handler panicked: {0}")]
    Panicked(String),
}

impl HandlerError {
    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed(message.into())
    }
}
