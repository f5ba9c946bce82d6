//! Echoes the request URI back as plain text.

use crate::http::request::ParsedRequest;
use crate::routing::{HandlerError, HandlerResponse, RequestHandler};

#[derive(Debug, Clone)]
pub struct EchoHandler {
    prefix: String,
}

impl EchoHandler {
    /// Claim every URI whose path starts with `prefix`.
    pub fn new(prefix: impl Into<String>) -> Self {
        Self { prefix: prefix.into() }
    }
}

impl RequestHandler for EchoHandler {
    fn name(&self) -> &str {
        "echo"
    }

    fn score(&self, request: &ParsedRequest) -> f64 {
        if request.path().starts_with(&self.prefix) {
            1.0
        } else {
            0.0
        }
    }

    fn handle(&self, request: &ParsedRequest) -> Result<HandlerResponse, HandlerError> {
        Ok(HandlerResponse::text(request.uri()))
    }
}
