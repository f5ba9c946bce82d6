//! Handler selection and dispatch.
//!
//! # Responsibilities
//! - Parse a framed request
//! - Score every registered handler and pick the strictly highest non-zero one
//! - Run the winner, containing errors and panics as 500 responses
//! - Fall back to 404 when nothing matches or the winner has nothing to serve
//!
//! # Design Decisions
//! - O(handlers) per request; registries are small and requests infrequent
//! - Ties keep the earliest registered handler
//! - Scores outside `[0.0, 1.0]` are clamped, NaN counts as 0.0
//! - A handler that panics while scoring counts as 0.0 for that request

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::rc::Rc;

use crate::http::reader::RawRequest;
use crate::http::request::{FramingError, ParsedRequest};
use crate::http::response::Response;
use crate::observability::metrics;
use crate::routing::handler::{HandlerError, RequestHandler};
use crate::routing::registry::HandlerRegistry;

/// Dispatches parsed requests to the best-scoring handler.
#[derive(Debug, Clone)]
pub struct Router {
    registry: HandlerRegistry,
    enable_cors: bool,
}

impl Router {
    pub fn new(registry: HandlerRegistry, enable_cors: bool) -> Self {
        Self {
            registry,
            enable_cors,
        }
    }

    pub fn registry(&self) -> &HandlerRegistry {
        &self.registry
    }

    pub fn cors_enabled(&self) -> bool {
        self.enable_cors
    }

    /// Turn framed bytes into a request.
    pub fn parse(&self, raw: RawRequest) -> Result<ParsedRequest, FramingError> {
        ParsedRequest::parse(&raw.header, raw.body)
    }

    /// The handler that would serve `request`, with its confidence.
    pub fn select(&self, request: &ParsedRequest) -> Option<(&Rc<dyn RequestHandler>, f64)> {
        let mut best: Option<(&Rc<dyn RequestHandler>, f64)> = None;
        for handler in self.registry.iter() {
            let confidence = match panic::catch_unwind(AssertUnwindSafe(|| handler.score(request))) {
                Ok(score) => normalize_score(handler.name(), score),
                Err(payload) => {
                    tracing::error!(
                        handler = handler.name(),
                        error = %panic_message(payload.as_ref()),
                        "Handler panicked while scoring, treating as 0.0"
                    );
                    0.0
                }
            };
            let leading = best.map_or(0.0, |(_, score)| score);
            if confidence > leading {
                best = Some((handler, confidence));
            }
        }
        best
    }

    /// Build the response for `request`.
    pub fn dispatch(&self, request: &ParsedRequest) -> Response {
        let Some((handler, confidence)) = self.select(request) else {
            tracing::debug!(method = %request.method(), uri = %request.uri(), "No handler matched");
            return Response::not_found();
        };

        tracing::debug!(
            handler = handler.name(),
            confidence,
            method = %request.method(),
            uri = %request.uri(),
            "Dispatching request"
        );

        let outcome = panic::catch_unwind(AssertUnwindSafe(|| handler.handle(request)))
            .unwrap_or_else(|payload| Err(HandlerError::Panicked(panic_message(payload.as_ref()))));

        match outcome {
            Ok(reply) if reply.body.is_empty() => {
                tracing::debug!(handler = handler.name(), uri = %request.uri(), "Handler returned no body");
                Response::not_found()
            }
            Ok(reply) => Response::ok(reply.content_type, reply.body),
            Err(err) => {
                tracing::error!(handler = handler.name(), uri = %request.uri(), error = %err, "Handler failed");
                metrics::record_handler_error(handler.name());
                Response::server_error(&err.to_string())
            }
        }
    }

    /// Dispatch and serialize, applying the CORS setting.
    pub fn respond(&self, request: &ParsedRequest) -> Vec<u8> {
        self.dispatch(request).to_bytes(self.enable_cors)
    }
}

fn normalize_score(handler: &str, score: f64) -> f64 {
    if score.is_nan() {
        tracing::warn!(handler, "Handler returned a NaN confidence, treating as 0.0");
        return 0.0;
    }
    if !(0.0..=1.0).contains(&score) {
        tracing::warn!(handler, score, "Handler confidence outside [0, 1], clamping");
    }
    score.clamp(0.0, 1.0)
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
