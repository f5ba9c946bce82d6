//! `GET /status` health check.

use serde::Serialize;

use crate::http::request::{Method, ParsedRequest};
use crate::routing::{HandlerError, HandlerResponse, RequestHandler};

#[derive(Debug, Serialize)]
pub struct SystemStatus {
    pub success: bool,
    pub version: &'static str,
    pub status: &'static str,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct StatusHandler;

impl RequestHandler for StatusHandler {
    fn name(&self) -> &str {
        "status"
    }

    fn score(&self, request: &ParsedRequest) -> f64 {
        if request.method() == Method::Get && request.path() == "/status" {
            0.5
        } else {
            0.0
        }
    }

    fn handle(&self, _request: &ParsedRequest) -> Result<HandlerResponse, HandlerError> {
        HandlerResponse::json(&SystemStatus {
            success: true,
            version: env!("CARGO_PKG_VERSION"),
            status: "operational",
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reports_operational() {
        let request = ParsedRequest::parse(b"GET /status HTTP/1.1", Vec::new()).unwrap();
        assert_eq!(StatusHandler.score(&request), 0.5);

        let reply = StatusHandler.handle(&request).unwrap();
        assert_eq!(reply.content_type, "application/json");
        let json: serde_json::Value = serde_json::from_slice(&reply.body).unwrap();
        assert_eq!(json["success"], true);
        assert_eq!(json["status"], "operational");
        assert_eq!(json["version"], env!("CARGO_PKG_VERSION"));
    }

    #[test]
    fn ignores_other_methods() {
        let request = ParsedRequest::parse(b"POST /status HTTP/1.1", Vec::new()).unwrap();
        assert_eq!(StatusHandler.score(&request), 0.0);
    }
}
