//! Startup wiring shared by the binary and embedders.

use crate::config::ServerConfig;
use crate::handlers::{EchoHandler, StaticFileHandler, StatusHandler};
use crate::http::server::Server;
use crate::routing::HandlerRegistry;

/// Registry with the bundled handlers: echo under `/echo`, `/status`, and
/// static files from `doc_root` as the fallback.
pub fn default_registry(config: &ServerConfig) -> HandlerRegistry {
    HandlerRegistry::new()
        .with(EchoHandler::new("/echo"))
        .with(StatusHandler)
        .with(StaticFileHandler::new(config.doc_root.clone()))
}

/// A server over [`default_registry`], not yet started.
pub fn build_server(config: &ServerConfig) -> Server {
    Server::new(config.clone(), default_registry(config))
}
