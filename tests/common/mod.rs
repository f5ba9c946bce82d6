//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::time::Duration;

use embed_httpd::http::ParsedRequest;
use embed_httpd::{HandlerError, HandlerRegistry, HandlerResponse, RequestHandler, Server, ServerConfig};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

/// Answers every request with a fixed confidence and body.
pub struct FixedHandler {
    pub name: &'static str,
    pub confidence: f64,
    pub body: &'static str,
}

impl RequestHandler for FixedHandler {
    fn name(&self) -> &str {
        self.name
    }

    fn score(&self, _request: &ParsedRequest) -> f64 {
        self.confidence
    }

    fn handle(&self, _request: &ParsedRequest) -> Result<HandlerResponse, HandlerError> {
        Ok(HandlerResponse::text(self.body))
    }
}

/// Claims `path` and always fails.
pub struct FailingHandler {
    pub path: &'static str,
}

impl RequestHandler for FailingHandler {
    fn name(&self) -> &str {
        "failing"
    }

    fn score(&self, request: &ParsedRequest) -> f64 {
        if request.path() == self.path {
            1.0
        } else {
            0.0
        }
    }

    fn handle(&self, _request: &ParsedRequest) -> Result<HandlerResponse, HandlerError> {
        Err(HandlerError::failed("database unavailable"))
    }
}

/// Reply with the request body, to check framing.
pub struct BodyEchoHandler;

impl RequestHandler for BodyEchoHandler {
    fn name(&self) -> &str {
        "body-echo"
    }

    fn score(&self, request: &ParsedRequest) -> f64 {
        if request.path() == "/body" {
            1.0
        } else {
            0.0
        }
    }

    fn handle(&self, request: &ParsedRequest) -> Result<HandlerResponse, HandlerError> {
        Ok(HandlerResponse::new("application/octet-stream", request.body().to_vec()))
    }
}

/// Hold a port P whose successor P+1 is currently free.
pub fn taken_port_with_free_successor() -> (std::net::TcpListener, u16) {
    for _ in 0..50 {
        let taken = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = taken.local_addr().unwrap().port();
        let Some(next) = port.checked_add(1) else { continue };
        if std::net::TcpListener::bind(("127.0.0.1", next)).is_ok() {
            return (taken, port);
        }
    }
    panic!("no port with a free successor found");
}

pub fn test_config() -> ServerConfig {
    ServerConfig::ephemeral()
}

/// Start a server on the current `LocalSet`.
pub async fn start_server(config: ServerConfig, registry: HandlerRegistry) -> (Server, SocketAddr) {
    let mut server = Server::new(config, registry);
    let addr = server.start().await.unwrap();
    (server, addr)
}

/// Non-pooled client so every request gets a fresh connection.
pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .no_proxy()
        .timeout(Duration::from_secs(10))
        .build()
        .unwrap()
}

/// Write `pieces` one at a time, then read until the server closes.
///
/// A reset counts as a close; whatever arrived before it is returned.
pub async fn exchange_in_pieces(addr: SocketAddr, pieces: &[&[u8]], gap: Duration) -> Vec<u8> {
    let mut stream = TcpStream::connect(addr).await.unwrap();
    stream.set_nodelay(true).unwrap();
    for piece in pieces {
        stream.write_all(piece).await.unwrap();
        if !gap.is_zero() {
            tokio::time::sleep(gap).await;
        }
    }
    read_until_closed(&mut stream).await
}

pub async fn exchange(addr: SocketAddr, request: &[u8]) -> Vec<u8> {
    exchange_in_pieces(addr, &[request], Duration::ZERO).await
}

pub async fn read_until_closed(stream: &mut TcpStream) -> Vec<u8> {
    let mut received = Vec::new();
    let mut buf = [0u8; 4096];
    loop {
        match tokio::time::timeout(Duration::from_secs(10), stream.read(&mut buf)).await {
            Ok(Ok(0)) | Ok(Err(_)) => break,
            Ok(Ok(n)) => received.extend_from_slice(&buf[..n]),
            Err(_) => panic!("server kept the connection open"),
        }
    }
    received
}

/// A response as seen on the wire.
#[derive(Debug)]
pub struct WireResponse {
    pub status_line: String,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl WireResponse {
    pub fn parse(bytes: &[u8]) -> Self {
        let end = bytes
            .windows(4)
            .position(|w| w == b"\r\n\r\n")
            .expect("response has no header terminator");
        let head = std::str::from_utf8(&bytes[..end]).unwrap();
        let mut lines = head.split("\r\n");
        let status_line = lines.next().unwrap().to_string();
        let headers = lines
            .map(|line| {
                let (name, value) = line.split_once(": ").unwrap();
                (name.to_string(), value.to_string())
            })
            .collect();
        Self {
            status_line,
            headers,
            body: bytes[end + 4..].to_vec(),
        }
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}
