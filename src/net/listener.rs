//! TCP listener with free-port search.
//!
//! # Responsibilities
//! - Bind the first free port at or above the configured one
//! - Switch the socket to non-blocking mode and register it with the reactor
//! - Accept one connection per readiness notification
//!
//! # Design Decisions
//! - Only "address in use" moves on to the next port; any other bind error is final
//! - The search is bounded by `port_search_attempts`
//! - Port 0 is passed through to the OS as a single attempt

use std::io;
use std::net::{IpAddr, SocketAddr};

use thiserror::Error;
use tokio::net::{TcpListener, TcpStream};

use crate::config::ServerConfig;
use crate::net::tls::TlsError;

/// Errors that prevent the server from starting.
#[derive(Debug, Error)]
pub enum BindError {
    #[error("invalid bind address {address:?}: {source}")]
    InvalidAddress {
        address: String,
        #[source]
        source: std::net::AddrParseError,
    },

    #[error("no free port between {first} and {last}")]
    NoFreePort { first: u16, last: u16 },

    #[error("failed to bind {addr}: {source}")]
    Io {
        addr: SocketAddr,
        #[source]
        source: io::Error,
    },

    #[error("failed to load TLS certificate: {0}")]
    Tls(#[from] TlsError),
}

/// Bind the first free port in `port..port + attempts`.
pub fn bind_first_free(bind_address: &str, port: u16, attempts: u16) -> Result<std::net::TcpListener, BindError> {
    let ip: IpAddr = bind_address.parse().map_err(|source| BindError::InvalidAddress {
        address: bind_address.to_string(),
        source,
    })?;

    if port == 0 {
        let addr = SocketAddr::new(ip, 0);
        return std::net::TcpListener::bind(addr).map_err(|source| BindError::Io { addr, source });
    }

    let mut candidate = port;
    let mut last = port;
    for _ in 0..attempts.max(1) {
        last = candidate;
        let addr = SocketAddr::new(ip, candidate);
        match std::net::TcpListener::bind(addr) {
            Ok(listener) => return Ok(listener),
            Err(e) if e.kind() == io::ErrorKind::AddrInUse => {
                tracing::debug!(port = candidate, "Port in use, trying next");
            }
            Err(source) => return Err(BindError::Io { addr, source }),
        }
        candidate = match candidate.checked_add(1) {
            Some(next) => next,
            None => break,
        };
    }

    Err(BindError::NoFreePort { first: port, last })
}

/// The listening socket of a running server.
#[derive(Debug)]
pub struct Listener {
    inner: TcpListener,
    local_addr: SocketAddr,
}

impl Listener {
    /// Find a free port, bind and register with the reactor. Must run inside a Tokio runtime.
    pub fn bind(config: &ServerConfig) -> Result<Self, BindError> {
        let std_listener = bind_first_free(&config.bind_address, config.port, config.port_search_attempts)?;
        let local_addr = std_listener.local_addr().map_err(|source| BindError::Io {
            addr: SocketAddr::new(std_listener_ip(&config.bind_address), config.port),
            source,
        })?;
        let io_err = |source| BindError::Io {
            addr: local_addr,
            source,
        };
        std_listener.set_nonblocking(true).map_err(io_err)?;
        let inner = TcpListener::from_std(std_listener).map_err(io_err)?;

        tracing::info!(
            address = %local_addr,
            requested_port = config.port,
            "Listener bound"
        );

        Ok(Self { inner, local_addr })
    }

    /// Accept one pending connection.
    pub async fn accept(&self) -> io::Result<(TcpStream, SocketAddr)> {
        self.inner.accept().await
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }
}

fn std_listener_ip(bind_address: &str) -> IpAddr {
    bind_address
        .parse()
        .unwrap_or(IpAddr::V4(std::net::Ipv4Addr::UNSPECIFIED))
}
