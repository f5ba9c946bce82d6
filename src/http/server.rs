//! Server lifecycle and the per-connection driver.
//!
//! # Responsibilities
//! - Bind a listening socket (port probing, optional TLS) on `start`
//! - Accept one connection per readiness event and give it its own task
//! - Drive each connection: read until framed, dispatch once, flush, close
//! - Stop accepting on `stop`, leaving in-flight connections to finish
//!
//! # Design Decisions
//! - Everything runs on the caller's `LocalSet`; handlers never leave the thread
//! - One request per connection, always answered with `Connection: close`
//! - A handler that blocks stalls every connection of the server
//! - Plain TCP and TLS share one driver, generic over the stream type

use std::io;
use std::net::SocketAddr;
use std::rc::Rc;
use std::time::{Duration, Instant};

use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::task::JoinHandle;
use tokio_rustls::TlsAcceptor;

use crate::config::ServerConfig;
use crate::http::reader::{ConnectionReader, Progress, RawRequest, ReadError};
use crate::http::writer::{ConnectionWriter, WriterState};
use crate::lifecycle::shutdown::{Shutdown, ShutdownReceiver};
use crate::net::connection::{ConnectionGuard, ConnectionTable};
use crate::net::listener::{BindError, Listener};
use crate::net::tls::load_tls_acceptor;
use crate::observability::metrics;
use crate::resilience::timeouts::within;
use crate::routing::{HandlerRegistry, Router};

/// Why a connection ended without a response being fully sent.
#[derive(Debug, Error)]
enum ConnectionError {
    #[error(transparent)]
    Read(#[from] ReadError),

    #[error(transparent)]
    Io(#[from] io::Error),

    #[error("idle timeout elapsed")]
    TimedOut,
}

/// Per-connection tunables copied out of [`ServerConfig`] at start.
#[derive(Debug, Clone, Copy)]
struct ConnectionSettings {
    recv_buffer_size: usize,
    max_send_chunk: usize,
    max_request_bytes: Option<usize>,
    idle_timeout: Option<Duration>,
}

impl ConnectionSettings {
    fn from_config(config: &ServerConfig) -> Self {
        Self {
            recv_buffer_size: config.recv_buffer_size.max(1),
            max_send_chunk: config.max_send_chunk,
            max_request_bytes: config.max_request_bytes,
            idle_timeout: config.idle_timeout(),
        }
    }
}

/// State shared by the accept loop and every connection task.
struct ConnectionContext {
    router: Rc<Router>,
    connections: ConnectionTable,
    acceptor: Option<TlsAcceptor>,
    settings: ConnectionSettings,
}

struct Running {
    local_addr: SocketAddr,
    shutdown: Shutdown,
    accept_task: JoinHandle<()>,
}

/// An embeddable HTTP/1.1 server.
///
/// `start`, `stop` and `restart` must be awaited inside a
/// [`tokio::task::LocalSet`]; connection tasks are spawned onto it.
pub struct Server {
    config: ServerConfig,
    router: Rc<Router>,
    connections: ConnectionTable,
    running: Option<Running>,
}

impl Server {
    pub fn new(config: ServerConfig, registry: HandlerRegistry) -> Self {
        let router = Rc::new(Router::new(registry, config.enable_cors));
        Self {
            config,
            router,
            connections: ConnectionTable::new(),
            running: None,
        }
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    pub fn router(&self) -> &Router {
        &self.router
    }

    pub fn is_running(&self) -> bool {
        self.running.is_some()
    }

    /// The address actually bound, which may differ from the configured port.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.running.as_ref().map(|running| running.local_addr)
    }

    /// Connections accepted and not yet closed, including those left over from a stop.
    pub fn active_connections(&self) -> usize {
        self.connections.active_count()
    }

    pub fn connections(&self) -> &ConnectionTable {
        &self.connections
    }

    /// Bind and begin accepting. A server that is already running is stopped first.
    pub async fn start(&mut self) -> Result<SocketAddr, BindError> {
        if self.running.is_some() {
            self.stop().await;
        }

        let acceptor = match &self.config.tls_cert_path {
            Some(cert) => {
                let key = self.config.tls_key_path().unwrap_or(cert);
                Some(load_tls_acceptor(cert, key)?)
            }
            None => None,
        };

        let listener = Listener::bind(&self.config)?;
        let local_addr = listener.local_addr();

        let shutdown = Shutdown::new();
        let context = Rc::new(ConnectionContext {
            router: Rc::clone(&self.router),
            connections: self.connections.clone(),
            acceptor,
            settings: ConnectionSettings::from_config(&self.config),
        });
        let accept_task = tokio::task::spawn_local(accept_loop(listener, shutdown.subscribe(), context));

        tracing::info!(
            address = %local_addr,
            tls = self.config.tls_cert_path.is_some(),
            cors = self.config.enable_cors,
            handlers = self.router.registry().len(),
            "Server started"
        );

        self.running = Some(Running {
            local_addr,
            shutdown,
            accept_task,
        });
        Ok(local_addr)
    }

    /// Close the listening socket. Open connections are left to complete.
    pub async fn stop(&mut self) {
        let Some(running) = self.running.take() else {
            return;
        };

        running.shutdown.trigger();
        if let Err(e) = running.accept_task.await {
            if e.is_panic() {
                tracing::error!(error = %e, "Accept loop panicked");
            }
        }

        let in_flight = self.connections.active_count();
        tracing::info!(address = %running.local_addr, in_flight, "Server stopped");
        if in_flight > 0 {
            tracing::warn!(in_flight, "Connections still open after stop, leaving them to finish");
        }
    }

    /// Stop, then start with the same configuration.
    pub async fn restart(&mut self) -> Result<SocketAddr, BindError> {
        self.stop().await;
        self.start().await
    }
}

impl Drop for Server {
    fn drop(&mut self) {
        if let Some(running) = &self.running {
            running.shutdown.trigger();
        }
    }
}

async fn accept_loop(listener: Listener, mut shutdown: ShutdownReceiver, context: Rc<ConnectionContext>) {
    loop {
        tokio::select! {
            biased;
            _ = shutdown.wait() => break,
            accepted = listener.accept() => match accepted {
                Ok((stream, peer)) => on_acceptable(stream, peer, Rc::clone(&context)),
                Err(e) => {
                    tracing::warn!(error = %e, "Accept failed");
                    // Avoid spinning while out of descriptors.
                    tokio::time::sleep(Duration::from_millis(50)).await;
                }
            },
        }
    }
    tracing::debug!(address = %listener.local_addr(), "Listener closed");
}

/// Take ownership of one accepted socket and serve it on its own task.
fn on_acceptable(stream: TcpStream, peer: SocketAddr, context: Rc<ConnectionContext>) {
    let guard = context.connections.track(peer);
    tracing::debug!(connection_id = %guard.id(), peer = %peer, "Connection accepted");

    tokio::task::spawn_local(async move {
        let timeout = context.settings.idle_timeout;
        let outcome = match &context.acceptor {
            Some(acceptor) => match within(timeout, acceptor.accept(stream)).await {
                Some(Ok(tls)) => serve_connection(tls, &guard, &context).await,
                Some(Err(e)) => Err(ConnectionError::Io(e)),
                None => Err(ConnectionError::TimedOut),
            },
            None => serve_connection(stream, &guard, &context).await,
        };

        match outcome {
            Ok(()) => {}
            Err(ConnectionError::Read(ReadError::Framing(e))) => {
                metrics::record_framing_error();
                tracing::warn!(connection_id = %guard.id(), peer = %peer, error = %e, "Dropping malformed request");
            }
            Err(e) => {
                tracing::debug!(connection_id = %guard.id(), peer = %peer, error = %e, "Connection closed early");
            }
        }
    });
}

async fn serve_connection<S>(
    mut stream: S,
    guard: &ConnectionGuard,
    context: &ConnectionContext,
) -> Result<(), ConnectionError>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let raw = read_request(&mut stream, &context.settings).await?;
    let started = Instant::now();

    let request = context
        .router
        .parse(raw)
        .map_err(|e| ConnectionError::Read(ReadError::Framing(e)))?;

    guard.begin_writing();
    let response = context.router.dispatch(&request);
    let status = response.status();
    let bytes = response.to_bytes(context.router.cors_enabled());
    let size = bytes.len();

    flush_response(&mut stream, bytes, &context.settings).await?;

    metrics::record_request(request.method(), status, started);
    tracing::info!(
        connection_id = %guard.id(),
        method = %request.method(),
        uri = %request.uri(),
        status = status.as_u16(),
        bytes = size,
        elapsed_ms = started.elapsed().as_millis() as u64,
        "Request served"
    );
    Ok(())
}

/// Read until the reader frames a complete request.
async fn read_request<S>(stream: &mut S, settings: &ConnectionSettings) -> Result<RawRequest, ConnectionError>
where
    S: AsyncRead + Unpin,
{
    let mut reader = ConnectionReader::with_limit(settings.max_request_bytes);
    let mut buf = vec![0u8; settings.recv_buffer_size];
    loop {
        let n = within(settings.idle_timeout, stream.read(&mut buf))
            .await
            .ok_or(ConnectionError::TimedOut)??;
        if let Progress::Complete(raw) = reader.receive(&buf[..n])? {
            return Ok(raw);
        }
    }
}

/// Send `bytes`, then close the write side.
async fn flush_response<S>(stream: &mut S, bytes: Vec<u8>, settings: &ConnectionSettings) -> Result<(), ConnectionError>
where
    S: AsyncWrite + Unpin,
{
    let mut writer = ConnectionWriter::with_max_chunk(bytes, settings.max_send_chunk);
    while writer.state() == WriterState::Writing {
        let n = within(settings.idle_timeout, stream.write(writer.pending()))
            .await
            .ok_or(ConnectionError::TimedOut)??;
        if n == 0 {
            writer.fail();
            return Err(io::Error::from(io::ErrorKind::WriteZero).into());
        }
        writer.advance(n);
    }
    tracing::trace!(sent = writer.sent(), total = writer.total(), "Response flushed");

    within(settings.idle_timeout, stream.flush())
        .await
        .ok_or(ConnectionError::TimedOut)??;
    // The peer may already be gone; the response is out either way.
    let _ = within(settings.idle_timeout, stream.shutdown()).await;
    Ok(())
}
