//! embed-httpd
//!
//! Runs the embeddable server standalone, with the bundled echo, status and
//! static file handlers.
//!
//! # Architecture Overview
//!
//! ```text
//!     Client ──▶ net::listener ──▶ http::server ──▶ http::reader ──▶ routing::router
//!                (port probing)    (task per conn)   (framing)        (best confidence)
//!                                                                          │
//!     Client ◀── http::writer ◀── http::response ◀──── handlers::* ◀───────┘
//!                (bounded sends)   (fixed headers)
//!
//!     Cross-cutting: config (TOML + watch), observability (tracing, metrics),
//!                    lifecycle (shutdown, signals), resilience (idle timeouts)
//! ```

use std::error::Error;
use std::path::PathBuf;

use clap::Parser;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::task::LocalSet;

use embed_httpd::config::watcher::ConfigWatcher;
use embed_httpd::config::{load_config, validate_config, Config, ConfigError};
use embed_httpd::lifecycle::{build_server, shutdown_signal};
use embed_httpd::observability::{logging, metrics};

#[derive(Debug, Parser)]
#[command(name = "embed-httpd", version)]
#[command(about = "Single-threaded HTTP/1.1 server with confidence-scored handlers", long_about = None)]
struct Cli {
    /// TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// IP address to bind.
    #[arg(long)]
    bind: Option<String>,

    /// First port to try; the next free port is used if it is taken.
    #[arg(short, long)]
    port: Option<u16>,

    /// Directory served by the static file handler.
    #[arg(long)]
    doc_root: Option<PathBuf>,

    /// Send `Access-Control-Allow-Origin: *`.
    #[arg(long, overrides_with = "no_cors")]
    cors: bool,

    #[arg(long, overrides_with = "cors")]
    no_cors: bool,

    /// PEM certificate chain; enables TLS.
    #[arg(long)]
    tls_cert: Option<PathBuf>,

    /// PEM private key, if not in the certificate file.
    #[arg(long, requires = "tls_cert")]
    tls_key: Option<PathBuf>,

    /// Restart the server whenever the configuration file changes.
    #[arg(long, requires = "config")]
    watch: bool,
}

impl Cli {
    /// Command-line flags win over the file, including on reload.
    fn apply(&self, config: &mut Config) {
        let server = &mut config.server;
        if let Some(bind) = &self.bind {
            server.bind_address = bind.clone();
        }
        if let Some(port) = self.port {
            server.port = port;
        }
        if let Some(doc_root) = &self.doc_root {
            server.doc_root = doc_root.clone();
        }
        if self.cors {
            server.enable_cors = true;
        }
        if self.no_cors {
            server.enable_cors = false;
        }
        if let Some(cert) = &self.tls_cert {
            server.tls_cert_path = Some(cert.clone());
            server.tls_key_path = self.tls_key.clone();
        }
    }

    fn resolve(&self, mut config: Config) -> Result<Config, ConfigError> {
        self.apply(&mut config);
        validate_config(&config).map_err(ConfigError::Validation)?;
        Ok(config)
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();

    let file = match &cli.config {
        Some(path) => load_config(path)?,
        None => Config::default(),
    };
    let config = cli.resolve(file)?;

    logging::init(&config.observability, None)?;
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "embed-httpd starting");

    if let Some(addr) = &config.observability.metrics_address {
        metrics::init_exporter(addr.parse()?)?;
    }

    let local = LocalSet::new();
    local.run_until(run(cli, config)).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}

async fn run(cli: Cli, config: Config) -> Result<(), Box<dyn Error>> {
    let mut server = build_server(&config.server);
    server.start().await?;

    let (_watcher, mut updates) = match (&cli.config, cli.watch) {
        (Some(path), true) => {
            let (watcher, rx) = ConfigWatcher::new(path, Some(config.clone())).spawn()?;
            (Some(watcher), Some(rx))
        }
        _ => (None, None),
    };

    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = &mut shutdown => break,
            Some(next) = next_update(&mut updates) => {
                let next = match cli.resolve(next) {
                    Ok(next) => next,
                    Err(e) => {
                        tracing::error!(error = %e, "Ignoring reloaded configuration");
                        continue;
                    }
                };
                if next.observability != config.observability {
                    tracing::warn!("Observability settings changed; they apply after a process restart");
                }

                let mut replacement = build_server(&next.server);
                server.stop().await;
                match replacement.start().await {
                    Ok(addr) => {
                        tracing::info!(address = %addr, "Configuration reloaded");
                        server = replacement;
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "Reload failed, restoring previous server");
                        server.start().await?;
                    }
                }
            }
        }
    }

    server.stop().await;
    Ok(())
}

async fn next_update(updates: &mut Option<UnboundedReceiver<Config>>) -> Option<Config> {
    match updates {
        Some(rx) => rx.recv().await,
        None => std::future::pending().await,
    }
}
