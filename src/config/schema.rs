//! Configuration schema definitions.
//!
//! All types derive Serde traits for deserialization from TOML. Every field has
//! a default so an empty file is a valid configuration.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::http::reader::DEFAULT_RECV_BUFFER_SIZE;
use crate::http::writer::DEFAULT_MAX_SEND_CHUNK;

/// First port tried when none is configured.
pub const DEFAULT_PORT: u16 = 2016;

/// Root configuration file layout.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub observability: ObservabilityConfig,
}

/// Server settings. Fixed for the lifetime of a started server; changing them
/// means stopping and starting again.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    /// IP address to bind (e.g., "0.0.0.0", "127.0.0.1").
    pub bind_address: String,

    /// First port candidate; the server binds the first free port at or above it.
    /// Port 0 asks the OS for any free port.
    pub port: u16,

    /// How many consecutive ports to try before giving up.
    pub port_search_attempts: u16,

    /// PEM file with the certificate chain. Enables TLS when set.
    pub tls_cert_path: Option<PathBuf>,

    /// PEM file with the private key. Defaults to `tls_cert_path`.
    pub tls_key_path: Option<PathBuf>,

    /// Add `Access-Control-Allow-Origin: *` to every response.
    pub enable_cors: bool,

    /// Directory served by the static file handler.
    pub doc_root: PathBuf,

    /// Bytes requested from the socket per read.
    pub recv_buffer_size: usize,

    /// Upper bound on bytes handed to a single write.
    pub max_send_chunk: usize,

    /// Abort requests larger than this. Unlimited when unset.
    pub max_request_bytes: Option<usize>,

    /// Abort a connection when a read or write stays pending this long.
    /// Unset means connections may wait forever.
    pub idle_timeout_secs: Option<u64>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0".to_string(),
            port: DEFAULT_PORT,
            port_search_attempts: 100,
            tls_cert_path: None,
            tls_key_path: None,
            enable_cors: true,
            doc_root: PathBuf::from("./docroot"),
            recv_buffer_size: DEFAULT_RECV_BUFFER_SIZE,
            max_send_chunk: DEFAULT_MAX_SEND_CHUNK,
            max_request_bytes: None,
            idle_timeout_secs: None,
        }
    }
}

impl ServerConfig {
    /// Loopback address with an OS-assigned port.
    pub fn ephemeral() -> Self {
        Self {
            bind_address: "127.0.0.1".to_string(),
            port: 0,
            ..Self::default()
        }
    }

    /// Key file, falling back to the certificate file.
    pub fn tls_key_path(&self) -> Option<&Path> {
        self.tls_key_path
            .as_deref()
            .or(self.tls_cert_path.as_deref())
    }

    pub fn idle_timeout(&self) -> Option<Duration> {
        self.idle_timeout_secs.map(Duration::from_secs)
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    pub log_format: LogFormat,

    /// Prometheus endpoint bind address. Disabled when unset.
    pub metrics_address: Option<String>,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Text,
            metrics_address: None,
        }
    }
}
