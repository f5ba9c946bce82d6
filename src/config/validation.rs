//! Configuration validation.
//!
//! Serde handles syntax; this module checks values. All problems are reported
//! together rather than stopping at the first.

use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;

use thiserror::Error;

use crate::config::schema::{Config, ServerConfig};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("server.bind_address {0:?} is not an IP address")]
    BindAddress(String),

    #[error("server.port_search_attempts must be at least 1")]
    SearchAttempts,

    #[error("server.recv_buffer_size must be greater than zero")]
    RecvBufferSize,

    #[error("server.max_send_chunk must be greater than zero")]
    MaxSendChunk,

    #[error("server.idle_timeout_secs must be greater than zero")]
    IdleTimeout,

    #[error("server.tls_key_path is set but server.tls_cert_path is not")]
    KeyWithoutCert,

    #[error("TLS file {} does not exist", .0.display())]
    MissingTlsFile(PathBuf),

    #[error("observability.metrics_address {0:?} is not a socket address")]
    MetricsAddress(String),
}

/// Validate a whole configuration file.
pub fn validate_config(config: &Config) -> Result<(), Vec<ValidationError>> {
    let mut errors = validate_server(&config.server);

    if let Some(addr) = &config.observability.metrics_address {
        if addr.parse::<SocketAddr>().is_err() {
            errors.push(ValidationError::MetricsAddress(addr.clone()));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Checks for the server section alone.
pub fn validate_server(server: &ServerConfig) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    if server.bind_address.parse::<IpAddr>().is_err() {
        errors.push(ValidationError::BindAddress(server.bind_address.clone()));
    }
    if server.port_search_attempts == 0 {
        errors.push(ValidationError::SearchAttempts);
    }
    if server.recv_buffer_size == 0 {
        errors.push(ValidationError::RecvBufferSize);
    }
    if server.max_send_chunk == 0 {
        errors.push(ValidationError::MaxSendChunk);
    }
    if server.idle_timeout_secs == Some(0) {
        errors.push(ValidationError::IdleTimeout);
    }
    if server.tls_key_path.is_some() && server.tls_cert_path.is_none() {
        errors.push(ValidationError::KeyWithoutCert);
    }
    for path in [&server.tls_cert_path, &server.tls_key_path].into_iter().flatten() {
        if !path.exists() {
            errors.push(ValidationError::MissingTlsFile(path.clone()));
        }
    }

    errors
}
