//! Metrics collection and exposition.
//!
//! # Metrics
//! - `httpd_connections_total` (counter): accepted connections
//! - `httpd_connections_active` (gauge): connections reading or writing
//! - `httpd_requests_total` (counter): answered requests by method, status
//! - `httpd_request_duration_seconds` (histogram): dispatch-to-flush latency
//! - `httpd_framing_errors_total` (counter): connections dropped while framing
//! - `httpd_handler_errors_total` (counter): handler failures by handler

use std::net::SocketAddr;
use std::time::Instant;

use http::StatusCode;
use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

use crate::http::request::Method;

/// Start the Prometheus scrape endpoint.
pub fn init_exporter(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics exporter listening");
    Ok(())
}

pub fn record_connection_opened() {
    counter!("httpd_connections_total").increment(1);
    gauge!("httpd_connections_active").increment(1.0);
}

pub fn record_connection_closed() {
    gauge!("httpd_connections_active").decrement(1.0);
}

pub fn record_request(method: Method, status: StatusCode, started: Instant) {
    counter!(
        "httpd_requests_total",
        "method" => method.as_str(),
        "status" => status.as_u16().to_string()
    )
    .increment(1);
    histogram!("httpd_request_duration_seconds", "method" => method.as_str())
        .record(started.elapsed().as_secs_f64());
}

pub fn record_framing_error() {
    counter!("httpd_framing_errors_total").increment(1);
}

pub fn record_handler_error(handler: &str) {
    counter!("httpd_handler_errors_total", "handler" => handler.to_string()).increment(1);
}
