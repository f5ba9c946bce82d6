//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! server, router, connections emit:
//!     → tracing events with structured fields
//!         → logging.rs: fmt layer (text or JSON) filtered by EnvFilter
//!         → logging.rs: CallbackLayer → host-provided log callback
//!     → metrics.rs: counters, gauges, histograms
//!         → Prometheus listener (optional)
//! ```
//!
//! # Design Decisions
//! - One event stream; the host's log callback is just another layer
//! - No callback installed means nothing extra happens, never a failure
//! - Metric updates are cheap and safe to call with no recorder installed

pub mod logging;
pub mod metrics;
