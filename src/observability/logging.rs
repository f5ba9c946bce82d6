//! Structured logging.
//!
//! # Responsibilities
//! - Install the process-wide subscriber (level filter + text/JSON output)
//! - Forward every event to an optional host log callback as one plain line
//!
//! # Design Decisions
//! - `RUST_LOG` overrides the configured level
//! - The callback receives `message key=value ...`, ready for a log widget

use std::fmt::{self, Write as _};
use std::sync::Arc;

use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::layer::{Context, Layer, SubscriberExt};
use tracing_subscriber::util::{SubscriberInitExt, TryInitError};
use tracing_subscriber::EnvFilter;

use crate::config::{LogFormat, ObservabilityConfig};

/// Host-provided sink for log lines.
pub type LogCallback = Arc<dyn Fn(Level, &str) + Send + Sync>;

/// A layer that renders each event to a single line and hands it to a callback.
#[derive(Clone)]
pub struct CallbackLayer {
    callback: LogCallback,
}

impl CallbackLayer {
    pub fn new<F>(callback: F) -> Self
    where
        F: Fn(Level, &str) + Send + Sync + 'static,
    {
        Self {
            callback: Arc::new(callback),
        }
    }
}

impl fmt::Debug for CallbackLayer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallbackLayer").finish_non_exhaustive()
    }
}

impl<S: Subscriber> Layer<S> for CallbackLayer {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let line = render_event(event);
        (self.callback)(*event.metadata().level(), &line);
    }
}

/// Render an event as `message key=value key=value`.
pub fn render_event(event: &Event<'_>) -> String {
    let mut visitor = LineVisitor::default();
    event.record(&mut visitor);
    visitor.finish()
}

#[derive(Default)]
struct LineVisitor {
    message: String,
    fields: String,
}

impl LineVisitor {
    fn finish(self) -> String {
        if self.message.is_empty() {
            self.fields.trim_start().to_string()
        } else {
            self.message + &self.fields
        }
    }
}

impl Visit for LineVisitor {
    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            self.message.push_str(value);
        } else {
            let _ = write!(self.fields, " {}={}", field.name(), value);
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        if field.name() == "message" {
            let _ = write!(self.message, "{value:?}");
        } else {
            let _ = write!(self.fields, " {}={:?}", field.name(), value);
        }
    }
}

/// Install the global subscriber.
///
/// Fails if a global subscriber is already set.
pub fn init(config: &ObservabilityConfig, callback: Option<CallbackLayer>) -> Result<(), TryInitError> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("embed_httpd={}", config.log_level)));

    let text = (config.log_format == LogFormat::Text).then(tracing_subscriber::fmt::layer);
    let json = (config.log_format == LogFormat::Json).then(|| tracing_subscriber::fmt::layer().json());

    tracing_subscriber::registry()
        .with(filter)
        .with(callback)
        .with(text)
        .with(json)
        .try_init()
}
