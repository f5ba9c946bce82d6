//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML) + CLI overrides
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → Config (validated)
//!     → ServerConfig handed to Server::new, immutable while running
//!
//! On file change (optional):
//!     watcher.rs detects change
//!     → loader.rs loads new config
//!     → owner stops the server and starts a new one
//! ```
//!
//! # Design Decisions
//! - Config is immutable once the server starts; changes require stop/start
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;
pub mod watcher;

pub use loader::{load_config, ConfigError};
pub use schema::{Config, LogFormat, ObservabilityConfig, ServerConfig};
pub use validation::{validate_config, ValidationError};
