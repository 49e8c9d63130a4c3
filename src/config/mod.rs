//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! defaults
//!     → loader.rs (optional TOML file)
//!     → loader.rs (LOG_LEVEL / APP_ENV / LOG_DIR overlay)
//!     → validation.rs (semantic checks)
//!     → ObservabilityConfig (validated, immutable)
//!
//! On file change:
//!     watcher.rs detects change
//!     → loader.rs loads new config
//!     → validation.rs validates
//!     → Observability::apply_config (runtime-adjustable parts only)
//! ```
//!
//! # Design Decisions
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks
//! - Only the log threshold is adjustable at runtime; everything else
//!   requires re-initialization

pub mod loader;
pub mod schema;
pub mod validation;
pub mod watcher;

pub use loader::{apply_env, from_env, load, load_config, ConfigError};
pub use schema::{
    Environment, ErrorTrackingConfig, HealthConfig, LoggingConfig, ObservabilityConfig,
    PerformanceConfig,
};
pub use validation::ValidationError;
pub use watcher::ConfigWatcher;
