//! Embedded observability for long-running services.
//!
//! # Components
//!
//! ```text
//!                 ┌──────────────────────── Observability ───────────────────────┐
//!                 │                                                               │
//!  create_logger ─┼─▶ Logger ──▶ console / rotating file / memory                 │
//!                 │      ▲                                                        │
//!                 │      ├── ErrorTracker ◀── panic hook, tracing ERROR events    │
//!  track_error ───┼──────┤                                                        │
//!                 │      ├── PerformanceMonitor ◀── frames, memory, measure()     │
//!  record_metric ─┼──────┤                                                        │
//!                 │      └── HealthCheckRegistry ◀── module checks (periodic)     │
//!  register ──────┼──────────────┘                                                │
//!                 └───────────────────────────────────────────────────────────────┘
//!                                  │
//!                                  ▼
//!                         `metrics` facade (host recorder)
//! ```
//!
//! Components are owned by an [`Observability`] context. Code that cannot be
//! handed one reaches the process-wide context through [`global`].

pub mod config;
pub mod context;
pub mod error;
pub mod global;
pub mod health;
pub mod lifecycle;
pub mod logging;
pub mod metadata;
pub mod performance;
pub mod telemetry;
pub mod tracking;

pub use config::ObservabilityConfig;
pub use context::Observability;
pub use error::ObservabilityError;
pub use health::{check_fn, HealthCheck, HealthCheckRegistry, HealthReport};
pub use logging::{LogLevel, Logger, ModuleLogger};
pub use metadata::Metadata;
pub use performance::PerformanceMonitor;
pub use tracking::{ErrorReport, ErrorTracker};
