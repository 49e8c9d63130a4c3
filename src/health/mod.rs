//! Health checking subsystem.
//!
//! # Data Flow
//! ```text
//! register_module(name, check)
//!     → registry.rs (one entry per module)
//!
//! check_module / check_all (on demand) or periodic task (interval)
//!     → check.rs (HealthCheck::check, panics and timeouts caught)
//!     → state.rs (unchecked → healthy | unhealthy, failure streak)
//!     → telemetry.rs (module health gauge)
//!
//! get_last_status
//!     → cached state.rs snapshots, no checks run
//! ```
//!
//! # Design Decisions
//! - A failing check never escapes: errors, panics and timeouts all become
//!   an unhealthy status
//! - Checks run sequentially unless `parallel_checks` is set
//! - A check that never resolves only delays its own module

pub mod check;
pub mod registry;
pub mod state;

pub use check::{check_fn, CheckError, CheckResult, FnCheck, HealthCheck, HealthReport};
pub use registry::{HealthCheckRegistry, Overall, RegistryError, RegistryStatus};
pub use state::{HealthState, ModuleStatus};
