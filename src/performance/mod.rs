//! Performance monitoring subsystem.
//!
//! # Data Flow
//! ```text
//! Frame task / host render loop
//!     → fps.rs (FpsCounter, one value per ≥1s window)
//!     → "fps" series
//!
//! Memory task (interval)
//!     → memory.rs (/proc/self/status)
//!     → "memory" series (MB)
//!
//! record_metric / measure / measure_async / measure_between
//!     → series.rs (bounded, FIFO eviction)
//!     → telemetry.rs (metrics facade)
//!
//! Summary task (interval)
//!     → stats.rs (min/max/avg/median/p95/p99)
//!     → logger
//! ```
//!
//! # Design Decisions
//! - Each periodic activity is its own task; `stop()` cancels all of them
//! - Measurement never swallows failures: errors are returned, panics resumed
//! - Health thresholds apply to means over the retained window

pub mod fps;
pub mod memory;
pub mod monitor;
pub mod series;
pub mod stats;

pub use fps::FpsCounter;
pub use memory::{sample_memory, MemoryUsage};
pub use monitor::{
    HeadlineMetrics, MonitorError, PerformanceHealth, PerformanceIssue, PerformanceMonitor,
    PerformanceState, FPS_SERIES, MEMORY_SERIES,
};
pub use series::{MetricSeries, Sample, ERROR_FLAG};
pub use stats::{calculate_stats, Stats};
