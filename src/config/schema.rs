//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the
//! observability subsystem. All types derive Serde traits for deserialization
//! from config files.

use serde::{Deserialize, Serialize};

use crate::logging::LogLevel;

/// Root configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Deployment environment flag.
    pub environment: Environment,

    /// Logger settings (threshold, destinations, rotation).
    pub logging: LoggingConfig,

    /// Performance monitor settings.
    pub performance: PerformanceConfig,

    /// Error tracker settings.
    pub errors: ErrorTrackingConfig,

    /// Health-check registry settings.
    pub health: HealthConfig,
}

/// Deployment environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Development,
    Production,
}

impl Environment {
    /// Anything other than `production` (case-insensitive) is development.
    pub fn from_flag(value: &str) -> Self {
        if value.trim().eq_ignore_ascii_case("production") {
            Environment::Production
        } else {
            Environment::Development
        }
    }

    pub fn is_production(self) -> bool {
        self == Environment::Production
    }
}

/// Logger configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Threshold; entries more verbose than this are dropped.
    pub level: LogLevel,

    /// Write human-readable lines to the console. `None` derives the value
    /// from the environment (on in development, off in production).
    pub console: Option<bool>,

    /// Use ANSI colours on the console.
    pub colorize: bool,

    /// Write JSON lines to the rotating log file.
    pub file: bool,

    /// Directory for the active log file and its generations.
    pub dir: String,

    /// Active log file name.
    pub file_name: String,

    /// Maximum active file size in bytes before rotation.
    pub max_size_bytes: u64,

    /// Number of rotated generations kept on disk.
    pub max_files: usize,

    /// Capacity of the in-memory sink. 0 disables it.
    pub memory_capacity: usize,
}

impl LoggingConfig {
    /// Resolve the console flag against the environment.
    pub fn console_enabled(&self, env: Environment) -> bool {
        self.console.unwrap_or(!env.is_production())
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::Info,
            console: None,
            colorize: true,
            file: true,
            dir: "logs".to_string(),
            file_name: "app.log".to_string(),
            max_size_bytes: 10 * 1024 * 1024, // 10MB
            max_files: 5,
            memory_capacity: 0,
        }
    }
}

/// Performance monitor configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct PerformanceConfig {
    /// Enable periodic sampling on `start()`.
    pub enabled: bool,

    /// Samples retained per metric series.
    pub max_samples: usize,

    /// Memory sampling interval in milliseconds.
    pub memory_interval_ms: u64,

    /// Summary logging interval in milliseconds.
    pub summary_interval_ms: u64,

    /// Let the monitor drive its own frame ticks on the runtime.
    pub drive_frames: bool,

    /// Frame tick interval in milliseconds.
    pub frame_interval_ms: u64,

    /// Mean FPS below this raises a warning.
    pub min_fps: f64,

    /// Mean memory (MB) above this raises a warning.
    pub max_memory_mb: f64,
}

impl Default for PerformanceConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_samples: 100,
            memory_interval_ms: 5_000,
            summary_interval_ms: 30_000,
            drive_frames: true,
            frame_interval_ms: 16,
            min_fps: 30.0,
            max_memory_mb: 500.0,
        }
    }
}

/// Error tracker configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ErrorTrackingConfig {
    /// Install global surfaces on `start()`.
    pub enabled: bool,

    /// Records retained in history.
    pub max_errors: usize,

    /// Capture process-level panics.
    pub capture_panics: bool,

    /// Capture error-level `tracing` events from the host.
    pub capture_events: bool,
}

impl Default for ErrorTrackingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_errors: 100,
            capture_panics: true,
            capture_events: true,
        }
    }
}

/// Health-check registry configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct HealthConfig {
    /// Start periodic checks together with the subsystem.
    pub periodic: bool,

    /// Periodic check interval in milliseconds.
    pub interval_ms: u64,

    /// Per-check timeout in milliseconds. `None` waits indefinitely.
    pub check_timeout_ms: Option<u64>,

    /// Evaluate modules concurrently instead of one after another.
    pub parallel_checks: bool,
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            periodic: false,
            interval_ms: 60_000,
            check_timeout_ms: None,
            parallel_checks: false,
        }
    }
}
