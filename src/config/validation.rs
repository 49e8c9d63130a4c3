//! Configuration validation.
//!
//! Semantic checks only; serde handles the syntax. Every problem is reported,
//! not just the first.

use thiserror::Error;

use crate::config::schema::ObservabilityConfig;

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("{field} must be greater than zero")]
    Zero { field: &'static str },

    #[error("{field} must not be empty")]
    Empty { field: &'static str },

    #[error("{field} must be a positive finite number, got {value}")]
    NotPositive { field: &'static str, value: f64 },
}

/// Validate a configuration, returning every problem found.
pub fn validate_config(config: &ObservabilityConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    let logging = &config.logging;
    if logging.file {
        if logging.max_size_bytes == 0 {
            errors.push(ValidationError::Zero { field: "logging.max_size_bytes" });
        }
        if logging.file_name.trim().is_empty() {
            errors.push(ValidationError::Empty { field: "logging.file_name" });
        }
        if logging.dir.trim().is_empty() {
            errors.push(ValidationError::Empty { field: "logging.dir" });
        }
    }

    let perf = &config.performance;
    if perf.max_samples == 0 {
        errors.push(ValidationError::Zero { field: "performance.max_samples" });
    }
    if perf.memory_interval_ms == 0 {
        errors.push(ValidationError::Zero { field: "performance.memory_interval_ms" });
    }
    if perf.summary_interval_ms == 0 {
        errors.push(ValidationError::Zero { field: "performance.summary_interval_ms" });
    }
    if perf.frame_interval_ms == 0 {
        errors.push(ValidationError::Zero { field: "performance.frame_interval_ms" });
    }
    for (field, value) in [
        ("performance.min_fps", perf.min_fps),
        ("performance.max_memory_mb", perf.max_memory_mb),
    ] {
        if !(value.is_finite() && value > 0.0) {
            errors.push(ValidationError::NotPositive { field, value });
        }
    }

    if config.errors.max_errors == 0 {
        errors.push(ValidationError::Zero { field: "errors.max_errors" });
    }

    if config.health.interval_ms == 0 {
        errors.push(ValidationError::Zero { field: "health.interval_ms" });
    }
    if config.health.check_timeout_ms == Some(0) {
        errors.push(ValidationError::Zero { field: "health.check_timeout_ms" });
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
