//! Per-module health state.
//!
//! # State Transitions
//! ```text
//! Unchecked → Healthy | Unhealthy
//! Unhealthy → Unhealthy: consecutive_failures += 1
//! any       → Healthy:   consecutive_failures = 0
//! ```
//!
//! There is no terminal state; a module is re-evaluated on every check.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::health::check::HealthReport;
use crate::metadata::Metadata;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthState {
    Unchecked,
    Healthy,
    Unhealthy,
}

impl HealthState {
    /// `None` until the module has been checked once.
    pub fn as_flag(self) -> Option<bool> {
        match self {
            HealthState::Unchecked => None,
            HealthState::Healthy => Some(true),
            HealthState::Unhealthy => Some(false),
        }
    }
}

/// Snapshot of one module after its latest check.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModuleStatus {
    pub name: String,
    pub state: HealthState,
    /// `null` while unchecked.
    pub healthy: Option<bool>,
    pub metrics: Metadata,
    pub message: Option<String>,
    /// Set when the check failed, panicked or timed out.
    pub error: Option<String>,
    pub last_check: Option<DateTime<Utc>>,
    pub duration_ms: Option<f64>,
    pub consecutive_failures: u32,
}

impl ModuleStatus {
    pub fn is_healthy(&self) -> bool {
        self.state == HealthState::Healthy
    }
}

/// How a single evaluation ended.
#[derive(Debug)]
pub(crate) enum Outcome {
    Report(HealthReport),
    Failed(String),
}

/// Mutable record behind one registered module.
#[derive(Debug)]
pub(crate) struct ModuleState {
    state: HealthState,
    metrics: Metadata,
    message: Option<String>,
    error: Option<String>,
    last_check: Option<DateTime<Utc>>,
    duration_ms: Option<f64>,
    consecutive_failures: u32,
}

impl ModuleState {
    pub(crate) fn new() -> Self {
        Self {
            state: HealthState::Unchecked,
            metrics: Metadata::new(),
            message: None,
            error: None,
            last_check: None,
            duration_ms: None,
            consecutive_failures: 0,
        }
    }

    /// Apply one evaluation. A healthy result resets the failure streak, any
    /// other result extends it.
    pub(crate) fn record(&mut self, outcome: Outcome, duration_ms: f64) {
        self.last_check = Some(Utc::now());
        self.duration_ms = Some(duration_ms);

        match outcome {
            Outcome::Report(report) => {
                let healthy = report.is_healthy();
                self.metrics = report.metrics;
                self.message = report.message;
                self.error = None;
                if healthy {
                    self.mark_success();
                } else {
                    self.mark_failure();
                }
            }
            Outcome::Failed(error) => {
                self.metrics = Metadata::new();
                self.message = None;
                self.error = Some(error);
                self.mark_failure();
            }
        }
    }

    fn mark_success(&mut self) {
        self.consecutive_failures = 0;
        self.state = HealthState::Healthy;
    }

    fn mark_failure(&mut self) {
        self.consecutive_failures = self.consecutive_failures.saturating_add(1);
        self.state = HealthState::Unhealthy;
    }

    pub(crate) fn status(&self, name: &str) -> ModuleStatus {
        ModuleStatus {
            name: name.to_string(),
            state: self.state,
            healthy: self.state.as_flag(),
            metrics: self.metrics.clone(),
            message: self.message.clone(),
            error: self.error.clone(),
            last_check: self.last_check,
            duration_ms: self.duration_ms,
            consecutive_failures: self.consecutive_failures,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unchecked_has_no_flag() {
        let status = ModuleState::new().status("db");
        assert_eq!(status.healthy, None);
        assert_eq!(status.state, HealthState::Unchecked);
        assert!(status.last_check.is_none());
    }

    #[test]
    fn test_failures_accumulate_and_reset() {
        let mut state = ModuleState::new();
        state.record(Outcome::Report(HealthReport::unhealthy("slow")), 1.0);
        state.record(Outcome::Failed("refused".into()), 1.0);
        state.record(Outcome::Report(HealthReport::unhealthy("slow")), 1.0);

        let status = state.status("db");
        assert_eq!(status.consecutive_failures, 3);
        assert_eq!(status.healthy, Some(false));
        assert_eq!(status.message.as_deref(), Some("slow"));

        state.record(Outcome::Report(HealthReport::default()), 1.0);
        let status = state.status("db");
        assert_eq!(status.consecutive_failures, 0);
        assert!(status.is_healthy());
    }

    #[test]
    fn test_failure_clears_stale_metrics() {
        let mut state = ModuleState::new();
        state.record(Outcome::Report(HealthReport::healthy().with_metric("conns", 4)), 1.0);
        state.record(Outcome::Failed("boom".into()), 2.0);

        let status = state.status("db");
        assert!(status.metrics.is_empty());
        assert_eq!(status.error.as_deref(), Some("boom"));
        assert_eq!(status.duration_ms, Some(2.0));
    }
}
