//! Health predicates.

use std::future::Future;

use async_trait::async_trait;
use serde::Serialize;

use crate::metadata::Metadata;

/// Error produced by a failing check.
pub type CheckError = Box<dyn std::error::Error + Send + Sync>;

/// What a check resolves to. An `Err` counts as an unhealthy result.
pub type CheckResult = Result<HealthReport, CheckError>;

/// Result of one health predicate.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct HealthReport {
    /// `None` is read as healthy.
    pub healthy: Option<bool>,
    pub metrics: Metadata,
    pub message: Option<String>,
}

impl HealthReport {
    pub fn healthy() -> Self {
        Self {
            healthy: Some(true),
            ..Self::default()
        }
    }

    pub fn unhealthy(message: impl Into<String>) -> Self {
        Self {
            healthy: Some(false),
            message: Some(message.into()),
            ..Self::default()
        }
    }

    pub fn with_metric(
        mut self,
        key: impl Into<String>,
        value: impl Into<serde_json::Value>,
    ) -> Self {
        self.metrics.insert(key, value);
        self
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn is_healthy(&self) -> bool {
        self.healthy.unwrap_or(true)
    }
}

/// A module's health predicate.
#[async_trait]
pub trait HealthCheck: Send + Sync {
    async fn check(&self) -> CheckResult;
}

/// Adapter returned by [`check_fn`].
pub struct FnCheck<F> {
    f: F,
}

#[async_trait]
impl<F, Fut> HealthCheck for FnCheck<F>
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = CheckResult> + Send + 'static,
{
    async fn check(&self) -> CheckResult {
        (self.f)().await
    }
}

/// Use a closure returning a future as a [`HealthCheck`].
///
/// ```
/// use observability_kit::health::{check_fn, CheckResult, HealthReport};
///
/// let check = check_fn(|| async {
///     CheckResult::Ok(HealthReport::healthy().with_metric("queue_depth", 3))
/// });
/// # let _ = check;
/// ```
pub fn check_fn<F, Fut>(f: F) -> FnCheck<F>
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = CheckResult> + Send + 'static,
{
    FnCheck { f }
}
