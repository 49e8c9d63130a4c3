//! Registry of named module health checks.
//!
//! # Responsibilities
//! - Hold one predicate and one state record per module
//! - Evaluate modules on demand or on a timer
//! - Aggregate per-module results into an overall verdict

use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use futures_util::future::join_all;
use futures_util::FutureExt;
use serde::Serialize;
use thiserror::Error;
use tokio::time;

use crate::config::HealthConfig;
use crate::health::check::HealthCheck;
use crate::health::state::{HealthState, ModuleState, ModuleStatus, Outcome};
use crate::lifecycle::TaskGroup;
use crate::logging::ModuleLogger;
use crate::metadata::Metadata;
use crate::telemetry;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("unknown module '{0}'")]
    UnknownModule(String),
}

/// Aggregate verdict over every module.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Overall {
    Healthy,
    Degraded,
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RegistryStatus {
    pub overall: Overall,
    pub timestamp: DateTime<Utc>,
    pub modules: Vec<ModuleStatus>,
    pub total_modules: usize,
    pub healthy_modules: usize,
    pub unhealthy_modules: usize,
}

impl RegistryStatus {
    fn from_modules(modules: Vec<ModuleStatus>) -> Self {
        let healthy_modules = modules.iter().filter(|m| m.state == HealthState::Healthy).count();
        let unhealthy_modules = modules
            .iter()
            .filter(|m| m.state == HealthState::Unhealthy)
            .count();
        let unchecked = modules.len() - healthy_modules - unhealthy_modules;

        let overall = if unhealthy_modules > 0 {
            Overall::Degraded
        } else if unchecked > 0 {
            Overall::Unknown
        } else {
            Overall::Healthy
        };

        Self {
            overall,
            timestamp: Utc::now(),
            total_modules: modules.len(),
            healthy_modules,
            unhealthy_modules,
            modules,
        }
    }

    pub fn is_healthy(&self) -> bool {
        self.overall == Overall::Healthy
    }

    /// Names of modules whose latest result was unhealthy.
    pub fn unhealthy_names(&self) -> Vec<&str> {
        self.modules
            .iter()
            .filter(|m| m.state == HealthState::Unhealthy)
            .map(|m| m.name.as_str())
            .collect()
    }

    pub fn module(&self, name: &str) -> Option<&ModuleStatus> {
        self.modules.iter().find(|m| m.name == name)
    }
}

struct ModuleEntry {
    check: Arc<dyn HealthCheck>,
    state: Mutex<ModuleState>,
}

/// Named modules and their async health predicates.
pub struct HealthCheckRegistry {
    config: HealthConfig,
    log: ModuleLogger,
    modules: DashMap<String, Arc<ModuleEntry>>,
    tasks: TaskGroup,
}

impl HealthCheckRegistry {
    pub fn new(config: HealthConfig, log: ModuleLogger) -> Self {
        Self {
            config,
            log,
            modules: DashMap::new(),
            tasks: TaskGroup::new(),
        }
    }

    pub fn config(&self) -> &HealthConfig {
        &self.config
    }

    /// Register `check` under `name`, replacing (with a warning) any module
    /// already registered there. The new module starts unchecked.
    pub fn register_module(&self, name: impl Into<String>, check: impl HealthCheck + 'static) {
        self.register_shared(name, Arc::new(check));
    }

    pub fn register_shared(&self, name: impl Into<String>, check: Arc<dyn HealthCheck>) {
        let name = name.into();
        let entry = Arc::new(ModuleEntry {
            check,
            state: Mutex::new(ModuleState::new()),
        });

        if self.modules.insert(name.clone(), entry).is_some() {
            self.log.warn(
                "Health check module re-registered, replacing previous check",
                Metadata::new().with("module", name),
            );
        } else {
            self.log.debug("Health check module registered", Metadata::new().with("module", name));
        }
    }

    /// Remove `name`. Returns whether it was registered.
    pub fn unregister_module(&self, name: &str) -> bool {
        let removed = self.modules.remove(name).is_some();
        if removed {
            self.log.debug(
                "Health check module unregistered",
                Metadata::new().with("module", name),
            );
        } else {
            self.log.debug(
                "Unregister of unknown health check module ignored",
                Metadata::new().with("module", name),
            );
        }
        removed
    }

    pub fn is_registered(&self, name: &str) -> bool {
        self.modules.contains_key(name)
    }

    /// Registered module names, sorted.
    pub fn module_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.modules.iter().map(|r| r.key().clone()).collect();
        names.sort();
        names
    }

    /// Run one module's check and return its updated status.
    pub async fn check_module(&self, name: &str) -> Result<ModuleStatus, RegistryError> {
        let entry = self
            .modules
            .get(name)
            .map(|r| r.value().clone())
            .ok_or_else(|| RegistryError::UnknownModule(name.to_string()))?;
        Ok(self.evaluate(name, &entry).await)
    }

    async fn evaluate(&self, name: &str, entry: &ModuleEntry) -> ModuleStatus {
        let start = Instant::now();
        let guarded = AssertUnwindSafe(entry.check.check()).catch_unwind();

        let finished = match self.config.check_timeout_ms {
            Some(ms) => time::timeout(Duration::from_millis(ms), guarded)
                .await
                .map_err(|_| format!("health check timed out after {ms}ms")),
            None => Ok(guarded.await),
        };

        let outcome = match finished {
            Ok(Ok(Ok(report))) => Outcome::Report(report),
            Ok(Ok(Err(e))) => Outcome::Failed(e.to_string()),
            Ok(Err(payload)) => Outcome::Failed(format!(
                "health check panicked: {}",
                panic_text(payload.as_ref())
            )),
            Err(timed_out) => Outcome::Failed(timed_out),
        };
        let duration_ms = start.elapsed().as_secs_f64() * 1000.0;

        let status = {
            let mut state = entry.state.lock().expect("module state mutex poisoned");
            state.record(outcome, duration_ms);
            state.status(name)
        };
        telemetry::record_module_health(name, status.is_healthy());

        if status.is_healthy() {
            self.log.debug(
                "Health check passed",
                Metadata::new().with("module", name).with("duration_ms", duration_ms),
            );
        } else {
            let mut meta = Metadata::new()
                .with("module", name)
                .with("consecutive_failures", status.consecutive_failures);
            if let Some(error) = &status.error {
                meta.insert("error", error.as_str());
            }
            if let Some(message) = &status.message {
                meta.insert("detail", message.as_str());
            }
            self.log.warn("Health check failed", meta);
        }

        status
    }

    fn entries(&self) -> Vec<(String, Arc<ModuleEntry>)> {
        let mut entries: Vec<(String, Arc<ModuleEntry>)> = self
            .modules
            .iter()
            .map(|r| (r.key().clone(), r.value().clone()))
            .collect();
        entries.sort_by(|a, b| a.0.cmp(&b.0));
        entries
    }

    /// Evaluate every module, one after another unless `parallel_checks`.
    ///
    /// `overall` is healthy iff every module reported healthy; an empty
    /// registry is healthy.
    pub async fn check_all(&self) -> RegistryStatus {
        let entries = self.entries();

        let modules = if self.config.parallel_checks {
            join_all(entries.iter().map(|(name, entry)| self.evaluate(name, entry))).await
        } else {
            let mut modules = Vec::with_capacity(entries.len());
            for (name, entry) in &entries {
                modules.push(self.evaluate(name, entry).await);
            }
            modules
        };

        RegistryStatus::from_modules(modules)
    }

    /// Alias of [`HealthCheckRegistry::check_all`].
    pub async fn get_status(&self) -> RegistryStatus {
        self.check_all().await
    }

    /// Cached results of the latest checks. Never runs a check.
    pub fn get_last_status(&self) -> RegistryStatus {
        let modules = self
            .entries()
            .into_iter()
            .map(|(name, entry)| {
                entry
                    .state
                    .lock()
                    .expect("module state mutex poisoned")
                    .status(&name)
            })
            .collect();
        RegistryStatus::from_modules(modules)
    }

    pub fn is_periodic_running(&self) -> bool {
        self.tasks.is_running()
    }

    /// Re-check every module each `interval_ms`. No-op if already running.
    pub fn start_periodic_checks(self: &Arc<Self>) {
        if self.tasks.is_running() {
            return;
        }

        let registry = self.clone();
        let period = Duration::from_millis(self.config.interval_ms.max(1));
        let spawned = self.tasks.spawn("health", move |mut shutdown| async move {
            let mut ticker = time::interval_at(time::Instant::now() + period, period);
            loop {
                tokio::select! {
                    _ = ticker.tick() => registry.run_periodic().await,
                    _ = shutdown.recv() => break,
                }
            }
        });

        if spawned {
            self.log.info(
                "Periodic health checks started",
                Metadata::new().with("interval_ms", self.config.interval_ms),
            );
        }
    }

    async fn run_periodic(&self) {
        let status = self.check_all().await;
        if status.unhealthy_modules > 0 {
            let names = status.unhealthy_names();
            self.log.warn(
                format!("Unhealthy modules: {}", names.join(", ")),
                Metadata::new()
                    .with("unhealthy", names)
                    .with("total_modules", status.total_modules),
            );
        }
    }

    pub async fn stop_periodic_checks(&self) {
        if !self.tasks.is_running() {
            return;
        }
        self.tasks.stop().await;
        self.log.info("Periodic health checks stopped", Metadata::new());
    }
}

fn panic_text(payload: &(dyn std::any::Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "non-string payload".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::health::check::{check_fn, CheckResult, HealthReport};
    use crate::logging::{LogLevel, Logger};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn registry_with(config: HealthConfig) -> (Arc<HealthCheckRegistry>, Arc<Logger>) {
        let logger = Arc::new(Logger::new(LogLevel::Debug).with_memory(200));
        let registry = Arc::new(HealthCheckRegistry::new(
            config,
            logger.create_logger("HealthCheck"),
        ));
        (registry, logger)
    }

    fn registry() -> Arc<HealthCheckRegistry> {
        registry_with(HealthConfig::default()).0
    }

    fn fixed(report: HealthReport) -> impl HealthCheck {
        check_fn(move || {
            let report = report.clone();
            async move { CheckResult::Ok(report) }
        })
    }

    async fn refused() -> CheckResult {
        Err("refused".into())
    }

    async fn exploding() -> CheckResult {
        panic!("probe exploded")
    }

    async fn hanging() -> CheckResult {
        std::future::pending().await
    }

    struct Counting {
        calls: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl HealthCheck for Counting {
        async fn check(&self) -> CheckResult {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(HealthReport::healthy())
        }
    }

    #[tokio::test]
    async fn test_always_unhealthy_counts_failures() {
        let registry = registry();
        registry.register_module("db", fixed(HealthReport::unhealthy("down")));

        for _ in 0..3 {
            registry.check_module("db").await.unwrap();
        }
        let status = registry.get_last_status();
        assert_eq!(status.module("db").unwrap().consecutive_failures, 3);
        assert_eq!(status.overall, Overall::Degraded);
    }

    #[tokio::test]
    async fn test_errors_and_panics_become_unhealthy() {
        let registry = registry();
        registry.register_module("err", check_fn(refused));
        registry.register_module("panic", check_fn(exploding));

        let err = registry.check_module("err").await.unwrap();
        assert_eq!(err.healthy, Some(false));
        assert_eq!(err.error.as_deref(), Some("refused"));

        let panicked = registry.check_module("panic").await.unwrap();
        assert_eq!(panicked.healthy, Some(false));
        assert!(panicked.error.unwrap().contains("probe exploded"));
    }

    #[tokio::test]
    async fn test_missing_flag_is_healthy() {
        let registry = registry();
        registry.register_module(
            "cache",
            fixed(HealthReport::default().with_metric("hit_ratio", 0.9)),
        );
        let status = registry.check_module("cache").await.unwrap();
        assert_eq!(status.healthy, Some(true));
        assert_eq!(status.metrics.get("hit_ratio"), Some(&serde_json::json!(0.9)));
    }

    #[tokio::test]
    async fn test_unknown_module() {
        let registry = registry();
        assert_eq!(
            registry.check_module("ghost").await,
            Err(RegistryError::UnknownModule("ghost".into()))
        );
        assert!(!registry.unregister_module("ghost"));
    }

    #[tokio::test]
    async fn test_mixed_modules_are_degraded() {
        let registry = registry();
        registry.register_module("ok", fixed(HealthReport::healthy()));
        registry.register_module("bad", fixed(HealthReport::unhealthy("x")));

        let status = registry.get_status().await;
        assert_eq!(status.overall, Overall::Degraded);
        assert_eq!(status.total_modules, 2);
        assert_eq!(status.healthy_modules, 1);
        assert_eq!(status.unhealthy_modules, 1);
        assert_eq!(status.unhealthy_names(), vec!["bad"]);
    }

    #[tokio::test]
    async fn test_empty_registry_is_healthy() {
        assert_eq!(registry().check_all().await.overall, Overall::Healthy);
    }

    #[tokio::test]
    async fn test_last_status_does_not_run_checks() {
        let registry = registry();
        let calls = Arc::new(AtomicUsize::new(0));
        registry.register_module("svc", Counting { calls: calls.clone() });

        let status = registry.get_last_status();
        assert_eq!(status.overall, Overall::Unknown);
        assert_eq!(status.module("svc").unwrap().healthy, None);
        assert_eq!(calls.load(Ordering::SeqCst), 0);

        registry.check_all().await;
        registry.get_last_status();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_reregistration_warns_and_resets() {
        let (registry, logger) = registry_with(HealthConfig::default());
        registry.register_module("db", fixed(HealthReport::unhealthy("x")));
        registry.check_module("db").await.unwrap();
        registry.register_module("db", fixed(HealthReport::healthy()));

        assert_eq!(registry.get_last_status().module("db").unwrap().healthy, None);
        let warned = logger
            .memory()
            .unwrap()
            .entries()
            .iter()
            .any(|e| e.level == LogLevel::Warn && e.message.contains("re-registered"));
        assert!(warned);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_is_unhealthy() {
        let (registry, _) = registry_with(HealthConfig {
            check_timeout_ms: Some(50),
            ..HealthConfig::default()
        });
        registry.register_module("hang", check_fn(hanging));

        let status = registry.check_module("hang").await.unwrap();
        assert_eq!(status.healthy, Some(false));
        assert!(status.error.unwrap().contains("timed out"));
    }

    #[tokio::test]
    async fn test_parallel_checks() {
        let (registry, _) = registry_with(HealthConfig {
            parallel_checks: true,
            ..HealthConfig::default()
        });
        for name in ["a", "b", "c"] {
            registry.register_module(name, fixed(HealthReport::healthy()));
        }
        let status = registry.check_all().await;
        assert_eq!(status.healthy_modules, 3);
        assert_eq!(status.overall, Overall::Healthy);
    }

    #[tokio::test(start_paused = true)]
    async fn test_periodic_checks_run_and_stop() {
        let (registry, logger) = registry_with(HealthConfig {
            interval_ms: 100,
            ..HealthConfig::default()
        });
        let calls = Arc::new(AtomicUsize::new(0));
        registry.register_module("svc", Counting { calls: calls.clone() });
        registry.register_module("bad", fixed(HealthReport::unhealthy("x")));

        registry.start_periodic_checks();
        assert!(registry.is_periodic_running());
        tokio::time::sleep(Duration::from_millis(350)).await;
        registry.stop_periodic_checks().await;
        assert!(!registry.is_periodic_running());

        let runs = calls.load(Ordering::SeqCst);
        assert_eq!(runs, 3);
        tokio::time::sleep(Duration::from_millis(500)).await;
        assert_eq!(calls.load(Ordering::SeqCst), runs);

        let warned = logger
            .memory()
            .unwrap()
            .entries()
            .iter()
            .any(|e| e.message == "Unhealthy modules: bad");
        assert!(warned);
    }
}
