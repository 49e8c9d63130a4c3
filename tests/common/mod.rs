//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use observability_kit::config::{
    Environment, ErrorTrackingConfig, LoggingConfig, ObservabilityConfig, PerformanceConfig,
};
use observability_kit::health::{CheckResult, HealthCheck, HealthReport};
use observability_kit::LogLevel;

/// A directory under the system temp dir, removed on drop.
pub struct TempDir {
    path: PathBuf,
}

impl TempDir {
    pub fn new(prefix: &str) -> Self {
        let path = std::env::temp_dir().join(format!("{prefix}-{}", uuid::Uuid::new_v4()));
        fs::create_dir_all(&path).unwrap();
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Sorted names of the files directly inside the directory.
    pub fn file_names(&self) -> Vec<String> {
        let mut names: Vec<String> = fs::read_dir(&self.path)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }
}

impl Drop for TempDir {
    fn drop(&mut self) {
        let _ = fs::remove_dir_all(&self.path);
    }
}

/// File-only logging into `dir`, with an in-memory copy of every entry.
pub fn file_logging(dir: &Path, level: LogLevel) -> LoggingConfig {
    LoggingConfig {
        level,
        console: Some(false),
        file: true,
        dir: dir.to_string_lossy().into_owned(),
        memory_capacity: 1_000,
        ..LoggingConfig::default()
    }
}

/// A config with no background side effects: no panic hook, no frame task.
pub fn quiet_config(dir: &Path) -> ObservabilityConfig {
    ObservabilityConfig {
        environment: Environment::Production,
        logging: file_logging(dir, LogLevel::Debug),
        performance: PerformanceConfig {
            drive_frames: false,
            ..PerformanceConfig::default()
        },
        errors: ErrorTrackingConfig {
            capture_panics: false,
            ..ErrorTrackingConfig::default()
        },
        ..ObservabilityConfig::default()
    }
}

/// JSON records of a log file, one per line.
pub fn read_records(path: &Path) -> Vec<serde_json::Value> {
    fs::read_to_string(path)
        .unwrap_or_default()
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect()
}

/// One scripted answer of a [`ScriptedCheck`].
#[derive(Clone)]
pub enum Step {
    Healthy,
    Unhealthy(&'static str),
    Fail(&'static str),
}

/// A health check that replays a script, then repeats its last step.
pub struct ScriptedCheck {
    steps: Mutex<VecDeque<Step>>,
    last: Mutex<Step>,
    calls: Arc<AtomicUsize>,
}

impl ScriptedCheck {
    pub fn new(steps: impl IntoIterator<Item = Step>) -> Self {
        Self {
            steps: Mutex::new(steps.into_iter().collect()),
            last: Mutex::new(Step::Healthy),
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn always(step: Step) -> Self {
        Self::new([step])
    }

    /// Shared call counter, readable after the check is registered.
    pub fn calls(&self) -> Arc<AtomicUsize> {
        self.calls.clone()
    }
}

#[async_trait]
impl HealthCheck for ScriptedCheck {
    async fn check(&self) -> CheckResult {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let step = {
            let mut last = self.last.lock().unwrap();
            if let Some(next) = self.steps.lock().unwrap().pop_front() {
                *last = next;
            }
            last.clone()
        };
        match step {
            Step::Healthy => Ok(HealthReport::healthy()),
            Step::Unhealthy(message) => Ok(HealthReport::unhealthy(message)),
            Step::Fail(error) => Err(error.into()),
        }
    }
}
