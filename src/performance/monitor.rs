//! Runtime performance monitor.

use std::future::Future;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use dashmap::DashMap;
use futures_util::FutureExt;
use serde::Serialize;
use serde_json::{json, Map, Value};
use thiserror::Error;
use tokio::time::{self, MissedTickBehavior};

use crate::config::PerformanceConfig;
use crate::lifecycle::TaskGroup;
use crate::logging::{LogLevel, ModuleLogger};
use crate::metadata::Metadata;
use crate::performance::fps::FpsCounter;
use crate::performance::memory::sample_memory;
use crate::performance::series::{MetricSeries, Sample, ERROR_FLAG};
use crate::performance::stats::{calculate_stats, Stats};
use crate::telemetry;

/// Series fed by the frame counter.
pub const FPS_SERIES: &str = "fps";
/// Series fed by the memory sampler, in MB.
pub const MEMORY_SERIES: &str = "memory";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum MonitorError {
    #[error("unknown mark '{0}'")]
    UnknownMark(String),
}

/// Overall verdict of [`PerformanceMonitor::get_health_status`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PerformanceState {
    Healthy,
    Warning,
}

/// One threshold breach.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PerformanceIssue {
    pub metric: &'static str,
    pub message: String,
    pub value: f64,
    pub threshold: f64,
}

/// Mean values over the retained window.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct HeadlineMetrics {
    pub fps: Option<f64>,
    pub memory_mb: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PerformanceHealth {
    pub status: PerformanceState,
    pub issues: Vec<PerformanceIssue>,
    pub metrics: HeadlineMetrics,
}

impl PerformanceHealth {
    pub fn is_healthy(&self) -> bool {
        self.status == PerformanceState::Healthy
    }
}

/// Samples frame rate and memory, records ad-hoc metrics and timings.
pub struct PerformanceMonitor {
    config: PerformanceConfig,
    log: ModuleLogger,
    series: DashMap<String, MetricSeries>,
    marks: DashMap<String, Instant>,
    fps: Mutex<FpsCounter>,
    epoch: time::Instant,
    tasks: TaskGroup,
}

impl PerformanceMonitor {
    pub fn new(config: PerformanceConfig, log: ModuleLogger) -> Self {
        Self {
            config,
            log,
            series: DashMap::new(),
            marks: DashMap::new(),
            fps: Mutex::new(FpsCounter::new()),
            epoch: time::Instant::now(),
            tasks: TaskGroup::new(),
        }
    }

    pub fn config(&self) -> &PerformanceConfig {
        &self.config
    }

    pub fn is_running(&self) -> bool {
        self.tasks.is_running()
    }

    /// Start frame ticking, memory sampling and summary logging.
    ///
    /// Does nothing when disabled or already running.
    pub fn start(self: &Arc<Self>) {
        if !self.config.enabled {
            self.log.info("Performance monitoring disabled", Metadata::new());
            return;
        }
        if self.tasks.is_running() {
            return;
        }

        let mut spawned = false;
        if self.config.drive_frames {
            let monitor = self.clone();
            let period = Duration::from_millis(self.config.frame_interval_ms.max(1));
            spawned |= self.tasks.spawn("fps", move |mut shutdown| async move {
                let mut ticker = time::interval(period);
                ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
                loop {
                    tokio::select! {
                        _ = ticker.tick() => monitor.record_frame(),
                        _ = shutdown.recv() => break,
                    }
                }
            });
        }

        let monitor = self.clone();
        let period = Duration::from_millis(self.config.memory_interval_ms.max(1));
        spawned |= self.tasks.spawn("memory", move |mut shutdown| async move {
            let mut ticker = time::interval(period);
            loop {
                tokio::select! {
                    _ = ticker.tick() => monitor.record_memory_sample(),
                    _ = shutdown.recv() => break,
                }
            }
        });

        let monitor = self.clone();
        let period = Duration::from_millis(self.config.summary_interval_ms.max(1));
        spawned |= self.tasks.spawn("summary", move |mut shutdown| async move {
            let mut ticker = time::interval_at(time::Instant::now() + period, period);
            loop {
                tokio::select! {
                    _ = ticker.tick() => monitor.log_summary(),
                    _ = shutdown.recv() => break,
                }
            }
        });

        if !spawned {
            return;
        }
        self.log.info(
            "Performance monitoring started",
            Metadata::new()
                .with("drive_frames", self.config.drive_frames)
                .with("memory_interval_ms", self.config.memory_interval_ms)
                .with("summary_interval_ms", self.config.summary_interval_ms),
        );
    }

    /// Cancel every periodic task this monitor started.
    pub async fn stop(&self) {
        if !self.tasks.is_running() {
            return;
        }
        self.tasks.stop().await;
        self.fps.lock().expect("fps mutex poisoned").reset();
        self.log.info("Performance monitoring stopped", Metadata::new());
    }

    /// Count one frame. Hosts with their own render loop call this per frame.
    pub fn record_frame(&self) {
        let now_ms = self.epoch.elapsed().as_secs_f64() * 1000.0;
        let fps = self.fps.lock().expect("fps mutex poisoned").tick(now_ms);
        if let Some(fps) = fps {
            self.record_metric(FPS_SERIES, f64::from(fps), Metadata::new());
        }
    }

    fn record_memory_sample(&self) {
        if let Some(usage) = sample_memory() {
            let mut meta = Metadata::new().with("resident_bytes", usage.resident_bytes);
            if let Some(peak) = usage.peak_resident_bytes {
                meta.insert("peak_resident_bytes", peak);
            }
            self.record_metric(MEMORY_SERIES, usage.resident_mb(), meta);
        }
    }

    /// Append a sample to `name`, evicting the oldest beyond the sample cap.
    pub fn record_metric(&self, name: &str, value: f64, metadata: Metadata) {
        let sample = Sample::new(value, metadata);
        let failed = sample.is_error();

        if self.log.enabled(LogLevel::Trace) {
            self.log.trace(
                "Metric recorded",
                Metadata::new().with("metric", name).with("value", value),
            );
        }

        self.series
            .entry(name.to_string())
            .or_insert_with(|| MetricSeries::new(self.config.max_samples))
            .push(sample);
        telemetry::record_sample(name, value, failed);
    }

    /// Time a synchronous unit of work and record its duration in ms.
    ///
    /// An `Err` or a panic records an error-flagged sample; the error is
    /// returned and the panic resumed unchanged.
    pub fn measure<T, E, F>(&self, name: &str, f: F) -> Result<T, E>
    where
        F: FnOnce() -> Result<T, E>,
    {
        let start = Instant::now();
        let outcome = panic::catch_unwind(AssertUnwindSafe(f));
        let duration_ms = elapsed_ms(start);

        match outcome {
            Ok(Ok(value)) => {
                self.record_metric(name, duration_ms, Metadata::new());
                Ok(value)
            }
            Ok(Err(e)) => {
                self.record_failure(name, duration_ms, false);
                Err(e)
            }
            Err(payload) => {
                self.record_failure(name, duration_ms, true);
                panic::resume_unwind(payload)
            }
        }
    }

    /// Async counterpart of [`PerformanceMonitor::measure`]. Timing starts
    /// when the returned future is first polled.
    pub async fn measure_async<T, E, Fut>(&self, name: &str, fut: Fut) -> Result<T, E>
    where
        Fut: Future<Output = Result<T, E>>,
    {
        let start = Instant::now();
        let outcome = AssertUnwindSafe(fut).catch_unwind().await;
        let duration_ms = elapsed_ms(start);

        match outcome {
            Ok(Ok(value)) => {
                self.record_metric(name, duration_ms, Metadata::new());
                Ok(value)
            }
            Ok(Err(e)) => {
                self.record_failure(name, duration_ms, false);
                Err(e)
            }
            Err(payload) => {
                self.record_failure(name, duration_ms, true);
                panic::resume_unwind(payload)
            }
        }
    }

    fn record_failure(&self, name: &str, duration_ms: f64, panicked: bool) {
        let mut meta = Metadata::new().with(ERROR_FLAG, true);
        if panicked {
            meta.insert("panic", true);
        }
        self.record_metric(name, duration_ms, meta);
        self.log.debug(
            "Measured operation failed",
            Metadata::new()
                .with("metric", name)
                .with("duration_ms", duration_ms)
                .with("panic", panicked),
        );
    }

    /// Remember the current instant under `name`, replacing any earlier mark.
    pub fn mark(&self, name: &str) {
        self.marks.insert(name.to_string(), Instant::now());
    }

    /// Record the time between two marks under `name` and return it in ms.
    ///
    /// An end mark earlier than the start mark yields zero.
    pub fn measure_between(
        &self,
        name: &str,
        start_mark: &str,
        end_mark: &str,
    ) -> Result<f64, MonitorError> {
        let start = self.mark_instant(start_mark)?;
        let end = self.mark_instant(end_mark)?;
        let duration_ms = end.saturating_duration_since(start).as_secs_f64() * 1000.0;

        self.record_metric(
            name,
            duration_ms,
            Metadata::new()
                .with("start_mark", start_mark)
                .with("end_mark", end_mark),
        );
        Ok(duration_ms)
    }

    fn mark_instant(&self, name: &str) -> Result<Instant, MonitorError> {
        self.marks
            .get(name)
            .map(|r| *r.value())
            .ok_or_else(|| MonitorError::UnknownMark(name.to_string()))
    }

    /// Retained samples of one series, oldest first.
    pub fn get_metrics(&self, name: &str) -> Vec<Sample> {
        self.series
            .get(name)
            .map(|s| s.samples().cloned().collect())
            .unwrap_or_default()
    }

    pub fn series_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.series.iter().map(|r| r.key().clone()).collect();
        names.sort();
        names
    }

    /// Stats of one series; `None` when it is empty or unknown.
    pub fn calculate_stats(&self, name: &str) -> Option<Stats> {
        let values = self.series.get(name)?.values();
        calculate_stats(&values)
    }

    fn mean_of(&self, name: &str) -> Option<f64> {
        self.series.get(name).and_then(|s| s.mean())
    }

    /// Compare mean FPS and memory against the configured thresholds.
    pub fn get_health_status(&self) -> PerformanceHealth {
        let fps = self.mean_of(FPS_SERIES);
        let memory_mb = self.mean_of(MEMORY_SERIES);
        let mut issues = Vec::new();

        if let Some(fps) = fps {
            if fps < self.config.min_fps {
                issues.push(PerformanceIssue {
                    metric: FPS_SERIES,
                    message: format!("Low frame rate: {fps:.1} fps"),
                    value: fps,
                    threshold: self.config.min_fps,
                });
            }
        }
        if let Some(memory) = memory_mb {
            if memory > self.config.max_memory_mb {
                issues.push(PerformanceIssue {
                    metric: MEMORY_SERIES,
                    message: format!("High memory usage: {memory:.1} MB"),
                    value: memory,
                    threshold: self.config.max_memory_mb,
                });
            }
        }

        PerformanceHealth {
            status: if issues.is_empty() {
                PerformanceState::Healthy
            } else {
                PerformanceState::Warning
            },
            issues,
            metrics: HeadlineMetrics { fps, memory_mb },
        }
    }

    /// Stats for every series, keyed by name.
    pub fn summary(&self) -> Map<String, Value> {
        self.series_names()
            .into_iter()
            .filter_map(|name| {
                let stats = self.calculate_stats(&name)?;
                Some((name, json!(stats)))
            })
            .collect()
    }

    fn log_summary(&self) {
        let summary = self.summary();
        if summary.is_empty() {
            self.log.debug("No performance metrics recorded yet", Metadata::new());
            return;
        }
        self.log.info(
            "Performance summary",
            Metadata::new().with("metrics", Value::Object(summary)),
        );
    }

    /// Drop every series and mark.
    pub fn clear_metrics(&self) {
        self.series.clear();
        self.marks.clear();
    }
}

fn elapsed_ms(start: Instant) -> f64 {
    start.elapsed().as_secs_f64() * 1000.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::Logger;

    fn monitor_with(config: PerformanceConfig) -> (Arc<PerformanceMonitor>, Arc<Logger>) {
        let logger = Arc::new(Logger::new(LogLevel::Debug).with_memory(100));
        let monitor = Arc::new(PerformanceMonitor::new(
            config,
            logger.create_logger("PerformanceMonitor"),
        ));
        (monitor, logger)
    }

    fn monitor() -> Arc<PerformanceMonitor> {
        let config = PerformanceConfig {
            max_samples: 5,
            ..PerformanceConfig::default()
        };
        monitor_with(config).0
    }

    #[test]
    fn test_series_cap_keeps_latest() {
        let monitor = monitor();
        for v in 0..12 {
            monitor.record_metric("latency", v as f64, Metadata::new());
        }
        let values: Vec<f64> = monitor.get_metrics("latency").iter().map(|s| s.value).collect();
        assert_eq!(values, vec![7.0, 8.0, 9.0, 10.0, 11.0]);
    }

    #[test]
    fn test_measure_records_success() {
        let monitor = monitor();
        let out: Result<u32, String> = monitor.measure("op", || Ok(7));
        assert_eq!(out, Ok(7));

        let samples = monitor.get_metrics("op");
        assert_eq!(samples.len(), 1);
        assert!(!samples[0].is_error());
        assert!(samples[0].value >= 0.0);
    }

    #[test]
    fn test_measure_propagates_error() {
        let monitor = monitor();
        let out: Result<(), String> = monitor.measure("op", || Err("bad input".to_string()));
        assert_eq!(out, Err("bad input".to_string()));

        let samples = monitor.get_metrics("op");
        assert_eq!(samples.len(), 1);
        assert!(samples[0].is_error());
        assert!(samples[0].value >= 0.0);
    }

    #[test]
    fn test_measure_resumes_panic() {
        let monitor = monitor();
        let result = panic::catch_unwind(AssertUnwindSafe(|| {
            let _: Result<(), ()> = monitor.measure("op", || panic!("kaboom"));
        }));

        let payload = result.unwrap_err();
        assert_eq!(payload.downcast_ref::<&str>(), Some(&"kaboom"));
        let samples = monitor.get_metrics("op");
        assert!(samples[0].is_error());
        assert_eq!(samples[0].metadata.get("panic"), Some(&json!(true)));
    }

    #[tokio::test]
    async fn test_measure_async() {
        let monitor = monitor();
        let ok: Result<&str, ()> = monitor
            .measure_async("fetch", async {
                tokio::time::sleep(Duration::from_millis(5)).await;
                Ok("done")
            })
            .await;
        assert_eq!(ok, Ok("done"));

        let err: Result<(), &str> = monitor.measure_async("fetch", async { Err("timeout") }).await;
        assert_eq!(err, Err("timeout"));

        let samples = monitor.get_metrics("fetch");
        assert_eq!(samples.len(), 2);
        assert!(samples[0].value >= 5.0);
        assert!(!samples[0].is_error());
        assert!(samples[1].is_error());
    }

    #[test]
    fn test_marks() {
        let monitor = monitor();
        monitor.mark("start");
        std::thread::sleep(Duration::from_millis(2));
        monitor.mark("end");

        let ms = monitor.measure_between("phase", "start", "end").unwrap();
        assert!(ms >= 2.0);
        assert_eq!(monitor.get_metrics("phase").len(), 1);

        assert_eq!(
            monitor.measure_between("phase", "start", "missing"),
            Err(MonitorError::UnknownMark("missing".into()))
        );
    }

    #[test]
    fn test_stats_for_unknown_series() {
        let monitor = monitor();
        assert_eq!(monitor.calculate_stats("nothing"), None);
        monitor.record_metric("one", 3.0, Metadata::new());
        assert_eq!(monitor.calculate_stats("one").unwrap().p99, 3.0);
    }

    #[test]
    fn test_health_status_thresholds() {
        let monitor = monitor();
        assert!(monitor.get_health_status().is_healthy());

        monitor.record_metric(FPS_SERIES, 20.0, Metadata::new());
        monitor.record_metric(FPS_SERIES, 30.0, Metadata::new());
        monitor.record_metric(MEMORY_SERIES, 600.0, Metadata::new());

        let health = monitor.get_health_status();
        assert_eq!(health.status, PerformanceState::Warning);
        assert_eq!(health.issues.len(), 2);
        assert_eq!(health.metrics.fps, Some(25.0));
        assert_eq!(health.metrics.memory_mb, Some(600.0));
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_stop_cancels_sampling() {
        let config = PerformanceConfig {
            frame_interval_ms: 10,
            memory_interval_ms: 100,
            summary_interval_ms: 1_000,
            ..PerformanceConfig::default()
        };
        let (monitor, _logger) = monitor_with(config);

        monitor.start();
        assert!(monitor.is_running());
        tokio::time::sleep(Duration::from_millis(2_500)).await;
        monitor.stop().await;
        assert!(!monitor.is_running());

        let frames = monitor.get_metrics(FPS_SERIES).len();
        assert!(frames >= 1);
        tokio::time::sleep(Duration::from_millis(5_000)).await;
        assert_eq!(monitor.get_metrics(FPS_SERIES).len(), frames);
    }

    #[tokio::test(start_paused = true)]
    async fn test_periodic_memory_samples_and_summary() {
        let config = PerformanceConfig {
            drive_frames: false,
            memory_interval_ms: 100,
            summary_interval_ms: 1_000,
            ..PerformanceConfig::default()
        };
        let (monitor, logger) = monitor_with(config);
        monitor.record_metric("render", 4.0, Metadata::new());

        monitor.start();
        tokio::time::sleep(Duration::from_millis(1_500)).await;
        monitor.stop().await;

        #[cfg(target_os = "linux")]
        {
            let memory = monitor.get_metrics(MEMORY_SERIES);
            assert!(!memory.is_empty());
            assert!(memory[0].value > 0.0);
            assert!(memory[0].metadata.contains_key("resident_bytes"));
        }

        let entries = logger.memory().unwrap().entries();
        let summary = entries
            .iter()
            .find(|e| e.message == "Performance summary")
            .expect("summary logged");
        assert_eq!(summary.level, LogLevel::Info);
        assert_eq!(
            summary.metadata.get("metrics").unwrap()["render"]["count"],
            1
        );
    }

    #[test]
    fn test_start_without_runtime_spawns_nothing() {
        let (monitor, logger) = monitor_with(PerformanceConfig::default());
        monitor.start();

        assert!(!monitor.is_running());
        let entries = logger.memory().unwrap().entries();
        assert!(!entries
            .iter()
            .any(|e| e.message == "Performance monitoring started"));
    }

    #[test]
    fn test_summary_contains_stats() {
        let monitor = monitor();
        monitor.record_metric("render", 4.0, Metadata::new());
        let summary = monitor.summary();
        assert_eq!(summary["render"]["count"], 1);
        assert_eq!(summary["render"]["max"], 4.0);
    }
}
