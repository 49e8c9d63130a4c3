//! The owning context of the four observability components.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::config::{self, ObservabilityConfig};
use crate::error::Result;
use crate::health::HealthCheckRegistry;
use crate::logging::{LogLevel, Logger, ModuleLogger};
use crate::metadata::Metadata;
use crate::performance::PerformanceMonitor;
use crate::tracking::{ErrorCaptureLayer, ErrorTracker};

/// Module names the components log under.
pub const ERROR_TRACKER_MODULE: &str = "ErrorTracker";
pub const PERFORMANCE_MODULE: &str = "PerformanceMonitor";
pub const HEALTH_MODULE: &str = "HealthCheck";

/// Logger, error tracker, performance monitor and health registry, built
/// from one config and started and stopped together.
pub struct Observability {
    config: ObservabilityConfig,
    logger: Arc<Logger>,
    errors: Arc<ErrorTracker>,
    performance: Arc<PerformanceMonitor>,
    health: Arc<HealthCheckRegistry>,
    started: AtomicBool,
}

impl Observability {
    /// Build every component, logger first. Nothing runs until `start`.
    pub fn new(config: ObservabilityConfig) -> Self {
        let logger = Arc::new(Logger::from_config(&config.logging, config.environment));
        Self::with_logger(config, logger)
    }

    /// Like [`Observability::new`] with a caller-built logger, whose
    /// destinations replace the configured ones.
    pub fn with_logger(config: ObservabilityConfig, logger: Arc<Logger>) -> Self {
        let errors = Arc::new(ErrorTracker::new(
            config.errors.clone(),
            logger.create_logger(ERROR_TRACKER_MODULE),
        ));
        let performance = Arc::new(PerformanceMonitor::new(
            config.performance.clone(),
            logger.create_logger(PERFORMANCE_MODULE),
        ));
        let health = Arc::new(HealthCheckRegistry::new(
            config.health.clone(),
            logger.create_logger(HEALTH_MODULE),
        ));

        Self {
            config,
            logger,
            errors,
            performance,
            health,
            started: AtomicBool::new(false),
        }
    }

    /// Defaults overlaid with `LOG_LEVEL`, `APP_ENV` and `LOG_DIR`.
    pub fn from_env() -> Result<Self> {
        Ok(Self::new(config::from_env()?))
    }

    /// The config this context was built from.
    pub fn config(&self) -> &ObservabilityConfig {
        &self.config
    }

    pub fn logger(&self) -> &Arc<Logger> {
        &self.logger
    }

    pub fn errors(&self) -> &Arc<ErrorTracker> {
        &self.errors
    }

    pub fn performance(&self) -> &Arc<PerformanceMonitor> {
        &self.performance
    }

    pub fn health(&self) -> &Arc<HealthCheckRegistry> {
        &self.health
    }

    /// Scoped logging handle for a collaborator.
    pub fn create_logger(&self, module: impl Into<String>) -> ModuleLogger {
        self.logger.create_logger(module)
    }

    /// See [`ErrorTracker::capture_layer`].
    pub fn capture_layer(&self) -> ErrorCaptureLayer {
        self.errors.capture_layer()
    }

    pub fn is_started(&self) -> bool {
        self.started.load(Ordering::SeqCst)
    }

    /// Start error capture, performance sampling and, when configured,
    /// periodic health checks. Idempotent.
    pub fn start(&self) {
        if self.started.swap(true, Ordering::SeqCst) {
            return;
        }
        self.errors.start();
        self.performance.start();
        if self.config.health.periodic {
            self.health.start_periodic_checks();
        }
        self.logger.info(
            "Observability started",
            Metadata::new()
                .with("environment", format!("{:?}", self.config.environment).to_lowercase())
                .with("level", self.logger.level().as_str()),
        );
    }

    /// Stop everything `start` started, in reverse order, then flush the
    /// log destinations.
    pub async fn shutdown(&self) {
        if self.started.swap(false, Ordering::SeqCst) {
            self.health.stop_periodic_checks().await;
            self.performance.stop().await;
            self.errors.stop();
            self.logger.info("Observability stopped", Metadata::new());
        }
        self.logger.flush();
    }

    /// Apply the runtime-adjustable parts of a reloaded config. Returns
    /// whether anything changed.
    pub fn apply_config(&self, config: &ObservabilityConfig) -> bool {
        let level: LogLevel = config.logging.level;
        if self.logger.level() == level {
            return false;
        }
        self.logger.set_level(level);
        true
    }
}

impl std::fmt::Debug for Observability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Observability")
            .field("environment", &self.config.environment)
            .field("logger", &self.logger)
            .field("started", &self.is_started())
            .finish()
    }
}
