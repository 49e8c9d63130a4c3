//! Leveled multi-destination logger and its module-scoped handles.

use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};
use std::sync::Arc;

use crate::config::{Environment, LoggingConfig};
use crate::logging::sink::{ConsoleSink, FileSink, LogSink, MemorySink};
use crate::logging::{LogEntry, LogLevel};
use crate::metadata::Metadata;

/// Module name used by entries logged directly on a [`Logger`].
pub const DEFAULT_MODULE: &str = "app";

/// `tracing` target that receives sink failures.
pub const FALLBACK_TARGET: &str = "observability_kit::fallback";

/// Shared logger. Cheap to share behind `Arc`; scoped handles come from
/// [`Logger::create_logger`].
pub struct Logger {
    level: AtomicU8,
    sinks: Vec<Arc<dyn LogSink>>,
    memory: Option<Arc<MemorySink>>,
    file_path: Option<PathBuf>,
    write_failures: AtomicU64,
}

impl std::fmt::Debug for Logger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Logger")
            .field("level", &self.level())
            .field("sinks", &self.sinks.iter().map(|s| s.name()).collect::<Vec<_>>())
            .field("file_path", &self.file_path)
            .finish()
    }
}

impl Logger {
    /// A logger with no destinations. Add some with [`Logger::with_sink`].
    pub fn new(level: LogLevel) -> Self {
        Self {
            level: AtomicU8::new(level as u8),
            sinks: Vec::new(),
            memory: None,
            file_path: None,
            write_failures: AtomicU64::new(0),
        }
    }

    /// Build destinations from configuration.
    ///
    /// Console output follows the environment unless set explicitly. A log
    /// directory that cannot be created degrades to the remaining
    /// destinations instead of failing.
    pub fn from_config(config: &LoggingConfig, env: Environment) -> Self {
        let mut logger = Logger::new(config.level);

        if config.console_enabled(env) {
            logger = logger.with_sink(Arc::new(ConsoleSink::new(config.colorize)));
        }

        if config.file {
            match FileSink::open(
                &config.dir,
                &config.file_name,
                config.max_size_bytes,
                config.max_files,
            ) {
                Ok(sink) => {
                    logger.file_path = Some(sink.active_path());
                    logger = logger.with_sink(Arc::new(sink));
                }
                Err(e) => {
                    logger.report_failure("file", &e);
                }
            }
        }

        if config.memory_capacity > 0 {
            logger = logger.with_memory(config.memory_capacity);
        }

        logger
    }

    pub fn with_sink(mut self, sink: Arc<dyn LogSink>) -> Self {
        self.sinks.push(sink);
        self
    }

    /// Attach an in-memory sink retaining the last `capacity` entries.
    pub fn with_memory(mut self, capacity: usize) -> Self {
        let sink = Arc::new(MemorySink::new(capacity));
        self.memory = Some(sink.clone());
        self.sinks.push(sink);
        self
    }

    /// Handle that tags every entry with `module`.
    pub fn create_logger(self: &Arc<Self>, module: impl Into<String>) -> ModuleLogger {
        ModuleLogger {
            logger: self.clone(),
            module: Arc::from(module.into()),
        }
    }

    pub fn level(&self) -> LogLevel {
        LogLevel::from(self.level.load(Ordering::Relaxed))
    }

    pub fn set_level(&self, level: LogLevel) {
        let previous = LogLevel::from(self.level.swap(level as u8, Ordering::Relaxed));
        if previous != level {
            tracing::info!(from = %previous, to = %level, "Log level changed");
        }
    }

    pub fn enabled(&self, level: LogLevel) -> bool {
        level.enabled_at(self.level())
    }

    /// The in-memory sink, if configured.
    pub fn memory(&self) -> Option<&Arc<MemorySink>> {
        self.memory.as_ref()
    }

    /// Path of the active log file, if file output is active.
    pub fn file_path(&self) -> Option<&PathBuf> {
        self.file_path.as_ref()
    }

    /// Number of sink failures routed to the fallback channel.
    pub fn write_failures(&self) -> u64 {
        self.write_failures.load(Ordering::Relaxed)
    }

    /// Emit an entry to every destination if `level` passes the threshold.
    /// Never fails; sink errors go to the fallback channel.
    pub fn log(
        &self,
        level: LogLevel,
        module: &str,
        message: impl Into<String>,
        metadata: Metadata,
    ) {
        if !self.enabled(level) {
            return;
        }
        let entry = LogEntry::new(level, module, message, metadata);
        self.emit(&entry);
    }

    /// Write an already-built entry, still honouring the threshold.
    pub fn emit(&self, entry: &LogEntry) {
        if !self.enabled(entry.level) {
            return;
        }
        for sink in &self.sinks {
            if let Err(e) = sink.write(entry) {
                self.report_failure(sink.name(), &e);
            }
        }
    }

    pub fn flush(&self) {
        for sink in &self.sinks {
            if let Err(e) = sink.flush() {
                self.report_failure(sink.name(), &e);
            }
        }
    }

    pub fn error(&self, message: impl Into<String>, metadata: Metadata) {
        self.log(LogLevel::Error, DEFAULT_MODULE, message, metadata);
    }

    pub fn warn(&self, message: impl Into<String>, metadata: Metadata) {
        self.log(LogLevel::Warn, DEFAULT_MODULE, message, metadata);
    }

    pub fn info(&self, message: impl Into<String>, metadata: Metadata) {
        self.log(LogLevel::Info, DEFAULT_MODULE, message, metadata);
    }

    pub fn debug(&self, message: impl Into<String>, metadata: Metadata) {
        self.log(LogLevel::Debug, DEFAULT_MODULE, message, metadata);
    }

    pub fn trace(&self, message: impl Into<String>, metadata: Metadata) {
        self.log(LogLevel::Trace, DEFAULT_MODULE, message, metadata);
    }

    fn report_failure(&self, sink: &str, error: &std::io::Error) {
        self.write_failures.fetch_add(1, Ordering::Relaxed);
        tracing::warn!(
            target: FALLBACK_TARGET,
            sink = sink,
            error = %error,
            "Log destination failed"
        );
    }
}

/// A logger handle scoped to one module name.
#[derive(Clone, Debug)]
pub struct ModuleLogger {
    logger: Arc<Logger>,
    module: Arc<str>,
}

impl ModuleLogger {
    pub fn module(&self) -> &str {
        &self.module
    }

    pub fn logger(&self) -> &Arc<Logger> {
        &self.logger
    }

    /// Child handle sharing the same destinations under another module name.
    pub fn create_logger(&self, module: impl Into<String>) -> ModuleLogger {
        self.logger.create_logger(module)
    }

    pub fn enabled(&self, level: LogLevel) -> bool {
        self.logger.enabled(level)
    }

    pub fn log(&self, level: LogLevel, message: impl Into<String>, metadata: Metadata) {
        self.logger.log(level, &self.module, message, metadata);
    }

    pub fn error(&self, message: impl Into<String>, metadata: Metadata) {
        self.log(LogLevel::Error, message, metadata);
    }

    pub fn warn(&self, message: impl Into<String>, metadata: Metadata) {
        self.log(LogLevel::Warn, message, metadata);
    }

    pub fn info(&self, message: impl Into<String>, metadata: Metadata) {
        self.log(LogLevel::Info, message, metadata);
    }

    pub fn debug(&self, message: impl Into<String>, metadata: Metadata) {
        self.log(LogLevel::Debug, message, metadata);
    }

    pub fn trace(&self, message: impl Into<String>, metadata: Metadata) {
        self.log(LogLevel::Trace, message, metadata);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    struct FailingSink;

    impl LogSink for FailingSink {
        fn name(&self) -> &'static str {
            "failing"
        }

        fn write(&self, _entry: &LogEntry) -> io::Result<()> {
            Err(io::Error::new(io::ErrorKind::Other, "disk full"))
        }
    }

    #[test]
    fn test_threshold_filters_every_destination() {
        let logger = Arc::new(Logger::new(LogLevel::Warn).with_memory(10));
        let log = logger.create_logger("auth");

        log.info("hidden", Metadata::new());
        log.debug("hidden", Metadata::new());
        assert!(logger.memory().unwrap().is_empty());

        log.error("boom", Metadata::new().with("code", 7));
        let entries = logger.memory().unwrap().entries();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].level.as_str(), "ERROR");
        assert_eq!(entries[0].module, "auth");
    }

    #[test]
    fn test_child_shares_destinations() {
        let logger = Arc::new(Logger::new(LogLevel::Trace).with_memory(10));
        let parent = logger.create_logger("net");
        let child = parent.create_logger("net.tcp");

        parent.trace("a", Metadata::new());
        child.info("b", Metadata::new());
        logger.info("c", Metadata::new());

        let modules: Vec<String> = logger
            .memory()
            .unwrap()
            .entries()
            .into_iter()
            .map(|e| e.module)
            .collect();
        assert_eq!(modules, vec!["net", "net.tcp", DEFAULT_MODULE]);
    }

    #[test]
    fn test_sink_failure_never_reaches_caller() {
        let logger = Arc::new(
            Logger::new(LogLevel::Info)
                .with_sink(Arc::new(FailingSink))
                .with_memory(4),
        );
        logger.create_logger("x").error("still delivered", Metadata::new());

        assert_eq!(logger.write_failures(), 1);
        assert_eq!(logger.memory().unwrap().len(), 1);
    }

    #[test]
    fn test_runtime_level_change() {
        let logger = Arc::new(Logger::new(LogLevel::Error).with_memory(4));
        logger.info("dropped", Metadata::new());
        logger.set_level(LogLevel::Info);
        logger.info("kept", Metadata::new());

        assert_eq!(logger.level(), LogLevel::Info);
        assert_eq!(logger.memory().unwrap().len(), 1);
    }
}
