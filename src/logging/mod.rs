//! Structured logging.
//!
//! # Data Flow
//! ```text
//! ModuleLogger::info(message, metadata)
//!     → Logger::log (threshold check)
//!     → LogEntry (timestamp, level, module, message, metadata)
//!     → every LogSink
//!         human-readable line    → stdout / stderr
//!         JSON line              → rotation.rs (RotatingFile)
//!         entry clone            → MemorySink
//!     → sink error → fallback channel (`tracing`, WARN)
//! ```
//!
//! # Design Decisions
//! - Logging never fails from the caller's point of view
//! - Threshold is an atomic; it can change at runtime
//! - Rotation is checked on open and before every write

pub mod entry;
pub mod level;
pub mod logger;
pub mod rotation;
pub mod sink;

pub use entry::LogEntry;
pub use level::{LogLevel, ParseLevelError};
pub use logger::{Logger, ModuleLogger};
pub use rotation::RotatingFile;
pub use sink::{ConsoleSink, FileSink, LogSink, MemorySink};
