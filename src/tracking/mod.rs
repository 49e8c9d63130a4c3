//! Error tracking subsystem.
//!
//! # Data Flow
//! ```text
//! Panic hook ─────────┐
//! tracing ERROR event ┼→ surfaces.rs → ErrorTracker::track_error
//! Host call ──────────┘                   → record.rs (ErrorRecord, uuid + timestamp)
//!                                         → bounded history + per-message counts
//!                                         → logger (ERROR) + telemetry counter
//! ```
//!
//! Surfaces are installed on `start` only when the host offers them, and are
//! removed again on `stop`, leaving the previous panic hook in place.

pub mod record;
pub mod surfaces;
pub mod tracker;

pub use record::{ErrorFilter, ErrorKind, ErrorRecord, ErrorReport, ErrorSummary, TopError};
pub use surfaces::{ErrorCaptureLayer, ErrorSurface, EventBridge, EventSurface, PanicSurface};
pub use tracker::{ErrorTracker, RECENT_ERRORS, TOP_ERRORS};
