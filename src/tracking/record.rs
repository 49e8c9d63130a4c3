//! Error records and the queries over them.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};
use uuid::Uuid;

use crate::metadata::Metadata;

/// Type tag of a tracked error.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Process-level uncaught failure (panic hook).
    Panic,
    /// Error-level `tracing` event emitted by host code.
    Event,
    /// Reported explicitly through `track_error`.
    Manual,
    /// Host-defined tag.
    Custom(String),
}

impl ErrorKind {
    pub fn as_str(&self) -> &str {
        match self {
            ErrorKind::Panic => "panic",
            ErrorKind::Event => "event",
            ErrorKind::Manual => "manual",
            ErrorKind::Custom(tag) => tag,
        }
    }
}

impl From<&str> for ErrorKind {
    fn from(tag: &str) -> Self {
        match tag {
            "panic" => ErrorKind::Panic,
            "event" => ErrorKind::Event,
            "manual" => ErrorKind::Manual,
            other => ErrorKind::Custom(other.to_string()),
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for ErrorKind {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// An error as reported, before it is stamped into a record.
#[derive(Debug, Clone, PartialEq)]
pub struct ErrorReport {
    pub message: String,
    pub stack: Option<String>,
    pub kind: ErrorKind,
}

impl ErrorReport {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            stack: None,
            kind: ErrorKind::Manual,
        }
    }

    /// Message from `Display`; the `source()` chain becomes the stack text.
    pub fn from_error(error: &(dyn std::error::Error + 'static)) -> Self {
        let mut causes = Vec::new();
        let mut source = error.source();
        while let Some(cause) = source {
            causes.push(format!("caused by: {cause}"));
            source = cause.source();
        }

        Self {
            message: error.to_string(),
            stack: (!causes.is_empty()).then(|| causes.join("\n")),
            kind: ErrorKind::Manual,
        }
    }

    pub fn kind(mut self, kind: impl Into<ErrorKind>) -> Self {
        self.kind = kind.into();
        self
    }

    pub fn stack(mut self, stack: impl Into<String>) -> Self {
        self.stack = Some(stack.into());
        self
    }
}

impl From<&str> for ErrorReport {
    fn from(message: &str) -> Self {
        ErrorReport::new(message)
    }
}

impl From<String> for ErrorReport {
    fn from(message: String) -> Self {
        ErrorReport::new(message)
    }
}

/// A normalised, timestamped error.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorRecord {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub message: String,
    pub stack: Option<String>,
    #[serde(rename = "type")]
    pub kind: ErrorKind,
    pub context: Metadata,
    #[serde(skip)]
    pub(crate) seq: u64,
}

impl ErrorRecord {
    pub(crate) fn from_report(report: ErrorReport, context: Metadata, seq: u64) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            message: report.message,
            stack: report.stack,
            kind: report.kind,
            context,
            seq,
        }
    }
}

/// Conjunctive filter for `get_errors`. Unset fields match everything.
#[derive(Debug, Clone, Default)]
pub struct ErrorFilter {
    pub kind: Option<ErrorKind>,
    pub since: Option<DateTime<Utc>>,
    /// Keep only the last `limit` matches.
    pub limit: Option<usize>,
}

impl ErrorFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn kind(mut self, kind: impl Into<ErrorKind>) -> Self {
        self.kind = Some(kind.into());
        self
    }

    pub fn since(mut self, since: DateTime<Utc>) -> Self {
        self.since = Some(since);
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn matches(&self, record: &ErrorRecord) -> bool {
        self.kind.as_ref().map_or(true, |k| *k == record.kind)
            && self.since.map_or(true, |t| record.timestamp >= t)
    }
}

/// Frequency of one message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TopError {
    pub message: String,
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorSummary {
    /// Records currently retained in history.
    pub total_errors: usize,
    pub recent_errors: Vec<ErrorRecord>,
    pub top_errors: Vec<TopError>,
}
