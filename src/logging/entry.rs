//! The structured record produced by the logger.

use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::{Map, Value};

use crate::logging::LogLevel;
use crate::metadata::Metadata;

/// Field names every record carries. Metadata keys with these names are not
/// allowed to shadow them.
pub const STANDARD_FIELDS: [&str; 4] = ["timestamp", "level", "module", "message"];

/// One structured log record. Immutable once emitted.
#[derive(Debug, Clone, PartialEq)]
pub struct LogEntry {
    pub timestamp: DateTime<Utc>,
    pub level: LogLevel,
    pub module: String,
    pub message: String,
    pub metadata: Metadata,
}

impl LogEntry {
    pub fn new(
        level: LogLevel,
        module: impl Into<String>,
        message: impl Into<String>,
        metadata: Metadata,
    ) -> Self {
        Self {
            timestamp: Utc::now(),
            level,
            module: module.into(),
            message: message.into(),
            metadata,
        }
    }

    /// ISO-8601 timestamp with millisecond precision.
    pub fn timestamp_string(&self) -> String {
        self.timestamp.to_rfc3339_opts(SecondsFormat::Millis, true)
    }

    /// Metadata keys that do not collide with the standard fields.
    pub fn extra_fields(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.metadata
            .iter()
            .filter(|(k, _)| !STANDARD_FIELDS.contains(k))
    }

    /// Flattened JSON object: standard fields first, then metadata.
    pub fn to_json(&self) -> Value {
        let mut record = Map::new();
        record.insert("timestamp".into(), Value::String(self.timestamp_string()));
        record.insert("level".into(), Value::String(self.level.as_str().into()));
        record.insert("module".into(), Value::String(self.module.clone()));
        record.insert("message".into(), Value::String(self.message.clone()));
        for (k, v) in self.extra_fields() {
            record.insert(k.to_string(), v.clone());
        }
        Value::Object(record)
    }

    /// One newline-free JSON line for the file destination.
    pub fn to_json_line(&self) -> String {
        self.to_json().to_string()
    }

    /// `[timestamp] [LEVEL] [module] message {extra}` for the console.
    pub fn to_console_line(&self) -> String {
        let mut line = format!(
            "[{}] [{}] [{}] {}",
            self.timestamp_string(),
            self.level,
            self.module,
            self.message
        );
        let extra: Map<String, Value> = self
            .extra_fields()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect();
        if !extra.is_empty() {
            line.push(' ');
            line.push_str(&Value::Object(extra).to_string());
        }
        line
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_line_flattens_metadata() {
        let entry = LogEntry::new(
            LogLevel::Warn,
            "cache",
            "evicted",
            Metadata::new().with("key", "abc").with("size", 3),
        );
        let parsed: Value = serde_json::from_str(&entry.to_json_line()).unwrap();
        assert_eq!(parsed["level"], "WARN");
        assert_eq!(parsed["module"], "cache");
        assert_eq!(parsed["message"], "evicted");
        assert_eq!(parsed["size"], 3);
        assert!(parsed["timestamp"].as_str().unwrap().ends_with('Z'));
    }

    #[test]
    fn test_standard_fields_win() {
        let entry = LogEntry::new(
            LogLevel::Info,
            "m",
            "real",
            Metadata::new().with("message", "fake").with("level", "TRACE"),
        );
        let parsed = entry.to_json();
        assert_eq!(parsed["message"], "real");
        assert_eq!(parsed["level"], "INFO");
        assert!(!entry.to_console_line().contains("fake"));
    }

    #[test]
    fn test_console_line_format() {
        let entry = LogEntry::new(LogLevel::Error, "db", "down", Metadata::new());
        let line = entry.to_console_line();
        assert!(line.ends_with("[ERROR] [db] down"));
        assert!(line.starts_with('['));

        let with_meta = LogEntry::new(LogLevel::Info, "db", "up", Metadata::new().with("ms", 4));
        assert!(with_meta.to_console_line().ends_with(r#"up {"ms":4}"#));
    }
}
