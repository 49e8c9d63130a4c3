//! Log destinations.
//!
//! Every destination implements [`LogSink`]. A sink reports failures through
//! its return value; the logger turns them into fallback reports so that
//! callers never see them.

use std::collections::VecDeque;
use std::io::{self, Write};
use std::path::Path;
use std::sync::Mutex;

use colored::Colorize;

use crate::logging::rotation::RotatingFile;
use crate::logging::{LogEntry, LogLevel};

/// A destination for emitted entries.
pub trait LogSink: Send + Sync {
    /// Short name used in fallback reports.
    fn name(&self) -> &'static str;

    fn write(&self, entry: &LogEntry) -> io::Result<()>;

    fn flush(&self) -> io::Result<()> {
        Ok(())
    }
}

/// Human-readable console output. ERROR and WARN go to stderr.
pub struct ConsoleSink {
    colorize: bool,
}

impl ConsoleSink {
    pub fn new(colorize: bool) -> Self {
        Self { colorize }
    }

    fn render(&self, entry: &LogEntry) -> String {
        let line = entry.to_console_line();
        if !self.colorize {
            return line;
        }
        match entry.level {
            LogLevel::Error => line.red().to_string(),
            LogLevel::Warn => line.yellow().to_string(),
            LogLevel::Info => line.normal().to_string(),
            LogLevel::Debug => line.cyan().to_string(),
            LogLevel::Trace => line.dimmed().to_string(),
        }
    }
}

impl LogSink for ConsoleSink {
    fn name(&self) -> &'static str {
        "console"
    }

    fn write(&self, entry: &LogEntry) -> io::Result<()> {
        let line = self.render(entry);
        match entry.level {
            LogLevel::Error | LogLevel::Warn => writeln!(io::stderr().lock(), "{line}"),
            _ => writeln!(io::stdout().lock(), "{line}"),
        }
    }

    fn flush(&self) -> io::Result<()> {
        io::stdout().flush()?;
        io::stderr().flush()
    }
}

/// JSON lines appended to a [`RotatingFile`].
pub struct FileSink {
    file: Mutex<RotatingFile>,
}

impl FileSink {
    pub fn open(
        dir: impl AsRef<Path>,
        name: &str,
        max_size: u64,
        max_files: usize,
    ) -> io::Result<Self> {
        Ok(Self {
            file: Mutex::new(RotatingFile::open(dir, name, max_size, max_files)?),
        })
    }

    pub fn active_path(&self) -> std::path::PathBuf {
        self.file.lock().expect("log file mutex poisoned").active_path()
    }
}

impl LogSink for FileSink {
    fn name(&self) -> &'static str {
        "file"
    }

    fn write(&self, entry: &LogEntry) -> io::Result<()> {
        let line = entry.to_json_line();
        self.file
            .lock()
            .expect("log file mutex poisoned")
            .write_line(&line)
    }

    fn flush(&self) -> io::Result<()> {
        self.file.lock().expect("log file mutex poisoned").flush()
    }
}

/// Bounded buffer of the most recent entries.
pub struct MemorySink {
    entries: Mutex<VecDeque<LogEntry>>,
    capacity: usize,
}

impl MemorySink {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: Mutex::new(VecDeque::with_capacity(capacity.min(1024))),
            capacity,
        }
    }

    /// Snapshot of the buffered entries, oldest first.
    pub fn entries(&self) -> Vec<LogEntry> {
        self.entries
            .lock()
            .expect("memory sink mutex poisoned")
            .iter()
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().expect("memory sink mutex poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.entries.lock().expect("memory sink mutex poisoned").clear();
    }
}

impl LogSink for MemorySink {
    fn name(&self) -> &'static str {
        "memory"
    }

    fn write(&self, entry: &LogEntry) -> io::Result<()> {
        if self.capacity == 0 {
            return Ok(());
        }
        let mut entries = self.entries.lock().expect("memory sink mutex poisoned");
        if entries.len() >= self.capacity {
            entries.pop_front();
        }
        entries.push_back(entry.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::Metadata;

    #[test]
    fn test_memory_sink_evicts_oldest() {
        let sink = MemorySink::new(2);
        for msg in ["a", "b", "c"] {
            sink.write(&LogEntry::new(LogLevel::Info, "t", msg, Metadata::new()))
                .unwrap();
        }
        let messages: Vec<String> = sink.entries().into_iter().map(|e| e.message).collect();
        assert_eq!(messages, vec!["b", "c"]);
    }

    #[test]
    fn test_console_render_plain() {
        let sink = ConsoleSink::new(false);
        let entry = LogEntry::new(LogLevel::Warn, "net", "slow", Metadata::new());
        assert_eq!(sink.render(&entry), entry.to_console_line());
    }
}
