//! Process memory probing.
//!
//! Resident set size is read from `/proc/self/status` on Linux. Other
//! platforms report no data and the monitor records no memory series.

use serde::Serialize;

const BYTES_PER_MB: f64 = 1024.0 * 1024.0;

/// One memory reading.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MemoryUsage {
    /// Resident set size in bytes.
    pub resident_bytes: u64,
    /// Peak resident set size in bytes, when reported.
    pub peak_resident_bytes: Option<u64>,
}

impl MemoryUsage {
    pub fn resident_mb(&self) -> f64 {
        self.resident_bytes as f64 / BYTES_PER_MB
    }
}

/// Read current memory usage, or `None` if the platform offers no source.
pub fn sample_memory() -> Option<MemoryUsage> {
    #[cfg(target_os = "linux")]
    {
        let status = std::fs::read_to_string("/proc/self/status").ok()?;
        parse_proc_status(&status)
    }

    #[cfg(not(target_os = "linux"))]
    {
        None
    }
}

/// Parse `VmRSS` / `VmHWM` lines (values in kB) from a proc status dump.
pub fn parse_proc_status(status: &str) -> Option<MemoryUsage> {
    let field = |name: &str| -> Option<u64> {
        status
            .lines()
            .find(|line| line.starts_with(name))
            .and_then(|line| line[name.len()..].split_whitespace().next())
            .and_then(|kb| kb.parse::<u64>().ok())
            .map(|kb| kb * 1024)
    };

    Some(MemoryUsage {
        resident_bytes: field("VmRSS:")?,
        peak_resident_bytes: field("VmHWM:"),
    })
}
