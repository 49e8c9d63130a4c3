//! Frame-rate counting.

/// Counts frames and emits a rate once at least one second has elapsed since
/// the previous emission. Deterministic for a given timestamp sequence.
#[derive(Debug, Clone)]
pub struct FpsCounter {
    frames: u64,
    baseline_ms: Option<f64>,
}

/// Minimum elapsed time between two emissions.
pub const FPS_WINDOW_MS: f64 = 1000.0;

impl FpsCounter {
    pub fn new() -> Self {
        Self {
            frames: 0,
            baseline_ms: None,
        }
    }

    /// Register one frame at `now_ms` (any monotonic millisecond clock).
    ///
    /// The first call only sets the baseline. Returns
    /// `round(frames * 1000 / elapsed)` when the window closes, then resets
    /// the counter and baseline.
    pub fn tick(&mut self, now_ms: f64) -> Option<u32> {
        let Some(baseline) = self.baseline_ms else {
            self.baseline_ms = Some(now_ms);
            return None;
        };

        self.frames += 1;
        let elapsed = now_ms - baseline;
        if elapsed < FPS_WINDOW_MS {
            return None;
        }

        let fps = (self.frames as f64 * 1000.0 / elapsed).round() as u32;
        self.frames = 0;
        self.baseline_ms = Some(now_ms);
        Some(fps)
    }

    pub fn reset(&mut self) {
        self.frames = 0;
        self.baseline_ms = None;
    }
}

impl Default for FpsCounter {
    fn default() -> Self {
        Self::new()
    }
}
