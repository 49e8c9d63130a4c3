//! Error capture and aggregation.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use crate::config::ErrorTrackingConfig;
use crate::logging::ModuleLogger;
use crate::metadata::Metadata;
use crate::telemetry;
use crate::tracking::record::{ErrorFilter, ErrorRecord, ErrorReport, ErrorSummary, TopError};
use crate::tracking::surfaces::{
    ErrorCaptureLayer, ErrorSurface, EventBridge, EventSurface, PanicSurface,
};

/// Records returned in `ErrorSummary::recent_errors`.
pub const RECENT_ERRORS: usize = 10;
/// Messages returned in `ErrorSummary::top_errors`.
pub const TOP_ERRORS: usize = 5;

#[derive(Debug, Clone, Copy)]
struct MessageCount {
    count: u64,
    first_seen: u64,
}

#[derive(Default)]
struct ErrorState {
    history: VecDeque<ErrorRecord>,
    counts: HashMap<String, MessageCount>,
    next_seq: u64,
}

/// Bounded error history plus per-message frequency counts.
pub struct ErrorTracker {
    config: ErrorTrackingConfig,
    log: ModuleLogger,
    state: Mutex<ErrorState>,
    surfaces: Mutex<Vec<Arc<dyn ErrorSurface>>>,
    installed: Mutex<Vec<Arc<dyn ErrorSurface>>>,
    bridge: Arc<EventBridge>,
    started: AtomicBool,
}

impl ErrorTracker {
    pub fn new(config: ErrorTrackingConfig, log: ModuleLogger) -> Self {
        let bridge = Arc::new(EventBridge::default());

        let mut surfaces: Vec<Arc<dyn ErrorSurface>> = Vec::new();
        if config.capture_panics {
            surfaces.push(Arc::new(PanicSurface::new()));
        }
        if config.capture_events {
            surfaces.push(Arc::new(EventSurface::new(bridge.clone())));
        }

        Self {
            config,
            log,
            state: Mutex::new(ErrorState::default()),
            surfaces: Mutex::new(surfaces),
            installed: Mutex::new(Vec::new()),
            bridge,
            started: AtomicBool::new(false),
        }
    }

    pub fn is_started(&self) -> bool {
        self.started.load(Ordering::SeqCst)
    }

    /// Add a host-specific surface. Takes effect on the next `start`.
    pub fn register_surface(&self, surface: Arc<dyn ErrorSurface>) {
        self.surfaces
            .lock()
            .expect("surface list mutex poisoned")
            .push(surface);
    }

    /// A `tracing` layer that forwards host error events here while the
    /// tracker is started. Compose it into the host subscriber.
    pub fn capture_layer(self: &Arc<Self>) -> ErrorCaptureLayer {
        ErrorCaptureLayer::new(self.bridge.clone(), Arc::downgrade(self))
    }

    /// Install every available surface. No-op when tracking is disabled or
    /// already started.
    pub fn start(self: &Arc<Self>) {
        if !self.config.enabled {
            self.log.info("Error tracking disabled", Metadata::new());
            return;
        }
        if self.started.swap(true, Ordering::SeqCst) {
            return;
        }

        let surfaces = self
            .surfaces
            .lock()
            .expect("surface list mutex poisoned")
            .clone();
        let mut installed = self.installed.lock().expect("installed list mutex poisoned");
        let mut names = Vec::new();
        for surface in surfaces {
            if !surface.is_available() {
                self.log.debug(
                    "Error surface unavailable, skipping",
                    Metadata::new().with("surface", surface.name()),
                );
                continue;
            }
            surface.install(Arc::downgrade(self));
            names.push(surface.name());
            installed.push(surface);
        }

        self.log.info(
            "Error tracking started",
            Metadata::new().with("surfaces", names),
        );
    }

    /// Uninstall every surface installed by `start`.
    pub fn stop(&self) {
        if !self.started.swap(false, Ordering::SeqCst) {
            return;
        }
        let installed: Vec<_> = self
            .installed
            .lock()
            .expect("installed list mutex poisoned")
            .drain(..)
            .collect();
        for surface in installed.iter().rev() {
            surface.uninstall();
        }
        self.log.info("Error tracking stopped", Metadata::new());
    }

    /// Record an error: append to history (evicting the oldest at the cap),
    /// bump its message count and log it.
    pub fn track_error(&self, error: impl Into<ErrorReport>, context: Metadata) -> ErrorRecord {
        let report = error.into();

        let record = {
            let mut state = self.state.lock().expect("error state mutex poisoned");
            let seq = state.next_seq;
            state.next_seq += 1;

            let record = ErrorRecord::from_report(report, context, seq);
            state
                .counts
                .entry(record.message.clone())
                .and_modify(|c| c.count += 1)
                .or_insert(MessageCount {
                    count: 1,
                    first_seen: seq,
                });

            state.history.push_back(record.clone());
            while state.history.len() > self.config.max_errors.max(1) {
                state.history.pop_front();
            }
            record
        };

        // tracker fields win over colliding context keys
        let mut meta = record.context.clone();
        meta.insert("type", record.kind.as_str());
        meta.insert("error_id", record.id.to_string());
        if let Some(stack) = &record.stack {
            meta.insert("stack", stack.as_str());
        }
        self.log.error(format!("Error tracked: {}", record.message), meta);
        telemetry::record_error(record.kind.as_str());

        record
    }

    /// Shorthand for `track_error(ErrorReport::from_error(error), context)`.
    pub fn track_std_error(
        &self,
        error: &(dyn std::error::Error + 'static),
        context: Metadata,
    ) -> ErrorRecord {
        self.track_error(ErrorReport::from_error(error), context)
    }

    /// Records matching every predicate of `filter`, oldest first.
    pub fn get_errors(&self, filter: &ErrorFilter) -> Vec<ErrorRecord> {
        let state = self.state.lock().expect("error state mutex poisoned");
        let mut matched: Vec<ErrorRecord> = state
            .history
            .iter()
            .filter(|r| filter.matches(r))
            .cloned()
            .collect();
        if let Some(limit) = filter.limit {
            let skip = matched.len().saturating_sub(limit);
            matched.drain(..skip);
        }
        matched
    }

    /// Retained count, the latest records and the most frequent messages
    /// (ties go to the message seen first).
    pub fn get_error_summary(&self) -> ErrorSummary {
        let state = self.state.lock().expect("error state mutex poisoned");

        let skip = state.history.len().saturating_sub(RECENT_ERRORS);
        let recent_errors = state.history.iter().skip(skip).cloned().collect();

        let mut ranked: Vec<(&String, &MessageCount)> = state.counts.iter().collect();
        ranked.sort_by(|a, b| {
            b.1.count
                .cmp(&a.1.count)
                .then(a.1.first_seen.cmp(&b.1.first_seen))
        });
        let top_errors = ranked
            .into_iter()
            .take(TOP_ERRORS)
            .map(|(message, c)| TopError {
                message: message.clone(),
                count: c.count,
            })
            .collect();

        ErrorSummary {
            total_errors: state.history.len(),
            recent_errors,
            top_errors,
        }
    }

    /// How many times `message` was tracked since the last clear.
    pub fn error_count(&self, message: &str) -> u64 {
        self.state
            .lock()
            .expect("error state mutex poisoned")
            .counts
            .get(message)
            .map_or(0, |c| c.count)
    }

    pub fn error_counts(&self) -> HashMap<String, u64> {
        self.state
            .lock()
            .expect("error state mutex poisoned")
            .counts
            .iter()
            .map(|(k, c)| (k.clone(), c.count))
            .collect()
    }

    /// Reset history and counts.
    pub fn clear_errors(&self) {
        let mut state = self.state.lock().expect("error state mutex poisoned");
        state.history.clear();
        state.counts.clear();
        drop(state);
        self.log.info("Error history cleared", Metadata::new());
    }
}

impl Drop for ErrorTracker {
    fn drop(&mut self) {
        self.stop();
    }
}
