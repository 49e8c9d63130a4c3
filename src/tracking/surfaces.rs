//! Global error surfaces.
//!
//! A surface is a place where failures escape the code that caused them.
//! Each one is installed only if it is available in the current host, so the
//! tracker works the same in headless services and in UI hosts.

use std::cell::Cell;
use std::fmt::Write as _;
use std::panic;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, Weak};

use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::layer::{Context, Layer};

use crate::metadata::Metadata;
use crate::tracking::record::{ErrorKind, ErrorReport};
use crate::tracking::tracker::ErrorTracker;

/// Events from these targets are never captured, so the tracker cannot feed
/// on its own diagnostics.
const OWN_TARGET_PREFIX: &str = "observability_kit";

/// A capability-gated global error source.
pub trait ErrorSurface: Send + Sync {
    fn name(&self) -> &'static str;

    /// Whether this host offers the surface at all.
    fn is_available(&self) -> bool;

    /// Start forwarding failures to `tracker`.
    fn install(&self, tracker: Weak<ErrorTracker>);

    /// Stop forwarding and restore whatever was there before.
    fn uninstall(&self);
}

type PanicHook = Box<dyn Fn(&panic::PanicHookInfo<'_>) + Sync + Send + 'static>;

thread_local! {
    static IN_PANIC_HOOK: Cell<bool> = const { Cell::new(false) };
}

/// Process-level uncaught failures, through the panic hook.
///
/// The previously installed hook keeps running after the tracker has seen the
/// panic, and is restored on uninstall.
pub struct PanicSurface {
    previous: Mutex<Option<Arc<PanicHook>>>,
}

impl PanicSurface {
    pub fn new() -> Self {
        Self {
            previous: Mutex::new(None),
        }
    }
}

impl Default for PanicSurface {
    fn default() -> Self {
        Self::new()
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "panic with non-string payload".to_string()
    }
}

impl ErrorSurface for PanicSurface {
    fn name(&self) -> &'static str {
        "panic"
    }

    fn is_available(&self) -> bool {
        true
    }

    fn install(&self, tracker: Weak<ErrorTracker>) {
        let mut slot = self.previous.lock().expect("panic surface mutex poisoned");
        if slot.is_some() {
            return;
        }

        let previous: Arc<PanicHook> = Arc::new(panic::take_hook());
        *slot = Some(previous.clone());

        panic::set_hook(Box::new(move |info| {
            let reentered = IN_PANIC_HOOK.with(|flag| flag.replace(true));
            if !reentered {
                if let Some(tracker) = tracker.upgrade() {
                    let mut context = Metadata::new();
                    if let Some(location) = info.location() {
                        context.insert(
                            "location",
                            format!(
                                "{}:{}:{}",
                                location.file(),
                                location.line(),
                                location.column()
                            ),
                        );
                    }
                    if let Some(name) = std::thread::current().name() {
                        context.insert("thread", name);
                    }

                    let backtrace = std::backtrace::Backtrace::capture();
                    let mut report =
                        ErrorReport::new(panic_message(info.payload())).kind(ErrorKind::Panic);
                    if backtrace.status() == std::backtrace::BacktraceStatus::Captured {
                        report = report.stack(backtrace.to_string());
                    }
                    tracker.track_error(report, context);
                }
                IN_PANIC_HOOK.with(|flag| flag.set(false));
            }
            (**previous)(info);
        }));
    }

    /// While the current thread is unwinding the hook cannot be swapped;
    /// ours stays in place and keeps delegating to the previous one.
    fn uninstall(&self) {
        if std::thread::panicking() {
            return;
        }
        let previous = self.previous.lock().expect("panic surface mutex poisoned").take();
        if let Some(previous) = previous {
            let _ = panic::take_hook();
            panic::set_hook(Box::new(move |info| (**previous)(info)));
        }
    }
}

/// Shared switch between the tracker's [`EventSurface`] and the layers it
/// handed out.
#[derive(Debug, Default)]
pub struct EventBridge {
    layers: AtomicU64,
    active: AtomicBool,
}

impl EventBridge {
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }
}

/// Error-level `tracing` events from host code. Available once a
/// [`ErrorCaptureLayer`] exists to receive them.
pub struct EventSurface {
    bridge: Arc<EventBridge>,
}

impl EventSurface {
    pub fn new(bridge: Arc<EventBridge>) -> Self {
        Self { bridge }
    }
}

impl ErrorSurface for EventSurface {
    fn name(&self) -> &'static str {
        "tracing-event"
    }

    fn is_available(&self) -> bool {
        self.bridge.layers.load(Ordering::SeqCst) > 0
    }

    fn install(&self, _tracker: Weak<ErrorTracker>) {
        self.bridge.active.store(true, Ordering::SeqCst);
    }

    fn uninstall(&self) {
        self.bridge.active.store(false, Ordering::SeqCst);
    }
}

/// `tracing_subscriber` layer forwarding ERROR events to the tracker.
pub struct ErrorCaptureLayer {
    bridge: Arc<EventBridge>,
    tracker: Weak<ErrorTracker>,
}

impl ErrorCaptureLayer {
    pub(crate) fn new(bridge: Arc<EventBridge>, tracker: Weak<ErrorTracker>) -> Self {
        bridge.layers.fetch_add(1, Ordering::SeqCst);
        Self { bridge, tracker }
    }
}

impl Drop for ErrorCaptureLayer {
    fn drop(&mut self) {
        self.bridge.layers.fetch_sub(1, Ordering::SeqCst);
    }
}

impl<S> Layer<S> for ErrorCaptureLayer
where
    S: Subscriber,
{
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let metadata = event.metadata();
        if *metadata.level() != Level::ERROR
            || !self.bridge.is_active()
            || metadata.target().starts_with(OWN_TARGET_PREFIX)
        {
            return;
        }
        let Some(tracker) = self.tracker.upgrade() else {
            return;
        };

        let mut visitor = FieldVisitor::default();
        event.record(&mut visitor);

        let mut context = visitor.fields;
        context.insert("target", metadata.target());
        if let (Some(file), Some(line)) = (metadata.file(), metadata.line()) {
            context.insert("location", format!("{file}:{line}"));
        }

        let message = if visitor.message.is_empty() {
            metadata.name().to_string()
        } else {
            visitor.message
        };
        tracker.track_error(ErrorReport::new(message).kind(ErrorKind::Event), context);
    }
}

/// Splits an event into its message and the remaining fields.
#[derive(Default)]
struct FieldVisitor {
    message: String,
    fields: Metadata,
}

impl Visit for FieldVisitor {
    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        let mut rendered = String::new();
        let _ = write!(rendered, "{value:?}");
        if field.name() == "message" {
            self.message = rendered;
        } else {
            self.fields.insert(field.name(), rendered);
        }
    }

    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            self.message = value.to_string();
        } else {
            self.fields.insert(field.name(), value);
        }
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        self.fields.insert(field.name(), value);
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        self.fields.insert(field.name(), value);
    }

    fn record_f64(&mut self, field: &Field, value: f64) {
        self.fields.insert(field.name(), value);
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        self.fields.insert(field.name(), value);
    }
}
