//! Shutdown coordination for periodic tasks.

use std::future::Future;
use std::sync::Mutex;
use std::time::Duration;

use tokio::sync::broadcast;
use tokio::task::JoinHandle;

/// How long `stop` waits for a task to observe the signal before aborting it.
const STOP_GRACE: Duration = Duration::from_millis(250);

/// Coordinator for graceful shutdown.
///
/// Provides a broadcast channel that all long-running tasks can subscribe to.
pub struct Shutdown {
    /// Broadcast channel sender.
    tx: broadcast::Sender<()>,
}

impl Shutdown {
    /// Create a new shutdown coordinator.
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(1);
        Self { tx }
    }

    /// Subscribe to the shutdown signal.
    pub fn subscribe(&self) -> broadcast::Receiver<()> {
        self.tx.subscribe()
    }

    /// Trigger the shutdown signal.
    pub fn trigger(&self) {
        let _ = self.tx.send(());
    }

    /// Get the number of active subscribers (tasks still running).
    pub fn receiver_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}

struct Running {
    shutdown: Shutdown,
    handles: Vec<(&'static str, JoinHandle<()>)>,
}

/// The set of periodic tasks one component owns.
///
/// Each `spawn` gets its own shutdown receiver. `stop` signals every task,
/// waits briefly, and aborts whatever is still running, so no task survives a
/// stop/start cycle.
#[derive(Default)]
pub struct TaskGroup {
    running: Mutex<Option<Running>>,
}

impl TaskGroup {
    pub fn new() -> Self {
        Self::default()
    }

    /// True while at least one `spawn` happened since the last `stop`.
    pub fn is_running(&self) -> bool {
        self.running.lock().expect("task group mutex poisoned").is_some()
    }

    pub fn len(&self) -> usize {
        self.running
            .lock()
            .expect("task group mutex poisoned")
            .as_ref()
            .map_or(0, |r| r.handles.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Spawn a task on the current runtime. `task` receives the shutdown
    /// receiver it must watch.
    ///
    /// Returns false (and spawns nothing) when called outside a tokio runtime.
    pub fn spawn<F, Fut>(&self, name: &'static str, task: F) -> bool
    where
        F: FnOnce(broadcast::Receiver<()>) -> Fut,
        Fut: Future<Output = ()> + Send + 'static,
    {
        if tokio::runtime::Handle::try_current().is_err() {
            tracing::warn!(task = name, "No async runtime, periodic task not started");
            return false;
        }

        let mut guard = self.running.lock().expect("task group mutex poisoned");
        let running = guard.get_or_insert_with(|| Running {
            shutdown: Shutdown::new(),
            handles: Vec::new(),
        });
        let rx = running.shutdown.subscribe();
        let handle = tokio::spawn(task(rx));
        running.handles.push((name, handle));
        tracing::debug!(task = name, "Periodic task started");
        true
    }

    /// Signal and join every task. Safe to call when nothing runs.
    pub async fn stop(&self) {
        let running = self.running.lock().expect("task group mutex poisoned").take();
        let Some(running) = running else {
            return;
        };

        running.shutdown.trigger();
        for (name, mut handle) in running.handles {
            if tokio::time::timeout(STOP_GRACE, &mut handle).await.is_err() {
                handle.abort();
                tracing::debug!(task = name, "Periodic task aborted");
            } else {
                tracing::debug!(task = name, "Periodic task stopped");
            }
        }
    }

    /// Abort every task without waiting. Used from `Drop` paths.
    pub fn abort_all(&self) {
        if let Some(running) = self.running.lock().expect("task group mutex poisoned").take() {
            for (_, handle) in running.handles {
                handle.abort();
            }
        }
    }
}

impl Drop for TaskGroup {
    fn drop(&mut self) {
        self.abort_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[tokio::test]
    async fn test_stop_ends_every_task() {
        let group = TaskGroup::new();
        let ticks = Arc::new(AtomicUsize::new(0));

        for name in ["a", "b"] {
            let ticks = ticks.clone();
            group.spawn(name, move |mut shutdown| async move {
                let mut ticker = tokio::time::interval(Duration::from_millis(5));
                loop {
                    tokio::select! {
                        _ = ticker.tick() => { ticks.fetch_add(1, Ordering::SeqCst); }
                        _ = shutdown.recv() => break,
                    }
                }
            });
        }
        assert_eq!(group.len(), 2);

        tokio::time::sleep(Duration::from_millis(30)).await;
        group.stop().await;
        assert!(!group.is_running());

        let after_stop = ticks.load(Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(30)).await;
        assert_eq!(ticks.load(Ordering::SeqCst), after_stop);
    }

    #[tokio::test]
    async fn test_unresponsive_task_is_aborted() {
        let group = TaskGroup::new();
        group.spawn("stuck", |_shutdown| async move {
            std::future::pending::<()>().await;
        });
        group.stop().await;
        assert!(group.is_empty());
    }

    #[test]
    fn test_spawn_outside_runtime_is_refused() {
        let group = TaskGroup::new();
        assert!(!group.spawn("orphan", |_shutdown| async {}));
        assert!(!group.is_running());
    }

    #[test]
    fn test_shutdown_subscribers() {
        let shutdown = Shutdown::new();
        let _rx1 = shutdown.subscribe();
        let _rx2 = shutdown.subscribe();
        assert_eq!(shutdown.receiver_count(), 2);
        shutdown.trigger();
    }
}
