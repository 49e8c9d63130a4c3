//! Process-wide container for one [`Observability`] context.
//!
//! Code that cannot be handed a context explicitly reaches the shared one
//! here. At most one context is installed at a time:
//!
//! - [`initialize`] installs a context built from a config, shutting down the
//!   one it replaces
//! - [`handle`] returns the installed context, lazily building one from the
//!   environment when none exists
//! - [`get`] returns the installed context without building one
//! - [`teardown`] shuts down and removes the installed context
//!
//! The container never starts a context; call `start` on what it returns.

use std::sync::{Arc, OnceLock};

use arc_swap::ArcSwapOption;

use crate::config::{self, ObservabilityConfig};
use crate::context::Observability;

fn slot() -> &'static ArcSwapOption<Observability> {
    static SLOT: OnceLock<ArcSwapOption<Observability>> = OnceLock::new();
    SLOT.get_or_init(ArcSwapOption::empty)
}

/// Install a context built from `config`, shutting down any previous one.
pub async fn initialize(config: ObservabilityConfig) -> Arc<Observability> {
    install(Arc::new(Observability::new(config))).await
}

/// Install an already-built context, shutting down any previous one.
pub async fn install(context: Arc<Observability>) -> Arc<Observability> {
    if let Some(previous) = slot().swap(Some(context.clone())) {
        if !Arc::ptr_eq(&previous, &context) {
            previous.shutdown().await;
        }
    }
    context
}

/// The installed context, building a default one on first use.
///
/// The default reads `LOG_LEVEL`, `APP_ENV` and `LOG_DIR`; an invalid
/// environment falls back to built-in defaults.
pub fn handle() -> Arc<Observability> {
    if let Some(current) = slot().load_full() {
        return current;
    }

    let config = config::from_env().unwrap_or_else(|e| {
        tracing::warn!(error = %e, "Invalid observability environment, using defaults");
        ObservabilityConfig::default()
    });
    let fresh = Arc::new(Observability::new(config));

    let previous = slot().compare_and_swap(&None::<Arc<Observability>>, Some(fresh.clone()));
    match &*previous {
        Some(existing) => existing.clone(),
        None => fresh,
    }
}

/// The installed context, if any.
pub fn get() -> Option<Arc<Observability>> {
    slot().load_full()
}

/// Shut down and remove the installed context. Returns whether one existed.
pub async fn teardown() -> bool {
    match slot().swap(None) {
        Some(previous) => {
            previous.shutdown().await;
            true
        }
        None => false,
    }
}
