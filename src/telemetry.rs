//! Mirroring into the `metrics` facade.
//!
//! # Responsibilities
//! - Forward recorded samples, module health and error counts to whatever
//!   recorder the host installed (Prometheus exporter, statsd, ...)
//!
//! # Metrics
//! - `<series name>` (histogram): every recorded sample value
//! - `observability_module_health` (gauge): 1=healthy, 0=unhealthy, by module
//! - `observability_errors_total` (counter): tracked errors by kind
//!
//! # Design Decisions
//! - No recorder is installed here; without one every call is a no-op
//! - Metric names are used verbatim so hosts see the names they recorded

/// Record one sample of a named series.
pub fn record_sample(name: &str, value: f64, failed: bool) {
    if failed {
        metrics::histogram!(name.to_string(), "outcome" => "error").record(value);
    } else {
        metrics::histogram!(name.to_string()).record(value);
    }
}

/// Record the latest health of a module.
pub fn record_module_health(module: &str, healthy: bool) {
    metrics::gauge!("observability_module_health", "module" => module.to_string())
        .set(if healthy { 1.0 } else { 0.0 });
}

/// Count one tracked error.
pub fn record_error(kind: &str) {
    metrics::counter!("observability_errors_total", "kind" => kind.to_string()).increment(1);
}
