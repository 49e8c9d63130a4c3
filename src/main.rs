//! Demo host for the observability subsystem.
//!
//! Builds the global context from `OBSERVABILITY_CONFIG` (optional TOML file)
//! and the environment, registers a couple of modules, simulates work until
//! Ctrl-C, then tears everything down.

use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use observability_kit::config::{self, ConfigWatcher};
use observability_kit::health::{check_fn, CheckResult, HealthReport};
use observability_kit::{global, Metadata};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

const CONFIG_ENV: &str = "OBSERVABILITY_CONFIG";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config_path = std::env::var_os(CONFIG_ENV).map(PathBuf::from);
    let config = config::load(config_path.as_deref())?;
    let obs = global::initialize(config).await;

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer().with_filter(
                EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| "observability_kit=debug,demo=info".into()),
            ),
        )
        .with(obs.capture_layer())
        .init();

    // Keep the watcher alive for the lifetime of main.
    let _watcher = match &config_path {
        Some(path) => {
            let (watcher, mut updates) = ConfigWatcher::new(path);
            let handle = watcher.run()?;
            let obs = obs.clone();
            tokio::spawn(async move {
                while let Some(config) = updates.recv().await {
                    if obs.apply_config(&config) {
                        tracing::info!(target: "demo", "Runtime config applied");
                    }
                }
            });
            Some(handle)
        }
        None => None,
    };

    let jobs = Arc::new(AtomicU64::new(0));
    let seen = jobs.clone();
    obs.health().register_module(
        "worker",
        check_fn(move || {
            let processed = seen.load(Ordering::Relaxed);
            async move {
                CheckResult::Ok(HealthReport::healthy().with_metric("jobs_processed", processed))
            }
        }),
    );
    obs.health().register_module(
        "upstream",
        check_fn(|| async {
            tokio::time::sleep(Duration::from_millis(20)).await;
            CheckResult::Ok(HealthReport::default().with_message("reachable"))
        }),
    );

    obs.start();
    let log = obs.create_logger("Demo");
    log.info("Demo running, press Ctrl-C to stop", Metadata::new());

    let mut ticker = tokio::time::interval(Duration::from_secs(1));
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let n = jobs.fetch_add(1, Ordering::Relaxed) + 1;
                let result: Result<u64, String> = obs
                    .performance()
                    .measure_async("job", async move {
                        tokio::time::sleep(Duration::from_millis(5 + n % 7)).await;
                        if n % 10 == 0 { Err(format!("job {n} failed")) } else { Ok(n) }
                    })
                    .await;

                match result {
                    Ok(n) => log.debug("Job done", Metadata::new().with("job", n)),
                    Err(e) => tracing::error!(target: "demo", job = n, "{e}"),
                }

                if n % 15 == 0 {
                    let status = obs.health().get_status().await;
                    log.info(
                        "Health snapshot",
                        Metadata::new()
                            .with("overall", serde_json::to_value(status.overall)?)
                            .with("healthy_modules", status.healthy_modules),
                    );
                    let summary = obs.errors().get_error_summary();
                    log.info(
                        "Error snapshot",
                        Metadata::new()
                            .with("total_errors", summary.total_errors)
                            .with("top_errors", serde_json::to_value(&summary.top_errors)?),
                    );
                }
            }
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    log.info("Shutting down", Metadata::new());
    global::teardown().await;
    Ok(())
}
