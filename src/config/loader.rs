//! Configuration loading from disk and the environment.

use std::fs;
use std::path::Path;

use thiserror::Error;

use crate::config::schema::{Environment, ObservabilityConfig};
use crate::config::validation::{validate_config, ValidationError};

/// Environment variable holding the log threshold name.
pub const ENV_LOG_LEVEL: &str = "LOG_LEVEL";
/// Environment variable holding the deployment flag (`production` or other).
pub const ENV_APP_ENV: &str = "APP_ENV";
/// Environment variable overriding the log directory.
pub const ENV_LOG_DIR: &str = "LOG_DIR";

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Load and validate configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<ObservabilityConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    let config: ObservabilityConfig = toml::from_str(&content)?;

    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

/// Defaults overlaid with the process environment.
pub fn from_env() -> Result<ObservabilityConfig, ConfigError> {
    let mut config = ObservabilityConfig::default();
    apply_env(&mut config, |key| std::env::var(key).ok());
    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

/// Optional file, then the process environment on top.
pub fn load(path: Option<&Path>) -> Result<ObservabilityConfig, ConfigError> {
    let mut config = match path {
        Some(path) => load_config(path)?,
        None => ObservabilityConfig::default(),
    };
    apply_env(&mut config, |key| std::env::var(key).ok());
    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

/// Overlay environment values read through `lookup`.
///
/// An unrecognised `LOG_LEVEL` keeps the configured threshold.
pub fn apply_env<F>(config: &mut ObservabilityConfig, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(level) = lookup(ENV_LOG_LEVEL) {
        match level.parse() {
            Ok(level) => config.logging.level = level,
            Err(e) => tracing::warn!(value = %level, error = %e, "Ignoring invalid LOG_LEVEL"),
        }
    }

    if let Some(env) = lookup(ENV_APP_ENV) {
        config.environment = Environment::from_flag(&env);
    }

    if let Some(dir) = lookup(ENV_LOG_DIR) {
        if !dir.trim().is_empty() {
            config.logging.dir = dir;
        }
    }
}
