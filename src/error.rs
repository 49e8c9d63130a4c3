//! Crate-level error type.

use thiserror::Error;

use crate::config::ConfigError;
use crate::health::RegistryError;
use crate::performance::MonitorError;

/// Any fallible setup operation of the subsystem.
///
/// Emission paths (logging, recording, tracking) never fail and do not use
/// this type.
#[derive(Debug, Error)]
pub enum ObservabilityError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Monitor(#[from] MonitorError),
}

pub type Result<T, E = ObservabilityError> = std::result::Result<T, E>;
