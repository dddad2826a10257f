//! Tracing subscriber setup.

use ddrail_types::constants::{ENGINE_NAME, VERSION};
use ddrail_types::{LogFormat, LoggingConfig, RailError, Result};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Install the global tracing subscriber.
///
/// `RUST_LOG` overrides `config.filter` when set.
///
/// # Errors
/// Returns `Configuration` if the filter does not parse or a subscriber is
/// already installed.
pub fn init_tracing(config: &LoggingConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.filter))
        .map_err(|e| RailError::Configuration(format!("bad log filter: {e}")))?;

    let registry = tracing_subscriber::registry().with(filter);
    let installed = match config.format {
        LogFormat::Pretty => registry.with(fmt::layer()).try_init(),
        LogFormat::Json => registry.with(fmt::layer().json()).try_init(),
    };
    installed.map_err(|e| RailError::Configuration(format!("tracing already initialized: {e}")))?;
    tracing::info!(engine = ENGINE_NAME, version = VERSION, format = ?config.format, "tracing initialized");
    Ok(())
}
