//! Tracing subscriber setup.

use tracing_subscriber::EnvFilter;

use crate::{LogConfig, PlotkeepError};

/// Installs a global `tracing-subscriber` fmt subscriber.
///
/// `RUST_LOG` wins over `config.filter` when it is set, so operators can
/// turn up a single module without editing the config file.
///
/// # Errors
/// Returns [`PlotkeepError::Logging`] if the configured filter doesn't
/// parse or a global subscriber is already installed.
pub fn init_tracing(config: &LogConfig) -> Result<(), PlotkeepError> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => configured_filter(&config.filter)?,
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_ansi(config.ansi)
        .try_init()
        .map_err(|e| PlotkeepError::Logging(e.to_string()))
}

fn configured_filter(directives: &str) -> Result<EnvFilter, PlotkeepError> {
    EnvFilter::try_new(directives).map_err(|e| {
        PlotkeepError::Logging(format!("invalid filter {directives:?}: {e}"))
    })
}
