//! Configuration: one JSON document for every layer.
//!
//! ```json
//! {
//!   "session": { "authority_timeout_ms": 2000 },
//!   "dispatcher": { "channel_capacity": 64 },
//!   "log": { "filter": "info,plotkeep_session=debug", "ansi": true }
//! }
//! ```
//!
//! Every section and every field is optional; anything left out takes its
//! default.

use std::path::Path;

use plotkeep_events::DispatcherConfig;
use plotkeep_session::SessionConfig;
use serde::{Deserialize, Serialize};

/// Errors raised while loading or validating a [`PlotkeepConfig`].
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The config file could not be read.
    #[error("config file unreadable: {0}")]
    Io(#[from] std::io::Error),

    /// The file is not valid JSON, or a field has the wrong type.
    #[error("config parse failed: {0}")]
    Parse(#[from] serde_json::Error),

    /// The values parsed but make no sense (e.g. a zero timeout).
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Logging settings, consumed by [`init_tracing`](crate::init_tracing).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// An `EnvFilter` directive string. `RUST_LOG` overrides it when set.
    pub filter: String,

    /// Colored output.
    pub ansi: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            filter: "info".to_string(),
            ansi: true,
        }
    }
}

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlotkeepConfig {
    pub session: SessionConfig,
    pub dispatcher: DispatcherConfig,
    pub log: LogConfig,
}

impl PlotkeepConfig {
    /// Parses and validates a JSON config document.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a JSON config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    /// Rejects values that would make the runtime misbehave.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.session.authority_timeout_ms == 0 {
            return Err(ConfigError::Invalid(
                "session.authority_timeout_ms must be greater than 0".into(),
            ));
        }
        if self.dispatcher.channel_capacity == 0 {
            return Err(ConfigError::Invalid(
                "dispatcher.channel_capacity must be greater than 0".into(),
            ));
        }
        Ok(())
    }
}
