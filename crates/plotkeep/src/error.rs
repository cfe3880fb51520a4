//! Unified error type for Plotkeep.

use plotkeep_events::EventError;
use plotkeep_session::IdentityError;
use plotkeep_types::TypesError;

use crate::ConfigError;

/// Top-level error that wraps every crate-specific error.
///
/// The `#[from]` attribute on each variant generates the `From` impl, so
/// `?` converts sub-crate errors automatically.
#[derive(Debug, thiserror::Error)]
pub enum PlotkeepError {
    /// An identity cache error (unavailable identity, authority failure).
    #[error(transparent)]
    Identity(#[from] IdentityError),

    /// The event dispatcher is gone.
    #[error(transparent)]
    Events(#[from] EventError),

    /// A malformed value (e.g. a permission key with spaces).
    #[error(transparent)]
    Types(#[from] TypesError),

    /// The configuration could not be read or is invalid.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The tracing subscriber could not be installed.
    #[error("logging setup failed: {0}")]
    Logging(String),
}
