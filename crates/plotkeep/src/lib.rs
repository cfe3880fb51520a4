//! # Plotkeep
//!
//! Cached player identity and permissions for plot-management plugins.
//!
//! A plot plugin asks "who is this, may they build here, are they an
//! operator?" on every block placed and every menu clicked. Plotkeep
//! answers from a per-connection cache and goes to the host's authority
//! only on the first question of each kind.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use plotkeep::prelude::*;
//!
//! # async fn run() -> Result<(), PlotkeepError> {
//! let config = PlotkeepConfig::load("plotkeep.json")?;
//! init_tracing(&config.log)?;
//!
//! let plotkeep = PlotkeepBuilder::new()
//!     .config(config)
//!     .build(MemoryAuthority::new())?;
//!
//! // From the host's event handlers:
//! let events = plotkeep.events();
//! events.connected(SessionHandle(1)).await?;
//! let decision = events
//!     .permission(SessionHandle(1), "plots.claim".parse()?)
//!     .await?;
//! # let _ = decision;
//! # Ok(())
//! # }
//! ```

mod config;
mod error;
mod logging;
mod runtime;

pub use config::{ConfigError, LogConfig, PlotkeepConfig};
pub use error::PlotkeepError;
pub use logging::init_tracing;
pub use runtime::{Plotkeep, PlotkeepBuilder};

/// Everything a host integration usually needs, in one import.
pub mod prelude {
    pub use crate::{
        LogConfig, Plotkeep, PlotkeepBuilder, PlotkeepConfig, PlotkeepError,
        init_tracing,
    };
    pub use plotkeep_events::{Check, Decision, DispatcherHandle};
    pub use plotkeep_session::{
        Authority, AuthorityError, IdentityError, MemoryAuthority,
        PlayerIdentityCache, SessionConfig,
    };
    pub use plotkeep_types::{
        PermissionKey, PlayerUuid, Privilege, SessionHandle, Slot,
    };
}
