//! `Plotkeep` builder and runtime handle.
//!
//! Ties the layers together: the host's authority goes into a shared
//! [`PlayerIdentityCache`], and a dispatcher task is spawned in front of
//! it to receive the host's events.

use std::sync::Arc;

use plotkeep_events::{DispatcherConfig, DispatcherHandle, spawn_dispatcher};
use plotkeep_session::{Authority, PlayerIdentityCache, SessionConfig};

use crate::{PlotkeepConfig, PlotkeepError};

/// Builder for configuring and starting Plotkeep.
///
/// # Example
///
/// ```rust,no_run
/// use plotkeep::prelude::*;
///
/// # async fn run() -> Result<(), PlotkeepError> {
/// let plotkeep = PlotkeepBuilder::new()
///     .session_config(SessionConfig { authority_timeout_ms: 500 })
///     .build(MemoryAuthority::new())?;
/// # let _ = plotkeep;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, Default)]
pub struct PlotkeepBuilder {
    config: PlotkeepConfig,
}

impl PlotkeepBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the whole configuration, e.g. one read with
    /// [`PlotkeepConfig::load`].
    pub fn config(mut self, config: PlotkeepConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets the cache configuration.
    pub fn session_config(mut self, config: SessionConfig) -> Self {
        self.config.session = config;
        self
    }

    /// Sets the dispatcher configuration.
    pub fn dispatcher_config(mut self, config: DispatcherConfig) -> Self {
        self.config.dispatcher = config;
        self
    }

    /// Validates the configuration, builds the cache around `authority`
    /// and spawns the dispatcher.
    ///
    /// Must be called from within a Tokio runtime.
    ///
    /// # Errors
    /// [`PlotkeepError::Config`] if the configuration is invalid.
    pub fn build<A: Authority>(
        self,
        authority: A,
    ) -> Result<Plotkeep<A>, PlotkeepError> {
        self.config.validate()?;

        let cache = Arc::new(PlayerIdentityCache::new(
            authority,
            self.config.session.clone(),
        ));
        let events = spawn_dispatcher(Arc::clone(&cache), &self.config.dispatcher);

        tracing::info!(
            authority_timeout_ms = self.config.session.authority_timeout_ms,
            channel_capacity = self.config.dispatcher.channel_capacity,
            "plotkeep started"
        );

        Ok(Plotkeep { cache, events })
    }
}

/// A running Plotkeep instance.
///
/// Host event handlers talk to [`events()`](Self::events). Code that runs
/// on a Tokio task and wants answers without a channel hop can use the
/// [`cache()`](Self::cache) directly.
pub struct Plotkeep<A: Authority> {
    cache: Arc<PlayerIdentityCache<A>>,
    events: DispatcherHandle,
}

impl<A: Authority> Plotkeep<A> {
    pub fn cache(&self) -> &Arc<PlayerIdentityCache<A>> {
        &self.cache
    }

    /// The dispatcher handle. Clone it into each event handler.
    pub fn events(&self) -> &DispatcherHandle {
        &self.events
    }

    /// Stops the dispatcher. Events queued before the call are still
    /// handled; sessions still open are left in the cache.
    pub async fn shutdown(self) -> Result<(), PlotkeepError> {
        self.events.shutdown().await?;
        tracing::info!(
            open_sessions = self.cache.active_sessions().await,
            "plotkeep stopped"
        );
        Ok(())
    }
}
