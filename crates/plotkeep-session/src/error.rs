//! Error types for the session layer.

use plotkeep_types::SessionHandle;

/// A failure reported by the [`Authority`](crate::Authority) itself.
#[derive(Debug, Clone, thiserror::Error)]
pub enum AuthorityError {
    /// The authority did not answer within
    /// [`SessionConfig::authority_timeout_ms`](crate::SessionConfig).
    #[error("authority did not answer in time")]
    Timeout,

    /// The authority could not be reached or refused the query.
    #[error("authority unavailable: {0}")]
    Unavailable(String),
}

/// Errors returned by [`PlayerIdentityCache`](crate::PlayerIdentityCache).
///
/// Nothing is cached when one of these is returned, so the next call for
/// the same value goes back to the authority.
#[derive(Debug, thiserror::Error)]
pub enum IdentityError {
    /// The authority has no identity (or display name) for this session.
    /// Callers usually treat the session as not-yet-usable and try again
    /// on the next event.
    #[error("identity unavailable for session {0}")]
    IdentityUnavailable(SessionHandle),

    /// The authority failed while answering (timeout, transport, ...).
    #[error("authority query failed for session {session}: {source}")]
    Authority {
        session: SessionHandle,
        source: AuthorityError,
    },

    /// The session has ended, or was never connected.
    ///
    /// The host should never deliver events after a disconnect, so this
    /// points at an integration bug. The cache logs it; the events layer
    /// turns it into a deny.
    #[error("session {0} is not active")]
    StaleSession(SessionHandle),

    /// `connect` was called for a handle that is already live.
    #[error("session {0} is already active")]
    AlreadyActive(SessionHandle),
}

impl IdentityError {
    /// The session the failed operation was about.
    pub fn session(&self) -> SessionHandle {
        match self {
            Self::IdentityUnavailable(session)
            | Self::StaleSession(session)
            | Self::AlreadyActive(session) => *session,
            Self::Authority { session, .. } => *session,
        }
    }

    /// Returns `true` if asking again later may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::IdentityUnavailable(_) | Self::Authority { .. })
    }
}
