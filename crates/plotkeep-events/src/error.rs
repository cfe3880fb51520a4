//! Error types for the events layer.

/// Errors returned by [`DispatcherHandle`](crate::DispatcherHandle).
#[derive(Debug, thiserror::Error)]
pub enum EventError {
    /// The dispatcher task has stopped (shut down or dropped), so the
    /// event could not be delivered or answered.
    #[error("event dispatcher is unavailable")]
    Unavailable,
}
