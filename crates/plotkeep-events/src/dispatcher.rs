//! Dispatcher actor: the single task that applies host events to the cache.
//!
//! Host threads never touch the cache directly. They send commands through
//! a [`DispatcherHandle`], and the dispatcher applies them in arrival
//! order. Lifecycle events (connect, disconnect) run inline so a
//! disconnect can never overtake the connect before it. Checks run on
//! their own task, so one player's slow authority lookup never holds up
//! anyone else's events.

use std::sync::Arc;

use plotkeep_session::{Authority, PlayerIdentityCache};
use plotkeep_types::{PermissionKey, SessionHandle};
use tokio::sync::{mpsc, oneshot};

use crate::{Check, Decision, DispatcherConfig, EventError};

/// Commands sent to the dispatcher through its channel.
///
/// The `oneshot::Sender` in each variant is the reply channel.
enum HostCommand {
    /// A player's connection opened.
    Connected {
        session: SessionHandle,
        reply: oneshot::Sender<bool>,
    },

    /// A player's connection closed.
    Disconnected {
        session: SessionHandle,
        reply: oneshot::Sender<bool>,
    },

    /// An interaction needs a permission or operator check.
    Interaction {
        session: SessionHandle,
        check: Check,
        reply: oneshot::Sender<Decision>,
    },

    /// Stop the dispatcher.
    Shutdown,
}

/// Handle to a running dispatcher. Used by host event handlers.
///
/// Cheap to clone: it's just an `mpsc::Sender` wrapper.
#[derive(Clone)]
pub struct DispatcherHandle {
    sender: mpsc::Sender<HostCommand>,
}

impl DispatcherHandle {
    /// Reports a new connection.
    ///
    /// Returns `true` if a session was opened, `false` if the handle was
    /// already live (the rejection is logged by the dispatcher).
    pub async fn connected(
        &self,
        session: SessionHandle,
    ) -> Result<bool, EventError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.send(HostCommand::Connected {
            session,
            reply: reply_tx,
        })
        .await?;
        reply_rx.await.map_err(|_| EventError::Unavailable)
    }

    /// Reports a closed connection. Must be called exactly once per
    /// disconnect notification.
    ///
    /// Returns `true` if a live session was ended.
    pub async fn disconnected(
        &self,
        session: SessionHandle,
    ) -> Result<bool, EventError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.send(HostCommand::Disconnected {
            session,
            reply: reply_tx,
        })
        .await?;
        reply_rx.await.map_err(|_| EventError::Unavailable)
    }

    /// Answers a check for an interaction.
    ///
    /// # Errors
    /// Only [`EventError::Unavailable`]. Failures of the check itself are
    /// reported as [`Decision::Deny`].
    pub async fn check(
        &self,
        session: SessionHandle,
        check: Check,
    ) -> Result<Decision, EventError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.send(HostCommand::Interaction {
            session,
            check,
            reply: reply_tx,
        })
        .await?;
        reply_rx.await.map_err(|_| EventError::Unavailable)
    }

    /// Shorthand for `check(session, Check::Permission(key))`.
    pub async fn permission(
        &self,
        session: SessionHandle,
        key: PermissionKey,
    ) -> Result<Decision, EventError> {
        self.check(session, Check::Permission(key)).await
    }

    /// Tells the dispatcher to stop. Events already queued before this
    /// one are still handled.
    pub async fn shutdown(&self) -> Result<(), EventError> {
        self.send(HostCommand::Shutdown).await
    }

    /// Returns `true` once the dispatcher task has stopped.
    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }

    async fn send(&self, command: HostCommand) -> Result<(), EventError> {
        self.sender
            .send(command)
            .await
            .map_err(|_| EventError::Unavailable)
    }
}

/// The dispatcher state. Runs inside a Tokio task.
struct Dispatcher<A: Authority> {
    cache: Arc<PlayerIdentityCache<A>>,
    receiver: mpsc::Receiver<HostCommand>,
}

impl<A: Authority> Dispatcher<A> {
    /// Runs the command loop until shutdown or until every handle is gone.
    async fn run(mut self) {
        tracing::info!("event dispatcher started");

        while let Some(command) = self.receiver.recv().await {
            match command {
                HostCommand::Connected { session, reply } => {
                    let opened = match self.cache.connect(session).await {
                        Ok(()) => true,
                        Err(error) => {
                            tracing::warn!(
                                %session,
                                %error,
                                "connect notification rejected"
                            );
                            false
                        }
                    };
                    let _ = reply.send(opened);
                }
                HostCommand::Disconnected { session, reply } => {
                    let ended = self.cache.end_session(session).await;
                    let _ = reply.send(ended);
                }
                HostCommand::Interaction {
                    session,
                    check,
                    reply,
                } => {
                    let cache = Arc::clone(&self.cache);
                    tokio::spawn(async move {
                        let decision = evaluate(&cache, session, &check).await;
                        let _ = reply.send(decision);
                    });
                }
                HostCommand::Shutdown => {
                    tracing::info!("event dispatcher shutting down");
                    break;
                }
            }
        }

        tracing::info!("event dispatcher stopped");
    }
}

/// Answers one check, turning every failure into a deny.
async fn evaluate<A: Authority>(
    cache: &PlayerIdentityCache<A>,
    session: SessionHandle,
    check: &Check,
) -> Decision {
    let outcome = match check {
        Check::Permission(key) => cache.check_permission(session, key).await,
        Check::Privileged => cache.is_privileged(session).await,
    };

    match outcome {
        Ok(allowed) => Decision::from(allowed),
        Err(error) => {
            tracing::debug!(
                %session,
                %check,
                %error,
                retryable = error.is_retryable(),
                "check failed, denying"
            );
            Decision::Deny
        }
    }
}

/// Spawns a dispatcher task for `cache` and returns its handle.
///
/// Must be called from within a Tokio runtime. The task stops when
/// [`DispatcherHandle::shutdown`] is called or every handle is dropped.
pub fn spawn_dispatcher<A: Authority>(
    cache: Arc<PlayerIdentityCache<A>>,
    config: &DispatcherConfig,
) -> DispatcherHandle {
    // `mpsc::channel` panics on a zero capacity.
    let (sender, receiver) = mpsc::channel(config.channel_capacity.max(1));
    let dispatcher = Dispatcher { cache, receiver };
    tokio::spawn(dispatcher.run());
    DispatcherHandle { sender }
}
