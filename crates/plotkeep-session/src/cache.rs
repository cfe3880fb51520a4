//! The identity cache: memoizes authority answers per live session.
//!
//! Responsibilities:
//! - Registering a session when its connection opens
//! - Resolving identity, display name, operator status and permissions at
//!   most once per session
//! - Dropping everything a session cached when its connection closes
//! - Keeping exactly one live session per resolved identity
//!
//! # Concurrency
//!
//! There is one registry lock for the whole process, but it only guards
//! map edits and is never held across an authority call. Authority calls
//! run on per-slot compute-once cells, so:
//! - different sessions never wait on each other,
//! - different permission keys of one session never wait on each other,
//! - concurrent callers for the SAME missing slot wait for the single
//!   in-flight query and share its answer (single flight).

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use plotkeep_types::{PermissionKey, PlayerUuid, Privilege, SessionHandle};
use tokio::sync::RwLock;

use crate::session::SessionEntry;
use crate::{
    Authority, AuthorityError, IdentityError, SessionConfig, SessionSnapshot,
};

/// All live sessions, plus an index from resolved identity to session.
///
/// Both maps are edited together under the registry write lock.
#[derive(Default)]
struct Registry {
    sessions: HashMap<SessionHandle, Arc<SessionEntry>>,
    identities: HashMap<PlayerUuid, SessionHandle>,
    /// Number of `connect` calls so far; stamps each new entry.
    connects: u64,
}

impl Registry {
    /// Detaches a session and marks it ended.
    fn remove(&mut self, session: SessionHandle) -> Option<Arc<SessionEntry>> {
        let entry = self.sessions.remove(&session)?;
        entry.mark_ended();

        // Only drop the index entry if it still points at us; a newer
        // session may have taken the identity over already.
        if let Some(identifier) = entry.identifier.get() {
            if self.identities.get(identifier) == Some(&session) {
                self.identities.remove(identifier);
            }
        }
        Some(entry)
    }
}

/// Memoizes identity and permission lookups for every connected player.
///
/// ## Lifecycle
///
/// ```text
/// connect() ──→ resolve_identity() / check_permission() / is_privileged()
///                   │  (first call asks the authority,
///                   │   later calls answer from the cache)
///                   ▼
///               end_session() ──→ everything cached is gone
/// ```
///
/// Share it between event tasks with an `Arc`.
pub struct PlayerIdentityCache<A: Authority> {
    authority: A,
    config: SessionConfig,
    registry: RwLock<Registry>,
}

impl<A: Authority> PlayerIdentityCache<A> {
    /// Creates an empty cache backed by `authority`.
    pub fn new(authority: A, config: SessionConfig) -> Self {
        Self {
            authority,
            config,
            registry: RwLock::new(Registry::default()),
        }
    }

    /// The authority answering cache misses.
    pub fn authority(&self) -> &A {
        &self.authority
    }

    /// The configuration this cache was built with.
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Registers a fresh, empty session for a new connection.
    ///
    /// # Errors
    /// Returns [`IdentityError::AlreadyActive`] if `session` is already
    /// live. A handle that was used before and has ended gets a brand-new
    /// entry, so nothing cached under the old connection carries over.
    pub async fn connect(
        &self,
        session: SessionHandle,
    ) -> Result<(), IdentityError> {
        let mut registry = self.registry.write().await;
        if registry.sessions.contains_key(&session) {
            return Err(IdentityError::AlreadyActive(session));
        }
        registry.connects += 1;
        let entry = SessionEntry::new(session, registry.connects);
        registry.sessions.insert(session, Arc::new(entry));

        tracing::info!(
            %session,
            active = registry.sessions.len(),
            "session opened"
        );
        Ok(())
    }

    /// Returns the player's persistent identifier.
    ///
    /// The first call asks the authority; every later call in the same
    /// session answers from the cache.
    ///
    /// # Errors
    /// - [`IdentityError::IdentityUnavailable`]: the authority doesn't
    ///   know this connection
    /// - [`IdentityError::Authority`]: the authority failed
    /// - [`IdentityError::StaleSession`]: the session is not active
    pub async fn resolve_identity(
        &self,
        session: SessionHandle,
    ) -> Result<PlayerUuid, IdentityError> {
        let entry = self.entry(session).await?;
        self.identity_of(&entry).await
    }

    /// Returns the name the player is displayed under, resolved at most
    /// once per session.
    ///
    /// # Errors
    /// Same as [`resolve_identity`](Self::resolve_identity).
    pub async fn display_name(
        &self,
        session: SessionHandle,
    ) -> Result<String, IdentityError> {
        let entry = self.entry(session).await?;
        let name = entry
            .display_name
            .get_or_try_init(|| async {
                tracing::debug!(%session, "display name miss, asking authority");
                self.ask(session, self.authority.lookup_display_name(session))
                    .await?
                    .ok_or(IdentityError::IdentityUnavailable(session))
            })
            .await?
            .clone();
        self.ensure_live(&entry)?;
        Ok(name)
    }

    /// Decides whether the player holds `key`.
    ///
    /// Both answers are cached: a `false` is remembered just like a
    /// `true`, so a player spamming a forbidden action costs one authority
    /// call per session, not one per click. A permission changed at
    /// runtime is therefore only observed after the player reconnects.
    ///
    /// # Errors
    /// Same as [`resolve_identity`](Self::resolve_identity); the
    /// identifier is resolved first because permissions are granted to
    /// identities, not connections.
    pub async fn check_permission(
        &self,
        session: SessionHandle,
        key: &PermissionKey,
    ) -> Result<bool, IdentityError> {
        let entry = self.entry(session).await?;
        let identifier = self.identity_of(&entry).await?;

        let cell = entry.permission_cell(key).await;
        let allowed = *cell
            .get_or_try_init(|| async {
                tracing::debug!(%session, %key, "permission miss, asking authority");
                self.ask(
                    session,
                    self.authority.query_permission(&identifier, key),
                )
                .await
            })
            .await?;

        self.ensure_live(&entry)?;
        Ok(allowed)
    }

    /// Returns `true` if the player is an operator.
    ///
    /// Resolved once per session, like everything else here.
    ///
    /// # Errors
    /// Same as [`check_permission`](Self::check_permission).
    pub async fn is_privileged(
        &self,
        session: SessionHandle,
    ) -> Result<bool, IdentityError> {
        let entry = self.entry(session).await?;
        let identifier = self.identity_of(&entry).await?;

        let privilege = *entry
            .privilege
            .get_or_try_init(|| async {
                tracing::debug!(%session, "privilege miss, asking authority");
                self.ask(session, self.authority.query_privilege(&identifier))
                    .await
                    .map(Privilege::from)
            })
            .await?;

        self.ensure_live(&entry)?;
        Ok(privilege.is_granted())
    }

    /// Forgets everything cached for `session` and unregisters it.
    ///
    /// Idempotent: ending a session twice, or ending one that was never
    /// connected, is a no-op. Returns `true` if a live session was
    /// removed.
    ///
    /// A lookup still in flight when this runs finishes against the
    /// detached entry; its caller gets [`IdentityError::StaleSession`]
    /// and the late answer is dropped with the entry.
    pub async fn end_session(&self, session: SessionHandle) -> bool {
        let removed = self.registry.write().await.remove(session);

        match removed {
            Some(entry) => {
                let age_ms =
                    u64::try_from(entry.age().as_millis()).unwrap_or(u64::MAX);
                tracing::info!(%session, age_ms, "session ended");
                true
            }
            None => {
                tracing::debug!(%session, "end_session on inactive session ignored");
                false
            }
        }
    }

    /// Finds the live session holding a resolved identifier.
    ///
    /// Only sessions that have called
    /// [`resolve_identity`](Self::resolve_identity) (directly or through a
    /// permission check) are indexed.
    pub async fn session_for(
        &self,
        identifier: &PlayerUuid,
    ) -> Option<SessionHandle> {
        self.registry.read().await.identities.get(identifier).copied()
    }

    /// A point-in-time view of what `session` has cached, or `None` if it
    /// is not active.
    pub async fn snapshot(
        &self,
        session: SessionHandle,
    ) -> Option<SessionSnapshot> {
        let entry = self.registry.read().await.sessions.get(&session).cloned();
        match entry {
            Some(entry) => Some(entry.snapshot().await),
            None => None,
        }
    }

    /// Returns `true` if `session` is connected and not yet ended.
    pub async fn is_active(&self, session: SessionHandle) -> bool {
        self.registry.read().await.sessions.contains_key(&session)
    }

    /// Number of live sessions.
    pub async fn active_sessions(&self) -> usize {
        self.registry.read().await.sessions.len()
    }

    // -- internals --------------------------------------------------------

    async fn entry(
        &self,
        session: SessionHandle,
    ) -> Result<Arc<SessionEntry>, IdentityError> {
        let entry = self.registry.read().await.sessions.get(&session).cloned();
        entry.ok_or_else(|| {
            tracing::warn!(%session, "cache access for inactive session");
            IdentityError::StaleSession(session)
        })
    }

    async fn identity_of(
        &self,
        entry: &Arc<SessionEntry>,
    ) -> Result<PlayerUuid, IdentityError> {
        let session = entry.handle;
        let identifier = *entry
            .identifier
            .get_or_try_init(|| async {
                tracing::debug!(%session, "identity miss, asking authority");
                self.ask(session, self.authority.lookup_identifier(session))
                    .await?
                    .ok_or(IdentityError::IdentityUnavailable(session))
            })
            .await?;

        self.ensure_live(entry)?;
        if !entry.is_bound() {
            self.bind_identity(entry, identifier).await?;
        }
        Ok(identifier)
    }

    /// Indexes `identifier` → session so that only the newest connection
    /// of a player stays live.
    ///
    /// If an older session holds the identity it is ended. If a newer one
    /// does, this session is the leftover of a missed disconnect: it is
    /// ended instead and the caller gets [`IdentityError::StaleSession`].
    async fn bind_identity(
        &self,
        entry: &Arc<SessionEntry>,
        identifier: PlayerUuid,
    ) -> Result<(), IdentityError> {
        let session = entry.handle;
        let mut registry = self.registry.write().await;

        // The session may have ended between resolution and here.
        let live = registry
            .sessions
            .get(&session)
            .is_some_and(|current| Arc::ptr_eq(current, entry));
        if !live {
            return Err(IdentityError::StaleSession(session));
        }

        if let Some(&holder) = registry.identities.get(&identifier) {
            if holder != session {
                let holder_is_newer = registry
                    .sessions
                    .get(&holder)
                    .is_some_and(|current| current.seq > entry.seq);
                if holder_is_newer {
                    tracing::warn!(
                        %identifier,
                        %session,
                        newer = %holder,
                        "identity held by a newer session, ending this one"
                    );
                    registry.remove(session);
                    return Err(IdentityError::StaleSession(session));
                }

                tracing::warn!(
                    %identifier,
                    previous = %holder,
                    %session,
                    "identity already held by an older session, ending it"
                );
                registry.remove(holder);
            }
        }

        registry.identities.insert(identifier, session);
        entry.mark_bound();
        Ok(())
    }

    fn ensure_live(&self, entry: &SessionEntry) -> Result<(), IdentityError> {
        if entry.is_ended() {
            tracing::debug!(
                session = %entry.handle,
                "session ended during lookup, discarding answer"
            );
            return Err(IdentityError::StaleSession(entry.handle));
        }
        Ok(())
    }

    /// Runs one authority query under the configured timeout.
    async fn ask<T>(
        &self,
        session: SessionHandle,
        query: impl Future<Output = Result<T, AuthorityError>>,
    ) -> Result<T, IdentityError> {
        let outcome =
            match tokio::time::timeout(self.config.authority_timeout(), query)
                .await
            {
                Ok(result) => result,
                Err(_) => Err(AuthorityError::Timeout),
            };

        outcome.map_err(|source| {
            tracing::debug!(%session, error = %source, "authority query failed");
            IdentityError::Authority { session, source }
        })
    }
}

// =========================================================================
// Tests
// =========================================================================
