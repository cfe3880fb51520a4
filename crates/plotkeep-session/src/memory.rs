//! An in-memory authority for development servers and tests.
//!
//! Holds a small player directory (who is behind each connection, which
//! permissions each identity holds, who is an operator) and counts every
//! query it answers, so callers can check how often the cache actually
//! reached the authority. It can also simulate latency and outages.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;

use plotkeep_types::{PermissionKey, PlayerUuid, SessionHandle};

use crate::{Authority, AuthorityError};

/// How many times each query has been answered (or attempted).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AuthorityCalls {
    pub identifier: usize,
    pub display_name: usize,
    pub permission: usize,
    pub privilege: usize,
}

impl AuthorityCalls {
    /// Sum of all query counts.
    pub fn total(&self) -> usize {
        self.identifier + self.display_name + self.permission + self.privilege
    }
}

struct Profile {
    identifier: PlayerUuid,
    name: String,
}

#[derive(Default)]
struct Directory {
    players: HashMap<SessionHandle, Profile>,
    grants: HashMap<PlayerUuid, HashSet<PermissionKey>>,
    operators: HashSet<PlayerUuid>,
}

#[derive(Default)]
struct Counters {
    identifier: AtomicUsize,
    display_name: AtomicUsize,
    permission: AtomicUsize,
    privilege: AtomicUsize,
}

/// A thread-safe, in-process [`Authority`].
///
/// All setters take `&self`, so the directory can be edited while the
/// cache that owns the authority is in use.
#[derive(Default)]
pub struct MemoryAuthority {
    directory: RwLock<Directory>,
    counters: Counters,
    offline: AtomicBool,
    latency_ms: AtomicU64,
}

impl MemoryAuthority {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declares who is behind a connection.
    pub fn register(
        &self,
        session: SessionHandle,
        identifier: PlayerUuid,
        name: impl Into<String>,
    ) {
        self.write().players.insert(
            session,
            Profile {
                identifier,
                name: name.into(),
            },
        );
    }

    pub fn grant(&self, identifier: PlayerUuid, key: PermissionKey) {
        self.write().grants.entry(identifier).or_default().insert(key);
    }

    pub fn revoke(&self, identifier: PlayerUuid, key: &PermissionKey) {
        if let Some(keys) = self.write().grants.get_mut(&identifier) {
            keys.remove(key);
        }
    }

    pub fn set_operator(&self, identifier: PlayerUuid, operator: bool) {
        let mut directory = self.write();
        if operator {
            directory.operators.insert(identifier);
        } else {
            directory.operators.remove(&identifier);
        }
    }

    /// While offline, every query fails with
    /// [`AuthorityError::Unavailable`].
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::Relaxed);
    }

    /// Delays every query by `latency` before answering.
    pub fn set_latency(&self, latency: Duration) {
        let ms = u64::try_from(latency.as_millis()).unwrap_or(u64::MAX);
        self.latency_ms.store(ms, Ordering::Relaxed);
    }

    /// Query counts so far.
    pub fn calls(&self) -> AuthorityCalls {
        AuthorityCalls {
            identifier: self.counters.identifier.load(Ordering::Relaxed),
            display_name: self.counters.display_name.load(Ordering::Relaxed),
            permission: self.counters.permission.load(Ordering::Relaxed),
            privilege: self.counters.privilege.load(Ordering::Relaxed),
        }
    }

    // A panic while holding the lock can't leave the directory half
    // edited (every edit is a single map operation), so poisoning is
    // ignored.
    fn read(&self) -> RwLockReadGuard<'_, Directory> {
        self.directory.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Directory> {
        self.directory.write().unwrap_or_else(PoisonError::into_inner)
    }

    async fn answer(&self, counter: &AtomicUsize) -> Result<(), AuthorityError> {
        counter.fetch_add(1, Ordering::Relaxed);

        let latency = self.latency_ms.load(Ordering::Relaxed);
        if latency > 0 {
            tokio::time::sleep(Duration::from_millis(latency)).await;
        }
        if self.offline.load(Ordering::Relaxed) {
            return Err(AuthorityError::Unavailable(
                "memory authority is offline".into(),
            ));
        }
        Ok(())
    }
}

impl Authority for MemoryAuthority {
    async fn lookup_identifier(
        &self,
        session: SessionHandle,
    ) -> Result<Option<PlayerUuid>, AuthorityError> {
        self.answer(&self.counters.identifier).await?;
        let identifier =
            self.read().players.get(&session).map(|p| p.identifier);
        Ok(identifier)
    }

    async fn lookup_display_name(
        &self,
        session: SessionHandle,
    ) -> Result<Option<String>, AuthorityError> {
        self.answer(&self.counters.display_name).await?;
        let name = self.read().players.get(&session).map(|p| p.name.clone());
        Ok(name)
    }

    async fn query_permission(
        &self,
        identifier: &PlayerUuid,
        key: &PermissionKey,
    ) -> Result<bool, AuthorityError> {
        self.answer(&self.counters.permission).await?;
        let granted = self
            .read()
            .grants
            .get(identifier)
            .is_some_and(|keys| keys.contains(key));
        Ok(granted)
    }

    async fn query_privilege(
        &self,
        identifier: &PlayerUuid,
    ) -> Result<bool, AuthorityError> {
        self.answer(&self.counters.privilege).await?;
        let operator = self.read().operators.contains(identifier);
        Ok(operator)
    }
}
