//! Session types: the per-connection memo slots and their public views.
//!
//! A session's cached state is four independent slots:
//! - WHO the player is (`identifier`, `display_name`)
//! - WHETHER they are an operator (`privilege`)
//! - WHAT they may do (`permissions`, one slot per permission key)
//!
//! Each slot is a compute-once cell. The first caller to find it empty
//! asks the authority; concurrent callers wait for that answer instead of
//! asking again. A failed answer leaves the cell empty.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use plotkeep_types::{PermissionKey, PlayerUuid, Privilege, SessionHandle, Slot};
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, OnceCell};

// ---------------------------------------------------------------------------
// SessionConfig
// ---------------------------------------------------------------------------

/// Configuration for the identity cache.
///
/// `#[serde(default)]` lets a config file name only the fields it wants
/// to change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// How long (in milliseconds) a single authority query may take before
    /// it is reported as [`AuthorityError::Timeout`](crate::AuthorityError).
    ///
    /// Default: 2000.
    pub authority_timeout_ms: u64,
}

impl SessionConfig {
    /// The authority timeout as a `Duration`.
    pub fn authority_timeout(&self) -> Duration {
        Duration::from_millis(self.authority_timeout_ms)
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            authority_timeout_ms: 2000,
        }
    }
}

// ---------------------------------------------------------------------------
// SessionEntry
// ---------------------------------------------------------------------------

/// The cached state of one live connection.
///
/// Entries are never reused. When a session ends its entry is detached
/// from the registry and marked `ended`; a resolution still in flight can
/// finish writing into it, but nothing will ever read that value.
pub(crate) struct SessionEntry {
    pub(crate) handle: SessionHandle,
    /// Connect order across the whole cache. Higher is newer.
    pub(crate) seq: u64,
    opened_at: Instant,
    ended: AtomicBool,
    /// Set once the identifier has been indexed in the registry.
    bound: AtomicBool,
    pub(crate) identifier: OnceCell<PlayerUuid>,
    pub(crate) display_name: OnceCell<String>,
    pub(crate) privilege: OnceCell<Privilege>,
    /// Grows monotonically: keys are added, never removed.
    permissions: Mutex<HashMap<PermissionKey, Arc<OnceCell<bool>>>>,
}

impl SessionEntry {
    pub(crate) fn new(handle: SessionHandle, seq: u64) -> Self {
        Self {
            handle,
            seq,
            opened_at: Instant::now(),
            ended: AtomicBool::new(false),
            bound: AtomicBool::new(false),
            identifier: OnceCell::new(),
            display_name: OnceCell::new(),
            privilege: OnceCell::new(),
            permissions: Mutex::new(HashMap::new()),
        }
    }

    pub(crate) fn is_ended(&self) -> bool {
        self.ended.load(Ordering::Acquire)
    }

    pub(crate) fn mark_ended(&self) {
        self.ended.store(true, Ordering::Release);
    }

    pub(crate) fn is_bound(&self) -> bool {
        self.bound.load(Ordering::Acquire)
    }

    pub(crate) fn mark_bound(&self) {
        self.bound.store(true, Ordering::Release);
    }

    pub(crate) fn age(&self) -> Duration {
        self.opened_at.elapsed()
    }

    /// Returns the cell for `key`, inserting an empty one on first use.
    ///
    /// The per-session lock is held only long enough to fetch the cell;
    /// the authority call happens on the cell itself, so different keys
    /// resolve in parallel.
    pub(crate) async fn permission_cell(
        &self,
        key: &PermissionKey,
    ) -> Arc<OnceCell<bool>> {
        let mut permissions = self.permissions.lock().await;
        if let Some(cell) = permissions.get(key) {
            return Arc::clone(cell);
        }
        let cell = Arc::new(OnceCell::new());
        permissions.insert(key.clone(), Arc::clone(&cell));
        cell
    }

    pub(crate) async fn snapshot(&self) -> SessionSnapshot {
        // Only resolved cells count; an empty cell left behind by a
        // failed query is not a cached answer.
        let permissions = self
            .permissions
            .lock()
            .await
            .iter()
            .filter_map(|(key, cell)| cell.get().map(|v| (key.clone(), *v)))
            .collect();

        SessionSnapshot {
            session: self.handle,
            identifier: self.identifier.get().copied().into(),
            display_name: self.display_name.get().cloned().into(),
            privilege: self.privilege.get().copied().into(),
            permissions,
            age_ms: u64::try_from(self.age().as_millis()).unwrap_or(u64::MAX),
        }
    }
}

// ---------------------------------------------------------------------------
// SessionSnapshot
// ---------------------------------------------------------------------------

/// A point-in-time view of one session's cache.
///
/// Serializable so hosts can dump it from a debug command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionSnapshot {
    /// Which connection this is.
    pub session: SessionHandle,
    /// The persistent identifier, once resolved.
    pub identifier: Slot<PlayerUuid>,
    /// The display name, once resolved.
    pub display_name: Slot<String>,
    /// Operator status, once resolved.
    pub privilege: Slot<Privilege>,
    /// Every permission answered so far, positive and negative.
    pub permissions: BTreeMap<PermissionKey, bool>,
    /// Milliseconds since the session was opened.
    pub age_ms: u64,
}
