//! Core value types shared by the cache and the event adapter.
//!
//! None of these types know about the host runtime. The host hands us a
//! [`SessionHandle`] per connection; everything else is resolved from the
//! authority and cached against that handle.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::TypesError;

// ---------------------------------------------------------------------------
// Identity types
// ---------------------------------------------------------------------------

/// An opaque handle for one host connection.
///
/// The host assigns a fresh handle every time a player connects. Two
/// connections by the same account get two different handles, which is
/// what keeps cached state from one connection out of the next.
///
/// Newtype over `u64` so a handle can't be mixed up with any other number
/// flying around an event handler.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize,
    Deserialize,
)]
#[serde(transparent)]
pub struct SessionHandle(pub u64);

impl fmt::Display for SessionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "S-{}", self.0)
    }
}

/// A player's persistent identifier, as issued by the authority.
///
/// Unlike a [`SessionHandle`], this survives reconnects: the same account
/// always resolves to the same UUID. `#[serde(transparent)]` keeps it a
/// plain UUID string on the wire and in snapshots.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize,
    Deserialize,
)]
#[serde(transparent)]
pub struct PlayerUuid(pub Uuid);

impl fmt::Display for PlayerUuid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.hyphenated())
    }
}

// ---------------------------------------------------------------------------
// Permissions
// ---------------------------------------------------------------------------

/// A permission node, e.g. `plots.admin.build`.
///
/// Construction goes through [`PermissionKey::new`] (or `str::parse`), which
/// rejects empty keys and keys containing whitespace. Deserialization runs
/// the same check via `try_from`.
#[derive(
    Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(try_from = "String", into = "String")]
pub struct PermissionKey(String);

impl PermissionKey {
    /// Validates and wraps a permission node.
    ///
    /// # Errors
    /// Returns [`TypesError::InvalidPermissionKey`] if the key is empty or
    /// contains whitespace.
    pub fn new(key: impl Into<String>) -> Result<Self, TypesError> {
        let key = key.into();
        if key.is_empty() || key.chars().any(char::is_whitespace) {
            return Err(TypesError::InvalidPermissionKey(key));
        }
        Ok(Self(key))
    }

    /// Returns the key as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for PermissionKey {
    type Err = TypesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for PermissionKey {
    type Error = TypesError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<PermissionKey> for String {
    fn from(key: PermissionKey) -> Self {
        key.0
    }
}

impl fmt::Display for PermissionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The resolved operator status of a player.
///
/// Kept separate from named permissions: the host answers "is this player
/// an operator?" through its own query, and plugins often treat it as an
/// override for everything else.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Privilege {
    Granted,
    Denied,
}

impl Privilege {
    /// Returns `true` for [`Privilege::Granted`].
    pub fn is_granted(self) -> bool {
        matches!(self, Self::Granted)
    }
}

impl From<bool> for Privilege {
    fn from(granted: bool) -> Self {
        if granted { Self::Granted } else { Self::Denied }
    }
}

// ---------------------------------------------------------------------------
// Slot: resolve-once state of a memoized field
// ---------------------------------------------------------------------------

/// The state of one memoized field.
///
/// Every cached field starts `Unresolved` and moves to `Resolved` at most
/// once per session. There is no way back: a session that has resolved a
/// value keeps it until the session ends.
///
/// ```text
///   Unresolved ──(authority answers)──→ Resolved(value)
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "state", content = "value")]
pub enum Slot<T> {
    #[default]
    Unresolved,
    Resolved(T),
}

impl<T> Slot<T> {
    /// Returns `true` if the field has been resolved.
    pub fn is_resolved(&self) -> bool {
        matches!(self, Self::Resolved(_))
    }

    /// Returns the resolved value, if any.
    pub fn as_resolved(&self) -> Option<&T> {
        match self {
            Self::Resolved(value) => Some(value),
            Self::Unresolved => None,
        }
    }
}

impl<T> From<Option<T>> for Slot<T> {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Unresolved, Self::Resolved)
    }
}

// =========================================================================
// Tests
// =========================================================================
