//! What an interaction asks, and what it gets back.

use std::fmt;

use plotkeep_types::PermissionKey;

/// The question an interaction event asks about its player.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Check {
    /// Does the player hold this permission node?
    Permission(PermissionKey),
    /// Is the player an operator?
    Privileged,
}

impl fmt::Display for Check {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Permission(key) => write!(f, "permission {key}"),
            Self::Privileged => write!(f, "privileged"),
        }
    }
}

/// The answer to a [`Check`].
///
/// Anything that goes wrong while answering (unknown player, authority
/// down, session already ended) is a `Deny`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Deny,
}

impl Decision {
    pub fn is_allowed(self) -> bool {
        matches!(self, Self::Allow)
    }
}

impl From<bool> for Decision {
    fn from(allowed: bool) -> Self {
        if allowed { Self::Allow } else { Self::Deny }
    }
}
