//! Identity and permission types for Plotkeep.
//!
//! Every layer above this crate speaks in these types:
//!
//! - **Handles** ([`SessionHandle`]): which connection an event came from.
//! - **Identity** ([`PlayerUuid`]): who the player is, persistently.
//! - **Permissions** ([`PermissionKey`], [`Privilege`]): what they may do.
//! - **Memo state** ([`Slot`]): whether a cached field has been resolved.
//!
//! ```text
//! Host runtime → Events (DispatcherHandle) → Session (PlayerIdentityCache)
//!                           ↘                 ↙
//!                        Types (this crate)
//! ```

mod error;
mod types;

pub use error::TypesError;
pub use types::{PermissionKey, PlayerUuid, Privilege, SessionHandle, Slot};
