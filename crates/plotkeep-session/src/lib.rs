//! Per-session identity and permission caching for Plotkeep.
//!
//! Every build action and menu click in a plot plugin asks the same
//! questions: who is this player, may they do this, are they an operator?
//! The host's permission system answers them at real cost. This crate
//! answers them once per connection and remembers the answer:
//!
//! 1. **Authority**: where answers come from ([`Authority`] trait)
//! 2. **Caching**: remembering them per connection ([`PlayerIdentityCache`])
//! 3. **Invalidation**: forgetting everything when the player leaves
//!    ([`PlayerIdentityCache::end_session`])
//!
//! # How it fits in the stack
//!
//! ```text
//! Events layer (above)  ← turns host notifications into cache calls
//!     ↕
//! Session layer (this crate)  ← memoizes identity and permission lookups
//!     ↕
//! Types layer (below)  ← SessionHandle, PlayerUuid, PermissionKey
//! ```

#![allow(async_fn_in_trait)]

mod authority;
mod cache;
mod error;
mod memory;
mod session;

pub use authority::Authority;
pub use cache::PlayerIdentityCache;
pub use error::{AuthorityError, IdentityError};
pub use memory::{AuthorityCalls, MemoryAuthority};
pub use session::{SessionConfig, SessionSnapshot};
