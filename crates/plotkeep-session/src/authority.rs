//! The authority: the host's system of record for identity and permissions.
//!
//! Plotkeep never decides who a player is or what they may do. The host
//! runtime (and whatever permission plugin it runs) does. The
//! [`Authority`] trait is the narrow contract the cache consumes: four
//! queries, each assumed side-effect-free and safe to repeat.
//!
//! Every query may be slow (a cross-thread hop into the host's main loop,
//! a database lookup, ...), which is the whole reason the cache exists.

use std::future::Future;
use std::sync::Arc;

use plotkeep_types::{PermissionKey, PlayerUuid, SessionHandle};

use crate::AuthorityError;

/// Answers identity and permission questions for connected players.
///
/// # Trait bounds
///
/// - `Send + Sync` → one authority is shared by every event task.
/// - `'static` → it lives as long as the cache that owns it.
///
/// # Example
///
/// ```rust
/// use plotkeep_session::{Authority, AuthorityError};
/// use plotkeep_types::{PermissionKey, PlayerUuid, SessionHandle};
///
/// /// Offline-mode server: identity derived from the handle, every
/// /// player may build, nobody is an operator.
/// struct OfflineAuthority;
///
/// impl Authority for OfflineAuthority {
///     async fn lookup_identifier(
///         &self,
///         session: SessionHandle,
///     ) -> Result<Option<PlayerUuid>, AuthorityError> {
///         Ok(Some(PlayerUuid(uuid::Uuid::from_u128(session.0 as u128))))
///     }
///
///     async fn lookup_display_name(
///         &self,
///         session: SessionHandle,
///     ) -> Result<Option<String>, AuthorityError> {
///         Ok(Some(format!("guest-{}", session.0)))
///     }
///
///     async fn query_permission(
///         &self,
///         _identifier: &PlayerUuid,
///         key: &PermissionKey,
///     ) -> Result<bool, AuthorityError> {
///         Ok(key.as_str().starts_with("plots.build"))
///     }
///
///     async fn query_privilege(
///         &self,
///         _identifier: &PlayerUuid,
///     ) -> Result<bool, AuthorityError> {
///         Ok(false)
///     }
/// }
/// ```
pub trait Authority: Send + Sync + 'static {
    /// Resolves the persistent identifier behind a connection.
    ///
    /// # Returns
    /// - `Ok(Some(id))`: the player's UUID
    /// - `Ok(None)`: the host doesn't know this connection (yet)
    /// - `Err(_)`: the authority itself failed
    fn lookup_identifier(
        &self,
        session: SessionHandle,
    ) -> impl Future<Output = Result<Option<PlayerUuid>, AuthorityError>> + Send;

    /// Resolves the name the player is displayed under.
    fn lookup_display_name(
        &self,
        session: SessionHandle,
    ) -> impl Future<Output = Result<Option<String>, AuthorityError>> + Send;

    /// Decides whether `identifier` holds the permission `key`.
    fn query_permission(
        &self,
        identifier: &PlayerUuid,
        key: &PermissionKey,
    ) -> impl Future<Output = Result<bool, AuthorityError>> + Send;

    /// Decides whether `identifier` is an operator.
    fn query_privilege(
        &self,
        identifier: &PlayerUuid,
    ) -> impl Future<Output = Result<bool, AuthorityError>> + Send;
}

/// Lets the host keep its own handle to the authority it gives the cache.
impl<T: Authority> Authority for Arc<T> {
    fn lookup_identifier(
        &self,
        session: SessionHandle,
    ) -> impl Future<Output = Result<Option<PlayerUuid>, AuthorityError>> + Send
    {
        T::lookup_identifier(self, session)
    }

    fn lookup_display_name(
        &self,
        session: SessionHandle,
    ) -> impl Future<Output = Result<Option<String>, AuthorityError>> + Send
    {
        T::lookup_display_name(self, session)
    }

    fn query_permission(
        &self,
        identifier: &PlayerUuid,
        key: &PermissionKey,
    ) -> impl Future<Output = Result<bool, AuthorityError>> + Send {
        T::query_permission(self, identifier, key)
    }

    fn query_privilege(
        &self,
        identifier: &PlayerUuid,
    ) -> impl Future<Output = Result<bool, AuthorityError>> + Send {
        T::query_privilege(self, identifier)
    }
}
