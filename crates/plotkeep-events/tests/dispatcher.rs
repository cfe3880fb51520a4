//! Integration tests for the dispatcher using an in-memory authority.

use std::sync::Arc;
use std::time::Duration;

use futures_util::future::join_all;
use plotkeep_events::{
    Check, Decision, DispatcherConfig, DispatcherHandle, EventError,
    spawn_dispatcher,
};
use plotkeep_session::{MemoryAuthority, PlayerIdentityCache, SessionConfig};
use plotkeep_types::{PermissionKey, PlayerUuid, SessionHandle};
use uuid::Uuid;

// =========================================================================
// Helpers
// =========================================================================

fn sid(n: u64) -> SessionHandle {
    SessionHandle(n)
}

fn uid(n: u128) -> PlayerUuid {
    PlayerUuid(Uuid::from_u128(n))
}

fn key(s: &str) -> PermissionKey {
    s.parse().unwrap()
}

/// Player n sits behind session n. Player 1 may claim plots and is an
/// operator; everyone else has nothing.
fn setup(
    players: u64,
) -> (Arc<PlayerIdentityCache<MemoryAuthority>>, DispatcherHandle) {
    let authority = MemoryAuthority::new();
    for n in 1..=players {
        authority.register(sid(n), uid(n as u128), format!("player{n}"));
    }
    authority.grant(uid(1), key("plots.claim"));
    authority.set_operator(uid(1), true);

    let cache = Arc::new(PlayerIdentityCache::new(
        authority,
        SessionConfig::default(),
    ));
    let handle =
        spawn_dispatcher(Arc::clone(&cache), &DispatcherConfig::default());
    (cache, handle)
}

// =========================================================================
// Lifecycle
// =========================================================================

#[tokio::test]
async fn test_connected_opens_session() {
    let (cache, events) = setup(1);

    assert!(events.connected(sid(1)).await.unwrap());

    assert!(cache.is_active(sid(1)).await);
}

#[tokio::test]
async fn test_connected_twice_is_rejected_not_fatal() {
    let (_cache, events) = setup(1);
    events.connected(sid(1)).await.unwrap();

    assert!(!events.connected(sid(1)).await.unwrap());

    // The dispatcher is still serving.
    assert_eq!(
        events.permission(sid(1), key("plots.claim")).await.unwrap(),
        Decision::Allow
    );
}

#[tokio::test]
async fn test_disconnected_ends_session_once() {
    let (cache, events) = setup(1);
    events.connected(sid(1)).await.unwrap();

    assert!(events.disconnected(sid(1)).await.unwrap());
    assert!(!events.disconnected(sid(1)).await.unwrap());

    assert!(!cache.is_active(sid(1)).await);
}

// =========================================================================
// Checks
// =========================================================================

#[tokio::test]
async fn test_permission_and_privilege_checks() {
    let (cache, events) = setup(2);
    events.connected(sid(1)).await.unwrap();
    events.connected(sid(2)).await.unwrap();

    assert_eq!(
        events.permission(sid(1), key("plots.claim")).await.unwrap(),
        Decision::Allow
    );
    assert_eq!(
        events.permission(sid(2), key("plots.claim")).await.unwrap(),
        Decision::Deny
    );
    assert!(events.check(sid(1), Check::Privileged).await.unwrap().is_allowed());
    assert!(!events.check(sid(2), Check::Privileged).await.unwrap().is_allowed());

    // Repeat checks come from the cache.
    events.permission(sid(2), key("plots.claim")).await.unwrap();
    assert_eq!(cache.authority().calls().permission, 2);
    assert_eq!(cache.authority().calls().privilege, 2);
}

#[tokio::test]
async fn test_check_for_unknown_session_denies() {
    let (_cache, events) = setup(1);

    let decision = events.permission(sid(99), key("plots.claim")).await.unwrap();

    assert_eq!(decision, Decision::Deny);
}

#[tokio::test]
async fn test_check_after_disconnect_denies_and_loop_survives() {
    let (_cache, events) = setup(2);
    events.connected(sid(1)).await.unwrap();
    events.connected(sid(2)).await.unwrap();
    events.disconnected(sid(1)).await.unwrap();

    let stale = events.permission(sid(1), key("plots.claim")).await.unwrap();
    assert_eq!(stale, Decision::Deny);

    // Other sessions are unaffected.
    assert_eq!(
        events.check(sid(2), Check::Privileged).await.unwrap(),
        Decision::Deny
    );
    assert!(events.connected(sid(3)).await.unwrap());
}

#[tokio::test]
async fn test_authority_outage_denies_then_recovers() {
    let (cache, events) = setup(1);
    events.connected(sid(1)).await.unwrap();
    cache.authority().set_offline(true);

    assert_eq!(
        events.permission(sid(1), key("plots.claim")).await.unwrap(),
        Decision::Deny
    );

    cache.authority().set_offline(false);
    assert_eq!(
        events.permission(sid(1), key("plots.claim")).await.unwrap(),
        Decision::Allow
    );
}

#[tokio::test(start_paused = true)]
async fn test_slow_session_does_not_block_others() {
    let (cache, events) = setup(2);
    events.connected(sid(1)).await.unwrap();
    events.connected(sid(2)).await.unwrap();
    // Warm session 2 so its check never reaches the authority.
    events.permission(sid(2), key("plots.claim")).await.unwrap();

    cache.authority().set_latency(Duration::from_secs(1));
    let slow = {
        let events = events.clone();
        tokio::spawn(async move { events.permission(sid(1), key("plots.claim")).await })
    };
    tokio::time::sleep(Duration::from_millis(10)).await;

    let start = tokio::time::Instant::now();
    let fast = events.permission(sid(2), key("plots.claim")).await.unwrap();
    assert_eq!(fast, Decision::Deny);
    assert!(start.elapsed() < Duration::from_millis(500));

    assert_eq!(slow.await.unwrap().unwrap(), Decision::Allow);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_many_concurrent_checks_one_authority_call_per_key() {
    let (cache, events) = setup(1);
    events.connected(sid(1)).await.unwrap();

    let checks = (0..32).map(|i| {
        let events = events.clone();
        async move {
            let check = if i % 2 == 0 {
                Check::Permission(key("plots.claim"))
            } else {
                Check::Permission(key("plots.merge"))
            };
            (i, events.check(sid(1), check).await.unwrap())
        }
    });

    for (i, decision) in join_all(checks).await {
        assert_eq!(decision.is_allowed(), i % 2 == 0);
    }
    assert_eq!(cache.authority().calls().permission, 2);
}

// =========================================================================
// Shutdown
// =========================================================================

#[tokio::test]
async fn test_shutdown_makes_handle_unavailable() {
    let (_cache, events) = setup(1);

    events.shutdown().await.unwrap();
    // Give the dispatcher a turn to drop its receiver.
    while !events.is_closed() {
        tokio::task::yield_now().await;
    }

    let result = events.connected(sid(1)).await;
    assert!(matches!(result, Err(EventError::Unavailable)));
}
