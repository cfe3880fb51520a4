//! Integration tests for `PlayerIdentityCache` under concurrency and
//! authority latency.

use std::sync::Arc;
use std::time::Duration;

use futures_util::future::join_all;
use plotkeep_session::{
    AuthorityError, IdentityError, MemoryAuthority, PlayerIdentityCache,
    SessionConfig,
};
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

/// Builds a shared cache and connects players 1..=n on sessions 1..=n.
async fn shared_cache(
    players: u64,
    config: SessionConfig,
) -> Arc<PlayerIdentityCache<MemoryAuthority>> {
    let authority = MemoryAuthority::new();
    for n in 1..=players {
        authority.register(sid(n), uid(n as u128), format!("player{n}"));
    }
    let cache = Arc::new(PlayerIdentityCache::new(authority, config));
    for n in 1..=players {
        cache.connect(sid(n)).await.unwrap();
    }
    cache
}

// =========================================================================
// Scenario
// =========================================================================

#[tokio::test]
async fn test_denied_permission_cached_then_new_session_requeries() {
    let cache = shared_cache(2, SessionConfig::default()).await;

    // S1 asks for build.place → denied → cached.
    assert!(!cache.check_permission(sid(1), &key("build.place")).await.unwrap());
    let after_first = cache.authority().calls().permission;
    assert!(!cache.check_permission(sid(1), &key("build.place")).await.unwrap());
    assert_eq!(cache.authority().calls().permission, after_first);

    // S1 leaves; S2 (a different player) asks for the same key.
    cache.end_session(sid(1)).await;
    cache.check_permission(sid(2), &key("build.place")).await.unwrap();

    assert_eq!(cache.authority().calls().permission, after_first + 1);
}

// =========================================================================
// Concurrency
// =========================================================================

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_distinct_keys_do_not_interfere() {
    let cache = shared_cache(1, SessionConfig::default()).await;
    cache.authority().grant(uid(1), key("plots.claim"));

    let tasks = (0..40).map(|i| {
        let cache = Arc::clone(&cache);
        tokio::spawn(async move {
            let k = if i % 2 == 0 { "plots.claim" } else { "plots.merge" };
            (k, cache.check_permission(sid(1), &key(k)).await.unwrap())
        })
    });

    for result in join_all(tasks).await {
        let (k, allowed) = result.unwrap();
        assert_eq!(allowed, k == "plots.claim", "wrong answer for {k}");
    }
    assert_eq!(cache.authority().calls().permission, 2);
    assert_eq!(cache.authority().calls().identifier, 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_sessions_are_independent() {
    let cache = shared_cache(8, SessionConfig::default()).await;
    for n in (1..=8).step_by(2) {
        cache.authority().grant(uid(n), key("plots.claim"));
    }

    let tasks = (1..=8u64).map(|n| {
        let cache = Arc::clone(&cache);
        tokio::spawn(async move {
            let allowed =
                cache.check_permission(sid(n), &key("plots.claim")).await.unwrap();
            (n, allowed)
        })
    });

    for result in join_all(tasks).await {
        let (n, allowed) = result.unwrap();
        assert_eq!(allowed, n % 2 == 1, "player {n}");
    }
    assert_eq!(cache.authority().calls().permission, 8);
}

#[tokio::test(start_paused = true)]
async fn test_concurrent_misses_share_one_authority_call() {
    let cache = shared_cache(1, SessionConfig::default()).await;
    cache.authority().set_latency(Duration::from_millis(50));

    let claim = key("plots.claim");
    let checks = (0..10).map(|_| cache.check_permission(sid(1), &claim));
    let privileged = (0..10).map(|_| cache.is_privileged(sid(1)));

    let (checks, privileged) = tokio::join!(join_all(checks), join_all(privileged));

    assert!(checks.into_iter().all(|r| matches!(r, Ok(false))));
    assert!(privileged.into_iter().all(|r| matches!(r, Ok(false))));
    let calls = cache.authority().calls();
    assert_eq!(calls.identifier, 1);
    assert_eq!(calls.permission, 1);
    assert_eq!(calls.privilege, 1);
}

// =========================================================================
// endSession vs. in-flight lookups
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_end_session_discards_in_flight_resolution() {
    let cache = shared_cache(1, SessionConfig::default()).await;
    cache.authority().set_latency(Duration::from_millis(100));

    let in_flight = {
        let cache = Arc::clone(&cache);
        tokio::spawn(async move {
            cache.check_permission(sid(1), &key("plots.claim")).await
        })
    };

    // Let the lookup start, then disconnect while it waits on the authority.
    tokio::time::sleep(Duration::from_millis(10)).await;
    assert!(cache.end_session(sid(1)).await);

    let result = in_flight.await.unwrap();
    assert!(matches!(result, Err(IdentityError::StaleSession(s)) if s == sid(1)));
    assert_eq!(cache.session_for(&uid(1)).await, None);

    // A reconnect on the same handle sees none of the late answer.
    cache.connect(sid(1)).await.unwrap();
    let snapshot = cache.snapshot(sid(1)).await.unwrap();
    assert!(!snapshot.identifier.is_resolved());
    assert!(snapshot.permissions.is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_end_session_discards_in_flight_permission_query() {
    let cache = shared_cache(1, SessionConfig::default()).await;
    cache.authority().grant(uid(1), key("plots.claim"));
    // Identity is already cached; only the permission query will be pending.
    cache.resolve_identity(sid(1)).await.unwrap();
    cache.authority().set_latency(Duration::from_millis(100));

    let in_flight = {
        let cache = Arc::clone(&cache);
        tokio::spawn(async move {
            cache.check_permission(sid(1), &key("plots.claim")).await
        })
    };

    tokio::time::sleep(Duration::from_millis(10)).await;
    assert!(cache.end_session(sid(1)).await);

    let result = in_flight.await.unwrap();
    assert!(matches!(result, Err(IdentityError::StaleSession(s)) if s == sid(1)));
    assert_eq!(cache.authority().calls().permission, 1);

    cache.connect(sid(1)).await.unwrap();
    let snapshot = cache.snapshot(sid(1)).await.unwrap();
    assert!(!snapshot.identifier.is_resolved());
    assert!(snapshot.permissions.is_empty());

    // The reconnect asks again rather than reusing the late answer.
    cache.authority().set_latency(Duration::ZERO);
    assert!(cache.check_permission(sid(1), &key("plots.claim")).await.unwrap());
    assert_eq!(cache.authority().calls().permission, 2);
}

// =========================================================================
// Authority failures
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_slow_authority_times_out_and_nothing_is_cached() {
    let cache = shared_cache(
        1,
        SessionConfig {
            authority_timeout_ms: 100,
        },
    )
    .await;
    cache.authority().set_latency(Duration::from_secs(5));

    let result = cache.resolve_identity(sid(1)).await;
    assert!(matches!(
        result,
        Err(IdentityError::Authority {
            source: AuthorityError::Timeout,
            ..
        })
    ));

    cache.authority().set_latency(Duration::ZERO);
    assert_eq!(cache.resolve_identity(sid(1)).await.unwrap(), uid(1));
    assert_eq!(cache.authority().calls().identifier, 2);
}

#[tokio::test]
async fn test_shared_authority_handle_sees_cache_traffic() {
    // The host keeps its own Arc to the authority it hands the cache.
    let authority = Arc::new(MemoryAuthority::new());
    authority.register(sid(1), uid(1), "alice");
    let cache = PlayerIdentityCache::new(Arc::clone(&authority), SessionConfig::default());
    cache.connect(sid(1)).await.unwrap();

    assert_eq!(cache.display_name(sid(1)).await.unwrap(), "alice");
    assert_eq!(cache.display_name(sid(1)).await.unwrap(), "alice");

    assert_eq!(authority.calls().display_name, 1);
}
