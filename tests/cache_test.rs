//! Integration tests for the get-or-set cache
//!
//! Runs against the in-process store with tokio's paused clock driving
//! expiry and a fixed civil clock driving TTL resolution.

mod common;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use lagoon::cache::{Cache, TtlSpec};
use lagoon::error::{Error, Result};

use common::venice_morning;

async fn slow_value(calls: Arc<AtomicUsize>, value: &str) -> Result<String> {
    calls.fetch_add(1, Ordering::SeqCst);
    tokio::time::sleep(Duration::from_millis(250)).await;
    Ok(value.to_string())
}

/// Concurrent misses on one key run the producer once
#[tokio::test(start_paused = true)]
async fn test_concurrent_callers_share_one_computation() {
    let (time, _) = venice_morning();
    let cache = Cache::in_memory(time, "lagoon");
    let calls = Arc::new(AtomicUsize::new(0));

    let callers = (0..8).map(|_| {
        let calls = Arc::clone(&calls);
        cache.get_or_set("airplanes", move || slow_value(calls, "boards"), TtlSpec::Fixed(60))
    });
    let results = join_all(callers).await;

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert!(results.iter().all(|r| r.as_deref().ok() == Some("boards")));

    let stats = cache.stats();
    assert_eq!(stats.misses, 1);
    assert_eq!(stats.hits, 7);
}

/// Different keys do not wait on each other
#[tokio::test(start_paused = true)]
async fn test_distinct_keys_compute_independently() {
    let (time, _) = venice_morning();
    let cache = Cache::in_memory(time, "lagoon");
    let calls = Arc::new(AtomicUsize::new(0));

    let started = tokio::time::Instant::now();
    let (a, b) = tokio::join!(
        cache.get_or_set(
            "VeniceTrainsArrivalTime",
            {
                let calls = Arc::clone(&calls);
                move || slow_value(calls, "arrivals")
            },
            TtlSpec::Fixed(600),
        ),
        cache.get_or_set(
            "VeniceTrainsDepartureTime",
            {
                let calls = Arc::clone(&calls);
                move || slow_value(calls, "departures")
            },
            TtlSpec::Fixed(600),
        ),
    );

    assert_eq!(a.unwrap(), "arrivals");
    assert_eq!(b.unwrap(), "departures");
    assert_eq!(calls.load(Ordering::SeqCst), 2);
    assert!(started.elapsed() < Duration::from_millis(500));
}

async fn train_board(cache: &Cache, calls: &Arc<AtomicUsize>) -> String {
    let calls = Arc::clone(calls);
    cache
        .get_or_set("trains", move || slow_value(calls, "board"), TtlSpec::Fixed(600))
        .await
        .unwrap()
}

/// A fixed TTL holds for exactly its length
#[tokio::test(start_paused = true)]
async fn test_fixed_ttl_expiry() {
    let (time, _) = venice_morning();
    let cache = Cache::in_memory(time, "lagoon");
    let calls = Arc::new(AtomicUsize::new(0));

    train_board(&cache, &calls).await;
    tokio::time::advance(Duration::from_secs(599)).await;
    train_board(&cache, &calls).await;
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    tokio::time::advance(Duration::from_secs(2)).await;
    train_board(&cache, &calls).await;
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

/// A time-of-day TTL expires at that civil time
#[tokio::test(start_paused = true)]
async fn test_dynamic_ttl_expires_at_civil_time() {
    // 10:30 in Venice; noon is 5400 seconds away
    let (time, _) = venice_morning();
    let cache = Cache::in_memory(time, "lagoon");
    let calls = Arc::new(AtomicUsize::new(0));

    let noon = TtlSpec::at(12, 0, 0);
    let get = || {
        let calls = Arc::clone(&calls);
        cache.get_or_set("VeniceAir", move || slow_value(calls, "air"), noon)
    };

    get().await.unwrap();
    // The producer's own 250 ms sleep already ran on the paused clock
    tokio::time::advance(Duration::from_secs(5_000)).await;
    get().await.unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    tokio::time::advance(Duration::from_secs(401)).await;
    get().await.unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

/// A failed producer leaves nothing behind and the next caller retries
#[tokio::test(start_paused = true)]
async fn test_producer_error_is_not_cached() {
    let (time, _) = venice_morning();
    let cache = Cache::in_memory(time, "lagoon");

    let first: Result<String> = cache
        .get_or_set(
            "Tides",
            || async { Err(Error::validation("tide API quota exceeded")) },
            TtlSpec::daily(),
        )
        .await;
    assert!(first.is_err());

    let second = cache
        .get_or_set("Tides", || async { Ok("tides".to_string()) }, TtlSpec::daily())
        .await
        .unwrap();
    assert_eq!(second, "tides");
    assert_eq!(cache.stats().misses, 2);
}

/// Invalidation forces the next read to recompute
#[tokio::test(start_paused = true)]
async fn test_invalidate() {
    let (time, _) = venice_morning();
    let cache = Cache::in_memory(time, "lagoon");
    let calls = Arc::new(AtomicUsize::new(0));

    for _ in 0..2 {
        let calls = Arc::clone(&calls);
        cache
            .get_or_set("Tourism", move || slow_value(calls, "rows"), TtlSpec::daily())
            .await
            .unwrap();
    }
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    cache.invalidate("Tourism").await.unwrap();

    let calls_again = Arc::clone(&calls);
    cache
        .get_or_set("Tourism", move || slow_value(calls_again, "rows"), TtlSpec::daily())
        .await
        .unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}
