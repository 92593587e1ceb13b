//! Time-aware get-or-compute cache
//!
//! Entries are stored as JSON under `<prefix>:<key>` with an expiry that is
//! either a flat number of seconds or the time left until a wall-clock
//! time-of-day in the service timezone.
//!
//! Concurrent misses on the same key are serialized: the first caller runs
//! the producer, later callers wait for it and then read the stored entry.
//!
//! # Example
//!
//! ```rust,ignore
//! use lagoon::cache::{Cache, CacheConfig, TtlSpec};
//!
//! let cache = Cache::from_config(&CacheConfig::default(), time).await?;
//! let tides = cache
//!     .get_or_set("tides", || scraper.fetch_tides(), TtlSpec::daily())
//!     .await?;
//! ```

pub mod store;

use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

use crate::error::Result;
use crate::time::{validate_time_of_day, TimeService};

pub use store::{CacheStore, MemoryStore, RedisStore};

/// How long a freshly computed entry lives
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TtlSpec {
    /// Literal number of seconds
    Fixed(u64),

    /// Until the next occurrence of this time-of-day
    Dynamic {
        hour: u32,
        #[serde(default)]
        minute: u32,
        #[serde(default)]
        second: u32,
    },
}

impl TtlSpec {
    pub fn at(hour: u32, minute: u32, second: u32) -> Self {
        Self::Dynamic {
            hour,
            minute,
            second,
        }
    }

    /// Until next midnight
    pub fn daily() -> Self {
        Self::at(24, 0, 0)
    }

    /// Reject a time of day that can never be reached
    pub fn validate(&self) -> Result<()> {
        match *self {
            Self::Fixed(_) => Ok(()),
            Self::Dynamic {
                hour,
                minute,
                second,
            } => validate_time_of_day(hour, minute, second),
        }
    }

    /// Seconds from now, as seen by `time`
    pub fn resolve(&self, time: &TimeService) -> Result<u64> {
        match *self {
            Self::Fixed(secs) => Ok(secs),
            Self::Dynamic {
                hour,
                minute,
                second,
            } => time.dynamic_ttl(hour, minute, second),
        }
    }
}

/// Cache configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Redis URL; the in-process store is used when absent
    pub url: Option<String>,

    /// Connection pool size
    pub pool_size: usize,

    /// Key prefix for namespacing
    pub key_prefix: String,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            url: None,
            pool_size: 10,
            key_prefix: "lagoon".to_string(),
        }
    }
}

/// Cache statistics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Lookups answered from the store
    pub hits: u64,
    /// Lookups that ran the producer
    pub misses: u64,
}

impl CacheStats {
    /// Calculate hit rate
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

type FlightMap = Mutex<HashMap<String, Arc<AsyncMutex<()>>>>;

/// Get-or-compute cache over a [`CacheStore`]
pub struct Cache {
    store: Arc<dyn CacheStore>,
    time: Arc<TimeService>,
    key_prefix: String,
    in_flight: FlightMap,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl Cache {
    pub fn new(store: Arc<dyn CacheStore>, time: Arc<TimeService>, key_prefix: &str) -> Self {
        Self {
            store,
            time,
            key_prefix: key_prefix.to_string(),
            in_flight: Mutex::new(HashMap::new()),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// Cache over an in-process store
    pub fn in_memory(time: Arc<TimeService>, key_prefix: &str) -> Self {
        Self::new(Arc::new(MemoryStore::new()), time, key_prefix)
    }

    /// Redis when a URL is configured, in-process otherwise
    pub async fn from_config(config: &CacheConfig, time: Arc<TimeService>) -> Result<Self> {
        match &config.url {
            Some(url) => {
                let store = RedisStore::connect(url, config.pool_size).await?;
                Ok(Self::new(Arc::new(store), time, &config.key_prefix))
            }
            None => {
                tracing::info!("No Redis URL configured, using in-process cache");
                Ok(Self::in_memory(time, &config.key_prefix))
            }
        }
    }

    fn namespaced(&self, key: &str) -> String {
        format!("{}:{}", self.key_prefix, key)
    }

    /// Return the stored value for `key`, or run `producer` and store its result
    ///
    /// The producer's error is returned as is and nothing is written. A
    /// resolved TTL of zero returns the fresh value without storing it. An
    /// invalid `ttl` fails before the producer runs.
    pub async fn get_or_set<T, F, Fut>(&self, key: &str, producer: F, ttl: TtlSpec) -> Result<T>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        ttl.validate()?;
        let full_key = self.namespaced(key);

        if let Some(value) = self.lookup(&full_key).await? {
            self.hits.fetch_add(1, Ordering::Relaxed);
            tracing::debug!(key = %full_key, "Cache hit");
            return Ok(value);
        }

        let _flight = self.join_flight(&full_key).await;

        // Filled by the caller we waited on
        if let Some(value) = self.lookup(&full_key).await? {
            self.hits.fetch_add(1, Ordering::Relaxed);
            tracing::debug!(key = %full_key, "Cache hit after in-flight computation");
            return Ok(value);
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(key = %full_key, "Cache miss");

        let value = producer().await?;
        let ttl_secs = ttl.resolve(&self.time)?;

        if ttl_secs == 0 {
            tracing::debug!(key = %full_key, "Zero TTL, value not stored");
            return Ok(value);
        }

        let json = serde_json::to_string(&value)?;
        match self.store.set_raw(&full_key, &json, ttl_secs).await {
            Ok(()) => tracing::debug!(key = %full_key, ttl_secs, "Cached value"),
            Err(e) => tracing::warn!(key = %full_key, error = %e, "Failed to cache value"),
        }

        Ok(value)
    }

    /// Drop the entry for `key`
    pub async fn invalidate(&self, key: &str) -> Result<()> {
        self.store.delete(&self.namespaced(key)).await
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }

    pub fn time(&self) -> &TimeService {
        &self.time
    }

    async fn lookup<T: DeserializeOwned>(&self, full_key: &str) -> Result<Option<T>> {
        let Some(raw) = self.store.get_raw(full_key).await? else {
            return Ok(None);
        };

        match serde_json::from_str(&raw) {
            Ok(value) => Ok(Some(value)),
            Err(e) => {
                tracing::warn!(key = %full_key, error = %e, "Discarding undecodable cache entry");
                Ok(None)
            }
        }
    }

    async fn join_flight(&self, full_key: &str) -> FlightGuard<'_> {
        let lock = {
            let mut in_flight = self.in_flight.lock().unwrap_or_else(|e| e.into_inner());
            Arc::clone(in_flight.entry(full_key.to_string()).or_default())
        };

        let guard = Arc::clone(&lock).lock_owned().await;
        FlightGuard {
            map: &self.in_flight,
            key: full_key.to_string(),
            lock,
            guard: Some(guard),
        }
    }
}

/// Holds the per-key lock; forgets the key once nobody else is waiting on it
struct FlightGuard<'a> {
    map: &'a FlightMap,
    key: String,
    lock: Arc<AsyncMutex<()>>,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for FlightGuard<'_> {
    fn drop(&mut self) {
        self.guard.take();

        let mut map = self.map.lock().unwrap_or_else(|e| e.into_inner());
        // One reference in the map, one here
        if Arc::strong_count(&self.lock) == 2 {
            map.remove(&self.key);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::time::FixedClock;
    use chrono::{DateTime, Utc};
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    fn time_at(instant: &str) -> Arc<TimeService> {
        let now: DateTime<Utc> = instant.parse().unwrap();
        Arc::new(TimeService::with_clock(
            chrono_tz::Europe::Rome,
            Arc::new(FixedClock::new(now)),
        ))
    }

    #[test]
    fn test_ttl_spec_from_json() {
        let fixed: TtlSpec = serde_json::from_str("600").unwrap();
        assert_eq!(fixed, TtlSpec::Fixed(600));

        let dynamic: TtlSpec = serde_json::from_str(r#"{"hour": 24}"#).unwrap();
        assert_eq!(dynamic, TtlSpec::daily());

        let full: TtlSpec = serde_json::from_str(r#"{"hour": 6, "minute": 30, "second": 5}"#).unwrap();
        assert_eq!(full, TtlSpec::at(6, 30, 5));
    }

    #[test]
    fn test_ttl_spec_resolve() {
        // 10:00 in Rome (CEST)
        let time = time_at("2026-07-01T08:00:00Z");
        assert_eq!(TtlSpec::Fixed(42).resolve(&time).unwrap(), 42);
        assert_eq!(TtlSpec::at(12, 0, 0).resolve(&time).unwrap(), 7200);
        assert_eq!(TtlSpec::daily().resolve(&time).unwrap(), 14 * 3600);
    }

    #[test]
    fn test_ttl_spec_validate() {
        assert!(TtlSpec::Fixed(0).validate().is_ok());
        assert!(TtlSpec::daily().validate().is_ok());
        assert!(TtlSpec::at(23, 59, 59).validate().is_ok());
        assert!(matches!(TtlSpec::at(25, 0, 0).validate(), Err(Error::Validation(_))));
        assert!(TtlSpec::at(24, 30, 0).validate().is_err());
    }

    #[tokio::test]
    async fn test_invalid_ttl_fails_before_producer() {
        let cache = Cache::in_memory(time_at("2026-07-01T08:00:00Z"), "test");
        let calls = Arc::new(AtomicUsize::new(0));
        let counted = Arc::clone(&calls);

        let result: Result<String> = cache
            .get_or_set(
                "VeniceAir",
                move || async move {
                    counted.fetch_add(1, Ordering::SeqCst);
                    Ok("scraped".to_string())
                },
                TtlSpec::at(25, 0, 0),
            )
            .await;

        assert!(matches!(result, Err(Error::Validation(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert_eq!(cache.stats().misses, 0);
    }

    #[test]
    fn test_cache_stats_hit_rate() {
        let mut stats = CacheStats::default();
        assert_eq!(stats.hit_rate(), 0.0);

        stats.hits = 75;
        stats.misses = 25;
        assert!((stats.hit_rate() - 0.75).abs() < 0.001);
    }

    #[tokio::test(start_paused = true)]
    async fn test_hit_skips_producer_until_expiry() {
        let cache = Cache::in_memory(time_at("2026-07-01T08:00:00Z"), "test");
        let calls = Arc::new(AtomicUsize::new(0));
        let produce = || {
            let calls = Arc::clone(&calls);
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(vec![1, 2, 3])
            }
        };

        let first: Vec<i32> = cache.get_or_set("k", produce, TtlSpec::Fixed(60)).await.unwrap();
        let second: Vec<i32> = cache.get_or_set("k", produce, TtlSpec::Fixed(60)).await.unwrap();
        assert_eq!(first, second);
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        tokio::time::advance(Duration::from_secs(61)).await;
        let _: Vec<i32> = cache.get_or_set("k", produce, TtlSpec::Fixed(60)).await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);

        assert_eq!(cache.stats(), CacheStats { hits: 1, misses: 2 });
    }

    #[tokio::test]
    async fn test_producer_error_is_not_cached() {
        let cache = Cache::in_memory(time_at("2026-07-01T08:00:00Z"), "test");

        let failed: Result<String> = cache
            .get_or_set("k", || async { Err(Error::validation("boom")) }, TtlSpec::Fixed(60))
            .await;
        assert!(matches!(failed, Err(Error::Validation(_))));

        let value: String = cache
            .get_or_set("k", || async { Ok("fresh".to_string()) }, TtlSpec::Fixed(60))
            .await
            .unwrap();
        assert_eq!(value, "fresh");
        assert!(cache.in_flight.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_zero_ttl_is_not_stored() {
        let store = Arc::new(MemoryStore::new());
        let cache = Cache::new(store.clone(), time_at("2026-07-01T08:00:00Z"), "test");

        let value: u32 = cache
            .get_or_set("k", || async { Ok(7) }, TtlSpec::Fixed(0))
            .await
            .unwrap();
        assert_eq!(value, 7);
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_keys_are_namespaced() {
        let store = Arc::new(MemoryStore::new());
        let cache = Cache::new(store.clone(), time_at("2026-07-01T08:00:00Z"), "lagoon");

        let _: u32 = cache
            .get_or_set("airplanes", || async { Ok(1) }, TtlSpec::Fixed(60))
            .await
            .unwrap();
        assert_eq!(store.get_raw("lagoon:airplanes").await.unwrap().as_deref(), Some("1"));

        cache.invalidate("airplanes").await.unwrap();
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_undecodable_entry_is_recomputed() {
        let store = Arc::new(MemoryStore::new());
        store.set_raw("test:k", "not json", 60).await.unwrap();
        let cache = Cache::new(store, time_at("2026-07-01T08:00:00Z"), "test");

        let value: u32 = cache
            .get_or_set("k", || async { Ok(5) }, TtlSpec::Fixed(60))
            .await
            .unwrap();
        assert_eq!(value, 5);
    }
}
