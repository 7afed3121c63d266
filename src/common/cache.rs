// src/common/cache.rs

use std::collections::{HashMap, VecDeque};
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use serde::{de::DeserializeOwned, Serialize};

use crate::common::error::AppError;

pub const DEFAULT_TTL: Duration = Duration::from_secs(60);
pub const DEFAULT_MAX_ENTRIES: usize = 100;

// ---
// Clock
// ---

pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

// ---
// Cache
// ---

struct CacheEntry<V> {
    value: V,
    stored_at: Instant,
}

struct CacheState<V> {
    entries: HashMap<String, CacheEntry<V>>,
    // Insertion order, oldest first. Overwrites keep their original slot.
    order: VecDeque<String>,
}

/// Short-lived key/value cache. Expired entries are misses and are dropped when read;
/// inserting a new key at capacity evicts the oldest-inserted key first.
pub struct TtlCache<V> {
    state: Mutex<CacheState<V>>,
    ttl: Duration,
    max_entries: usize,
    clock: Arc<dyn Clock>,
}

impl<V: Clone> TtlCache<V> {
    pub fn new(ttl: Duration, max_entries: usize) -> Self {
        Self::with_clock(ttl, max_entries, Arc::new(SystemClock))
    }

    pub fn with_clock(ttl: Duration, max_entries: usize, clock: Arc<dyn Clock>) -> Self {
        Self {
            state: Mutex::new(CacheState { entries: HashMap::new(), order: VecDeque::new() }),
            ttl,
            max_entries: max_entries.max(1),
            clock,
        }
    }

    pub fn get(&self, key: &str) -> Option<V> {
        let now = self.clock.now();
        let mut state = self.state.lock();

        match state.entries.get(key) {
            Some(entry) if now.saturating_duration_since(entry.stored_at) < self.ttl => {
                return Some(entry.value.clone());
            }
            Some(_) => {}
            None => return None,
        }

        // Expired
        state.entries.remove(key);
        state.order.retain(|k| k != key);
        None
    }

    pub fn insert(&self, key: impl Into<String>, value: V) {
        let key = key.into();
        let stored_at = self.clock.now();
        let mut state = self.state.lock();

        if let Some(entry) = state.entries.get_mut(&key) {
            entry.value = value;
            entry.stored_at = stored_at;
            return;
        }

        while state.entries.len() >= self.max_entries {
            match state.order.pop_front() {
                Some(oldest) => {
                    state.entries.remove(&oldest);
                }
                None => break,
            }
        }

        state.order.push_back(key.clone());
        state.entries.insert(key, CacheEntry { value, stored_at });
    }

    /// Returns the cached value or computes it. Only `Ok` results are stored, so a failed
    /// computation is retried by the next caller. The lock is not held while computing.
    pub async fn get_or_try_insert_with<E, F, Fut>(&self, key: &str, compute: F) -> Result<V, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, E>>,
    {
        if let Some(hit) = self.get(key) {
            tracing::debug!(key, "Cache hit");
            return Ok(hit);
        }
        tracing::debug!(key, "Cache miss");
        let value = compute().await?;
        self.insert(key, value.clone());
        Ok(value)
    }
}

#[cfg(test)]
impl<V: Clone> TtlCache<V> {
    /// Entries currently held, expired ones included until they are read.
    pub fn len(&self) -> usize {
        self.state.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// The process-wide report cache holds JSON, so any serializable report can share it.
pub type ReportCache = TtlCache<serde_json::Value>;

impl TtlCache<serde_json::Value> {
    pub async fn get_or_compute<T, F, Fut>(&self, key: &str, compute: F) -> Result<T, AppError>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, AppError>>,
    {
        let json = self
            .get_or_try_insert_with(key, move || async move {
                let value = compute().await?;
                serde_json::to_value(&value).map_err(|e| AppError::InternalServerError(e.into()))
            })
            .await?;
        serde_json::from_value(json).map_err(|e| AppError::InternalServerError(e.into()))
    }
}

#[cfg(test)]
pub mod testing {
    use super::*;

    /// A clock that only moves when told to.
    pub struct ManualClock {
        base: Instant,
        offset: Mutex<Duration>,
    }

    impl ManualClock {
        pub fn new() -> Arc<Self> {
            Arc::new(Self { base: Instant::now(), offset: Mutex::new(Duration::ZERO) })
        }

        pub fn advance(&self, by: Duration) {
            *self.offset.lock() += by;
        }
    }

    impl Clock for ManualClock {
        fn now(&self) -> Instant {
            self.base + *self.offset.lock()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::ManualClock;
    use super::*;

    fn cache(max: usize) -> (TtlCache<i32>, Arc<ManualClock>) {
        let clock = ManualClock::new();
        (TtlCache::with_clock(Duration::from_secs(60), max, clock.clone()), clock)
    }

    #[test]
    fn hit_within_ttl() {
        let (cache, clock) = cache(10);
        cache.insert("pending-total", 42);
        clock.advance(Duration::from_secs(59));
        assert_eq!(cache.get("pending-total"), Some(42));
    }

    #[test]
    fn miss_after_ttl_and_entry_is_dropped() {
        let (cache, clock) = cache(10);
        cache.insert("pending-total", 42);
        clock.advance(Duration::from_secs(60));
        assert_eq!(cache.get("pending-total"), None);
        assert!(cache.is_empty());
    }

    #[test]
    fn overwrite_refreshes_timestamp() {
        let (cache, clock) = cache(10);
        cache.insert("k", 1);
        clock.advance(Duration::from_secs(50));
        cache.insert("k", 2);
        clock.advance(Duration::from_secs(50));
        assert_eq!(cache.get("k"), Some(2));
    }

    #[test]
    fn evicts_oldest_inserted_not_least_recently_used() {
        let (cache, _clock) = cache(2);
        cache.insert("a", 1);
        cache.insert("b", 2);
        // Reading "a" does not protect it.
        assert_eq!(cache.get("a"), Some(1));
        cache.insert("c", 3);

        assert_eq!(cache.get("a"), None);
        assert_eq!(cache.get("b"), Some(2));
        assert_eq!(cache.get("c"), Some(3));
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn overwrite_keeps_insertion_slot() {
        let (cache, _clock) = cache(2);
        cache.insert("a", 1);
        cache.insert("b", 2);
        cache.insert("a", 10);
        cache.insert("c", 3);

        assert_eq!(cache.get("a"), None);
        assert_eq!(cache.get("b"), Some(2));
    }

    #[tokio::test]
    async fn failed_compute_is_not_cached() {
        let (cache, _clock) = cache(10);

        let first: Result<i32, &str> = cache.get_or_try_insert_with("k", || async { Err("boom") }).await;
        assert!(first.is_err());
        assert!(cache.is_empty());

        let second: Result<i32, &str> = cache.get_or_try_insert_with("k", || async { Ok(7) }).await;
        assert_eq!(second, Ok(7));
        assert_eq!(cache.get("k"), Some(7));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_callers_share_the_cache() {
        let bounded = Arc::new(TtlCache::<usize>::new(DEFAULT_TTL, 8));
        let shared = Arc::new(TtlCache::<usize>::new(DEFAULT_TTL, DEFAULT_MAX_ENTRIES));

        let tasks: Vec<_> = (0..32usize)
            .map(|i| {
                let bounded = bounded.clone();
                let shared = shared.clone();
                tokio::spawn(async move {
                    let own = bounded
                        .get_or_try_insert_with(&format!("report-{}", i), || async move { Ok::<_, ()>(i) })
                        .await;
                    let total = shared
                        .get_or_try_insert_with("pending-total", || async move { Ok::<_, ()>(i) })
                        .await;
                    (i, own, total)
                })
            })
            .collect();

        let mut totals = Vec::new();
        for task in tasks {
            let (i, own, total) = task.await.unwrap();
            assert_eq!(own, Ok(i));
            totals.push(total.unwrap());
        }

        assert_eq!(bounded.len(), 8);
        assert_eq!(shared.len(), 1);
        let stored = shared.get("pending-total").unwrap();
        assert!(totals.contains(&stored));
    }

    #[tokio::test]
    async fn json_cache_round_trips_reports() {
        let clock = ManualClock::new();
        let cache = ReportCache::with_clock(DEFAULT_TTL, DEFAULT_MAX_ENTRIES, clock.clone());

        let first: Vec<String> = cache
            .get_or_compute("warehouses", || async { Ok(vec!["M1".to_string(), "MR".to_string()]) })
            .await
            .unwrap();
        let second: Vec<String> = cache
            .get_or_compute("warehouses", || async { Err(AppError::NotFound("unreachable".into())) })
            .await
            .unwrap();

        assert_eq!(first, second);
    }
}
