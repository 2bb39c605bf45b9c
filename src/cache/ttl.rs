//! In-memory key/value cache with per-entry time-to-live.
//!
//! Eviction is read-driven: an expired entry stays in memory until the next
//! `get` touching its key (or an overwrite) removes it. There is no
//! background sweep, so the cache is meant for a small, bounded set of keys.

use std::time::{Duration, Instant};

use dashmap::DashMap;
use tracing::trace;

use super::clock::{Clock, SystemClock};
use crate::metrics;

/// TTL applied when a write does not specify one.
pub const DEFAULT_TTL: Duration = Duration::from_secs(5 * 60);

/// One memoized value.
#[derive(Debug, Clone)]
pub struct CacheEntry<V> {
    /// Opaque key.
    pub key: String,
    /// Stored payload.
    pub value: V,
    /// When the value was written.
    pub stored_at: Instant,
    /// How long the value stays valid.
    pub ttl: Duration,
}

impl<V> CacheEntry<V> {
    /// Instant at which the entry becomes logically absent.
    ///
    /// `None` when the TTL is too large to represent, i.e. never.
    pub fn expires_at(&self) -> Option<Instant> {
        self.stored_at.checked_add(self.ttl)
    }

    /// Whether the entry is expired at `now`.
    pub fn is_expired(&self, now: Instant) -> bool {
        self.expires_at().is_some_and(|deadline| now >= deadline)
    }
}

/// Result of a read-through lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Memoized<V> {
    /// The cached or freshly computed value.
    pub value: V,
    /// True when served from the cache.
    pub hit: bool,
}

/// Concurrent TTL cache.
///
/// Each operation touches a single key and runs under that key's shard
/// lock, so concurrent handlers never observe torn entries.
pub struct TtlCache<V = serde_json::Value, C = SystemClock> {
    entries: DashMap<String, CacheEntry<V>>,
    default_ttl: Duration,
    clock: C,
}

impl<V: Clone> TtlCache<V, SystemClock> {
    /// Create a cache with the five-minute default TTL.
    pub fn new() -> Self {
        Self::with_default_ttl(DEFAULT_TTL)
    }

    /// Create a cache with a custom default TTL.
    pub fn with_default_ttl(default_ttl: Duration) -> Self {
        Self::with_clock(default_ttl, SystemClock)
    }
}

impl<V: Clone> Default for TtlCache<V, SystemClock> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V: Clone, C: Clock> TtlCache<V, C> {
    /// Create a cache driven by the given clock.
    pub fn with_clock(default_ttl: Duration, clock: C) -> Self {
        let default_ttl = if default_ttl.is_zero() {
            DEFAULT_TTL
        } else {
            default_ttl
        };

        Self {
            entries: DashMap::new(),
            default_ttl,
            clock,
        }
    }

    /// TTL used for writes without an explicit one.
    pub fn default_ttl(&self) -> Duration {
        self.default_ttl
    }

    /// Return the value for `key` if present and not expired.
    ///
    /// An expired entry is removed and reported as absent.
    pub fn get(&self, key: &str) -> Option<V> {
        let now = self.clock.now();

        let expired = match self.entries.get(key) {
            Some(entry) if !entry.is_expired(now) => {
                metrics::inc_cache_hits();
                return Some(entry.value.clone());
            }
            Some(_) => true,
            None => false,
        };

        // Re-check under the write lock: a concurrent `set` may have
        // replaced the stale entry since the read above.
        if expired && self.entries.remove_if(key, |_, e| e.is_expired(now)).is_some() {
            trace!(key, "evicted expired cache entry");
            metrics::inc_cache_evictions();
        }

        metrics::inc_cache_misses();
        None
    }

    /// Store `value` under `key`, replacing any existing entry.
    ///
    /// A `None` or zero `ttl` falls back to the default TTL.
    pub fn set(&self, key: impl Into<String>, value: V, ttl: Option<Duration>) {
        let key = key.into();
        let ttl = match ttl {
            Some(ttl) if !ttl.is_zero() => ttl,
            _ => self.default_ttl,
        };

        let entry = CacheEntry {
            key: key.clone(),
            value,
            stored_at: self.clock.now(),
            ttl,
        };
        self.entries.insert(key, entry);
    }

    /// Remove `key` regardless of expiry. Returns whether an entry existed.
    pub fn invalidate(&self, key: &str) -> bool {
        self.entries.remove(key).is_some()
    }

    /// Return the cached value or compute, store and return a fresh one.
    ///
    /// Concurrent misses on the same key may each run `compute`; the last
    /// write wins. A failed computation stores nothing.
    pub fn get_or_try_insert_with<E, F>(
        &self,
        key: &str,
        ttl: Option<Duration>,
        compute: F,
    ) -> Result<Memoized<V>, E>
    where
        F: FnOnce() -> Result<V, E>,
    {
        if let Some(value) = self.get(key) {
            return Ok(Memoized { value, hit: true });
        }

        let value = compute()?;
        self.set(key, value.clone(), ttl);
        Ok(Memoized { value, hit: false })
    }

    /// Number of physically stored entries, including expired ones not yet
    /// touched.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no entries are stored.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<V, C> std::fmt::Debug for TtlCache<V, C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TtlCache")
            .field("entries", &self.entries.len())
            .field("default_ttl", &self.default_ttl)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::ManualClock;
    use std::sync::Arc;

    fn cache_with_clock() -> (TtlCache<String, Arc<ManualClock>>, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new());
        let cache = TtlCache::with_clock(DEFAULT_TTL, Arc::clone(&clock));
        (cache, clock)
    }

    #[test]
    fn set_then_get_returns_value() {
        let (cache, _clock) = cache_with_clock();
        cache.set("k", "v".to_string(), Some(Duration::from_secs(1)));

        assert_eq!(cache.get("k").as_deref(), Some("v"));
    }

    #[test]
    fn missing_key_is_absent() {
        let (cache, _clock) = cache_with_clock();
        assert_eq!(cache.get("nope"), None);
    }

    #[test]
    fn expired_entry_is_evicted_and_stays_absent() {
        let (cache, clock) = cache_with_clock();
        cache.set("k", "v".to_string(), Some(Duration::from_millis(100)));

        clock.advance(Duration::from_millis(100));
        assert_eq!(cache.get("k"), None);
        assert_eq!(cache.len(), 0);
        assert_eq!(cache.get("k"), None);
    }

    #[test]
    fn entry_is_valid_until_deadline() {
        let (cache, clock) = cache_with_clock();
        cache.set("k", "v".to_string(), Some(Duration::from_millis(100)));

        clock.advance(Duration::from_millis(99));
        assert!(cache.get("k").is_some());
    }

    #[test]
    fn expired_entry_lingers_until_touched() {
        let (cache, clock) = cache_with_clock();
        cache.set("a", "1".to_string(), Some(Duration::from_millis(10)));
        cache.set("b", "2".to_string(), Some(Duration::from_millis(10)));

        clock.advance(Duration::from_millis(20));
        assert_eq!(cache.len(), 2);

        cache.get("a");
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn overwrite_replaces_value() {
        let (cache, _clock) = cache_with_clock();
        let ttl = Some(Duration::from_secs(10));
        cache.set("k", "v1".to_string(), ttl);
        cache.set("k", "v2".to_string(), ttl);

        assert_eq!(cache.get("k").as_deref(), Some("v2"));
    }

    #[test]
    fn overwrite_restarts_ttl() {
        let (cache, clock) = cache_with_clock();
        let ttl = Some(Duration::from_millis(100));
        cache.set("k", "v1".to_string(), ttl);

        clock.advance(Duration::from_millis(80));
        cache.set("k", "v2".to_string(), ttl);
        clock.advance(Duration::from_millis(80));

        assert_eq!(cache.get("k").as_deref(), Some("v2"));
    }

    #[test]
    fn zero_or_missing_ttl_uses_default() {
        let (cache, clock) = cache_with_clock();
        cache.set("zero", "a".to_string(), Some(Duration::ZERO));
        cache.set("none", "b".to_string(), None);

        clock.advance(DEFAULT_TTL - Duration::from_millis(1));
        assert!(cache.get("zero").is_some());
        assert!(cache.get("none").is_some());

        clock.advance(Duration::from_millis(1));
        assert!(cache.get("zero").is_none());
        assert!(cache.get("none").is_none());
    }

    #[test]
    fn invalidate_removes_entry() {
        let (cache, _clock) = cache_with_clock();
        cache.set("k", "v".to_string(), None);

        assert!(cache.invalidate("k"));
        assert!(!cache.invalidate("k"));
        assert_eq!(cache.get("k"), None);
    }

    #[test]
    fn read_through_computes_once_until_expiry() {
        let (cache, clock) = cache_with_clock();
        let ttl = Some(Duration::from_secs(1));
        let mut calls = 0;

        let first = cache
            .get_or_try_insert_with("k", ttl, || {
                calls += 1;
                Ok::<_, String>("fresh".to_string())
            })
            .unwrap();
        assert!(!first.hit);

        let second = cache
            .get_or_try_insert_with("k", ttl, || {
                calls += 1;
                Ok::<_, String>("again".to_string())
            })
            .unwrap();
        assert!(second.hit);
        assert_eq!(second.value, "fresh");
        assert_eq!(calls, 1);

        clock.advance(Duration::from_secs(1));
        let third = cache
            .get_or_try_insert_with("k", ttl, || Ok::<_, String>("later".to_string()))
            .unwrap();
        assert!(!third.hit);
        assert_eq!(third.value, "later");
    }

    #[test]
    fn failed_computation_stores_nothing() {
        let (cache, _clock) = cache_with_clock();
        let result = cache.get_or_try_insert_with("k", None, || Err::<String, _>("boom"));

        assert_eq!(result, Err("boom"));
        assert!(cache.is_empty());
    }

    #[test]
    fn concurrent_writers_do_not_lose_keys() {
        let cache: TtlCache<usize> = TtlCache::new();

        std::thread::scope(|scope| {
            for worker in 0..8 {
                let cache = &cache;
                scope.spawn(move || {
                    for i in 0..100 {
                        cache.set(format!("{worker}:{i}"), i, None);
                    }
                });
            }
        });

        assert_eq!(cache.len(), 800);
        assert_eq!(cache.get("7:99"), Some(99));
    }
}
