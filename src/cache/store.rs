//! Cache Store Module
//!
//! Main cache engine combining HashMap storage with LRU tracking and lazy
//! TTL expiration.

use std::collections::HashMap;
use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use crate::cache::{CacheEntry, CacheStats, LruTracker};
use crate::clock::Clock;
use crate::config::CacheConfig;

// == Cache Store ==
/// Bounded key/value store with LRU eviction and read-time TTL expiry.
///
/// Operations never fail: a miss is `None`, and inserting at capacity
/// evicts exactly one least-recently-used entry.
#[derive(Debug)]
pub struct CacheStore<V> {
    /// Key-value storage
    entries: HashMap<String, CacheEntry<V>>,
    /// LRU access tracker
    lru: LruTracker,
    /// Performance statistics
    stats: CacheStats,
    /// Maximum number of resident entries
    max_size: NonZeroUsize,
    /// TTL applied when `set` is called without one
    default_ttl: Duration,
    /// Time source for stamps and expiry checks
    clock: Arc<dyn Clock>,
}

impl<V: Clone> CacheStore<V> {
    // == Constructor ==
    /// Creates a new CacheStore with specified capacity and default TTL.
    pub fn new(max_size: NonZeroUsize, default_ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: HashMap::with_capacity(max_size.get().min(1024)),
            lru: LruTracker::new(),
            stats: CacheStats::new(),
            max_size,
            default_ttl,
            clock,
        }
    }

    /// Creates a store from validated cache configuration.
    pub fn from_config(config: &CacheConfig, clock: Arc<dyn Clock>) -> Self {
        Self::new(config.max_size, config.default_ttl, clock)
    }

    // == Get ==
    /// Retrieves a value by key.
    ///
    /// A hit refreshes the entry's access time and LRU position. An entry
    /// whose TTL has elapsed is removed and reported as a miss.
    pub fn get(&mut self, key: &str) -> Option<V> {
        let now = self.clock.now_ms();

        match self.entries.get(key).map(|entry| entry.is_expired(now)) {
            None => {}
            Some(true) => {
                self.entries.remove(key);
                self.lru.remove(key);
                self.stats.record_expirations(1);
                self.stats.set_total_entries(self.entries.len());
                debug!(key, "Cache entry expired on read");
            }
            Some(false) => {
                if let Some(entry) = self.entries.get_mut(key) {
                    entry.touch(now);
                    let value = entry.value.clone();
                    self.lru.touch(key);
                    self.stats.record_hit();
                    return Some(value);
                }
            }
        }

        self.stats.record_miss();
        None
    }

    // == Set ==
    /// Stores a value, replacing any existing entry for the key.
    ///
    /// `ttl` of `None` uses the store's default TTL. Inserting a new key
    /// while at capacity evicts the least recently used entry first.
    pub fn set(&mut self, key: impl Into<String>, value: V, ttl: Option<Duration>) {
        let key = key.into();
        let now = self.clock.now_ms();
        let ttl_ms = ttl.unwrap_or(self.default_ttl).as_millis().min(u64::MAX as u128) as u64;

        if !self.entries.contains_key(&key) && self.entries.len() >= self.max_size.get() {
            self.evict_one();
        }

        self.entries.insert(key.clone(), CacheEntry::new(value, now, ttl_ms));
        self.lru.touch(&key);
        self.stats.set_total_entries(self.entries.len());
    }

    // == Invalidate ==
    /// Removes an entry. Returns whether one was present.
    pub fn invalidate(&mut self, key: &str) -> bool {
        if self.entries.remove(key).is_some() {
            self.lru.remove(key);
            self.stats.set_total_entries(self.entries.len());
            true
        } else {
            false
        }
    }

    // == Clear ==
    /// Removes every entry. Statistics counters are kept.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.lru.clear();
        self.stats.set_total_entries(0);
    }

    // == Contains ==
    /// Checks for a live entry without refreshing its recency.
    pub fn contains(&self, key: &str) -> bool {
        let now = self.clock.now_ms();
        self.entries
            .get(key)
            .is_some_and(|entry| !entry.is_expired(now))
    }

    /// Returns the stored entry metadata without touching it.
    pub fn peek_entry(&self, key: &str) -> Option<&CacheEntry<V>> {
        self.entries.get(key)
    }

    // == Purge Expired ==
    /// Removes all expired entries in one sweep.
    ///
    /// Reads already expire lazily; this is for callers that want to reclaim
    /// memory eagerly. Returns the number of entries removed.
    pub fn purge_expired(&mut self) -> usize {
        let now = self.clock.now_ms();
        let expired_keys: Vec<String> = self
            .entries
            .iter()
            .filter(|(_, entry)| entry.is_expired(now))
            .map(|(key, _)| key.clone())
            .collect();

        for key in &expired_keys {
            self.entries.remove(key);
            self.lru.remove(key);
        }

        self.stats.record_expirations(expired_keys.len() as u64);
        self.stats.set_total_entries(self.entries.len());
        expired_keys.len()
    }

    // == Stats ==
    /// Returns current cache statistics.
    pub fn stats(&self) -> CacheStats {
        let mut stats = self.stats.clone();
        stats.set_total_entries(self.entries.len());
        stats
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn max_size(&self) -> usize {
        self.max_size.get()
    }

    pub fn default_ttl(&self) -> Duration {
        self.default_ttl
    }

    fn evict_one(&mut self) {
        if let Some(evicted) = self.lru.evict_oldest() {
            self.entries.remove(&evicted);
            self.stats.record_eviction();
            debug!(key = %evicted, "Evicted least recently used entry");
        }
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;

    fn store_with(max: usize, ttl_ms: u64) -> (CacheStore<u32>, ManualClock) {
        let clock = ManualClock::new(0);
        let store = CacheStore::new(
            NonZeroUsize::new(max).unwrap(),
            Duration::from_millis(ttl_ms),
            Arc::new(clock.clone()),
        );
        (store, clock)
    }

    #[test]
    fn test_store_new() {
        let (store, _) = store_with(100, 300_000);
        assert_eq!(store.len(), 0);
        assert!(store.is_empty());
        assert_eq!(store.max_size(), 100);
        assert_eq!(store.default_ttl(), Duration::from_millis(300_000));
    }

    #[test]
    fn test_store_set_and_get() {
        let (mut store, _) = store_with(100, 300_000);

        store.set("key1", 1, None);
        assert_eq!(store.get("key1"), Some(1));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_store_get_nonexistent() {
        let (mut store, _) = store_with(100, 300_000);
        assert_eq!(store.get("nonexistent"), None);
        assert_eq!(store.stats().misses, 1);
    }

    #[test]
    fn test_store_invalidate() {
        let (mut store, _) = store_with(100, 300_000);

        store.set("key1", 1, None);
        assert!(store.invalidate("key1"));
        assert!(!store.invalidate("key1"));

        assert!(store.is_empty());
        assert_eq!(store.get("key1"), None);
    }

    #[test]
    fn test_store_overwrite() {
        let (mut store, _) = store_with(100, 300_000);

        store.set("key1", 1, None);
        store.set("key1", 2, None);

        assert_eq!(store.get("key1"), Some(2));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_store_overwrite_at_capacity_does_not_evict() {
        let (mut store, _) = store_with(2, 300_000);

        store.set("a", 1, None);
        store.set("b", 2, None);
        store.set("a", 10, None);

        assert_eq!(store.len(), 2);
        assert_eq!(store.stats().evictions, 0);
        assert_eq!(store.get("b"), Some(2));
    }

    #[test]
    fn test_store_ttl_expiration_scenario() {
        let (mut store, clock) = store_with(100, 300_000);

        store.set("A", 1, Some(Duration::from_millis(1000)));

        clock.set_ms(500);
        assert_eq!(store.get("A"), Some(1));

        clock.set_ms(1500);
        assert_eq!(store.get("A"), None);
        assert!(store.is_empty());

        let stats = store.stats();
        assert_eq!(stats.expirations, 1);
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
    }

    #[test]
    fn test_store_default_ttl_applies() {
        let (mut store, clock) = store_with(100, 50);

        store.set("k", 1, None);
        clock.advance_ms(51);
        assert_eq!(store.get("k"), None);
    }

    #[test]
    fn test_store_reset_restamps_entry() {
        let (mut store, clock) = store_with(100, 1_000);

        store.set("k", 1, None);
        clock.set_ms(900);
        store.set("k", 2, None);
        clock.set_ms(1_500);

        assert_eq!(store.get("k"), Some(2));
        let entry = store.peek_entry("k").unwrap();
        assert_eq!(entry.created_at, 900);
        assert_eq!(entry.expires_at, 1_900);
    }

    #[test]
    fn test_store_hit_refreshes_last_access() {
        let (mut store, clock) = store_with(100, 10_000);

        store.set("k", 1, None);
        clock.set_ms(700);
        store.get("k");

        assert_eq!(store.peek_entry("k").unwrap().last_accessed_at, 700);
    }

    #[test]
    fn test_store_lru_eviction_scenario() {
        let (mut store, _) = store_with(2, 300_000);

        store.set("A", 1, None);
        store.set("B", 2, None);
        store.set("C", 3, None);

        assert_eq!(store.get("A"), None);
        assert_eq!(store.get("B"), Some(2));
        assert_eq!(store.get("C"), Some(3));
        assert_eq!(store.stats().evictions, 1);
    }

    #[test]
    fn test_store_lru_touch_on_get() {
        let (mut store, _) = store_with(3, 300_000);

        store.set("key1", 1, None);
        store.set("key2", 2, None);
        store.set("key3", 3, None);

        // Access key1 to make it most recently used
        store.get("key1");

        // Adding key4 should evict key2 (now oldest)
        store.set("key4", 4, None);

        assert_eq!(store.get("key1"), Some(1));
        assert_eq!(store.get("key2"), None);
    }

    #[test]
    fn test_store_same_timestamp_evicts_in_insertion_order() {
        let (mut store, _) = store_with(3, 300_000);

        // Clock never moves, so all stamps tie
        store.set("first", 1, None);
        store.set("second", 2, None);
        store.set("third", 3, None);
        store.set("fourth", 4, None);

        assert!(!store.contains("first"));
        assert!(store.contains("second"));
    }

    #[test]
    fn test_store_contains_does_not_touch() {
        let (mut store, _) = store_with(2, 300_000);

        store.set("a", 1, None);
        store.set("b", 2, None);
        assert!(store.contains("a"));
        store.set("c", 3, None);

        assert!(!store.contains("a"));
    }

    #[test]
    fn test_store_clear() {
        let (mut store, _) = store_with(10, 300_000);

        store.set("a", 1, None);
        store.set("b", 2, None);
        store.clear();

        assert!(store.is_empty());
        assert_eq!(store.get("a"), None);
        assert_eq!(store.stats().total_entries, 0);
    }

    #[test]
    fn test_store_purge_expired() {
        let (mut store, clock) = store_with(100, 300_000);

        store.set("short", 1, Some(Duration::from_millis(100)));
        store.set("long", 2, Some(Duration::from_millis(10_000)));

        clock.set_ms(200);
        assert_eq!(store.purge_expired(), 1);
        assert_eq!(store.len(), 1);
        assert_eq!(store.get("long"), Some(2));
    }

    #[test]
    fn test_store_stats() {
        let (mut store, _) = store_with(100, 300_000);

        store.set("key1", 1, None);
        store.get("key1"); // hit
        store.get("nonexistent"); // miss

        let stats = store.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.total_entries, 1);
    }
}
