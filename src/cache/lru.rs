//! LRU Tracker Module
//!
//! Implements Least Recently Used tracking for cache eviction.

use std::collections::{HashMap, VecDeque};

/// Compaction kicks in once stale records outnumber live keys by this much.
const COMPACT_SLACK: usize = 32;

// == LRU Tracker ==
/// Tracks access order for LRU eviction strategy.
///
/// Every touch appends `(key, sequence)` to the back of a queue and records
/// the sequence as the key's current stamp. Records whose sequence no longer
/// matches the stamp are stale and skipped on eviction, so touch, remove and
/// evict are amortized O(1).
/// - Front = Least recently used
/// - Back = Most recently used
#[derive(Debug, Default)]
pub struct LruTracker {
    /// Access records, oldest first (may contain stale records)
    order: VecDeque<(String, u64)>,
    /// Current sequence per live key
    stamps: HashMap<String, u64>,
    /// Next sequence number to hand out
    next_seq: u64,
}

impl LruTracker {
    // == Constructor ==
    /// Creates a new empty LRU tracker.
    pub fn new() -> Self {
        Self::default()
    }

    // == Touch ==
    /// Marks a key as most recently used, adding it if it was not tracked.
    pub fn touch(&mut self, key: &str) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.stamps.insert(key.to_string(), seq);
        self.order.push_back((key.to_string(), seq));
        self.maybe_compact();
    }

    // == Remove ==
    /// Stops tracking a key. Its queued records become stale.
    pub fn remove(&mut self, key: &str) {
        if self.stamps.remove(key).is_some() {
            self.maybe_compact();
        }
    }

    // == Evict Oldest ==
    /// Returns and removes the least recently used key.
    ///
    /// Returns None if tracker is empty.
    pub fn evict_oldest(&mut self) -> Option<String> {
        while let Some((key, seq)) = self.order.pop_front() {
            if self.stamps.get(&key) == Some(&seq) {
                self.stamps.remove(&key);
                return Some(key);
            }
        }
        None
    }

    // == Peek Oldest ==
    /// Returns the least recently used key without removing it.
    pub fn peek_oldest(&self) -> Option<&str> {
        self.order
            .iter()
            .find(|(key, seq)| self.stamps.get(key) == Some(seq))
            .map(|(key, _)| key.as_str())
    }

    // == Clear ==
    pub fn clear(&mut self) {
        self.order.clear();
        self.stamps.clear();
    }

    // == Length ==
    /// Returns the number of tracked keys.
    pub fn len(&self) -> usize {
        self.stamps.len()
    }

    // == Is Empty ==
    pub fn is_empty(&self) -> bool {
        self.stamps.is_empty()
    }

    // == Contains ==
    /// Checks if a key is being tracked.
    pub fn contains(&self, key: &str) -> bool {
        self.stamps.contains_key(key)
    }

    /// Drops stale records once they dominate the queue.
    fn maybe_compact(&mut self) {
        if self.order.len() > self.stamps.len() * 2 + COMPACT_SLACK {
            let stamps = &self.stamps;
            self.order.retain(|(key, seq)| stamps.get(key) == Some(seq));
        }
    }

    #[cfg(test)]
    fn queued_records(&self) -> usize {
        self.order.len()
    }
}
