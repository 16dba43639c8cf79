//! Cache Entry Module
//!
//! Defines the structure for individual cache entries with TTL support.

// == Cache Entry ==
/// A single cached value with its timestamps (Unix milliseconds).
#[derive(Debug, Clone)]
pub struct CacheEntry<V> {
    /// The stored value
    pub value: V,
    /// When the entry was stored
    pub created_at: u64,
    /// Refreshed on every hit
    pub last_accessed_at: u64,
    /// The entry is stale once the clock passes this instant
    pub expires_at: u64,
}

impl<V> CacheEntry<V> {
    // == Constructor ==
    /// Creates an entry stamped at `now` that expires `ttl_ms` later.
    pub fn new(value: V, now: u64, ttl_ms: u64) -> Self {
        Self {
            value,
            created_at: now,
            last_accessed_at: now,
            expires_at: now.saturating_add(ttl_ms),
        }
    }

    // == Is Expired ==
    /// Checks if the entry has expired.
    ///
    /// Boundary condition: an entry read at exactly `expires_at` is still
    /// live. It becomes stale only once `now > expires_at`.
    pub fn is_expired(&self, now: u64) -> bool {
        now > self.expires_at
    }

    // == Touch ==
    /// Records a hit at `now`.
    pub fn touch(&mut self, now: u64) {
        self.last_accessed_at = now;
    }

    // == Time To Live ==
    /// Remaining lifetime in milliseconds, zero once expired.
    pub fn ttl_remaining_ms(&self, now: u64) -> u64 {
        self.expires_at.saturating_sub(now)
    }
}
