//! Cache Module
//!
//! Provides in-memory memoization storage with TTL expiration and LRU
//! eviction.

mod entry;
mod key;
mod lru;
mod stats;
mod store;

#[cfg(test)]
mod property_tests;

// Re-export public types
pub use entry::CacheEntry;
pub use key::{canonicalize, CacheKey, KeyBuilder};
pub use lru::LruTracker;
pub use stats::CacheStats;
pub use store::CacheStore;
