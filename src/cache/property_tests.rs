//! Property-Based Tests for Cache Module
//!
//! Uses proptest to check capacity, recency, expiry and key canonicalization
//! over generated operation sequences.

use proptest::prelude::*;
use std::collections::HashSet;
use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::Duration;

use serde_json::{Map, Value};

use crate::cache::{CacheKey, CacheStore};
use crate::clock::ManualClock;

// == Test Configuration ==
const TEST_MAX_ENTRIES: usize = 100;
const TEST_DEFAULT_TTL_MS: u64 = 300_000;

fn new_store(max: usize) -> (CacheStore<String>, ManualClock) {
    let clock = ManualClock::new(0);
    let store = CacheStore::new(
        NonZeroUsize::new(max).unwrap(),
        Duration::from_millis(TEST_DEFAULT_TTL_MS),
        Arc::new(clock.clone()),
    );
    (store, clock)
}

// == Strategies ==
/// Generates valid cache keys
fn valid_key_strategy() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9_]{1,16}".prop_map(|s| s)
}

/// Generates cache values
fn valid_value_strategy() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9 ]{1,32}".prop_map(|s| s)
}

#[derive(Debug, Clone)]
enum CacheOp {
    Set { key: String, value: String },
    Get { key: String },
    Invalidate { key: String },
    Advance { ms: u64 },
}

fn cache_op_strategy() -> impl Strategy<Value = CacheOp> {
    prop_oneof![
        (valid_key_strategy(), valid_value_strategy())
            .prop_map(|(key, value)| CacheOp::Set { key, value }),
        valid_key_strategy().prop_map(|key| CacheOp::Get { key }),
        valid_key_strategy().prop_map(|key| CacheOp::Invalidate { key }),
        (0u64..200_000).prop_map(|ms| CacheOp::Advance { ms }),
    ]
}

/// Shuffles the top-level fields of a JSON object by a seed.
fn reorder_object(fields: &[(String, i64)], seed: usize) -> Value {
    let mut ordered: Vec<&(String, i64)> = fields.iter().collect();
    if !ordered.is_empty() {
        let len = ordered.len();
        ordered.rotate_left(seed % len);
    }
    let mut map = Map::new();
    for (k, v) in ordered {
        map.insert(k.clone(), Value::from(*v));
    }
    Value::Object(map)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    // For any sequence of operations, hit and miss counters match what
    // callers observed and the resident count never exceeds capacity.
    #[test]
    fn prop_statistics_and_capacity(ops in prop::collection::vec(cache_op_strategy(), 1..80)) {
        let max = 8;
        let (mut store, clock) = new_store(max);
        let mut expected_hits: u64 = 0;
        let mut expected_misses: u64 = 0;

        for op in ops {
            match op {
                CacheOp::Set { key, value } => store.set(key, value, None),
                CacheOp::Get { key } => match store.get(&key) {
                    Some(_) => expected_hits += 1,
                    None => expected_misses += 1,
                },
                CacheOp::Invalidate { key } => {
                    store.invalidate(&key);
                }
                CacheOp::Advance { ms } => clock.advance_ms(ms),
            }
            prop_assert!(store.len() <= max, "Cache size {} exceeds max {}", store.len(), max);
        }

        let stats = store.stats();
        prop_assert_eq!(stats.hits, expected_hits, "Hits mismatch");
        prop_assert_eq!(stats.misses, expected_misses, "Misses mismatch");
        prop_assert_eq!(stats.total_entries, store.len(), "Total entries mismatch");
    }

    // Storing then reading before expiry returns the stored value.
    #[test]
    fn prop_roundtrip_storage(key in valid_key_strategy(), value in valid_value_strategy()) {
        let (mut store, _) = new_store(TEST_MAX_ENTRIES);

        store.set(key.clone(), value.clone(), None);
        prop_assert_eq!(store.get(&key), Some(value));
    }

    // An entry is live through its TTL and gone one millisecond after.
    #[test]
    fn prop_ttl_boundary(
        key in valid_key_strategy(),
        value in valid_value_strategy(),
        ttl_ms in 1u64..1_000_000,
    ) {
        let (mut store, clock) = new_store(TEST_MAX_ENTRIES);

        store.set(key.clone(), value.clone(), Some(Duration::from_millis(ttl_ms)));

        clock.set_ms(ttl_ms);
        prop_assert_eq!(store.get(&key), Some(value));

        clock.set_ms(ttl_ms + 1);
        prop_assert_eq!(store.get(&key), None);
    }

    // Filling to capacity and inserting one more evicts exactly the first
    // inserted key.
    #[test]
    fn prop_lru_eviction_order(
        initial_keys in prop::collection::vec(valid_key_strategy(), 3..10),
        new_key in valid_key_strategy(),
    ) {
        let mut seen = HashSet::new();
        let unique_keys: Vec<String> = initial_keys
            .into_iter()
            .filter(|k| seen.insert(k.clone()))
            .collect();

        prop_assume!(unique_keys.len() >= 2);
        prop_assume!(!unique_keys.contains(&new_key));

        let capacity = unique_keys.len();
        let (mut store, _) = new_store(capacity);

        for key in &unique_keys {
            store.set(key.clone(), format!("value_{}", key), None);
        }
        store.set(new_key.clone(), "new".to_string(), None);

        prop_assert_eq!(store.len(), capacity);
        prop_assert!(!store.contains(&unique_keys[0]));
        prop_assert!(store.contains(&new_key));
        for key in unique_keys.iter().skip(1) {
            prop_assert!(store.contains(key), "Key '{}' should still exist", key);
        }
        prop_assert_eq!(store.stats().evictions, 1);
    }

    // A read makes the key the most recently used, so it survives the next
    // eviction.
    #[test]
    fn prop_lru_access_tracking(
        keys in prop::collection::vec(valid_key_strategy(), 3..8),
        access_index in 0usize..100,
        new_key in valid_key_strategy(),
    ) {
        let mut seen = HashSet::new();
        let unique_keys: Vec<String> = keys
            .into_iter()
            .filter(|k| seen.insert(k.clone()))
            .collect();

        prop_assume!(unique_keys.len() >= 3);
        prop_assume!(!unique_keys.contains(&new_key));

        let capacity = unique_keys.len();
        let (mut store, _) = new_store(capacity);
        for key in &unique_keys {
            store.set(key.clone(), key.clone(), None);
        }

        let accessed = unique_keys[access_index % capacity].clone();
        prop_assert!(store.get(&accessed).is_some());

        store.set(new_key, "new".to_string(), None);
        prop_assert!(store.contains(&accessed), "Accessed key '{}' was evicted", accessed);

        // The oldest untouched key is the one that went
        let expected_victim = unique_keys.iter().find(|k| **k != accessed).unwrap();
        prop_assert!(!store.contains(expected_victim));
    }

    // Object field order never changes the derived key.
    #[test]
    fn prop_key_ignores_field_order(
        fields in prop::collection::hash_map("[a-z]{1,6}", any::<i64>(), 0..8),
        seed_a in 0usize..16,
        seed_b in 0usize..16,
    ) {
        let fields: Vec<(String, i64)> = fields.into_iter().collect();
        let first = reorder_object(&fields, seed_a);
        let second = reorder_object(&fields, seed_b);

        let k1 = CacheKey::builder("op").arg(&1).unwrap().arg(&first).unwrap().build().unwrap();
        let k2 = CacheKey::builder("op").arg(&1).unwrap().arg(&second).unwrap().build().unwrap();
        prop_assert_eq!(k1, k2);
    }

    // Distinct maps give distinct keys.
    #[test]
    fn prop_key_distinguishes_contents(
        a in prop::collection::hash_map("[a-z]{1,4}", 0i64..10, 1..5),
        b in prop::collection::hash_map("[a-z]{1,4}", 0i64..10, 1..5),
    ) {
        let ka = CacheKey::derive("op", &a).unwrap();
        let kb = CacheKey::derive("op", &b).unwrap();
        let same: bool = a.len() == b.len()
            && a.iter().all(|(k, v)| b.get(k) == Some(v));
        prop_assert_eq!(ka == kb, same);
    }
}
