//! Property-Based Tests for Cache Module
//!
//! Uses proptest to check the structural invariants of the LRU core under
//! arbitrary operation sequences.

use proptest::prelude::*;
use std::collections::HashSet;
use std::thread::sleep;
use std::time::Duration;

use crate::cache::LruCache;

// == Test Configuration ==
const TEST_TTL: Duration = Duration::from_secs(300);

// == Strategies ==
fn key_strategy() -> impl Strategy<Value = String> {
    "[a-z0-9_]{1,12}"
}

#[derive(Debug, Clone)]
enum CacheOp {
    Put { key: String, size: u64 },
    Get { key: String },
    Delete { key: String },
}

fn cache_op_strategy() -> impl Strategy<Value = CacheOp> {
    prop_oneof![
        (key_strategy(), 1u64..64).prop_map(|(key, size)| CacheOp::Put { key, size }),
        key_strategy().prop_map(|key| CacheOp::Get { key }),
        key_strategy().prop_map(|key| CacheOp::Delete { key }),
    ]
}

fn apply(cache: &LruCache<String, u64>, op: CacheOp) -> Option<bool> {
    match op {
        CacheOp::Put { key, size } => {
            cache.put(key, size, size);
            None
        }
        CacheOp::Get { key } => Some(cache.get(&key).is_some()),
        CacheOp::Delete { key } => {
            cache.delete(&key);
            None
        }
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    // After every mutation: count <= capacity, bytes <= max, and the list,
    // the index and the reported size agree.
    #[test]
    fn prop_bounds_and_structure_hold(
        capacity in 1usize..20,
        max_bytes in 1u64..256,
        ops in prop::collection::vec(cache_op_strategy(), 1..120)
    ) {
        let cache: LruCache<String, u64> = LruCache::new(capacity, max_bytes, TEST_TTL);

        for op in ops {
            apply(&cache, op);

            let entries = cache.entries();
            prop_assert!(cache.len() <= capacity);
            prop_assert!(cache.current_size() <= max_bytes);
            prop_assert_eq!(entries.len(), cache.len());
            prop_assert_eq!(entries.iter().map(|e| e.size).sum::<u64>(), cache.current_size());

            let unique: HashSet<&String> = entries.iter().map(|e| &e.key).collect();
            prop_assert_eq!(unique.len(), entries.len(), "duplicate key in recency list");
        }
    }

    #[test]
    fn prop_statistics_accuracy(ops in prop::collection::vec(cache_op_strategy(), 1..60)) {
        let cache: LruCache<String, u64> = LruCache::new(100, 10_000, TEST_TTL);
        let mut expected_hits = 0u64;
        let mut expected_misses = 0u64;

        for op in ops {
            match apply(&cache, op) {
                Some(true) => expected_hits += 1,
                Some(false) => expected_misses += 1,
                None => {}
            }
        }

        let stats = cache.stats();
        prop_assert_eq!(stats.hits, expected_hits);
        prop_assert_eq!(stats.misses, expected_misses);
        prop_assert_eq!(stats.entries, cache.len());
    }

    // Filling a cache of capacity N with N+1 distinct keys leaves exactly the
    // first (least recently used) key absent.
    #[test]
    fn prop_lru_eviction_order(keys in prop::collection::hash_set(key_strategy(), 2..12)) {
        let keys: Vec<String> = keys.into_iter().collect();
        let capacity = keys.len() - 1;
        let cache: LruCache<String, u64> = LruCache::new(capacity, 10_000, TEST_TTL);

        for key in &keys {
            cache.put(key.clone(), 1, 1);
        }

        prop_assert_eq!(cache.len(), capacity);
        prop_assert!(!cache.contains(&keys[0]));
        for key in keys.iter().skip(1) {
            prop_assert!(cache.contains(key), "key {} should survive", key);
        }
    }

    // Touching the oldest key protects it; the next oldest goes instead.
    #[test]
    fn prop_get_protects_from_eviction(keys in prop::collection::hash_set(key_strategy(), 3..10)) {
        let keys: Vec<String> = keys.into_iter().collect();
        let (extra, filled) = keys.split_last().unwrap();
        let cache: LruCache<String, u64> = LruCache::new(filled.len(), 10_000, TEST_TTL);

        for key in filled {
            cache.put(key.clone(), 1, 1);
        }
        prop_assert!(cache.get(&filled[0]).is_some());
        cache.put(extra.clone(), 1, 1);

        prop_assert!(cache.contains(&filled[0]));
        prop_assert!(!cache.contains(&filled[1]));
    }

    #[test]
    fn prop_overwrite_semantics(key in key_strategy(), v1 in 1u64..100, v2 in 1u64..100) {
        let cache: LruCache<String, u64> = LruCache::new(10, 1_000, TEST_TTL);
        cache.put(key.clone(), v1, v1);
        cache.put(key.clone(), v2, v2);

        prop_assert_eq!(cache.get(&key), Some(v2));
        prop_assert_eq!(cache.len(), 1);
        prop_assert_eq!(cache.current_size(), v2);
    }
}

// Fewer cases for the time-sensitive TTL property
proptest! {
    #![proptest_config(ProptestConfig::with_cases(3))]

    #[test]
    fn prop_ttl_expiration_behavior(key in key_strategy(), value in 1u64..100) {
        let cache: LruCache<String, u64> = LruCache::new(10, 1_000, TEST_TTL);
        cache.put_with_ttl(key.clone(), value, 1, Duration::from_millis(200));

        prop_assert_eq!(cache.get(&key), Some(value));

        sleep(Duration::from_millis(260));

        prop_assert!(cache.get(&key).is_none());
        prop_assert_eq!(cache.len(), 0);
    }
}
