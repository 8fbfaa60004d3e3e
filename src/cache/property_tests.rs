//! Property-Based Tests for Cache Module
//!
//! Uses proptest to check the partition invariants over random operation
//! sequences.

use proptest::prelude::*;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::cache::{
    CacheKey, CachePartition, CacheRegistry, ManualClock, PolicyTuning, Segment, TinyLfu,
    TypedPartition,
};
use crate::error::CacheError;

// == Test Configuration ==
const TEST_MAX_ITEMS: usize = 100;
const NO_TTL: Duration = Duration::ZERO;

// == Strategies ==
/// Generates raw keys drawn from a small space so operations collide
fn key_strategy() -> impl Strategy<Value = String> {
    (0u16..300).prop_map(|n| format!("key{}", n))
}

fn value_strategy() -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(any::<u8>(), 0..64)
}

#[derive(Debug, Clone)]
enum CacheOp {
    Set { key: String, value: Vec<u8> },
    Get { key: String },
    Delete { key: String },
}

fn cache_op_strategy() -> impl Strategy<Value = CacheOp> {
    prop_oneof![
        3 => (key_strategy(), value_strategy()).prop_map(|(key, value)| CacheOp::Set { key, value }),
        2 => key_strategy().prop_map(|key| CacheOp::Get { key }),
        1 => key_strategy().prop_map(|key| CacheOp::Delete { key }),
    ]
}

fn tuning_strategy() -> impl Strategy<Value = PolicyTuning> {
    (0u8..=50, 0u8..=100).prop_map(|(window_percent, protected_percent)| PolicyTuning {
        window_percent,
        protected_percent,
        decay_multiplier: 10,
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    // Resident entries never exceed max_items, and every entry sits in
    // exactly one segment.
    #[test]
    fn prop_capacity_enforcement(
        max_items in 1usize..60,
        tuning in tuning_strategy(),
        ops in prop::collection::vec(cache_op_strategy(), 1..300)
    ) {
        let now = Instant::now();
        let mut cache = TinyLfu::new(max_items, NO_TTL, &tuning);

        for op in ops {
            match op {
                CacheOp::Set { key, value } => cache.insert(key, value.into(), now),
                CacheOp::Get { key } => { cache.get(&key, now); }
                CacheOp::Delete { key } => { cache.remove(&key); }
            }

            prop_assert!(cache.len() <= max_items, "len {} exceeds max {}", cache.len(), max_items);
            let (window, probationary, protected) = cache.segment_lens();
            prop_assert_eq!(window + probationary + protected, cache.len());

            let limits = cache.limits();
            prop_assert!(window <= limits.window);
            prop_assert!(probationary + protected <= limits.main);
            prop_assert!(protected <= limits.protected);

            let mut keys = cache.keys_in(Segment::Window);
            keys.extend(cache.keys_in(Segment::Probationary));
            keys.extend(cache.keys_in(Segment::Protected));
            let total = keys.len();
            keys.sort();
            keys.dedup();
            prop_assert_eq!(keys.len(), total, "an entry is linked twice");
        }
    }

    // Hits and misses match the observed outcome of every get.
    #[test]
    fn prop_statistics_accuracy(ops in prop::collection::vec(cache_op_strategy(), 1..100)) {
        let now = Instant::now();
        let mut cache = TinyLfu::new(TEST_MAX_ITEMS, NO_TTL, &PolicyTuning::default());
        let mut expected_hits: u64 = 0;
        let mut expected_misses: u64 = 0;

        for op in ops {
            match op {
                CacheOp::Set { key, value } => cache.insert(key, value.into(), now),
                CacheOp::Get { key } => match cache.get(&key, now) {
                    Some(_) => expected_hits += 1,
                    None => expected_misses += 1,
                },
                CacheOp::Delete { key } => { cache.remove(&key); }
            }
        }

        let stats = cache.stats();
        prop_assert_eq!(stats.hits, expected_hits, "Hits mismatch");
        prop_assert_eq!(stats.misses, expected_misses, "Misses mismatch");
        prop_assert_eq!(stats.total_entries, cache.len(), "Total entries mismatch");
    }

    // Set(k, v1); Set(k, v2); Get(k) returns v2 and the count does not grow.
    #[test]
    fn prop_overwrite_semantics(
        prefill in prop::collection::vec(key_strategy(), 0..150),
        key in key_strategy(),
        value1 in value_strategy(),
        value2 in value_strategy()
    ) {
        let now = Instant::now();
        let mut cache = TinyLfu::new(TEST_MAX_ITEMS, NO_TTL, &PolicyTuning::default());
        for k in prefill {
            cache.insert(k, Arc::from(&b"x"[..]), now);
        }

        cache.insert(key.clone(), value1.into(), now);
        let resident = cache.contains(&key, now);
        let len = cache.len();
        cache.insert(key.clone(), value2.clone().into(), now);

        prop_assert_eq!(cache.len(), len, "Overwrite changed the entry count");
        if resident {
            let value = cache.get(&key, now);
            prop_assert_eq!(value.as_deref(), Some(value2.as_slice()));
        }
    }

    // A deleted key is gone until it is set again.
    #[test]
    fn prop_delete_removes_entry(key in key_strategy(), value in value_strategy()) {
        let registry = CacheRegistry::in_memory();
        let handle = registry
            .register(CachePartition::new("props", NO_TTL, TEST_MAX_ITEMS))
            .unwrap();
        let cache_key = handle.key(&key);

        handle.set(&cache_key, value).unwrap();
        prop_assert!(handle.get(&cache_key).unwrap().is_some());

        handle.delete(&cache_key).unwrap();
        prop_assert!(handle.get(&cache_key).unwrap().is_none());
    }

    // A key is found strictly before its TTL and missing from the TTL on.
    #[test]
    fn prop_ttl_boundary(
        ttl_ms in 1u64..10_000,
        probe_ms in 0u64..20_000,
        key in key_strategy()
    ) {
        let clock = Arc::new(ManualClock::new());
        let registry = CacheRegistry::in_memory().with_clock(clock.clone());
        let handle = registry
            .register(CachePartition::new("ttl", Duration::from_millis(ttl_ms), TEST_MAX_ITEMS))
            .unwrap();
        let cache_key = handle.key(&key);
        handle.set(&cache_key, b"v".to_vec()).unwrap();

        clock.advance(Duration::from_millis(probe_ms));
        let found = handle.get(&cache_key).unwrap().is_some();

        prop_assert_eq!(found, probe_ms < ttl_ms);
    }

    // Typed values survive the store unchanged.
    #[test]
    fn prop_typed_values_survive(key in key_strategy(), value in any::<(u32, String, Vec<i64>)>()) {
        let registry = CacheRegistry::in_memory();
        let handle = registry
            .register(CachePartition::new("typed", NO_TTL, TEST_MAX_ITEMS))
            .unwrap();
        let cache: TypedPartition<(u32, String, Vec<i64>)> = TypedPartition::msgpack(handle);

        cache.set(&key, &value).unwrap();
        prop_assert_eq!(cache.get(&key).unwrap(), Some(value));
    }

    // Encoded keys are deterministic and bounded.
    #[test]
    fn prop_key_encoding(namespace in "[a-z]{1,20}", raw in ".{0,200}") {
        let key = CacheKey::encode(&namespace, &raw);
        prop_assert_eq!(&key, &CacheKey::encode(&namespace, &raw));
        let prefix = format!("{}:", namespace);
        prop_assert!(key.encoded_key.starts_with(&prefix));
        if namespace.len() + raw.len() >= 100 {
            prop_assert_eq!(key.encoded_key.len(), namespace.len() + 1 + 40);
        } else {
            prop_assert_eq!(key.encoded_key, format!("{}:{}", namespace, raw));
        }
    }

    // Keys of another namespace never reach a partition.
    #[test]
    fn prop_foreign_keys_rejected(key in key_strategy()) {
        let registry = CacheRegistry::in_memory();
        let a = registry.register(CachePartition::new("a", NO_TTL, 10)).unwrap();
        registry.register(CachePartition::new("b", NO_TTL, 10)).unwrap();

        let foreign = CacheKey::encode("b", &key);
        let is_mismatch = matches!(a.set(&foreign, vec![1]), Err(CacheError::NamespaceMismatch { .. }));
        prop_assert!(is_mismatch);
        prop_assert!(a.is_empty());
    }
}
