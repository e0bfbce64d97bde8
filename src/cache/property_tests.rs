//! Property-Based Tests for Cache Module
//!
//! Uses proptest to check the structural invariants of the building blocks.

use proptest::prelude::*;
use std::collections::HashMap;
use std::time::Duration;

use crate::cache::coster::Coster;
use crate::cache::sketch::{CountMinSketch, MAX_COUNTER};
use crate::cache::{
    BitSet, BloomFilter, Entry, ExpirationIndex, HashAlgorithm, KeyHasher, Policy, ShardedStore,
    Store,
};
use crate::error::CacheError;

// == Test Configuration ==
const TEST_SHARDS: usize = 16;
const TEST_BUCKET_INTERVAL: u64 = 5;

// == Strategies ==
/// Ledger mutations against a small hash space so updates and deletes hit.
#[derive(Debug, Clone)]
enum LedgerOp {
    Add { hash: u64, cost: i64 },
    Update { hash: u64, cost: i64 },
    Del { hash: u64 },
}

fn ledger_op_strategy() -> impl Strategy<Value = LedgerOp> {
    prop_oneof![
        (0u64..32, 0i64..40).prop_map(|(hash, cost)| LedgerOp::Add { hash, cost }),
        (0u64..32, 0i64..40).prop_map(|(hash, cost)| LedgerOp::Update { hash, cost }),
        (0u64..32).prop_map(|hash| LedgerOp::Del { hash }),
    ]
}

/// Generates valid cache keys (non-empty, within length limit)
fn valid_key_strategy() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9_]{1,64}"
}

fn valid_value_strategy() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9 ]{1,256}"
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    // Property 1: every bit of a bit set can be set and read back
    #[test]
    fn prop_bitset_set_then_has(exp in 0u32..12) {
        let len = 1u64 << exp;
        let mut bits = BitSet::new(len).unwrap();
        for i in 0..len {
            bits.set(i);
            prop_assert!(bits.has(i));
        }
    }

    // Property 2: the bloom filter has no false negatives
    #[test]
    fn prop_bloom_no_false_negatives(hashes in prop::collection::vec(any::<u64>(), 1..500)) {
        let mut bloom = BloomFilter::with_rate(hashes.len() as u64, 0.01).unwrap();
        for &h in &hashes {
            bloom.add(h);
        }
        for &h in &hashes {
            prop_assert!(bloom.exist(h), "added hash {} not found", h);
        }
    }

    // Property 3: a count-min estimate never undercounts, up to saturation
    #[test]
    fn prop_count_min_lower_bound(
        counts in prop::collection::hash_map(any::<u64>(), 1u8..20, 1..100),
        seed in any::<u64>(),
    ) {
        let mut sketch = CountMinSketch::with_seed(64, seed);
        for (&hash, &count) in &counts {
            for _ in 0..count {
                sketch.increment(hash);
            }
        }
        for (&hash, &count) in &counts {
            prop_assert!(sketch.estimate(hash) >= count.min(MAX_COUNTER));
        }
    }

    // Property 4: a lone key is counted exactly until it saturates
    #[test]
    fn prop_count_min_single_key_exact(hash in any::<u64>(), count in 0u8..30, seed in any::<u64>()) {
        let mut sketch = CountMinSketch::with_seed(1024, seed);
        for _ in 0..count {
            sketch.increment(hash);
        }
        prop_assert_eq!(sketch.estimate(hash), count.min(MAX_COUNTER));
    }

    // Property 5: the ledger total always equals the sum of its entries and stays in budget
    #[test]
    fn prop_coster_invariant(ops in prop::collection::vec(ledger_op_strategy(), 1..200)) {
        let mut coster = Coster::new(100);
        let mut model: HashMap<u64, i64> = HashMap::new();

        for op in ops {
            match op {
                LedgerOp::Add { hash, cost } => {
                    if coster.add(hash, cost) {
                        model.insert(hash, cost);
                    }
                }
                LedgerOp::Update { hash, cost } => {
                    if coster.update_if_exists(hash, cost) {
                        model.insert(hash, cost);
                    }
                }
                LedgerOp::Del { hash } => {
                    prop_assert_eq!(coster.del(hash), model.remove(&hash));
                }
            }
            prop_assert_eq!(coster.used(), coster.sum());
            prop_assert_eq!(coster.used(), model.values().sum::<i64>());
            prop_assert!(coster.used() <= coster.max());
        }
    }

    // Property 6: an uncontended key below the budget is always admitted
    #[test]
    fn prop_policy_single_put_admitted(hash in any::<u64>(), max in 2i64..10_000, seed in any::<u64>()) {
        let policy = Policy::with_seed(1000, max, seed).unwrap();
        let cost = max - 1;
        let admission = policy.put(hash, cost).unwrap();
        prop_assert!(admission.admitted);
        prop_assert!(admission.evicted.is_empty());
        prop_assert_eq!(policy.used(), cost);
    }

    // Property 7: an item costing the whole budget is never admitted
    #[test]
    fn prop_policy_cost_too_large(hash in any::<u64>(), max in 1i64..10_000, extra in 0i64..100) {
        let policy = Policy::with_seed(1000, max, 1).unwrap();
        let cost = max + extra;
        prop_assert_eq!(policy.put(hash, cost), Err(CacheError::CostTooLarge { cost, max }));
        prop_assert_eq!(policy.used(), 0);
    }

    // Property 8: whatever is written and read, the budget is never exceeded
    #[test]
    fn prop_policy_stays_in_budget(
        puts in prop::collection::vec((0u64..200, 1i64..30), 1..300),
        reads in prop::collection::vec(0u64..200, 0..300),
    ) {
        let policy = Policy::with_seed(1000, 100, 9).unwrap();
        policy.push_access(&reads);
        let mut resident: HashMap<u64, i64> = HashMap::new();

        for (hash, cost) in puts {
            let admission = policy.put(hash, cost).unwrap();
            for victim in &admission.evicted {
                prop_assert!(resident.remove(victim).is_some());
                prop_assert_ne!(*victim, hash);
            }
            if admission.should_store() {
                resident.insert(hash, cost);
            }
            prop_assert!(policy.used() <= 100);
            prop_assert_eq!(policy.used(), resident.values().sum::<i64>());
        }
    }

    // Property 9: a stored value is readable by its hash pair and by nothing else
    #[test]
    fn prop_store_round_trip(
        key in valid_key_strategy(),
        value in valid_value_strategy(),
        algo in prop_oneof![Just(HashAlgorithm::FnvXx), Just(HashAlgorithm::Xxh3Fnv)],
    ) {
        let store = ShardedStore::new(TEST_SHARDS, TEST_BUCKET_INTERVAL).unwrap();
        let (hash, conflict) = algo.hash(key.as_bytes());
        store.put(Entry::new(hash, conflict, value.clone(), 1, Duration::from_secs(60)));

        prop_assert_eq!(store.get(hash, conflict), Ok(value));
        prop_assert_eq!(store.get(hash, conflict.wrapping_add(1)), Err(CacheError::NotFound));
    }

    // Property 10: a second write to a key replaces the first
    #[test]
    fn prop_store_overwrite(
        key in valid_key_strategy(),
        value1 in valid_value_strategy(),
        value2 in valid_value_strategy(),
    ) {
        let store = ShardedStore::new(TEST_SHARDS, TEST_BUCKET_INTERVAL).unwrap();
        let (hash, conflict) = HashAlgorithm::FnvXx.hash(key.as_bytes());
        store.put(Entry::new(hash, conflict, value1, 1, Duration::ZERO));
        store.put(Entry::new(hash, conflict, value2.clone(), 1, Duration::ZERO));

        prop_assert_eq!(store.get(hash, conflict), Ok(value2));
        prop_assert_eq!(store.len(), 1);
    }

    // Property 11: a key filed under an expiration is found in the same bucket
    #[test]
    fn prop_expiration_put_get(
        key in any::<u64>(),
        conflict in any::<u64>(),
        expires_at in 0u64..4_000_000_000_000,
    ) {
        let index = ExpirationIndex::new(TEST_BUCKET_INTERVAL);
        index.put(key, conflict, Some(expires_at));
        prop_assert_eq!(index.get(key, Some(expires_at)), Some(conflict));

        index.del(key, Some(expires_at));
        prop_assert!(index.is_empty());
    }
}
