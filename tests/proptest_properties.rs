//! Property-based tests for the tree's universal properties (1-5 of the
//! testable-properties list): order-independence of shape, insert- and
//! delete-equivalence with a bulk build, search round-trip, and diff
//! correctness. Properties 6 and 7 need access to level internals and
//! live as `proptest!` blocks next to the code they check instead.

use std::collections::BTreeMap;

use proptest::prelude::*;
use proptest::test_runner::{Config, RngSeed};

use prolly_tree::{diff, Record, Tree};

fn proptest_config() -> Config {
    let cases = std::env::var("PROPTEST_CASES")
        .ok()
        .and_then(|value| value.parse::<u32>().ok())
        .unwrap_or(256);

    let mut config = Config::with_cases(cases);
    config.failure_persistence = None;

    if let Some(seed) = std::env::var("PROPTEST_SEED")
        .ok()
        .and_then(|value| value.parse::<u64>().ok())
    {
        config.rng_seed = RngSeed::Fixed(seed);
    }

    config
}

/// A set of unique-keyed records, deduplicated by last-write-wins.
fn arb_record_set(max_len: usize) -> impl Strategy<Value = Vec<(i64, i64)>> {
    proptest::collection::vec(any::<(i64, i64)>(), 0..max_len).prop_map(|pairs| {
        let map: BTreeMap<i64, i64> = pairs.into_iter().collect();
        map.into_iter().collect()
    })
}

fn build(pairs: &[(i64, i64)]) -> Tree<i64, i64> {
    let records = pairs.iter().map(|&(k, v)| Record::new(k, v)).collect();
    Tree::build(records)
}

proptest! {
    #![proptest_config(proptest_config())]

    #[test]
    fn order_independence_of_shape(mut pairs in arb_record_set(60)) {
        let ascending = build(&pairs);
        pairs.reverse();
        let descending = build(&pairs);
        prop_assert_eq!(ascending.root().merkel_hash(), descending.root().merkel_hash());
    }

    #[test]
    fn insert_equivalence(pairs in arb_record_set(60), new_key in any::<i64>(), new_value in any::<i64>()) {
        prop_assume!(!pairs.iter().any(|&(k, _)| k == new_key));

        let bulk_with_new: Vec<(i64, i64)> = pairs.iter().copied().chain([(new_key, new_value)]).collect();
        let bulk_built = build(&bulk_with_new);

        let mut incremental = build(&pairs);
        incremental.insert(Record::new(new_key, new_value)).unwrap();

        prop_assert_eq!(bulk_built.root().merkel_hash(), incremental.root().merkel_hash());
    }

    #[test]
    fn delete_equivalence(pairs in arb_record_set(60), idx in any::<usize>()) {
        prop_assume!(!pairs.is_empty());
        let (victim_key, _) = pairs[idx % pairs.len()];

        let without_victim: Vec<(i64, i64)> = pairs.iter().copied().filter(|&(k, _)| k != victim_key).collect();
        let bulk_built = build(&without_victim);

        let mut incremental = build(&pairs);
        incremental.delete(&victim_key).unwrap();

        prop_assert_eq!(bulk_built.root().merkel_hash(), incremental.root().merkel_hash());
    }

    #[test]
    fn search_round_trip(pairs in arb_record_set(60), absent_key in any::<i64>()) {
        prop_assume!(!pairs.iter().any(|&(k, _)| k == absent_key));
        let tree = build(&pairs);

        for &(k, v) in &pairs {
            prop_assert_eq!(tree.search(&k).and_then(|n| n.value().copied()), Some(v));
        }
        prop_assert!(tree.search(&absent_key).is_none());
    }

    #[test]
    fn diff_correctness_subset(base in arb_record_set(40), extra_keys in proptest::collection::vec(any::<i64>(), 0..20)) {
        let base_keys: std::collections::BTreeSet<i64> = base.iter().map(|&(k, _)| k).collect();
        let extra: Vec<(i64, i64)> = extra_keys
            .into_iter()
            .filter(|k| !base_keys.contains(k))
            .map(|k| (k, k))
            .collect();

        let local = build(&base);
        let mut superset = base.clone();
        superset.extend(extra.iter().copied());
        let remote = build(&superset);

        let mut missing = diff(local.root(), remote.root());
        missing.sort_unstable();
        let mut expected: Vec<i64> = extra.iter().map(|&(k, _)| k).collect();
        expected.sort_unstable();
        expected.dedup();
        prop_assert_eq!(missing, expected);
    }

    #[test]
    fn diff_correctness_superset_is_empty(base in arb_record_set(40), drop_idx in any::<usize>()) {
        prop_assume!(!base.is_empty());
        let mut subset = base.clone();
        subset.remove(drop_idx % subset.len());

        let local = build(&base);
        let remote = build(&subset);

        let missing = diff(local.root(), remote.root());
        prop_assert!(missing.is_empty());
    }
}
