//! Concrete scenarios from the tree's correctness spec (S1-S7): build
//! determinism, search, delete-then-search, insert, and the three diff
//! shapes (subset, superset, partial overlap).

use prolly_tree::{diff, Record, Tree};

fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

fn build(keys: impl IntoIterator<Item = i64>) -> Tree<i64, i64> {
    let records = keys.into_iter().map(|k| Record::new(k, k)).collect();
    Tree::build(records)
}

#[test]
fn s1_build_determinism_across_permutations() {
    init_tracing();
    let ascending = build(0..10);
    let descending = build((0..10).rev());
    assert_eq!(ascending.root().merkel_hash(), descending.root().merkel_hash());
}

#[test]
fn s2_search() {
    let tree = build(0..10);
    assert_eq!(tree.search(&5).unwrap().value(), Some(&5));
    assert!(tree.search(&100).is_none());
}

#[test]
fn s3_delete_then_search() {
    let mut tree = build(0..10);
    tree.delete(&6).unwrap();
    assert!(tree.search(&6).is_none());

    let fresh = build((0..10).filter(|&k| k != 6));
    assert_eq!(tree.root().merkel_hash(), fresh.root().merkel_hash());
}

#[test]
fn s4_insert() {
    let mut tree = build(0..5);
    tree.insert(Record::new(10, 10)).unwrap();
    assert_eq!(tree.search(&10).unwrap().value(), Some(&10));

    let fresh = build((0..5).chain(std::iter::once(10)));
    assert_eq!(tree.root().merkel_hash(), fresh.root().merkel_hash());
}

#[test]
fn s5_diff_subset() {
    let local = build(0..11);
    let remote = build(0..15);
    let mut missing = diff(local.root(), remote.root());
    missing.sort_unstable();
    assert_eq!(missing, vec![11, 12, 13, 14]);
}

#[test]
fn s6_diff_superset() {
    let local = build(0..11);
    let remote = build(0..10);
    let missing = diff(local.root(), remote.root());
    assert!(missing.is_empty());
}

#[test]
fn s7_diff_partial_overlap() {
    let local = build([0, 1, 2, 3, 4, 6, 7]);
    let remote = build(0..18);
    let mut missing = diff(local.root(), remote.root());
    missing.sort_unstable();
    assert_eq!(missing, vec![5, 8, 9, 10, 11, 12, 13, 14, 15, 16, 17]);
}
