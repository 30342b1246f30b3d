//! Tests for prediction-context merging and caching.

use std::sync::Arc;

use crate::context::{
    Ctx, EMPTY_RETURN_STATE, MergeCache, PredictionContext, PredictionContextCache,
    contexts_equal, merge,
};

fn singleton(parent: Ctx, return_state: i32) -> Ctx {
    PredictionContext::new_singleton(Some(parent), return_state)
}

fn chain(return_states: &[i32]) -> Ctx {
    let mut ctx = PredictionContext::empty();
    for &rs in return_states.iter().rev() {
        ctx = singleton(ctx, rs);
    }
    ctx
}

#[test]
fn empty_is_a_shared_singleton() {
    assert!(Arc::ptr_eq(
        &PredictionContext::empty(),
        &PredictionContext::empty()
    ));
    assert!(PredictionContext::empty().is_empty());
    assert!(PredictionContext::empty().has_empty_path());
}

#[test]
fn structural_equality_and_cached_hash() {
    let a = chain(&[10, 20]);
    let b = chain(&[10, 20]);
    let c = chain(&[10, 21]);
    assert!(contexts_equal(&a, &b));
    assert_eq!(a.hash_value(), b.hash_value());
    assert!(!contexts_equal(&a, &c));
}

#[test]
fn merge_same_is_identity() {
    let mut cache = MergeCache::new();
    let a = chain(&[5, 6]);
    let merged = merge(&a, &a, true, &mut cache);
    assert!(Arc::ptr_eq(&merged, &a));
}

#[test]
fn merge_is_commutative() {
    let mut cache = MergeCache::new();
    let a = chain(&[3, 9]);
    let b = chain(&[7, 9]);
    let ab = merge(&a, &b, true, &mut cache);
    let mut cache2 = MergeCache::new();
    let ba = merge(&b, &a, true, &mut cache2);
    assert!(contexts_equal(&ab, &ba));
}

#[test]
fn merge_is_associative_up_to_structure() {
    let a = chain(&[1]);
    let b = chain(&[2]);
    let c = chain(&[3]);
    let mut cache = MergeCache::new();
    let left = merge(&merge(&a, &b, true, &mut cache), &c, true, &mut cache);
    let mut cache2 = MergeCache::new();
    let right = merge(&a, &merge(&b, &c, true, &mut cache2), true, &mut cache2);
    assert!(contexts_equal(&left, &right));
}

#[test]
fn wildcard_root_absorbs() {
    let mut cache = MergeCache::new();
    let a = chain(&[4]);
    let empty = PredictionContext::empty();
    let merged = merge(&empty, &a, true, &mut cache);
    assert!(merged.is_empty());
    let merged = merge(&a, &empty, true, &mut cache);
    assert!(merged.is_empty());
}

#[test]
fn full_ctx_root_keeps_both_with_dollar_last() {
    let mut cache = MergeCache::new();
    let a = chain(&[4]);
    let empty = PredictionContext::empty();
    let merged = merge(&empty, &a, false, &mut cache);
    assert_eq!(merged.size(), 2);
    assert_eq!(merged.return_state(0), 4);
    assert_eq!(merged.return_state(1), EMPTY_RETURN_STATE);
    assert!(merged.has_empty_path());
}

#[test]
fn same_top_merges_parents() {
    // a^x + a^y => a^(x|y): one slot, merged parent
    let mut cache = MergeCache::new();
    let ax = singleton(chain(&[10]), 7);
    let ay = singleton(chain(&[20]), 7);
    let merged = merge(&ax, &ay, true, &mut cache);
    assert_eq!(merged.size(), 1);
    assert_eq!(merged.return_state(0), 7);
    let parent = merged.parent(0).unwrap();
    assert_eq!(parent.size(), 2);
    assert_eq!(parent.return_state(0), 10);
    assert_eq!(parent.return_state(1), 20);
}

#[test]
fn different_tops_sort_ascending() {
    let mut cache = MergeCache::new();
    let a = chain(&[9]);
    let b = chain(&[2]);
    let merged = merge(&a, &b, true, &mut cache);
    assert_eq!(merged.size(), 2);
    assert_eq!(merged.return_state(0), 2);
    assert_eq!(merged.return_state(1), 9);
}

#[test]
fn equal_payload_in_arrays_collapses_to_one_slot() {
    let mut cache = MergeCache::new();
    let ab = merge(&chain(&[1]), &chain(&[2]), true, &mut cache);
    let bc = merge(&chain(&[2]), &chain(&[3]), true, &mut cache);
    let merged = merge(&ab, &bc, true, &mut cache);
    assert_eq!(merged.size(), 3);
    assert_eq!(
        (0..3).map(|i| merged.return_state(i)).collect::<Vec<_>>(),
        vec![1, 2, 3]
    );
}

#[test]
fn merge_cache_returns_identical_handles() {
    let mut cache = MergeCache::new();
    let a = chain(&[3, 5]);
    let b = chain(&[4, 5]);
    let first = merge(&a, &b, true, &mut cache);
    let second = merge(&a, &b, true, &mut cache);
    assert!(Arc::ptr_eq(&first, &second));
    // reversed operands hit the same entry
    let reversed = merge(&b, &a, true, &mut cache);
    assert!(Arc::ptr_eq(&first, &reversed));
}

#[test]
fn context_cache_canonicalises_equal_graphs() {
    let cache = PredictionContextCache::new();
    let a = chain(&[11, 12, 13]);
    let b = chain(&[11, 12, 13]);
    let ca = cache.get_cached(&a);
    let cb = cache.get_cached(&b);
    assert!(Arc::ptr_eq(&ca, &cb));

    // shared suffixes collapse too
    let c = chain(&[99, 12, 13]);
    let cc = cache.get_cached(&c);
    assert!(Arc::ptr_eq(
        &ca.parent(0).unwrap(),
        &cc.parent(0).unwrap()
    ));
}
