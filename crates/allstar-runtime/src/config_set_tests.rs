//! Tests for configuration sets.

use crate::config::AtnConfig;
use crate::config_set::AtnConfigSet;
use crate::context::{MergeCache, PredictionContext};
use crate::semantic::SemanticContext;

fn config(state: usize, alt: usize, return_states: &[i32]) -> AtnConfig {
    let mut ctx = PredictionContext::empty();
    for &rs in return_states.iter().rev() {
        ctx = PredictionContext::new_singleton(Some(ctx), rs);
    }
    AtnConfig::new(state, alt, ctx)
}

#[test]
fn collision_merges_contexts() {
    let mut cache = MergeCache::new();
    let mut set = AtnConfigSet::new(false);

    assert!(set.add(config(3, 1, &[10]), &mut cache));
    assert!(!set.add(config(3, 1, &[20]), &mut cache));

    assert_eq!(set.len(), 1);
    let merged = &set.configs()[0].context;
    assert_eq!(merged.size(), 2);
    assert_eq!(merged.return_state(0), 10);
    assert_eq!(merged.return_state(1), 20);
}

#[test]
fn different_alts_do_not_collide() {
    let mut cache = MergeCache::new();
    let mut set = AtnConfigSet::new(false);
    set.add(config(3, 1, &[10]), &mut cache);
    set.add(config(3, 2, &[10]), &mut cache);
    assert_eq!(set.len(), 2);
    assert_eq!(set.alts(), vec![1, 2]);
}

#[test]
fn ordered_set_keeps_exact_duplicates_once() {
    let mut cache = MergeCache::new();
    let mut set = AtnConfigSet::new_ordered();
    assert!(set.add(config(1, 1, &[5]), &mut cache));
    assert!(!set.add(config(1, 1, &[5]), &mut cache));
    // different context: distinct entry, no merging
    assert!(set.add(config(1, 1, &[6]), &mut cache));
    assert_eq!(set.len(), 2);
}

#[test]
fn tracks_semantic_context_and_outer_dips() {
    let mut cache = MergeCache::new();
    let mut set = AtnConfigSet::new(false);

    let mut with_pred = config(1, 1, &[]);
    with_pred.semantic_context = SemanticContext::Precedence { precedence: 2 };
    set.add(with_pred, &mut cache);
    assert!(set.has_semantic_context);

    let mut dipping = config(2, 1, &[]);
    dipping.reaches_into_outer_context = 1;
    set.add(dipping, &mut cache);
    assert!(set.dips_into_outer_context);
}

#[test]
fn equal_sets_share_hash() {
    let mut cache = MergeCache::new();
    let mut a = AtnConfigSet::new(false);
    let mut b = AtnConfigSet::new(false);
    for set in [&mut a, &mut b] {
        set.add(config(1, 1, &[4]), &mut cache);
        set.add(config(2, 2, &[4]), &mut cache);
    }
    assert_eq!(a, b);
    assert_eq!(a.hash_value(), b.hash_value());

    b.add(config(9, 1, &[]), &mut cache);
    assert_ne!(a, b);
}

#[test]
#[should_panic(expected = "frozen")]
fn frozen_set_rejects_mutation() {
    let mut cache = MergeCache::new();
    let mut set = AtnConfigSet::new(false);
    set.add(config(1, 1, &[]), &mut cache);
    set.freeze();
    set.add(config(2, 1, &[]), &mut cache);
}
