//! Tests for DFA growth invariants.

use std::sync::Arc;

use crate::config::AtnConfig;
use crate::config_set::AtnConfigSet;
use crate::context::{MergeCache, PredictionContext};
use crate::dfa::{Dfa, DfaState};

fn set_of(states: &[usize]) -> AtnConfigSet {
    let mut cache = MergeCache::new();
    let mut set = AtnConfigSet::new(false);
    for &s in states {
        set.add(
            AtnConfig::new(s, 1, PredictionContext::empty()),
            &mut cache,
        );
    }
    set
}

#[test]
fn add_state_canonicalises_equal_config_sets() {
    let dfa = Dfa::new(0, 7, false);
    let first = dfa.add_state(DfaState::new(set_of(&[1, 2])));
    let second = dfa.add_state(DfaState::new(set_of(&[1, 2])));
    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(dfa.state_count(), 1);

    let third = dfa.add_state(DfaState::new(set_of(&[1, 3])));
    assert!(!Arc::ptr_eq(&first, &third));
    assert_eq!(dfa.state_count(), 2);
}

#[test]
fn edges_are_idempotent_first_writer_wins() {
    let dfa = Dfa::new(0, 7, false);
    let from = dfa.add_state(DfaState::new(set_of(&[1])));
    let to_a = dfa.add_state(DfaState::new(set_of(&[2])));
    let to_b = dfa.add_state(DfaState::new(set_of(&[3])));

    let stored = from.set_edge(5, Some(Arc::clone(&to_a)));
    assert!(Arc::ptr_eq(stored.as_ref().unwrap(), &to_a));

    // a racing second insert keeps the first target
    let stored = from.set_edge(5, Some(to_b));
    assert!(Arc::ptr_eq(stored.as_ref().unwrap(), &to_a));
    assert_eq!(from.edge_count(), 1);
}

#[test]
fn error_edges_are_remembered() {
    let dfa = Dfa::new(0, 7, false);
    let from = dfa.add_state(DfaState::new(set_of(&[1])));
    assert!(from.edge(9).is_none());
    from.set_edge(9, None);
    assert!(matches!(from.edge(9), Some(None)));
}

#[test]
fn s0_installs_once() {
    let dfa = Dfa::new(0, 7, false);
    assert!(dfa.s0().is_none());
    let a = dfa.add_state(DfaState::new(set_of(&[1])));
    let b = dfa.add_state(DfaState::new(set_of(&[2])));
    let installed = dfa.set_s0(Arc::clone(&a));
    assert!(Arc::ptr_eq(&installed, &a));
    let installed = dfa.set_s0(b);
    assert!(Arc::ptr_eq(&installed, &a));
}

#[test]
fn precedence_start_states_keyed_independently() {
    let dfa = Dfa::new(0, 7, true);
    let p0 = dfa.add_state(DfaState::new(set_of(&[1])));
    let p3 = dfa.add_state(DfaState::new(set_of(&[2])));
    dfa.set_precedence_start_state(0, Arc::clone(&p0));
    dfa.set_precedence_start_state(3, Arc::clone(&p3));
    assert!(Arc::ptr_eq(&dfa.precedence_start_state(0).unwrap(), &p0));
    assert!(Arc::ptr_eq(&dfa.precedence_start_state(3).unwrap(), &p3));
    assert!(dfa.precedence_start_state(1).is_none());
}

#[test]
fn frozen_configs_in_states() {
    let dfa = Dfa::new(0, 7, false);
    let state = dfa.add_state(DfaState::new(set_of(&[1])));
    assert!(state.configs.is_frozen());
}
