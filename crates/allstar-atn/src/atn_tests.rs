//! Tests for FIRST-set computation over hand-assembled networks.

use allstar_core::{IntervalSet, TOKEN_EOF, TOKEN_EPSILON};

use crate::atn::{Atn, GrammarType};
use crate::state::StateKind;
use crate::transition::Transition;

const A: i32 = 1;
const B: i32 = 2;

/// Grammar with an optional called rule:
///
/// ```text
/// s : t B ;
/// t : A | ;
/// ```
fn calling_atn() -> Atn {
    let mut atn = Atn::new(GrammarType::Parser, 2);

    let s_start = atn.add_state(StateKind::RuleStart, 0);
    let s_stop = atn.add_state(StateKind::RuleStop, 0);
    let t_start = atn.add_state(StateKind::RuleStart, 1);
    let t_stop = atn.add_state(StateKind::RuleStop, 1);
    let after_call = atn.add_state(StateKind::Basic, 0);
    let before_stop = atn.add_state(StateKind::Basic, 0);
    let t_mid = atn.add_state(StateKind::Basic, 1);

    atn.rule_to_start_state = vec![s_start, t_start];
    atn.rule_to_stop_state = vec![s_stop, t_stop];

    atn.states[s_start].transitions.push(Transition::Rule {
        target: t_start,
        follow_state: after_call,
        rule_index: 1,
        precedence: 0,
    });
    atn.states[after_call].transitions.push(Transition::Atom {
        target: before_stop,
        label: B,
    });
    atn.states[before_stop]
        .transitions
        .push(Transition::Epsilon { target: s_stop });

    atn.states[t_start].transitions.push(Transition::Atom {
        target: t_mid,
        label: A,
    });
    atn.states[t_start]
        .transitions
        .push(Transition::Epsilon { target: t_stop });
    atn.states[t_mid]
        .transitions
        .push(Transition::Epsilon { target: t_stop });

    atn
}

#[test]
fn first_sees_through_optional_rule() {
    let atn = calling_atn();
    let s_start = atn.rule_to_start_state[0];
    // t may be empty, so B is reachable without consuming A
    assert_eq!(*atn.next_tokens(s_start), IntervalSet::of_range(A, B));
    insta::assert_snapshot!(atn.next_tokens(s_start).to_string(), @"{1..2}");
}

#[test]
fn first_of_optional_rule_has_epsilon_marker() {
    let atn = calling_atn();
    let t_start = atn.rule_to_start_state[1];
    let first = atn.next_tokens(t_start);
    assert!(first.contains(A));
    assert!(first.contains(TOKEN_EPSILON));
    assert!(!first.contains(B));
}

#[test]
fn first_is_cached_and_read_only() {
    let atn = calling_atn();
    let once = atn.next_tokens(0);
    let twice = atn.next_tokens(0);
    assert!(std::sync::Arc::ptr_eq(&once, &twice));
    assert!(once.is_read_only());
}

#[test]
fn context_walk_follows_rule_returns() {
    let atn = calling_atn();
    let t_stop = atn.rule_to_stop_state[1];
    let s_start = atn.rule_to_start_state[0];

    // at t's end, invoked from s: what may follow is B
    let expected = atn.next_tokens_in_context(t_stop, [s_start]);
    assert_eq!(expected, IntervalSet::of(B));
}

#[test]
fn context_walk_exhausted_stack_yields_eof() {
    let atn = calling_atn();
    let s_stop = atn.rule_to_stop_state[0];
    let expected = atn.next_tokens_in_context(s_stop, []);
    assert_eq!(expected, IntervalSet::of(TOKEN_EOF));
}

#[test]
fn left_recursion_terminates() {
    // e : e A | B ; taken literally (no rewrite), FIRST must still terminate
    let mut atn = Atn::new(GrammarType::Parser, 2);
    let e_start = atn.add_state(StateKind::RuleStart, 0);
    let e_stop = atn.add_state(StateKind::RuleStop, 0);
    let mid = atn.add_state(StateKind::Basic, 0);
    let alt2 = atn.add_state(StateKind::Basic, 0);
    atn.rule_to_start_state = vec![e_start];
    atn.rule_to_stop_state = vec![e_stop];

    atn.states[e_start].transitions.push(Transition::Rule {
        target: e_start,
        follow_state: mid,
        rule_index: 0,
        precedence: 0,
    });
    atn.states[e_start]
        .transitions
        .push(Transition::Epsilon { target: alt2 });
    atn.states[mid]
        .transitions
        .push(Transition::Atom { target: e_stop, label: A });
    atn.states[alt2]
        .transitions
        .push(Transition::Atom { target: e_stop, label: B });

    assert_eq!(*atn.next_tokens(e_start), IntervalSet::of(B));
}

#[test]
fn decision_registration() {
    let mut atn = Atn::new(GrammarType::Parser, 1);
    let start = atn.add_state(StateKind::BlockStart, 0);
    let d = atn.add_decision(start);
    assert_eq!(d, 0);
    assert_eq!(atn.decision_state(0), start);
    assert_eq!(atn.states[start].decision, Some(0));
    assert!(atn.states[start].is_decision());
}
