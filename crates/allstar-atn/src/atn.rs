//! The immutable ATN graph.
//!
//! An [`Atn`] is pure data after load: states, transitions, and the rule,
//! decision and mode tables. The only interior mutability is the lazily
//! filled FIRST-set cache, which is mutex-guarded so one loaded network can
//! serve concurrent parses.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use allstar_core::{IntervalSet, TOKEN_EOF, TOKEN_EPSILON, TOKEN_MIN_USER_TYPE};

use crate::lexer_action::LexerAction;
use crate::state::{AtnState, StateKind};
use crate::transition::Transition;

/// Which recognizer the network was generated for.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GrammarType {
    Lexer,
    Parser,
}

/// An augmented transition network.
///
/// Indices into `states` identify states everywhere in the runtime; a
/// state's `number` equals its index.
#[derive(Debug)]
pub struct Atn {
    pub grammar_type: GrammarType,
    pub max_token_type: i32,
    pub states: Vec<AtnState>,
    /// Decision number to decision state.
    pub decision_to_state: Vec<usize>,
    pub rule_to_start_state: Vec<usize>,
    pub rule_to_stop_state: Vec<usize>,
    /// Token type each lexer rule emits; empty for parser grammars.
    pub rule_to_token_type: Vec<i32>,
    /// Default action of each lexer rule, if any; empty for parser grammars.
    pub rule_to_action_index: Vec<Option<usize>>,
    /// Mode number to its token-start state; empty for parser grammars.
    pub mode_to_start_state: Vec<usize>,
    pub lexer_actions: Vec<LexerAction>,

    /// Derived return edges `(rule stop, follow state)` that come back
    /// from an outermost (precedence 0) invocation of a left-recursive
    /// rule. Prediction's precedence filter exempts configurations that
    /// crossed one of these.
    pub outermost_precedence_returns: HashSet<(usize, usize)>,

    /// FIRST sets, computed on demand.
    first_cache: Mutex<HashMap<usize, Arc<IntervalSet>>>,
}

impl Atn {
    pub fn new(grammar_type: GrammarType, max_token_type: i32) -> Self {
        Self {
            grammar_type,
            max_token_type,
            states: Vec::new(),
            decision_to_state: Vec::new(),
            rule_to_start_state: Vec::new(),
            rule_to_stop_state: Vec::new(),
            rule_to_token_type: Vec::new(),
            rule_to_action_index: Vec::new(),
            mode_to_start_state: Vec::new(),
            lexer_actions: Vec::new(),
            outermost_precedence_returns: HashSet::new(),
            first_cache: Mutex::new(HashMap::new()),
        }
    }

    /// Give every rule-stop state one epsilon edge per invocation of its
    /// rule, targeting the invocation's follow state. Prediction falls off
    /// the end of a rule through these when the simulated stack runs out.
    /// Called once after load (or after hand-assembly in tests).
    pub fn wire_rule_returns(&mut self) {
        let mut returns: Vec<(usize, usize, bool)> = Vec::new();
        for state in &self.states {
            for t in &state.transitions {
                if let Transition::Rule {
                    target,
                    rule_index,
                    follow_state,
                    precedence,
                } = t
                {
                    let outermost =
                        self.states[*target].left_recursive && *precedence == 0;
                    returns.push((self.rule_to_stop_state[*rule_index], *follow_state, outermost));
                }
            }
        }
        for (stop, follow, outermost) in returns {
            self.states[stop]
                .transitions
                .push(Transition::Epsilon { target: follow });
            if outermost {
                self.outermost_precedence_returns.insert((stop, follow));
            }
        }
    }

    /// Append a state, returning its number.
    pub fn add_state(&mut self, kind: StateKind, rule_index: usize) -> usize {
        let number = self.states.len();
        self.states.push(AtnState::new(number, kind, rule_index));
        number
    }

    /// Register `state` as the next decision, returning the decision number.
    pub fn add_decision(&mut self, state: usize) -> usize {
        let decision = self.decision_to_state.len();
        self.states[state].decision = Some(decision);
        self.decision_to_state.push(state);
        decision
    }

    #[inline]
    pub fn state(&self, number: usize) -> &AtnState {
        &self.states[number]
    }

    pub fn decision_state(&self, decision: usize) -> usize {
        self.decision_to_state[decision]
    }

    /// Number of rules.
    pub fn rule_count(&self) -> usize {
        self.rule_to_start_state.len()
    }

    /// Tokens reachable from `state` through zero-width transitions, up to
    /// the first consuming transition (the FIRST set). Contains the epsilon
    /// marker when the end of the state's rule is reachable without
    /// consuming. Computed once per state and cached.
    pub fn next_tokens(&self, state: usize) -> Arc<IntervalSet> {
        if let Some(cached) = self.first_cache.lock().unwrap().get(&state) {
            return Arc::clone(cached);
        }

        let mut look = IntervalSet::new();
        let mut stack = Vec::new();
        let mut called = vec![false; self.rule_count()];
        let mut busy = HashSet::new();
        self.look(state, &mut stack, &mut called, &mut busy, &mut look);
        look.set_read_only();
        let look = Arc::new(look);

        let mut cache = self.first_cache.lock().unwrap();
        // double-check: a concurrent computation may have filled the slot
        Arc::clone(cache.entry(state).or_insert(look))
    }

    /// FIRST set of `state` seen through an invocation stack: when the set
    /// contains the epsilon marker, rule-return edges are followed through
    /// the invoking states (innermost first). EOF joins the set when the
    /// outermost rule end is reachable.
    pub fn next_tokens_in_context<I>(&self, state: usize, invoking_states: I) -> IntervalSet
    where
        I: IntoIterator<Item = usize>,
    {
        let mut following = self.next_tokens(state);
        let mut expected = IntervalSet::new();
        expected.add_set(&following);
        expected.remove(TOKEN_EPSILON);

        for invoking_state in invoking_states {
            if !following.contains(TOKEN_EPSILON) {
                break;
            }
            let Some(Transition::Rule { follow_state, .. }) =
                self.states[invoking_state].transitions.first()
            else {
                break;
            };
            following = self.next_tokens(*follow_state);
            expected.add_set(&following);
            expected.remove(TOKEN_EPSILON);
        }

        if following.contains(TOKEN_EPSILON) {
            expected.add(TOKEN_EOF);
        }
        expected
    }

    fn look(
        &self,
        s: usize,
        stack: &mut Vec<usize>,
        called: &mut Vec<bool>,
        busy: &mut HashSet<(usize, usize)>,
        out: &mut IntervalSet,
    ) {
        // (state, stack depth) identifies the continuation well enough to
        // cut epsilon cycles; rule re-entry is blocked by `called`.
        if !busy.insert((s, stack.len())) {
            return;
        }

        let state = &self.states[s];
        if state.kind == StateKind::RuleStop {
            match stack.pop() {
                Some(ret) => {
                    let was_called = called[state.rule_index];
                    called[state.rule_index] = false;
                    self.look(ret, stack, called, busy, out);
                    called[state.rule_index] = was_called;
                    stack.push(ret);
                }
                None => out.add(TOKEN_EPSILON),
            }
            return;
        }

        for t in &state.transitions {
            match t {
                Transition::Rule {
                    target,
                    follow_state,
                    rule_index,
                    ..
                } => {
                    if called[*rule_index] {
                        continue;
                    }
                    called[*rule_index] = true;
                    stack.push(*follow_state);
                    self.look(*target, stack, called, busy, out);
                    stack.pop();
                    called[*rule_index] = false;
                }
                Transition::Atom { label, .. } => out.add(*label),
                Transition::Range { from, to, .. } => out.add_range(*from, *to),
                Transition::Set { set, .. } => out.add_set(set),
                Transition::NotSet { set, .. } => {
                    out.add_set(&set.complement(TOKEN_MIN_USER_TYPE, self.max_token_type));
                }
                Transition::Wildcard { .. } => {
                    out.add_range(TOKEN_MIN_USER_TYPE, self.max_token_type);
                }
                // predicates and actions are zero-width for FIRST purposes
                Transition::Epsilon { target }
                | Transition::Predicate { target, .. }
                | Transition::Action { target, .. }
                | Transition::Precedence { target, .. } => {
                    self.look(*target, stack, called, busy, out);
                }
            }
        }
    }
}
