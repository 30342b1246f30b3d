//! Per-decision lookahead DFAs.
//!
//! A DFA grows monotonically and is shared by every parse of the same
//! grammar: readers race against inserts, so the canonical state map and
//! each state's edge map are mutex-guarded, and all inserts are
//! idempotent (two threads adding the same state or edge converge on one
//! canonical value). A state's non-edge payload is immutable after
//! construction; in particular an accept state never changes its
//! prediction.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::config_set::AtnConfigSet;
use crate::semantic::SemanticContext;

/// A predicate a DFA accept state must evaluate, and the alternative it
/// votes for. Evaluated in order; the first true predicate wins.
#[derive(Clone, Debug)]
pub struct PredPrediction {
    pub pred: SemanticContext,
    pub alt: usize,
}

/// A DFA node: a frozen configuration set plus accept/edge data.
#[derive(Debug)]
pub struct DfaState {
    pub configs: AtnConfigSet,
    pub is_accept: bool,
    pub prediction: Option<usize>,
    /// SLL found a conflict here; prediction must rerun in full context.
    pub requires_full_context: bool,
    /// Present on predicated accept states; `prediction` is unset then.
    pub predicates: Option<Vec<PredPrediction>>,
    /// Lexer accept payload: matched rule and pending action.
    pub lexer_rule_index: Option<usize>,
    pub lexer_action_index: Option<usize>,
    /// The accepting path crossed a non-greedy decision; the match must
    /// not be extended past this accept.
    pub lexer_non_greedy_accept: bool,
    /// `None` edge = cached dead end.
    edges: Mutex<HashMap<i32, Option<Arc<DfaState>>>>,
}

impl DfaState {
    pub fn new(mut configs: AtnConfigSet) -> Self {
        configs.freeze();
        Self {
            configs,
            is_accept: false,
            prediction: None,
            requires_full_context: false,
            predicates: None,
            lexer_rule_index: None,
            lexer_action_index: None,
            lexer_non_greedy_accept: false,
            edges: Mutex::new(HashMap::new()),
        }
    }

    /// Existing edge on `symbol`: `None` = not yet computed,
    /// `Some(None)` = known dead end.
    pub fn edge(&self, symbol: i32) -> Option<Option<Arc<DfaState>>> {
        self.edges.lock().unwrap().get(&symbol).cloned()
    }

    /// Record an edge. The first write wins; the canonical target comes
    /// back either way.
    pub fn set_edge(&self, symbol: i32, target: Option<Arc<DfaState>>) -> Option<Arc<DfaState>> {
        let mut edges = self.edges.lock().unwrap();
        edges.entry(symbol).or_insert(target).clone()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.lock().unwrap().len()
    }
}

/// The lookahead DFA of one decision.
///
/// The canonical state map buckets by configuration-set hash and resolves
/// collisions by set equality.
#[derive(Debug)]
pub struct Dfa {
    pub decision: usize,
    /// The decision's ATN state.
    pub atn_start_state: usize,
    /// Left-recursive loop decisions key their start state by precedence.
    pub precedence_dfa: bool,
    states: Mutex<HashMap<u32, Vec<Arc<DfaState>>>>,
    s0: Mutex<Option<Arc<DfaState>>>,
    s0_by_precedence: Mutex<HashMap<i32, Arc<DfaState>>>,
}

impl Dfa {
    pub fn new(decision: usize, atn_start_state: usize, precedence_dfa: bool) -> Self {
        Self {
            decision,
            atn_start_state,
            precedence_dfa,
            states: Mutex::new(HashMap::new()),
            s0: Mutex::new(None),
            s0_by_precedence: Mutex::new(HashMap::new()),
        }
    }

    pub fn s0(&self) -> Option<Arc<DfaState>> {
        self.s0.lock().unwrap().clone()
    }

    /// Install the start state; first writer wins.
    pub fn set_s0(&self, state: Arc<DfaState>) -> Arc<DfaState> {
        let mut s0 = self.s0.lock().unwrap();
        match &*s0 {
            Some(existing) => Arc::clone(existing),
            None => {
                *s0 = Some(Arc::clone(&state));
                state
            }
        }
    }

    pub fn precedence_start_state(&self, precedence: i32) -> Option<Arc<DfaState>> {
        assert!(self.precedence_dfa, "not a precedence DFA");
        self.s0_by_precedence.lock().unwrap().get(&precedence).cloned()
    }

    pub fn set_precedence_start_state(
        &self,
        precedence: i32,
        state: Arc<DfaState>,
    ) -> Arc<DfaState> {
        assert!(self.precedence_dfa, "not a precedence DFA");
        let mut map = self.s0_by_precedence.lock().unwrap();
        Arc::clone(map.entry(precedence).or_insert(state))
    }

    /// Canonicalise a state: an equal configuration set always yields the
    /// same handle.
    pub fn add_state(&self, state: DfaState) -> Arc<DfaState> {
        let key = state.configs.hash_value();
        let mut states = self.states.lock().unwrap();
        let bucket = states.entry(key).or_default();
        if let Some(existing) = bucket.iter().find(|s| s.configs == state.configs) {
            return Arc::clone(existing);
        }
        let state = Arc::new(state);
        bucket.push(Arc::clone(&state));
        state
    }

    pub fn state_count(&self) -> usize {
        self.states.lock().unwrap().values().map(Vec::len).sum()
    }

    pub fn accept_state_count(&self) -> usize {
        self.states
            .lock()
            .unwrap()
            .values()
            .flatten()
            .filter(|s| s.is_accept)
            .count()
    }
}
