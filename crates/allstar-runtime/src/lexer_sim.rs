//! DFA-driven longest-match tokenisation.
//!
//! Like parser prediction, each lexer mode owns a DFA over characters,
//! grown on demand. The simulator advances greedily, remembering the last
//! position where some rule accepted; on a dead end it rewinds there and
//! reports the matched rule. Crossing a non-greedy decision makes an
//! accept sticky: longer matches no longer supersede it.

use std::collections::HashSet;
use std::sync::Arc;

use allstar_atn::{Atn, StateKind, Transition};
use allstar_core::TOKEN_EOF;

use crate::char_stream::CharStream;
use crate::config::AtnConfig;
use crate::config_set::AtnConfigSet;
use crate::context::{EMPTY_RETURN_STATE, MergeCache, PredictionContext};
use crate::dfa::{Dfa, DfaState};
use crate::errors::RecognitionError;

/// Largest valid codepoint label.
const MAX_CHAR: i32 = 0x10FFFF;

/// A successful match: which rule accepted and the pending action.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LexerMatch {
    pub rule_index: usize,
    pub action_index: Option<usize>,
}

/// Outcome of one `match_rule` call.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LexerMatchOutcome {
    /// Input was already exhausted.
    Eof,
    Matched(LexerMatch),
}

#[derive(Clone)]
struct LastAccept {
    index: usize,
    line: usize,
    column: usize,
    state: Arc<DfaState>,
}

/// The lexer's simulation engine. Position tracking (line/column) lives
/// here so rewinds restore it together with the stream index.
pub struct LexerAtnSimulator {
    atn: Arc<Atn>,
    /// One DFA per lexer mode.
    dfas: Arc<Vec<Dfa>>,
    pub line: usize,
    pub column: usize,
    start_index: usize,
}

impl LexerAtnSimulator {
    pub fn new(atn: Arc<Atn>) -> Self {
        let dfas = Arc::new(
            atn.mode_to_start_state
                .iter()
                .enumerate()
                .map(|(mode, &state)| Dfa::new(mode, state, false))
                .collect(),
        );
        Self::with_dfas(atn, dfas)
    }

    /// Share mode DFAs with other lexers of the same grammar.
    pub fn with_dfas(atn: Arc<Atn>, dfas: Arc<Vec<Dfa>>) -> Self {
        Self {
            atn,
            dfas,
            line: 1,
            column: 0,
            start_index: 0,
        }
    }

    pub fn dfas(&self) -> &Arc<Vec<Dfa>> {
        &self.dfas
    }

    pub fn reset(&mut self) {
        self.line = 1;
        self.column = 0;
        self.start_index = 0;
    }

    /// Match one token starting at the stream's current position.
    pub fn match_rule(
        &mut self,
        input: &mut dyn CharStream,
        mode: usize,
    ) -> Result<LexerMatchOutcome, RecognitionError> {
        self.start_index = input.index();
        let dfas = Arc::clone(&self.dfas);
        let dfa = &dfas[mode];

        let s0 = match dfa.s0() {
            Some(s0) => s0,
            None => {
                let configs = self.compute_start_state(self.atn.mode_to_start_state[mode]);
                let state = self.make_state(configs);
                dfa.set_s0(dfa.add_state(state))
            }
        };

        self.exec_atn(input, dfa, s0)
    }

    fn exec_atn(
        &mut self,
        input: &mut dyn CharStream,
        dfa: &Dfa,
        s0: Arc<DfaState>,
    ) -> Result<LexerMatchOutcome, RecognitionError> {
        let mut current = Arc::clone(&s0);
        let mut last_accept: Option<LastAccept> = None;
        if s0.is_accept {
            last_accept = Some(self.capture(input, &s0));
        }

        let mut t = input.la(1);
        loop {
            let target = match current.edge(t) {
                Some(Some(existing)) => Some(existing),
                Some(None) => None,
                None => self.compute_target_state(dfa, &current, t),
            };
            let Some(target) = target else { break };

            if t != TOKEN_EOF {
                self.consume(input);
            }
            if target.is_accept {
                last_accept = Some(self.capture(input, &target));
                if t == TOKEN_EOF || target.lexer_non_greedy_accept {
                    break;
                }
            }
            t = input.la(1);
            current = target;
        }

        match last_accept {
            Some(accept) => {
                // rewind to the longest accepted prefix
                input.seek(accept.index);
                self.line = accept.line;
                self.column = accept.column;
                let rule_index = accept
                    .state
                    .lexer_rule_index
                    .expect("lexer accept state names its rule");
                Ok(LexerMatchOutcome::Matched(LexerMatch {
                    rule_index,
                    action_index: accept.state.lexer_action_index,
                }))
            }
            None => {
                if t == TOKEN_EOF && input.index() == self.start_index {
                    return Ok(LexerMatchOutcome::Eof);
                }
                Err(RecognitionError::LexerNoViableAlt {
                    start_index: self.start_index,
                    dead_end_configs: Arc::new(current.configs.clone()),
                })
            }
        }
    }

    fn capture(&self, input: &mut dyn CharStream, state: &Arc<DfaState>) -> LastAccept {
        LastAccept {
            index: input.index(),
            line: self.line,
            column: self.column,
            state: Arc::clone(state),
        }
    }

    fn consume(&mut self, input: &mut dyn CharStream) {
        if input.la(1) == '\n' as i32 {
            self.line += 1;
            self.column = 0;
        } else {
            self.column += 1;
        }
        input.consume();
    }

    fn compute_target_state(
        &mut self,
        dfa: &Dfa,
        current: &Arc<DfaState>,
        t: i32,
    ) -> Option<Arc<DfaState>> {
        let mut cache = MergeCache::new();
        let mut reach = AtnConfigSet::new_ordered();
        let mut busy = HashSet::new();

        let atn = Arc::clone(&self.atn);
        for config in current.configs.configs() {
            let state = atn.state(config.state);
            for transition in &state.transitions {
                if transition.matches(t, 0, MAX_CHAR) {
                    let mut c = config.transition_to(transition.target());
                    c.passed_through_non_greedy |= non_greedy_crossing(&atn, transition.target());
                    self.closure(&atn, c, &mut reach, &mut busy, &mut cache);
                }
            }
        }

        if reach.is_empty() {
            current.set_edge(t, None);
            return None;
        }

        let state = self.make_state(reach);
        let target = dfa.add_state(state);
        current.set_edge(t, Some(Arc::clone(&target)));
        Some(target)
    }

    fn compute_start_state(&mut self, mode_start: usize) -> AtnConfigSet {
        let mut cache = MergeCache::new();
        let mut configs = AtnConfigSet::new_ordered();
        let mut busy = HashSet::new();

        let atn = Arc::clone(&self.atn);
        let targets: Vec<usize> = atn
            .state(mode_start)
            .transitions
            .iter()
            .map(Transition::target)
            .collect();
        for (i, target) in targets.into_iter().enumerate() {
            let mut config = AtnConfig::new(target, i + 1, PredictionContext::empty());
            config.passed_through_non_greedy = non_greedy_crossing(&atn, target);
            self.closure(&atn, config, &mut configs, &mut busy, &mut cache);
        }
        configs
    }

    /// Epsilon closure over the lexer ATN. Rule calls (fragments) push
    /// frames; rule stops either accept (empty stack) or return.
    fn closure(
        &mut self,
        atn: &Arc<Atn>,
        config: AtnConfig,
        configs: &mut AtnConfigSet,
        busy: &mut HashSet<AtnConfig>,
        cache: &mut MergeCache,
    ) {
        if !busy.insert(config.clone()) {
            return;
        }

        let state = atn.state(config.state);
        if state.kind == StateKind::RuleStop {
            if config.context.is_empty() || config.context.has_empty_path() {
                // accept for the matched rule
                configs.add(config.clone(), cache);
                if config.context.is_empty() {
                    return;
                }
            }
            if !config.context.is_empty() {
                for i in 0..config.context.size() {
                    if config.context.return_state(i) == EMPTY_RETURN_STATE {
                        continue;
                    }
                    let return_state = config.context.return_state(i) as usize;
                    let parent = config
                        .context
                        .parent(i)
                        .expect("non-$ frame has a parent");
                    let c = config.with_context(return_state, parent);
                    self.closure(atn, c, configs, busy, cache);
                }
            }
            return;
        }

        if !state.only_epsilon_transitions() {
            configs.add(config.clone(), cache);
        }

        for transition in &state.transitions {
            let c = match transition {
                Transition::Rule {
                    target,
                    follow_state,
                    ..
                } => {
                    let context = PredictionContext::new_singleton(
                        Some(Arc::clone(&config.context)),
                        *follow_state as i32,
                    );
                    Some(config.with_context(*target, context))
                }
                Transition::Action {
                    target,
                    action_index,
                    ..
                } => {
                    let mut c = config.transition_to(*target);
                    c.lexer_action_index = Some(*action_index);
                    Some(c)
                }
                // lexer predicates gate generated subclasses; the
                // table-driven runtime treats them as viable
                Transition::Epsilon { target }
                | Transition::Predicate { target, .. }
                | Transition::Precedence { target, .. } => Some(config.transition_to(*target)),
                _ => None,
            };
            if let Some(mut c) = c {
                c.passed_through_non_greedy |= non_greedy_crossing(atn, c.state);
                self.closure(atn, c, configs, busy, cache);
            }
        }
    }

    /// Build a DFA state from a reach set, marking acceptance by the
    /// first rule-stop configuration (grammar declaration order wins
    /// ties because mode start states list rules in order).
    fn make_state(&self, configs: AtnConfigSet) -> DfaState {
        let accept = configs
            .configs()
            .iter()
            .find(|c| self.atn.state(c.state).kind == StateKind::RuleStop)
            .cloned();

        let mut state = DfaState::new(configs);
        if let Some(accept) = accept {
            let rule_index = self.atn.state(accept.state).rule_index;
            state.is_accept = true;
            state.lexer_rule_index = Some(rule_index);
            state.lexer_action_index = accept
                .lexer_action_index
                .or(self.atn.rule_to_action_index[rule_index]);
            state.lexer_non_greedy_accept = accept.passed_through_non_greedy;
        }
        state
    }

    pub fn start_index(&self) -> usize {
        self.start_index
    }
}

fn non_greedy_crossing(atn: &Atn, target: usize) -> bool {
    let state = atn.state(target);
    state.is_decision() && state.non_greedy
}
