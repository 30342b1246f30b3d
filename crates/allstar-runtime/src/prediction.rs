//! Adaptive LL(*) prediction for the parser.
//!
//! Each decision owns a lookahead DFA. Prediction drives the DFA over the
//! token stream; on a missing edge it simulates the ATN (closure over
//! epsilon transitions, merge of prediction contexts) to compute the
//! target state and grows the DFA in place, so later parses of similar
//! input never re-simulate. SLL simulation treats the empty stack as a
//! wildcard caller; when that approximation conflicts, prediction reruns
//! with the caller's real stack (full context) and, if the decision is
//! truly ambiguous, reports it and takes the lowest alternative.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::Arc;

use allstar_atn::{Atn, StateKind, Transition};
use allstar_core::TOKEN_EOF;

use crate::config::AtnConfig;
use crate::config_set::AtnConfigSet;
use crate::context::{
    Ctx, CtxKey, EMPTY_RETURN_STATE, MergeCache, PredictionContext, PredictionContextCache,
};
use crate::dfa::{Dfa, DfaState, PredPrediction};
use crate::errors::RecognitionError;
use crate::semantic::{PredicateEvaluator, SemanticContext};
use crate::token_stream::TokenStream;
use crate::tree::RuleNode;

/// What prediction needs from the parser besides the token stream:
/// predicate evaluation, the precedence stack, and diagnostic reporting.
pub trait PredictionHost: PredicateEvaluator {
    /// Precedence of the in-flight rule invocation (0 outside
    /// left-recursive rules).
    fn current_precedence(&self) -> i32;

    fn report_attempting_full_context(
        &mut self,
        decision: usize,
        conflicting_alts: &[usize],
        start_index: usize,
        stop_index: usize,
    );

    fn report_context_sensitivity(
        &mut self,
        decision: usize,
        prediction: usize,
        start_index: usize,
        stop_index: usize,
    );

    fn report_ambiguity(
        &mut self,
        decision: usize,
        start_index: usize,
        stop_index: usize,
        exact: bool,
        ambig_alts: &[usize],
    );
}

/// The parser's prediction engine. One instance per grammar; shared by
/// every parser of that grammar (all mutability lives in the DFAs and the
/// context cache, both grow-only).
pub struct ParserAtnSimulator {
    atn: Arc<Atn>,
    dfas: Vec<Dfa>,
    context_cache: PredictionContextCache,
}

impl ParserAtnSimulator {
    pub fn new(atn: Arc<Atn>) -> Self {
        let dfas = atn
            .decision_to_state
            .iter()
            .enumerate()
            .map(|(decision, &state)| {
                Dfa::new(decision, state, atn.state(state).precedence_decision)
            })
            .collect();
        Self {
            atn,
            dfas,
            context_cache: PredictionContextCache::new(),
        }
    }

    pub fn atn(&self) -> &Arc<Atn> {
        &self.atn
    }

    pub fn dfa(&self, decision: usize) -> &Dfa {
        &self.dfas[decision]
    }

    /// Predict the alternative to take at `decision`. Lookahead is
    /// consumed speculatively; the stream is restored before returning.
    pub fn adaptive_predict(
        &self,
        input: &mut dyn TokenStream,
        decision: usize,
        outer_context: Option<&std::rc::Rc<std::cell::RefCell<RuleNode>>>,
        host: &mut dyn PredictionHost,
    ) -> Result<usize, RecognitionError> {
        let start_index = input.index();
        let outer_context = PredictionContext::from_rule_context(&self.atn, outer_context);

        let mut prediction = Prediction {
            atn: &self.atn,
            dfa: &self.dfas[decision],
            context_cache: &self.context_cache,
            input,
            host,
            outer_context,
            start_index,
            merge_cache: MergeCache::new(),
        };
        prediction.predict()
    }
}

/// One in-flight prediction: the merge cache lives exactly this long.
struct Prediction<'a> {
    atn: &'a Atn,
    dfa: &'a Dfa,
    context_cache: &'a PredictionContextCache,
    input: &'a mut dyn TokenStream,
    host: &'a mut dyn PredictionHost,
    outer_context: Ctx,
    start_index: usize,
    merge_cache: MergeCache,
}

impl Prediction<'_> {
    /// Run the prediction and restore the stream to the decision point,
    /// success or failure.
    fn predict(&mut self) -> Result<usize, RecognitionError> {
        let marker = self.input.mark();
        let result = self.predict_inner();
        self.input.seek(self.start_index);
        self.input.release(marker);
        result
    }

    fn predict_inner(&mut self) -> Result<usize, RecognitionError> {
        let s0 = if self.dfa.precedence_dfa {
            self.dfa
                .precedence_start_state(self.host.current_precedence())
        } else {
            self.dfa.s0()
        };

        let s0 = match s0 {
            Some(s0) => s0,
            None => {
                let s0_closure = self.compute_start_state(false);
                if self.dfa.precedence_dfa {
                    let filtered = self.apply_precedence_filter(&s0_closure);
                    let state = self.add_dfa_state(filtered);
                    self.dfa
                        .set_precedence_start_state(self.host.current_precedence(), state)
                } else {
                    let state = self.add_dfa_state(s0_closure);
                    self.dfa.set_s0(state)
                }
            }
        };

        self.exec_atn(s0)
    }

    // ----- SLL simulation over the DFA ------------------------------------

    fn exec_atn(&mut self, s0: Arc<DfaState>) -> Result<usize, RecognitionError> {
        let mut previous = s0;
        let mut t = self.input.la(1);

        loop {
            let d = match previous.edge(t) {
                Some(Some(existing)) => existing,
                Some(None) => return Err(self.no_viable_alt(&previous)),
                None => match self.compute_target_state(&previous, t) {
                    Some(d) => d,
                    None => return Err(self.no_viable_alt(&previous)),
                },
            };

            if d.requires_full_context {
                let mut conflicting_alts = d.configs.conflicting_alts.clone().unwrap_or_default();
                if let Some(predicates) = d.predicates.clone() {
                    let conflict_index = self.input.index();
                    if conflict_index != self.start_index {
                        self.input.seek(self.start_index);
                    }
                    let alts = self.eval_semantic_contexts(&predicates);
                    if alts.len() == 1 {
                        return Ok(alts[0]);
                    }
                    conflicting_alts = alts;
                    if conflict_index != self.start_index {
                        self.input.seek(conflict_index);
                    }
                }

                let stop_index = self.input.index();
                self.host.report_attempting_full_context(
                    self.dfa.decision,
                    &conflicting_alts,
                    self.start_index,
                    stop_index,
                );
                let s0_closure = self.compute_start_state(true);
                return self.exec_atn_with_full_context(s0_closure);
            }

            if d.is_accept {
                let Some(predicates) = d.predicates.clone() else {
                    return Ok(d.prediction.expect("accept state carries a prediction"));
                };

                // rewind so predicates see the decision entry point
                let stop_index = self.input.index();
                self.input.seek(self.start_index);
                let alts = self.eval_semantic_contexts(&predicates);
                return match alts.len() {
                    0 => Err(self.no_viable_alt(&previous)),
                    1 => Ok(alts[0]),
                    _ => {
                        self.host.report_ambiguity(
                            self.dfa.decision,
                            self.start_index,
                            stop_index,
                            false,
                            &alts,
                        );
                        Ok(alts[0])
                    }
                };
            }

            previous = d;
            if t != TOKEN_EOF {
                self.input.consume();
                t = self.input.la(1);
            }
        }
    }

    /// Simulate one token of lookahead and grow the DFA with the result.
    /// `None` means the token is not viable from `previous` (the dead end
    /// is cached as an error edge).
    fn compute_target_state(&mut self, previous: &Arc<DfaState>, t: i32) -> Option<Arc<DfaState>> {
        let Some(mut reach) = self.compute_reach_set(&previous.configs, t, false) else {
            previous.set_edge(t, None);
            return None;
        };

        let unique_alt = get_unique_alt(&reach);
        reach.unique_alt = unique_alt;

        let mut is_accept = false;
        let mut prediction = None;
        let mut requires_full_context = false;

        if let Some(alt) = unique_alt {
            is_accept = true;
            prediction = Some(alt);
        } else if has_sll_conflict_terminating_prediction(self.atn, &reach) {
            let conflicting = get_conflicting_alts(&reach);
            prediction = conflicting.first().copied();
            reach.conflicting_alts = Some(conflicting);
            is_accept = true;
            requires_full_context = true;
        }

        let mut predicates = None;
        if is_accept && reach.has_semantic_context {
            let decision_state = self.atn.state(self.dfa.atn_start_state);
            predicates = self.predicate_dfa_state(&reach, decision_state.transitions.len());
            if predicates.is_some() {
                prediction = None;
            }
        }

        reach.optimize_contexts(self.context_cache);
        let mut state = DfaState::new(reach);
        state.is_accept = is_accept;
        state.prediction = prediction;
        state.requires_full_context = requires_full_context;
        state.predicates = predicates;

        let d = self.dfa.add_state(state);
        previous.set_edge(t, Some(Arc::clone(&d)));
        Some(d)
    }

    // ----- full-context fallback ------------------------------------------

    fn exec_atn_with_full_context(
        &mut self,
        s0: AtnConfigSet,
    ) -> Result<usize, RecognitionError> {
        self.input.seek(self.start_index);
        let mut t = self.input.la(1);
        let mut previous = s0;

        loop {
            let Some(mut reach) = self.compute_reach_set(&previous, t, true) else {
                return Err(self.no_viable_alt_from(&previous));
            };

            let subsets = conflicting_alt_subsets(&reach);
            reach.unique_alt = get_unique_alt(&reach);

            if let Some(alt) = reach.unique_alt {
                self.host.report_context_sensitivity(
                    self.dfa.decision,
                    alt,
                    self.start_index,
                    self.input.index(),
                );
                return Ok(alt);
            }

            if let Some(alt) = resolves_to_just_one_viable_alt(&subsets) {
                let exact = all_subsets_conflict(&subsets) && all_subsets_equal(&subsets);
                let ambig_alts = union_of_subsets(&subsets);
                self.host.report_ambiguity(
                    self.dfa.decision,
                    self.start_index,
                    self.input.index(),
                    exact,
                    &ambig_alts,
                );
                return Ok(alt);
            }

            previous = reach;
            if t != TOKEN_EOF {
                self.input.consume();
                t = self.input.la(1);
            }
        }
    }

    // ----- reach and closure ----------------------------------------------

    fn compute_reach_set(
        &mut self,
        closure: &AtnConfigSet,
        t: i32,
        full_ctx: bool,
    ) -> Option<AtnConfigSet> {
        let atn = self.atn;
        let mut intermediate = AtnConfigSet::new(full_ctx);
        let mut skipped_stop_states: Vec<AtnConfig> = Vec::new();

        for config in closure.configs() {
            let state = atn.state(config.state);
            if state.kind == StateKind::RuleStop {
                debug_assert!(config.context.is_empty());
                if full_ctx || t == TOKEN_EOF {
                    skipped_stop_states.push(config.clone());
                }
                continue;
            }
            for transition in &state.transitions {
                if transition.matches(t, 0, atn.max_token_type) {
                    let c = config.transition_to(transition.target());
                    intermediate.add(c, &mut self.merge_cache);
                }
            }
        }

        let mut reach = None;
        let mut reach_is_intermediate = false;
        if skipped_stop_states.is_empty() && t != TOKEN_EOF {
            // a single viable config (or alt) will accept immediately, no
            // need to close over it
            if intermediate.len() == 1 || get_unique_alt(&intermediate).is_some() {
                reach_is_intermediate = true;
                reach = Some(intermediate.clone());
            }
        }

        let mut reach = match reach {
            Some(reach) => reach,
            None => {
                let mut closed = AtnConfigSet::new(full_ctx);
                let mut busy = HashSet::new();
                let treat_eof_as_epsilon = t == TOKEN_EOF;
                for config in intermediate.configs().to_vec() {
                    self.closure(
                        config,
                        &mut closed,
                        &mut busy,
                        false,
                        full_ctx,
                        0,
                        treat_eof_as_epsilon,
                    );
                }
                closed
            }
        };

        if t == TOKEN_EOF {
            // only configurations that finished the decision entry rule
            // can match EOF
            reach = self.keep_rule_stop_configs(&reach, reach_is_intermediate, full_ctx);
        }

        if !skipped_stop_states.is_empty()
            && (!full_ctx || !has_config_in_rule_stop_state(atn, &reach))
        {
            for config in skipped_stop_states {
                reach.add(config, &mut self.merge_cache);
            }
        }

        if reach.is_empty() { None } else { Some(reach) }
    }

    fn keep_rule_stop_configs(
        &mut self,
        configs: &AtnConfigSet,
        look_to_end_of_rule: bool,
        full_ctx: bool,
    ) -> AtnConfigSet {
        let atn = self.atn;
        if all_configs_in_rule_stop_states(atn, configs) {
            return configs.clone();
        }
        let mut result = AtnConfigSet::new(full_ctx);
        for config in configs.configs() {
            let state = atn.state(config.state);
            if state.kind == StateKind::RuleStop {
                result.add(config.clone(), &mut self.merge_cache);
                continue;
            }
            if look_to_end_of_rule && state.only_epsilon_transitions() {
                let next = atn.next_tokens(config.state);
                if next.contains(allstar_core::TOKEN_EPSILON) {
                    let end = atn.rule_to_stop_state[state.rule_index];
                    result.add(config.transition_to(end), &mut self.merge_cache);
                }
            }
        }
        result
    }

    fn compute_start_state(&mut self, full_ctx: bool) -> AtnConfigSet {
        let atn = self.atn;
        let decision_state = atn.state(self.dfa.atn_start_state);
        let initial_context = if full_ctx {
            Arc::clone(&self.outer_context)
        } else {
            PredictionContext::empty()
        };

        let mut configs = AtnConfigSet::new(full_ctx);
        let mut busy = HashSet::new();
        let targets: Vec<usize> = decision_state
            .transitions
            .iter()
            .map(Transition::target)
            .collect();
        for (i, target) in targets.into_iter().enumerate() {
            let config = AtnConfig::new(target, i + 1, Arc::clone(&initial_context));
            self.closure(config, &mut configs, &mut busy, true, full_ctx, 0, false);
        }
        configs
    }

    /// Precedence-decision start sets drop recursive-alternative
    /// configurations already covered by the primary alternative, and
    /// resolve precedence predicates eagerly.
    fn apply_precedence_filter(&mut self, configs: &AtnConfigSet) -> AtnConfigSet {
        let mut states_from_alt1: HashMap<usize, Ctx> = HashMap::new();
        let mut result = AtnConfigSet::new(configs.full_ctx);

        for config in configs.configs() {
            if config.alt != 1 {
                continue;
            }
            let Some(updated) = config.semantic_context.eval_precedence(&*self.host) else {
                continue; // predicate known false
            };
            states_from_alt1.insert(config.state, Arc::clone(&config.context));
            let c = if updated != config.semantic_context {
                config.with_semantic_context(config.state, updated)
            } else {
                config.clone()
            };
            result.add(c, &mut self.merge_cache);
        }

        for config in configs.configs() {
            if config.alt == 1 {
                continue;
            }
            if !config.precedence_filter_suppressed {
                if let Some(context) = states_from_alt1.get(&config.state) {
                    if crate::context::contexts_equal(context, &config.context) {
                        // covered by the primary alternative
                        continue;
                    }
                }
            }
            result.add(config.clone(), &mut self.merge_cache);
        }

        result
    }

    #[allow(clippy::too_many_arguments)]
    fn closure(
        &mut self,
        config: AtnConfig,
        configs: &mut AtnConfigSet,
        busy: &mut HashSet<AtnConfig>,
        collect_predicates: bool,
        full_ctx: bool,
        depth: i32,
        treat_eof_as_epsilon: bool,
    ) {
        // guards the epsilon graph against left-recursive and loop cycles
        if !busy.insert(config.clone()) {
            return;
        }

        let atn = self.atn;
        let state = atn.state(config.state);

        if state.kind == StateKind::RuleStop {
            if !config.context.is_empty() {
                for i in 0..config.context.size() {
                    if config.context.return_state(i) == EMPTY_RETURN_STATE {
                        if full_ctx {
                            let c = config
                                .with_context(config.state, PredictionContext::empty());
                            configs.add(c, &mut self.merge_cache);
                        } else {
                            // stack exhausted under SLL: chase the derived
                            // follow edges like an empty-context config
                            self.closure_work(
                                config.clone(),
                                configs,
                                busy,
                                collect_predicates,
                                full_ctx,
                                depth,
                                treat_eof_as_epsilon,
                            );
                        }
                        continue;
                    }
                    let return_state = config.context.return_state(i) as usize;
                    let parent = config
                        .context
                        .parent(i)
                        .expect("non-$ frame has a parent");
                    let mut c = AtnConfig::new(return_state, config.alt, parent);
                    c.semantic_context = config.semantic_context.clone();
                    c.reaches_into_outer_context = config.reaches_into_outer_context;
                    self.closure(
                        c,
                        configs,
                        busy,
                        collect_predicates,
                        full_ctx,
                        depth.saturating_sub(1),
                        treat_eof_as_epsilon,
                    );
                }
                return;
            } else if full_ctx {
                // reached the end of the decision entry rule
                configs.add(config, &mut self.merge_cache);
                return;
            }
            // SLL with wildcard stack: fall through and chase follow edges
        }

        self.closure_work(
            config,
            configs,
            busy,
            collect_predicates,
            full_ctx,
            depth,
            treat_eof_as_epsilon,
        );
    }

    #[allow(clippy::too_many_arguments)]
    fn closure_work(
        &mut self,
        config: AtnConfig,
        configs: &mut AtnConfigSet,
        busy: &mut HashSet<AtnConfig>,
        collect_predicates: bool,
        full_ctx: bool,
        depth: i32,
        treat_eof_as_epsilon: bool,
    ) {
        let atn = self.atn;
        let state = atn.state(config.state);

        if !state.only_epsilon_transitions() {
            configs.add(config.clone(), &mut self.merge_cache);
        }

        for transition in &state.transitions {
            let continue_collecting =
                collect_predicates && !matches!(transition, Transition::Action { .. });
            let Some(mut c) = self.epsilon_target(
                &config,
                transition,
                continue_collecting,
                depth == 0,
                full_ctx,
                treat_eof_as_epsilon,
            ) else {
                continue;
            };

            let mut new_depth = depth;
            if state.kind == StateKind::RuleStop {
                // fell off the end of a rule into a caller
                debug_assert!(!full_ctx);
                if self.dfa.precedence_dfa
                    && atn
                        .outermost_precedence_returns
                        .contains(&(state.number, transition.target()))
                    && state.rule_index == atn.state(self.dfa.atn_start_state).rule_index
                {
                    c.precedence_filter_suppressed = true;
                }
                c.reaches_into_outer_context =
                    c.reaches_into_outer_context.saturating_add(1);
                configs.dips_into_outer_context = true;
                new_depth = new_depth.saturating_sub(1);
            } else if matches!(transition, Transition::Rule { .. }) && new_depth >= 0 {
                new_depth += 1;
            }

            self.closure(
                c,
                configs,
                busy,
                continue_collecting,
                full_ctx,
                new_depth,
                treat_eof_as_epsilon,
            );
        }
    }

    fn epsilon_target(
        &mut self,
        config: &AtnConfig,
        transition: &Transition,
        collect_predicates: bool,
        in_context: bool,
        full_ctx: bool,
        treat_eof_as_epsilon: bool,
    ) -> Option<AtnConfig> {
        match transition {
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

            Transition::Precedence { target, precedence } => {
                if collect_predicates && in_context {
                    if full_ctx {
                        // evaluate from the decision entry point
                        let current = self.input.index();
                        self.input.seek(self.start_index);
                        let passes = self.host.precpred(*precedence);
                        self.input.seek(current);
                        passes.then(|| config.transition_to(*target))
                    } else {
                        let pred = SemanticContext::Precedence {
                            precedence: *precedence,
                        };
                        let sem = SemanticContext::and(&config.semantic_context, &pred);
                        Some(config.with_semantic_context(*target, sem))
                    }
                } else {
                    Some(config.transition_to(*target))
                }
            }

            Transition::Predicate {
                target,
                rule_index,
                pred_index,
                is_ctx_dependent,
            } => {
                if collect_predicates && (!is_ctx_dependent || in_context) {
                    if full_ctx {
                        let current = self.input.index();
                        self.input.seek(self.start_index);
                        let passes = self.host.sempred(*rule_index, *pred_index);
                        self.input.seek(current);
                        passes.then(|| config.transition_to(*target))
                    } else {
                        let pred = SemanticContext::Predicate {
                            rule_index: *rule_index,
                            pred_index: *pred_index,
                            is_ctx_dependent: *is_ctx_dependent,
                        };
                        let sem = SemanticContext::and(&config.semantic_context, &pred);
                        Some(config.with_semantic_context(*target, sem))
                    }
                } else {
                    Some(config.transition_to(*target))
                }
            }

            Transition::Action { target, .. } | Transition::Epsilon { target } => {
                Some(config.transition_to(*target))
            }

            // EOF edges become traversable once the real EOF arrives
            Transition::Atom { .. }
            | Transition::Range { .. }
            | Transition::Set { .. }
            | Transition::NotSet { .. }
            | Transition::Wildcard { .. } => {
                if treat_eof_as_epsilon && transition.matches(TOKEN_EOF, 0, 1) {
                    Some(config.transition_to(transition.target()))
                } else {
                    None
                }
            }
        }
    }

    // ----- predicated accept states ---------------------------------------

    /// Collect each conflicting alternative's predicate into DFA accept
    /// payload. `None` when no alternative carries a real predicate.
    fn predicate_dfa_state(
        &self,
        configs: &AtnConfigSet,
        n_alts: usize,
    ) -> Option<Vec<PredPrediction>> {
        let ambig_alts = match (&configs.unique_alt, &configs.conflicting_alts) {
            (Some(alt), _) => vec![*alt],
            (None, Some(conflicting)) => conflicting.clone(),
            (None, None) => configs.alts(),
        };

        let mut alt_to_pred: Vec<Option<SemanticContext>> = vec![None; n_alts + 1];
        for config in configs.configs() {
            if ambig_alts.contains(&config.alt) {
                let merged = match &alt_to_pred[config.alt] {
                    None => config.semantic_context.clone(),
                    Some(existing) => SemanticContext::or(existing, &config.semantic_context),
                };
                alt_to_pred[config.alt] = Some(merged);
            }
        }

        let n_pred_alts = alt_to_pred
            .iter()
            .flatten()
            .filter(|p| !matches!(p, SemanticContext::None))
            .count();
        if n_pred_alts == 0 {
            return None;
        }

        let mut pairs = Vec::new();
        for (alt, pred) in alt_to_pred.iter().enumerate().skip(1) {
            if ambig_alts.contains(&alt) {
                pairs.push(PredPrediction {
                    pred: pred.clone().unwrap_or(SemanticContext::None),
                    alt,
                });
            }
        }
        Some(pairs)
    }

    /// Alternatives whose predicate evaluates true, in order.
    fn eval_semantic_contexts(&mut self, predicates: &[PredPrediction]) -> Vec<usize> {
        let mut alts = Vec::new();
        for pair in predicates {
            if matches!(pair.pred, SemanticContext::None) {
                alts.push(pair.alt);
                continue;
            }
            if pair.pred.eval(&mut *self.host) {
                alts.push(pair.alt);
            }
        }
        alts
    }

    // ----- failures -------------------------------------------------------

    fn no_viable_alt(&mut self, dead_end: &Arc<DfaState>) -> RecognitionError {
        self.no_viable_alt_from(&dead_end.configs)
    }

    fn no_viable_alt_from(&mut self, configs: &AtnConfigSet) -> RecognitionError {
        RecognitionError::NoViableAlt {
            decision: self.dfa.decision,
            offending_state: self.dfa.atn_start_state,
            start_token: self.input.get(self.start_index),
            offending_token: self.input.lt(1).expect("lookahead exists"),
            dead_end_configs: Arc::new(configs.clone()),
        }
    }

    fn add_dfa_state(&mut self, mut configs: AtnConfigSet) -> Arc<DfaState> {
        configs.optimize_contexts(self.context_cache);
        self.dfa.add_state(DfaState::new(configs))
    }
}

// ---------------------------------------------------------------------------
// conflict analysis
// ---------------------------------------------------------------------------

/// The single alternative all configurations agree on, if any.
pub fn get_unique_alt(configs: &AtnConfigSet) -> Option<usize> {
    let mut alt = None;
    for config in configs.configs() {
        match alt {
            None => alt = Some(config.alt),
            Some(a) if a != config.alt => return None,
            _ => {}
        }
    }
    alt
}

/// Alternatives grouped by `(state, context)`: a group with several alts
/// is a genuine prediction conflict under the current context mode.
fn conflicting_alt_subsets(configs: &AtnConfigSet) -> Vec<BTreeSet<usize>> {
    let mut groups: IndexGroups = HashMap::new();
    for config in configs.configs() {
        groups
            .entry((config.state, CtxKey(Arc::clone(&config.context))))
            .or_default()
            .insert(config.alt);
    }
    groups.into_values().collect()
}

type IndexGroups = HashMap<(usize, CtxKey), BTreeSet<usize>>;

fn union_of_subsets(subsets: &[BTreeSet<usize>]) -> Vec<usize> {
    let mut all = BTreeSet::new();
    for subset in subsets {
        all.extend(subset.iter().copied());
    }
    all.into_iter().collect()
}

/// Every alternative still viable in the set.
fn get_conflicting_alts(configs: &AtnConfigSet) -> Vec<usize> {
    union_of_subsets(&conflicting_alt_subsets(configs))
}

fn all_subsets_conflict(subsets: &[BTreeSet<usize>]) -> bool {
    subsets.iter().all(|s| s.len() > 1)
}

fn all_subsets_equal(subsets: &[BTreeSet<usize>]) -> bool {
    subsets.windows(2).all(|w| w[0] == w[1])
}

/// Each conflicting group resolves to its lowest alt; when every group
/// agrees on the same one, prediction can stop with that alt.
fn resolves_to_just_one_viable_alt(subsets: &[BTreeSet<usize>]) -> Option<usize> {
    let mut viable = BTreeSet::new();
    for subset in subsets {
        viable.insert(*subset.first()?);
        if viable.len() > 1 {
            return None;
        }
    }
    viable.into_iter().next()
}

/// SLL termination test: stop consuming lookahead when everything is at a
/// rule stop (nothing left to consume), or when a conflict exists and no
/// state pins a single alternative.
fn has_sll_conflict_terminating_prediction(atn: &Atn, configs: &AtnConfigSet) -> bool {
    if all_configs_in_rule_stop_states(atn, configs) {
        return true;
    }
    let subsets = conflicting_alt_subsets(configs);
    let has_conflict = subsets.iter().any(|s| s.len() > 1);
    has_conflict && !has_state_associated_with_one_alt(configs)
}

fn has_state_associated_with_one_alt(configs: &AtnConfigSet) -> bool {
    let mut state_to_alts: HashMap<usize, BTreeSet<usize>> = HashMap::new();
    for config in configs.configs() {
        state_to_alts
            .entry(config.state)
            .or_default()
            .insert(config.alt);
    }
    state_to_alts.values().any(|alts| alts.len() == 1)
}

fn has_config_in_rule_stop_state(atn: &Atn, configs: &AtnConfigSet) -> bool {
    configs
        .configs()
        .iter()
        .any(|c| atn.state(c.state).kind == StateKind::RuleStop)
}

fn all_configs_in_rule_stop_states(atn: &Atn, configs: &AtnConfigSet) -> bool {
    configs
        .configs()
        .iter()
        .all(|c| atn.state(c.state).kind == StateKind::RuleStop)
}
