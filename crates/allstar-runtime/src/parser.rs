//! The parser driver.
//!
//! Rule entry/exit, `match`/`consume` against the token stream, and parse
//! tree construction, with decisions delegated to the prediction
//! simulator. Generated subclasses are out of scope, so the driver walks
//! the loaded ATN directly (`parse`): terminals through `match`, rule
//! transitions through rule entry, decision states through
//! `adaptive_predict`, including the recursion-context juggling of
//! left-recursive rules.

use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;

use allstar_atn::{Atn, GrammarType, StateKind, Transition};
use allstar_core::{
    CHANNEL_DEFAULT, CommonTokenFactory, IntervalSet, TOKEN_EOF, TOKEN_MIN_USER_TYPE, Token,
    TokenFactory, Vocabulary,
};

use crate::error_strategy::{DefaultErrorStrategy, ErrorStrategy};
use crate::errors::RecognitionError;
use crate::prediction::{ParserAtnSimulator, PredictionHost};
use crate::recognizer::Recognizer;
use crate::semantic::PredicateEvaluator;
use crate::token_stream::TokenStream;
use crate::tree::{ParseTree, RuleNode, attach_rule_child};

/// Hook type for user predicates (`{...}?`) when driving hand-loaded
/// grammars; absent means every predicate passes.
pub type SempredHook = Box<dyn FnMut(usize, usize) -> bool>;

/// A running parser over one token stream.
pub struct Parser {
    pub recognizer: Recognizer,
    atn: Arc<Atn>,
    interp: Arc<ParserAtnSimulator>,
    input: Box<dyn TokenStream>,
    ctx: Option<Rc<RefCell<RuleNode>>>,
    precedence_stack: Vec<i32>,
    /// `(parent context, invoking state)` per in-flight left-recursive
    /// rule invocation.
    parent_context_stack: Vec<(Option<Rc<RefCell<RuleNode>>>, isize)>,
    error_strategy: Option<Box<dyn ErrorStrategy>>,
    pub build_parse_trees: bool,
    error_recovery_mode: bool,
    syntax_errors: usize,
    sempred_hook: Option<SempredHook>,
    factory: CommonTokenFactory,
}

impl Parser {
    pub fn new(
        atn: Arc<Atn>,
        rule_names: Vec<String>,
        vocabulary: Vocabulary,
        input: Box<dyn TokenStream>,
    ) -> Self {
        let interp = Arc::new(ParserAtnSimulator::new(Arc::clone(&atn)));
        Self::with_simulator(atn, rule_names, vocabulary, input, interp)
    }

    /// Build with a shared simulator so parses of the same grammar share
    /// lookahead DFAs.
    pub fn with_simulator(
        atn: Arc<Atn>,
        rule_names: Vec<String>,
        vocabulary: Vocabulary,
        input: Box<dyn TokenStream>,
        interp: Arc<ParserAtnSimulator>,
    ) -> Self {
        assert_eq!(atn.grammar_type, GrammarType::Parser, "lexer ATN given to a parser");
        Self {
            recognizer: Recognizer::new(rule_names, vocabulary),
            atn,
            interp,
            input,
            ctx: None,
            precedence_stack: vec![0],
            parent_context_stack: Vec::new(),
            error_strategy: Some(Box::new(DefaultErrorStrategy::new())),
            build_parse_trees: true,
            error_recovery_mode: false,
            syntax_errors: 0,
            sempred_hook: None,
            factory: CommonTokenFactory,
        }
    }

    // ----- accessors ------------------------------------------------------

    pub fn atn(&self) -> &Arc<Atn> {
        &self.atn
    }

    pub fn simulator(&self) -> &Arc<ParserAtnSimulator> {
        &self.interp
    }

    pub fn context(&self) -> Option<&Rc<RefCell<RuleNode>>> {
        self.ctx.as_ref()
    }

    pub fn syntax_error_count(&self) -> usize {
        self.syntax_errors
    }

    pub fn input_index(&mut self) -> usize {
        self.input.index()
    }

    pub fn la(&mut self, k: isize) -> i32 {
        self.input.la(k)
    }

    pub fn lt(&mut self, k: isize) -> Option<Rc<Token>> {
        self.input.lt(k)
    }

    pub fn current_token(&mut self) -> Rc<Token> {
        self.input.lt(1).expect("token stream has lookahead")
    }

    /// Raw source text covered by two buffered tokens.
    pub fn text_between(&mut self, start: &Token, stop: &Token) -> String {
        self.input.text_between(start, stop)
    }

    pub fn state(&self) -> usize {
        usize::try_from(self.recognizer.state()).expect("parser has entered a rule")
    }

    pub fn set_sempred_hook(&mut self, hook: SempredHook) {
        self.sempred_hook = Some(hook);
    }

    pub fn in_error_recovery_mode(&self) -> bool {
        self.error_recovery_mode
    }

    pub(crate) fn set_error_recovery_mode(&mut self, on: bool) {
        self.error_recovery_mode = on;
    }

    /// Invoking states of the context chain, innermost first.
    pub fn invocation_stack(&self) -> Vec<usize> {
        match &self.ctx {
            Some(ctx) => RuleNode::invocation_stack(ctx),
            None => Vec::new(),
        }
    }

    // ----- predicates -----------------------------------------------------

    pub fn sempred(&mut self, rule_index: usize, pred_index: usize) -> bool {
        match &mut self.sempred_hook {
            Some(hook) => hook(rule_index, pred_index),
            None => true,
        }
    }

    pub fn precpred(&self, precedence: i32) -> bool {
        precedence >= self.precedence_stack.last().copied().unwrap_or(0)
    }

    // ----- token consumption ----------------------------------------------

    /// Match `token_type` or hand off to inline recovery.
    pub fn match_token(&mut self, token_type: i32) -> Result<Rc<Token>, RecognitionError> {
        let token = self.current_token();
        if token.token_type == token_type {
            self.strategy(|s, p| s.report_match(p));
            self.consume();
            return Ok(token);
        }
        self.recover_inline()
    }

    /// Match any token a set-labelled transition accepts.
    fn match_labelled(&mut self, transition: &Transition) -> Result<Rc<Token>, RecognitionError> {
        let symbol = self.la(1);
        if transition.matches(symbol, TOKEN_MIN_USER_TYPE, self.atn.max_token_type) {
            self.strategy(|s, p| s.report_match(p));
            let token = self.current_token();
            self.consume();
            return Ok(token);
        }
        self.recover_inline()
    }

    fn recover_inline(&mut self) -> Result<Rc<Token>, RecognitionError> {
        let token = self.strategy(|s, p| s.recover_inline(p))?;
        if self.build_parse_trees && token.token_index == -1 {
            // fabricated missing token: record it as an error leaf
            if let Some(ctx) = &self.ctx {
                ctx.borrow_mut().add_error_node(Rc::clone(&token));
            }
        }
        Ok(token)
    }

    /// Advance one token, attaching it to the tree unless it is being
    /// thrown away as part of recovery.
    pub fn consume(&mut self) -> Rc<Token> {
        let token = self.current_token();
        if token.token_type != TOKEN_EOF {
            self.input.consume();
        }
        if self.build_parse_trees && !self.error_recovery_mode {
            if let Some(ctx) = &self.ctx {
                ctx.borrow_mut().add_terminal(Rc::clone(&token));
            }
        }
        token
    }

    /// Consume until `LA(1)` lands in `set` (or EOF).
    pub fn consume_until(&mut self, set: &IntervalSet) {
        let mut t = self.la(1);
        while t != TOKEN_EOF && !set.contains(t) {
            self.consume();
            t = self.la(1);
        }
    }

    // ----- rule entry / exit ----------------------------------------------

    pub fn enter_rule(&mut self, localctx: Rc<RefCell<RuleNode>>, state: usize) {
        self.recognizer.set_state(state);
        localctx.borrow_mut().start = self.input.lt(1);
        if let Some(parent) = &self.ctx {
            if self.build_parse_trees {
                attach_rule_child(parent, &localctx);
            } else {
                localctx.borrow_mut().set_parent(Some(parent));
            }
        }
        self.ctx = Some(localctx);
    }

    pub fn exit_rule(&mut self) {
        let ctx = self.ctx.take().expect("exit_rule outside any rule");
        ctx.borrow_mut().stop = self.input.lt(-1);
        // at the entry rule there is no invoker to resume in
        if let Ok(invoking) = usize::try_from(ctx.borrow().invoking_state) {
            self.recognizer.set_state(invoking);
        }
        self.ctx = ctx.borrow().parent();
    }

    pub fn enter_recursion_rule(
        &mut self,
        localctx: Rc<RefCell<RuleNode>>,
        state: usize,
        precedence: i32,
    ) {
        self.parent_context_stack
            .push((self.ctx.clone(), localctx.borrow().invoking_state));
        self.recognizer.set_state(state);
        self.precedence_stack.push(precedence);
        localctx.borrow_mut().start = self.input.lt(1);
        self.ctx = Some(localctx);
    }

    /// Re-enter the left-recursive rule: the context built so far becomes
    /// the first child of a fresh context for the next operator.
    pub fn push_new_recursion_context(&mut self, localctx: Rc<RefCell<RuleNode>>, state: usize) {
        let previous = self.ctx.take().expect("recursion context exists");
        {
            let mut prev = previous.borrow_mut();
            prev.set_parent(Some(&localctx));
            prev.invoking_state = state as isize;
            prev.stop = self.input.lt(-1);
        }
        localctx.borrow_mut().start = previous.borrow().start.clone();
        if self.build_parse_trees {
            localctx
                .borrow_mut()
                .children
                .push(ParseTree::Rule(previous));
        }
        self.ctx = Some(localctx);
    }

    /// Unwind to the context that invoked the left-recursive rule.
    pub fn unroll_recursion_contexts(&mut self, parent: Option<Rc<RefCell<RuleNode>>>) {
        self.precedence_stack.pop();
        let retctx = self.ctx.take().expect("recursion context exists");
        retctx.borrow_mut().stop = self.input.lt(-1);
        retctx.borrow_mut().set_parent(parent.as_ref());
        if self.build_parse_trees {
            if let Some(parent) = &parent {
                parent.borrow_mut().children.push(ParseTree::Rule(Rc::clone(&retctx)));
            }
        }
        self.ctx = parent;
    }

    // ----- expectations ---------------------------------------------------

    /// Tokens acceptable at the current state given the rule invocation
    /// stack.
    pub fn expected_tokens(&self) -> IntervalSet {
        self.atn
            .next_tokens_in_context(self.state(), self.invocation_stack())
    }

    pub fn is_expected_token(&mut self, symbol: i32) -> bool {
        self.expected_tokens().contains(symbol)
    }

    // ----- diagnostics ----------------------------------------------------

    /// Report a syntax error against `offending` to all listeners.
    pub fn notify_error_listeners(
        &mut self,
        offending: &Rc<Token>,
        msg: &str,
        error: Option<&RecognitionError>,
    ) {
        self.syntax_errors += 1;
        let (line, column) = (offending.line, offending.column);
        self.recognizer
            .notify_error_listeners(Some(offending), line, column, msg, error);
    }

    /// Fabricate a token during recovery.
    pub fn create_token(
        &mut self,
        token_type: i32,
        text: String,
        line: usize,
        column: usize,
        position: usize,
    ) -> Rc<Token> {
        self.factory.create(
            token_type,
            Some(text),
            CHANNEL_DEFAULT,
            position,
            position,
            line,
            column,
            None,
        )
    }

    // ----- prediction -----------------------------------------------------

    pub fn adaptive_predict(&mut self, decision: usize) -> Result<usize, RecognitionError> {
        let ctx = self.ctx.clone();
        let interp = Arc::clone(&self.interp);
        let mut host = ParserHost {
            precedence_stack: &self.precedence_stack,
            sempred_hook: &mut self.sempred_hook,
            recognizer: &mut self.recognizer,
        };
        interp.adaptive_predict(self.input.as_mut(), decision, ctx.as_ref(), &mut host)
    }

    // ----- the ATN-walking interpreter ------------------------------------

    /// Parse `start_rule_index` to completion, returning the root of the
    /// parse tree. Syntax errors are reported and recovered; the tree is
    /// always produced.
    pub fn parse(&mut self, start_rule_index: usize) -> Rc<RefCell<RuleNode>> {
        let start_state = self.atn.rule_to_start_state[start_rule_index];
        let left_recursive_root = self.atn.state(start_state).left_recursive;

        let root = RuleNode::new(start_rule_index, -1);
        if left_recursive_root {
            self.enter_recursion_rule(Rc::clone(&root), start_state, 0);
        } else {
            self.enter_rule(Rc::clone(&root), start_state);
        }

        loop {
            let p = self.state();
            if self.atn.state(p).kind == StateKind::RuleStop {
                let at_root = self
                    .ctx
                    .as_ref()
                    .is_none_or(|ctx| ctx.borrow().invoking_state < 0);
                if at_root {
                    if left_recursive_root {
                        let result = self.ctx.clone().expect("recursion context exists");
                        let (parent, _) =
                            self.parent_context_stack.pop().expect("recursion frame");
                        self.unroll_recursion_contexts(parent);
                        return result;
                    }
                    self.exit_rule();
                    return root;
                }
                self.visit_rule_stop_state(p);
                continue;
            }

            if let Err(error) = self.visit_state(p) {
                let rule = self.atn.state(p).rule_index;
                self.recognizer.set_state(self.atn.rule_to_stop_state[rule]);
                if let Some(ctx) = &self.ctx {
                    ctx.borrow_mut().exception = Some(error.clone());
                }
                self.strategy(|s, parser| {
                    s.report_error(parser, &error);
                    s.recover(parser, &error);
                });
            }
        }
    }

    fn visit_state(&mut self, p: usize) -> Result<(), RecognitionError> {
        let atn = Arc::clone(&self.atn);
        let state = atn.state(p);

        let mut alt = 1;
        if state.transitions.len() > 1 {
            self.strategy(|s, parser| s.sync(parser))?;
            let decision = state.decision.expect("multi-alternative state has a decision");
            alt = self.adaptive_predict(decision)?;
        }

        let transition = &state.transitions[alt - 1];
        match transition {
            Transition::Epsilon { target } => {
                if state.kind == StateKind::StarLoopEntry
                    && state.precedence_decision
                    && atn.state(*target).kind != StateKind::LoopEnd
                {
                    // loop continuation of a left-recursive rule: wrap the
                    // tree built so far in a fresh recursion context
                    let (parent, invoking) = self
                        .parent_context_stack
                        .last()
                        .cloned()
                        .expect("recursion frame");
                    let rule_index = self
                        .ctx
                        .as_ref()
                        .expect("recursion context exists")
                        .borrow()
                        .rule_index;
                    let localctx = RuleNode::new(rule_index, invoking);
                    localctx.borrow_mut().set_parent(parent.as_ref());
                    let restart = atn.rule_to_start_state[state.rule_index];
                    self.push_new_recursion_context(localctx, restart);
                }
            }

            Transition::Atom { label, .. } => {
                self.match_token(*label)?;
            }

            Transition::Range { .. }
            | Transition::Set { .. }
            | Transition::NotSet { .. }
            | Transition::Wildcard { .. } => {
                self.match_labelled(transition)?;
            }

            Transition::Rule {
                target,
                rule_index,
                precedence,
                ..
            } => {
                let localctx = RuleNode::new(*rule_index, p as isize);
                if atn.state(*target).left_recursive {
                    self.enter_recursion_rule(localctx, *target, *precedence);
                } else {
                    self.enter_rule(localctx, *target);
                }
            }

            Transition::Predicate {
                rule_index,
                pred_index,
                ..
            } => {
                if !self.sempred(*rule_index, *pred_index) {
                    return Err(self.failed_predicate(p, *rule_index, *pred_index));
                }
            }

            Transition::Precedence { precedence, .. } => {
                if !self.precpred(*precedence) {
                    return Err(self.failed_predicate(p, state.rule_index, 0));
                }
            }

            // the driver runs no embedded actions
            Transition::Action { .. } => {}
        }

        self.recognizer.set_state(transition.target());
        Ok(())
    }

    fn visit_rule_stop_state(&mut self, p: usize) {
        let rule_index = self.atn.state(p).rule_index;
        let rule_start = self.atn.rule_to_start_state[rule_index];
        if self.atn.state(rule_start).left_recursive {
            let (parent, invoking) = self.parent_context_stack.pop().expect("recursion frame");
            self.unroll_recursion_contexts(parent);
            self.recognizer
                .set_state(usize::try_from(invoking).expect("nested recursion has an invoker"));
        } else {
            self.exit_rule();
        }

        // the invoking state's rule transition tells us where to resume
        let invoking = self.state();
        match self.atn.state(invoking).transitions.first() {
            Some(Transition::Rule { follow_state, .. }) => {
                self.recognizer.set_state(*follow_state);
            }
            _ => panic!("invoking state {invoking} has no rule transition"),
        }
    }

    fn failed_predicate(
        &mut self,
        state: usize,
        rule_index: usize,
        pred_index: usize,
    ) -> RecognitionError {
        RecognitionError::FailedPredicate {
            offending_state: state,
            offending_token: self.current_token(),
            rule_index,
            pred_index,
        }
    }

    /// Run a closure with the error strategy temporarily detached so it
    /// can borrow the parser mutably.
    fn strategy<R>(
        &mut self,
        f: impl FnOnce(&mut Box<dyn ErrorStrategy>, &mut Parser) -> R,
    ) -> R {
        let mut strategy = self.error_strategy.take().expect("error strategy present");
        let result = f(&mut strategy, self);
        self.error_strategy = Some(strategy);
        result
    }
}

/// Borrowed view of the parser pieces prediction needs, so the simulator
/// can run while the parser lends out its token stream.
struct ParserHost<'a> {
    precedence_stack: &'a [i32],
    sempred_hook: &'a mut Option<SempredHook>,
    recognizer: &'a mut Recognizer,
}

impl PredicateEvaluator for ParserHost<'_> {
    fn sempred(&mut self, rule_index: usize, pred_index: usize) -> bool {
        match self.sempred_hook {
            Some(hook) => hook(rule_index, pred_index),
            None => true,
        }
    }

    fn precpred(&self, precedence: i32) -> bool {
        precedence >= self.precedence_stack.last().copied().unwrap_or(0)
    }
}

impl PredictionHost for ParserHost<'_> {
    fn current_precedence(&self) -> i32 {
        self.precedence_stack.last().copied().unwrap_or(0)
    }

    fn report_attempting_full_context(
        &mut self,
        decision: usize,
        conflicting_alts: &[usize],
        start_index: usize,
        stop_index: usize,
    ) {
        for listener in self.recognizer.listeners_mut() {
            listener.report_attempting_full_context(
                decision,
                conflicting_alts,
                start_index,
                stop_index,
            );
        }
    }

    fn report_context_sensitivity(
        &mut self,
        decision: usize,
        prediction: usize,
        start_index: usize,
        stop_index: usize,
    ) {
        for listener in self.recognizer.listeners_mut() {
            listener.report_context_sensitivity(decision, prediction, start_index, stop_index);
        }
    }

    fn report_ambiguity(
        &mut self,
        decision: usize,
        start_index: usize,
        stop_index: usize,
        exact: bool,
        ambig_alts: &[usize],
    ) {
        for listener in self.recognizer.listeners_mut() {
            listener.report_ambiguity(decision, start_index, stop_index, exact, ambig_alts);
        }
    }
}
