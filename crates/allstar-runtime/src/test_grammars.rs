//! Hand-assembled grammars shared by the runtime tests.
//!
//! Each builder produces the ATN a grammar compiler would emit for the
//! grammar quoted in its doc comment, wired with [`Atn::wire_rule_returns`]
//! the way the deserializer does it.

use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;

use allstar_atn::{Atn, GrammarType, LexerAction, StateKind, Transition};
use allstar_core::{CHANNEL_HIDDEN, IntervalSet, Vocabulary};

use crate::char_stream::InputStream;
use crate::error_listener::ErrorListener;
use crate::errors::RecognitionError;
use crate::lexer::Lexer;
use crate::parser::Parser;
use crate::token_stream::CommonTokenStream;

pub(crate) const TOK_A: i32 = 1;
pub(crate) const TOK_B: i32 = 2;
pub(crate) const TOK_X: i32 = 3;
pub(crate) const TOK_WS: i32 = 4;

pub(crate) const TOK_PLUS: i32 = 1;
pub(crate) const TOK_INT: i32 = 2;

/// Lexer grammar:
///
/// ```text
/// A : 'a' ;  B : 'b' ;  X : 'x' ;  WS : [ \t] -> channel(HIDDEN) ;
/// ```
pub(crate) fn ab_lexer_atn() -> Arc<Atn> {
    let mut atn = Atn::new(GrammarType::Lexer, 4);
    let mode0 = atn.add_state(StateKind::TokenStart, 0);

    let mut rule = |atn: &mut Atn, rule_index: usize, label: Transition| {
        let start = atn.add_state(StateKind::RuleStart, rule_index);
        let mid = atn.add_state(StateKind::Basic, rule_index);
        let stop = atn.add_state(StateKind::RuleStop, rule_index);
        atn.states[start].transitions.push(match label {
            Transition::Atom { label, .. } => Transition::Atom { target: mid, label },
            Transition::Set { set, .. } => Transition::Set { target: mid, set },
            other => other,
        });
        atn.states[mid].transitions.push(Transition::Epsilon { target: stop });
        atn.rule_to_start_state.push(start);
        atn.rule_to_stop_state.push(stop);
        start
    };

    let a = rule(&mut atn, 0, Transition::Atom { target: 0, label: 'a' as i32 });
    let b = rule(&mut atn, 1, Transition::Atom { target: 0, label: 'b' as i32 });
    let x = rule(&mut atn, 2, Transition::Atom { target: 0, label: 'x' as i32 });
    let mut ws_set = IntervalSet::new();
    ws_set.add(' ' as i32);
    ws_set.add('\t' as i32);
    let ws = rule(&mut atn, 3, Transition::Set { target: 0, set: ws_set });

    for start in [a, b, x, ws] {
        atn.states[mode0].transitions.push(Transition::Epsilon { target: start });
    }
    atn.mode_to_start_state = vec![mode0];
    atn.rule_to_token_type = vec![TOK_A, TOK_B, TOK_X, TOK_WS];
    atn.rule_to_action_index = vec![None, None, None, Some(0)];
    atn.lexer_actions = vec![LexerAction::Channel(CHANNEL_HIDDEN)];
    atn.add_decision(mode0);
    atn.wire_rule_returns();
    Arc::new(atn)
}

pub(crate) fn ab_vocabulary() -> Vocabulary {
    Vocabulary::from_names(&["", "'a'", "'b'", "'x'", ""], &["", "A", "B", "X", "WS"])
}

/// Parser grammar:
///
/// ```text
/// s : A B ;
/// ```
pub(crate) fn ab_parser_atn() -> Arc<Atn> {
    let mut atn = Atn::new(GrammarType::Parser, 4);
    let s_start = atn.add_state(StateKind::RuleStart, 0);
    let after_a = atn.add_state(StateKind::Basic, 0);
    let after_b = atn.add_state(StateKind::Basic, 0);
    let first = atn.add_state(StateKind::Basic, 0);
    let s_stop = atn.add_state(StateKind::RuleStop, 0);

    atn.states[s_start].transitions.push(Transition::Epsilon { target: first });
    atn.states[first]
        .transitions
        .push(Transition::Atom { target: after_a, label: TOK_A });
    atn.states[after_a]
        .transitions
        .push(Transition::Atom { target: after_b, label: TOK_B });
    atn.states[after_b]
        .transitions
        .push(Transition::Epsilon { target: s_stop });

    atn.rule_to_start_state = vec![s_start];
    atn.rule_to_stop_state = vec![s_stop];
    atn.wire_rule_returns();
    Arc::new(atn)
}

/// Parser grammar with two identical alternatives:
///
/// ```text
/// s : A B | A B ;
/// ```
pub(crate) fn ambiguous_parser_atn() -> Arc<Atn> {
    let mut atn = Atn::new(GrammarType::Parser, 4);
    let s_start = atn.add_state(StateKind::RuleStart, 0);
    let block_start = atn.add_state(StateKind::BlockStart, 0);
    let alt1_first = atn.add_state(StateKind::Basic, 0);
    let alt1_mid = atn.add_state(StateKind::Basic, 0);
    let alt2_first = atn.add_state(StateKind::Basic, 0);
    let alt2_mid = atn.add_state(StateKind::Basic, 0);
    let block_end = atn.add_state(StateKind::BlockEnd, 0);
    let s_stop = atn.add_state(StateKind::RuleStop, 0);

    atn.states[s_start].transitions.push(Transition::Epsilon { target: block_start });
    atn.states[block_start].transitions.push(Transition::Epsilon { target: alt1_first });
    atn.states[block_start].transitions.push(Transition::Epsilon { target: alt2_first });
    atn.states[alt1_first]
        .transitions
        .push(Transition::Atom { target: alt1_mid, label: TOK_A });
    atn.states[alt1_mid]
        .transitions
        .push(Transition::Atom { target: block_end, label: TOK_B });
    atn.states[alt2_first]
        .transitions
        .push(Transition::Atom { target: alt2_mid, label: TOK_A });
    atn.states[alt2_mid]
        .transitions
        .push(Transition::Atom { target: block_end, label: TOK_B });
    atn.states[block_end].transitions.push(Transition::Epsilon { target: s_stop });
    atn.states[block_start].companion = Some(block_end);

    atn.rule_to_start_state = vec![s_start];
    atn.rule_to_stop_state = vec![s_stop];
    atn.add_decision(block_start);
    atn.wire_rule_returns();
    Arc::new(atn)
}

/// Lexer grammar for expressions:
///
/// ```text
/// PLUS : '+' ;  INT : [0-9]+ ;
/// ```
pub(crate) fn expr_lexer_atn() -> Arc<Atn> {
    let mut atn = Atn::new(GrammarType::Lexer, 2);
    let mode0 = atn.add_state(StateKind::TokenStart, 0);

    let plus_start = atn.add_state(StateKind::RuleStart, 0);
    let plus_mid = atn.add_state(StateKind::Basic, 0);
    let plus_stop = atn.add_state(StateKind::RuleStop, 0);
    atn.states[plus_start]
        .transitions
        .push(Transition::Atom { target: plus_mid, label: '+' as i32 });
    atn.states[plus_mid].transitions.push(Transition::Epsilon { target: plus_stop });

    let int_start = atn.add_state(StateKind::RuleStart, 1);
    let int_digit = atn.add_state(StateKind::Basic, 1);
    let int_stop = atn.add_state(StateKind::RuleStop, 1);
    atn.states[int_start].transitions.push(Transition::Range {
        target: int_digit,
        from: '0' as i32,
        to: '9' as i32,
    });
    // loop for more digits, or finish
    atn.states[int_digit].transitions.push(Transition::Range {
        target: int_digit,
        from: '0' as i32,
        to: '9' as i32,
    });
    atn.states[int_digit].transitions.push(Transition::Epsilon { target: int_stop });

    atn.states[mode0].transitions.push(Transition::Epsilon { target: plus_start });
    atn.states[mode0].transitions.push(Transition::Epsilon { target: int_start });
    atn.mode_to_start_state = vec![mode0];
    atn.rule_to_start_state = vec![plus_start, int_start];
    atn.rule_to_stop_state = vec![plus_stop, int_stop];
    atn.rule_to_token_type = vec![TOK_PLUS, TOK_INT];
    atn.rule_to_action_index = vec![None, None];
    atn.add_decision(mode0);
    atn.wire_rule_returns();
    Arc::new(atn)
}

pub(crate) fn expr_vocabulary() -> Vocabulary {
    Vocabulary::from_names(&["", "'+'", ""], &["", "PLUS", "INT"])
}

/// Parser grammar with a left-recursive rule, in its rewritten form:
///
/// ```text
/// s : e ;
/// e : e '+' e | INT ;          // rewritten to
/// e[p] : INT ( {2 >= p}? '+' e[3] )* ;
/// ```
pub(crate) fn expr_parser_atn() -> Arc<Atn> {
    let mut atn = Atn::new(GrammarType::Parser, 2);

    // rule s
    let s_start = atn.add_state(StateKind::RuleStart, 0);
    let s_call = atn.add_state(StateKind::Basic, 0);
    let s_after = atn.add_state(StateKind::Basic, 0);
    let s_stop = atn.add_state(StateKind::RuleStop, 0);

    // rule e (left-recursive)
    let e_start = atn.add_state(StateKind::RuleStart, 1);
    let primary = atn.add_state(StateKind::Basic, 1);
    let loop_entry = atn.add_state(StateKind::StarLoopEntry, 1);
    let star_block = atn.add_state(StateKind::StarBlockStart, 1);
    let pred_ok = atn.add_state(StateKind::Basic, 1);
    let op_done = atn.add_state(StateKind::Basic, 1);
    let block_end = atn.add_state(StateKind::BlockEnd, 1);
    let loop_back = atn.add_state(StateKind::StarLoopBack, 1);
    let loop_end = atn.add_state(StateKind::LoopEnd, 1);
    let e_stop = atn.add_state(StateKind::RuleStop, 1);

    atn.states[s_start].transitions.push(Transition::Epsilon { target: s_call });
    atn.states[s_call].transitions.push(Transition::Rule {
        target: e_start,
        follow_state: s_after,
        rule_index: 1,
        precedence: 0,
    });
    atn.states[s_after].transitions.push(Transition::Epsilon { target: s_stop });

    atn.states[e_start].left_recursive = true;
    atn.states[e_start].transitions.push(Transition::Epsilon { target: primary });
    atn.states[primary]
        .transitions
        .push(Transition::Atom { target: loop_entry, label: TOK_INT });

    atn.states[loop_entry].precedence_decision = true;
    atn.states[loop_entry].companion = Some(loop_back);
    atn.states[loop_entry].transitions.push(Transition::Epsilon { target: star_block });
    atn.states[loop_entry].transitions.push(Transition::Epsilon { target: loop_end });

    atn.states[star_block].companion = Some(block_end);
    atn.states[star_block]
        .transitions
        .push(Transition::Precedence { target: pred_ok, precedence: 2 });
    atn.states[pred_ok]
        .transitions
        .push(Transition::Atom { target: op_done, label: TOK_PLUS });
    atn.states[op_done].transitions.push(Transition::Rule {
        target: e_start,
        follow_state: block_end,
        rule_index: 1,
        precedence: 3,
    });
    atn.states[block_end].transitions.push(Transition::Epsilon { target: loop_back });
    atn.states[loop_back].transitions.push(Transition::Epsilon { target: loop_entry });
    atn.states[loop_end].companion = Some(loop_back);
    atn.states[loop_end].transitions.push(Transition::Epsilon { target: e_stop });

    atn.rule_to_start_state = vec![s_start, e_start];
    atn.rule_to_stop_state = vec![s_stop, e_stop];
    atn.add_decision(loop_entry);
    atn.wire_rule_returns();
    Arc::new(atn)
}

// ---------------------------------------------------------------------------
// drivers and listeners
// ---------------------------------------------------------------------------

/// Captures listener callbacks as readable lines the tests assert on.
#[derive(Default)]
pub(crate) struct RecordingListener {
    pub log: Rc<RefCell<Vec<String>>>,
}

impl RecordingListener {
    pub fn new() -> (Self, Rc<RefCell<Vec<String>>>) {
        let log = Rc::new(RefCell::new(Vec::new()));
        (
            Self {
                log: Rc::clone(&log),
            },
            log,
        )
    }
}

impl ErrorListener for RecordingListener {
    fn syntax_error(
        &mut self,
        _offending_symbol: Option<&Rc<allstar_core::Token>>,
        line: usize,
        column: usize,
        msg: &str,
        _error: Option<&RecognitionError>,
    ) {
        self.log
            .borrow_mut()
            .push(format!("line {line}:{column} {msg}"));
    }

    fn report_ambiguity(
        &mut self,
        decision: usize,
        _start_index: usize,
        _stop_index: usize,
        exact: bool,
        ambig_alts: &[usize],
    ) {
        self.log
            .borrow_mut()
            .push(format!("ambiguity d={decision} alts={ambig_alts:?} exact={exact}"));
    }

    fn report_attempting_full_context(
        &mut self,
        decision: usize,
        _conflicting_alts: &[usize],
        _start_index: usize,
        _stop_index: usize,
    ) {
        self.log
            .borrow_mut()
            .push(format!("full-context d={decision}"));
    }

    fn report_context_sensitivity(
        &mut self,
        decision: usize,
        prediction: usize,
        _start_index: usize,
        _stop_index: usize,
    ) {
        self.log
            .borrow_mut()
            .push(format!("context-sensitive d={decision} alt={prediction}"));
    }
}

/// Lex `input` with the a/b grammar and wrap it in a parser for
/// `parser_atn`, recording diagnostics.
pub(crate) fn ab_parser(
    parser_atn: Arc<Atn>,
    input: &str,
) -> (Parser, Rc<RefCell<Vec<String>>>) {
    let lexer = Lexer::new(
        ab_lexer_atn(),
        vec!["A".into(), "B".into(), "X".into(), "WS".into()],
        ab_vocabulary(),
        Box::new(InputStream::new(input)),
    );
    let stream = CommonTokenStream::new(Box::new(lexer));
    let mut parser = Parser::new(
        parser_atn,
        vec!["s".into()],
        ab_vocabulary(),
        Box::new(stream),
    );
    let (listener, log) = RecordingListener::new();
    parser.recognizer.remove_error_listeners();
    parser.recognizer.add_error_listener(Box::new(listener));
    (parser, log)
}

/// Lex `input` with the expression grammar and wrap it in a parser.
pub(crate) fn expr_parser(input: &str) -> (Parser, Rc<RefCell<Vec<String>>>) {
    let lexer = Lexer::new(
        expr_lexer_atn(),
        vec!["PLUS".into(), "INT".into()],
        expr_vocabulary(),
        Box::new(InputStream::new(input)),
    );
    let stream = CommonTokenStream::new(Box::new(lexer));
    let mut parser = Parser::new(
        expr_parser_atn(),
        vec!["s".into(), "e".into()],
        expr_vocabulary(),
        Box::new(stream),
    );
    let (listener, log) = RecordingListener::new();
    parser.recognizer.remove_error_listeners();
    parser.recognizer.add_error_listener(Box::new(listener));
    (parser, log)
}
