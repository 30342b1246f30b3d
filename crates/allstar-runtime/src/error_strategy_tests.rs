//! Direct tests of the recovery strategy, including the loop-breaker.

use std::rc::Rc;
use std::sync::Arc;

use allstar_atn::{Atn, GrammarType, StateKind, Transition};
use allstar_core::{CHANNEL_DEFAULT, IntervalSet, Token, Vocabulary};

use crate::error_strategy::{DefaultErrorStrategy, ErrorStrategy};
use crate::errors::RecognitionError;
use crate::parser::Parser;
use crate::test_grammars::{RecordingListener, TOK_X, ab_parser, ab_parser_atn, ambiguous_parser_atn};
use crate::token_source::ListTokenSource;
use crate::token_stream::CommonTokenStream;
use crate::tree::{ParseTree, RuleNode, to_string_tree};

const TOK_A: i32 = 1;

/// Grammar whose recovery set inside `t` is `{X}`:
///
/// ```text
/// s : t X ;
/// t : A ;
/// ```
fn nested_atn() -> (Arc<Atn>, usize, usize) {
    let mut atn = Atn::new(GrammarType::Parser, 3);
    let s_start = atn.add_state(StateKind::RuleStart, 0);
    let s_call = atn.add_state(StateKind::Basic, 0);
    let s_after = atn.add_state(StateKind::Basic, 0);
    let s_end = atn.add_state(StateKind::Basic, 0);
    let s_stop = atn.add_state(StateKind::RuleStop, 0);
    let t_start = atn.add_state(StateKind::RuleStart, 1);
    let t_mid = atn.add_state(StateKind::Basic, 1);
    let t_stop = atn.add_state(StateKind::RuleStop, 1);

    atn.states[s_start].transitions.push(Transition::Epsilon { target: s_call });
    atn.states[s_call].transitions.push(Transition::Rule {
        target: t_start,
        follow_state: s_after,
        rule_index: 1,
        precedence: 0,
    });
    atn.states[s_after]
        .transitions
        .push(Transition::Atom { target: s_end, label: TOK_X });
    atn.states[s_end].transitions.push(Transition::Epsilon { target: s_stop });
    atn.states[t_start]
        .transitions
        .push(Transition::Atom { target: t_mid, label: TOK_A });
    atn.states[t_mid].transitions.push(Transition::Epsilon { target: t_stop });

    atn.rule_to_start_state = vec![s_start, t_start];
    atn.rule_to_stop_state = vec![s_stop, t_stop];
    atn.wire_rule_returns();
    (Arc::new(atn), s_call, t_start)
}

fn token(token_type: i32, text: &str) -> Rc<Token> {
    Rc::new(Token {
        token_type,
        channel: CHANNEL_DEFAULT,
        text: Some(text.to_owned()),
        line: 1,
        column: 0,
        token_index: -1,
        start: 0,
        stop: 0,
        source_name: None,
    })
}

fn nested_parser(tokens: Vec<Rc<Token>>) -> (Parser, usize, usize) {
    let (atn, s_call, t_start) = nested_atn();
    let stream = CommonTokenStream::new(Box::new(ListTokenSource::new(tokens)));
    let mut parser = Parser::new(
        atn,
        vec!["s".into(), "t".into()],
        Vocabulary::from_names(&["", "'a'", "", "'x'"], &["", "A", "B", "X"]),
        Box::new(stream),
    );
    let (listener, _log) = RecordingListener::new();
    parser.recognizer.remove_error_listeners();
    parser.recognizer.add_error_listener(Box::new(listener));
    (parser, s_call, t_start)
}

/// Put the parser inside rule `t`, as if `s` had invoked it.
fn enter_nested_rule(parser: &mut Parser, s_call: usize, t_start: usize) {
    let s_ctx = RuleNode::new(0, -1);
    parser.enter_rule(s_ctx, parser.atn().rule_to_start_state[0]);
    let t_ctx = RuleNode::new(1, s_call as isize);
    parser.enter_rule(t_ctx, t_start);
}

fn dummy_error(parser: &mut Parser) -> RecognitionError {
    RecognitionError::InputMismatch {
        offending_state: parser.state(),
        offending_token: parser.current_token(),
        expected: IntervalSet::of(TOK_A),
    }
}

#[test]
fn recovery_set_is_the_follow_of_the_invocation_stack() {
    let (mut parser, s_call, t_start) =
        nested_parser(vec![token(TOK_X, "x")]);
    enter_nested_rule(&mut parser, s_call, t_start);

    // inside t the parser wants A; the recovery set (follow of the
    // invocation stack) is {X}
    let expected = parser.expected_tokens();
    assert!(expected.contains(TOK_A));
    let error = dummy_error(&mut parser);
    let mut strategy = DefaultErrorStrategy::new();
    strategy.recover(&mut parser, &error);
    // lookahead X is already in the recovery set: nothing consumed yet
    assert_eq!(parser.input_index(), 0);
}

#[test]
fn repeated_recovery_at_same_position_forces_progress() {
    let (mut parser, s_call, t_start) =
        nested_parser(vec![token(TOK_X, "x"), token(TOK_X, "x"), token(TOK_A, "a")]);
    enter_nested_rule(&mut parser, s_call, t_start);

    let error = dummy_error(&mut parser);
    let mut strategy = DefaultErrorStrategy::new();

    strategy.recover(&mut parser, &error);
    assert_eq!(parser.input_index(), 0, "first recovery consumes nothing");

    // same (input index, state): the loop-breaker must consume a token
    strategy.recover(&mut parser, &error);
    assert_eq!(parser.input_index(), 1);
}

#[test]
fn recovery_consumes_to_the_follow_set() {
    let (mut parser, s_call, t_start) = nested_parser(vec![
        token(2, "junk"),
        token(2, "junk"),
        token(TOK_X, "x"),
    ]);
    enter_nested_rule(&mut parser, s_call, t_start);

    let error = dummy_error(&mut parser);
    let mut strategy = DefaultErrorStrategy::new();
    strategy.recover(&mut parser, &error);
    assert_eq!(parser.la(1), TOK_X, "consumed up to the follow set");
    assert_eq!(parser.input_index(), 2);
}

#[test]
fn sync_deletes_a_token_at_a_block_start() {
    // ambiguous grammar has a decision block; an 'x' before 'ab' is
    // extraneous and deletable at the decision sync point
    let (mut parser, log) = ab_parser(ambiguous_parser_atn(), "xab");
    let root = parser.parse(0);
    assert_eq!(to_string_tree(&ParseTree::Rule(root), &["s"]), "(s a b)");
    assert_eq!(parser.syntax_error_count(), 1);
    assert!(
        log.borrow()
            .iter()
            .any(|l| l == "line 1:0 extraneous input 'x' expecting 'a'"),
        "{:?}",
        log.borrow()
    );
}

#[test]
fn reporting_is_suppressed_inside_a_recovery_window() {
    // two consecutive junk tokens produce one report, not two
    let (mut parser, log) = ab_parser(ab_parser_atn(), "axxb");
    let root = parser.parse(0);
    let _ = root;
    assert_eq!(parser.syntax_error_count(), 1, "{:?}", log.borrow());
}
