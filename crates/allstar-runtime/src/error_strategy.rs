//! Default syntax-error recovery.
//!
//! On a mismatch the strategy first tries the two single-token repairs
//! (delete the extra token when the one behind it fits; fabricate the
//! missing token when the current one fits the state after next).
//! Otherwise it synchronises: consume input until the lookahead is in
//! the follow set of the rule invocation stack. A repeated failure at
//! the same (input index, ATN state) force-consumes one token; without
//! that loop-breaker a recovery set that already contains the lookahead
//! would make no progress and hang the parser.

use std::rc::Rc;
use std::sync::Arc;

use allstar_atn::{StateKind, Transition};
use allstar_core::{IntervalSet, TOKEN_EOF, TOKEN_EPSILON, TOKEN_INVALID_TYPE, Token};

use crate::errors::RecognitionError;
use crate::parser::Parser;

/// How the parser responds to syntax errors.
pub trait ErrorStrategy {
    /// Forget any recovery state (new parse).
    fn reset(&mut self, parser: &mut Parser);

    /// A token matched; ends any error-recovery window.
    fn report_match(&mut self, parser: &mut Parser);

    /// Report `error` to the parser's listeners (suppressed while already
    /// recovering).
    fn report_error(&mut self, parser: &mut Parser, error: &RecognitionError);

    /// Consume input until the parser can plausibly continue.
    fn recover(&mut self, parser: &mut Parser, error: &RecognitionError);

    /// Repair a single-token mismatch in place, or fail with
    /// `InputMismatch`.
    fn recover_inline(&mut self, parser: &mut Parser) -> Result<Rc<Token>, RecognitionError>;

    /// Called at decision points: make sure the lookahead can start an
    /// alternative, deleting one token or erroring out if not.
    fn sync(&mut self, parser: &mut Parser) -> Result<(), RecognitionError>;
}

/// The standard single-token-repair/synchronise strategy.
#[derive(Debug)]
pub struct DefaultErrorStrategy {
    /// Input index of the last recovery, -1 if none.
    last_error_index: isize,
    /// ATN states where recovery already ran at `last_error_index`.
    last_error_states: IntervalSet,
}

impl DefaultErrorStrategy {
    pub fn new() -> Self {
        Self {
            last_error_index: -1,
            last_error_states: IntervalSet::new(),
        }
    }

    fn begin_error_condition(&mut self, parser: &mut Parser) {
        parser.set_error_recovery_mode(true);
    }

    fn end_error_condition(&mut self, parser: &mut Parser) {
        parser.set_error_recovery_mode(false);
        self.last_error_states = IntervalSet::new();
        self.last_error_index = -1;
    }

    fn input_mismatch(&self, parser: &mut Parser) -> RecognitionError {
        RecognitionError::InputMismatch {
            offending_state: parser.state(),
            offending_token: parser.current_token(),
            expected: parser.expected_tokens(),
        }
    }

    /// Delete the current token if the one after it is what the parser
    /// wanted; returns the token that will be matched instead.
    fn single_token_deletion(&mut self, parser: &mut Parser) -> Option<Rc<Token>> {
        let next_token_type = parser.la(2);
        let expected = parser.expected_tokens();
        if !expected.contains(next_token_type) {
            return None;
        }

        self.report_unwanted_token(parser);
        parser.consume(); // drop the extra token
        let matched = parser.current_token();
        self.report_match(parser); // the current token is now correct
        Some(matched)
    }

    /// Can parsing continue as if the expected token were present? True
    /// when the current token fits the state after next.
    fn single_token_insertion(&mut self, parser: &mut Parser) -> bool {
        let current_symbol = parser.la(1);
        let atn = Arc::clone(parser.atn());
        let Some(next) = atn.state(parser.state()).transitions.first().map(Transition::target)
        else {
            return false;
        };
        let expecting_at_ll2 = atn.next_tokens_in_context(next, parser.invocation_stack());
        if expecting_at_ll2.contains(current_symbol) {
            self.report_missing_token(parser);
            return true;
        }
        false
    }

    /// Fabricate the token the parser wanted (the expected set's minimum
    /// element), positioned at the current token.
    fn missing_symbol(&self, parser: &mut Parser) -> Rc<Token> {
        let current = parser.current_token();
        let expected = parser.expected_tokens();
        let expected_type = if expected.is_empty() {
            TOKEN_INVALID_TYPE
        } else {
            expected.min_element()
        };

        let text = if expected_type == TOKEN_EOF {
            "<missing EOF>".to_owned()
        } else {
            let name = parser
                .recognizer
                .vocabulary
                .symbolic_name(expected_type)
                .map(str::to_owned)
                .unwrap_or_else(|| parser.recognizer.vocabulary.display_name(expected_type));
            format!("<missing {name}>")
        };

        // at EOF, anchor the fabricated token to the last real one
        let anchor = if current.token_type == TOKEN_EOF {
            parser.lt(-1).unwrap_or_else(|| Rc::clone(&current))
        } else {
            current
        };
        parser.create_token(expected_type, text, anchor.line, anchor.column, anchor.start)
    }

    fn report_unwanted_token(&mut self, parser: &mut Parser) {
        if parser.in_error_recovery_mode() {
            return;
        }
        self.begin_error_condition(parser);

        let token = parser.current_token();
        let expected = parser.expected_tokens();
        let msg = format!(
            "extraneous input {} expecting {}",
            token.error_display(),
            expected.to_token_string(&parser.recognizer.vocabulary)
        );
        parser.notify_error_listeners(&token, &msg, None);
    }

    fn report_missing_token(&mut self, parser: &mut Parser) {
        if parser.in_error_recovery_mode() {
            return;
        }
        self.begin_error_condition(parser);

        let token = parser.current_token();
        let expected = parser.expected_tokens();
        let msg = format!(
            "missing {} at {}",
            expected.to_token_string(&parser.recognizer.vocabulary),
            token.error_display()
        );
        parser.notify_error_listeners(&token, &msg, None);
    }

    /// Union of FIRST sets of every follow state on the invocation stack:
    /// the tokens some enclosing rule could continue with.
    fn error_recovery_set(&self, parser: &mut Parser) -> IntervalSet {
        let atn = Arc::clone(parser.atn());
        let mut recover_set = IntervalSet::new();
        for invoking_state in parser.invocation_stack() {
            if let Some(Transition::Rule { follow_state, .. }) =
                atn.state(invoking_state).transitions.first()
            {
                recover_set.add_set(&atn.next_tokens(*follow_state));
            }
        }
        recover_set.remove(TOKEN_EPSILON);
        recover_set
    }
}

impl Default for DefaultErrorStrategy {
    fn default() -> Self {
        Self::new()
    }
}

impl ErrorStrategy for DefaultErrorStrategy {
    fn reset(&mut self, parser: &mut Parser) {
        self.end_error_condition(parser);
    }

    fn report_match(&mut self, parser: &mut Parser) {
        self.end_error_condition(parser);
    }

    fn report_error(&mut self, parser: &mut Parser, error: &RecognitionError) {
        // one report per recovery window: stay silent until a token
        // matches again
        if parser.in_error_recovery_mode() {
            return;
        }
        self.begin_error_condition(parser);

        match error {
            RecognitionError::NoViableAlt {
                start_token,
                offending_token,
                ..
            } => {
                let input = if start_token.token_type == TOKEN_EOF {
                    "<EOF>".to_owned()
                } else {
                    parser.text_between(start_token, offending_token)
                };
                let msg = format!("no viable alternative at input '{input}'");
                parser.notify_error_listeners(offending_token, &msg, Some(error));
            }

            RecognitionError::InputMismatch {
                offending_token,
                expected,
                ..
            } => {
                let msg = format!(
                    "mismatched input {} expecting {}",
                    offending_token.error_display(),
                    expected.to_token_string(&parser.recognizer.vocabulary)
                );
                parser.notify_error_listeners(offending_token, &msg, Some(error));
            }

            RecognitionError::FailedPredicate {
                offending_token,
                rule_index,
                ..
            } => {
                let rule_name = parser
                    .recognizer
                    .rule_names
                    .get(*rule_index)
                    .cloned()
                    .unwrap_or_else(|| rule_index.to_string());
                let msg = format!("rule {rule_name} {error}");
                parser.notify_error_listeners(offending_token, &msg, Some(error));
            }

            RecognitionError::LexerNoViableAlt { .. } => {
                let token = parser.current_token();
                parser.notify_error_listeners(&token, &error.to_string(), Some(error));
            }
        }
    }

    fn recover(&mut self, parser: &mut Parser, _error: &RecognitionError) {
        if self.last_error_index == parser.input_index() as isize
            && self.last_error_states.contains(parser.state() as i32)
        {
            // second failure at the same token and state: the recovery
            // set must contain the lookahead, so nothing was consumed.
            // Force one token of progress.
            if parser.la(1) != TOKEN_EOF {
                parser.consume();
            }
        }
        self.last_error_index = parser.input_index() as isize;
        self.last_error_states.add(parser.state() as i32);

        let follow_set = self.error_recovery_set(parser);
        parser.consume_until(&follow_set);
    }

    fn recover_inline(&mut self, parser: &mut Parser) -> Result<Rc<Token>, RecognitionError> {
        // single-token deletion
        if let Some(matched) = self.single_token_deletion(parser) {
            // move past the now-matching token as if nothing happened
            parser.consume();
            return Ok(matched);
        }

        // single-token insertion
        if self.single_token_insertion(parser) {
            return Ok(self.missing_symbol(parser));
        }

        Err(self.input_mismatch(parser))
    }

    fn sync(&mut self, parser: &mut Parser) -> Result<(), RecognitionError> {
        // don't pile repairs on top of an active recovery
        if parser.in_error_recovery_mode() {
            return Ok(());
        }

        let la = parser.la(1);
        let state = parser.state();
        let atn = Arc::clone(parser.atn());

        // cheap subset first
        if atn.next_tokens(state).contains(la) || la == TOKEN_EOF {
            return Ok(());
        }
        if parser.is_expected_token(la) {
            return Ok(());
        }

        match atn.state(state).kind {
            StateKind::BlockStart
            | StateKind::StarBlockStart
            | StateKind::PlusBlockStart
            | StateKind::StarLoopEntry => {
                if self.single_token_deletion(parser).is_some() {
                    return Ok(());
                }
                Err(self.input_mismatch(parser))
            }

            StateKind::PlusLoopBack | StateKind::StarLoopBack => {
                self.report_unwanted_token(parser);
                let expecting = parser.expected_tokens();
                let follow = expecting.or(&self.error_recovery_set(parser));
                parser.consume_until(&follow);
                Ok(())
            }

            // no repair known for other state kinds
            _ => Ok(()),
        }
    }
}
