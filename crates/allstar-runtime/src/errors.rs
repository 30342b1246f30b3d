//! Recognition failures.
//!
//! One variant enum replaces the source hierarchy's `dynamic_cast` chains;
//! the error strategy dispatches on the variant. These carry enough state
//! for recovery and reporting: the offending token, the ATN state at
//! failure, and (when known) the expected-token set.

use std::rc::Rc;
use std::sync::Arc;

use allstar_core::{IntervalSet, Token};

use crate::config_set::AtnConfigSet;

/// A syntax failure during lexing or parsing. Reported to listeners and
/// then recovered locally; never fatal by itself.
#[derive(Debug, Clone, thiserror::Error)]
pub enum RecognitionError {
    /// Prediction ran out of viable alternatives at a decision.
    #[error("no viable alternative")]
    NoViableAlt {
        decision: usize,
        offending_state: usize,
        /// First token of the failed decision window.
        start_token: Rc<Token>,
        offending_token: Rc<Token>,
        /// Configurations alive when prediction died.
        dead_end_configs: Arc<AtnConfigSet>,
    },

    /// `match` saw a token the current state cannot consume.
    #[error("mismatched input {}", offending_token.error_display())]
    InputMismatch {
        offending_state: usize,
        offending_token: Rc<Token>,
        expected: IntervalSet,
    },

    /// A semantic predicate gated off the only surviving path.
    #[error("failed predicate: {{{rule_index}:{pred_index}}}?")]
    FailedPredicate {
        offending_state: usize,
        offending_token: Rc<Token>,
        rule_index: usize,
        pred_index: usize,
    },

    /// The lexer could not match any rule at `start_index`.
    #[error("no viable character alternative at index {start_index}")]
    LexerNoViableAlt {
        start_index: usize,
        dead_end_configs: Arc<AtnConfigSet>,
    },
}

impl RecognitionError {
    pub fn offending_token(&self) -> Option<&Rc<Token>> {
        match self {
            RecognitionError::NoViableAlt {
                offending_token, ..
            }
            | RecognitionError::InputMismatch {
                offending_token, ..
            }
            | RecognitionError::FailedPredicate {
                offending_token, ..
            } => Some(offending_token),
            RecognitionError::LexerNoViableAlt { .. } => None,
        }
    }

    pub fn offending_state(&self) -> Option<usize> {
        match self {
            RecognitionError::NoViableAlt {
                offending_state, ..
            }
            | RecognitionError::InputMismatch {
                offending_state, ..
            }
            | RecognitionError::FailedPredicate {
                offending_state, ..
            } => Some(*offending_state),
            RecognitionError::LexerNoViableAlt { .. } => None,
        }
    }

    /// Tokens that would have been acceptable, when the failure knows them.
    pub fn expected_tokens(&self) -> Option<&IntervalSet> {
        match self {
            RecognitionError::InputMismatch { expected, .. } => Some(expected),
            _ => None,
        }
    }
}
