//! Diagnostic sinks.
//!
//! Recognizers multiplex every diagnostic to all attached listeners.
//! Listeners receive plain data (positions, decision numbers, alternative
//! sets) rather than live recognizer references, so they can be stored
//! boxed and called during prediction without borrowing the driver.

use std::rc::Rc;

use allstar_core::Token;

use crate::errors::RecognitionError;

/// Sink for syntax errors and prediction diagnostics. All methods have
/// no-op defaults; implement what you observe.
pub trait ErrorListener {
    /// A syntax error at `line:column`. `offending_symbol` is absent for
    /// lexer errors.
    fn syntax_error(
        &mut self,
        offending_symbol: Option<&Rc<Token>>,
        line: usize,
        column: usize,
        msg: &str,
        error: Option<&RecognitionError>,
    ) {
        let _ = (offending_symbol, line, column, msg, error);
    }

    /// Full-context prediction proved the decision ambiguous for
    /// `ambig_alts` over the token window `start_index..=stop_index`.
    fn report_ambiguity(
        &mut self,
        decision: usize,
        start_index: usize,
        stop_index: usize,
        exact: bool,
        ambig_alts: &[usize],
    ) {
        let _ = (decision, start_index, stop_index, exact, ambig_alts);
    }

    /// SLL hit a conflict and prediction is restarting with full context.
    fn report_attempting_full_context(
        &mut self,
        decision: usize,
        conflicting_alts: &[usize],
        start_index: usize,
        stop_index: usize,
    ) {
        let _ = (decision, conflicting_alts, start_index, stop_index);
    }

    /// Full context disambiguated where SLL could not.
    fn report_context_sensitivity(
        &mut self,
        decision: usize,
        prediction: usize,
        start_index: usize,
        stop_index: usize,
    ) {
        let _ = (decision, prediction, start_index, stop_index);
    }
}

/// Writes `line L:C msg` to stderr; ignores prediction diagnostics.
#[derive(Debug, Default)]
pub struct ConsoleErrorListener;

impl ErrorListener for ConsoleErrorListener {
    fn syntax_error(
        &mut self,
        _offending_symbol: Option<&Rc<Token>>,
        line: usize,
        column: usize,
        msg: &str,
        _error: Option<&RecognitionError>,
    ) {
        eprintln!("line {line}:{column} {msg}");
    }
}
