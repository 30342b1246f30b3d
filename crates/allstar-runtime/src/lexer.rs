//! The lexer driver: turns a character stream into tokens.
//!
//! Table-driven over the loaded ATN: no generated subclass is required.
//! The driver owns the mode stack and the per-token flags the lexer
//! actions manipulate (`skip`, `more`, type and channel overrides) and
//! delegates matching to [`LexerAtnSimulator`].

use std::rc::Rc;
use std::sync::Arc;

use allstar_atn::{Atn, GrammarType, LexerAction};
use allstar_core::{
    CHANNEL_DEFAULT, CommonTokenFactory, TOKEN_EOF, TOKEN_INVALID_TYPE, Token, TokenFactory,
    Vocabulary,
};

use crate::char_stream::CharStream;
use crate::errors::RecognitionError;
use crate::lexer_sim::{LexerAtnSimulator, LexerMatchOutcome};
use crate::recognizer::Recognizer;
use crate::token_source::TokenSource;

/// The default lexer mode.
pub const DEFAULT_MODE: usize = 0;

/// Sentinel meaning "emit the rule's own token type".
const TYPE_PENDING: i32 = TOKEN_INVALID_TYPE;

/// A running lexer over one character stream.
pub struct Lexer {
    pub recognizer: Recognizer,
    atn: Arc<Atn>,
    sim: LexerAtnSimulator,
    input: Box<dyn CharStream>,
    factory: CommonTokenFactory,
    source_name: Rc<str>,

    mode: usize,
    mode_stack: Vec<usize>,

    // per-token state
    token_start_index: usize,
    token_start_line: usize,
    token_start_column: usize,
    token_type: i32,
    channel: usize,
    text_override: Option<String>,
    hit_eof: bool,
}

enum ActionOutcome {
    Emit,
    Skip,
    More,
}

impl Lexer {
    pub fn new(
        atn: Arc<Atn>,
        rule_names: Vec<String>,
        vocabulary: Vocabulary,
        input: Box<dyn CharStream>,
    ) -> Self {
        let sim = LexerAtnSimulator::new(Arc::clone(&atn));
        Self::with_simulator(atn, rule_names, vocabulary, input, sim)
    }

    /// Build with an existing simulator (for sharing mode DFAs across
    /// lexers of the same grammar).
    pub fn with_simulator(
        atn: Arc<Atn>,
        rule_names: Vec<String>,
        vocabulary: Vocabulary,
        input: Box<dyn CharStream>,
        sim: LexerAtnSimulator,
    ) -> Self {
        assert_eq!(atn.grammar_type, GrammarType::Lexer, "parser ATN given to a lexer");
        let source_name: Rc<str> = Rc::from(input.source_name());
        Self {
            recognizer: Recognizer::new(rule_names, vocabulary),
            atn,
            sim,
            input,
            factory: CommonTokenFactory,
            source_name,
            mode: DEFAULT_MODE,
            mode_stack: Vec::new(),
            token_start_index: 0,
            token_start_line: 1,
            token_start_column: 0,
            token_type: TYPE_PENDING,
            channel: CHANNEL_DEFAULT,
            text_override: None,
            hit_eof: false,
        }
    }

    pub fn atn(&self) -> &Arc<Atn> {
        &self.atn
    }

    pub fn simulator(&self) -> &LexerAtnSimulator {
        &self.sim
    }

    pub fn mode(&self) -> usize {
        self.mode
    }

    pub fn set_mode(&mut self, mode: usize) {
        assert!(mode < self.atn.mode_to_start_state.len(), "unknown mode {mode}");
        self.mode = mode;
    }

    pub fn push_mode(&mut self, mode: usize) {
        self.mode_stack.push(self.mode);
        self.set_mode(mode);
    }

    pub fn pop_mode(&mut self) {
        let mode = self
            .mode_stack
            .pop()
            .expect("popMode with an empty mode stack");
        self.mode = mode;
    }

    /// Tokenise the remaining input.
    pub fn all_tokens(&mut self) -> Vec<Rc<Token>> {
        let mut tokens = Vec::new();
        loop {
            let token = self.next_token();
            let done = token.token_type == TOKEN_EOF;
            tokens.push(token);
            if done {
                return tokens;
            }
        }
    }

    fn next_token_inner(&mut self) -> Rc<Token> {
        loop {
            if self.hit_eof {
                return self.emit_eof();
            }

            // start a fresh token
            self.token_start_index = self.input.index();
            self.token_start_line = self.sim.line;
            self.token_start_column = self.sim.column;
            self.token_type = TYPE_PENDING;
            self.channel = CHANNEL_DEFAULT;
            self.text_override = None;

            // inner loop: `more` keeps accumulating into the same token
            let emit = loop {
                match self.sim.match_rule(self.input.as_mut(), self.mode) {
                    Ok(LexerMatchOutcome::Eof) => {
                        self.hit_eof = true;
                        break None;
                    }
                    Ok(LexerMatchOutcome::Matched(matched)) => {
                        if self.input.la(1) == TOKEN_EOF {
                            self.hit_eof = true;
                        }
                        if self.token_type == TYPE_PENDING {
                            self.token_type = self.atn.rule_to_token_type[matched.rule_index];
                        }
                        match self.run_action(matched.action_index) {
                            ActionOutcome::More => {
                                self.token_type = TYPE_PENDING;
                                continue;
                            }
                            ActionOutcome::Skip => break Some(false),
                            ActionOutcome::Emit => break Some(true),
                        }
                    }
                    Err(error) => {
                        self.notify_no_viable_alt(&error);
                        self.recover();
                        break Some(false); // skip the bad character
                    }
                }
            };

            match emit {
                None => return self.emit_eof(),
                Some(true) => return self.emit(),
                Some(false) => continue, // skipped; next token
            }
        }
    }

    fn run_action(&mut self, action_index: Option<usize>) -> ActionOutcome {
        let Some(index) = action_index else {
            return ActionOutcome::Emit;
        };
        match self.atn.lexer_actions[index] {
            LexerAction::Skip => ActionOutcome::Skip,
            LexerAction::More => ActionOutcome::More,
            LexerAction::Type(t) => {
                self.token_type = t;
                ActionOutcome::Emit
            }
            LexerAction::Channel(c) => {
                self.channel = c;
                ActionOutcome::Emit
            }
            LexerAction::Mode(m) => {
                self.set_mode(m);
                ActionOutcome::Emit
            }
            LexerAction::PushMode(m) => {
                self.push_mode(m);
                ActionOutcome::Emit
            }
            LexerAction::PopMode => {
                self.pop_mode();
                ActionOutcome::Emit
            }
            // custom actions belong to generated subclasses; the
            // table-driven driver has nothing to run
            LexerAction::Custom { .. } => ActionOutcome::Emit,
        }
    }

    fn emit(&mut self) -> Rc<Token> {
        let stop = self.input.index().saturating_sub(1);
        let text = match self.text_override.take() {
            Some(text) => text,
            None => self.input.text(self.token_start_index, stop),
        };
        self.factory.create(
            self.token_type,
            Some(text),
            self.channel,
            self.token_start_index,
            stop,
            self.token_start_line,
            self.token_start_column,
            Some(Rc::clone(&self.source_name)),
        )
    }

    fn emit_eof(&mut self) -> Rc<Token> {
        let index = self.input.index();
        self.factory.create(
            TOKEN_EOF,
            Some("<EOF>".to_owned()),
            CHANNEL_DEFAULT,
            index,
            index.saturating_sub(1),
            self.sim.line,
            self.sim.column,
            Some(Rc::clone(&self.source_name)),
        )
    }

    /// Report, then skip one character so lexing can resume.
    fn notify_no_viable_alt(&mut self, error: &RecognitionError) {
        let start = match error {
            RecognitionError::LexerNoViableAlt { start_index, .. } => *start_index,
            _ => self.token_start_index,
        };
        let bad_text = self
            .input
            .text(start, self.input.index().max(start));
        let msg = format!("token recognition error at: '{}'", escape_ws(&bad_text));
        let (line, column) = (self.token_start_line, self.token_start_column);
        self.recognizer
            .notify_error_listeners(None, line, column, &msg, Some(error));
    }

    /// Rewind to the token start and skip exactly one character.
    fn recover(&mut self) {
        self.input.seek(self.token_start_index);
        self.sim.line = self.token_start_line;
        self.sim.column = self.token_start_column;
        if self.input.la(1) != TOKEN_EOF {
            self.sim_consume_one();
        } else {
            self.hit_eof = true;
        }
    }

    fn sim_consume_one(&mut self) {
        if self.input.la(1) == '\n' as i32 {
            self.sim.line += 1;
            self.sim.column = 0;
        } else {
            self.sim.column += 1;
        }
        self.input.consume();
    }

    /// Override the text of the token being produced.
    pub fn set_text(&mut self, text: String) {
        self.text_override = Some(text);
    }
}

impl TokenSource for Lexer {
    fn next_token(&mut self) -> Rc<Token> {
        self.next_token_inner()
    }

    fn line(&self) -> usize {
        self.sim.line
    }

    fn column(&self) -> usize {
        self.sim.column
    }

    fn source_name(&self) -> String {
        self.source_name.to_string()
    }
}

fn escape_ws(s: &str) -> String {
    s.replace('\n', "\\n").replace('\r', "\\r").replace('\t', "\\t")
}
