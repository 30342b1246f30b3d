//! Token sources feeding the buffered token stream.

use std::rc::Rc;

use allstar_core::{CHANNEL_DEFAULT, TOKEN_EOF, Token};

/// Produces the token sequence the stream buffers. The source must emit
/// an EOF token last and keep emitting it if pulled again.
pub trait TokenSource {
    fn next_token(&mut self) -> Rc<Token>;
    fn line(&self) -> usize;
    fn column(&self) -> usize;
    fn source_name(&self) -> String;
}

/// Replays a pre-built token vector; fabricates the trailing EOF if the
/// vector lacks one.
#[derive(Debug, Default)]
pub struct ListTokenSource {
    tokens: Vec<Rc<Token>>,
    p: usize,
    name: String,
}

impl ListTokenSource {
    pub fn new(tokens: Vec<Rc<Token>>) -> Self {
        Self {
            tokens,
            p: 0,
            name: "<list>".to_owned(),
        }
    }
}

impl TokenSource for ListTokenSource {
    fn next_token(&mut self) -> Rc<Token> {
        if let Some(token) = self.tokens.get(self.p) {
            self.p += 1;
            return Rc::clone(token);
        }
        // past the end: synthesize EOF at the position after the last token
        let (line, column, start) = match self.tokens.last() {
            Some(last) => (last.line, last.column + last.text().chars().count(), last.stop + 1),
            None => (1, 0, 0),
        };
        Rc::new(Token {
            token_type: TOKEN_EOF,
            channel: CHANNEL_DEFAULT,
            text: Some("<EOF>".to_owned()),
            line,
            column,
            token_index: -1,
            start,
            stop: start.saturating_sub(1),
            source_name: None,
        })
    }

    fn line(&self) -> usize {
        self.tokens.get(self.p).map_or(1, |t| t.line)
    }

    fn column(&self) -> usize {
        self.tokens.get(self.p).map_or(0, |t| t.column)
    }

    fn source_name(&self) -> String {
        self.name.clone()
    }
}
