//! Buffered, channel-filtered token stream.
//!
//! Tokens are materialised lazily from the source and never discarded, so
//! `mark`/`release` are no-ops and `seek` is random access. The stream
//! presents only tokens on its configured channel; `lt`/`la`/`lb` skip
//! off-channel tokens in either direction.

use std::rc::Rc;

use allstar_core::{CHANNEL_DEFAULT, TOKEN_EOF, Token};

use crate::token_source::TokenSource;

/// Parser-facing view of a token sequence.
pub trait TokenStream {
    /// Token `k` ahead (`k >= 1`) or behind (`k <= -1`) on the stream's
    /// channel. `k == 0` is undefined and yields `None`.
    fn lt(&mut self, k: isize) -> Option<Rc<Token>>;

    /// `lt(k)`'s token type; EOF past the end.
    fn la(&mut self, k: isize) -> i32 {
        self.lt(k).map_or(TOKEN_EOF, |t| t.token_type)
    }

    /// Buffered token by absolute index.
    fn get(&mut self, index: usize) -> Rc<Token>;

    fn consume(&mut self);
    fn index(&mut self) -> usize;
    fn seek(&mut self, index: usize);

    /// The whole stream is buffered; markers are vacuous.
    fn mark(&mut self) -> isize {
        0
    }
    fn release(&mut self, _marker: isize) {}

    /// Total token count (forces a full fill).
    fn size(&mut self) -> usize;

    /// Raw text covered by the inclusive token-index range.
    fn text_between(&mut self, start: &Token, stop: &Token) -> String;

    fn source_name(&self) -> String;
}

/// The standard buffered stream over one channel.
pub struct CommonTokenStream {
    source: Box<dyn TokenSource>,
    channel: usize,
    tokens: Vec<Rc<Token>>,
    /// Index of the current token; only valid after the first fill.
    p: usize,
    initialized: bool,
    fetched_eof: bool,
}

impl CommonTokenStream {
    pub fn new(source: Box<dyn TokenSource>) -> Self {
        Self::with_channel(source, CHANNEL_DEFAULT)
    }

    pub fn with_channel(source: Box<dyn TokenSource>, channel: usize) -> Self {
        Self {
            source,
            channel,
            tokens: Vec::new(),
            p: 0,
            initialized: false,
            fetched_eof: false,
        }
    }

    /// All buffered tokens (off-channel included).
    pub fn tokens(&self) -> &[Rc<Token>] {
        &self.tokens
    }

    /// Buffer everything up to and including EOF.
    pub fn fill(&mut self) {
        self.lazy_init();
        while !self.fetched_eof {
            self.fetch(64);
        }
    }

    fn lazy_init(&mut self) {
        if !self.initialized {
            self.initialized = true;
            self.sync(0);
            self.p = self.next_token_on_channel(0);
        }
    }

    /// Make sure `tokens[i]` exists if the source can still provide it.
    fn sync(&mut self, i: usize) -> bool {
        while self.tokens.len() <= i && !self.fetched_eof {
            self.fetch(i - self.tokens.len() + 1);
        }
        i < self.tokens.len()
    }

    fn fetch(&mut self, n: usize) -> usize {
        if self.fetched_eof {
            return 0;
        }
        for fetched in 0..n {
            let token = self.source.next_token();
            // the stream owns token indices
            let mut owned = (*token).clone();
            owned.token_index = self.tokens.len() as isize;
            let is_eof = owned.token_type == TOKEN_EOF;
            self.tokens.push(Rc::new(owned));
            if is_eof {
                self.fetched_eof = true;
                return fetched + 1;
            }
        }
        n
    }

    /// Index of the next on-channel token at or after `i`. When none
    /// exists, this is the EOF token's index, never an invalid position.
    fn next_token_on_channel(&mut self, mut i: usize) -> usize {
        loop {
            if !self.sync(i) {
                debug_assert!(self.fetched_eof);
                return self.tokens.len() - 1;
            }
            let token = &self.tokens[i];
            if token.token_type == TOKEN_EOF || token.channel == self.channel {
                return i;
            }
            i += 1;
        }
    }

    fn previous_token_on_channel(&self, mut i: usize, channel: usize) -> Option<usize> {
        loop {
            let token = self.tokens.get(i)?;
            if token.token_type == TOKEN_EOF || token.channel == channel {
                return Some(i);
            }
            i = i.checked_sub(1)?;
        }
    }

    fn lb(&mut self, k: usize) -> Option<Rc<Token>> {
        self.lazy_init();
        if k == 0 || k > self.p {
            return None;
        }
        let mut i = self.p;
        for _ in 0..k {
            i = self.previous_token_on_channel(i.checked_sub(1)?, self.channel)?;
        }
        self.tokens.get(i).cloned()
    }
}

impl TokenStream for CommonTokenStream {
    fn lt(&mut self, k: isize) -> Option<Rc<Token>> {
        self.lazy_init();
        if k == 0 {
            return None;
        }
        if k < 0 {
            return self.lb(k.unsigned_abs());
        }
        let mut i = self.p;
        for _ in 1..k {
            if self.sync(i + 1) {
                i = self.next_token_on_channel(i + 1);
            }
        }
        self.sync(i);
        self.tokens.get(i).cloned()
    }

    fn get(&mut self, index: usize) -> Rc<Token> {
        self.sync(index);
        Rc::clone(&self.tokens[index])
    }

    fn consume(&mut self) {
        self.lazy_init();
        assert!(self.la(1) != TOKEN_EOF, "cannot consume EOF");
        if self.sync(self.p + 1) {
            self.p = self.next_token_on_channel(self.p + 1);
        }
    }

    fn index(&mut self) -> usize {
        self.lazy_init();
        self.p
    }

    fn seek(&mut self, index: usize) {
        self.lazy_init();
        self.sync(index);
        self.p = self.next_token_on_channel(index);
    }

    fn size(&mut self) -> usize {
        self.fill();
        self.tokens.len()
    }

    fn text_between(&mut self, start: &Token, stop: &Token) -> String {
        let (Ok(from), Ok(to)) = (
            usize::try_from(start.token_index),
            usize::try_from(stop.token_index),
        ) else {
            return String::new();
        };
        self.sync(to);
        let to = to.min(self.tokens.len().saturating_sub(1));
        let mut text = String::new();
        for token in &self.tokens[from..=to] {
            if token.token_type == TOKEN_EOF {
                break;
            }
            text.push_str(token.text());
        }
        text
    }

    fn source_name(&self) -> String {
        self.source.source_name()
    }
}
