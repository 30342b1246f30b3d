//! Token data and the token factory.

use std::fmt;
use std::rc::Rc;

/// Token type of the synthetic end-of-file token.
pub const TOKEN_EOF: i32 = -1;
/// Zero-width transition label; never a real token type.
pub const TOKEN_EPSILON: i32 = -2;
/// Token type reserved for "no type assigned yet".
pub const TOKEN_INVALID_TYPE: i32 = 0;
/// Smallest token type a grammar may assign.
pub const TOKEN_MIN_USER_TYPE: i32 = 1;

/// Channel the parser reads by default.
pub const CHANNEL_DEFAULT: usize = 0;
/// Channel for tokens the parser should skip (whitespace, comments).
pub const CHANNEL_HIDDEN: usize = 1;

/// A lexed (or fabricated) token.
///
/// `token_index` is -1 until the token is buffered by a token stream;
/// `start`/`stop` are inclusive character-stream indices. Fabricated
/// tokens (error recovery) use `start > stop`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Token {
    pub token_type: i32,
    pub channel: usize,
    pub text: Option<String>,
    pub line: usize,
    pub column: usize,
    pub token_index: isize,
    pub start: usize,
    pub stop: usize,
    /// Name of the character source this token came from.
    pub source_name: Option<Rc<str>>,
}

impl Token {
    /// Token text, or `""` when none was captured.
    pub fn text(&self) -> &str {
        self.text.as_deref().unwrap_or("")
    }

    /// Text as shown in error messages: quoted, with whitespace escaped;
    /// `<EOF>` for the end-of-file token.
    pub fn error_display(&self) -> String {
        if self.token_type == TOKEN_EOF {
            return "<EOF>".to_owned();
        }
        let text = match &self.text {
            Some(t) if !t.is_empty() => escape_ws(t),
            _ => format!("<{}>", self.token_type),
        };
        format!("'{text}'")
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[@{},{}:{}='{}',<{}>,{}:{}]",
            self.token_index,
            self.start,
            self.stop,
            escape_ws(self.text()),
            self.token_type,
            self.line,
            self.column
        )
    }
}

fn escape_ws(s: &str) -> String {
    s.replace('\n', "\\n").replace('\r', "\\r").replace('\t', "\\t")
}

/// Creates tokens for a lexer or for error recovery.
pub trait TokenFactory {
    /// Create a token. `text` of `None` means "derive from the stream
    /// slice `start..=stop`" and is resolved by the caller that owns the
    /// character stream.
    #[allow(clippy::too_many_arguments)]
    fn create(
        &self,
        token_type: i32,
        text: Option<String>,
        channel: usize,
        start: usize,
        stop: usize,
        line: usize,
        column: usize,
        source_name: Option<Rc<str>>,
    ) -> Rc<Token>;
}

/// Default factory; captures the provided text verbatim.
#[derive(Debug, Default, Clone, Copy)]
pub struct CommonTokenFactory;

impl TokenFactory for CommonTokenFactory {
    fn create(
        &self,
        token_type: i32,
        text: Option<String>,
        channel: usize,
        start: usize,
        stop: usize,
        line: usize,
        column: usize,
        source_name: Option<Rc<str>>,
    ) -> Rc<Token> {
        Rc::new(Token {
            token_type,
            channel,
            text,
            line,
            column,
            token_index: -1,
            start,
            stop,
            source_name,
        })
    }
}
