//! Tests for token display and vocabulary lookup.

use std::rc::Rc;

use crate::token::{CHANNEL_DEFAULT, CommonTokenFactory, TOKEN_EOF, Token, TokenFactory};
use crate::vocabulary::Vocabulary;

fn token(token_type: i32, text: &str) -> Token {
    Token {
        token_type,
        channel: CHANNEL_DEFAULT,
        text: Some(text.to_owned()),
        line: 1,
        column: 0,
        token_index: -1,
        start: 0,
        stop: 0,
        source_name: None,
    }
}

#[test]
fn error_display_quotes_and_escapes() {
    assert_eq!(token(1, "a").error_display(), "'a'");
    assert_eq!(token(1, "a\nb").error_display(), "'a\\nb'");
}

#[test]
fn error_display_eof_is_bare() {
    assert_eq!(token(TOKEN_EOF, "<EOF>").error_display(), "<EOF>");
}

#[test]
fn error_display_falls_back_to_type() {
    let mut t = token(7, "");
    t.text = None;
    assert_eq!(t.error_display(), "'<7>'");
}

#[test]
fn factory_creates_unindexed_tokens() {
    let t = CommonTokenFactory.create(
        3,
        Some("ab".to_owned()),
        CHANNEL_DEFAULT,
        0,
        1,
        1,
        0,
        Some(Rc::from("mem")),
    );
    assert_eq!(t.token_type, 3);
    assert_eq!(t.token_index, -1);
    assert_eq!(t.text(), "ab");
}

#[test]
fn vocabulary_display_name_preference() {
    let v = Vocabulary::from_names(&["", "'a'", ""], &["", "A", "WS"]);
    assert_eq!(v.display_name(1), "'a'");
    assert_eq!(v.display_name(2), "WS");
    assert_eq!(v.display_name(9), "9");
    assert_eq!(v.display_name(TOKEN_EOF), "<EOF>");
    assert_eq!(v.symbolic_name(TOKEN_EOF), Some("EOF"));
    assert_eq!(v.literal_name(1), Some("'a'"));
    assert_eq!(v.max_token_type(), 2);
}
