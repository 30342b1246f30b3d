//! Tests for the buffered, channel-filtered token stream.

use std::rc::Rc;

use allstar_core::{CHANNEL_DEFAULT, CHANNEL_HIDDEN, TOKEN_EOF, Token};

use crate::token_source::ListTokenSource;
use crate::token_stream::{CommonTokenStream, TokenStream};

fn token(token_type: i32, text: &str, channel: usize) -> Rc<Token> {
    Rc::new(Token {
        token_type,
        channel,
        text: Some(text.to_owned()),
        line: 1,
        column: 0,
        token_index: -1,
        start: 0,
        stop: 0,
        source_name: None,
    })
}

/// a <ws> <ws> b, whitespace hidden.
fn hidden_ws_stream() -> CommonTokenStream {
    let tokens = vec![
        token(1, "a", CHANNEL_DEFAULT),
        token(9, " ", CHANNEL_HIDDEN),
        token(9, " ", CHANNEL_HIDDEN),
        token(2, "b", CHANNEL_DEFAULT),
    ];
    CommonTokenStream::new(Box::new(ListTokenSource::new(tokens)))
}

#[test]
fn channel_filtering_skips_hidden_tokens() {
    let mut stream = hidden_ws_stream();
    assert_eq!(stream.lt(1).unwrap().text(), "a");
    assert_eq!(stream.lt(2).unwrap().text(), "b");
    assert_eq!(stream.la(3), TOKEN_EOF);
}

#[test]
fn consume_steps_over_off_channel_tokens() {
    let mut stream = hidden_ws_stream();
    assert_eq!(stream.la(1), 1);
    stream.consume();
    assert_eq!(stream.la(1), 2);
    stream.consume();
    assert_eq!(stream.la(1), TOKEN_EOF);
}

#[test]
fn lb_looks_back_on_channel() {
    let mut stream = hidden_ws_stream();
    stream.consume(); // past 'a'
    stream.consume(); // past 'b', now at EOF
    assert_eq!(stream.lt(-1).unwrap().text(), "b");
    assert_eq!(stream.lt(-2).unwrap().text(), "a");
    assert!(stream.lt(-3).is_none());
}

#[test]
fn seek_snaps_to_next_on_channel_token() {
    let mut stream = hidden_ws_stream();
    stream.seek(1); // index 1 is hidden whitespace
    assert_eq!(stream.lt(1).unwrap().text(), "b");
}

#[test]
fn seek_past_all_on_channel_lands_on_eof() {
    let tokens = vec![
        token(1, "a", CHANNEL_DEFAULT),
        token(9, " ", CHANNEL_HIDDEN),
    ];
    let mut stream = CommonTokenStream::new(Box::new(ListTokenSource::new(tokens)));
    // only hidden tokens (and EOF) at or after index 1
    stream.seek(1);
    assert_eq!(stream.la(1), TOKEN_EOF);
    let eof = stream.lt(1).unwrap();
    assert!(usize::try_from(eof.token_index).is_ok());
}

#[test]
fn token_indices_assigned_in_buffer_order() {
    let mut stream = hidden_ws_stream();
    let size = stream.size();
    assert_eq!(size, 5); // four tokens plus EOF
    for i in 0..size {
        assert_eq!(stream.get(i).token_index, i as isize);
    }
}

#[test]
fn la_at_eof_stays_at_eof() {
    let mut stream = CommonTokenStream::new(Box::new(ListTokenSource::new(Vec::new())));
    assert_eq!(stream.la(1), TOKEN_EOF);
    assert_eq!(stream.la(5), TOKEN_EOF);
}

#[test]
#[should_panic(expected = "cannot consume EOF")]
fn consuming_eof_is_a_contract_violation() {
    let mut stream = CommonTokenStream::new(Box::new(ListTokenSource::new(Vec::new())));
    stream.consume();
}

#[test]
fn mark_and_release_are_no_ops() {
    let mut stream = hidden_ws_stream();
    let marker = stream.mark();
    let index = stream.index();
    stream.consume();
    stream.seek(index);
    stream.release(marker);
    assert_eq!(stream.lt(1).unwrap().text(), "a");
}

#[test]
fn text_between_uses_raw_text() {
    let mut stream = hidden_ws_stream();
    stream.fill();
    let start = stream.get(0);
    let stop = stream.get(3);
    assert_eq!(stream.text_between(&start, &stop), "a  b");
}
