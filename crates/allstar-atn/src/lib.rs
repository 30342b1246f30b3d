#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

//! Augmented transition network (ATN) model for the allstar grammar runtime.
//!
//! This crate contains:
//! - Tagged-variant ATN states and transitions
//! - The immutable [`Atn`] graph with lazily cached FIRST sets
//! - Lexer action variants executed on token acceptance
//! - The serialized ATN wire format (writer and validating reader)
//!
//! The grammar-to-ATN compiler is an external collaborator; it produces the
//! u16 word stream this crate loads.

pub mod atn;
pub mod lexer_action;
pub mod serialized;
pub mod state;
pub mod transition;

#[cfg(test)]
mod atn_tests;

// Re-export commonly used items at crate root
pub use atn::{Atn, GrammarType};
pub use lexer_action::LexerAction;
pub use serialized::{AtnFormatError, FORMAT_MAGIC, FORMAT_VERSION, deserialize_atn, serialize_atn};
pub use state::{AtnState, StateKind};
pub use transition::Transition;
