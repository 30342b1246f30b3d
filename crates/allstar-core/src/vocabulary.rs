//! Token-type name lookup for messages and set rendering.

use crate::token::TOKEN_EOF;

/// Literal and symbolic names for a grammar's token types.
///
/// Index 0 is the invalid type; user token types start at 1. The display
/// name of a type prefers its literal (`"'+'"`), then its symbolic
/// (`"PLUS"`), then the bare numeric type.
#[derive(Clone, Debug, Default)]
pub struct Vocabulary {
    literal: Vec<Option<String>>,
    symbolic: Vec<Option<String>>,
}

impl Vocabulary {
    pub fn new(literal: Vec<Option<String>>, symbolic: Vec<Option<String>>) -> Self {
        Self { literal, symbolic }
    }

    /// Build from parallel name slices, treating `""` as absent.
    pub fn from_names(literal: &[&str], symbolic: &[&str]) -> Self {
        let opt = |s: &&str| {
            if s.is_empty() {
                None
            } else {
                Some((*s).to_owned())
            }
        };
        Self {
            literal: literal.iter().map(opt).collect(),
            symbolic: symbolic.iter().map(opt).collect(),
        }
    }

    /// Highest token type with a name.
    pub fn max_token_type(&self) -> i32 {
        self.literal.len().max(self.symbolic.len()) as i32 - 1
    }

    pub fn literal_name(&self, token_type: i32) -> Option<&str> {
        name_at(&self.literal, token_type)
    }

    pub fn symbolic_name(&self, token_type: i32) -> Option<&str> {
        if token_type == TOKEN_EOF {
            return Some("EOF");
        }
        name_at(&self.symbolic, token_type)
    }

    /// Name used in diagnostics.
    pub fn display_name(&self, token_type: i32) -> String {
        if token_type == TOKEN_EOF {
            return "<EOF>".to_owned();
        }
        self.literal_name(token_type)
            .or_else(|| self.symbolic_name(token_type))
            .map(str::to_owned)
            .unwrap_or_else(|| token_type.to_string())
    }
}

fn name_at(names: &[Option<String>], token_type: i32) -> Option<&str> {
    if token_type < 0 {
        return None;
    }
    names.get(token_type as usize).and_then(|n| n.as_deref())
}
