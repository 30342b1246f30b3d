//! ATN configurations.

use std::hash::{Hash, Hasher};

use allstar_core::murmur;

use crate::context::{Ctx, contexts_equal};
use crate::semantic::SemanticContext;

/// One simulated point of progress: an ATN state, the alternative being
/// tried, the simulated call stack, and any predicates collected on the
/// way. Lexer configurations additionally track the pending lexer action
/// and whether the path crossed a non-greedy decision.
#[derive(Clone, Debug)]
pub struct AtnConfig {
    pub state: usize,
    pub alt: usize,
    pub context: Ctx,
    pub semantic_context: SemanticContext,
    /// How many times closure fell off the end of the decision rule into
    /// the caller. Not part of identity.
    pub reaches_into_outer_context: u32,
    /// Set while closing a precedence decision; keeps the config out of
    /// the precedence filter. Not part of identity.
    pub precedence_filter_suppressed: bool,
    pub lexer_action_index: Option<usize>,
    pub passed_through_non_greedy: bool,
}

impl AtnConfig {
    pub fn new(state: usize, alt: usize, context: Ctx) -> Self {
        Self {
            state,
            alt,
            context,
            semantic_context: SemanticContext::None,
            reaches_into_outer_context: 0,
            precedence_filter_suppressed: false,
            lexer_action_index: None,
            passed_through_non_greedy: false,
        }
    }

    /// Derive a config at a new state, keeping everything else.
    pub fn transition_to(&self, state: usize) -> Self {
        Self {
            state,
            ..self.clone()
        }
    }

    pub fn with_context(&self, state: usize, context: Ctx) -> Self {
        Self {
            state,
            context,
            ..self.clone()
        }
    }

    pub fn with_semantic_context(&self, state: usize, semantic_context: SemanticContext) -> Self {
        Self {
            state,
            semantic_context,
            ..self.clone()
        }
    }

    /// Content hash over the identifying fields.
    pub fn hash_value(&self) -> u32 {
        let mut h = murmur::initialize(murmur::DEFAULT_SEED);
        h = murmur::update(h, self.state as u32);
        h = murmur::update(h, self.alt as u32);
        h = murmur::update(h, self.context.hash_value());
        h = murmur::update(h, self.semantic_context.hash_value());
        h = murmur::update(h, self.lexer_action_index.map_or(u32::MAX, |i| i as u32));
        h = murmur::update(h, self.passed_through_non_greedy as u32);
        murmur::finish(h, 6)
    }
}

// Identity ignores `reaches_into_outer_context` and the precedence filter
// flag.
impl PartialEq for AtnConfig {
    fn eq(&self, other: &Self) -> bool {
        self.state == other.state
            && self.alt == other.alt
            && self.semantic_context == other.semantic_context
            && self.lexer_action_index == other.lexer_action_index
            && self.passed_through_non_greedy == other.passed_through_non_greedy
            && contexts_equal(&self.context, &other.context)
    }
}

impl Eq for AtnConfig {}

impl Hash for AtnConfig {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_u32(self.hash_value());
    }
}
