//! ATN states.
//!
//! The source formalism models state kinds as a class hierarchy; here a
//! state is one flat struct tagged by [`StateKind`], with the few
//! kind-specific fields carried as optionals. Dispatch in prediction and
//! closure is a `match` on the kind.

use crate::transition::Transition;

/// What role a state plays in the network.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum StateKind {
    Basic,
    RuleStart,
    /// Start of a plain `(...)` block with more than one alternative.
    BlockStart,
    /// Start of the inner block of a `(...)*` loop.
    StarBlockStart,
    /// Start of the inner block of a `(...)+` loop.
    PlusBlockStart,
    BlockEnd,
    /// Decision between iterating a `*` loop and leaving it.
    StarLoopEntry,
    StarLoopBack,
    /// Decision between iterating a `+` loop and leaving it.
    PlusLoopBack,
    LoopEnd,
    RuleStop,
    /// Start state of a lexer mode.
    TokenStart,
}

impl StateKind {
    /// States owning a lookahead decision.
    pub fn is_decision(self) -> bool {
        matches!(
            self,
            StateKind::BlockStart
                | StateKind::StarBlockStart
                | StateKind::PlusBlockStart
                | StateKind::StarLoopEntry
                | StateKind::PlusLoopBack
                | StateKind::TokenStart
        )
    }

    /// Block-entry states eligible for single-token-deletion sync.
    pub fn is_block_start(self) -> bool {
        matches!(
            self,
            StateKind::BlockStart | StateKind::StarBlockStart | StateKind::PlusBlockStart
        )
    }
}

/// One node of the ATN graph.
#[derive(Clone, Debug)]
pub struct AtnState {
    /// Index of this state in [`crate::Atn::states`].
    pub number: usize,
    pub kind: StateKind,
    /// Rule this state belongs to.
    pub rule_index: usize,
    /// Decision number, for decision states wired into a DFA.
    pub decision: Option<usize>,
    /// Non-greedy loop decision (lexer `*?` / `+?`).
    pub non_greedy: bool,
    /// Rule-start flag for rules rewritten from left recursion.
    pub left_recursive: bool,
    /// Star-loop-entry flag for the loop of a left-recursive rule.
    pub precedence_decision: bool,
    /// Block starts link to their block end; loop ends and plus block
    /// starts link to their loop-back state.
    pub companion: Option<usize>,
    pub transitions: Vec<Transition>,
}

impl AtnState {
    pub fn new(number: usize, kind: StateKind, rule_index: usize) -> Self {
        Self {
            number,
            kind,
            rule_index,
            decision: None,
            non_greedy: false,
            left_recursive: false,
            precedence_decision: false,
            companion: None,
            transitions: Vec::new(),
        }
    }

    #[inline]
    pub fn is_decision(&self) -> bool {
        self.kind.is_decision()
    }

    /// True when the state has transitions and every one is zero-width.
    /// A state with no transitions (an unreferenced rule's stop state)
    /// counts as consuming so closure keeps its configurations.
    pub fn only_epsilon_transitions(&self) -> bool {
        !self.transitions.is_empty() && self.transitions.iter().all(Transition::is_epsilon)
    }
}
