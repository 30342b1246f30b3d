//! ATN transitions.

use allstar_core::IntervalSet;

/// An edge of the ATN graph.
///
/// Every variant carries its target state. Zero-width variants
/// (everything except `Atom`/`Range`/`Set`/`NotSet`/`Wildcard`) are
/// epsilon for prediction purposes; predicates and actions gate or
/// annotate the edge without consuming input.
#[derive(Clone, Debug, PartialEq)]
pub enum Transition {
    Epsilon {
        target: usize,
    },
    Atom {
        target: usize,
        label: i32,
    },
    Range {
        target: usize,
        from: i32,
        to: i32,
    },
    Set {
        target: usize,
        set: IntervalSet,
    },
    NotSet {
        target: usize,
        set: IntervalSet,
    },
    Wildcard {
        target: usize,
    },
    /// Rule invocation. `target` is the called rule's start state;
    /// control resumes at `follow_state` after the rule returns.
    Rule {
        target: usize,
        follow_state: usize,
        rule_index: usize,
        precedence: i32,
    },
    Predicate {
        target: usize,
        rule_index: usize,
        pred_index: usize,
        is_ctx_dependent: bool,
    },
    Action {
        target: usize,
        rule_index: usize,
        action_index: usize,
        is_ctx_dependent: bool,
    },
    /// Precedence predicate of a left-recursive rule loop.
    Precedence {
        target: usize,
        precedence: i32,
    },
}

impl Transition {
    #[inline]
    pub fn target(&self) -> usize {
        match *self {
            Transition::Epsilon { target }
            | Transition::Atom { target, .. }
            | Transition::Range { target, .. }
            | Transition::Set { target, .. }
            | Transition::NotSet { target, .. }
            | Transition::Wildcard { target }
            | Transition::Rule { target, .. }
            | Transition::Predicate { target, .. }
            | Transition::Action { target, .. }
            | Transition::Precedence { target, .. } => target,
        }
    }

    /// Zero-width edge.
    #[inline]
    pub fn is_epsilon(&self) -> bool {
        !matches!(
            self,
            Transition::Atom { .. }
                | Transition::Range { .. }
                | Transition::Set { .. }
                | Transition::NotSet { .. }
                | Transition::Wildcard { .. }
        )
    }

    /// Does this edge consume `symbol`? `min_label..max_label` bound the
    /// wildcard and complement universes.
    pub fn matches(&self, symbol: i32, min_label: i32, max_label: i32) -> bool {
        match self {
            Transition::Atom { label, .. } => *label == symbol,
            Transition::Range { from, to, .. } => *from <= symbol && symbol <= *to,
            Transition::Set { set, .. } => set.contains(symbol),
            Transition::NotSet { set, .. } => {
                symbol >= min_label && symbol <= max_label && !set.contains(symbol)
            }
            Transition::Wildcard { .. } => symbol >= min_label && symbol <= max_label,
            _ => false,
        }
    }

    /// The consumed label set of a terminal edge, `None` for epsilon kinds.
    pub fn label(&self) -> Option<IntervalSet> {
        match self {
            Transition::Atom { label, .. } => Some(IntervalSet::of(*label)),
            Transition::Range { from, to, .. } => Some(IntervalSet::of_range(*from, *to)),
            Transition::Set { set, .. } | Transition::NotSet { set, .. } => Some(set.clone()),
            _ => None,
        }
    }
}
