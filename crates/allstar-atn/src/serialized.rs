//! Serialized ATN wire format.
//!
//! A serialized network is a sequence of u16 words:
//!
//! magic, version, grammar type, max token type,
//! state count, states (kind, rule, flags, companion),
//! rule count, rules (start, stop \[, token type, action index\]),
//! mode count, mode start states,
//! set count, sets (interval count, interval pairs),
//! transition count, edges (src, kind, trg, arg1, arg2, arg3),
//! decision count, decision states,
//! lexer action count, actions (kind, data1, data2).
//!
//! Token and label values are stored biased by +2 so EOF (-1) and the
//! epsilon marker (-2) fit in a word; values above 0xFFFD do not fit in
//! this version. Rule-stop return edges are derived on load (one epsilon
//! per rule invocation, stop state to follow state) and never serialized.

use allstar_core::IntervalSet;

use crate::atn::{Atn, GrammarType};
use crate::lexer_action::LexerAction;
use crate::state::{AtnState, StateKind};
use crate::transition::Transition;

pub const FORMAT_MAGIC: u16 = 0xA7E5;
pub const FORMAT_VERSION: u16 = 1;

const NONE: u16 = 0xFFFF;

const FLAG_NON_GREEDY: u16 = 1;
const FLAG_LEFT_RECURSIVE: u16 = 2;
const FLAG_PRECEDENCE_DECISION: u16 = 4;

/// Validation failure while reading a serialized network. Fatal; a
/// network that fails to load is never partially usable.
#[derive(Debug, Clone, thiserror::Error)]
pub enum AtnFormatError {
    #[error("bad magic word {0:#06x} (expected {FORMAT_MAGIC:#06x})")]
    BadMagic(u16),
    #[error("unsupported format version {0} (expected {FORMAT_VERSION})")]
    UnsupportedVersion(u16),
    #[error("truncated data: wanted word {offset}, have {len}")]
    Truncated { offset: usize, len: usize },
    #[error("unknown grammar type {0}")]
    BadGrammarType(u16),
    #[error("unknown state kind {0}")]
    BadStateKind(u16),
    #[error("unknown transition kind {0}")]
    BadTransitionKind(u16),
    #[error("unknown lexer action kind {0}")]
    BadLexerActionKind(u16),
    #[error("{what} index {index} out of range (max {max})")]
    IndexOutOfRange {
        what: &'static str,
        index: usize,
        max: usize,
    },
}

#[inline]
fn encode_value(v: i32) -> u16 {
    debug_assert!((-2..=0xFFFD).contains(&v), "value {v} does not fit the wire format");
    (v + 2) as u16
}

#[inline]
fn decode_value(w: u16) -> i32 {
    w as i32 - 2
}

fn state_kind_code(kind: StateKind) -> u16 {
    match kind {
        StateKind::Basic => 1,
        StateKind::RuleStart => 2,
        StateKind::BlockStart => 3,
        StateKind::StarBlockStart => 4,
        StateKind::PlusBlockStart => 5,
        StateKind::BlockEnd => 6,
        StateKind::StarLoopEntry => 7,
        StateKind::StarLoopBack => 8,
        StateKind::PlusLoopBack => 9,
        StateKind::LoopEnd => 10,
        StateKind::RuleStop => 11,
        StateKind::TokenStart => 12,
    }
}

fn state_kind_from_code(code: u16) -> Result<StateKind, AtnFormatError> {
    Ok(match code {
        1 => StateKind::Basic,
        2 => StateKind::RuleStart,
        3 => StateKind::BlockStart,
        4 => StateKind::StarBlockStart,
        5 => StateKind::PlusBlockStart,
        6 => StateKind::BlockEnd,
        7 => StateKind::StarLoopEntry,
        8 => StateKind::StarLoopBack,
        9 => StateKind::PlusLoopBack,
        10 => StateKind::LoopEnd,
        11 => StateKind::RuleStop,
        12 => StateKind::TokenStart,
        other => return Err(AtnFormatError::BadStateKind(other)),
    })
}

// ---------------------------------------------------------------------------
// Writer
// ---------------------------------------------------------------------------

/// Serialize a network into the u16 wire format.
pub fn serialize_atn(atn: &Atn) -> Vec<u16> {
    let mut out = vec![
        FORMAT_MAGIC,
        FORMAT_VERSION,
        match atn.grammar_type {
            GrammarType::Lexer => 0,
            GrammarType::Parser => 1,
        },
        encode_value(atn.max_token_type),
    ];

    // states
    out.push(atn.states.len() as u16);
    for state in &atn.states {
        let mut flags = 0;
        if state.non_greedy {
            flags |= FLAG_NON_GREEDY;
        }
        if state.left_recursive {
            flags |= FLAG_LEFT_RECURSIVE;
        }
        if state.precedence_decision {
            flags |= FLAG_PRECEDENCE_DECISION;
        }
        out.push(state_kind_code(state.kind));
        out.push(state.rule_index as u16);
        out.push(flags);
        out.push(state.companion.map_or(NONE, |c| c as u16));
    }

    // rules
    out.push(atn.rule_to_start_state.len() as u16);
    for rule in 0..atn.rule_to_start_state.len() {
        out.push(atn.rule_to_start_state[rule] as u16);
        out.push(atn.rule_to_stop_state[rule] as u16);
        if atn.grammar_type == GrammarType::Lexer {
            out.push(encode_value(atn.rule_to_token_type[rule]));
            out.push(atn.rule_to_action_index[rule].map_or(NONE, |a| a as u16));
        }
    }

    // modes
    out.push(atn.mode_to_start_state.len() as u16);
    for &mode_start in &atn.mode_to_start_state {
        out.push(mode_start as u16);
    }

    // set table, deduplicated across transitions
    fn set_index_of<'a>(sets: &mut Vec<&'a IntervalSet>, set: &'a IntervalSet) -> usize {
        match sets.iter().position(|s| **s == *set) {
            Some(i) => i,
            None => {
                sets.push(set);
                sets.len() - 1
            }
        }
    }
    let mut sets: Vec<&IntervalSet> = Vec::new();
    let mut edges: Vec<(usize, &Transition, usize)> = Vec::new();
    for state in &atn.states {
        if state.kind == StateKind::RuleStop {
            continue; // return edges are derived on load
        }
        for t in &state.transitions {
            let set_index = match t {
                Transition::Set { set, .. } | Transition::NotSet { set, .. } => {
                    set_index_of(&mut sets, set)
                }
                _ => 0,
            };
            edges.push((state.number, t, set_index));
        }
    }
    out.push(sets.len() as u16);
    for set in &sets {
        out.push(set.intervals().len() as u16);
        for iv in set.intervals() {
            out.push(encode_value(iv.a));
            out.push(encode_value(iv.b));
        }
    }

    // transitions
    out.push(edges.len() as u16);
    for (src, t, set_index) in edges {
        let (kind, target, a1, a2, a3) = match t {
            Transition::Epsilon { target } => (1, *target, 0, 0, 0),
            Transition::Range { target, from, to } => {
                (2, *target, encode_value(*from), encode_value(*to), 0)
            }
            Transition::Rule {
                target,
                follow_state,
                rule_index,
                precedence,
            } => (
                3,
                *target,
                *rule_index as u16,
                encode_value(*precedence),
                *follow_state as u16,
            ),
            Transition::Predicate {
                target,
                rule_index,
                pred_index,
                is_ctx_dependent,
            } => (
                4,
                *target,
                *rule_index as u16,
                *pred_index as u16,
                *is_ctx_dependent as u16,
            ),
            Transition::Atom { target, label } => (5, *target, encode_value(*label), 0, 0),
            Transition::Action {
                target,
                rule_index,
                action_index,
                is_ctx_dependent,
            } => (
                6,
                *target,
                *rule_index as u16,
                *action_index as u16,
                *is_ctx_dependent as u16,
            ),
            Transition::Set { target, .. } => (7, *target, set_index as u16, 0, 0),
            Transition::NotSet { target, .. } => (8, *target, set_index as u16, 0, 0),
            Transition::Wildcard { target } => (9, *target, 0, 0, 0),
            Transition::Precedence { target, precedence } => {
                (10, *target, encode_value(*precedence), 0, 0)
            }
        };
        out.extend_from_slice(&[src as u16, kind, target as u16, a1, a2, a3]);
    }

    // decisions
    out.push(atn.decision_to_state.len() as u16);
    for &d in &atn.decision_to_state {
        out.push(d as u16);
    }

    // lexer actions
    out.push(atn.lexer_actions.len() as u16);
    for action in &atn.lexer_actions {
        let (kind, d1, d2) = match action {
            LexerAction::Skip => (1, 0, 0),
            LexerAction::More => (2, 0, 0),
            LexerAction::Type(t) => (3, encode_value(*t), 0),
            LexerAction::Channel(c) => (4, *c as u16, 0),
            LexerAction::Mode(m) => (5, *m as u16, 0),
            LexerAction::PushMode(m) => (6, *m as u16, 0),
            LexerAction::PopMode => (7, 0, 0),
            LexerAction::Custom {
                rule_index,
                action_index,
            } => (8, *rule_index as u16, *action_index as u16),
        };
        out.extend_from_slice(&[kind, d1, d2]);
    }

    out
}

// ---------------------------------------------------------------------------
// Reader
// ---------------------------------------------------------------------------

struct Reader<'a> {
    data: &'a [u16],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn take(&mut self) -> Result<u16, AtnFormatError> {
        let w = self
            .data
            .get(self.pos)
            .copied()
            .ok_or(AtnFormatError::Truncated {
                offset: self.pos,
                len: self.data.len(),
            })?;
        self.pos += 1;
        Ok(w)
    }

    fn take_index(&mut self, what: &'static str, max: usize) -> Result<usize, AtnFormatError> {
        let index = self.take()? as usize;
        if index >= max {
            return Err(AtnFormatError::IndexOutOfRange { what, index, max });
        }
        Ok(index)
    }

    fn take_optional_index(
        &mut self,
        what: &'static str,
        max: usize,
    ) -> Result<Option<usize>, AtnFormatError> {
        let w = self.take()?;
        if w == NONE {
            return Ok(None);
        }
        let index = w as usize;
        if index >= max {
            return Err(AtnFormatError::IndexOutOfRange { what, index, max });
        }
        Ok(Some(index))
    }
}

/// Load a network from the u16 wire format, validating indices and kinds.
pub fn deserialize_atn(data: &[u16]) -> Result<Atn, AtnFormatError> {
    let mut r = Reader { data, pos: 0 };

    let magic = r.take()?;
    if magic != FORMAT_MAGIC {
        return Err(AtnFormatError::BadMagic(magic));
    }
    let version = r.take()?;
    if version != FORMAT_VERSION {
        return Err(AtnFormatError::UnsupportedVersion(version));
    }
    let grammar_type = match r.take()? {
        0 => GrammarType::Lexer,
        1 => GrammarType::Parser,
        other => return Err(AtnFormatError::BadGrammarType(other)),
    };
    let max_token_type = decode_value(r.take()?);

    let mut atn = Atn::new(grammar_type, max_token_type);

    // states (companion indices validated after the count is known)
    let state_count = r.take()? as usize;
    for number in 0..state_count {
        let kind = state_kind_from_code(r.take()?)?;
        let rule_index = r.take()? as usize;
        let flags = r.take()?;
        let companion = r.take_optional_index("companion state", state_count)?;

        let mut state = AtnState::new(number, kind, rule_index);
        state.non_greedy = flags & FLAG_NON_GREEDY != 0;
        state.left_recursive = flags & FLAG_LEFT_RECURSIVE != 0;
        state.precedence_decision = flags & FLAG_PRECEDENCE_DECISION != 0;
        state.companion = companion;
        atn.states.push(state);
    }

    // rules
    let rule_count = r.take()? as usize;
    for _ in 0..rule_count {
        atn.rule_to_start_state
            .push(r.take_index("rule start state", state_count)?);
        atn.rule_to_stop_state
            .push(r.take_index("rule stop state", state_count)?);
        if grammar_type == GrammarType::Lexer {
            atn.rule_to_token_type.push(decode_value(r.take()?));
            let action = match r.take()? {
                NONE => None,
                w => Some(w as usize),
            };
            atn.rule_to_action_index.push(action);
        }
    }

    // modes
    let mode_count = r.take()? as usize;
    for _ in 0..mode_count {
        atn.mode_to_start_state
            .push(r.take_index("mode start state", state_count)?);
    }

    // sets
    let set_count = r.take()? as usize;
    let mut sets = Vec::with_capacity(set_count);
    for _ in 0..set_count {
        let interval_count = r.take()? as usize;
        let mut set = IntervalSet::new();
        for _ in 0..interval_count {
            let a = decode_value(r.take()?);
            let b = decode_value(r.take()?);
            set.add_range(a, b);
        }
        sets.push(set);
    }

    // transitions
    let transition_count = r.take()? as usize;
    for _ in 0..transition_count {
        let src = r.take_index("transition source", state_count)?;
        let kind = r.take()?;
        let target = r.take_index("transition target", state_count)?;
        let a1 = r.take()?;
        let a2 = r.take()?;
        let a3 = r.take()?;

        let transition = match kind {
            1 => Transition::Epsilon { target },
            2 => Transition::Range {
                target,
                from: decode_value(a1),
                to: decode_value(a2),
            },
            3 => {
                let follow_state = a3 as usize;
                if follow_state >= state_count {
                    return Err(AtnFormatError::IndexOutOfRange {
                        what: "rule follow state",
                        index: follow_state,
                        max: state_count,
                    });
                }
                let rule_index = a1 as usize;
                if rule_index >= rule_count {
                    return Err(AtnFormatError::IndexOutOfRange {
                        what: "called rule",
                        index: rule_index,
                        max: rule_count,
                    });
                }
                Transition::Rule {
                    target,
                    follow_state,
                    rule_index,
                    precedence: decode_value(a2),
                }
            }
            4 => Transition::Predicate {
                target,
                rule_index: a1 as usize,
                pred_index: a2 as usize,
                is_ctx_dependent: a3 != 0,
            },
            5 => Transition::Atom {
                target,
                label: decode_value(a1),
            },
            6 => Transition::Action {
                target,
                rule_index: a1 as usize,
                action_index: a2 as usize,
                is_ctx_dependent: a3 != 0,
            },
            7 | 8 => {
                let index = a1 as usize;
                if index >= sets.len() {
                    return Err(AtnFormatError::IndexOutOfRange {
                        what: "set table",
                        index,
                        max: sets.len(),
                    });
                }
                let set = sets[index].clone();
                if kind == 7 {
                    Transition::Set { target, set }
                } else {
                    Transition::NotSet { target, set }
                }
            }
            9 => Transition::Wildcard { target },
            10 => Transition::Precedence {
                target,
                precedence: decode_value(a1),
            },
            other => return Err(AtnFormatError::BadTransitionKind(other)),
        };
        atn.states[src].transitions.push(transition);
    }

    // decisions
    let decision_count = r.take()? as usize;
    for decision in 0..decision_count {
        let state = r.take_index("decision state", state_count)?;
        atn.states[state].decision = Some(decision);
        atn.decision_to_state.push(state);
    }

    // lexer actions
    let action_count = r.take()? as usize;
    for _ in 0..action_count {
        let kind = r.take()?;
        let d1 = r.take()?;
        let d2 = r.take()?;
        let action = match kind {
            1 => LexerAction::Skip,
            2 => LexerAction::More,
            3 => LexerAction::Type(decode_value(d1)),
            4 => LexerAction::Channel(d1 as usize),
            5 => LexerAction::Mode(d1 as usize),
            6 => LexerAction::PushMode(d1 as usize),
            7 => LexerAction::PopMode,
            8 => LexerAction::Custom {
                rule_index: d1 as usize,
                action_index: d2 as usize,
            },
            other => return Err(AtnFormatError::BadLexerActionKind(other)),
        };
        atn.lexer_actions.push(action);
    }

    atn.wire_rule_returns();
    Ok(atn)
}
