//! Semantic contexts: predicates collected during prediction.
//!
//! During SLL closure, predicate and precedence transitions are not
//! evaluated; they accumulate on the configuration as a semantic context.
//! At matching time the candidate contexts are evaluated against the
//! recognizer, and in full-context mode precedence predicates reduce
//! eagerly through [`SemanticContext::eval_precedence`].

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

/// Evaluates grammar predicates. Implemented by the parser (and by any
/// recognizer subclassing equivalent).
pub trait PredicateEvaluator {
    /// User predicate `{...}?` number `pred_index` of rule `rule_index`.
    fn sempred(&mut self, rule_index: usize, pred_index: usize) -> bool;
    /// Left-recursion precedence check `{p >= n}?`.
    fn precpred(&self, precedence: i32) -> bool;
}

/// Conjunction/disjunction tree over predicates. `None` is "always true".
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum SemanticContext {
    None,
    Predicate {
        rule_index: usize,
        pred_index: usize,
        is_ctx_dependent: bool,
    },
    Precedence {
        precedence: i32,
    },
    And(Vec<SemanticContext>),
    Or(Vec<SemanticContext>),
}

impl SemanticContext {
    /// Conjunction, flattening nested `And`s and dropping duplicates.
    pub fn and(a: &SemanticContext, b: &SemanticContext) -> SemanticContext {
        match (a, b) {
            (SemanticContext::None, other) | (other, SemanticContext::None) => other.clone(),
            _ => {
                let mut operands = Vec::new();
                collect(a, &mut operands, true);
                collect(b, &mut operands, true);
                if operands.len() == 1 {
                    operands.pop().unwrap()
                } else {
                    SemanticContext::And(operands)
                }
            }
        }
    }

    /// Disjunction, flattening nested `Or`s and dropping duplicates.
    pub fn or(a: &SemanticContext, b: &SemanticContext) -> SemanticContext {
        if matches!(a, SemanticContext::None) || matches!(b, SemanticContext::None) {
            return SemanticContext::None;
        }
        let mut operands = Vec::new();
        collect(a, &mut operands, false);
        collect(b, &mut operands, false);
        if operands.len() == 1 {
            operands.pop().unwrap()
        } else {
            SemanticContext::Or(operands)
        }
    }

    /// Evaluate fully against the recognizer.
    pub fn eval(&self, evaluator: &mut dyn PredicateEvaluator) -> bool {
        match self {
            SemanticContext::None => true,
            SemanticContext::Predicate {
                rule_index,
                pred_index,
                ..
            } => evaluator.sempred(*rule_index, *pred_index),
            SemanticContext::Precedence { precedence } => evaluator.precpred(*precedence),
            SemanticContext::And(operands) => operands.iter().all(|op| op.eval(evaluator)),
            SemanticContext::Or(operands) => operands.iter().any(|op| op.eval(evaluator)),
        }
    }

    /// Partially evaluate precedence predicates, leaving user predicates
    /// intact. `Option::None` means the context is known false.
    pub fn eval_precedence(&self, evaluator: &dyn PredicateEvaluator) -> Option<SemanticContext> {
        match self {
            SemanticContext::None | SemanticContext::Predicate { .. } => Some(self.clone()),
            SemanticContext::Precedence { precedence } => {
                if evaluator.precpred(*precedence) {
                    Some(SemanticContext::None)
                } else {
                    None
                }
            }
            SemanticContext::And(operands) => {
                let mut reduced = SemanticContext::None;
                let mut changed = false;
                for op in operands {
                    let r = op.eval_precedence(evaluator)?;
                    changed |= r != *op;
                    reduced = SemanticContext::and(&reduced, &r);
                }
                if changed { Some(reduced) } else { Some(self.clone()) }
            }
            SemanticContext::Or(operands) => {
                let mut reduced: Option<SemanticContext> = Option::None;
                let mut changed = false;
                for op in operands {
                    match op.eval_precedence(evaluator) {
                        Option::None => changed = true, // operand is false, drop it
                        Some(r) => {
                            changed |= r != *op;
                            if matches!(r, SemanticContext::None) {
                                return Some(SemanticContext::None);
                            }
                            reduced = Some(match reduced {
                                Option::None => r,
                                Some(acc) => SemanticContext::or(&acc, &r),
                            });
                        }
                    }
                }
                if !changed { Some(self.clone()) } else { reduced }
            }
        }
    }

    /// Content hash for configuration hashing.
    pub fn hash_value(&self) -> u32 {
        let mut hasher = DefaultHasher::new();
        self.hash(&mut hasher);
        hasher.finish() as u32
    }
}

fn collect(ctx: &SemanticContext, out: &mut Vec<SemanticContext>, conjunction: bool) {
    let nested: Option<&Vec<SemanticContext>> = match (ctx, conjunction) {
        (SemanticContext::And(ops), true) | (SemanticContext::Or(ops), false) => Some(ops),
        _ => None,
    };
    match nested {
        Some(ops) => {
            for op in ops {
                collect(op, out, conjunction);
            }
        }
        None => {
            if !out.contains(ctx) {
                out.push(ctx.clone());
            }
        }
    }
}
