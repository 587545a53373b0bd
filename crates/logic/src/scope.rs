//! Variable correspondence for alpha-equivalence.
//!
//! A [`ScopeMapping`] pairs variables of the left expression with variables
//! of the right one while a comparison walks both trees. Binder pairs are
//! pushed on entry to a lambda and popped on exit; the forward and reverse
//! maps are kept in lockstep so the pairing is a bijection at every point.
//! Skolem identifiers are never bound, so their pairing is established on
//! first encounter and holds for the rest of the comparison.

use std::collections::HashMap;

use crate::expr::{LogicalExpression, Variable, VariableId};

/// Paired stacks relating left-hand variables to right-hand variables.
#[derive(Debug, Clone, Default)]
pub struct ScopeMapping {
    forward: HashMap<VariableId, Vec<Variable>>,
    reverse: HashMap<VariableId, Vec<Variable>>,
    skolem_forward: HashMap<VariableId, Variable>,
    skolem_reverse: HashMap<VariableId, Variable>,
}

impl ScopeMapping {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, left: &Variable, right: &Variable) {
        self.forward
            .entry(left.id())
            .or_default()
            .push(right.clone());
        self.reverse
            .entry(right.id())
            .or_default()
            .push(left.clone());
    }

    pub fn pop(&mut self, left: &Variable, right: &Variable) {
        pop_entry(&mut self.forward, left.id());
        pop_entry(&mut self.reverse, right.id());
    }

    /// Innermost right-hand partner of `left`.
    pub fn peek(&self, left: &Variable) -> Option<&Variable> {
        self.forward.get(&left.id()).and_then(|s| s.last())
    }

    /// Innermost left-hand partner of `right`.
    pub fn peek_reverse(&self, right: &Variable) -> Option<&Variable> {
        self.reverse.get(&right.id()).and_then(|s| s.last())
    }

    /// Compare two variables under the current mapping.
    pub fn variables_match(&mut self, left: &Variable, right: &Variable) -> bool {
        if left.is_skolem() || right.is_skolem() {
            return left.is_skolem() && right.is_skolem() && self.skolems_match(left, right);
        }
        match self.peek(left) {
            Some(mapped) => {
                mapped == right && self.peek_reverse(right).is_some_and(|back| back == left)
            }
            // A mapped right-hand variable cannot match an unmapped one.
            None if self.peek_reverse(right).is_some() => false,
            None => left == right,
        }
    }

    fn skolems_match(&mut self, left: &Variable, right: &Variable) -> bool {
        match (
            self.skolem_forward.get(&left.id()),
            self.skolem_reverse.get(&right.id()),
        ) {
            (Some(mapped), Some(back)) => mapped == right && back == left,
            (None, None) => {
                if left.ty() != right.ty() {
                    return false;
                }
                self.skolem_forward.insert(left.id(), right.clone());
                self.skolem_reverse.insert(right.id(), left.clone());
                true
            }
            _ => false,
        }
    }
}

fn pop_entry(map: &mut HashMap<VariableId, Vec<Variable>>, key: VariableId) {
    if let Some(stack) = map.get_mut(&key) {
        stack.pop();
        if stack.is_empty() {
            map.remove(&key);
        }
    }
}

/// Alpha-equivalence of two expressions under `scope`.
///
/// On success the mapping holds the skolem pairs established during the
/// comparison; binder pairs are always popped again.
pub fn alpha_equals(
    left: &LogicalExpression,
    right: &LogicalExpression,
    scope: &mut ScopeMapping,
) -> bool {
    if left.structural_hash() != right.structural_hash() {
        return false;
    }
    match (left, right) {
        (LogicalExpression::Constant(a), LogicalExpression::Constant(b)) => a == b,
        (LogicalExpression::Variable(a), LogicalExpression::Variable(b)) => {
            scope.variables_match(a, b)
        }
        (LogicalExpression::Lambda(a), LogicalExpression::Lambda(b)) => {
            if a.argument().ty() != b.argument().ty() {
                return false;
            }
            scope.push(a.argument(), b.argument());
            let equal = alpha_equals(a.body(), b.body(), scope);
            scope.pop(a.argument(), b.argument());
            equal
        }
        (LogicalExpression::Literal(a), LogicalExpression::Literal(b)) => {
            if a.arguments().len() != b.arguments().len()
                || !alpha_equals(a.predicate(), b.predicate(), scope)
            {
                return false;
            }
            if a.is_order_insensitive() {
                let mut used = vec![false; b.arguments().len()];
                match_unordered(a.arguments(), b.arguments(), &mut used, scope)
            } else {
                a.arguments()
                    .iter()
                    .zip(b.arguments())
                    .all(|(x, y)| alpha_equals(x, y, scope))
            }
        }
        _ => false,
    }
}

/// Match `left` against the unused members of `right` as a multiset,
/// backtracking over trial mappings. The mapping is only committed when
/// the whole remainder matches.
fn match_unordered(
    left: &[LogicalExpression],
    right: &[LogicalExpression],
    used: &mut [bool],
    scope: &mut ScopeMapping,
) -> bool {
    let Some((first, rest)) = left.split_first() else {
        return true;
    };
    for (index, candidate) in right.iter().enumerate() {
        if used[index] {
            continue;
        }
        let mut trial = scope.clone();
        if !alpha_equals(first, candidate, &mut trial) {
            continue;
        }
        used[index] = true;
        if match_unordered(rest, right, used, &mut trial) {
            *scope = trial;
            return true;
        }
        used[index] = false;
    }
    false
}
