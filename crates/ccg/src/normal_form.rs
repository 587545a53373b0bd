//! Normal-Form Constraints
//!
//! Composition lets a grammar build the same logical form through many
//! bracketings. Normal-form constraints reject a rule application based on
//! the rules that produced its children, cutting that spurious ambiguity.
//!
//! A constraint sees the set of rule names behind each child cell (one
//! name per distinct step), never the categories themselves.
//!
//! | constraint                | rejects                                           |
//! |---------------------------|---------------------------------------------------|
//! | [`EisnerConstraint`]      | a `d`-composition result as primary of a `d`-composition |
//! | [`HbComposedConstraint`]  | Hockenmaier & Bisk (2010) restrictions             |
//! | [`UnaryConstraint`]       | unary rules over the output of listed binary rules |
//!
//! The Eisner constraint keeps every distinct logical form on an unpruned
//! chart. Under beam pruning it can lose one: the rejected bracketing may be
//! the only one whose children survive the beam.
//!
//! # Example
//!
//! ```rust
//! use semparse_ccg::normal_form::{EisnerConstraint, NormalFormValidator};
//! use semparse_ccg::rules::{BinaryRule, Direction, RuleName, RuleNameSet};
//!
//! let validator = NormalFormValidator::builder()
//!     .constraint(EisnerConstraint)
//!     .build();
//!
//! let comp = BinaryRule::composition(Direction::Forward, 1, false).unwrap().name();
//! let composed: RuleNameSet = [comp.clone()].into_iter().collect();
//! let lexical: RuleNameSet = [RuleName::lexical()].into_iter().collect();
//!
//! assert!(!validator.is_valid_binary(&composed, &lexical, &comp));
//! assert!(validator.is_valid_binary(&lexical, &composed, &comp));
//! ```

use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use crate::rules::{Direction, RuleName, RuleNameSet};

/// A restriction on which rule may combine which children.
pub trait NormalFormConstraint: fmt::Debug + Send + Sync {
    /// Whether `rule` may combine children produced by `left` and `right`.
    fn is_valid_binary(&self, left: &RuleNameSet, right: &RuleNameSet, rule: &RuleName) -> bool;

    /// Whether the unary `rule` may rewrite a child produced by `child`.
    fn is_valid_unary(&self, _child: &RuleNameSet, _rule: &RuleName) -> bool {
        true
    }
}

/// Split children into (primary, secondary) for a directional rule.
fn primary_secondary<'a>(
    direction: Direction,
    left: &'a RuleNameSet,
    right: &'a RuleNameSet,
) -> (&'a RuleNameSet, &'a RuleNameSet) {
    match direction {
        Direction::Forward => (left, right),
        Direction::Backward => (right, left),
    }
}

fn is_any_composition(rule: &RuleName) -> bool {
    rule.is_composition() || rule.is_crossed_composition()
}

/// A composition in direction `d` may not take as its primary the result of
/// another composition in direction `d`.
#[derive(Debug, Clone, Copy, Default)]
pub struct EisnerConstraint;

impl NormalFormConstraint for EisnerConstraint {
    fn is_valid_binary(&self, left: &RuleNameSet, right: &RuleNameSet, rule: &RuleName) -> bool {
        let Some(direction) = rule.direction() else {
            return true;
        };
        if !is_any_composition(rule) {
            return true;
        }
        let (primary, _) = primary_secondary(direction, left, right);
        !primary
            .iter()
            .any(|r| is_any_composition(r) && r.direction() == Some(direction))
    }
}

impl fmt::Display for EisnerConstraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "eisner")
    }
}

/// Hockenmaier and Bisk (2010) restrictions on composed children.
///
/// For a rule in direction `d`:
///
/// 1. the primary of an application or first-order composition may not
///    come from a `d`-composition;
/// 2. the primary of any composition may not come from a first-order
///    `d`-composition;
/// 3. the secondary of a composition of order `n` may not come from a
///    `d`-composition of lower order.
///
/// Optionally, unary rules may not rewrite the output of the given
/// coordination rules.
#[derive(Debug, Clone, Default)]
pub struct HbComposedConstraint {
    coordination_rules: BTreeSet<RuleName>,
}

impl HbComposedConstraint {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_coordination_rules(rules: impl IntoIterator<Item = RuleName>) -> Self {
        Self {
            coordination_rules: rules.into_iter().collect(),
        }
    }
}

impl NormalFormConstraint for HbComposedConstraint {
    fn is_valid_binary(&self, left: &RuleNameSet, right: &RuleNameSet, rule: &RuleName) -> bool {
        let Some(direction) = rule.direction() else {
            return true;
        };
        let is_application = rule.is_application();
        let is_composition = rule.is_composition();
        if !is_application && !is_composition {
            return true;
        }
        let order = rule.order();
        let (primary, secondary) = primary_secondary(direction, left, right);

        let first_applies = is_application || order == 1;
        for generating in primary {
            if !generating.is_composition() || generating.direction() != Some(direction) {
                continue;
            }
            if first_applies {
                return false;
            }
            if is_composition && generating.order() == 1 {
                return false;
            }
        }

        if is_composition {
            let lower_order_composition = secondary.iter().any(|generating| {
                generating.is_composition()
                    && generating.direction() == Some(direction)
                    && generating.order() < order
            });
            if lower_order_composition {
                return false;
            }
        }
        true
    }

    fn is_valid_unary(&self, child: &RuleNameSet, _rule: &RuleName) -> bool {
        child.is_disjoint(&self.coordination_rules)
    }
}

impl fmt::Display for HbComposedConstraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "hb2010")
    }
}

/// The listed binary rules may not be followed by a unary rule.
#[derive(Debug, Clone, Default)]
pub struct UnaryConstraint {
    rules: BTreeSet<RuleName>,
}

impl UnaryConstraint {
    pub fn new(rules: impl IntoIterator<Item = RuleName>) -> Self {
        let rules: BTreeSet<RuleName> = rules.into_iter().collect();
        tracing::info!(
            rules = %rules.iter().map(ToString::to_string).collect::<Vec<_>>().join(","),
            "unary constraint"
        );
        Self { rules }
    }
}

impl NormalFormConstraint for UnaryConstraint {
    fn is_valid_binary(&self, _left: &RuleNameSet, _right: &RuleNameSet, _rule: &RuleName) -> bool {
        true
    }

    fn is_valid_unary(&self, child: &RuleNameSet, _rule: &RuleName) -> bool {
        child.is_disjoint(&self.rules)
    }
}

impl fmt::Display for UnaryConstraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unary")
    }
}

/// Conjunction of constraints.
#[derive(Debug, Clone, Default)]
pub struct NormalFormValidator {
    constraints: Vec<Arc<dyn NormalFormConstraint>>,
}

impl NormalFormValidator {
    pub fn builder() -> NormalFormValidatorBuilder {
        NormalFormValidatorBuilder::default()
    }

    pub fn is_valid_binary(&self, left: &RuleNameSet, right: &RuleNameSet, rule: &RuleName) -> bool {
        self.constraints
            .iter()
            .all(|c| c.is_valid_binary(left, right, rule))
    }

    pub fn is_valid_unary(&self, child: &RuleNameSet, rule: &RuleName) -> bool {
        self.constraints.iter().all(|c| c.is_valid_unary(child, rule))
    }

    pub fn len(&self) -> usize {
        self.constraints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.constraints.is_empty()
    }
}

#[derive(Debug, Default)]
pub struct NormalFormValidatorBuilder {
    constraints: Vec<Arc<dyn NormalFormConstraint>>,
}

impl NormalFormValidatorBuilder {
    pub fn constraint(mut self, constraint: impl NormalFormConstraint + 'static) -> Self {
        self.constraints.push(Arc::new(constraint));
        self
    }

    /// Add every constraint of an existing validator.
    pub fn constraints_of(mut self, other: &NormalFormValidator) -> Self {
        self.constraints.extend(other.constraints.iter().cloned());
        self
    }

    pub fn build(self) -> NormalFormValidator {
        tracing::info!(constraints = ?self.constraints, "normal form validator");
        NormalFormValidator {
            constraints: self.constraints,
        }
    }
}
