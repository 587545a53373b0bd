//! CCG Combinators
//!
//! Binary rules combine two adjacent categories, unary rules rewrite one.
//! Both are closed enums dispatched by `match`; a rule that does not apply
//! returns `None`.
//!
//! | rule              | name      | shape                         |
//! |-------------------|-----------|-------------------------------|
//! | forward apply     | `>apply`  | `X/Y Y => X`                  |
//! | backward apply    | `<apply`  | `Y X\Y => X`                  |
//! | forward compose   | `>comp1`  | `X/Y Y/Z => X/Z`              |
//! | backward compose  | `<comp1`  | `Y\Z X\Y => X\Z`              |
//! | crossed compose   | `>xcomp1` | `X/Y Y\Z => X\Z`              |
//! | skipping          | `>skip`   | `X EMPTY => X`                |
//! | punctuation       | `>punct`  | `X PUNCT => X`                |
//! | coordination      | `c1` ...  | see [`coordination`]          |
//! | type shifting     | any label | `Y => X` via a fixed `X/Y`    |
//! | skolem IDs        | `skolem`  | `X : f => X : f'`             |
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use semparse_ccg::category::CategoryServices;
//! use semparse_ccg::rules::{BinaryRule, Direction, SentenceSpan};
//! use semparse_logic::LogicContext;
//!
//! let services = CategoryServices::new(Arc::new(LogicContext::builder().build().unwrap()));
//! let left = services.read("S/NP : (lambda $0:e (city:<e,t> $0))").unwrap();
//! let right = services.read("NP : paris:e").unwrap();
//!
//! let rule = BinaryRule::application(Direction::Forward);
//! let result = rule.apply(&services, &left, &right, SentenceSpan::new(0, 1, 2)).unwrap();
//! assert_eq!(result.name.to_string(), ">apply");
//! assert_eq!(result.category.to_string(), "S : (city:<e,t> paris:e)");
//! ```

pub mod coordination;
pub mod skolem;
pub mod type_shifting;

use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use crate::category::{Category, CategoryServices};
use crate::syntax::{Slash, Syntax};
use crate::CcgError;

pub use coordination::{CoordinationKind, CoordinationServices};
pub use skolem::SkolemIdRule;
pub use type_shifting::ApplicationTypeShifting;

pub const APPLICATION_LABEL: &str = "apply";
pub const COMPOSITION_LABEL: &str = "comp";
pub const CROSSED_COMPOSITION_LABEL: &str = "xcomp";
pub const SKIPPING_LABEL: &str = "skip";
pub const PUNCTUATION_LABEL: &str = "punct";
pub const LEXICAL_LABEL: &str = "lex";

/// Direction of a binary rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Direction {
    Forward,
    Backward,
}

impl Direction {
    /// The slash a primary category needs for a rule in this direction.
    pub fn slash(self) -> Slash {
        match self {
            Direction::Forward => Slash::Forward,
            Direction::Backward => Slash::Backward,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Forward => write!(f, ">"),
            Direction::Backward => write!(f, "<"),
        }
    }
}

/// Name of a rule: label, optional direction and order.
///
/// Displayed as direction, label and order, the order only when positive:
/// `>apply`, `<comp1`, `>xcomp1`, `skolem`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RuleName {
    label: Arc<str>,
    direction: Option<Direction>,
    order: usize,
}

/// Distinct rule names that produced a cell.
pub type RuleNameSet = BTreeSet<RuleName>;

impl RuleName {
    pub fn new(label: &str, direction: Option<Direction>, order: usize) -> Self {
        Self {
            label: Arc::from(label),
            direction,
            order,
        }
    }

    pub fn binary(label: &str, direction: Direction) -> Self {
        Self::new(label, Some(direction), 0)
    }

    pub fn unary(label: &str) -> Self {
        Self::new(label, None, 0)
    }

    /// The pseudo-rule of lexical steps.
    pub fn lexical() -> Self {
        Self::unary(LEXICAL_LABEL)
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn direction(&self) -> Option<Direction> {
        self.direction
    }

    pub fn order(&self) -> usize {
        self.order
    }

    pub fn is_application(&self) -> bool {
        &*self.label == APPLICATION_LABEL
    }

    /// Harmonic composition (not crossed).
    pub fn is_composition(&self) -> bool {
        &*self.label == COMPOSITION_LABEL
    }

    pub fn is_crossed_composition(&self) -> bool {
        &*self.label == CROSSED_COMPOSITION_LABEL
    }

    pub fn is_lexical(&self) -> bool {
        &*self.label == LEXICAL_LABEL && self.direction.is_none()
    }
}

impl fmt::Display for RuleName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(direction) = self.direction {
            write!(f, "{}", direction)?;
        }
        write!(f, "{}", self.label)?;
        if self.order > 0 {
            write!(f, "{}", self.order)?;
        }
        Ok(())
    }
}

/// Position of a span in the sentence. `end` is inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SentenceSpan {
    pub start: usize,
    pub end: usize,
    pub sentence_length: usize,
}

impl SentenceSpan {
    pub fn new(start: usize, end: usize, sentence_length: usize) -> Self {
        Self {
            start,
            end,
            sentence_length,
        }
    }

    pub fn is_start(&self) -> bool {
        self.start == 0
    }

    pub fn is_end(&self) -> bool {
        self.end + 1 == self.sentence_length
    }

    pub fn is_complete(&self) -> bool {
        self.is_start() && self.is_end()
    }

    pub fn num_tokens(&self) -> usize {
        self.end + 1 - self.start
    }
}

/// Output of a rule that applied.
#[derive(Debug, Clone, PartialEq)]
pub struct RuleResult {
    pub name: RuleName,
    pub category: Category,
}

impl RuleResult {
    pub fn new(name: RuleName, category: Category) -> Self {
        Self { name, category }
    }
}

/// A rule combining two adjacent categories.
#[derive(Debug, Clone)]
pub enum BinaryRule {
    Application {
        direction: Direction,
    },
    Composition {
        direction: Direction,
        order: usize,
        cross: bool,
    },
    Skipping {
        direction: Direction,
    },
    Punctuation,
    Coordination {
        kind: CoordinationKind,
        services: Arc<CoordinationServices>,
    },
}

impl BinaryRule {
    pub fn application(direction: Direction) -> Self {
        BinaryRule::Application { direction }
    }

    /// Generalized composition. Crossing is only defined at order 1.
    pub fn composition(direction: Direction, order: usize, cross: bool) -> Result<Self, CcgError> {
        if order == 0 {
            return Err(CcgError::InvalidRule {
                message: "composition order must be at least 1".to_string(),
            });
        }
        if cross && order != 1 {
            return Err(CcgError::InvalidRule {
                message: format!("crossed composition of order {} is not supported", order),
            });
        }
        Ok(BinaryRule::Composition {
            direction,
            order,
            cross,
        })
    }

    pub fn skipping(direction: Direction) -> Self {
        BinaryRule::Skipping { direction }
    }

    pub fn punctuation() -> Self {
        BinaryRule::Punctuation
    }

    /// The three coordination rules over shared services.
    pub fn coordination(services: Arc<CoordinationServices>) -> Vec<Self> {
        [CoordinationKind::C1, CoordinationKind::C2, CoordinationKind::CX]
            .into_iter()
            .map(|kind| BinaryRule::Coordination {
                kind,
                services: Arc::clone(&services),
            })
            .collect()
    }

    /// Forward and backward application plus harmonic composition up to
    /// `max_order`.
    pub fn standard(max_order: usize) -> Result<Vec<Self>, CcgError> {
        let mut rules = vec![
            BinaryRule::application(Direction::Forward),
            BinaryRule::application(Direction::Backward),
        ];
        for order in 1..=max_order {
            rules.push(BinaryRule::composition(Direction::Forward, order, false)?);
            rules.push(BinaryRule::composition(Direction::Backward, order, false)?);
        }
        Ok(rules)
    }

    pub fn name(&self) -> RuleName {
        match self {
            BinaryRule::Application { direction } => RuleName::binary(APPLICATION_LABEL, *direction),
            BinaryRule::Composition {
                direction,
                order,
                cross,
            } => {
                let label = if *cross {
                    CROSSED_COMPOSITION_LABEL
                } else {
                    COMPOSITION_LABEL
                };
                RuleName::new(label, Some(*direction), *order)
            }
            BinaryRule::Skipping { direction } => RuleName::binary(SKIPPING_LABEL, *direction),
            BinaryRule::Punctuation => RuleName::binary(PUNCTUATION_LABEL, Direction::Forward),
            BinaryRule::Coordination { kind, .. } => kind.name(),
        }
    }

    pub fn is_skipping(&self) -> bool {
        matches!(self, BinaryRule::Skipping { .. })
    }

    pub fn apply(
        &self,
        services: &CategoryServices,
        left: &Category,
        right: &Category,
        span: SentenceSpan,
    ) -> Option<RuleResult> {
        let category = match self {
            BinaryRule::Application { direction } => {
                let (function, argument) = match direction {
                    Direction::Forward => (left, right),
                    Direction::Backward => (right, left),
                };
                if function.slash() != Some(direction.slash()) {
                    return None;
                }
                services.apply(function, argument)?
            }
            BinaryRule::Composition {
                direction,
                order,
                cross,
            } => {
                let (primary, secondary) = match direction {
                    Direction::Forward => (left, right),
                    Direction::Backward => (right, left),
                };
                if primary.slash() != Some(direction.slash()) {
                    return None;
                }
                services.compose(primary, secondary, *order, *cross)?
            }
            BinaryRule::Skipping { direction } => match direction {
                Direction::Forward if right.is_empty() => left.clone(),
                Direction::Backward if left.is_empty() => right.clone(),
                _ => return None,
            },
            BinaryRule::Punctuation => {
                if right.syntax() != &Syntax::punct() {
                    return None;
                }
                left.clone()
            }
            BinaryRule::Coordination { kind, services: coordination } => {
                coordination.apply(*kind, left, right)?
            }
        };
        tracing::trace!(rule = %self.name(), start = span.start, end = span.end, "binary rule applied");
        Some(RuleResult::new(self.name(), category))
    }
}

impl fmt::Display for BinaryRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// A rule rewriting a single category.
#[derive(Debug, Clone)]
pub enum UnaryRule {
    TypeShifting(ApplicationTypeShifting),
    SkolemId(SkolemIdRule),
}

impl UnaryRule {
    pub fn name(&self) -> RuleName {
        match self {
            UnaryRule::TypeShifting(rule) => rule.name().clone(),
            UnaryRule::SkolemId(_) => RuleName::unary(skolem::SKOLEM_LABEL),
        }
    }

    pub fn apply(
        &self,
        services: &CategoryServices,
        category: &Category,
        span: SentenceSpan,
    ) -> Option<RuleResult> {
        let result = match self {
            UnaryRule::TypeShifting(rule) => rule.apply(services, category, span)?,
            UnaryRule::SkolemId(rule) => rule.apply(services, category)?,
        };
        Some(RuleResult::new(self.name(), result))
    }

    /// Whether the rule could accept `category` at `span`. Used to keep
    /// complete-span categories that are not yet full parses.
    pub fn is_valid_argument(&self, category: &Category, span: SentenceSpan) -> bool {
        match self {
            UnaryRule::TypeShifting(rule) => rule.is_valid_argument(category, span),
            UnaryRule::SkolemId(_) => category.semantics().is_some(),
        }
    }
}

impl fmt::Display for UnaryRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use semparse_logic::LogicContext;

    fn services() -> CategoryServices {
        CategoryServices::new(Arc::new(LogicContext::builder().build().unwrap()))
    }

    fn span() -> SentenceSpan {
        SentenceSpan::new(0, 1, 2)
    }

    #[test]
    fn test_rule_names() {
        assert_eq!(BinaryRule::application(Direction::Backward).name().to_string(), "<apply");
        let comp = BinaryRule::composition(Direction::Forward, 1, false).unwrap();
        assert_eq!(comp.name().to_string(), ">comp1");
        let xcomp = BinaryRule::composition(Direction::Forward, 1, true).unwrap();
        assert_eq!(xcomp.name().to_string(), ">xcomp1");
        assert_eq!(RuleName::lexical().to_string(), "lex");
        assert!(RuleName::lexical().is_lexical());
    }

    #[test]
    fn test_crossed_composition_order() {
        assert!(matches!(
            BinaryRule::composition(Direction::Forward, 2, true),
            Err(CcgError::InvalidRule { .. })
        ));
        assert!(BinaryRule::composition(Direction::Forward, 0, false).is_err());
    }

    #[test]
    fn test_backward_application() {
        let services = services();
        let left = services.read("NP : john:e").unwrap();
        let right = services.read("S\\NP : (lambda $0:e (run:<e,t> $0))").unwrap();
        let rule = BinaryRule::application(Direction::Backward);
        let result = rule.apply(&services, &left, &right, span()).unwrap();
        assert_eq!(result.category.to_string(), "S : (run:<e,t> john:e)");
        assert!(BinaryRule::application(Direction::Forward)
            .apply(&services, &left, &right, span())
            .is_none());
    }

    #[test]
    fn test_application_checks_slash() {
        let services = services();
        let left = services.read("S\\NP : (lambda $0:e (run:<e,t> $0))").unwrap();
        let right = services.read("NP : john:e").unwrap();
        let rule = BinaryRule::application(Direction::Forward);
        assert!(rule.apply(&services, &left, &right, span()).is_none());
    }

    #[test]
    fn test_backward_composition() {
        let services = services();
        let left = services
            .read("NP\\N : (lambda $0:e (capital:<e,e> $0))")
            .unwrap();
        let right = services.read("S\\NP : (lambda $0:e (city:<e,t> $0))").unwrap();
        let rule = BinaryRule::composition(Direction::Backward, 1, false).unwrap();
        let result = rule.apply(&services, &left, &right, span()).unwrap();
        assert_eq!(
            result.category.to_string(),
            "S\\N : (lambda $0:e (city:<e,t> (capital:<e,e> $0)))"
        );
    }

    #[test]
    fn test_skipping() {
        let services = services();
        let city = services.read("N : city:<e,t>").unwrap();
        let empty = Category::empty();
        let forward = BinaryRule::skipping(Direction::Forward);
        let backward = BinaryRule::skipping(Direction::Backward);
        assert_eq!(forward.apply(&services, &city, &empty, span()).unwrap().category, city);
        assert_eq!(backward.apply(&services, &empty, &city, span()).unwrap().category, city);
        assert!(forward.apply(&services, &empty, &city, span()).is_none());
        assert!(backward.apply(&services, &city, &empty, span()).is_none());
    }

    #[test]
    fn test_punctuation() {
        let services = services();
        let s = services.read("S : (city:<e,t> paris:e)").unwrap();
        let punct = services.read("PUNCT").unwrap();
        let rule = BinaryRule::punctuation();
        let result = rule.apply(&services, &s, &punct, span()).unwrap();
        assert_eq!(result.name.to_string(), ">punct");
        assert_eq!(result.category, s);
        assert!(rule.apply(&services, &punct, &s, span()).is_none());
    }

    #[test]
    fn test_span_positions() {
        let span = SentenceSpan::new(0, 2, 3);
        assert!(span.is_start() && span.is_end() && span.is_complete());
        assert_eq!(span.num_tokens(), 3);
        let inner = SentenceSpan::new(1, 1, 3);
        assert!(!inner.is_start() && !inner.is_end());
    }
}
