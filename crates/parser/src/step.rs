//! Parse steps: one way of building a category over a span.

use std::fmt;

use semparse_ccg::{Category, LexicalEntry, RuleName, SentenceSpan};
use semparse_core::SparseVector;

use crate::cell::CellId;
use crate::model::Model;

/// Where the children of a step come from.
#[derive(Debug, Clone)]
pub enum StepKind {
    /// Read off the lexicon.
    Lexical(LexicalEntry),
    /// A unary rule over a cell of the same span.
    Unary { child: CellId },
    /// A binary rule over two adjacent cells.
    Binary { left: CellId, right: CellId },
}

#[derive(Debug, Clone)]
pub struct ParseStep {
    pub kind: StepKind,
    pub rule: RuleName,
    pub category: Category,
    pub span: SentenceSpan,
    pub full_parse: bool,
}

impl ParseStep {
    pub fn lexical(entry: LexicalEntry, span: SentenceSpan, full_parse: bool) -> Self {
        Self {
            category: entry.category().clone(),
            kind: StepKind::Lexical(entry),
            rule: RuleName::lexical(),
            span,
            full_parse,
        }
    }

    pub fn is_lexical(&self) -> bool {
        matches!(self.kind, StepKind::Lexical(_))
    }

    pub fn is_unary(&self) -> bool {
        matches!(self.kind, StepKind::Unary { .. })
    }

    pub fn lexical_entry(&self) -> Option<&LexicalEntry> {
        match &self.kind {
            StepKind::Lexical(entry) => Some(entry),
            _ => None,
        }
    }

    /// Child cells, left to right.
    pub fn children(&self) -> impl Iterator<Item = CellId> {
        let (first, second) = match self.kind {
            StepKind::Lexical(_) => (None, None),
            StepKind::Unary { child } => (Some(child), None),
            StepKind::Binary { left, right } => (Some(left), Some(right)),
        };
        first.into_iter().chain(second)
    }
}

impl fmt::Display for ParseStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}-{}] {} => {}",
            self.span.start, self.span.end, self.rule, self.category
        )?;
        if self.full_parse {
            write!(f, " (full)")?;
        }
        Ok(())
    }
}

/// A step with its features and local score under a model.
#[derive(Debug, Clone)]
pub struct WeightedStep {
    step: ParseStep,
    features: SparseVector,
    local_score: f64,
}

impl WeightedStep {
    pub fn new(step: ParseStep, model: &Model) -> Self {
        let features = match &step.kind {
            StepKind::Lexical(entry) => model.lexical_features(entry, step.span),
            StepKind::Unary { .. } | StepKind::Binary { .. } => {
                model.rule_features(&step.rule, step.is_unary(), &step.category, step.span)
            }
        };
        let local_score = model.score(&features);
        Self {
            step,
            features,
            local_score,
        }
    }

    pub fn step(&self) -> &ParseStep {
        &self.step
    }

    /// Features of this step alone, not of its children.
    pub fn features(&self) -> &SparseVector {
        &self.features
    }

    pub fn local_score(&self) -> f64 {
        self.local_score
    }
}
