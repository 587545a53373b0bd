//! # Chart Cells
//!
//! A cell packs every step that builds the same category over the same
//! span. Steps are only ever appended; the scores of the cell are a
//! [`CellSummary`] recomputed from the step log and the summaries of the
//! child cells:
//!
//! ```text
//!   step score     = local score + Σ child Viterbi scores
//!   Viterbi score  = max over steps
//!   inside score   = log Σ exp(local score + Σ child inside scores)
//!   parses         = Σ over steps of Π child parses
//! ```

use std::fmt;

use semparse_ccg::{Category, RuleNameSet, SentenceSpan};
use semparse_core::log_sum_exp_all;

use crate::step::WeightedStep;

/// Index of a cell in its chart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CellId(pub(crate) usize);

impl CellId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// Scores derived from a cell's steps.
#[derive(Debug, Clone, PartialEq)]
pub struct CellSummary {
    pub viterbi_score: f64,
    /// Indices of the steps tied for the Viterbi score.
    pub viterbi_steps: Vec<usize>,
    pub log_inside_score: f64,
    pub num_parses: u64,
    pub num_viterbi_parses: u64,
}

impl CellSummary {
    fn empty() -> Self {
        Self {
            viterbi_score: f64::NEG_INFINITY,
            viterbi_steps: Vec::new(),
            log_inside_score: f64::NEG_INFINITY,
            num_parses: 0,
            num_viterbi_parses: 0,
        }
    }

    /// Summarize `steps`, reading child summaries from `cells`.
    pub(crate) fn compute(steps: &[WeightedStep], cells: &[Cell]) -> Self {
        let mut summary = Self::empty();
        let mut inside_scores = Vec::with_capacity(steps.len());

        for (index, weighted) in steps.iter().enumerate() {
            let mut viterbi = weighted.local_score();
            let mut inside = weighted.local_score();
            let mut parses: u64 = 1;
            let mut viterbi_parses: u64 = 1;
            for child in weighted.step().children() {
                let child = &cells[child.0].summary;
                viterbi += child.viterbi_score;
                inside += child.log_inside_score;
                parses = parses.saturating_mul(child.num_parses);
                viterbi_parses = viterbi_parses.saturating_mul(child.num_viterbi_parses);
            }
            inside_scores.push(inside);
            summary.num_parses = summary.num_parses.saturating_add(parses);

            if viterbi > summary.viterbi_score || summary.viterbi_steps.is_empty() {
                summary.viterbi_score = viterbi;
                summary.viterbi_steps = vec![index];
                summary.num_viterbi_parses = viterbi_parses;
            } else if viterbi == summary.viterbi_score {
                summary.viterbi_steps.push(index);
                summary.num_viterbi_parses = summary.num_viterbi_parses.saturating_add(viterbi_parses);
            }
        }

        summary.log_inside_score = log_sum_exp_all(inside_scores);
        summary
    }
}

/// All steps building one category over one span.
#[derive(Debug, Clone)]
pub struct Cell {
    id: CellId,
    category: Category,
    span: SentenceSpan,
    full_parse: bool,
    steps: Vec<WeightedStep>,
    rule_names: RuleNameSet,
    summary: CellSummary,
}

impl Cell {
    pub(crate) fn new(id: CellId, step: WeightedStep) -> Self {
        let mut cell = Self {
            id,
            category: step.step().category.clone(),
            span: step.step().span,
            full_parse: step.step().full_parse,
            steps: Vec::new(),
            rule_names: RuleNameSet::new(),
            summary: CellSummary::empty(),
        };
        cell.push(step);
        cell
    }

    pub(crate) fn push(&mut self, step: WeightedStep) {
        self.rule_names.insert(step.step().rule.clone());
        self.steps.push(step);
    }

    pub(crate) fn set_summary(&mut self, summary: CellSummary) {
        self.summary = summary;
    }

    /// Drop every step outside the Viterbi set. Rule names are kept, so
    /// normal-form checks still see every rule that reached this cell.
    pub(crate) fn retain_viterbi_steps(&mut self) {
        if self.summary.viterbi_steps.len() == self.steps.len() {
            return;
        }
        let keep = std::mem::take(&mut self.summary.viterbi_steps);
        let steps = std::mem::take(&mut self.steps);
        self.steps = steps
            .into_iter()
            .enumerate()
            .filter(|(index, _)| keep.binary_search(index).is_ok())
            .map(|(_, step)| step)
            .collect();
        self.summary.viterbi_steps = (0..self.steps.len()).collect();
    }

    pub fn id(&self) -> CellId {
        self.id
    }

    pub fn category(&self) -> &Category {
        &self.category
    }

    pub fn span(&self) -> SentenceSpan {
        self.span
    }

    pub fn is_full_parse(&self) -> bool {
        self.full_parse
    }

    pub fn steps(&self) -> &[WeightedStep] {
        &self.steps
    }

    /// True if some step reads this cell straight off the lexicon.
    pub fn is_lexical(&self) -> bool {
        self.steps.iter().any(|weighted| weighted.step().is_lexical())
    }

    /// Steps tied for the Viterbi score.
    pub fn viterbi_steps(&self) -> impl Iterator<Item = &WeightedStep> {
        self.summary.viterbi_steps.iter().map(|&index| &self.steps[index])
    }

    /// Every rule that produced a step of this cell.
    pub fn rule_names(&self) -> &RuleNameSet {
        &self.rule_names
    }

    pub fn summary(&self) -> &CellSummary {
        &self.summary
    }

    pub fn viterbi_score(&self) -> f64 {
        self.summary.viterbi_score
    }

    pub fn log_inside_score(&self) -> f64 {
        self.summary.log_inside_score
    }

    pub fn num_parses(&self) -> u64 {
        self.summary.num_parses
    }

    pub fn num_viterbi_parses(&self) -> u64 {
        self.summary.num_viterbi_parses
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}-{}] {} (viterbi={:.3}, inside={:.3}, steps={}, parses={})",
            self.span.start,
            self.span.end,
            self.category,
            self.summary.viterbi_score,
            self.summary.log_inside_score,
            self.steps.len(),
            self.summary.num_parses
        )
    }
}
