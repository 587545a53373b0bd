//! # Parse Chart
//!
//! Cells live in an arena indexed by [`CellId`]. A triangular span table
//! maps each category over a span to its cell, and keeps the span's cells
//! in a stable order so two parses of the same sentence walk the chart
//! identically.
//!
//! ```text
//!   span (0,2)   [S]
//!   span (0,1)   [S/NP]      span (1,2)   [NP, N]
//!   span (0,0)   [S/NP/NP]   span (1,1)   [NP/N]   span (2,2)   [N]
//! ```
//!
//! A span is finalized once all its steps are in: summaries are recomputed
//! children first, Viterbi charts drop non-Viterbi steps, and the beam
//! keeps the best cells. Inside/outside inference runs over the finalized
//! cells.

use std::collections::{HashMap, HashSet};
use std::fmt;

use petgraph::algo::toposort;
use petgraph::graph::{DiGraph, NodeIndex};
use semparse_ccg::{Category, SentenceSpan};
use semparse_core::{log_sum_exp, log_sum_exp_all, SparseVector};

use crate::cell::{Cell, CellId, CellSummary};
use crate::config::InferenceMode;
use crate::step::{StepKind, WeightedStep};

#[derive(Debug, Clone, Default)]
struct SpanEntry {
    index: HashMap<Category, CellId>,
    cells: Vec<CellId>,
    pruned: bool,
}

/// Packed chart of one sentence.
#[derive(Debug, Clone)]
pub struct Chart {
    sentence_length: usize,
    mode: InferenceMode,
    cells: Vec<Cell>,
    spans: Vec<SpanEntry>,
    /// Finalized cells, children before parents.
    order: Vec<CellId>,
}

impl Chart {
    pub fn new(sentence_length: usize, mode: InferenceMode) -> Self {
        Self {
            sentence_length,
            mode,
            cells: Vec::new(),
            spans: vec![SpanEntry::default(); sentence_length * sentence_length],
            order: Vec::new(),
        }
    }

    fn slot(&self, start: usize, end: usize) -> usize {
        start * self.sentence_length + end
    }

    pub fn sentence_length(&self) -> usize {
        self.sentence_length
    }

    pub fn mode(&self) -> InferenceMode {
        self.mode
    }

    pub fn cell(&self, id: CellId) -> &Cell {
        &self.cells[id.0]
    }

    /// Cells of a span, in stable order. Pruned cells are not listed.
    pub fn span_cells(&self, start: usize, end: usize) -> &[CellId] {
        &self.spans[self.slot(start, end)].cells
    }

    pub fn span_size(&self, start: usize, end: usize) -> usize {
        self.span_cells(start, end).len()
    }

    /// Total number of cells kept in the chart.
    pub fn num_cells(&self) -> usize {
        self.spans.iter().map(|span| span.cells.len()).sum()
    }

    pub fn lookup(&self, span: SentenceSpan, category: &Category) -> Option<CellId> {
        self.spans[self.slot(span.start, span.end)]
            .index
            .get(category)
            .copied()
    }

    pub fn is_pruned(&self, start: usize, end: usize) -> bool {
        self.spans[self.slot(start, end)].pruned
    }

    /// True when the beam dropped nothing.
    pub fn is_exact(&self) -> bool {
        !self.spans.iter().any(|span| span.pruned)
    }

    /// Add a step to the cell of its category, creating the cell if needed.
    /// Returns the cell and whether it is new.
    pub(crate) fn add(&mut self, step: WeightedStep) -> (CellId, bool) {
        let span = step.step().span;
        let slot = self.slot(span.start, span.end);
        if let Some(&id) = self.spans[slot].index.get(&step.step().category) {
            self.cells[id.0].push(step);
            return (id, false);
        }
        let id = CellId(self.cells.len());
        let category = step.step().category.clone();
        self.cells.push(Cell::new(id, step));
        let entry = &mut self.spans[slot];
        entry.index.insert(category, id);
        entry.cells.push(id);
        (id, true)
    }

    /// Whether a unary step from `child` to `category` would close a cycle
    /// of unary steps within the span.
    pub(crate) fn creates_unary_cycle(&self, child: CellId, category: &Category) -> bool {
        let Some(target) = self.lookup(self.cells[child.0].span(), category) else {
            return false;
        };
        let mut stack = vec![child];
        let mut seen = HashSet::new();
        while let Some(id) = stack.pop() {
            if id == target {
                return true;
            }
            if !seen.insert(id) {
                continue;
            }
            for weighted in self.cells[id.0].steps() {
                if let StepKind::Unary { child } = weighted.step().kind {
                    stack.push(child);
                }
            }
        }
        false
    }

    fn recompute(&mut self, id: CellId) {
        let summary = CellSummary::compute(self.cells[id.0].steps(), &self.cells);
        self.cells[id.0].set_summary(summary);
    }

    /// Span cells sorted so unary children precede their parents.
    fn topological_order(&self, slot: usize) -> Vec<CellId> {
        let ids = &self.spans[slot].cells;
        let mut graph = DiGraph::<CellId, ()>::new();
        let nodes: HashMap<CellId, NodeIndex> =
            ids.iter().map(|&id| (id, graph.add_node(id))).collect();
        for id in ids {
            let Some(&node) = nodes.get(id) else {
                continue;
            };
            for weighted in self.cells[id.0].steps() {
                if let StepKind::Unary { child } = weighted.step().kind {
                    if let Some(&from) = nodes.get(&child) {
                        graph.add_edge(from, node, ());
                    }
                }
            }
        }
        match toposort(&graph, None) {
            Ok(sorted) => sorted.into_iter().map(|node| graph[node]).collect(),
            Err(cycle) => {
                tracing::warn!(cell = graph[cycle.node_id()].0, "unary cycle in span");
                ids.clone()
            }
        }
    }

    /// Recompute summaries, trim Viterbi cells and apply the beam. Unless
    /// `prune_lexical` is set, cells with a lexical step are exempt from the
    /// beam and do not count against it. Returns the number of cells the
    /// beam dropped.
    pub(crate) fn finalize_span(
        &mut self,
        start: usize,
        end: usize,
        beam: Option<usize>,
        prune_lexical: bool,
    ) -> usize {
        let slot = self.slot(start, end);
        let order = self.topological_order(slot);
        for &id in &order {
            self.recompute(id);
            if self.mode == InferenceMode::Viterbi {
                self.cells[id.0].retain_viterbi_steps();
                self.recompute(id);
            }
        }
        self.order.extend(order.iter().copied());
        self.spans[slot].cells = order;

        let Some(beam) = beam else {
            return 0;
        };
        let cells = &self.cells;
        let competing = |id: &CellId| prune_lexical || !cells[id.0].is_lexical();
        let mut scores: Vec<f64> = self.spans[slot]
            .cells
            .iter()
            .filter(|id| competing(*id))
            .map(|id| cells[id.0].viterbi_score())
            .collect();
        if scores.len() <= beam {
            return 0;
        }

        // Keep the competing cells scoring strictly above the first cell
        // outside the beam; ties at the boundary go together.
        scores.sort_by(|a, b| b.total_cmp(a));
        let boundary = scores[beam];
        let keep = |id: &CellId| !competing(id) || cells[id.0].viterbi_score() > boundary;

        let entry = &mut self.spans[slot];
        let before = entry.cells.len();
        entry.cells.retain(|id| keep(id));
        entry.index.retain(|_, id| keep(&*id));
        entry.pruned = true;
        before - entry.cells.len()
    }

    /// Complete-span full parses accepted by `filter`.
    pub fn full_parses(&self, filter: &dyn Fn(&Category) -> bool) -> Vec<CellId> {
        if self.sentence_length == 0 {
            return Vec::new();
        }
        self.span_cells(0, self.sentence_length - 1)
            .iter()
            .copied()
            .filter(|&id| {
                let cell = &self.cells[id.0];
                cell.is_full_parse() && filter(cell.category())
            })
            .collect()
    }

    /// Log of the summed weight of every full parse accepted by `filter`.
    pub fn log_norm(&self, filter: &dyn Fn(&Category) -> bool) -> f64 {
        log_sum_exp_all(
            self.full_parses(filter)
                .into_iter()
                .map(|id| self.cells[id.0].log_inside_score()),
        )
    }

    /// Log outside score of every cell, indexed by [`CellId::index`], with
    /// the full parses accepted by `filter` as roots.
    pub fn outside_scores(&self, filter: &dyn Fn(&Category) -> bool) -> Vec<f64> {
        let mut outside = vec![f64::NEG_INFINITY; self.cells.len()];
        for id in self.full_parses(filter) {
            outside[id.0] = 0.0;
        }
        for &id in self.order.iter().rev() {
            let score = outside[id.0];
            if score == f64::NEG_INFINITY {
                continue;
            }
            for weighted in self.cells[id.0].steps() {
                let base = score + weighted.local_score();
                match weighted.step().kind {
                    StepKind::Lexical(_) => {}
                    StepKind::Unary { child } => {
                        outside[child.0] = log_sum_exp(outside[child.0], base);
                    }
                    StepKind::Binary { left, right } => {
                        let left_inside = self.cells[left.0].log_inside_score();
                        let right_inside = self.cells[right.0].log_inside_score();
                        outside[left.0] = log_sum_exp(outside[left.0], base + right_inside);
                        outside[right.0] = log_sum_exp(outside[right.0], base + left_inside);
                    }
                }
            }
        }
        outside
    }

    /// Feature expectations under the distribution over full parses
    /// accepted by `filter`.
    pub fn expected_features(&self, filter: &dyn Fn(&Category) -> bool) -> SparseVector {
        let mut expected = SparseVector::new();
        let norm = self.log_norm(filter);
        if norm == f64::NEG_INFINITY {
            return expected;
        }
        let outside = self.outside_scores(filter);
        for &id in &self.order {
            let score = outside[id.0];
            if score == f64::NEG_INFINITY {
                continue;
            }
            for weighted in self.cells[id.0].steps() {
                let inside: f64 = weighted
                    .step()
                    .children()
                    .map(|child| self.cells[child.0].log_inside_score())
                    .sum();
                let probability = (score + weighted.local_score() + inside - norm).exp();
                weighted.features().add_times_into(probability, &mut expected);
            }
        }
        expected
    }
}

impl fmt::Display for Chart {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let n = self.sentence_length;
        for length in (1..=n).rev() {
            for start in 0..=n - length {
                for id in self.span_cells(start, start + length - 1) {
                    writeln!(f, "{}", self.cells[id.0])?;
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Model;
    use crate::step::ParseStep;
    use semparse_ccg::lexicon::FIXED_ORIGIN;
    use semparse_ccg::{CategoryServices, LexicalEntry, RuleName};
    use semparse_logic::LogicContext;
    use std::sync::Arc;

    fn services() -> CategoryServices {
        CategoryServices::new(Arc::new(LogicContext::builder().build().unwrap()))
    }

    fn weights() -> SparseVector {
        let mut weights = SparseVector::new();
        weights.set(("LEX", "x", "N : a:<e,t>"), 1.0);
        weights
    }

    fn lexical(services: &CategoryServices, line: &str, span: SentenceSpan, model: &Model) -> WeightedStep {
        let entry = LexicalEntry::read(line, services, FIXED_ORIGIN).unwrap();
        WeightedStep::new(ParseStep::lexical(entry, span, span.is_complete()), model)
    }

    #[test]
    fn test_cells_pack_same_category() {
        let services = services();
        let model = Model::standard(weights());
        let mut chart = Chart::new(1, InferenceMode::Graph);
        let span = SentenceSpan::new(0, 0, 1);

        let (a, new_a) = chart.add(lexical(&services, "x :- N : a:<e,t>", span, &model));
        let (b, new_b) = chart.add(lexical(&services, "x :- N : b:<e,t>", span, &model));
        assert!(new_a && new_b);
        assert_ne!(a, b);
        assert_eq!(chart.span_size(0, 0), 2);

        chart.finalize_span(0, 0, None, false);
        assert_eq!(chart.cell(a).viterbi_score(), 1.0);
        assert_eq!(chart.cell(b).viterbi_score(), 0.0);
        assert!(chart.is_exact());

        let all = |_: &Category| true;
        let norm = chart.log_norm(&all);
        assert!((norm - (1.0f64.exp() + 1.0).ln()).abs() < 1e-9);
        let expected = chart.expected_features(&all);
        let p = 1.0f64.exp() / (1.0f64.exp() + 1.0);
        assert!((expected.get(("LEX", "x", "N : a:<e,t>")) - p).abs() < 1e-9);
    }

    #[test]
    fn test_beam_drops_boundary_ties() {
        let services = services();
        let model = Model::standard(weights());
        let mut chart = Chart::new(1, InferenceMode::Viterbi);
        let span = SentenceSpan::new(0, 0, 1);
        chart.add(lexical(&services, "x :- N : a:<e,t>", span, &model));
        chart.add(lexical(&services, "x :- N : b:<e,t>", span, &model));
        chart.add(lexical(&services, "x :- N : c:<e,t>", span, &model));

        // b and c tie at the boundary of a beam of two.
        let dropped = chart.finalize_span(0, 0, Some(2), true);
        assert_eq!(dropped, 2);
        assert_eq!(chart.span_size(0, 0), 1);
        assert!(chart.is_pruned(0, 0));
        assert!(!chart.is_exact());
    }

    #[test]
    fn test_beam_spares_lexical_cells() {
        let services = services();
        let model = Model::standard(weights());
        let mut chart = Chart::new(1, InferenceMode::Viterbi);
        let span = SentenceSpan::new(0, 0, 1);
        let (a, _) = chart.add(lexical(&services, "x :- N : a:<e,t>", span, &model));
        chart.add(lexical(&services, "x :- N : b:<e,t>", span, &model));
        chart.add(lexical(&services, "x :- N : c:<e,t>", span, &model));
        let np = services.read("NP : a:<e,t>").unwrap();
        let shifted = |rule: &str, category: Category| ParseStep {
            kind: StepKind::Unary { child: a },
            rule: RuleName::unary(rule),
            category,
            span,
            full_parse: true,
        };
        chart.add(WeightedStep::new(shifted("shift", np), &model));
        let s = services.read("S : a:<e,t>").unwrap();
        chart.add(WeightedStep::new(shifted("shift", s), &model));

        // The two derived cells tie at 1.0 and a beam of one drops both.
        let dropped = chart.finalize_span(0, 0, Some(1), false);
        assert_eq!(dropped, 2);
        assert_eq!(chart.span_size(0, 0), 3);
        assert!(chart
            .span_cells(0, 0)
            .iter()
            .all(|&id| chart.cell(id).is_lexical()));
        assert!(chart.is_pruned(0, 0));
    }

    #[test]
    fn test_beam_ignores_spans_within_width() {
        let services = services();
        let model = Model::standard(weights());
        let mut chart = Chart::new(1, InferenceMode::Viterbi);
        let span = SentenceSpan::new(0, 0, 1);
        chart.add(lexical(&services, "x :- N : a:<e,t>", span, &model));
        chart.add(lexical(&services, "x :- N : b:<e,t>", span, &model));

        assert_eq!(chart.finalize_span(0, 0, Some(1), false), 0);
        assert_eq!(chart.span_size(0, 0), 2);
        assert!(chart.is_exact());
    }

    #[test]
    fn test_unary_cycle_detection() {
        let services = services();
        let model = Model::new(SparseVector::new());
        let mut chart = Chart::new(1, InferenceMode::Graph);
        let span = SentenceSpan::new(0, 0, 1);
        let (n, _) = chart.add(lexical(&services, "x :- N : a:<e,t>", span, &model));
        let np = services.read("NP : a:<e,t>").unwrap();
        let step = ParseStep {
            kind: StepKind::Unary { child: n },
            rule: RuleName::unary("shift"),
            category: np.clone(),
            span,
            full_parse: true,
        };
        let (np_id, _) = chart.add(WeightedStep::new(step, &model));

        let n_category = chart.cell(n).category().clone();
        assert!(chart.creates_unary_cycle(np_id, &n_category));
        assert!(chart.creates_unary_cycle(np_id, &np));
        assert!(!chart.creates_unary_cycle(n, &np));

        chart.finalize_span(0, 0, None, false);
        assert_eq!(chart.span_cells(0, 0), &[n, np_id]);
        assert_eq!(chart.cell(np_id).num_parses(), 1);
    }
}
