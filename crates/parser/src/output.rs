//! # Parser Output
//!
//! A [`ParserOutput`] owns the finished chart and lists one [`Derivation`]
//! per full-parse cell over the whole sentence. A derivation is a handle
//! into the chart: scores are read off the cell, and the lexical entries,
//! rules and features of its best derivations are collected by walking the
//! Viterbi steps down to the words.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use semparse_ccg::{Category, LexicalEntry, RuleName};
use semparse_core::SparseVector;
use semparse_logic::LogicalExpression;

use crate::cell::{Cell, CellId};
use crate::chart::Chart;
use crate::config::InferenceMode;
use crate::step::WeightedStep;

/// Inside/outside quantities over the full parses accepted by a filter.
#[derive(Debug, Clone, PartialEq)]
pub struct GraphStatistics {
    /// Log of the summed weight of the accepted parses.
    pub log_norm: f64,
    pub expected_features: SparseVector,
    /// False when the chart was pruned, built in Viterbi mode or abandoned,
    /// so the numbers only approximate the full distribution.
    pub exact: bool,
}

/// A rule used by the best derivations, with the spans it covered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleUsage {
    pub rule: RuleName,
    /// Inclusive `(start, end)` pairs.
    pub spans: Vec<(usize, usize)>,
}

/// Result of parsing one sentence.
#[derive(Debug, Clone)]
pub struct ParserOutput {
    chart: Arc<Chart>,
    derivations: Vec<Derivation>,
    parse_time: Duration,
    timed_out: bool,
}

impl ParserOutput {
    pub(crate) fn new(chart: Arc<Chart>, parse_time: Duration, timed_out: bool) -> Self {
        let derivations = if timed_out {
            Vec::new()
        } else {
            chart
                .full_parses(&|_| true)
                .into_iter()
                .map(|cell| Derivation {
                    chart: Arc::clone(&chart),
                    cell,
                })
                .collect()
        };
        Self {
            chart,
            derivations,
            parse_time,
            timed_out,
        }
    }

    pub fn chart(&self) -> &Chart {
        &self.chart
    }

    /// Every full parse, in chart order.
    pub fn derivations(&self) -> &[Derivation] {
        &self.derivations
    }

    /// Full parses whose category passes `filter`.
    pub fn derivations_where(&self, filter: impl Fn(&Category) -> bool) -> Vec<&Derivation> {
        self.derivations
            .iter()
            .filter(|derivation| filter(derivation.category()))
            .collect()
    }

    /// Full parses with the highest Viterbi score. Ties are all returned.
    pub fn best_derivations(&self) -> Vec<&Derivation> {
        let best = self
            .derivations
            .iter()
            .map(Derivation::viterbi_score)
            .fold(f64::NEG_INFINITY, f64::max);
        self.derivations
            .iter()
            .filter(|derivation| derivation.viterbi_score() == best)
            .collect()
    }

    /// Derivations whose semantics equal `semantics`.
    pub fn derivations_with_semantics(&self, semantics: &LogicalExpression) -> Vec<&Derivation> {
        self.derivations
            .iter()
            .filter(|derivation| derivation.semantics() == Some(semantics))
            .collect()
    }

    pub fn parse_time(&self) -> Duration {
        self.parse_time
    }

    /// True when no span lost cells to the beam.
    pub fn is_exact(&self) -> bool {
        self.chart.is_exact()
    }

    pub fn timed_out(&self) -> bool {
        self.timed_out
    }

    pub fn graph_statistics(&self, filter: impl Fn(&Category) -> bool) -> GraphStatistics {
        if self.timed_out {
            return GraphStatistics {
                log_norm: f64::NEG_INFINITY,
                expected_features: SparseVector::new(),
                exact: false,
            };
        }
        GraphStatistics {
            log_norm: self.chart.log_norm(&filter),
            expected_features: self.chart.expected_features(&filter),
            exact: self.chart.is_exact() && self.chart.mode() == InferenceMode::Graph,
        }
    }
}

/// One complete-span category and the derivations packed under it.
#[derive(Debug, Clone)]
pub struct Derivation {
    chart: Arc<Chart>,
    cell: CellId,
}

impl Derivation {
    fn root(&self) -> &Cell {
        self.chart.cell(self.cell)
    }

    pub fn cell_id(&self) -> CellId {
        self.cell
    }

    pub fn chart(&self) -> &Chart {
        &self.chart
    }

    pub fn category(&self) -> &Category {
        self.root().category()
    }

    pub fn semantics(&self) -> Option<&LogicalExpression> {
        self.root().category().semantics()
    }

    pub fn viterbi_score(&self) -> f64 {
        self.root().viterbi_score()
    }

    pub fn log_inside_score(&self) -> f64 {
        self.root().log_inside_score()
    }

    pub fn num_parses(&self) -> u64 {
        self.root().num_parses()
    }

    pub fn num_viterbi_parses(&self) -> u64 {
        self.root().num_viterbi_parses()
    }

    /// Visit each step reachable from the root once.
    fn walk<'a>(&'a self, viterbi_only: bool, mut visit: impl FnMut(&'a WeightedStep)) {
        let mut stack = vec![self.cell];
        let mut seen = HashSet::new();
        while let Some(id) = stack.pop() {
            if !seen.insert(id) {
                continue;
            }
            let cell = self.chart.cell(id);
            let steps: Box<dyn Iterator<Item = &'a WeightedStep> + 'a> = if viterbi_only {
                Box::new(cell.viterbi_steps())
            } else {
                Box::new(cell.steps().iter())
            };
            for weighted in steps {
                visit(weighted);
                stack.extend(weighted.step().children());
            }
        }
    }

    fn lexical_entries(&self, viterbi_only: bool) -> Vec<LexicalEntry> {
        let mut found: Vec<(usize, &LexicalEntry)> = Vec::new();
        self.walk(viterbi_only, |weighted| {
            if let Some(entry) = weighted.step().lexical_entry() {
                let start = weighted.step().span.start;
                if !found.iter().any(|(s, e)| *s == start && *e == entry) {
                    found.push((start, entry));
                }
            }
        });
        found.sort_by_key(|(start, _)| *start);
        found.into_iter().map(|(_, entry)| entry.clone()).collect()
    }

    /// Lexical entries of the best derivations, in sentence order.
    pub fn max_lexical_entries(&self) -> Vec<LexicalEntry> {
        self.lexical_entries(true)
    }

    /// Lexical entries of every packed derivation, in sentence order.
    pub fn all_lexical_entries(&self) -> Vec<LexicalEntry> {
        self.lexical_entries(false)
    }

    /// Rules of the best derivations, lexical steps excluded.
    pub fn max_rules(&self) -> Vec<RuleUsage> {
        let mut usage: BTreeMap<RuleName, BTreeSet<(usize, usize)>> = BTreeMap::new();
        self.walk(true, |weighted| {
            let step = weighted.step();
            if !step.is_lexical() {
                usage
                    .entry(step.rule.clone())
                    .or_default()
                    .insert((step.span.start, step.span.end));
            }
        });
        usage
            .into_iter()
            .map(|(rule, spans)| RuleUsage {
                rule,
                spans: spans.into_iter().collect(),
            })
            .collect()
    }

    /// Features of the best derivations. Where several steps tie, their
    /// feature vectors are averaged.
    pub fn average_max_features(&self) -> SparseVector {
        let mut memo = HashMap::new();
        self.averaged_features(self.cell, &mut memo)
    }

    fn averaged_features(&self, id: CellId, memo: &mut HashMap<CellId, SparseVector>) -> SparseVector {
        if let Some(features) = memo.get(&id) {
            return features.clone();
        }
        let cell = self.chart.cell(id);
        let mut total = SparseVector::new();
        let mut count = 0usize;
        for weighted in cell.viterbi_steps() {
            total.add_all(weighted.features());
            for child in weighted.step().children() {
                total.add_all(&self.averaged_features(child, memo));
            }
            count += 1;
        }
        if count > 1 {
            total.divide_by(count as f64);
        }
        memo.insert(id, total.clone());
        total
    }
}

impl fmt::Display for Derivation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} [viterbi={:.3}, parses={}]",
            self.category(),
            self.viterbi_score(),
            self.num_parses()
        )
    }
}
