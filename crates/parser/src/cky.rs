//! # CKY Parser
//!
//! Bottom-up chart parsing over spans of increasing length:
//!
//! ```text
//!   for each span, shortest first:
//!     1. lexical steps for the span's tokens (and EMPTY for skipped words)
//!     2. binary steps over every split point, rule and pair of cells,
//!        filtered by the normal-form validator
//!     3. unary closure, at most `max_unary_depth` rounds, cycle free
//!     4. finalize: recompute scores, trim to Viterbi steps, apply the beam
//! ```
//!
//! Candidate categories are dropped before they reach the chart when they
//! have no semantics (other than `EMPTY`), or when they cover the whole
//! sentence without being a full parse and no unary rule can still turn
//! them into one. Lexical steps are never dropped.
//!
//! The cancel flag and the configured deadline are checked before every
//! span and for every left cell of a split point. A parse that runs out of
//! time keeps its partial chart but reports no derivations.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use semparse_ccg::{
    BinaryRule, Category, CategoryServices, LexicalEntry, Lexicon, NormalFormValidator, RuleName,
    SentenceSpan, UnaryRule,
};
use semparse_core::CancelFlag;

use crate::cell::CellId;
use crate::chart::Chart;
use crate::config::ParserConfig;
use crate::model::Model;
use crate::output::ParserOutput;
use crate::step::{ParseStep, StepKind, WeightedStep};
use crate::ParseError;

/// Origin recorded on the `EMPTY` entries added for word skipping.
pub const SKIPPING_ORIGIN: &str = "skipping";

/// Extra test a complete-span category must pass to be a full parse.
pub type CompleteParseFilter = Arc<dyn Fn(&Category) -> bool + Send + Sync>;

pub struct CkyParser {
    services: CategoryServices,
    lexicon: Arc<Lexicon>,
    binary_rules: Vec<(BinaryRule, RuleName)>,
    unary_rules: Vec<(UnaryRule, RuleName)>,
    validator: NormalFormValidator,
    model: Arc<Model>,
    config: ParserConfig,
    complete_parse_filter: CompleteParseFilter,
}

impl fmt::Debug for CkyParser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CkyParser")
            .field("lexicon_entries", &self.lexicon.len())
            .field("binary_rules", &self.binary_rules.len())
            .field("unary_rules", &self.unary_rules.len())
            .field("validator", &self.validator)
            .field("config", &self.config)
            .finish()
    }
}

pub struct CkyParserBuilder {
    services: CategoryServices,
    lexicon: Arc<Lexicon>,
    binary_rules: Vec<BinaryRule>,
    unary_rules: Vec<UnaryRule>,
    validator: NormalFormValidator,
    model: Arc<Model>,
    config: ParserConfig,
    complete_parse_filter: Option<CompleteParseFilter>,
}

impl CkyParserBuilder {
    pub fn binary_rule(mut self, rule: BinaryRule) -> Self {
        self.binary_rules.push(rule);
        self
    }

    pub fn binary_rules(mut self, rules: impl IntoIterator<Item = BinaryRule>) -> Self {
        self.binary_rules.extend(rules);
        self
    }

    pub fn unary_rule(mut self, rule: UnaryRule) -> Self {
        self.unary_rules.push(rule);
        self
    }

    pub fn validator(mut self, validator: NormalFormValidator) -> Self {
        self.validator = validator;
        self
    }

    pub fn model(mut self, model: Arc<Model>) -> Self {
        self.model = model;
        self
    }

    pub fn config(mut self, config: ParserConfig) -> Self {
        self.config = config;
        self
    }

    /// Restrict full parses further, e.g. to a sentence category.
    pub fn complete_parse_filter<F>(mut self, filter: F) -> Self
    where
        F: Fn(&Category) -> bool + Send + Sync + 'static,
    {
        self.complete_parse_filter = Some(Arc::new(filter));
        self
    }

    pub fn build(self) -> Result<CkyParser, ParseError> {
        self.config.validate()?;
        if self.config.word_skipping && !self.binary_rules.iter().any(BinaryRule::is_skipping) {
            tracing::warn!("word skipping enabled without skipping rules; skipped words cannot combine");
        }
        tracing::info!(
            beam = ?self.config.beam,
            mode = ?self.config.mode,
            binary_rules = self.binary_rules.len(),
            unary_rules = self.unary_rules.len(),
            constraints = self.validator.len(),
            word_skipping = self.config.word_skipping,
            "cky parser"
        );
        Ok(CkyParser {
            services: self.services,
            lexicon: self.lexicon,
            binary_rules: self
                .binary_rules
                .into_iter()
                .map(|rule| {
                    let name = rule.name();
                    (rule, name)
                })
                .collect(),
            unary_rules: self
                .unary_rules
                .into_iter()
                .map(|rule| {
                    let name = rule.name();
                    (rule, name)
                })
                .collect(),
            validator: self.validator,
            model: self.model,
            config: self.config,
            complete_parse_filter: self
                .complete_parse_filter
                .unwrap_or_else(|| Arc::new(|_: &Category| true)),
        })
    }
}

impl CkyParser {
    /// A builder with no rules, an empty model and the default config.
    pub fn builder(services: CategoryServices, lexicon: Arc<Lexicon>) -> CkyParserBuilder {
        CkyParserBuilder {
            services,
            lexicon,
            binary_rules: Vec::new(),
            unary_rules: Vec::new(),
            validator: NormalFormValidator::default(),
            model: Arc::new(Model::default()),
            config: ParserConfig::default(),
            complete_parse_filter: None,
        }
    }

    pub fn services(&self) -> &CategoryServices {
        &self.services
    }

    pub fn lexicon(&self) -> &Arc<Lexicon> {
        &self.lexicon
    }

    pub fn model(&self) -> &Arc<Model> {
        &self.model
    }

    pub fn config(&self) -> &ParserConfig {
        &self.config
    }

    pub fn validator(&self) -> &NormalFormValidator {
        &self.validator
    }

    pub fn binary_rules(&self) -> impl Iterator<Item = &BinaryRule> {
        self.binary_rules.iter().map(|(rule, _)| rule)
    }

    pub fn unary_rules(&self) -> impl Iterator<Item = &UnaryRule> {
        self.unary_rules.iter().map(|(rule, _)| rule)
    }

    pub fn parse(&self, tokens: &[String]) -> Result<ParserOutput, ParseError> {
        self.parse_with(tokens, None, &CancelFlag::new())
    }

    pub fn parse_with_cancel(
        &self,
        tokens: &[String],
        cancel: &CancelFlag,
    ) -> Result<ParserOutput, ParseError> {
        self.parse_with(tokens, None, cancel)
    }

    /// Parse with a sentence-specific lexicon on top of the parser's own.
    pub fn parse_with(
        &self,
        tokens: &[String],
        extra_lexicon: Option<&Lexicon>,
        cancel: &CancelFlag,
    ) -> Result<ParserOutput, ParseError> {
        let started = Instant::now();
        let n = tokens.len();
        if n > self.config.max_sentence_length {
            return Err(ParseError::SentenceTooLong {
                length: n,
                max: self.config.max_sentence_length,
            });
        }
        let deadline = self.config.timeout().map(|timeout| started + timeout);

        let expired = || cancel.is_cancelled() || deadline.is_some_and(|d| Instant::now() >= d);

        let mut chart = Chart::new(n, self.config.mode);
        let mut timed_out = false;

        'spans: for length in 1..=n {
            for start in 0..=n - length {
                if expired() {
                    timed_out = true;
                    break 'spans;
                }
                let span = SentenceSpan::new(start, start + length - 1, n);
                self.lexical_steps(&mut chart, tokens, extra_lexicon, span);
                let pruned = if length > 1 {
                    match self.binary_steps(&mut chart, span, &expired) {
                        Some(pruned) => pruned,
                        None => {
                            timed_out = true;
                            break 'spans;
                        }
                    }
                } else {
                    0
                };
                self.unary_closure(&mut chart, span);
                let dropped = chart.finalize_span(
                    span.start,
                    span.end,
                    self.config.beam,
                    self.config.prune_lexical_cells,
                );
                tracing::debug!(
                    start = span.start,
                    end = span.end,
                    cells = chart.span_size(span.start, span.end),
                    pruned,
                    beam_dropped = dropped,
                    "span complete"
                );
            }
        }

        let elapsed = started.elapsed();
        if timed_out {
            tracing::warn!(tokens = n, elapsed_ms = elapsed.as_millis() as u64, "parse abandoned");
        }
        Ok(ParserOutput::new(Arc::new(chart), elapsed, timed_out))
    }

    fn is_full_parse(&self, span: SentenceSpan, category: &Category) -> bool {
        span.is_complete() && category.semantics().is_some() && (self.complete_parse_filter)(category)
    }

    /// Whether a non-lexical candidate is dropped before reaching the
    /// chart. `unary_pending` allows complete-span categories that a unary
    /// rule may still turn into a full parse.
    fn prune(&self, category: &Category, span: SentenceSpan, full_parse: bool, unary_pending: bool) -> bool {
        if category.semantics().is_none() && !category.is_empty() {
            return true;
        }
        if span.is_complete() && !full_parse {
            let rescued = unary_pending
                && self
                    .unary_rules
                    .iter()
                    .any(|(rule, _)| rule.is_valid_argument(category, span));
            return !rescued;
        }
        false
    }

    fn lexical_steps(
        &self,
        chart: &mut Chart,
        tokens: &[String],
        extra_lexicon: Option<&Lexicon>,
        span: SentenceSpan,
    ) {
        let words = &tokens[span.start..=span.end];
        let mut entries: Vec<LexicalEntry> = Vec::new();
        if words.len() <= self.lexicon.max_tokens() {
            entries.extend(self.lexicon.get(words).iter().cloned());
        }
        if let Some(extra) = extra_lexicon {
            if words.len() <= extra.max_tokens() {
                entries.extend(
                    extra
                        .get(words)
                        .iter()
                        .filter(|entry| !self.lexicon.contains(entry))
                        .cloned(),
                );
            }
        }
        if self.config.word_skipping && words.len() == 1 {
            entries.push(LexicalEntry::new(words.to_vec(), Category::empty(), SKIPPING_ORIGIN));
        }

        for entry in entries {
            let full_parse = self.is_full_parse(span, entry.category());
            let step = ParseStep::lexical(entry, span, full_parse);
            chart.add(WeightedStep::new(step, &self.model));
        }
    }

    /// Returns the number of candidates pruned, or `None` if `expired`
    /// fired before every split point was tried. Nothing is added to the
    /// chart in that case.
    fn binary_steps(
        &self,
        chart: &mut Chart,
        span: SentenceSpan,
        expired: &dyn Fn() -> bool,
    ) -> Option<usize> {
        let mut steps = Vec::new();
        let mut pruned = 0;
        for split in span.start..span.end {
            for &left_id in chart.span_cells(span.start, split) {
                if expired() {
                    return None;
                }
                let left = chart.cell(left_id);
                for &right_id in chart.span_cells(split + 1, span.end) {
                    let right = chart.cell(right_id);
                    for (rule, name) in &self.binary_rules {
                        if !self
                            .validator
                            .is_valid_binary(left.rule_names(), right.rule_names(), name)
                        {
                            continue;
                        }
                        let Some(result) =
                            rule.apply(&self.services, left.category(), right.category(), span)
                        else {
                            continue;
                        };
                        let full_parse = self.is_full_parse(span, &result.category);
                        if self.prune(&result.category, span, full_parse, self.config.max_unary_depth > 0) {
                            pruned += 1;
                            continue;
                        }
                        steps.push(ParseStep {
                            kind: StepKind::Binary {
                                left: left_id,
                                right: right_id,
                            },
                            rule: result.name,
                            category: result.category,
                            span,
                            full_parse,
                        });
                    }
                }
            }
        }
        for step in steps {
            chart.add(WeightedStep::new(step, &self.model));
        }
        Some(pruned)
    }

    fn unary_closure(&self, chart: &mut Chart, span: SentenceSpan) {
        if self.unary_rules.is_empty() {
            return;
        }
        let depth = self.config.max_unary_depth;
        let mut frontier: Vec<CellId> = chart.span_cells(span.start, span.end).to_vec();
        let mut applied: HashSet<(CellId, usize)> = HashSet::new();

        for round in 0..depth {
            let unary_pending = round + 1 < depth;
            let mut steps = Vec::new();
            for &child in &frontier {
                let cell = chart.cell(child);
                for (index, (rule, name)) in self.unary_rules.iter().enumerate() {
                    if !applied.insert((child, index)) {
                        continue;
                    }
                    if !self.validator.is_valid_unary(cell.rule_names(), name) {
                        continue;
                    }
                    let Some(result) = rule.apply(&self.services, cell.category(), span) else {
                        continue;
                    };
                    let full_parse = self.is_full_parse(span, &result.category);
                    if self.prune(&result.category, span, full_parse, unary_pending) {
                        continue;
                    }
                    steps.push((
                        child,
                        ParseStep {
                            kind: StepKind::Unary { child },
                            rule: result.name,
                            category: result.category,
                            span,
                            full_parse,
                        },
                    ));
                }
            }

            let mut next = Vec::new();
            for (child, step) in steps {
                if chart.creates_unary_cycle(child, &step.category) {
                    tracing::trace!(rule = %step.rule, category = %step.category, "unary cycle skipped");
                    continue;
                }
                let (id, _) = chart.add(WeightedStep::new(step, &self.model));
                if !next.contains(&id) {
                    next.push(id);
                }
            }
            if next.is_empty() {
                break;
            }
            frontier = next;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use semparse_ccg::lexicon::{tokenize, FIXED_ORIGIN};
    use semparse_logic::LogicContext;
    use std::cell::Cell as Counter;

    fn parser() -> CkyParser {
        let services = CategoryServices::new(Arc::new(LogicContext::builder().build().unwrap()));
        let lexicon = Lexicon::read(
            "big :- N/N : (lambda $0:<e,t> (lambda $1:e (and:<t*,t> (big:<e,t> $1) ($0 $1))))\n\
             city :- N : city:<e,t>",
            &services,
            FIXED_ORIGIN,
        )
        .unwrap();
        CkyParser::builder(services, Arc::new(lexicon))
            .binary_rules(BinaryRule::standard(1).unwrap())
            .build()
            .unwrap()
    }

    fn lexical_chart(parser: &CkyParser, tokens: &[String]) -> Chart {
        let mut chart = Chart::new(tokens.len(), parser.config().mode);
        for start in 0..tokens.len() {
            let span = SentenceSpan::new(start, start, tokens.len());
            parser.lexical_steps(&mut chart, tokens, None, span);
            chart.finalize_span(start, start, None, false);
        }
        chart
    }

    #[test]
    fn test_binary_steps_stop_when_expired() {
        let parser = parser();
        let tokens = tokenize("big city");
        let mut chart = lexical_chart(&parser, &tokens);
        let span = SentenceSpan::new(0, 1, 2);

        let checks = Counter::new(0);
        let expired = || {
            checks.set(checks.get() + 1);
            true
        };
        assert_eq!(parser.binary_steps(&mut chart, span, &expired), None);
        assert_eq!(checks.get(), 1);
        assert_eq!(chart.span_size(0, 1), 0);
    }

    #[test]
    fn test_binary_steps_fill_span_in_time() {
        let parser = parser();
        let tokens = tokenize("big city");
        let mut chart = lexical_chart(&parser, &tokens);
        let span = SentenceSpan::new(0, 1, 2);

        assert_eq!(parser.binary_steps(&mut chart, span, &|| false), Some(0));
        assert_eq!(chart.span_size(0, 1), 1);
    }
}
