//! End-to-end parsing tests: a small geography grammar run through the
//! CKY parser.
//!
//! Covered here:
//! - derivations, scores and derivation inspection
//! - word skipping, coordination and unary rules in the chart
//! - normal-form soundness and determinism on unpruned charts
//! - graph inference, beam pruning, deadlines and parallel parsing

use std::collections::HashSet;
use std::sync::Arc;

use proptest::prelude::*;
use semparse_ccg::lexicon::{tokenize, FIXED_ORIGIN};
use semparse_ccg::{
    ApplicationTypeShifting, BinaryRule, CategoryServices, CoordinationServices, Direction,
    EisnerConstraint, Lexicon, NormalFormValidator, RuleName, SkolemIdRule, Syntax,
    UnaryConstraint, UnaryRule,
};
use semparse_core::{CancelFlag, SparseVector, TaskOutcome};
use semparse_logic::LogicContext;
use semparse_parser::{
    CkyParser, CkyParserBuilder, InferenceMode, LexicalFeatureSet, Model, ParallelParser,
    ParseError, ParserConfig,
};

const LEXICON: &str = "\
// nouns and modifiers
big :- N/N : (lambda $0:<e,t> (lambda $1:e (and:<t*,t> (big:<e,t> $1) ($0 $1))))
city :- N : city:<e,t>
town :- N : town:<e,t>
bank :- N : bank:<e,t>
bank :- N : shore:<e,t>
or :- C : disj:t
// a few verbs
maybe :- S/S : (lambda $0:t (maybe:<t,t> $0))
not :- S/S : (lambda $0:t (not:<t,t> $0))
sleeps :- S/NP : (lambda $0:e (sleep:<e,t> $0))
paris :- NP : paris:e
";

fn context() -> Arc<LogicContext> {
    Arc::new(LogicContext::builder().build().unwrap())
}

fn services() -> CategoryServices {
    CategoryServices::new(context())
}

fn lexicon(services: &CategoryServices) -> Arc<Lexicon> {
    Arc::new(Lexicon::read(LEXICON, services, FIXED_ORIGIN).unwrap())
}

fn builder(config: ParserConfig) -> CkyParserBuilder {
    let services = services();
    let lexicon = lexicon(&services);
    CkyParser::builder(services, lexicon)
        .binary_rules(BinaryRule::standard(1).unwrap())
        .config(config)
}

fn graph_config() -> ParserConfig {
    ParserConfig {
        beam: None,
        mode: InferenceMode::Graph,
        ..ParserConfig::default()
    }
}

fn lexical_weights(weights: &[(&str, &str, f64)]) -> Arc<Model> {
    let mut vector = SparseVector::new();
    for (tokens, category, value) in weights {
        vector.set(("LEX", *tokens, *category), *value);
    }
    Arc::new(Model::new(vector).with_feature_set(LexicalFeatureSet))
}

// ============================================================================
// Derivations
// ============================================================================

#[test]
fn big_city_parses_to_conjunction() {
    let parser = builder(ParserConfig::default()).build().unwrap();
    let output = parser.parse(&tokenize("big city")).unwrap();

    assert_eq!(output.derivations().len(), 1);
    let best = output.best_derivations();
    assert_eq!(best.len(), 1);
    assert_eq!(
        best[0].category().to_string(),
        "N : (lambda $0:e (and:<t*,t> (big:<e,t> $0) (city:<e,t> $0)))"
    );
    assert_eq!(best[0].num_parses(), 1);
    assert!(output.is_exact());
    assert!(!output.timed_out());

    let entries = best[0].max_lexical_entries();
    let words: Vec<String> = entries.iter().map(|e| e.tokens().join(" ")).collect();
    assert_eq!(words, vec!["big", "city"]);

    let rules = best[0].max_rules();
    assert_eq!(rules.len(), 1);
    assert_eq!(rules[0].rule.to_string(), ">apply");
    assert_eq!(rules[0].spans, vec![(0, 1)]);
}

#[test]
fn unknown_word_has_no_parse() {
    let parser = builder(ParserConfig::default()).build().unwrap();
    let output = parser.parse(&tokenize("the city")).unwrap();
    assert!(output.derivations().is_empty());
    assert!(output.best_derivations().is_empty());
}

#[test]
fn empty_sentence_has_no_parse() {
    let parser = builder(ParserConfig::default()).build().unwrap();
    let output = parser.parse(&[]).unwrap();
    assert!(output.derivations().is_empty());
}

#[test]
fn long_sentence_is_rejected() {
    let config = ParserConfig {
        max_sentence_length: 2,
        ..ParserConfig::default()
    };
    let parser = builder(config).build().unwrap();
    assert_eq!(
        parser.parse(&tokenize("big big city")).unwrap_err(),
        ParseError::SentenceTooLong { length: 3, max: 2 }
    );
}

#[test]
fn sentence_lexicon_extends_parser_lexicon() {
    let parser = builder(ParserConfig::default()).build().unwrap();
    let extra = Lexicon::read("village :- N : village:<e,t>", parser.services(), "sentence").unwrap();
    let output = parser
        .parse_with(&tokenize("big village"), Some(&extra), &CancelFlag::new())
        .unwrap();
    assert_eq!(output.derivations().len(), 1);
    assert!(parser.parse(&tokenize("big village")).unwrap().derivations().is_empty());
}

#[test]
fn skipped_word_yields_full_span_parse() {
    let mut weights = SparseVector::new();
    weights.set("SKIP", -1.0);
    let parser = builder(ParserConfig {
        word_skipping: true,
        ..ParserConfig::default()
    })
    .binary_rule(BinaryRule::skipping(Direction::Forward))
    .binary_rule(BinaryRule::skipping(Direction::Backward))
    .model(Arc::new(Model::standard(weights)))
    .build()
    .unwrap();

    let output = parser.parse(&tokenize("the city")).unwrap();
    assert_eq!(output.derivations().len(), 1);
    let derivation = &output.derivations()[0];
    assert_eq!(derivation.category().to_string(), "N : city:<e,t>");
    assert_eq!(derivation.viterbi_score(), -1.0);

    let entries = derivation.max_lexical_entries();
    assert_eq!(entries.len(), 2);
    assert!(entries[0].is_empty_category());
    assert_eq!(entries[0].tokens(), &["the".to_string()]);

    let rules = derivation.max_rules();
    assert_eq!(rules.len(), 1);
    assert_eq!(rules[0].rule.to_string(), "<skip");
}

#[test]
fn coordinated_nouns_distribute_modifier() {
    let ctx = context();
    let services = CategoryServices::new(Arc::clone(&ctx));
    let coordination = Arc::new(CoordinationServices::new(ctx).unwrap());
    let parser = CkyParser::builder(services.clone(), lexicon(&services))
        .binary_rules(BinaryRule::standard(1).unwrap())
        .binary_rules(BinaryRule::coordination(coordination))
        .complete_parse_filter(|category| category.syntax() == &Syntax::n())
        .build()
        .unwrap();

    let output = parser.parse(&tokenize("big city or town")).unwrap();
    assert_eq!(output.derivations().len(), 1);
    assert_eq!(
        output.derivations()[0].category().to_string(),
        "N : (lambda $0:e (or:<t*,t> \
         (and:<t*,t> (big:<e,t> $0) (city:<e,t> $0)) \
         (and:<t*,t> (big:<e,t> $0) (town:<e,t> $0))))"
    );
}

// ============================================================================
// Unary rules
// ============================================================================

fn unary_builder(services: &CategoryServices, depth: usize) -> CkyParserBuilder {
    let quantifier = services
        .context()
        .read("a:<id,<<e,t>,e>>")
        .unwrap()
        .as_constant()
        .cloned()
        .unwrap();
    let shift = ApplicationTypeShifting::read(
        "shift_np",
        "NP/N : (lambda $0:<e,t> (a:<id,<<e,t>,e>> na:id $0))",
        services,
    )
    .unwrap();
    CkyParser::builder(services.clone(), lexicon(services))
        .binary_rules(BinaryRule::standard(1).unwrap())
        .unary_rule(UnaryRule::TypeShifting(shift))
        .unary_rule(UnaryRule::SkolemId(SkolemIdRule::new([quantifier])))
        .complete_parse_filter(|category| category.syntax() == &Syntax::np())
        .config(ParserConfig {
            max_unary_depth: depth,
            ..graph_config()
        })
}

#[test]
fn unary_rules_chain_up_to_depth() {
    let services = services();
    let parser = unary_builder(&services, 2).build().unwrap();
    let output = parser.parse(&tokenize("city")).unwrap();

    let found: Vec<String> = output
        .derivations()
        .iter()
        .map(|d| d.category().to_string())
        .collect();
    assert_eq!(
        found,
        vec![
            "NP : (a:<id,<<e,t>,e>> na:id city:<e,t>)",
            "NP : (a:<id,<<e,t>,e>> !1 city:<e,t>)",
        ]
    );

    let skolemized = &output.derivations()[1];
    let rules: Vec<String> = skolemized
        .max_rules()
        .iter()
        .map(|usage| usage.rule.to_string())
        .collect();
    assert_eq!(rules, vec!["shift_np", "skolem"]);

    let forest = skolemized.forest();
    assert_eq!(forest.node_count(), 4);
    assert_eq!(forest.edge_count(), 3);
    assert!(skolemized.forest_dot().contains("skolem"));

    let shallow = unary_builder(&services, 1).build().unwrap();
    let output = shallow.parse(&tokenize("city")).unwrap();
    assert_eq!(output.derivations().len(), 1);
}

#[test]
fn unary_constraint_blocks_shift_after_application() {
    let services = services();
    let unconstrained = unary_builder(&services, 1).build().unwrap();
    assert_eq!(
        unconstrained.parse(&tokenize("big city")).unwrap().derivations().len(),
        1
    );

    let validator = NormalFormValidator::builder()
        .constraint(UnaryConstraint::new([RuleName::binary("apply", Direction::Forward)]))
        .build();
    let constrained = unary_builder(&services, 1).validator(validator).build().unwrap();
    assert!(constrained
        .parse(&tokenize("big city"))
        .unwrap()
        .derivations()
        .is_empty());
}

// ============================================================================
// Normal form and determinism
// ============================================================================

fn final_forms(parser: &CkyParser, sentence: &str) -> (HashSet<String>, u64) {
    let output = parser.parse(&tokenize(sentence)).unwrap();
    let forms = output
        .derivations()
        .iter()
        .map(|d| d.category().to_string())
        .collect();
    let parses = output.derivations().iter().map(|d| d.num_parses()).sum();
    (forms, parses)
}

#[test]
fn eisner_constraint_keeps_forms_on_unpruned_chart() {
    let sentence = "maybe not sleeps paris";
    let free = builder(graph_config()).build().unwrap();
    let eisner = builder(graph_config())
        .validator(NormalFormValidator::builder().constraint(EisnerConstraint).build())
        .build()
        .unwrap();

    let (free_forms, free_parses) = final_forms(&free, sentence);
    let (eisner_forms, eisner_parses) = final_forms(&eisner, sentence);
    assert_eq!(free_forms, eisner_forms);
    assert!(free_forms.contains("S : (maybe:<t,t> (not:<t,t> (sleep:<e,t> paris:e)))"));
    assert!(eisner_parses < free_parses, "{} >= {}", eisner_parses, free_parses);
    assert!(eisner_parses >= 1);
}

#[test]
fn parsing_is_deterministic() {
    let parser = builder(graph_config()).build().unwrap();
    let first = parser.parse(&tokenize("maybe not sleeps paris")).unwrap();
    let second = parser.parse(&tokenize("maybe not sleeps paris")).unwrap();

    assert_eq!(first.chart().to_string(), second.chart().to_string());
    let render = |output: &semparse_parser::ParserOutput| -> Vec<String> {
        output.derivations().iter().map(ToString::to_string).collect()
    };
    assert_eq!(render(&first), render(&second));
}

// ============================================================================
// Scoring, graph inference and pruning
// ============================================================================

#[test]
fn graph_statistics_over_ambiguous_noun() {
    let parser = builder(graph_config())
        .model(lexical_weights(&[("bank", "N : bank:<e,t>", 1.0)]))
        .build()
        .unwrap();
    let output = parser.parse(&tokenize("big bank")).unwrap();
    assert_eq!(output.derivations().len(), 2);

    let best = output.best_derivations();
    assert_eq!(best.len(), 1);
    assert_eq!(best[0].viterbi_score(), 1.0);
    assert!(best[0].category().to_string().contains("bank:<e,t>"));
    assert_eq!(
        best[0]
            .average_max_features()
            .get(("LEX", "bank", "N : bank:<e,t>")),
        1.0
    );

    let e = 1.0f64.exp();
    let stats = output.graph_statistics(|_| true);
    assert!(stats.exact);
    assert!((stats.log_norm - (e + 1.0).ln()).abs() < 1e-9);
    let bank = stats.expected_features.get(("LEX", "bank", "N : bank:<e,t>"));
    let shore = stats.expected_features.get(("LEX", "bank", "N : shore:<e,t>"));
    assert!((bank - e / (e + 1.0)).abs() < 1e-9);
    assert!((bank + shore - 1.0).abs() < 1e-9);
    let big_key = stats
        .expected_features
        .iter()
        .find(|(key, _)| key.components()[1] == "big")
        .map(|(_, value)| value)
        .unwrap();
    assert!((big_key - 1.0).abs() < 1e-9);

    // Restricting the distribution to one reading makes it certain.
    let shore_only = output.graph_statistics(|c| c.to_string().contains("shore"));
    assert!(shore_only.log_norm.abs() < 1e-9);
    assert!(
        (shore_only
            .expected_features
            .get(("LEX", "bank", "N : shore:<e,t>"))
            - 1.0)
            .abs()
            < 1e-9
    );
}

#[test]
fn viterbi_mode_statistics_are_approximate() {
    let parser = builder(ParserConfig::default())
        .model(lexical_weights(&[("bank", "N : bank:<e,t>", 1.0)]))
        .build()
        .unwrap();
    let output = parser.parse(&tokenize("big bank")).unwrap();
    assert!(output.is_exact());
    assert!(!output.graph_statistics(|_| true).exact);
}

#[test]
fn beam_prunes_lower_scoring_cells() {
    let parser = builder(ParserConfig {
        beam: Some(1),
        ..ParserConfig::default()
    })
    .model(lexical_weights(&[("bank", "N : bank:<e,t>", 1.0)]))
    .build()
    .unwrap();
    let output = parser.parse(&tokenize("big bank")).unwrap();
    assert!(!output.is_exact());
    assert!(output.chart().is_pruned(0, 1));
    assert_eq!(output.chart().span_size(1, 1), 2);
    assert_eq!(output.derivations().len(), 1);
    assert!(output.derivations()[0]
        .category()
        .to_string()
        .contains("bank:<e,t>"));
}

#[test]
fn tight_beam_keeps_tied_lexical_cells() {
    let parser = builder(ParserConfig {
        beam: Some(1),
        ..ParserConfig::default()
    })
    .build()
    .unwrap();
    let output = parser.parse(&tokenize("bank")).unwrap();
    assert_eq!(output.derivations().len(), 2);
    assert!(output.is_exact());

    let parser = builder(ParserConfig {
        beam: Some(2),
        ..ParserConfig::default()
    })
    .build()
    .unwrap();
    let output = parser.parse(&tokenize("big bank")).unwrap();
    assert_eq!(output.chart().span_size(1, 1), 2);
    assert_eq!(output.derivations().len(), 2);
}

#[test]
fn lexical_cells_compete_when_pruning_is_enabled() {
    let parser = builder(ParserConfig {
        beam: Some(1),
        prune_lexical_cells: true,
        ..ParserConfig::default()
    })
    .build()
    .unwrap();
    let output = parser.parse(&tokenize("bank")).unwrap();
    assert!(output.derivations().is_empty());
    assert!(!output.is_exact());
}

#[test]
fn packed_derivations_share_lexical_entries() {
    let parser = builder(graph_config()).build().unwrap();
    let output = parser.parse(&tokenize("maybe not sleeps paris")).unwrap();
    let derivation = &output.derivations()[0];
    assert!(derivation.num_parses() > 1);
    assert_eq!(derivation.all_lexical_entries().len(), 4);
    assert_eq!(derivation.max_lexical_entries().len(), 4);
}

// ============================================================================
// Deadlines and parallel parsing
// ============================================================================

#[test]
fn cancelled_parse_reports_timeout() {
    let parser = builder(ParserConfig::default()).build().unwrap();
    let cancel = CancelFlag::new();
    cancel.cancel();
    let output = parser.parse_with_cancel(&tokenize("big city"), &cancel).unwrap();
    assert!(output.timed_out());
    assert!(output.derivations().is_empty());
    assert!(!output.graph_statistics(|_| true).exact);
}

#[test]
fn expired_deadline_reports_timeout() {
    let parser = builder(ParserConfig {
        timeout_ms: Some(0),
        ..ParserConfig::default()
    })
    .build()
    .unwrap();
    let output = parser.parse(&tokenize("big city")).unwrap();
    assert!(output.timed_out());
    assert!(output.derivations().is_empty());
}

#[tokio::test]
async fn parallel_parsing_preserves_order() {
    let parser = builder(ParserConfig {
        workers: Some(2),
        max_sentence_length: 3,
        ..ParserConfig::default()
    })
    .build()
    .unwrap();
    let parallel = ParallelParser::new(Arc::new(parser));
    let outcomes = parallel
        .parse_all(vec![
            tokenize("big city"),
            tokenize("town"),
            tokenize("big big big city"),
        ])
        .await;
    assert_eq!(outcomes.len(), 3);

    let mut outcomes = outcomes.into_iter();
    let first = outcomes.next().unwrap().completed().unwrap().unwrap();
    assert_eq!(
        first.derivations()[0].category().to_string(),
        "N : (lambda $0:e (and:<t*,t> (big:<e,t> $0) (city:<e,t> $0)))"
    );
    let second = outcomes.next().unwrap().completed().unwrap().unwrap();
    assert_eq!(second.derivations()[0].category().to_string(), "N : town:<e,t>");
    match outcomes.next().unwrap() {
        TaskOutcome::Completed(Err(ParseError::SentenceTooLong { length, max })) => {
            assert_eq!((length, max), (4, 3));
        }
        other => panic!("unexpected outcome: {:?}", other.is_timed_out()),
    }

    let single = parallel.parse(tokenize("city")).await;
    assert_eq!(single.completed().unwrap().unwrap().derivations().len(), 1);
}

#[tokio::test]
async fn parallel_deadline_applies_to_every_sentence() {
    let parser = builder(ParserConfig {
        workers: Some(1),
        timeout_ms: Some(0),
        ..ParserConfig::default()
    })
    .build()
    .unwrap();
    let parallel = ParallelParser::new(Arc::new(parser));
    let outcomes = parallel
        .parse_all(vec![
            tokenize("big big city"),
            tokenize("maybe not sleeps paris"),
            tokenize("big bank"),
        ])
        .await;
    assert_eq!(outcomes.len(), 3);
    for outcome in outcomes {
        match outcome {
            TaskOutcome::TimedOut => {}
            TaskOutcome::Completed(Ok(output)) => {
                assert!(output.timed_out());
                assert!(output.derivations().is_empty());
            }
            other => panic!("unexpected outcome: {:?}", other.is_timed_out()),
        }
    }
}

// ============================================================================
// Chart properties
// ============================================================================

fn arb_sentence() -> impl Strategy<Value = Vec<String>> {
    let words = vec!["big", "city", "town", "bank", "or", "maybe", "not", "sleeps", "paris"];
    prop::collection::vec(prop::sample::select(words).prop_map(str::to_string), 1..5)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn norm_bounds_every_derivation(sentence in arb_sentence()) {
        let parser = builder(graph_config())
            .model(lexical_weights(&[
                ("bank", "N : bank:<e,t>", 0.5),
                ("paris", "NP : paris:e", -0.25),
            ]))
            .build()
            .unwrap();
        let output = parser.parse(&sentence).unwrap();
        let norm = output.graph_statistics(|_| true).log_norm;
        for derivation in output.derivations() {
            prop_assert!(derivation.semantics().is_some());
            prop_assert!(derivation.log_inside_score() + 1e-9 >= derivation.viterbi_score());
            prop_assert!(norm + 1e-9 >= derivation.log_inside_score());
            prop_assert!(derivation.num_parses() >= derivation.num_viterbi_parses());
        }
    }

    #[test]
    fn beam_only_removes_parses(sentence in arb_sentence()) {
        let exact = builder(graph_config()).build().unwrap();
        let pruned = builder(ParserConfig { beam: Some(1), ..graph_config() }).build().unwrap();
        let all: HashSet<String> = exact
            .parse(&sentence)
            .unwrap()
            .derivations()
            .iter()
            .map(|d| d.category().to_string())
            .collect();
        for derivation in pruned.parse(&sentence).unwrap().derivations() {
            prop_assert!(all.contains(&derivation.category().to_string()));
        }
    }
}
