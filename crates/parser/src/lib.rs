//! # Parser - CKY Chart Parsing for CCG
//!
//! Maps a tokenized sentence to logical forms with a feature-weighted CKY
//! chart parser over the grammar of `semparse_ccg`.
//!
//! ## Core Concepts
//!
//! - **Model**: weights plus feature sets scoring each parse step
//! - **Steps and cells**: a cell packs every step building one category
//!   over one span, and keeps Viterbi and inside scores
//! - **Chart**: cells per span, beam pruning, inside/outside inference
//! - **CKY parser**: lexical, binary and unary steps, span by span
//! - **Output**: full parses with their best derivations and forests
//! - **Parallel parsing**: many sentences on a bounded task pool
//!
//! ## Example: "big city"
//!
//! ```rust
//! use std::sync::Arc;
//! use semparse_ccg::lexicon::{tokenize, Lexicon, FIXED_ORIGIN};
//! use semparse_ccg::{BinaryRule, CategoryServices};
//! use semparse_logic::LogicContext;
//! use semparse_parser::CkyParser;
//!
//! let services = CategoryServices::new(Arc::new(LogicContext::builder().build().unwrap()));
//! let lexicon = Lexicon::read(
//!     "big :- N/N : (lambda $0:<e,t> (lambda $1:e (and:<t*,t> (big:<e,t> $1) ($0 $1))))\n\
//!      city :- N : city:<e,t>",
//!     &services,
//!     FIXED_ORIGIN,
//! )
//! .unwrap();
//!
//! let parser = CkyParser::builder(services, Arc::new(lexicon))
//!     .binary_rules(BinaryRule::standard(1).unwrap())
//!     .build()
//!     .unwrap();
//!
//! let output = parser.parse(&tokenize("big city")).unwrap();
//! let best = output.best_derivations();
//! assert_eq!(best.len(), 1);
//! assert_eq!(
//!     best[0].category().to_string(),
//!     "N : (lambda $0:e (and:<t*,t> (big:<e,t> $0) (city:<e,t> $0)))"
//! );
//! ```

pub mod cell;
pub mod chart;
pub mod cky;
pub mod config;
mod error;
pub mod forest;
pub mod model;
pub mod output;
pub mod parallel;
pub mod step;

pub use cell::{Cell, CellId, CellSummary};
pub use chart::Chart;
pub use cky::{CkyParser, CkyParserBuilder, CompleteParseFilter};
pub use config::{InferenceMode, ParserConfig};
pub use error::ParseError;
pub use forest::{Forest, ForestNode};
pub use model::{FeatureSet, LexicalFeatureSet, Model, RuleUsageFeatureSet, WordSkippingFeatureSet};
pub use output::{Derivation, GraphStatistics, ParserOutput, RuleUsage};
pub use parallel::{ParallelParser, ParseOutcome, ParseTask};
pub use step::{ParseStep, StepKind, WeightedStep};
