//! # CCG - Combinatory Categorial Grammar
//!
//! The grammar side of the semantic parser: categories pairing syntax with
//! logical forms, the lexicon, combinators, and normal-form constraints
//! that keep spurious ambiguity in check.
//!
//! ## Core Concepts
//!
//! - **Syntax**: simple (`N`, `S[dcl]`) and slashed (`S\NP/NP`) categories
//! - **Categories**: syntax plus semantics, combined by application and
//!   composition in lockstep
//! - **Lexicon**: `tokens :- category` entries
//! - **Rules**: application, composition, skipping, punctuation,
//!   coordination, type shifting and skolem IDs
//! - **Normal form**: constraints over the rules that built each child
//!
//! ## Example: "big city"
//!
//! ```rust
//! use std::sync::Arc;
//! use semparse_ccg::category::CategoryServices;
//! use semparse_ccg::lexicon::{tokenize, Lexicon, FIXED_ORIGIN};
//! use semparse_ccg::rules::{BinaryRule, Direction, SentenceSpan};
//! use semparse_logic::LogicContext;
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
//! let big = lexicon.get(&tokenize("big"))[0].category();
//! let city = lexicon.get(&tokenize("city"))[0].category();
//! let rule = BinaryRule::application(Direction::Forward);
//! let result = rule.apply(&services, big, city, SentenceSpan::new(0, 1, 2)).unwrap();
//! assert_eq!(
//!     result.category.to_string(),
//!     "N : (lambda $0:e (and:<t*,t> (big:<e,t> $0) (city:<e,t> $0)))"
//! );
//! ```

pub mod category;
mod error;
pub mod lexicon;
pub mod normal_form;
pub mod rules;
pub mod syntax;

pub use category::{Category, CategoryServices};
pub use error::CcgError;
pub use lexicon::{LexicalEntry, Lexicon};
pub use normal_form::{
    EisnerConstraint, HbComposedConstraint, NormalFormConstraint, NormalFormValidator,
    UnaryConstraint,
};
pub use rules::{
    ApplicationTypeShifting, BinaryRule, CoordinationKind, CoordinationServices, Direction,
    RuleName, RuleNameSet, RuleResult, SentenceSpan, SkolemIdRule, UnaryRule,
};
pub use syntax::{Attribute, Slash, Syntax};
