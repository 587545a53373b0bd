//! # Core - Semantic Parsing Foundations
//!
//! Numeric and execution building blocks shared by the logic, grammar and
//! parser crates:
//!
//! - **Vectors**: sparse feature vectors keyed by short string tuples
//! - **Math**: log-space accumulation for inside/outside scores
//! - **Parallel**: a bounded, deadline-aware pool for parsing many sentences
//! - **Errors**: malformed keys and non-finite values
//!
//! Nothing here knows about grammars; the parser wires these pieces
//! together.

pub mod error;
pub mod math;
pub mod parallel;
pub mod vector;

pub use error::CoreError;
pub use math::{log_sum_exp, log_sum_exp_all};
pub use parallel::{CancelFlag, Task, TaskOutcome, TaskPool};
pub use vector::{FeatureKey, SparseVector, NOISE};
