//! # Logic - Typed Lambda Calculus for Meaning Representations
//!
//! Logical forms are immutable lambda-calculus terms over typed constants:
//!
//! ```text
//! (lambda $0:e (and:<t*,t> (big:<e,t> $0) (city:<e,t> $0)))
//! ```
//!
//! ## Core Concepts
//!
//! - **Types**: term, complex, recursive (`<t*,t>`) and array types
//! - **Expressions**: lambdas, literals, constants and variables
//! - **Alpha-equivalence**: equality and hashing ignore variable names
//! - **Simplification**: beta reduction plus coordination and negation rules
//! - **Application / composition**: the semantic side of CCG combinators
//! - **Context**: an explicit registry of types, constants and built-ins
//!
//! ## Example
//!
//! ```rust
//! use semparse_logic::LogicContext;
//!
//! let ctx = LogicContext::builder().build().unwrap();
//! let big = ctx
//!     .read("(lambda $0:<e,t> (lambda $1:e (and:<t*,t> (big:<e,t> $1) ($0 $1))))")
//!     .unwrap();
//! let city = ctx.read("city:<e,t>").unwrap();
//!
//! let phrase = ctx.apply(&big, &city).unwrap();
//! assert_eq!(
//!     phrase.to_string(),
//!     "(lambda $0:e (and:<t*,t> (big:<e,t> $0) (city:<e,t> $0)))"
//! );
//! ```

mod apply;
pub mod context;
mod error;
pub mod expr;
mod printer;
mod reader;
pub mod scope;
mod simplify;
pub mod skolem;
pub mod types;

pub use context::{LogicContext, LogicContextBuilder};
pub use error::LogicError;
pub use expr::{Lambda, Literal, LogicalConstant, LogicalExpression, Variable, VariableId};
pub use scope::ScopeMapping;
pub use skolem::assign_skolem_ids;
pub use types::{RecursiveOption, Type, TypeKind, TypeRepository};
