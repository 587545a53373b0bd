//! Error types for grammar construction.

use semparse_logic::LogicError;
use thiserror::Error;

/// Errors raised while reading categories, lexicons and rules.
///
/// A rule that simply does not apply to a pair of categories is not an
/// error; rules return `None` for that.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CcgError {
    /// Malformed syntactic category.
    #[error("Invalid syntax '{text}': {message}")]
    InvalidSyntax { text: String, message: String },

    /// Malformed `syntax : semantics` category.
    #[error("Invalid category '{text}': {message}")]
    InvalidCategory { text: String, message: String },

    /// Malformed lexicon line.
    #[error("Invalid lexical entry '{line}': {message}")]
    InvalidLexicalEntry { line: String, message: String },

    /// Rule construction with unsupported parameters.
    #[error("Invalid rule: {message}")]
    InvalidRule { message: String },

    /// Error in the semantic part of a category.
    #[error(transparent)]
    Logic(#[from] LogicError),
}
