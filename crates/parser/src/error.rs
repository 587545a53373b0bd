//! Error types for parser construction and parsing.

use semparse_ccg::CcgError;
use semparse_core::CoreError;
use thiserror::Error;

/// Errors raised by the parser.
///
/// A sentence with no parse is not an error: it yields an output with no
/// derivations. A timeout is reported on the output as well.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParseError {
    /// Malformed grammar input (lexicon, rules, categories).
    #[error(transparent)]
    Ccg(#[from] CcgError),

    /// Bad model weights.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// Invalid parser configuration.
    #[error("Invalid parser configuration: {message}")]
    Config { message: String },

    /// The sentence exceeds the configured maximum length.
    #[error("Sentence too long: {length} tokens (max {max})")]
    SentenceTooLong { length: usize, max: usize },
}
