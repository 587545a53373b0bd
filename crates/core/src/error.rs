//! # Error Types
//!
//! Failures raised by the numeric foundations. Malformed feature keys are
//! rejected when the key is built, never when it is looked up.

use thiserror::Error;

/// Core errors shared by every crate in the workspace.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum CoreError {
    /// A feature key must have between one and five components.
    #[error("Invalid feature key arity: {len} components (expected 1..={max})")]
    KeyArity { len: usize, max: usize },

    /// A key component may not be empty or contain the separator.
    #[error("Invalid feature key component: '{component}'")]
    KeyComponent { component: String },

    /// A vector operation produced NaN or infinite values.
    #[error("Vector contains non-finite values: {context}")]
    NonFinite { context: String },
}
