//! Error types for the logical-form engine.

use thiserror::Error;

/// Errors raised while reading types, constants and expressions.
///
/// Applying or composing ill-typed terms is not an error: those operations
/// return `None`.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LogicError {
    /// Malformed expression text.
    #[error("Syntax error in '{input}': {message}")]
    Syntax { input: String, message: String },

    /// A term type that was never declared.
    #[error("Unknown type: '{name}'")]
    UnknownType { name: String },

    /// A type string that does not follow the type grammar.
    #[error("Invalid type string: '{text}'")]
    InvalidType { text: String },

    /// A term type declared twice.
    #[error("Type already declared: '{name}'")]
    DuplicateType { name: String },

    /// A constant name containing reserved characters.
    #[error("Invalid constant name: '{name}'")]
    InvalidConstantName { name: String },

    /// A constant outside the closed ontology.
    #[error("Constant not in ontology: '{name}'")]
    UnknownConstant { name: String },

    /// A `$N` reference with no binder or earlier definition.
    #[error("Undefined variable reference: '{name}'")]
    UndefinedVariable { name: String },

    /// A free variable defined twice in one expression.
    #[error("Variable defined twice: '{name}'")]
    RedefinedVariable { name: String },

    /// Argument types do not fit the predicate type.
    #[error("Ill-typed expression '{expression}': {message}")]
    IllTyped { expression: String, message: String },
}
