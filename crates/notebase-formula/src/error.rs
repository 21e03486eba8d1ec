//! Formula error types

use notebase_core::{ReturnType, ValueTag};
use thiserror::Error;

/// Result type for formula operations
pub type FormulaResult<T> = std::result::Result<T, FormulaError>;

/// Errors that can occur during formula compilation or evaluation.
///
/// The `Display` form is the message reported to users in
/// `EvaluationResult::error` and `Row::formula_errors`.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FormulaError {
    /// Malformed formula text
    #[error("Syntax error: {message}")]
    Syntax {
        message: String,
        /// Byte offset into the formula text, when known
        position: Option<usize>,
    },

    /// Call to a function that is not in the registry
    #[error("Unknown function: {0}")]
    UnknownFunction(String),

    /// Wrong number of arguments
    #[error("Wrong number of arguments for {function}(): expected {expected}, got {actual}")]
    Arity {
        function: String,
        expected: String,
        actual: usize,
    },

    /// Operand or argument has the wrong tag
    #[error("{context}: expected {expected}, got {actual}")]
    TypeMismatch {
        context: String,
        expected: String,
        actual: ValueTag,
    },

    /// `prop("X")` names no property of the schema
    #[error("Unresolved property reference: {0}")]
    UnresolvedProperty(String),

    /// `prop("X")` names a property formulas cannot read
    #[error("Unsupported property reference: {0}")]
    UnsupportedReference(String),

    /// The property is part of a formula dependency cycle
    #[error("Circular reference")]
    CircularReference,

    /// An upstream formula property errored
    #[error("Dependency '{dependency}' error: {message}")]
    Propagated { dependency: String, message: String },

    /// Division or modulo by zero
    #[error("Division by zero")]
    DivisionByZero,

    /// Numeric domain error or non-finite result
    #[error("{0}")]
    Numeric(String),

    /// Argument has the right tag but an invalid value
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Formula result does not conform to the declared return type
    #[error("Formula result is {actual}, expected {expected}")]
    ReturnTypeMismatch {
        expected: ReturnType,
        actual: ValueTag,
    },
}

/// Coarse classification of a [`FormulaError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Syntax,
    UnknownFunction,
    Arity,
    TypeMismatch,
    UnresolvedProperty,
    UnsupportedReference,
    CircularReference,
    Propagated,
    Evaluation,
}

impl FormulaError {
    /// Create a syntax error at a byte offset
    pub fn syntax<S: Into<String>>(message: S, position: usize) -> Self {
        FormulaError::Syntax {
            message: message.into(),
            position: Some(position),
        }
    }

    /// Create a type mismatch error
    pub fn type_mismatch<C: Into<String>, E: Into<String>>(
        context: C,
        expected: E,
        actual: ValueTag,
    ) -> Self {
        FormulaError::TypeMismatch {
            context: context.into(),
            expected: expected.into(),
            actual,
        }
    }

    /// Create a numeric error
    pub fn numeric<S: Into<String>>(msg: S) -> Self {
        FormulaError::Numeric(msg.into())
    }

    /// Classify the error
    pub fn kind(&self) -> ErrorKind {
        match self {
            FormulaError::Syntax { .. } => ErrorKind::Syntax,
            FormulaError::UnknownFunction(_) => ErrorKind::UnknownFunction,
            FormulaError::Arity { .. } => ErrorKind::Arity,
            FormulaError::TypeMismatch { .. } => ErrorKind::TypeMismatch,
            FormulaError::UnresolvedProperty(_) => ErrorKind::UnresolvedProperty,
            FormulaError::UnsupportedReference(_) => ErrorKind::UnsupportedReference,
            FormulaError::CircularReference => ErrorKind::CircularReference,
            FormulaError::Propagated { .. } => ErrorKind::Propagated,
            FormulaError::DivisionByZero
            | FormulaError::Numeric(_)
            | FormulaError::InvalidArgument(_)
            | FormulaError::ReturnTypeMismatch { .. } => ErrorKind::Evaluation,
        }
    }

    /// Structural errors depend only on the schema and apply to every row
    pub fn is_structural(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::Syntax
                | ErrorKind::UnknownFunction
                | ErrorKind::Arity
                | ErrorKind::UnresolvedProperty
                | ErrorKind::UnsupportedReference
                | ErrorKind::CircularReference
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages() {
        assert_eq!(FormulaError::CircularReference.to_string(), "Circular reference");
        assert_eq!(
            FormulaError::UnresolvedProperty("Nope".into()).to_string(),
            "Unresolved property reference: Nope"
        );
        assert_eq!(
            FormulaError::type_mismatch("abs() argument 1", "number", ValueTag::Text).to_string(),
            "abs() argument 1: expected number, got text"
        );
    }

    #[test]
    fn test_structural_classification() {
        assert!(FormulaError::CircularReference.is_structural());
        assert!(FormulaError::UnknownFunction("foo".into()).is_structural());
        assert!(!FormulaError::DivisionByZero.is_structural());
        assert!(!FormulaError::Propagated {
            dependency: "A".into(),
            message: "x".into()
        }
        .is_structural());
    }
}
