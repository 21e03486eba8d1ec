//! Error types for notebase-core

use thiserror::Error;

/// Result type alias using [`Error`]
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in notebase-core
#[derive(Debug, Error)]
pub enum Error {
    /// Unknown formula return type name
    #[error("Invalid formula return type: {0}")]
    InvalidReturnType(String),

    /// Unknown rollup calculation name
    #[error("Invalid rollup calculation: {0}")]
    InvalidCalculation(String),
}
