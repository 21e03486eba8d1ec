//! Error types for the recompute service

use thiserror::Error;

/// Result type for catalog operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised by a [`Catalog`](crate::Catalog).
///
/// Formula and rollup problems never show up here; they are reported per
/// row and property in the recompute results.
#[derive(Debug, Error)]
pub enum Error {
    #[error("Unknown data source: {0}")]
    UnknownDataSource(String),

    #[error("Duplicate data source: {0}")]
    DuplicateDataSource(String),

    #[error("Unknown row '{row}' in data source '{data_source}'")]
    UnknownRow { data_source: String, row: String },

    #[cfg(feature = "serde")]
    #[error("Invalid catalog JSON: {0}")]
    Json(#[from] serde_json::Error),
}
