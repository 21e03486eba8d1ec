//! Rollup configuration errors

use thiserror::Error;

/// A rollup that cannot be computed as configured.
///
/// Never returned across the public API: the `Display` form becomes the
/// message of a [`RollupResult`](crate::RollupResult) in the error state.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RollupConfigError {
    #[error("Configure rollup")]
    MissingConfig,

    #[error("Select relation")]
    RelationNotSelected,

    #[error("Missing relation")]
    MissingRelation(String),

    #[error("Property '{0}' is not a relation")]
    NotARelation(String),

    #[error("Select property")]
    TargetNotSelected,

    #[error("Missing property")]
    MissingTarget(String),

    #[error("Rollups of rollups are not supported")]
    RollupOfRollup(String),
}
