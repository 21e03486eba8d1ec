//! Prelude module - common imports for notebase users
//!
//! ```rust
//! use notebase::prelude::*;
//! ```

pub use crate::{
    // Catalog
    Catalog,
    DataSource,
    Error,
    Recomputation,
    RecomputeOptions,
    RecomputeStats,
    Result,

    // Schema and rows
    CalculationValue,
    PropertyDefinition,
    PropertyOption,
    PropertyType,
    RelationLimit,
    ReturnType,
    RollupCalculation,
    RollupConfig,
    Row,
    Value,

    // Formulas
    EvaluationResult,
    RecomputeResult,
    Runtime,
    RuntimeOptions,

    // Rollups
    RollupOptions,
    RollupResult,
    RollupState,
};
