//! # notebase
//!
//! Formula and rollup recompute for Notion-like databases.
//!
//! A [`Catalog`] holds data sources (a property schema plus rows). Building
//! it compiles every schema's formulas once into a [`Runtime`]; recomputing
//! a data source evaluates each row's formulas in dependency order and then
//! aggregates its rollup properties across related rows.
//!
//! ## Features
//!
//! - `prop("Name")` formulas over text, number, boolean, date and list values
//! - Circular and unresolved references reported per property, never fatal
//! - Rollups: original values, count and percent over all, per-group, empty
//!   and non-empty rows
//! - `serde`: load catalogs from JSON
//! - `parallel`: recompute rows on the rayon pool
//!
//! ## Example
//!
//! ```rust
//! use notebase::prelude::*;
//!
//! let tasks = DataSource::new(
//!     "tasks",
//!     "Tasks",
//!     vec![
//!         PropertyDefinition::new("status", "Status", PropertyType::Status),
//!         PropertyDefinition::formula(
//!             "label",
//!             "Label",
//!             r#"if(prop("Status") = "Done", "Complete", "Pending")"#,
//!             ReturnType::Text,
//!         ),
//!     ],
//!     vec![
//!         Row::new("t1").with("status", "Done"),
//!         Row::new("t2").with("status", "Todo"),
//!     ],
//! );
//!
//! let catalog = Catalog::new(vec![tasks]).unwrap();
//! let recomputed = catalog.recompute("tasks", &RecomputeOptions::default()).unwrap();
//! assert_eq!(recomputed.rows[0].row.value("label"), Value::text("Complete"));
//! assert_eq!(recomputed.rows[1].row.value("label"), Value::text("Pending"));
//! ```

pub mod error;
pub mod prelude;
pub mod recompute;

pub use error::{Error, Result};
pub use recompute::{
    Catalog, DataSource, Recomputation, RecomputeOptions, RecomputeStats, RollupEntry,
    PREVIEW_PROPERTY_ID,
};

// Re-export core types
pub use notebase_core::{
    format_number, CalculationCategory, CalculationValue, PropertyDefinition, PropertyOption,
    PropertyType, RelationLimit, ReturnType, RollupCalculation, RollupConfig, Row, Value,
    ValueTag,
};

// Re-export formula types
pub use notebase_formula::{
    evaluate, parse_formula, preview_formula, EvaluationContext, EvaluationResult, ErrorKind,
    Expression, FormulaError, FormulaResult, RecomputeResult, Runtime, RuntimeOptions,
};
pub use notebase_formula::references::{referenced_property_names, rename_property_references};

// Re-export rollup types
pub use notebase_rollup::{
    compute_rollup, compute_rollups_for_rows, MemorySource, RollupConfigError, RollupOptions,
    RollupResult, RollupSource, RollupState,
};
