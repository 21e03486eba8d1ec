//! # notebase-rollup
//!
//! Aggregates a target property across rows linked through a relation
//! property.
//!
//! Linked rows and schemas come from a [`RollupSource`]. Rollups never fail:
//! a [`RollupResult`] is `loading` while the linked data source is not
//! available, `error` with a message when the rollup is misconfigured, and
//! `ready` otherwise.
//!
//! ## Example
//!
//! ```rust
//! use notebase_core::{
//!     CalculationValue, PropertyDefinition, PropertyType, RelationLimit, RollupCalculation,
//!     RollupConfig, Row, Value,
//! };
//! use notebase_rollup::{compute_rollup, MemorySource, RollupOptions};
//!
//! let tasks = vec![PropertyDefinition::new("status", "Status", PropertyType::Status)];
//! let source = MemorySource::new().with_data_source(
//!     "tasks",
//!     tasks,
//!     vec![
//!         Row::new("t1").with("status", "Done"),
//!         Row::new("t2").with("status", "Todo"),
//!     ],
//! );
//!
//! let config = RollupConfig::new("rel", "tasks", "status")
//!     .with_calculation(RollupCalculation::count(CalculationValue::PerGroup))
//!     .with_selected_options(["Done"]);
//! let projects = vec![
//!     PropertyDefinition::relation("rel", "Tasks", "tasks", RelationLimit::Multiple),
//!     PropertyDefinition::rollup("done", "Done", config),
//! ];
//!
//! let row = Row::new("p1").with("rel", Value::text_list(["t1", "t2"]));
//! let result = compute_rollup(&row, &projects[1], &projects, &source, &RollupOptions::default());
//! assert_eq!(result.count_fraction.as_deref(), Some("1/2"));
//! ```

pub mod aggregator;
pub mod error;
pub mod result;
pub mod source;

pub use aggregator::{compute_rollup, compute_rollups_for_rows, RollupOptions, RollupPlan};
pub use error::RollupConfigError;
pub use result::{RollupResult, RollupState};
pub use source::{MemorySource, RollupSource};
