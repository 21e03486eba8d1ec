//! # notebase-core
//!
//! Core data model for the notebase formula and rollup engine.
//!
//! This crate provides the fundamental types shared by the other crates:
//! - [`Value`] and [`ValueTag`] - typed property values
//! - [`PropertyDefinition`] - one column of a data source schema
//! - [`RollupConfig`] - how a rollup property aggregates related rows
//! - [`Row`] - one record, with its stored values and formula errors
//!
//! ## Example
//!
//! ```rust
//! use notebase_core::{PropertyDefinition, PropertyType, ReturnType, Row, Value};
//!
//! let schema = vec![
//!     PropertyDefinition::new("price", "Price", PropertyType::Number),
//!     PropertyDefinition::formula("total", "Total", "prop(\"Price\") * 2", ReturnType::Number),
//! ];
//!
//! let row = Row::new("r1").with("price", 12.5);
//! assert_eq!(row.get("price"), Some(&Value::Number(12.5)));
//! assert!(schema[1].is_formula());
//! ```

pub mod error;
pub mod property;
pub mod rollup;
pub mod row;
pub mod value;

pub use error::{Error, Result};
pub use property::{PropertyDefinition, PropertyOption, PropertyType, RelationLimit, ReturnType};
pub use rollup::{CalculationCategory, CalculationValue, RollupCalculation, RollupConfig};
pub use row::Row;
pub use value::{format_number, Value, ValueTag};
