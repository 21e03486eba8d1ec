//! Recompute service
//!
//! Composes the formula runtime and the rollup aggregator over a catalog of
//! data sources. Each data source gets one compiled [`Runtime`]; recomputing
//! a data source applies it to every row and then aggregates every rollup
//! property against the catalog.
//!
//! # Example
//!
//! ```rust
//! use notebase::prelude::*;
//!
//! let orders = DataSource::new(
//!     "orders",
//!     "Orders",
//!     vec![
//!         PropertyDefinition::new("price", "Price", PropertyType::Number),
//!         PropertyDefinition::new("qty", "Quantity", PropertyType::Number),
//!         PropertyDefinition::formula(
//!             "total",
//!             "Total",
//!             "prop(\"Price\") * prop(\"Quantity\")",
//!             ReturnType::Number,
//!         ),
//!     ],
//!     vec![Row::new("o1").with("price", 12.5).with("qty", 3)],
//! );
//!
//! let catalog = Catalog::new(vec![orders]).unwrap();
//! let recomputed = catalog.recompute("orders", &RecomputeOptions::default()).unwrap();
//! assert_eq!(recomputed.rows[0].row.value("total"), Value::Number(37.5));
//! assert_eq!(recomputed.stats.errors, 0);
//! ```

use crate::error::{Error, Result};
use ahash::AHashMap;
use notebase_core::{PropertyDefinition, PropertyType, Row};
use notebase_formula::{
    preview_formula, EvaluationResult, FormulaError, RecomputeResult, Runtime, RuntimeOptions,
};
use notebase_rollup::{
    compute_rollups_for_rows, RollupOptions, RollupResult, RollupSource, RollupState,
};
use tracing::debug;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A named collection of rows plus its property schema
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase", default))]
pub struct DataSource {
    pub id: String,
    pub name: String,
    pub properties: Vec<PropertyDefinition>,
    pub rows: Vec<Row>,
}

impl DataSource {
    pub fn new<I: Into<String>, N: Into<String>>(
        id: I,
        name: N,
        properties: Vec<PropertyDefinition>,
        rows: Vec<Row>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            properties,
            rows,
        }
    }

    pub fn row(&self, row_id: &str) -> Option<&Row> {
        self.rows.iter().find(|r| r.id == row_id)
    }

    /// Rollup properties of the schema
    pub fn rollup_properties(&self) -> impl Iterator<Item = &PropertyDefinition> + '_ {
        self.properties
            .iter()
            .filter(|p| p.property_type == PropertyType::Rollup)
    }
}

/// Options for a recompute run
#[derive(Debug, Clone)]
pub struct RecomputeOptions {
    pub rollup: RollupOptions,
    /// Aggregate rollup properties after formulas (default: true)
    pub include_rollups: bool,
}

impl Default for RecomputeOptions {
    fn default() -> Self {
        Self {
            rollup: RollupOptions::default(),
            include_rollups: true,
        }
    }
}

/// Statistics from a recompute run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecomputeStats {
    /// Formula properties in the schema
    pub formula_count: usize,
    /// Rows whose formulas were evaluated
    pub rows_recomputed: usize,
    /// Formula results carrying an error, over all rows
    pub errors: usize,
    /// Formula properties on a dependency cycle
    pub circular_references: usize,
    /// Rollup results computed
    pub rollups_computed: usize,
    /// Rollup results in the error state
    pub rollup_errors: usize,
}

/// One rollup result of one row
#[derive(Debug, Clone, PartialEq)]
pub struct RollupEntry {
    pub row_id: String,
    pub property_id: String,
    pub result: RollupResult,
}

/// Output of [`Catalog::recompute`]
#[derive(Debug, Clone)]
pub struct Recomputation {
    pub data_source_id: String,
    /// Per row, in data source order
    pub rows: Vec<RecomputeResult>,
    /// Per row and rollup property, rows outermost
    pub rollups: Vec<RollupEntry>,
    pub stats: RecomputeStats,
}

impl Recomputation {
    /// Rollup result for a row and rollup property
    pub fn rollup(&self, row_id: &str, property_id: &str) -> Option<&RollupResult> {
        self.rollups
            .iter()
            .find(|e| e.row_id == row_id && e.property_id == property_id)
            .map(|e| &e.result)
    }
}

#[cfg(feature = "serde")]
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CatalogFile {
    data_sources: Vec<DataSource>,
}

/// Data sources with their compiled formula runtimes
#[derive(Debug, Clone)]
pub struct Catalog {
    data_sources: Vec<DataSource>,
    index: AHashMap<String, usize>,
    runtimes: Vec<Runtime>,
    runtime_options: RuntimeOptions,
}

impl Catalog {
    /// Build a catalog with default runtime options
    pub fn new(data_sources: Vec<DataSource>) -> Result<Self> {
        Self::with_runtime_options(data_sources, RuntimeOptions::default())
    }

    /// Build a catalog, compiling every schema once with `options`
    pub fn with_runtime_options(
        data_sources: Vec<DataSource>,
        options: RuntimeOptions,
    ) -> Result<Self> {
        let mut index = AHashMap::with_capacity(data_sources.len());
        for (i, source) in data_sources.iter().enumerate() {
            if index.insert(source.id.clone(), i).is_some() {
                return Err(Error::DuplicateDataSource(source.id.clone()));
            }
        }
        let runtimes = data_sources
            .iter()
            .map(|source| Runtime::build(&source.properties, options.clone()))
            .collect();
        Ok(Self {
            data_sources,
            index,
            runtimes,
            runtime_options: options,
        })
    }

    /// Parse a catalog from `{"dataSources": [...]}` JSON
    #[cfg(feature = "serde")]
    pub fn from_json(json: &str) -> Result<Self> {
        let file: CatalogFile = serde_json::from_str(json)?;
        Self::new(file.data_sources)
    }

    /// Like [`Catalog::from_json`], with explicit runtime options
    #[cfg(feature = "serde")]
    pub fn from_json_with_options(json: &str, options: RuntimeOptions) -> Result<Self> {
        let file: CatalogFile = serde_json::from_str(json)?;
        Self::with_runtime_options(file.data_sources, options)
    }

    pub fn data_sources(&self) -> impl Iterator<Item = &DataSource> + '_ {
        self.data_sources.iter()
    }

    pub fn data_source(&self, data_source_id: &str) -> Option<&DataSource> {
        self.index
            .get(data_source_id)
            .map(|&i| &self.data_sources[i])
    }

    /// Compiled formulas of a data source
    pub fn runtime(&self, data_source_id: &str) -> Option<&Runtime> {
        self.index.get(data_source_id).map(|&i| &self.runtimes[i])
    }

    pub fn runtime_options(&self) -> &RuntimeOptions {
        &self.runtime_options
    }

    fn lookup(&self, data_source_id: &str) -> Result<(&DataSource, &Runtime)> {
        let &i = self
            .index
            .get(data_source_id)
            .ok_or_else(|| Error::UnknownDataSource(data_source_id.to_string()))?;
        Ok((&self.data_sources[i], &self.runtimes[i]))
    }

    /// Recompute every formula and rollup of a data source
    pub fn recompute(
        &self,
        data_source_id: &str,
        options: &RecomputeOptions,
    ) -> Result<Recomputation> {
        let (source, runtime) = self.lookup(data_source_id)?;

        let mut stats = RecomputeStats {
            formula_count: runtime.formula_count(),
            circular_references: runtime
                .structural_errors()
                .filter(|(_, e)| matches!(e, FormulaError::CircularReference))
                .count(),
            ..Default::default()
        };

        let rows = recompute_rows(runtime, &source.rows);
        stats.rows_recomputed = rows.len();
        stats.errors = rows.iter().map(RecomputeResult::error_count).sum();

        let mut rollups = Vec::new();
        if options.include_rollups {
            let merged: Vec<Row> = rows.iter().map(|r| r.row.clone()).collect();
            let mut per_property = Vec::new();
            for property in source.rollup_properties() {
                let results = compute_rollups_for_rows(
                    &merged,
                    property,
                    &source.properties,
                    self,
                    &options.rollup,
                );
                per_property.push((property.id.as_str(), results));
            }
            for (i, row) in merged.iter().enumerate() {
                for (property_id, results) in &per_property {
                    let result = results[i].clone();
                    stats.rollups_computed += 1;
                    if result.state == RollupState::Error {
                        stats.rollup_errors += 1;
                    }
                    rollups.push(RollupEntry {
                        row_id: row.id.clone(),
                        property_id: (*property_id).to_string(),
                        result,
                    });
                }
            }
        }

        debug!(
            data_source = %data_source_id,
            rows = stats.rows_recomputed,
            formulas = stats.formula_count,
            errors = stats.errors,
            rollups = stats.rollups_computed,
            "recomputed data source"
        );

        Ok(Recomputation {
            data_source_id: data_source_id.to_string(),
            rows,
            rollups,
            stats,
        })
    }

    /// Recompute the formulas of one row
    pub fn recompute_row(&self, data_source_id: &str, row_id: &str) -> Result<RecomputeResult> {
        let (source, runtime) = self.lookup(data_source_id)?;
        let row = source.row(row_id).ok_or_else(|| Error::UnknownRow {
            data_source: data_source_id.to_string(),
            row: row_id.to_string(),
        })?;
        Ok(runtime.recompute_formulas_for_note(row))
    }

    /// Evaluate in-progress formula text against a data source's schema and
    /// one of its rows (an empty row when `row_id` is `None`)
    pub fn preview(
        &self,
        data_source_id: &str,
        row_id: Option<&str>,
        formula: &str,
    ) -> Result<EvaluationResult> {
        let (source, _) = self.lookup(data_source_id)?;
        let empty = Row::default();
        let row = match row_id {
            Some(id) => source.row(id).ok_or_else(|| Error::UnknownRow {
                data_source: data_source_id.to_string(),
                row: id.to_string(),
            })?,
            None => &empty,
        };
        Ok(preview_formula(
            &source.properties,
            PREVIEW_PROPERTY_ID,
            formula,
            row,
            &self.runtime_options,
        ))
    }
}

/// Property id used for formula previews
pub const PREVIEW_PROPERTY_ID: &str = "__preview__";

#[cfg(feature = "parallel")]
fn recompute_rows(runtime: &Runtime, rows: &[Row]) -> Vec<RecomputeResult> {
    runtime.recompute_formulas_for_notes_par(rows)
}

#[cfg(not(feature = "parallel"))]
fn recompute_rows(runtime: &Runtime, rows: &[Row]) -> Vec<RecomputeResult> {
    runtime.recompute_formulas_for_notes(rows)
}

impl RollupSource for Catalog {
    fn rows(&self, data_source_id: &str) -> Option<&[Row]> {
        self.data_source(data_source_id).map(|s| s.rows.as_slice())
    }

    fn schema(&self, data_source_id: &str) -> Option<&[PropertyDefinition]> {
        self.data_source(data_source_id)
            .map(|s| s.properties.as_slice())
    }

    fn runtime(&self, data_source_id: &str) -> Option<&Runtime> {
        Catalog::runtime(self, data_source_id)
    }
}
