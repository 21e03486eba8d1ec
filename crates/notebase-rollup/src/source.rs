//! Lookup of linked data sources

use ahash::AHashMap;
use notebase_core::{PropertyDefinition, Row};
use notebase_formula::Runtime;

/// Synchronous access to the rows and schemas of linked data sources.
///
/// `None` from [`rows`](RollupSource::rows) or
/// [`schema`](RollupSource::schema) means the data source is not available
/// yet; the rollup then reports the loading state. Hosts with asynchronous
/// storage fill their cache before aggregating.
pub trait RollupSource {
    fn rows(&self, data_source_id: &str) -> Option<&[Row]>;

    fn schema(&self, data_source_id: &str) -> Option<&[PropertyDefinition]>;

    /// Compiled formulas of the data source, for sources that keep them.
    /// When `None` the aggregator compiles the schema itself.
    fn runtime(&self, _data_source_id: &str) -> Option<&Runtime> {
        None
    }
}

/// A [`RollupSource`] over data held in memory
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    schemas: AHashMap<String, Vec<PropertyDefinition>>,
    rows: AHashMap<String, Vec<Row>>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a data source with its schema and rows
    pub fn with_data_source<I: Into<String>>(
        mut self,
        data_source_id: I,
        properties: Vec<PropertyDefinition>,
        rows: Vec<Row>,
    ) -> Self {
        let id = data_source_id.into();
        self.schemas.insert(id.clone(), properties);
        self.rows.insert(id, rows);
        self
    }

    /// Register only a schema; rows stay unavailable until inserted
    pub fn insert_schema<I: Into<String>>(
        &mut self,
        data_source_id: I,
        properties: Vec<PropertyDefinition>,
    ) {
        self.schemas.insert(data_source_id.into(), properties);
    }

    pub fn insert_rows<I: Into<String>>(&mut self, data_source_id: I, rows: Vec<Row>) {
        self.rows.insert(data_source_id.into(), rows);
    }
}

impl RollupSource for MemorySource {
    fn rows(&self, data_source_id: &str) -> Option<&[Row]> {
        self.rows.get(data_source_id).map(Vec::as_slice)
    }

    fn schema(&self, data_source_id: &str) -> Option<&[PropertyDefinition]> {
        self.schemas.get(data_source_id).map(Vec::as_slice)
    }
}
