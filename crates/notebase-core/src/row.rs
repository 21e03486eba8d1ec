//! Row (page) type

use crate::value::Value;
use std::collections::BTreeMap;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// One record of a data source.
///
/// The formula engine only reads and writes `database_properties` and
/// `formula_errors`; `title` is read for the title property and aliases.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase", default))]
pub struct Row {
    pub id: String,
    pub title: String,
    /// Property id → stored value
    pub database_properties: BTreeMap<String, Value>,
    /// Formula property id → error message from the last recompute
    pub formula_errors: BTreeMap<String, String>,
}

impl Row {
    /// Create an empty row
    pub fn new<I: Into<String>>(id: I) -> Self {
        Self {
            id: id.into(),
            ..Default::default()
        }
    }

    /// Set the title (builder style)
    pub fn with_title<S: Into<String>>(mut self, title: S) -> Self {
        self.title = title.into();
        self
    }

    /// Set a property value (builder style)
    pub fn with<K: Into<String>, V: Into<Value>>(mut self, property_id: K, value: V) -> Self {
        self.set(property_id, value);
        self
    }

    /// Set a property value
    pub fn set<K: Into<String>, V: Into<Value>>(&mut self, property_id: K, value: V) {
        self.database_properties
            .insert(property_id.into(), value.into());
    }

    /// Get a property value (`None` when the row has no entry for it)
    pub fn get(&self, property_id: &str) -> Option<&Value> {
        self.database_properties.get(property_id)
    }

    /// Get a property value, treating a missing entry as `Null`
    pub fn value(&self, property_id: &str) -> Value {
        self.get(property_id).cloned().unwrap_or(Value::Null)
    }
}
