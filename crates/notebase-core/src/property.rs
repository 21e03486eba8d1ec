//! Property (column) schema types

use crate::rollup::RollupConfig;
use std::fmt;
use std::str::FromStr;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Kind of a property
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum PropertyType {
    /// The row title
    Title,
    #[default]
    Text,
    Number,
    Select,
    MultiSelect,
    Status,
    Priority,
    Person,
    Date,
    Checkbox,
    Url,
    Email,
    Phone,
    Place,
    File,
    GithubPr,
    /// Computed from other properties of the same row
    Formula,
    /// Links to rows of another data source
    Relation,
    /// Aggregates a property across related rows
    Rollup,
}

impl PropertyType {
    /// Wire name of the type
    pub fn as_str(&self) -> &'static str {
        match self {
            PropertyType::Title => "title",
            PropertyType::Text => "text",
            PropertyType::Number => "number",
            PropertyType::Select => "select",
            PropertyType::MultiSelect => "multi_select",
            PropertyType::Status => "status",
            PropertyType::Priority => "priority",
            PropertyType::Person => "person",
            PropertyType::Date => "date",
            PropertyType::Checkbox => "checkbox",
            PropertyType::Url => "url",
            PropertyType::Email => "email",
            PropertyType::Phone => "phone",
            PropertyType::Place => "place",
            PropertyType::File => "file",
            PropertyType::GithubPr => "github_pr",
            PropertyType::Formula => "formula",
            PropertyType::Relation => "relation",
            PropertyType::Rollup => "rollup",
        }
    }

    /// Whether the property stores enumerated choices in `options`
    pub fn has_options(&self) -> bool {
        matches!(
            self,
            PropertyType::Select
                | PropertyType::MultiSelect
                | PropertyType::Status
                | PropertyType::Priority
        )
    }
}

impl fmt::Display for PropertyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Declared result type of a formula property
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum ReturnType {
    #[default]
    Text,
    Number,
    Boolean,
    Date,
}

impl ReturnType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReturnType::Text => "text",
            ReturnType::Number => "number",
            ReturnType::Boolean => "boolean",
            ReturnType::Date => "date",
        }
    }
}

impl fmt::Display for ReturnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReturnType {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "text" => Ok(ReturnType::Text),
            "number" => Ok(ReturnType::Number),
            "boolean" => Ok(ReturnType::Boolean),
            "date" => Ok(ReturnType::Date),
            _ => Err(crate::Error::InvalidReturnType(s.to_string())),
        }
    }
}

/// How many rows a relation property may link to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum RelationLimit {
    Single,
    #[default]
    Multiple,
}

/// An enumerated choice of a select/status-like property
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase", default))]
pub struct PropertyOption {
    pub id: String,
    pub name: String,
    pub color: Option<String>,
}

impl PropertyOption {
    pub fn new<I: Into<String>, N: Into<String>>(id: I, name: N) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            color: None,
        }
    }
}

/// Definition of one property in a data source schema
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase", default))]
pub struct PropertyDefinition {
    /// Stable identifier (key into `Row::database_properties`)
    pub id: String,
    /// Display name, referenced by `prop("Name")`
    pub name: String,
    #[cfg_attr(feature = "serde", serde(rename = "type"))]
    pub property_type: PropertyType,
    /// Formula source text (formula properties only)
    pub formula: Option<String>,
    /// Declared result type (formula properties only)
    pub formula_return_type: Option<ReturnType>,
    /// Enumerated choices (select/status-like properties)
    pub options: Vec<PropertyOption>,
    /// Linked data source (relation properties only)
    pub linked_data_source_id: Option<String>,
    /// Relation cardinality (relation properties only)
    pub relation_limit: Option<RelationLimit>,
    /// Rollup configuration (rollup properties only)
    pub rollup: Option<RollupConfig>,
}

impl PropertyDefinition {
    /// Create a plain property
    pub fn new<I: Into<String>, N: Into<String>>(
        id: I,
        name: N,
        property_type: PropertyType,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            property_type,
            ..Default::default()
        }
    }

    /// Create a formula property
    pub fn formula<I: Into<String>, N: Into<String>, F: Into<String>>(
        id: I,
        name: N,
        formula: F,
        return_type: ReturnType,
    ) -> Self {
        Self {
            formula: Some(formula.into()),
            formula_return_type: Some(return_type),
            ..Self::new(id, name, PropertyType::Formula)
        }
    }

    /// Create a relation property linking to `data_source_id`
    pub fn relation<I: Into<String>, N: Into<String>, D: Into<String>>(
        id: I,
        name: N,
        data_source_id: D,
        limit: RelationLimit,
    ) -> Self {
        Self {
            linked_data_source_id: Some(data_source_id.into()),
            relation_limit: Some(limit),
            ..Self::new(id, name, PropertyType::Relation)
        }
    }

    /// Create a rollup property
    pub fn rollup<I: Into<String>, N: Into<String>>(id: I, name: N, config: RollupConfig) -> Self {
        Self {
            rollup: Some(config),
            ..Self::new(id, name, PropertyType::Rollup)
        }
    }

    /// Attach enumerated choices
    pub fn with_options<I: IntoIterator<Item = PropertyOption>>(mut self, options: I) -> Self {
        self.options = options.into_iter().collect();
        self
    }

    pub fn is_formula(&self) -> bool {
        self.property_type == PropertyType::Formula
    }

    /// Trimmed formula text, if any
    pub fn formula_text(&self) -> Option<&str> {
        self.formula.as_deref().map(str::trim)
    }

    /// Declared return type, falling back to `default`
    pub fn return_type_or(&self, default: ReturnType) -> ReturnType {
        self.formula_return_type.unwrap_or(default)
    }

    /// Look up one of this property's options by id
    pub fn option_by_id(&self, id: &str) -> Option<&PropertyOption> {
        self.options.iter().find(|opt| opt.id == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_formula_constructor() {
        let prop = PropertyDefinition::formula("f1", "Total", "  1 + 2 ", ReturnType::Number);
        assert!(prop.is_formula());
        assert_eq!(prop.formula_text(), Some("1 + 2"));
        assert_eq!(prop.return_type_or(ReturnType::Text), ReturnType::Number);
    }

    #[test]
    fn test_return_type_parse() {
        assert_eq!("Number".parse::<ReturnType>().unwrap(), ReturnType::Number);
        assert!("currency".parse::<ReturnType>().is_err());
    }

    #[test]
    fn test_option_lookup() {
        let prop = PropertyDefinition::new("s", "Status", PropertyType::Status).with_options([
            PropertyOption::new("opt-1", "Todo"),
            PropertyOption::new("opt-2", "Done"),
        ]);
        assert!(prop.property_type.has_options());
        assert_eq!(prop.option_by_id("opt-2").map(|o| o.name.as_str()), Some("Done"));
        assert!(prop.option_by_id("missing").is_none());
    }
}
