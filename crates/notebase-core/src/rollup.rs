//! Rollup configuration types

use std::fmt;
use std::str::FromStr;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// What a rollup reports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum CalculationCategory {
    /// The linked values themselves
    #[default]
    Original,
    /// A count of matching linked rows
    Count,
    /// A rounded percentage of matching linked rows
    Percent,
}

/// Which linked rows a count/percent rollup matches
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum CalculationValue {
    #[default]
    Original,
    All,
    PerGroup,
    Empty,
    NonEmpty,
}

impl CalculationValue {
    pub fn as_str(&self) -> &'static str {
        match self {
            CalculationValue::Original => "original",
            CalculationValue::All => "all",
            CalculationValue::PerGroup => "per_group",
            CalculationValue::Empty => "empty",
            CalculationValue::NonEmpty => "non_empty",
        }
    }

    fn parse(s: &str) -> Option<Self> {
        match s {
            "original" => Some(CalculationValue::Original),
            "all" => Some(CalculationValue::All),
            "per_group" => Some(CalculationValue::PerGroup),
            "empty" => Some(CalculationValue::Empty),
            "non_empty" => Some(CalculationValue::NonEmpty),
            _ => None,
        }
    }
}

/// A rollup calculation: category plus sub-kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase", default))]
pub struct RollupCalculation {
    pub category: CalculationCategory,
    pub value: CalculationValue,
}

impl RollupCalculation {
    pub const ORIGINAL: RollupCalculation = RollupCalculation {
        category: CalculationCategory::Original,
        value: CalculationValue::Original,
    };

    pub fn count(value: CalculationValue) -> Self {
        Self {
            category: CalculationCategory::Count,
            value,
        }
    }

    pub fn percent(value: CalculationValue) -> Self {
        Self {
            category: CalculationCategory::Percent,
            value,
        }
    }
}

impl fmt::Display for RollupCalculation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.category {
            CalculationCategory::Original => f.write_str("original"),
            CalculationCategory::Count => write!(f, "count_{}", self.value.as_str()),
            CalculationCategory::Percent => write!(f, "percent_{}", self.value.as_str()),
        }
    }
}

/// Parses the legacy flat form (`original`, `count_all`, `percent_per_group`, ...)
impl FromStr for RollupCalculation {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == "original" {
            return Ok(RollupCalculation::ORIGINAL);
        }
        let parsed = if let Some(rest) = s.strip_prefix("count_") {
            CalculationValue::parse(rest).map(RollupCalculation::count)
        } else if let Some(rest) = s.strip_prefix("percent_") {
            CalculationValue::parse(rest).map(RollupCalculation::percent)
        } else {
            None
        };
        parsed.ok_or_else(|| crate::Error::InvalidCalculation(s.to_string()))
    }
}

/// Configuration of a rollup property
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase", default))]
pub struct RollupConfig {
    /// Relation property (in this schema) whose links are followed
    pub relation_property_id: Option<String>,
    /// Data source the relation points into
    pub relation_data_source_id: Option<String>,
    /// Property (in the linked schema) whose values are aggregated
    pub target_property_id: Option<String>,
    pub calculation: RollupCalculation,
    /// Option ids or names matched by `per_group`
    pub selected_options: Vec<String>,
}

impl RollupConfig {
    pub fn new<R, D, T>(relation_property_id: R, data_source_id: D, target_property_id: T) -> Self
    where
        R: Into<String>,
        D: Into<String>,
        T: Into<String>,
    {
        Self {
            relation_property_id: Some(relation_property_id.into()),
            relation_data_source_id: Some(data_source_id.into()),
            target_property_id: Some(target_property_id.into()),
            ..Default::default()
        }
    }

    pub fn with_calculation(mut self, calculation: RollupCalculation) -> Self {
        self.calculation = calculation;
        self
    }

    pub fn with_selected_options<I, S>(mut self, options: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.selected_options = options.into_iter().map(Into::into).collect();
        self
    }
}
