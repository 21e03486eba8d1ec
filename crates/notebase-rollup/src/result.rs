//! Rollup results

use crate::error::RollupConfigError;
use notebase_core::{CalculationCategory, CalculationValue, RollupCalculation, Value};

/// Where a rollup computation ended up
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RollupState {
    /// The linked data source is not available yet
    Loading,
    Ready,
    /// Relation or target property missing or misconfigured
    Error,
}

impl RollupState {
    pub fn as_str(&self) -> &'static str {
        match self {
            RollupState::Loading => "loading",
            RollupState::Ready => "ready",
            RollupState::Error => "error",
        }
    }
}

/// Aggregate of one rollup property on one row.
///
/// Which fields are set depends on the calculation: `values` for
/// `original`, `count` (plus `total_count` and `count_fraction` for
/// `per_group`) for `count`, and `percent` for `percent`.
#[derive(Debug, Clone, PartialEq)]
pub struct RollupResult {
    pub state: RollupState,
    pub calculation: RollupCalculation,
    pub values: Vec<Value>,
    pub count: Option<usize>,
    pub total_count: Option<usize>,
    pub count_fraction: Option<String>,
    pub percent: Option<u32>,
    pub message: Option<String>,
}

impl RollupResult {
    fn empty(state: RollupState, calculation: RollupCalculation) -> Self {
        Self {
            state,
            calculation,
            values: Vec::new(),
            count: None,
            total_count: None,
            count_fraction: None,
            percent: None,
            message: None,
        }
    }

    pub fn loading(calculation: RollupCalculation) -> Self {
        Self {
            message: Some("Loading…".to_string()),
            ..Self::empty(RollupState::Loading, calculation)
        }
    }

    pub fn error(calculation: RollupCalculation, error: &RollupConfigError) -> Self {
        Self {
            message: Some(error.to_string()),
            ..Self::empty(RollupState::Error, calculation)
        }
    }

    pub(crate) fn ready(calculation: RollupCalculation) -> Self {
        Self::empty(RollupState::Ready, calculation)
    }

    pub(crate) fn with_message(mut self, message: &str) -> Self {
        self.message = Some(message.to_string());
        self
    }

    pub fn is_ready(&self) -> bool {
        self.state == RollupState::Ready
    }

    /// Value used to sort, filter and group rows by this rollup.
    ///
    /// Counts and percents are numbers, `per_group` counts the matched
    /// fraction, `original` the linked values joined with ", ". `None`
    /// unless the rollup is ready.
    pub fn comparable_value(&self) -> Option<Value> {
        if !self.is_ready() {
            return None;
        }
        match self.calculation.category {
            CalculationCategory::Count => {
                let count = self.count.unwrap_or(0) as f64;
                if self.calculation.value == CalculationValue::PerGroup {
                    let total = self.total_count.unwrap_or(0) as f64;
                    let fraction = if total > 0.0 { count / total } else { 0.0 };
                    Some(Value::Number(fraction))
                } else {
                    Some(Value::Number(count))
                }
            }
            CalculationCategory::Percent => {
                Some(Value::Number(f64::from(self.percent.unwrap_or(0))))
            }
            CalculationCategory::Original if self.values.is_empty() => None,
            CalculationCategory::Original => Some(Value::Text(
                self.values
                    .iter()
                    .map(Value::to_text)
                    .collect::<Vec<_>>()
                    .join(", "),
            )),
        }
    }
}
