//! Rollup aggregation
//!
//! A [`RollupPlan`] resolves everything about a rollup property that does
//! not depend on the row: the relation, the linked data source, the target
//! property and, for formula targets, the compiled foreign schema. Applying
//! the plan to a row follows the row's relation ids and aggregates.

use crate::error::RollupConfigError;
use crate::result::RollupResult;
use crate::source::RollupSource;
use ahash::AHashMap;
use notebase_core::{
    CalculationCategory, CalculationValue, PropertyDefinition, PropertyType, RelationLimit,
    RollupCalculation, RollupConfig, Row, Value,
};
use notebase_formula::{Runtime, RuntimeOptions};
use std::borrow::Cow;
use tracing::debug;

/// Aggregation settings
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RollupOptions {
    /// Cap on the values an `original` rollup returns; all when `None`
    pub original_value_limit: Option<usize>,
}

/// How the target value of a linked row is read
enum Target<'a> {
    Stored(&'a str),
    Title,
    Formula {
        runtime: Cow<'a, Runtime>,
        property_id: &'a str,
    },
}

impl Target<'_> {
    fn read(&self, row: &Row) -> Value {
        match self {
            Target::Stored(id) => row.value(id),
            Target::Title => Value::text(row.title.as_str()),
            Target::Formula {
                runtime,
                property_id,
            } => runtime
                .evaluate_property(property_id, row)
                .map_or(Value::Null, |result| result.value),
        }
    }
}

/// The linked side of a rollup, once available
struct Linked<'a> {
    rows: AHashMap<&'a str, &'a Row>,
    target: Target<'a>,
    /// Selected option names, for `per_group`
    selected: Vec<String>,
}

enum Unavailable {
    Loading,
    Invalid(RollupConfigError),
}

enum Stage<'a> {
    Invalid(RollupConfigError),
    Prepared {
        relation_id: &'a str,
        relation_limit: RelationLimit,
        linked: Result<Linked<'a>, Unavailable>,
    },
}

/// Row-independent part of a rollup computation
pub struct RollupPlan<'a> {
    calculation: RollupCalculation,
    options: &'a RollupOptions,
    stage: Stage<'a>,
}

impl<'a> RollupPlan<'a> {
    /// Resolve the rollup property against its schema and the linked
    /// data source
    pub fn prepare(
        rollup_property: &'a PropertyDefinition,
        properties: &'a [PropertyDefinition],
        source: &'a dyn RollupSource,
        options: &'a RollupOptions,
    ) -> Self {
        let Some(config) = rollup_property.rollup.as_ref() else {
            return Self {
                calculation: RollupCalculation::ORIGINAL,
                options,
                stage: Stage::Invalid(RollupConfigError::MissingConfig),
            };
        };
        let stage = match resolve_relation(config.relation_property_id.as_deref(), properties) {
            Err(e) => Stage::Invalid(e),
            Ok(relation) => Stage::Prepared {
                relation_id: relation.id.as_str(),
                relation_limit: relation.relation_limit.unwrap_or_default(),
                linked: resolve_linked(config, relation, source),
            },
        };
        Self {
            calculation: config.calculation,
            options,
            stage,
        }
    }

    pub fn calculation(&self) -> RollupCalculation {
        self.calculation
    }

    /// Aggregate the rows linked from `row`
    pub fn apply(&self, row: &Row) -> RollupResult {
        let (relation_id, relation_limit, linked) = match &self.stage {
            Stage::Invalid(e) => return RollupResult::error(self.calculation, e),
            Stage::Prepared {
                relation_id,
                relation_limit,
                linked,
            } => (*relation_id, *relation_limit, linked),
        };

        let ids = relation_ids(row.get(relation_id), relation_limit);
        if ids.is_empty() {
            return self
                .aggregate(&[], &[])
                .with_message("No related pages");
        }

        let linked = match linked {
            Ok(linked) => linked,
            Err(Unavailable::Loading) => return RollupResult::loading(self.calculation),
            Err(Unavailable::Invalid(e)) => return RollupResult::error(self.calculation, e),
        };

        let values: Vec<Value> = ids
            .iter()
            .filter_map(|id| {
                let found = linked.rows.get(id.as_str());
                if found.is_none() {
                    debug!(row = %row.id, linked = %id, "skipping dangling relation id");
                }
                found
            })
            .map(|linked_row| linked.target.read(linked_row))
            .collect();

        self.aggregate(&values, &linked.selected)
    }

    fn aggregate(&self, values: &[Value], selected: &[String]) -> RollupResult {
        let calculation = self.calculation;
        let total = values.len();
        let mut result = RollupResult::ready(calculation);

        if calculation.category == CalculationCategory::Original {
            let limit = self.options.original_value_limit.unwrap_or(total);
            result.values = values.iter().take(limit).cloned().collect();
            result.count = Some(total);
            return result;
        }

        let per_group = calculation.value == CalculationValue::PerGroup;
        let counting = calculation.category == CalculationCategory::Count;
        if per_group && selected.is_empty() {
            return if counting {
                result.count = Some(0);
                result.total_count = Some(total);
                result.count_fraction = Some(format!("0/{total}"));
                result.with_message("Select options to count")
            } else {
                result.percent = Some(0);
                result.with_message("Select options to calculate percent")
            };
        }

        let matched = match calculation.value {
            CalculationValue::All | CalculationValue::Original => total,
            CalculationValue::Empty => values.iter().filter(|v| v.is_empty()).count(),
            CalculationValue::NonEmpty => values.iter().filter(|v| !v.is_empty()).count(),
            CalculationValue::PerGroup => values
                .iter()
                .filter(|v| matches_selection(v, selected))
                .count(),
        };

        if counting {
            result.count = Some(matched);
            if per_group {
                result.total_count = Some(total);
                result.count_fraction = Some(format!("{matched}/{total}"));
            }
        } else {
            result.percent = Some(percent(matched, total));
        }
        result
    }
}

fn resolve_relation<'a>(
    relation_id: Option<&str>,
    properties: &'a [PropertyDefinition],
) -> Result<&'a PropertyDefinition, RollupConfigError> {
    let relation_id = relation_id
        .filter(|id| !id.is_empty())
        .ok_or(RollupConfigError::RelationNotSelected)?;
    let relation = properties
        .iter()
        .find(|p| p.id == relation_id)
        .ok_or_else(|| RollupConfigError::MissingRelation(relation_id.to_string()))?;
    if relation.property_type != PropertyType::Relation {
        return Err(RollupConfigError::NotARelation(relation.name.clone()));
    }
    Ok(relation)
}

fn resolve_linked<'a>(
    config: &'a RollupConfig,
    relation: &'a PropertyDefinition,
    source: &'a dyn RollupSource,
) -> Result<Linked<'a>, Unavailable> {
    let data_source_id = config
        .relation_data_source_id
        .as_deref()
        .or(relation.linked_data_source_id.as_deref())
        .filter(|id| !id.is_empty());
    let target_id = config.target_property_id.as_deref().filter(|id| !id.is_empty());
    let (Some(data_source_id), Some(target_id)) = (data_source_id, target_id) else {
        return Err(Unavailable::Invalid(RollupConfigError::TargetNotSelected));
    };

    let (Some(rows), Some(schema)) = (source.rows(data_source_id), source.schema(data_source_id))
    else {
        return Err(Unavailable::Loading);
    };

    let target_property = schema
        .iter()
        .find(|p| p.id == target_id)
        .ok_or_else(|| {
            Unavailable::Invalid(RollupConfigError::MissingTarget(target_id.to_string()))
        })?;

    let target = match target_property.property_type {
        PropertyType::Rollup => {
            return Err(Unavailable::Invalid(RollupConfigError::RollupOfRollup(
                target_property.name.clone(),
            )))
        }
        PropertyType::Formula => Target::Formula {
            runtime: source.runtime(data_source_id).map_or_else(
                || Cow::Owned(Runtime::build(schema, RuntimeOptions::default())),
                Cow::Borrowed,
            ),
            property_id: target_property.id.as_str(),
        },
        PropertyType::Title => Target::Title,
        _ => Target::Stored(target_property.id.as_str()),
    };

    // Selections hold option ids; plain names are accepted as well
    let selected = config
        .selected_options
        .iter()
        .map(|selection| {
            target_property
                .option_by_id(selection)
                .map_or_else(|| selection.clone(), |option| option.name.clone())
        })
        .collect();

    Ok(Linked {
        rows: rows.iter().map(|r| (r.id.as_str(), r)).collect(),
        target,
        selected,
    })
}

/// Linked row ids held by a relation value
fn relation_ids(value: Option<&Value>, limit: RelationLimit) -> Vec<String> {
    let mut ids: Vec<String> = match value {
        Some(Value::List(items)) => items
            .iter()
            .map(Value::to_text)
            .filter(|id| !id.is_empty())
            .collect(),
        Some(Value::Text(id)) if !id.is_empty() => vec![id.clone()],
        _ => Vec::new(),
    };
    if limit == RelationLimit::Single {
        ids.truncate(1);
    }
    ids
}

fn matches_selection(value: &Value, selected: &[String]) -> bool {
    match value {
        Value::Text(s) => selected.contains(s),
        Value::List(items) => items.iter().any(|item| match item {
            Value::Text(s) => selected.contains(s),
            _ => false,
        }),
        _ => false,
    }
}

/// `round(100 * matched / total)`, 0 for an empty total
fn percent(matched: usize, total: usize) -> u32 {
    if total == 0 {
        return 0;
    }
    (100.0 * matched as f64 / total as f64).round() as u32
}

/// Compute one rollup property for one row
pub fn compute_rollup(
    row: &Row,
    rollup_property: &PropertyDefinition,
    properties: &[PropertyDefinition],
    source: &dyn RollupSource,
    options: &RollupOptions,
) -> RollupResult {
    RollupPlan::prepare(rollup_property, properties, source, options).apply(row)
}

/// Compute one rollup property for many rows, resolving the linked side once
pub fn compute_rollups_for_rows(
    rows: &[Row],
    rollup_property: &PropertyDefinition,
    properties: &[PropertyDefinition],
    source: &dyn RollupSource,
    options: &RollupOptions,
) -> Vec<RollupResult> {
    let plan = RollupPlan::prepare(rollup_property, properties, source, options);
    rows.iter().map(|row| plan.apply(row)).collect()
}
