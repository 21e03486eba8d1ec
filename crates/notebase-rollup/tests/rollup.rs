//! Rollups over a projects → tasks relation.

use notebase_core::{
    CalculationValue, PropertyDefinition, PropertyOption, PropertyType, RelationLimit,
    ReturnType, RollupCalculation, RollupConfig, Row, Value,
};
use notebase_rollup::{
    compute_rollup, compute_rollups_for_rows, MemorySource, RollupOptions, RollupResult,
    RollupState,
};
use pretty_assertions::assert_eq;

fn task_schema() -> Vec<PropertyDefinition> {
    vec![
        PropertyDefinition::new("title", "Name", PropertyType::Title),
        PropertyDefinition::new("status", "Status", PropertyType::Status).with_options([
            PropertyOption::new("opt-todo", "Todo"),
            PropertyOption::new("opt-done", "Done"),
        ]),
        PropertyDefinition::new("tags", "Tags", PropertyType::MultiSelect),
        PropertyDefinition::new("hours", "Hours", PropertyType::Number),
        PropertyDefinition::formula("double", "Double", r#"prop("Hours") * 2"#, ReturnType::Number),
        PropertyDefinition::rollup("nested", "Nested", RollupConfig::default()),
    ]
}

fn tasks() -> Vec<Row> {
    vec![
        Row::new("t1").with_title("Write").with("status", "Done").with("hours", 1),
        Row::new("t2").with_title("Test").with("status", "Todo").with("hours", 2),
        Row::new("t3")
            .with_title("Ship")
            .with("status", "Done")
            .with("tags", Value::text_list(["release"])),
        Row::new("t4").with_title("Plan").with("hours", 4),
    ]
}

fn source() -> MemorySource {
    MemorySource::new().with_data_source("tasks", task_schema(), tasks())
}

fn project_schema(config: RollupConfig) -> Vec<PropertyDefinition> {
    vec![
        PropertyDefinition::relation("rel", "Tasks", "tasks", RelationLimit::Multiple),
        PropertyDefinition::rollup("roll", "Rollup", config),
    ]
}

fn project() -> Row {
    Row::new("p1").with("rel", Value::text_list(["t1", "t2", "t3", "t4"]))
}

fn rollup_with(config: RollupConfig, row: &Row, source: &MemorySource) -> RollupResult {
    let schema = project_schema(config);
    compute_rollup(row, &schema[1], &schema, source, &RollupOptions::default())
}

fn rollup(config: RollupConfig) -> RollupResult {
    rollup_with(config, &project(), &source())
}

fn status(calculation: RollupCalculation) -> RollupConfig {
    RollupConfig::new("rel", "tasks", "status").with_calculation(calculation)
}

#[test]
fn test_count_per_group() {
    let result = rollup(
        status(RollupCalculation::count(CalculationValue::PerGroup))
            .with_selected_options(["Done"]),
    );
    assert_eq!(result.state, RollupState::Ready);
    assert_eq!(result.count, Some(2));
    assert_eq!(result.total_count, Some(4));
    assert_eq!(result.count_fraction.as_deref(), Some("2/4"));
}

#[test]
fn test_percent_per_group() {
    let result = rollup(
        status(RollupCalculation::percent(CalculationValue::PerGroup))
            .with_selected_options(["Done"]),
    );
    assert_eq!(result.state, RollupState::Ready);
    assert_eq!(result.percent, Some(50));
}

#[test]
fn test_selection_by_option_id() {
    let result = rollup(
        status(RollupCalculation::count(CalculationValue::PerGroup))
            .with_selected_options(["opt-todo"]),
    );
    assert_eq!(result.count_fraction.as_deref(), Some("1/4"));
}

#[test]
fn test_per_group_matches_list_values() {
    let config = RollupConfig::new("rel", "tasks", "tags")
        .with_calculation(RollupCalculation::count(CalculationValue::PerGroup))
        .with_selected_options(["release"]);
    assert_eq!(rollup(config).count, Some(1));
}

#[test]
fn test_empty_selection() {
    let result = rollup(status(RollupCalculation::count(CalculationValue::PerGroup)));
    assert_eq!(result.count, Some(0));
    assert_eq!(result.count_fraction.as_deref(), Some("0/4"));
    assert_eq!(result.message.as_deref(), Some("Select options to count"));

    let result = rollup(status(RollupCalculation::percent(CalculationValue::PerGroup)));
    assert_eq!(result.percent, Some(0));
    assert_eq!(result.message.as_deref(), Some("Select options to calculate percent"));
}

#[test]
fn test_count_kinds() {
    let count = |value| rollup(status(RollupCalculation::count(value))).count;
    assert_eq!(count(CalculationValue::All), Some(4));
    assert_eq!(count(CalculationValue::Original), Some(4));
    assert_eq!(count(CalculationValue::Empty), Some(1));
    assert_eq!(count(CalculationValue::NonEmpty), Some(3));

    let percent = |value| rollup(status(RollupCalculation::percent(value))).percent;
    assert_eq!(percent(CalculationValue::All), Some(100));
    assert_eq!(percent(CalculationValue::Empty), Some(25));
    assert_eq!(percent(CalculationValue::NonEmpty), Some(75));
}

#[test]
fn test_original_values() {
    let result = rollup(status(RollupCalculation::ORIGINAL));
    assert_eq!(
        result.values,
        vec![
            Value::text("Done"),
            Value::text("Todo"),
            Value::text("Done"),
            Value::Null
        ]
    );
    assert_eq!(result.count, Some(4));
    assert_eq!(
        result.comparable_value(),
        Some(Value::text("Done, Todo, Done, "))
    );

    let schema = project_schema(status(RollupCalculation::ORIGINAL));
    let options = RollupOptions {
        original_value_limit: Some(2),
    };
    let limited = compute_rollup(&project(), &schema[1], &schema, &source(), &options);
    assert_eq!(limited.values.len(), 2);
    assert_eq!(limited.count, Some(4));
}

#[test]
fn test_title_and_formula_targets() {
    let titles = rollup(RollupConfig::new("rel", "tasks", "title"));
    assert_eq!(titles.values[0], Value::text("Write"));

    let doubled = rollup(RollupConfig::new("rel", "tasks", "double"));
    assert_eq!(
        doubled.values,
        vec![
            Value::Number(2.0),
            Value::Number(4.0),
            Value::Null,
            Value::Number(8.0)
        ]
    );
}

#[test]
fn test_no_related_pages() {
    let row = Row::new("p2");
    let result = rollup_with(
        status(RollupCalculation::count(CalculationValue::All)),
        &row,
        &source(),
    );
    assert_eq!(result.state, RollupState::Ready);
    assert_eq!(result.count, Some(0));
    assert_eq!(result.message.as_deref(), Some("No related pages"));
}

#[test]
fn test_dangling_ids_are_skipped() {
    let row = Row::new("p").with("rel", Value::text_list(["t1", "gone", "t3"]));
    let result = rollup_with(
        status(RollupCalculation::count(CalculationValue::PerGroup))
            .with_selected_options(["Done"]),
        &row,
        &source(),
    );
    assert_eq!(result.count_fraction.as_deref(), Some("2/2"));
}

#[test]
fn test_single_relation_uses_first_id() {
    let schema = vec![
        PropertyDefinition::relation("rel", "Task", "tasks", RelationLimit::Single),
        PropertyDefinition::rollup(
            "roll",
            "Rollup",
            status(RollupCalculation::count(CalculationValue::All)),
        ),
    ];
    let options = RollupOptions::default();
    let result = compute_rollup(&project(), &schema[1], &schema, &source(), &options);
    assert_eq!(result.count, Some(1));
}

#[test]
fn test_loading_until_rows_arrive() {
    let mut source = MemorySource::new();
    source.insert_schema("tasks", task_schema());
    let config = status(RollupCalculation::count(CalculationValue::All));

    let result = rollup_with(config.clone(), &project(), &source);
    assert_eq!(result.state, RollupState::Loading);

    source.insert_rows("tasks", tasks());
    assert_eq!(rollup_with(config, &project(), &source).count, Some(4));
}

#[test]
fn test_configuration_errors() {
    let message = |result: RollupResult| {
        assert_eq!(result.state, RollupState::Error);
        result.message.unwrap_or_default()
    };

    let mut missing_relation = status(RollupCalculation::ORIGINAL);
    missing_relation.relation_property_id = None;
    assert_eq!(message(rollup(missing_relation)), "Select relation");

    let wrong_relation = RollupConfig::new("nope", "tasks", "status");
    assert_eq!(message(rollup(wrong_relation)), "Missing relation");

    let missing_target = RollupConfig::new("rel", "tasks", "gone");
    assert_eq!(message(rollup(missing_target)), "Missing property");

    let mut unselected = RollupConfig::new("rel", "tasks", "status");
    unselected.target_property_id = None;
    assert_eq!(message(rollup(unselected)), "Select property");

    let nested = RollupConfig::new("rel", "tasks", "nested");
    assert_eq!(message(rollup(nested)), "Rollups of rollups are not supported");

    let schema = vec![PropertyDefinition::new("roll", "Rollup", PropertyType::Rollup)];
    let options = RollupOptions::default();
    let result = compute_rollup(&project(), &schema[0], &schema, &source(), &options);
    assert_eq!(message(result), "Configure rollup");
}

#[test]
fn test_batch_matches_single() {
    let config = status(RollupCalculation::percent(CalculationValue::PerGroup))
        .with_selected_options(["Done"]);
    let schema = project_schema(config);
    let rows = vec![
        project(),
        Row::new("p2").with("rel", Value::text_list(["t2"])),
        Row::new("p3"),
    ];
    let source = source();
    let options = RollupOptions::default();

    let batch = compute_rollups_for_rows(&rows, &schema[1], &schema, &source, &options);
    let single: Vec<RollupResult> = rows
        .iter()
        .map(|row| compute_rollup(row, &schema[1], &schema, &source, &options))
        .collect();
    assert_eq!(batch, single);
    assert_eq!(batch[0].percent, Some(50));
    assert_eq!(batch[1].percent, Some(0));
}
