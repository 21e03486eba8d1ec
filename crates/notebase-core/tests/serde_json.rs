//! JSON shapes of values, schemas and rows
#![cfg(feature = "serde")]

use chrono::{TimeZone, Utc};
use notebase_core::{
    CalculationValue, PropertyDefinition, PropertyType, RelationLimit, ReturnType,
    RollupCalculation, RollupConfig, Row, Value,
};
use pretty_assertions::assert_eq;
use serde_json::json;

#[test]
fn test_value_shapes() {
    let date = Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap();
    let values = vec![
        Value::Null,
        Value::text("Done"),
        Value::Number(12.5),
        Value::Boolean(true),
        Value::Date(date),
        Value::text_list(["a", "b"]),
    ];

    let encoded = serde_json::to_value(&values).unwrap();
    assert_eq!(
        encoded,
        json!([null, "Done", 12.5, true, { "date": "2024-03-01T00:00:00Z" }, ["a", "b"]])
    );

    let decoded: Vec<Value> = serde_json::from_value(encoded).unwrap();
    assert_eq!(decoded, values);
}

#[test]
fn test_schema_from_json() {
    let schema: Vec<PropertyDefinition> = serde_json::from_value(json!([
        { "id": "price", "name": "Price", "type": "number" },
        {
            "id": "total",
            "name": "Total",
            "type": "formula",
            "formula": "prop(\"Price\") * 2",
            "formulaReturnType": "number"
        },
        {
            "id": "rel",
            "name": "Tasks",
            "type": "relation",
            "linkedDataSourceId": "tasks",
            "relationLimit": "single"
        },
        {
            "id": "done",
            "name": "Done",
            "type": "rollup",
            "rollup": {
                "relationPropertyId": "rel",
                "relationDataSourceId": "tasks",
                "targetPropertyId": "status",
                "calculation": { "category": "percent", "value": "per_group" },
                "selectedOptions": ["Done"]
            }
        },
        { "id": "tags", "name": "Tags", "type": "multi_select" }
    ]))
    .unwrap();

    assert_eq!(
        schema,
        vec![
            PropertyDefinition::new("price", "Price", PropertyType::Number),
            PropertyDefinition::formula(
                "total",
                "Total",
                "prop(\"Price\") * 2",
                ReturnType::Number,
            ),
            PropertyDefinition::relation("rel", "Tasks", "tasks", RelationLimit::Single),
            PropertyDefinition::rollup(
                "done",
                "Done",
                RollupConfig::new("rel", "tasks", "status")
                    .with_calculation(RollupCalculation::percent(CalculationValue::PerGroup))
                    .with_selected_options(["Done"]),
            ),
            PropertyDefinition::new("tags", "Tags", PropertyType::MultiSelect),
        ]
    );
}

#[test]
fn test_row_round_trip() {
    let mut row = Row::new("r1").with_title("Task").with("price", 3);
    row.formula_errors
        .insert("total".to_string(), "Circular reference".to_string());

    let encoded = serde_json::to_value(&row).unwrap();
    assert_eq!(
        encoded,
        json!({
            "id": "r1",
            "title": "Task",
            "databaseProperties": { "price": 3.0 },
            "formulaErrors": { "total": "Circular reference" }
        })
    );
    assert_eq!(serde_json::from_value::<Row>(encoded).unwrap(), row);
}
