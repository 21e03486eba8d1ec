//! Runtime facade
//!
//! A [`Runtime`] is built once per schema snapshot and then applied to any
//! number of rows. It holds only immutable compiled state, so one runtime
//! can be shared across threads and rebuilt freely after a schema edit.
//!
//! ```rust
//! use notebase_core::{PropertyDefinition, PropertyType, ReturnType, Row, Value};
//! use notebase_formula::{Runtime, RuntimeOptions};
//!
//! let schema = vec![
//!     PropertyDefinition::new("price", "Price", PropertyType::Number),
//!     PropertyDefinition::new("qty", "Quantity", PropertyType::Number),
//!     PropertyDefinition::formula(
//!         "total",
//!         "Total",
//!         "prop(\"Price\") * prop(\"Quantity\")",
//!         ReturnType::Number,
//!     ),
//! ];
//! let runtime = Runtime::build(&schema, RuntimeOptions::default());
//!
//! let row = Row::new("r1").with("price", 12.5).with("qty", 3);
//! let result = runtime.recompute_formulas_for_note(&row);
//! assert_eq!(result.results["total"].value, Value::Number(37.5));
//! assert_eq!(result.row.value("total"), Value::Number(37.5));
//! ```

use crate::compiler::{compile_schema, Binding, CompiledFormula, CompiledSchema};
use crate::error::{ErrorKind, FormulaError, FormulaResult};
use crate::evaluator::{conform_to_return_type, evaluate, EvaluationContext};
use crate::functions::CallContext;
use chrono::{DateTime, Utc};
use notebase_core::{PropertyDefinition, PropertyType, ReturnType, Row, Value};
use std::collections::BTreeMap;
use tracing::{debug, trace};

/// Runtime configuration
#[derive(Debug, Clone, PartialEq)]
pub struct RuntimeOptions {
    /// Return type for formulas that declare none
    pub default_return_type: ReturnType,
    /// Names that read the row title when no property carries them
    pub title_aliases: Vec<String>,
    /// Fixed clock for `now()`; the system clock when `None`
    pub now: Option<DateTime<Utc>>,
}

impl Default for RuntimeOptions {
    fn default() -> Self {
        Self {
            default_return_type: ReturnType::Text,
            title_aliases: vec!["title".to_string(), "name".to_string()],
            now: None,
        }
    }
}

impl RuntimeOptions {
    /// Pin `now()` to a fixed instant
    pub fn with_now(mut self, now: DateTime<Utc>) -> Self {
        self.now = Some(now);
        self
    }

    fn call_context(&self) -> CallContext {
        CallContext {
            now: self.now.unwrap_or_else(Utc::now),
        }
    }
}

/// Outcome of one formula property on one row
#[derive(Debug, Clone, PartialEq)]
pub struct EvaluationResult {
    pub value: Value,
    /// User-facing error message
    pub error: Option<String>,
    pub kind: Option<ErrorKind>,
}

impl EvaluationResult {
    pub fn ok(value: Value) -> Self {
        Self {
            value,
            error: None,
            kind: None,
        }
    }

    pub fn from_error(error: &FormulaError) -> Self {
        Self {
            value: Value::Null,
            error: Some(error.to_string()),
            kind: Some(error.kind()),
        }
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}

impl From<&FormulaResult<Value>> for EvaluationResult {
    fn from(result: &FormulaResult<Value>) -> Self {
        match result {
            Ok(value) => EvaluationResult::ok(value.clone()),
            Err(e) => EvaluationResult::from_error(e),
        }
    }
}

/// Formula results for one row
#[derive(Debug, Clone, PartialEq)]
pub struct RecomputeResult {
    /// Copy of the input row with formula values and errors merged in
    pub row: Row,
    /// Formula property id → result
    pub results: BTreeMap<String, EvaluationResult>,
}

impl RecomputeResult {
    /// Formula property ids with their error messages
    pub fn errors(&self) -> impl Iterator<Item = (&str, &str)> + '_ {
        self.results
            .iter()
            .filter_map(|(id, r)| r.error.as_deref().map(|e| (id.as_str(), e)))
    }

    pub fn error_count(&self) -> usize {
        self.errors().count()
    }
}

/// Compiled formulas of one schema
#[derive(Debug, Clone)]
pub struct Runtime {
    schema: CompiledSchema,
    options: RuntimeOptions,
}

impl Runtime {
    /// Parse and resolve every formula property of the schema
    pub fn build(properties: &[PropertyDefinition], options: RuntimeOptions) -> Self {
        let schema = compile_schema(properties, &options);
        debug!(
            properties = properties.len(),
            formulas = schema.formulas.len(),
            circular = schema.cyclic.len(),
            structural_errors = schema
                .formulas
                .iter()
                .filter(|f| f.structural.is_some())
                .count(),
            "built formula runtime"
        );
        Self { schema, options }
    }

    pub fn has_formulas(&self) -> bool {
        !self.schema.formulas.is_empty()
    }

    pub fn formula_count(&self) -> usize {
        self.schema.formulas.len()
    }

    pub fn options(&self) -> &RuntimeOptions {
        &self.options
    }

    /// Formula property ids in evaluation order; cyclic formulas excluded
    pub fn order(&self) -> impl Iterator<Item = &str> + '_ {
        self.schema
            .order
            .iter()
            .map(|&i| self.schema.formulas[i].id.as_str())
    }

    /// Errors that apply to every row, by formula property id
    pub fn structural_errors(&self) -> impl Iterator<Item = (&str, &FormulaError)> + '_ {
        self.schema
            .formulas
            .iter()
            .filter_map(|f| f.structural.as_ref().map(|e| (f.id.as_str(), e)))
    }

    /// Whether the property is a formula of this schema
    pub fn is_formula(&self, property_id: &str) -> bool {
        self.index_of(property_id).is_some()
    }

    fn index_of(&self, property_id: &str) -> Option<usize> {
        self.schema.formulas.iter().position(|f| f.id == property_id)
    }

    /// Formula ids, in evaluation order, that transitively read the property
    pub fn formulas_affected_by(&self, property_id: &str) -> Vec<&str> {
        let mut affected = vec![false; self.schema.formulas.len()];
        for (i, formula) in self.schema.formulas.iter().enumerate() {
            if formula.reads.iter().any(|read| read == property_id) {
                for (j, reached) in self.schema.graph.dependent_closure(i).into_iter().enumerate() {
                    affected[j] |= reached;
                }
            }
        }
        self.schema
            .order
            .iter()
            .filter(|&&i| affected[i])
            .map(|&i| self.schema.formulas[i].id.as_str())
            .collect()
    }

    /// Evaluate every formula of the row
    pub fn recompute_formulas_for_note(&self, row: &Row) -> RecomputeResult {
        self.recompute_with(row, &self.options.call_context())
    }

    /// Evaluate many rows against the same compiled schema
    pub fn recompute_formulas_for_notes(&self, rows: &[Row]) -> Vec<RecomputeResult> {
        let call = self.options.call_context();
        rows.iter().map(|row| self.recompute_with(row, &call)).collect()
    }

    /// Like [`Runtime::recompute_formulas_for_notes`], spread over the rayon pool
    #[cfg(feature = "parallel")]
    pub fn recompute_formulas_for_notes_par(&self, rows: &[Row]) -> Vec<RecomputeResult> {
        use rayon::prelude::*;

        let call = self.options.call_context();
        rows.par_iter()
            .map(|row| self.recompute_with(row, &call))
            .collect()
    }

    /// Evaluate one formula property, and only what it depends on.
    /// `None` when the property is not a formula of this schema.
    pub fn evaluate_property(&self, property_id: &str, row: &Row) -> Option<EvaluationResult> {
        let index = self.index_of(property_id)?;
        let needed = self.schema.graph.precedent_closure(index);
        let mut pass = RowPass::new(&self.schema, row, self.options.call_context());
        for &i in &self.schema.order {
            if needed[i] {
                pass.run(i);
            }
        }
        pass.memo[index].as_ref().map(EvaluationResult::from)
    }

    fn recompute_with(&self, row: &Row, call: &CallContext) -> RecomputeResult {
        let mut merged = row.clone();
        let mut results = BTreeMap::new();
        if !self.has_formulas() {
            return RecomputeResult {
                row: merged,
                results,
            };
        }

        let mut pass = RowPass::new(&self.schema, row, *call);
        for &i in &self.schema.order {
            pass.run(i);
        }

        for (formula, outcome) in self.schema.formulas.iter().zip(pass.memo) {
            let result = match outcome {
                Some(outcome) => EvaluationResult::from(&outcome),
                None => EvaluationResult::from_error(&FormulaError::CircularReference),
            };
            match &result.error {
                Some(message) => {
                    merged
                        .formula_errors
                        .insert(formula.id.clone(), message.clone());
                }
                None => {
                    merged.formula_errors.remove(&formula.id);
                }
            }
            merged
                .database_properties
                .insert(formula.id.clone(), result.value.clone());
            results.insert(formula.id.clone(), result);
        }

        trace!(
            row = %row.id,
            formulas = results.len(),
            errors = merged.formula_errors.len(),
            "recomputed row"
        );
        RecomputeResult {
            row: merged,
            results,
        }
    }
}

/// Row-scoped evaluation state; the memo is discarded with the pass
struct RowPass<'a> {
    schema: &'a CompiledSchema,
    row: &'a Row,
    call: CallContext,
    memo: Vec<Option<FormulaResult<Value>>>,
}

impl<'a> RowPass<'a> {
    fn new(schema: &'a CompiledSchema, row: &'a Row, call: CallContext) -> Self {
        // Structural errors are known before any row value is read
        let memo = schema
            .formulas
            .iter()
            .map(|f| f.structural.clone().map(Err))
            .collect();
        Self {
            schema,
            row,
            call,
            memo,
        }
    }

    fn run(&mut self, index: usize) {
        if self.memo[index].is_some() {
            return;
        }
        let outcome = self.evaluate(index);
        self.memo[index] = Some(outcome);
    }

    fn evaluate(&self, index: usize) -> FormulaResult<Value> {
        let formula = &self.schema.formulas[index];

        // Poison: an errored precedent errors this formula without evaluating it
        for precedent in self.schema.graph.get_precedents(index) {
            if let Some(Err(e)) = &self.memo[precedent] {
                return Err(FormulaError::Propagated {
                    dependency: self.schema.formulas[precedent].name.clone(),
                    message: e.to_string(),
                });
            }
        }

        let Some(expression) = &formula.expression else {
            return Ok(Value::Null);
        };
        let resolver = |name: &str| self.resolve(formula, name);
        let ctx = EvaluationContext::new(&resolver, self.call);
        let value = evaluate(expression, &ctx)?;
        match formula.return_type {
            Some(return_type) => conform_to_return_type(value, return_type),
            None => Ok(value),
        }
    }

    fn resolve(&self, formula: &CompiledFormula, name: &str) -> FormulaResult<Value> {
        match formula.bindings.get(name) {
            Some(Binding::Stored(id)) => Ok(self.row.value(id)),
            Some(Binding::Title) => Ok(Value::text(self.row.title.as_str())),
            Some(Binding::Formula(j)) => match &self.memo[*j] {
                Some(outcome) => outcome.clone(),
                None => Err(FormulaError::CircularReference),
            },
            None => Err(FormulaError::UnresolvedProperty(name.to_string())),
        }
    }
}

/// Evaluate in-progress formula text as if it were the formula of
/// `property_id`, for live preview while editing. A property id that is not
/// in the schema is previewed as a new formula property.
pub fn preview_formula(
    properties: &[PropertyDefinition],
    property_id: &str,
    text: &str,
    row: &Row,
    options: &RuntimeOptions,
) -> EvaluationResult {
    let mut schema = properties.to_vec();
    let declared = match schema.iter_mut().find(|p| p.id == property_id) {
        Some(prop) => {
            prop.property_type = PropertyType::Formula;
            prop.formula = Some(text.to_string());
            prop.formula_return_type
        }
        None => {
            let mut prop = PropertyDefinition::new(property_id, property_id, PropertyType::Formula);
            prop.formula = Some(text.to_string());
            schema.push(prop);
            None
        }
    };

    let mut runtime = Runtime::build(&schema, options.clone());
    if declared.is_none() {
        // Show the value as evaluated rather than coerced to the default type
        if let Some(formula) = runtime.schema.formulas.iter_mut().find(|f| f.id == property_id) {
            formula.return_type = None;
        }
    }
    runtime
        .evaluate_property(property_id, row)
        .unwrap_or_else(|| EvaluationResult::ok(Value::Null))
}
