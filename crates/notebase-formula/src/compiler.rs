//! Schema compilation
//!
//! Parses every formula property once, resolves `prop()` names to property
//! ids, checks calls against the function registry and orders the formulas
//! by their dependencies. Everything found here is a structural error that
//! applies to all rows.

use crate::ast::Expression;
use crate::dependency::DependencyGraph;
use crate::error::FormulaError;
use crate::functions;
use crate::parser::parse_formula;
use crate::runtime::RuntimeOptions;
use ahash::AHashMap;
use notebase_core::{PropertyDefinition, PropertyType, ReturnType};
use tracing::warn;

/// What a `prop()` name reads once resolved
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Binding {
    /// A stored value in `databaseProperties`
    Stored(String),
    /// The row title
    Title,
    /// Another formula, by arena index
    Formula(usize),
}

/// One formula property after compilation
#[derive(Debug, Clone)]
pub(crate) struct CompiledFormula {
    pub id: String,
    pub name: String,
    /// `None` leaves the evaluated value as is
    pub return_type: Option<ReturnType>,
    /// `None` for an empty formula
    pub expression: Option<Expression>,
    /// Referenced name → binding
    pub bindings: AHashMap<String, Binding>,
    /// Property ids read directly
    pub reads: Vec<String>,
    pub structural: Option<FormulaError>,
}

/// A compiled schema: formulas in schema order plus their dependency graph
#[derive(Debug, Clone, Default)]
pub(crate) struct CompiledSchema {
    pub formulas: Vec<CompiledFormula>,
    pub graph: DependencyGraph,
    /// Arena indices of acyclic formulas, precedents first
    pub order: Vec<usize>,
    pub cyclic: Vec<usize>,
}

/// Name lookup over a schema. Exact names win over case-insensitive
/// matches; among duplicates the first property in schema order wins.
struct NameIndex<'a> {
    properties: &'a [PropertyDefinition],
    exact: AHashMap<&'a str, usize>,
    folded: AHashMap<String, usize>,
}

impl<'a> NameIndex<'a> {
    fn new(properties: &'a [PropertyDefinition]) -> Self {
        let mut exact: AHashMap<&str, usize> = AHashMap::with_capacity(properties.len());
        let mut folded: AHashMap<String, usize> = AHashMap::with_capacity(properties.len());
        for (i, prop) in properties.iter().enumerate() {
            if let Some(&first) = exact.get(prop.name.as_str()) {
                warn!(
                    name = %prop.name,
                    kept = %properties[first].id,
                    ignored = %prop.id,
                    "duplicate property name, references resolve to the first"
                );
                continue;
            }
            exact.insert(prop.name.as_str(), i);
            folded.entry(prop.name.to_lowercase()).or_insert(i);
        }
        Self {
            properties,
            exact,
            folded,
        }
    }

    fn find(&self, name: &str) -> Option<&'a PropertyDefinition> {
        self.exact
            .get(name)
            .or_else(|| self.folded.get(&name.to_lowercase()))
            .map(|&i| &self.properties[i])
    }
}

/// First unknown function or arity violation in the expression
fn check_calls(expr: &Expression) -> Option<FormulaError> {
    let registry = functions::registry();
    let mut first = None;
    expr.for_each_call(&mut |name, args| {
        if first.is_some() {
            return;
        }
        first = match registry.get(name) {
            None => Some(FormulaError::UnknownFunction(name.to_string())),
            Some(def) => def.check_arity(args.len()).err(),
        };
    });
    first
}

pub(crate) fn compile_schema(
    properties: &[PropertyDefinition],
    options: &RuntimeOptions,
) -> CompiledSchema {
    let names = NameIndex::new(properties);

    let formula_index: AHashMap<&str, usize> = properties
        .iter()
        .filter(|p| p.is_formula())
        .enumerate()
        .map(|(i, p)| (p.id.as_str(), i))
        .collect();

    let mut formulas: Vec<CompiledFormula> = properties
        .iter()
        .filter(|p| p.is_formula())
        .map(|prop| {
            let mut compiled = CompiledFormula {
                id: prop.id.clone(),
                name: prop.name.clone(),
                return_type: Some(prop.return_type_or(options.default_return_type)),
                expression: None,
                bindings: AHashMap::new(),
                reads: Vec::new(),
                structural: None,
            };

            let text = prop.formula_text().unwrap_or("");
            if text.trim().is_empty() {
                return compiled;
            }
            let expr = match parse_formula(text) {
                Ok(expr) => expr,
                Err(e) => {
                    warn!(property = %prop.id, error = %e, "formula does not parse");
                    compiled.structural = Some(e);
                    return compiled;
                }
            };

            compiled.structural = check_calls(&expr);
            for name in expr.property_references() {
                if compiled.bindings.contains_key(name) {
                    continue;
                }
                match bind(name, &names, &formula_index, options) {
                    Ok((binding, read)) => {
                        compiled.bindings.insert(name.to_string(), binding);
                        if let Some(read) = read {
                            if !compiled.reads.contains(&read) {
                                compiled.reads.push(read);
                            }
                        }
                    }
                    Err(e) => {
                        compiled.structural.get_or_insert(e);
                    }
                }
            }
            compiled.expression = Some(expr);
            compiled
        })
        .collect();

    let mut graph = DependencyGraph::with_nodes(formulas.len());
    for (i, formula) in formulas.iter().enumerate() {
        for binding in formula.bindings.values() {
            if let Binding::Formula(j) = binding {
                graph.add_dependency(*j, i);
            }
        }
    }

    let order = graph.evaluation_order();
    for &i in &order.cyclic {
        formulas[i].structural = Some(FormulaError::CircularReference);
    }

    CompiledSchema {
        formulas,
        graph,
        order: order.order,
        cyclic: order.cyclic,
    }
}

/// Resolve one referenced name to a binding and the property id it reads
fn bind(
    name: &str,
    names: &NameIndex<'_>,
    formula_index: &AHashMap<&str, usize>,
    options: &RuntimeOptions,
) -> Result<(Binding, Option<String>), FormulaError> {
    let Some(prop) = names.find(name) else {
        let is_alias = options
            .title_aliases
            .iter()
            .any(|alias| alias.eq_ignore_ascii_case(name));
        return if is_alias {
            Ok((Binding::Title, None))
        } else {
            Err(FormulaError::UnresolvedProperty(name.to_string()))
        };
    };

    let binding = match prop.property_type {
        PropertyType::Formula => formula_index
            .get(prop.id.as_str())
            .map(|&j| Binding::Formula(j))
            .ok_or_else(|| FormulaError::UnresolvedProperty(name.to_string()))?,
        PropertyType::Rollup => {
            return Err(FormulaError::UnsupportedReference(name.to_string()))
        }
        PropertyType::Title => Binding::Title,
        _ => Binding::Stored(prop.id.clone()),
    };
    Ok((binding, Some(prop.id.clone())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn schema() -> Vec<PropertyDefinition> {
        vec![
            PropertyDefinition::new("title", "Name", PropertyType::Title),
            PropertyDefinition::new("price", "Price", PropertyType::Number),
            PropertyDefinition::formula(
                "total",
                "Total",
                "prop(\"price\") * 2",
                ReturnType::Number,
            ),
            PropertyDefinition::formula(
                "label",
                "Label",
                "prop(\"Total\") + \"!\"",
                ReturnType::Text,
            ),
        ]
    }

    #[test]
    fn test_bindings_resolve_case_insensitively() {
        let compiled = compile_schema(&schema(), &RuntimeOptions::default());
        assert_eq!(compiled.formulas.len(), 2);
        assert_eq!(
            compiled.formulas[0].bindings.get("price"),
            Some(&Binding::Stored("price".into()))
        );
        assert_eq!(
            compiled.formulas[1].bindings.get("Total"),
            Some(&Binding::Formula(0))
        );
        assert_eq!(compiled.formulas[1].reads, vec!["total".to_string()]);
        assert_eq!(compiled.order, vec![0, 1]);
    }

    #[test]
    fn test_title_property_and_alias() {
        let mut props = schema();
        props.push(PropertyDefinition::formula("t", "T", "prop(\"Name\")", ReturnType::Text));
        props.push(PropertyDefinition::formula("a", "A", "prop(\"title\")", ReturnType::Text));
        let compiled = compile_schema(&props, &RuntimeOptions::default());
        assert_eq!(compiled.formulas[2].bindings.get("Name"), Some(&Binding::Title));
        assert_eq!(compiled.formulas[3].bindings.get("title"), Some(&Binding::Title));
        assert!(compiled.formulas[3].structural.is_none());
    }

    #[test]
    fn test_duplicate_names_resolve_to_first() {
        let props = vec![
            PropertyDefinition::new("a", "Dup", PropertyType::Number),
            PropertyDefinition::new("b", "Dup", PropertyType::Text),
            PropertyDefinition::formula("f", "F", "prop(\"Dup\")", ReturnType::Number),
        ];
        let compiled = compile_schema(&props, &RuntimeOptions::default());
        assert_eq!(
            compiled.formulas[0].bindings.get("Dup"),
            Some(&Binding::Stored("a".into()))
        );
    }

    #[test]
    fn test_structural_errors() {
        let props = vec![
            PropertyDefinition::new("r", "Roll", PropertyType::Rollup),
            PropertyDefinition::formula("syntax", "Syntax", "1 +", ReturnType::Number),
            PropertyDefinition::formula("unknown", "Unknown", "frobnicate(1)", ReturnType::Number),
            PropertyDefinition::formula("arity", "Arity", "abs()", ReturnType::Number),
            PropertyDefinition::formula("rollup", "Rollup", "prop(\"Roll\")", ReturnType::Number),
            PropertyDefinition::formula("missing", "Missing", "prop(\"Nope\")", ReturnType::Number),
            PropertyDefinition::formula("empty", "Empty", "  ", ReturnType::Number),
        ];
        let compiled = compile_schema(&props, &RuntimeOptions::default());
        let errors: Vec<Option<String>> = compiled
            .formulas
            .iter()
            .map(|f| f.structural.as_ref().map(|e| e.to_string()))
            .collect();
        assert!(matches!(
            compiled.formulas[0].structural,
            Some(FormulaError::Syntax { .. })
        ));
        assert_eq!(errors[1].as_deref(), Some("Unknown function: frobnicate"));
        assert!(matches!(
            compiled.formulas[2].structural,
            Some(FormulaError::Arity { .. })
        ));
        assert_eq!(errors[3].as_deref(), Some("Unsupported property reference: Roll"));
        assert_eq!(errors[4].as_deref(), Some("Unresolved property reference: Nope"));
        assert_eq!(errors[5], None);
        assert!(compiled.formulas[5].expression.is_none());
    }

    #[test]
    fn test_cycle_members_are_marked() {
        let props = vec![
            PropertyDefinition::formula("a", "A", "prop(\"B\")", ReturnType::Number),
            PropertyDefinition::formula("b", "B", "prop(\"A\")", ReturnType::Number),
            PropertyDefinition::formula("c", "C", "prop(\"A\") + 1", ReturnType::Number),
        ];
        let compiled = compile_schema(&props, &RuntimeOptions::default());
        assert_eq!(compiled.cyclic, vec![0, 1]);
        assert_eq!(compiled.order, vec![2]);
        assert_eq!(
            compiled.formulas[0].structural,
            Some(FormulaError::CircularReference)
        );
        assert!(compiled.formulas[2].structural.is_none());
    }
}
