//! Formula evaluator
//!
//! Evaluates formula ASTs to produce values. Property lookups go through a
//! [`PropertyResolver`]; the evaluator itself knows nothing about rows.

use crate::ast::{BinaryOperator, Expression, UnaryOperator};
use crate::error::{FormulaError, FormulaResult};
use crate::functions::{self, date::to_date, CallContext};
use notebase_core::{ReturnType, Value, ValueTag};
use std::cmp::Ordering;

/// Numbers closer than this compare equal
pub const EPSILON: f64 = 1e-12;

/// Supplies values for `prop("Name")`
pub trait PropertyResolver {
    fn resolve(&self, name: &str) -> FormulaResult<Value>;
}

impl<F> PropertyResolver for F
where
    F: Fn(&str) -> FormulaResult<Value>,
{
    fn resolve(&self, name: &str) -> FormulaResult<Value> {
        self(name)
    }
}

/// Resolver for formulas evaluated outside any schema
struct NoProperties;

impl PropertyResolver for NoProperties {
    fn resolve(&self, name: &str) -> FormulaResult<Value> {
        Err(FormulaError::UnresolvedProperty(name.to_string()))
    }
}

/// Context for formula evaluation
pub struct EvaluationContext<'a> {
    resolver: &'a dyn PropertyResolver,
    pub call: CallContext,
}

impl<'a> EvaluationContext<'a> {
    /// Create a context that resolves properties through `resolver`
    pub fn new(resolver: &'a dyn PropertyResolver, call: CallContext) -> Self {
        Self { resolver, call }
    }
}

impl EvaluationContext<'static> {
    /// Context without properties; every `prop()` is unresolved
    pub fn simple() -> Self {
        EvaluationContext {
            resolver: &NoProperties,
            call: CallContext::default(),
        }
    }
}

/// Evaluate a formula expression
pub fn evaluate(expr: &Expression, ctx: &EvaluationContext<'_>) -> FormulaResult<Value> {
    match expr {
        Expression::Literal(value) => Ok(value.clone()),

        Expression::PropertyRef(name) => ctx.resolver.resolve(name),

        Expression::BinaryOp {
            op: op @ (BinaryOperator::And | BinaryOperator::Or),
            left,
            right,
        } => evaluate_logical(*op, left, right, ctx),

        Expression::BinaryOp { op, left, right } => {
            let left_val = evaluate(left, ctx)?;
            let right_val = evaluate(right, ctx)?;
            evaluate_binary_op(*op, &left_val, &right_val)
        }

        Expression::UnaryOp { op, operand } => {
            let val = evaluate(operand, ctx)?;
            evaluate_unary_op(*op, &val)
        }

        Expression::Conditional {
            condition,
            then_branch,
            else_branch,
        } => match evaluate(condition, ctx)? {
            Value::Boolean(true) => evaluate(then_branch, ctx),
            Value::Boolean(false) | Value::Null => evaluate(else_branch, ctx),
            other => Err(FormulaError::type_mismatch(
                "if() condition",
                "boolean",
                other.tag(),
            )),
        },

        Expression::Call { name, args } => evaluate_function(name, args, ctx),
    }
}

fn logical_operand(value: Value, op: BinaryOperator) -> FormulaResult<Option<bool>> {
    match value {
        Value::Boolean(b) => Ok(Some(b)),
        Value::Null => Ok(None),
        other => Err(FormulaError::type_mismatch(
            format!("operator '{}'", op.symbol()),
            "boolean",
            other.tag(),
        )),
    }
}

/// Short-circuit `and`/`or` with null as unknown
fn evaluate_logical(
    op: BinaryOperator,
    left: &Expression,
    right: &Expression,
    ctx: &EvaluationContext<'_>,
) -> FormulaResult<Value> {
    // The value that decides the result on its own
    let decisive = op == BinaryOperator::Or;

    let l = logical_operand(evaluate(left, ctx)?, op)?;
    if l == Some(decisive) {
        return Ok(Value::Boolean(decisive));
    }
    let r = logical_operand(evaluate(right, ctx)?, op)?;
    Ok(match (l, r) {
        (_, Some(b)) if b == decisive => Value::Boolean(decisive),
        (Some(_), Some(_)) => Value::Boolean(!decisive),
        _ => Value::Null,
    })
}

fn arithmetic_mismatch(op: BinaryOperator, value: &Value) -> FormulaError {
    FormulaError::type_mismatch(format!("operator '{}'", op.symbol()), "number", value.tag())
}

/// Evaluate a binary operation on evaluated operands
pub fn evaluate_binary_op(op: BinaryOperator, left: &Value, right: &Value) -> FormulaResult<Value> {
    match op {
        // Text on either side turns `+` into concatenation
        BinaryOperator::Add
            if matches!(left, Value::Text(_)) || matches!(right, Value::Text(_)) =>
        {
            let mut joined = left.to_text();
            joined.push_str(&right.to_text());
            Ok(Value::Text(joined))
        }

        BinaryOperator::Add
        | BinaryOperator::Subtract
        | BinaryOperator::Multiply
        | BinaryOperator::Divide
        | BinaryOperator::Modulo
        | BinaryOperator::Power => {
            let (l, r) = match (left, right) {
                (Value::Number(l), Value::Number(r)) => (*l, *r),
                (Value::Null | Value::Number(_), Value::Null | Value::Number(_)) => {
                    return Ok(Value::Null)
                }
                (Value::Number(_) | Value::Null, other) | (other, _) => {
                    return Err(arithmetic_mismatch(op, other))
                }
            };
            let result = match op {
                BinaryOperator::Add => l + r,
                BinaryOperator::Subtract => l - r,
                BinaryOperator::Multiply => l * r,
                BinaryOperator::Divide if r == 0.0 => return Err(FormulaError::DivisionByZero),
                BinaryOperator::Divide => l / r,
                BinaryOperator::Modulo if r == 0.0 => return Err(FormulaError::DivisionByZero),
                BinaryOperator::Modulo => l % r,
                _ => l.powf(r),
            };
            if result.is_finite() {
                Ok(Value::Number(result))
            } else {
                Err(FormulaError::numeric(format!(
                    "Result of '{}' is not a finite number",
                    op.symbol()
                )))
            }
        }

        BinaryOperator::Equal => Ok(Value::Boolean(values_equal(left, right))),
        BinaryOperator::NotEqual => Ok(Value::Boolean(!values_equal(left, right))),

        BinaryOperator::LessThan
        | BinaryOperator::LessEqual
        | BinaryOperator::GreaterThan
        | BinaryOperator::GreaterEqual => {
            let context = format!("operator '{}'", op.symbol());
            let Some(ordering) = compare_values(left, right, &context)? else {
                return Ok(Value::Null);
            };
            let result = match op {
                BinaryOperator::LessThan => ordering.is_lt(),
                BinaryOperator::LessEqual => ordering.is_le(),
                BinaryOperator::GreaterThan => ordering.is_gt(),
                _ => ordering.is_ge(),
            };
            Ok(Value::Boolean(result))
        }

        BinaryOperator::And | BinaryOperator::Or => {
            let l = logical_operand(left.clone(), op)?;
            let r = logical_operand(right.clone(), op)?;
            let decisive = op == BinaryOperator::Or;
            Ok(match (l, r) {
                (Some(a), _) if a == decisive => Value::Boolean(decisive),
                (_, Some(b)) if b == decisive => Value::Boolean(decisive),
                (Some(_), Some(_)) => Value::Boolean(!decisive),
                _ => Value::Null,
            })
        }
    }
}

/// Evaluate a unary operation on an evaluated operand
pub fn evaluate_unary_op(op: UnaryOperator, value: &Value) -> FormulaResult<Value> {
    match (op, value) {
        (_, Value::Null) => Ok(Value::Null),
        (UnaryOperator::Negate, Value::Number(n)) => Ok(Value::Number(-n)),
        (UnaryOperator::Plus, Value::Number(n)) => Ok(Value::Number(*n)),
        (UnaryOperator::Not, Value::Boolean(b)) => Ok(Value::Boolean(!b)),
        (UnaryOperator::Not, other) => Err(FormulaError::type_mismatch(
            "operator '!'",
            "boolean",
            other.tag(),
        )),
        (op, other) => Err(FormulaError::type_mismatch(
            format!("operator '{}'", op.symbol()),
            "number",
            other.tag(),
        )),
    }
}

/// Equality across all tags. Values of different tags are unequal; text
/// compares case-insensitively and numbers within [`EPSILON`].
pub fn values_equal(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::Null, Value::Null) => true,
        (Value::Number(l), Value::Number(r)) => (l - r).abs() < EPSILON || l == r,
        (Value::Text(l), Value::Text(r)) => l == r || l.to_lowercase() == r.to_lowercase(),
        (Value::Boolean(l), Value::Boolean(r)) => l == r,
        (Value::Date(l), Value::Date(r)) => l == r,
        (Value::List(l), Value::List(r)) => {
            l.len() == r.len() && l.iter().zip(r).all(|(a, b)| values_equal(a, b))
        }
        _ => false,
    }
}

/// Ordering of two values of the same tag. `None` when either side is null;
/// an error when the tags differ or a list is involved.
pub fn compare_values(
    left: &Value,
    right: &Value,
    context: &str,
) -> FormulaResult<Option<Ordering>> {
    let ordering = match (left, right) {
        (Value::Null, _) | (_, Value::Null) => return Ok(None),
        (Value::Number(l), Value::Number(r)) => {
            if (l - r).abs() < EPSILON {
                Ordering::Equal
            } else {
                l.partial_cmp(r).unwrap_or(Ordering::Equal)
            }
        }
        (Value::Text(l), Value::Text(r)) => l.to_lowercase().cmp(&r.to_lowercase()),
        (Value::Boolean(l), Value::Boolean(r)) => l.cmp(r),
        (Value::Date(l), Value::Date(r)) => l.cmp(r),
        (Value::List(_), _) => {
            return Err(FormulaError::type_mismatch(
                context,
                "text, number, boolean or date",
                ValueTag::List,
            ))
        }
        (l, r) => return Err(FormulaError::type_mismatch(context, l.tag().as_str(), r.tag())),
    };
    Ok(Some(ordering))
}

/// Evaluate a function call
fn evaluate_function(
    name: &str,
    args: &[Expression],
    ctx: &EvaluationContext<'_>,
) -> FormulaResult<Value> {
    let func = functions::registry()
        .get(name)
        .ok_or_else(|| FormulaError::UnknownFunction(name.to_string()))?;

    // Check argument count before evaluating anything
    func.check_arity(args.len())?;

    // Evaluate arguments
    let mut evaluated_args = Vec::with_capacity(args.len());
    for arg in args {
        evaluated_args.push(evaluate(arg, ctx)?);
    }

    func.call(&evaluated_args, &ctx.call)
}

/// Check a formula result against its declared return type.
///
/// `text` renders any value; the other types require their own tag, except
/// that `date` also accepts text holding an ISO-8601 date. `Null` always
/// conforms.
pub fn conform_to_return_type(value: Value, return_type: ReturnType) -> FormulaResult<Value> {
    match (return_type, value) {
        (_, Value::Null) => Ok(Value::Null),
        (ReturnType::Text, Value::Text(s)) => Ok(Value::Text(s)),
        (ReturnType::Text, other) => Ok(Value::Text(other.to_text())),
        (ReturnType::Number, v @ Value::Number(_)) => Ok(v),
        (ReturnType::Boolean, v @ Value::Boolean(_)) => Ok(v),
        (ReturnType::Date, v @ Value::Date(_)) => Ok(v),
        (ReturnType::Date, Value::Text(s)) => to_date(&Value::Text(s))
            .map(Value::Date)
            .ok_or(FormulaError::ReturnTypeMismatch {
                expected: ReturnType::Date,
                actual: ValueTag::Text,
            }),
        (expected, other) => Err(FormulaError::ReturnTypeMismatch {
            expected,
            actual: other.tag(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_formula;

    fn eval(formula: &str) -> FormulaResult<Value> {
        let ast = parse_formula(formula)?;
        let ctx = EvaluationContext::simple();
        evaluate(&ast, &ctx)
    }

    fn eval_with(formula: &str, props: &[(&str, Value)]) -> FormulaResult<Value> {
        let ast = parse_formula(formula)?;
        let resolver = |name: &str| {
            props
                .iter()
                .find(|(n, _)| *n == name)
                .map(|(_, v)| v.clone())
                .ok_or_else(|| FormulaError::UnresolvedProperty(name.to_string()))
        };
        let ctx = EvaluationContext::new(&resolver, CallContext::default());
        evaluate(&ast, &ctx)
    }

    #[test]
    fn test_evaluate_literals() {
        assert_eq!(eval("42").unwrap(), Value::Number(42.0));
        assert_eq!(eval("\"hi\"").unwrap(), Value::text("hi"));
        assert_eq!(eval("true").unwrap(), Value::Boolean(true));
        assert_eq!(eval("null").unwrap(), Value::Null);
    }

    #[test]
    fn test_evaluate_arithmetic() {
        assert_eq!(eval("1 + 2 * 3").unwrap(), Value::Number(7.0));
        assert_eq!(eval("(1 + 2) * 3").unwrap(), Value::Number(9.0));
        assert_eq!(eval("2 ^ 3 ^ 2").unwrap(), Value::Number(512.0));
        assert_eq!(eval("7 % 3").unwrap(), Value::Number(1.0));
        assert_eq!(eval("-2 ** 2").unwrap(), Value::Number(4.0));
        assert_eq!(eval("10 / 4").unwrap(), Value::Number(2.5));
    }

    #[test]
    fn test_property_arithmetic() {
        let props = [("Price", Value::Number(12.5)), ("Quantity", Value::Number(3.0))];
        assert_eq!(
            eval_with("prop(\"Price\") * prop(\"Quantity\")", &props).unwrap(),
            Value::Number(37.5)
        );
    }

    #[test]
    fn test_plus_concatenates_text() {
        assert_eq!(eval("\"a\" + 1").unwrap(), Value::text("a1"));
        assert_eq!(eval("1 + \"a\"").unwrap(), Value::text("1a"));
        assert_eq!(eval("\"a\" + null").unwrap(), Value::text("a"));
        assert_eq!(eval("\"x\" + true").unwrap(), Value::text("xtrue"));
    }

    #[test]
    fn test_null_arithmetic_is_null() {
        assert_eq!(eval("null + 1").unwrap(), Value::Null);
        assert_eq!(eval("2 * null").unwrap(), Value::Null);
        assert_eq!(eval("-null").unwrap(), Value::Null);
    }

    #[test]
    fn test_arithmetic_type_errors() {
        let err = eval("true * 2").unwrap_err();
        assert_eq!(err.to_string(), "operator '*': expected number, got boolean");
        let err = eval("2 - \"x\"").unwrap_err();
        assert_eq!(err.to_string(), "operator '-': expected number, got text");
        assert_eq!(eval("1 / 0").unwrap_err(), FormulaError::DivisionByZero);
        assert_eq!(eval("1 % 0").unwrap_err(), FormulaError::DivisionByZero);
        assert!(matches!(eval("10 ^ 400"), Err(FormulaError::Numeric(_))));
    }

    #[test]
    fn test_comparisons() {
        assert_eq!(eval("\"Done\" = \"done\"").unwrap(), Value::Boolean(true));
        assert_eq!(eval("1 = \"1\"").unwrap(), Value::Boolean(false));
        assert_eq!(eval("0.1 + 0.2 == 0.3").unwrap(), Value::Boolean(true));
        assert_eq!(eval("null == null").unwrap(), Value::Boolean(true));
        assert_eq!(eval("2 >= 2").unwrap(), Value::Boolean(true));
        assert_eq!(eval("\"b\" > \"A\"").unwrap(), Value::Boolean(true));
        assert_eq!(eval("null < 1").unwrap(), Value::Null);
        assert!(eval("1 < \"2\"").is_err());
    }

    #[test]
    fn test_logical_operators() {
        assert_eq!(eval("true and false").unwrap(), Value::Boolean(false));
        assert_eq!(eval("true && true").unwrap(), Value::Boolean(true));
        assert_eq!(eval("false or true").unwrap(), Value::Boolean(true));
        assert_eq!(eval("!true").unwrap(), Value::Boolean(false));
        assert_eq!(eval("not null").unwrap(), Value::Null);
        assert_eq!(eval("null or true").unwrap(), Value::Boolean(true));
        assert_eq!(eval("null and true").unwrap(), Value::Null);
        assert!(eval("1 and true").is_err());
    }

    #[test]
    fn test_logical_short_circuit() {
        // right side would fail with an unresolved property
        assert_eq!(eval("false and prop(\"X\")").unwrap(), Value::Boolean(false));
        assert_eq!(eval("true or prop(\"X\")").unwrap(), Value::Boolean(true));
    }

    #[test]
    fn test_conditional_is_lazy() {
        let props = [("Status", Value::text("Done"))];
        let formula = "if(prop(\"Status\") = \"Done\", \"Complete\", prop(\"Missing\"))";
        assert_eq!(eval_with(formula, &props).unwrap(), Value::text("Complete"));

        assert_eq!(eval("if(null, 1, 2)").unwrap(), Value::Number(2.0));
        assert!(matches!(
            eval("if(1, 1, 2)"),
            Err(FormulaError::TypeMismatch { .. })
        ));
    }

    #[test]
    fn test_function_errors() {
        assert_eq!(
            eval("nosuch(1)").unwrap_err(),
            FormulaError::UnknownFunction("nosuch".into())
        );
        assert!(matches!(
            eval("abs(1, 2)"),
            Err(FormulaError::Arity { .. })
        ));
        assert_eq!(eval("ROUND(2.345, 2)").unwrap(), Value::Number(2.35));
    }

    #[test]
    fn test_unresolved_property() {
        assert_eq!(
            eval("prop(\"Nope\")").unwrap_err().to_string(),
            "Unresolved property reference: Nope"
        );
    }

    #[test]
    fn test_conform_to_return_type() {
        assert_eq!(
            conform_to_return_type(Value::Number(3.0), ReturnType::Text).unwrap(),
            Value::text("3")
        );
        assert_eq!(
            conform_to_return_type(Value::Null, ReturnType::Number).unwrap(),
            Value::Null
        );
        assert!(matches!(
            conform_to_return_type(Value::text("x"), ReturnType::Number),
            Err(FormulaError::ReturnTypeMismatch { .. })
        ));
        assert!(matches!(
            conform_to_return_type(Value::text("2024-01-01"), ReturnType::Date),
            Ok(Value::Date(_))
        ));
    }
}
