//! Logic and comparison functions

use super::{bool_arg, CallContext};
use crate::error::FormulaResult;
use crate::evaluator::{compare_values, values_equal};
use notebase_core::Value;
use std::cmp::Ordering;

/// AND(bool, ...): false wins over null, null over true
pub fn fn_and(args: &[Value], _ctx: &CallContext) -> FormulaResult<Value> {
    three_valued(args, "and", false)
}

/// OR(bool, ...): true wins over null, null over false
pub fn fn_or(args: &[Value], _ctx: &CallContext) -> FormulaResult<Value> {
    three_valued(args, "or", true)
}

/// Same truth table as the `and`/`or` operators, with null as unknown
fn three_valued(args: &[Value], function: &str, decisive: bool) -> FormulaResult<Value> {
    let mut unknown = false;
    for (i, arg) in args.iter().enumerate() {
        if arg.is_null() {
            unknown = true;
        } else if bool_arg(args, i, function)? == decisive {
            return Ok(Value::Boolean(decisive));
        }
    }
    Ok(if unknown {
        Value::Null
    } else {
        Value::Boolean(!decisive)
    })
}

/// NOT(bool)
pub fn fn_not(args: &[Value], _ctx: &CallContext) -> FormulaResult<Value> {
    Ok(Value::Boolean(!bool_arg(args, 0, "not")?))
}

pub fn fn_equal(args: &[Value], _ctx: &CallContext) -> FormulaResult<Value> {
    Ok(Value::Boolean(values_equal(&args[0], &args[1])))
}

pub fn fn_unequal(args: &[Value], _ctx: &CallContext) -> FormulaResult<Value> {
    Ok(Value::Boolean(!values_equal(&args[0], &args[1])))
}

fn ordered(
    args: &[Value],
    function: &str,
    test: fn(Ordering) -> bool,
) -> FormulaResult<Value> {
    Ok(compare_values(&args[0], &args[1], function)?
        .map_or(Value::Null, |ord| Value::Boolean(test(ord))))
}

pub fn fn_larger(args: &[Value], _ctx: &CallContext) -> FormulaResult<Value> {
    ordered(args, "larger()", Ordering::is_gt)
}

pub fn fn_larger_eq(args: &[Value], _ctx: &CallContext) -> FormulaResult<Value> {
    ordered(args, "largerEq()", Ordering::is_ge)
}

pub fn fn_smaller(args: &[Value], _ctx: &CallContext) -> FormulaResult<Value> {
    ordered(args, "smaller()", Ordering::is_lt)
}

pub fn fn_smaller_eq(args: &[Value], _ctx: &CallContext) -> FormulaResult<Value> {
    ordered(args, "smallerEq()", Ordering::is_le)
}

/// EMPTY(value): null, blank text or an empty list
pub fn fn_empty(args: &[Value], _ctx: &CallContext) -> FormulaResult<Value> {
    let empty = match &args[0] {
        Value::Text(s) => s.trim().is_empty(),
        other => other.is_empty(),
    };
    Ok(Value::Boolean(empty))
}

/// COALESCE(value, ...): first argument that is neither null nor ""
pub fn fn_coalesce(args: &[Value], _ctx: &CallContext) -> FormulaResult<Value> {
    Ok(args
        .iter()
        .find(|v| !matches!(v, Value::Null) && !matches!(v, Value::Text(s) if s.is_empty()))
        .cloned()
        .unwrap_or(Value::Null))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::functions::registry;

    fn call(name: &str, args: &[Value]) -> FormulaResult<Value> {
        registry()
            .get(name)
            .unwrap()
            .call(args, &CallContext::default())
    }

    #[test]
    fn test_and_or_not() {
        let t = Value::Boolean(true);
        let f = Value::Boolean(false);
        assert_eq!(call("and", &[t.clone(), t.clone()]).unwrap(), t);
        assert_eq!(call("and", &[t.clone(), f.clone()]).unwrap(), f);
        assert_eq!(call("or", &[f.clone(), t.clone()]).unwrap(), t);
        assert_eq!(call("not", &[f.clone()]).unwrap(), t);
        assert_eq!(call("not", &[Value::Null]).unwrap(), Value::Null);
        assert!(call("and", &[t, Value::Number(1.0)]).is_err());
    }

    #[test]
    fn test_and_or_match_operators() {
        use crate::{evaluate, parse_formula, EvaluationContext};

        let ctx = EvaluationContext::simple();
        let cases = [
            ("false", "null"),
            ("null", "false"),
            ("true", "null"),
            ("null", "true"),
            ("null", "null"),
            ("true", "false"),
        ];
        for (a, b) in cases {
            for op in ["and", "or"] {
                let operator = parse_formula(&format!("{} {} {}", a, op, b)).unwrap();
                let function = parse_formula(&format!("{}({}, {})", op, a, b)).unwrap();
                assert_eq!(
                    evaluate(&function, &ctx).unwrap(),
                    evaluate(&operator, &ctx).unwrap(),
                    "{}({}, {})",
                    op,
                    a,
                    b
                );
            }
        }
        assert_eq!(
            call("and", &[Value::Boolean(false), Value::Null]).unwrap(),
            Value::Boolean(false)
        );
        assert_eq!(
            call("or", &[Value::Null, Value::Boolean(true)]).unwrap(),
            Value::Boolean(true)
        );
    }

    #[test]
    fn test_comparisons() {
        assert_eq!(
            call("equal", &[Value::text("Done"), Value::text("done")]).unwrap(),
            Value::Boolean(true)
        );
        assert_eq!(
            call("unequal", &[Value::Number(1.0), Value::text("1")]).unwrap(),
            Value::Boolean(true)
        );
        assert_eq!(
            call("larger", &[Value::Number(3.0), Value::Number(2.0)]).unwrap(),
            Value::Boolean(true)
        );
        assert_eq!(
            call("smallerEq", &[Value::text("a"), Value::text("B")]).unwrap(),
            Value::Boolean(true)
        );
        assert_eq!(
            call("larger", &[Value::Null, Value::Number(2.0)]).unwrap(),
            Value::Null
        );
        assert!(call("larger", &[Value::Number(3.0), Value::text("2")]).is_err());
    }

    #[test]
    fn test_empty_and_coalesce() {
        assert_eq!(call("empty", &[Value::text("  ")]).unwrap(), Value::Boolean(true));
        assert_eq!(call("empty", &[Value::Number(0.0)]).unwrap(), Value::Boolean(false));
        assert_eq!(call("empty", &[Value::List(vec![])]).unwrap(), Value::Boolean(true));
        assert_eq!(
            call("coalesce", &[Value::Null, Value::text(""), Value::text("x")]).unwrap(),
            Value::text("x")
        );
        assert_eq!(call("coalesce", &[Value::Null]).unwrap(), Value::Null);
    }
}
