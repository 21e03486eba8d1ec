//! Math functions

use super::{number_arg, opt_number_arg, CallContext};
use crate::error::{FormulaError, FormulaResult};
use notebase_core::Value;
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::{Decimal, RoundingStrategy};

const EPSILON: f64 = 1e-12;

fn unary(args: &[Value], name: &str, f: fn(f64) -> f64) -> FormulaResult<Value> {
    Ok(Value::Number(f(number_arg(args, 0, name)?)))
}

pub fn fn_abs(args: &[Value], _ctx: &CallContext) -> FormulaResult<Value> {
    unary(args, "abs", f64::abs)
}

pub fn fn_floor(args: &[Value], _ctx: &CallContext) -> FormulaResult<Value> {
    unary(args, "floor", f64::floor)
}

pub fn fn_ceil(args: &[Value], _ctx: &CallContext) -> FormulaResult<Value> {
    unary(args, "ceil", f64::ceil)
}

pub fn fn_cbrt(args: &[Value], _ctx: &CallContext) -> FormulaResult<Value> {
    unary(args, "cbrt", f64::cbrt)
}

pub fn fn_exp(args: &[Value], _ctx: &CallContext) -> FormulaResult<Value> {
    unary(args, "exp", f64::exp)
}

pub fn fn_sin(args: &[Value], _ctx: &CallContext) -> FormulaResult<Value> {
    unary(args, "sin", f64::sin)
}

pub fn fn_cos(args: &[Value], _ctx: &CallContext) -> FormulaResult<Value> {
    unary(args, "cos", f64::cos)
}

pub fn fn_tan(args: &[Value], _ctx: &CallContext) -> FormulaResult<Value> {
    unary(args, "tan", f64::tan)
}

pub fn fn_asin(args: &[Value], _ctx: &CallContext) -> FormulaResult<Value> {
    unary(args, "asin", f64::asin)
}

pub fn fn_acos(args: &[Value], _ctx: &CallContext) -> FormulaResult<Value> {
    unary(args, "acos", f64::acos)
}

pub fn fn_atan(args: &[Value], _ctx: &CallContext) -> FormulaResult<Value> {
    unary(args, "atan", f64::atan)
}

/// SIGN(number): -1, 0 or 1
pub fn fn_sign(args: &[Value], _ctx: &CallContext) -> FormulaResult<Value> {
    let n = number_arg(args, 0, "sign")?;
    let sign = if n > 0.0 {
        1.0
    } else if n < 0.0 {
        -1.0
    } else {
        0.0
    };
    Ok(Value::Number(sign))
}

pub fn fn_ln(args: &[Value], _ctx: &CallContext) -> FormulaResult<Value> {
    let n = number_arg(args, 0, "ln")?;
    if n <= 0.0 {
        return Err(FormulaError::numeric("ln() requires a positive number"));
    }
    Ok(Value::Number(n.ln()))
}

pub fn fn_log10(args: &[Value], _ctx: &CallContext) -> FormulaResult<Value> {
    let n = number_arg(args, 0, "log10")?;
    if n <= 0.0 {
        return Err(FormulaError::numeric("log10() requires a positive number"));
    }
    Ok(Value::Number(n.log10()))
}

/// LOG(number, [base = 10])
pub fn fn_log(args: &[Value], _ctx: &CallContext) -> FormulaResult<Value> {
    let n = number_arg(args, 0, "log")?;
    let base = opt_number_arg(args, 1, "log")?.unwrap_or(10.0);
    if n <= 0.0 || base <= 0.0 || base == 1.0 {
        return Err(FormulaError::numeric(
            "log() requires a positive number and a positive base other than 1",
        ));
    }
    Ok(Value::Number(n.ln() / base.ln()))
}

pub fn fn_sqrt(args: &[Value], _ctx: &CallContext) -> FormulaResult<Value> {
    let n = number_arg(args, 0, "sqrt")?;
    if n < 0.0 {
        return Err(FormulaError::numeric("sqrt() requires a non-negative number"));
    }
    Ok(Value::Number(n.sqrt()))
}

pub fn fn_pow(args: &[Value], _ctx: &CallContext) -> FormulaResult<Value> {
    let base = number_arg(args, 0, "pow")?;
    let exponent = number_arg(args, 1, "pow")?;
    Ok(Value::Number(base.powf(exponent)))
}

/// MOD(number, divisor): result takes the sign of the divisor
pub fn fn_mod(args: &[Value], _ctx: &CallContext) -> FormulaResult<Value> {
    let n = number_arg(args, 0, "mod")?;
    let divisor = number_arg(args, 1, "mod")?;
    floored_mod(n, divisor).map(Value::Number)
}

pub(crate) fn floored_mod(n: f64, divisor: f64) -> FormulaResult<f64> {
    if divisor.abs() < EPSILON {
        return Err(FormulaError::DivisionByZero);
    }
    Ok(n - divisor * (n / divisor).floor())
}

fn clamp_precision(precision: f64) -> i32 {
    precision.trunc().clamp(-10.0, 10.0) as i32
}

fn round_with(value: f64, precision: Option<f64>, strategy: RoundingStrategy) -> f64 {
    let precision = clamp_precision(precision.unwrap_or(0.0));
    let Some(dec) = Decimal::from_f64(value) else {
        // Beyond Decimal's range every value is already integral
        return value;
    };

    let rounded = if precision >= 0 {
        Some(dec.round_dp_with_strategy(precision as u32, strategy))
    } else {
        let factor = Decimal::from(10i64.pow(precision.unsigned_abs()));
        dec.checked_div(factor)
            .map(|scaled| scaled.round_dp_with_strategy(0, strategy))
            .and_then(|scaled| scaled.checked_mul(factor))
    };

    rounded.and_then(|d| d.to_f64()).unwrap_or(value)
}

/// ROUND(number, [precision]): half away from zero
pub fn fn_round(args: &[Value], _ctx: &CallContext) -> FormulaResult<Value> {
    let n = number_arg(args, 0, "round")?;
    let precision = opt_number_arg(args, 1, "round")?;
    Ok(Value::Number(round_with(
        n,
        precision,
        RoundingStrategy::MidpointAwayFromZero,
    )))
}

/// ROUNDUP(number, [precision]): toward positive infinity
pub fn fn_roundup(args: &[Value], _ctx: &CallContext) -> FormulaResult<Value> {
    let n = number_arg(args, 0, "roundup")?;
    let precision = opt_number_arg(args, 1, "roundup")?;
    Ok(Value::Number(round_with(
        n,
        precision,
        RoundingStrategy::ToPositiveInfinity,
    )))
}

/// ROUNDDOWN(number, [precision]): toward negative infinity
pub fn fn_rounddown(args: &[Value], _ctx: &CallContext) -> FormulaResult<Value> {
    let n = number_arg(args, 0, "rounddown")?;
    let precision = opt_number_arg(args, 1, "rounddown")?;
    Ok(Value::Number(round_with(
        n,
        precision,
        RoundingStrategy::ToNegativeInfinity,
    )))
}

/// Numbers among the arguments, flattening lists. Nulls and non-numeric
/// list items are skipped.
fn numbers(args: &[Value]) -> Vec<f64> {
    let mut out = Vec::new();
    for arg in args {
        match arg {
            Value::Number(n) => out.push(*n),
            Value::List(items) => out.extend(items.iter().filter_map(Value::as_number)),
            _ => {}
        }
    }
    out
}

/// MAX(number, ...): null when no numbers are present
pub fn fn_max(args: &[Value], _ctx: &CallContext) -> FormulaResult<Value> {
    Ok(numbers(args)
        .into_iter()
        .reduce(f64::max)
        .map_or(Value::Null, Value::Number))
}

pub fn fn_min(args: &[Value], _ctx: &CallContext) -> FormulaResult<Value> {
    Ok(numbers(args)
        .into_iter()
        .reduce(f64::min)
        .map_or(Value::Null, Value::Number))
}

pub fn fn_sum(args: &[Value], _ctx: &CallContext) -> FormulaResult<Value> {
    let nums = numbers(args);
    if nums.is_empty() {
        return Ok(Value::Null);
    }
    Ok(Value::Number(nums.iter().sum()))
}

pub fn fn_average(args: &[Value], _ctx: &CallContext) -> FormulaResult<Value> {
    let nums = numbers(args);
    if nums.is_empty() {
        return Ok(Value::Null);
    }
    Ok(Value::Number(nums.iter().sum::<f64>() / nums.len() as f64))
}

pub fn fn_pi(_args: &[Value], _ctx: &CallContext) -> FormulaResult<Value> {
    Ok(Value::Number(std::f64::consts::PI))
}

pub fn fn_e(_args: &[Value], _ctx: &CallContext) -> FormulaResult<Value> {
    Ok(Value::Number(std::f64::consts::E))
}

/// TONUMBER(value): null when the value has no numeric reading
pub fn fn_to_number(args: &[Value], _ctx: &CallContext) -> FormulaResult<Value> {
    let converted = match &args[0] {
        Value::Number(n) => Some(*n),
        Value::Text(s) => s.trim().parse::<f64>().ok().filter(|n| n.is_finite()),
        Value::Boolean(b) => Some(if *b { 1.0 } else { 0.0 }),
        Value::Date(d) => Some(d.timestamp_millis() as f64),
        Value::List(_) | Value::Null => None,
    };
    Ok(converted.map_or(Value::Null, Value::Number))
}
