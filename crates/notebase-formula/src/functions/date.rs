//! Date functions

use super::{number_arg, opt_text_arg, CallContext};
use crate::error::{FormulaError, FormulaResult};
use chrono::{DateTime, Datelike, Months, NaiveDate, NaiveDateTime, TimeDelta, TimeZone, Utc};
use notebase_core::Value;

const MS_PER_DAY: f64 = 86_400_000.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DateUnit {
    Milliseconds,
    Seconds,
    Minutes,
    Hours,
    Days,
    Weeks,
    Months,
    Years,
}

impl DateUnit {
    fn parse(unit: Option<&str>) -> FormulaResult<Self> {
        let Some(unit) = unit else {
            return Ok(DateUnit::Days);
        };
        let lower = unit.trim().to_lowercase();
        let singular = lower.strip_suffix('s').unwrap_or(&lower);
        match singular {
            "millisecond" => Ok(DateUnit::Milliseconds),
            "second" => Ok(DateUnit::Seconds),
            "minute" => Ok(DateUnit::Minutes),
            "hour" => Ok(DateUnit::Hours),
            "day" => Ok(DateUnit::Days),
            "week" => Ok(DateUnit::Weeks),
            "month" => Ok(DateUnit::Months),
            "year" => Ok(DateUnit::Years),
            _ => Err(FormulaError::InvalidArgument(format!(
                "unknown date unit '{}'",
                unit
            ))),
        }
    }

    fn millis(&self) -> f64 {
        match self {
            DateUnit::Milliseconds => 1.0,
            DateUnit::Seconds => 1_000.0,
            DateUnit::Minutes => 60_000.0,
            DateUnit::Hours => 3_600_000.0,
            DateUnit::Days => MS_PER_DAY,
            DateUnit::Weeks => 7.0 * MS_PER_DAY,
            DateUnit::Months => 30.0 * MS_PER_DAY,
            DateUnit::Years => 365.0 * MS_PER_DAY,
        }
    }
}

/// Read a date from a date, an ISO-8601 text or a millisecond timestamp.
/// Unreadable input yields `None`.
pub(crate) fn to_date(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::Date(d) => Some(*d),
        Value::Number(ms) if ms.is_finite() => Utc.timestamp_millis_opt(*ms as i64).single(),
        Value::Text(s) => parse_date_text(s.trim()),
        _ => None,
    }
}

fn parse_date_text(s: &str) -> Option<DateTime<Utc>> {
    if s.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, format) {
            return Some(Utc.from_utc_datetime(&naive));
        }
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| Utc.from_utc_datetime(&naive))
}

fn shift(date: DateTime<Utc>, amount: f64, unit: DateUnit) -> Option<DateTime<Utc>> {
    let months = |n: f64| -> Option<DateTime<Utc>> {
        let n = n.trunc() as i64;
        let m = Months::new(u32::try_from(n.unsigned_abs()).ok()?);
        if n >= 0 {
            date.checked_add_months(m)
        } else {
            date.checked_sub_months(m)
        }
    };
    match unit {
        DateUnit::Months => months(amount),
        DateUnit::Years => months(amount * 12.0),
        fixed => {
            let ms = amount * fixed.millis();
            if !ms.is_finite() {
                return None;
            }
            // `as` saturates; out-of-range deltas are rejected by chrono
            date.checked_add_signed(TimeDelta::try_milliseconds(ms as i64)?)
        }
    }
}

/// NOW()
pub fn fn_now(_args: &[Value], ctx: &CallContext) -> FormulaResult<Value> {
    Ok(Value::Date(ctx.now))
}

/// DATEBETWEEN(start, end, [unit = "days"]): `end - start` in the unit
pub fn fn_date_between(args: &[Value], _ctx: &CallContext) -> FormulaResult<Value> {
    let unit = DateUnit::parse(opt_text_arg(args, 2, "dateBetween")?)?;
    let (Some(start), Some(end)) = (to_date(&args[0]), to_date(&args[1])) else {
        return Ok(Value::Null);
    };

    let diff = match unit {
        DateUnit::Months => {
            let years = (end.year() - start.year()) as f64;
            let months = end.month() as f64 - start.month() as f64;
            let days = end.day() as f64 - start.day() as f64;
            years * 12.0 + months + days / 30.0
        }
        other => (end - start).num_milliseconds() as f64 / other.millis(),
    };
    Ok(Value::Number(diff))
}

fn date_shift(args: &[Value], function: &str, sign: f64) -> FormulaResult<Value> {
    let amount = number_arg(args, 1, function)?;
    let unit = DateUnit::parse(opt_text_arg(args, 2, function)?)?;
    Ok(to_date(&args[0])
        .and_then(|date| shift(date, sign * amount, unit))
        .map_or(Value::Null, Value::Date))
}

/// DATEADD(date, amount, [unit = "days"])
pub fn fn_date_add(args: &[Value], _ctx: &CallContext) -> FormulaResult<Value> {
    date_shift(args, "dateAdd", 1.0)
}

/// DATESUBTRACT(date, amount, [unit = "days"])
pub fn fn_date_subtract(args: &[Value], _ctx: &CallContext) -> FormulaResult<Value> {
    date_shift(args, "dateSubtract", -1.0)
}

/// TIMESTAMP([date]): milliseconds since the Unix epoch
pub fn fn_timestamp(args: &[Value], ctx: &CallContext) -> FormulaResult<Value> {
    let date = match args.first() {
        None => Some(ctx.now),
        Some(value) => to_date(value),
    };
    Ok(date.map_or(Value::Null, |d| Value::Number(d.timestamp_millis() as f64)))
}

/// FROMTIMESTAMP(milliseconds)
pub fn fn_from_timestamp(args: &[Value], _ctx: &CallContext) -> FormulaResult<Value> {
    let ms = number_arg(args, 0, "fromTimestamp")?;
    Ok(to_date(&Value::Number(ms)).map_or(Value::Null, Value::Date))
}
