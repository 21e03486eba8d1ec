//! Text functions

use super::{number_arg, opt_number_arg, opt_text_arg, text_arg, CallContext};
use crate::error::FormulaResult;
use notebase_core::Value;
use regex::{Regex, RegexBuilder};

/// A replacement pattern: `/body/flags` compiles to a regex, anything else
/// (including an invalid regex) matches literally.
enum Pattern<'a> {
    Regex { regex: Regex, global: bool },
    Literal(&'a str),
}

fn parse_pattern(text: &str) -> Pattern<'_> {
    if let Some(rest) = text.strip_prefix('/') {
        if let Some(closing) = rest.rfind('/') {
            let (body, flags) = (&rest[..closing], &rest[closing + 1..]);
            if let Some(pattern) = compile_regex(body, flags) {
                return pattern;
            }
        }
    }
    Pattern::Literal(text)
}

fn compile_regex<'a>(body: &str, flags: &str) -> Option<Pattern<'a>> {
    let mut builder = RegexBuilder::new(body);
    let mut global = false;
    for flag in flags.chars() {
        match flag {
            'g' => global = true,
            'i' => {
                builder.case_insensitive(true);
            }
            'm' => {
                builder.multi_line(true);
            }
            's' => {
                builder.dot_matches_new_line(true);
            }
            'u' => {}
            _ => return None,
        }
    }
    builder
        .build()
        .ok()
        .map(|regex| Pattern::Regex { regex, global })
}

/// CONCAT(value, ...): null renders as ""
pub fn fn_concat(args: &[Value], _ctx: &CallContext) -> FormulaResult<Value> {
    Ok(Value::Text(args.iter().map(Value::to_text).collect()))
}

/// FORMAT(value, [locale]): numbers get thousands separators and at most
/// three fraction digits. The locale argument is accepted and ignored.
pub fn fn_format(args: &[Value], _ctx: &CallContext) -> FormulaResult<Value> {
    let _locale = opt_text_arg(args, 1, "format")?;
    let formatted = match &args[0] {
        Value::Number(n) => group_thousands(*n),
        other => other.to_text(),
    };
    Ok(Value::Text(formatted))
}

fn group_thousands(n: f64) -> String {
    let fixed = format!("{:.3}", n.abs());
    let (int_part, frac_part) = fixed.split_once('.').unwrap_or((fixed.as_str(), ""));
    let frac_part = frac_part.trim_end_matches('0');

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3 + 2);
    if n < 0.0 && fixed.bytes().any(|b| b != b'0' && b != b'.') {
        grouped.push('-');
    }
    for (i, c) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }
    if !frac_part.is_empty() {
        grouped.push('.');
        grouped.push_str(frac_part);
    }
    grouped
}

/// TOSTRING(value)
pub fn fn_to_string(args: &[Value], _ctx: &CallContext) -> FormulaResult<Value> {
    Ok(Value::Text(args[0].to_text()))
}

/// LENGTH(value): characters of text, items of a list, 0 for null
pub fn fn_length(args: &[Value], _ctx: &CallContext) -> FormulaResult<Value> {
    let len = match &args[0] {
        Value::Null => 0,
        Value::List(items) => items.len(),
        Value::Text(s) => s.chars().count(),
        other => other.to_text().chars().count(),
    };
    Ok(Value::Number(len as f64))
}

/// CONTAINS(text_or_list, search)
pub fn fn_contains(args: &[Value], _ctx: &CallContext) -> FormulaResult<Value> {
    let search = &args[1];
    if search.is_null() {
        return Ok(Value::Boolean(false));
    }
    let needle = search.to_text();
    let found = match &args[0] {
        Value::Text(s) => s.contains(needle.as_str()),
        Value::List(items) => items.iter().any(|item| item.to_text() == needle),
        _ => false,
    };
    Ok(Value::Boolean(found))
}

pub fn fn_lower(args: &[Value], _ctx: &CallContext) -> FormulaResult<Value> {
    Ok(Value::Text(text_arg(args, 0, "lower")?.to_lowercase()))
}

pub fn fn_upper(args: &[Value], _ctx: &CallContext) -> FormulaResult<Value> {
    Ok(Value::Text(text_arg(args, 0, "upper")?.to_uppercase()))
}

pub fn fn_trim(args: &[Value], _ctx: &CallContext) -> FormulaResult<Value> {
    Ok(Value::Text(text_arg(args, 0, "trim")?.trim().to_string()))
}

/// REPLACE(text, pattern, replacement): first match, or every match for a
/// `/.../g` pattern
pub fn fn_replace(args: &[Value], _ctx: &CallContext) -> FormulaResult<Value> {
    let text = text_arg(args, 0, "replace")?;
    let pattern = text_arg(args, 1, "replace")?;
    let replacement = text_arg(args, 2, "replace")?;

    let result = match parse_pattern(pattern) {
        Pattern::Regex {
            regex,
            global: true,
        } => regex.replace_all(text, replacement).into_owned(),
        Pattern::Regex { regex, .. } => regex.replace(text, replacement).into_owned(),
        Pattern::Literal("") => text.to_string(),
        Pattern::Literal(literal) => text.replacen(literal, replacement, 1),
    };
    Ok(Value::Text(result))
}

/// REPLACEALL(text, pattern, replacement)
pub fn fn_replace_all(args: &[Value], _ctx: &CallContext) -> FormulaResult<Value> {
    let text = text_arg(args, 0, "replaceAll")?;
    let pattern = text_arg(args, 1, "replaceAll")?;
    let replacement = text_arg(args, 2, "replaceAll")?;

    let result = match parse_pattern(pattern) {
        Pattern::Regex { regex, .. } => regex.replace_all(text, replacement).into_owned(),
        Pattern::Literal("") => text.to_string(),
        Pattern::Literal(literal) => text.replace(literal, replacement),
    };
    Ok(Value::Text(result))
}

/// SLICE(text, start, [length]): character based; a negative start counts
/// from the end
pub fn fn_slice(args: &[Value], _ctx: &CallContext) -> FormulaResult<Value> {
    let chars: Vec<char> = text_arg(args, 0, "slice")?.chars().collect();
    let len = chars.len() as i64;
    let start = number_arg(args, 1, "slice")?.trunc() as i64;
    let start = if start < 0 {
        (len + start).max(0)
    } else {
        start.min(len)
    };
    let end = match opt_number_arg(args, 2, "slice")? {
        Some(count) => start.saturating_add((count.trunc() as i64).max(0)).min(len),
        None => len,
    };
    Ok(Value::Text(
        chars[start as usize..end as usize].iter().collect(),
    ))
}

pub fn fn_starts_with(args: &[Value], _ctx: &CallContext) -> FormulaResult<Value> {
    let text = text_arg(args, 0, "startsWith")?;
    let prefix = text_arg(args, 1, "startsWith")?;
    Ok(Value::Boolean(text.starts_with(prefix)))
}

pub fn fn_ends_with(args: &[Value], _ctx: &CallContext) -> FormulaResult<Value> {
    let text = text_arg(args, 0, "endsWith")?;
    let suffix = text_arg(args, 1, "endsWith")?;
    Ok(Value::Boolean(text.ends_with(suffix)))
}

/// JOIN(list, [separator = ""])
pub fn fn_join(args: &[Value], _ctx: &CallContext) -> FormulaResult<Value> {
    let separator = opt_text_arg(args, 1, "join")?.unwrap_or("");
    let joined = match &args[0] {
        Value::List(items) => items
            .iter()
            .map(Value::to_text)
            .collect::<Vec<_>>()
            .join(separator),
        other => other.to_text(),
    };
    Ok(Value::Text(joined))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::functions::registry;
    use pretty_assertions::assert_eq;

    fn call(name: &str, args: &[Value]) -> Value {
        registry()
            .get(name)
            .unwrap()
            .call(args, &CallContext::default())
            .unwrap()
    }

    fn text(name: &str, args: &[&str]) -> String {
        let args: Vec<Value> = args.iter().map(|s| Value::text(*s)).collect();
        match call(name, &args) {
            Value::Text(s) => s,
            other => panic!("{}() returned {:?}", name, other),
        }
    }

    #[test]
    fn test_concat_and_to_string() {
        assert_eq!(
            call(
                "concat",
                &[Value::text("Total: "), Value::Number(37.5), Value::Null]
            ),
            Value::text("Total: 37.5")
        );
        assert_eq!(call("toString", &[Value::Number(3.0)]), Value::text("3"));
        assert_eq!(call("toString", &[Value::Boolean(true)]), Value::text("true"));
    }

    #[test]
    fn test_format_groups_thousands() {
        assert_eq!(call("format", &[Value::Number(1234567.891)]), Value::text("1,234,567.891"));
        assert_eq!(call("format", &[Value::Number(-1000.0)]), Value::text("-1,000"));
        assert_eq!(call("format", &[Value::Number(0.5)]), Value::text("0.5"));
        assert_eq!(call("format", &[Value::Null]), Value::text(""));
    }

    #[test]
    fn test_length_and_contains() {
        assert_eq!(call("length", &[Value::text("héllo")]), Value::Number(5.0));
        assert_eq!(call("length", &[Value::text_list(["a", "b"])]), Value::Number(2.0));
        assert_eq!(call("length", &[Value::Null]), Value::Number(0.0));
        assert_eq!(
            call("contains", &[Value::text("hello"), Value::text("ell")]),
            Value::Boolean(true)
        );
        assert_eq!(
            call("contains", &[Value::text_list(["red", "blue"]), Value::text("blue")]),
            Value::Boolean(true)
        );
        assert_eq!(
            call("contains", &[Value::Null, Value::text("x")]),
            Value::Boolean(false)
        );
    }

    #[test]
    fn test_case_and_trim() {
        assert_eq!(text("lower", &["HeLLo"]), "hello");
        assert_eq!(text("upper", &["HeLLo"]), "HELLO");
        assert_eq!(text("trim", &["  x  "]), "x");
    }

    #[test]
    fn test_replace_literal_and_regex() {
        assert_eq!(text("replace", &["a-b-c", "-", "+"]), "a+b-c");
        assert_eq!(text("replaceAll", &["a-b-c", "-", "+"]), "a+b+c");
        assert_eq!(text("replace", &["a1b22c", "/[0-9]+/", "#"]), "a#b22c");
        assert_eq!(text("replace", &["a1b22c", "/[0-9]+/g", "#"]), "a#b#c");
        assert_eq!(text("replaceAll", &["Cat cat", "/cat/i", "dog"]), "dog dog");
        // invalid regex falls back to literal text
        assert_eq!(text("replaceAll", &["a/(/b", "/(/", "x"]), "axb");
    }

    #[test]
    fn test_slice() {
        let slice = |s: &str, start: f64, len: Option<f64>| {
            let mut args = vec![Value::text(s), Value::Number(start)];
            if let Some(len) = len {
                args.push(Value::Number(len));
            }
            call("slice", &args)
        };
        assert_eq!(slice("Hello", 1.0, None), Value::text("ello"));
        assert_eq!(slice("Hello", 1.0, Some(3.0)), Value::text("ell"));
        assert_eq!(slice("Hello", -3.0, None), Value::text("llo"));
        assert_eq!(slice("Hello", 10.0, None), Value::text(""));
        assert_eq!(slice("Hello", 2.0, Some(-1.0)), Value::text(""));
    }

    #[test]
    fn test_slice_extreme_bounds() {
        let slice = |start: f64, len: f64| {
            call("slice", &[Value::text("abc"), Value::Number(start), Value::Number(len)])
        };
        assert_eq!(slice(1.0, 1e300), Value::text("bc"));
        assert_eq!(slice(1.0, f64::MAX), Value::text("bc"));
        assert_eq!(slice(1e300, 1e300), Value::text(""));
        assert_eq!(slice(-1e300, 2.0), Value::text("ab"));
        assert_eq!(slice(0.0, -1e300), Value::text(""));
    }

    #[test]
    fn test_starts_ends_join() {
        assert_eq!(
            call("startsWith", &[Value::text("notebase"), Value::text("note")]),
            Value::Boolean(true)
        );
        assert_eq!(
            call("endsWith", &[Value::text("notebase"), Value::text("note")]),
            Value::Boolean(false)
        );
        assert_eq!(
            call("join", &[Value::text_list(["a", "b", "c"]), Value::text(", ")]),
            Value::text("a, b, c")
        );
        assert_eq!(call("join", &[Value::Null]), Value::text(""));
    }
}
