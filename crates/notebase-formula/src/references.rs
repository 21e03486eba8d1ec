//! Text-level helpers for `prop("Name")` references
//!
//! These work on raw formula text rather than the AST so a host can keep the
//! author's formatting when a property is renamed.

use lazy_regex::regex;
use regex::{Captures, Regex};

fn unescape(body: &str) -> String {
    let mut out = String::with_capacity(body.len());
    let mut chars = body.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }
    out
}

fn escape(name: &str, quote: char) -> String {
    let mut out = String::with_capacity(name.len());
    for c in name.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '\r' => out.push_str("\\r"),
            c if c == quote => {
                out.push('\\');
                out.push(c);
            }
            c => out.push(c),
        }
    }
    out
}

/// The quote character and unescaped name of one `prop(...)` match
fn reference(caps: &Captures<'_>) -> Option<(char, String)> {
    caps.get(1)
        .map(|m| ('"', unescape(m.as_str())))
        .or_else(|| caps.get(2).map(|m| ('\'', unescape(m.as_str()))))
}

/// Property names referenced by `prop()` calls, in order of appearance,
/// without duplicates
pub fn referenced_property_names(formula: &str) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    for caps in prop_call().captures_iter(formula) {
        if let Some((_, name)) = reference(&caps) {
            if !names.contains(&name) {
                names.push(name);
            }
        }
    }
    names
}

/// Rewrite `prop("old")` to `prop("new")`, leaving everything else in the
/// formula as written. Names compare exactly.
pub fn rename_property_references(formula: &str, old_name: &str, new_name: &str) -> String {
    prop_call()
        .replace_all(formula, |caps: &Captures<'_>| match reference(caps) {
            Some((quote, name)) if name == old_name => {
                format!("prop({quote}{}{quote})", escape(new_name, quote))
            }
            _ => caps[0].to_string(),
        })
        .into_owned()
}

fn prop_call() -> &'static Regex {
    regex!(r#"(?i:\bprop)\s*\(\s*(?:"((?:[^"\\]|\\.)*)"|'((?:[^'\\]|\\.)*)')\s*\)"#)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_referenced_names() {
        let formula = r#"if(prop("Status") = "Done", prop('Due Date'), PROP( "Status" ))"#;
        assert_eq!(
            referenced_property_names(formula),
            vec!["Status".to_string(), "Due Date".to_string()]
        );
        assert_eq!(
            referenced_property_names(r#"prop("Say \"hi\"")"#),
            vec![r#"Say "hi""#.to_string()]
        );
        assert!(referenced_property_names("1 + 2").is_empty());
    }

    #[test]
    fn test_rename_keeps_formatting() {
        let formula = r#"prop("Price")  *   prop( 'Price' ) + prop("Prices")"#;
        assert_eq!(
            rename_property_references(formula, "Price", "Unit Price"),
            r#"prop("Unit Price")  *   prop('Unit Price') + prop("Prices")"#
        );
    }

    #[test]
    fn test_rename_escapes_quotes() {
        assert_eq!(
            rename_property_references(r#"prop("A")"#, "A", r#"say "x""#),
            r#"prop("say \"x\"")"#
        );
    }

    #[test]
    fn test_control_escapes_match_parser() {
        let formula = r#"prop("Line\r\nBreak\tTab") + 1"#;
        let names = referenced_property_names(formula);
        assert_eq!(names, vec!["Line\r\nBreak\tTab".to_string()]);
        let expr = crate::parse_formula(formula).unwrap();
        assert_eq!(expr.property_references(), vec![names[0].as_str()]);

        let renamed = rename_property_references(r#"prop("A")"#, "A", "x\ry");
        assert_eq!(renamed, r#"prop("x\ry")"#);
        assert_eq!(referenced_property_names(&renamed), vec!["x\ry".to_string()]);
    }

    #[test]
    fn test_renamed_formula_still_parses() {
        let renamed = rename_property_references(r#"prop("A") * 2"#, "A", "B's");
        let expr = crate::parse_formula(&renamed).unwrap();
        assert_eq!(expr.property_references(), vec!["B's"]);
    }
}
