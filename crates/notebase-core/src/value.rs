//! Property and formula value types

use chrono::{DateTime, SecondsFormat, Utc};
use std::fmt;

/// A typed property value
///
/// Formulas operate over the scalar variants. `List` only appears when a
/// multi-valued property (multi-select, relation, person) is read from a row.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    /// Missing or cleared value
    #[default]
    Null,
    /// Text value
    Text(String),
    /// Numeric value
    Number(f64),
    /// Boolean value (checkbox)
    Boolean(bool),
    /// Point in time (UTC)
    Date(DateTime<Utc>),
    /// Multi-valued property contents
    List(Vec<Value>),
}

/// The tag of a [`Value`], used by function contracts and error messages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueTag {
    Text,
    Number,
    Boolean,
    Date,
    List,
    Null,
}

impl ValueTag {
    /// All tags, in declaration order
    pub const ALL: [ValueTag; 6] = [
        ValueTag::Text,
        ValueTag::Number,
        ValueTag::Boolean,
        ValueTag::Date,
        ValueTag::List,
        ValueTag::Null,
    ];

    /// Lowercase name used in messages ("expected number, got text")
    pub fn as_str(&self) -> &'static str {
        match self {
            ValueTag::Text => "text",
            ValueTag::Number => "number",
            ValueTag::Boolean => "boolean",
            ValueTag::Date => "date",
            ValueTag::List => "list",
            ValueTag::Null => "null",
        }
    }
}

impl fmt::Display for ValueTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Value {
    /// Create a text value
    pub fn text<S: Into<String>>(s: S) -> Self {
        Value::Text(s.into())
    }

    /// Create a list of text values (e.g. relation ids, multi-select option names)
    pub fn text_list<I, S>(items: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Value::List(items.into_iter().map(|s| Value::Text(s.into())).collect())
    }

    /// Get the tag of this value
    pub fn tag(&self) -> ValueTag {
        match self {
            Value::Null => ValueTag::Null,
            Value::Text(_) => ValueTag::Text,
            Value::Number(_) => ValueTag::Number,
            Value::Boolean(_) => ValueTag::Boolean,
            Value::Date(_) => ValueTag::Date,
            Value::List(_) => ValueTag::List,
        }
    }

    /// Check if the value is null
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Empty in the rollup sense: null, empty text or an empty list
    pub fn is_empty(&self) -> bool {
        match self {
            Value::Null => true,
            Value::Text(s) => s.is_empty(),
            Value::List(items) => items.is_empty(),
            _ => false,
        }
    }

    /// Get the number, if this is a number
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// Get the text, if this is text
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Get the boolean, if this is a boolean
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    /// Get the date, if this is a date
    pub fn as_date(&self) -> Option<DateTime<Utc>> {
        match self {
            Value::Date(d) => Some(*d),
            _ => None,
        }
    }

    /// Get the items, if this is a list
    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    /// Render the value as plain text.
    ///
    /// This is the explicit conversion used by text concatenation and
    /// `toString()`; it is not a localized display format.
    pub fn to_text(&self) -> String {
        match self {
            Value::Null => String::new(),
            Value::Text(s) => s.clone(),
            Value::Number(n) => format_number(*n),
            Value::Boolean(b) => b.to_string(),
            Value::Date(d) => d.to_rfc3339_opts(SecondsFormat::Millis, true),
            Value::List(items) => items
                .iter()
                .map(Value::to_text)
                .collect::<Vec<_>>()
                .join(", "),
        }
    }
}

/// Format a number without a trailing `.0` for integral values
pub fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{}", n)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_text())
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Boolean(b)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Number(n as f64)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Number(n as f64)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(d: DateTime<Utc>) -> Self {
        Value::Date(d)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}

#[cfg(feature = "serde")]
mod serde_impl {
    use super::Value;
    use chrono::{DateTime, Utc};
    use serde::ser::SerializeMap;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    impl Serialize for Value {
        fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
            match self {
                Value::Null => serializer.serialize_unit(),
                Value::Text(s) => serializer.serialize_str(s),
                Value::Number(n) => serializer.serialize_f64(*n),
                Value::Boolean(b) => serializer.serialize_bool(*b),
                Value::Date(d) => {
                    let mut map = serializer.serialize_map(Some(1))?;
                    map.serialize_entry("date", d)?;
                    map.end()
                }
                Value::List(items) => items.serialize(serializer),
            }
        }
    }

    /// Wire shape: JSON scalars map to their natural variant, arrays to
    /// lists, and `{"date": "<RFC 3339>"}` to dates.
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Repr {
        Null(()),
        Boolean(bool),
        Number(f64),
        Text(String),
        List(Vec<Value>),
        Date { date: DateTime<Utc> },
    }

    impl<'de> Deserialize<'de> for Value {
        fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
            Ok(match Repr::deserialize(deserializer)? {
                Repr::Null(()) => Value::Null,
                Repr::Boolean(b) => Value::Boolean(b),
                Repr::Number(n) => Value::Number(n),
                Repr::Text(s) => Value::Text(s),
                Repr::List(items) => Value::List(items),
                Repr::Date { date } => Value::Date(date),
            })
        }
    }
}
