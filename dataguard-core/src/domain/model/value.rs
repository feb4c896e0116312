// dataguard-core/src/domain/model/value.rs

use chrono::NaiveDate;
use serde::Serialize;
use std::fmt;

use super::schema::FieldType;

pub const DEFAULT_DATE_FORMAT: &str = "%Y-%m-%d";

/// A single cell of a record, already coerced to its semantic type when possible.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    Bool(bool),
    Integer(i64),
    Float(f64),
    Date(NaiveDate),
    Text(String),
    List(Vec<Value>),
}

impl Value {
    /// Null, or text made only of whitespace.
    pub fn is_missing(&self) -> bool {
        match self {
            Self::Null => true,
            Self::Text(s) => s.trim().is_empty(),
            _ => false,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Integer(i) => Some(*i as f64),
            Self::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::Integer(_) => "integer",
            Self::Float(_) => "float",
            Self::Date(_) => "date",
            Self::Text(_) => "text",
            Self::List(_) => "list",
        }
    }

    /// Canonical representation used to compare keys across datasets.
    /// `42`, `42.0` and `"42"` all collapse to the same key.
    pub fn key_repr(&self) -> Option<String> {
        match self {
            Self::Null | Self::List(_) => None,
            Self::Text(s) if s.trim().is_empty() => None,
            Self::Text(s) => Some(s.trim().to_string()),
            Self::Bool(b) => Some(b.to_string()),
            Self::Integer(i) => Some(i.to_string()),
            Self::Float(f) if f.fract() == 0.0 && f.abs() < i64::MAX as f64 => {
                Some((*f as i64).to_string())
            }
            Self::Float(f) => Some(f.to_string()),
            Self::Date(d) => Some(d.format(DEFAULT_DATE_FORMAT).to_string()),
        }
    }

    /// Coerces raw text into the declared semantic type.
    /// Text that does not parse is kept as-is so validators can report a type mismatch.
    pub fn coerce(self, field_type: FieldType, date_format: &str) -> Value {
        let raw = match self {
            Self::Text(raw) => raw,
            other => return other,
        };

        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Self::Null;
        }

        match field_type {
            FieldType::Numeric => parse_number(trimmed).unwrap_or(Self::Text(raw)),
            FieldType::Date => NaiveDate::parse_from_str(trimmed, date_format)
                .map(Self::Date)
                .unwrap_or(Self::Text(raw)),
            // An unresolved foreign key stays text: "007" must not become 7.
            FieldType::String | FieldType::Enum | FieldType::ForeignKey => Self::Text(raw),
        }
    }
}

fn parse_number(raw: &str) -> Option<Value> {
    if let Ok(i) = raw.parse::<i64>() {
        return Some(Value::Integer(i));
    }
    raw.parse::<f64>()
        .ok()
        .filter(|f| f.is_finite())
        .map(Value::Float)
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => write!(f, "null"),
            Self::Bool(b) => write!(f, "{}", b),
            Self::Integer(i) => write!(f, "{}", i),
            Self::Float(x) => write!(f, "{}", x),
            Self::Date(d) => write!(f, "{}", d.format(DEFAULT_DATE_FORMAT)),
            Self::Text(s) => write!(f, "{:?}", s),
            Self::List(items) => {
                let parts: Vec<String> = items.iter().map(|v| v.to_string()).collect();
                write!(f, "[{}]", parts.join(", "))
            }
        }
    }
}

impl From<serde_json::Value> for Value {
    fn from(json: serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null => Self::Null,
            serde_json::Value::Bool(b) => Self::Bool(b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Self::Integer(i),
                None => n.as_f64().map(Self::Float).unwrap_or(Self::Null),
            },
            serde_json::Value::String(s) => Self::Text(s),
            serde_json::Value::Array(items) => {
                Self::List(items.into_iter().map(Value::from).collect())
            }
            // Nested objects have no semantic type; keep them opaque.
            other @ serde_json::Value::Object(_) => Self::Text(other.to_string()),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Self::Integer(i)
    }
}

impl From<f64> for Value {
    fn from(x: f64) -> Self {
        Self::Float(x)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_detection() {
        assert!(Value::Null.is_missing());
        assert!(Value::from("   ").is_missing());
        assert!(!Value::from("a").is_missing());
        assert!(!Value::Integer(0).is_missing());
    }

    #[test]
    fn test_key_repr_collapses_numeric_forms() {
        assert_eq!(Value::Integer(42).key_repr(), Value::Float(42.0).key_repr());
        assert_eq!(Value::from("42").key_repr(), Some("42".to_string()));
        assert_eq!(Value::Null.key_repr(), None);
    }

    #[test]
    fn test_coerce_by_field_type() {
        assert_eq!(
            Value::from("12").coerce(FieldType::Numeric, DEFAULT_DATE_FORMAT),
            Value::Integer(12)
        );
        assert_eq!(
            Value::from("12.5").coerce(FieldType::Numeric, DEFAULT_DATE_FORMAT),
            Value::Float(12.5)
        );
        assert_eq!(
            Value::from("abc").coerce(FieldType::Numeric, DEFAULT_DATE_FORMAT),
            Value::from("abc")
        );
        assert_eq!(
            Value::from("2023-01-10").coerce(FieldType::Date, DEFAULT_DATE_FORMAT),
            Value::Date(NaiveDate::from_ymd_opt(2023, 1, 10).unwrap_or_default())
        );
        assert_eq!(
            Value::from("").coerce(FieldType::String, DEFAULT_DATE_FORMAT),
            Value::Null
        );
    }
}
