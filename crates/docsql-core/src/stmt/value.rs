use super::Document;

use chrono::{DateTime, SecondsFormat, Utc};
use std::fmt;

/// A dynamically typed document value.
#[derive(Debug, Default, Clone, PartialEq)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    I64(i64),
    F64(f64),
    String(String),
    Date(DateTime<Utc>),
    Array(Vec<Value>),
    Document(Document),
}

impl Value {
    pub const fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub const fn is_date(&self) -> bool {
        matches!(self, Value::Date(_))
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match *self {
            Value::Bool(v) => Some(v),
            _ => None,
        }
    }

    /// Returns the value as an integer. Floats convert only when they have no
    /// fractional part.
    pub fn as_i64(&self) -> Option<i64> {
        match *self {
            Value::I64(v) => Some(v),
            Value::F64(v) if v.fract() == 0.0 => Some(v as i64),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match *self {
            Value::I64(v) => Some(v as f64),
            Value::F64(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::Array(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_document(&self) -> Option<&Document> {
        match self {
            Value::Document(v) => Some(v),
            _ => None,
        }
    }

    /// Mongo truthiness, used by projection flags such as `{a: 1}` or
    /// `{a: false}`.
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Null => false,
            Value::Bool(v) => *v,
            Value::I64(v) => *v != 0,
            Value::F64(v) => *v != 0.0,
            _ => true,
        }
    }

    /// Name of the value's variant, for error messages.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "boolean",
            Value::I64(_) => "integer",
            Value::F64(_) => "float",
            Value::String(_) => "string",
            Value::Date(_) => "date",
            Value::Array(_) => "array",
            Value::Document(_) => "document",
        }
    }

    /// The SQL cast used when this value is compared against an untyped
    /// expression such as a JSON path.
    pub fn type_hint(&self) -> Option<&'static str> {
        match self {
            Value::Bool(_) => Some("BOOLEAN"),
            Value::I64(_) => Some("INTEGER"),
            Value::F64(_) => Some("REAL"),
            Value::String(_) => Some("TEXT"),
            Value::Date(_) => Some("TIMESTAMPTZ"),
            Value::Null | Value::Array(_) | Value::Document(_) => None,
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::Null => serde_json::Value::Null,
            Value::Bool(v) => serde_json::Value::Bool(*v),
            Value::I64(v) => serde_json::Value::from(*v),
            Value::F64(v) => serde_json::Number::from_f64(*v)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            Value::String(v) => serde_json::Value::String(v.clone()),
            Value::Date(v) => {
                serde_json::Value::String(v.to_rfc3339_opts(SecondsFormat::Millis, true))
            }
            Value::Array(v) => serde_json::Value::Array(v.iter().map(Value::to_json).collect()),
            Value::Document(v) => v.to_json(),
        }
    }

    /// Renders the value as an inline SQL literal.
    ///
    /// Only used for parameter-free statements (DDL); everything else goes
    /// through placeholders.
    pub fn to_sql_literal(&self) -> String {
        match self {
            Value::Null => "NULL".to_string(),
            Value::Bool(true) => "TRUE".to_string(),
            Value::Bool(false) => "FALSE".to_string(),
            Value::I64(v) => v.to_string(),
            Value::F64(v) if v.is_finite() => v.to_string(),
            Value::F64(v) => format!("'{v}'::DOUBLE PRECISION"),
            Value::String(v) => quote(v),
            Value::Date(v) => format!(
                "{}::TIMESTAMPTZ",
                quote(&v.to_rfc3339_opts(SecondsFormat::Millis, true))
            ),
            Value::Array(_) | Value::Document(_) => {
                format!("{}::JSONB", quote(&self.to_json().to_string()))
            }
        }
    }
}

fn quote(s: &str) -> String {
    format!("'{}'", s.replace('\'', "''"))
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.to_json(), f)
    }
}

impl From<serde_json::Value> for Value {
    fn from(value: serde_json::Value) -> Value {
        match value {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(v) => Value::Bool(v),
            serde_json::Value::Number(v) => match v.as_i64() {
                Some(v) => Value::I64(v),
                None => Value::F64(v.as_f64().unwrap_or(f64::NAN)),
            },
            serde_json::Value::String(v) => Value::String(v),
            serde_json::Value::Array(v) => Value::Array(v.into_iter().map(Value::from).collect()),
            serde_json::Value::Object(v) => Value::Document(Document::from(v)),
        }
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Value {
        Value::Bool(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Value {
        Value::I64(value.into())
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Value {
        Value::I64(value)
    }
}

impl From<u64> for Value {
    fn from(value: u64) -> Value {
        match i64::try_from(value) {
            Ok(v) => Value::I64(v),
            Err(_) => Value::F64(value as f64),
        }
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Value {
        Value::F64(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Value {
        Value::String(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Value {
        Value::String(value)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(value: DateTime<Utc>) -> Value {
        Value::Date(value)
    }
}

impl From<Document> for Value {
    fn from(value: Document) -> Value {
        Value::Document(value)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(value: Vec<T>) -> Value {
        Value::Array(value.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Value {
        value.map(Into::into).unwrap_or(Value::Null)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn integers_stay_integers() {
        assert_eq!(Value::from(serde_json::json!(3)), Value::I64(3));
        assert_eq!(Value::from(serde_json::json!(3.5)), Value::F64(3.5));
    }

    #[test]
    fn literal_escapes_quotes() {
        assert_eq!(Value::from("it's").to_sql_literal(), "'it''s'");
        assert_eq!(Value::Bool(true).to_sql_literal(), "TRUE");
        assert_eq!(
            Value::from(serde_json::json!({"a": [1]})).to_sql_literal(),
            "'{\"a\":[1]}'::JSONB"
        );
    }

    #[test]
    fn dates_render_as_rfc3339() {
        let date = Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap();
        assert_eq!(
            Value::Date(date).to_json(),
            serde_json::json!("2024-01-02T03:04:05.000Z")
        );
        assert_eq!(Value::Date(date).type_hint(), Some("TIMESTAMPTZ"));
    }

    #[test]
    fn truthiness() {
        assert!(Value::I64(1).is_truthy());
        assert!(!Value::I64(0).is_truthy());
        assert!(!Value::Bool(false).is_truthy());
        assert!(Value::from("$a").is_truthy());
    }
}
