//! Operand values carried by expressions.

use std::fmt;
use std::hash::{Hash, Hasher};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

/// The value an expression compares a field against.
///
/// Equality and hashing are structural. Floats compare and hash by bit
/// pattern, so `NaN == NaN` and `0.0 != -0.0` here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ExprValue {
    /// Absent value.
    Null,
    /// Boolean value.
    Bool(bool),
    /// Integer value.
    Int(i64),
    /// Floating point value.
    Float(f64),
    /// Text value.
    Text(String),
    /// Point in time.
    Date(DateTime<Utc>),
    /// Structured list of values.
    List(Vec<ExprValue>),
}

impl ExprValue {
    /// Returns `true` for [`ExprValue::Null`].
    pub fn is_null(&self) -> bool {
        matches!(self, ExprValue::Null)
    }

    /// Returns `true` only for the empty string.
    pub fn is_empty_text(&self) -> bool {
        matches!(self, ExprValue::Text(s) if s.is_empty())
    }

    /// Returns the text if this is a text value.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            ExprValue::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Converts the value into its JSON representation as sent to the engine.
    pub fn to_json(&self) -> Value {
        match self {
            ExprValue::Null => Value::Null,
            ExprValue::Bool(b) => json!(b),
            ExprValue::Int(i) => json!(i),
            ExprValue::Float(f) => json!(f),
            ExprValue::Text(s) => json!(s),
            ExprValue::Date(d) => json!(d.to_rfc3339()),
            ExprValue::List(items) => Value::Array(items.iter().map(ExprValue::to_json).collect()),
        }
    }
}

impl PartialEq for ExprValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (ExprValue::Null, ExprValue::Null) => true,
            (ExprValue::Bool(a), ExprValue::Bool(b)) => a == b,
            (ExprValue::Int(a), ExprValue::Int(b)) => a == b,
            (ExprValue::Float(a), ExprValue::Float(b)) => a.to_bits() == b.to_bits(),
            (ExprValue::Text(a), ExprValue::Text(b)) => a == b,
            (ExprValue::Date(a), ExprValue::Date(b)) => a == b,
            (ExprValue::List(a), ExprValue::List(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for ExprValue {}

impl Hash for ExprValue {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            ExprValue::Null => {}
            ExprValue::Bool(b) => b.hash(state),
            ExprValue::Int(i) => i.hash(state),
            ExprValue::Float(f) => f.to_bits().hash(state),
            ExprValue::Text(s) => s.hash(state),
            ExprValue::Date(d) => d.hash(state),
            ExprValue::List(items) => items.hash(state),
        }
    }
}

impl fmt::Display for ExprValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExprValue::Null => write!(f, "null"),
            ExprValue::Bool(b) => write!(f, "{}", b),
            ExprValue::Int(i) => write!(f, "{}", i),
            ExprValue::Float(v) => write!(f, "{}", v),
            ExprValue::Text(s) => write!(f, "\"{}\"", s),
            ExprValue::Date(d) => write!(f, "{}", d.to_rfc3339()),
            ExprValue::List(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, "]")
            }
        }
    }
}

impl From<&str> for ExprValue {
    fn from(value: &str) -> Self {
        ExprValue::Text(value.to_string())
    }
}

impl From<String> for ExprValue {
    fn from(value: String) -> Self {
        ExprValue::Text(value)
    }
}

impl From<bool> for ExprValue {
    fn from(value: bool) -> Self {
        ExprValue::Bool(value)
    }
}

impl From<i32> for ExprValue {
    fn from(value: i32) -> Self {
        ExprValue::Int(i64::from(value))
    }
}

impl From<i64> for ExprValue {
    fn from(value: i64) -> Self {
        ExprValue::Int(value)
    }
}

impl From<u32> for ExprValue {
    fn from(value: u32) -> Self {
        ExprValue::Int(i64::from(value))
    }
}

impl From<f64> for ExprValue {
    fn from(value: f64) -> Self {
        ExprValue::Float(value)
    }
}

impl From<DateTime<Utc>> for ExprValue {
    fn from(value: DateTime<Utc>) -> Self {
        ExprValue::Date(value)
    }
}

impl<T: Into<ExprValue>> From<Vec<T>> for ExprValue {
    fn from(values: Vec<T>) -> Self {
        ExprValue::List(values.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<ExprValue>> From<Option<T>> for ExprValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(ExprValue::Null, Into::into)
    }
}
