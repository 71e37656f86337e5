//! Dynamic values used both as statement inputs and as result cells.

use crate::row::Row;
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value as JsonValue;

/// A single SQL value.
///
/// Values are escaped and inlined into statement text by [`escape`](crate::escape::escape).
/// Result rows returned by a [`Connection`](crate::Connection) use the same type, and
/// relation loading nests related rows as [`Value::Row`] / [`Value::List`].
///
/// ```ignore
/// use sqlmapper::Value;
///
/// let values = vec![Value::from(1), Value::from("alice"), Value::from(true)];
/// ```
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    /// SQL NULL
    Null,
    /// Boolean value
    Bool(bool),
    /// Integer value (64-bit)
    Int(i64),
    /// Floating point value (64-bit)
    Float(f64),
    /// Text value
    Text(String),
    /// Timestamp, rendered as ISO-8601 in UTC
    Timestamp(DateTime<Utc>),
    /// Arbitrary JSON document, rendered as its JSON text
    Json(JsonValue),
    /// A list of values (IN-lists, has-many relations)
    List(Vec<Value>),
    /// A nested record (has-one / belongs-to relations)
    Row(Row),
}

impl Value {
    /// Check if this value is NULL
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Float(v) => Some(*v),
            Self::Int(v) => Some(*v as f64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(v) => Some(v),
            _ => None,
        }
    }

    /// Booleans, or the integers `0` / `1` that MySQL uses for them.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(v) => Some(*v),
            Self::Int(1) => Some(true),
            Self::Int(0) => Some(false),
            _ => None,
        }
    }

    pub fn as_timestamp(&self) -> Option<DateTime<Utc>> {
        match self {
            Self::Timestamp(v) => Some(*v),
            Self::Text(s) => DateTime::parse_from_rfc3339(s)
                .ok()
                .map(|dt| dt.with_timezone(&Utc)),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Self::List(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_row(&self) -> Option<&Row> {
        match self {
            Self::Row(v) => Some(v),
            _ => None,
        }
    }

    /// Key used to match related rows to parents: integers and their text
    /// form compare equal, everything else by its escaped literal.
    pub(crate) fn group_key(&self) -> String {
        match self {
            Self::Int(v) => v.to_string(),
            Self::Text(v) => v.clone(),
            other => crate::escape::escape(other),
        }
    }

    /// Convert into a `serde_json::Value`.
    pub fn to_json(&self) -> JsonValue {
        match self {
            Self::Null => JsonValue::Null,
            Self::Bool(v) => JsonValue::Bool(*v),
            Self::Int(v) => JsonValue::from(*v),
            Self::Float(v) => serde_json::Number::from_f64(*v)
                .map(JsonValue::Number)
                .unwrap_or(JsonValue::Null),
            Self::Text(v) => JsonValue::String(v.clone()),
            Self::Timestamp(v) => JsonValue::String(v.to_rfc3339()),
            Self::Json(v) => v.clone(),
            Self::List(v) => JsonValue::Array(v.iter().map(Value::to_json).collect()),
            Self::Row(v) => v.to_json(),
        }
    }
}

impl Default for Value {
    fn default() -> Self {
        Self::Null
    }
}

macro_rules! impl_from_int {
    ($($t:ty),*) => {
        $(
            impl From<$t> for Value {
                fn from(v: $t) -> Self {
                    Self::Int(i64::from(v))
                }
            }
        )*
    };
}

impl_from_int!(i8, i16, i32, i64, u8, u16, u32);

impl From<u64> for Value {
    fn from(v: u64) -> Self {
        match i64::try_from(v) {
            Ok(v) => Self::Int(v),
            Err(_) => Self::Text(v.to_string()),
        }
    }
}

impl From<usize> for Value {
    fn from(v: usize) -> Self {
        Self::from(v as u64)
    }
}

impl From<f32> for Value {
    fn from(v: f32) -> Self {
        Self::Float(f64::from(v))
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Self::Text(v)
    }
}

impl From<&String> for Value {
    fn from(v: &String) -> Self {
        Self::Text(v.clone())
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(v: DateTime<Utc>) -> Self {
        Self::Timestamp(v)
    }
}

impl From<Row> for Value {
    fn from(v: Row) -> Self {
        Self::Row(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Self::Null, Into::into)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(v: Vec<T>) -> Self {
        Self::List(v.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<Value>, const N: usize> From<[T; N]> for Value {
    fn from(v: [T; N]) -> Self {
        Self::List(v.into_iter().map(Into::into).collect())
    }
}

/// JSON scalars and arrays map onto native variants; objects stay as [`Value::Json`].
impl From<JsonValue> for Value {
    fn from(v: JsonValue) -> Self {
        match v {
            JsonValue::Null => Self::Null,
            JsonValue::Bool(b) => Self::Bool(b),
            JsonValue::Number(n) => match n.as_i64() {
                Some(i) => Self::Int(i),
                None => n.as_f64().map_or(Self::Null, Self::Float),
            },
            JsonValue::String(s) => Self::Text(s),
            JsonValue::Array(items) => Self::List(items.into_iter().map(Value::from).collect()),
            obj @ JsonValue::Object(_) => Self::Json(obj),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn option_maps_to_null() {
        assert_eq!(Value::from(None::<i64>), Value::Null);
        assert_eq!(Value::from(Some(3)), Value::Int(3));
    }

    #[test]
    fn json_scalars_become_native() {
        let v = Value::from(serde_json::json!([1, "a", null, 1.5]));
        assert_eq!(
            v,
            Value::List(vec![
                Value::Int(1),
                Value::Text("a".into()),
                Value::Null,
                Value::Float(1.5)
            ])
        );
    }

    #[test]
    fn bool_from_mysql_tinyint() {
        assert_eq!(Value::Int(1).as_bool(), Some(true));
        assert_eq!(Value::Int(0).as_bool(), Some(false));
        assert_eq!(Value::Int(2).as_bool(), None);
    }

    #[test]
    fn group_key_matches_int_and_text_ids() {
        assert_eq!(Value::Int(7).group_key(), Value::from("7").group_key());
        assert_ne!(Value::Int(7).group_key(), Value::Float(7.5).group_key());
    }

    #[test]
    fn large_unsigned_falls_back_to_text() {
        assert_eq!(Value::from(u64::MAX), Value::Text(u64::MAX.to_string()));
    }
}
