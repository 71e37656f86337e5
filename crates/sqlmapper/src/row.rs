//! Ordered records: result rows, predicate objects and INSERT/SET objects.

use crate::error::{MapperError, MapperResult};
use crate::value::Value;
use serde::de::DeserializeOwned;
use serde::ser::{Serialize, SerializeMap, Serializer};
use serde_json::Value as JsonValue;

/// An insertion-ordered map of column name to [`Value`].
///
/// Column order is preserved, so `INSERT`/`SET` statements built from a `Row`
/// list their columns in the order they were inserted.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row {
    fields: Vec<(String, Value)>,
}

/// Build a [`Row`] from `key => value` pairs.
///
/// ```ignore
/// use sqlmapper::row;
///
/// let filter = row! { "name" => "foo", "age >" => 15 };
/// ```
#[macro_export]
macro_rules! row {
    () => {
        $crate::Row::new()
    };
    ($($key:expr => $value:expr),+ $(,)?) => {{
        let mut row = $crate::Row::new();
        $( row.insert($key, $crate::Value::from($value)); )+
        row
    }};
}

impl Row {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            fields: Vec::with_capacity(capacity),
        }
    }

    fn position(&self, column: &str) -> Option<usize> {
        self.fields.iter().position(|(name, _)| name == column)
    }

    /// Insert a value. An existing column keeps its position and the old value is returned.
    pub fn insert(&mut self, column: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        let column = column.into();
        let value = value.into();
        match self.position(&column) {
            Some(idx) => Some(std::mem::replace(&mut self.fields[idx].1, value)),
            None => {
                self.fields.push((column, value));
                None
            }
        }
    }

    pub fn get(&self, column: &str) -> Option<&Value> {
        self.position(column).map(|idx| &self.fields[idx].1)
    }

    pub fn get_mut(&mut self, column: &str) -> Option<&mut Value> {
        self.position(column).map(|idx| &mut self.fields[idx].1)
    }

    /// Get a column value, returning a decode error when it is missing.
    pub fn try_get(&self, column: &str) -> MapperResult<&Value> {
        self.get(column)
            .ok_or_else(|| MapperError::decode(column, "column not present in row"))
    }

    pub fn remove(&mut self, column: &str) -> Option<Value> {
        self.position(column).map(|idx| self.fields.remove(idx).1)
    }

    pub fn contains_key(&self, column: &str) -> bool {
        self.position(column).is_some()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(name, _)| name.as_str())
    }

    pub fn values(&self) -> impl Iterator<Item = &Value> {
        self.fields.iter().map(|(_, value)| value)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(name, value)| (name.as_str(), value))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// The value of the first column (used for scalar queries).
    pub fn first_value(&self) -> Option<&Value> {
        self.fields.first().map(|(_, value)| value)
    }

    /// Convert into a JSON object, preserving nested relation rows.
    pub fn to_json(&self) -> JsonValue {
        let map = self
            .fields
            .iter()
            .map(|(name, value)| (name.clone(), value.to_json()))
            .collect::<serde_json::Map<_, _>>();
        JsonValue::Object(map)
    }

    /// Build a row from a JSON object.
    pub fn from_json(json: JsonValue) -> MapperResult<Self> {
        match json {
            JsonValue::Object(map) => Ok(map
                .into_iter()
                .map(|(name, value)| (name, Value::from(value)))
                .collect()),
            other => Err(MapperError::Serialization(format!(
                "expected a JSON object, got {other}"
            ))),
        }
    }

    /// Build a row from any serializable struct or map.
    pub fn from_serialize<T: serde::Serialize>(value: &T) -> MapperResult<Self> {
        Self::from_json(serde_json::to_value(value)?)
    }

    /// Decode this row into `T` via serde.
    pub fn decode<T: DeserializeOwned>(&self) -> MapperResult<T> {
        Ok(serde_json::from_value(self.to_json())?)
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Row {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut row = Row::new();
        for (k, v) in iter {
            row.insert(k, v);
        }
        row
    }
}

impl IntoIterator for Row {
    type Item = (String, Value);
    type IntoIter = std::vec::IntoIter<(String, Value)>;

    fn into_iter(self) -> Self::IntoIter {
        self.fields.into_iter()
    }
}

impl Serialize for Row {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for (name, value) in &self.fields {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::{Deserialize, Serialize};

    #[test]
    fn insert_keeps_position_on_replace() {
        let mut row = row! { "a" => 1, "b" => 2 };
        assert_eq!(row.insert("a", 10), Some(Value::Int(1)));
        assert_eq!(row.keys().collect::<Vec<_>>(), vec!["a", "b"]);
        assert_eq!(row.get("a"), Some(&Value::Int(10)));
    }

    #[test]
    fn remove_and_contains() {
        let mut row = row! { "id" => 1, "title" => "A" };
        assert!(row.contains_key("id"));
        assert_eq!(row.remove("id"), Some(Value::Int(1)));
        assert!(!row.contains_key("id"));
        assert_eq!(row.len(), 1);
    }

    #[test]
    fn try_get_reports_missing_column() {
        let row = row! { "id" => 1 };
        let err = row.try_get("title").unwrap_err();
        assert!(matches!(err, MapperError::Decode { ref column, .. } if column == "title"));
    }

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    struct Post {
        id: i64,
        title: String,
        comments: Vec<Comment>,
    }

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    struct Comment {
        id: i64,
        body: String,
    }

    #[test]
    fn decode_nested_relation_rows() {
        let mut post = row! { "id" => 1, "title" => "A" };
        post.insert(
            "comments",
            Value::List(vec![
                Value::Row(row! { "id" => 1, "body" => "x" }),
                Value::Row(row! { "id" => 2, "body" => "y" }),
            ]),
        );

        let decoded: Post = post.decode().unwrap();
        assert_eq!(decoded.comments.len(), 2);
        assert_eq!(decoded.comments[1].body, "y");
    }

    #[test]
    fn from_serialize_round_trips_struct_fields() {
        let comment = Comment {
            id: 3,
            body: "hello".into(),
        };
        let row = Row::from_serialize(&comment).unwrap();
        assert_eq!(row.get("id"), Some(&Value::Int(3)));
        assert_eq!(row.get("body"), Some(&Value::Text("hello".into())));
    }

    #[test]
    fn serializes_as_json_object() {
        let row = row! { "id" => 1, "tags" => vec!["a", "b"] };
        let json = serde_json::to_string(&row).unwrap();
        assert_eq!(json, r#"{"id":1,"tags":["a","b"]}"#);
    }
}
