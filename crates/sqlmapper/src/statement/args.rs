//! Argument types for the builder's overloaded clauses.

use crate::row::Row;
use crate::value::Value;

/// Argument of [`select`](super::StatementBuilder::select).
#[derive(Debug, Clone, PartialEq)]
pub enum SelectArg {
    /// `*`
    All,
    /// A select list used verbatim.
    Raw(String),
    /// Column names, filtered against the table schema.
    Columns(Vec<String>),
}

impl From<&str> for SelectArg {
    fn from(raw: &str) -> Self {
        Self::Raw(raw.to_string())
    }
}

impl From<String> for SelectArg {
    fn from(raw: String) -> Self {
        Self::Raw(raw)
    }
}

impl From<Vec<&str>> for SelectArg {
    fn from(columns: Vec<&str>) -> Self {
        Self::Columns(columns.into_iter().map(str::to_string).collect())
    }
}

impl From<Vec<String>> for SelectArg {
    fn from(columns: Vec<String>) -> Self {
        Self::Columns(columns)
    }
}

impl From<&[&str]> for SelectArg {
    fn from(columns: &[&str]) -> Self {
        Self::Columns(columns.iter().map(|c| c.to_string()).collect())
    }
}

impl<const N: usize> From<[&str; N]> for SelectArg {
    fn from(columns: [&str; N]) -> Self {
        Self::Columns(columns.iter().map(|c| c.to_string()).collect())
    }
}

/// Argument of [`filter`](super::StatementBuilder::filter).
#[derive(Debug, Clone, PartialEq)]
pub enum WhereArg {
    /// A `?` template and its values.
    Raw(String, Vec<Value>),
    /// Column-keyed predicate; keys may carry an operator suffix (`"age >"`).
    Predicate(Row),
}

impl WhereArg {
    /// ```ignore
    /// qb.filter(WhereArg::raw("name = ? AND age > ?", ["foo".into(), 15.into()]));
    /// ```
    pub fn raw<I, V>(template: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        Self::Raw(template.into(), values.into_iter().map(Into::into).collect())
    }
}

impl From<Row> for WhereArg {
    fn from(row: Row) -> Self {
        Self::Predicate(row)
    }
}

impl From<&str> for WhereArg {
    fn from(raw: &str) -> Self {
        Self::Raw(raw.to_string(), Vec::new())
    }
}

impl From<String> for WhereArg {
    fn from(raw: String) -> Self {
        Self::Raw(raw, Vec::new())
    }
}

impl<V: Into<Value>> From<(&str, Vec<V>)> for WhereArg {
    fn from((template, values): (&str, Vec<V>)) -> Self {
        Self::raw(template, values)
    }
}

/// Argument of [`set`](super::StatementBuilder::set).
#[derive(Debug, Clone, PartialEq)]
pub enum SetArg {
    Raw(String, Vec<Value>),
    /// Column → value; columns outside the schema are dropped.
    Fields(Row),
}

impl SetArg {
    pub fn raw<I, V>(template: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        Self::Raw(template.into(), values.into_iter().map(Into::into).collect())
    }
}

impl From<Row> for SetArg {
    fn from(row: Row) -> Self {
        Self::Fields(row)
    }
}

impl From<&str> for SetArg {
    fn from(raw: &str) -> Self {
        Self::Raw(raw.to_string(), Vec::new())
    }
}

impl<V: Into<Value>> From<(&str, Vec<V>)> for SetArg {
    fn from((template, values): (&str, Vec<V>)) -> Self {
        Self::raw(template, values)
    }
}

/// Argument of [`insert`](super::StatementBuilder::insert).
#[derive(Debug, Clone, PartialEq)]
pub enum InsertArg {
    Row(Row),
    /// Several rows sharing the columns of the first one.
    Rows(Vec<Row>),
    /// `(columns) VALUES (values)` with the column list used verbatim.
    Raw { columns: String, values: Vec<Value> },
}

impl InsertArg {
    pub fn raw<I, V>(columns: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        Self::Raw {
            columns: columns.into(),
            values: values.into_iter().map(Into::into).collect(),
        }
    }
}

impl From<Row> for InsertArg {
    fn from(row: Row) -> Self {
        Self::Row(row)
    }
}

impl From<Vec<Row>> for InsertArg {
    fn from(rows: Vec<Row>) -> Self {
        Self::Rows(rows)
    }
}

/// Argument of [`order`](super::StatementBuilder::order).
#[derive(Debug, Clone, PartialEq)]
pub enum OrderArg {
    /// ORDER BY text used verbatim.
    Raw(String),
    /// Column names, `-name` for descending.
    Columns(Vec<String>),
}

impl From<&str> for OrderArg {
    fn from(raw: &str) -> Self {
        Self::Raw(raw.to_string())
    }
}

impl From<String> for OrderArg {
    fn from(raw: String) -> Self {
        Self::Raw(raw)
    }
}

impl From<Vec<&str>> for OrderArg {
    fn from(columns: Vec<&str>) -> Self {
        Self::Columns(columns.into_iter().map(str::to_string).collect())
    }
}

impl From<Vec<String>> for OrderArg {
    fn from(columns: Vec<String>) -> Self {
        Self::Columns(columns)
    }
}

impl<const N: usize> From<[&str; N]> for OrderArg {
    fn from(columns: [&str; N]) -> Self {
        Self::Columns(columns.iter().map(|c| c.to_string()).collect())
    }
}

/// A raw statement: fragments joined by a space, then formatted with `values`.
///
/// ```ignore
/// let raw = RawSql::new("SELECT 1").push("FROM foo").push("WHERE id = ?").bind(1);
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawSql {
    pub fragments: Vec<String>,
    pub values: Vec<Value>,
}

impl RawSql {
    pub fn new(fragment: impl Into<String>) -> Self {
        Self {
            fragments: vec![fragment.into()],
            values: Vec::new(),
        }
    }

    /// Append a fragment.
    pub fn push(mut self, fragment: impl Into<String>) -> Self {
        self.fragments.push(fragment.into());
        self
    }

    /// Append a value for the next `?`.
    pub fn bind(mut self, value: impl Into<Value>) -> Self {
        self.values.push(value.into());
        self
    }

    pub(crate) fn text(&self) -> String {
        self.fragments.join(" ")
    }
}

impl From<&str> for RawSql {
    fn from(text: &str) -> Self {
        Self::new(text)
    }
}

impl From<String> for RawSql {
    fn from(text: String) -> Self {
        Self::new(text)
    }
}

impl<V: Into<Value>> From<(&str, Vec<V>)> for RawSql {
    fn from((text, values): (&str, Vec<V>)) -> Self {
        Self {
            fragments: vec![text.to_string()],
            values: values.into_iter().map(Into::into).collect(),
        }
    }
}

impl From<Vec<&str>> for RawSql {
    fn from(fragments: Vec<&str>) -> Self {
        Self {
            fragments: fragments.into_iter().map(str::to_string).collect(),
            values: Vec::new(),
        }
    }
}
