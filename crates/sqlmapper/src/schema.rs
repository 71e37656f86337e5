//! Table metadata and the per-session schema cache.

use crate::client::Connection;
use crate::config::MapperConfig;
use crate::error::{MapperError, MapperResult};
use crate::escape::{escape, escape_identifier};
use crate::row::Row;
use crate::value::Value;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

/// One row of the information query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnInfo {
    pub column_name: String,
    pub is_nullable: bool,
    pub data_type: String,
    pub character_maximum_length: Option<i64>,
    pub column_default: Option<String>,
    /// `PRI`, `UNI`, `MUL` or empty.
    pub column_key: String,
}

fn text_column(row: &Row, column: &str) -> MapperResult<Option<String>> {
    match row.try_get(column)? {
        Value::Null => Ok(None),
        Value::Text(s) => Ok(Some(s.clone())),
        Value::Int(i) => Ok(Some(i.to_string())),
        other => Err(MapperError::decode(
            column,
            format!("expected text, got {other:?}"),
        )),
    }
}

impl ColumnInfo {
    /// A minimal column description for schemas declared in code.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            column_name: name.into(),
            is_nullable: true,
            data_type: String::new(),
            character_maximum_length: None,
            column_default: None,
            column_key: String::new(),
        }
    }

    /// Decode an information-query row.
    pub fn from_row(row: &Row) -> MapperResult<Self> {
        let column_name = text_column(row, "column_name")?
            .ok_or_else(|| MapperError::decode("column_name", "unexpected NULL"))?;
        let is_nullable = match row.get("is_nullable") {
            Some(Value::Text(s)) => s.eq_ignore_ascii_case("YES"),
            Some(v) => v.as_bool().unwrap_or(false),
            None => false,
        };
        let character_maximum_length = match row.get("character_maximum_length") {
            None | Some(Value::Null) => None,
            Some(Value::Int(i)) => Some(*i),
            Some(Value::Text(s)) => s.parse().ok(),
            Some(other) => {
                return Err(MapperError::decode(
                    "character_maximum_length",
                    format!("expected integer, got {other:?}"),
                ));
            }
        };

        Ok(Self {
            column_name,
            is_nullable,
            data_type: text_column(row, "data_type")?.unwrap_or_default(),
            character_maximum_length,
            column_default: match row.get("column_default") {
                Some(_) => text_column(row, "column_default")?,
                None => None,
            },
            column_key: match row.get("column_key") {
                Some(_) => text_column(row, "column_key")?.unwrap_or_default(),
                None => String::new(),
            },
        })
    }

    pub fn is_primary_key(&self) -> bool {
        self.column_key == "PRI"
    }
}

/// Render the information query for `table`.
pub fn information_schema_sql(database: Option<&str>, table: &str) -> String {
    let schema = match database {
        Some(db) => escape(&Value::from(db)),
        None => "DATABASE()".to_string(),
    };
    format!(
        "SELECT column_name AS column_name, is_nullable AS is_nullable, \
         data_type AS data_type, character_maximum_length AS character_maximum_length, \
         column_default AS column_default, column_key AS column_key \
         FROM information_schema.columns \
         WHERE table_schema = {schema} AND table_name = {} \
         ORDER BY ordinal_position;",
        escape(&Value::from(table))
    )
}

/// Column metadata of one table. Immutable once built.
#[derive(Debug, Clone)]
pub struct TableSchema {
    name: String,
    escaped_name: String,
    primary_key: String,
    declared_primary_key: bool,
    columns: Vec<ColumnInfo>,
    escaped: HashMap<String, String>,
}

impl TableSchema {
    /// Declare a schema in code.
    ///
    /// ```ignore
    /// let posts = TableSchema::new("posts", "id", &["id", "title", "body"]);
    /// ```
    pub fn new(table: impl Into<String>, primary_key: impl Into<String>, columns: &[&str]) -> Self {
        let primary_key = primary_key.into();
        let infos = columns
            .iter()
            .map(|name| {
                let mut info = ColumnInfo::named(*name);
                if *name == primary_key {
                    info.column_key = "PRI".to_string();
                    info.is_nullable = false;
                }
                info
            })
            .collect();
        Self::build(table.into(), primary_key, infos)
    }

    /// Build from information-query rows. The `PRI` column wins over `fallback_primary_key`.
    pub fn from_columns(
        table: impl Into<String>,
        columns: Vec<ColumnInfo>,
        fallback_primary_key: &str,
    ) -> MapperResult<Self> {
        let table = table.into();
        if columns.is_empty() {
            return Err(MapperError::UnknownTable(table));
        }
        let primary_key = columns
            .iter()
            .find(|c| c.is_primary_key())
            .map_or_else(|| fallback_primary_key.to_string(), |c| c.column_name.clone());
        Ok(Self::build(table, primary_key, columns))
    }

    fn build(name: String, primary_key: String, columns: Vec<ColumnInfo>) -> Self {
        let escaped = columns
            .iter()
            .map(|c| (c.column_name.clone(), escape_identifier(&c.column_name)))
            .collect();
        let declared_primary_key = columns.iter().any(ColumnInfo::is_primary_key);
        Self {
            escaped_name: escape_identifier(&name),
            name,
            primary_key,
            declared_primary_key,
            columns,
            escaped,
        }
    }

    /// Same table with a different primary key, unless one is declared.
    pub fn with_primary_key(&self, primary_key: &str) -> Self {
        let mut schema = self.clone();
        if !schema.declared_primary_key {
            schema.primary_key = primary_key.to_string();
        }
        schema
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Backtick-quoted table name.
    pub fn escaped_name(&self) -> &str {
        &self.escaped_name
    }

    pub fn primary_key(&self) -> &str {
        &self.primary_key
    }

    pub fn escaped_primary_key(&self) -> String {
        escape_identifier(&self.primary_key)
    }

    /// Whether the table itself declares a primary key (`column_key = 'PRI'`).
    pub fn has_declared_primary_key(&self) -> bool {
        self.declared_primary_key
    }

    pub fn columns(&self) -> &[ColumnInfo] {
        &self.columns
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|c| c.column_name.as_str())
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.escaped.contains_key(name)
    }

    pub fn escaped_column(&self, name: &str) -> Option<&str> {
        self.escaped.get(name).map(String::as_str)
    }

    /// `` `table`.`column` `` for any column name, known or not.
    pub fn qualified(&self, column: &str) -> String {
        match self.escaped_column(column) {
            Some(escaped) => format!("{}.{escaped}", self.escaped_name),
            None => format!("{}.{}", self.escaped_name, escape_identifier(column)),
        }
    }
}

/// Append-only cache of table schemas, keyed by table name.
#[derive(Debug, Default)]
pub struct SchemaCache {
    tables: RwLock<HashMap<String, Arc<TableSchema>>>,
}

impl SchemaCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, table: &str) -> Option<Arc<TableSchema>> {
        self.tables
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(table)
            .cloned()
    }

    /// Register a schema. An existing entry for the same table is kept and returned.
    pub fn insert(&self, schema: TableSchema) -> Arc<TableSchema> {
        let mut tables = self.tables.write().unwrap_or_else(PoisonError::into_inner);
        tables
            .entry(schema.name().to_string())
            .or_insert_with(|| Arc::new(schema))
            .clone()
    }

    pub fn len(&self) -> usize {
        self.tables.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Return the cached schema for `table`, loading it through `conn` on first use.
    pub async fn load<C: Connection>(
        &self,
        conn: &C,
        table: &str,
        config: &MapperConfig,
    ) -> MapperResult<Arc<TableSchema>> {
        if let Some(schema) = self.get(table) {
            tracing::trace!(target: "sqlmapper.schema", table, "schema cache hit");
            return Ok(schema);
        }

        let columns = conn.information_query(table).await?;
        let schema = TableSchema::from_columns(table, columns, &config.default_primary_key)?;
        tracing::debug!(
            target: "sqlmapper.schema",
            table,
            primary_key = schema.primary_key(),
            columns = schema.columns().len(),
            "schema loaded"
        );
        if config.strict && !schema.has_declared_primary_key() {
            tracing::warn!(
                target: "sqlmapper.schema",
                table,
                fallback = schema.primary_key(),
                "table declares no primary key"
            );
        }

        Ok(self.insert(schema))
    }
}
