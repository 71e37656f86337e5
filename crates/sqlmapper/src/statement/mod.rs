//! Stateful SQL statement builder.
//!
//! A [`StatementBuilder`] holds one statement at a time. Clause calls fill its
//! slots, [`to_sql`](StatementBuilder::to_sql) renders the text and resets the
//! builder to a fresh `SELECT *`, so one builder can be reused for many
//! statements.
//!
//! ```ignore
//! let mut qb = StatementBuilder::new(schema, false);
//! qb.filter(row! { "name" => "foo", "age >" => 15 }).order(["-age", "name"]).limit(10);
//! assert_eq!(
//!     qb.to_sql()?,
//!     "SELECT * FROM `users` WHERE `name` = 'foo' AND `age` > 15 ORDER BY `age` DESC,`name` LIMIT 10;"
//! );
//! ```
//!
//! Failures do not interrupt the chain. The first one is kept and returned by
//! the next `to_sql`/`peek_sql`.

mod args;
mod predicate;


pub use args::{InsertArg, OrderArg, RawSql, SelectArg, SetArg, WhereArg};

use crate::error::{MapperError, MapperResult};
use crate::escape::{escape, format};
use crate::row::Row;
use crate::schema::TableSchema;
use crate::value::Value;
use predicate::{accepts_value, build_expression, is_known_operator, split_key};
use std::fmt;
use std::sync::Arc;

/// A clause slot of a statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Slot {
    Select,
    /// FROM for SELECT/DELETE, the target table for UPDATE.
    From,
    Where,
    Set,
    OrderBy,
    Limit,
    Offset,
    /// Body of an INSERT: `(columns) VALUES (...)`.
    Values,
    /// Text of a raw statement.
    Text,
}

impl Slot {
    fn bit(self) -> u16 {
        1 << (self as u16)
    }

    pub fn keyword(self) -> &'static str {
        match self {
            Slot::Select => "SELECT",
            Slot::From => "FROM",
            Slot::Where => "WHERE",
            Slot::Set => "SET",
            Slot::OrderBy => "ORDER BY",
            Slot::Limit => "LIMIT",
            Slot::Offset => "OFFSET",
            Slot::Values => "VALUES",
            Slot::Text => "SQL",
        }
    }
}

/// Kind of the active statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatementKind {
    Select,
    Insert,
    Update,
    Delete,
    Truncate,
    Raw,
}

impl StatementKind {
    pub fn as_str(self) -> &'static str {
        match self {
            StatementKind::Select => "SELECT",
            StatementKind::Insert => "INSERT",
            StatementKind::Update => "UPDATE",
            StatementKind::Delete => "DELETE",
            StatementKind::Truncate => "TRUNCATE",
            StatementKind::Raw => "raw SQL",
        }
    }
}

impl fmt::Display for StatementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Clause fragments of the active statement, stored without their keywords.
#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    Select {
        select: Option<String>,
        from: Option<String>,
        filter: Option<String>,
        order_by: Option<String>,
        limit: Option<String>,
        offset: Option<String>,
    },
    Insert {
        values: Option<String>,
    },
    Update {
        target: Option<String>,
        set: Option<String>,
        filter: Option<String>,
    },
    Delete {
        from: Option<String>,
        filter: Option<String>,
    },
    Truncate,
    Raw {
        text: Option<String>,
    },
}

impl Statement {
    fn select(table: &str) -> Self {
        Statement::Select {
            select: Some("*".to_string()),
            from: Some(table.to_string()),
            filter: None,
            order_by: None,
            limit: None,
            offset: None,
        }
    }

    pub fn kind(&self) -> StatementKind {
        match self {
            Statement::Select { .. } => StatementKind::Select,
            Statement::Insert { .. } => StatementKind::Insert,
            Statement::Update { .. } => StatementKind::Update,
            Statement::Delete { .. } => StatementKind::Delete,
            Statement::Truncate => StatementKind::Truncate,
            Statement::Raw { .. } => StatementKind::Raw,
        }
    }

    fn slot(&self, slot: Slot) -> Option<&Option<String>> {
        match (self, slot) {
            (Statement::Select { select, .. }, Slot::Select) => Some(select),
            (Statement::Select { from, .. }, Slot::From) => Some(from),
            (Statement::Select { filter, .. }, Slot::Where) => Some(filter),
            (Statement::Select { order_by, .. }, Slot::OrderBy) => Some(order_by),
            (Statement::Select { limit, .. }, Slot::Limit) => Some(limit),
            (Statement::Select { offset, .. }, Slot::Offset) => Some(offset),
            (Statement::Insert { values }, Slot::Values) => Some(values),
            (Statement::Update { target, .. }, Slot::From) => Some(target),
            (Statement::Update { set, .. }, Slot::Set) => Some(set),
            (Statement::Update { filter, .. }, Slot::Where) => Some(filter),
            (Statement::Delete { from, .. }, Slot::From) => Some(from),
            (Statement::Delete { filter, .. }, Slot::Where) => Some(filter),
            (Statement::Raw { text }, Slot::Text) => Some(text),
            _ => None,
        }
    }

    fn slot_mut(&mut self, slot: Slot) -> Option<&mut Option<String>> {
        match (self, slot) {
            (Statement::Select { select, .. }, Slot::Select) => Some(select),
            (Statement::Select { from, .. }, Slot::From) => Some(from),
            (Statement::Select { filter, .. }, Slot::Where) => Some(filter),
            (Statement::Select { order_by, .. }, Slot::OrderBy) => Some(order_by),
            (Statement::Select { limit, .. }, Slot::Limit) => Some(limit),
            (Statement::Select { offset, .. }, Slot::Offset) => Some(offset),
            (Statement::Insert { values }, Slot::Values) => Some(values),
            (Statement::Update { target, .. }, Slot::From) => Some(target),
            (Statement::Update { set, .. }, Slot::Set) => Some(set),
            (Statement::Update { filter, .. }, Slot::Where) => Some(filter),
            (Statement::Delete { from, .. }, Slot::From) => Some(from),
            (Statement::Delete { filter, .. }, Slot::Where) => Some(filter),
            (Statement::Raw { text }, Slot::Text) => Some(text),
            _ => None,
        }
    }

    fn render(&self, table: &str) -> MapperResult<String> {
        fn clause(parts: &mut Vec<String>, keyword: &str, fragment: &Option<String>) {
            if let Some(text) = fragment.as_deref().filter(|s| !s.is_empty()) {
                parts.push(format!("{keyword} {text}"));
            }
        }

        let mut parts = Vec::new();
        match self {
            Statement::Select {
                select,
                from,
                filter,
                order_by,
                limit,
                offset,
            } => {
                parts.push(format!("SELECT {}", select.as_deref().unwrap_or("*")));
                parts.push(format!("FROM {}", from.as_deref().unwrap_or(table)));
                clause(&mut parts, "WHERE", filter);
                clause(&mut parts, "ORDER BY", order_by);
                clause(&mut parts, "LIMIT", limit);
                clause(&mut parts, "OFFSET", offset);
            }
            Statement::Insert { values } => {
                let body = values
                    .as_deref()
                    .ok_or_else(|| MapperError::validation("INSERT without values"))?;
                parts.push(format!("INSERT INTO {table}{body}"));
            }
            Statement::Update {
                target,
                set,
                filter,
            } => {
                let set = set
                    .as_deref()
                    .filter(|s| !s.is_empty())
                    .ok_or_else(|| MapperError::validation("UPDATE without SET"))?;
                parts.push(format!("UPDATE {}", target.as_deref().unwrap_or(table)));
                parts.push(format!("SET {set}"));
                clause(&mut parts, "WHERE", filter);
            }
            Statement::Delete { from, filter } => {
                parts.push("DELETE".to_string());
                parts.push(format!("FROM {}", from.as_deref().unwrap_or(table)));
                clause(&mut parts, "WHERE", filter);
            }
            Statement::Truncate => parts.push(format!("TRUNCATE {table}")),
            Statement::Raw { text } => return Ok(text.clone().unwrap_or_default()),
        }

        let mut sql = parts.join(" ");
        sql.push(';');
        Ok(sql)
    }
}

/// Builds SQL text for one table.
///
/// Not generic over the connection: a builder is a pure in-memory object and
/// never performs I/O. [`Query`](crate::Query) wraps one for execution.
#[derive(Debug, Clone)]
pub struct StatementBuilder {
    schema: Arc<TableSchema>,
    strict: bool,
    qualify: bool,
    statement: Statement,
    changed: u16,
    pristine: bool,
    error: Option<MapperError>,
}

impl StatementBuilder {
    pub fn new(schema: Arc<TableSchema>, strict: bool) -> Self {
        let statement = Statement::select(schema.escaped_name());
        Self {
            schema,
            strict,
            qualify: false,
            statement,
            changed: 0,
            pristine: true,
            error: None,
        }
    }

    pub fn schema(&self) -> &Arc<TableSchema> {
        &self.schema
    }

    pub fn table_name(&self) -> &str {
        self.schema.name()
    }

    pub fn is_strict(&self) -> bool {
        self.strict
    }

    /// Render schema columns in select lists, predicates and ORDER BY as
    /// `` `table`.`column` ``. Survives [`reset`](Self::reset).
    pub fn qualify_columns(&mut self, qualify: bool) -> &mut Self {
        self.qualify = qualify;
        self
    }

    pub fn is_qualified(&self) -> bool {
        self.qualify
    }

    pub fn statement(&self) -> &Statement {
        &self.statement
    }

    pub fn statement_kind(&self) -> StatementKind {
        self.statement.kind()
    }

    /// True for a fresh `SELECT *` that no clause call has touched.
    pub fn is_pristine(&self) -> bool {
        self.pristine
    }

    /// The deferred error, if a clause call has failed.
    pub fn error(&self) -> Option<&MapperError> {
        self.error.as_ref()
    }

    /// Back to a pristine `SELECT *`, dropping any deferred error.
    pub fn reset(&mut self) -> &mut Self {
        self.statement = Statement::select(self.schema.escaped_name());
        self.changed = 0;
        self.pristine = true;
        self.error = None;
        self
    }

    fn fail(&mut self, err: MapperError) {
        if self.error.is_none() {
            self.error = Some(err);
        }
    }

    fn begin(&mut self, statement: Statement) {
        self.statement = statement;
        self.changed = 0;
        self.pristine = false;
    }

    /// Write a fragment into a slot of the active statement.
    ///
    /// A pristine builder turns into an UPDATE on `Set`; any other slot that the
    /// active kind lacks records an `InvalidClause` error.
    fn write(&mut self, slot: Slot, fragment: Option<String>, mark_changed: bool) {
        if self.pristine && slot == Slot::Set {
            self.update();
        }
        self.pristine = false;

        let kind = self.statement.kind();
        match self.statement.slot_mut(slot) {
            Some(target) => {
                *target = fragment;
                if mark_changed {
                    self.changed |= slot.bit();
                }
            }
            None => self.fail(MapperError::InvalidClause {
                clause: slot.keyword(),
                statement: kind.as_str(),
            }),
        }
    }

    /// Validate a column name against the schema, returning its escaped form.
    fn column(&mut self, name: &str) -> Option<String> {
        match self.schema.escaped_column(name) {
            Some(escaped) => Some(escaped.to_string()),
            None => {
                if self.strict {
                    let table = self.schema.name().to_string();
                    self.fail(MapperError::invalid_column(table, name));
                }
                None
            }
        }
    }

    /// Like [`column`](Self::column), qualified with the table name when enabled.
    fn column_ref(&mut self, name: &str) -> Option<String> {
        let escaped = self.column(name)?;
        if self.qualify {
            Some(format!("{}.{escaped}", self.schema.escaped_name()))
        } else {
            Some(escaped)
        }
    }

    /// Columns of `row` present in the schema, in row order.
    fn valid_fields(&mut self, row: &Row) -> Vec<(String, String)> {
        let mut fields = Vec::with_capacity(row.len());
        for key in row.keys() {
            if let Some(escaped) = self.column(key) {
                fields.push((key.to_string(), escaped));
            }
        }
        fields
    }

    // ==================== Verbs ====================

    /// Start a SELECT.
    pub fn select(&mut self, arg: impl Into<SelectArg>) -> &mut Self {
        self.begin(Statement::select(self.schema.escaped_name()));
        let list = match arg.into() {
            SelectArg::All => return self,
            SelectArg::Raw(raw) => {
                if raw.trim().is_empty() {
                    self.fail(MapperError::EmptySelect);
                    return self;
                }
                raw
            }
            SelectArg::Columns(columns) => {
                let escaped = columns
                    .iter()
                    .filter_map(|c| self.column_ref(c))
                    .collect::<Vec<_>>();
                if escaped.is_empty() {
                    return self;
                }
                escaped.join(",")
            }
        };
        self.write(Slot::Select, Some(list), true);
        self
    }

    /// Start a `SELECT *`.
    pub fn select_all(&mut self) -> &mut Self {
        self.select(SelectArg::All)
    }

    /// Start an UPDATE.
    pub fn update(&mut self) -> &mut Self {
        self.begin(Statement::Update {
            target: Some(self.schema.escaped_name().to_string()),
            set: None,
            filter: None,
        });
        self
    }

    /// Start a DELETE.
    pub fn delete(&mut self) -> &mut Self {
        self.begin(Statement::Delete {
            from: Some(self.schema.escaped_name().to_string()),
            filter: None,
        });
        self
    }

    /// `TRUNCATE <table>;`
    pub fn truncate(&mut self) -> &mut Self {
        self.begin(Statement::Truncate);
        self
    }

    /// Start an INSERT.
    pub fn insert(&mut self, arg: impl Into<InsertArg>) -> &mut Self {
        self.begin(Statement::Insert { values: None });
        let body = match arg.into() {
            InsertArg::Row(row) => self.insert_rows(std::slice::from_ref(&row)),
            InsertArg::Rows(rows) => self.insert_rows(&rows),
            InsertArg::Raw { columns, values } => Some(format!(
                "({columns}) VALUES ({})",
                escape(&Value::List(values))
            )),
        };
        if let Some(body) = body {
            self.write(Slot::Values, Some(body), true);
        }
        self
    }

    fn insert_rows(&mut self, rows: &[Row]) -> Option<String> {
        let Some(first) = rows.first() else {
            self.fail(MapperError::validation("INSERT with an empty row list"));
            return None;
        };
        let fields = self.valid_fields(first);
        if fields.is_empty() {
            let table = self.schema.name().to_string();
            self.fail(MapperError::validation(format!(
                "INSERT without any column of table '{table}'"
            )));
            return None;
        }

        let columns = fields
            .iter()
            .map(|(_, escaped)| escaped.as_str())
            .collect::<Vec<_>>()
            .join(", ");
        let tuples = rows
            .iter()
            .map(|row| {
                let values = fields
                    .iter()
                    .map(|(name, _)| escape(row.get(name).unwrap_or(&Value::Null)))
                    .collect::<Vec<_>>()
                    .join(", ");
                format!("({values})")
            })
            .collect::<Vec<_>>()
            .join(", ");
        Some(format!("({columns}) VALUES {tuples}"))
    }

    /// Raw statement: fragments joined by a space, formatted with the values.
    /// Rendered verbatim, without a terminator.
    pub fn sql(&mut self, raw: impl Into<RawSql>) -> &mut Self {
        let raw = raw.into();
        self.begin(Statement::Raw { text: None });
        match format(&raw.text(), &raw.values) {
            Ok(text) => self.write(Slot::Text, Some(text), true),
            Err(err) => self.fail(err),
        }
        self
    }

    // ==================== Clauses ====================

    /// Override FROM (or the UPDATE target) with raw text.
    pub fn from(&mut self, raw: impl Into<String>) -> &mut Self {
        self.write(Slot::From, Some(raw.into()), true);
        self
    }

    /// Set the WHERE clause, replacing any previous one.
    ///
    /// A predicate row whose keys all turn out invalid renders `1=0` (strict
    /// mode: [`MapperError::EmptyPredicate`]).
    pub fn filter(&mut self, arg: impl Into<WhereArg>) -> &mut Self {
        let fragment = match arg.into() {
            WhereArg::Raw(template, values) => match format(&template, &values) {
                Ok(text) => Some(text),
                Err(err) => {
                    self.fail(err);
                    None
                }
            },
            WhereArg::Predicate(row) => self.predicate(&row),
        };
        if let Some(fragment) = fragment {
            self.write(Slot::Where, Some(fragment), true);
        } else {
            self.pristine = false;
        }
        self
    }

    fn predicate(&mut self, row: &Row) -> Option<String> {
        let mut expressions = Vec::with_capacity(row.len());
        for (key, value) in row.iter() {
            let (name, op) = split_key(key);
            let Some(column) = self.column_ref(name) else {
                continue;
            };
            if let Some(op) = op {
                if !is_known_operator(op) || !accepts_value(op, value) {
                    if self.strict {
                        self.fail(MapperError::InvalidOperator {
                            column: name.to_string(),
                            operator: op.to_string(),
                        });
                    }
                    continue;
                }
            }
            expressions.push(build_expression(&column, op, value));
        }

        if !expressions.is_empty() {
            return Some(expressions.join(" AND "));
        }
        if self.strict {
            let table = self.schema.name().to_string();
            self.fail(MapperError::EmptyPredicate { table });
            return None;
        }
        Some("1=0".to_string())
    }

    /// `filter(primary key = value)`, or `IN (...)` for a list.
    pub fn id(&mut self, value: impl Into<Value>) -> &mut Self {
        let mut row = Row::with_capacity(1);
        row.insert(self.schema.primary_key(), value.into());
        self.filter(row)
    }

    /// Set the SET clause of an UPDATE. A pristine builder becomes an UPDATE.
    pub fn set(&mut self, arg: impl Into<SetArg>) -> &mut Self {
        let fragment = match arg.into() {
            SetArg::Raw(template, values) => match format(&template, &values) {
                Ok(text) => Some(text),
                Err(err) => {
                    self.fail(err);
                    None
                }
            },
            SetArg::Fields(row) => {
                let fields = self.valid_fields(&row);
                if fields.is_empty() {
                    let table = self.schema.name().to_string();
                    self.fail(MapperError::validation(format!(
                        "SET without any column of table '{table}'"
                    )));
                    None
                } else {
                    Some(
                        fields
                            .iter()
                            .map(|(name, escaped)| {
                                format!("{escaped} = {}", escape(row.get(name).unwrap_or(&Value::Null)))
                            })
                            .collect::<Vec<_>>()
                            .join(", "),
                    )
                }
            }
        };
        if let Some(fragment) = fragment {
            self.write(Slot::Set, Some(fragment), true);
        } else if self.pristine {
            self.update();
        }
        self
    }

    pub fn limit(&mut self, n: u64) -> &mut Self {
        self.write(Slot::Limit, Some(n.to_string()), true);
        self
    }

    pub fn offset(&mut self, n: u64) -> &mut Self {
        self.write(Slot::Offset, Some(n.to_string()), true);
        self
    }

    /// Set ORDER BY. Column lists take `-name` for descending; schema columns
    /// are escaped, anything else is kept as written.
    pub fn order(&mut self, arg: impl Into<OrderArg>) -> &mut Self {
        let fragment = match arg.into() {
            OrderArg::Raw(raw) => raw,
            OrderArg::Columns(columns) => columns
                .iter()
                .map(|entry| {
                    let (name, desc) = match entry.strip_prefix('-') {
                        Some(name) => (name, true),
                        None => (entry.as_str(), false),
                    };
                    let column = match self.schema.escaped_column(name) {
                        Some(_) if self.qualify => self.schema.qualified(name),
                        Some(escaped) => escaped.to_string(),
                        None => name.to_string(),
                    };
                    if desc {
                        format!("{column} DESC")
                    } else {
                        column
                    }
                })
                .collect::<Vec<_>>()
                .join(","),
        };
        self.write(Slot::OrderBy, Some(fragment), true);
        self
    }

    /// Zero-based paging: `LIMIT page_index * page_size, page_size`. Clears OFFSET.
    pub fn page(&mut self, page_index: u64, page_size: u64) -> &mut Self {
        let start = page_index.saturating_mul(page_size);
        self.write(Slot::Limit, Some(format!("{start}, {page_size}")), true);
        self.write(Slot::Offset, None, true);
        self
    }

    // ==================== Introspection ====================

    /// Fragment of a slot, without its keyword.
    pub fn get_buffer(&self, slot: Slot) -> Option<&str> {
        self.statement.slot(slot).and_then(|s| s.as_deref())
    }

    /// Overwrite a slot with a formatted template.
    pub fn set_buffer(&mut self, slot: Slot, template: &str, values: &[Value]) -> &mut Self {
        match format(template, values) {
            Ok(text) => self.write(slot, Some(text), true),
            Err(err) => self.fail(err),
        }
        self
    }

    /// Overwrite a slot without marking it as set by the caller.
    pub(crate) fn replace_buffer(&mut self, slot: Slot, fragment: String) -> &mut Self {
        self.write(slot, Some(fragment), false);
        self
    }

    /// Whether the caller explicitly set `slot` since the last verb.
    pub fn is_changed_buffer(&self, slot: Slot) -> bool {
        self.changed & slot.bit() != 0
    }


    // ==================== Rendering ====================

    fn render(&self) -> MapperResult<String> {
        if let Some(err) = &self.error {
            return Err(err.clone());
        }
        if self.strict {
            let missing_where = match &self.statement {
                Statement::Update { filter, .. } | Statement::Delete { filter, .. } => {
                    filter.as_deref().is_none_or(str::is_empty)
                }
                _ => false,
            };
            if missing_where {
                return Err(MapperError::MissingWhere {
                    table: self.schema.name().to_string(),
                    statement: self.statement.kind().as_str(),
                });
            }
        }
        self.statement.render(self.schema.escaped_name())
    }

    /// Render the statement and reset to a pristine `SELECT *`, also on error.
    pub fn to_sql(&mut self) -> MapperResult<String> {
        let sql = self.render();
        self.reset();
        sql
    }

    /// Render the statement without resetting.
    pub fn peek_sql(&self) -> MapperResult<String> {
        self.render()
    }
}
