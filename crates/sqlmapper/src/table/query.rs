use super::Mapper;
use crate::client::{Connection, ExecResult};
use crate::error::{MapperError, MapperResult};
use crate::monitor::QueryContext;
use crate::relation::{Customize, DeferredLoad, resolve};
use crate::row::Row;
use crate::schema::TableSchema;
use crate::statement::{
    InsertArg, OrderArg, RawSql, SelectArg, SetArg, Slot, StatementBuilder, StatementKind, WhereArg,
};
use crate::value::Value;
use serde::de::DeserializeOwned;
use std::fmt;
use std::sync::Arc;

/// Generate chainable `Query` methods that forward to the inner builder.
macro_rules! delegate_to_builder {
    ($( $(#[$meta:meta])* fn $name:ident($($arg:ident: $ty:ty),*); )*) => {
        $(
            $(#[$meta])*
            pub fn $name(&mut self $(, $arg: $ty)*) -> &mut Self {
                self.builder.$name($($arg),*);
                self
            }
        )*
    };
}

/// A statement bound to a mapper session: builder, queued relation loads and
/// the terminal calls that execute it.
pub struct Query<C> {
    mapper: Mapper<C>,
    builder: StatementBuilder,
    loads: Vec<DeferredLoad<C>>,
    tag: Option<String>,
}

impl<C> fmt::Debug for Query<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Query")
            .field("builder", &self.builder)
            .field("loads", &self.loads)
            .field("tag", &self.tag)
            .finish_non_exhaustive()
    }
}

impl<C: Connection + 'static> Query<C> {
    pub fn new(mapper: Mapper<C>, schema: Arc<TableSchema>) -> Self {
        let strict = mapper.config().strict;
        Self {
            mapper,
            builder: StatementBuilder::new(schema, strict),
            loads: Vec::new(),
            tag: None,
        }
    }

    pub fn builder(&self) -> &StatementBuilder {
        &self.builder
    }

    pub fn builder_mut(&mut self) -> &mut StatementBuilder {
        &mut self.builder
    }

    pub fn schema(&self) -> &Arc<TableSchema> {
        self.builder.schema()
    }

    pub fn statement_kind(&self) -> StatementKind {
        self.builder.statement_kind()
    }

    pub fn is_pristine(&self) -> bool {
        self.builder.is_pristine()
    }

    /// Tag reported to hooks with every statement of this query.
    pub fn set_tag(&mut self, tag: impl Into<String>) -> &mut Self {
        self.tag = Some(tag.into());
        self
    }

    delegate_to_builder! {
        /// See [`StatementBuilder::select`].
        fn select(arg: impl Into<SelectArg>);
        fn select_all();
        fn update();
        fn delete();
        fn truncate();
        fn insert(arg: impl Into<InsertArg>);
        fn sql(raw: impl Into<RawSql>);
        fn from(raw: impl Into<String>);
        /// See [`StatementBuilder::filter`].
        fn filter(arg: impl Into<WhereArg>);
        fn id(value: impl Into<Value>);
        fn set(arg: impl Into<SetArg>);
        fn limit(n: u64);
        fn offset(n: u64);
        fn order(arg: impl Into<OrderArg>);
        fn page(page_index: u64, page_size: u64);
        fn reset();
    }

    pub fn get_buffer(&self, slot: Slot) -> Option<&str> {
        self.builder.get_buffer(slot)
    }

    pub fn set_buffer(&mut self, slot: Slot, template: &str, values: &[Value]) -> &mut Self {
        self.builder.set_buffer(slot, template, values);
        self
    }

    pub fn is_changed_buffer(&self, slot: Slot) -> bool {
        self.builder.is_changed_buffer(slot)
    }

    pub fn to_sql(&mut self) -> MapperResult<String> {
        self.builder.to_sql()
    }

    pub fn peek_sql(&self) -> MapperResult<String> {
        self.builder.peek_sql()
    }

    // ==================== Relation loads ====================

    /// Queue a relation load, resolved after the rows are fetched.
    pub fn load(&mut self, relation: impl Into<String>) -> &mut Self {
        self.loads.push(DeferredLoad::new(relation, None));
        self
    }

    /// Queue a relation load with a customized sub-query.
    pub fn load_with(&mut self, relation: impl Into<String>, customize: Customize<C>) -> &mut Self {
        self.loads.push(DeferredLoad::new(relation, Some(customize)));
        self
    }

    /// Names of the queued loads.
    pub fn pending_loads(&self) -> impl Iterator<Item = &str> {
        self.loads.iter().map(|l| l.relation.as_str())
    }

    fn context(&self, sql: &str) -> QueryContext {
        let ctx = QueryContext::new(sql).with_table(self.builder.table_name());
        match &self.tag {
            Some(tag) => ctx.with_tag(tag.clone()),
            None => ctx,
        }
    }

    // ==================== Terminals ====================

    /// Execute a mutation.
    ///
    /// Mutations return no rows to attach relations to, so queued loads are an
    /// error: `UnknownRelation` for undeclared names, `Validation` otherwise.
    pub async fn exec(&mut self) -> MapperResult<ExecResult> {
        let loads = std::mem::take(&mut self.loads);
        if let Err(err) = self.check_loads(&loads).and_then(|()| reject_loads(&loads)) {
            self.builder.reset();
            return Err(err);
        }
        let sql = self.builder.to_sql()?;
        self.mapper.run(self.context(&sql)).await?.into_exec_result()
    }

    /// Fetch all rows and resolve queued loads on them.
    pub async fn all(&mut self) -> MapperResult<Vec<Row>> {
        let loads = std::mem::take(&mut self.loads);
        let schema = Arc::clone(self.builder.schema());
        if let Err(err) = self.check_loads(&loads) {
            self.builder.reset();
            return Err(err);
        }
        let sql = self.builder.to_sql()?;
        let mut rows = self.mapper.run(self.context(&sql)).await?.into_rows()?;
        resolve(&self.mapper, &schema, loads, &mut rows).await?;
        Ok(rows)
    }

    /// Unknown relations fail before the primary statement is sent.
    fn check_loads(&self, loads: &[DeferredLoad<C>]) -> MapperResult<()> {
        let table = self.builder.table_name();
        for load in loads {
            self.mapper.relation_or_err(table, &load.relation)?;
        }
        Ok(())
    }

    /// Fetch all rows decoded into `T`.
    pub async fn all_as<T: DeserializeOwned>(&mut self) -> MapperResult<Vec<T>> {
        let rows = self.all().await?;
        rows.iter().map(Row::decode).collect()
    }

    /// Fetch at most one row.
    ///
    /// A query with no clauses gets `LIMIT 1`. More than one row is an error
    /// in strict mode and a warning otherwise.
    pub async fn one(&mut self) -> MapperResult<Option<Row>> {
        if self.builder.is_pristine() {
            self.builder.limit(1);
        }
        let rows = self.all().await?;
        if rows.len() > 1 {
            if self.mapper.config().strict {
                return Err(MapperError::too_many_rows(1, rows.len()));
            }
            tracing::warn!(
                target: "sqlmapper.sql",
                table = self.builder.table_name(),
                rows = rows.len(),
                "one() returned more than one row, using the first"
            );
        }
        Ok(rows.into_iter().next())
    }

    /// Fetch at most one row decoded into `T`.
    pub async fn one_as<T: DeserializeOwned>(&mut self) -> MapperResult<Option<T>> {
        self.one().await?.as_ref().map(Row::decode).transpose()
    }

    /// First column of the first row.
    pub async fn scalar(&mut self) -> MapperResult<Option<Value>> {
        let rows = self.all().await?;
        Ok(rows.into_iter().next().and_then(|row| row.into_iter().next()).map(|(_, v)| v))
    }

    /// `count(*)` over the current filter.
    pub async fn count(&mut self) -> MapperResult<u64> {
        self.builder
            .replace_buffer(Slot::Select, "count(*) AS N".to_string());
        let value = self.scalar().await?;
        match value {
            None | Some(Value::Null) => Ok(0),
            Some(Value::Int(n)) => Ok(u64::try_from(n).unwrap_or(0)),
            Some(Value::Text(s)) => s
                .parse()
                .map_err(|_| MapperError::decode("N", format!("not a count: {s}"))),
            Some(other) => Err(MapperError::decode("N", format!("not a count: {other:?}"))),
        }
    }

    /// Resolve the queued loads on rows fetched elsewhere.
    pub async fn load_into(&mut self, rows: &mut [Row]) -> MapperResult<()> {
        let loads = std::mem::take(&mut self.loads);
        self.check_loads(&loads)?;
        let schema = Arc::clone(self.builder.schema());
        resolve(&self.mapper, &schema, loads, rows).await
    }
}

fn reject_loads<C>(loads: &[DeferredLoad<C>]) -> MapperResult<()> {
    match loads.first() {
        Some(load) => Err(MapperError::validation(format!(
            "relation '{}' cannot be loaded by a statement that returns no rows",
            load.relation
        ))),
        None => Ok(()),
    }
}
