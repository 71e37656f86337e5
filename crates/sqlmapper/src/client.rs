//! The database collaborator.

use crate::error::{MapperError, MapperResult};
use crate::row::Row;
use crate::schema::{ColumnInfo, information_schema_sql};
use std::future::Future;
use std::sync::Arc;

/// Summary of an INSERT/UPDATE/DELETE/TRUNCATE.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExecResult {
    pub affected_rows: u64,
    /// Auto-increment id of the first inserted row, when the driver reports one.
    pub insert_id: Option<u64>,
}

impl ExecResult {
    pub fn new(affected_rows: u64) -> Self {
        Self {
            affected_rows,
            insert_id: None,
        }
    }

    pub fn with_insert_id(mut self, id: u64) -> Self {
        self.insert_id = Some(id);
        self
    }
}

/// What a statement produced.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryOutput {
    Rows(Vec<Row>),
    Mutation(ExecResult),
}

impl QueryOutput {
    pub fn into_rows(self) -> MapperResult<Vec<Row>> {
        match self {
            Self::Rows(rows) => Ok(rows),
            Self::Mutation(res) => Err(MapperError::UnexpectedOutput(format!(
                "expected rows, got mutation summary ({} affected)",
                res.affected_rows
            ))),
        }
    }

    pub fn into_exec_result(self) -> MapperResult<ExecResult> {
        match self {
            Self::Mutation(res) => Ok(res),
            Self::Rows(rows) => Err(MapperError::UnexpectedOutput(format!(
                "expected a mutation summary, got {} row(s)",
                rows.len()
            ))),
        }
    }
}

impl From<Vec<Row>> for QueryOutput {
    fn from(rows: Vec<Row>) -> Self {
        Self::Rows(rows)
    }
}

impl From<ExecResult> for QueryOutput {
    fn from(res: ExecResult) -> Self {
        Self::Mutation(res)
    }
}

/// A database connection that accepts literal SQL text.
///
/// Implement this for your driver. All statements are fully rendered (values
/// escaped and inlined), so a driver only needs a "run this text" entry point.
pub trait Connection: Send + Sync {
    /// Run a statement.
    fn execute(&self, sql: &str) -> impl Future<Output = MapperResult<QueryOutput>> + Send;

    /// Name of the current database, if known. `None` makes the information
    /// query use `DATABASE()`.
    fn database_name(&self) -> Option<&str> {
        None
    }

    /// Column metadata for `table`, in ordinal order.
    ///
    /// The default implementation queries `information_schema.columns`.
    fn information_query(
        &self,
        table: &str,
    ) -> impl Future<Output = MapperResult<Vec<ColumnInfo>>> + Send {
        async move {
            let sql = information_schema_sql(self.database_name(), table);
            let rows = self.execute(&sql).await?.into_rows()?;
            rows.iter().map(ColumnInfo::from_row).collect()
        }
    }
}

impl<C: Connection> Connection for &C {
    fn execute(&self, sql: &str) -> impl Future<Output = MapperResult<QueryOutput>> + Send {
        (**self).execute(sql)
    }

    fn database_name(&self) -> Option<&str> {
        (**self).database_name()
    }

    fn information_query(
        &self,
        table: &str,
    ) -> impl Future<Output = MapperResult<Vec<ColumnInfo>>> + Send {
        (**self).information_query(table)
    }
}

impl<C: Connection> Connection for Arc<C> {
    fn execute(&self, sql: &str) -> impl Future<Output = MapperResult<QueryOutput>> + Send {
        (**self).execute(sql)
    }

    fn database_name(&self) -> Option<&str> {
        (**self).database_name()
    }

    fn information_query(
        &self,
        table: &str,
    ) -> impl Future<Output = MapperResult<Vec<ColumnInfo>>> + Send {
        (**self).information_query(table)
    }
}
