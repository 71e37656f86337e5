use super::{Mapper, Query};
use crate::client::{Connection, ExecResult};
use crate::error::{MapperError, MapperResult};
use crate::relation::{Customize, Relation, RelationKind};
use crate::row::Row;
use crate::schema::TableSchema;
use crate::statement::{InsertArg, RawSql, SelectArg, SetArg, WhereArg};
use crate::value::Value;
use std::fmt;
use std::sync::Arc;

/// Generate `Table` shortcuts that start a fresh query with one clause call.
macro_rules! start_query_with {
    ($( $(#[$meta:meta])* fn $name:ident($($arg:ident: $ty:ty),*); )*) => {
        $(
            $(#[$meta])*
            pub fn $name(&self $(, $arg: $ty)*) -> Query<C> {
                let mut query = self.query();
                query.$name($($arg),*);
                query
            }
        )*
    };
}

/// Handle for one table: query entry points, relation declarations and
/// CRUD conveniences.
///
/// ```ignore
/// let users = mapper.table("users").await?;
/// users.create(row! { "name" => "alice" }).await?;
/// let alice = users.filter(row! { "name" => "alice" }).one().await?;
/// ```
pub struct Table<C> {
    mapper: Mapper<C>,
    schema: Arc<TableSchema>,
}

impl<C> Clone for Table<C> {
    fn clone(&self) -> Self {
        Self {
            mapper: self.mapper.clone(),
            schema: Arc::clone(&self.schema),
        }
    }
}

impl<C> fmt::Debug for Table<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Table")
            .field("name", &self.schema.name())
            .field("primary_key", &self.schema.primary_key())
            .finish_non_exhaustive()
    }
}

impl<C: Connection + 'static> Table<C> {
    pub(crate) fn new(mapper: Mapper<C>, schema: Arc<TableSchema>) -> Self {
        Self { mapper, schema }
    }

    pub fn name(&self) -> &str {
        self.schema.name()
    }

    pub fn primary_key(&self) -> &str {
        self.schema.primary_key()
    }

    pub fn schema(&self) -> &Arc<TableSchema> {
        &self.schema
    }

    pub fn mapper(&self) -> &Mapper<C> {
        &self.mapper
    }

    /// A fresh `SELECT *` query.
    pub fn query(&self) -> Query<C> {
        Query::new(self.mapper.clone(), Arc::clone(&self.schema))
    }

    start_query_with! {
        fn select(arg: impl Into<SelectArg>);
        fn filter(arg: impl Into<WhereArg>);
        fn id(value: impl Into<Value>);
        fn set(arg: impl Into<SetArg>);
        fn insert(arg: impl Into<InsertArg>);
        fn update();
        fn delete();
        fn truncate();
        fn sql(raw: impl Into<RawSql>);
        fn load(relation: impl Into<String>);
        fn load_with(relation: impl Into<String>, customize: Customize<C>);
    }

    // ==================== Relations ====================

    /// `target.foreign_key` references this table's primary key; attaches one row.
    pub fn has_one(&self, name: &str, target: &Table<C>, foreign_key: &str) -> &Self {
        self.declare(Relation::new(
            name,
            RelationKind::HasOne,
            Arc::clone(&target.schema),
            foreign_key,
        ))
    }

    /// `target.foreign_key` references this table's primary key; attaches a list.
    pub fn has_many(&self, name: &str, target: &Table<C>, foreign_key: &str) -> &Self {
        self.declare(Relation::new(
            name,
            RelationKind::HasMany,
            Arc::clone(&target.schema),
            foreign_key,
        ))
    }

    /// This table's `foreign_key` references the target's primary key.
    pub fn belongs_to(&self, name: &str, target: &Table<C>, foreign_key: &str) -> &Self {
        self.declare(Relation::new(
            name,
            RelationKind::BelongsTo,
            Arc::clone(&target.schema),
            foreign_key,
        ))
    }

    /// Target rows reached through a join table. `join_key` is the through
    /// column referencing the target, `through_key` the one referencing this table.
    pub fn has_many_through(
        &self,
        name: &str,
        target: &Table<C>,
        join_key: &str,
        through: &Table<C>,
        through_key: &str,
    ) -> &Self {
        self.declare(Relation::through(
            name,
            Arc::clone(&target.schema),
            join_key,
            Arc::clone(&through.schema),
            through_key,
        ))
    }

    fn declare(&self, relation: Relation) -> &Self {
        self.mapper.register_relation(self.schema.name(), relation);
        self
    }

    pub fn relation(&self, name: &str) -> Option<Arc<Relation>> {
        self.mapper.relation(self.schema.name(), name)
    }

    // ==================== Conveniences ====================

    /// Insert one row.
    pub async fn create(&self, row: Row) -> MapperResult<ExecResult> {
        self.insert(row).exec().await
    }

    pub async fn find_by_id(&self, id: impl Into<Value>) -> MapperResult<Option<Row>> {
        self.id(id).one().await
    }

    /// Update every other field of `row` by its primary key.
    pub async fn save(&self, row: Row) -> MapperResult<ExecResult> {
        let pk = self.schema.primary_key();
        let mut fields = row;
        let id = match fields.remove(pk) {
            Some(id) if !id.is_null() => id,
            _ => {
                return Err(MapperError::validation(format!(
                    "save on '{}' requires a value for primary key '{pk}'",
                    self.schema.name()
                )));
            }
        };
        let mut query = self.query();
        query.update().set(fields).id(id);
        query.exec().await
    }

    pub async fn delete_by_id(&self, id: impl Into<Value>) -> MapperResult<ExecResult> {
        let mut query = self.query();
        query.delete().id(id);
        query.exec().await
    }

    pub async fn all(&self) -> MapperResult<Vec<Row>> {
        self.query().all().await
    }

    pub async fn one(&self) -> MapperResult<Option<Row>> {
        self.query().one().await
    }

    pub async fn count(&self) -> MapperResult<u64> {
        self.query().count().await
    }

    pub async fn truncate_table(&self) -> MapperResult<ExecResult> {
        self.truncate().exec().await
    }
}
