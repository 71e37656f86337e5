use super::{RELATION_ID_ALIAS, Relation};
use crate::client::Connection;
use crate::error::MapperResult;
use crate::row::Row;
use crate::schema::TableSchema;
use crate::table::{Mapper, Query};
use crate::value::Value;
use futures_util::future::{BoxFuture, FutureExt, try_join_all};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::future::Future;
use std::sync::Arc;

/// Caller customization of a relation sub-query.
///
/// The sub-query starts as a fresh query on the target table. Narrow its
/// select list, add a filter, order or limit it, or queue nested loads.
/// Schema columns in those clauses are rendered as `` `target`.`column` ``;
/// raw fragments are used as written.
pub enum Customize<C> {
    Sync(Box<dyn FnOnce(&mut Query<C>) + Send>),
    Async(Box<dyn FnOnce(Query<C>) -> BoxFuture<'static, MapperResult<Query<C>>> + Send>),
}

impl<C> Customize<C> {
    /// ```ignore
    /// posts.query().load_with("comments", Customize::sync(|q| {
    ///     q.order("-id").limit(5);
    /// }));
    /// ```
    pub fn sync<F>(f: F) -> Self
    where
        F: FnOnce(&mut Query<C>) + Send + 'static,
    {
        Self::Sync(Box::new(f))
    }

    /// Customize asynchronously; the closure takes the query and hands it back.
    pub fn future<F, Fut>(f: F) -> Self
    where
        F: FnOnce(Query<C>) -> Fut + Send + 'static,
        Fut: Future<Output = MapperResult<Query<C>>> + Send + 'static,
    {
        Self::Async(Box::new(move |q| f(q).boxed()))
    }
}

impl<C> fmt::Debug for Customize<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Customize::Sync(_) => f.write_str("Customize::Sync(..)"),
            Customize::Async(_) => f.write_str("Customize::Async(..)"),
        }
    }
}

/// A relation load queued on a query, not yet prepared.
pub struct DeferredLoad<C> {
    pub relation: String,
    pub customize: Option<Customize<C>>,
}

impl<C> fmt::Debug for DeferredLoad<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeferredLoad")
            .field("relation", &self.relation)
            .field("customize", &self.customize)
            .finish()
    }
}

impl<C> DeferredLoad<C> {
    pub fn new(relation: impl Into<String>, customize: Option<Customize<C>>) -> Self {
        Self {
            relation: relation.into(),
            customize,
        }
    }
}

/// Sub-query built and customized, ready to run.
struct PreparedLoad<C> {
    relation: Arc<Relation>,
    query: Query<C>,
}

/// Sub-query rows, ready to attach.
struct FetchedLoad {
    relation: Arc<Relation>,
    rows: Vec<Row>,
}

impl<C: Connection + 'static> DeferredLoad<C> {
    async fn prepare(
        self,
        mapper: &Mapper<C>,
        parent: &TableSchema,
        keys: &[Value],
    ) -> MapperResult<PreparedLoad<C>> {
        let relation = mapper.relation_or_err(parent.name(), &self.relation)?;
        let mut query = Query::new(mapper.clone(), Arc::clone(&relation.target));
        query.set_tag(relation.name.clone());
        // joined sub-queries share column names with the parent or link table
        query.builder_mut().qualify_columns(true);

        match self.customize {
            Some(Customize::Sync(f)) => f(&mut query),
            Some(Customize::Async(f)) => query = f(query).await?,
            None => {}
        }
        relation.splice(query.builder_mut(), parent, keys);

        tracing::trace!(
            target: "sqlmapper.sql",
            relation = %relation.name,
            kind = ?relation.kind,
            keys = keys.len(),
            "relation load prepared"
        );
        Ok(PreparedLoad { relation, query })
    }
}

impl<C: Connection + 'static> PreparedLoad<C> {
    async fn fetch(mut self) -> MapperResult<FetchedLoad> {
        let rows = self.query.all().await?;
        tracing::trace!(
            target: "sqlmapper.sql",
            relation = %self.relation.name,
            rows = rows.len(),
            "relation load fetched"
        );
        Ok(FetchedLoad {
            relation: self.relation,
            rows,
        })
    }
}

impl FetchedLoad {
    fn attach(self, parent_pk: &str, parents: &mut [Row]) {
        let mut groups: HashMap<String, Vec<Row>> = HashMap::new();
        for mut row in self.rows {
            let Some(id) = row.remove(RELATION_ID_ALIAS) else {
                continue;
            };
            if id.is_null() {
                continue;
            }
            groups.entry(id.group_key()).or_default().push(row);
        }

        let name = &self.relation.name;
        let many = self.relation.kind.is_many();
        for parent in parents.iter_mut() {
            let Some(key) = parent.get(parent_pk).map(Value::group_key) else {
                continue;
            };
            let Some(related) = groups.get(&key) else {
                continue;
            };
            let value = if many {
                Value::List(related.iter().cloned().map(Value::Row).collect())
            } else {
                match related.first() {
                    Some(row) => Value::Row(row.clone()),
                    None => continue,
                }
            };
            parent.insert(name.clone(), value);
        }
    }
}

/// Distinct non-NULL primary-key values of `rows`, in first-seen order.
fn parent_keys(rows: &[Row], primary_key: &str) -> Vec<Value> {
    let mut seen = HashSet::new();
    rows.iter()
        .filter_map(|row| row.get(primary_key))
        .filter(|v| !v.is_null())
        .filter(|v| seen.insert(v.group_key()))
        .cloned()
        .collect()
}

/// Resolve `loads` against `rows` of the `parent` table.
///
/// Sub-queries run concurrently; rows are only modified once every load
/// has succeeded. Boxed because sub-queries may carry nested loads.
pub(crate) fn resolve<'a, C: Connection + 'static>(
    mapper: &'a Mapper<C>,
    parent: &'a Arc<TableSchema>,
    loads: Vec<DeferredLoad<C>>,
    rows: &'a mut [Row],
) -> BoxFuture<'a, MapperResult<()>> {
    async move {
        if loads.is_empty() {
            return Ok(());
        }
        let keys = parent_keys(rows, parent.primary_key());
        if keys.is_empty() {
            tracing::trace!(
                target: "sqlmapper.sql",
                table = parent.name(),
                "no parent keys, relation loads skipped"
            );
            return Ok(());
        }

        let keys = &keys;
        let fetched = try_join_all(loads.into_iter().map(|load| async move {
            load.prepare(mapper, parent, keys).await?.fetch().await
        }))
        .await?;

        for load in fetched {
            load.attach(parent.primary_key(), rows);
        }
        Ok(())
    }
    .boxed()
}
