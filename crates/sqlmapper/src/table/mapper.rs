use super::Table;
use crate::client::{Connection, QueryOutput};
use crate::config::MapperConfig;
use crate::error::{MapperError, MapperResult};
use crate::monitor::{HookAction, QueryContext, QueryHook, QueryResult, QueryType, TracingSqlHook};
use crate::relation::Relation;
use crate::schema::{SchemaCache, TableSchema};
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Instant;

struct MapperInner<C> {
    conn: C,
    config: MapperConfig,
    schemas: SchemaCache,
    /// table name → relation name → relation
    relations: RwLock<HashMap<String, HashMap<String, Arc<Relation>>>>,
    hooks: RwLock<Vec<Arc<dyn QueryHook>>>,
}

/// A mapper session: one connection, its configuration, the schema cache,
/// the relation registry and the query hooks.
///
/// Cloning is cheap and clones share all state.
///
/// ```ignore
/// let mapper = Mapper::new(conn, MapperConfig::new());
/// let posts = mapper.table("posts").await?;
/// let comments = mapper.table("comments").await?;
/// posts.has_many("comments", &comments, "post_id");
///
/// let rows = posts.query().load("comments").all().await?;
/// ```
pub struct Mapper<C> {
    inner: Arc<MapperInner<C>>,
}

impl<C> Clone for Mapper<C> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<C> fmt::Debug for Mapper<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Mapper")
            .field("config", &self.inner.config)
            .field("tables", &self.inner.schemas.len())
            .finish_non_exhaustive()
    }
}

impl<C: Connection + 'static> Mapper<C> {
    /// Create a session. Installs [`TracingSqlHook`] unless `config.log_sql` is off.
    pub fn new(conn: C, config: MapperConfig) -> Self {
        let mut hooks: Vec<Arc<dyn QueryHook>> = Vec::new();
        if config.log_sql {
            hooks.push(Arc::new(
                TracingSqlHook::new()
                    .level(config.log_sql_level.as_tracing_level())
                    .max_sql_length(config.log_sql_max_length),
            ));
        }
        Self {
            inner: Arc::new(MapperInner {
                conn,
                config,
                schemas: SchemaCache::new(),
                relations: RwLock::new(HashMap::new()),
                hooks: RwLock::new(hooks),
            }),
        }
    }

    /// Add a hook (builder style).
    pub fn with_hook<H: QueryHook + 'static>(self, hook: H) -> Self {
        self.add_hook(hook);
        self
    }

    /// Add a hook; it runs after the ones already installed.
    pub fn add_hook<H: QueryHook + 'static>(&self, hook: H) {
        self.inner
            .hooks
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Arc::new(hook));
    }

    pub fn connection(&self) -> &C {
        &self.inner.conn
    }

    pub fn config(&self) -> &MapperConfig {
        &self.inner.config
    }

    pub fn schema_cache(&self) -> &SchemaCache {
        &self.inner.schemas
    }

    /// Handle for `name`, loading its schema on first use.
    pub async fn table(&self, name: &str) -> MapperResult<Table<C>> {
        let schema = self
            .inner
            .schemas
            .load(&self.inner.conn, name, &self.inner.config)
            .await?;
        Ok(Table::new(self.clone(), schema))
    }

    /// Like [`table`](Self::table), with a primary key for tables that declare none.
    pub async fn table_with_key(&self, name: &str, primary_key: &str) -> MapperResult<Table<C>> {
        let schema = self
            .inner
            .schemas
            .load(&self.inner.conn, name, &self.inner.config)
            .await?;
        let schema = if schema.primary_key() == primary_key {
            schema
        } else {
            Arc::new(schema.with_primary_key(primary_key))
        };
        Ok(Table::new(self.clone(), schema))
    }

    /// Handle for a schema declared in code. No I/O; an already cached
    /// schema for the same table wins.
    pub fn register_table(&self, schema: TableSchema) -> Table<C> {
        let schema = self.inner.schemas.insert(schema);
        Table::new(self.clone(), schema)
    }

    pub(crate) fn register_relation(&self, table: &str, relation: Relation) {
        let mut relations = self
            .inner
            .relations
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        tracing::debug!(
            target: "sqlmapper.schema",
            table,
            relation = %relation.name,
            kind = ?relation.kind,
            target = relation.target.name(),
            "relation declared"
        );
        relations
            .entry(table.to_string())
            .or_default()
            .insert(relation.name.clone(), Arc::new(relation));
    }

    /// A relation declared on `table`.
    pub fn relation(&self, table: &str, name: &str) -> Option<Arc<Relation>> {
        self.inner
            .relations
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(table)
            .and_then(|relations| relations.get(name))
            .cloned()
    }

    pub(crate) fn relation_or_err(&self, table: &str, name: &str) -> MapperResult<Arc<Relation>> {
        self.relation(table, name)
            .ok_or_else(|| MapperError::UnknownRelation {
                table: table.to_string(),
                relation: name.to_string(),
            })
    }

    /// Run raw SQL through the hooks and the connection.
    pub async fn execute_sql(&self, sql: &str) -> MapperResult<QueryOutput> {
        self.run(QueryContext::new(sql)).await
    }

    pub(crate) async fn run(&self, mut ctx: QueryContext) -> MapperResult<QueryOutput> {
        let hooks = self
            .inner
            .hooks
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();

        for hook in &hooks {
            match hook.before_query(&ctx) {
                HookAction::Continue => {}
                HookAction::ModifySql(sql) => {
                    ctx.query_type = QueryType::from_sql(&sql);
                    ctx.sql = sql;
                }
                HookAction::Abort(reason) => return Err(MapperError::Aborted(reason)),
            }
        }

        let start = Instant::now();
        let result = self.inner.conn.execute(&ctx.sql).await;
        let elapsed = start.elapsed();

        if !hooks.is_empty() {
            let outcome = match &result {
                Ok(QueryOutput::Rows(rows)) => QueryResult::Rows(rows.len()),
                Ok(QueryOutput::Mutation(res)) => QueryResult::Affected(res.affected_rows),
                Err(err) => QueryResult::error(err.to_string()),
            };
            for hook in &hooks {
                hook.after_query(&ctx, elapsed, &outcome);
            }
        }
        result
    }
}
