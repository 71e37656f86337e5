//! Relation declarations and batch loading.
//!
//! A relation is declared once on a table handle and loaded with
//! [`Query::load`](crate::Query::load). Loading runs exactly one extra query
//! per relation for the whole parent result set. Related rows are matched
//! back to parents through a synthetic `__id` column and attached under the
//! relation name:
//!
//! - `HasOne` / `BelongsTo`: the first matching row, as [`Value::Row`]
//! - `HasMany` / `HasManyThrough`: all matching rows, as [`Value::List`]
//!
//! Parents without related rows are left untouched (the key is absent).

mod resolve;


pub use resolve::{Customize, DeferredLoad};
pub(crate) use resolve::resolve;

use crate::escape::escape;
use crate::schema::TableSchema;
use crate::statement::{Slot, StatementBuilder};
use crate::value::Value;
use std::sync::Arc;

/// Alias of the join column in relation sub-queries.
pub const RELATION_ID_ALIAS: &str = "__id";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelationKind {
    /// `target.foreign_key` references the parent's primary key; one row.
    HasOne,
    /// `target.foreign_key` references the parent's primary key; many rows.
    HasMany,
    /// `parent.foreign_key` references the target's primary key.
    BelongsTo,
    /// Target rows reached through a join table.
    HasManyThrough,
}

impl RelationKind {
    /// Whether the relation attaches a list rather than a single row.
    pub fn is_many(self) -> bool {
        matches!(self, RelationKind::HasMany | RelationKind::HasManyThrough)
    }
}

/// Join table of a [`RelationKind::HasManyThrough`] relation.
#[derive(Debug, Clone)]
pub struct Through {
    pub schema: Arc<TableSchema>,
    /// Through column referencing the target's primary key.
    pub join_key: String,
    /// Through column referencing the parent's primary key.
    pub through_key: String,
}

/// A declared relation. Immutable once registered.
#[derive(Debug, Clone)]
pub struct Relation {
    pub name: String,
    pub kind: RelationKind,
    pub target: Arc<TableSchema>,
    pub foreign_key: String,
    pub through: Option<Through>,
}

impl Relation {
    pub fn new(
        name: impl Into<String>,
        kind: RelationKind,
        target: Arc<TableSchema>,
        foreign_key: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            kind,
            target,
            foreign_key: foreign_key.into(),
            through: None,
        }
    }

    pub fn through(
        name: impl Into<String>,
        target: Arc<TableSchema>,
        join_key: impl Into<String>,
        through: Arc<TableSchema>,
        through_key: impl Into<String>,
    ) -> Self {
        let join_key = join_key.into();
        Self {
            name: name.into(),
            kind: RelationKind::HasManyThrough,
            target,
            foreign_key: join_key.clone(),
            through: Some(Through {
                schema: through,
                join_key,
                through_key: through_key.into(),
            }),
        }
    }

    /// `(id expression, FROM clause, key expression)` for this relation.
    fn shape(&self, parent: &TableSchema) -> (String, String, String) {
        let target = &self.target;
        match (self.kind, &self.through) {
            (RelationKind::BelongsTo, _) => {
                let parent_pk = parent.qualified(parent.primary_key());
                let from = format!(
                    "{} INNER JOIN {} ON {} = {}",
                    target.escaped_name(),
                    parent.escaped_name(),
                    target.qualified(target.primary_key()),
                    parent.qualified(&self.foreign_key),
                );
                (parent_pk.clone(), from, parent_pk)
            }
            (RelationKind::HasManyThrough, Some(through)) => {
                let key = through.schema.qualified(&through.through_key);
                let from = format!(
                    "{} INNER JOIN {} ON {} = {}",
                    target.escaped_name(),
                    through.schema.escaped_name(),
                    target.qualified(target.primary_key()),
                    through.schema.qualified(&through.join_key),
                );
                (key.clone(), from, key)
            }
            _ => {
                let key = target.qualified(&self.foreign_key);
                (key.clone(), target.escaped_name().to_string(), key)
            }
        }
    }

    /// Rewrite a (possibly customized) target query into this relation's sub-query.
    ///
    /// A caller-set select list replaces `` `target`.* `` and a caller-set
    /// WHERE is ANDed to the key filter. ORDER BY and LIMIT/OFFSET are kept.
    /// The builder is expected to qualify its columns, since the FROM clause
    /// may join a table with overlapping column names.
    pub(crate) fn splice(&self, qb: &mut StatementBuilder, parent: &TableSchema, keys: &[Value]) {
        let (id_expr, from, key_expr) = self.shape(parent);

        let list = match qb.get_buffer(Slot::Select) {
            Some(list) if qb.is_changed_buffer(Slot::Select) => list.to_string(),
            _ => format!("{}.*", self.target.escaped_name()),
        };
        let mut filter = format!("{key_expr} IN ({})", escape(&Value::List(keys.to_vec())));
        if qb.is_changed_buffer(Slot::Where) {
            if let Some(extra) = qb.get_buffer(Slot::Where).filter(|w| !w.is_empty()) {
                filter = format!("{filter} AND ({extra})");
            }
        }

        qb.replace_buffer(Slot::Select, format!("{id_expr} AS {RELATION_ID_ALIAS}, {list}"))
            .replace_buffer(Slot::From, from)
            .replace_buffer(Slot::Where, filter);
    }
}
