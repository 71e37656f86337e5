//! # sqlmapper
//!
//! A small table mapper for MySQL-flavored SQL.
//!
//! ## Features
//!
//! - **Stateful statement builder**: chain clauses, call `to_sql()`, reuse the builder
//! - **Escaped literals**: values are escaped and inlined; identifiers are backtick-quoted
//! - **Schema-aware**: unknown columns are dropped, or rejected in strict mode
//! - **Relations**: has-one / has-many / belongs-to / has-many-through, loaded with one
//!   extra query per relation for the whole result set
//! - **Hooks**: inspect, rewrite or refuse every statement; SQL is logged via `tracing`
//!
//! ## Example
//!
//! ```ignore
//! use sqlmapper::prelude::*;
//!
//! let mapper = Mapper::new(conn, MapperConfig::new());
//! let posts = mapper.table("posts").await?;
//! let comments = mapper.table("comments").await?;
//! posts.has_many("comments", &comments, "post_id");
//!
//! // SELECT * FROM `posts` WHERE `title` like 'Rust%' ORDER BY `id` DESC LIMIT 10;
//! // SELECT `comments`.`post_id` AS __id, `comments`.* FROM `comments` WHERE `comments`.`post_id` IN (...);
//! let rows = posts
//!     .filter(row! { "title like" => "Rust%" })
//!     .order(["-id"])
//!     .limit(10)
//!     .load("comments")
//!     .all()
//!     .await?;
//!
//! posts.create(row! { "title" => "Hello" }).await?;
//! posts.delete().id(vec![7, 6]).exec().await?;
//! ```

pub mod client;
pub mod config;
pub mod error;
pub mod escape;
pub mod monitor;
pub mod prelude;
pub mod relation;
pub mod row;
pub mod schema;
pub mod statement;
pub mod table;
pub mod value;

pub use client::{Connection, ExecResult, QueryOutput};
pub use config::{MapperConfig, SqlLogLevel};
pub use error::{MapperError, MapperResult};
pub use escape::{escape, escape_identifier, format};
pub use monitor::{HookAction, QueryContext, QueryHook, QueryResult, QueryType, TracingSqlHook};
pub use relation::{Customize, DeferredLoad, Relation, RelationKind};
pub use row::Row;
pub use schema::{ColumnInfo, SchemaCache, TableSchema, information_schema_sql};
pub use statement::{
    InsertArg, OrderArg, RawSql, SelectArg, SetArg, Slot, Statement, StatementBuilder,
    StatementKind, WhereArg,
};
pub use table::{Mapper, Query, Table};
pub use value::Value;
