//! Hooks around SQL execution.
//!
//! Every statement a [`Mapper`](crate::Mapper) sends passes through its hooks
//! first. A hook can log it, rewrite it or refuse it.
//!
//! # Example
//!
//! ```rust,ignore
//! use sqlmapper::monitor::{HookAction, QueryContext, QueryHook, QueryType};
//!
//! struct NoTruncate;
//!
//! impl QueryHook for NoTruncate {
//!     fn before_query(&self, ctx: &QueryContext) -> HookAction {
//!         if ctx.query_type == QueryType::Truncate {
//!             HookAction::Abort("TRUNCATE is disabled".into())
//!         } else {
//!             HookAction::Continue
//!         }
//!     }
//! }
//!
//! let mapper = Mapper::new(conn, MapperConfig::new()).with_hook(NoTruncate);
//! ```

mod tracing_hook;
mod types;

#[cfg(test)]
mod tests;

pub use tracing_hook::TracingSqlHook;
pub use types::{HookAction, QueryContext, QueryHook, QueryResult, QueryType};

pub(crate) fn truncate_sql_bytes(sql: &str, max_bytes: usize) -> &str {
    if sql.len() <= max_bytes {
        return sql;
    }
    let mut end = max_bytes;
    while end > 0 && !sql.is_char_boundary(end) {
        end -= 1;
    }
    &sql[..end]
}
