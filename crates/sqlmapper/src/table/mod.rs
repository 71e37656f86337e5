//! Data-access facade: the mapper session, table handles and executing queries.

mod handle;
mod mapper;
mod query;

pub use handle::Table;
pub use mapper::Mapper;
pub use query::Query;
