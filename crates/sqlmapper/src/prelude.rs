//! Convenient imports for typical `sqlmapper` usage.
//!
//! ```ignore
//! use sqlmapper::prelude::*;
//! ```

pub use crate::row;
pub use crate::{
    Connection, Customize, ExecResult, Mapper, MapperConfig, MapperError, MapperResult, Query,
    QueryOutput, Row, Table, Value, WhereArg,
};
