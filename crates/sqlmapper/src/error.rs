//! Error types for sqlmapper

use std::sync::Arc;
use thiserror::Error;

/// Result type alias for sqlmapper operations
pub type MapperResult<T> = Result<T, MapperError>;

/// Error types for statement building, relation loading and execution.
#[derive(Debug, Clone, Error)]
pub enum MapperError {
    /// A `?` template and its values disagree in count.
    #[error("Parameter count mismatch: {placeholders} placeholder(s), {values} value(s)")]
    ParameterCount { placeholders: usize, values: usize },

    /// Strict mode: a column that is not part of the table schema.
    #[error("Invalid column '{column}' for table '{table}'")]
    InvalidColumn { table: String, column: String },

    /// Strict mode: an operator suffix that is not recognised.
    #[error("Invalid operator '{operator}' for column '{column}'")]
    InvalidOperator { column: String, operator: String },

    /// Strict mode: a WHERE predicate that reduced to nothing.
    #[error("Empty WHERE predicate for table '{table}'")]
    EmptyPredicate { table: String },

    /// A raw select list that is empty.
    #[error("Empty SELECT list")]
    EmptySelect,

    /// Strict mode: UPDATE/DELETE serialized without WHERE.
    #[error("WHERE clause missing for {statement} on table '{table}'")]
    MissingWhere { table: String, statement: &'static str },

    /// A clause that the active statement kind does not have.
    #[error("{clause} is not valid for a {statement} statement")]
    InvalidClause {
        clause: &'static str,
        statement: &'static str,
    },

    /// A load of a relation that was never declared.
    #[error("Unknown relation '{relation}' on table '{table}'")]
    UnknownRelation { table: String, relation: String },

    /// The information query returned no columns.
    #[error("Unknown table '{0}'")]
    UnknownTable(String),

    /// More rows than expected.
    #[error("Expected {expected} row(s), got {got}")]
    TooManyRows { expected: usize, got: usize },

    /// The connection returned rows where a mutation summary was expected, or vice versa.
    #[error("Unexpected query output: {0}")]
    UnexpectedOutput(String),

    /// A query hook refused to run the statement.
    #[error("Query aborted: {0}")]
    Aborted(String),

    /// Validation error
    #[error("Validation error: {0}")]
    Validation(String),

    /// Row decode/mapping error
    #[error("Decode error on column '{column}': {message}")]
    Decode { column: String, message: String },

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Error raised by the database driver behind a [`Connection`](crate::Connection).
    #[error("Database error: {0}")]
    Database(#[source] Arc<dyn std::error::Error + Send + Sync>),

    /// Database connection error
    #[error("Connection error: {0}")]
    Connection(String),

    /// Other errors
    #[error("{0}")]
    Other(String),
}

impl MapperError {
    /// Wrap a driver error.
    pub fn database<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Database(Arc::new(err))
    }

    /// Create a decode error for a specific column
    pub fn decode(column: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Decode {
            column: column.into(),
            message: message.into(),
        }
    }

    /// Create a validation error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Create an invalid column error
    pub fn invalid_column(table: impl Into<String>, column: impl Into<String>) -> Self {
        Self::InvalidColumn {
            table: table.into(),
            column: column.into(),
        }
    }

    /// Create a "too many rows" error
    pub fn too_many_rows(expected: usize, got: usize) -> Self {
        Self::TooManyRows { expected, got }
    }

    /// Whether this error was raised by statement building (before any I/O).
    pub fn is_build_error(&self) -> bool {
        matches!(
            self,
            Self::ParameterCount { .. }
                | Self::InvalidColumn { .. }
                | Self::InvalidOperator { .. }
                | Self::EmptyPredicate { .. }
                | Self::EmptySelect
                | Self::MissingWhere { .. }
                | Self::InvalidClause { .. }
        )
    }

    /// Check if this is an invalid column error
    pub fn is_invalid_column(&self) -> bool {
        matches!(self, Self::InvalidColumn { .. })
    }

    /// Check if this is a parameter count error
    pub fn is_parameter_count(&self) -> bool {
        matches!(self, Self::ParameterCount { .. })
    }

    /// Check if this error came from the database collaborator
    pub fn is_database(&self) -> bool {
        matches!(self, Self::Database(_) | Self::Connection(_))
    }
}

impl From<serde_json::Error> for MapperError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}
