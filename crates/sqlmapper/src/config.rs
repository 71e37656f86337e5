use crate::error::MapperResult;
use serde::Deserialize;

fn default_primary_key() -> String {
    "id".to_string()
}

fn default_log_sql() -> bool {
    true
}

fn default_log_sql_max_length() -> usize {
    200
}

/// Level at which executed SQL is logged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SqlLogLevel {
    Trace,
    #[default]
    Debug,
    Info,
    Warn,
}

impl SqlLogLevel {
    pub fn as_tracing_level(self) -> tracing::Level {
        match self {
            Self::Trace => tracing::Level::TRACE,
            Self::Debug => tracing::Level::DEBUG,
            Self::Info => tracing::Level::INFO,
            Self::Warn => tracing::Level::WARN,
        }
    }
}

/// Configuration for a [`Mapper`](crate::Mapper) session.
///
/// Deserializable so it can be embedded in an application config file; every
/// field is optional there.
///
/// ```ignore
/// let config = MapperConfig::new().strict().primary_key("uuid");
/// let config = MapperConfig::from_json_str(r#"{ "strict": true }"#)?;
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MapperConfig {
    /// Reject unknown columns/operators, empty predicates, unguarded
    /// UPDATE/DELETE and multi-row `one()` results instead of tolerating them.
    pub strict: bool,
    /// Primary key used when the table declares none.
    #[serde(default = "default_primary_key")]
    pub default_primary_key: String,
    /// Install the tracing SQL hook on new sessions.
    #[serde(default = "default_log_sql")]
    pub log_sql: bool,
    /// Level for SQL log events.
    pub log_sql_level: SqlLogLevel,
    /// Truncate logged SQL to this many bytes.
    #[serde(default = "default_log_sql_max_length")]
    pub log_sql_max_length: usize,
}

impl Default for MapperConfig {
    fn default() -> Self {
        Self {
            strict: false,
            default_primary_key: default_primary_key(),
            log_sql: default_log_sql(),
            log_sql_level: SqlLogLevel::default(),
            log_sql_max_length: default_log_sql_max_length(),
        }
    }
}

impl MapperConfig {
    /// Create a new configuration with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a configuration from JSON text.
    pub fn from_json_str(json: &str) -> MapperResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Enable strict mode.
    pub fn strict(mut self) -> Self {
        self.strict = true;
        self
    }

    /// Set strict mode explicitly.
    pub fn with_strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    /// Set the fallback primary key column.
    pub fn primary_key(mut self, column: impl Into<String>) -> Self {
        self.default_primary_key = column.into();
        self
    }

    /// Disable the default SQL logging hook.
    pub fn no_sql_log(mut self) -> Self {
        self.log_sql = false;
        self
    }

    /// Set the level for SQL log events.
    pub fn log_sql_level(mut self, level: SqlLogLevel) -> Self {
        self.log_sql_level = level;
        self
    }

    /// Set the maximum logged SQL length.
    pub fn log_sql_max_length(mut self, max: usize) -> Self {
        self.log_sql_max_length = max;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = MapperConfig::new();
        assert!(!config.strict);
        assert_eq!(config.default_primary_key, "id");
        assert!(config.log_sql);
        assert_eq!(config.log_sql_max_length, 200);
    }

    #[test]
    fn builder_methods() {
        let config = MapperConfig::new()
            .strict()
            .primary_key("uuid")
            .log_sql_level(SqlLogLevel::Info)
            .log_sql_max_length(50);
        assert!(config.strict);
        assert_eq!(config.default_primary_key, "uuid");
        assert_eq!(config.log_sql_level.as_tracing_level(), tracing::Level::INFO);
        assert_eq!(config.log_sql_max_length, 50);
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let config = MapperConfig::from_json_str(r#"{ "strict": true, "log_sql_level": "trace" }"#)
            .unwrap();
        assert!(config.strict);
        assert_eq!(config.default_primary_key, "id");
        assert_eq!(config.log_sql_level, SqlLogLevel::Trace);
        assert_eq!(config.log_sql_max_length, 200);
    }

    #[test]
    fn invalid_json_is_a_serialization_error() {
        let err = MapperConfig::from_json_str("{ strict: yes }").unwrap_err();
        assert!(matches!(err, crate::MapperError::Serialization(_)));
    }
}
