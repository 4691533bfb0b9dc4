//! Error types for BakeORM.

use thiserror::Error;

/// The main error type for BakeORM operations.
///
/// "No matching row" and "zero rows affected" are never errors: those come
/// back as `false`, `None` or an empty `Vec`.
#[derive(Debug, Error)]
pub enum BakeError {
    /// Invalid or incomplete query configuration.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Caller supplied arguments of the wrong shape.
    #[error("Validation error: {0}")]
    Validation(String),

    /// A factory could not wire up the requested component.
    #[error("Construction error: {component}: {reason}")]
    Construction { component: String, reason: String },

    /// The connection could not be opened or closed.
    #[error("Connection error: {0}")]
    Connection(#[source] sqlx::Error),

    /// The engine rejected or failed a statement.
    #[error("Execution error: {source} (sql: {sql})")]
    Execution {
        sql: String,
        #[source]
        source: sqlx::Error,
    },

    /// A parameter was bound that the statement does not define, or a
    /// placeholder was left unbound.
    #[error("Bind error: {0}")]
    Bind(String),

    /// The placeholder scanner could not read the SQL text.
    #[error("Parse error at position {position}: {message}")]
    Parse { position: usize, message: String },

    /// Payload or row could not be converted.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed configuration file.
    #[error("Config file error: {0}")]
    Toml(#[from] toml::de::Error),
}

impl BakeError {
    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Create a construction error for the given component identifier.
    pub fn construction(component: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Construction {
            component: component.into(),
            reason: reason.into(),
        }
    }

    /// Create a parse error at the given position.
    pub fn parse(position: usize, message: impl Into<String>) -> Self {
        Self::Parse {
            position,
            message: message.into(),
        }
    }

    /// Wrap an engine error raised while running `sql`.
    pub fn execution(sql: impl Into<String>, source: sqlx::Error) -> Self {
        Self::Execution {
            sql: sql.into(),
            source,
        }
    }

    /// True for failures raised by the data-access layer.
    pub fn is_data_access(&self) -> bool {
        matches!(
            self,
            Self::Connection(_) | Self::Execution { .. } | Self::Bind(_) | Self::Parse { .. }
        )
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }

    pub fn is_config(&self) -> bool {
        matches!(self, Self::Config(_))
    }
}

impl From<serde_json::Error> for BakeError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

/// Result type alias for BakeORM operations.
pub type BakeResult<T> = Result<T, BakeError>;
