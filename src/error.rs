//! Error types for the entity schema engine
//!
//! Validation, conflict and not-found errors are raised in-process before any
//! mutation. Migration errors are raised only after a database operation was
//! attempted and always carry the driver's message.

use thiserror::Error;

/// Result type for schema operations
pub type Result<T> = std::result::Result<T, SchemaError>;

/// Schema engine errors
#[derive(Error, Debug)]
pub enum SchemaError {
    /// Schema or invariant violation
    #[error("{0}")]
    Validation(String),

    /// Duplicate code, path or relationship
    #[error("{0}")]
    Conflict(String),

    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },

    /// Caller asked for something the engine does not support
    #[error("{0}")]
    BadRequest(String),

    /// DDL/DML execution failure, already wrapped with its table context
    #[error("{message}")]
    Migration {
        table: Option<String>,
        message: String,
    },

    #[error("Configuration error: {0}")]
    Config(#[from] config_crate::ConfigError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl SchemaError {
    pub fn validation(message: impl Into<String>) -> Self {
        SchemaError::Validation(message.into())
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        SchemaError::Conflict(message.into())
    }

    pub fn not_found(kind: &'static str, id: impl Into<String>) -> Self {
        SchemaError::NotFound { kind, id: id.into() }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        SchemaError::BadRequest(message.into())
    }

    /// Wrap a migration failure that concerns a specific table
    pub fn migration(table: impl Into<String>, message: impl Into<String>) -> Self {
        SchemaError::Migration {
            table: Some(table.into()),
            message: message.into(),
        }
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, SchemaError::Validation(_))
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, SchemaError::Conflict(_))
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, SchemaError::NotFound { .. })
    }

    pub fn is_migration(&self) -> bool {
        matches!(self, SchemaError::Migration { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_migration_display_is_wrapped_message() {
        let err = SchemaError::migration("users", "创建表 users 失败: boom");
        assert_eq!(err.to_string(), "创建表 users 失败: boom");
        assert!(err.is_migration());
    }

    #[test]
    fn test_not_found_display() {
        let err = SchemaError::not_found("Entity", "e-1");
        assert_eq!(err.to_string(), "Entity not found: e-1");
    }
}
