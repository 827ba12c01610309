//! SQL execution port
//!
//! The migration manager only talks to the database through `SqlExecutor`,
//! so tests can script results and record executed statements.

use async_trait::async_trait;
use serde_json::{Map, Value};
use thiserror::Error;

/// One result row, keyed by column name
pub type Row = Map<String, Value>;

/// Driver-level failure, carrying the driver's own message
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct DbError {
    /// SQLSTATE when the driver reported one
    pub code: Option<String>,
    pub message: String,
}

/// SQLSTATE for `relation "..." does not exist`
const UNDEFINED_TABLE: &str = "42P01";

impl DbError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            code: None,
            message: message.into(),
        }
    }

    pub fn with_code(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: Some(code.into()),
            message: message.into(),
        }
    }

    pub fn timeout(after_ms: u128) -> Self {
        Self::new(format!("timed out after {}ms", after_ms))
    }

    /// The queried table does not exist
    ///
    /// A SQLSTATE is authoritative; the message is only consulted when the
    /// driver reported none.
    pub fn is_undefined_table(&self) -> bool {
        match self.code.as_deref() {
            Some(code) => code == UNDEFINED_TABLE,
            None => self.message.contains("does not exist"),
        }
    }
}

pub type DbResult<T> = std::result::Result<T, DbError>;

#[async_trait]
pub trait SqlExecutor: Send + Sync {
    /// Run a query and return its rows
    async fn query_raw(&self, sql: &str) -> DbResult<Vec<Row>>;

    /// Run one statement or a newline/semicolon separated batch
    async fn execute_raw(&self, sql: &str) -> DbResult<()>;
}

/// Render a JSON value as a SQL literal for INSERT
pub fn sql_literal(value: &Value) -> String {
    match value {
        Value::Null => "NULL".to_string(),
        Value::Bool(true) => "TRUE".to_string(),
        Value::Bool(false) => "FALSE".to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => format!("'{}'", s.replace('\'', "''")),
        other => format!("'{}'", other.to_string().replace('\'', "''")),
    }
}

/// `INSERT INTO <table> (...) VALUES (...);` for one backed-up row
pub fn insert_statement(table: &str, row: &Row) -> String {
    let columns: Vec<&str> = row.keys().map(String::as_str).collect();
    let values: Vec<String> = row.values().map(sql_literal).collect();
    format!(
        "INSERT INTO {} ({}) VALUES ({});",
        table,
        columns.join(", "),
        values.join(", ")
    )
}
