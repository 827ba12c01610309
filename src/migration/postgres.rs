//! PostgreSQL adapter for the SQL execution port

use async_trait::async_trait;
use serde_json::Value;
use sqlx::postgres::PgPoolOptions;
use sqlx::types::Json;
use sqlx::{Executor, PgPool};

use super::executor::{DbError, DbResult, Row, SqlExecutor};
use crate::config::MigrationConfig;

pub struct PgExecutor {
    pool: PgPool,
}

impl PgExecutor {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connect with `search_path` pinned to the configured schema
    pub async fn connect(url: &str, config: &MigrationConfig) -> DbResult<Self> {
        let schema = config.db_schema.clone();
        let pool = PgPoolOptions::new()
            .after_connect(move |conn, _meta| {
                let set_path = format!("SET search_path TO {}", schema);
                Box::pin(async move {
                    conn.execute(set_path.as_str()).await?;
                    Ok(())
                })
            })
            .connect(url)
            .await
            .map_err(db_error)?;
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

fn db_error(err: sqlx::Error) -> DbError {
    match &err {
        sqlx::Error::Database(db) => match db.code() {
            Some(code) => DbError::with_code(code.into_owned(), db.message()),
            None => DbError::new(db.message()),
        },
        _ => DbError::new(err.to_string()),
    }
}

#[async_trait]
impl SqlExecutor for PgExecutor {
    async fn query_raw(&self, sql: &str) -> DbResult<Vec<Row>> {
        let wrapped = format!(
            "SELECT row_to_json(q) FROM ({}) q",
            sql.trim().trim_end_matches(';')
        );
        let rows: Vec<Json<Value>> = sqlx::query_scalar(&wrapped)
            .fetch_all(&self.pool)
            .await
            .map_err(db_error)?;

        Ok(rows
            .into_iter()
            .filter_map(|Json(value)| match value {
                Value::Object(row) => Some(row),
                _ => None,
            })
            .collect())
    }

    async fn execute_raw(&self, sql: &str) -> DbResult<()> {
        sqlx::raw_sql(sql)
            .execute(&self.pool)
            .await
            .map_err(db_error)?;
        Ok(())
    }
}
