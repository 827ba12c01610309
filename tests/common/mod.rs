//! Shared fixtures for integration tests

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};

use entity_schemas::common_fields::inject;
use entity_schemas::migration::{DbError, DbResult, Row, SqlExecutor};
use entity_schemas::{DataType, Entity, Field, NewEntity, NewField};

/// Route `tracing` output through the test harness; `RUST_LOG` filters it
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

// =============================================================================
// Scripted SQL executor
// =============================================================================

/// Records every statement and answers queries from a script
#[derive(Default)]
pub struct MockExecutor {
    executed: Mutex<Vec<String>>,
    queried: Mutex<Vec<String>>,
    columns: Mutex<Vec<Row>>,
    data: Mutex<Vec<Row>>,
    query_error: Mutex<Option<DbError>>,
    execute_error: Mutex<Option<DbError>>,
    delay: Mutex<Option<Duration>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl MockExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Introspection returns these column names
    pub fn with_columns(self, names: &[&str]) -> Self {
        *self.columns.lock().unwrap() = names.iter().map(|n| column_row(n)).collect();
        self
    }

    /// `SELECT * FROM` returns these rows
    pub fn with_data(self, rows: Vec<Row>) -> Self {
        *self.data.lock().unwrap() = rows;
        self
    }

    pub fn fail_queries(self, error: DbError) -> Self {
        *self.query_error.lock().unwrap() = Some(error);
        self
    }

    pub fn fail_executes(self, error: DbError) -> Self {
        *self.execute_error.lock().unwrap() = Some(error);
        self
    }

    /// Every query and execute sleeps this long
    pub fn with_delay(self, delay: Duration) -> Self {
        *self.delay.lock().unwrap() = Some(delay);
        self
    }

    pub fn executed(&self) -> Vec<String> {
        self.executed.lock().unwrap().clone()
    }

    pub fn alter_count(&self) -> usize {
        self.executed()
            .iter()
            .filter(|sql| sql.starts_with("ALTER TABLE"))
            .count()
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    /// Count one call in flight for the configured delay
    async fn occupy(&self) {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        let delay = *self.delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl SqlExecutor for MockExecutor {
    async fn query_raw(&self, sql: &str) -> DbResult<Vec<Row>> {
        self.queried.lock().unwrap().push(sql.to_string());
        self.occupy().await;
        if let Some(err) = self.query_error.lock().unwrap().clone() {
            return Err(err);
        }
        if sql.contains("information_schema.columns") {
            return Ok(self.columns.lock().unwrap().clone());
        }
        Ok(self.data.lock().unwrap().clone())
    }

    async fn execute_raw(&self, sql: &str) -> DbResult<()> {
        self.occupy().await;

        if let Some(err) = self.execute_error.lock().unwrap().clone() {
            return Err(err);
        }
        self.executed.lock().unwrap().push(sql.to_string());
        Ok(())
    }
}

pub fn column_row(name: &str) -> Row {
    row(json!({
        "column_name": name,
        "data_type": "character varying",
        "is_nullable": "YES",
        "column_default": null
    }))
}

pub fn row(value: Value) -> Row {
    match value {
        Value::Object(map) => map,
        other => panic!("expected an object, got {}", other),
    }
}

// =============================================================================
// Schema fixtures
// =============================================================================

/// `user` entity on table `users` with username (unique) and email
pub fn users_entity() -> (Entity, Vec<Field>) {
    let mut entity =
        Entity::create(NewEntity::new("p-1", "user", "User", "admin").table_name("users")).unwrap();
    let fields = inject(
        &entity,
        vec![
            NewField::new("username", "Username", DataType::String)
                .length(50)
                .required()
                .unique(),
            NewField::new("email", "Email", DataType::String).length(100),
        ],
        "admin",
    )
    .unwrap();
    entity.fields = fields.clone();
    (entity, fields)
}

pub const USERS_COLUMNS: [&str; 7] = [
    "id",
    "created_by",
    "created_at",
    "updated_by",
    "updated_at",
    "username",
    "email",
];
