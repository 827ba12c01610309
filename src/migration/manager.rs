//! Migration manager
//!
//! Applies planned DDL, introspects live tables, and repairs drift. Every
//! operation on a table holds that table's lock, every database call runs
//! under the configured statement timeout, and every failure is wrapped
//! with the table it concerns.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tracing::{debug, error, info, warn};

use super::diff::{diff_columns, ColumnInfo, TableDriftReport};
use super::executor::{insert_statement, DbError, DbResult, Row, SqlExecutor};
use super::locks::TableLocks;
use super::plan::{expected_columns, plan_create_with_refs, TablePlan};
use crate::codegen::ddl;
use crate::config::MigrationConfig;
use crate::error::{Result, SchemaError};
use crate::schema::rules::is_sql_identifier;
use crate::schema::{Entity, Field};

/// Statements executed by a repair
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RepairOutcome {
    pub drift: TableDriftReport,
    pub executed: Vec<String>,
}

impl RepairOutcome {
    pub fn was_noop(&self) -> bool {
        self.executed.is_empty()
    }
}

/// Failed backup-then-repair: the repair error plus the rows saved before it
#[derive(Debug)]
pub struct RepairFailure {
    pub error: SchemaError,
    pub backup: Vec<Row>,
}

/// Names passed in as plain strings are spliced into SQL unquoted
fn check_identifier(name: &str) -> Result<()> {
    if !is_sql_identifier(name) {
        return Err(SchemaError::validation(format!(
            "'{}' is not a valid SQL identifier",
            name
        )));
    }
    Ok(())
}

pub struct MigrationManager {
    executor: Arc<dyn SqlExecutor>,
    locks: TableLocks,
    config: MigrationConfig,
}

impl MigrationManager {
    pub fn new(executor: Arc<dyn SqlExecutor>, config: MigrationConfig) -> Self {
        Self {
            executor,
            locks: TableLocks::new(),
            config,
        }
    }

    pub fn config(&self) -> &MigrationConfig {
        &self.config
    }

    fn timeout(&self) -> Duration {
        self.config.statement_timeout()
    }

    async fn bounded<T>(&self, call: impl Future<Output = DbResult<T>>) -> DbResult<T> {
        let limit = self.timeout();
        match tokio::time::timeout(limit, call).await {
            Ok(result) => result,
            Err(_) => Err(DbError::timeout(limit.as_millis())),
        }
    }

    async fn execute(&self, sql: &str) -> DbResult<()> {
        debug!(sql, "executing");
        self.bounded(self.executor.execute_raw(sql)).await
    }

    async fn query(&self, sql: &str) -> DbResult<Vec<Row>> {
        debug!(sql, "querying");
        self.bounded(self.executor.query_raw(sql)).await
    }

    // =========================================================================
    // Create / drop
    // =========================================================================

    /// Create the entity's table and indexes as one batch
    pub async fn create_table(
        &self,
        entity: &Entity,
        fields: &[Field],
        known_entities: &[Entity],
    ) -> Result<TablePlan> {
        let plan = plan_create_with_refs(entity, fields, known_entities)?;
        let _guard = self.locks.acquire(&plan.table).await;

        match self.execute(&plan.batch()).await {
            Ok(()) => {
                info!(table = %plan.table, columns = plan.columns.len(), "created table");
                Ok(plan)
            }
            Err(e) => {
                error!(table = %plan.table, error = %e, "create table failed");
                Err(SchemaError::migration(
                    &plan.table,
                    format!("创建表 {} 失败: {}", plan.table, e),
                ))
            }
        }
    }

    pub async fn drop_table(&self, table: &str) -> Result<()> {
        check_identifier(table)?;
        let _guard = self.locks.acquire(table).await;
        self.execute(&ddl::drop_table(table)).await.map_err(|e| {
            error!(table, error = %e, "drop table failed");
            SchemaError::migration(table, format!("删除表 {} 失败: {}", table, e))
        })?;
        info!(table, "dropped table");
        Ok(())
    }

    // =========================================================================
    // Columns
    // =========================================================================

    pub async fn add_column(&self, table: &str, field: &Field) -> Result<()> {
        check_identifier(table)?;
        let _guard = self.locks.acquire(table).await;
        let sql = ddl::add_column(table, &ddl::repair_column_definition(field));
        self.execute(&sql).await.map_err(|e| {
            error!(table, column = %field.column_name(), error = %e, "add column failed");
            SchemaError::migration(table, format!("添加列失败: {}", e))
        })
    }

    /// Drop a column; repair never does this on its own
    pub async fn drop_column(&self, table: &str, column: &str) -> Result<()> {
        check_identifier(table)?;
        check_identifier(column)?;
        let _guard = self.locks.acquire(table).await;
        self.execute(&ddl::drop_column(table, column)).await.map_err(|e| {
            error!(table, column, error = %e, "drop column failed");
            SchemaError::migration(table, format!("删除列失败: {}", e))
        })?;
        warn!(table, column, "dropped column");
        Ok(())
    }

    pub async fn create_index(&self, table: &str, column: &str, unique: bool) -> Result<()> {
        check_identifier(table)?;
        check_identifier(column)?;
        let _guard = self.locks.acquire(table).await;
        self.execute(&ddl::create_index(table, column, unique))
            .await
            .map_err(|e| SchemaError::migration(table, format!("创建索引失败: {}", e)))
    }

    async fn fetch_columns(&self, table: &str) -> DbResult<Vec<ColumnInfo>> {
        let sql = format!(
            "SELECT column_name, data_type, is_nullable, column_default, \
             character_maximum_length, numeric_precision, numeric_scale \
             FROM information_schema.columns \
             WHERE table_schema = '{}' AND table_name = '{}' \
             ORDER BY ordinal_position",
            self.config.db_schema.replace('\'', "''"),
            table.replace('\'', "''")
        );
        self.query(&sql)
            .await?
            .into_iter()
            .map(|row| ColumnInfo::from_row(row).map_err(|e| DbError::new(e.to_string())))
            .collect()
    }

    /// Live columns of `table`, in ordinal order; empty when it does not exist
    pub async fn table_columns(&self, table: &str) -> Result<Vec<ColumnInfo>> {
        self.fetch_columns(table)
            .await
            .map_err(|e| SchemaError::migration(table, format!("获取表结构失败: {}", e)))
    }

    pub async fn table_exists(&self, table: &str) -> Result<bool> {
        Ok(!self.table_columns(table).await?.is_empty())
    }

    // =========================================================================
    // Drift
    // =========================================================================

    async fn drift(&self, table: &str, expected: &[String]) -> DbResult<TableDriftReport> {
        let actual = self.fetch_columns(table).await?;
        Ok(diff_columns(table, expected, &actual))
    }

    pub async fn validate_table_structure(
        &self,
        entity: &Entity,
        fields: &[Field],
    ) -> Result<TableDriftReport> {
        let table = entity.table_name.as_str();
        let expected = expected_columns(fields)?;
        let report = self
            .drift(table, &expected)
            .await
            .map_err(|e| SchemaError::migration(table, format!("验证表结构失败: {}", e)))?;

        if report.is_valid {
            debug!(table, "table structure matches");
        } else {
            warn!(table, issues = ?report.issues, "table structure drift");
        }
        Ok(report)
    }

    /// Add missing columns and their indexes; extra columns are only reported
    ///
    /// A table with no columns at all is created from the plan, with
    /// REFERENCES clauses resolved against `known_entities` as in
    /// [`create_table`](Self::create_table).
    pub async fn repair_table_structure(
        &self,
        entity: &Entity,
        fields: &[Field],
        known_entities: &[Entity],
    ) -> Result<RepairOutcome> {
        let table = entity.table_name.as_str();
        let plan = plan_create_with_refs(entity, fields, known_entities)?;
        let _guard = self.locks.acquire(table).await;

        self.repair_locked(&plan, fields).await.map_err(|e| {
            error!(table, error = %e, "repair failed");
            SchemaError::migration(table, format!("修复表结构失败: {}", e))
        })
    }

    async fn repair_locked(&self, plan: &TablePlan, fields: &[Field]) -> DbResult<RepairOutcome> {
        let table = plan.table.as_str();
        let drift = self.drift(table, &plan.columns).await?;

        if drift.is_valid {
            info!(table, "table structure is valid, nothing to repair");
            return Ok(RepairOutcome {
                drift,
                executed: Vec::new(),
            });
        }

        let mut statements = Vec::new();

        if drift.table_missing() {
            statements.push(plan.batch());
        } else {
            for column in &drift.missing_columns {
                let Some(field) = fields.iter().find(|f| &f.column_name() == column) else {
                    continue;
                };
                statements.push(ddl::add_column(table, &ddl::repair_column_definition(field)));
                statements.extend(plan.indexes_for(column).map(|i| i.sql.clone()));
            }
        }
        for column in &drift.extra_columns {
            warn!(table, column = %column, "extra column left in place");
        }

        for sql in &statements {
            self.execute(sql).await?;
        }
        info!(table, statements = statements.len(), "repaired table structure");

        Ok(RepairOutcome {
            drift,
            executed: statements,
        })
    }

    // =========================================================================
    // Backup / restore
    // =========================================================================

    /// All rows of `table`; a table that does not exist yields no rows
    pub async fn backup_table_data(&self, table: &str) -> Result<Vec<Row>> {
        check_identifier(table)?;
        let _guard = self.locks.acquire(table).await;
        match self.query(&format!("SELECT * FROM {}", table)).await {
            Ok(rows) => {
                info!(table, rows = rows.len(), "backed up table data");
                Ok(rows)
            }
            Err(e) if e.is_undefined_table() => {
                debug!(table, "table does not exist, nothing to back up");
                Ok(Vec::new())
            }
            Err(e) => {
                error!(table, error = %e, "backup failed");
                Err(SchemaError::migration(table, format!("备份表数据失败: {}", e)))
            }
        }
    }

    /// Insert backed-up rows one at a time
    pub async fn restore_table_data(&self, table: &str, rows: &[Row]) -> Result<()> {
        if rows.is_empty() {
            return Ok(());
        }
        check_identifier(table)?;
        let _guard = self.locks.acquire(table).await;

        for row in rows {
            self.execute(&insert_statement(table, row)).await.map_err(|e| {
                error!(table, error = %e, "restore failed");
                SchemaError::migration(table, format!("恢复表数据失败: {}", e))
            })?;
        }
        info!(table, rows = rows.len(), "restored table data");
        Ok(())
    }

    /// Back up, then repair
    ///
    /// On repair failure the backup is handed back untouched; nothing is
    /// restored into the half-altered table.
    pub async fn backup_and_repair(
        &self,
        entity: &Entity,
        fields: &[Field],
        known_entities: &[Entity],
    ) -> std::result::Result<(RepairOutcome, Vec<Row>), RepairFailure> {
        let backup = self
            .backup_table_data(&entity.table_name)
            .await
            .map_err(|error| RepairFailure {
                error,
                backup: Vec::new(),
            })?;

        match self.repair_table_structure(entity, fields, known_entities).await {
            Ok(outcome) => Ok((outcome, backup)),
            Err(error) => {
                warn!(
                    table = %entity.table_name,
                    rows = backup.len(),
                    "repair failed, backup retained for manual recovery"
                );
                Err(RepairFailure { error, backup })
            }
        }
    }
}
