//! Migration manager tests against a scripted executor

mod common;

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;

use entity_schemas::common_fields::inject;
use entity_schemas::config::MigrationConfig;
use entity_schemas::migration::{DbError, MigrationManager};
use entity_schemas::schema::ForeignKeyRef;
use entity_schemas::{DataType, Entity, NewEntity, NewField};

use common::{init_tracing, row, users_entity, MockExecutor, USERS_COLUMNS};

fn manager(executor: &Arc<MockExecutor>) -> MigrationManager {
    init_tracing();
    MigrationManager::new(executor.clone(), MigrationConfig::default())
}

fn manager_with_timeout(executor: &Arc<MockExecutor>, timeout_ms: u64) -> MigrationManager {
    init_tracing();
    let config = MigrationConfig {
        statement_timeout_ms: timeout_ms,
        ..MigrationConfig::default()
    };
    MigrationManager::new(executor.clone(), config)
}

// =============================================================================
// Create / drop
// =============================================================================

#[tokio::test]
async fn test_create_table_runs_one_batch() {
    let executor = Arc::new(MockExecutor::new());
    let (entity, fields) = users_entity();

    let plan = manager(&executor).create_table(&entity, &fields, &[]).await.unwrap();

    let executed = executor.executed();
    assert_eq!(executed.len(), 1);
    assert!(executed[0].starts_with("CREATE TABLE IF NOT EXISTS users ("));
    assert!(executed[0].contains("CREATE UNIQUE INDEX IF NOT EXISTS idx_users_username ON users (username);"));
    assert_eq!(plan.columns, USERS_COLUMNS);
}

#[tokio::test]
async fn test_create_table_failure_is_wrapped() {
    let executor = Arc::new(MockExecutor::new().fail_executes(DbError::new("permission denied")));
    let (entity, fields) = users_entity();

    let err = manager(&executor).create_table(&entity, &fields, &[]).await.unwrap_err();
    assert!(err.is_migration());
    assert_eq!(err.to_string(), "创建表 users 失败: permission denied");
}

#[tokio::test]
async fn test_drop_table() {
    let executor = Arc::new(MockExecutor::new());
    manager(&executor).drop_table("users").await.unwrap();
    assert_eq!(executor.executed(), vec!["DROP TABLE IF EXISTS users;".to_string()]);

    let executor = Arc::new(MockExecutor::new().fail_executes(DbError::new("in use")));
    let err = manager(&executor).drop_table("users").await.unwrap_err();
    assert_eq!(err.to_string(), "删除表 users 失败: in use");
}

#[tokio::test]
async fn test_table_names_must_be_identifiers() {
    let executor = Arc::new(MockExecutor::new());
    let manager = manager(&executor);

    let err = manager.drop_table("users; DROP TABLE accounts").await.unwrap_err();
    assert!(err.is_validation());
    let err = manager.backup_table_data("users u, accounts").await.unwrap_err();
    assert!(err.is_validation());
    assert!(executor.executed().is_empty());
}

// =============================================================================
// Validate
// =============================================================================

#[tokio::test]
async fn test_validate_missing_table() {
    let executor = Arc::new(MockExecutor::new());
    let (entity, fields) = users_entity();

    let report = manager(&executor)
        .validate_table_structure(&entity, &fields)
        .await
        .unwrap();
    assert!(!report.is_valid);
    assert_eq!(report.issues, vec!["表 users 不存在".to_string()]);
}

#[tokio::test]
async fn test_validate_missing_and_extra_columns() {
    let (entity, fields) = users_entity();

    let executor = Arc::new(MockExecutor::new().with_columns(&USERS_COLUMNS[..6]));
    let report = manager(&executor)
        .validate_table_structure(&entity, &fields)
        .await
        .unwrap();
    assert_eq!(report.missing_columns, vec!["email".to_string()]);
    assert!(report.issues.contains(&"缺少列: email".to_string()));

    let mut superset = USERS_COLUMNS.to_vec();
    superset.push("nickname");
    let executor = Arc::new(MockExecutor::new().with_columns(&superset));
    let report = manager(&executor)
        .validate_table_structure(&entity, &fields)
        .await
        .unwrap();
    assert!(!report.is_valid);
    assert_eq!(report.extra_columns, vec!["nickname".to_string()]);
    assert!(report.issues.contains(&"多余的列: nickname".to_string()));
}

#[tokio::test]
async fn test_validate_introspection_failure() {
    let executor = Arc::new(MockExecutor::new().fail_queries(DbError::new("connection reset")));
    let (entity, fields) = users_entity();

    let err = manager(&executor)
        .validate_table_structure(&entity, &fields)
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "验证表结构失败: connection reset");
}

// =============================================================================
// Repair
// =============================================================================

#[tokio::test]
async fn test_repair_is_noop_when_valid() {
    let executor = Arc::new(MockExecutor::new().with_columns(&USERS_COLUMNS));
    let (entity, fields) = users_entity();

    let outcome = manager(&executor)
        .repair_table_structure(&entity, &fields, &[])
        .await
        .unwrap();
    assert!(outcome.was_noop());
    assert_eq!(executor.alter_count(), 0);
    assert!(executor.executed().is_empty());
}

#[tokio::test]
async fn test_repair_adds_missing_columns_only() {
    let executor = Arc::new(
        MockExecutor::new().with_columns(&["id", "created_by", "created_at", "updated_by", "email", "legacy"]),
    );
    let (entity, fields) = users_entity();

    let outcome = manager(&executor)
        .repair_table_structure(&entity, &fields, &[])
        .await
        .unwrap();

    assert_eq!(executor.alter_count(), 2);
    assert_eq!(
        executor.executed(),
        vec![
            "ALTER TABLE users ADD COLUMN IF NOT EXISTS updated_at TIMESTAMP(6) DEFAULT CURRENT_TIMESTAMP;".to_string(),
            "CREATE INDEX IF NOT EXISTS idx_users_updated_at ON users (updated_at);".to_string(),
            "ALTER TABLE users ADD COLUMN IF NOT EXISTS username VARCHAR(50);".to_string(),
            "CREATE UNIQUE INDEX IF NOT EXISTS idx_users_username ON users (username);".to_string(),
        ]
    );
    // extras are reported, never dropped
    assert_eq!(outcome.drift.extra_columns, vec!["legacy".to_string()]);
    assert!(!executor.executed().iter().any(|sql| sql.contains("DROP")));
}

#[tokio::test]
async fn test_repair_creates_missing_table() {
    let executor = Arc::new(MockExecutor::new());
    let (entity, fields) = users_entity();

    let outcome = manager(&executor)
        .repair_table_structure(&entity, &fields, &[])
        .await
        .unwrap();
    assert_eq!(outcome.executed.len(), 1);
    assert!(executor.executed()[0].starts_with("CREATE TABLE IF NOT EXISTS users"));
}

#[tokio::test]
async fn test_repair_recreates_foreign_key_references() {
    let (user, _) = users_entity();
    let post = Entity::create(NewEntity::new("p-1", "post", "Post", "admin").table_name("posts")).unwrap();
    let fields = inject(
        &post,
        vec![NewField::new("userId", "Author", DataType::String)
            .length(36)
            .references(ForeignKeyRef::new(&user.id, "id"))],
        "admin",
    )
    .unwrap();

    let executor = Arc::new(MockExecutor::new());
    manager(&executor)
        .repair_table_structure(&post, &fields, std::slice::from_ref(&user))
        .await
        .unwrap();
    assert!(executor.executed()[0].contains("user_id VARCHAR(36) REFERENCES users(id)"));
}

#[tokio::test]
async fn test_repair_rejects_fields_sharing_a_column() {
    let executor = Arc::new(MockExecutor::new().with_columns(&["id"]));
    let (entity, mut fields) = users_entity();
    let mut clash = fields[5].clone();
    clash.code = "user_name".to_string();
    clash.display_order = 8;
    fields.push(clash.clone());
    clash.code = "userName".to_string();
    clash.display_order = 9;
    fields.push(clash);

    let err = manager(&executor)
        .repair_table_structure(&entity, &fields, &[])
        .await
        .unwrap_err();
    assert!(err.is_validation());
    assert!(executor.executed().is_empty());
}

#[tokio::test]
async fn test_repair_failure_is_wrapped() {
    let executor = Arc::new(
        MockExecutor::new()
            .with_columns(&["id"])
            .fail_executes(DbError::new("lock timeout")),
    );
    let (entity, fields) = users_entity();

    let err = manager(&executor)
        .repair_table_structure(&entity, &fields, &[])
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "修复表结构失败: lock timeout");
}

// =============================================================================
// Backup / restore
// =============================================================================

#[tokio::test]
async fn test_backup_of_missing_table_is_empty() {
    let executor = Arc::new(MockExecutor::new().fail_queries(DbError::with_code(
        "42P01",
        "relation \"users\" does not exist",
    )));
    let rows = manager(&executor).backup_table_data("users").await.unwrap();
    assert!(rows.is_empty());
}

#[tokio::test]
async fn test_backup_error_is_wrapped() {
    let executor = Arc::new(MockExecutor::new().fail_queries(DbError::new("disk full")));
    let err = manager(&executor).backup_table_data("users").await.unwrap_err();
    assert!(err.is_migration());
    assert_eq!(err.to_string(), "备份表数据失败: disk full");
}

#[tokio::test]
async fn test_backup_wraps_errors_other_than_missing_table() {
    let executor = Arc::new(MockExecutor::new().fail_queries(DbError::with_code(
        "42703",
        "column \"x\" does not exist",
    )));
    let err = manager(&executor).backup_table_data("users").await.unwrap_err();
    assert!(err.is_migration());
    assert_eq!(err.to_string(), "备份表数据失败: column \"x\" does not exist");
}

#[tokio::test]
async fn test_backup_then_restore() {
    let rows = vec![
        row(json!({"id": "u-1", "username": "alice"})),
        row(json!({"id": "u-2", "username": "bob"})),
    ];
    let executor = Arc::new(MockExecutor::new().with_data(rows));
    let manager = manager(&executor);

    let backup = manager.backup_table_data("users").await.unwrap();
    assert_eq!(backup.len(), 2);

    manager.restore_table_data("users", &backup).await.unwrap();
    assert_eq!(
        executor.executed(),
        vec![
            "INSERT INTO users (id, username) VALUES ('u-1', 'alice');".to_string(),
            "INSERT INTO users (id, username) VALUES ('u-2', 'bob');".to_string(),
        ]
    );
}

#[tokio::test]
async fn test_restore_empty_backup_is_noop() {
    let executor = Arc::new(MockExecutor::new().fail_executes(DbError::new("unreachable")));
    manager(&executor).restore_table_data("users", &[]).await.unwrap();
    assert!(executor.executed().is_empty());
}

#[tokio::test]
async fn test_restore_error_is_wrapped() {
    let executor = Arc::new(MockExecutor::new().fail_executes(DbError::new("duplicate key")));
    let err = manager(&executor)
        .restore_table_data("users", &[row(json!({"id": "u-1"}))])
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "恢复表数据失败: duplicate key");
}

#[tokio::test]
async fn test_backup_and_repair_keeps_backup_on_failure() {
    let executor = Arc::new(
        MockExecutor::new()
            .with_columns(&["id"])
            .with_data(vec![row(json!({"id": "u-1"}))])
            .fail_executes(DbError::new("boom")),
    );
    let (entity, fields) = users_entity();

    let failure = manager(&executor)
        .backup_and_repair(&entity, &fields, &[])
        .await
        .unwrap_err();
    assert_eq!(failure.error.to_string(), "修复表结构失败: boom");
    assert_eq!(failure.backup.len(), 1);
}

// =============================================================================
// Timeouts and locking
// =============================================================================

#[tokio::test]
async fn test_statement_timeout() {
    let executor = Arc::new(MockExecutor::new().with_delay(Duration::from_millis(500)));
    let (entity, fields) = users_entity();

    let err = manager_with_timeout(&executor, 20)
        .create_table(&entity, &fields, &[])
        .await
        .unwrap_err();
    assert!(err.is_migration());
    assert_eq!(err.to_string(), "创建表 users 失败: timed out after 20ms");
}

#[tokio::test]
async fn test_same_table_operations_are_serialized() {
    let executor = Arc::new(MockExecutor::new().with_delay(Duration::from_millis(30)));
    let manager = manager(&executor);
    let (entity, fields) = users_entity();

    let (a, b) = tokio::join!(
        manager.create_table(&entity, &fields, &[]),
        manager.create_table(&entity, &fields, &[]),
    );
    a.unwrap();
    b.unwrap();
    assert_eq!(executor.max_in_flight(), 1);
}

#[tokio::test]
async fn test_backup_waits_for_repair_on_same_table() {
    let executor = Arc::new(
        MockExecutor::new()
            .with_columns(&["id"])
            .with_data(vec![row(json!({"id": "u-1"}))])
            .with_delay(Duration::from_millis(30)),
    );
    let manager = manager(&executor);
    let (entity, fields) = users_entity();

    let (repaired, backup) = tokio::join!(
        manager.repair_table_structure(&entity, &fields, &[]),
        manager.backup_table_data("users"),
    );
    repaired.unwrap();
    assert_eq!(backup.unwrap().len(), 1);
    assert_eq!(executor.max_in_flight(), 1);
}

#[tokio::test]
async fn test_different_tables_run_concurrently() {
    let executor = Arc::new(MockExecutor::new().with_delay(Duration::from_millis(30)));
    let manager = manager(&executor);

    let (a, b) = tokio::join!(manager.drop_table("users"), manager.drop_table("posts"));
    a.unwrap();
    b.unwrap();
    assert_eq!(executor.max_in_flight(), 2);
}

// =============================================================================
// End to end
// =============================================================================

#[tokio::test]
async fn test_users_table_round_trip() {
    let (entity, fields) = users_entity();

    let executor = Arc::new(MockExecutor::new());
    let plan = manager(&executor).create_table(&entity, &fields, &[]).await.unwrap();
    assert_eq!(plan.columns.len(), 7);
    assert_eq!(plan.indexes.iter().filter(|i| i.unique).count(), 1);

    // the live table now reports exactly the planned columns
    let executor = Arc::new(MockExecutor::new().with_columns(&USERS_COLUMNS));
    let report = manager(&executor)
        .validate_table_structure(&entity, &fields)
        .await
        .unwrap();
    assert!(report.is_valid);
    assert!(report.issues.is_empty());
}
