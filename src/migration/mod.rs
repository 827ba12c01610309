//! Migration Planner & Reconciler
//!
//! - `plan`: CREATE TABLE batch and expected columns for an entity
//! - `diff`: drift between expected and live columns
//! - `manager`: applies, validates, repairs, backs up and restores
//! - `executor` / `postgres`: the SQL execution port and its sqlx adapter

pub mod diff;
pub mod executor;
pub mod locks;
pub mod manager;
pub mod plan;
pub mod postgres;

pub use diff::{diff_columns, ColumnInfo, TableDriftReport};
pub use executor::{DbError, DbResult, Row, SqlExecutor};
pub use locks::TableLocks;
pub use manager::{MigrationManager, RepairFailure, RepairOutcome};
pub use plan::{expected_columns, plan_create, plan_create_with_refs, IndexPlan, TablePlan};
pub use postgres::PgExecutor;
