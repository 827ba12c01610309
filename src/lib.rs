//! Entity Schema Engine
//!
//! Declares data entities, their fields and the relationships between them,
//! then derives storage schema, generates association code for a target
//! framework, and reconciles live tables against the declared schema.
//!
//! ## Features
//!
//! - **Common Fields**: every entity starts with the five audit fields
//! - **Field Validation**: rule-table driven checks per data type
//! - **Relationships**: default naming, strict/lenient validation, consistency report
//! - **Code Generation**: TypeORM, JPA and Django association code plus join-table DDL
//! - **Migration**: table creation, drift detection, repair, backup and restore
//!
//! ## Architecture
//!
//! ```text
//! schema ──> common_fields ──> validate ──> repository
//!                                  │
//!                                  ├──> relation ──> codegen
//!                                  └──> migration (SqlExecutor port)
//! ```

pub mod codegen;
pub mod common_fields;
pub mod config;
pub mod error;
pub mod migration;
pub mod naming;
pub mod relation;
pub mod repository;
pub mod schema;
pub mod service;
pub mod validate;
pub mod version;

pub use codegen::{generate, process_project, Framework, GeneratedRelation, ProjectCodegen};
pub use config::SchemaConfig;
pub use error::{Result, SchemaError};
pub use migration::{MigrationManager, PgExecutor, SqlExecutor, TableDriftReport, TablePlan};
pub use relation::{check_consistency, resolve, RelationValidator, ResolvedRelation};
pub use repository::{EntityRepository, FieldRepository, InMemoryRepository, RelationshipRepository};
pub use schema::{
    DataType, Entity, EntityStatus, Field, NewEntity, NewField, NewRelationship, ReferentialAction,
    Relationship, RelationshipStatus, RelationshipType,
};
pub use service::SchemaService;
pub use validate::{validate_entity_fields, EntityValidationResult, FieldValidator};
