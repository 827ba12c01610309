//! Relationship Resolver & Validator
//!
//! - `names`: default accessor, foreign key and join table names
//! - `validate`: per-relationship checks (lenient for codegen, strict for creation)
//! - `graph`: petgraph view of a project's relationships
//! - `consistency`: project-wide missing-reverse detection

pub mod consistency;
pub mod graph;
pub mod names;
pub mod validate;

pub use consistency::{check_consistency, ConsistencyIssue};
pub use graph::RelationGraph;
pub use names::{
    class_name, default_accessor, default_foreign_key, default_join_table, resolve,
    ResolvedRelation,
};
pub use validate::{RelationValidation, RelationValidator};
