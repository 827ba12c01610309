//! Schema Model
//!
//! In-memory representation of entities, fields and relationships, plus the
//! rule constants every other component reads:
//! - the five common (audit) field definitions
//! - the per-data-type rule table (required attributes, default checks, SQL type)
//! - the allowed referential actions
//!
//! Constructors (`Entity::create`, `Field::create`, `Relationship::create`)
//! enforce single-record invariants. Cross-record invariants (unique codes,
//! single primary key, duplicate relationships) belong to the validators and
//! the service layer.

pub mod entity;
pub mod field;
pub mod relationship;
pub mod rules;

pub use entity::{Entity, EntityStatus, EntityUpdate, NewEntity};
pub use field::{DataType, Field, ForeignKeyRef, NewField};
pub use relationship::{
    NewRelationship, Relationship, RelationshipStatus, RelationshipType, RelationshipUpdate,
};
pub use rules::{
    CommonFieldDefinition, DataTypeRule, ReferentialAction, COMMON_FIELDS, DATA_TYPE_RULES,
    is_valid_identifier, rule_for,
};

/// Generate a fresh record id
pub(crate) fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Reject blank required text with the given message
pub(crate) fn require_text(value: &str, message: &str) -> crate::Result<()> {
    if value.trim().is_empty() {
        return Err(crate::SchemaError::validation(message));
    }
    Ok(())
}
