//! Schema Validation
//!
//! Pure checks over the in-memory model. Nothing here performs I/O, so a
//! validator can be shared across threads and called concurrently.
//!
//! ## Checks
//! 1. **Common fields**: the five audit fields are present and canonical
//! 2. **Per data type**: required and superfluous attributes, default values
//! 3. **Per entity**: unique codes, single primary key, resolvable foreign keys

pub mod fields;

pub use fields::{
    validate_entity_fields, EntityValidationResult, FieldIssue, FieldValidator, Severity,
    ValidationSummary,
};
