//! Common-Field Injector
//!
//! Every entity carries the same five audit fields (`id`, `createdBy`,
//! `createdAt`, `updatedBy`, `updatedAt`) ahead of its business fields.

use std::collections::HashSet;

use tracing::debug;

use crate::error::{Result, SchemaError};
use crate::naming::to_snake_case;
use crate::schema::{CommonFieldDefinition, Entity, Field, NewField, COMMON_FIELDS};

/// The five audit field definitions, in order
pub fn common_field_definitions() -> &'static [CommonFieldDefinition] {
    &COMMON_FIELDS
}

pub fn is_common_field_code(code: &str) -> bool {
    COMMON_FIELDS.iter().any(|f| f.code == code)
}

/// Highest display order used by the audit fields
pub fn common_field_max_display_order() -> u32 {
    COMMON_FIELDS
        .iter()
        .map(|f| f.display_order)
        .max()
        .unwrap_or(0)
}

/// Reject a business field code that shadows an audit field, either by code
/// or by column name (`created_by` maps onto `createdBy`)
pub fn check_business_field_conflict(code: &str) -> Result<()> {
    let column = to_snake_case(code);
    if is_common_field_code(code) || COMMON_FIELDS.iter().any(|f| to_snake_case(f.code) == column) {
        return Err(SchemaError::conflict(format!(
            "字段代码 '{}' 与系统通用字段冲突，请使用其他名称",
            code
        )));
    }
    Ok(())
}

/// Build the audit fields for `entity`
pub fn create_common_fields(entity: &Entity, created_by: &str) -> Vec<Field> {
    COMMON_FIELDS
        .iter()
        .map(|def| Field::from_common(def, &entity.id, created_by))
        .collect()
}

/// Audit fields followed by the business fields, display order continuing at 6
///
/// Fails on a business code that shadows an audit field or repeats another
/// business code.
pub fn inject(entity: &Entity, business_fields: Vec<NewField>, created_by: &str) -> Result<Vec<Field>> {
    let mut seen = HashSet::new();
    for input in &business_fields {
        check_business_field_conflict(&input.code)?;
        if !seen.insert(input.code.as_str()) {
            return Err(SchemaError::conflict(format!(
                "字段代码 '{}' 已存在",
                input.code
            )));
        }
    }

    let mut fields = create_common_fields(entity, created_by);
    let mut order = common_field_max_display_order();
    for input in business_fields {
        order += 1;
        fields.push(Field::create(&entity.id, input, order, created_by)?);
    }

    debug!(entity = %entity.code, fields = fields.len(), "Injected common fields");
    Ok(fields)
}
