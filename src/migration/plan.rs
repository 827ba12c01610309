//! Table planning
//!
//! Derives the CREATE TABLE batch and expected column set for an entity.

use std::collections::HashMap;

use serde::Serialize;

use crate::codegen::ddl::{self, ColumnReference};
use crate::error::{Result, SchemaError};
use crate::naming::to_snake_case;
use crate::schema::{Entity, Field};

/// Audit columns that always get a plain index
const AUDIT_INDEX_COLUMNS: [&str; 3] = ["created_by", "created_at", "updated_at"];

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexPlan {
    pub column: String,
    pub unique: bool,
    pub sql: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TablePlan {
    pub table: String,
    /// Column names in display order
    pub columns: Vec<String>,
    pub create_sql: String,
    pub indexes: Vec<IndexPlan>,
}

impl TablePlan {
    pub fn index_sqls(&self) -> impl Iterator<Item = &str> {
        self.indexes.iter().map(|i| i.sql.as_str())
    }

    /// Index statements for one column
    pub fn indexes_for<'a>(&'a self, column: &'a str) -> impl Iterator<Item = &'a IndexPlan> {
        self.indexes.iter().filter(move |i| i.column == column)
    }

    /// CREATE TABLE followed by its indexes, one statement per line
    pub fn batch(&self) -> String {
        std::iter::once(self.create_sql.as_str())
            .chain(self.index_sqls())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Fields ordered by display order
///
/// Fails when two fields map onto the same column.
fn ordered_fields(fields: &[Field]) -> Result<Vec<&Field>> {
    let mut sorted: Vec<&Field> = fields.iter().collect();
    sorted.sort_by_key(|f| f.display_order);

    let mut seen: HashMap<String, &str> = HashMap::new();
    for field in sorted.iter().copied() {
        if let Some(other) = seen.insert(field.column_name(), field.code.as_str()) {
            return Err(SchemaError::validation(format!(
                "字段 '{}' 与 '{}' 映射到同一列: {}",
                other,
                field.code,
                field.column_name()
            )));
        }
    }
    Ok(sorted)
}

/// Column names the live table is expected to have
pub fn expected_columns(fields: &[Field]) -> Result<Vec<String>> {
    Ok(ordered_fields(fields)?.iter().map(|f| f.column_name()).collect())
}

/// Plan the table without resolving foreign key targets
pub fn plan_create(entity: &Entity, fields: &[Field]) -> Result<TablePlan> {
    plan_create_with_refs(entity, fields, &[])
}

/// Plan the table, rendering REFERENCES clauses for foreign keys whose
/// target entity is in `known_entities`
pub fn plan_create_with_refs(
    entity: &Entity,
    fields: &[Field],
    known_entities: &[Entity],
) -> Result<TablePlan> {
    let table = entity.table_name.as_str();
    let ordered = ordered_fields(fields)?;

    let referenced: Vec<Option<(String, String)>> = ordered
        .iter()
        .map(|f| {
            let fk = f.foreign_key.as_ref()?;
            let target = if fk.referenced_entity_id == entity.id {
                Some(entity)
            } else {
                known_entities.iter().find(|e| e.id == fk.referenced_entity_id)
            }?;
            Some((target.table_name.clone(), to_snake_case(&fk.referenced_field)))
        })
        .collect();

    let definitions: Vec<String> = ordered
        .iter()
        .zip(&referenced)
        .map(|(field, reference)| {
            let reference = reference.as_ref().map(|(table, column)| ColumnReference {
                table: table.as_str(),
                column: column.as_str(),
            });
            ddl::column_definition(field, reference)
        })
        .collect();

    let mut indexes = Vec::new();
    for field in &ordered {
        let column = field.column_name();
        if field.unique && !field.primary_key {
            indexes.push(index(table, &column, true));
        } else if AUDIT_INDEX_COLUMNS.contains(&column.as_str()) {
            indexes.push(index(table, &column, false));
        }
    }

    Ok(TablePlan {
        table: table.to_string(),
        columns: ordered.iter().map(|f| f.column_name()).collect(),
        create_sql: ddl::create_table(table, &definitions),
        indexes,
    })
}

fn index(table: &str, column: &str, unique: bool) -> IndexPlan {
    IndexPlan {
        column: column.to_string(),
        unique,
        sql: ddl::create_index(table, column, unique),
    }
}
