//! SQL DDL emitter
//!
//! Plain ASCII PostgreSQL statements shared by the migration planner and
//! the MANY_TO_MANY join-table generator. Identifiers are emitted unquoted.
//! `Entity` and `Relationship` reject table, join-table and foreign key
//! names that are not plain identifiers or are reserved words, and the
//! migration manager checks plain-string table names before calling in.

use crate::relation::ResolvedRelation;
use crate::schema::rules::{is_sql_expression, rule_for};
use crate::schema::{DataType, Field};

/// Column type for a field
pub fn sql_type(field: &Field) -> String {
    (rule_for(field.data_type).sql_type)(field)
}

/// Render a default value as a SQL literal or expression
pub fn sql_default(field: &Field) -> Option<String> {
    let value = field.default_value.as_deref().filter(|v| !v.is_empty())?;
    if is_sql_expression(value) {
        return Some(value.to_string());
    }
    let rendered = match field.data_type {
        DataType::Integer | DataType::Decimal => value.to_string(),
        DataType::Boolean => match value.to_ascii_lowercase().as_str() {
            "true" | "1" => "TRUE".to_string(),
            _ => "FALSE".to_string(),
        },
        _ => quote_literal(value),
    };
    Some(rendered)
}

fn quote_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

/// Referenced `(table, column)` of a foreign key column
#[derive(Debug, Clone, Copy)]
pub struct ColumnReference<'a> {
    pub table: &'a str,
    pub column: &'a str,
}

/// Full column definition for CREATE TABLE
///
/// Uniqueness of non-key columns is carried by a separate unique index.
pub fn column_definition(field: &Field, reference: Option<ColumnReference<'_>>) -> String {
    let mut def = format!("{} {}", field.column_name(), sql_type(field));

    if field.primary_key {
        def.push_str(" PRIMARY KEY");
    } else if field.is_required() {
        def.push_str(" NOT NULL");
    }
    if let Some(default) = sql_default(field) {
        def.push_str(&format!(" DEFAULT {}", default));
    }
    if let Some(check) = field.check_constraint.as_deref().filter(|c| !c.trim().is_empty()) {
        def.push_str(&format!(" CHECK ({})", check));
    }
    if let (Some(fk), Some(reference)) = (&field.foreign_key, reference) {
        def.push_str(&format!(
            " REFERENCES {}({}) ON DELETE {} ON UPDATE {}",
            reference.table,
            reference.column,
            fk.on_delete.as_sql(),
            fk.on_update.as_sql()
        ));
    }
    def
}

/// Column definition for `ALTER TABLE ... ADD COLUMN` on a table that may
/// already hold rows: NOT NULL only when a default can fill existing rows
pub fn repair_column_definition(field: &Field) -> String {
    let column = field.column_name();
    let body = match column.as_str() {
        "id" => "VARCHAR(36) DEFAULT gen_random_uuid() NOT NULL".to_string(),
        "created_by" => "VARCHAR(36) NOT NULL".to_string(),
        "created_at" => "TIMESTAMP(6) DEFAULT CURRENT_TIMESTAMP NOT NULL".to_string(),
        "updated_by" => "VARCHAR(36)".to_string(),
        "updated_at" => "TIMESTAMP(6) DEFAULT CURRENT_TIMESTAMP".to_string(),
        _ => {
            let mut body = sql_type(field);
            if let Some(default) = sql_default(field) {
                body.push_str(&format!(" DEFAULT {}", default));
                if field.is_required() {
                    body.push_str(" NOT NULL");
                }
            }
            body
        }
    };
    format!("{} {}", column, body)
}

pub fn create_table(table: &str, columns: &[String]) -> String {
    format!(
        "CREATE TABLE IF NOT EXISTS {} (\n  {}\n);",
        table,
        columns.join(",\n  ")
    )
}

pub fn index_name(table: &str, column: &str) -> String {
    format!("idx_{}_{}", table, column)
}

pub fn create_index(table: &str, column: &str, unique: bool) -> String {
    format!(
        "CREATE {}INDEX IF NOT EXISTS {} ON {} ({});",
        if unique { "UNIQUE " } else { "" },
        index_name(table, column),
        table,
        column
    )
}

pub fn add_column(table: &str, column_definition: &str) -> String {
    format!("ALTER TABLE {} ADD COLUMN IF NOT EXISTS {};", table, column_definition)
}

pub fn drop_column(table: &str, column: &str) -> String {
    format!("ALTER TABLE {} DROP COLUMN IF EXISTS {};", table, column)
}

pub fn drop_table(table: &str) -> String {
    format!("DROP TABLE IF EXISTS {};", table)
}

/// Junction table for a resolved MANY_TO_MANY relationship
pub fn join_table(relationship_name: &str, resolved: &ResolvedRelation) -> Option<String> {
    let table = resolved.join_table.as_deref()?;
    let source_col = resolved.join_column.as_deref()?;
    let target_col = resolved.inverse_join_column.as_deref()?;

    Some(format!(
        "-- Join table for {name}
CREATE TABLE {table} (
  {s} UUID NOT NULL,
  {t} UUID NOT NULL,
  created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP,
  PRIMARY KEY ({s}, {t}),
  FOREIGN KEY ({s}) REFERENCES {source_table}(id) ON DELETE CASCADE,
  FOREIGN KEY ({t}) REFERENCES {target_table}(id) ON DELETE CASCADE
);",
        name = relationship_name,
        table = table,
        s = source_col,
        t = target_col,
        source_table = resolved.source_table,
        target_table = resolved.target_table,
    ))
}
