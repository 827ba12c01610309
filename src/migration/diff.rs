//! Drift detection between declared columns and a live table

use serde::{Deserialize, Serialize};

use crate::error::Result;

use super::executor::Row;

/// One row of `information_schema.columns`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnInfo {
    pub column_name: String,
    pub data_type: String,
    /// `YES` / `NO`
    pub is_nullable: String,
    #[serde(default)]
    pub column_default: Option<String>,
    #[serde(default)]
    pub character_maximum_length: Option<i64>,
    #[serde(default)]
    pub numeric_precision: Option<i64>,
    #[serde(default)]
    pub numeric_scale: Option<i64>,
}

impl ColumnInfo {
    pub fn from_row(row: Row) -> Result<Self> {
        Ok(serde_json::from_value(serde_json::Value::Object(row))?)
    }

    pub fn nullable(&self) -> bool {
        self.is_nullable.eq_ignore_ascii_case("YES")
    }
}

/// Result of comparing a table against its declared fields
///
/// Drift is reported, never raised.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TableDriftReport {
    pub table: String,
    pub is_valid: bool,
    pub missing_columns: Vec<String>,
    pub extra_columns: Vec<String>,
    pub issues: Vec<String>,
}

impl TableDriftReport {
    /// Table has no columns at all
    pub fn table_missing(&self) -> bool {
        !self.is_valid && self.missing_columns.is_empty() && self.extra_columns.is_empty()
    }
}

/// Compare `expected` column names with the introspected columns
pub fn diff_columns(table: &str, expected: &[String], actual: &[ColumnInfo]) -> TableDriftReport {
    if actual.is_empty() {
        return TableDriftReport {
            table: table.to_string(),
            is_valid: false,
            issues: vec![format!("表 {} 不存在", table)],
            ..Default::default()
        };
    }

    let missing_columns: Vec<String> = expected
        .iter()
        .filter(|col| !actual.iter().any(|c| &c.column_name == *col))
        .cloned()
        .collect();
    let extra_columns: Vec<String> = actual
        .iter()
        .map(|c| &c.column_name)
        .filter(|name| !expected.contains(name))
        .cloned()
        .collect();

    let issues = missing_columns
        .iter()
        .map(|c| format!("缺少列: {}", c))
        .chain(extra_columns.iter().map(|c| format!("多余的列: {}", c)))
        .collect();

    TableDriftReport {
        table: table.to_string(),
        is_valid: missing_columns.is_empty() && extra_columns.is_empty(),
        missing_columns,
        extra_columns,
        issues,
    }
}
