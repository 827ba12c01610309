//! Rule constants shared by the model, the validators and the migration planner
//!
//! The data-type rule table replaces per-type validation code: one generic
//! validator walks `DATA_TYPE_RULES` and one generic planner reads the SQL
//! type renderer from the same row.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use super::field::{DataType, Field};
use crate::error::{Result, SchemaError};

// =============================================================================
// Identifiers
// =============================================================================

/// Entity, field and relationship codes
static IDENTIFIER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z][A-Za-z0-9_]*$").expect("identifier pattern is valid")
});

static INTEGER_LITERAL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^-?\d+$").expect("integer pattern is valid"));

static DECIMAL_LITERAL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^-?\d+(\.\d+)?$").expect("decimal pattern is valid"));

/// Maximum length of a field code
pub const MAX_CODE_LENGTH: usize = 50;

/// STRING columns above this length should be TEXT
pub const MAX_STRING_LENGTH: u32 = 4000;

/// Maximum DECIMAL precision accepted by the target databases
pub const MAX_DECIMAL_PRECISION: u32 = 38;

/// Longest identifier PostgreSQL keeps without truncation
pub const MAX_SQL_IDENTIFIER_LENGTH: usize = 63;

/// SQL keywords that cannot appear unquoted as a code or table name
pub const RESERVED_WORDS: &[&str] = &[
    "class", "type", "order", "group", "select", "from", "where", "insert", "update", "delete",
    "table", "create", "drop", "alter", "index", "references", "primary", "foreign", "limit",
];

/// Returns true if `code` is a legal entity/field/relationship code
pub fn is_valid_identifier(code: &str) -> bool {
    IDENTIFIER.is_match(code)
}

pub fn is_reserved_word(name: &str) -> bool {
    RESERVED_WORDS.contains(&name.to_lowercase().as_str())
}

/// Returns true if `name` can be written unquoted into DDL as a table or column name
pub fn is_sql_identifier(name: &str) -> bool {
    is_valid_identifier(name) && name.len() <= MAX_SQL_IDENTIFIER_LENGTH && !is_reserved_word(name)
}

// =============================================================================
// Referential actions
// =============================================================================

/// What the database does to dependent rows on delete/update
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReferentialAction {
    Cascade,
    SetNull,
    #[default]
    Restrict,
    NoAction,
}

impl ReferentialAction {
    pub const ALL: [ReferentialAction; 4] = [
        ReferentialAction::Cascade,
        ReferentialAction::SetNull,
        ReferentialAction::Restrict,
        ReferentialAction::NoAction,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ReferentialAction::Cascade => "CASCADE",
            ReferentialAction::SetNull => "SET_NULL",
            ReferentialAction::Restrict => "RESTRICT",
            ReferentialAction::NoAction => "NO_ACTION",
        }
    }

    /// SQL spelling (`SET NULL`, `NO ACTION`)
    pub fn as_sql(&self) -> &'static str {
        match self {
            ReferentialAction::Cascade => "CASCADE",
            ReferentialAction::SetNull => "SET NULL",
            ReferentialAction::Restrict => "RESTRICT",
            ReferentialAction::NoAction => "NO ACTION",
        }
    }

    /// Parse an action for the named slot (`onDelete`, `onUpdate`)
    pub fn parse_for(slot: &str, value: &str) -> Result<Self> {
        value
            .parse()
            .map_err(|_| SchemaError::validation(format!("Invalid {} action", slot)))
    }
}

impl FromStr for ReferentialAction {
    type Err = SchemaError;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|a| a.as_str() == s)
            .ok_or_else(|| SchemaError::validation(format!("Invalid referential action: {}", s)))
    }
}

impl fmt::Display for ReferentialAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Common fields
// =============================================================================

/// Definition of one of the five audit fields attached to every entity
#[derive(Debug, Clone, Copy)]
pub struct CommonFieldDefinition {
    pub code: &'static str,
    /// Display name
    pub name: &'static str,
    pub data_type: DataType,
    pub length: Option<u32>,
    pub required: bool,
    pub unique: bool,
    pub primary_key: bool,
    pub default_value: Option<&'static str>,
    pub description: &'static str,
    pub display_order: u32,
}

/// The audit fields, in their fixed order
pub static COMMON_FIELDS: [CommonFieldDefinition; 5] = [
    CommonFieldDefinition {
        code: "id",
        name: "主键",
        data_type: DataType::String,
        length: Some(36),
        required: true,
        unique: true,
        primary_key: true,
        default_value: None,
        description: "记录唯一标识",
        display_order: 1,
    },
    CommonFieldDefinition {
        code: "createdBy",
        name: "创建者",
        data_type: DataType::String,
        length: Some(36),
        required: true,
        unique: false,
        primary_key: false,
        default_value: None,
        description: "创建记录的用户",
        display_order: 2,
    },
    CommonFieldDefinition {
        code: "createdAt",
        name: "创建时间",
        data_type: DataType::DateTime,
        length: None,
        required: true,
        unique: false,
        primary_key: false,
        default_value: Some("CURRENT_TIMESTAMP"),
        description: "记录创建时间",
        display_order: 3,
    },
    CommonFieldDefinition {
        code: "updatedBy",
        name: "更新者",
        data_type: DataType::String,
        length: Some(36),
        required: false,
        unique: false,
        primary_key: false,
        default_value: None,
        description: "最后更新记录的用户",
        display_order: 4,
    },
    CommonFieldDefinition {
        code: "updatedAt",
        name: "更新时间",
        data_type: DataType::DateTime,
        length: None,
        required: false,
        unique: false,
        primary_key: false,
        default_value: None,
        description: "记录最后更新时间",
        display_order: 5,
    },
];

// =============================================================================
// Data type rules
// =============================================================================

/// Declarative per-type rule row
#[derive(Debug, Clone, Copy)]
pub struct DataTypeRule {
    pub data_type: DataType,
    pub requires_length: bool,
    pub requires_precision: bool,
    /// Attributes the type understands; anything else is superfluous
    pub accepts_length: bool,
    pub accepts_precision: bool,
    /// Checks a literal default value
    pub check_default: fn(&str) -> bool,
    /// Completes `<TYPE>类型字段的默认值...` when the check fails
    pub default_hint: &'static str,
    /// Renders the column type for DDL
    pub sql_type: fn(&Field) -> String,
}

/// Indexed by `DataType::index()`
pub static DATA_TYPE_RULES: [DataTypeRule; 10] = [
    DataTypeRule {
        data_type: DataType::String,
        requires_length: true,
        requires_precision: false,
        accepts_length: true,
        accepts_precision: false,
        check_default: any_literal,
        default_hint: "",
        sql_type: varchar_type,
    },
    DataTypeRule {
        data_type: DataType::Text,
        requires_length: false,
        requires_precision: false,
        accepts_length: false,
        accepts_precision: false,
        check_default: any_literal,
        default_hint: "",
        sql_type: text_type,
    },
    DataTypeRule {
        data_type: DataType::Integer,
        requires_length: false,
        requires_precision: false,
        accepts_length: false,
        accepts_precision: false,
        check_default: integer_literal,
        default_hint: "必须是整数",
        sql_type: integer_type,
    },
    DataTypeRule {
        data_type: DataType::Decimal,
        requires_length: false,
        requires_precision: true,
        accepts_length: false,
        accepts_precision: true,
        check_default: decimal_literal,
        default_hint: "必须是数字",
        sql_type: decimal_type,
    },
    DataTypeRule {
        data_type: DataType::Boolean,
        requires_length: false,
        requires_precision: false,
        accepts_length: false,
        accepts_precision: false,
        check_default: boolean_literal,
        default_hint: "必须是true、false、1或0",
        sql_type: boolean_type,
    },
    DataTypeRule {
        data_type: DataType::Date,
        requires_length: false,
        requires_precision: false,
        accepts_length: false,
        accepts_precision: false,
        check_default: date_literal,
        default_hint: "必须是有效的日期格式(YYYY-MM-DD)",
        sql_type: date_type,
    },
    DataTypeRule {
        data_type: DataType::DateTime,
        requires_length: false,
        requires_precision: false,
        accepts_length: false,
        accepts_precision: false,
        check_default: datetime_literal,
        default_hint: "必须是有效的日期时间格式",
        sql_type: timestamp_type,
    },
    DataTypeRule {
        data_type: DataType::Time,
        requires_length: false,
        requires_precision: false,
        accepts_length: false,
        accepts_precision: false,
        check_default: time_literal,
        default_hint: "必须是有效的时间格式(HH:MM[:SS])",
        sql_type: time_type,
    },
    DataTypeRule {
        data_type: DataType::Uuid,
        requires_length: false,
        requires_precision: false,
        accepts_length: false,
        accepts_precision: false,
        check_default: uuid_literal,
        default_hint: "必须是有效的UUID",
        sql_type: uuid_type,
    },
    DataTypeRule {
        data_type: DataType::Json,
        requires_length: false,
        requires_precision: false,
        accepts_length: false,
        accepts_precision: false,
        check_default: json_literal,
        default_hint: "必须是有效的JSON格式",
        sql_type: json_type,
    },
];

/// Look up the rule row for a data type
pub fn rule_for(data_type: DataType) -> &'static DataTypeRule {
    &DATA_TYPE_RULES[data_type.index()]
}

/// SQL expressions accepted verbatim as defaults
pub(crate) fn is_sql_expression(value: &str) -> bool {
    matches!(
        value.to_ascii_uppercase().as_str(),
        "CURRENT_TIMESTAMP" | "CURRENT_DATE" | "CURRENT_TIME" | "NOW()" | "GEN_RANDOM_UUID()" | "NULL"
    )
}

fn any_literal(_: &str) -> bool {
    true
}

fn integer_literal(v: &str) -> bool {
    INTEGER_LITERAL.is_match(v) && v.parse::<i64>().is_ok()
}

fn decimal_literal(v: &str) -> bool {
    DECIMAL_LITERAL.is_match(v)
}

fn boolean_literal(v: &str) -> bool {
    matches!(v.to_ascii_lowercase().as_str(), "true" | "false" | "1" | "0")
}

fn date_literal(v: &str) -> bool {
    is_sql_expression(v) || NaiveDate::parse_from_str(v, "%Y-%m-%d").is_ok()
}

fn datetime_literal(v: &str) -> bool {
    is_sql_expression(v)
        || DateTime::parse_from_rfc3339(v).is_ok()
        || NaiveDateTime::parse_from_str(v, "%Y-%m-%d %H:%M:%S").is_ok()
}

fn time_literal(v: &str) -> bool {
    is_sql_expression(v)
        || NaiveTime::parse_from_str(v, "%H:%M:%S").is_ok()
        || NaiveTime::parse_from_str(v, "%H:%M").is_ok()
}

fn uuid_literal(v: &str) -> bool {
    is_sql_expression(v) || uuid::Uuid::parse_str(v).is_ok()
}

fn json_literal(v: &str) -> bool {
    serde_json::from_str::<serde_json::Value>(v).is_ok()
}

fn varchar_type(field: &Field) -> String {
    format!("VARCHAR({})", field.length.unwrap_or(255))
}

fn text_type(_: &Field) -> String {
    "TEXT".to_string()
}

fn integer_type(_: &Field) -> String {
    "INTEGER".to_string()
}

fn decimal_type(field: &Field) -> String {
    format!(
        "DECIMAL({},{})",
        field.precision.unwrap_or(10),
        field.scale.unwrap_or(0)
    )
}

fn boolean_type(_: &Field) -> String {
    "BOOLEAN".to_string()
}

fn date_type(_: &Field) -> String {
    "DATE".to_string()
}

fn timestamp_type(_: &Field) -> String {
    "TIMESTAMP(6)".to_string()
}

fn time_type(_: &Field) -> String {
    "TIME".to_string()
}

fn uuid_type(_: &Field) -> String {
    "UUID".to_string()
}

fn json_type(_: &Field) -> String {
    "JSONB".to_string()
}
