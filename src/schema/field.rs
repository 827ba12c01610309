//! Field: one column-level attribute of an entity

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::rules::{is_valid_identifier, CommonFieldDefinition, ReferentialAction};
use super::{new_id, require_text};
use crate::error::{Result, SchemaError};
use crate::naming::to_snake_case;

/// Column data type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DataType {
    String,
    Text,
    Integer,
    Decimal,
    Boolean,
    Date,
    #[serde(rename = "DATETIME")]
    DateTime,
    Time,
    Uuid,
    Json,
}

impl DataType {
    pub const ALL: [DataType; 10] = [
        DataType::String,
        DataType::Text,
        DataType::Integer,
        DataType::Decimal,
        DataType::Boolean,
        DataType::Date,
        DataType::DateTime,
        DataType::Time,
        DataType::Uuid,
        DataType::Json,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DataType::String => "STRING",
            DataType::Text => "TEXT",
            DataType::Integer => "INTEGER",
            DataType::Decimal => "DECIMAL",
            DataType::Boolean => "BOOLEAN",
            DataType::Date => "DATE",
            DataType::DateTime => "DATETIME",
            DataType::Time => "TIME",
            DataType::Uuid => "UUID",
            DataType::Json => "JSON",
        }
    }

    /// Position in `DATA_TYPE_RULES`
    pub(crate) fn index(&self) -> usize {
        *self as usize
    }
}

impl FromStr for DataType {
    type Err = SchemaError;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| SchemaError::validation("Invalid data type"))
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Column-level foreign key
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ForeignKeyRef {
    pub referenced_entity_id: String,
    pub referenced_field: String,
    #[serde(default)]
    pub on_delete: ReferentialAction,
    #[serde(default)]
    pub on_update: ReferentialAction,
}

impl ForeignKeyRef {
    /// Reference `<entity>.<field>` with RESTRICT actions
    pub fn new(referenced_entity_id: impl Into<String>, referenced_field: impl Into<String>) -> Self {
        Self {
            referenced_entity_id: referenced_entity_id.into(),
            referenced_field: referenced_field.into(),
            on_delete: ReferentialAction::default(),
            on_update: ReferentialAction::default(),
        }
    }

    pub fn on_delete(mut self, action: ReferentialAction) -> Self {
        self.on_delete = action;
        self
    }

    pub fn on_update(mut self, action: ReferentialAction) -> Self {
        self.on_update = action;
        self
    }
}

/// A persisted field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Field {
    pub id: String,
    pub entity_id: String,
    pub name: String,
    pub code: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub data_type: DataType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub length: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub precision: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scale: Option<u32>,
    pub nullable: bool,
    pub unique: bool,
    pub primary_key: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub check_constraint: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub foreign_key: Option<ForeignKeyRef>,
    pub display_order: u32,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_by: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

/// Caller-supplied field input, before an id and display order are assigned
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewField {
    pub name: String,
    pub code: String,
    #[serde(default)]
    pub description: Option<String>,
    pub data_type: DataType,
    #[serde(default)]
    pub length: Option<u32>,
    #[serde(default)]
    pub precision: Option<u32>,
    #[serde(default)]
    pub scale: Option<u32>,
    #[serde(default = "default_nullable")]
    pub nullable: bool,
    #[serde(default)]
    pub unique: bool,
    #[serde(default)]
    pub primary_key: bool,
    #[serde(default)]
    pub default_value: Option<String>,
    #[serde(default)]
    pub check_constraint: Option<String>,
    #[serde(default)]
    pub foreign_key: Option<ForeignKeyRef>,
}

fn default_nullable() -> bool {
    true
}

impl NewField {
    /// A nullable, non-unique field of the given type
    pub fn new(code: impl Into<String>, name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            name: name.into(),
            code: code.into(),
            description: None,
            data_type,
            length: None,
            precision: None,
            scale: None,
            nullable: true,
            unique: false,
            primary_key: false,
            default_value: None,
            check_constraint: None,
            foreign_key: None,
        }
    }

    pub fn length(mut self, length: u32) -> Self {
        self.length = Some(length);
        self
    }

    pub fn precision(mut self, precision: u32, scale: u32) -> Self {
        self.precision = Some(precision);
        self.scale = Some(scale);
        self
    }

    pub fn required(mut self) -> Self {
        self.nullable = false;
        self
    }

    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    pub fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self.nullable = false;
        self
    }

    pub fn default_value(mut self, value: impl Into<String>) -> Self {
        self.default_value = Some(value.into());
        self
    }

    pub fn check(mut self, constraint: impl Into<String>) -> Self {
        self.check_constraint = Some(constraint.into());
        self
    }

    pub fn references(mut self, foreign_key: ForeignKeyRef) -> Self {
        self.foreign_key = Some(foreign_key);
        self
    }

    pub fn describe(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

impl Field {
    /// Build a field for `entity_id`, checking single-record invariants only
    pub fn create(
        entity_id: &str,
        input: NewField,
        display_order: u32,
        created_by: &str,
    ) -> Result<Self> {
        require_text(entity_id, "Entity ID is required")?;
        require_text(&input.name, "Field name is required")?;
        require_text(&input.code, "Field code is required")?;
        require_text(created_by, "Created by is required")?;

        if !is_valid_identifier(&input.code) {
            return Err(SchemaError::validation(
                "Field code must start with a letter and contain only letters, numbers, and underscores",
            ));
        }
        if input.length == Some(0) {
            return Err(SchemaError::validation("Field length must be greater than 0"));
        }
        if input.precision == Some(0) {
            return Err(SchemaError::validation("Field precision must be greater than 0"));
        }

        Ok(Self {
            id: new_id(),
            entity_id: entity_id.to_string(),
            name: input.name.trim().to_string(),
            code: input.code.trim().to_string(),
            description: input.description,
            data_type: input.data_type,
            length: input.length,
            precision: input.precision,
            scale: input.scale,
            nullable: input.nullable && !input.primary_key,
            unique: input.unique || input.primary_key,
            primary_key: input.primary_key,
            default_value: input.default_value,
            check_constraint: input.check_constraint,
            foreign_key: input.foreign_key,
            display_order,
            created_by: created_by.to_string(),
            created_at: Utc::now(),
            updated_by: None,
            updated_at: None,
        })
    }

    /// Materialize one of the audit field definitions
    pub fn from_common(def: &CommonFieldDefinition, entity_id: &str, created_by: &str) -> Self {
        Self {
            id: new_id(),
            entity_id: entity_id.to_string(),
            name: def.name.to_string(),
            code: def.code.to_string(),
            description: Some(def.description.to_string()),
            data_type: def.data_type,
            length: def.length,
            precision: None,
            scale: None,
            nullable: !def.required,
            unique: def.unique,
            primary_key: def.primary_key,
            default_value: def.default_value.map(str::to_string),
            check_constraint: None,
            foreign_key: None,
            display_order: def.display_order,
            created_by: created_by.to_string(),
            created_at: Utc::now(),
            updated_by: None,
            updated_at: None,
        }
    }

    /// Physical column name (`createdBy` -> `created_by`)
    pub fn column_name(&self) -> String {
        to_snake_case(&self.code)
    }

    pub fn is_required(&self) -> bool {
        !self.nullable
    }

    pub fn has_default_value(&self) -> bool {
        self.default_value.as_deref().is_some_and(|v| !v.is_empty())
    }

    pub fn is_foreign_key(&self) -> bool {
        self.foreign_key.is_some()
    }
}
