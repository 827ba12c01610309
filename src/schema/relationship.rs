//! Relationship: a declared association between two entities

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

use super::rules::{is_sql_identifier, is_valid_identifier, ReferentialAction};
use super::{new_id, require_text};
use crate::error::{Result, SchemaError};

/// Cardinality
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RelationshipType {
    OneToOne,
    OneToMany,
    ManyToOne,
    ManyToMany,
}

impl RelationshipType {
    pub const ALL: [RelationshipType; 4] = [
        RelationshipType::OneToOne,
        RelationshipType::OneToMany,
        RelationshipType::ManyToOne,
        RelationshipType::ManyToMany,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RelationshipType::OneToOne => "ONE_TO_ONE",
            RelationshipType::OneToMany => "ONE_TO_MANY",
            RelationshipType::ManyToOne => "MANY_TO_ONE",
            RelationshipType::ManyToMany => "MANY_TO_MANY",
        }
    }
}

impl FromStr for RelationshipType {
    type Err = SchemaError;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| SchemaError::validation("Invalid relationship type"))
    }
}

impl fmt::Display for RelationshipType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RelationshipStatus {
    #[default]
    Active,
    Inactive,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Relationship {
    pub id: String,
    pub project_id: String,
    pub name: String,
    pub code: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(rename = "type")]
    pub relationship_type: RelationshipType,
    pub source_entity_id: String,
    pub target_entity_id: String,
    /// Accessor on the source entity
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_field: Option<String>,
    /// Accessor on the target entity
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_field: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub foreign_key_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub join_table: Option<String>,
    #[serde(default)]
    pub on_delete: ReferentialAction,
    #[serde(default)]
    pub on_update: ReferentialAction,
    #[serde(default)]
    pub status: RelationshipStatus,
    /// Emit lazy-loading options in generated code
    #[serde(default)]
    pub lazy: bool,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_by: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

/// Raw creation input; type and actions arrive as strings and are parsed here
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewRelationship {
    pub project_id: String,
    pub name: String,
    pub code: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(rename = "type")]
    pub relationship_type: String,
    pub source_entity_id: String,
    pub target_entity_id: String,
    #[serde(default)]
    pub source_field: Option<String>,
    #[serde(default)]
    pub target_field: Option<String>,
    #[serde(default)]
    pub foreign_key_name: Option<String>,
    #[serde(default)]
    pub join_table: Option<String>,
    #[serde(default)]
    pub on_delete: Option<String>,
    #[serde(default)]
    pub on_update: Option<String>,
    #[serde(default)]
    pub lazy: bool,
    pub created_by: String,
}

impl NewRelationship {
    pub fn new(
        project_id: impl Into<String>,
        code: impl Into<String>,
        relationship_type: impl Into<String>,
        source_entity_id: impl Into<String>,
        target_entity_id: impl Into<String>,
        created_by: impl Into<String>,
    ) -> Self {
        let code = code.into();
        Self {
            project_id: project_id.into(),
            name: code.clone(),
            code,
            relationship_type: relationship_type.into(),
            source_entity_id: source_entity_id.into(),
            target_entity_id: target_entity_id.into(),
            created_by: created_by.into(),
            ..Default::default()
        }
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn fields(mut self, source_field: impl Into<String>, target_field: impl Into<String>) -> Self {
        self.source_field = Some(source_field.into());
        self.target_field = Some(target_field.into());
        self
    }

    pub fn foreign_key_name(mut self, name: impl Into<String>) -> Self {
        self.foreign_key_name = Some(name.into());
        self
    }

    pub fn join_table(mut self, table: impl Into<String>) -> Self {
        self.join_table = Some(table.into());
        self
    }

    pub fn on_delete(mut self, action: impl Into<String>) -> Self {
        self.on_delete = Some(action.into());
        self
    }

    pub fn on_update(mut self, action: impl Into<String>) -> Self {
        self.on_update = Some(action.into());
        self
    }

    pub fn lazy(mut self) -> Self {
        self.lazy = true;
        self
    }
}

/// Partial update; only supplied values are re-validated
///
/// Status changes go through [`Relationship::activate`] and
/// [`Relationship::deactivate`]. A blank join table or foreign key name
/// clears the override.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelationshipUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub source_field: Option<String>,
    pub target_field: Option<String>,
    pub foreign_key_name: Option<String>,
    pub join_table: Option<String>,
    pub on_delete: Option<String>,
    pub on_update: Option<String>,
    pub lazy: Option<bool>,
    pub updated_by: Option<String>,
}

/// Parse an optional action, falling back to RESTRICT when absent or blank
fn parse_action(slot: &str, value: Option<&str>) -> Result<Option<ReferentialAction>> {
    match value {
        Some(v) if !v.is_empty() => ReferentialAction::parse_for(slot, v).map(Some),
        _ => Ok(None),
    }
}

/// Join table and foreign key names end up unquoted in DDL; blank means unset
fn sql_name(slot: &str, value: Option<String>) -> Result<Option<String>> {
    match value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty()) {
        Some(name) if !is_sql_identifier(&name) => Err(SchemaError::validation(format!(
            "{} '{}' must be a valid SQL identifier and not a reserved word",
            slot, name
        ))),
        name => Ok(name),
    }
}

impl Relationship {
    pub fn create(input: NewRelationship) -> Result<Self> {
        require_text(&input.project_id, "Project ID is required")?;
        require_text(&input.name, "Relationship name is required")?;
        require_text(&input.code, "Relationship code is required")?;
        require_text(&input.source_entity_id, "Source entity ID is required")?;
        require_text(&input.target_entity_id, "Target entity ID is required")?;
        require_text(&input.created_by, "Created by is required")?;

        if !is_valid_identifier(&input.code) {
            return Err(SchemaError::validation(
                "Relationship code must start with a letter and contain only letters, numbers, and underscores",
            ));
        }

        let relationship_type: RelationshipType = input.relationship_type.parse()?;

        if input.source_entity_id == input.target_entity_id {
            warn!(code = %input.code, "Self-referencing relationship detected");
        }

        let on_delete = parse_action("onDelete", input.on_delete.as_deref())?.unwrap_or_default();
        let on_update = parse_action("onUpdate", input.on_update.as_deref())?.unwrap_or_default();
        let foreign_key_name = sql_name("Foreign key name", input.foreign_key_name)?;
        let join_table = sql_name("Join table", input.join_table)?;

        Ok(Self {
            id: new_id(),
            project_id: input.project_id,
            name: input.name,
            code: input.code,
            description: input.description,
            relationship_type,
            source_entity_id: input.source_entity_id,
            target_entity_id: input.target_entity_id,
            source_field: input.source_field,
            target_field: input.target_field,
            foreign_key_name,
            join_table,
            on_delete,
            on_update,
            status: RelationshipStatus::Active,
            lazy: input.lazy,
            created_by: input.created_by,
            created_at: Utc::now(),
            updated_by: None,
            updated_at: None,
        })
    }

    pub fn update(&mut self, update: RelationshipUpdate) -> Result<()> {
        if let Some(name) = &update.name {
            require_text(name, "Relationship name is required")?;
        }
        let on_delete = parse_action("onDelete", update.on_delete.as_deref())?;
        let on_update = parse_action("onUpdate", update.on_update.as_deref())?;
        let foreign_key_name = update
            .foreign_key_name
            .map(|v| sql_name("Foreign key name", Some(v)))
            .transpose()?;
        let join_table = update
            .join_table
            .map(|v| sql_name("Join table", Some(v)))
            .transpose()?;

        if let Some(name) = update.name {
            self.name = name;
        }
        if update.description.is_some() {
            self.description = update.description;
        }
        if update.source_field.is_some() {
            self.source_field = update.source_field;
        }
        if update.target_field.is_some() {
            self.target_field = update.target_field;
        }
        if let Some(name) = foreign_key_name {
            self.foreign_key_name = name;
        }
        if let Some(table) = join_table {
            self.join_table = table;
        }
        if let Some(action) = on_delete {
            self.on_delete = action;
        }
        if let Some(action) = on_update {
            self.on_update = action;
        }
        if let Some(lazy) = update.lazy {
            self.lazy = lazy;
        }

        self.updated_by = Some(update.updated_by.unwrap_or_else(|| "system".to_string()));
        self.updated_at = Some(Utc::now());
        Ok(())
    }

    pub fn is_active(&self) -> bool {
        self.status == RelationshipStatus::Active
    }

    pub fn is_many_to_many(&self) -> bool {
        self.relationship_type == RelationshipType::ManyToMany
    }

    /// Source and target are the same entity
    pub fn is_self_referencing(&self) -> bool {
        self.source_entity_id == self.target_entity_id
    }

    /// True if the relationship has `entity_id` on either end
    pub fn touches(&self, entity_id: &str) -> bool {
        self.source_entity_id == entity_id || self.target_entity_id == entity_id
    }

    pub fn activate(&mut self) -> Result<()> {
        if self.status == RelationshipStatus::Active {
            return Err(SchemaError::validation("Relationship is already active"));
        }
        self.status = RelationshipStatus::Active;
        self.updated_at = Some(Utc::now());
        Ok(())
    }

    pub fn deactivate(&mut self) -> Result<()> {
        if self.status == RelationshipStatus::Inactive {
            return Err(SchemaError::validation("Relationship is already inactive"));
        }
        self.status = RelationshipStatus::Inactive;
        self.updated_at = Some(Utc::now());
        Ok(())
    }

    /// Constraint name: explicit, or `fk_<code>`
    pub fn generate_foreign_key_name(&self) -> String {
        match &self.foreign_key_name {
            Some(name) if !name.is_empty() => name.clone(),
            _ => format!("fk_{}", self.code.to_lowercase()),
        }
    }

    /// Join table name derived from the entity ids; MANY_TO_MANY only
    pub fn generate_join_table_name(&self) -> Result<String> {
        if !self.is_many_to_many() {
            return Err(SchemaError::validation(
                "Join table is only for many-to-many relationships",
            ));
        }
        match &self.join_table {
            Some(table) if !table.is_empty() => Ok(table.clone()),
            _ => Ok(format!("{}_{}", self.source_entity_id, self.target_entity_id).to_lowercase()),
        }
    }
}
