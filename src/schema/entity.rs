//! Entity: a declared data type mapped to one table

use std::fmt;

use chrono::{DateTime, Utc};
use semver::Version;
use serde::{Deserialize, Serialize};

use super::field::Field;
use super::relationship::Relationship;
use super::rules::{is_sql_identifier, is_valid_identifier};
use super::{new_id, require_text};
use crate::error::{Result, SchemaError};
use crate::naming::to_snake_case;
use crate::version;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EntityStatus {
    #[default]
    Draft,
    Active,
    Deprecated,
}

impl fmt::Display for EntityStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            EntityStatus::Draft => "DRAFT",
            EntityStatus::Active => "ACTIVE",
            EntityStatus::Deprecated => "DEPRECATED",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Entity {
    pub id: String,
    pub project_id: String,
    pub name: String,
    pub code: String,
    pub table_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default)]
    pub status: EntityStatus,
    pub version: Version,
    /// Set once the backing table has been created
    #[serde(default)]
    pub table_created: bool,
    #[serde(default)]
    pub fields: Vec<Field>,
    #[serde(default)]
    pub relationships: Vec<Relationship>,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_by: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

/// Input for `Entity::create`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewEntity {
    pub project_id: String,
    pub name: String,
    pub code: String,
    /// Defaults to the snake_case of `code`
    #[serde(default)]
    pub table_name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    pub created_by: String,
}

impl NewEntity {
    pub fn new(
        project_id: impl Into<String>,
        code: impl Into<String>,
        name: impl Into<String>,
        created_by: impl Into<String>,
    ) -> Self {
        Self {
            project_id: project_id.into(),
            name: name.into(),
            code: code.into(),
            created_by: created_by.into(),
            ..Default::default()
        }
    }

    pub fn table_name(mut self, table_name: impl Into<String>) -> Self {
        self.table_name = Some(table_name.into());
        self
    }

    pub fn category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn describe(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// Partial update; only supplied values are validated and applied
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityUpdate {
    pub name: Option<String>,
    pub code: Option<String>,
    pub table_name: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub updated_by: String,
}

fn check_code(code: &str) -> Result<()> {
    if !is_valid_identifier(code) {
        return Err(SchemaError::validation(
            "Entity code must start with a letter and contain only letters, numbers, and underscores",
        ));
    }
    Ok(())
}

/// Table names are written unquoted into DDL
fn check_table_name(table_name: &str) -> Result<()> {
    if !is_sql_identifier(table_name) {
        return Err(SchemaError::validation(format!(
            "Table name '{}' must be a valid SQL identifier and not a reserved word",
            table_name
        )));
    }
    Ok(())
}

impl Entity {
    pub fn create(input: NewEntity) -> Result<Self> {
        require_text(&input.project_id, "Project ID is required")?;
        require_text(&input.name, "Entity name is required")?;
        require_text(&input.code, "Entity code is required")?;
        require_text(&input.created_by, "Created by is required")?;
        check_code(&input.code)?;

        let table_name = match input.table_name {
            Some(t) if !t.trim().is_empty() => t.trim().to_string(),
            _ => to_snake_case(&input.code),
        };
        check_table_name(&table_name)?;

        Ok(Self {
            id: new_id(),
            project_id: input.project_id,
            name: input.name.trim().to_string(),
            code: input.code.trim().to_string(),
            table_name,
            description: input.description,
            category: input.category,
            status: EntityStatus::Draft,
            version: version::initial(),
            table_created: false,
            fields: Vec::new(),
            relationships: Vec::new(),
            created_by: input.created_by,
            created_at: Utc::now(),
            updated_by: None,
            updated_at: None,
        })
    }

    /// Apply a partial update and bump the patch version
    pub fn update(&mut self, update: EntityUpdate) -> Result<()> {
        require_text(&update.updated_by, "Updated by is required")?;
        if let Some(name) = &update.name {
            require_text(name, "Entity name is required")?;
        }
        if let Some(code) = &update.code {
            check_code(code)?;
        }
        if let Some(table_name) = &update.table_name {
            require_text(table_name, "Table name is required")?;
            check_table_name(table_name.trim())?;
        }

        if let Some(name) = update.name {
            self.name = name.trim().to_string();
        }
        if let Some(code) = update.code {
            self.code = code;
        }
        if let Some(table_name) = update.table_name {
            self.table_name = table_name.trim().to_string();
        }
        if update.description.is_some() {
            self.description = update.description;
        }
        if update.category.is_some() {
            self.category = update.category;
        }
        self.touch(&update.updated_by);
        Ok(())
    }

    /// Draft -> Active
    pub fn publish(&mut self, updated_by: &str) -> Result<()> {
        match self.status {
            EntityStatus::Active => Err(SchemaError::validation("Entity is already published")),
            EntityStatus::Deprecated => {
                Err(SchemaError::validation("Deprecated entity cannot be published"))
            }
            EntityStatus::Draft => {
                self.status = EntityStatus::Active;
                self.touch(updated_by);
                Ok(())
            }
        }
    }

    pub fn deprecate(&mut self, updated_by: &str) -> Result<()> {
        if self.status == EntityStatus::Deprecated {
            return Err(SchemaError::validation("Entity is already deprecated"));
        }
        self.status = EntityStatus::Deprecated;
        self.touch(updated_by);
        Ok(())
    }

    fn touch(&mut self, updated_by: &str) {
        self.version = version::bump_patch(&self.version);
        self.updated_by = Some(updated_by.to_string());
        self.updated_at = Some(Utc::now());
    }

    pub fn field_by_code(&self, code: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.code == code)
    }

    pub fn has_field(&self, code: &str) -> bool {
        self.field_by_code(code).is_some()
    }

    pub fn primary_key(&self) -> Option<&Field> {
        self.fields.iter().find(|f| f.primary_key)
    }

    /// Fields that are not one of the audit columns
    pub fn business_fields(&self) -> impl Iterator<Item = &Field> {
        self.fields
            .iter()
            .filter(|f| !crate::common_fields::is_common_field_code(&f.code))
    }

    /// Reason the entity cannot be deleted, if any
    ///
    /// `referencing_relationships` counts relationships anywhere in the
    /// project that name this entity as source or target.
    pub fn delete_blocker(&self, referencing_relationships: usize) -> Option<String> {
        let business = self.business_fields().count();
        if business > 0 {
            return Some(format!(
                "Entity {} still has {} business field(s)",
                self.code, business
            ));
        }
        if referencing_relationships > 0 {
            return Some(format!(
                "Entity {} is referenced by {} relationship(s)",
                self.code, referencing_relationships
            ));
        }
        if self.table_created {
            return Some(format!(
                "Entity {} still has generated table {}",
                self.code, self.table_name
            ));
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user() -> Entity {
        Entity::create(NewEntity::new("p-1", "UserProfile", "用户资料", "admin")).unwrap()
    }

    #[test]
    fn test_create_defaults() {
        let entity = user();
        assert_eq!(entity.table_name, "user_profile");
        assert_eq!(entity.status, EntityStatus::Draft);
        assert_eq!(entity.version.to_string(), "1.0.0");
    }

    #[test]
    fn test_create_rejects_bad_code() {
        let err = Entity::create(NewEntity::new("p-1", "user profile", "x", "admin")).unwrap_err();
        assert!(err.is_validation());
    }

    #[test]
    fn test_table_name_must_be_usable_in_ddl() {
        let err = Entity::create(
            NewEntity::new("p-1", "user", "User", "admin").table_name("users; DROP TABLE accounts; --"),
        )
        .unwrap_err();
        assert!(err.is_validation());

        // a defaulted name is checked too
        assert!(Entity::create(NewEntity::new("p-1", "order", "Order", "admin")).is_err());
        let entity = Entity::create(NewEntity::new("p-1", "order", "Order", "admin").table_name("orders")).unwrap();
        assert_eq!(entity.table_name, "orders");

        let mut entity = user();
        let err = entity
            .update(EntityUpdate {
                table_name: Some("select".into()),
                updated_by: "bob".into(),
                ..Default::default()
            })
            .unwrap_err();
        assert!(err.is_validation());
        assert_eq!(entity.table_name, "user_profile");
        assert_eq!(entity.version.to_string(), "1.0.0");
    }

    #[test]
    fn test_update_bumps_patch() {
        let mut entity = user();
        entity
            .update(EntityUpdate {
                name: Some("Profile".into()),
                updated_by: "bob".into(),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(entity.name, "Profile");
        assert_eq!(entity.version.to_string(), "1.0.1");
        assert_eq!(entity.updated_by.as_deref(), Some("bob"));
    }

    #[test]
    fn test_lifecycle_rejects_no_op() {
        let mut entity = user();
        entity.publish("admin").unwrap();
        assert_eq!(entity.status, EntityStatus::Active);
        assert!(entity.publish("admin").is_err());
        entity.deprecate("admin").unwrap();
        assert!(entity.deprecate("admin").is_err());
        assert!(entity.publish("admin").is_err());
    }

    #[test]
    fn test_delete_blocker() {
        let mut entity = user();
        assert!(entity.delete_blocker(0).is_none());
        assert!(entity.delete_blocker(1).is_some());
        entity.table_created = true;
        assert!(entity.delete_blocker(0).unwrap().contains("user_profile"));
    }
}
