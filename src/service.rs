//! Schema service
//!
//! One generic service over the repository ports: entity lifecycle with
//! audit-field injection, field management, relationship management, and
//! the entry points into validation, code generation and table creation.

use std::sync::Arc;

use tracing::{debug, info};

use crate::codegen::{self, GeneratedRelation, ProjectCodegen};
use crate::common_fields::{check_business_field_conflict, inject, is_common_field_code};
use crate::config::SchemaConfig;
use crate::error::{Result, SchemaError};
use crate::migration::{MigrationManager, TablePlan};
use crate::relation::RelationValidator;
use crate::repository::{EntityRepository, FieldRepository, InMemoryRepository, RelationshipRepository};
use crate::schema::{
    Entity, EntityStatus, EntityUpdate, Field, NewEntity, NewField, NewRelationship, Relationship,
    RelationshipUpdate,
};
use crate::validate::{EntityValidationResult, FieldValidator};

pub struct SchemaService {
    entities: Arc<dyn EntityRepository>,
    fields: Arc<dyn FieldRepository>,
    relationships: Arc<dyn RelationshipRepository>,
    config: SchemaConfig,
}

impl SchemaService {
    pub fn new(
        entities: Arc<dyn EntityRepository>,
        fields: Arc<dyn FieldRepository>,
        relationships: Arc<dyn RelationshipRepository>,
        config: SchemaConfig,
    ) -> Self {
        Self {
            entities,
            fields,
            relationships,
            config,
        }
    }

    /// Service backed by a fresh `InMemoryRepository`
    pub fn in_memory(config: SchemaConfig) -> Self {
        let repo = Arc::new(InMemoryRepository::new());
        Self::new(repo.clone(), repo.clone(), repo, config)
    }

    pub fn config(&self) -> &SchemaConfig {
        &self.config
    }

    fn field_validator(&self) -> FieldValidator {
        FieldValidator::new(self.config.validation.clone())
    }

    fn relation_validator(&self, strict: bool) -> RelationValidator {
        let validator = if strict {
            RelationValidator::strict()
        } else {
            RelationValidator::lenient()
        };
        validator.with_config(&self.config.validation)
    }

    // =========================================================================
    // Entities
    // =========================================================================

    /// Create an entity with its audit fields and the given business fields
    pub async fn create_entity(&self, input: NewEntity, business_fields: Vec<NewField>) -> Result<Entity> {
        if self
            .entities
            .exists_by_code(&input.project_id, &input.code, None)
            .await?
        {
            return Err(SchemaError::conflict(format!(
                "Entity with code '{}' already exists in this project",
                input.code
            )));
        }

        let created_by = input.created_by.clone();
        let mut entity = Entity::create(input)?;
        let fields = inject(&entity, business_fields, &created_by)?;

        let known = self.entities.find_by_project_id(&entity.project_id).await?;
        let report = self.field_validator().validate_entity_fields(&entity, &fields, &known);
        if !report.is_valid {
            return Err(SchemaError::validation(report.error_messages().join("; ")));
        }

        self.entities.save(&entity).await?;
        for field in &fields {
            self.fields.save(field).await?;
        }
        entity.fields = fields;

        info!(entity = %entity.code, table = %entity.table_name, fields = entity.fields.len(), "created entity");
        Ok(entity)
    }

    /// Entity with its fields and relationships loaded
    pub async fn get_entity(&self, id: &str) -> Result<Entity> {
        let mut entity = self
            .entities
            .find_by_id(id)
            .await?
            .ok_or_else(|| SchemaError::not_found("Entity", id))?;
        entity.fields = self.fields.find_by_entity_id(id).await?;
        entity.relationships = self.relationships.find_by_entity_id(id).await?;
        Ok(entity)
    }

    pub async fn list_entities(&self, project_id: &str) -> Result<Vec<Entity>> {
        let mut entities = self.entities.find_by_project_id(project_id).await?;
        for entity in &mut entities {
            entity.fields = self.fields.find_by_entity_id(&entity.id).await?;
            entity.relationships = self.relationships.find_by_entity_id(&entity.id).await?;
        }
        Ok(entities)
    }

    pub async fn update_entity(&self, id: &str, update: EntityUpdate) -> Result<Entity> {
        let mut entity = self.get_entity(id).await?;
        if let Some(code) = &update.code {
            if self
                .entities
                .exists_by_code(&entity.project_id, code, Some(id))
                .await?
            {
                return Err(SchemaError::conflict(format!(
                    "Entity with code '{}' already exists in this project",
                    code
                )));
            }
        }
        entity.update(update)?;
        self.entities.save(&entity).await?;
        Ok(entity)
    }

    pub async fn publish_entity(&self, id: &str, updated_by: &str) -> Result<Entity> {
        let mut entity = self.get_entity(id).await?;
        entity.publish(updated_by)?;
        self.entities.save(&entity).await?;
        info!(entity = %entity.code, version = %entity.version, "published entity");
        Ok(entity)
    }

    pub async fn deprecate_entity(&self, id: &str, updated_by: &str) -> Result<Entity> {
        let mut entity = self.get_entity(id).await?;
        entity.deprecate(updated_by)?;
        self.entities.save(&entity).await?;
        Ok(entity)
    }

    /// Delete a draft entity with no business fields, relationships or table
    pub async fn delete_entity(&self, id: &str) -> Result<()> {
        let entity = self.get_entity(id).await?;
        if entity.status == EntityStatus::Active {
            return Err(SchemaError::validation(
                "Cannot delete published entity. Only draft entities can be deleted.",
            ));
        }
        if let Some(reason) = entity.delete_blocker(entity.relationships.len()) {
            return Err(SchemaError::validation(reason));
        }

        self.fields.delete_by_entity_id(id).await?;
        self.entities.delete(id).await?;
        info!(entity = %entity.code, "deleted entity");
        Ok(())
    }

    /// Validate the stored field list of an entity
    pub async fn validate_entity(&self, id: &str) -> Result<EntityValidationResult> {
        let entity = self.get_entity(id).await?;
        let known = self.entities.find_by_project_id(&entity.project_id).await?;
        Ok(self
            .field_validator()
            .validate_entity_fields(&entity, &entity.fields, &known))
    }

    /// Create the entity's table and mark it as created
    pub async fn create_table(&self, manager: &MigrationManager, id: &str) -> Result<TablePlan> {
        let mut entity = self.get_entity(id).await?;
        let known = self.entities.find_by_project_id(&entity.project_id).await?;
        let plan = manager.create_table(&entity, &entity.fields, &known).await?;

        entity.table_created = true;
        self.entities.save(&entity).await?;
        Ok(plan)
    }

    // =========================================================================
    // Fields
    // =========================================================================

    /// Append a business field after the existing ones
    pub async fn add_field(&self, entity_id: &str, input: NewField, created_by: &str) -> Result<Field> {
        let entity = self.get_entity(entity_id).await?;
        check_business_field_conflict(&input.code)?;
        if self.fields.exists_by_code(entity_id, &input.code, None).await? {
            return Err(SchemaError::conflict(format!(
                "字段代码 '{}' 在该实体中已存在",
                input.code
            )));
        }

        let order = entity.fields.iter().map(|f| f.display_order).max().unwrap_or(0) + 1;
        let field = Field::create(entity_id, input, order, created_by)?;

        let mut candidate = entity.fields.clone();
        candidate.push(field.clone());
        let known = self.entities.find_by_project_id(&entity.project_id).await?;
        let report = self
            .field_validator()
            .validate_entity_fields(&entity, &candidate, &known);
        if !report.is_valid {
            return Err(SchemaError::validation(report.error_messages().join("; ")));
        }

        self.fields.save(&field).await?;
        debug!(entity = %entity.code, field = %field.code, order, "added field");
        Ok(field)
    }

    /// Remove a business field; audit fields are permanent
    pub async fn remove_field(&self, field_id: &str) -> Result<()> {
        let field = self
            .fields
            .find_by_id(field_id)
            .await?
            .ok_or_else(|| SchemaError::not_found("Field", field_id))?;
        if is_common_field_code(&field.code) {
            return Err(SchemaError::validation(format!(
                "系统通用字段 '{}' 不能删除",
                field.code
            )));
        }
        self.fields.delete(field_id).await
    }

    // =========================================================================
    // Relationships
    // =========================================================================

    async fn endpoints(&self, relationship: &Relationship) -> Result<(Entity, Entity)> {
        let source = self.get_entity(&relationship.source_entity_id).await?;
        let target = self.get_entity(&relationship.target_entity_id).await?;
        Ok((source, target))
    }

    /// Create a relationship after strict validation and duplicate checks
    pub async fn create_relationship(&self, input: NewRelationship) -> Result<Relationship> {
        let relationship = Relationship::create(input)?;
        let (source, target) = self.endpoints(&relationship).await?;

        let validator = self.relation_validator(true);
        validator
            .validate(&relationship, &source, &target)
            .into_result()?;

        let existing = self
            .relationships
            .find_by_project_id(&relationship.project_id)
            .await?;
        validator.check_duplicates(&relationship, &existing)?;

        self.relationships.save(&relationship).await?;
        info!(
            relationship = %relationship.code,
            kind = %relationship.relationship_type,
            source = %source.code,
            target = %target.code,
            "created relationship"
        );
        Ok(relationship)
    }

    pub async fn get_relationship(&self, id: &str) -> Result<Relationship> {
        self.relationships
            .find_by_id(id)
            .await?
            .ok_or_else(|| SchemaError::not_found("Relationship", id))
    }

    pub async fn update_relationship(&self, id: &str, update: RelationshipUpdate) -> Result<Relationship> {
        let mut relationship = self.get_relationship(id).await?;
        relationship.update(update)?;

        // updated names and join table get the same checks as at creation
        let (source, target) = self.endpoints(&relationship).await?;
        let validator = self.relation_validator(true);
        validator
            .validate(&relationship, &source, &target)
            .into_result()?;

        let existing = self
            .relationships
            .find_by_project_id(&relationship.project_id)
            .await?;
        validator.check_duplicates(&relationship, &existing)?;

        self.relationships.save(&relationship).await?;
        Ok(relationship)
    }

    pub async fn activate_relationship(&self, id: &str) -> Result<Relationship> {
        let mut relationship = self.get_relationship(id).await?;
        relationship.activate()?;
        self.relationships.save(&relationship).await?;
        Ok(relationship)
    }

    pub async fn deactivate_relationship(&self, id: &str) -> Result<Relationship> {
        let mut relationship = self.get_relationship(id).await?;
        relationship.deactivate()?;
        self.relationships.save(&relationship).await?;
        Ok(relationship)
    }

    pub async fn delete_relationship(&self, id: &str) -> Result<()> {
        self.relationships.delete(id).await
    }

    // =========================================================================
    // Code generation
    // =========================================================================

    fn framework<'a>(&'a self, framework: Option<&'a str>) -> &'a str {
        framework.unwrap_or(self.config.codegen.default_framework.as_str())
    }

    pub async fn generate_relationship_code(
        &self,
        relationship_id: &str,
        framework: Option<&str>,
    ) -> Result<GeneratedRelation> {
        let relationship = self.get_relationship(relationship_id).await?;
        let (source, target) = self.endpoints(&relationship).await?;
        codegen::generate(&relationship, &source, &target, self.framework(framework))
    }

    /// Code for every active relationship in the project
    pub async fn generate_project_code(
        &self,
        project_id: &str,
        framework: Option<&str>,
    ) -> Result<ProjectCodegen> {
        let entities = self.list_entities(project_id).await?;
        let relationships: Vec<Relationship> = self
            .relationships
            .find_by_project_id(project_id)
            .await?
            .into_iter()
            .filter(Relationship::is_active)
            .collect();

        codegen::process_project(
            &entities,
            &relationships,
            self.framework(framework),
            &self.relation_validator(false),
        )
    }
}
