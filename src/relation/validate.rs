//! Relationship validation
//!
//! Two flavours share one rule set:
//! - **lenient** (code generation): missing join table is a warning
//! - **strict** (relationship creation): missing join table is an error, and
//!   duplicates against the existing project relationships are conflicts

use fuzzy_matcher::skim::SkimMatcherV2;
use fuzzy_matcher::FuzzyMatcher;
use serde::Serialize;

use super::names::resolve;
use crate::config::ValidationConfig;
use crate::error::{Result, SchemaError};
use crate::schema::{Entity, Relationship, RelationshipType};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RelationValidation {
    pub is_valid: bool,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    pub suggestions: Vec<String>,
}

impl RelationValidation {
    /// Convert errors into a single validation error
    pub fn into_result(self) -> Result<Self> {
        if self.errors.is_empty() {
            Ok(self)
        } else {
            Err(SchemaError::validation(self.errors.join("; ")))
        }
    }
}

#[derive(Debug, Clone)]
pub struct RelationValidator {
    strict: bool,
    allow_self_reference: bool,
}

impl RelationValidator {
    pub fn lenient() -> Self {
        Self {
            strict: false,
            allow_self_reference: false,
        }
    }

    pub fn strict() -> Self {
        Self {
            strict: true,
            allow_self_reference: false,
        }
    }

    /// Apply the self-reference policy from configuration
    pub fn with_config(mut self, config: &ValidationConfig) -> Self {
        self.allow_self_reference = config.allow_self_reference;
        self
    }

    pub fn allow_self_reference(mut self, allow: bool) -> Self {
        self.allow_self_reference = allow;
        self
    }

    pub fn is_strict(&self) -> bool {
        self.strict
    }

    /// Validate one relationship against its resolved endpoints
    pub fn validate(
        &self,
        relationship: &Relationship,
        source: &Entity,
        target: &Entity,
    ) -> RelationValidation {
        let mut result = RelationValidation::default();

        if relationship.source_entity_id != source.id || relationship.target_entity_id != target.id {
            result.errors.push(format!(
                "Relationship {} endpoints do not match the supplied entities",
                relationship.code
            ));
        }

        if relationship.is_self_referencing() {
            let message = format!(
                "Self-referencing relationship {} on entity {}",
                relationship.code, source.code
            );
            if self.allow_self_reference {
                result.warnings.push(message);
            } else {
                result.errors.push(message);
            }
        }

        if let Some(field) = non_empty(&relationship.source_field) {
            check_field_exists(field, source, "Source", &mut result);
        }
        if let Some(field) = non_empty(&relationship.target_field) {
            check_field_exists(field, target, "Target", &mut result);
        }

        let resolved = resolve(relationship, source, target);
        if let Some(fk) = &resolved.foreign_key {
            let owner = if resolved.owner_is_source() { source } else { target };
            let present = owner
                .fields
                .iter()
                .any(|f| f.column_name() == *fk || f.code == *fk);
            if !present {
                result.suggestions.push(format!(
                    "Add foreign key field '{}' to entity {} for relationship {}",
                    fk, owner.code, relationship.code
                ));
            }
        }

        if relationship.relationship_type == RelationshipType::ManyToMany
            && non_empty(&relationship.join_table).is_none()
        {
            if self.strict {
                result.errors.push(format!(
                    "Many-to-many relationship {} requires a join table",
                    relationship.code
                ));
            } else {
                result.warnings.push(format!(
                    "Many-to-many relationship {} has no join table, using {}",
                    relationship.code,
                    resolved.join_table.as_deref().unwrap_or_default()
                ));
            }
        }

        result.is_valid = result.errors.is_empty();
        result
    }

    /// Reject a new relationship that duplicates an existing one
    pub fn check_duplicates(&self, candidate: &Relationship, existing: &[Relationship]) -> Result<()> {
        for rel in existing.iter().filter(|r| r.id != candidate.id) {
            if rel.code == candidate.code {
                return Err(SchemaError::conflict(format!(
                    "Relationship code '{}' already exists",
                    candidate.code
                )));
            }
            if rel.source_entity_id == candidate.source_entity_id
                && rel.target_entity_id == candidate.target_entity_id
                && rel.relationship_type == candidate.relationship_type
            {
                return Err(SchemaError::conflict(format!(
                    "A {} relationship from {} to {} already exists",
                    candidate.relationship_type, candidate.source_entity_id, candidate.target_entity_id
                )));
            }
        }
        Ok(())
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.trim().is_empty())
}

fn check_field_exists(field: &str, entity: &Entity, side: &str, result: &mut RelationValidation) {
    if entity.has_field(field) {
        return;
    }
    let mut message = format!("{} field '{}' not found on entity {}", side, field, entity.code);
    if let Some(hint) = closest_field(field, entity) {
        message.push_str(&format!(" (did you mean '{}'?)", hint));
    }
    result.warnings.push(message);
}

/// Best fuzzy match among the entity's field codes
fn closest_field<'a>(query: &str, entity: &'a Entity) -> Option<&'a str> {
    let matcher = SkimMatcherV2::default();
    entity
        .fields
        .iter()
        .filter_map(|f| {
            matcher
                .fuzzy_match(&f.code, query)
                .map(|score| (score, f.code.as_str()))
        })
        .max_by_key(|(score, _)| *score)
        .map(|(_, code)| code)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common_fields::inject;
    use crate::schema::{DataType, NewEntity, NewField, NewRelationship};

    fn entity(code: &str, business: Vec<NewField>) -> Entity {
        let mut e = Entity::create(NewEntity::new("p-1", code, code, "admin")).unwrap();
        e.fields = inject(&e, business, "admin").unwrap();
        e
    }

    fn rel(input: NewRelationship) -> Relationship {
        Relationship::create(input).unwrap()
    }

    #[test]
    fn test_self_reference_policy() {
        let category = entity("Category", vec![]);
        let r = rel(NewRelationship::new(
            "p-1", "parent", "MANY_TO_ONE", &category.id, &category.id, "admin",
        ));

        let result = RelationValidator::lenient().validate(&r, &category, &category);
        assert!(!result.is_valid);
        assert!(result.errors[0].starts_with("Self-referencing relationship"));

        let result = RelationValidator::lenient()
            .allow_self_reference(true)
            .validate(&r, &category, &category);
        assert!(result.is_valid);
        assert_eq!(result.warnings.len(), 1);
    }

    #[test]
    fn test_missing_field_warns_with_hint() {
        let user = entity(
            "User",
            vec![NewField::new("username", "Username", DataType::String).length(50)],
        );
        let post = entity("Post", vec![]);
        let r = rel(NewRelationship::new("p-1", "posts", "ONE_TO_MANY", &user.id, &post.id, "admin")
            .fields("usrname", "author"));

        let result = RelationValidator::lenient().validate(&r, &user, &post);
        assert!(result.is_valid);
        assert!(result
            .warnings
            .iter()
            .any(|w| w.contains("did you mean 'username'")));
        assert!(result.warnings.iter().any(|w| w.starts_with("Target field 'author'")));
    }

    #[test]
    fn test_foreign_key_suggestion() {
        let user = entity("User", vec![]);
        let post = entity("Post", vec![]);
        let r = rel(NewRelationship::new("p-1", "posts", "ONE_TO_MANY", &user.id, &post.id, "admin"));
        let result = RelationValidator::lenient().validate(&r, &user, &post);
        assert!(result.suggestions[0].contains("'user_id' to entity Post"));

        let post = entity(
            "Post",
            vec![NewField::new("userId", "Author", DataType::String).length(36)],
        );
        let r = rel(NewRelationship::new("p-1", "posts", "ONE_TO_MANY", &user.id, &post.id, "admin"));
        let result = RelationValidator::lenient().validate(&r, &user, &post);
        assert!(result.suggestions.is_empty());
    }

    #[test]
    fn test_many_to_many_join_table_strictness() {
        let user = entity("User", vec![]);
        let role = entity("Role", vec![]);
        let r = rel(NewRelationship::new("p-1", "roles", "MANY_TO_MANY", &user.id, &role.id, "admin"));

        let lenient = RelationValidator::lenient().validate(&r, &user, &role);
        assert!(lenient.is_valid);
        assert!(lenient.warnings[0].contains("user_role"));

        let strict = RelationValidator::strict().validate(&r, &user, &role);
        assert!(!strict.is_valid);
        assert!(strict.into_result().is_err());

        let r = rel(NewRelationship::new("p-1", "roles", "MANY_TO_MANY", &user.id, &role.id, "admin")
            .join_table("user_roles"));
        assert!(RelationValidator::strict().validate(&r, &user, &role).is_valid);
    }

    #[test]
    fn test_duplicate_relationships_conflict() {
        let existing = vec![rel(NewRelationship::new("p-1", "posts", "ONE_TO_MANY", "u", "p", "admin"))];
        let validator = RelationValidator::strict();

        let same_triple = rel(NewRelationship::new("p-1", "articles", "ONE_TO_MANY", "u", "p", "admin"));
        assert!(validator.check_duplicates(&same_triple, &existing).unwrap_err().is_conflict());

        let same_code = rel(NewRelationship::new("p-1", "posts", "ONE_TO_ONE", "u", "x", "admin"));
        assert!(validator.check_duplicates(&same_code, &existing).unwrap_err().is_conflict());

        let other = rel(NewRelationship::new("p-1", "pinned", "ONE_TO_ONE", "u", "p", "admin"));
        assert!(validator.check_duplicates(&other, &existing).is_ok());
    }
}
