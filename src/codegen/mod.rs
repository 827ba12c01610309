//! Code Generation
//!
//! Emits association code for a relationship between two entities, plus
//! the join-table DDL for MANY_TO_MANY.
//!
//! Architecture:
//! - `relation::resolve` fills in every accessor, key and table name once
//! - Emitters (`typeorm`, `jpa`, `django`) only read the `ResolvedRelation`
//! - `ddl` renders SQL shared with the migration planner
//!
//! Generation is pure: same inputs, same bytes.

pub mod ddl;
pub mod django;
pub mod jpa;
pub mod typeorm;

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::Serialize;
use tracing::{debug, info};

use crate::error::{Result, SchemaError};
use crate::relation::{check_consistency, resolve, ConsistencyIssue, RelationGraph, RelationValidation, RelationValidator};
use crate::schema::{Entity, Relationship, RelationshipType};

// =============================================================================
// Framework
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Framework {
    /// TypeORM decorators
    NestJs,
    /// JPA annotations
    SpringBoot,
    /// Django model fields
    Django,
}

impl Framework {
    pub fn as_str(&self) -> &'static str {
        match self {
            Framework::NestJs => "nestjs",
            Framework::SpringBoot => "spring-boot",
            Framework::Django => "django",
        }
    }
}

impl FromStr for Framework {
    type Err = SchemaError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "nestjs" => Ok(Framework::NestJs),
            "spring-boot" => Ok(Framework::SpringBoot),
            "django" => Ok(Framework::Django),
            _ => Err(SchemaError::bad_request(format!("Unsupported framework: {}", s))),
        }
    }
}

impl fmt::Display for Framework {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Single relationship
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedRelation {
    /// Declaration placed in the source entity
    pub source_code: String,
    /// Declaration placed in the target entity
    pub target_code: String,
    #[serde(rename = "joinTableDDL", skip_serializing_if = "Option::is_none")]
    pub join_table_ddl: Option<String>,
}

/// Generate association code for `relationship` in the named framework
pub fn generate(
    relationship: &Relationship,
    source: &Entity,
    target: &Entity,
    framework: &str,
) -> Result<GeneratedRelation> {
    let framework: Framework = framework.parse()?;
    Ok(generate_for(relationship, source, target, framework))
}

pub fn generate_for(
    relationship: &Relationship,
    source: &Entity,
    target: &Entity,
    framework: Framework,
) -> GeneratedRelation {
    let resolved = resolve(relationship, source, target);

    let (source_code, target_code) = match framework {
        Framework::NestJs => typeorm::emit(&resolved),
        Framework::SpringBoot => jpa::emit(&resolved),
        Framework::Django => django::emit(&resolved),
    };

    let join_table_ddl = match relationship.relationship_type {
        RelationshipType::ManyToMany => ddl::join_table(&relationship.name, &resolved),
        _ => None,
    };

    debug!(relationship = %relationship.code, %framework, "generated relation code");
    GeneratedRelation {
        source_code,
        target_code,
        join_table_ddl,
    }
}

// =============================================================================
// Whole project
// =============================================================================

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessedRelation {
    pub relationship_id: String,
    pub relationship_code: String,
    pub source_entity_id: String,
    pub target_entity_id: String,
    pub generated: GeneratedRelation,
    pub validation: RelationValidation,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessedEntity {
    pub entity_id: String,
    pub name: String,
    pub table_name: String,
    /// Class names of the other entities referenced by this entity's relations
    pub imports: Vec<String>,
    /// Ids of those entities
    pub dependencies: Vec<String>,
    pub relations: Vec<ProcessedRelation>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectCodegen {
    pub entities: Vec<ProcessedEntity>,
    pub consistency: Vec<ConsistencyIssue>,
}

/// Generate code for every relationship touching every entity
///
/// A relationship appears under both of its entities. Validation findings
/// are attached to each relation and do not stop generation; a relationship
/// whose endpoint is not among `entities` is a NotFound error.
pub fn process_project(
    entities: &[Entity],
    relationships: &[Relationship],
    framework: &str,
    validator: &RelationValidator,
) -> Result<ProjectCodegen> {
    let framework: Framework = framework.parse()?;
    info!(
        entities = entities.len(),
        relationships = relationships.len(),
        %framework,
        "processing project relations"
    );

    let graph = RelationGraph::build(entities, relationships);
    let mut processed = Vec::with_capacity(entities.len());

    for entity in entities {
        let mut relations = Vec::new();
        let mut imports = BTreeSet::new();
        let mut dependencies = BTreeSet::new();

        for rel in graph.touching(&entity.id) {
            let source = find_entity(entities, &rel.source_entity_id)?;
            let target = find_entity(entities, &rel.target_entity_id)?;

            if target.id != entity.id {
                imports.insert(crate::relation::class_name(target));
                dependencies.insert(target.id.clone());
            }

            relations.push(ProcessedRelation {
                relationship_id: rel.id.clone(),
                relationship_code: rel.code.clone(),
                source_entity_id: source.id.clone(),
                target_entity_id: target.id.clone(),
                generated: generate_for(rel, source, target, framework),
                validation: validator.validate(rel, source, target),
            });
        }

        processed.push(ProcessedEntity {
            entity_id: entity.id.clone(),
            name: entity.name.clone(),
            table_name: entity.table_name.clone(),
            imports: imports.into_iter().collect(),
            dependencies: dependencies.into_iter().collect(),
            relations,
        });
    }

    Ok(ProjectCodegen {
        entities: processed,
        consistency: check_consistency(entities, relationships),
    })
}

fn find_entity<'a>(entities: &'a [Entity], id: &str) -> Result<&'a Entity> {
    entities
        .iter()
        .find(|e| e.id == id)
        .ok_or_else(|| SchemaError::not_found("Entity", id))
}
