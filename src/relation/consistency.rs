//! Project-wide relationship consistency check
//!
//! Advisory only: issues are reported and logged, never raised.

use serde::Serialize;
use tracing::warn;

use super::graph::RelationGraph;
use crate::schema::{Entity, Relationship, RelationshipType};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsistencyIssue {
    pub relationship_id: String,
    pub relationship_code: String,
    /// Entity the relationship was checked from
    pub entity_id: String,
    pub message: String,
}

/// Check every outgoing relationship for a declared reverse relationship
///
/// MANY_TO_ONE relationships are not checked from their source side. A
/// ONE_TO_MANY whose reverse is a MANY_TO_ONE is satisfied, but a lone
/// MANY_TO_ONE never produces an issue.
pub fn check_consistency(entities: &[Entity], relationships: &[Relationship]) -> Vec<ConsistencyIssue> {
    let graph = RelationGraph::build(entities, relationships);
    let mut issues = Vec::new();

    for entity in entities {
        for rel in graph.refs_out(&entity.id) {
            if rel.relationship_type == RelationshipType::ManyToOne {
                continue;
            }

            let Some(target) = entities.iter().find(|e| e.id == rel.target_entity_id) else {
                issues.push(ConsistencyIssue {
                    relationship_id: rel.id.clone(),
                    relationship_code: rel.code.clone(),
                    entity_id: entity.id.clone(),
                    message: format!(
                        "Target entity {} of relationship {} not found",
                        rel.target_entity_id, rel.code
                    ),
                });
                continue;
            };

            if rel.is_self_referencing() {
                continue;
            }

            if graph.between(&target.id, &entity.id).is_empty() {
                issues.push(ConsistencyIssue {
                    relationship_id: rel.id.clone(),
                    relationship_code: rel.code.clone(),
                    entity_id: entity.id.clone(),
                    message: format!(
                        "Missing reverse relationship from {} to {} for {}",
                        target.code, entity.code, rel.code
                    ),
                });
            }
        }
    }

    for issue in &issues {
        warn!(relationship = %issue.relationship_code, "{}", issue.message);
    }
    issues
}
