//! Project Relationship Graph
//!
//! Directed graph with one node per entity id and one edge per relationship
//! (source -> target). Provides the reverse lookups needed by the consistency
//! check, delete guards and per-entity code generation.

use std::collections::HashMap;

use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use petgraph::Direction;

use crate::schema::{Entity, Relationship};

pub struct RelationGraph<'a> {
    /// Edge weight is the index into `relationships`
    graph: DiGraph<&'a str, usize>,
    node_indices: HashMap<&'a str, NodeIndex>,
    relationships: &'a [Relationship],
}

impl<'a> RelationGraph<'a> {
    /// Build the graph; relationship endpoints without an entity still get a node
    pub fn build(entities: &'a [Entity], relationships: &'a [Relationship]) -> Self {
        let mut graph = DiGraph::new();
        let mut node_indices = HashMap::new();

        for entity in entities {
            node_indices
                .entry(entity.id.as_str())
                .or_insert_with(|| graph.add_node(entity.id.as_str()));
        }

        for (idx, rel) in relationships.iter().enumerate() {
            let source = *node_indices
                .entry(rel.source_entity_id.as_str())
                .or_insert_with(|| graph.add_node(rel.source_entity_id.as_str()));
            let target = *node_indices
                .entry(rel.target_entity_id.as_str())
                .or_insert_with(|| graph.add_node(rel.target_entity_id.as_str()));
            graph.add_edge(source, target, idx);
        }

        Self {
            graph,
            node_indices,
            relationships,
        }
    }

    pub fn entity_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn relationship_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Relationships whose source is `entity_id`
    pub fn refs_out(&self, entity_id: &str) -> Vec<&'a Relationship> {
        self.edges(entity_id, Direction::Outgoing)
    }

    /// Relationships whose target is `entity_id`
    pub fn refs_in(&self, entity_id: &str) -> Vec<&'a Relationship> {
        self.edges(entity_id, Direction::Incoming)
    }

    /// Relationships with `entity_id` on either end, each listed once
    pub fn touching(&self, entity_id: &str) -> Vec<&'a Relationship> {
        let mut out = self.refs_out(entity_id);
        for rel in self.refs_in(entity_id) {
            if !rel.is_self_referencing() {
                out.push(rel);
            }
        }
        out.sort_by(|a, b| a.code.cmp(&b.code));
        out
    }

    /// Relationships declared from `source_id` to `target_id`
    pub fn between(&self, source_id: &str, target_id: &str) -> Vec<&'a Relationship> {
        let (Some(&a), Some(&b)) = (
            self.node_indices.get(source_id),
            self.node_indices.get(target_id),
        ) else {
            return Vec::new();
        };

        self.graph
            .edges_connecting(a, b)
            .filter_map(|e| self.relationships.get(*e.weight()))
            .collect()
    }

    fn edges(&self, entity_id: &str, direction: Direction) -> Vec<&'a Relationship> {
        let Some(&node_idx) = self.node_indices.get(entity_id) else {
            return Vec::new();
        };

        self.graph
            .edges_directed(node_idx, direction)
            .filter_map(|e| self.relationships.get(*e.weight()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{NewEntity, NewRelationship};

    fn entity(code: &str) -> Entity {
        Entity::create(NewEntity::new("p-1", code, code, "admin")).unwrap()
    }

    fn rel(code: &str, kind: &str, source: &Entity, target: &Entity) -> Relationship {
        Relationship::create(NewRelationship::new(
            "p-1", code, kind, &source.id, &target.id, "admin",
        ))
        .unwrap()
    }

    #[test]
    fn test_lookups() {
        let user = entity("User");
        let post = entity("Post");
        let entities = vec![user.clone(), post.clone()];
        let relationships = vec![
            rel("userPosts", "ONE_TO_MANY", &user, &post),
            rel("postAuthor", "MANY_TO_ONE", &post, &user),
            rel("parent", "MANY_TO_ONE", &post, &post),
        ];
        let graph = RelationGraph::build(&entities, &relationships);

        assert_eq!(graph.entity_count(), 2);
        assert_eq!(graph.relationship_count(), 3);
        assert_eq!(graph.refs_out(&user.id).len(), 1);
        assert_eq!(graph.refs_in(&user.id).len(), 1);
        assert_eq!(graph.between(&post.id, &user.id)[0].code, "postAuthor");

        let touching: Vec<_> = graph.touching(&post.id).iter().map(|r| r.code.as_str()).collect();
        assert_eq!(touching, ["parent", "postAuthor", "userPosts"]);
        assert!(graph.refs_out("missing").is_empty());
    }
}
