//! Repository ports
//!
//! Storage for entities, fields and relationships sits behind async traits.
//! `InMemoryRepository` implements all three with instance-owned state.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::error::{Result, SchemaError};
use crate::schema::{Entity, Field, Relationship};

#[async_trait]
pub trait EntityRepository: Send + Sync {
    /// Insert or replace; stored entities carry no fields or relationships
    async fn save(&self, entity: &Entity) -> Result<()>;
    async fn find_by_id(&self, id: &str) -> Result<Option<Entity>>;
    async fn find_by_project_id(&self, project_id: &str) -> Result<Vec<Entity>>;
    async fn find_by_ids(&self, ids: &[String]) -> Result<Vec<Entity>>;
    async fn exists_by_code(&self, project_id: &str, code: &str, exclude_id: Option<&str>) -> Result<bool>;
    async fn delete(&self, id: &str) -> Result<()>;
}

#[async_trait]
pub trait FieldRepository: Send + Sync {
    async fn save(&self, field: &Field) -> Result<()>;
    async fn find_by_id(&self, id: &str) -> Result<Option<Field>>;
    /// Ordered by display order
    async fn find_by_entity_id(&self, entity_id: &str) -> Result<Vec<Field>>;
    async fn find_by_ids(&self, ids: &[String]) -> Result<Vec<Field>>;
    async fn exists_by_code(&self, entity_id: &str, code: &str, exclude_id: Option<&str>) -> Result<bool>;
    async fn delete(&self, id: &str) -> Result<()>;
    async fn delete_by_entity_id(&self, entity_id: &str) -> Result<usize>;
}

#[async_trait]
pub trait RelationshipRepository: Send + Sync {
    async fn save(&self, relationship: &Relationship) -> Result<()>;
    async fn find_by_id(&self, id: &str) -> Result<Option<Relationship>>;
    async fn find_by_project_id(&self, project_id: &str) -> Result<Vec<Relationship>>;
    /// Relationships with `entity_id` on either end
    async fn find_by_entity_id(&self, entity_id: &str) -> Result<Vec<Relationship>>;
    async fn find_by_ids(&self, ids: &[String]) -> Result<Vec<Relationship>>;
    async fn exists_by_code(&self, project_id: &str, code: &str, exclude_id: Option<&str>) -> Result<bool>;
    async fn delete(&self, id: &str) -> Result<()>;
}

// =============================================================================
// In-memory implementation
// =============================================================================

#[derive(Debug, Default)]
pub struct InMemoryRepository {
    entities: RwLock<HashMap<String, Entity>>,
    fields: RwLock<HashMap<String, Field>>,
    relationships: RwLock<HashMap<String, Relationship>>,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

fn by_ids<T: Clone>(map: &HashMap<String, T>, ids: &[String]) -> Vec<T> {
    ids.iter().filter_map(|id| map.get(id).cloned()).collect()
}

fn remove<T>(map: &mut HashMap<String, T>, kind: &'static str, id: &str) -> Result<()> {
    map.remove(id)
        .map(|_| ())
        .ok_or_else(|| SchemaError::not_found(kind, id))
}

#[async_trait]
impl EntityRepository for InMemoryRepository {
    async fn save(&self, entity: &Entity) -> Result<()> {
        let mut stored = entity.clone();
        stored.fields.clear();
        stored.relationships.clear();
        self.entities.write().await.insert(stored.id.clone(), stored);
        Ok(())
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<Entity>> {
        Ok(self.entities.read().await.get(id).cloned())
    }

    async fn find_by_project_id(&self, project_id: &str) -> Result<Vec<Entity>> {
        let mut found: Vec<Entity> = self
            .entities
            .read()
            .await
            .values()
            .filter(|e| e.project_id == project_id)
            .cloned()
            .collect();
        found.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.code.cmp(&b.code)));
        Ok(found)
    }

    async fn find_by_ids(&self, ids: &[String]) -> Result<Vec<Entity>> {
        Ok(by_ids(&*self.entities.read().await, ids))
    }

    async fn exists_by_code(&self, project_id: &str, code: &str, exclude_id: Option<&str>) -> Result<bool> {
        Ok(self.entities.read().await.values().any(|e| {
            e.project_id == project_id && e.code == code && Some(e.id.as_str()) != exclude_id
        }))
    }

    async fn delete(&self, id: &str) -> Result<()> {
        remove(&mut *self.entities.write().await, "Entity", id)
    }
}

#[async_trait]
impl FieldRepository for InMemoryRepository {
    async fn save(&self, field: &Field) -> Result<()> {
        self.fields.write().await.insert(field.id.clone(), field.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<Field>> {
        Ok(self.fields.read().await.get(id).cloned())
    }

    async fn find_by_entity_id(&self, entity_id: &str) -> Result<Vec<Field>> {
        let mut found: Vec<Field> = self
            .fields
            .read()
            .await
            .values()
            .filter(|f| f.entity_id == entity_id)
            .cloned()
            .collect();
        found.sort_by(|a, b| a.display_order.cmp(&b.display_order).then_with(|| a.code.cmp(&b.code)));
        Ok(found)
    }

    async fn find_by_ids(&self, ids: &[String]) -> Result<Vec<Field>> {
        Ok(by_ids(&*self.fields.read().await, ids))
    }

    async fn exists_by_code(&self, entity_id: &str, code: &str, exclude_id: Option<&str>) -> Result<bool> {
        Ok(self.fields.read().await.values().any(|f| {
            f.entity_id == entity_id && f.code == code && Some(f.id.as_str()) != exclude_id
        }))
    }

    async fn delete(&self, id: &str) -> Result<()> {
        remove(&mut *self.fields.write().await, "Field", id)
    }

    async fn delete_by_entity_id(&self, entity_id: &str) -> Result<usize> {
        let mut fields = self.fields.write().await;
        let before = fields.len();
        fields.retain(|_, f| f.entity_id != entity_id);
        Ok(before - fields.len())
    }
}

#[async_trait]
impl RelationshipRepository for InMemoryRepository {
    async fn save(&self, relationship: &Relationship) -> Result<()> {
        self.relationships
            .write()
            .await
            .insert(relationship.id.clone(), relationship.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<Relationship>> {
        Ok(self.relationships.read().await.get(id).cloned())
    }

    async fn find_by_project_id(&self, project_id: &str) -> Result<Vec<Relationship>> {
        let mut found: Vec<Relationship> = self
            .relationships
            .read()
            .await
            .values()
            .filter(|r| r.project_id == project_id)
            .cloned()
            .collect();
        found.sort_by(|a, b| a.code.cmp(&b.code));
        Ok(found)
    }

    async fn find_by_entity_id(&self, entity_id: &str) -> Result<Vec<Relationship>> {
        let mut found: Vec<Relationship> = self
            .relationships
            .read()
            .await
            .values()
            .filter(|r| r.touches(entity_id))
            .cloned()
            .collect();
        found.sort_by(|a, b| a.code.cmp(&b.code));
        Ok(found)
    }

    async fn find_by_ids(&self, ids: &[String]) -> Result<Vec<Relationship>> {
        Ok(by_ids(&*self.relationships.read().await, ids))
    }

    async fn exists_by_code(&self, project_id: &str, code: &str, exclude_id: Option<&str>) -> Result<bool> {
        Ok(self.relationships.read().await.values().any(|r| {
            r.project_id == project_id && r.code == code && Some(r.id.as_str()) != exclude_id
        }))
    }

    async fn delete(&self, id: &str) -> Result<()> {
        remove(&mut *self.relationships.write().await, "Relationship", id)
    }
}
