//! Default name resolution for relationships
//!
//! Generated code and join-table DDL must agree on accessor, foreign key
//! and join table names, so every emitter reads them from `ResolvedRelation`.

use serde::Serialize;

use crate::naming::{to_lower_camel, to_snake_case};
use crate::schema::rules::is_valid_identifier;
use crate::schema::{Entity, ReferentialAction, Relationship, RelationshipType};

/// A relationship with every name filled in
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedRelation {
    pub relationship_type: RelationshipType,
    /// Class names of the two ends
    pub source_class: String,
    pub target_class: String,
    pub source_table: String,
    pub target_table: String,
    /// Accessor on the source entity, pointing at the target
    pub source_field: String,
    /// Accessor on the target entity, pointing back at the source
    pub target_field: String,
    /// Foreign key column; absent for MANY_TO_MANY
    pub foreign_key: Option<String>,
    /// Junction table; MANY_TO_MANY only
    pub join_table: Option<String>,
    pub join_column: Option<String>,
    pub inverse_join_column: Option<String>,
    pub on_delete: ReferentialAction,
    pub lazy: bool,
}

impl ResolvedRelation {
    /// Entity whose table carries the foreign key column
    pub fn owner_is_source(&self) -> bool {
        matches!(
            self.relationship_type,
            RelationshipType::OneToOne | RelationshipType::ManyToOne
        )
    }
}

/// Identifier-safe base name of an entity: its name, or its code when the
/// name is not a valid identifier
fn base_name(entity: &Entity) -> &str {
    if is_valid_identifier(&entity.name) {
        &entity.name
    } else {
        &entity.code
    }
}

/// Class name used in generated code (`order_item` -> `OrderItem`)
pub fn class_name(entity: &Entity) -> String {
    crate::naming::to_pascal_case(&to_snake_case(base_name(entity)))
}

/// lowerCamel accessor for `entity`, with a trailing `s` for collections
pub fn default_accessor(entity: &Entity, plural: bool) -> String {
    let name = to_lower_camel(&class_name(entity));
    if plural {
        format!("{}s", name)
    } else {
        name
    }
}

/// `<one-side entity>_id`; `None` for MANY_TO_MANY
pub fn default_foreign_key(
    relationship_type: RelationshipType,
    source: &Entity,
    target: &Entity,
) -> Option<String> {
    let one_side = match relationship_type {
        RelationshipType::OneToOne | RelationshipType::ManyToOne => target,
        RelationshipType::OneToMany => source,
        RelationshipType::ManyToMany => return None,
    };
    Some(format!("{}_id", base_name(one_side).to_lowercase()))
}

/// `<source>_<target>`, lowercased
pub fn default_join_table(source: &Entity, target: &Entity) -> String {
    format!(
        "{}_{}",
        base_name(source).to_lowercase(),
        base_name(target).to_lowercase()
    )
}

/// Whether the (source, target) accessors point at collections
fn plurality(relationship_type: RelationshipType) -> (bool, bool) {
    match relationship_type {
        RelationshipType::OneToOne => (false, false),
        RelationshipType::OneToMany => (true, false),
        RelationshipType::ManyToOne => (false, true),
        RelationshipType::ManyToMany => (true, true),
    }
}

fn non_empty(value: &Option<String>) -> Option<String> {
    value.as_ref().filter(|v| !v.trim().is_empty()).cloned()
}

/// Fill in every name the caller did not supply
pub fn resolve(relationship: &Relationship, source: &Entity, target: &Entity) -> ResolvedRelation {
    let kind = relationship.relationship_type;
    let (source_plural, target_plural) = plurality(kind);

    let source_field = non_empty(&relationship.source_field)
        .unwrap_or_else(|| default_accessor(target, source_plural));
    let target_field = non_empty(&relationship.target_field)
        .unwrap_or_else(|| default_accessor(source, target_plural));

    let foreign_key = match kind {
        RelationshipType::ManyToMany => None,
        _ => non_empty(&relationship.foreign_key_name)
            .or_else(|| default_foreign_key(kind, source, target)),
    };

    let (join_table, join_column, inverse_join_column) = if kind == RelationshipType::ManyToMany {
        let table = non_empty(&relationship.join_table)
            .unwrap_or_else(|| default_join_table(source, target));
        let source_col = format!("{}_id", base_name(source).to_lowercase());
        let mut target_col = format!("{}_id", base_name(target).to_lowercase());
        if source_col == target_col {
            target_col = format!("related_{}", target_col);
        }
        (Some(table), Some(source_col), Some(target_col))
    } else {
        (None, None, None)
    };

    ResolvedRelation {
        relationship_type: kind,
        source_class: class_name(source),
        target_class: class_name(target),
        source_table: source.table_name.clone(),
        target_table: target.table_name.clone(),
        source_field,
        target_field,
        foreign_key,
        join_table,
        join_column,
        inverse_join_column,
        on_delete: relationship.on_delete,
        lazy: relationship.lazy,
    }
}
