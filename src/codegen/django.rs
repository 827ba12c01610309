//! Django model field emitter
//!
//! Django declares each relation once; the other side gets a comment naming
//! the reverse accessor.

use crate::relation::ResolvedRelation;
use crate::schema::{ReferentialAction, RelationshipType};

fn on_delete(action: ReferentialAction) -> &'static str {
    match action {
        ReferentialAction::Cascade => "models.CASCADE",
        ReferentialAction::SetNull => "models.SET_NULL",
        ReferentialAction::Restrict => "models.RESTRICT",
        ReferentialAction::NoAction => "models.DO_NOTHING",
    }
}

/// `null=True` is required for SET_NULL
fn on_delete_args(action: ReferentialAction) -> String {
    match action {
        ReferentialAction::SetNull => format!("on_delete={}, null=True", on_delete(action)),
        _ => format!("on_delete={}", on_delete(action)),
    }
}

/// Emit the `(source, target)` model fields
pub fn emit(r: &ResolvedRelation) -> (String, String) {
    let (src, tgt) = (&r.source_class, &r.target_class);
    let (s, t) = (src.to_lowercase(), tgt.to_lowercase());
    let (sf, tf) = (&r.source_field, &r.target_field);
    let on_delete = on_delete_args(r.on_delete);

    match r.relationship_type {
        RelationshipType::OneToOne => (
            format!("{sf} = models.OneToOneField({tgt}, {on_delete})"),
            format!("{tf} = models.OneToOneField({src}, {on_delete}, related_name='{sf}')"),
        ),
        RelationshipType::OneToMany => (
            format!("# {sf} accessible via {t}_set"),
            format!("{tf} = models.ForeignKey({src}, {on_delete}, related_name='{sf}')"),
        ),
        RelationshipType::ManyToOne => (
            format!("{sf} = models.ForeignKey({tgt}, {on_delete}, related_name='{tf}')"),
            format!("# {tf} accessible via {s}_set"),
        ),
        RelationshipType::ManyToMany => (
            format!("{sf} = models.ManyToManyField({tgt}, related_name='{tf}')"),
            format!("# {tf} accessible via {sf} reverse relation"),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_on_delete_mapping() {
        assert_eq!(on_delete_args(ReferentialAction::Cascade), "on_delete=models.CASCADE");
        assert_eq!(
            on_delete_args(ReferentialAction::SetNull),
            "on_delete=models.SET_NULL, null=True"
        );
        assert_eq!(on_delete_args(ReferentialAction::NoAction), "on_delete=models.DO_NOTHING");
    }
}
