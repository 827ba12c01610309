//! TypeORM (NestJS) decorator emitter

use crate::relation::ResolvedRelation;
use crate::schema::RelationshipType;

fn lazy(r: &ResolvedRelation) -> &'static str {
    if r.lazy {
        ", { lazy: true }"
    } else {
        ""
    }
}

fn join_column(r: &ResolvedRelation) -> String {
    format!(
        "@JoinColumn({{ name: '{}' }})",
        r.foreign_key.as_deref().unwrap_or_default()
    )
}

/// Emit the `(source, target)` property declarations
pub fn emit(r: &ResolvedRelation) -> (String, String) {
    let (src, tgt) = (&r.source_class, &r.target_class);
    let (s, t) = (src.to_lowercase(), tgt.to_lowercase());
    let (sf, tf) = (&r.source_field, &r.target_field);

    match r.relationship_type {
        RelationshipType::OneToOne => (
            format!(
                "@OneToOne(() => {tgt}{lazy})\n  {jc}\n  {sf}: {tgt};",
                lazy = lazy(r),
                jc = join_column(r)
            ),
            format!("@OneToOne(() => {src}, {s} => {s}.{sf})\n  {tf}: {src};"),
        ),
        RelationshipType::OneToMany => (
            format!(
                "@OneToMany(() => {tgt}, {t} => {t}.{tf}{lazy})\n  {sf}: {tgt}[];",
                lazy = lazy(r)
            ),
            format!(
                "@ManyToOne(() => {src}{lazy})\n  {jc}\n  {tf}: {src};",
                lazy = lazy(r),
                jc = join_column(r)
            ),
        ),
        RelationshipType::ManyToOne => (
            format!(
                "@ManyToOne(() => {tgt}{lazy})\n  {jc}\n  {sf}: {tgt};",
                lazy = lazy(r),
                jc = join_column(r)
            ),
            format!(
                "@OneToMany(() => {src}, {s} => {s}.{sf}{lazy})\n  {tf}: {src}[];",
                lazy = lazy(r)
            ),
        ),
        RelationshipType::ManyToMany => (
            format!(
                "@ManyToMany(() => {tgt}{lazy})\n  @JoinTable({{\n    name: '{jt}',\n    joinColumn: {{ name: '{jc}' }},\n    inverseJoinColumn: {{ name: '{ijc}' }}\n  }})\n  {sf}: {tgt}[];",
                lazy = lazy(r),
                jt = r.join_table.as_deref().unwrap_or_default(),
                jc = r.join_column.as_deref().unwrap_or_default(),
                ijc = r.inverse_join_column.as_deref().unwrap_or_default(),
            ),
            format!(
                "@ManyToMany(() => {src}, {s} => {s}.{sf}{lazy})\n  {tf}: {src}[];",
                lazy = lazy(r)
            ),
        ),
    }
}
