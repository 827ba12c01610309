//! JPA (Spring Boot) annotation emitter

use crate::relation::ResolvedRelation;
use crate::schema::RelationshipType;

/// `(fetch = FetchType.LAZY)` on annotations without other arguments
fn lazy_args(r: &ResolvedRelation) -> &'static str {
    if r.lazy {
        "(fetch = FetchType.LAZY)"
    } else {
        ""
    }
}

/// Trailing fetch argument after `mappedBy`
fn lazy_tail(r: &ResolvedRelation) -> &'static str {
    if r.lazy {
        ", fetch = FetchType.LAZY"
    } else {
        ""
    }
}

fn join_column(r: &ResolvedRelation) -> String {
    format!(
        "@JoinColumn(name = \"{}\")",
        r.foreign_key.as_deref().unwrap_or_default()
    )
}

/// Emit the `(source, target)` field declarations
pub fn emit(r: &ResolvedRelation) -> (String, String) {
    let (src, tgt) = (&r.source_class, &r.target_class);
    let (sf, tf) = (&r.source_field, &r.target_field);

    match r.relationship_type {
        RelationshipType::OneToOne => (
            format!(
                "@OneToOne{lazy}\n    {jc}\n    private {tgt} {sf};",
                lazy = lazy_args(r),
                jc = join_column(r)
            ),
            format!(
                "@OneToOne(mappedBy = \"{sf}\"{lazy})\n    private {src} {tf};",
                lazy = lazy_tail(r)
            ),
        ),
        RelationshipType::OneToMany => (
            format!(
                "@OneToMany(mappedBy = \"{tf}\"{lazy})\n    private List<{tgt}> {sf};",
                lazy = lazy_tail(r)
            ),
            format!(
                "@ManyToOne{lazy}\n    {jc}\n    private {src} {tf};",
                lazy = lazy_args(r),
                jc = join_column(r)
            ),
        ),
        RelationshipType::ManyToOne => (
            format!(
                "@ManyToOne{lazy}\n    {jc}\n    private {tgt} {sf};",
                lazy = lazy_args(r),
                jc = join_column(r)
            ),
            format!(
                "@OneToMany(mappedBy = \"{sf}\"{lazy})\n    private List<{src}> {tf};",
                lazy = lazy_tail(r)
            ),
        ),
        RelationshipType::ManyToMany => (
            format!(
                "@ManyToMany{lazy}\n    @JoinTable(\n        name = \"{jt}\",\n        joinColumns = @JoinColumn(name = \"{jc}\"),\n        inverseJoinColumns = @JoinColumn(name = \"{ijc}\")\n    )\n    private List<{tgt}> {sf};",
                lazy = lazy_args(r),
                jt = r.join_table.as_deref().unwrap_or_default(),
                jc = r.join_column.as_deref().unwrap_or_default(),
                ijc = r.inverse_join_column.as_deref().unwrap_or_default(),
            ),
            format!(
                "@ManyToMany(mappedBy = \"{sf}\"{lazy})\n    private List<{src}> {tf};",
                lazy = lazy_tail(r)
            ),
        ),
    }
}
