//! Core vocabulary: identifiers and references.
//!
//! `$ref` replaces the schema it appears in and is dispatched by the
//! compiler directly; the definitions here make the core keywords
//! known to the registry (and therefore to strict mode).

use crate::rules::KeywordDefinition;

pub(crate) fn vocabulary() -> Vec<(&'static str, KeywordDefinition)> {
    vec![
        ("$id", KeywordDefinition::annotation()),
        ("$schema", KeywordDefinition::annotation()),
        ("$ref", KeywordDefinition::annotation()),
        ("definitions", KeywordDefinition::annotation()),
    ]
}
