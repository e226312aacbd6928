//! Content vocabulary.
//!
//! Draft-07 treats `contentEncoding` and `contentMediaType` as
//! annotations; they carry no assertion semantics here.

use crate::rules::KeywordDefinition;

pub(crate) fn vocabulary() -> Vec<(&'static str, KeywordDefinition)> {
    vec![
        ("contentEncoding", KeywordDefinition::annotation()),
        ("contentMediaType", KeywordDefinition::annotation()),
    ]
}
