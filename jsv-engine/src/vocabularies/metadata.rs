//! Metadata vocabulary: pure annotations.
//!
//! `default` is read by `properties` when `use_defaults` is enabled;
//! everything else only needs to be known to the registry.

use crate::rules::KeywordDefinition;

pub(crate) fn vocabulary() -> Vec<(&'static str, KeywordDefinition)> {
    vec![
        ("title", KeywordDefinition::annotation()),
        ("description", KeywordDefinition::annotation()),
        ("default", KeywordDefinition::annotation()),
        ("examples", KeywordDefinition::annotation()),
        ("$comment", KeywordDefinition::annotation()),
        ("readOnly", KeywordDefinition::annotation()),
        ("writeOnly", KeywordDefinition::annotation()),
    ]
}
