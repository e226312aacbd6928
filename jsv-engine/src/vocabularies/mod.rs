//! Built-in keyword vocabularies, installed in a fixed order at engine
//! construction: core, validation, applicator, format, metadata,
//! content.
//!
//! Every keyword is an independent emitter registered through the same
//! machinery as user keywords; nothing here is special-cased beyond
//! what the compiler does for `type`, `nullable` and `$ref`.

pub(crate) mod applicator;
pub(crate) mod content;
pub(crate) mod core;
pub(crate) mod format;
pub(crate) mod metadata;
pub(crate) mod validation;
