//! Embedded meta-schemas.

use once_cell::sync::Lazy;
use serde_json::Value;

/// Canonical id of the draft-07 meta-schema (normalized, no trailing
/// fragment).
pub const DRAFT07_ID: &str = "http://json-schema.org/draft-07/schema";

/// Canonical id of the `$data` reference meta-schema.
pub const DATA_REF_ID: &str = "https://jsv-rs.github.io/schemas/data.json";

static DRAFT07: Lazy<Value> = Lazy::new(|| {
    serde_json::from_str(include_str!("meta/draft07.json"))
        .expect("embedded draft-07 meta-schema parses")
});

static DATA_REF: Lazy<Value> = Lazy::new(|| {
    serde_json::from_str(include_str!("meta/data.json"))
        .expect("embedded $data meta-schema parses")
});

/// The draft-07 meta-schema document.
#[must_use]
pub fn draft07() -> Value {
    DRAFT07.clone()
}

/// The `$data` reference meta-schema document.
#[must_use]
pub fn data_ref_schema() -> Value {
    DATA_REF.clone()
}
