//! Data-mutating options: defaults injection, type coercion, property
//! stripping, and their isolation from meta-schema compilation.

use jsv_engine::{CoerceTypes, ValidationEngine, ValidatorOptions};
use serde_json::json;

#[test]
fn use_defaults_injects_and_validates_the_default() {
    let options = ValidatorOptions {
        use_defaults: true,
        ..ValidatorOptions::new()
    };
    let engine = ValidationEngine::with_options(options).expect("engine builds");
    let schema = json!({
        "type": "object",
        "properties": {"x": {"default": 5, "type": "number"}}
    });
    let mut data = json!({});
    assert!(engine.validate(&schema, &mut data).expect("sync validation"));
    assert_eq!(data, json!({"x": 5}));

    // An invalid default is itself caught.
    let bad_default = json!({
        "type": "object",
        "properties": {"x": {"default": "nope", "type": "number"}}
    });
    let mut data = json!({});
    assert!(!engine.validate(&bad_default, &mut data).expect("sync validation"));
}

#[test]
fn defaults_stay_off_without_the_option() {
    let engine = ValidationEngine::new().expect("engine builds");
    let schema = json!({
        "type": "object",
        "properties": {"x": {"default": 5, "type": "number"}}
    });
    let mut data = json!({});
    assert!(engine.validate(&schema, &mut data).expect("sync validation"));
    assert_eq!(data, json!({}));
}

#[test]
fn defaults_are_not_injected_inside_composite_applicators() {
    let options = ValidatorOptions {
        use_defaults: true,
        ..ValidatorOptions::new()
    };
    let engine = ValidationEngine::with_options(options).expect("engine builds");
    let schema = json!({
        "anyOf": [{
            "type": "object",
            "properties": {"x": {"default": 5, "type": "number"}}
        }]
    });
    let mut data = json!({});
    assert!(engine.validate(&schema, &mut data).expect("sync validation"));
    assert_eq!(data, json!({}));
}

#[test]
fn coerce_types_rewrites_scalars() {
    let options = ValidatorOptions {
        coerce_types: CoerceTypes::On,
        ..ValidatorOptions::new()
    };
    let engine = ValidationEngine::with_options(options).expect("engine builds");

    let schema = json!({"type": "object", "properties": {
        "n": {"type": "number"},
        "b": {"type": "boolean"},
        "s": {"type": "string"}
    }});
    let mut data = json!({"n": "42", "b": "false", "s": 7});
    assert!(engine.validate(&schema, &mut data).expect("sync validation"));
    assert_eq!(data, json!({"n": 42, "b": false, "s": "7"}));

    let mut unconvertible = json!({"n": "not a number"});
    assert!(!engine.validate(&schema, &mut unconvertible).expect("sync validation"));
}

#[test]
fn coerce_types_array_wraps_and_unwraps() {
    let options = ValidatorOptions {
        coerce_types: CoerceTypes::Array,
        ..ValidatorOptions::new()
    };
    let engine = ValidationEngine::with_options(options).expect("engine builds");

    let to_array = json!({"type": "array", "items": {"type": "number"}});
    let mut data = json!(5);
    assert!(engine.validate(&to_array, &mut data).expect("sync validation"));
    assert_eq!(data, json!([5]));

    let to_scalar = json!({"type": "number"});
    let mut data = json!([5]);
    assert!(engine.validate(&to_scalar, &mut data).expect("sync validation"));
    assert_eq!(data, json!(5));
}

#[test]
fn remove_additional_strips_rejected_properties() {
    let options = ValidatorOptions {
        remove_additional: true,
        ..ValidatorOptions::new()
    };
    let engine = ValidationEngine::with_options(options).expect("engine builds");
    let schema = json!({
        "type": "object",
        "properties": {"keep": {"type": "number"}},
        "additionalProperties": false
    });
    let mut data = json!({"keep": 1, "drop": 2, "also-drop": 3});
    assert!(engine.validate(&schema, &mut data).expect("sync validation"));
    assert_eq!(data, json!({"keep": 1}));
}

#[test]
fn meta_schema_compilation_never_mutates() {
    let options = ValidatorOptions {
        use_defaults: true,
        coerce_types: CoerceTypes::On,
        ..ValidatorOptions::new()
    };
    let engine = ValidationEngine::with_options(options).expect("engine builds");

    engine
        .add_meta_schema(
            json!({
                "$id": "mutating-meta",
                "type": "object",
                "properties": {"flag": {"default": true, "type": "boolean"}}
            }),
            None,
        )
        .expect("adds meta");
    let meta_validator = engine
        .get_schema("mutating-meta")
        .expect("lookup works")
        .expect("meta registered");
    let mut doc = json!({});
    assert!(meta_validator.validate(&mut doc).expect("sync validation"));
    // Compiled under the meta options profile: no default injected.
    assert_eq!(doc, json!({}));

    // The same shape as a plain schema does mutate.
    let plain = engine
        .compile(&json!({
            "type": "object",
            "properties": {"flag": {"default": true, "type": "boolean"}}
        }))
        .expect("compiles");
    let mut data = json!({});
    assert!(plain.validate(&mut data).expect("sync validation"));
    assert_eq!(data, json!({"flag": true}));
}
