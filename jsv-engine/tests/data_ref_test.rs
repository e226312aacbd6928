//! The `$data` runtime-reference mechanism.

use jsv_engine::{meta, EngineError, ValidationEngine, ValidatorOptions};
use serde_json::json;

fn data_engine() -> ValidationEngine {
    ValidationEngine::with_options(ValidatorOptions::new().with_data(true)).expect("engine builds")
}

#[test]
fn maximum_reads_its_limit_from_a_sibling() {
    let engine = data_engine();
    let schema = json!({
        "type": "object",
        "properties": {
            "smaller": {"type": "number", "maximum": {"$data": "1/larger"}},
            "larger": {"type": "number"}
        }
    });
    let mut ok = json!({"smaller": 5, "larger": 7});
    assert!(engine.validate(&schema, &mut ok).expect("sync validation"));
    let mut bad = json!({"smaller": 8, "larger": 7});
    assert!(!engine.validate(&schema, &mut bad).expect("sync validation"));
    let errors = engine.errors().expect("errors recorded");
    assert_eq!(errors[0].keyword, "maximum");
    assert_eq!(errors[0].data_path, ".smaller");
}

#[test]
fn const_reads_an_absolute_pointer() {
    let engine = data_engine();
    let schema = json!({
        "type": "object",
        "properties": {
            "confirmation": {"const": {"$data": "/email"}}
        }
    });
    let mut ok = json!({"email": "a@b.c", "confirmation": "a@b.c"});
    assert!(engine.validate(&schema, &mut ok).expect("sync validation"));
    let mut bad = json!({"email": "a@b.c", "confirmation": "x@y.z"});
    assert!(!engine.validate(&schema, &mut bad).expect("sync validation"));
}

#[test]
fn unresolved_data_pointers_impose_no_constraint() {
    let engine = data_engine();
    let schema = json!({
        "type": "object",
        "properties": {"v": {"type": "number", "maximum": {"$data": "1/absent"}}}
    });
    let mut data = json!({"v": 1_000_000});
    assert!(engine.validate(&schema, &mut data).expect("sync validation"));
}

#[test]
fn wrong_typed_data_values_fail_validation() {
    let engine = data_engine();
    let schema = json!({
        "type": "object",
        "properties": {
            "v": {"type": "number", "maximum": {"$data": "1/limit"}},
            "limit": {}
        }
    });
    let mut data = json!({"v": 1, "limit": "not a number"});
    assert!(!engine.validate(&schema, &mut data).expect("sync validation"));
    let errors = engine.errors().expect("errors recorded");
    assert_eq!(errors[0].keyword, "maximum");
}

#[test]
fn required_accepts_a_runtime_property_list() {
    let engine = data_engine();
    let schema = json!({
        "type": "object",
        "required": {"$data": "0/mandatory"}
    });
    let mut ok = json!({"mandatory": ["a"], "a": 1});
    assert!(engine.validate(&schema, &mut ok).expect("sync validation"));
    let mut bad = json!({"mandatory": ["a", "b"], "a": 1});
    assert!(!engine.validate(&schema, &mut bad).expect("sync validation"));
}

#[test]
fn data_refs_require_the_option_and_keyword_support() {
    // Engine without $data: the literal object is not a valid keyword
    // value.
    let engine = ValidationEngine::new().expect("engine builds");
    let err = engine
        .compile(&json!({"type": "number", "maximum": {"$data": "/limit"}}))
        .expect_err("rejected without the option");
    assert!(matches!(err, EngineError::InvalidSchema { .. }));

    // $data enabled, but `properties` does not support it.
    let engine = data_engine();
    let err = engine
        .compile(&json!({"type": "object", "properties": {"$data": "/x"}}))
        .expect_err("rejected for a non-$data keyword");
    assert!(matches!(err, EngineError::InvalidSchema { .. }));
}

#[test]
fn data_meta_schema_wraps_capable_keywords_without_mutating() {
    let engine = data_engine();
    let input = json!({
        "properties": {
            "maximum": {"type": "number"},
            "properties": {"type": "object"}
        }
    });
    let wrapped = engine
        .data_meta_schema(&input, &["#/properties"])
        .expect("wraps");

    // The input is untouched.
    assert_eq!(input["properties"]["maximum"], json!({"type": "number"}));
    // $data-capable keywords gain the two-alternative form.
    assert_eq!(
        wrapped["properties"]["maximum"],
        json!({"anyOf": [{"type": "number"}, {"$ref": meta::DATA_REF_ID}]})
    );
    // Applicators that do not accept $data keep their meta unchanged.
    assert_eq!(wrapped["properties"]["properties"], json!({"type": "object"}));
}

#[test]
fn custom_data_keywords_get_wrapped_meta_schemas() {
    let engine = data_engine();
    let def = jsv_engine::KeywordDefinition {
        types: vec![jsv_engine::JsonType::String],
        validate: Some(std::sync::Arc::new(|schema, data| {
            match (schema.as_str(), data.as_str()) {
                (Some(prefix), Some(s)) => s.starts_with(prefix),
                _ => true,
            }
        })),
        meta_schema: Some(json!({"type": "string"})),
        data: true,
        ..jsv_engine::KeywordDefinition::default()
    };
    engine.add_keyword("prefix", def).expect("registers");

    // A literal string and a $data object both satisfy the wrapped
    // meta-schema.
    let mut data = json!("img_001");
    assert!(engine
        .validate(&json!({"type": "string", "prefix": "img_"}), &mut data)
        .expect("sync validation"));

    let schema = json!({
        "type": "object",
        "properties": {
            "name": {"type": "string", "prefix": {"$data": "1/expected"}},
            "expected": {"type": "string"}
        }
    });
    let mut ok = json!({"name": "img_7", "expected": "img_"});
    assert!(engine.validate(&schema, &mut ok).expect("sync validation"));
    let mut bad = json!({"name": "doc_7", "expected": "img_"});
    assert!(!engine.validate(&schema, &mut bad).expect("sync validation"));
}
