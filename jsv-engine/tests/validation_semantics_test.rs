//! Behavior of the built-in draft-07 keywords.

use jsv_engine::{EngineError, ValidationEngine, ValidatorOptions};
use serde_json::{json, Value};

fn engine() -> ValidationEngine {
    ValidationEngine::new().expect("engine builds")
}

fn check(engine: &ValidationEngine, schema: &Value, data: Value) -> bool {
    let mut data = data;
    engine.validate(schema, &mut data).expect("sync validation")
}

#[test]
fn type_distinguishes_integer_from_number() {
    let engine = engine();
    let integer = json!({"type": "integer"});
    assert!(check(&engine, &integer, json!(3)));
    assert!(check(&engine, &integer, json!(3.0)));
    assert!(!check(&engine, &integer, json!(3.5)));
    let number = json!({"type": "number"});
    assert!(check(&engine, &number, json!(3.5)));
    assert!(!check(&engine, &number, json!("3.5")));
}

#[test]
fn nullable_extends_the_type_set() {
    let engine = engine();
    let schema = json!({"type": "number", "nullable": true});
    assert!(check(&engine, &schema, json!(1)));
    assert!(check(&engine, &schema, json!(null)));
    assert!(!check(&engine, &schema, json!("1")));
}

#[test]
fn null_type_conflicts_with_nullable_false() {
    let engine = engine();
    let err = engine
        .compile(&json!({"type": ["number", "null"], "nullable": false}))
        .expect_err("compilation fails");
    assert!(matches!(err, EngineError::InvalidSchema { .. }));
}

#[test]
fn enum_uses_deep_structural_equality() {
    let engine = engine();
    let schema = json!({"enum": [{"a": 1}, {"b": 2}]});
    assert!(check(&engine, &schema, json!({"a": 1})));
    assert!(check(&engine, &schema, json!({"b": 2})));
    assert!(!check(&engine, &schema, json!({"a": 1, "b": 2})));
    assert!(!check(&engine, &schema, json!([{"a": 1}])));
}

#[test]
fn large_enums_use_the_hash_path() {
    let options = ValidatorOptions {
        loop_enum: 2,
        ..ValidatorOptions::new()
    };
    let engine = ValidationEngine::with_options(options).expect("engine builds");
    let schema = json!({"enum": [{"a": 1}, {"b": [1, 2]}, "x", 3]});
    assert!(check(&engine, &schema, json!({"b": [1, 2]})));
    assert!(check(&engine, &schema, json!(3)));
    assert!(!check(&engine, &schema, json!({"b": [2, 1]})));
}

#[test]
fn const_and_boolean_schemas() {
    let engine = engine();
    assert!(check(&engine, &json!({"const": {"k": 1}}), json!({"k": 1})));
    assert!(!check(&engine, &json!({"const": {"k": 1}}), json!({"k": 2})));
    assert!(check(&engine, &json!(true), json!("anything")));
    assert!(!check(&engine, &json!(false), json!("anything")));
}

#[test]
fn numeric_limits_and_multiple_of() {
    let engine = engine();
    let schema = json!({
        "type": "number",
        "minimum": 2,
        "exclusiveMaximum": 10,
        "multipleOf": 2
    });
    assert!(check(&engine, &schema, json!(2)));
    assert!(check(&engine, &schema, json!(8)));
    assert!(!check(&engine, &schema, json!(10)));
    assert!(!check(&engine, &schema, json!(7)));
    // Non-numbers pass through the number group untouched.
    assert!(check(&engine, &schema, json!("7")));
}

#[test]
fn string_length_counts_code_points() {
    let engine = engine();
    let schema = json!({"type": "string", "minLength": 2, "maxLength": 3});
    assert!(check(&engine, &schema, json!("ab")));
    assert!(check(&engine, &schema, json!("äöü")));
    assert!(!check(&engine, &schema, json!("a")));
    assert!(!check(&engine, &schema, json!("abcd")));
}

#[test]
fn pattern_matches_unanchored() {
    let engine = engine();
    let schema = json!({"type": "string", "pattern": "^[0-9]+$"});
    assert!(check(&engine, &schema, json!("123")));
    assert!(!check(&engine, &schema, json!("12a")));

    let err = engine
        .compile(&json!({"type": "string", "pattern": "("}))
        .expect_err("bad pattern fails to compile");
    assert!(matches!(err, EngineError::InvalidSchema { .. }));
}

#[test]
fn required_reports_each_missing_property() {
    let options = ValidatorOptions {
        all_errors: true,
        ..ValidatorOptions::new()
    };
    let engine = ValidationEngine::with_options(options).expect("engine builds");
    let schema = json!({"type": "object", "required": ["a", "b", "c"]});
    let mut data = json!({"b": 1});
    assert!(!engine.validate(&schema, &mut data).expect("sync validation"));
    let errors = engine.errors().expect("errors recorded");
    let missing: Vec<String> = errors
        .iter()
        .map(|e| e.params["missingProperty"].as_str().unwrap_or_default().to_string())
        .collect();
    assert_eq!(missing, ["a", "c"]);
    assert_eq!(errors[0].message, "should have required property 'a'");
}

#[test]
fn properties_track_the_data_path() {
    let engine = engine();
    let schema = json!({
        "type": "object",
        "properties": {
            "user": {
                "type": "object",
                "properties": {
                    "tags": {"type": "array", "items": {"type": "string"}}
                }
            }
        }
    });
    let mut data = json!({"user": {"tags": ["ok", 7]}});
    assert!(!engine.validate(&schema, &mut data).expect("sync validation"));
    let errors = engine.errors().expect("errors recorded");
    assert_eq!(errors[0].data_path, ".user.tags[1]");
    assert_eq!(errors[0].schema_path, "#/properties/user/properties/tags/items/type");
}

#[test]
fn additional_properties_false_rejects_extras() {
    let engine = engine();
    let schema = json!({
        "type": "object",
        "properties": {"a": {}},
        "patternProperties": {"^x-": {}},
        "additionalProperties": false
    });
    assert!(check(&engine, &schema, json!({"a": 1, "x-custom": 2})));
    let mut data = json!({"a": 1, "b": 2});
    assert!(!engine.validate(&schema, &mut data).expect("sync validation"));
    let errors = engine.errors().expect("errors recorded");
    assert_eq!(errors[0].keyword, "additionalProperties");
    assert_eq!(errors[0].params["additionalProperty"], json!("b"));
}

#[test]
fn property_names_validate_keys() {
    let engine = engine();
    let schema = json!({"type": "object", "propertyNames": {"pattern": "^[a-z]+$"}});
    assert!(check(&engine, &schema, json!({"abc": 1})));
    assert!(!check(&engine, &schema, json!({"Not Ok": 1})));
}

#[test]
fn dependencies_both_forms() {
    let engine = engine();
    let schema = json!({
        "type": "object",
        "dependencies": {
            "credit_card": ["billing_address"],
            "shipping": {"required": ["address"]}
        }
    });
    assert!(check(&engine, &schema, json!({"name": "x"})));
    assert!(!check(&engine, &schema, json!({"credit_card": "4111"})));
    assert!(check(
        &engine,
        &schema,
        json!({"credit_card": "4111", "billing_address": "..."})
    ));
    assert!(!check(&engine, &schema, json!({"shipping": true})));
    assert!(check(&engine, &schema, json!({"shipping": true, "address": "..."})));
}

#[test]
fn items_list_and_tuple_forms() {
    let engine = engine();
    let every = json!({"type": "array", "items": {"type": "number"}});
    assert!(check(&engine, &every, json!([1, 2, 3])));
    assert!(!check(&engine, &every, json!([1, "2"])));

    let tuple = json!({
        "type": "array",
        "items": [{"type": "number"}, {"type": "string"}],
        "additionalItems": false
    });
    assert!(check(&engine, &tuple, json!([1, "two"])));
    assert!(check(&engine, &tuple, json!([1])));
    assert!(!check(&engine, &tuple, json!([1, 2])));
    assert!(!check(&engine, &tuple, json!([1, "two", 3])));
}

#[test]
fn contains_and_unique_items() {
    let engine = engine();
    let schema = json!({"type": "array", "contains": {"type": "number"}, "uniqueItems": true});
    assert!(check(&engine, &schema, json!(["a", 1])));
    assert!(!check(&engine, &schema, json!(["a", "b"])));
    assert!(!check(&engine, &schema, json!([1, "a", 1])));
    assert!(!check(&engine, &schema, json!([])));

    let mut dup = json!([{"a": 1}, "x", {"a": 1}]);
    assert!(!engine.validate(&schema, &mut dup).expect("sync validation"));
    let errors = engine.errors().expect("errors recorded");
    assert_eq!(errors[0].keyword, "uniqueItems");
    assert_eq!(errors[0].params, json!({"i": 2, "j": 0}));
}

#[test]
fn boolean_combinators() {
    let engine = engine();
    let any_of = json!({"anyOf": [{"type": "number"}, {"type": "string", "maxLength": 2}]});
    assert!(check(&engine, &any_of, json!(5)));
    assert!(check(&engine, &any_of, json!("ab")));
    assert!(!check(&engine, &any_of, json!("abc")));

    let one_of = json!({"oneOf": [{"type": "integer"}, {"minimum": 2}]});
    assert!(check(&engine, &one_of, json!(1)));
    assert!(check(&engine, &one_of, json!(2.5)));
    assert!(!check(&engine, &one_of, json!(4)));

    let all_of = json!({"allOf": [{"type": "number"}, {"minimum": 2}]});
    assert!(check(&engine, &all_of, json!(3)));
    assert!(!check(&engine, &all_of, json!(1)));

    let not = json!({"not": {"type": "string"}});
    assert!(check(&engine, &not, json!(1)));
    assert!(!check(&engine, &not, json!("s")));
}

#[test]
fn failed_combinators_report_only_the_summary_error() {
    let engine = engine();

    let any_of = json!({"anyOf": [{"type": "string"}, {"type": "number"}]});
    let mut data = json!(true);
    assert!(!engine.validate(&any_of, &mut data).expect("sync validation"));
    let errors = engine.errors().expect("errors recorded");
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].keyword, "anyOf");

    let one_of = json!({"oneOf": [{"type": "string"}, {"type": "number"}]});
    let mut data = json!(true);
    assert!(!engine.validate(&one_of, &mut data).expect("sync validation"));
    let errors = engine.errors().expect("errors recorded");
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].keyword, "oneOf");
    assert_eq!(errors[0].params["passingSchemas"], json!(null));
}

#[test]
fn one_of_reports_passing_schemas() {
    let engine = engine();
    let schema = json!({"oneOf": [{"type": "integer"}, {"minimum": 2}]});
    let mut data = json!(4);
    assert!(!engine.validate(&schema, &mut data).expect("sync validation"));
    let errors = engine.errors().expect("errors recorded");
    assert_eq!(errors[0].keyword, "oneOf");
    assert_eq!(errors[0].params["passingSchemas"], json!([0, 1]));
}

#[test]
fn if_then_else_branches() {
    let engine = engine();
    let schema = json!({
        "if": {"properties": {"kind": {"const": "num"}}},
        "then": {"properties": {"value": {"type": "number"}}},
        "else": {"properties": {"value": {"type": "string"}}}
    });
    assert!(check(&engine, &schema, json!({"kind": "num", "value": 3})));
    assert!(!check(&engine, &schema, json!({"kind": "num", "value": "3"})));
    assert!(check(&engine, &schema, json!({"kind": "str", "value": "3"})));
    assert!(!check(&engine, &schema, json!({"kind": "str", "value": 3})));

    let mut data = json!({"kind": "num", "value": "3"});
    assert!(!engine.validate(&schema, &mut data).expect("sync validation"));
    let errors = engine.errors().expect("errors recorded");
    assert_eq!(errors.last().expect("if error").params["failingKeyword"], json!("then"));
}

#[test]
fn all_errors_collects_in_evaluation_order() {
    let options = ValidatorOptions {
        all_errors: true,
        ..ValidatorOptions::new()
    };
    let engine = ValidationEngine::with_options(options).expect("engine builds");
    let schema = json!({
        "type": "object",
        "required": ["a"],
        "properties": {"b": {"type": "number"}}
    });
    let mut data = json!({"b": "not a number"});
    assert!(!engine.validate(&schema, &mut data).expect("sync validation"));
    let keywords: Vec<String> = engine
        .errors()
        .expect("errors recorded")
        .iter()
        .map(|e| e.keyword.clone())
        .collect();
    // `required` runs ahead of `properties` in the object rule group.
    assert_eq!(keywords, ["required", "type"]);
}

#[test]
fn default_mode_stops_at_the_first_failure() {
    let engine = engine();
    let schema = json!({
        "type": "object",
        "required": ["a"],
        "properties": {"b": {"type": "number"}}
    });
    let mut data = json!({"b": "not a number"});
    assert!(!engine.validate(&schema, &mut data).expect("sync validation"));
    assert_eq!(engine.errors().expect("errors recorded").len(), 1);
}

#[test]
fn strict_mode_rejects_unknown_keywords_and_ambiguous_types() {
    let options = ValidatorOptions {
        strict: true,
        ..ValidatorOptions::new()
    };
    let engine = ValidationEngine::with_options(options).expect("engine builds");

    let err = engine
        .compile(&json!({"type": "number", "maximun": 3}))
        .expect_err("typo is caught");
    assert!(matches!(err, EngineError::StrictMode { .. }));

    let err = engine
        .compile(&json!({"type": ["number", "integer"]}))
        .expect_err("redundant union is caught");
    assert!(matches!(err, EngineError::StrictMode { .. }));
}

#[test]
fn unknown_keywords_are_ignored_without_strict() {
    let engine = engine();
    let schema = json!({"type": "number", "x-vendor-extension": {"anything": true}});
    assert!(check(&engine, &schema, json!(1)));
}
