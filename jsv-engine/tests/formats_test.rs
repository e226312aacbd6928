//! The `format` keyword and format registry.

use jsv_engine::{EngineError, Format, ValidationEngine, ValidatorOptions};
use serde_json::json;

#[test]
fn builtin_formats_validate_strings_only() {
    let engine = ValidationEngine::new().expect("engine builds");
    let schema = json!({"format": "date"});
    let mut ok = json!("2024-06-01");
    assert!(engine.validate(&schema, &mut ok).expect("sync validation"));
    let mut bad = json!("2024-13-01");
    assert!(!engine.validate(&schema, &mut bad).expect("sync validation"));
    // Non-strings pass through the string group.
    let mut number = json!(20240601);
    assert!(engine.validate(&schema, &mut number).expect("sync validation"));
}

#[test]
fn format_errors_name_the_format() {
    let engine = ValidationEngine::new().expect("engine builds");
    let schema = json!({"type": "string", "format": "ipv4"});
    let mut data = json!("256.1.1.1");
    assert!(!engine.validate(&schema, &mut data).expect("sync validation"));
    let errors = engine.errors().expect("errors recorded");
    assert_eq!(errors[0].keyword, "format");
    assert_eq!(errors[0].message, "should match format \"ipv4\"");
    assert_eq!(errors[0].params, json!({"format": "ipv4"}));
}

#[test]
fn unknown_formats_are_ignored_unless_strict() {
    let engine = ValidationEngine::new().expect("engine builds");
    let schema = json!({"type": "string", "format": "klingon-stardate"});
    let mut data = json!("anything");
    assert!(engine.validate(&schema, &mut data).expect("sync validation"));

    let strict = ValidationEngine::with_options(ValidatorOptions {
        strict: true,
        ..ValidatorOptions::new()
    })
    .expect("engine builds");
    let err = strict.compile(&schema).expect_err("strict rejects");
    assert!(matches!(err, EngineError::StrictMode { .. }));
}

#[test]
fn custom_formats_register_as_predicates_or_patterns() {
    let engine = ValidationEngine::new().expect("engine builds");
    engine.add_format(
        "even-length",
        Format::predicate(|s| s.len() % 2 == 0),
    );
    engine
        .add_format_pattern("ticket", "^[A-Z]{2,5}-[0-9]+$")
        .expect("pattern compiles");

    let mut ok = json!("ab");
    assert!(engine
        .validate(&json!({"format": "even-length"}), &mut ok)
        .expect("sync validation"));
    let mut odd = json!("abc");
    assert!(!engine
        .validate(&json!({"format": "even-length"}), &mut odd)
        .expect("sync validation"));

    let mut ticket = json!("JSV-123");
    assert!(engine
        .validate(&json!({"format": "ticket"}), &mut ticket)
        .expect("sync validation"));

    let err = engine
        .add_format_pattern("broken", "(")
        .expect_err("bad pattern");
    assert!(matches!(err, EngineError::InvalidSchema { .. }));
}

#[test]
fn format_option_off_disables_checking() {
    let engine = ValidationEngine::with_options(ValidatorOptions {
        format: false,
        ..ValidatorOptions::new()
    })
    .expect("engine builds");
    let schema = json!({"type": "string", "format": "ipv4"});
    let mut data = json!("definitely not an ip");
    assert!(engine.validate(&schema, &mut data).expect("sync validation"));
}
