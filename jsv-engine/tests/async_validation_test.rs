//! `$async` schemas: propagation, the sync/async call contract, and
//! rejection payloads.

use jsv_engine::{EngineError, ValidationEngine};
use serde_json::json;

#[test]
fn async_flag_marks_the_validator() {
    let engine = ValidationEngine::new().expect("engine builds");
    let validate = engine
        .compile(&json!({"$async": true, "type": "number"}))
        .expect("compiles");
    assert!(validate.is_async());

    let sync = engine.compile(&json!({"type": "number"})).expect("compiles");
    assert!(!sync.is_async());
}

#[test]
fn sync_calls_on_async_schemas_are_rejected() {
    let engine = ValidationEngine::new().expect("engine builds");
    let validate = engine
        .compile(&json!({"$async": true, "type": "number"}))
        .expect("compiles");
    let mut data = json!(1);
    assert!(matches!(
        validate.validate(&mut data),
        Err(EngineError::AsyncSchema)
    ));
}

#[tokio::test]
async fn async_validators_resolve_or_reject_with_errors() {
    let engine = ValidationEngine::new().expect("engine builds");
    let validate = engine
        .compile(&json!({"$async": true, "type": "number"}))
        .expect("compiles");

    let mut good = json!(1);
    validate.validate_async(&mut good).await.expect("resolves");

    let mut bad = json!("one");
    let rejection = validate
        .validate_async(&mut bad)
        .await
        .expect_err("rejects");
    assert_eq!(rejection.errors.len(), 1);
    assert_eq!(rejection.errors[0].keyword, "type");
}

#[test]
fn asyncness_propagates_through_refs() {
    let engine = ValidationEngine::new().expect("engine builds");
    engine
        .add_schema(json!({"$id": "async-leaf", "$async": true, "type": "string"}), None)
        .expect("adds");

    let via_ref = engine
        .compile(&json!({
            "type": "object",
            "properties": {"v": {"$ref": "async-leaf"}}
        }))
        .expect("compiles");
    assert!(via_ref.is_async());

    let untouched = engine
        .compile(&json!({"type": "object", "properties": {"v": {"type": "string"}}}))
        .expect("compiles");
    assert!(!untouched.is_async());
}

#[test]
fn async_is_only_allowed_at_the_root() {
    let engine = ValidationEngine::new().expect("engine builds");
    let err = engine
        .compile(&json!({
            "type": "object",
            "properties": {"v": {"$async": true, "type": "number"}}
        }))
        .expect_err("nested $async is rejected");
    assert!(matches!(err, EngineError::InvalidSchema { .. }));
}
