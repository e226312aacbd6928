//! The user-facing keyword registry: custom keywords, ordering hints,
//! implied keywords and removal.

use jsv_engine::{
    EngineError, JsonType, KeywordDefinition, ValidationEngine, ValidatorOptions,
};
use serde_json::{json, Value};
use std::sync::Arc;

fn always_failing(types: Vec<JsonType>) -> KeywordDefinition {
    KeywordDefinition {
        types,
        validate: Some(Arc::new(|_schema: &Value, _data: &Value| false)),
        ..KeywordDefinition::default()
    }
}

#[test]
fn keyword_names_are_validated() {
    let engine = ValidationEngine::new().expect("engine builds");
    let err = engine
        .add_keyword("9starts-with-digit", KeywordDefinition::annotation())
        .expect_err("bad name");
    assert!(matches!(err, EngineError::InvalidKeywordName { .. }));

    let err = engine
        .add_keyword("type", KeywordDefinition::annotation())
        .expect_err("built-in collision");
    assert!(matches!(err, EngineError::DuplicateKeyword { .. }));
}

#[test]
fn data_keywords_must_be_able_to_validate() {
    let engine = ValidationEngine::new().expect("engine builds");
    let def = KeywordDefinition {
        data: true,
        ..KeywordDefinition::default()
    };
    let err = engine.add_keyword("needy", def).expect_err("rejected");
    assert!(matches!(err, EngineError::InvalidDataKeyword { .. }));
}

#[test]
fn validate_keywords_report_generic_errors() {
    let engine = ValidationEngine::new().expect("engine builds");
    let def = KeywordDefinition {
        types: vec![JsonType::Number],
        validate: Some(Arc::new(|schema: &Value, data: &Value| {
            if schema != &json!(true) {
                return true;
            }
            data.as_f64().is_some_and(|x| x % 2.0 == 0.0)
        })),
        ..KeywordDefinition::default()
    };
    engine.add_keyword("even", def).expect("registers");

    let schema = json!({"type": "number", "even": true});
    let mut ok = json!(4);
    assert!(engine.validate(&schema, &mut ok).expect("sync validation"));
    let mut odd = json!(3);
    assert!(!engine.validate(&schema, &mut odd).expect("sync validation"));
    let errors = engine.errors().expect("errors recorded");
    assert_eq!(errors[0].keyword, "even");
    assert_eq!(errors[0].message, "should pass \"even\" keyword validation");
}

#[test]
fn keyword_meta_schemas_check_keyword_values() {
    let engine = ValidationEngine::new().expect("engine builds");
    let def = KeywordDefinition {
        types: vec![JsonType::String],
        validate: Some(Arc::new(|schema: &Value, data: &Value| {
            let Some(prefix) = schema.as_str() else { return true };
            data.as_str().is_some_and(|s| s.starts_with(prefix))
        })),
        meta_schema: Some(json!({"type": "string"})),
        ..KeywordDefinition::default()
    };
    engine.add_keyword("prefix", def).expect("registers");

    let mut data = json!("img_001");
    assert!(engine
        .validate(&json!({"type": "string", "prefix": "img_"}), &mut data)
        .expect("sync validation"));

    let err = engine
        .compile(&json!({"type": "string", "prefix": 17}))
        .expect_err("keyword value fails its meta-schema");
    assert!(matches!(err, EngineError::InvalidSchema { .. }));
}

#[test]
fn compiled_keywords_can_apply_subschemas() {
    let engine = ValidationEngine::new().expect("engine builds");
    struct EveryValue {
        node: jsv_engine::SchemaNode,
    }
    impl jsv_engine::KeywordValidator for EveryValue {
        fn validate(&self, data: &mut Value, ctx: &mut jsv_engine::RuntimeCtx) -> bool {
            let keys: Vec<String> = match &*data {
                Value::Object(map) => map.keys().cloned().collect(),
                _ => return true,
            };
            let mut valid = true;
            for key in keys {
                let Value::Object(map) = data else { return valid };
                let Some(child) = map.get_mut(&key) else { continue };
                ctx.push_property(&key);
                let ok = self.node.validate(child, ctx);
                ctx.pop();
                if !ok {
                    valid = false;
                    if !ctx.all_errors() {
                        return false;
                    }
                }
            }
            valid
        }
    }

    fn compile_each_value(
        ctx: &mut jsv_engine::KeywordCtx<'_, '_>,
    ) -> jsv_engine::Result<Box<dyn jsv_engine::KeywordValidator>> {
        let sub = ctx
            .literal()
            .ok_or_else(|| ctx.invalid("value must be a schema"))?
            .clone();
        let keyword = ctx.keyword().to_string();
        let node = ctx.apply_subschema(&sub, &[&keyword])?;
        Ok(Box::new(EveryValue { node }))
    }

    // A keyword that validates every object value against a subschema.
    let def = KeywordDefinition::compiled(vec![JsonType::Object], compile_each_value);
    engine.add_keyword("eachValue", def).expect("registers");

    let schema = json!({"type": "object", "eachValue": {"type": "number"}});
    let mut ok = json!({"a": 1, "b": 2});
    assert!(engine.validate(&schema, &mut ok).expect("sync validation"));
    let mut bad = json!({"a": 1, "b": "2"});
    assert!(!engine.validate(&schema, &mut bad).expect("sync validation"));
    let errors = engine.errors().expect("errors recorded");
    assert_eq!(errors[0].data_path, ".b");
}

#[test]
fn before_hints_order_execution() {
    let options = ValidatorOptions {
        all_errors: true,
        ..ValidatorOptions::new()
    };
    let engine = ValidationEngine::with_options(options).expect("engine builds");
    engine
        .add_keyword("checkLate", always_failing(vec![]))
        .expect("registers");
    let early = KeywordDefinition {
        before: Some("checkLate".to_string()),
        ..always_failing(vec![])
    };
    engine.add_keyword("checkEarly", early).expect("registers");

    // Written in the opposite order in the schema; the rule order wins.
    let schema = json!({"checkLate": 1, "checkEarly": 1});
    let mut data = json!(0);
    assert!(!engine.validate(&schema, &mut data).expect("sync validation"));
    let keywords: Vec<String> = engine
        .errors()
        .expect("errors recorded")
        .iter()
        .map(|e| e.keyword.clone())
        .collect();
    assert_eq!(keywords, ["checkEarly", "checkLate"]);
}

#[test]
fn implemented_keywords_are_known_without_rules() {
    let options = ValidatorOptions {
        strict: true,
        ..ValidatorOptions::new()
    };
    let engine = ValidationEngine::with_options(options).expect("engine builds");
    // `then` and `else` exist only through `if`'s implements list.
    assert!(engine.get_keyword("then").is_none());
    engine
        .compile(&json!({"then": {"type": "number"}}))
        .expect("a lone then is known and inert under strict mode");
}

#[test]
fn removed_keywords_become_unknown() {
    let engine = ValidationEngine::new().expect("engine builds");
    engine
        .add_keyword("transient", always_failing(vec![]))
        .expect("registers");
    assert!(engine.get_keyword("transient").is_some());

    let schema = json!({"transient": 1});
    let mut data = json!(0);
    assert!(!engine.validate(&schema, &mut data).expect("fails while registered"));

    engine.remove_keyword("transient");
    assert!(engine.get_keyword("transient").is_none());
    // Freshly compiled schemas no longer run the keyword.
    let other = json!({"transient": 1, "title": "retry"});
    let mut data = json!(0);
    assert!(engine.validate(&other, &mut data).expect("ignored after removal"));
}

#[test]
fn vocabularies_install_as_a_unit() {
    let engine = ValidationEngine::new().expect("engine builds");
    engine
        .add_vocabulary(vec![
            ("vendorFlag", KeywordDefinition::annotation()),
            ("vendorCheck", always_failing(vec![JsonType::String])),
        ])
        .expect("installs");
    assert!(engine.get_keyword("vendorFlag").is_some());
    assert!(engine.get_keyword("vendorCheck").is_some());
}
