//! Content-addressed schema cache.
//!
//! Cache keys are blake3 digests of a canonical serialization that
//! sorts object keys recursively, so semantically identical schemas
//! share one compiled environment regardless of member order.

use crate::env::SchemaEnv;
use crate::options::SerializeMode;
use parking_lot::RwLock;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

/// Serialize `value` with all object keys recursively sorted.
pub(crate) fn canonical_serialize(value: &Value) -> String {
    let mut out = String::new();
    write_canonical(value, &mut out);
    out
}

fn write_canonical(value: &Value, out: &mut String) {
    match value {
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_canonical(item, out);
            }
            out.push(']');
        }
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort_unstable();
            out.push('{');
            for (i, key) in keys.into_iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                out.push_str(&Value::String(key.clone()).to_string());
                out.push(':');
                write_canonical(&map[key], out);
            }
            out.push('}');
        }
        leaf => out.push_str(&leaf.to_string()),
    }
}

/// Compute the cache key for a schema under the configured serialization.
pub(crate) fn cache_key(schema: &Value, mode: &SerializeMode) -> String {
    match mode {
        SerializeMode::Canonical => blake3::hash(canonical_serialize(schema).as_bytes())
            .to_hex()
            .to_string(),
        SerializeMode::Raw => schema.to_string(),
        SerializeMode::Custom(serialize) => serialize(schema),
    }
}

/// `serialized schema -> compiled environment` store.
#[derive(Default)]
pub(crate) struct SchemaCache {
    map: RwLock<HashMap<String, Arc<SchemaEnv>>>,
}

impl SchemaCache {
    pub(crate) fn get(&self, key: &str) -> Option<Arc<SchemaEnv>> {
        self.map.read().get(key).cloned()
    }

    pub(crate) fn insert(&self, key: String, env: Arc<SchemaEnv>) {
        self.map.write().insert(key, env);
    }

    pub(crate) fn remove(&self, key: &str) {
        self.map.write().remove(key);
    }

    pub(crate) fn clear(&self) {
        self.map.write().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::SerializeMode;
    use serde_json::json;

    #[test]
    fn canonical_form_is_key_order_independent() {
        let a = json!({"b": 1, "a": {"y": [1, 2], "x": null}});
        let b = json!({"a": {"x": null, "y": [1, 2]}, "b": 1});
        assert_eq!(canonical_serialize(&a), canonical_serialize(&b));
        assert_eq!(
            cache_key(&a, &SerializeMode::Canonical),
            cache_key(&b, &SerializeMode::Canonical)
        );
    }

    #[test]
    fn arrays_keep_their_order() {
        assert_ne!(
            canonical_serialize(&json!([1, 2])),
            canonical_serialize(&json!([2, 1]))
        );
    }

    #[test]
    fn raw_mode_is_identity() {
        let schema = json!({"type": "string"});
        assert_eq!(cache_key(&schema, &SerializeMode::Raw), schema.to_string());
    }
}
