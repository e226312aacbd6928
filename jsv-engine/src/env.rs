//! Schema environments: one registered schema plus its resolution
//! metadata and, once compiled, its validator.

use crate::runtime::ValidateFunction;
use crate::uri;
use jsv_core::error::{EngineError, Result};
use once_cell::sync::OnceCell;
use parking_lot::RwLock;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Metadata about a single registered schema.
///
/// The compiled validator is set exactly once; reference targets
/// resolved during compilation are memoized in `refs` so cyclic
/// schemas read each other's validators lazily through their envs.
pub struct SchemaEnv {
    /// The schema document this env belongs to.
    document: Arc<Value>,
    /// The env's own (sub)schema, when it is not the whole document.
    node: Option<Value>,
    /// Canonical absolute URI, from `$id` or the registration key.
    base_id: String,
    /// Cache key under which this env is stored; empty for subschema envs.
    pub(crate) cache_key: String,
    /// Nested `$id` occurrences: absolute URI to JSON Pointer into the
    /// document.
    pub(crate) local_refs: Arc<HashMap<String, String>>,
    /// Whether this is a meta-schema.
    meta: bool,
    pub(crate) validate: OnceCell<Arc<ValidateFunction>>,
    /// True iff `$async` is set at this env's root or on any env it
    /// references transitively.
    pub(crate) async_flag: AtomicBool,
    /// Fully-qualified refs resolved during compilation.
    pub(crate) refs: RwLock<HashMap<String, Arc<SchemaEnv>>>,
    pub(crate) compiling: AtomicBool,
}

impl SchemaEnv {
    pub(crate) fn root(
        schema: Value,
        base_id: String,
        cache_key: String,
        local_refs: HashMap<String, String>,
        meta: bool,
    ) -> Arc<Self> {
        Arc::new(Self {
            document: Arc::new(schema),
            node: None,
            base_id,
            cache_key,
            local_refs: Arc::new(local_refs),
            meta,
            validate: OnceCell::new(),
            async_flag: AtomicBool::new(false),
            refs: RwLock::new(HashMap::new()),
            compiling: AtomicBool::new(false),
        })
    }

    /// An env for the subschema of `parent` at `pointer`, addressed by
    /// `base_id`.
    pub(crate) fn child(parent: &Arc<SchemaEnv>, pointer: &str, base_id: String) -> Result<Arc<Self>> {
        let node = uri::walk_pointer(&parent.document, pointer).ok_or_else(|| {
            EngineError::invalid_schema(format!(
                "reference \"{base_id}\" points outside its schema (pointer \"{pointer}\")"
            ))
        })?;
        if !matches!(node, Value::Object(_) | Value::Bool(_)) {
            return Err(EngineError::InvalidSchemaType);
        }
        Ok(Arc::new(Self {
            document: parent.document.clone(),
            node: Some(node.clone()),
            base_id,
            cache_key: String::new(),
            local_refs: parent.local_refs.clone(),
            meta: parent.meta,
            validate: OnceCell::new(),
            async_flag: AtomicBool::new(false),
            refs: RwLock::new(HashMap::new()),
            compiling: AtomicBool::new(false),
        }))
    }

    /// An env for an already-located subschema node of `parent`.
    pub(crate) fn from_node(parent: &Arc<SchemaEnv>, node: Value, base_id: String) -> Arc<Self> {
        Arc::new(Self {
            document: parent.document.clone(),
            node: Some(node),
            base_id,
            cache_key: String::new(),
            local_refs: parent.local_refs.clone(),
            meta: parent.meta,
            validate: OnceCell::new(),
            async_flag: AtomicBool::new(false),
            refs: RwLock::new(HashMap::new()),
            compiling: AtomicBool::new(false),
        })
    }

    /// The env's own schema.
    #[must_use]
    pub fn schema(&self) -> &Value {
        self.node.as_ref().unwrap_or(&*self.document)
    }

    /// The document the env's schema lives in.
    #[must_use]
    pub fn document(&self) -> &Arc<Value> {
        &self.document
    }

    /// A shared handle to the env's own schema.
    pub(crate) fn schema_arc(&self) -> Arc<Value> {
        match &self.node {
            Some(node) => Arc::new(node.clone()),
            None => self.document.clone(),
        }
    }

    /// Canonical absolute URI of this env.
    #[must_use]
    pub fn base_id(&self) -> &str {
        &self.base_id
    }

    /// Whether this env is a meta-schema.
    #[must_use]
    pub fn is_meta(&self) -> bool {
        self.meta
    }

    /// The compiled validator, if compilation has happened.
    #[must_use]
    pub fn validator(&self) -> Option<Arc<ValidateFunction>> {
        self.validate.get().cloned()
    }

    /// Whether this env (or anything it references) is asynchronous.
    #[must_use]
    pub fn is_async(&self) -> bool {
        self.async_flag.load(Ordering::Relaxed)
    }

    pub(crate) fn cached_ref(&self, full_ref: &str) -> Option<Arc<SchemaEnv>> {
        self.refs.read().get(full_ref).cloned()
    }

    pub(crate) fn record_ref(&self, full_ref: String, env: Arc<SchemaEnv>) {
        self.refs.write().insert(full_ref, env);
    }
}

/// Walk a schema document collecting nested `$id` declarations.
///
/// Returns absolute id to JSON Pointer. The root's own `$id` is the
/// env's `base_id` and is not included. Values under `enum`, `const`,
/// `default` and `examples` are data, not schemas, and are skipped.
pub(crate) fn collect_local_refs(
    schema: &Value,
    base_id: &str,
) -> Result<HashMap<String, String>> {
    const DATA_KEYWORDS: [&str; 4] = ["enum", "const", "default", "examples"];

    fn walk(
        value: &Value,
        base: &str,
        pointer: &mut String,
        out: &mut HashMap<String, String>,
    ) -> Result<()> {
        match value {
            Value::Object(map) => {
                let mut base = base.to_string();
                if !pointer.is_empty() {
                    if let Some(id) = map.get("$id") {
                        let id = id.as_str().ok_or_else(|| {
                            EngineError::invalid_schema("$id must be a string")
                        })?;
                        let resolved = uri::resolve(&base, id)?;
                        if out.insert(resolved.clone(), pointer.clone()).is_some() {
                            return Err(EngineError::DuplicateId {
                                id: uri::display_uri(&resolved),
                            });
                        }
                        base = resolved;
                    }
                }
                for (key, child) in map {
                    if DATA_KEYWORDS.contains(&key.as_str()) {
                        continue;
                    }
                    let len = pointer.len();
                    pointer.push('/');
                    pointer.push_str(&uri::escape_token(key));
                    walk(child, &base, pointer, out)?;
                    pointer.truncate(len);
                }
                Ok(())
            }
            Value::Array(items) => {
                for (i, child) in items.iter().enumerate() {
                    let len = pointer.len();
                    pointer.push('/');
                    pointer.push_str(&i.to_string());
                    walk(child, base, pointer, out)?;
                    pointer.truncate(len);
                }
                Ok(())
            }
            _ => Ok(()),
        }
    }

    let mut out = HashMap::new();
    let mut pointer = String::new();
    walk(schema, base_id, &mut pointer, &mut out)?;
    Ok(out)
}
