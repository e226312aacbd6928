//! Reference resolution over registered schema environments.

use crate::engine::ValidationEngine;
use crate::env::SchemaEnv;
use crate::uri;
use jsv_core::error::{EngineError, Result};
use serde_json::Value;
use std::sync::Arc;

/// An entry in the engine's ref table: a resolved environment, or an
/// indirection to another key.
///
/// Aliases arise when a schema is registered under a caller key while
/// also declaring an `$id`; chains must be finite (a cycle is a
/// registration bug and is not guarded here).
pub(crate) enum RefEntry {
    Direct(Arc<SchemaEnv>),
    Alias(String),
}

impl ValidationEngine {
    /// Look up a canonical URI in the schema and ref tables, following
    /// alias indirections.
    pub(crate) fn registered_env(&self, key: &str) -> Option<Arc<SchemaEnv>> {
        let mut key = key.to_string();
        loop {
            if let Some(env) = self.schemas.read().get(&key) {
                return Some(env.clone());
            }
            match self.refs.read().get(&key) {
                Some(RefEntry::Direct(env)) => return Some(env.clone()),
                Some(RefEntry::Alias(next)) => key = next.clone(),
                None => return None,
            }
        }
    }

    /// Whether a canonical URI is registered in either table.
    pub(crate) fn is_registered(&self, key: &str) -> bool {
        self.schemas.read().contains_key(key) || self.refs.read().contains_key(key)
    }

    /// Resolve `reference` (already resolved against its base) starting
    /// from `root`, yielding the environment of the pointed-at
    /// (sub)schema.
    ///
    /// # Errors
    ///
    /// Fails with [`EngineError::MissingRef`] when the URI part matches
    /// no registered schema and none of `root`'s local ids.
    pub(crate) fn resolve_schema(
        &self,
        root: &Arc<SchemaEnv>,
        reference: &str,
    ) -> Result<Arc<SchemaEnv>> {
        if let Some(env) = root.cached_ref(reference) {
            return Ok(env);
        }

        let (schema_uri, fragment) = uri::split_fragment(reference);
        let base_env = self.locate_base_env(root, schema_uri)?;
        let env = match fragment {
            None | Some("") => base_env,
            Some(frag) if frag.starts_with('/') => {
                // JSON Pointer fragment, relative to the env's schema.
                let target = uri::walk_pointer(base_env.schema(), frag)
                    .ok_or_else(|| missing_ref(reference, schema_uri))?;
                if !matches!(target, Value::Object(_) | Value::Bool(_)) {
                    return Err(EngineError::InvalidSchemaType);
                }
                SchemaEnv::from_node(&base_env, target.clone(), reference.to_string())
            }
            Some(frag) => {
                // Plain-name fragment: a nested `$id` of the form "#name".
                let anchored = format!("{schema_uri}#{frag}");
                let pointer = base_env
                    .local_refs
                    .get(&anchored)
                    .cloned()
                    .ok_or_else(|| missing_ref(reference, schema_uri))?;
                SchemaEnv::child(&base_env, &pointer, anchored)?
            }
        };
        root.record_ref(reference.to_string(), env.clone());
        Ok(env)
    }

    fn locate_base_env(&self, root: &Arc<SchemaEnv>, schema_uri: &str) -> Result<Arc<SchemaEnv>> {
        // Anonymous roots have an empty base; refs against them resolve
        // into the default scope.
        let is_root = schema_uri == root.base_id()
            || schema_uri.is_empty()
            || (root.base_id().is_empty() && schema_uri == uri::DEFAULT_ROOT);
        if is_root {
            return Ok(root.clone());
        }
        if let Some(env) = self.registered_env(schema_uri) {
            return Ok(env);
        }
        if let Some(pointer) = root.local_refs.get(schema_uri) {
            return SchemaEnv::child(root, pointer, schema_uri.to_string());
        }
        Err(missing_ref(schema_uri, schema_uri))
    }
}

fn missing_ref(reference: &str, schema_uri: &str) -> EngineError {
    EngineError::MissingRef {
        missing_ref: uri::display_uri(reference),
        missing_schema: uri::display_uri(schema_uri),
    }
}
