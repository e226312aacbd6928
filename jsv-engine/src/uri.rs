//! URI and JSON Pointer utilities.
//!
//! Schema ids and references are canonicalized to absolute URIs. Ids
//! without a scheme ("a", "folder/b") are resolved against a private
//! root scope so that relative ids round-trip through registration and
//! lookup; user-facing strings get the scope stripped again by
//! [`display_uri`].

use jsv_core::error::{EngineError, Result};
use once_cell::sync::Lazy;
use serde_json::Value;
use url::Url;

/// Base scope for ids that are not absolute URIs.
pub(crate) const DEFAULT_ROOT: &str = "json-schema:///";

static DEFAULT_SCOPE: Lazy<Url> =
    Lazy::new(|| Url::parse(DEFAULT_ROOT).expect("default scope is a valid URL"));

fn invalid_ref(reference: &str, err: url::ParseError) -> EngineError {
    EngineError::InvalidRef {
        reference: reference.to_string(),
        message: err.to_string(),
    }
}

/// Strip an empty trailing fragment so `".../schema#"` and
/// `".../schema"` canonicalize identically.
fn strip_empty_fragment(mut url: Url) -> Url {
    if url.fragment() == Some("") {
        url.set_fragment(None);
    }
    url
}

/// Canonicalize a schema id or key into an absolute URI string.
pub(crate) fn normalize_id(id: &str) -> Result<String> {
    resolve(DEFAULT_ROOT, id)
}

/// Resolve `reference` against `base` (itself a canonical URI, or empty
/// for the default scope) and canonicalize the result.
pub(crate) fn resolve(base: &str, reference: &str) -> Result<String> {
    let base_url = if base.is_empty() {
        DEFAULT_SCOPE.clone()
    } else {
        Url::parse(base).map_err(|e| invalid_ref(base, e))?
    };
    let joined = base_url
        .join(reference)
        .map_err(|e| invalid_ref(reference, e))?;
    Ok(strip_empty_fragment(joined).to_string())
}

/// Split a canonical reference into its URI part and optional fragment.
pub(crate) fn split_fragment(reference: &str) -> (&str, Option<&str>) {
    match reference.split_once('#') {
        Some((uri, frag)) => (uri, Some(frag)),
        None => (reference, None),
    }
}

/// Render a canonical URI for users and loaders: ids that were resolved
/// against the private root scope come back out in their original
/// relative form.
#[must_use]
pub(crate) fn display_uri(uri: &str) -> String {
    match uri.strip_prefix(DEFAULT_ROOT) {
        Some(rest) if !rest.is_empty() => rest.to_string(),
        _ => uri.to_string(),
    }
}

/// Escape a property name for use as a JSON Pointer token.
#[must_use]
pub(crate) fn escape_token(token: &str) -> String {
    token.replace('~', "~0").replace('/', "~1")
}

/// Unescape a JSON Pointer token.
#[must_use]
pub(crate) fn unescape_token(token: &str) -> String {
    token.replace("~1", "/").replace("~0", "~")
}

/// As [`walk_pointer`], but yielding a mutable reference.
pub(crate) fn walk_pointer_mut<'v>(doc: &'v mut Value, pointer: &str) -> Option<&'v mut Value> {
    if pointer.is_empty() {
        return Some(doc);
    }
    let mut current = doc;
    for token in pointer.split('/').skip(1) {
        let token = unescape_token(token);
        current = match current {
            Value::Object(map) => map.get_mut(&token)?,
            Value::Array(items) => items.get_mut(token.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    Some(current)
}

/// Navigate `doc` by a JSON Pointer (`""` or `"/a/0/b"`).
pub(crate) fn walk_pointer<'v>(doc: &'v Value, pointer: &str) -> Option<&'v Value> {
    if pointer.is_empty() {
        return Some(doc);
    }
    let mut current = doc;
    for token in pointer.split('/').skip(1) {
        let token = unescape_token(token);
        current = match current {
            Value::Object(map) => map.get(&token)?,
            Value::Array(items) => items.get(token.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    Some(current)
}
