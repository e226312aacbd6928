//! Validation-time context: data-path tracking, error collection and
//! `$data` runtime references.

use crate::report::ErrorObject;
use jsv_core::error::{EngineError, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

/// One step into the data being validated.
#[derive(Debug, Clone)]
pub enum PathSegment {
    /// Descent into an object member.
    Property(String),
    /// Descent into an array element.
    Index(usize),
}

static IDENT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z_$][A-Za-z0-9_$]*$").expect("identifier pattern compiles"));

/// The current location in the data, rendered in property-access
/// syntax (`.user.tags[0]`, `['odd key']`).
#[derive(Debug, Default, Clone)]
pub struct InstancePath {
    segments: Vec<PathSegment>,
}

impl InstancePath {
    /// The path segments from the root down.
    #[must_use]
    pub fn segments(&self) -> &[PathSegment] {
        &self.segments
    }

    /// Render the path; the root renders as the empty string.
    #[must_use]
    pub fn render(&self) -> String {
        let mut out = String::new();
        for segment in &self.segments {
            match segment {
                PathSegment::Property(name) if IDENT.is_match(name) => {
                    out.push('.');
                    out.push_str(name);
                }
                PathSegment::Property(name) => {
                    out.push_str("['");
                    out.push_str(&name.replace('\\', "\\\\").replace('\'', "\\'"));
                    out.push_str("']");
                }
                PathSegment::Index(i) => {
                    out.push('[');
                    out.push_str(&i.to_string());
                    out.push(']');
                }
            }
        }
        out
    }
}

/// Mutable state threaded through a single validator invocation.
pub struct RuntimeCtx {
    path: InstancePath,
    /// Errors in production order.
    pub errors: Vec<ErrorObject>,
    all_errors: bool,
    verbose: bool,
    /// Snapshot of the data root, captured when `$data` is enabled.
    root: Option<Value>,
}

impl RuntimeCtx {
    pub(crate) fn new(all_errors: bool, verbose: bool, root: Option<Value>) -> Self {
        Self {
            path: InstancePath::default(),
            errors: Vec::new(),
            all_errors,
            verbose,
            root,
        }
    }

    /// Whether validation continues past the first failure.
    #[must_use]
    pub fn all_errors(&self) -> bool {
        self.all_errors
    }

    /// The current data location.
    #[must_use]
    pub fn path(&self) -> &InstancePath {
        &self.path
    }

    /// Descend into an object member.
    pub fn push_property(&mut self, name: &str) {
        self.path.segments.push(PathSegment::Property(name.to_string()));
    }

    /// Descend into an array element.
    pub fn push_index(&mut self, index: usize) {
        self.path.segments.push(PathSegment::Index(index));
    }

    /// Undo the last descent.
    pub fn pop(&mut self) {
        self.path.segments.pop();
    }

    /// Number of errors collected so far; pair with [`RuntimeCtx::truncate_errors`]
    /// to discard a speculative branch.
    #[must_use]
    pub fn mark(&self) -> usize {
        self.errors.len()
    }

    /// Discard errors produced after `mark`.
    pub fn truncate_errors(&mut self, mark: usize) {
        self.errors.truncate(mark);
    }

    /// Resolve a `$data` reference against the data root snapshot.
    ///
    /// Returns `None` when the pointer leads nowhere, which keywords
    /// treat as "no constraint".
    #[must_use]
    pub fn resolve_data_ref(&self, data_ref: &DataRef) -> Option<Value> {
        let root = self.root.as_ref()?;
        let prefix: Vec<&PathSegment> = match data_ref {
            DataRef::Absolute(_) => Vec::new(),
            DataRef::Relative { up, .. } => {
                let len = self.path.segments.len();
                if *up > len {
                    return None;
                }
                self.path.segments[..len - up].iter().collect()
            }
        };
        let mut current = root;
        for segment in prefix {
            current = match (segment, current) {
                (PathSegment::Property(name), Value::Object(map)) => map.get(name)?,
                (PathSegment::Index(i), Value::Array(items)) => items.get(*i)?,
                _ => return None,
            };
        }
        let tokens = match data_ref {
            DataRef::Absolute(tokens) | DataRef::Relative { tokens, .. } => tokens,
        };
        for token in tokens {
            current = match current {
                Value::Object(map) => map.get(token)?,
                Value::Array(items) => items.get(token.parse::<usize>().ok()?)?,
                _ => return None,
            };
        }
        Some(current.clone())
    }
}

/// A parsed `$data` pointer: absolute (`"/a/b"`) or relative (`"1/b"`).
#[derive(Debug, Clone)]
pub enum DataRef {
    /// JSON Pointer from the data root.
    Absolute(Vec<String>),
    /// Relative JSON Pointer from the current location.
    Relative {
        /// Levels to ascend before navigating.
        up: usize,
        /// Tokens to descend after ascending.
        tokens: Vec<String>,
    },
}

impl DataRef {
    /// Parse the pointer carried by a `{"$data": ...}` object.
    pub fn parse(pointer: &str) -> Result<Self> {
        fn tokens_of(pointer: &str) -> Vec<String> {
            if pointer.is_empty() {
                Vec::new()
            } else {
                pointer
                    .split('/')
                    .skip(1)
                    .map(crate::uri::unescape_token)
                    .collect()
            }
        }

        if pointer.is_empty() || pointer.starts_with('/') {
            return Ok(DataRef::Absolute(tokens_of(pointer)));
        }
        let digits: String = pointer.chars().take_while(char::is_ascii_digit).collect();
        let rest = &pointer[digits.len()..];
        if digits.is_empty() || !(rest.is_empty() || rest.starts_with('/')) {
            return Err(EngineError::invalid_schema(format!(
                "\"{pointer}\" is not a valid $data pointer"
            )));
        }
        let up = digits
            .parse::<usize>()
            .map_err(|_| EngineError::invalid_schema(format!("\"{pointer}\" is not a valid $data pointer")))?;
        Ok(DataRef::Relative {
            up,
            tokens: tokens_of(rest),
        })
    }
}

/// A value parameterizing a keyword: fixed in the schema, or read from
/// the validated data at runtime.
#[derive(Debug, Clone)]
pub enum SchemaArg {
    /// The literal schema value.
    Literal(Value),
    /// A `$data` runtime reference.
    Data(DataRef),
}

/// A compiled keyword: one node of the validator tree.
pub trait KeywordValidator: Send + Sync {
    /// Validate `data`, reporting failures into `ctx`.
    ///
    /// Mutation of `data` is reserved for the keywords behind
    /// `use_defaults`, `coerce_types` and `remove_additional`.
    fn validate(&self, data: &mut Value, ctx: &mut RuntimeCtx) -> bool;
}

/// Compile-time error metadata baked into every node, so runtime
/// reporting is a couple of clones.
#[derive(Clone)]
pub struct ErrorInfo {
    pub(crate) keyword: String,
    pub(crate) schema_path: String,
    pub(crate) schema: Value,
    pub(crate) parent_schema: Value,
}

impl ErrorInfo {
    /// Push an error for this keyword at the current data location.
    pub fn emit(&self, ctx: &mut RuntimeCtx, message: String, params: Value, data: &Value) {
        let verbose = ctx.verbose;
        ctx.errors.push(ErrorObject {
            keyword: self.keyword.clone(),
            data_path: ctx.path.render(),
            schema_path: self.schema_path.clone(),
            message,
            params,
            schema: verbose.then(|| self.schema.clone()),
            parent_schema: verbose.then(|| self.parent_schema.clone()),
            data: verbose.then(|| data.clone()),
        });
    }
}
