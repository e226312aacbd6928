//! Schema compilation: traverses a schema with a keyword-dispatch loop
//! and composes an interpreter tree of [`KeywordValidator`] nodes.
//!
//! Keywords are evaluated in rule-group order behind type guards;
//! `$ref` targets are read lazily out of their [`SchemaEnv`] at call
//! time, which is what lets mutually referencing schemas compile.

use crate::context::{DataRef, ErrorInfo, KeywordValidator, RuntimeCtx, SchemaArg};
use crate::engine::ValidationEngine;
use crate::env::SchemaEnv;
use crate::options::{CoerceTypes, ValidatorOptions};
use crate::rules::{DataValidateFn, Rule};
use crate::runtime::ValidateFunction;
use crate::uri;
use jsv_core::error::{EngineError, Result};
use jsv_core::types::JsonType;
use serde_json::{json, Map, Value};
use std::cell::Cell;
use std::sync::atomic::Ordering;
use std::sync::Arc;

/// A compiled (sub)schema: its keyword nodes in evaluation order.
pub struct SchemaNode {
    units: Vec<KeywordUnit>,
}

pub(crate) struct KeywordUnit {
    keyword: String,
    node: Box<dyn KeywordValidator>,
}

fn run_units(units: &[KeywordUnit], data: &mut Value, ctx: &mut RuntimeCtx) -> bool {
    let mut valid = true;
    for unit in units {
        if !unit.node.validate(data, ctx) {
            valid = false;
            if !ctx.all_errors() {
                return false;
            }
        }
    }
    valid
}

impl SchemaNode {
    /// Run the compiled subschema against `data`, honoring the
    /// context's error-collection mode.
    pub fn validate(&self, data: &mut Value, ctx: &mut RuntimeCtx) -> bool {
        run_units(&self.units, data, ctx)
    }

    /// Comma-joined keyword outline, retained as the validator's
    /// `source` when requested.
    pub(crate) fn outline(&self) -> String {
        self.units
            .iter()
            .map(|u| u.keyword.as_str())
            .collect::<Vec<_>>()
            .join(",")
    }
}

/// Pass-through guard: a group's rules only run when the data is of
/// the group's type.
struct TypeGroupNode {
    jtype: JsonType,
    units: Vec<KeywordUnit>,
}

impl KeywordValidator for TypeGroupNode {
    fn validate(&self, data: &mut Value, ctx: &mut RuntimeCtx) -> bool {
        if !self.jtype.matches(data) {
            return true;
        }
        run_units(&self.units, data, ctx)
    }
}

/// The `false` schema: rejects everything.
struct FalseSchemaNode {
    info: ErrorInfo,
}

impl KeywordValidator for FalseSchemaNode {
    fn validate(&self, data: &mut Value, ctx: &mut RuntimeCtx) -> bool {
        self.info
            .emit(ctx, "boolean schema is false".to_string(), json!({}), data);
        false
    }
}

/// Lazy reference to another env's validator.
struct RefNode {
    env: Arc<SchemaEnv>,
    info: ErrorInfo,
}

impl KeywordValidator for RefNode {
    fn validate(&self, data: &mut Value, ctx: &mut RuntimeCtx) -> bool {
        match self.env.validator() {
            Some(vf) => vf.node().validate(data, ctx),
            None => {
                self.info.emit(
                    ctx,
                    "referenced schema is not compiled".to_string(),
                    json!({}),
                    data,
                );
                false
            }
        }
    }
}

/// Wrapper for keyword definitions that provide a direct validation
/// function instead of a compile callback.
struct DirectNode {
    validate: DataValidateFn,
    value: SchemaArg,
    info: ErrorInfo,
}

impl KeywordValidator for DirectNode {
    fn validate(&self, data: &mut Value, ctx: &mut RuntimeCtx) -> bool {
        let resolved;
        let schema_value = match &self.value {
            SchemaArg::Literal(v) => v,
            SchemaArg::Data(r) => match ctx.resolve_data_ref(r) {
                Some(v) => {
                    resolved = v;
                    &resolved
                }
                None => return true,
            },
        };
        if (self.validate)(schema_value, data) {
            true
        } else {
            self.info.emit(
                ctx,
                format!("should pass \"{}\" keyword validation", self.info.keyword),
                json!({ "keyword": self.info.keyword }),
                data,
            );
            false
        }
    }
}

/// The `type` keyword, including `nullable` folding and coercion.
struct TypeNode {
    types: Vec<JsonType>,
    coerce: CoerceTypes,
    info: ErrorInfo,
}

impl KeywordValidator for TypeNode {
    fn validate(&self, data: &mut Value, ctx: &mut RuntimeCtx) -> bool {
        if self.types.iter().any(|t| t.matches(data)) {
            return true;
        }
        if self.coerce != CoerceTypes::Off {
            if let Some(coerced) = coerce_value(data, &self.types, self.coerce) {
                *data = coerced;
                return true;
            }
        }
        let joined = self
            .types
            .iter()
            .map(|t| t.name())
            .collect::<Vec<_>>()
            .join(",");
        self.info.emit(
            ctx,
            format!("should be {joined}"),
            json!({ "type": joined }),
            data,
        );
        false
    }
}

/// Scalar coercion table. Returns the replacement value, or `None`
/// when the data cannot be coerced to any of the wanted types.
fn coerce_value(data: &Value, types: &[JsonType], mode: CoerceTypes) -> Option<Value> {
    for ty in types {
        match (ty, data) {
            (JsonType::String, Value::Number(n)) => return Some(Value::String(n.to_string())),
            (JsonType::String, Value::Bool(b)) => return Some(Value::String(b.to_string())),
            (JsonType::Number | JsonType::Integer, Value::String(s)) => {
                if let Ok(i) = s.parse::<i64>() {
                    return Some(json!(i));
                }
                if *ty == JsonType::Number {
                    if let Ok(f) = s.parse::<f64>() {
                        if f.is_finite() {
                            return Some(json!(f));
                        }
                    }
                }
            }
            (JsonType::Number | JsonType::Integer, Value::Bool(b)) => {
                return Some(json!(i64::from(*b)));
            }
            (JsonType::Number | JsonType::Integer, Value::Null) => return Some(json!(0)),
            (JsonType::Boolean, Value::String(s)) => match s.as_str() {
                "true" => return Some(Value::Bool(true)),
                "false" => return Some(Value::Bool(false)),
                _ => {}
            },
            (JsonType::Boolean, Value::Number(n)) => {
                if n.as_f64() == Some(0.0) {
                    return Some(Value::Bool(false));
                }
                if n.as_f64() == Some(1.0) {
                    return Some(Value::Bool(true));
                }
            }
            (JsonType::Boolean, Value::Null) => return Some(Value::Bool(false)),
            (JsonType::Null, Value::String(s)) if s.is_empty() => return Some(Value::Null),
            (JsonType::Null, Value::Number(n)) if n.as_f64() == Some(0.0) => {
                return Some(Value::Null);
            }
            (JsonType::Null, Value::Bool(false)) => return Some(Value::Null),
            _ => {}
        }
    }
    if mode == CoerceTypes::Array {
        // Unwrap a single-element array when a scalar is wanted, and
        // wrap a scalar when only an array would do.
        if let Value::Array(items) = data {
            if items.len() == 1 {
                let inner = &items[0];
                if types.iter().any(|t| t.matches(inner)) {
                    return Some(inner.clone());
                }
                if let Some(v) = coerce_value(inner, types, CoerceTypes::On) {
                    return Some(v);
                }
            }
        } else if types.contains(&JsonType::Array) {
            return Some(Value::Array(vec![data.clone()]));
        }
    }
    None
}

/// Compile-time location: schema path, current base URI and whether we
/// are inside a composite applicator (where defaults are not injected).
#[derive(Clone)]
pub(crate) struct NodeCtx {
    pub(crate) schema_path: String,
    pub(crate) base_id: String,
    pub(crate) in_composite: bool,
}

/// One compilation: a root env, an options snapshot and the asyncness
/// accumulated from referenced envs.
pub(crate) struct Compiler<'e> {
    engine: &'e ValidationEngine,
    env: Arc<SchemaEnv>,
    pub(crate) opts: ValidatorOptions,
    async_refs: Cell<bool>,
}

/// The context handed to keyword compile callbacks.
pub struct KeywordCtx<'c, 'e> {
    compiler: &'c Compiler<'e>,
    node_ctx: &'c NodeCtx,
    keyword: &'c str,
    raw: &'c Value,
    value: SchemaArg,
    parent: &'c Map<String, Value>,
}

impl<'c, 'e> KeywordCtx<'c, 'e> {
    /// The keyword being compiled.
    #[must_use]
    pub fn keyword(&self) -> &str {
        self.keyword
    }

    /// The keyword's value: a literal, or a `$data` runtime reference.
    #[must_use]
    pub fn value(&self) -> &SchemaArg {
        &self.value
    }

    /// The literal keyword value, if it is not a `$data` reference.
    #[must_use]
    pub fn literal(&self) -> Option<&Value> {
        match &self.value {
            SchemaArg::Literal(v) => Some(v),
            SchemaArg::Data(_) => None,
        }
    }

    /// The schema object containing the keyword.
    #[must_use]
    pub fn parent(&self) -> &Map<String, Value> {
        self.parent
    }

    /// JSON Pointer to the keyword within the root schema.
    #[must_use]
    pub fn schema_path(&self) -> String {
        format!("{}/{}", self.node_ctx.schema_path, uri::escape_token(self.keyword))
    }

    /// The effective options of this compilation.
    #[must_use]
    pub fn options(&self) -> &ValidatorOptions {
        &self.compiler.opts
    }

    /// Whether the keyword sits inside a composite applicator
    /// (`anyOf` / `oneOf` / `not` / `if` / `contains`), where defaults
    /// are not injected.
    #[must_use]
    pub fn in_composite(&self) -> bool {
        self.node_ctx.in_composite
    }

    /// Error metadata for nodes emitted by this keyword.
    #[must_use]
    pub fn error_info(&self) -> ErrorInfo {
        ErrorInfo {
            keyword: self.keyword.to_string(),
            schema_path: self.schema_path(),
            schema: self.raw.clone(),
            parent_schema: Value::Object(self.parent.clone()),
        }
    }

    /// Compile an embedded subschema; `path` extends the schema path
    /// (e.g. `&["properties", name]`).
    pub fn apply_subschema(&self, schema: &Value, path: &[&str]) -> Result<SchemaNode> {
        self.apply(schema, path, self.node_ctx.in_composite)
    }

    /// As [`KeywordCtx::apply_subschema`], but entering a composite
    /// context.
    pub fn apply_branch(&self, schema: &Value, path: &[&str]) -> Result<SchemaNode> {
        self.apply(schema, path, true)
    }

    fn apply(&self, schema: &Value, path: &[&str], in_composite: bool) -> Result<SchemaNode> {
        let mut schema_path = self.node_ctx.schema_path.clone();
        for token in path {
            schema_path.push('/');
            schema_path.push_str(&uri::escape_token(token));
        }
        let ctx = NodeCtx {
            schema_path,
            base_id: self.node_ctx.base_id.clone(),
            in_composite,
        };
        self.compiler.compile_node(schema, &ctx)
    }

    /// Resolve a `$ref` target, recording it on the compilation's env.
    pub fn resolve_ref(&self, reference: &str) -> Result<Arc<SchemaEnv>> {
        self.compiler.resolve_ref(reference, self.node_ctx)
    }

    /// Look up a registered format by name.
    #[must_use]
    pub fn lookup_format(&self, name: &str) -> Option<crate::formats::Format> {
        self.compiler.engine.formats.read().get(name).cloned()
    }

    /// Shared handle to the live format registry, for keywords that
    /// resolve format names at validation time.
    pub(crate) fn formats_handle(
        &self,
    ) -> Arc<parking_lot::RwLock<std::collections::HashMap<String, crate::formats::Format>>> {
        self.compiler.engine.formats.clone()
    }

    /// The engine's diagnostics logger.
    #[must_use]
    pub fn logger(&self) -> Arc<dyn jsv_core::traits::Logger> {
        self.compiler.engine.logger.clone()
    }

    /// An [`EngineError::InvalidSchema`] locating the keyword.
    #[must_use]
    pub fn invalid(&self, message: impl std::fmt::Display) -> EngineError {
        EngineError::invalid_schema(format!(
            "keyword \"{}\" at {}: {message}",
            self.keyword,
            self.node_ctx.schema_path
        ))
    }
}

impl<'e> Compiler<'e> {
    pub(crate) fn compile_node(&self, schema: &Value, nctx: &NodeCtx) -> Result<SchemaNode> {
        match schema {
            Value::Bool(true) => Ok(SchemaNode { units: Vec::new() }),
            Value::Bool(false) => {
                let info = ErrorInfo {
                    keyword: "false schema".to_string(),
                    schema_path: format!("{}/false schema", nctx.schema_path),
                    schema: Value::Bool(false),
                    parent_schema: Value::Bool(false),
                };
                Ok(SchemaNode {
                    units: vec![KeywordUnit {
                        keyword: "false schema".to_string(),
                        node: Box::new(FalseSchemaNode { info }),
                    }],
                })
            }
            Value::Object(map) => self.compile_object(map, nctx),
            _ => Err(EngineError::InvalidSchemaType),
        }
    }

    fn compile_object(&self, map: &Map<String, Value>, nctx: &NodeCtx) -> Result<SchemaNode> {
        let mut nctx = nctx.clone();
        if nctx.schema_path != "#" {
            if let Some(id) = map.get("$id") {
                let id = id
                    .as_str()
                    .ok_or_else(|| EngineError::invalid_schema("$id must be a string"))?;
                nctx.base_id = uri::resolve(&nctx.base_id, id)?;
            }
            if matches!(map.get("$async"), Some(Value::Bool(true))) {
                return Err(EngineError::invalid_schema(
                    "$async is only allowed at the schema root",
                ));
            }
        }

        if self.opts.strict {
            let rules = self.engine.rules.read();
            for key in map.keys() {
                if !rules.contains(key) {
                    return Err(EngineError::StrictMode {
                        message: format!("unknown keyword: \"{key}\""),
                    });
                }
            }
        }

        // Draft-07: a schema containing $ref is replaced by the
        // reference; sibling keywords are ignored.
        if let Some(reference) = map.get("$ref") {
            let reference = reference
                .as_str()
                .ok_or_else(|| EngineError::invalid_schema("$ref must be a string"))?;
            let unit = self.compile_ref_unit(reference, map, &nctx)?;
            return Ok(SchemaNode { units: vec![unit] });
        }

        let mut units = Vec::new();
        if let Some(type_value) = map.get("type") {
            units.push(self.compile_type_unit(type_value, map, &nctx)?);
        } else if let Some(nullable) = map.get("nullable") {
            if !nullable.is_boolean() {
                return Err(EngineError::invalid_schema("nullable must be a boolean"));
            }
        }

        let rules = self.engine.rules.read();
        for group in rules.groups() {
            let mut group_units = Vec::new();
            for rule in &group.rules {
                if !map.contains_key(&rule.keyword) {
                    continue;
                }
                if let Some(unit) = self.compile_keyword(rule, map, &nctx)? {
                    group_units.push(unit);
                }
            }
            match group.jtype {
                None => units.extend(group_units),
                Some(jtype) if !group_units.is_empty() => units.push(KeywordUnit {
                    keyword: format!("({})", jtype.name()),
                    node: Box::new(TypeGroupNode {
                        jtype,
                        units: group_units,
                    }),
                }),
                Some(_) => {}
            }
        }
        Ok(SchemaNode { units })
    }

    fn compile_keyword(
        &self,
        rule: &Rule,
        map: &Map<String, Value>,
        nctx: &NodeCtx,
    ) -> Result<Option<KeywordUnit>> {
        let def = &rule.definition;
        if def.compile.is_none() && def.validate.is_none() {
            return Ok(None);
        }
        let raw = &map[&rule.keyword];

        if let Some(schema_validator) = &rule.schema_validator {
            let mut doc = raw.clone();
            if !schema_validator.validate(&mut doc)? {
                let details = crate::report::errors_text(
                    schema_validator.errors().as_deref(),
                    &crate::report::ErrorsTextOptions::default(),
                );
                return Err(EngineError::invalid_schema(format!(
                    "keyword \"{}\" value is invalid: {details}",
                    rule.keyword
                )));
            }
        }

        let value = if is_data_object(raw) {
            if !def.data || !self.opts.data {
                return Err(EngineError::invalid_schema(format!(
                    "keyword \"{}\" at {} does not support $data references",
                    rule.keyword, nctx.schema_path
                )));
            }
            let pointer = raw["$data"]
                .as_str()
                .ok_or_else(|| EngineError::invalid_schema("$data must be a string pointer"))?;
            SchemaArg::Data(DataRef::parse(pointer)?)
        } else {
            SchemaArg::Literal(raw.clone())
        };

        if def.is_async && !self.env.is_async() {
            return Err(EngineError::invalid_schema(format!(
                "async keyword \"{}\" in a schema without $async",
                rule.keyword
            )));
        }

        if let Some(compile) = &def.compile {
            let mut kctx = KeywordCtx {
                compiler: self,
                node_ctx: nctx,
                keyword: &rule.keyword,
                raw,
                value,
                parent: map,
            };
            let node = compile(&mut kctx)?;
            Ok(Some(KeywordUnit {
                keyword: rule.keyword.clone(),
                node,
            }))
        } else if let Some(validate) = &def.validate {
            let info = ErrorInfo {
                keyword: rule.keyword.clone(),
                schema_path: format!("{}/{}", nctx.schema_path, uri::escape_token(&rule.keyword)),
                schema: raw.clone(),
                parent_schema: Value::Object(map.clone()),
            };
            Ok(Some(KeywordUnit {
                keyword: rule.keyword.clone(),
                node: Box::new(DirectNode {
                    validate: validate.clone(),
                    value,
                    info,
                }),
            }))
        } else {
            Ok(None)
        }
    }

    fn compile_ref_unit(
        &self,
        reference: &str,
        map: &Map<String, Value>,
        nctx: &NodeCtx,
    ) -> Result<KeywordUnit> {
        let target = self.resolve_ref(reference, nctx)?;
        let info = ErrorInfo {
            keyword: "$ref".to_string(),
            schema_path: format!("{}/$ref", nctx.schema_path),
            schema: Value::String(reference.to_string()),
            parent_schema: Value::Object(map.clone()),
        };
        Ok(KeywordUnit {
            keyword: "$ref".to_string(),
            node: Box::new(RefNode { env: target, info }),
        })
    }

    pub(crate) fn resolve_ref(&self, reference: &str, nctx: &NodeCtx) -> Result<Arc<SchemaEnv>> {
        let full = uri::resolve(&nctx.base_id, reference)?;
        let target = match self.env.cached_ref(&full) {
            Some(env) => env,
            None => self.engine.resolve_schema(&self.env, &full)?,
        };
        let in_progress =
            target.validator().is_some() || target.compiling.load(Ordering::Acquire);
        if !in_progress && !Arc::ptr_eq(&target, &self.env) {
            self.engine.compile_env(&target)?;
        }
        if target.is_async() {
            self.async_refs.set(true);
        }
        Ok(target)
    }

    fn compile_type_unit(
        &self,
        type_value: &Value,
        map: &Map<String, Value>,
        nctx: &NodeCtx,
    ) -> Result<KeywordUnit> {
        let mut types = parse_types(type_value)?;
        if self.opts.strict {
            if types.contains(&JsonType::Number) && types.contains(&JsonType::Integer) {
                return Err(EngineError::StrictMode {
                    message: "type \"integer\" is redundant when \"number\" is present".to_string(),
                });
            }
        }
        match map.get("nullable") {
            None => {}
            Some(Value::Bool(nullable)) => {
                if *nullable {
                    if !types.contains(&JsonType::Null) {
                        types.push(JsonType::Null);
                    }
                } else if types.contains(&JsonType::Null) {
                    return Err(EngineError::invalid_schema(
                        "type \"null\" contradicts nullable: false",
                    ));
                }
            }
            Some(_) => {
                return Err(EngineError::invalid_schema("nullable must be a boolean"));
            }
        }
        let info = ErrorInfo {
            keyword: "type".to_string(),
            schema_path: format!("{}/type", nctx.schema_path),
            schema: type_value.clone(),
            parent_schema: Value::Object(map.clone()),
        };
        Ok(KeywordUnit {
            keyword: "type".to_string(),
            node: Box::new(TypeNode {
                types,
                coerce: self.opts.coerce_types,
                info,
            }),
        })
    }
}

fn parse_types(type_value: &Value) -> Result<Vec<JsonType>> {
    let parse_one = |v: &Value| -> Result<JsonType> {
        let name = v
            .as_str()
            .ok_or_else(|| EngineError::invalid_schema("type must be a string or array of strings"))?;
        JsonType::from_name(name)
            .ok_or_else(|| EngineError::invalid_schema(format!("invalid type \"{name}\"")))
    };
    match type_value {
        Value::String(_) => Ok(vec![parse_one(type_value)?]),
        Value::Array(items) if !items.is_empty() => {
            let mut types = Vec::with_capacity(items.len());
            for item in items {
                let ty = parse_one(item)?;
                if !types.contains(&ty) {
                    types.push(ty);
                }
            }
            Ok(types)
        }
        _ => Err(EngineError::invalid_schema(
            "type must be a string or array of strings",
        )),
    }
}

fn is_data_object(value: &Value) -> bool {
    matches!(value, Value::Object(map) if map.len() == 1 && map.contains_key("$data"))
}

impl ValidationEngine {
    /// Compile `env`'s schema into a validator, memoizing it on the env.
    ///
    /// Meta-schema envs compile under the meta options profile, which
    /// has every data-mutating option stripped.
    pub(crate) fn compile_env(&self, env: &Arc<SchemaEnv>) -> Result<Arc<ValidateFunction>> {
        if let Some(vf) = env.validator() {
            return Ok(vf);
        }
        if env.compiling.swap(true, Ordering::AcqRel) {
            return Err(EngineError::invalid_schema(
                "schema is already being compiled",
            ));
        }
        struct CompilingGuard<'a>(&'a SchemaEnv);
        impl Drop for CompilingGuard<'_> {
            fn drop(&mut self) {
                self.0.compiling.store(false, Ordering::Release);
            }
        }
        let _guard = CompilingGuard(env);

        let opts = {
            let opts = self.opts.read();
            if env.is_meta() {
                opts.meta_opts()
            } else {
                opts.clone()
            }
        };

        if let Value::Object(map) = env.schema() {
            match map.get("$async") {
                None | Some(Value::Bool(_)) => {
                    if matches!(map.get("$async"), Some(Value::Bool(true))) {
                        env.async_flag.store(true, Ordering::Release);
                    }
                }
                Some(_) => {
                    return Err(EngineError::invalid_schema("$async must be a boolean"));
                }
            }
        }

        let compiler = Compiler {
            engine: self,
            env: env.clone(),
            opts,
            async_refs: Cell::new(false),
        };
        let nctx = NodeCtx {
            schema_path: "#".to_string(),
            base_id: env.base_id().to_string(),
            in_composite: false,
        };
        let node = compiler.compile_node(env.schema(), &nctx)?;
        let is_async = env.is_async() || compiler.async_refs.get();
        if is_async {
            env.async_flag.store(true, Ordering::Release);
        }
        let source = compiler.opts.code.source.then(|| node.outline());
        let vf = Arc::new(ValidateFunction::new(
            node,
            env.schema_arc(),
            Arc::downgrade(env),
            is_async,
            compiler.opts.all_errors,
            compiler.opts.verbose,
            compiler.opts.data,
            source,
        ));
        Ok(env.validate.get_or_init(|| vf).clone())
    }
}
