//! The engine facade: schema lifecycle, keyword and format management,
//! compilation entry points and the asynchronous compile loop.

use crate::cache::{self, SchemaCache};
use crate::env::{self, SchemaEnv};
use crate::formats::{builtin_formats, Format};
use crate::meta;
use crate::options::{LoggerMode, MetaMode, ValidateSchemaMode, ValidatorOptions};
use crate::report::{self, ErrorObject, ErrorsTextOptions};
use crate::resolver::RefEntry;
use crate::rules::{KeywordDefinition, RuleRegistry};
use crate::runtime::ValidateFunction;
use crate::uri;
use futures::future::{BoxFuture, Shared};
use futures::FutureExt;
use jsv_core::error::{EngineError, Result};
use jsv_core::traits::{Logger, NullLogger, TracingLogger};
use parking_lot::{Mutex, RwLock};
use regex::Regex;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;

type SharedLoad = Shared<BoxFuture<'static, std::result::Result<Value, Arc<EngineError>>>>;

/// A schema to validate against: a registered key, or an inline
/// schema document.
pub enum SchemaInput<'a> {
    /// A key or `$id` previously registered with `add_schema`.
    Key(&'a str),
    /// An inline schema, compiled (and cached) on the fly.
    Schema(&'a Value),
}

impl<'a> From<&'a str> for SchemaInput<'a> {
    fn from(key: &'a str) -> Self {
        SchemaInput::Key(key)
    }
}

impl<'a> From<&'a Value> for SchemaInput<'a> {
    fn from(schema: &'a Value) -> Self {
        SchemaInput::Schema(schema)
    }
}

/// Selects what `remove_schema` removes.
pub enum RemoveTarget<'a> {
    /// Every non-meta schema, and the whole cache.
    All,
    /// Schemas whose key or id matches the pattern (meta-schemas are
    /// preserved).
    Pattern(&'a Regex),
    /// One schema by key or id.
    Key(&'a str),
    /// A schema document: drops its cache line and, when it carries an
    /// `$id`, its registrations.
    Schema(&'a Value),
}

/// The validator engine.
///
/// Owns the schema, ref and format tables, the rule registry and the
/// schema cache; validators it produces are shared and immutable.
/// Execution is single-threaded cooperative: the locks below exist so
/// the engine can be held behind an `Arc` across await points, not for
/// parallel mutation.
pub struct ValidationEngine {
    pub(crate) opts: RwLock<ValidatorOptions>,
    pub(crate) logger: Arc<dyn Logger>,
    pub(crate) rules: RwLock<RuleRegistry>,
    pub(crate) formats: Arc<RwLock<HashMap<String, Format>>>,
    pub(crate) schemas: RwLock<HashMap<String, Arc<SchemaEnv>>>,
    pub(crate) refs: RwLock<HashMap<String, RefEntry>>,
    cache: SchemaCache,
    loading: Mutex<HashMap<String, SharedLoad>>,
    errors: RwLock<Option<Vec<ErrorObject>>>,
}

/// Restores the `format` option when dropped; used while the default
/// meta-schema is installed so meta-schemas never compile against
/// formats meant for user schemas.
struct FormatScope<'a> {
    opts: &'a RwLock<ValidatorOptions>,
    saved: bool,
}

impl<'a> FormatScope<'a> {
    fn disable(opts: &'a RwLock<ValidatorOptions>) -> Self {
        let mut guard = opts.write();
        let saved = guard.format;
        guard.format = false;
        Self { opts, saved }
    }
}

impl Drop for FormatScope<'_> {
    fn drop(&mut self) {
        self.opts.write().format = self.saved;
    }
}

impl ValidationEngine {
    /// An engine with default options.
    ///
    /// # Errors
    ///
    /// Fails only if construction-time schemas or keywords are invalid,
    /// which cannot happen with the defaults.
    pub fn new() -> Result<Self> {
        Self::with_options(ValidatorOptions::new())
    }

    /// An engine with the given options.
    ///
    /// Installs the built-in vocabularies (in order: `$async`, core,
    /// validation, applicator, format, metadata, content), then
    /// construction-time keywords, formats, the default meta-schema
    /// (with format validation scoped off) and construction-time
    /// schemas.
    ///
    /// # Errors
    ///
    /// Fails when construction-time keywords, formats or schemas are
    /// invalid.
    pub fn with_options(mut options: ValidatorOptions) -> Result<Self> {
        let logger: Arc<dyn Logger> = match &options.logger {
            LoggerMode::Default => Arc::new(TracingLogger),
            LoggerMode::Off => Arc::new(NullLogger),
            LoggerMode::Custom(logger) => logger.clone(),
        };
        let init_schemas = std::mem::take(&mut options.schemas);
        let init_formats = std::mem::take(&mut options.formats);
        let init_keywords = std::mem::take(&mut options.keywords);

        let engine = Self {
            opts: RwLock::new(options),
            logger,
            rules: RwLock::new(RuleRegistry::new()),
            formats: Arc::new(RwLock::new(HashMap::new())),
            schemas: RwLock::new(HashMap::new()),
            refs: RwLock::new(HashMap::new()),
            cache: SchemaCache::default(),
            loading: Mutex::new(HashMap::new()),
            errors: RwLock::new(None),
        };
        engine.warn_legacy_options();

        engine.add_vocabulary(vec![("$async", KeywordDefinition::annotation())])?;
        engine.add_vocabulary(crate::vocabularies::core::vocabulary())?;
        engine.add_vocabulary(crate::vocabularies::validation::vocabulary())?;
        engine.add_vocabulary(crate::vocabularies::applicator::vocabulary())?;
        engine.add_vocabulary(crate::vocabularies::format::vocabulary())?;
        engine.add_vocabulary(crate::vocabularies::metadata::vocabulary())?;
        engine.add_vocabulary(crate::vocabularies::content::vocabulary())?;
        for (keyword, definition) in init_keywords {
            engine.add_keyword(&keyword, definition)?;
        }
        for (name, format) in builtin_formats() {
            engine.add_format(name, format);
        }
        for (name, format) in init_formats {
            engine.add_format(&name, format);
        }
        engine.install_default_meta()?;
        for schema in init_schemas {
            engine.add_schema(schema, None)?;
        }
        Ok(engine)
    }

    fn warn_legacy_options(&self) {
        let opts = self.opts.read();
        if opts.js_property_syntax.is_some() {
            self.logger
                .warn("option js_property_syntax is deprecated and ignored");
        }
        if opts.unicode.is_some() {
            self.logger.warn("option unicode is deprecated and ignored");
        }
        if opts.error_data_path.is_some() {
            self.logger.error("option error_data_path is not supported");
        }
        if opts.schema_id.is_some() {
            self.logger.error("option schema_id is not supported");
        }
        if opts.unique_items.is_some() {
            self.logger.error("option unique_items is not supported");
        }
    }

    fn install_default_meta(&self) -> Result<()> {
        let (meta_mode, data_enabled) = {
            let opts = self.opts.read();
            (opts.meta.clone(), opts.data)
        };
        // Compile eagerly inside the scope: meta-schemas must never
        // compile against formats meant for user schemas.
        let _format_scope = FormatScope::disable(&self.opts);
        if data_enabled {
            self.add_schema_impl(meta::data_ref_schema(), None, true, Some(false))?;
            self.get_schema(meta::DATA_REF_ID)?;
        }
        match meta_mode {
            MetaMode::Disabled => {}
            MetaMode::Enabled => {
                let schema = if data_enabled {
                    self.data_meta_schema(&meta::draft07(), &["#/properties"])?
                } else {
                    meta::draft07()
                };
                self.add_schema_impl(schema, None, true, Some(false))?;
                self.get_schema(meta::DRAFT07_ID)?;
            }
            MetaMode::Schema(custom) => {
                let id = custom.get("$id").and_then(Value::as_str).map(str::to_string);
                self.add_schema_impl(custom, None, true, Some(false))?;
                if let Some(id) = id {
                    self.get_schema(&id)?;
                }
            }
        }
        Ok(())
    }

    /// The diagnostics logger in use.
    #[must_use]
    pub fn logger(&self) -> Arc<dyn Logger> {
        self.logger.clone()
    }

    /// Errors produced by the most recent `validate` or
    /// `validate_schema` call.
    #[must_use]
    pub fn errors(&self) -> Option<Vec<ErrorObject>> {
        self.errors.read().clone()
    }

    /// Render errors as text; with `None`, renders the engine's last
    /// errors. Empty input renders as `"No errors"`.
    #[must_use]
    pub fn errors_text(&self, errors: Option<&[ErrorObject]>, options: &ErrorsTextOptions) -> String {
        match errors {
            Some(errors) => report::errors_text(Some(errors), options),
            None => report::errors_text(self.errors.read().as_deref(), options),
        }
    }

    /// Compile (or look up) the schema and validate `data` against it.
    ///
    /// Errors from a failing validation are surfaced on
    /// [`ValidationEngine::errors`].
    ///
    /// # Errors
    ///
    /// Fails with [`EngineError::UnknownSchema`] for an unregistered
    /// key, with compilation errors for an invalid schema, and with
    /// [`EngineError::AsyncSchema`] for an `$async` schema.
    pub fn validate<'a>(
        &self,
        source: impl Into<SchemaInput<'a>>,
        data: &mut Value,
    ) -> Result<bool> {
        let vf = match source.into() {
            SchemaInput::Key(key) => self.get_schema(key)?.ok_or_else(|| {
                EngineError::UnknownSchema {
                    key: key.to_string(),
                }
            })?,
            SchemaInput::Schema(schema) => self.compile(schema)?,
        };
        let valid = vf.validate(data)?;
        *self.errors.write() = vf.errors();
        Ok(valid)
    }

    /// Compile a schema into a shared validator, registering it if it
    /// carries an `$id` and `add_used_schema` is on.
    ///
    /// Repeated calls with a structurally identical schema return the
    /// same validator.
    ///
    /// # Errors
    ///
    /// Propagates invalid-schema and missing-reference errors.
    pub fn compile(&self, schema: &Value) -> Result<Arc<ValidateFunction>> {
        let register = self.opts.read().add_used_schema;
        let env = self.add_schema_env(schema, false, None, register, None)?;
        self.compile_env(&env)
    }

    /// As [`ValidationEngine::compile`], consulting the configured
    /// schema loader whenever compilation fails with a missing
    /// reference: the missing schema is fetched, its own `$schema`
    /// loaded first if absent, registered, and compilation retried.
    /// Concurrent calls share at most one in-flight fetch per
    /// reference.
    ///
    /// # Errors
    ///
    /// Fails with [`EngineError::LoadSchemaNotConfigured`] when no
    /// loader was supplied, and with
    /// [`EngineError::UnresolvableRef`] when a loaded schema still
    /// does not resolve the reference.
    pub async fn compile_async(&self, schema: &Value) -> Result<Arc<ValidateFunction>> {
        if self.opts.read().load_schema.is_none() {
            return Err(EngineError::LoadSchemaNotConfigured);
        }
        self.load_meta_for(schema).await?;
        let register = self.opts.read().add_used_schema;
        let env = self.add_schema_env(schema, false, None, register, None)?;
        loop {
            match self.compile_env(&env) {
                Ok(vf) => return Ok(vf),
                Err(EngineError::MissingRef {
                    missing_ref,
                    missing_schema,
                }) => {
                    let key = uri::normalize_id(&missing_schema)?;
                    if self.is_registered(&key) {
                        return Err(EngineError::UnresolvableRef {
                            missing_ref,
                            missing_schema,
                        });
                    }
                    let loaded = self.load_shared(&key).await?;
                    if !self.is_registered(&key) {
                        self.load_meta_for(&loaded).await?;
                        self.add_schema_impl(loaded, Some(&missing_schema), false, None)?;
                    }
                }
                Err(other) => return Err(other),
            }
        }
    }

    fn load_meta_for<'a>(&'a self, schema: &'a Value) -> BoxFuture<'a, Result<()>> {
        async move {
            let Some(meta_ref) = schema.get("$schema").and_then(Value::as_str) else {
                return Ok(());
            };
            let key = uri::normalize_id(meta_ref)?;
            if self.registered_env(&key).is_some() {
                return Ok(());
            }
            let loaded = self.load_shared(&key).await?;
            if self.registered_env(&key).is_some() {
                return Ok(());
            }
            self.load_meta_for(&loaded).await?;
            self.add_schema_impl(loaded, Some(meta_ref), true, None)?;
            Ok(())
        }
        .boxed()
    }

    async fn load_shared(&self, key: &str) -> Result<Value> {
        let fut = {
            let mut loading = self.loading.lock();
            match loading.get(key) {
                Some(fut) => fut.clone(),
                None => {
                    let loader = self
                        .opts
                        .read()
                        .load_schema
                        .clone()
                        .ok_or(EngineError::LoadSchemaNotConfigured)?;
                    let reference = uri::display_uri(key);
                    let fut: SharedLoad = async move {
                        loader.load(&reference).await.map_err(Arc::new)
                    }
                    .boxed()
                    .shared();
                    loading.insert(key.to_string(), fut.clone());
                    fut
                }
            }
        };
        let result = fut.await;
        self.loading.lock().remove(key);
        result.map_err(|e| EngineError::LoadFailed {
            reference: uri::display_uri(key),
            message: e.to_string(),
        })
    }

    /// Register a schema (or an array of schemas, each under its own
    /// `$id`) under `key`, `$id`, or anonymously in the cache.
    ///
    /// # Errors
    ///
    /// Fails with [`EngineError::DuplicateSchema`] when the key or any
    /// nested id is already registered, and with schema-validation
    /// errors per the `validate_schema` option.
    pub fn add_schema(&self, schema: Value, key: Option<&str>) -> Result<()> {
        if let Value::Array(schemas) = schema {
            for schema in schemas {
                self.add_schema(schema, None)?;
            }
            return Ok(());
        }
        self.add_schema_impl(schema, key, false, None)
    }

    /// As [`ValidationEngine::add_schema`], marking the schema as a
    /// meta-schema: it survives bulk removal and compiles under the
    /// meta options profile.
    ///
    /// # Errors
    ///
    /// As [`ValidationEngine::add_schema`].
    pub fn add_meta_schema(&self, schema: Value, key: Option<&str>) -> Result<()> {
        self.add_schema_impl(schema, key, true, None)
    }

    fn add_schema_impl(
        &self,
        schema: Value,
        key: Option<&str>,
        is_meta: bool,
        validate: Option<bool>,
    ) -> Result<()> {
        let id = match &schema {
            Value::Object(map) => match map.get("$id") {
                None => None,
                Some(Value::String(id)) => Some(id.clone()),
                Some(_) => return Err(EngineError::invalid_schema("$id must be a string")),
            },
            _ => None,
        };
        let registered_key = match (key, &id) {
            (Some(key), _) => Some(uri::normalize_id(key)?),
            (None, Some(id)) => Some(uri::normalize_id(id)?),
            (None, None) => None,
        };
        match registered_key {
            None => {
                self.add_schema_env(&schema, is_meta, validate, true, None)?;
            }
            Some(registered_key) => {
                if self.is_registered(&registered_key) {
                    return Err(EngineError::DuplicateSchema {
                        key: uri::display_uri(&registered_key),
                    });
                }
                let env =
                    self.add_schema_env(&schema, is_meta, validate, true, Some(&registered_key))?;
                self.schemas.write().insert(registered_key.clone(), env);
                if let (Some(_), Some(id)) = (key, &id) {
                    let id = uri::normalize_id(id)?;
                    if id != registered_key {
                        if self.is_registered(&id) {
                            return Err(EngineError::DuplicateSchema {
                                key: uri::display_uri(&id),
                            });
                        }
                        self.refs
                            .write()
                            .insert(id, RefEntry::Alias(registered_key));
                    }
                }
            }
        }
        Ok(())
    }

    /// Create (or fetch from the cache) the [`SchemaEnv`] for a schema
    /// document.
    pub(crate) fn add_schema_env(
        &self,
        schema: &Value,
        is_meta: bool,
        validate: Option<bool>,
        register: bool,
        base_key: Option<&str>,
    ) -> Result<Arc<SchemaEnv>> {
        if !matches!(schema, Value::Object(_) | Value::Bool(_)) {
            return Err(EngineError::InvalidSchemaType);
        }
        let cache_key = cache::cache_key(schema, &self.opts.read().serialize);
        if let Some(env) = self.cache.get(&cache_key) {
            return Ok(env);
        }

        let id = schema.get("$id").and_then(Value::as_str);
        let base_id = match (id, base_key) {
            (Some(id), _) => uri::normalize_id(id)?,
            (None, Some(key)) => uri::normalize_id(key)?,
            (None, None) => String::new(),
        };
        let local_refs = env::collect_local_refs(schema, &base_id)?;
        let env = SchemaEnv::root(
            schema.clone(),
            base_id.clone(),
            cache_key.clone(),
            local_refs,
            is_meta,
        );
        self.cache.insert(cache_key, env.clone());

        if register {
            if !base_id.is_empty() && !base_id.starts_with('#') && base_key.is_none() {
                if self.is_registered(&base_id) {
                    return Err(EngineError::DuplicateSchema {
                        key: uri::display_uri(&base_id),
                    });
                }
                self.refs
                    .write()
                    .insert(base_id.clone(), RefEntry::Direct(env.clone()));
            }
            let nested: Vec<(String, String)> = env
                .local_refs
                .iter()
                .map(|(id, ptr)| (id.clone(), ptr.clone()))
                .collect();
            for (nested_id, pointer) in nested {
                if self.is_registered(&nested_id) {
                    return Err(EngineError::DuplicateSchema {
                        key: uri::display_uri(&nested_id),
                    });
                }
                let child = SchemaEnv::child(&env, &pointer, nested_id.clone())?;
                self.refs.write().insert(nested_id, RefEntry::Direct(child));
            }
        }

        let should_validate = validate.unwrap_or_else(|| {
            !matches!(self.opts.read().validate_schema, ValidateSchemaMode::Off)
        });
        if should_validate {
            self.validate_schema_mode(schema, true)?;
        }
        Ok(env)
    }

    /// Validate a schema document against its meta-schema.
    ///
    /// Boolean schemas are trivially valid. Without a resolvable
    /// meta-schema the check is skipped with a logged warning. Errors
    /// are surfaced on [`ValidationEngine::errors`].
    ///
    /// # Errors
    ///
    /// Fails when `$schema` is not a string or the meta-schema itself
    /// fails to compile.
    pub fn validate_schema(&self, schema: &Value) -> Result<bool> {
        self.validate_schema_mode(schema, false)
    }

    pub(crate) fn validate_schema_mode(&self, schema: &Value, apply_mode: bool) -> Result<bool> {
        if matches!(schema, Value::Bool(_)) {
            return Ok(true);
        }
        let meta_ref = match schema.get("$schema") {
            None => None,
            Some(Value::String(meta_ref)) => Some(meta_ref.clone()),
            Some(_) => {
                return Err(EngineError::invalid_schema("$schema must be a string"));
            }
        };
        let meta_id = match meta_ref {
            Some(meta_ref) => Some(uri::normalize_id(&meta_ref)?),
            None => self.default_meta()?,
        };
        let Some(meta_id) = meta_id else {
            self.logger
                .warn("meta-schema not available to validate schema");
            return Ok(true);
        };
        let Some(meta_validator) = self.get_schema(&meta_id)? else {
            self.logger.warn(&format!(
                "meta-schema \"{}\" is not registered; schema not validated",
                uri::display_uri(&meta_id)
            ));
            return Ok(true);
        };
        let mut doc = schema.clone();
        let valid = meta_validator.validate(&mut doc)?;
        if !valid {
            let errors = meta_validator.errors();
            let text = report::errors_text(errors.as_deref(), &ErrorsTextOptions::default());
            *self.errors.write() = errors;
            if apply_mode {
                match self.opts.read().validate_schema {
                    ValidateSchemaMode::On => {
                        return Err(EngineError::invalid_schema(text));
                    }
                    ValidateSchemaMode::Log => {
                        self.logger.error(&format!("schema is invalid: {text}"));
                    }
                    ValidateSchemaMode::Off => {}
                }
            }
        }
        Ok(valid)
    }

    /// The meta-schema id assumed for schemas without `$schema`:
    /// the `default_meta` option, else the installed default
    /// meta-schema's id.
    ///
    /// # Errors
    ///
    /// Fails when the configured id is not a valid URI.
    pub fn default_meta(&self) -> Result<Option<String>> {
        let opts = self.opts.read();
        if let Some(id) = &opts.default_meta {
            return Ok(Some(uri::normalize_id(id)?));
        }
        match &opts.meta {
            MetaMode::Disabled => Ok(None),
            MetaMode::Enabled => Ok(Some(meta::DRAFT07_ID.to_string())),
            MetaMode::Schema(schema) => match schema.get("$id").and_then(Value::as_str) {
                Some(id) => Ok(Some(uri::normalize_id(id)?)),
                None => Ok(None),
            },
        }
    }

    /// Look up (and compile, on first use) a registered schema by key,
    /// id, or reference into a registered schema.
    ///
    /// # Errors
    ///
    /// Propagates compilation errors; an unknown key is `Ok(None)`.
    pub fn get_schema(&self, key_ref: &str) -> Result<Option<Arc<ValidateFunction>>> {
        let key = uri::normalize_id(key_ref)?;
        match self.get_schema_env(&key)? {
            Some(env) => self.compile_env(&env).map(Some),
            None => Ok(None),
        }
    }

    fn get_schema_env(&self, key: &str) -> Result<Option<Arc<SchemaEnv>>> {
        if let Some(env) = self.registered_env(key) {
            return Ok(Some(env));
        }
        // Fall back to resolving the key as a reference from an empty
        // root; a hit is cached in the ref table.
        let root = SchemaEnv::root(
            Value::Bool(true),
            String::new(),
            String::new(),
            HashMap::new(),
            false,
        );
        match self.resolve_schema(&root, key) {
            Ok(env) => {
                self.refs
                    .write()
                    .insert(key.to_string(), RefEntry::Direct(env.clone()));
                Ok(Some(env))
            }
            Err(EngineError::MissingRef { .. }) => Ok(None),
            Err(other) => Err(other),
        }
    }

    /// Remove schemas per `target`; see [`RemoveTarget`].
    ///
    /// # Errors
    ///
    /// Fails with [`EngineError::InvalidRemoveArgument`] when given a
    /// non-schema document, and on malformed keys.
    pub fn remove_schema(&self, target: RemoveTarget<'_>) -> Result<()> {
        match target {
            RemoveTarget::All => {
                self.remove_matching(None);
                self.cache.clear();
            }
            RemoveTarget::Pattern(pattern) => {
                self.remove_matching(Some(pattern));
            }
            RemoveTarget::Key(key) => {
                let key = uri::normalize_id(key)?;
                let env = self.registered_env(&key);
                self.schemas.write().remove(&key);
                self.refs.write().remove(&key);
                if let Some(env) = env {
                    if !env.cache_key.is_empty() {
                        self.cache.remove(&env.cache_key);
                    }
                }
            }
            RemoveTarget::Schema(schema) => {
                if !matches!(schema, Value::Object(_) | Value::Bool(_)) {
                    return Err(EngineError::InvalidRemoveArgument);
                }
                let cache_key = cache::cache_key(schema, &self.opts.read().serialize);
                self.cache.remove(&cache_key);
                if let Some(id) = schema.get("$id").and_then(Value::as_str) {
                    let id = uri::normalize_id(id)?;
                    self.schemas.write().remove(&id);
                    self.refs.write().remove(&id);
                }
            }
        }
        Ok(())
    }

    fn remove_matching(&self, pattern: Option<&Regex>) {
        let matches_key = |key: &str| {
            pattern.map_or(true, |re| re.is_match(key) || re.is_match(&uri::display_uri(key)))
        };
        let mut removed = Vec::new();
        {
            let mut schemas = self.schemas.write();
            let doomed: Vec<String> = schemas
                .iter()
                .filter(|(key, env)| !env.is_meta() && matches_key(key))
                .map(|(key, _)| key.clone())
                .collect();
            for key in doomed {
                if let Some(env) = schemas.remove(&key) {
                    removed.push(env);
                }
            }
        }
        {
            let mut refs = self.refs.write();
            let doomed: Vec<String> = refs
                .iter()
                .filter(|(key, entry)| {
                    matches_key(key)
                        && match entry {
                            RefEntry::Direct(env) => !env.is_meta(),
                            RefEntry::Alias(_) => true,
                        }
                })
                .map(|(key, _)| key.clone())
                .collect();
            for key in doomed {
                if let Some(RefEntry::Direct(env)) = refs.remove(&key) {
                    removed.push(env);
                }
            }
        }
        for env in removed {
            if !env.cache_key.is_empty() {
                self.cache.remove(&env.cache_key);
            }
        }
    }

    /// Register a list of keyword definitions.
    ///
    /// # Errors
    ///
    /// As [`ValidationEngine::add_keyword`].
    pub fn add_vocabulary(&self, definitions: Vec<(&str, KeywordDefinition)>) -> Result<()> {
        for (keyword, definition) in definitions {
            self.add_keyword(keyword, definition)?;
        }
        Ok(())
    }

    /// Register a keyword definition.
    ///
    /// A supplied `meta_schema` is compiled (wrapped in a `$data`
    /// alternation when both the definition and the engine enable
    /// `$data`) and used to check keyword values during compilation.
    ///
    /// # Errors
    ///
    /// Fails on invalid or duplicate names, `$data` definitions with no
    /// validator, and meta-schemas that fail to compile.
    pub fn add_keyword(&self, keyword: &str, definition: KeywordDefinition) -> Result<()> {
        let schema_validator = match &definition.meta_schema {
            Some(meta_schema) => {
                let wrap = definition.data && self.opts.read().data;
                let meta_schema = if wrap {
                    json!({ "anyOf": [meta_schema, { "$ref": meta::DATA_REF_ID }] })
                } else {
                    meta_schema.clone()
                };
                Some(self.compile(&meta_schema)?)
            }
            None => None,
        };
        self.rules
            .write()
            .add(keyword, definition, schema_validator, &*self.logger)
    }

    /// The definition registered for `keyword`, if any.
    #[must_use]
    pub fn get_keyword(&self, keyword: &str) -> Option<Arc<KeywordDefinition>> {
        self.rules.read().get(keyword).map(|r| r.definition.clone())
    }

    /// Unregister a keyword from the registry and every rule group.
    pub fn remove_keyword(&self, keyword: &str) {
        self.rules.write().remove(keyword);
    }

    /// Register a format.
    pub fn add_format(&self, name: &str, format: impl Into<Format>) {
        self.formats.write().insert(name.to_string(), format.into());
    }

    /// Register a string format, promoted to a compiled pattern.
    ///
    /// # Errors
    ///
    /// Fails when the pattern does not compile.
    pub fn add_format_pattern(&self, name: &str, pattern: &str) -> Result<()> {
        let regex = Regex::new(pattern).map_err(|e| {
            EngineError::invalid_schema(format!("format \"{name}\" pattern does not compile: {e}"))
        })?;
        self.add_format(name, Format::Pattern(regex));
        Ok(())
    }

    /// Return a copy of `meta_schema` in which, at each of
    /// `keyword_pointers`, every `$data`-capable keyword's meta is
    /// replaced by the two-alternative
    /// `anyOf: [original, $data reference]`. The input is not mutated.
    ///
    /// # Errors
    ///
    /// Fails when a pointer does not lead to an object.
    pub fn data_meta_schema(
        &self,
        meta_schema: &Value,
        keyword_pointers: &[&str],
    ) -> Result<Value> {
        let rules = self.rules.read();
        let mut result = meta_schema.clone();
        for pointer in keyword_pointers {
            let pointer = pointer.trim_start_matches('#');
            let target = uri::walk_pointer_mut(&mut result, pointer).ok_or_else(|| {
                EngineError::invalid_schema(format!(
                    "pointer \"{pointer}\" not found in meta-schema"
                ))
            })?;
            let Value::Object(keywords) = target else {
                return Err(EngineError::invalid_schema(format!(
                    "pointer \"{pointer}\" does not lead to a keyword map"
                )));
            };
            for (keyword, sub) in keywords.iter_mut() {
                let data_capable = rules.get(keyword).is_some_and(|r| r.definition.data);
                if data_capable {
                    let original = sub.take();
                    *sub = json!({ "anyOf": [original, { "$ref": meta::DATA_REF_ID }] });
                }
            }
        }
        Ok(result)
    }
}
