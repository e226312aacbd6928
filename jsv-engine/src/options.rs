//! Engine configuration.
//!
//! `ValidatorOptions` is plain data plus a few trait objects. The
//! meta-schema compilation profile is derived from it by
//! [`ValidatorOptions::meta_opts`], which strips every data-mutating
//! option so meta-schema validation can never touch its input.

use crate::formats::Format;
use crate::rules::KeywordDefinition;
use jsv_core::traits::{Logger, SchemaLoader};
use serde_json::Value;
use std::sync::Arc;

/// How schemas are serialized for cache keys.
#[derive(Clone, Default)]
pub enum SerializeMode {
    /// Recursively key-sorted canonical form, hashed (the default).
    #[default]
    Canonical,
    /// Plain serialization: semantically equal schemas with different
    /// member order get distinct cache entries.
    Raw,
    /// Caller-supplied serialization; must map structurally equal
    /// schemas to equal strings.
    Custom(Arc<dyn Fn(&Value) -> String + Send + Sync>),
}

/// Whether and how schemas are validated against their meta-schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ValidateSchemaMode {
    /// Do not validate schemas.
    Off,
    /// Validate and fail registration on an invalid schema.
    #[default]
    On,
    /// Validate but only log failures.
    Log,
}

/// Scalar type coercion during validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CoerceTypes {
    /// No coercion (the default).
    #[default]
    Off,
    /// Coerce between scalar types.
    On,
    /// As `On`, and additionally wrap/unwrap single-element arrays.
    Array,
}

/// Default meta-schema installation.
#[derive(Debug, Clone, Default)]
pub enum MetaMode {
    /// Install the draft-07 meta-schema (the default).
    #[default]
    Enabled,
    /// Do not install any default meta-schema.
    Disabled,
    /// Install this document as the default meta-schema.
    Schema(Value),
}

/// Diagnostics sink selection.
#[derive(Clone, Default)]
pub enum LoggerMode {
    /// The `tracing`-backed default logger.
    #[default]
    Default,
    /// Disable logging entirely.
    Off,
    /// A caller-supplied logger.
    Custom(Arc<dyn Logger>),
}

/// Tuning for what compilation retains about the produced validator.
#[derive(Debug, Clone, Copy, Default)]
pub struct CodeOptions {
    /// Retain a textual outline of the compiled keyword tree on the
    /// validator (`ValidateFunction::source`).
    pub source: bool,
}

/// Engine configuration. Construct with [`ValidatorOptions::default`]
/// and adjust via the `with_*` builders or plain field access.
#[derive(Clone)]
pub struct ValidatorOptions {
    /// Fail compilation on unknown keywords, unknown formats and
    /// ambiguous type combinations.
    pub strict: bool,
    /// Collect every error instead of stopping at the first.
    pub all_errors: bool,
    /// Attach `schema`, `parent_schema` and `data` to error objects.
    pub verbose: bool,
    /// Validate `format` keywords (disabled internally while the
    /// default meta-schema is installed).
    pub format: bool,
    /// Enable the `$data` runtime-reference mechanism.
    pub data: bool,
    /// Scalar type coercion.
    pub coerce_types: CoerceTypes,
    /// Inject `default` values into validated data.
    pub use_defaults: bool,
    /// Strip properties rejected by `additionalProperties`.
    pub remove_additional: bool,
    /// Threshold at which a code-emitting backend would switch
    /// `required` from inline checks to a loop; the tree interpreter
    /// deduplicates the list and is otherwise unaffected.
    pub loop_required: usize,
    /// `enum` lists at least this long are matched via a canonical
    /// hash table rather than a scan.
    pub loop_enum: usize,
    /// Register schemas (by `$id`) encountered during compilation.
    pub add_used_schema: bool,
    /// Schema serialization for cache keys.
    pub serialize: SerializeMode,
    /// Schema-against-meta-schema validation.
    pub validate_schema: ValidateSchemaMode,
    /// Default meta-schema installation.
    pub meta: MetaMode,
    /// Meta-schema id assumed when a schema has no `$schema`.
    pub default_meta: Option<String>,
    /// Async collaborator used by `compile_async`.
    pub load_schema: Option<Arc<dyn SchemaLoader>>,
    /// Diagnostics sink.
    pub logger: LoggerMode,
    /// Compilation-output tuning.
    pub code: CodeOptions,
    /// Schemas registered at construction.
    pub schemas: Vec<Value>,
    /// Formats registered at construction.
    pub formats: Vec<(String, Format)>,
    /// Keywords registered at construction, after the built-in
    /// vocabularies.
    pub keywords: Vec<(String, KeywordDefinition)>,

    /// Deprecated: property-access data paths are always used.
    pub js_property_syntax: Option<bool>,
    /// Deprecated: string lengths always count Unicode code points.
    pub unicode: Option<bool>,
    /// Unsupported; logged as an error if set.
    pub error_data_path: Option<String>,
    /// Unsupported; logged as an error if set.
    pub schema_id: Option<String>,
    /// Unsupported; logged as an error if set.
    pub unique_items: Option<bool>,
}

impl Default for ValidatorOptions {
    fn default() -> Self {
        Self::new()
    }
}

impl ValidatorOptions {
    /// Options with the defaults described on each field.
    #[must_use]
    pub fn new() -> Self {
        Self {
            strict: false,
            all_errors: false,
            verbose: false,
            format: true,
            data: false,
            coerce_types: CoerceTypes::Off,
            use_defaults: false,
            remove_additional: false,
            loop_required: usize::MAX,
            loop_enum: 16,
            add_used_schema: true,
            serialize: SerializeMode::Canonical,
            validate_schema: ValidateSchemaMode::On,
            meta: MetaMode::Enabled,
            default_meta: None,
            load_schema: None,
            logger: LoggerMode::Default,
            code: CodeOptions::default(),
            schemas: Vec::new(),
            formats: Vec::new(),
            keywords: Vec::new(),
            js_property_syntax: None,
            unicode: None,
            error_data_path: None,
            schema_id: None,
            unique_items: None,
        }
    }

    /// Enable or disable `all_errors`.
    #[must_use]
    pub fn with_all_errors(mut self, all_errors: bool) -> Self {
        self.all_errors = all_errors;
        self
    }

    /// Enable or disable strict mode.
    #[must_use]
    pub fn with_strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    /// Enable the `$data` mechanism.
    #[must_use]
    pub fn with_data(mut self, data: bool) -> Self {
        self.data = data;
        self
    }

    /// Set the async schema loader.
    #[must_use]
    pub fn with_load_schema(mut self, loader: Arc<dyn SchemaLoader>) -> Self {
        self.load_schema = Some(loader);
        self
    }

    /// The options profile used to compile meta-schemas: identical,
    /// except that every data-mutating option is disabled.
    #[must_use]
    pub(crate) fn meta_opts(&self) -> Self {
        let mut opts = self.clone();
        opts.remove_additional = false;
        opts.use_defaults = false;
        opts.coerce_types = CoerceTypes::Off;
        opts
    }
}
