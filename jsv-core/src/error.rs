//! Error types for schema registration, compilation and keyword management.
//!
//! Data-validation failure is never an error at this level: validators
//! report it as `false` plus a list of error objects. `EngineError` covers
//! the invalid-input and compilation taxonomy only.

use thiserror::Error;

/// Result alias used across the validator crates.
pub type Result<T> = std::result::Result<T, EngineError>;

/// Errors raised by schema registration, compilation and the keyword
/// registry.
#[derive(Debug, Error)]
pub enum EngineError {
    /// A schema document was neither an object nor a boolean.
    #[error("schema must be an object or boolean")]
    InvalidSchemaType,

    /// A schema key or `$id` is already registered.
    #[error("schema with key or id \"{key}\" already exists")]
    DuplicateSchema {
        /// The conflicting key or id.
        key: String,
    },

    /// A string key was given but no schema is registered under it.
    #[error("no schema with key or ref \"{key}\"")]
    UnknownSchema {
        /// The key that failed to resolve.
        key: String,
    },

    /// Two nested `$id` declarations resolve to the same URI.
    #[error("id \"{id}\" resolves to more than one schema")]
    DuplicateId {
        /// The ambiguous id.
        id: String,
    },

    /// A `$ref` could not be resolved during synchronous compilation.
    ///
    /// `compile_async` recovers from this by consulting the schema
    /// loader; synchronous `compile` propagates it.
    #[error("can't resolve reference {missing_ref}")]
    MissingRef {
        /// The full reference that failed to resolve.
        missing_ref: String,
        /// The URI part of the reference, i.e. the schema to load.
        missing_schema: String,
    },

    /// The referenced schema is registered yet the reference still does
    /// not resolve, which indicates a registration or fetch bug.
    #[error("schema \"{missing_schema}\" is loaded but reference \"{missing_ref}\" cannot be resolved")]
    UnresolvableRef {
        /// The reference that failed.
        missing_ref: String,
        /// The schema that was expected to contain the target.
        missing_schema: String,
    },

    /// `compile_async` was called without a configured schema loader.
    #[error("options.load_schema is not configured")]
    LoadSchemaNotConfigured,

    /// The schema loader returned an error for a reference.
    #[error("loading schema \"{reference}\" failed: {message}")]
    LoadFailed {
        /// The reference passed to the loader.
        reference: String,
        /// The loader's error, rendered.
        message: String,
    },

    /// A reference or `$id` is not a valid URI.
    #[error("invalid reference \"{reference}\": {message}")]
    InvalidRef {
        /// The offending reference.
        reference: String,
        /// Parser diagnostics.
        message: String,
    },

    /// A keyword name does not match `^[a-z_$][a-z0-9_$-]*$`.
    #[error("keyword name \"{keyword}\" is invalid")]
    InvalidKeywordName {
        /// The rejected name.
        keyword: String,
    },

    /// A keyword is already present in the rule registry.
    #[error("keyword \"{keyword}\" is already defined")]
    DuplicateKeyword {
        /// The duplicated keyword.
        keyword: String,
    },

    /// A `$data`-capable keyword definition has no way to validate.
    #[error("$data keyword \"{keyword}\" must have a compile or validate function")]
    InvalidDataKeyword {
        /// The offending keyword.
        keyword: String,
    },

    /// A keyword definition names a data type the engine does not know.
    #[error("unknown data type \"{data_type}\" for keyword \"{keyword}\"")]
    UnknownDataType {
        /// The keyword being registered.
        keyword: String,
        /// The unrecognized type name.
        data_type: String,
    },

    /// A schema failed compilation or meta-schema validation.
    #[error("schema is invalid: {message}")]
    InvalidSchema {
        /// What was wrong with the schema.
        message: String,
    },

    /// A strict-mode check failed.
    #[error("strict mode: {message}")]
    StrictMode {
        /// The strict-mode diagnostic.
        message: String,
    },

    /// A synchronous call was made on an `$async` schema's validator.
    #[error("validation of an $async schema must use validate_async")]
    AsyncSchema,

    /// `remove_schema` was given a value that is not a schema.
    #[error("invalid argument to remove_schema")]
    InvalidRemoveArgument,
}

impl EngineError {
    /// Shorthand for [`EngineError::InvalidSchema`].
    pub fn invalid_schema(message: impl Into<String>) -> Self {
        EngineError::InvalidSchema {
            message: message.into(),
        }
    }
}
