//! A compiling JSON Schema draft-07 validator.
//!
//! The engine compiles a declarative schema into a tree of validator
//! nodes that is walked at validation time. It supports `$id` / `$ref`
//! resolution with cycle tolerance, an extensible keyword registry with
//! declarative ordering, `$data` runtime references, asynchronous
//! schema loading, defaults injection and type coercion.
//!
//! ```
//! use jsv_engine::ValidationEngine;
//! use serde_json::json;
//!
//! # fn main() -> jsv_engine::Result<()> {
//! let engine = ValidationEngine::new()?;
//! let validate = engine.compile(&json!({
//!     "type": "object",
//!     "properties": { "port": { "type": "integer", "minimum": 1 } },
//!     "required": ["port"]
//! }))?;
//! let mut data = json!({ "port": 8080 });
//! assert!(validate.validate(&mut data)?);
//! # Ok(())
//! # }
//! ```

mod cache;
mod compiler;
mod engine;
mod env;
mod resolver;
mod runtime;
mod uri;
mod vocabularies;

pub mod context;
pub mod formats;
pub mod meta;
pub mod options;
pub mod report;
pub mod rules;

pub use compiler::{KeywordCtx, SchemaNode};
pub use context::{DataRef, InstancePath, KeywordValidator, RuntimeCtx, SchemaArg};
pub use engine::{RemoveTarget, SchemaInput, ValidationEngine};
pub use env::SchemaEnv;
pub use formats::Format;
pub use jsv_core::error::{EngineError, Result};
pub use jsv_core::traits::{Logger, NullLogger, SchemaLoader, TracingLogger};
pub use jsv_core::types::{data_type_of, JsonType};
pub use options::{
    CodeOptions, CoerceTypes, LoggerMode, MetaMode, SerializeMode, ValidateSchemaMode,
    ValidatorOptions,
};
pub use report::{errors_text, ErrorObject, ErrorsTextOptions, ValidationError};
pub use rules::KeywordDefinition;
pub use runtime::ValidateFunction;
