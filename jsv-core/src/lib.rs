//! Core types for the `jsv` JSON Schema validator.
//!
//! This crate holds the pieces shared by the engine and by embedders:
//!
//! - the error taxonomy ([`error::EngineError`])
//! - the JSON data-type model ([`types::JsonType`])
//! - the collaborator traits ([`traits::Logger`], [`traits::SchemaLoader`])
//!
//! No validation logic lives here; see the `jsv-engine` crate.

pub mod error;
pub mod traits;
pub mod types;

pub use error::{EngineError, Result};
pub use traits::{Logger, NullLogger, SchemaLoader, TracingLogger};
pub use types::{data_type_of, JsonType};
