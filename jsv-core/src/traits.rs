//! Collaborator traits: diagnostics logging and remote schema loading.

use crate::error::EngineError;
use async_trait::async_trait;
use serde_json::Value;

/// Sink for engine diagnostics.
///
/// The engine never prints; everything non-fatal (deprecated options,
/// unknown formats, rule-ordering fallbacks) goes through this trait.
pub trait Logger: Send + Sync {
    /// Informational message.
    fn log(&self, message: &str);
    /// Something is suspect but the operation continues.
    fn warn(&self, message: &str);
    /// Something is wrong but was deliberately not raised as an error.
    fn error(&self, message: &str);
}

/// The default logger, backed by `tracing` events under the `jsv` target.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingLogger;

impl Logger for TracingLogger {
    fn log(&self, message: &str) {
        tracing::info!(target: "jsv", "{message}");
    }

    fn warn(&self, message: &str) {
        tracing::warn!(target: "jsv", "{message}");
    }

    fn error(&self, message: &str) {
        tracing::error!(target: "jsv", "{message}");
    }
}

/// A logger that drops everything, installed for `logger: false`.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullLogger;

impl Logger for NullLogger {
    fn log(&self, _message: &str) {}
    fn warn(&self, _message: &str) {}
    fn error(&self, _message: &str) {}
}

/// Asynchronous collaborator that fetches remote schemas by reference.
///
/// Consulted by `compile_async` whenever compilation fails with a
/// missing reference. The engine guarantees at most one in-flight load
/// per reference.
#[async_trait]
pub trait SchemaLoader: Send + Sync {
    /// Fetch the schema document identified by `reference`.
    async fn load(&self, reference: &str) -> Result<Value, EngineError>;
}
