//! The runtime surface of compiled validators.

use crate::compiler::SchemaNode;
use crate::context::RuntimeCtx;
use crate::env::SchemaEnv;
use crate::report::{ErrorObject, ValidationError};
use jsv_core::error::{EngineError, Result};
use parking_lot::Mutex;
use serde_json::Value;
use std::fmt;
use std::sync::{Arc, Weak};

/// A compiled validator.
///
/// Calling [`ValidateFunction::validate`] returns data validity and, as
/// a side effect, stores the produced errors on the function itself
/// (readable through [`ValidateFunction::errors`]). `$async` schemas
/// must be driven through [`ValidateFunction::validate_async`], which
/// rejects with a [`ValidationError`] carrying the error list.
pub struct ValidateFunction {
    node: SchemaNode,
    /// The schema this validator was compiled from.
    pub schema: Arc<Value>,
    env: Weak<SchemaEnv>,
    is_async: bool,
    all_errors: bool,
    verbose: bool,
    data_enabled: bool,
    source: Option<String>,
    errors: Mutex<Option<Vec<ErrorObject>>>,
}

impl fmt::Debug for ValidateFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValidateFunction")
            .field("is_async", &self.is_async)
            .field("all_errors", &self.all_errors)
            .field("verbose", &self.verbose)
            .field("data_enabled", &self.data_enabled)
            .field("source", &self.source)
            .finish()
    }
}

impl ValidateFunction {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        node: SchemaNode,
        schema: Arc<Value>,
        env: Weak<SchemaEnv>,
        is_async: bool,
        all_errors: bool,
        verbose: bool,
        data_enabled: bool,
        source: Option<String>,
    ) -> Self {
        Self {
            node,
            schema,
            env,
            is_async,
            all_errors,
            verbose,
            data_enabled,
            source,
            errors: Mutex::new(None),
        }
    }

    pub(crate) fn node(&self) -> &SchemaNode {
        &self.node
    }

    /// The environment this validator was compiled for, if it is still
    /// registered.
    #[must_use]
    pub fn schema_env(&self) -> Option<Arc<SchemaEnv>> {
        self.env.upgrade()
    }

    /// Whether this validator must be driven asynchronously.
    #[must_use]
    pub fn is_async(&self) -> bool {
        self.is_async
    }

    /// Outline of the compiled keyword tree, retained when
    /// `code.source` was enabled at compilation.
    #[must_use]
    pub fn source(&self) -> Option<&str> {
        self.source.as_deref()
    }

    /// The errors produced by the most recent invocation, or `None`
    /// after a passing one.
    #[must_use]
    pub fn errors(&self) -> Option<Vec<ErrorObject>> {
        self.errors.lock().clone()
    }

    /// Validate `data` synchronously.
    ///
    /// `data` may be mutated when `use_defaults`, `coerce_types` or
    /// `remove_additional` are active.
    ///
    /// # Errors
    ///
    /// Fails with [`EngineError::AsyncSchema`] when the schema is
    /// `$async`; data-validation failure is the `Ok(false)` case.
    pub fn validate(&self, data: &mut Value) -> Result<bool> {
        if self.is_async {
            return Err(EngineError::AsyncSchema);
        }
        Ok(self.run(data).0)
    }

    /// Validate `data`, resolving on success and rejecting with the
    /// collected errors on failure.
    pub async fn validate_async(&self, data: &mut Value) -> std::result::Result<(), ValidationError> {
        let (valid, errors) = self.run(data);
        if valid {
            Ok(())
        } else {
            Err(ValidationError { errors })
        }
    }

    pub(crate) fn run(&self, data: &mut Value) -> (bool, Vec<ErrorObject>) {
        let root = self.data_enabled.then(|| data.clone());
        let mut ctx = RuntimeCtx::new(self.all_errors, self.verbose, root);
        let valid = self.node.validate(data, &mut ctx);
        let errors = ctx.errors;
        *self.errors.lock() = if valid { None } else { Some(errors.clone()) };
        (valid, errors)
    }
}
