//! Keyword definitions and the rule registry.
//!
//! The registry keeps three views of the same rule set in sync: a
//! keyword-to-rule map, a known-keyword set (which also records
//! keywords implied via `implements`), and the ordered list of
//! type-bucketed rule groups the compiler iterates.

use crate::compiler::KeywordCtx;
use crate::context::KeywordValidator;
use crate::runtime::ValidateFunction;
use jsv_core::error::{EngineError, Result};
use jsv_core::traits::Logger;
use jsv_core::types::JsonType;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// Compiles a keyword occurrence into a validator node.
pub type CompileFn =
    Arc<dyn Fn(&mut KeywordCtx<'_, '_>) -> Result<Box<dyn KeywordValidator>> + Send + Sync>;

/// Directly validates data against the keyword's schema value,
/// for keywords that do not need a compilation step.
pub type DataValidateFn = Arc<dyn Fn(&Value, &Value) -> bool + Send + Sync>;

/// A keyword definition, as registered through `add_keyword`.
#[derive(Clone, Default)]
pub struct KeywordDefinition {
    /// Data types the keyword applies to; empty means all types.
    pub types: Vec<JsonType>,
    /// Compilation callback producing a validator node.
    pub compile: Option<CompileFn>,
    /// Direct validation function, wrapped in a generic node.
    pub validate: Option<DataValidateFn>,
    /// Schema validated against the keyword's value at compile time.
    pub meta_schema: Option<Value>,
    /// Whether the keyword's value may be a `$data` reference.
    pub data: bool,
    /// Insert this rule immediately ahead of the named keyword in its
    /// groups, instead of appending.
    pub before: Option<String>,
    /// Keywords this definition also handles; they are registered as
    /// known without rules of their own.
    pub implements: Vec<String>,
    /// Whether validators produced by this keyword are asynchronous.
    pub is_async: bool,
}

impl KeywordDefinition {
    /// An annotation-only definition: the keyword is known to the
    /// registry but produces no validation.
    #[must_use]
    pub fn annotation() -> Self {
        Self::default()
    }

    /// A definition with a compile callback applying to `types`.
    pub fn compiled(
        types: Vec<JsonType>,
        compile: impl Fn(&mut KeywordCtx<'_, '_>) -> Result<Box<dyn KeywordValidator>>
            + Send
            + Sync
            + 'static,
    ) -> Self {
        Self {
            types,
            compile: Some(Arc::new(compile)),
            ..Self::default()
        }
    }

    /// Mark the keyword as `$data`-capable.
    #[must_use]
    pub fn with_data(mut self) -> Self {
        self.data = true;
        self
    }

    /// Set the `before` ordering hint.
    #[must_use]
    pub fn with_before(mut self, keyword: &str) -> Self {
        self.before = Some(keyword.to_string());
        self
    }

    /// Set the implied keywords.
    #[must_use]
    pub fn with_implements(mut self, keywords: &[&str]) -> Self {
        self.implements = keywords.iter().map(|k| (*k).to_string()).collect();
        self
    }

    /// Set the keyword's meta-schema.
    #[must_use]
    pub fn with_meta_schema(mut self, meta_schema: Value) -> Self {
        self.meta_schema = Some(meta_schema);
        self
    }
}

/// A `(keyword, definition)` pair plus the compiled meta-schema
/// validator, when the definition carries one.
#[derive(Clone)]
pub struct Rule {
    /// The keyword this rule handles.
    pub keyword: String,
    /// The registered definition.
    pub definition: Arc<KeywordDefinition>,
    /// Validator for the keyword's value, compiled from
    /// `definition.meta_schema`.
    pub(crate) schema_validator: Option<Arc<ValidateFunction>>,
}

/// An ordered list of rules applying to one data type (or to all, for
/// `jtype: None`).
pub struct RuleGroup {
    /// The data type gating this group, if any.
    pub jtype: Option<JsonType>,
    /// Rules in evaluation order.
    pub rules: Vec<Rule>,
}

// Case-insensitive, as the camelCase draft keywords require.
static KEYWORD_NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^[a-z_$][a-z0-9_$-]*$").expect("keyword name pattern compiles"));

/// The three synchronized indices over the rule set.
#[derive(Default)]
pub struct RuleRegistry {
    all: HashMap<String, Rule>,
    keywords: HashSet<String>,
    groups: Vec<RuleGroup>,
}

impl RuleRegistry {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Whether `keyword` is known, including keywords only implied via
    /// `implements`.
    #[must_use]
    pub fn contains(&self, keyword: &str) -> bool {
        self.keywords.contains(keyword)
    }

    /// Look up the rule registered for `keyword`.
    #[must_use]
    pub fn get(&self, keyword: &str) -> Option<&Rule> {
        self.all.get(keyword)
    }

    /// The rule groups in evaluation order.
    #[must_use]
    pub fn groups(&self) -> &[RuleGroup] {
        &self.groups
    }

    /// Register `definition` under `keyword`.
    ///
    /// # Errors
    ///
    /// Fails on an invalid or duplicate keyword name, or on a `$data`
    /// definition with no way to validate.
    pub(crate) fn add(
        &mut self,
        keyword: &str,
        definition: KeywordDefinition,
        schema_validator: Option<Arc<ValidateFunction>>,
        logger: &dyn Logger,
    ) -> Result<()> {
        if !KEYWORD_NAME.is_match(keyword) {
            return Err(EngineError::InvalidKeywordName {
                keyword: keyword.to_string(),
            });
        }
        if self.keywords.contains(keyword) {
            return Err(EngineError::DuplicateKeyword {
                keyword: keyword.to_string(),
            });
        }
        if definition.data && definition.compile.is_none() && definition.validate.is_none() {
            return Err(EngineError::InvalidDataKeyword {
                keyword: keyword.to_string(),
            });
        }

        let implied = definition.implements.clone();
        let rule = Rule {
            keyword: keyword.to_string(),
            definition: Arc::new(definition),
            schema_validator,
        };

        if rule.definition.types.is_empty() {
            self.insert_into_group(None, rule.clone(), logger);
        } else {
            for jtype in rule.definition.types.clone() {
                self.insert_into_group(Some(jtype), rule.clone(), logger);
            }
        }

        self.keywords.insert(keyword.to_string());
        self.all.insert(keyword.to_string(), rule);

        for implied_keyword in implied {
            if !self.keywords.contains(&implied_keyword) {
                self.keywords.insert(implied_keyword);
            }
        }
        Ok(())
    }

    fn insert_into_group(&mut self, jtype: Option<JsonType>, rule: Rule, logger: &dyn Logger) {
        let group = match self.groups.iter_mut().find(|g| g.jtype == jtype) {
            Some(group) => group,
            None => {
                self.groups.push(RuleGroup {
                    jtype,
                    rules: Vec::new(),
                });
                self.groups.last_mut().expect("group was just pushed")
            }
        };
        if let Some(before) = &rule.definition.before {
            if let Some(pos) = group.rules.iter().position(|r| &r.keyword == before) {
                group.rules.insert(pos, rule);
                return;
            }
            logger.warn(&format!(
                "rule \"{before}\" is not defined; keyword \"{}\" appended to its group",
                rule.keyword
            ));
        }
        group.rules.push(rule);
    }

    /// Unlink `keyword` from all three indices.
    pub(crate) fn remove(&mut self, keyword: &str) {
        self.keywords.remove(keyword);
        self.all.remove(keyword);
        for group in &mut self.groups {
            group.rules.retain(|r| r.keyword != keyword);
        }
    }
}
