//! Validation vocabulary: value constraints that do not apply
//! subschemas.
//!
//! `type` and `nullable` are registered here but compiled by the
//! compiler itself, ahead of every rule group, so coercion happens
//! before typed keywords run.

use crate::cache::canonical_serialize;
use crate::compiler::KeywordCtx;
use crate::context::{DataRef, ErrorInfo, KeywordValidator, RuntimeCtx, SchemaArg};
use crate::rules::KeywordDefinition;
use jsv_core::error::Result;
use jsv_core::types::JsonType;
use regex::Regex;
use serde_json::{json, Value};
use std::collections::HashSet;
use std::sync::Arc;

pub(crate) fn vocabulary() -> Vec<(&'static str, KeywordDefinition)> {
    use JsonType::{Array, Number, Object, String};
    vec![
        ("type", KeywordDefinition::annotation()),
        ("nullable", KeywordDefinition::annotation()),
        ("enum", KeywordDefinition::compiled(vec![], compile_enum).with_data()),
        ("const", KeywordDefinition::compiled(vec![], compile_const).with_data()),
        (
            "maximum",
            KeywordDefinition::compiled(vec![Number], compile_maximum).with_data(),
        ),
        (
            "minimum",
            KeywordDefinition::compiled(vec![Number], compile_minimum).with_data(),
        ),
        (
            "exclusiveMaximum",
            KeywordDefinition::compiled(vec![Number], compile_exclusive_maximum).with_data(),
        ),
        (
            "exclusiveMinimum",
            KeywordDefinition::compiled(vec![Number], compile_exclusive_minimum).with_data(),
        ),
        (
            "multipleOf",
            KeywordDefinition::compiled(vec![Number], compile_multiple_of).with_data(),
        ),
        (
            "maxLength",
            KeywordDefinition::compiled(vec![String], compile_max_length).with_data(),
        ),
        (
            "minLength",
            KeywordDefinition::compiled(vec![String], compile_min_length).with_data(),
        ),
        (
            "pattern",
            KeywordDefinition::compiled(vec![String], compile_pattern).with_data(),
        ),
        (
            "maxItems",
            KeywordDefinition::compiled(vec![Array], compile_max_items).with_data(),
        ),
        (
            "minItems",
            KeywordDefinition::compiled(vec![Array], compile_min_items).with_data(),
        ),
        (
            "uniqueItems",
            KeywordDefinition::compiled(vec![Array], compile_unique_items).with_data(),
        ),
        (
            "maxProperties",
            KeywordDefinition::compiled(vec![Object], compile_max_properties).with_data(),
        ),
        (
            "minProperties",
            KeywordDefinition::compiled(vec![Object], compile_min_properties).with_data(),
        ),
        (
            "required",
            KeywordDefinition::compiled(vec![Object], compile_required).with_data(),
        ),
    ]
}

fn compile_maximum(ctx: &mut KeywordCtx<'_, '_>) -> Result<Box<dyn KeywordValidator>> {
    compile_limit(ctx, CmpOp::Le)
}

fn compile_minimum(ctx: &mut KeywordCtx<'_, '_>) -> Result<Box<dyn KeywordValidator>> {
    compile_limit(ctx, CmpOp::Ge)
}

fn compile_exclusive_maximum(ctx: &mut KeywordCtx<'_, '_>) -> Result<Box<dyn KeywordValidator>> {
    compile_limit(ctx, CmpOp::Lt)
}

fn compile_exclusive_minimum(ctx: &mut KeywordCtx<'_, '_>) -> Result<Box<dyn KeywordValidator>> {
    compile_limit(ctx, CmpOp::Gt)
}

fn compile_max_length(ctx: &mut KeywordCtx<'_, '_>) -> Result<Box<dyn KeywordValidator>> {
    compile_count(ctx, CountKind::Length, true)
}

fn compile_min_length(ctx: &mut KeywordCtx<'_, '_>) -> Result<Box<dyn KeywordValidator>> {
    compile_count(ctx, CountKind::Length, false)
}

fn compile_max_items(ctx: &mut KeywordCtx<'_, '_>) -> Result<Box<dyn KeywordValidator>> {
    compile_count(ctx, CountKind::Items, true)
}

fn compile_min_items(ctx: &mut KeywordCtx<'_, '_>) -> Result<Box<dyn KeywordValidator>> {
    compile_count(ctx, CountKind::Items, false)
}

fn compile_max_properties(ctx: &mut KeywordCtx<'_, '_>) -> Result<Box<dyn KeywordValidator>> {
    compile_count(ctx, CountKind::Properties, true)
}

fn compile_min_properties(ctx: &mut KeywordCtx<'_, '_>) -> Result<Box<dyn KeywordValidator>> {
    compile_count(ctx, CountKind::Properties, false)
}

/// A number argument: fixed, or read from the data at runtime.
enum NumArg {
    Lit(f64),
    Data(DataRef),
}

impl NumArg {
    fn of(ctx: &KeywordCtx<'_, '_>) -> Result<Self> {
        match ctx.value() {
            SchemaArg::Literal(v) => v
                .as_f64()
                .map(NumArg::Lit)
                .ok_or_else(|| ctx.invalid("value must be a number")),
            SchemaArg::Data(r) => Ok(NumArg::Data(r.clone())),
        }
    }
}

/// Resolve a [`NumArg`]; `Ok(None)` means "no constraint", `Err(())`
/// means the `$data` value had the wrong type and an error was emitted.
fn resolve_num(
    arg: &NumArg,
    info: &ErrorInfo,
    data: &Value,
    ctx: &mut RuntimeCtx,
) -> std::result::Result<Option<f64>, ()> {
    match arg {
        NumArg::Lit(x) => Ok(Some(*x)),
        NumArg::Data(r) => match ctx.resolve_data_ref(r) {
            None => Ok(None),
            Some(v) => match v.as_f64() {
                Some(x) => Ok(Some(x)),
                None => {
                    info.emit(
                        ctx,
                        format!("invalid $data value for \"{}\"", info.keyword),
                        json!({}),
                        data,
                    );
                    Err(())
                }
            },
        },
    }
}

#[derive(Clone, Copy)]
enum CmpOp {
    Le,
    Ge,
    Lt,
    Gt,
}

impl CmpOp {
    fn symbol(self) -> &'static str {
        match self {
            CmpOp::Le => "<=",
            CmpOp::Ge => ">=",
            CmpOp::Lt => "<",
            CmpOp::Gt => ">",
        }
    }

    fn holds(self, x: f64, limit: f64) -> bool {
        match self {
            CmpOp::Le => x <= limit,
            CmpOp::Ge => x >= limit,
            CmpOp::Lt => x < limit,
            CmpOp::Gt => x > limit,
        }
    }
}

struct LimitNode {
    op: CmpOp,
    limit: NumArg,
    info: ErrorInfo,
}

impl KeywordValidator for LimitNode {
    fn validate(&self, data: &mut Value, ctx: &mut RuntimeCtx) -> bool {
        let Some(x) = data.as_f64() else { return true };
        let limit = match resolve_num(&self.limit, &self.info, data, ctx) {
            Ok(Some(limit)) => limit,
            Ok(None) => return true,
            Err(()) => return false,
        };
        if self.op.holds(x, limit) {
            return true;
        }
        self.info.emit(
            ctx,
            format!("should be {} {limit}", self.op.symbol()),
            json!({ "comparison": self.op.symbol(), "limit": limit }),
            data,
        );
        false
    }
}

fn compile_limit(ctx: &mut KeywordCtx<'_, '_>, op: CmpOp) -> Result<Box<dyn KeywordValidator>> {
    Ok(Box::new(LimitNode {
        op,
        limit: NumArg::of(ctx)?,
        info: ctx.error_info(),
    }))
}

struct MultipleOfNode {
    factor: NumArg,
    info: ErrorInfo,
}

impl KeywordValidator for MultipleOfNode {
    fn validate(&self, data: &mut Value, ctx: &mut RuntimeCtx) -> bool {
        let Some(x) = data.as_f64() else { return true };
        let factor = match resolve_num(&self.factor, &self.info, data, ctx) {
            Ok(Some(f)) => f,
            Ok(None) => return true,
            Err(()) => return false,
        };
        let quotient = x / factor;
        if quotient.is_finite() && quotient.fract() == 0.0 {
            return true;
        }
        self.info.emit(
            ctx,
            format!("should be multiple of {factor}"),
            json!({ "multipleOf": factor }),
            data,
        );
        false
    }
}

fn compile_multiple_of(ctx: &mut KeywordCtx<'_, '_>) -> Result<Box<dyn KeywordValidator>> {
    if let Some(v) = ctx.literal() {
        if !v.as_f64().is_some_and(|f| f > 0.0) {
            return Err(ctx.invalid("value must be a positive number"));
        }
    }
    Ok(Box::new(MultipleOfNode {
        factor: NumArg::of(ctx)?,
        info: ctx.error_info(),
    }))
}

/// A non-negative integer argument.
enum UintArg {
    Lit(usize),
    Data(DataRef),
}

impl UintArg {
    fn of(ctx: &KeywordCtx<'_, '_>) -> Result<Self> {
        match ctx.value() {
            SchemaArg::Literal(v) => v
                .as_u64()
                .map(|n| UintArg::Lit(n as usize))
                .ok_or_else(|| ctx.invalid("value must be a non-negative integer")),
            SchemaArg::Data(r) => Ok(UintArg::Data(r.clone())),
        }
    }
}

#[derive(Clone, Copy)]
enum CountKind {
    Length,
    Items,
    Properties,
}

impl CountKind {
    fn count(self, data: &Value) -> Option<usize> {
        match (self, data) {
            (CountKind::Length, Value::String(s)) => Some(s.chars().count()),
            (CountKind::Items, Value::Array(items)) => Some(items.len()),
            (CountKind::Properties, Value::Object(map)) => Some(map.len()),
            _ => None,
        }
    }

    fn message(self, max: bool, limit: usize) -> String {
        match self {
            CountKind::Length if max => format!("should NOT be longer than {limit} characters"),
            CountKind::Length => format!("should NOT be shorter than {limit} characters"),
            CountKind::Items if max => format!("should NOT have more than {limit} items"),
            CountKind::Items => format!("should NOT have fewer than {limit} items"),
            CountKind::Properties if max => format!("should NOT have more than {limit} properties"),
            CountKind::Properties => format!("should NOT have fewer than {limit} properties"),
        }
    }
}

struct CountLimitNode {
    kind: CountKind,
    max: bool,
    limit: UintArg,
    info: ErrorInfo,
}

impl KeywordValidator for CountLimitNode {
    fn validate(&self, data: &mut Value, ctx: &mut RuntimeCtx) -> bool {
        let Some(count) = self.kind.count(data) else {
            return true;
        };
        let limit = match &self.limit {
            UintArg::Lit(n) => *n,
            UintArg::Data(r) => match ctx.resolve_data_ref(r) {
                None => return true,
                Some(v) => match v.as_u64() {
                    Some(n) => n as usize,
                    None => {
                        self.info.emit(
                            ctx,
                            format!("invalid $data value for \"{}\"", self.info.keyword),
                            json!({}),
                            data,
                        );
                        return false;
                    }
                },
            },
        };
        let ok = if self.max { count <= limit } else { count >= limit };
        if ok {
            return true;
        }
        self.info.emit(
            ctx,
            self.kind.message(self.max, limit),
            json!({ "limit": limit }),
            data,
        );
        false
    }
}

fn compile_count(
    ctx: &mut KeywordCtx<'_, '_>,
    kind: CountKind,
    max: bool,
) -> Result<Box<dyn KeywordValidator>> {
    Ok(Box::new(CountLimitNode {
        kind,
        max,
        limit: UintArg::of(ctx)?,
        info: ctx.error_info(),
    }))
}

enum PatternArg {
    Lit(Regex, String),
    Data(DataRef),
}

struct PatternNode {
    pattern: PatternArg,
    info: ErrorInfo,
}

impl KeywordValidator for PatternNode {
    fn validate(&self, data: &mut Value, ctx: &mut RuntimeCtx) -> bool {
        let Some(s) = data.as_str() else { return true };
        let (matched, source) = match &self.pattern {
            PatternArg::Lit(re, source) => (re.is_match(s), source.clone()),
            PatternArg::Data(r) => match ctx.resolve_data_ref(r) {
                None => return true,
                Some(Value::String(source)) => match Regex::new(&source) {
                    Ok(re) => (re.is_match(s), source),
                    Err(_) => {
                        self.info.emit(
                            ctx,
                            format!("invalid $data value for \"{}\"", self.info.keyword),
                            json!({}),
                            data,
                        );
                        return false;
                    }
                },
                Some(_) => {
                    self.info.emit(
                        ctx,
                        format!("invalid $data value for \"{}\"", self.info.keyword),
                        json!({}),
                        data,
                    );
                    return false;
                }
            },
        };
        if matched {
            return true;
        }
        self.info.emit(
            ctx,
            format!("should match pattern \"{source}\""),
            json!({ "pattern": source }),
            data,
        );
        false
    }
}

fn compile_pattern(ctx: &mut KeywordCtx<'_, '_>) -> Result<Box<dyn KeywordValidator>> {
    let pattern = match ctx.value() {
        SchemaArg::Literal(v) => {
            let source = v
                .as_str()
                .ok_or_else(|| ctx.invalid("value must be a string"))?;
            let re = Regex::new(source)
                .map_err(|e| ctx.invalid(format!("pattern does not compile: {e}")))?;
            PatternArg::Lit(re, source.to_string())
        }
        SchemaArg::Data(r) => PatternArg::Data(r.clone()),
    };
    Ok(Box::new(PatternNode {
        pattern,
        info: ctx.error_info(),
    }))
}

enum RequiredArg {
    Lit(Vec<String>),
    Data(DataRef),
}

struct RequiredNode {
    names: RequiredArg,
    info: ErrorInfo,
}

impl RequiredNode {
    fn check(
        &self,
        names: &[String],
        data: &Value,
        ctx: &mut RuntimeCtx,
    ) -> bool {
        let Value::Object(map) = data else { return true };
        let mut valid = true;
        for name in names {
            if map.contains_key(name) {
                continue;
            }
            self.info.emit(
                ctx,
                format!("should have required property '{name}'"),
                json!({ "missingProperty": name }),
                data,
            );
            valid = false;
            if !ctx.all_errors() {
                return false;
            }
        }
        valid
    }
}

impl KeywordValidator for RequiredNode {
    fn validate(&self, data: &mut Value, ctx: &mut RuntimeCtx) -> bool {
        match &self.names {
            RequiredArg::Lit(names) => self.check(names, data, ctx),
            RequiredArg::Data(r) => match ctx.resolve_data_ref(r) {
                None => true,
                Some(Value::Array(items)) => {
                    let mut names = Vec::with_capacity(items.len());
                    for item in items {
                        match item {
                            Value::String(s) => names.push(s),
                            _ => {
                                self.info.emit(
                                    ctx,
                                    format!("invalid $data value for \"{}\"", self.info.keyword),
                                    json!({}),
                                    data,
                                );
                                return false;
                            }
                        }
                    }
                    self.check(&names, data, ctx)
                }
                Some(_) => {
                    self.info.emit(
                        ctx,
                        format!("invalid $data value for \"{}\"", self.info.keyword),
                        json!({}),
                        data,
                    );
                    false
                }
            },
        }
    }
}

fn compile_required(ctx: &mut KeywordCtx<'_, '_>) -> Result<Box<dyn KeywordValidator>> {
    let names = match ctx.value() {
        SchemaArg::Literal(Value::Array(items)) => {
            let mut names = Vec::with_capacity(items.len());
            for item in items {
                let name = item
                    .as_str()
                    .ok_or_else(|| ctx.invalid("entries must be strings"))?;
                if !names.contains(&name.to_string()) {
                    names.push(name.to_string());
                }
            }
            // Above the loop threshold a set lookup would be used by a
            // code-emitting backend; the tree interpreter only needs
            // the deduplicated list.
            let _ = ctx.options().loop_required;
            RequiredArg::Lit(names)
        }
        SchemaArg::Literal(_) => return Err(ctx.invalid("value must be an array of strings")),
        SchemaArg::Data(r) => RequiredArg::Data(r.clone()),
    };
    Ok(Box::new(RequiredNode {
        names,
        info: ctx.error_info(),
    }))
}

enum EnumArg {
    Lit {
        values: Arc<Vec<Value>>,
        /// Canonical serializations, precomputed above the `loop_enum`
        /// threshold.
        hashed: Option<HashSet<String>>,
    },
    Data(DataRef),
}

struct EnumNode {
    arg: EnumArg,
    info: ErrorInfo,
}

impl KeywordValidator for EnumNode {
    fn validate(&self, data: &mut Value, ctx: &mut RuntimeCtx) -> bool {
        let allowed = match &self.arg {
            EnumArg::Lit { values, hashed } => {
                let found = match hashed {
                    Some(set) => set.contains(&canonical_serialize(data)),
                    None => values.iter().any(|v| v == &*data),
                };
                if found {
                    return true;
                }
                Value::Array(values.as_ref().clone())
            }
            EnumArg::Data(r) => match ctx.resolve_data_ref(r) {
                None => return true,
                Some(Value::Array(items)) => {
                    if items.iter().any(|v| v == &*data) {
                        return true;
                    }
                    Value::Array(items)
                }
                Some(_) => {
                    self.info.emit(
                        ctx,
                        format!("invalid $data value for \"{}\"", self.info.keyword),
                        json!({}),
                        data,
                    );
                    return false;
                }
            },
        };
        self.info.emit(
            ctx,
            "should be equal to one of the allowed values".to_string(),
            json!({ "allowedValues": allowed }),
            data,
        );
        false
    }
}

fn compile_enum(ctx: &mut KeywordCtx<'_, '_>) -> Result<Box<dyn KeywordValidator>> {
    let arg = match ctx.value() {
        SchemaArg::Literal(Value::Array(items)) => {
            if items.is_empty() {
                return Err(ctx.invalid("value must be a non-empty array"));
            }
            let hashed = (items.len() >= ctx.options().loop_enum)
                .then(|| items.iter().map(canonical_serialize).collect());
            EnumArg::Lit {
                values: Arc::new(items.clone()),
                hashed,
            }
        }
        SchemaArg::Literal(_) => return Err(ctx.invalid("value must be a non-empty array")),
        SchemaArg::Data(r) => EnumArg::Data(r.clone()),
    };
    Ok(Box::new(EnumNode {
        arg,
        info: ctx.error_info(),
    }))
}

struct ConstNode {
    value: SchemaArg,
    info: ErrorInfo,
}

impl KeywordValidator for ConstNode {
    fn validate(&self, data: &mut Value, ctx: &mut RuntimeCtx) -> bool {
        let resolved;
        let expected = match &self.value {
            SchemaArg::Literal(v) => v,
            SchemaArg::Data(r) => match ctx.resolve_data_ref(r) {
                None => return true,
                Some(v) => {
                    resolved = v;
                    &resolved
                }
            },
        };
        if expected == &*data {
            return true;
        }
        self.info.emit(
            ctx,
            "should be equal to constant".to_string(),
            json!({ "allowedValue": expected }),
            data,
        );
        false
    }
}

fn compile_const(ctx: &mut KeywordCtx<'_, '_>) -> Result<Box<dyn KeywordValidator>> {
    Ok(Box::new(ConstNode {
        value: ctx.value().clone(),
        info: ctx.error_info(),
    }))
}

enum BoolArg {
    Lit(bool),
    Data(DataRef),
}

struct UniqueItemsNode {
    enabled: BoolArg,
    info: ErrorInfo,
}

impl KeywordValidator for UniqueItemsNode {
    fn validate(&self, data: &mut Value, ctx: &mut RuntimeCtx) -> bool {
        let enabled = match &self.enabled {
            BoolArg::Lit(b) => *b,
            BoolArg::Data(r) => match ctx.resolve_data_ref(r) {
                None => return true,
                Some(Value::Bool(b)) => b,
                Some(_) => {
                    self.info.emit(
                        ctx,
                        format!("invalid $data value for \"{}\"", self.info.keyword),
                        json!({}),
                        data,
                    );
                    return false;
                }
            },
        };
        if !enabled {
            return true;
        }
        let duplicate = {
            let Value::Array(items) = &*data else {
                return true;
            };
            let mut seen: std::collections::HashMap<String, usize> = std::collections::HashMap::new();
            let mut found = None;
            for (i, item) in items.iter().enumerate() {
                if let Some(j) = seen.insert(canonical_serialize(item), i) {
                    found = Some((j, i));
                    break;
                }
            }
            found
        };
        let Some((j, i)) = duplicate else { return true };
        self.info.emit(
            ctx,
            format!("should NOT have duplicate items (items ## {j} and {i} are identical)"),
            json!({ "i": i, "j": j }),
            data,
        );
        false
    }
}

fn compile_unique_items(ctx: &mut KeywordCtx<'_, '_>) -> Result<Box<dyn KeywordValidator>> {
    let enabled = match ctx.value() {
        SchemaArg::Literal(Value::Bool(b)) => BoolArg::Lit(*b),
        SchemaArg::Literal(_) => return Err(ctx.invalid("value must be a boolean")),
        SchemaArg::Data(r) => BoolArg::Data(r.clone()),
    };
    Ok(Box::new(UniqueItemsNode {
        enabled,
        info: ctx.error_info(),
    }))
}
