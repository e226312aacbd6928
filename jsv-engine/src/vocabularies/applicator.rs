//! Applicator vocabulary: keywords that apply subschemas to parts of
//! the data (or to the data itself, for the boolean combinators).
//!
//! `additionalProperties` is registered with `before: "properties"` so
//! that property stripping under `remove_additional` happens before
//! the declared properties are validated. `items` implements
//! `additionalItems`; `if` implements `then` and `else`.

use crate::compiler::{KeywordCtx, SchemaNode};
use crate::context::{ErrorInfo, KeywordValidator, RuntimeCtx};
use crate::rules::KeywordDefinition;
use jsv_core::error::Result;
use jsv_core::types::JsonType;
use regex::Regex;
use serde_json::{json, Value};
use std::collections::HashSet;

pub(crate) fn vocabulary() -> Vec<(&'static str, KeywordDefinition)> {
    use JsonType::{Array, Object};
    vec![
        (
            "propertyNames",
            KeywordDefinition::compiled(vec![Object], compile_property_names),
        ),
        (
            "dependencies",
            KeywordDefinition::compiled(vec![Object], compile_dependencies),
        ),
        (
            "properties",
            KeywordDefinition::compiled(vec![Object], compile_properties),
        ),
        (
            "patternProperties",
            KeywordDefinition::compiled(vec![Object], compile_pattern_properties),
        ),
        (
            "additionalProperties",
            KeywordDefinition::compiled(vec![Object], compile_additional_properties)
                .with_before("properties"),
        ),
        (
            "items",
            KeywordDefinition::compiled(vec![Array], compile_items)
                .with_implements(&["additionalItems"]),
        ),
        (
            "contains",
            KeywordDefinition::compiled(vec![Array], compile_contains),
        ),
        ("allOf", KeywordDefinition::compiled(vec![], compile_all_of)),
        ("anyOf", KeywordDefinition::compiled(vec![], compile_any_of)),
        ("oneOf", KeywordDefinition::compiled(vec![], compile_one_of)),
        ("not", KeywordDefinition::compiled(vec![], compile_not)),
        (
            "if",
            KeywordDefinition::compiled(vec![], compile_if).with_implements(&["then", "else"]),
        ),
    ]
}

struct PropEntry {
    name: String,
    default: Option<Value>,
    node: SchemaNode,
}

struct PropertiesNode {
    entries: Vec<PropEntry>,
}

impl KeywordValidator for PropertiesNode {
    fn validate(&self, data: &mut Value, ctx: &mut RuntimeCtx) -> bool {
        let Value::Object(map) = data else { return true };
        for entry in &self.entries {
            if let Some(default) = &entry.default {
                if !map.contains_key(&entry.name) {
                    map.insert(entry.name.clone(), default.clone());
                }
            }
        }
        let mut valid = true;
        for entry in &self.entries {
            let Some(child) = map.get_mut(&entry.name) else {
                continue;
            };
            ctx.push_property(&entry.name);
            let ok = entry.node.validate(child, ctx);
            ctx.pop();
            if !ok {
                valid = false;
                if !ctx.all_errors() {
                    return false;
                }
            }
        }
        valid
    }
}

fn compile_properties(ctx: &mut KeywordCtx<'_, '_>) -> Result<Box<dyn KeywordValidator>> {
    let Some(Value::Object(props)) = ctx.literal() else {
        return Err(ctx.invalid("value must be an object"));
    };
    let inject_defaults = ctx.options().use_defaults && !ctx.in_composite();
    let mut entries = Vec::with_capacity(props.len());
    for (name, sub) in props {
        let default = if inject_defaults {
            sub.get("default").cloned()
        } else {
            None
        };
        entries.push(PropEntry {
            name: name.clone(),
            default,
            node: ctx.apply_subschema(sub, &["properties", name])?,
        });
    }
    Ok(Box::new(PropertiesNode { entries }))
}

struct PatternPropertiesNode {
    patterns: Vec<(Regex, SchemaNode)>,
}

impl KeywordValidator for PatternPropertiesNode {
    fn validate(&self, data: &mut Value, ctx: &mut RuntimeCtx) -> bool {
        let mut valid = true;
        for (regex, node) in &self.patterns {
            let keys: Vec<String> = match &*data {
                Value::Object(map) => map
                    .keys()
                    .filter(|k| regex.is_match(k))
                    .cloned()
                    .collect(),
                _ => return true,
            };
            for key in keys {
                let Value::Object(map) = data else { return valid };
                let Some(child) = map.get_mut(&key) else {
                    continue;
                };
                ctx.push_property(&key);
                let ok = node.validate(child, ctx);
                ctx.pop();
                if !ok {
                    valid = false;
                    if !ctx.all_errors() {
                        return false;
                    }
                }
            }
        }
        valid
    }
}

fn compile_pattern_properties(ctx: &mut KeywordCtx<'_, '_>) -> Result<Box<dyn KeywordValidator>> {
    let Some(Value::Object(props)) = ctx.literal() else {
        return Err(ctx.invalid("value must be an object"));
    };
    let mut patterns = Vec::with_capacity(props.len());
    for (source, sub) in props {
        let regex = Regex::new(source)
            .map_err(|e| ctx.invalid(format!("pattern \"{source}\" does not compile: {e}")))?;
        patterns.push((regex, ctx.apply_subschema(sub, &["patternProperties", source])?));
    }
    Ok(Box::new(PatternPropertiesNode { patterns }))
}

enum AdditionalMode {
    Forbid,
    Schema(SchemaNode),
}

struct AdditionalPropertiesNode {
    declared: HashSet<String>,
    patterns: Vec<Regex>,
    mode: AdditionalMode,
    remove: bool,
    info: ErrorInfo,
}

impl AdditionalPropertiesNode {
    fn extra_keys(&self, data: &Value) -> Option<Vec<String>> {
        match data {
            Value::Object(map) => Some(
                map.keys()
                    .filter(|k| {
                        !self.declared.contains(*k) && !self.patterns.iter().any(|re| re.is_match(k))
                    })
                    .cloned()
                    .collect(),
            ),
            _ => None,
        }
    }
}

impl KeywordValidator for AdditionalPropertiesNode {
    fn validate(&self, data: &mut Value, ctx: &mut RuntimeCtx) -> bool {
        let Some(extra) = self.extra_keys(data) else {
            return true;
        };
        let mut valid = true;
        for key in extra {
            match &self.mode {
                AdditionalMode::Forbid => {
                    if self.remove {
                        if let Value::Object(map) = data {
                            map.remove(&key);
                        }
                        continue;
                    }
                    self.info.emit(
                        ctx,
                        "should NOT have additional properties".to_string(),
                        json!({ "additionalProperty": key }),
                        data,
                    );
                    valid = false;
                    if !ctx.all_errors() {
                        return false;
                    }
                }
                AdditionalMode::Schema(node) => {
                    let mark = ctx.mark();
                    ctx.push_property(&key);
                    let ok = match data {
                        Value::Object(map) => match map.get_mut(&key) {
                            Some(child) => node.validate(child, ctx),
                            None => true,
                        },
                        _ => true,
                    };
                    ctx.pop();
                    if !ok {
                        if self.remove {
                            ctx.truncate_errors(mark);
                            if let Value::Object(map) = data {
                                map.remove(&key);
                            }
                        } else {
                            valid = false;
                            if !ctx.all_errors() {
                                return false;
                            }
                        }
                    }
                }
            }
        }
        valid
    }
}

fn compile_additional_properties(
    ctx: &mut KeywordCtx<'_, '_>,
) -> Result<Box<dyn KeywordValidator>> {
    let raw = ctx
        .literal()
        .ok_or_else(|| ctx.invalid("value must be a schema or boolean"))?
        .clone();
    let mode = match &raw {
        Value::Bool(true) => return Ok(Box::new(PassNode)),
        Value::Bool(false) => AdditionalMode::Forbid,
        Value::Object(_) => {
            AdditionalMode::Schema(ctx.apply_subschema(&raw, &["additionalProperties"])?)
        }
        _ => return Err(ctx.invalid("value must be a schema or boolean")),
    };
    let declared: HashSet<String> = match ctx.parent().get("properties") {
        Some(Value::Object(props)) => props.keys().cloned().collect(),
        _ => HashSet::new(),
    };
    let mut patterns = Vec::new();
    if let Some(Value::Object(props)) = ctx.parent().get("patternProperties") {
        for source in props.keys() {
            patterns.push(
                Regex::new(source)
                    .map_err(|e| ctx.invalid(format!("pattern \"{source}\" does not compile: {e}")))?,
            );
        }
    }
    Ok(Box::new(AdditionalPropertiesNode {
        declared,
        patterns,
        mode,
        remove: ctx.options().remove_additional,
        info: ctx.error_info(),
    }))
}

/// No-op node for keyword values that impose no constraint
/// (e.g. `additionalProperties: true`).
struct PassNode;

impl KeywordValidator for PassNode {
    fn validate(&self, _data: &mut Value, _ctx: &mut RuntimeCtx) -> bool {
        true
    }
}

struct PropertyNamesNode {
    node: SchemaNode,
    info: ErrorInfo,
}

impl KeywordValidator for PropertyNamesNode {
    fn validate(&self, data: &mut Value, ctx: &mut RuntimeCtx) -> bool {
        let keys: Vec<String> = match &*data {
            Value::Object(map) => map.keys().cloned().collect(),
            _ => return true,
        };
        let mut valid = true;
        for key in keys {
            let mut name = Value::String(key.clone());
            if self.node.validate(&mut name, ctx) {
                continue;
            }
            self.info.emit(
                ctx,
                format!("property name '{key}' is invalid"),
                json!({ "propertyName": key }),
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

fn compile_property_names(ctx: &mut KeywordCtx<'_, '_>) -> Result<Box<dyn KeywordValidator>> {
    let raw = ctx
        .literal()
        .ok_or_else(|| ctx.invalid("value must be a schema"))?
        .clone();
    Ok(Box::new(PropertyNamesNode {
        node: ctx.apply_subschema(&raw, &["propertyNames"])?,
        info: ctx.error_info(),
    }))
}

enum Dependency {
    Props(Vec<String>),
    Schema(SchemaNode),
}

struct DependenciesNode {
    deps: Vec<(String, Dependency)>,
    info: ErrorInfo,
}

impl KeywordValidator for DependenciesNode {
    fn validate(&self, data: &mut Value, ctx: &mut RuntimeCtx) -> bool {
        let mut valid = true;
        for (property, dependency) in &self.deps {
            let present = matches!(&*data, Value::Object(map) if map.contains_key(property));
            if !present {
                continue;
            }
            match dependency {
                Dependency::Props(required) => {
                    let missing: Vec<&String> = match &*data {
                        Value::Object(map) => {
                            required.iter().filter(|p| !map.contains_key(*p)).collect()
                        }
                        _ => Vec::new(),
                    };
                    for name in missing {
                        let deps = required.join(", ");
                        let plural = if required.len() == 1 {
                            "property"
                        } else {
                            "properties"
                        };
                        self.info.emit(
                            ctx,
                            format!(
                                "should have {plural} {deps} when property {property} is present"
                            ),
                            json!({
                                "property": property,
                                "missingProperty": name,
                                "depsCount": required.len(),
                                "deps": deps,
                            }),
                            data,
                        );
                        valid = false;
                        if !ctx.all_errors() {
                            return false;
                        }
                    }
                }
                Dependency::Schema(node) => {
                    if !node.validate(data, ctx) {
                        valid = false;
                        if !ctx.all_errors() {
                            return false;
                        }
                    }
                }
            }
        }
        valid
    }
}

fn compile_dependencies(ctx: &mut KeywordCtx<'_, '_>) -> Result<Box<dyn KeywordValidator>> {
    let Some(Value::Object(map)) = ctx.literal() else {
        return Err(ctx.invalid("value must be an object"));
    };
    let map = map.clone();
    let mut deps = Vec::with_capacity(map.len());
    for (property, dependency) in &map {
        let compiled = match dependency {
            Value::Array(items) => {
                let mut names = Vec::with_capacity(items.len());
                for item in items {
                    names.push(
                        item.as_str()
                            .ok_or_else(|| ctx.invalid("property dependencies must be strings"))?
                            .to_string(),
                    );
                }
                Dependency::Props(names)
            }
            Value::Object(_) | Value::Bool(_) => {
                Dependency::Schema(ctx.apply_subschema(dependency, &["dependencies", property])?)
            }
            _ => return Err(ctx.invalid("dependency must be an array or a schema")),
        };
        deps.push((property.clone(), compiled));
    }
    Ok(Box::new(DependenciesNode {
        deps,
        info: ctx.error_info(),
    }))
}

enum TupleRest {
    Forbid(usize),
    Schema(SchemaNode),
}

enum ItemsNode {
    Every(SchemaNode),
    Tuple {
        nodes: Vec<SchemaNode>,
        rest: Option<TupleRest>,
        info: ErrorInfo,
    },
}

impl KeywordValidator for ItemsNode {
    fn validate(&self, data: &mut Value, ctx: &mut RuntimeCtx) -> bool {
        let Value::Array(items) = data else { return true };
        let mut valid = true;
        match self {
            ItemsNode::Every(node) => {
                for i in 0..items.len() {
                    ctx.push_index(i);
                    let ok = node.validate(&mut items[i], ctx);
                    ctx.pop();
                    if !ok {
                        valid = false;
                        if !ctx.all_errors() {
                            return false;
                        }
                    }
                }
            }
            ItemsNode::Tuple { nodes, rest, info } => {
                for (i, node) in nodes.iter().enumerate() {
                    if i >= items.len() {
                        break;
                    }
                    ctx.push_index(i);
                    let ok = node.validate(&mut items[i], ctx);
                    ctx.pop();
                    if !ok {
                        valid = false;
                        if !ctx.all_errors() {
                            return false;
                        }
                    }
                }
                let len = items.len();
                match rest {
                    None => {}
                    Some(TupleRest::Forbid(limit)) => {
                        if len > *limit {
                            let limit = *limit;
                            info.emit(
                                ctx,
                                format!("should NOT have more than {limit} items"),
                                json!({ "limit": limit }),
                                data,
                            );
                            return false;
                        }
                    }
                    Some(TupleRest::Schema(node)) => {
                        for i in nodes.len()..items.len() {
                            ctx.push_index(i);
                            let ok = node.validate(&mut items[i], ctx);
                            ctx.pop();
                            if !ok {
                                valid = false;
                                if !ctx.all_errors() {
                                    return false;
                                }
                            }
                        }
                    }
                }
            }
        }
        valid
    }
}

fn compile_items(ctx: &mut KeywordCtx<'_, '_>) -> Result<Box<dyn KeywordValidator>> {
    let raw = ctx
        .literal()
        .ok_or_else(|| ctx.invalid("value must be a schema or array of schemas"))?
        .clone();
    match &raw {
        Value::Array(subs) => {
            let mut nodes = Vec::with_capacity(subs.len());
            for (i, sub) in subs.iter().enumerate() {
                nodes.push(ctx.apply_subschema(sub, &["items", &i.to_string()])?);
            }
            let rest = match ctx.parent().get("additionalItems") {
                None | Some(Value::Bool(true)) => None,
                Some(Value::Bool(false)) => Some(TupleRest::Forbid(nodes.len())),
                Some(sub @ (Value::Object(_) | Value::Bool(_))) => {
                    Some(TupleRest::Schema(ctx.apply_subschema(sub, &["additionalItems"])?))
                }
                Some(_) => return Err(ctx.invalid("additionalItems must be a schema or boolean")),
            };
            Ok(Box::new(ItemsNode::Tuple {
                nodes,
                rest,
                info: ctx.error_info(),
            }))
        }
        Value::Object(_) | Value::Bool(_) => Ok(Box::new(ItemsNode::Every(
            ctx.apply_subschema(&raw, &["items"])?,
        ))),
        _ => Err(ctx.invalid("value must be a schema or array of schemas")),
    }
}

struct ContainsNode {
    node: SchemaNode,
    info: ErrorInfo,
}

impl KeywordValidator for ContainsNode {
    fn validate(&self, data: &mut Value, ctx: &mut RuntimeCtx) -> bool {
        let found = {
            let Value::Array(items) = data else { return true };
            let mut found = false;
            for i in 0..items.len() {
                let mark = ctx.mark();
                ctx.push_index(i);
                let ok = self.node.validate(&mut items[i], ctx);
                ctx.pop();
                ctx.truncate_errors(mark);
                if ok {
                    found = true;
                    break;
                }
            }
            found
        };
        if found {
            return true;
        }
        self.info.emit(
            ctx,
            "should contain a valid item".to_string(),
            json!({}),
            data,
        );
        false
    }
}

fn compile_contains(ctx: &mut KeywordCtx<'_, '_>) -> Result<Box<dyn KeywordValidator>> {
    let raw = ctx
        .literal()
        .ok_or_else(|| ctx.invalid("value must be a schema"))?
        .clone();
    Ok(Box::new(ContainsNode {
        node: ctx.apply_branch(&raw, &["contains"])?,
        info: ctx.error_info(),
    }))
}

fn branch_nodes(
    ctx: &mut KeywordCtx<'_, '_>,
    composite: bool,
) -> Result<Vec<SchemaNode>> {
    let Some(Value::Array(subs)) = ctx.literal() else {
        return Err(ctx.invalid("value must be a non-empty array of schemas"));
    };
    if subs.is_empty() {
        return Err(ctx.invalid("value must be a non-empty array of schemas"));
    }
    let keyword = ctx.keyword().to_string();
    let subs = subs.clone();
    let mut nodes = Vec::with_capacity(subs.len());
    for (i, sub) in subs.iter().enumerate() {
        let index = i.to_string();
        nodes.push(if composite {
            ctx.apply_branch(sub, &[&keyword, &index])?
        } else {
            ctx.apply_subschema(sub, &[&keyword, &index])?
        });
    }
    Ok(nodes)
}

struct AllOfNode {
    nodes: Vec<SchemaNode>,
}

impl KeywordValidator for AllOfNode {
    fn validate(&self, data: &mut Value, ctx: &mut RuntimeCtx) -> bool {
        let mut valid = true;
        for node in &self.nodes {
            if !node.validate(data, ctx) {
                valid = false;
                if !ctx.all_errors() {
                    return false;
                }
            }
        }
        valid
    }
}

fn compile_all_of(ctx: &mut KeywordCtx<'_, '_>) -> Result<Box<dyn KeywordValidator>> {
    Ok(Box::new(AllOfNode {
        nodes: branch_nodes(ctx, false)?,
    }))
}

struct AnyOfNode {
    nodes: Vec<SchemaNode>,
    info: ErrorInfo,
}

impl KeywordValidator for AnyOfNode {
    fn validate(&self, data: &mut Value, ctx: &mut RuntimeCtx) -> bool {
        let mark = ctx.mark();
        for node in &self.nodes {
            if node.validate(data, ctx) {
                ctx.truncate_errors(mark);
                return true;
            }
        }
        // Branch errors are speculative either way; only the summary
        // is reported.
        ctx.truncate_errors(mark);
        self.info.emit(
            ctx,
            "should match some schema in anyOf".to_string(),
            json!({}),
            data,
        );
        false
    }
}

fn compile_any_of(ctx: &mut KeywordCtx<'_, '_>) -> Result<Box<dyn KeywordValidator>> {
    Ok(Box::new(AnyOfNode {
        nodes: branch_nodes(ctx, true)?,
        info: ctx.error_info(),
    }))
}

struct OneOfNode {
    nodes: Vec<SchemaNode>,
    info: ErrorInfo,
}

impl KeywordValidator for OneOfNode {
    fn validate(&self, data: &mut Value, ctx: &mut RuntimeCtx) -> bool {
        let mark = ctx.mark();
        let mut passing = Vec::new();
        for (i, node) in self.nodes.iter().enumerate() {
            let branch_mark = ctx.mark();
            if node.validate(data, ctx) {
                passing.push(i);
            }
            ctx.truncate_errors(branch_mark);
        }
        match passing.len() {
            1 => {
                ctx.truncate_errors(mark);
                true
            }
            0 => {
                ctx.truncate_errors(mark);
                self.info.emit(
                    ctx,
                    "should match exactly one schema in oneOf".to_string(),
                    json!({ "passingSchemas": Value::Null }),
                    data,
                );
                false
            }
            _ => {
                ctx.truncate_errors(mark);
                self.info.emit(
                    ctx,
                    "should match exactly one schema in oneOf".to_string(),
                    json!({ "passingSchemas": passing }),
                    data,
                );
                false
            }
        }
    }
}

fn compile_one_of(ctx: &mut KeywordCtx<'_, '_>) -> Result<Box<dyn KeywordValidator>> {
    Ok(Box::new(OneOfNode {
        nodes: branch_nodes(ctx, true)?,
        info: ctx.error_info(),
    }))
}

struct NotNode {
    node: SchemaNode,
    info: ErrorInfo,
}

impl KeywordValidator for NotNode {
    fn validate(&self, data: &mut Value, ctx: &mut RuntimeCtx) -> bool {
        let mark = ctx.mark();
        let inner_valid = self.node.validate(data, ctx);
        ctx.truncate_errors(mark);
        if !inner_valid {
            return true;
        }
        self.info
            .emit(ctx, "should NOT be valid".to_string(), json!({}), data);
        false
    }
}

fn compile_not(ctx: &mut KeywordCtx<'_, '_>) -> Result<Box<dyn KeywordValidator>> {
    let raw = ctx
        .literal()
        .ok_or_else(|| ctx.invalid("value must be a schema"))?
        .clone();
    Ok(Box::new(NotNode {
        node: ctx.apply_branch(&raw, &["not"])?,
        info: ctx.error_info(),
    }))
}

struct IfNode {
    condition: SchemaNode,
    then_branch: Option<SchemaNode>,
    else_branch: Option<SchemaNode>,
    info: ErrorInfo,
}

impl KeywordValidator for IfNode {
    fn validate(&self, data: &mut Value, ctx: &mut RuntimeCtx) -> bool {
        let mark = ctx.mark();
        let matched = self.condition.validate(data, ctx);
        ctx.truncate_errors(mark);
        let (branch, name) = if matched {
            (&self.then_branch, "then")
        } else {
            (&self.else_branch, "else")
        };
        let Some(branch) = branch else { return true };
        if branch.validate(data, ctx) {
            return true;
        }
        self.info.emit(
            ctx,
            format!("should match \"{name}\" schema"),
            json!({ "failingKeyword": name }),
            data,
        );
        false
    }
}

fn compile_if(ctx: &mut KeywordCtx<'_, '_>) -> Result<Box<dyn KeywordValidator>> {
    let raw = ctx
        .literal()
        .ok_or_else(|| ctx.invalid("value must be a schema"))?
        .clone();
    let condition = ctx.apply_branch(&raw, &["if"])?;
    let then_branch = match ctx.parent().get("then").cloned() {
        Some(sub) => Some(ctx.apply_subschema(&sub, &["then"])?),
        None => None,
    };
    let else_branch = match ctx.parent().get("else").cloned() {
        Some(sub) => Some(ctx.apply_subschema(&sub, &["else"])?),
        None => None,
    };
    Ok(Box::new(IfNode {
        condition,
        then_branch,
        else_branch,
        info: ctx.error_info(),
    }))
}
