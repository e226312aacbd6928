//! The `format` keyword.
//!
//! Formats apply to strings only. An unknown format is a strict-mode
//! compilation failure; otherwise it is logged and the keyword is
//! compiled away. When the engine's `format` option is off (as it is
//! while the default meta-schema is installed), the keyword is inert.

use crate::compiler::KeywordCtx;
use crate::context::{DataRef, ErrorInfo, KeywordValidator, RuntimeCtx, SchemaArg};
use crate::formats::Format;
use crate::rules::KeywordDefinition;
use jsv_core::error::{EngineError, Result};
use jsv_core::types::JsonType;
use parking_lot::RwLock;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;

pub(crate) fn vocabulary() -> Vec<(&'static str, KeywordDefinition)> {
    vec![(
        "format",
        KeywordDefinition::compiled(vec![JsonType::String], compile_format).with_data(),
    )]
}

struct PassNode;

impl KeywordValidator for PassNode {
    fn validate(&self, _data: &mut Value, _ctx: &mut RuntimeCtx) -> bool {
        true
    }
}

struct FormatNode {
    name: String,
    format: Format,
    info: ErrorInfo,
}

impl KeywordValidator for FormatNode {
    fn validate(&self, data: &mut Value, ctx: &mut RuntimeCtx) -> bool {
        let Some(s) = data.as_str() else { return true };
        if self.format.validate(s) {
            return true;
        }
        self.info.emit(
            ctx,
            format!("should match format \"{}\"", self.name),
            json!({ "format": self.name }),
            data,
        );
        false
    }
}

/// `format` with a `$data` value: the format name is looked up in the
/// live registry at validation time; unknown names pass.
struct DynamicFormatNode {
    table: Arc<RwLock<HashMap<String, Format>>>,
    name: DataRef,
    info: ErrorInfo,
}

impl KeywordValidator for DynamicFormatNode {
    fn validate(&self, data: &mut Value, ctx: &mut RuntimeCtx) -> bool {
        let Some(s) = data.as_str() else { return true };
        let Some(Value::String(name)) = ctx.resolve_data_ref(&self.name) else {
            return true;
        };
        let Some(format) = self.table.read().get(&name).cloned() else {
            return true;
        };
        if format.validate(s) {
            return true;
        }
        self.info.emit(
            ctx,
            format!("should match format \"{name}\""),
            json!({ "format": name }),
            data,
        );
        false
    }
}

fn compile_format(ctx: &mut KeywordCtx<'_, '_>) -> Result<Box<dyn KeywordValidator>> {
    if !ctx.options().format {
        return Ok(Box::new(PassNode));
    }
    match ctx.value() {
        SchemaArg::Literal(v) => {
            let name = v
                .as_str()
                .ok_or_else(|| ctx.invalid("value must be a string"))?;
            match ctx.lookup_format(name) {
                Some(format) => Ok(Box::new(FormatNode {
                    name: name.to_string(),
                    format,
                    info: ctx.error_info(),
                })),
                None if ctx.options().strict => Err(EngineError::StrictMode {
                    message: format!("unknown format \"{name}\""),
                }),
                None => {
                    ctx.logger()
                        .warn(&format!("unknown format \"{name}\" ignored in schema"));
                    Ok(Box::new(PassNode))
                }
            }
        }
        SchemaArg::Data(r) => Ok(Box::new(DynamicFormatNode {
            table: ctx.formats_handle(),
            name: r.clone(),
            info: ctx.error_info(),
        })),
    }
}
