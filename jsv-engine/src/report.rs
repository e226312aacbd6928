//! Validation error objects and their textual rendering.

use serde::Serialize;
use serde_json::Value;
use std::fmt;

/// One validation failure, located in both the data and the schema.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorObject {
    /// The keyword that failed (`"type"`, `"required"`, ...).
    pub keyword: String,
    /// Property-access path into the data (`".user.tags[0]"`).
    pub data_path: String,
    /// JSON Pointer into the schema (`"#/properties/user/type"`).
    pub schema_path: String,
    /// Human-readable message, phrased so that prepending the data
    /// location yields a sentence ("should be number").
    pub message: String,
    /// Keyword-specific parameters (`{"missingProperty": "x"}`).
    pub params: Value,
    /// The keyword's schema value; populated under `verbose`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schema: Option<Value>,
    /// The schema object containing the keyword; populated under `verbose`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_schema: Option<Value>,
    /// The offending data value; populated under `verbose`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl fmt::Display for ErrorObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "data{} {}", self.data_path, self.message)
    }
}

/// Rejection payload of an `$async` validator.
#[derive(Debug, Clone)]
pub struct ValidationError {
    /// The collected validation errors.
    pub errors: Vec<ErrorObject>,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "validation failed: {}", errors_text(Some(&self.errors), &ErrorsTextOptions::default()))
    }
}

impl std::error::Error for ValidationError {}

/// Options for [`errors_text`].
#[derive(Debug, Clone)]
pub struct ErrorsTextOptions {
    /// Separator between rendered errors.
    pub separator: String,
    /// Variable name standing in for the validated value.
    pub data_var: String,
}

impl Default for ErrorsTextOptions {
    fn default() -> Self {
        Self {
            separator: ", ".to_string(),
            data_var: "data".to_string(),
        }
    }
}

/// Concatenate errors into a human-readable string.
///
/// `None` or an empty slice renders as `"No errors"`.
#[must_use]
pub fn errors_text(errors: Option<&[ErrorObject]>, options: &ErrorsTextOptions) -> String {
    match errors {
        Some(errors) if !errors.is_empty() => errors
            .iter()
            .map(|e| format!("{}{} {}", options.data_var, e.data_path, e.message))
            .collect::<Vec<_>>()
            .join(&options.separator),
        _ => "No errors".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample(data_path: &str, message: &str) -> ErrorObject {
        ErrorObject {
            keyword: "type".to_string(),
            data_path: data_path.to_string(),
            schema_path: "#/type".to_string(),
            message: message.to_string(),
            params: json!({}),
            schema: None,
            parent_schema: None,
            data: None,
        }
    }

    #[test]
    fn renders_no_errors_for_empty_input() {
        assert_eq!(errors_text(None, &ErrorsTextOptions::default()), "No errors");
        assert_eq!(errors_text(Some(&[]), &ErrorsTextOptions::default()), "No errors");
    }

    #[test]
    fn joins_with_the_data_var() {
        let errors = [sample(".x", "should be number"), sample(".y", "should be string")];
        assert_eq!(
            errors_text(Some(&errors), &ErrorsTextOptions::default()),
            "data.x should be number, data.y should be string"
        );
        let opts = ErrorsTextOptions {
            separator: "; ".to_string(),
            data_var: "value".to_string(),
        };
        assert_eq!(
            errors_text(Some(&errors[..1]), &opts),
            "value.x should be number"
        );
    }
}
