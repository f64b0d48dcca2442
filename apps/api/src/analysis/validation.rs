//! Validation of the model's reply: locate the completion text, parse it as a
//! JSON object and check the fields the caller depends on.

use serde_json::{Map, Value};
use thiserror::Error;

use crate::analysis::AnalysisKind;

#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("{0}")]
    MalformedUpstreamResponse(String),

    #[error("{0}")]
    UnparsableAnalysis(String),

    #[error("missing required fields: {}", .missing.join(", "))]
    IncompleteAnalysis { missing: Vec<String> },
}

/// Validated analysis object, returned to the caller as-is.
pub type AnalysisResult = Map<String, Value>;

/// Extracts `choices[0].message.content` from a completion body, parses it as a
/// JSON object and checks the required fields for `kind`.
pub fn validate(kind: AnalysisKind, body: &Value) -> Result<AnalysisResult, AnalysisError> {
    let content = body
        .pointer("/choices/0/message/content")
        .ok_or_else(|| {
            AnalysisError::MalformedUpstreamResponse(
                "completion has no choices[0].message.content".to_string(),
            )
        })?
        .as_str()
        .ok_or_else(|| {
            AnalysisError::MalformedUpstreamResponse(
                "completion content is not a string".to_string(),
            )
        })?;

    let object = parse_object(content)?;

    let missing: Vec<String> = kind
        .required_fields()
        .iter()
        .filter(|field| object.get(**field).map_or(true, Value::is_null))
        .map(|field| field.to_string())
        .collect();

    if !missing.is_empty() {
        return Err(AnalysisError::IncompleteAnalysis { missing });
    }

    Ok(object)
}

fn parse_object(content: &str) -> Result<AnalysisResult, AnalysisError> {
    let text = strip_json_fences(content);

    let parsed = match serde_json::from_str::<Value>(text) {
        Ok(value) => value,
        // Models occasionally wrap the object in a sentence despite instructions.
        Err(first_error) => outermost_object(text)
            .and_then(|inner| serde_json::from_str::<Value>(inner).ok())
            .ok_or_else(|| AnalysisError::UnparsableAnalysis(first_error.to_string()))?,
    };

    match parsed {
        Value::Object(map) => Ok(map),
        other => Err(AnalysisError::UnparsableAnalysis(format!(
            "expected a JSON object, got {}",
            json_type(&other)
        ))),
    }
}

/// Strips ```json ... ``` or ``` ... ``` code fences from LLM output.
fn strip_json_fences(text: &str) -> &str {
    let text = text.trim();
    if let Some(stripped) = text.strip_prefix("```json") {
        stripped
            .trim_start()
            .strip_suffix("```")
            .map(|s| s.trim())
            .unwrap_or(stripped.trim_start())
    } else if let Some(stripped) = text.strip_prefix("```") {
        stripped
            .trim_start()
            .strip_suffix("```")
            .map(|s| s.trim())
            .unwrap_or(stripped.trim_start())
    } else {
        text
    }
}

/// The slice from the first `{` to the last `}`, if any.
fn outermost_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (start < end).then(|| &text[start..=end])
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
