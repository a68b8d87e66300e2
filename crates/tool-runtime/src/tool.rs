use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use semdoc_core::ConfigError;

use crate::context::ToolContext;

/// Describes a tool's interface to MCP clients.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDefinition {
    /// Unique tool name (e.g., "search_documents")
    pub name: String,
    /// Human-readable description shown to the client
    pub description: String,
    /// JSON Schema describing the expected input
    pub input_schema: Value,
}

/// Text produced by a tool invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolResult {
    pub content: String,
    /// Whether this result represents an error
    pub is_error: bool,
}

impl ToolResult {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            is_error: false,
        }
    }

    pub fn error(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            is_error: true,
        }
    }
}

/// The primary extension point: all tools implement this trait.
///
/// Tools are object-safe, Send + Sync, and async. Services they need come
/// through the [`ToolContext`]; tools hold no clients of their own.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Returns the tool's definition (name, description, JSON Schema).
    fn definition(&self) -> ToolDefinition;

    /// Execute the tool with the given JSON input.
    async fn execute(&self, input: Value, context: &ToolContext) -> Result<ToolResult, ToolError>;
}

#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("{0}")]
    ExecutionFailed(String),
    #[error(transparent)]
    Unavailable(#[from] ConfigError),
}

/// Deserialize tool arguments, mapping schema violations to `InvalidInput`.
///
/// A missing or `null` argument object is treated as `{}`.
pub fn parse_input<T: DeserializeOwned>(input: Value) -> Result<T, ToolError> {
    let input = match input {
        Value::Null => Value::Object(Default::default()),
        other => other,
    };
    serde_json::from_value(input).map_err(|e| ToolError::InvalidInput(e.to_string()))
}

/// Reject blank string arguments.
pub(crate) fn require_text<'a>(field: &str, value: &'a str) -> Result<&'a str, ToolError> {
    if value.trim().is_empty() {
        return Err(ToolError::InvalidInput(format!("'{field}' must not be empty")));
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Debug, Deserialize)]
    struct Args {
        query: String,
        #[serde(default)]
        limit: Option<usize>,
    }

    #[test]
    fn parse_input_reads_optional_fields() {
        let args: Args = parse_input(json!({ "query": "rust", "limit": 3 })).unwrap();
        assert_eq!(args.query, "rust");
        assert_eq!(args.limit, Some(3));

        let args: Args = parse_input(json!({ "query": "rust" })).unwrap();
        assert_eq!(args.limit, None);
    }

    #[test]
    fn parse_input_rejects_missing_and_ill_typed_fields() {
        let err = parse_input::<Args>(json!({})).unwrap_err();
        assert!(matches!(err, ToolError::InvalidInput(ref m) if m.contains("query")));

        let err = parse_input::<Args>(Value::Null).unwrap_err();
        assert!(matches!(err, ToolError::InvalidInput(_)));

        let err = parse_input::<Args>(json!({ "query": "x", "limit": -1 })).unwrap_err();
        assert!(matches!(err, ToolError::InvalidInput(_)));
    }

    #[test]
    fn blank_text_is_rejected() {
        assert!(require_text("query", "  \n").is_err());
        assert_eq!(require_text("query", "hola").unwrap(), "hola");
    }

    #[test]
    fn config_errors_render_verbatim() {
        let err = ToolError::from(ConfigError::Unavailable {
            service: "vector store",
            reason: "SUPABASE_URL not set".into(),
        });
        assert_eq!(err.to_string(), "vector store is not configured: SUPABASE_URL not set");
    }

    #[test]
    fn every_error_variant_renders_for_the_client() {
        let errors = [
            ToolError::InvalidInput("'query' must not be empty".into()),
            ToolError::ExecutionFailed("API error: 503: model overloaded".into()),
            ToolError::from(ConfigError::MissingVars(vec!["GEMINI_API_KEY".into()])),
        ];
        let rendered: Vec<String> = errors.iter().map(ToString::to_string).collect();
        assert_eq!(
            rendered,
            vec![
                "Invalid input: 'query' must not be empty",
                "API error: 503: model overloaded",
                "missing required environment variables: GEMINI_API_KEY",
            ]
        );
    }

    #[test]
    fn result_constructors() {
        assert!(!ToolResult::text("ok").is_error);
        assert!(ToolResult::error("boom").is_error);
    }
}
