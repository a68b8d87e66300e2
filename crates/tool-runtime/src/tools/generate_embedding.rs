//! Embed a single text and report a sample of the vector.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::context::ToolContext;
use crate::tool::{parse_input, require_text, Tool, ToolDefinition, ToolError, ToolResult};

const SAMPLE_LEN: usize = 5;

pub struct GenerateEmbeddingTool;

#[derive(Debug, Deserialize)]
struct EmbeddingArgs {
    text: String,
}

#[async_trait]
impl Tool for GenerateEmbeddingTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: "generate_embedding".to_string(),
            description: "Generate an embedding vector for a text and report its dimensions and sample values."
                .to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "text": {
                        "type": "string",
                        "description": "Text to embed"
                    }
                },
                "required": ["text"]
            }),
        }
    }

    async fn execute(&self, input: Value, context: &ToolContext) -> Result<ToolResult, ToolError> {
        let args: EmbeddingArgs = parse_input(input)?;
        let text = require_text("text", &args.text)?;

        let embedding = context
            .embedder()?
            .embed(text)
            .await
            .map_err(|e| ToolError::ExecutionFailed(format!("failed to generate embedding: {e}")))?;

        Ok(ToolResult::text(format_embedding(&embedding)))
    }
}

pub fn format_embedding(embedding: &[f32]) -> String {
    let head = &embedding[..embedding.len().min(SAMPLE_LEN)];
    let tail = &embedding[embedding.len().saturating_sub(SAMPLE_LEN)..];
    format!(
        "Embedding generated\n- Dimensions: {}\n- First {SAMPLE_LEN} values: {head:?}\n- Last {SAMPLE_LEN} values: {tail:?}\n",
        embedding.len()
    )
}
