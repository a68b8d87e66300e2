//! Semantic search over stored documents.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;

use semdoc_store::DocumentMatch;

use crate::context::ToolContext;
use crate::tool::{parse_input, require_text, Tool, ToolDefinition, ToolError, ToolResult};

pub const NO_MATCHES: &str = "No similar documents found for the query.";

/// Characters of each match's content shown in the listing.
const PREVIEW_CHARS: usize = 200;

pub struct SearchDocumentsTool;

#[derive(Debug, Deserialize)]
struct SearchArgs {
    query: String,
    #[serde(default)]
    limit: Option<usize>,
    #[serde(default)]
    threshold: Option<f32>,
}

#[async_trait]
impl Tool for SearchDocumentsTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: "search_documents".to_string(),
            description: "Search stored documents by semantic similarity to a natural-language query."
                .to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "query": {
                        "type": "string",
                        "description": "Natural-language search query"
                    },
                    "limit": {
                        "type": "integer",
                        "minimum": 0,
                        "description": "Maximum number of documents to return (default from TOPK_DOCUMENTS)"
                    },
                    "threshold": {
                        "type": "number",
                        "description": "Minimum similarity between 0 and 1 (default from SIMILARITY_THRESHOLD)"
                    }
                },
                "required": ["query"]
            }),
        }
    }

    async fn execute(&self, input: Value, context: &ToolContext) -> Result<ToolResult, ToolError> {
        let args: SearchArgs = parse_input(input)?;
        let query = require_text("query", &args.query)?;
        let limit = args.limit.unwrap_or(context.search.limit);
        let threshold = args.threshold.unwrap_or(context.search.threshold);

        let embedder = context.embedder()?;
        let store = context.store()?;

        debug!(limit, threshold, "searching documents");

        let embedding = embedder
            .embed(query)
            .await
            .map_err(|e| ToolError::ExecutionFailed(format!("failed to generate embedding: {e}")))?;

        let matches = store.search_or_empty(&embedding, limit, threshold).await;
        Ok(ToolResult::text(format_matches(&matches)))
    }
}

/// Render search rows as the numbered listing returned to the client.
pub fn format_matches(matches: &[DocumentMatch]) -> String {
    if matches.is_empty() {
        return NO_MATCHES.to_string();
    }

    let mut out = format!("Found {} similar documents:\n\n", matches.len());
    for (i, m) in matches.iter().enumerate() {
        let similarity = m.similarity.unwrap_or(0.0) * 100.0;
        let preview: String = m
            .content
            .as_deref()
            .unwrap_or_default()
            .chars()
            .take(PREVIEW_CHARS)
            .collect();

        out.push_str(&format!(
            "{}. **{}** (Similarity: {:.2}%)\n",
            i + 1,
            m.title.as_deref().unwrap_or("Untitled"),
            similarity
        ));
        out.push_str(&format!("   - Scope: {}\n", m.scope.as_deref().unwrap_or("N/A")));
        out.push_str(&format!("   - Content: {preview}...\n"));
        out.push_str(&format!(
            "   - Source: {}\n\n",
            m.source_url.as_deref().unwrap_or("N/A")
        ));
    }
    out
}
