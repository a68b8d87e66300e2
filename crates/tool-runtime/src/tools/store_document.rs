//! Chunk, embed and persist a document.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::info;

use semdoc_ingest::{ingest_chunks, ChunkConfig, IngestReport};

use crate::context::ToolContext;
use crate::tool::{parse_input, require_text, Tool, ToolDefinition, ToolError, ToolResult};

const SHOWN_CHUNKS: usize = 5;
const SHOWN_ERRORS: usize = 3;

pub struct StoreDocumentTool;

#[derive(Debug, Deserialize)]
struct StoreArgs {
    content: String,
    #[serde(default)]
    chunk_size: Option<usize>,
    #[serde(default)]
    chunk_overlap: Option<usize>,
}

impl StoreArgs {
    fn chunk_config(&self) -> ChunkConfig {
        let defaults = ChunkConfig::default();
        ChunkConfig::new(
            self.chunk_size.unwrap_or(defaults.chunk_size),
            self.chunk_overlap.unwrap_or(defaults.overlap),
        )
    }
}

#[async_trait]
impl Tool for StoreDocumentTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: "store_document".to_string(),
            description: "Store a document: split it into overlapping chunks, embed each chunk and persist it."
                .to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "content": {
                        "type": "string",
                        "description": "Document text to store"
                    },
                    "chunk_size": {
                        "type": "integer",
                        "minimum": 1,
                        "description": "Maximum characters per chunk (default 500)"
                    },
                    "chunk_overlap": {
                        "type": "integer",
                        "minimum": 0,
                        "description": "Characters repeated between consecutive chunks (default 50)"
                    }
                },
                "required": ["content"]
            }),
        }
    }

    async fn execute(&self, input: Value, context: &ToolContext) -> Result<ToolResult, ToolError> {
        let args: StoreArgs = parse_input(input)?;
        let content = require_text("content", &args.content)?;
        let config = args.chunk_config();

        let embedder = context.embedder()?;
        let store = context.store()?;

        let chunks = config
            .split(content)
            .map_err(|e| ToolError::InvalidInput(e.to_string()))?;

        info!(
            chars = content.chars().count(),
            chunks = chunks.len(),
            chunk_size = config.chunk_size,
            overlap = config.overlap,
            "storing document"
        );

        let report = ingest_chunks(&chunks, embedder, store).await;
        if report.stored.is_empty() {
            return Ok(ToolResult::error(format_failure(&report)));
        }
        Ok(ToolResult::text(format_report(&report)))
    }
}

/// Summary for a document with at least one stored chunk.
pub fn format_report(report: &IngestReport) -> String {
    let mut out = String::from("Document stored successfully\n");
    out.push_str(&format!("Total chunks: {}\n", report.total_chunks));
    out.push_str(&format!("Chunks stored: {}\n", report.stored_count()));
    if !report.errors.is_empty() {
        out.push_str(&format!("Errors: {}\n", report.failed_count()));
    }

    out.push_str("\nDetails:\n");
    for chunk in report.stored.iter().take(SHOWN_CHUNKS) {
        out.push_str(&format!(
            "   - Chunk {}: ID {} ({} chars)\n",
            chunk.chunk_number, chunk.id, chunk.size
        ));
    }
    if report.stored.len() > SHOWN_CHUNKS {
        out.push_str(&format!(
            "   ... and {} more chunks\n",
            report.stored.len() - SHOWN_CHUNKS
        ));
    }

    if !report.errors.is_empty() {
        out.push_str("\nErrors found:\n");
        for error in report.errors.iter().take(SHOWN_ERRORS) {
            out.push_str(&format!("   - {error}\n"));
        }
    }
    out
}

/// Message for a document where no chunk was stored.
pub fn format_failure(report: &IngestReport) -> String {
    if report.errors.is_empty() {
        return "Could not store any chunk: the document produced no non-empty chunks.".to_string();
    }
    format!("Could not store any chunk. Errors: {}", report.errors.join("; "))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{context, unavailable_context, FakeEmbedder, FakeLlm, FakeStore};
    use semdoc_ingest::StoredChunk;
    use semdoc_store::DocumentId;
    use std::sync::Arc;

    fn stored(n: usize) -> StoredChunk {
        StoredChunk {
            chunk_number: n,
            id: DocumentId((100 + n).to_string()),
            size: 480,
        }
    }

    fn ctx_with(embedder: FakeEmbedder, store: FakeStore) -> (ToolContext, Arc<FakeStore>) {
        let store = Arc::new(store);
        let ctx = context(Arc::new(embedder), store.clone(), Arc::new(FakeLlm::new("")));
        (ctx, store)
    }

    /// Three sentences of 300 chars each; with 500/50 they split into three chunks.
    fn three_chunk_document() -> (String, Vec<String>) {
        let sentences: Vec<String> = ["a", "b", "c"]
            .iter()
            .map(|c| format!("{}.", c.repeat(299)))
            .collect();
        (sentences.concat(), sentences)
    }

    #[test]
    fn report_lists_first_five_chunks_and_three_errors() {
        let report = IngestReport {
            total_chunks: 11,
            stored: (1..=7).map(stored).collect(),
            errors: (8..=11).map(|n| format!("Chunk {n}: timeout")).collect(),
        };
        let text = format_report(&report);

        assert!(text.starts_with("Document stored successfully\nTotal chunks: 11\nChunks stored: 7\nErrors: 4\n"));
        assert!(text.contains("   - Chunk 1: ID 101 (480 chars)\n"));
        assert!(text.contains("   - Chunk 5: ID 105 (480 chars)\n"));
        assert!(!text.contains("Chunk 6: ID"));
        assert!(text.contains("   ... and 2 more chunks\n"));
        assert!(text.contains("   - Chunk 10: timeout\n"));
        assert!(!text.contains("Chunk 11: timeout"));
    }

    #[test]
    fn clean_report_has_no_error_section() {
        let report = IngestReport {
            total_chunks: 1,
            stored: vec![stored(1)],
            errors: vec![],
        };
        let text = format_report(&report);
        assert!(!text.contains("Errors"));
        assert!(!text.contains("more chunks"));
    }

    #[test]
    fn failure_joins_all_errors() {
        let report = IngestReport {
            total_chunks: 2,
            stored: vec![],
            errors: vec!["Chunk 1: a".into(), "Chunk 2: b".into()],
        };
        assert_eq!(format_failure(&report), "Could not store any chunk. Errors: Chunk 1: a; Chunk 2: b");
    }

    #[tokio::test]
    async fn stores_every_chunk() {
        let (document, _) = three_chunk_document();
        let (ctx, store) = ctx_with(FakeEmbedder::new(8), FakeStore::new());

        let result = StoreDocumentTool
            .execute(json!({ "content": document }), &ctx)
            .await
            .unwrap();

        assert!(!result.is_error);
        assert!(result.content.contains("Total chunks: 3\nChunks stored: 3\n"));
        assert_eq!(store.stored_rows().len(), 3);
    }

    #[tokio::test]
    async fn failed_second_chunk_leaves_two_stored() {
        let (document, sentences) = three_chunk_document();
        // Chunk 2 starts with the 50-char overlap from chunk 1.
        let chunk_two = format!("{}{}", &sentences[0][250..], sentences[1]);
        let embedder = FakeEmbedder::new(8).failing_on(chunk_two);
        let (ctx, store) = ctx_with(embedder, FakeStore::new());

        let result = StoreDocumentTool
            .execute(json!({ "content": document }), &ctx)
            .await
            .unwrap();

        assert!(!result.is_error);
        assert!(result.content.contains("Chunks stored: 2\nErrors: 1\n"));
        assert!(result.content.contains("   - Chunk 2: API error: 503: model overloaded\n"));
        assert!(result.content.contains("   - Chunk 3: ID 2"));
        assert_eq!(store.stored_rows().len(), 2);
    }

    #[tokio::test]
    async fn nothing_stored_is_an_error_result() {
        let (ctx, _) = ctx_with(FakeEmbedder::new(8), FakeStore::new().rejecting("short note"));
        let result = StoreDocumentTool
            .execute(json!({ "content": "short note" }), &ctx)
            .await
            .unwrap();

        assert!(result.is_error);
        assert_eq!(
            result.content,
            "Could not store any chunk. Errors: Chunk 1: failed to store document: store returned 500: boom"
        );
    }

    #[tokio::test]
    async fn invalid_chunk_parameters_fail_before_embedding() {
        let embedder = FakeEmbedder::new(8);
        let (ctx, _) = ctx_with(embedder, FakeStore::new());
        let err = StoreDocumentTool
            .execute(
                json!({ "content": "x".repeat(600), "chunk_size": 100, "chunk_overlap": 100 }),
                &ctx,
            )
            .await
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Invalid input: chunk_overlap (100) must be smaller than chunk_size (100)"
        );
    }

    #[tokio::test]
    async fn unavailable_store_returns_configuration_error() {
        let err = StoreDocumentTool
            .execute(json!({ "content": "text" }), &unavailable_context())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("is not configured"));
    }
}
