//! Chunk ingestion: embed each chunk and store it, one at a time.
//!
//! A chunk that fails to embed or store is recorded and skipped; later chunks
//! are still attempted. Nothing is retried or rolled back.

use tracing::{debug, info, warn};

use semdoc_store::{DocumentId, VectorStore};

use crate::embedding::Embedder;

/// A chunk that made it into the store.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredChunk {
    /// 1-based position of the chunk within the document.
    pub chunk_number: usize,
    pub id: DocumentId,
    /// Size in characters.
    pub size: usize,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct IngestReport {
    pub total_chunks: usize,
    pub stored: Vec<StoredChunk>,
    /// One `"Chunk {n}: {message}"` entry per failed chunk, in order.
    pub errors: Vec<String>,
}

impl IngestReport {
    pub fn stored_count(&self) -> usize {
        self.stored.len()
    }

    pub fn failed_count(&self) -> usize {
        self.errors.len()
    }
}

/// Embed and store `chunks` in order.
///
/// A vector whose length differs from `embedder.dimensions()` is reported
/// against its chunk and not sent to the store.
pub async fn ingest_chunks(
    chunks: &[&str],
    embedder: &dyn Embedder,
    store: &dyn VectorStore,
) -> IngestReport {
    let mut report = IngestReport {
        total_chunks: chunks.len(),
        ..Default::default()
    };

    for (i, chunk) in chunks.iter().enumerate() {
        let chunk_number = i + 1;

        let embedding = match embedder.embed(chunk).await {
            Ok(v) if v.len() != embedder.dimensions() => {
                warn!(chunk = chunk_number, got = v.len(), "embedding has unexpected dimensions");
                report.errors.push(format!(
                    "Chunk {chunk_number}: embedding has {} dimensions, expected {}",
                    v.len(),
                    embedder.dimensions()
                ));
                continue;
            }
            Ok(v) => v,
            Err(e) => {
                warn!(chunk = chunk_number, error = %e, "embedding failed");
                report.errors.push(format!("Chunk {chunk_number}: {e}"));
                continue;
            }
        };

        let outcome = store.upsert(chunk, &embedding).await;
        match (outcome.success, outcome.id) {
            (true, Some(id)) => {
                debug!(chunk = chunk_number, id = %id, "chunk stored");
                report.stored.push(StoredChunk {
                    chunk_number,
                    id,
                    size: chunk.chars().count(),
                });
            }
            _ => {
                warn!(chunk = chunk_number, message = %outcome.message, "chunk not stored");
                report.errors.push(format!("Chunk {chunk_number}: {}", outcome.message));
            }
        }
    }

    info!(
        total = report.total_chunks,
        stored = report.stored_count(),
        failed = report.failed_count(),
        "document ingestion finished"
    );

    report
}
