use async_trait::async_trait;
use thiserror::Error;
use tracing::{info, warn};

use crate::types::{DocumentMatch, UpsertOutcome};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("store returned {status}: {body}")]
    Api { status: u16, body: String },

    #[error("embedding must have {expected} dimensions, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("no data returned by the store")]
    NoData,
}

/// Trait for vector stores holding `{content, embedding}` rows.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Insert one row. Never fails: problems come back as `success = false`.
    async fn upsert(&self, content: &str, embedding: &[f32]) -> UpsertOutcome;

    /// Rank stored rows by similarity to `embedding`.
    async fn search(
        &self,
        embedding: &[f32],
        limit: usize,
        threshold: f32,
    ) -> Result<Vec<DocumentMatch>, StoreError>;

    /// [`search`](Self::search) with failures folded into an empty result.
    ///
    /// Callers cannot tell "no match" from "search failed"; the log can.
    async fn search_or_empty(
        &self,
        embedding: &[f32],
        limit: usize,
        threshold: f32,
    ) -> Vec<DocumentMatch> {
        match self.search(embedding, limit, threshold).await {
            Ok(matches) if matches.is_empty() => {
                info!(limit, threshold, "no documents above threshold");
                matches
            }
            Ok(matches) => {
                info!(count = matches.len(), "similar documents found");
                matches
            }
            Err(e) => {
                warn!(error = %e, "similarity search failed, returning no results");
                Vec::new()
            }
        }
    }
}
