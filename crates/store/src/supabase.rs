use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde_json::{json, Value};
use tracing::{debug, error, info};

use semdoc_core::config::SupabaseConfig;
use semdoc_core::ConfigError;

use crate::traits::{StoreError, VectorStore};
use crate::types::{DocumentId, DocumentMatch, UpsertOutcome};

/// Vector store backed by a Supabase project (PostgREST + pgvector).
///
/// Rows are inserted into `table` as `{content, embedding}`; search goes
/// through the `match_function` RPC taking `query_embedding`,
/// `match_threshold` and `match_count`.
pub struct SupabaseStore {
    client: Client,
    base_url: String,
    api_key: String,
    table: String,
    match_function: String,
    dimensions: usize,
}

impl SupabaseStore {
    pub fn new(base_url: &str, api_key: String, dimensions: usize, timeout: Duration) -> Self {
        Self {
            client: Client::builder()
                .timeout(timeout)
                .build()
                .unwrap_or_else(|_| Client::new()),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            table: "documents".to_string(),
            match_function: "match_documents".to_string(),
            dimensions,
        }
    }

    pub fn with_table(mut self, table: impl Into<String>) -> Self {
        self.table = table.into();
        self
    }

    pub fn with_match_function(mut self, function: impl Into<String>) -> Self {
        self.match_function = function.into();
        self
    }

    /// Build from config; fails when the URL or service key is missing.
    pub fn from_config(
        config: &SupabaseConfig,
        dimensions: usize,
        timeout: Duration,
    ) -> Result<Self, ConfigError> {
        let (url, key) = config.credentials()?;
        Ok(Self::new(url, key.to_string(), dimensions, timeout)
            .with_table(config.table.clone())
            .with_match_function(config.match_function.clone()))
    }

    fn table_url(&self) -> String {
        format!("{}/rest/v1/{}", self.base_url, self.table)
    }

    fn rpc_url(&self) -> String {
        format!("{}/rest/v1/rpc/{}", self.base_url, self.match_function)
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .header("apikey", &self.api_key)
            .header("Authorization", format!("Bearer {}", self.api_key))
    }

    fn check_dimensions(&self, embedding: &[f32]) -> Result<(), StoreError> {
        if embedding.len() != self.dimensions {
            return Err(StoreError::DimensionMismatch {
                expected: self.dimensions,
                actual: embedding.len(),
            });
        }
        Ok(())
    }

    async fn insert_row(&self, content: &str, embedding: &[f32]) -> Result<DocumentId, StoreError> {
        self.check_dimensions(embedding)?;

        let response = self
            .authorized(self.client.post(self.table_url()))
            .header("Prefer", "return=representation")
            .json(&json!({ "content": content, "embedding": embedding }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(StoreError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let rows: Vec<Value> = response.json().await?;
        inserted_id(&rows)
    }
}

/// Id of the first row in an insert representation.
fn inserted_id(rows: &[Value]) -> Result<DocumentId, StoreError> {
    rows.first()
        .and_then(|row| row.get("id"))
        .and_then(DocumentId::from_value)
        .ok_or(StoreError::NoData)
}

fn match_payload(embedding: &[f32], limit: usize, threshold: f32) -> Value {
    json!({
        "query_embedding": embedding,
        "match_threshold": threshold,
        "match_count": limit,
    })
}

#[async_trait]
impl VectorStore for SupabaseStore {
    async fn upsert(&self, content: &str, embedding: &[f32]) -> UpsertOutcome {
        match self.insert_row(content, embedding).await {
            Ok(id) => {
                info!(id = %id, table = %self.table, "document stored");
                UpsertOutcome::stored(id)
            }
            Err(e @ StoreError::DimensionMismatch { .. }) => {
                debug!(error = %e, "rejected embedding before insert");
                UpsertOutcome::failed(e.to_string())
            }
            Err(e) => {
                error!(error = %e, table = %self.table, "failed to store document");
                UpsertOutcome::failed(format!("failed to store document: {e}"))
            }
        }
    }

    async fn search(
        &self,
        embedding: &[f32],
        limit: usize,
        threshold: f32,
    ) -> Result<Vec<DocumentMatch>, StoreError> {
        debug!(function = %self.match_function, limit, threshold, "similarity search");

        let response = self
            .authorized(self.client.post(self.rpc_url()))
            .json(&match_payload(embedding, limit, threshold))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(StoreError::Api {
                status: status.as_u16(),
                body,
            });
        }

        Ok(response.json().await?)
    }
}
