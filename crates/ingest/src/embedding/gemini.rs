use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use tracing::debug;

use semdoc_core::config::{EmbeddingConfig, GeminiConfig};
use semdoc_core::ConfigError;

use super::traits::{Embedder, EmbeddingError};

/// Models that reject `outputDimensionality` and always emit their native size.
const FIXED_DIMENSION_MODELS: &[&str] = &["gemini-embedding-001"];

/// Embedder backed by the Gemini `embedContent` API.
pub struct GeminiEmbedder {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
    dimensions: usize,
}

impl GeminiEmbedder {
    pub fn new(api_key: String, model: String, dimensions: usize, timeout: Duration) -> Self {
        Self {
            client: Client::builder()
                .timeout(timeout)
                .build()
                .unwrap_or_else(|_| Client::new()),
            api_key,
            base_url: "https://generativelanguage.googleapis.com".to_string(),
            model: normalize_model(&model),
            dimensions,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Build from config; fails when `GEMINI_API_KEY` is missing.
    pub fn from_config(
        gemini: &GeminiConfig,
        embedding: &EmbeddingConfig,
        timeout: Duration,
    ) -> Result<Self, ConfigError> {
        let api_key = gemini.require_api_key()?;
        Ok(Self::new(
            api_key.to_string(),
            gemini.embed_model.clone(),
            embedding.dimensions,
            timeout,
        )
        .with_base_url(gemini.base_url.clone()))
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn build_request_body(&self, text: &str) -> Value {
        let mut body = json!({
            "model": self.model,
            "content": { "parts": [{ "text": text }] },
            "taskType": "RETRIEVAL_QUERY",
        });

        if !FIXED_DIMENSION_MODELS.iter().any(|m| self.model.contains(m)) {
            body["outputDimensionality"] = json!(self.dimensions);
        }

        body
    }
}

/// Gemini addresses models as `models/{name}`; accept the bare name too.
fn normalize_model(model: &str) -> String {
    if model.starts_with("models/") {
        model.to_string()
    } else {
        format!("models/{model}")
    }
}

/// Pull the vector out of an `embedContent` response.
///
/// Accepts `{"embedding": {"values": [...]}}` and `{"embedding": [...]}`.
pub(crate) fn extract_values(response: &Value) -> Result<Vec<f32>, EmbeddingError> {
    let embedding = response
        .get("embedding")
        .ok_or_else(|| EmbeddingError::Extraction("missing 'embedding' field".into()))?;

    let values = match embedding {
        Value::Object(map) => map.get("values").and_then(Value::as_array),
        Value::Array(items) => Some(items),
        _ => None,
    }
    .ok_or_else(|| EmbeddingError::Extraction("unrecognized 'embedding' shape".into()))?;

    values
        .iter()
        .map(|v| {
            v.as_f64()
                .map(|f| f as f32)
                .ok_or_else(|| EmbeddingError::Extraction(format!("non-numeric value: {v}")))
        })
        .collect()
}

#[async_trait]
impl Embedder for GeminiEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let url = format!("{}/v1beta/{}:embedContent", self.base_url, self.model);
        let body = self.build_request_body(text);

        debug!(model = %self.model, chars = text.chars().count(), "Gemini embed request");

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(EmbeddingError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: Value = response.json().await?;
        extract_values(&parsed)
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }
}
