//! In-memory stand-ins for the external services, shared by this crate's
//! tests and (through the `test-utils` feature) by downstream crates.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::{json, Value};

use semdoc_core::Availability;
use semdoc_ingest::{Embedder, EmbeddingError};
use semdoc_llm::{LlmError, LlmProvider, Message};
use semdoc_store::{DocumentId, DocumentMatch, StoreError, UpsertOutcome, VectorStore};

use crate::context::{GenerationSettings, SearchDefaults, ToolContext};
use crate::tool::{Tool, ToolDefinition, ToolError, ToolResult};

/// Embeds every text as `[0/d, 1/d, ..., (d-1)/d]`; fails on listed texts.
pub struct FakeEmbedder {
    dimensions: usize,
    fail_on: Vec<String>,
    pub calls: Mutex<Vec<String>>,
}

impl FakeEmbedder {
    pub fn new(dimensions: usize) -> Self {
        Self {
            dimensions,
            fail_on: Vec::new(),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn failing_on(mut self, text: impl Into<String>) -> Self {
        self.fail_on.push(text.into());
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().map(|c| c.len()).unwrap_or(0)
    }
}

#[async_trait]
impl Embedder for FakeEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(text.to_string());
        }
        if self.fail_on.iter().any(|f| f == text) {
            return Err(EmbeddingError::Api {
                status: 503,
                body: "model overloaded".into(),
            });
        }
        let d = self.dimensions as f32;
        Ok((0..self.dimensions).map(|i| i as f32 / d).collect())
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }
}

/// Store that answers searches from a fixed list and numbers inserted rows 1, 2, ...
#[derive(Default)]
pub struct FakeStore {
    matches: Vec<DocumentMatch>,
    fail_search: bool,
    reject: Vec<String>,
    pub rows: Mutex<Vec<String>>,
    /// `(limit, threshold)` of every search call.
    pub searches: Mutex<Vec<(usize, f32)>>,
}

impl FakeStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_matches(mut self, matches: Vec<DocumentMatch>) -> Self {
        self.matches = matches;
        self
    }

    pub fn failing_search(mut self) -> Self {
        self.fail_search = true;
        self
    }

    pub fn rejecting(mut self, content: impl Into<String>) -> Self {
        self.reject.push(content.into());
        self
    }

    pub fn stored_rows(&self) -> Vec<String> {
        self.rows.lock().map(|r| r.clone()).unwrap_or_default()
    }

    pub fn search_calls(&self) -> Vec<(usize, f32)> {
        self.searches.lock().map(|s| s.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl VectorStore for FakeStore {
    async fn upsert(&self, content: &str, _embedding: &[f32]) -> UpsertOutcome {
        if self.reject.iter().any(|r| r == content) {
            return UpsertOutcome::failed("failed to store document: store returned 500: boom");
        }
        match self.rows.lock() {
            Ok(mut rows) => {
                rows.push(content.to_string());
                UpsertOutcome::stored(DocumentId(rows.len().to_string()))
            }
            Err(_) => UpsertOutcome::failed("poisoned"),
        }
    }

    async fn search(
        &self,
        _embedding: &[f32],
        limit: usize,
        threshold: f32,
    ) -> Result<Vec<DocumentMatch>, StoreError> {
        if let Ok(mut searches) = self.searches.lock() {
            searches.push((limit, threshold));
        }
        if self.fail_search {
            return Err(StoreError::Api {
                status: 500,
                body: "function match_documents does not exist".into(),
            });
        }
        Ok(self.matches.iter().take(limit).cloned().collect())
    }
}

/// LLM that always answers with `reply` and records the prompts it saw.
pub struct FakeLlm {
    reply: String,
    pub prompts: Mutex<Vec<Vec<Message>>>,
}

impl FakeLlm {
    pub fn new(reply: impl Into<String>) -> Self {
        Self {
            reply: reply.into(),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn last_prompt(&self) -> Option<Vec<Message>> {
        self.prompts.lock().ok().and_then(|p| p.last().cloned())
    }
}

#[async_trait]
impl LlmProvider for FakeLlm {
    async fn complete(
        &self,
        messages: Vec<Message>,
        _temperature: f32,
        _max_tokens: u32,
    ) -> Result<String, LlmError> {
        if let Ok(mut prompts) = self.prompts.lock() {
            prompts.push(messages);
        }
        Ok(self.reply.clone())
    }
}

/// Tool that panics on every call.
pub struct PanicTool;

#[async_trait]
impl Tool for PanicTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: "panic".to_string(),
            description: "Panics. For testing.".to_string(),
            input_schema: json!({ "type": "object" }),
        }
    }

    async fn execute(&self, _input: Value, _context: &ToolContext) -> Result<ToolResult, ToolError> {
        panic!("tool exploded");
    }
}

pub fn document(title: &str, content: &str, similarity: f64) -> DocumentMatch {
    DocumentMatch {
        title: Some(title.to_string()),
        scope: Some("general".to_string()),
        content: Some(content.to_string()),
        source_url: Some(format!("https://example.com/{}", title.to_lowercase())),
        similarity: Some(similarity),
    }
}

/// Context wired to the given fakes with the stock search/generation defaults.
pub fn context(embedder: Arc<FakeEmbedder>, store: Arc<FakeStore>, llm: Arc<FakeLlm>) -> ToolContext {
    ToolContext {
        embedder: Availability::Ready(embedder as Arc<dyn Embedder>),
        store: Availability::Ready(store as Arc<dyn VectorStore>),
        llm: Availability::Ready(llm as Arc<dyn LlmProvider>),
        search: SearchDefaults {
            limit: 6,
            threshold: 0.6,
        },
        generation: GenerationSettings {
            temperature: 0.2,
            max_tokens: 1024,
        },
    }
}

/// Context where every service is missing its credentials.
pub fn unavailable_context() -> ToolContext {
    ToolContext {
        embedder: Availability::unavailable("embedder", "GEMINI_API_KEY is not set"),
        store: Availability::unavailable("vector store", "SUPABASE_URL is not set"),
        llm: Availability::unavailable("llm", "GEMINI_API_KEY is not set"),
        search: SearchDefaults {
            limit: 6,
            threshold: 0.6,
        },
        generation: GenerationSettings {
            temperature: 0.2,
            max_tokens: 1024,
        },
    }
}
