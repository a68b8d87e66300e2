//! Services and defaults handed to every tool invocation.

use std::sync::Arc;

use semdoc_core::config::{LlmConfig, SearchConfig};
use semdoc_core::Availability;
use semdoc_ingest::Embedder;
use semdoc_llm::LlmProvider;
use semdoc_store::VectorStore;

use crate::tool::ToolError;

/// Default `limit`/`threshold` for `search_documents`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SearchDefaults {
    pub limit: usize,
    pub threshold: f32,
}

impl From<&SearchConfig> for SearchDefaults {
    fn from(config: &SearchConfig) -> Self {
        Self {
            limit: config.top_k,
            threshold: config.similarity_threshold,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GenerationSettings {
    pub temperature: f32,
    pub max_tokens: u32,
}

impl From<&LlmConfig> for GenerationSettings {
    fn from(config: &LlmConfig) -> Self {
        Self {
            temperature: config.temperature,
            max_tokens: config.max_tokens,
        }
    }
}

/// Dependency context for tool execution.
///
/// Built once at startup and shared behind an `Arc` by every call.
pub struct ToolContext {
    pub embedder: Availability<Arc<dyn Embedder>>,
    pub store: Availability<Arc<dyn VectorStore>>,
    pub llm: Availability<Arc<dyn LlmProvider>>,
    pub search: SearchDefaults,
    pub generation: GenerationSettings,
}

impl ToolContext {
    pub fn embedder(&self) -> Result<&dyn Embedder, ToolError> {
        Ok(self.embedder.get()?.as_ref())
    }

    pub fn store(&self) -> Result<&dyn VectorStore, ToolError> {
        Ok(self.store.get()?.as_ref())
    }

    pub fn llm(&self) -> Result<&dyn LlmProvider, ToolError> {
        Ok(self.llm.get()?.as_ref())
    }

    /// Service names that are not ready, for the startup log.
    pub fn unavailable_services(&self) -> Vec<&'static str> {
        let mut down = Vec::new();
        if !self.embedder.is_ready() {
            down.push("embedder");
        }
        if !self.store.is_ready() {
            down.push("vector store");
        }
        if !self.llm.is_ready() {
            down.push("llm");
        }
        down
    }
}
