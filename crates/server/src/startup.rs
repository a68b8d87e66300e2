//! Service construction: one client per external service, built once.

use std::sync::Arc;

use tracing::{info, warn};

use semdoc_core::{Availability, Config};
use semdoc_ingest::{Embedder, GeminiEmbedder};
use semdoc_llm::{GeminiProvider, LlmProvider};
use semdoc_store::{SupabaseStore, VectorStore};
use semdoc_tool_runtime::ToolContext;

/// Build the tool context from config.
///
/// A client whose credentials are missing comes up `Unavailable`; whether that
/// is acceptable was already decided by `Config::validate`.
pub fn build_context(config: &Config) -> ToolContext {
    let timeout = config.http.timeout();

    let embedder = Availability::from_result(
        "embedder",
        GeminiEmbedder::from_config(&config.gemini, &config.embedding, timeout)
            .map(|e| Arc::new(e) as Arc<dyn Embedder>),
    );

    let store = Availability::from_result(
        "vector store",
        SupabaseStore::from_config(&config.supabase, config.embedding.dimensions, timeout)
            .map(|s| Arc::new(s) as Arc<dyn VectorStore>),
    );

    let llm = Availability::from_result(
        "llm",
        GeminiProvider::from_config(&config.gemini, timeout).map(|p| Arc::new(p) as Arc<dyn LlmProvider>),
    );

    let context = ToolContext {
        embedder,
        store,
        llm,
        search: (&config.search).into(),
        generation: (&config.llm).into(),
    };

    let down = context.unavailable_services();
    if down.is_empty() {
        info!("all services configured");
    } else {
        warn!(services = %down.join(", "), "services disabled");
    }

    context
}
