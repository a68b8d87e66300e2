//! Retrieval-augmented answer: search the store, then ask the model to
//! answer from the retrieved documents only.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;

use semdoc_llm::Message;
use semdoc_store::DocumentMatch;

use crate::context::ToolContext;
use crate::tool::{parse_input, require_text, Tool, ToolDefinition, ToolError, ToolResult};

/// Retrieval settings for grounding; independent of the search tool defaults.
const RETRIEVAL_LIMIT: usize = 5;
const RETRIEVAL_THRESHOLD: f32 = 0.5;

const NO_KNOWLEDGE: &str = "No documents were retrieved for this query.";

const SYSTEM_PROMPT: &str = "\
You are an assistant that answers questions using only the knowledge base \
retrieved for each query.

Instructions:
- Answer clearly, precisely and professionally.
- Do not state anything that is not in the retrieved knowledge base.
- Do not assume or fill in missing details.
- If the query is ambiguous, ask for clarification.
- If the retrieved knowledge base does not contain relevant information, say so explicitly.";

pub struct GenerateResponseTool;

#[derive(Debug, Deserialize)]
struct ResponseArgs {
    query: String,
}

#[async_trait]
impl Tool for GenerateResponseTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: "generate_response".to_string(),
            description: "Answer a question using only the stored documents most similar to it."
                .to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "query": {
                        "type": "string",
                        "description": "The user's question"
                    }
                },
                "required": ["query"]
            }),
        }
    }

    async fn execute(&self, input: Value, context: &ToolContext) -> Result<ToolResult, ToolError> {
        let args: ResponseArgs = parse_input(input)?;
        let query = require_text("query", &args.query)?;

        let embedder = context.embedder()?;
        let store = context.store()?;
        let llm = context.llm()?;

        let embedding = embedder
            .embed(query)
            .await
            .map_err(|e| ToolError::ExecutionFailed(format!("failed to generate embedding: {e}")))?;

        let matches = store
            .search_or_empty(&embedding, RETRIEVAL_LIMIT, RETRIEVAL_THRESHOLD)
            .await;
        debug!(retrieved = matches.len(), "grounding documents retrieved");

        let answer = llm
            .complete(
                build_messages(query, &matches),
                context.generation.temperature,
                context.generation.max_tokens,
            )
            .await
            .map_err(|e| ToolError::ExecutionFailed(format!("failed to generate response: {e}")))?;

        Ok(ToolResult::text(answer))
    }
}

fn build_messages(query: &str, matches: &[DocumentMatch]) -> Vec<Message> {
    vec![
        Message::system(SYSTEM_PROMPT),
        Message::user(format!(
            "Retrieved knowledge base:\n{}\n\nUser query:\n{query}",
            format_knowledge(matches)
        )),
    ]
}

/// Full text of each retrieved document, numbered in rank order.
pub fn format_knowledge(matches: &[DocumentMatch]) -> String {
    if matches.is_empty() {
        return NO_KNOWLEDGE.to_string();
    }

    matches
        .iter()
        .enumerate()
        .map(|(i, m)| {
            format!(
                "[{}] {} (similarity {:.2})\n{}\nSource: {}",
                i + 1,
                m.title.as_deref().unwrap_or("Untitled"),
                m.similarity.unwrap_or(0.0),
                m.content.as_deref().unwrap_or_default(),
                m.source_url.as_deref().unwrap_or("N/A"),
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{context, document, unavailable_context, FakeEmbedder, FakeLlm, FakeStore};
    use semdoc_llm::Role;
    use std::sync::Arc;

    #[test]
    fn knowledge_block_numbers_documents() {
        let block = format_knowledge(&[
            document("Education", "BSc in Computer Science.", 0.91),
            document("Work", "Backend engineer since 2019.", 0.72),
        ]);
        assert!(block.starts_with("[1] Education (similarity 0.91)\nBSc in Computer Science.\n"));
        assert!(block.contains("\n\n[2] Work (similarity 0.72)\n"));
    }

    #[test]
    fn empty_retrieval_says_so() {
        assert_eq!(format_knowledge(&[]), NO_KNOWLEDGE);
    }

    #[tokio::test]
    async fn grounds_the_prompt_in_retrieved_documents() {
        let store = Arc::new(FakeStore::new().with_matches(vec![document("Work", "Backend engineer.", 0.8)]));
        let llm = Arc::new(FakeLlm::new("A backend engineer."));
        let ctx = context(Arc::new(FakeEmbedder::new(8)), store.clone(), llm.clone());

        let result = GenerateResponseTool
            .execute(json!({ "query": "What is the current role?" }), &ctx)
            .await
            .unwrap();

        assert_eq!(result.content, "A backend engineer.");
        assert_eq!(store.search_calls(), vec![(5, 0.5)]);

        let prompt = llm.last_prompt().unwrap();
        assert_eq!(prompt.len(), 2);
        assert_eq!(prompt[0].role, Role::System);
        assert_eq!(prompt[1].role, Role::User);
        assert!(prompt[1].content.contains("Backend engineer."));
        assert!(prompt[1].content.ends_with("User query:\nWhat is the current role?"));
    }

    #[tokio::test]
    async fn model_is_still_asked_when_nothing_is_retrieved() {
        let llm = Arc::new(FakeLlm::new("That information is not available."));
        let ctx = context(
            Arc::new(FakeEmbedder::new(8)),
            Arc::new(FakeStore::new().failing_search()),
            llm.clone(),
        );

        let result = GenerateResponseTool
            .execute(json!({ "query": "Hobbies?" }), &ctx)
            .await
            .unwrap();

        assert_eq!(result.content, "That information is not available.");
        assert!(llm.last_prompt().unwrap()[1].content.contains(NO_KNOWLEDGE));
    }

    #[tokio::test]
    async fn unavailable_llm_is_reported() {
        let err = GenerateResponseTool
            .execute(json!({ "query": "Hobbies?" }), &unavailable_context())
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::Unavailable(_)));
    }
}
