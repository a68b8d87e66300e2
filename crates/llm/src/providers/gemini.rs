use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::debug;

use semdoc_core::config::GeminiConfig;
use semdoc_core::ConfigError;

use crate::provider::{LlmError, LlmProvider, Message, Role};

/// Text generation through the Gemini `generateContent` API.
pub struct GeminiProvider {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
}

impl GeminiProvider {
    pub fn new(api_key: String, model: String, timeout: Duration) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(timeout)
                .build()
                .unwrap_or_else(|_| reqwest::Client::new()),
            api_key,
            base_url: "https://generativelanguage.googleapis.com".to_string(),
            model: model.trim_start_matches("models/").to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Build from config; fails when `GEMINI_API_KEY` is missing.
    pub fn from_config(config: &GeminiConfig, timeout: Duration) -> Result<Self, ConfigError> {
        let api_key = config.require_api_key()?;
        Ok(Self::new(api_key.to_string(), config.model.clone(), timeout)
            .with_base_url(config.base_url.clone()))
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url, self.model
        )
    }

    /// Build the request body for the Gemini generateContent API.
    fn build_request_body(messages: &[Message], temperature: f32, max_tokens: u32) -> Value {
        // System prompts travel in their own field, joined if there are several.
        let system: Vec<&str> = messages
            .iter()
            .filter(|m| m.role == Role::System)
            .map(|m| m.content.as_str())
            .collect();

        let contents: Vec<Value> = messages
            .iter()
            .filter_map(|m| {
                let role = match m.role {
                    Role::User => "user",
                    Role::Assistant => "model",
                    Role::System => return None,
                };
                Some(json!({
                    "role": role,
                    "parts": [{ "text": m.content }],
                }))
            })
            .collect();

        let mut body = json!({
            "contents": contents,
            "generationConfig": {
                "temperature": temperature,
                "maxOutputTokens": max_tokens,
            },
        });

        if !system.is_empty() {
            body["system_instruction"] = json!({
                "parts": [{ "text": system.join("\n\n") }],
            });
        }

        body
    }
}

/// Concatenated text parts of the first candidate.
fn extract_text(response: &Value) -> Result<String, LlmError> {
    let parts = response["candidates"][0]["content"]["parts"]
        .as_array()
        .ok_or_else(|| LlmError::ParseError("missing candidates[0].content.parts".into()))?;

    let text: String = parts.iter().filter_map(|p| p["text"].as_str()).collect();
    if text.is_empty() {
        let reason = response["candidates"][0]["finishReason"]
            .as_str()
            .unwrap_or("unknown");
        return Err(LlmError::ParseError(format!(
            "response contained no text (finish reason: {reason})"
        )));
    }
    Ok(text)
}

#[async_trait]
impl LlmProvider for GeminiProvider {
    async fn complete(
        &self,
        messages: Vec<Message>,
        temperature: f32,
        max_tokens: u32,
    ) -> Result<String, LlmError> {
        let body = Self::build_request_body(&messages, temperature, max_tokens);

        debug!(model = %self.model, messages = messages.len(), "Gemini generate request");

        let response = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(LlmError::ApiError {
                status: status.as_u16(),
                body,
            });
        }

        let resp: Value = response.json().await?;
        extract_text(&resp)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_body_structure() {
        let messages = vec![
            Message::system("Answer from the knowledge block only."),
            Message::user("Hello"),
            Message { role: Role::Assistant, content: "Hi there!".into() },
            Message::user("Which degree is listed?"),
        ];

        let body = GeminiProvider::build_request_body(&messages, 0.1, 4096);

        assert_eq!(
            body["system_instruction"]["parts"][0]["text"].as_str().unwrap(),
            "Answer from the knowledge block only.",
        );

        // Contents should not include system message
        let contents = body["contents"].as_array().unwrap();
        assert_eq!(contents.len(), 3);
        assert_eq!(contents[0]["role"], "user");
        assert_eq!(contents[0]["parts"][0]["text"], "Hello");

        // Assistant turns are "model" on the wire
        assert_eq!(contents[1]["role"], "model");
        assert_eq!(contents[2]["parts"][0]["text"], "Which degree is listed?");

        let temp = body["generationConfig"]["temperature"].as_f64().unwrap();
        assert!((temp - 0.1).abs() < 1e-6, "temperature should be ~0.1, got {temp}");
        assert_eq!(body["generationConfig"]["maxOutputTokens"], 4096);
    }

    #[test]
    fn test_request_body_without_system() {
        let body = GeminiProvider::build_request_body(&[Message::user("Hello")], 0.5, 2048);

        assert!(body.get("system_instruction").is_none());
        let contents = body["contents"].as_array().unwrap();
        assert_eq!(contents.len(), 1);
        assert_eq!(contents[0]["role"], "user");
    }

    #[test]
    fn endpoint_uses_bare_model_name() {
        let provider = GeminiProvider::new("k".into(), "models/gemini-2.0-flash".into(), Duration::from_secs(1))
            .with_base_url("http://localhost:8080/");
        assert_eq!(provider.model(), "gemini-2.0-flash");
        assert_eq!(
            provider.endpoint(),
            "http://localhost:8080/v1beta/models/gemini-2.0-flash:generateContent"
        );
    }

    #[test]
    fn extract_text_joins_parts() {
        let resp = json!({
            "candidates": [{ "content": { "parts": [{ "text": "Hola, " }, { "text": "mundo" }] } }]
        });
        assert_eq!(extract_text(&resp).unwrap(), "Hola, mundo");
    }

    #[test]
    fn extract_text_reports_missing_content() {
        let err = extract_text(&json!({ "candidates": [] })).unwrap_err();
        assert!(matches!(err, LlmError::ParseError(_)));

        let blocked = json!({
            "candidates": [{ "content": { "parts": [] }, "finishReason": "SAFETY" }]
        });
        let err = extract_text(&blocked).unwrap_err();
        assert!(err.to_string().contains("SAFETY"));
    }

    #[test]
    fn from_config_requires_api_key() {
        let config = GeminiConfig {
            api_key: None,
            base_url: "http://localhost".into(),
            model: "gemini-2.0-flash".into(),
            embed_model: "models/text-embedding-004".into(),
        };
        assert!(GeminiProvider::from_config(&config, Duration::from_secs(1)).is_err());
    }
}
