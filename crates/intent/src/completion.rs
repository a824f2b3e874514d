//! Chat completion service
//!
//! [`ChatCompletionClient`] talks to an OpenAI-compatible
//! `/chat/completions` endpoint with a strict JSON-schema response format.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use swapdesk_core::CompletionConfig;
use tracing::debug;

use crate::schema::response_schema;
use crate::IntentError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

/// Text-completion backend; returns the raw assistant message
#[async_trait]
pub trait CompletionService: Send + Sync {
    async fn complete(&self, messages: &[ChatMessage]) -> Result<String, IntentError>;
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    temperature: f32,
    messages: &'a [ChatMessage],
    response_format: Value,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    refusal: Option<String>,
}

#[derive(Clone)]
pub struct ChatCompletionClient {
    client: Client,
    base_url: String,
    api_key: String,
    model: String,
    temperature: f32,
    timeout: Duration,
}

impl ChatCompletionClient {
    pub fn new(config: &CompletionConfig) -> Self {
        Self {
            client: Client::new(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            temperature: config.temperature,
            timeout: Duration::from_secs(config.timeout_secs),
        }
    }

    pub fn is_configured(&self) -> bool {
        !self.api_key.is_empty()
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

#[async_trait]
impl CompletionService for ChatCompletionClient {
    async fn complete(&self, messages: &[ChatMessage]) -> Result<String, IntentError> {
        if !self.is_configured() {
            return Err(IntentError::NotConfigured);
        }

        let request = ChatRequest {
            model: &self.model,
            temperature: self.temperature,
            messages,
            response_format: json!({
                "type": "json_schema",
                "json_schema": {
                    "name": "swapdesk_intent",
                    "strict": true,
                    "schema": response_schema(),
                }
            }),
        };
        debug!(
            "Completion request: model={}, messages={}",
            self.model,
            messages.len()
        );

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&request)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| IntentError::Service(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(IntentError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| IntentError::Service(format!("unreadable response: {}", e)))?;
        let message = parsed
            .choices
            .into_iter()
            .next()
            .map(|c| c.message)
            .ok_or_else(|| IntentError::Service("response has no choices".to_string()))?;

        if let Some(refusal) = message.refusal {
            return Err(IntentError::unresolved(format!("model refused: {}", refusal)));
        }
        message
            .content
            .filter(|c| !c.trim().is_empty())
            .ok_or_else(|| IntentError::Service("response has no content".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_missing_key_fails_without_request() {
        let client = ChatCompletionClient::new(&CompletionConfig::default());
        assert!(!client.is_configured());
        assert_eq!(client.model(), "gpt-4.1-nano-2025-04-14");

        let err = client
            .complete(&[ChatMessage::user("swap 1 WETH for TEST")])
            .await
            .unwrap_err();
        assert_eq!(err, IntentError::NotConfigured);
    }

    #[test]
    fn test_request_shape() {
        let messages = [ChatMessage::system("s"), ChatMessage::user("u")];
        let request = ChatRequest {
            model: "m",
            temperature: 0.0,
            messages: &messages,
            response_format: json!({"type": "json_schema"}),
        };
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["messages"][1], json!({"role": "user", "content": "u"}));
        assert_eq!(value["response_format"]["type"], "json_schema");
    }
}
