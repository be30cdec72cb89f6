//! Completion API client seam.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Default completion endpoint (OpenAI-compatible chat completions).
pub const DEFAULT_ENDPOINT: &str = "https://openrouter.ai/api/v1/chat/completions";

/// One chat message.
#[derive(Debug, Clone, Serialize, Deserialize)]
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

/// Outbound completion request.
#[derive(Debug, Clone, Serialize)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub temperature: f64,
    pub max_tokens: u32,
    pub top_p: f64,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: String,
}

#[derive(Debug, Deserialize)]
struct Usage {
    total_tokens: u64,
}

/// A successful completion.
#[derive(Debug, Clone)]
pub struct Completion {
    /// The assistant message content (expected to be a JSON object).
    pub content: String,
    /// Total tokens billed for the call; 0 when the provider omits usage.
    pub tokens_used: u64,
}

/// Transport-level failures. A timeout is treated identically to any other
/// transport failure by the caller: fail over to the next model, once.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("no API key configured")]
    MissingApiKey,

    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("non-success status: {0}")]
    Status(u16),

    #[error("response missing choices[0].message.content")]
    MissingContent,
}

/// Seam between the escalator and the completion API; tests substitute a
/// scripted implementation.
#[async_trait]
pub trait CompletionClient: Send + Sync {
    async fn complete(
        &self,
        request: ChatRequest,
        timeout: Duration,
    ) -> Result<Completion, ClientError>;
}

/// reqwest-backed client for OpenAI-compatible completion endpoints.
pub struct HttpCompletionClient {
    api_key: Option<String>,
    endpoint: String,
    client: reqwest::Client,
}

impl HttpCompletionClient {
    pub fn new(api_key: Option<String>) -> Self {
        Self::with_endpoint(api_key, DEFAULT_ENDPOINT.to_string())
    }

    pub fn with_endpoint(api_key: Option<String>, endpoint: String) -> Self {
        Self {
            api_key,
            endpoint,
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl CompletionClient for HttpCompletionClient {
    async fn complete(
        &self,
        request: ChatRequest,
        timeout: Duration,
    ) -> Result<Completion, ClientError> {
        let api_key = self.api_key.as_deref().ok_or(ClientError::MissingApiKey)?;

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(api_key)
            .json(&request)
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ClientError::Timeout(timeout)
                } else {
                    ClientError::Transport(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(ClientError::Status(status.as_u16()));
        }

        let body: ChatResponse = response
            .json()
            .await
            .map_err(|e| ClientError::Transport(e.to_string()))?;

        let content = body
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or(ClientError::MissingContent)?;

        Ok(Completion {
            content,
            tokens_used: body.usage.map(|u| u.total_tokens).unwrap_or(0),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_serializes_expected_shape() {
        let request = ChatRequest {
            model: "test/model".to_string(),
            messages: vec![ChatMessage::system("sys"), ChatMessage::user("usr")],
            temperature: 0.0,
            max_tokens: 150,
            top_p: 1.0,
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["model"], "test/model");
        assert_eq!(json["messages"][0]["role"], "system");
        assert_eq!(json["messages"][1]["content"], "usr");
        assert_eq!(json["max_tokens"], 150);
    }

    #[test]
    fn test_response_parsing() {
        let raw = r#"{
            "choices": [{"message": {"role": "assistant", "content": "{\"ok\":true}"}}],
            "usage": {"prompt_tokens": 10, "completion_tokens": 5, "total_tokens": 15}
        }"#;
        let parsed: ChatResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(parsed.choices[0].message.content, "{\"ok\":true}");
        assert_eq!(parsed.usage.unwrap().total_tokens, 15);
    }

    #[tokio::test]
    async fn test_missing_api_key_is_transport_failure() {
        let client = HttpCompletionClient::new(None);
        let request = ChatRequest {
            model: "m".to_string(),
            messages: vec![],
            temperature: 0.0,
            max_tokens: 10,
            top_p: 1.0,
        };
        let err = client
            .complete(request, Duration::from_secs(1))
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::MissingApiKey));
    }
}
