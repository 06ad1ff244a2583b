//! HTTP client for external reasoning services (vLLM, OpenAI, Gemini-compatible proxies)

use crate::config::ReasoningServiceConfig;
use crate::error::{ClauseMindError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Trait for reasoning service clients
#[async_trait]
pub trait ReasoningClient: Send + Sync {
    /// Generate a chat completion
    async fn complete(&self, messages: Vec<ChatMessage>) -> Result<String>;

    /// Get model name
    fn model_name(&self) -> &str;
}

/// Chat message for completion requests
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

/// OpenAI-compatible chat completion client
pub struct HttpReasoningClient {
    http_client: reqwest::Client,
    config: ReasoningServiceConfig,
}

impl HttpReasoningClient {
    /// Create new client from configuration
    pub fn new(config: ReasoningServiceConfig) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(ClauseMindError::Http)?;

        Ok(Self {
            http_client,
            config,
        })
    }
}

fn transient_status(status: reqwest::StatusCode) -> bool {
    status.is_server_error()
        || status == reqwest::StatusCode::TOO_MANY_REQUESTS
        || status == reqwest::StatusCode::REQUEST_TIMEOUT
}

#[async_trait]
impl ReasoningClient for HttpReasoningClient {
    async fn complete(&self, messages: Vec<ChatMessage>) -> Result<String> {
        #[derive(Serialize)]
        struct ChatRequest<'a> {
            model: &'a str,
            messages: Vec<ChatMessage>,
            temperature: f32,
            max_tokens: u32,
        }

        #[derive(Deserialize)]
        struct ChatResponse {
            choices: Vec<ChatChoice>,
        }

        #[derive(Deserialize)]
        struct ChatChoice {
            message: ChatMessage,
        }

        let request = ChatRequest {
            model: &self.config.model,
            messages,
            temperature: self.config.temperature,
            max_tokens: self.config.max_tokens,
        };

        let url = format!(
            "{}/v1/chat/completions",
            self.config.url.trim_end_matches('/')
        );

        let mut req = self.http_client.post(&url).json(&request);
        if let Some(ref api_key) = self.config.api_key {
            req = req.header("Authorization", format!("Bearer {}", api_key));
        }

        let response = req.send().await.map_err(ClauseMindError::Http)?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(ClauseMindError::ReasoningService {
                message: format!("HTTP {}: {}", status, body),
                transient: transient_status(status),
            });
        }

        let chat_response: ChatResponse =
            response.json().await.map_err(ClauseMindError::Http)?;

        let content = chat_response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| ClauseMindError::ReasoningService {
                message: "no choices in response".to_string(),
                transient: false,
            })?
            .message
            .content;

        Ok(content)
    }

    fn model_name(&self) -> &str {
        &self.config.model
    }
}

/// Extract the JSON object from an LLM response (handles markdown fences
/// and surrounding prose)
pub(crate) fn extract_json_object(response: &str) -> Option<&str> {
    let start = response.find('{')?;
    let end = response.rfind('}')?;
    if end < start {
        return None;
    }
    Some(&response[start..=end])
}
