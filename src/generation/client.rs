//! OpenAI-compatible chat completions client
//!
//! Calls `POST {api_base}/chat/completions` with bearer authentication.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tracing::{debug, info};

use super::{Completion, Generator, TokenUsage};
use crate::config::GenerationSettings;
use crate::errors::GenerationError;
use crate::types::{ChatMessage, Role};

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    model: Option<String>,
    #[serde(default)]
    choices: Vec<ChatChoice>,
    #[serde(default)]
    usage: Option<TokenUsage>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

/// HTTP client for chat completion APIs
pub struct ChatCompletionsClient {
    client: Client,
    settings: GenerationSettings,
    api_key: Option<String>,
}

impl ChatCompletionsClient {
    /// Create a new chat completions client
    ///
    /// # Arguments
    /// * `settings` - Endpoint, model and sampling settings
    /// * `api_key` - Bearer token; requests fail with `NotConfigured` when absent
    pub fn new(settings: GenerationSettings, api_key: Option<String>) -> Result<Self, GenerationError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()
            .map_err(|e| GenerationError::Http(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            settings,
            api_key: api_key.filter(|key| !key.trim().is_empty()),
        })
    }

    /// Create a client reading the API key from the configured environment variable
    pub fn from_env(settings: GenerationSettings) -> Result<Self, GenerationError> {
        let api_key = std::env::var(&settings.api_key_env).ok();
        Self::new(settings, api_key)
    }

    pub fn settings(&self) -> &GenerationSettings {
        &self.settings
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.settings.api_base.trim_end_matches('/'))
    }

    /// Prepend the configured system prompt unless the conversation has one
    fn prepare_messages(&self, messages: &[ChatMessage]) -> Vec<ChatMessage> {
        let mut prepared = messages.to_vec();
        if let Some(prompt) = &self.settings.system_prompt {
            if !prepared.iter().any(|m| m.role == Role::System) {
                prepared.insert(0, ChatMessage::system(prompt.clone()));
            }
        }
        prepared
    }
}

#[async_trait]
impl Generator for ChatCompletionsClient {
    async fn generate(&self, messages: &[ChatMessage]) -> Result<Completion, GenerationError> {
        let api_key = self.api_key.as_deref().ok_or_else(|| {
            GenerationError::NotConfigured(format!("{} is not set", self.settings.api_key_env))
        })?;

        let body = ChatCompletionRequest {
            model: &self.settings.model,
            messages: self.prepare_messages(messages),
            temperature: self.settings.temperature,
            max_tokens: self.settings.max_tokens,
        };

        let started = Instant::now();
        let response = self
            .client
            .post(self.endpoint())
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    GenerationError::Timeout {
                        duration_ms: self.settings.timeout_secs * 1000,
                    }
                } else {
                    GenerationError::Http(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(GenerationError::Upstream {
                status: status.as_u16(),
                message: upstream_error_message(&text)
                    .unwrap_or_else(|| format!("API returned status {}", status.as_u16())),
            });
        }

        let parsed: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|e| GenerationError::InvalidResponse(format!("Failed to parse response: {}", e)))?;

        let latency_ms = started.elapsed().as_millis() as u64;
        let content = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| GenerationError::InvalidResponse("response has no choices".to_string()))?;

        info!(
            model = %self.settings.model,
            latency_ms,
            total_tokens = parsed.usage.map(|u| u.total_tokens),
            "generation completed"
        );
        debug!(content_len = content.len(), "generation content received");

        Ok(Completion {
            content,
            token_usage: parsed.usage,
            model: parsed.model.unwrap_or_else(|| self.settings.model.clone()),
            latency_ms,
        })
    }
}

/// Pull `error.message` out of an upstream error body
fn upstream_error_message(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    value
        .get("error")?
        .get("message")?
        .as_str()
        .map(str::to_string)
}
