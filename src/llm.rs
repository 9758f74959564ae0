//! Minimal client for OpenAI-compatible chat completion endpoints.

use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("unexpected status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("empty completion")]
    Empty,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self { role: Role::System, content: content.into() }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self { role: Role::User, content: content.into() }
    }
}

#[derive(Debug, Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    max_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChatMessage,
}

#[derive(Debug, Clone)]
pub struct LlmParams {
    /// Base url, e.g. `https://api.openai.com/v1`.
    pub api: String,
    pub token: String,
    pub model: String,
    pub timeout: Duration,
}

#[derive(Clone)]
pub struct LlmClient {
    client: Client,
    params: LlmParams,
}

impl LlmClient {
    pub fn new(params: LlmParams) -> Result<Self, LlmError> {
        let client = Client::builder().timeout(params.timeout).build()?;
        Ok(Self { client, params })
    }

    /// Sends the conversation and returns the first choice's text.
    pub async fn complete(&self, messages: &[ChatMessage], max_tokens: u32) -> Result<String, LlmError> {
        let url = format!("{}/chat/completions", self.params.api.trim_end_matches('/'));
        let req = CompletionRequest {
            model: &self.params.model,
            messages,
            max_tokens,
        };
        let resp = self
            .client
            .post(url)
            .bearer_auth(&self.params.token)
            .json(&req)
            .send()
            .await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(LlmError::Status { status: status.as_u16(), body });
        }
        let completion: CompletionResponse = resp.json().await?;
        completion
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or(LlmError::Empty)
    }
}
