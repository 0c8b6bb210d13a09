use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::error::SendError;
use crate::provider::{ChatProvider, SendRequest};

const ANTHROPIC_VERSION: &str = "2023-06-01";

#[derive(Serialize)]
struct ClaudeMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Serialize)]
struct ClaudeRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    messages: Vec<ClaudeMessage<'a>>,
    system: &'a str,
}

#[derive(Deserialize)]
struct ClaudeContent {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Deserialize)]
struct ClaudeResponse {
    #[serde(default)]
    content: Vec<ClaudeContent>,
}

#[derive(Clone)]
pub struct ClaudeClient {
    client: Client,
    api_key: Option<String>,
    endpoint: String,
    model: String,
    max_tokens: u32,
}

impl ClaudeClient {
    pub fn new(api_key: Option<String>, model: &str, max_tokens: u32) -> Self {
        Self {
            client: Client::new(),
            api_key,
            endpoint: crate::config::DEFAULT_API_URL.to_string(),
            model: model.to_string(),
            max_tokens,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.resolve_api_key(), config.model(), config.max_tokens())
            .with_endpoint(config.api_url())
    }

    pub fn with_endpoint(mut self, endpoint: &str) -> Self {
        self.endpoint = endpoint.to_string();
        self
    }

    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    fn build_body<'a>(&'a self, request: &'a SendRequest) -> ClaudeRequest<'a> {
        ClaudeRequest {
            model: &self.model,
            max_tokens: self.max_tokens,
            messages: request
                .messages
                .iter()
                .map(|turn| ClaudeMessage {
                    role: turn.role.as_str(),
                    content: &turn.content,
                })
                .collect(),
            system: &request.system,
        }
    }
}

/// Pull `content[0].text` out of a successful response body
fn extract_reply(body: &str) -> Result<String, SendError> {
    let claude_response: ClaudeResponse = serde_json::from_str(body)?;
    claude_response
        .content
        .into_iter()
        .next()
        .and_then(|c| c.text)
        .ok_or(SendError::MissingText)
}

#[async_trait]
impl ChatProvider for ClaudeClient {
    async fn complete(&self, request: &SendRequest) -> Result<String, SendError> {
        let mut builder = self.client
            .post(&self.endpoint)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("content-type", "application/json");

        if let Some(key) = &self.api_key {
            builder = builder.header("x-api-key", key);
        }

        tracing::debug!(
            model = %self.model,
            messages = request.messages.len(),
            "sending messages request"
        );

        let response = builder.json(&self.build_body(request)).send().await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(SendError::Status { status, body });
        }

        extract_reply(&body)
    }

    fn model(&self) -> &str {
        &self.model
    }

    fn display_name(&self) -> &'static str {
        "Claude"
    }
}
