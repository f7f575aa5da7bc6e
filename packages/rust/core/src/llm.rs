//! Chat-completion client.
//!
//! Generation goes through the [`ChatModel`] trait so the pipeline can run
//! against OpenAI in production and a scripted model in tests.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use fluxsales_shared::{FluxSalesError, Result};

const SERVICE: &str = "openai";

// ---------------------------------------------------------------------------
// Request / reply types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

/// One chat-completion call.
#[derive(Debug, Clone, Serialize)]
pub struct ChatRequest {
    pub model: String,
    pub temperature: f32,
    pub messages: Vec<ChatMessage>,
}

/// Text and token usage of one completion.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChatReply {
    pub text: String,
    pub tokens_in: u64,
    pub tokens_out: u64,
    pub model: String,
}

/// Anything that can answer a chat request.
#[async_trait]
pub trait ChatModel: Send + Sync {
    async fn complete(&self, request: &ChatRequest) -> Result<ChatReply>;
}

// ---------------------------------------------------------------------------
// OpenAI
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    model: String,
    #[serde(default)]
    choices: Vec<Choice>,
    #[serde(default)]
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ReplyMessage,
}

#[derive(Debug, Deserialize)]
struct ReplyMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct Usage {
    #[serde(default)]
    prompt_tokens: u64,
    #[serde(default)]
    completion_tokens: u64,
}

/// OpenAI `/chat/completions` client.
pub struct OpenAiChat {
    client: Client,
    api_key: String,
    base_url: String,
}

impl OpenAiChat {
    pub fn new(
        api_key: impl Into<String>,
        base_url: impl Into<String>,
        timeout_secs: u64,
    ) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| FluxSalesError::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            api_key: api_key.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl ChatModel for OpenAiChat {
    #[instrument(skip_all, fields(model = %request.model, messages = request.messages.len()))]
    async fn complete(&self, request: &ChatRequest) -> Result<ChatReply> {
        let url = format!("{}/chat/completions", self.base_url);
        debug!(url = %url, "chat completion POST");

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(request)
            .send()
            .await
            .map_err(|e| FluxSalesError::Network(format!("{url}: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let detail = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(FluxSalesError::api(
                SERVICE,
                status.as_u16(),
                classify_error(status.as_u16(), &detail),
            ));
        }

        let body: CompletionResponse = response
            .json()
            .await
            .map_err(|e| FluxSalesError::parse(format!("invalid completion response: {e}")))?;

        let text = body
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| FluxSalesError::Generation("completion returned no choices".into()))?;
        let usage = body.usage.unwrap_or_default();

        debug!(
            tokens_in = usage.prompt_tokens,
            tokens_out = usage.completion_tokens,
            "chat completion done"
        );

        Ok(ChatReply {
            text,
            tokens_in: usage.prompt_tokens,
            tokens_out: usage.completion_tokens,
            model: if body.model.is_empty() {
                request.model.clone()
            } else {
                body.model
            },
        })
    }
}

/// Turn an OpenAI error body into something a rep can act on.
fn classify_error(status: u16, detail: &str) -> String {
    let lower = detail.to_lowercase();

    if status == 401 || lower.contains("invalid_api_key") || lower.contains("unauthorized") {
        return "Invalid API key. Check the variable named by openai.api_key_env.".to_string();
    }
    if status == 429 || lower.contains("rate_limit") || lower.contains("quota") {
        return "Rate limit or quota exceeded. Wait and re-run the command.".to_string();
    }
    if lower.contains("model") && (lower.contains("not found") || lower.contains("does not exist"))
    {
        return "Model not found. Check defaults.model in the config.".to_string();
    }
    if lower.contains("billing") || lower.contains("payment") {
        return "Billing issue on the OpenAI account.".to_string();
    }
    detail.to_string()
}

// ---------------------------------------------------------------------------
// Test double
// ---------------------------------------------------------------------------
