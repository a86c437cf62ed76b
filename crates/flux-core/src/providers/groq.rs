//! Groq provider - OpenAI-compatible chat completions

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use crate::error::ProviderError;

use super::types::{
    Completion, CompletionClient, CompletionRequest, CompletionUsage, FinishReason,
};

pub const DEFAULT_BASE_URL: &str = "https://api.groq.com/openai";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

/// Groq chat-completions client
pub struct GroqClient {
    client: Client,
    api_key: String,
    base_url: String,
}

impl std::fmt::Debug for GroqClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GroqClient")
            .field("base_url", &self.base_url)
            .finish()
    }
}

impl GroqClient {
    /// Create a client against `base_url` (e.g. `https://api.groq.com/openai`)
    pub fn new(api_key: String, base_url: impl Into<String>) -> Result<Self, ProviderError> {
        let client = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Ok(Self {
            client,
            api_key,
            base_url,
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/v1/chat/completions", self.base_url)
    }

    fn to_wire(request: &CompletionRequest) -> WireRequest<'_> {
        WireRequest {
            model: &request.model,
            max_tokens: request.max_tokens,
            temperature: request.temperature,
            messages: vec![
                WireMessage {
                    role: "system",
                    content: &request.system,
                },
                WireMessage {
                    role: "user",
                    content: &request.user,
                },
            ],
        }
    }

    fn from_wire(resp: WireResponse) -> Result<Completion, ProviderError> {
        let choice = resp
            .choices
            .into_iter()
            .next()
            .ok_or(ProviderError::EmptyResponse)?;

        let usage = resp.usage.map_or(CompletionUsage::default(), |u| CompletionUsage {
            input_tokens: u.prompt_tokens,
            output_tokens: u.completion_tokens,
        });

        Ok(Completion {
            text: choice.message.content.unwrap_or_default(),
            finish_reason: FinishReason::from_wire(choice.finish_reason.as_deref()),
            usage,
        })
    }
}

#[async_trait]
impl CompletionClient for GroqClient {
    fn provider_name(&self) -> &str {
        "groq"
    }

    async fn complete(&self, request: CompletionRequest) -> Result<Completion, ProviderError> {
        debug!(
            "Groq request: agent={}, model={}, prompt_chars={}",
            request.agent,
            request.model,
            request.user.len()
        );

        let response = self
            .client
            .post(self.endpoint())
            .bearer_auth(&self.api_key)
            .json(&Self::to_wire(&request))
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(ProviderError::from_status(status.as_u16(), body));
        }

        let wire: WireResponse =
            serde_json::from_str(&body).map_err(|e| ProviderError::Decode(e.to_string()))?;
        let completion = Self::from_wire(wire)?;

        debug!(
            "Groq response: agent={}, finish={:?}, tokens={}/{}",
            request.agent,
            completion.finish_reason,
            completion.usage.input_tokens,
            completion.usage.output_tokens
        );
        Ok(completion)
    }
}

// ── Wire types ──

#[derive(Debug, Serialize)]
struct WireRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    temperature: f32,
    messages: Vec<WireMessage<'a>>,
}

#[derive(Debug, Serialize)]
struct WireMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct WireResponse {
    choices: Vec<WireChoice>,
    usage: Option<WireUsage>,
}

#[derive(Debug, Deserialize)]
struct WireChoice {
    message: WireChoiceMessage,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WireChoiceMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WireUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
}
