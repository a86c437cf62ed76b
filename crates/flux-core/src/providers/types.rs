//! Provider-agnostic completion types

use async_trait::async_trait;

use crate::agents::AgentId;
use crate::error::ProviderError;

/// One persona-parameterised completion call
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    /// Agent on whose behalf the call is made (for logging and test doubles)
    pub agent: AgentId,
    pub model: String,
    pub system: String,
    pub user: String,
    pub max_tokens: u32,
    pub temperature: f32,
}

/// Why the model stopped generating
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FinishReason {
    Stop,
    Length,
    #[default]
    Unknown,
}

impl FinishReason {
    pub fn from_wire(reason: Option<&str>) -> Self {
        match reason {
            Some("stop") => Self::Stop,
            Some("length") => Self::Length,
            _ => Self::Unknown,
        }
    }
}

/// Token usage from a single call
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CompletionUsage {
    pub input_tokens: u32,
    pub output_tokens: u32,
}

/// Completed text plus bookkeeping
#[derive(Debug, Clone, PartialEq)]
pub struct Completion {
    pub text: String,
    pub finish_reason: FinishReason,
    pub usage: CompletionUsage,
}

impl Completion {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            finish_reason: FinishReason::Stop,
            usage: CompletionUsage::default(),
        }
    }
}

/// Trait that every completion backend implements
#[async_trait]
pub trait CompletionClient: Send + Sync {
    /// Human-readable provider name (e.g. "groq")
    fn provider_name(&self) -> &str;

    /// Send one system + user exchange and return the assistant text
    async fn complete(&self, request: CompletionRequest) -> Result<Completion, ProviderError>;
}
