//! LLM provider abstraction
//!
//! The collaboration loop only ever talks to a [`CompletionClient`]. The
//! production backend is [`GroqClient`], which speaks the OpenAI
//! chat-completions wire format.

pub mod groq;
pub mod types;

pub use groq::GroqClient;
pub use types::{Completion, CompletionClient, CompletionRequest, CompletionUsage, FinishReason};
