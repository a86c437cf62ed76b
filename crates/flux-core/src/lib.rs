//! flux-core - agent registry, routing and the collaboration loop
//!
//! This crate provides:
//! - The closed set of agent personas and their registry
//! - Keyword routing that picks the first round of responders
//! - The multi-round collaboration loop with mention-driven growth
//! - A Groq chat-completions client behind the `CompletionClient` trait

pub mod agents;
pub mod collaboration;
pub mod documents;
pub mod error;
pub mod providers;
pub mod router;
#[cfg(any(test, feature = "testing"))]
pub mod testing;
pub mod types;

// Re-export main types for convenience
pub use agents::{AgentDefinition, AgentId, AgentRegistry};
pub use collaboration::{
    Collaboration, CollaborationConfig, CollaborationEvent, CollaborationOutcome, MentionGrowth,
};
pub use error::{FluxError, ProviderError};
pub use providers::{CompletionClient, CompletionRequest, GroqClient};
pub use router::{Route, RouteInput, Router, RoutingDecision, classify};
pub use types::{ChatMode, ChatRequest, ResponseRecord, UploadedFile};
