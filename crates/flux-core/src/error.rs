//! Error types for flux-core

use thiserror::Error;

/// Errors raised by the registry and by request validation
#[derive(Debug, Error, PartialEq, Eq)]
pub enum FluxError {
    /// Identifier does not name an agent in the registry
    #[error("unknown agent: {0}")]
    UnknownAgent(String),

    /// Request payload could not be understood
    #[error("invalid request: {0}")]
    InvalidInput(String),
}

/// A single completion call failed. Isolated to the agent that made the call.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("authentication rejected by provider: {0}")]
    Unauthorized(String),

    #[error("rate limited by provider: {0}")]
    RateLimited(String),

    #[error("provider returned status {status}: {body}")]
    Api { status: u16, body: String },

    #[error("request to provider failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("failed to decode provider response: {0}")]
    Decode(String),

    #[error("provider response had no choices")]
    EmptyResponse,
}

impl ProviderError {
    /// Map a non-success HTTP status and its body to the matching variant
    pub fn from_status(status: u16, body: String) -> Self {
        match status {
            401 | 403 => Self::Unauthorized(body),
            429 => Self::RateLimited(body),
            _ => Self::Api { status, body },
        }
    }
}

pub type Result<T> = std::result::Result<T, FluxError>;
