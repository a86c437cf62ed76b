//! Gateway protocol - HTTP envelopes and WebSocket frames

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use flux_core::collaboration::CollaborationOutcome;
use flux_core::{AgentId, ChatMode, ChatRequest, FluxError, ResponseRecord, UploadedFile};

pub const NOT_CONFIGURED_ERROR: &str = "GROQ_API_KEY not configured";
pub const POST_ERROR_MESSAGE: &str = "Error processing POST request";

/// Successful `POST /chat` body
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatEnvelope {
    pub responses: Vec<ResponseRecord>,
    pub groq_configured: bool,
    pub agents_responded: usize,
    pub collaboration_rounds: u32,
    pub documents_analyzed: usize,
    /// Set only when the provider is not configured
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl From<CollaborationOutcome> for ChatEnvelope {
    fn from(outcome: CollaborationOutcome) -> Self {
        let agents_responded = outcome.agents_responded();
        Self {
            error: (!outcome.configured).then(|| NOT_CONFIGURED_ERROR.to_string()),
            groq_configured: outcome.configured,
            agents_responded,
            collaboration_rounds: outcome.rounds,
            documents_analyzed: outcome.documents_analyzed,
            responses: outcome.responses,
        }
    }
}

/// Body returned, with status 200, when a request could not be processed
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ErrorEnvelope {
    pub error: String,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

impl ErrorEnvelope {
    pub fn new(error: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            message: message.into(),
            timestamp: Utc::now(),
        }
    }

    pub fn post(error: &dyn std::fmt::Display) -> Self {
        Self::new(error.to_string(), POST_ERROR_MESSAGE)
    }
}

// ── WebSocket frames ──

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum FrameKind {
    #[default]
    Message,
    Ping,
}

/// Client → Gateway frame. `type` defaults to `message`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct ClientFrame {
    #[serde(rename = "type", default)]
    pub kind: FrameKind,
    #[serde(default)]
    pub message: String,
    #[serde(rename = "uploadedFiles", alias = "uploaded_files", default)]
    pub uploaded_files: Vec<UploadedFile>,
    #[serde(default)]
    pub chat_mode: Option<ChatMode>,
    #[serde(default)]
    pub agent: Option<String>,
}

impl ClientFrame {
    pub fn parse(raw: &str) -> Result<Self, FluxError> {
        serde_json::from_str(raw)
            .map_err(|e| FluxError::InvalidInput(format!("Invalid JSON: {}", e)))
    }

    pub fn into_request(self) -> ChatRequest {
        ChatRequest {
            message: self.message,
            uploaded_files: self.uploaded_files,
            chat_mode: self.chat_mode,
            agent: self.agent,
        }
    }
}

/// Gateway → Client event
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerEvent {
    System {
        message: String,
        timestamp: DateTime<Utc>,
    },
    AgentResponse {
        #[serde(flatten)]
        record: ResponseRecord,
    },
    Typing {
        agent: AgentId,
        typing: bool,
        timestamp: DateTime<Utc>,
    },
    Pong {
        timestamp: DateTime<Utc>,
    },
}

impl ServerEvent {
    pub fn system(message: impl Into<String>) -> Self {
        Self::System {
            message: message.into(),
            timestamp: Utc::now(),
        }
    }

    pub fn typing(agent: AgentId, typing: bool) -> Self {
        Self::Typing {
            agent,
            typing,
            timestamp: Utc::now(),
        }
    }

    pub fn pong() -> Self {
        Self::Pong {
            timestamp: Utc::now(),
        }
    }
}

// ── POST body parsing ──

/// Parse a `POST /chat` body as JSON or as an urlencoded form
pub fn parse_chat_body(content_type: Option<&str>, body: &[u8]) -> Result<ChatRequest, FluxError> {
    let is_form = content_type
        .map(|ct| ct.starts_with("application/x-www-form-urlencoded"))
        .unwrap_or(false);
    if is_form {
        parse_form(body)
    } else {
        serde_json::from_slice(body)
            .map_err(|e| FluxError::InvalidInput(format!("Invalid JSON: {}", e)))
    }
}

fn parse_form(body: &[u8]) -> Result<ChatRequest, FluxError> {
    let mut request = ChatRequest::default();
    for (key, value) in url::form_urlencoded::parse(body) {
        match key.as_ref() {
            "message" => request.message = value.into_owned(),
            "chat_mode" => {
                let mode = ChatMode::from_string(&value).ok_or_else(|| {
                    FluxError::InvalidInput(format!("unknown chat_mode '{}'", value))
                })?;
                request.chat_mode = Some(mode);
            }
            "agent" if !value.is_empty() => request.agent = Some(value.into_owned()),
            "uploaded_files" | "uploadedFiles" if !value.is_empty() => {
                request.uploaded_files = serde_json::from_str(&value).map_err(|e| {
                    FluxError::InvalidInput(format!("Invalid uploaded_files: {}", e))
                })?;
            }
            _ => {}
        }
    }
    Ok(request)
}
