//! Shared types for flux-core

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::agents::AgentDefinition;

/// Identifier used for records produced by the service itself
pub const SYSTEM_AGENT: &str = "system";

/// How the router picks responders
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ChatMode {
    /// One agent, addressed by name at the start of the message
    Single,
    /// Keyword routing across the whole team
    #[default]
    Team,
}

impl ChatMode {
    pub fn from_string(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "single" => Some(Self::Single),
            "team" => Some(Self::Team),
            _ => None,
        }
    }
}

impl std::fmt::Display for ChatMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Single => write!(f, "single"),
            Self::Team => write!(f, "team"),
        }
    }
}

/// A document attached to a chat message
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct UploadedFile {
    pub name: String,
    #[serde(rename = "type", default)]
    pub mime_type: String,
    #[serde(default)]
    pub size: u64,
    /// Extracted text, or a `data:` URL for binary uploads
    #[serde(default)]
    pub content: Option<String>,
}

impl UploadedFile {
    /// Text content suitable for a prompt, if the upload carried any
    pub fn text(&self) -> Option<&str> {
        match self.content.as_deref() {
            Some(c) if !c.is_empty() && !c.starts_with("data:") => Some(c),
            _ => None,
        }
    }
}

/// Inbound chat request, shared by the HTTP, WebSocket and CLI front ends
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct ChatRequest {
    #[serde(default)]
    pub message: String,
    #[serde(default, alias = "uploadedFiles")]
    pub uploaded_files: Vec<UploadedFile>,
    #[serde(default)]
    pub chat_mode: Option<ChatMode>,
    /// Explicit agent identifier, bypasses keyword routing when known
    #[serde(default)]
    pub agent: Option<String>,
}

impl ChatRequest {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            ..Self::default()
        }
    }

    pub fn with_mode(mut self, mode: ChatMode) -> Self {
        self.chat_mode = Some(mode);
        self
    }

    pub fn with_files(mut self, files: Vec<UploadedFile>) -> Self {
        self.uploaded_files = files;
        self
    }

    pub fn with_agent(mut self, agent: impl Into<String>) -> Self {
        self.agent = Some(agent.into());
        self
    }

    pub fn has_files(&self) -> bool {
        !self.uploaded_files.is_empty()
    }
}

/// One agent's answer in one round. Never mutated after creation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ResponseRecord {
    pub agent: String,
    pub agent_name: String,
    pub message: String,
    pub timestamp: DateTime<Utc>,
    pub round: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ResponseRecord {
    pub fn success(agent: &AgentDefinition, round: u32, message: impl Into<String>) -> Self {
        Self {
            agent: agent.id.to_string(),
            agent_name: agent.label(),
            message: message.into(),
            timestamp: Utc::now(),
            round,
            error: None,
        }
    }

    /// In-character error record for a failed completion call
    pub fn failure(agent: &AgentDefinition, round: u32, error: &dyn std::fmt::Display) -> Self {
        let error = error.to_string();
        Self {
            agent: agent.id.to_string(),
            agent_name: agent.label(),
            message: format!("I encountered an error processing your request: {}", error),
            timestamp: Utc::now(),
            round,
            error: Some(error),
        }
    }

    /// Synthetic record produced by the service rather than an agent
    pub fn system(message: impl Into<String>) -> Self {
        Self {
            agent: SYSTEM_AGENT.to_string(),
            agent_name: "FLUX System".to_string(),
            message: message.into(),
            timestamp: Utc::now(),
            round: 1,
            error: None,
        }
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::{AgentId, AgentRegistry};

    #[test]
    fn test_chat_mode_parse() {
        assert_eq!(ChatMode::from_string("Single"), Some(ChatMode::Single));
        assert_eq!(ChatMode::from_string(" team "), Some(ChatMode::Team));
        assert_eq!(ChatMode::from_string("solo"), None);
        assert_eq!(ChatMode::default(), ChatMode::Team);
        assert_eq!(ChatMode::Single.to_string(), "single");
    }

    #[test]
    fn test_chat_request_deserialize_aliases() {
        let json = r#"{
            "message": "review this",
            "uploadedFiles": [{"name": "spec.md", "type": "text/markdown", "size": 12, "content": "hello"}],
            "chat_mode": "team"
        }"#;
        let req: ChatRequest = serde_json::from_str(json).unwrap();
        assert_eq!(req.message, "review this");
        assert_eq!(req.uploaded_files.len(), 1);
        assert_eq!(req.uploaded_files[0].mime_type, "text/markdown");
        assert_eq!(req.chat_mode, Some(ChatMode::Team));
        assert!(req.agent.is_none());
    }

    #[test]
    fn test_chat_request_minimal() {
        let req: ChatRequest = serde_json::from_str(r#"{"message":"hi"}"#).unwrap();
        assert!(!req.has_files());
        assert!(req.chat_mode.is_none());
    }

    #[test]
    fn test_uploaded_file_text() {
        let mut file = UploadedFile {
            name: "a.txt".into(),
            mime_type: "text/plain".into(),
            size: 3,
            content: Some("abc".into()),
        };
        assert_eq!(file.text(), Some("abc"));

        file.content = Some("data:image/png;base64,AAAA".into());
        assert_eq!(file.text(), None);

        file.content = None;
        assert_eq!(file.text(), None);
    }

    #[test]
    fn test_failure_record_carries_error() {
        let registry = AgentRegistry::builtin();
        let record = ResponseRecord::failure(registry.get(AgentId::Ramos), 2, &"timeout");
        assert_eq!(record.agent, "ramos");
        assert_eq!(record.round, 2);
        assert_eq!(record.error.as_deref(), Some("timeout"));
        assert!(record.message.contains("timeout"));
        assert!(record.agent_name.contains("Security Expert"));
    }

    #[test]
    fn test_success_record_omits_error_field() {
        let registry = AgentRegistry::builtin();
        let record = ResponseRecord::success(registry.get(AgentId::Messi), 1, "User stories ready");
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["agent"], "messi");
        assert_eq!(json["round"], 1);
        assert!(json.get("error").is_none());
    }

    #[test]
    fn test_system_record() {
        let record = ResponseRecord::system("not configured");
        assert_eq!(record.agent, SYSTEM_AGENT);
        assert_eq!(record.round, 1);
        assert!(!record.is_error());
    }
}
