//! Deterministic completion client for tests in every crate

use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use crate::agents::AgentId;
use crate::error::ProviderError;
use crate::providers::{Completion, CompletionClient, CompletionRequest};

pub const DEFAULT_REPLY: &str = "Noted.";

/// Replies from per-agent queues. The last queued reply repeats once the
/// queue is down to one entry; agents with nothing queued answer
/// [`DEFAULT_REPLY`]. Every request is recorded.
#[derive(Debug, Default)]
pub struct ScriptedClient {
    replies: Mutex<HashMap<AgentId, VecDeque<String>>>,
    failures: HashMap<AgentId, String>,
    calls: Mutex<Vec<CompletionRequest>>,
}

impl ScriptedClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a reply for `agent`
    pub fn reply(self, agent: AgentId, text: impl Into<String>) -> Self {
        if let Ok(mut replies) = self.replies.lock() {
            replies.entry(agent).or_default().push_back(text.into());
        }
        self
    }

    /// Every call for `agent` fails with a 500 carrying `message`
    pub fn fail(mut self, agent: AgentId, message: impl Into<String>) -> Self {
        self.failures.insert(agent, message.into());
        self
    }

    /// Requests received so far, in call order
    pub fn calls(&self) -> Vec<CompletionRequest> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    /// Agents called so far, in call order
    pub fn called_agents(&self) -> Vec<AgentId> {
        self.calls().into_iter().map(|c| c.agent).collect()
    }

    fn next_reply(&self, agent: AgentId) -> String {
        let Ok(mut replies) = self.replies.lock() else {
            return DEFAULT_REPLY.to_string();
        };
        match replies.get_mut(&agent) {
            Some(queue) if queue.len() > 1 => queue.pop_front().unwrap_or_default(),
            Some(queue) => queue
                .front()
                .cloned()
                .unwrap_or_else(|| DEFAULT_REPLY.to_string()),
            None => DEFAULT_REPLY.to_string(),
        }
    }
}

#[async_trait]
impl CompletionClient for ScriptedClient {
    fn provider_name(&self) -> &str {
        "scripted"
    }

    async fn complete(&self, request: CompletionRequest) -> Result<Completion, ProviderError> {
        let agent = request.agent;
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(request);
        }

        if let Some(message) = self.failures.get(&agent) {
            return Err(ProviderError::Api {
                status: 500,
                body: message.clone(),
            });
        }
        Ok(Completion::text(self.next_reply(agent)))
    }
}
