//! Multi-round collaboration loop
//!
//! Each round asks every agent in the current [`RoutingDecision`] in turn,
//! strictly one call at a time. Later rounds see a transcript of everything
//! said so far. After a round, responses are scanned for other agents' names
//! and any newly mentioned agent joins the next round. The loop ends at the
//! round cap or when a round produces nothing.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::agents::{AgentDefinition, AgentId, AgentRegistry};
use crate::documents::{DEFAULT_PREVIEW_CHARS, preview_block};
use crate::error::{FluxError, Result};
use crate::providers::{CompletionClient, CompletionRequest};
use crate::router::{RouteInput, Router, RoutingDecision};
use crate::types::{ChatMode, ChatRequest, ResponseRecord};

pub const NOT_CONFIGURED_MESSAGE: &str = "GROQ_API_KEY is not configured. Set it in the \
     environment or in the [provider] section of the config file to enable the team.";

/// When agents mentioned in a response join the next round.
///
/// Growth only has a next round to feed when `max_rounds` is above one, which
/// today means team mode with documents. Single-mode requests are capped at one
/// round, so `Always` currently behaves like `TeamOnly`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum MentionGrowth {
    /// Only in team mode
    #[default]
    TeamOnly,
    /// Any mode that runs more than one round
    Always,
    Disabled,
}

impl MentionGrowth {
    fn applies(self, mode: ChatMode) -> bool {
        match self {
            Self::TeamOnly => mode == ChatMode::Team,
            Self::Always => true,
            Self::Disabled => false,
        }
    }
}

/// Tunables for the loop
#[derive(Debug, Clone, PartialEq)]
pub struct CollaborationConfig {
    /// Round cap for team-mode requests that carry documents
    pub team_rounds_with_documents: u32,
    pub file_preview_chars: usize,
    pub mention_growth: MentionGrowth,
    pub max_tokens: u32,
    pub temperature: f32,
    /// Mode used when a request does not name one
    pub default_mode: ChatMode,
}

impl Default for CollaborationConfig {
    fn default() -> Self {
        Self {
            team_rounds_with_documents: 3,
            file_preview_chars: DEFAULT_PREVIEW_CHARS,
            mention_growth: MentionGrowth::default(),
            max_tokens: 500,
            temperature: 0.7,
            default_mode: ChatMode::Team,
        }
    }
}

impl CollaborationConfig {
    /// Team mode with documents gets the multi-round cap, everything else one round
    pub fn max_rounds(&self, mode: ChatMode, has_files: bool) -> u32 {
        if mode == ChatMode::Team && has_files {
            self.team_rounds_with_documents.max(1)
        } else {
            1
        }
    }
}

/// Progress notifications emitted while a request runs
#[derive(Debug, Clone, PartialEq)]
pub enum CollaborationEvent {
    RoundStarted { round: u32, agents: Vec<AgentId> },
    Typing { agent: AgentId, typing: bool },
    Response(ResponseRecord),
    NotConfigured(String),
}

/// Everything a front end needs to answer the caller
#[derive(Debug, Clone, PartialEq)]
pub struct CollaborationOutcome {
    pub responses: Vec<ResponseRecord>,
    pub rounds: u32,
    pub documents_analyzed: usize,
    /// False when no completion client was available
    pub configured: bool,
}

impl CollaborationOutcome {
    /// One per record, across every round
    pub fn agents_responded(&self) -> usize {
        self.responses.len()
    }

    /// Distinct agents that produced at least one record
    pub fn distinct_agents(&self) -> usize {
        let mut seen: Vec<&str> = Vec::new();
        for record in &self.responses {
            if !seen.contains(&record.agent.as_str()) {
                seen.push(&record.agent);
            }
        }
        seen.len()
    }
}

/// Router plus completion client plus round loop. One instance serves every
/// request; no state survives between requests.
pub struct Collaboration {
    registry: Arc<AgentRegistry>,
    router: Router,
    client: Option<Arc<dyn CompletionClient>>,
    config: CollaborationConfig,
}

impl std::fmt::Debug for Collaboration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Collaboration")
            .field("agents", &self.registry.len())
            .field(
                "provider",
                &self.client.as_ref().map(|c| c.provider_name().to_string()),
            )
            .field("config", &self.config)
            .finish()
    }
}

impl Collaboration {
    pub fn new(
        registry: Arc<AgentRegistry>,
        client: Option<Arc<dyn CompletionClient>>,
        config: CollaborationConfig,
    ) -> Self {
        let router = Router::new(registry.clone());
        Self {
            registry,
            router,
            client,
            config,
        }
    }

    pub fn registry(&self) -> &AgentRegistry {
        &self.registry
    }

    pub fn config(&self) -> &CollaborationConfig {
        &self.config
    }

    pub fn is_configured(&self) -> bool {
        self.client.is_some()
    }

    /// Run one request to completion. Only input validation fails; provider
    /// errors end up inside the returned records.
    pub async fn run(
        &self,
        request: &ChatRequest,
        events: Option<mpsc::Sender<CollaborationEvent>>,
    ) -> Result<CollaborationOutcome> {
        if request.message.trim().is_empty() && !request.has_files() {
            return Err(FluxError::InvalidInput(
                "message must not be empty".to_string(),
            ));
        }
        let documents_analyzed = request.uploaded_files.len();

        let Some(client) = self.client.as_ref() else {
            warn!("Collaboration: no completion client configured");
            emit(
                &events,
                CollaborationEvent::NotConfigured(NOT_CONFIGURED_MESSAGE.to_string()),
            )
            .await;
            return Ok(CollaborationOutcome {
                responses: vec![ResponseRecord::system(NOT_CONFIGURED_MESSAGE)],
                rounds: 0,
                documents_analyzed,
                configured: false,
            });
        };

        let mode = request.chat_mode.unwrap_or(self.config.default_mode);
        let direct_agent = request.agent.as_deref().and_then(|name| {
            let id = AgentId::from_string(name);
            if id.is_none() {
                debug!("Collaboration: ignoring unknown direct agent '{}'", name);
            }
            id
        });

        let route = self.router.route(&RouteInput {
            message: &request.message,
            mode,
            has_files: request.has_files(),
            direct_agent,
        });
        let max_rounds = self.config.max_rounds(mode, request.has_files());
        let grow = self.config.mention_growth.applies(mode);
        let prompt = format!(
            "{}{}",
            route.prompt,
            preview_block(&request.uploaded_files, self.config.file_preview_chars)
        );

        let mut decision = route.decision;
        let mut responses: Vec<ResponseRecord> = Vec::new();
        let mut rounds = 0;

        for round in 1..=max_rounds {
            let agents = decision.as_slice().to_vec();
            if agents.is_empty() {
                break;
            }
            emit(
                &events,
                CollaborationEvent::RoundStarted {
                    round,
                    agents: agents.clone(),
                },
            )
            .await;

            let user = format!("{}{}", prompt, transcript_block(&responses));
            let round_start = responses.len();
            for agent in agents {
                let def = self.registry.get(agent);
                emit(&events, CollaborationEvent::Typing { agent, typing: true }).await;
                let record = self.ask_agent(client.as_ref(), def, &user, round).await;
                emit(&events, CollaborationEvent::Typing { agent, typing: false }).await;
                emit(&events, CollaborationEvent::Response(record.clone())).await;
                responses.push(record);
            }
            rounds = round;

            let produced = &responses[round_start..];
            if produced.is_empty() {
                break;
            }
            if grow && round < max_rounds {
                for agent in scan_mentions(produced) {
                    if decision.push(agent) {
                        debug!("Collaboration: '{}' joins round {}", agent, round + 1);
                    }
                }
            }
        }

        info!(
            "Collaboration finished: mode={}, rounds={}, responses={}",
            mode,
            rounds,
            responses.len()
        );

        Ok(CollaborationOutcome {
            responses,
            rounds,
            documents_analyzed,
            configured: true,
        })
    }

    /// One completion call on behalf of `agent`. Failures become error records.
    async fn ask_agent(
        &self,
        client: &dyn CompletionClient,
        agent: &AgentDefinition,
        user: &str,
        round: u32,
    ) -> ResponseRecord {
        let request = CompletionRequest {
            agent: agent.id,
            model: agent.model.clone(),
            system: agent.system_prompt.clone(),
            user: user.to_string(),
            max_tokens: self.config.max_tokens,
            temperature: self.config.temperature,
        };

        match client.complete(request).await {
            Ok(completion) => ResponseRecord::success(agent, round, completion.text),
            Err(e) => {
                warn!("Agent '{}' failed in round {}: {}", agent.id, round, e);
                ResponseRecord::failure(agent, round, &e)
            }
        }
    }
}

/// Agents named in `records` other than their authors, in first-mention order.
/// Error records are skipped.
pub fn scan_mentions(records: &[ResponseRecord]) -> RoutingDecision {
    let mut mentioned = RoutingDecision::new();
    for record in records.iter().filter(|r| !r.is_error()) {
        let author = AgentId::from_string(&record.agent);
        let lower = record.message.to_lowercase();
        for id in AgentId::ALL {
            if Some(id) == author {
                continue;
            }
            if id.aliases().iter().any(|alias| lower.contains(alias)) {
                mentioned.push(id);
            }
        }
    }
    mentioned
}

/// Earlier records rendered for the next round's prompt. Empty before round 2.
pub fn transcript_block(records: &[ResponseRecord]) -> String {
    if records.is_empty() {
        return String::new();
    }
    let mut block = String::from("\n\nTEAM DISCUSSION SO FAR:");
    for record in records {
        block.push_str(&format!("\n{}: {}", record.agent_name, record.message));
    }
    block
}

async fn emit(events: &Option<mpsc::Sender<CollaborationEvent>>, event: CollaborationEvent) {
    if let Some(tx) = events {
        // Receiver gone means the client left; keep going
        let _ = tx.send(event).await;
    }
}
