//! Message routing - picks the agents that answer the first round
//!
//! Team mode scans the message for per-agent trigger keywords from
//! [`KEYWORD_RULES`]; broadcast keywords or uploaded documents bring in the
//! whole team. Single mode expects the message to open with an agent's name.
//! Matching is plain substring matching on the lowercased text, so
//! "testing the architecture" selects both QA and the architect.

use std::collections::BTreeSet;
use std::sync::Arc;

use serde::Serialize;
use tracing::debug;

use crate::agents::{AgentId, AgentRegistry};
use crate::types::ChatMode;

/// Trigger substrings for one agent
#[derive(Debug, Clone, Copy)]
pub struct KeywordRule {
    pub agent: AgentId,
    pub keywords: &'static [&'static str],
}

pub const KEYWORD_RULES: &[KeywordRule] = &[
    KeywordRule {
        agent: AgentId::Messi,
        keywords: &["messi", "requirement"],
    },
    KeywordRule {
        agent: AgentId::Ronaldo,
        keywords: &["ronaldo", "architect"],
    },
    KeywordRule {
        agent: AgentId::Neymar,
        keywords: &["neymar", "developer", "code"],
    },
    KeywordRule {
        agent: AgentId::Mbappe,
        keywords: &["mbappe", "mbappé", "qa", "test"],
    },
    KeywordRule {
        agent: AgentId::Benzema,
        keywords: &["benzema", "devops", "deploy"],
    },
    KeywordRule {
        agent: AgentId::Modric,
        keywords: &["modric", "project manager", "planning"],
    },
    KeywordRule {
        agent: AgentId::Ramos,
        keywords: &["ramos", "security"],
    },
];

/// Any of these pulls the entire team into the conversation
pub const BROADCAST_KEYWORDS: &[&str] = &["team", "everyone", "all"];

/// Agents whose trigger keywords occur in `text`. Pure; ordered by registry order.
pub fn classify(text: &str) -> BTreeSet<AgentId> {
    let lower = text.to_lowercase();
    KEYWORD_RULES
        .iter()
        .filter(|rule| rule.keywords.iter().any(|k| lower.contains(k)))
        .map(|rule| rule.agent)
        .collect()
}

/// Whether the text addresses the whole team
pub fn is_broadcast(text: &str) -> bool {
    let lower = text.to_lowercase();
    BROADCAST_KEYWORDS.iter().any(|k| lower.contains(k))
}

/// Insertion-ordered set of responders. Agents are only ever added.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct RoutingDecision {
    agents: Vec<AgentId>,
}

impl RoutingDecision {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn single(agent: AgentId) -> Self {
        Self {
            agents: vec![agent],
        }
    }

    /// Append an agent; returns `false` if it was already present
    pub fn push(&mut self, agent: AgentId) -> bool {
        if self.agents.contains(&agent) {
            return false;
        }
        self.agents.push(agent);
        true
    }

    pub fn contains(&self, agent: AgentId) -> bool {
        self.agents.contains(&agent)
    }

    pub fn as_slice(&self) -> &[AgentId] {
        &self.agents
    }

    pub fn iter(&self) -> impl Iterator<Item = AgentId> + '_ {
        self.agents.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.agents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }
}

impl FromIterator<AgentId> for RoutingDecision {
    fn from_iter<I: IntoIterator<Item = AgentId>>(iter: I) -> Self {
        let mut decision = Self::new();
        for agent in iter {
            decision.push(agent);
        }
        decision
    }
}

impl IntoIterator for RoutingDecision {
    type Item = AgentId;
    type IntoIter = std::vec::IntoIter<AgentId>;

    fn into_iter(self) -> Self::IntoIter {
        self.agents.into_iter()
    }
}

impl<'a> IntoIterator for &'a RoutingDecision {
    type Item = AgentId;
    type IntoIter = std::iter::Copied<std::slice::Iter<'a, AgentId>>;

    fn into_iter(self) -> Self::IntoIter {
        self.agents.iter().copied()
    }
}

/// What the router looks at
#[derive(Debug, Clone, Copy)]
pub struct RouteInput<'a> {
    pub message: &'a str,
    pub mode: ChatMode,
    pub has_files: bool,
    /// Explicitly requested agent, bypasses keyword matching
    pub direct_agent: Option<AgentId>,
}

/// Initial responders plus the prompt body they should see
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Route {
    pub decision: RoutingDecision,
    pub prompt: String,
}

/// Initial agent selection
#[derive(Debug, Clone)]
pub struct Router {
    registry: Arc<AgentRegistry>,
}

impl Router {
    pub fn new(registry: Arc<AgentRegistry>) -> Self {
        Self { registry }
    }

    pub fn route(&self, input: &RouteInput<'_>) -> Route {
        if let Some(agent) = input.direct_agent {
            debug!("Router: direct call to '{}'", agent);
            return Route {
                decision: RoutingDecision::single(agent),
                prompt: input.message.to_string(),
            };
        }

        let route = match input.mode {
            ChatMode::Single => self.route_single(input.message),
            ChatMode::Team => self.route_team(input.message, input.has_files),
        };
        debug!(
            "Router: {} mode selected {:?}",
            input.mode,
            route.decision.as_slice()
        );
        route
    }

    fn route_single(&self, message: &str) -> Route {
        let trimmed = message.trim_start();
        for def in self.registry.iter() {
            let candidates = [def.short_name(), def.id.as_str()];
            for name in candidates {
                if let Some(rest) = strip_name_prefix(trimmed, name) {
                    let prompt = if rest.is_empty() { message } else { rest };
                    return Route {
                        decision: RoutingDecision::single(def.id),
                        prompt: prompt.to_string(),
                    };
                }
            }
        }
        Route {
            decision: RoutingDecision::single(AgentId::COORDINATOR),
            prompt: message.to_string(),
        }
    }

    fn route_team(&self, message: &str, has_files: bool) -> Route {
        let mut decision: RoutingDecision = classify(message).into_iter().collect();

        if has_files || is_broadcast(message) {
            decision = self.everyone();
        }
        if decision.is_empty() {
            decision.push(AgentId::COORDINATOR);
        }

        Route {
            decision,
            prompt: message.to_string(),
        }
    }

    /// The entire registry, coordinator first
    fn everyone(&self) -> RoutingDecision {
        std::iter::once(AgentId::COORDINATOR)
            .chain(self.registry.iter().map(|d| d.id))
            .collect()
    }
}

/// Strip `name` from the start of `text`, ignoring case. The name must end at
/// a word boundary; separators after it are stripped too.
fn strip_name_prefix<'a>(text: &'a str, name: &str) -> Option<&'a str> {
    let mut chars = text.chars();
    for expected in name.chars() {
        let actual = chars.next()?;
        if !actual.to_lowercase().eq(expected.to_lowercase()) {
            return None;
        }
    }
    let rest = chars.as_str();
    if rest.chars().next().is_some_and(|c| c.is_alphanumeric()) {
        return None;
    }
    Some(rest.trim_start_matches(|c: char| {
        c.is_whitespace() || matches!(c, ',' | ':' | ';' | '!' | '-' | '⚽')
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn router() -> Router {
        Router::new(Arc::new(AgentRegistry::builtin()))
    }

    fn team(message: &str, has_files: bool) -> Route {
        router().route(&RouteInput {
            message,
            mode: ChatMode::Team,
            has_files,
            direct_agent: None,
        })
    }

    fn single(message: &str) -> Route {
        router().route(&RouteInput {
            message,
            mode: ChatMode::Single,
            has_files: false,
            direct_agent: None,
        })
    }

    #[test]
    fn test_classify_keywords() {
        let set = classify("Can the DevOps folks deploy this?");
        assert_eq!(set.into_iter().collect::<Vec<_>>(), vec![AgentId::Benzema]);
    }

    #[test]
    fn test_classify_overlapping_substrings() {
        let set: Vec<_> = classify("testing the architecture").into_iter().collect();
        assert_eq!(set, vec![AgentId::Ronaldo, AgentId::Mbappe]);
    }

    #[test]
    fn test_classify_registry_order() {
        let set: Vec<_> = classify("ramos and messi, review the code").into_iter().collect();
        assert_eq!(set, vec![AgentId::Messi, AgentId::Neymar, AgentId::Ramos]);
    }

    #[test]
    fn test_classify_nothing() {
        assert!(classify("good morning").is_empty());
    }

    #[test]
    fn test_broadcast_keywords() {
        assert!(is_broadcast("hello team"));
        assert!(is_broadcast("EVERYONE listen"));
        assert!(is_broadcast("call me maybe"));
        assert!(!is_broadcast("good morning"));
    }

    #[test]
    fn test_team_broadcast_selects_everyone_coordinator_first() {
        let route = team("hello team", false);
        assert_eq!(route.decision.len(), 7);
        assert_eq!(route.decision.as_slice()[0], AgentId::Modric);
        for id in AgentId::ALL {
            assert!(route.decision.contains(id));
        }
    }

    #[test]
    fn test_team_files_select_everyone() {
        let route = team("please look at this", true);
        assert_eq!(route.decision.len(), 7);
        assert_eq!(route.decision.as_slice()[0], AgentId::COORDINATOR);
    }

    #[test]
    fn test_team_single_keyword() {
        let route = team("Messi, estimate this login feature", false);
        assert_eq!(route.decision.as_slice(), &[AgentId::Messi]);
        assert_eq!(route.prompt, "Messi, estimate this login feature");
    }

    #[test]
    fn test_team_default_is_coordinator() {
        let route = team("good morning", false);
        assert_eq!(route.decision.as_slice(), &[AgentId::Modric]);
    }

    #[test]
    fn test_single_prefix_selects_and_strips() {
        let route = single("Ronaldo, how should we split the services?");
        assert_eq!(route.decision.as_slice(), &[AgentId::Ronaldo]);
        assert_eq!(route.prompt, "how should we split the services?");
    }

    #[test]
    fn test_single_prefix_case_insensitive_with_accent() {
        let route = single("mbappé: write a test plan");
        assert_eq!(route.decision.as_slice(), &[AgentId::Mbappe]);
        assert_eq!(route.prompt, "write a test plan");

        let route = single("MBAPPE write a test plan");
        assert_eq!(route.decision.as_slice(), &[AgentId::Mbappe]);
        assert_eq!(route.prompt, "write a test plan");
    }

    #[test]
    fn test_single_prefix_requires_word_boundary() {
        let route = single("Messianic visions of the roadmap");
        assert_eq!(route.decision.as_slice(), &[AgentId::Modric]);
        assert_eq!(route.prompt, "Messianic visions of the roadmap");
    }

    #[test]
    fn test_single_name_not_at_start_falls_back() {
        let route = single("ask ramos about auth");
        assert_eq!(route.decision.as_slice(), &[AgentId::COORDINATOR]);
    }

    #[test]
    fn test_single_name_only_keeps_message() {
        let route = single("Neymar");
        assert_eq!(route.decision.as_slice(), &[AgentId::Neymar]);
        assert_eq!(route.prompt, "Neymar");
    }

    #[test]
    fn test_direct_agent_wins() {
        let route = router().route(&RouteInput {
            message: "hello team",
            mode: ChatMode::Team,
            has_files: true,
            direct_agent: Some(AgentId::Ramos),
        });
        assert_eq!(route.decision.as_slice(), &[AgentId::Ramos]);
        assert_eq!(route.prompt, "hello team");
    }

    #[test]
    fn test_routing_decision_only_grows() {
        let mut decision = RoutingDecision::single(AgentId::Messi);
        assert!(decision.push(AgentId::Ramos));
        assert!(!decision.push(AgentId::Messi));
        assert_eq!(decision.as_slice(), &[AgentId::Messi, AgentId::Ramos]);
    }

    #[test]
    fn test_routing_decision_iterates_in_order() {
        let decision: RoutingDecision = [AgentId::Ramos, AgentId::Messi, AgentId::Ramos]
            .into_iter()
            .collect();
        let borrowed: Vec<AgentId> = (&decision).into_iter().collect();
        assert_eq!(borrowed, vec![AgentId::Ramos, AgentId::Messi]);

        let mut owned = Vec::new();
        for agent in decision {
            owned.push(agent);
        }
        assert_eq!(owned, borrowed);
    }
}
