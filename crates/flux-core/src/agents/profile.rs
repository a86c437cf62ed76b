//! Agent identity - the closed set of personas and their definitions

use serde::{Deserialize, Serialize};

use crate::error::FluxError;

/// Every persona the service knows about, in registry order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentId {
    Messi,
    Ronaldo,
    Neymar,
    #[serde(alias = "mbappé")]
    Mbappe,
    Benzema,
    Modric,
    Ramos,
}

impl AgentId {
    pub const ALL: [AgentId; 7] = [
        AgentId::Messi,
        AgentId::Ronaldo,
        AgentId::Neymar,
        AgentId::Mbappe,
        AgentId::Benzema,
        AgentId::Modric,
        AgentId::Ramos,
    ];

    /// Default responder when no routing rule matches
    pub const COORDINATOR: AgentId = AgentId::Modric;

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Messi => "messi",
            Self::Ronaldo => "ronaldo",
            Self::Neymar => "neymar",
            Self::Mbappe => "mbappe",
            Self::Benzema => "benzema",
            Self::Modric => "modric",
            Self::Ramos => "ramos",
        }
    }

    /// Lowercase spellings that refer to this agent in free text
    pub fn aliases(&self) -> &'static [&'static str] {
        match self {
            Self::Mbappe => &["mbappe", "mbappé"],
            Self::Messi => &["messi"],
            Self::Ronaldo => &["ronaldo"],
            Self::Neymar => &["neymar"],
            Self::Benzema => &["benzema"],
            Self::Modric => &["modric"],
            Self::Ramos => &["ramos"],
        }
    }

    /// Parse an identifier, case-insensitively, accepting aliases
    pub fn from_string(s: &str) -> Option<Self> {
        let lower = s.trim().to_lowercase();
        Self::ALL
            .into_iter()
            .find(|id| id.aliases().contains(&lower.as_str()))
    }

    pub(crate) fn index(self) -> usize {
        self as usize
    }
}

impl std::fmt::Display for AgentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(self.as_str())
    }
}

impl std::str::FromStr for AgentId {
    type Err = FluxError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_string(s).ok_or_else(|| FluxError::UnknownAgent(s.to_string()))
    }
}

/// A persona: display metadata, target model and system prompt.
/// Built once at start-up and never mutated afterwards.
#[derive(Debug, Clone, Serialize)]
pub struct AgentDefinition {
    pub id: AgentId,
    pub name: String,
    pub role: String,
    pub model: String,
    pub system_prompt: String,
}

impl AgentDefinition {
    pub fn new(
        id: AgentId,
        name: impl Into<String>,
        role: impl Into<String>,
        model: impl Into<String>,
        system_prompt: impl Into<String>,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            role: role.into(),
            model: model.into(),
            system_prompt: system_prompt.into(),
        }
    }

    /// `"{name} ({role})"`, the label attached to every response
    pub fn label(&self) -> String {
        format!("{} ({})", self.name, self.role)
    }

    /// The name a user would type, without the trailing emoji
    pub fn short_name(&self) -> &str {
        self.name.split_whitespace().next().unwrap_or(&self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_agent_id_round_trip_strings() {
        for id in AgentId::ALL {
            assert_eq!(AgentId::from_string(id.as_str()), Some(id));
        }
    }

    #[test]
    fn test_agent_id_aliases_and_case() {
        assert_eq!(AgentId::from_string("Mbappé"), Some(AgentId::Mbappe));
        assert_eq!(AgentId::from_string("  RAMOS "), Some(AgentId::Ramos));
        assert_eq!(AgentId::from_string("pele"), None);
    }

    #[test]
    fn test_agent_id_from_str_error() {
        let err = "zidane".parse::<AgentId>().unwrap_err();
        assert_eq!(err, FluxError::UnknownAgent("zidane".to_string()));
    }

    #[test]
    fn test_agent_id_display_honors_width() {
        assert_eq!(format!("{}", AgentId::Ramos), "ramos");
        assert_eq!(format!("{:<8}|", AgentId::Messi), "messi   |");
        assert_eq!(format!("{:>7}", AgentId::Neymar), " neymar");
    }

    #[test]
    fn test_agent_id_serde() {
        let json = serde_json::to_string(&AgentId::Mbappe).unwrap();
        assert_eq!(json, "\"mbappe\"");
        let parsed: AgentId = serde_json::from_str("\"mbappé\"").unwrap();
        assert_eq!(parsed, AgentId::Mbappe);
    }

    #[test]
    fn test_agent_id_order_matches_all() {
        let mut sorted = AgentId::ALL;
        sorted.sort();
        assert_eq!(sorted, AgentId::ALL);
        for (i, id) in AgentId::ALL.iter().enumerate() {
            assert_eq!(id.index(), i);
        }
    }

    #[test]
    fn test_definition_label_and_short_name() {
        let def = AgentDefinition::new(
            AgentId::Mbappe,
            "Mbappé ⚽",
            "QA Engineer",
            "llama-3.1-8b-instant",
            "You test things.",
        );
        assert_eq!(def.label(), "Mbappé ⚽ (QA Engineer)");
        assert_eq!(def.short_name(), "Mbappé");
    }
}
