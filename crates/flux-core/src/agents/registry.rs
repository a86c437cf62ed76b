//! Agent registry - read-only lookup of persona definitions

use std::collections::HashMap;
use tracing::{debug, info};

use super::profile::{AgentDefinition, AgentId};
use crate::error::{FluxError, Result};

const LARGE_MODEL: &str = "llama-3.3-70b-versatile";
const DEVELOPER_MODEL: &str = "llama-3.1-70b-versatile";
const FAST_MODEL: &str = "llama-3.1-8b-instant";

/// Holds one definition per [`AgentId`], indexed in registry order
#[derive(Debug, Clone)]
pub struct AgentRegistry {
    agents: Vec<AgentDefinition>,
}

impl AgentRegistry {
    /// The seven built-in personas
    pub fn builtin() -> Self {
        let agents = AgentId::ALL.into_iter().map(builtin_definition).collect();
        Self { agents }
    }

    /// Replace target models by agent identifier. Applied once at start-up.
    pub fn with_model_overrides(mut self, overrides: &HashMap<String, String>) -> Result<Self> {
        for (key, model) in overrides {
            let id = key.parse::<AgentId>()?;
            let def = &mut self.agents[id.index()];
            info!(
                "AgentRegistry: model for '{}' overridden ({} -> {})",
                id, def.model, model
            );
            def.model = model.clone();
        }
        Ok(self)
    }

    /// Definition for a known identifier
    pub fn get(&self, id: AgentId) -> &AgentDefinition {
        &self.agents[id.index()]
    }

    /// Definition for an identifier string
    pub fn lookup(&self, id: &str) -> Result<&AgentDefinition> {
        match AgentId::from_string(id) {
            Some(id) => Ok(self.get(id)),
            None => {
                debug!("AgentRegistry: no agent named '{}'", id);
                Err(FluxError::UnknownAgent(id.to_string()))
            }
        }
    }

    pub fn coordinator(&self) -> &AgentDefinition {
        self.get(AgentId::COORDINATOR)
    }

    /// All definitions in registry order
    pub fn iter(&self) -> impl Iterator<Item = &AgentDefinition> {
        self.agents.iter()
    }

    pub fn len(&self) -> usize {
        self.agents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }
}

impl Default for AgentRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

fn builtin_definition(id: AgentId) -> AgentDefinition {
    match id {
        AgentId::Messi => AgentDefinition::new(
            id,
            "Messi ⚽",
            "Requirements Analyst",
            LARGE_MODEL,
            "You are Messi ⚽, a Requirements Analyst with deep expertise in gathering and \
             documenting project requirements. You create clear user stories, functional \
             requirements, and help stakeholders articulate their needs. You're methodical, \
             detail-oriented, and excellent at translating business needs into technical \
             specifications. Provide comprehensive, well-structured requirements analysis.",
        ),
        AgentId::Ronaldo => AgentDefinition::new(
            id,
            "Ronaldo ⚽",
            "Software Architect",
            FAST_MODEL,
            "You are Ronaldo ⚽, a Software Architect with expertise in system design, \
             architecture patterns, and technical decision-making. You design scalable, \
             maintainable systems, choose appropriate technologies, and create architectural \
             diagrams. You're strategic, experienced, and focused on long-term technical \
             vision. Provide detailed architecture guidance.",
        ),
        AgentId::Neymar => AgentDefinition::new(
            id,
            "Neymar ⚽",
            "Senior Developer",
            DEVELOPER_MODEL,
            "You are Neymar ⚽, a Senior Developer skilled in writing clean, efficient code \
             across multiple languages and frameworks. You implement features, debug issues, \
             optimize performance, and follow best practices. You're creative, \
             solution-oriented, and passionate about code quality. Provide working code \
             examples and detailed implementation guidance.",
        ),
        AgentId::Mbappe => AgentDefinition::new(
            id,
            "Mbappé ⚽",
            "QA Engineer",
            FAST_MODEL,
            "You are Mbappé ⚽, a QA Engineer focused on software quality, testing strategies, \
             and bug prevention. You create test plans, write test cases, perform various \
             testing types, and ensure quality standards. You're thorough, analytical, and \
             committed to delivering bug-free software. Provide comprehensive testing \
             strategies.",
        ),
        AgentId::Benzema => AgentDefinition::new(
            id,
            "Benzema ⚽",
            "DevOps Engineer",
            FAST_MODEL,
            "You are Benzema ⚽, a DevOps Engineer expert in CI/CD, infrastructure, \
             deployment, and automation. You handle cloud platforms, containerization, \
             monitoring, and delivery pipelines. You're practical, automation-focused, and \
             ensure smooth deployments. Provide detailed DevOps solutions.",
        ),
        AgentId::Modric => AgentDefinition::new(
            id,
            "Modric ⚽",
            "Project Manager",
            FAST_MODEL,
            "You are Modric ⚽, a Project Manager skilled in planning, coordination, and team \
             leadership. You manage timelines, resources, risks, and ensure project success. \
             You're organized, communicative, and focused on delivery. Provide project \
             management guidance.",
        ),
        AgentId::Ramos => AgentDefinition::new(
            id,
            "Ramos ⚽",
            "Security Expert",
            FAST_MODEL,
            "You are Ramos ⚽, a Security Expert focused on application security, threat \
             modeling, and security best practices. You identify vulnerabilities, implement \
             security measures, and ensure compliance. You're vigilant, knowledgeable, and \
             prioritize security. Provide security-focused guidance.",
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_has_every_agent_in_order() {
        let registry = AgentRegistry::builtin();
        assert_eq!(registry.len(), 7);
        let ids: Vec<AgentId> = registry.iter().map(|d| d.id).collect();
        assert_eq!(ids, AgentId::ALL.to_vec());
    }

    #[test]
    fn test_get_matches_id() {
        let registry = AgentRegistry::builtin();
        for id in AgentId::ALL {
            assert_eq!(registry.get(id).id, id);
        }
    }

    #[test]
    fn test_coordinator_is_project_manager() {
        let registry = AgentRegistry::builtin();
        assert_eq!(registry.coordinator().id, AgentId::Modric);
        assert_eq!(registry.coordinator().role, "Project Manager");
    }

    #[test]
    fn test_lookup() {
        let registry = AgentRegistry::builtin();
        assert_eq!(registry.lookup("neymar").unwrap().role, "Senior Developer");
        assert_eq!(registry.lookup("Mbappé").unwrap().id, AgentId::Mbappe);
        assert_eq!(
            registry.lookup("system").unwrap_err(),
            FluxError::UnknownAgent("system".to_string())
        );
    }

    #[test]
    fn test_prompts_introduce_the_persona() {
        let registry = AgentRegistry::builtin();
        for def in registry.iter() {
            assert!(
                def.system_prompt.starts_with(&format!("You are {}", def.name)),
                "prompt for {} does not introduce the persona",
                def.id
            );
        }
    }

    #[test]
    fn test_model_overrides() {
        let mut overrides = HashMap::new();
        overrides.insert("ramos".to_string(), "llama-3.3-70b-versatile".to_string());
        let registry = AgentRegistry::builtin().with_model_overrides(&overrides).unwrap();
        assert_eq!(registry.get(AgentId::Ramos).model, "llama-3.3-70b-versatile");
        assert_eq!(registry.get(AgentId::Benzema).model, FAST_MODEL);
    }

    #[test]
    fn test_model_override_unknown_agent() {
        let mut overrides = HashMap::new();
        overrides.insert("zidane".to_string(), "x".to_string());
        assert!(AgentRegistry::builtin().with_model_overrides(&overrides).is_err());
    }
}
