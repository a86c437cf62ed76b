//! Agent registry - persona identities, definitions and lookup
//!
//! The set of agents is closed: [`AgentId`] enumerates every persona and the
//! [`AgentRegistry`] holds exactly one [`AgentDefinition`] for each of them.

pub mod profile;
pub mod registry;

pub use profile::{AgentDefinition, AgentId};
pub use registry::AgentRegistry;
