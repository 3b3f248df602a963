//! Lookup from agent type to remote execution identifier.

use af_protocol::execution_models::AgentType;
use std::collections::{BTreeMap, HashMap};

/// Agent types the remote side is known to serve.
pub const BUILTIN_EXECUTIONS: &[(&str, &str)] = &[
    ("image_generation", "generate_image"),
    ("worksheet", "generate_worksheet"),
    ("lesson_plan", "generate_lesson_plan"),
    ("quiz", "generate_quiz"),
];

/// Static table translating agent types into remote execution identifiers.
///
/// An unmapped agent type is a configuration error, not something to retry.
#[derive(Debug, Clone)]
pub struct ExecutionRegistry {
    entries: HashMap<String, String>,
}

impl ExecutionRegistry {
    /// Registry holding [`BUILTIN_EXECUTIONS`].
    pub fn builtin() -> Self {
        let entries = BUILTIN_EXECUTIONS
            .iter()
            .map(|(agent_type, identifier)| (agent_type.to_string(), identifier.to_string()))
            .collect();
        Self { entries }
    }

    /// Built-in entries with `overrides` merged over them.
    pub fn with_overrides(overrides: &BTreeMap<String, String>) -> Self {
        let mut registry = Self::builtin();
        for (agent_type, identifier) in overrides {
            registry.register(agent_type.clone(), identifier.clone());
        }
        registry
    }

    pub fn register(&mut self, agent_type: String, identifier: String) {
        self.entries.insert(agent_type, identifier);
    }

    /// Remote execution identifier for `agent_type`, if one is configured.
    pub fn resolve(&self, agent_type: &AgentType) -> Option<&str> {
        self.entries.get(agent_type.as_str()).map(String::as_str)
    }

    /// All registered agent types, sorted.
    pub fn agent_types(&self) -> Vec<String> {
        let mut types: Vec<String> = self.entries.keys().cloned().collect();
        types.sort();
        types
    }
}

impl Default for ExecutionRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}
