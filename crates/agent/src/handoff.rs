//! Which agent may hand the conversation to which.
//!
//! Each edge is offered to the source agent as a `transfer_to_<target>` tool.
//! Calling it switches the active agent; the conversation history is shared.

use std::collections::BTreeMap;

use serde_json::{json, Value};
use thiserror::Error;

use crate::llm::ToolDefinition;
use crate::orchestration::Agent;

const TRANSFER_PREFIX: &str = "transfer_to_";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HandoffEdge {
    pub target: String,
    pub description: String,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum HandoffError {
    #[error("agent `{0}` cannot hand off to itself")]
    SelfHandoff(String),
    #[error("handoff from `{from}` to `{to}` is already registered")]
    DuplicateEdge { from: String, to: String },
    #[error("handoff references unknown agent `{0}`")]
    UnknownAgent(String),
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Handoffs {
    start: String,
    edges: BTreeMap<String, Vec<HandoffEdge>>,
}

impl Handoffs {
    pub fn start_with(agent: &Agent) -> Self {
        Self { start: agent.name.clone(), edges: BTreeMap::new() }
    }

    /// Adds an edge to every target, described by the target's own description.
    pub fn add_many<'a>(
        mut self,
        from: &Agent,
        targets: impl IntoIterator<Item = &'a Agent>,
    ) -> Result<Self, HandoffError> {
        for target in targets {
            self.push_edge(&from.name, &target.name, &target.description)?;
        }
        Ok(self)
    }

    pub fn add(
        mut self,
        from: &Agent,
        to: &Agent,
        description: impl Into<String>,
    ) -> Result<Self, HandoffError> {
        self.push_edge(&from.name, &to.name, &description.into())?;
        Ok(self)
    }

    pub fn start(&self) -> &str {
        &self.start
    }

    /// Same graph, entered at a different agent.
    pub fn starting_at(&self, agent: &str) -> Self {
        Self { start: agent.to_string(), edges: self.edges.clone() }
    }

    pub fn targets(&self, from: &str) -> &[HandoffEdge] {
        self.edges.get(from).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn tool_definitions(&self, from: &str) -> Vec<ToolDefinition> {
        self.targets(from)
            .iter()
            .map(|edge| ToolDefinition {
                name: transfer_tool_name(&edge.target),
                description: edge.description.clone(),
                parameters: transfer_parameters(),
            })
            .collect()
    }

    /// The edge a tool call from `from` selects, if it is a transfer.
    pub fn resolve(&self, from: &str, tool_name: &str) -> Option<&HandoffEdge> {
        self.targets(from).iter().find(|edge| transfer_tool_name(&edge.target) == tool_name)
    }

    /// Every agent name the graph mentions, start included.
    pub fn agent_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = std::iter::once(self.start.as_str())
            .chain(self.edges.keys().map(String::as_str))
            .chain(self.edges.values().flatten().map(|edge| edge.target.as_str()))
            .collect();
        names.sort_unstable();
        names.dedup();
        names
    }

    pub fn validate(&self, is_known: impl Fn(&str) -> bool) -> Result<(), HandoffError> {
        match self.agent_names().into_iter().find(|name| !is_known(name)) {
            Some(unknown) => Err(HandoffError::UnknownAgent(unknown.to_string())),
            None => Ok(()),
        }
    }

    fn push_edge(&mut self, from: &str, to: &str, description: &str) -> Result<(), HandoffError> {
        if from == to {
            return Err(HandoffError::SelfHandoff(from.to_string()));
        }
        let edges = self.edges.entry(from.to_string()).or_default();
        if edges.iter().any(|edge| edge.target == to) {
            return Err(HandoffError::DuplicateEdge { from: from.to_string(), to: to.to_string() });
        }
        edges.push(HandoffEdge { target: to.to_string(), description: description.to_string() });
        Ok(())
    }
}

pub fn transfer_tool_name(agent: &str) -> String {
    let slug: String = agent
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_lowercase() } else { '_' })
        .collect();
    format!("{TRANSFER_PREFIX}{slug}")
}

fn transfer_parameters() -> Value {
    json!({
        "type": "object",
        "properties": {
            "reason": {
                "type": "string",
                "description": "Short summary of what the guest needs."
            }
        },
        "required": []
    })
}

#[cfg(test)]
mod tests {
    use super::{transfer_tool_name, HandoffError, Handoffs};
    use crate::orchestration::Agent;
    use crate::tools::ToolRegistry;

    fn agent(name: &str, description: &str) -> Agent {
        Agent::new(name, description, format!("You are {name}."), ToolRegistry::default())
    }

    fn hotel() -> (Agent, Agent, Agent) {
        (
            agent("orchestrator", "Front desk."),
            agent("housekeeping", "Cleaning and towels."),
            agent("room_service", "Food and drinks."),
        )
    }

    #[test]
    fn edges_become_transfer_tools() {
        let (orchestrator, housekeeping, room_service) = hotel();
        let handoffs = Handoffs::start_with(&orchestrator)
            .add_many(&orchestrator, [&room_service, &housekeeping])
            .and_then(|h| h.add(&housekeeping, &orchestrator, "Not a housekeeping issue."))
            .expect("valid graph");

        assert_eq!(handoffs.start(), "orchestrator");
        let definitions = handoffs.tool_definitions("orchestrator");
        assert_eq!(
            definitions.iter().map(|d| d.name.as_str()).collect::<Vec<_>>(),
            vec!["transfer_to_room_service", "transfer_to_housekeeping"]
        );
        assert_eq!(definitions[1].description, "Cleaning and towels.");

        let back = handoffs.resolve("housekeeping", "transfer_to_orchestrator").expect("edge");
        assert_eq!(back.description, "Not a housekeeping issue.");
        assert!(handoffs.resolve("room_service", "transfer_to_orchestrator").is_none());
        assert!(handoffs.tool_definitions("room_service").is_empty());
    }

    #[test]
    fn invalid_edges_are_rejected() {
        let (orchestrator, housekeeping, _) = hotel();

        assert_eq!(
            Handoffs::start_with(&orchestrator).add(&orchestrator, &orchestrator, "loop"),
            Err(HandoffError::SelfHandoff("orchestrator".to_string()))
        );
        assert_eq!(
            Handoffs::start_with(&orchestrator)
                .add_many(&orchestrator, [&housekeeping, &housekeeping]),
            Err(HandoffError::DuplicateEdge {
                from: "orchestrator".to_string(),
                to: "housekeeping".to_string()
            })
        );
    }

    #[test]
    fn validate_reports_unknown_agents() {
        let (orchestrator, housekeeping, room_service) = hotel();
        let handoffs = Handoffs::start_with(&orchestrator)
            .add_many(&orchestrator, [&housekeeping, &room_service])
            .expect("valid graph");

        assert_eq!(handoffs.agent_names(), vec!["housekeeping", "orchestrator", "room_service"]);
        assert!(handoffs.validate(|_| true).is_ok());
        assert_eq!(
            handoffs.validate(|name| name != "room_service"),
            Err(HandoffError::UnknownAgent("room_service".to_string()))
        );
        assert_eq!(handoffs.starting_at("housekeeping").start(), "housekeeping");
    }

    #[test]
    fn transfer_names_are_slugged() {
        assert_eq!(transfer_tool_name("Room Service"), "transfer_to_room_service");
    }
}
