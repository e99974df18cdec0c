//! Handoff orchestration over a shared conversation.
//!
//! The active agent is called with its instructions, the shared history, its
//! own tools and its transfer tools. Tool calls are executed and their results
//! appended; a transfer switches the active agent. The first assistant message
//! without tool calls ends the run and is the reply.

use std::collections::BTreeMap;
use std::sync::Arc;

use concierge_core::config::AgentsConfig;
use serde_json::json;
use thiserror::Error;
use tracing::{info, warn};

use crate::handoff::{HandoffError, Handoffs};
use crate::llm::{ChatCompletionClient, ChatMessage, LlmError};
use crate::prompts::PromptError;
use crate::tools::{ToolContext, ToolRegistry};

#[derive(Clone)]
pub struct Agent {
    pub name: String,
    pub description: String,
    pub instructions: String,
    pub tools: ToolRegistry,
}

impl Agent {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        instructions: impl Into<String>,
        tools: ToolRegistry,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            instructions: instructions.into(),
            tools,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct OrchestrationLimits {
    /// Model calls that end in tool calls, per agent turn.
    pub max_tool_rounds: u32,
    /// Transfers between agents, per query.
    pub max_handoffs: u32,
}

impl Default for OrchestrationLimits {
    fn default() -> Self {
        Self { max_tool_rounds: 8, max_handoffs: 4 }
    }
}

impl From<&AgentsConfig> for OrchestrationLimits {
    fn from(config: &AgentsConfig) -> Self {
        Self { max_tool_rounds: config.max_tool_rounds, max_handoffs: config.max_handoffs }
    }
}

/// Called with the agent name and every message the model produces.
pub type ResponseCallback = Arc<dyn Fn(&str, &ChatMessage) + Send + Sync>;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OrchestrationResult {
    pub reply: String,
    pub final_agent: String,
    /// Agents in the order they held the conversation.
    pub path: Vec<String>,
    pub tool_calls: u32,
}

#[derive(Debug, Error)]
pub enum OrchestrationError {
    #[error(transparent)]
    Llm(#[from] LlmError),
    #[error("agent `{0}` is not part of this orchestration")]
    UnknownAgent(String),
    #[error(transparent)]
    Handoff(#[from] HandoffError),
    #[error(transparent)]
    Prompt(#[from] PromptError),
    #[error("agent `{agent}` exceeded {limit} tool rounds without answering")]
    ToolRoundLimit { agent: String, limit: u32 },
    #[error("agent `{0}` returned an empty reply")]
    EmptyReply(String),
}

pub struct HandoffOrchestration {
    agents: BTreeMap<String, Agent>,
    handoffs: Handoffs,
    client: Arc<dyn ChatCompletionClient>,
    limits: OrchestrationLimits,
    on_response: ResponseCallback,
}

impl HandoffOrchestration {
    pub fn new(
        agents: impl IntoIterator<Item = Agent>,
        handoffs: Handoffs,
        client: Arc<dyn ChatCompletionClient>,
    ) -> Result<Self, OrchestrationError> {
        let agents: BTreeMap<String, Agent> =
            agents.into_iter().map(|agent| (agent.name.clone(), agent)).collect();
        handoffs.validate(|name| agents.contains_key(name))?;

        Ok(Self {
            agents,
            handoffs,
            client,
            limits: OrchestrationLimits::default(),
            on_response: Arc::new(log_response),
        })
    }

    pub fn with_limits(mut self, limits: OrchestrationLimits) -> Self {
        self.limits = limits;
        self
    }

    pub fn with_response_callback(mut self, callback: ResponseCallback) -> Self {
        self.on_response = callback;
        self
    }

    pub fn handoffs(&self) -> &Handoffs {
        &self.handoffs
    }

    pub async fn invoke(
        &self,
        context: &ToolContext,
        message: &str,
    ) -> Result<OrchestrationResult, OrchestrationError> {
        let mut history = vec![ChatMessage::user(message.trim())];
        let mut active = self.handoffs.start().to_string();
        let mut path = vec![active.clone()];
        let mut handoffs_used = 0u32;
        let mut tool_calls = 0u32;

        info!(
            event_name = "agent.orchestration.started",
            correlation_id = %context.correlation_id,
            guest_id = context.guest_id.0,
            start_agent = %active,
            "orchestration started"
        );

        'agents: loop {
            let agent = self.agent(&active)?;
            let mut definitions = agent.tools.definitions();
            definitions.extend(self.handoffs.tool_definitions(&agent.name));
            let mut rounds = 0u32;

            loop {
                let mut messages = Vec::with_capacity(history.len() + 1);
                messages.push(ChatMessage::system(agent.instructions.clone()));
                messages.extend(history.iter().cloned());

                let response =
                    self.client.complete(&messages, &definitions).await?.with_name(&agent.name);
                (self.on_response)(&agent.name, &response);

                if !response.has_tool_calls() {
                    let reply = response.text().trim().to_string();
                    if reply.is_empty() {
                        return Err(OrchestrationError::EmptyReply(agent.name.clone()));
                    }
                    info!(
                        event_name = "agent.orchestration.completed",
                        correlation_id = %context.correlation_id,
                        guest_id = context.guest_id.0,
                        final_agent = %agent.name,
                        handoffs = handoffs_used,
                        tool_calls,
                        "orchestration completed"
                    );
                    return Ok(OrchestrationResult {
                        reply,
                        final_agent: agent.name.clone(),
                        path,
                        tool_calls,
                    });
                }

                rounds += 1;
                if rounds > self.limits.max_tool_rounds {
                    warn!(
                        event_name = "agent.orchestration.tool_round_limit",
                        correlation_id = %context.correlation_id,
                        agent = %agent.name,
                        limit = self.limits.max_tool_rounds,
                        "agent kept calling tools past the round limit"
                    );
                    return Err(OrchestrationError::ToolRoundLimit {
                        agent: agent.name.clone(),
                        limit: self.limits.max_tool_rounds,
                    });
                }

                history.push(response.clone());
                let mut transfer_to: Option<String> = None;

                for call in &response.tool_calls {
                    if let Some(edge) = self.handoffs.resolve(&agent.name, &call.name) {
                        let output = if transfer_to.is_some() {
                            json!({ "error": "only one transfer can be made at a time" })
                        } else if handoffs_used >= self.limits.max_handoffs {
                            warn!(
                                event_name = "agent.handoff.limit_reached",
                                correlation_id = %context.correlation_id,
                                from = %agent.name,
                                to = %edge.target,
                                "handoff limit reached"
                            );
                            json!({ "error": "no more transfers are allowed; answer the guest directly" })
                        } else {
                            transfer_to = Some(edge.target.clone());
                            json!({ "transferred_to": edge.target })
                        };
                        history.push(ChatMessage::tool_result(call, &output));
                        continue;
                    }

                    tool_calls += 1;
                    let output = agent.tools.invoke(context, &call.name, call.arguments.clone()).await;
                    history.push(ChatMessage::tool_result(call, &output));
                }

                if let Some(target) = transfer_to {
                    handoffs_used += 1;
                    info!(
                        event_name = "agent.handoff",
                        correlation_id = %context.correlation_id,
                        guest_id = context.guest_id.0,
                        from = %agent.name,
                        to = %target,
                        "conversation handed off"
                    );
                    path.push(target.clone());
                    active = target;
                    continue 'agents;
                }
            }
        }
    }

    fn agent(&self, name: &str) -> Result<&Agent, OrchestrationError> {
        self.agents.get(name).ok_or_else(|| OrchestrationError::UnknownAgent(name.to_string()))
    }
}

fn log_response(agent: &str, message: &ChatMessage) {
    info!(
        event_name = "agent.response",
        agent,
        tool_calls = message.tool_calls.len(),
        content = message.text(),
        "agent response"
    );
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;
    use concierge_core::domain::customer::CustomerId;
    use serde_json::{json, Value};

    use super::{Agent, HandoffOrchestration, OrchestrationError, OrchestrationLimits};
    use crate::handoff::{HandoffError, Handoffs};
    use crate::llm::{scripted_call, ChatMessage, Role, ScriptedChatClient};
    use crate::tools::{Tool, ToolContext, ToolError, ToolRegistry};

    struct OpenRequests;

    #[async_trait]
    impl Tool for OpenRequests {
        fn name(&self) -> &'static str {
            "get_open_requests"
        }

        fn description(&self) -> &'static str {
            "Open requests for the guest."
        }

        fn parameters(&self) -> Value {
            json!({ "type": "object", "properties": {} })
        }

        async fn execute(&self, context: &ToolContext, _input: Value) -> Result<Value, ToolError> {
            Ok(json!({ "guestId": context.guest_id.0, "requests": ["fresh towels"] }))
        }
    }

    fn agents() -> (Agent, Agent, Agent) {
        let mut housekeeping_tools = ToolRegistry::default();
        housekeeping_tools.register(OpenRequests);
        (
            Agent::new("orchestrator", "Front desk.", "Route the guest.", ToolRegistry::default()),
            Agent::new("housekeeping", "Housekeeping desk.", "Handle cleaning.", housekeeping_tools),
            Agent::new("room_service", "Room service desk.", "Handle orders.", ToolRegistry::default()),
        )
    }

    fn orchestration(client: Arc<ScriptedChatClient>) -> HandoffOrchestration {
        let (orchestrator, housekeeping, room_service) = agents();
        let handoffs = Handoffs::start_with(&orchestrator)
            .add_many(&orchestrator, [&room_service, &housekeeping])
            .and_then(|h| h.add(&housekeeping, &orchestrator, "Not housekeeping."))
            .and_then(|h| h.add(&room_service, &orchestrator, "Not room service."))
            .expect("valid graph");
        HandoffOrchestration::new([orchestrator, housekeeping, room_service], handoffs, client)
            .expect("orchestration")
    }

    fn context() -> ToolContext {
        ToolContext::new(CustomerId(1), "Maria Garcia").with_correlation_id("corr-orchestration")
    }

    #[tokio::test]
    async fn plain_reply_ends_the_run_at_the_start_agent() {
        let client =
            Arc::new(ScriptedChatClient::new([ChatMessage::assistant("Welcome, Maria!")]));
        let result =
            orchestration(client.clone()).invoke(&context(), "hello").await.expect("reply");

        assert_eq!(result.reply, "Welcome, Maria!");
        assert_eq!(result.final_agent, "orchestrator");
        assert_eq!(result.path, vec!["orchestrator"]);

        let requests = client.requests();
        assert_eq!(requests[0].messages[0].role, Role::System);
        assert_eq!(requests[0].messages[0].text(), "Route the guest.");
        assert_eq!(
            requests[0].tool_names,
            vec!["transfer_to_room_service", "transfer_to_housekeeping"]
        );
    }

    #[tokio::test]
    async fn handoff_runs_tools_on_the_target_agent() {
        let client = Arc::new(ScriptedChatClient::new([
            ChatMessage::assistant_tool_calls(vec![scripted_call(
                "call-1",
                "transfer_to_housekeeping",
                json!({ "reason": "towels" }),
            )]),
            ChatMessage::assistant_tool_calls(vec![scripted_call(
                "call-2",
                "get_open_requests",
                json!({}),
            )]),
            ChatMessage::assistant("Your fresh towels are on the way."),
        ]));

        let result = orchestration(client.clone())
            .invoke(&context(), "Where are my towels?")
            .await
            .expect("reply");

        assert_eq!(result.final_agent, "housekeeping");
        assert_eq!(result.path, vec!["orchestrator", "housekeeping"]);
        assert_eq!(result.tool_calls, 1);

        let requests = client.requests();
        assert_eq!(requests.len(), 3);
        assert_eq!(requests[1].messages[0].text(), "Handle cleaning.");
        assert_eq!(requests[1].tool_names, vec!["get_open_requests", "transfer_to_orchestrator"]);

        let tool_output = requests[2].messages.last().expect("tool result");
        assert_eq!(tool_output.role, Role::Tool);
        assert_eq!(tool_output.tool_call_id.as_deref(), Some("call-2"));
        assert!(tool_output.text().contains("fresh towels"));
        assert_eq!(client.remaining(), 0);
    }

    #[tokio::test]
    async fn handoff_limit_keeps_the_current_agent() {
        let client = Arc::new(ScriptedChatClient::new([
            ChatMessage::assistant_tool_calls(vec![scripted_call(
                "call-1",
                "transfer_to_room_service",
                json!({}),
            )]),
            ChatMessage::assistant("I can help with that here."),
        ]));
        let orchestration = orchestration(client.clone())
            .with_limits(OrchestrationLimits { max_tool_rounds: 4, max_handoffs: 0 });

        let result = orchestration.invoke(&context(), "I'm hungry").await.expect("reply");

        assert_eq!(result.final_agent, "orchestrator");
        let refused = client.requests()[1].messages.last().cloned().expect("tool result");
        assert!(refused.text().contains("no more transfers"));
    }

    #[tokio::test]
    async fn tool_round_limit_and_empty_replies_fail() {
        let looping = Arc::new(ScriptedChatClient::new(
            (0..3).map(|i| {
                ChatMessage::assistant_tool_calls(vec![scripted_call(
                    &format!("call-{i}"),
                    "lookup_everything",
                    json!({}),
                )])
            }),
        ));
        let limited = orchestration(looping)
            .with_limits(OrchestrationLimits { max_tool_rounds: 2, max_handoffs: 4 });
        assert!(matches!(
            limited.invoke(&context(), "hi").await,
            Err(OrchestrationError::ToolRoundLimit { limit: 2, .. })
        ));

        let empty = Arc::new(ScriptedChatClient::new([ChatMessage::assistant("   ")]));
        assert!(matches!(
            orchestration(empty).invoke(&context(), "hi").await,
            Err(OrchestrationError::EmptyReply(agent)) if agent == "orchestrator"
        ));

        let exhausted = Arc::new(ScriptedChatClient::new(Vec::new()));
        assert!(matches!(
            orchestration(exhausted).invoke(&context(), "hi").await,
            Err(OrchestrationError::Llm(_))
        ));
    }

    #[tokio::test]
    async fn response_callback_sees_every_model_message() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let client = Arc::new(ScriptedChatClient::new([
            ChatMessage::assistant_tool_calls(vec![scripted_call(
                "call-1",
                "transfer_to_housekeeping",
                json!({}),
            )]),
            ChatMessage::assistant("Done."),
        ]));

        orchestration(client)
            .with_response_callback(Arc::new(move |agent: &str, _message: &ChatMessage| {
                if let Ok(mut seen) = sink.lock() {
                    seen.push(agent.to_string());
                }
            }))
            .invoke(&context(), "towels")
            .await
            .expect("reply");

        assert_eq!(*seen.lock().expect("lock"), vec!["orchestrator", "housekeeping"]);
    }

    #[test]
    fn handoffs_must_name_registered_agents() {
        let (orchestrator, housekeeping, _) = agents();
        let handoffs = Handoffs::start_with(&orchestrator)
            .add_many(&orchestrator, [&housekeeping])
            .expect("valid graph");
        let client = Arc::new(ScriptedChatClient::new(Vec::new()));

        assert!(matches!(
            HandoffOrchestration::new([orchestrator], handoffs, client),
            Err(OrchestrationError::Handoff(HandoffError::UnknownAgent(name))) if name == "housekeeping"
        ));
    }
}
