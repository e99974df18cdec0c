use std::sync::Arc;

use concierge_core::config::AppConfig;
use concierge_core::domain::customer::CustomerId;
use concierge_db::DbPool;
use tracing::info;

use crate::guardrails::GuardrailPolicy;
use crate::handoff::Handoffs;
use crate::hotel_tools::{guest_info_tools, housekeeping_tools, room_service_tools, HotelRepositories};
use crate::llm::{ChatCompletionClient, OpenAiCompatibleClient};
use crate::orchestration::{
    Agent, HandoffOrchestration, OrchestrationError, OrchestrationLimits, OrchestrationResult,
};
use crate::prompts::{PromptLibrary, HOUSEKEEPING, ORCHESTRATOR, ROOM_SERVICE};
use crate::tools::{ToolContext, ToolRegistry};

const NOT_HOUSEKEEPING: &str =
    "Transfer to this agent if the issue is not related to housekeeping.";
const NOT_ROOM_SERVICE: &str =
    "Transfer to this agent if the issue is not related to room service.";
const FALLBACK_GUEST_NAME: &str = "Guest";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AgentKind {
    Orchestrator,
    Housekeeping,
    RoomService,
}

impl AgentKind {
    pub fn agent_name(&self) -> &'static str {
        match self {
            Self::Orchestrator => ORCHESTRATOR,
            Self::Housekeeping => HOUSEKEEPING,
            Self::RoomService => ROOM_SERVICE,
        }
    }
}

/// Builds the three hotel agents per query and runs them over the fixed
/// topology: orchestrator to housekeeping or room service, and back.
pub struct AgentRuntime {
    client: Arc<dyn ChatCompletionClient>,
    repositories: HotelRepositories,
    prompts: PromptLibrary,
    limits: OrchestrationLimits,
    guardrails: GuardrailPolicy,
}

impl AgentRuntime {
    pub fn new(
        client: Arc<dyn ChatCompletionClient>,
        repositories: HotelRepositories,
        prompts: PromptLibrary,
    ) -> Self {
        Self {
            client,
            repositories,
            prompts,
            limits: OrchestrationLimits::default(),
            guardrails: GuardrailPolicy::default(),
        }
    }

    pub fn from_config(config: &AppConfig, pool: DbPool) -> Result<Self, OrchestrationError> {
        let client = OpenAiCompatibleClient::from_config(&config.llm)?;
        let runtime = Self::new(
            Arc::new(client),
            HotelRepositories::sql(pool),
            PromptLibrary::embedded()?,
        )
        .with_limits(OrchestrationLimits::from(&config.agents));
        Ok(runtime)
    }

    pub fn with_limits(mut self, limits: OrchestrationLimits) -> Self {
        self.limits = limits;
        self
    }

    pub fn with_guardrails(mut self, guardrails: GuardrailPolicy) -> Self {
        self.guardrails = guardrails;
        self
    }

    pub fn model_name(&self) -> &str {
        self.client.model_name()
    }

    pub async fn handle_guest_query(
        &self,
        guest_id: CustomerId,
        guest_name: &str,
        message: &str,
    ) -> Result<OrchestrationResult, OrchestrationError> {
        self.handle_direct_query(AgentKind::Orchestrator, guest_id, guest_name, message).await
    }

    /// Same topology, but the conversation opens at `kind`.
    pub async fn handle_direct_query(
        &self,
        kind: AgentKind,
        guest_id: CustomerId,
        guest_name: &str,
        message: &str,
    ) -> Result<OrchestrationResult, OrchestrationError> {
        let context = ToolContext::new(guest_id, guest_display_name(guest_name));
        self.run(kind, &context, message).await
    }

    /// Runs a query under a caller-supplied context, e.g. one carrying the
    /// request's correlation id.
    pub async fn run(
        &self,
        kind: AgentKind,
        context: &ToolContext,
        message: &str,
    ) -> Result<OrchestrationResult, OrchestrationError> {
        let context = context.clone().with_guardrails(self.guardrails.clone());
        info!(
            event_name = "agent.query.received",
            correlation_id = %context.correlation_id,
            guest_id = context.guest_id.0,
            agent = kind.agent_name(),
            model = self.model_name(),
            "guest query received"
        );

        let orchestration = self.orchestration(kind, context.guest_id, &context.guest_name)?;
        orchestration.invoke(&context, message).await
    }

    pub fn orchestration(
        &self,
        start: AgentKind,
        guest_id: CustomerId,
        guest_name: &str,
    ) -> Result<HandoffOrchestration, OrchestrationError> {
        let guest_name = guest_display_name(guest_name);
        let orchestrator =
            self.agent(ORCHESTRATOR, guest_id, guest_name, guest_info_tools(&self.repositories))?;
        let housekeeping =
            self.agent(HOUSEKEEPING, guest_id, guest_name, housekeeping_tools(&self.repositories))?;
        let room_service =
            self.agent(ROOM_SERVICE, guest_id, guest_name, room_service_tools(&self.repositories))?;

        let handoffs = Handoffs::start_with(&orchestrator)
            .add_many(&orchestrator, [&room_service, &housekeeping])?
            .add(&housekeeping, &orchestrator, NOT_HOUSEKEEPING)?
            .add(&room_service, &orchestrator, NOT_ROOM_SERVICE)?
            .starting_at(start.agent_name());

        let orchestration = HandoffOrchestration::new(
            [orchestrator, housekeeping, room_service],
            handoffs,
            self.client.clone(),
        )?;
        Ok(orchestration.with_limits(self.limits))
    }

    fn agent(
        &self,
        name: &str,
        guest_id: CustomerId,
        guest_name: &str,
        tools: ToolRegistry,
    ) -> Result<Agent, OrchestrationError> {
        let template = self.prompts.get(name)?;
        let instructions = self.prompts.render(name, guest_id, guest_name)?;
        Ok(Agent::new(template.name.clone(), template.description.clone(), instructions, tools))
    }
}

fn guest_display_name(guest_name: &str) -> &str {
    match guest_name.trim() {
        "" => FALLBACK_GUEST_NAME,
        name => name,
    }
}
