//! Agent runtime - LLM-backed guest assistance for the hotel.
//!
//! A guest message is handled by a small team of agents:
//! 1. **Orchestrator** - answers profile and booking questions and routes the
//!    conversation (`runtime`, `handoff`)
//! 2. **Housekeeping** - cleaning, towels, linens, amenities, turndown
//! 3. **Room service** - food, drinks and laundry orders
//!
//! Each agent is a prompt template (`prompts`) plus database queries exposed as
//! tools (`hotel_tools`). The hosted model decides which tool to call; the
//! `orchestration` loop executes calls and follows handoffs until an agent
//! answers in plain text.
//!
//! # Safety Principle
//!
//! The model only ever acts for the guest in the conversation. Tool calls that
//! name another guest or someone else's booking are refused by `guardrails`,
//! and request progress (completed, delivered) is left to hotel staff.

pub mod guardrails;
pub mod handoff;
pub mod hotel_tools;
pub mod llm;
pub mod orchestration;
pub mod prompts;
pub mod runtime;
pub mod tools;

pub use guardrails::{GuardrailDecision, GuardrailIntent, GuardrailPolicy};
pub use handoff::{HandoffError, Handoffs};
pub use hotel_tools::HotelRepositories;
pub use llm::{ChatCompletionClient, ChatMessage, LlmError, OpenAiCompatibleClient, ScriptedChatClient};
pub use orchestration::{
    Agent, HandoffOrchestration, OrchestrationError, OrchestrationLimits, OrchestrationResult,
};
pub use prompts::{PromptError, PromptLibrary};
pub use runtime::{AgentKind, AgentRuntime};
pub use tools::{Tool, ToolContext, ToolError, ToolRegistry};
