use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use concierge_core::domain::customer::CustomerId;
use concierge_db::RepositoryError;
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use thiserror::Error;
use tracing::{info, warn};

use crate::guardrails::{GuardrailDecision, GuardrailIntent, GuardrailPolicy};
use crate::llm::ToolDefinition;

/// Who the conversation is with. Every tool call runs on behalf of this guest.
#[derive(Clone, Debug)]
pub struct ToolContext {
    pub guest_id: CustomerId,
    pub guest_name: String,
    pub correlation_id: String,
    pub guardrails: GuardrailPolicy,
    pub now: DateTime<Utc>,
}

impl ToolContext {
    pub fn new(guest_id: CustomerId, guest_name: impl Into<String>) -> Self {
        Self {
            guest_id,
            guest_name: guest_name.into(),
            correlation_id: uuid::Uuid::new_v4().to_string(),
            guardrails: GuardrailPolicy::default(),
            now: Utc::now(),
        }
    }

    pub fn with_correlation_id(mut self, correlation_id: impl Into<String>) -> Self {
        self.correlation_id = correlation_id.into();
        self
    }

    pub fn with_guardrails(mut self, guardrails: GuardrailPolicy) -> Self {
        self.guardrails = guardrails;
        self
    }

    /// Resolves the guest a read targets, applying the guardrail policy.
    pub fn scoped_guest(&self, requested: Option<CustomerId>) -> Result<CustomerId, ToolError> {
        let intent =
            GuardrailIntent::ReadGuestRecords { session_guest: self.guest_id, requested_guest: requested };
        match self.check(&intent)? {
            GuardrailDecision::Degrade { .. } => Ok(self.guest_id),
            _ => Ok(requested.unwrap_or(self.guest_id)),
        }
    }

    /// Returns the decision unless it is a denial, which becomes an error.
    pub fn check(&self, intent: &GuardrailIntent) -> Result<GuardrailDecision, ToolError> {
        match self.guardrails.evaluate(intent) {
            GuardrailDecision::Deny { reason_code, user_message, .. } => {
                warn!(
                    event_name = "agent.guardrail.denied",
                    correlation_id = %self.correlation_id,
                    guest_id = self.guest_id.0,
                    action = intent.action_key(),
                    reason_code,
                    "tool call denied by guardrail"
                );
                Err(ToolError::Denied(user_message))
            }
            decision => Ok(decision),
        }
    }
}

#[derive(Debug, Error)]
pub enum ToolError {
    #[error("invalid arguments: {0}")]
    InvalidArguments(String),
    #[error("{0} not found")]
    NotFound(String),
    #[error("{0}")]
    Denied(String),
    #[error("repository failure: {0}")]
    Repository(#[from] RepositoryError),
    #[error("tool output could not be encoded: {0}")]
    Output(String),
}

impl ToolError {
    /// What the model gets to see. Storage details stay in the logs.
    pub fn model_message(&self) -> String {
        match self {
            Self::InvalidArguments(_) | Self::NotFound(_) | Self::Denied(_) => self.to_string(),
            Self::Repository(RepositoryError::NotFound(what)) => format!("{what} not found"),
            Self::Repository(RepositoryError::Invalid(error)) => error.to_string(),
            Self::Repository(_) | Self::Output(_) => {
                "the hotel system could not complete this lookup right now".to_string()
            }
        }
    }
}

#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &'static str;
    fn description(&self) -> &'static str;
    /// JSON schema of the argument object.
    fn parameters(&self) -> Value;
    async fn execute(&self, context: &ToolContext, input: Value) -> Result<Value, ToolError>;
}

#[derive(Clone, Default)]
pub struct ToolRegistry {
    tools: BTreeMap<String, Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn register<T>(&mut self, tool: T)
    where
        T: Tool + 'static,
    {
        self.tools.insert(tool.name().to_string(), Arc::new(tool));
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    pub fn names(&self) -> Vec<&str> {
        self.tools.keys().map(String::as_str).collect()
    }

    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.tools
            .values()
            .map(|tool| ToolDefinition {
                name: tool.name().to_string(),
                description: tool.description().to_string(),
                parameters: tool.parameters(),
            })
            .collect()
    }

    /// Never fails: unknown tools and tool errors are reported to the model
    /// as `{"error": ...}` so the conversation can continue.
    pub async fn invoke(&self, context: &ToolContext, name: &str, input: Value) -> Value {
        let Some(tool) = self.tools.get(name) else {
            warn!(
                event_name = "agent.tool.unknown",
                correlation_id = %context.correlation_id,
                tool = name,
                "model requested an unknown tool"
            );
            return json!({ "error": format!("unknown tool `{name}`") });
        };

        match tool.execute(context, input).await {
            Ok(output) => {
                info!(
                    event_name = "agent.tool.completed",
                    correlation_id = %context.correlation_id,
                    guest_id = context.guest_id.0,
                    tool = name,
                    "tool call completed"
                );
                output
            }
            Err(error) => {
                warn!(
                    event_name = "agent.tool.failed",
                    correlation_id = %context.correlation_id,
                    guest_id = context.guest_id.0,
                    tool = name,
                    error = %error,
                    "tool call failed"
                );
                json!({ "error": error.model_message() })
            }
        }
    }
}

pub fn parse_args<T>(input: Value) -> Result<T, ToolError>
where
    T: DeserializeOwned,
{
    let input = if input.is_null() { json!({}) } else { input };
    serde_json::from_value(input).map_err(|error| ToolError::InvalidArguments(error.to_string()))
}

pub fn to_output<T>(value: &T) -> Result<Value, ToolError>
where
    T: serde::Serialize,
{
    serde_json::to_value(value).map_err(|error| ToolError::Output(error.to_string()))
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use concierge_core::domain::customer::CustomerId;
    use concierge_db::RepositoryError;
    use serde::Deserialize;
    use serde_json::{json, Value};

    use super::{parse_args, Tool, ToolContext, ToolError, ToolRegistry};

    struct Echo;

    #[derive(Deserialize)]
    struct EchoArgs {
        text: String,
    }

    #[async_trait]
    impl Tool for Echo {
        fn name(&self) -> &'static str {
            "echo"
        }

        fn description(&self) -> &'static str {
            "Echo text back."
        }

        fn parameters(&self) -> Value {
            json!({ "type": "object", "properties": { "text": { "type": "string" } } })
        }

        async fn execute(&self, _context: &ToolContext, input: Value) -> Result<Value, ToolError> {
            let args: EchoArgs = parse_args(input)?;
            if args.text == "explode" {
                return Err(ToolError::Repository(RepositoryError::Decode("disk".to_string())));
            }
            Ok(json!({ "text": args.text }))
        }
    }

    fn context() -> ToolContext {
        ToolContext::new(CustomerId(1), "Maria Garcia").with_correlation_id("corr-tools")
    }

    #[tokio::test]
    async fn registry_invokes_and_describes_tools() {
        let mut registry = ToolRegistry::default();
        registry.register(Echo);

        assert_eq!(registry.len(), 1);
        assert_eq!(registry.definitions()[0].name, "echo");
        assert_eq!(
            registry.invoke(&context(), "echo", json!({ "text": "hi" })).await,
            json!({ "text": "hi" })
        );
    }

    #[tokio::test]
    async fn failures_come_back_as_error_payloads() {
        let mut registry = ToolRegistry::default();
        registry.register(Echo);

        let unknown = registry.invoke(&context(), "nope", json!({})).await;
        assert_eq!(unknown["error"], "unknown tool `nope`");

        let invalid = registry.invoke(&context(), "echo", json!({ "text": 5 })).await;
        assert!(invalid["error"].as_str().is_some_and(|e| e.starts_with("invalid arguments")));

        let storage = registry.invoke(&context(), "echo", json!({ "text": "explode" })).await;
        assert_eq!(storage["error"], "the hotel system could not complete this lookup right now");
    }

    #[test]
    fn scoped_guest_defaults_and_denies() {
        let context = context();
        assert_eq!(context.scoped_guest(None).expect("default"), CustomerId(1));
        assert_eq!(context.scoped_guest(Some(CustomerId(1))).expect("own"), CustomerId(1));
        assert!(matches!(context.scoped_guest(Some(CustomerId(2))), Err(ToolError::Denied(_))));
    }
}
