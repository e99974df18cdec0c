//! Chat-completion client used by the agents.
//!
//! The wire format is the OpenAI `chat/completions` shape, which Azure OpenAI
//! and Ollama both accept. Tool calls come back with JSON arguments already
//! decoded; tool results are sent back as `tool` role messages.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use concierge_core::config::{LlmConfig, LlmProvider};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use thiserror::Error;
use tracing::{debug, warn};

const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
const OLLAMA_BASE_URL: &str = "http://localhost:11434/v1";
const AZURE_DEFAULT_API_VERSION: &str = "2024-10-21";
const RETRY_BASE_DELAY_MS: u64 = 250;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    System,
    User,
    Assistant,
    Tool,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    pub id: String,
    pub name: String,
    pub arguments: Value,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolCall>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
    /// Agent that produced an assistant message, or tool that produced a result.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self::plain(Role::System, content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::plain(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::plain(Role::Assistant, content)
    }

    pub fn assistant_tool_calls(tool_calls: Vec<ToolCall>) -> Self {
        Self { role: Role::Assistant, content: None, tool_calls, tool_call_id: None, name: None }
    }

    pub fn tool_result(call: &ToolCall, output: &Value) -> Self {
        Self {
            role: Role::Tool,
            content: Some(output.to_string()),
            tool_calls: Vec::new(),
            tool_call_id: Some(call.id.clone()),
            name: Some(call.name.clone()),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn text(&self) -> &str {
        self.content.as_deref().unwrap_or_default()
    }

    pub fn has_tool_calls(&self) -> bool {
        !self.tool_calls.is_empty()
    }

    fn plain(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: Some(content.into()),
            tool_calls: Vec::new(),
            tool_call_id: None,
            name: None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("llm transport error: {0}")]
    Transport(String),
    #[error("llm returned status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("llm response could not be decoded: {0}")]
    Decode(String),
    #[error("llm client misconfigured: {0}")]
    Configuration(String),
    #[error("scripted client has no responses left")]
    Exhausted,
}

#[async_trait]
pub trait ChatCompletionClient: Send + Sync {
    /// Returns the assistant message, which either carries text or tool calls.
    async fn complete(
        &self,
        messages: &[ChatMessage],
        tools: &[ToolDefinition],
    ) -> Result<ChatMessage, LlmError>;

    fn model_name(&self) -> &str;
}

#[derive(Clone)]
enum AuthHeader {
    None,
    Bearer(SecretString),
    ApiKey(SecretString),
}

pub struct OpenAiCompatibleClient {
    http: reqwest::Client,
    endpoint: String,
    auth: AuthHeader,
    model: String,
    max_retries: u32,
}

impl OpenAiCompatibleClient {
    pub fn from_config(config: &LlmConfig) -> Result<Self, LlmError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs.max(1)))
            .build()
            .map_err(|error| LlmError::Configuration(error.to_string()))?;

        let endpoint = chat_endpoint(config)?;
        let auth = match (config.provider, config.api_key.clone()) {
            (LlmProvider::AzureOpenAi, Some(key)) => AuthHeader::ApiKey(key),
            (LlmProvider::AzureOpenAi, None) => {
                return Err(LlmError::Configuration("azure_openai requires an api key".to_string()))
            }
            (LlmProvider::OpenAi, Some(key)) => AuthHeader::Bearer(key),
            (LlmProvider::OpenAi, None) => {
                return Err(LlmError::Configuration("openai requires an api key".to_string()))
            }
            (LlmProvider::Ollama, Some(key)) => AuthHeader::Bearer(key),
            (LlmProvider::Ollama, None) => AuthHeader::None,
        };

        Ok(Self { http, endpoint, auth, model: config.model.clone(), max_retries: config.max_retries })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn send_once(&self, body: &Value) -> Result<Value, LlmError> {
        let mut request = self.http.post(&self.endpoint).json(body);
        request = match &self.auth {
            AuthHeader::None => request,
            AuthHeader::Bearer(key) => request.bearer_auth(key.expose_secret()),
            AuthHeader::ApiKey(key) => request.header("api-key", key.expose_secret()),
        };

        let response =
            request.send().await.map_err(|error| LlmError::Transport(error.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(LlmError::Status { status: status.as_u16(), body: truncate(&body, 500) });
        }

        response.json::<Value>().await.map_err(|error| LlmError::Decode(error.to_string()))
    }
}

#[async_trait]
impl ChatCompletionClient for OpenAiCompatibleClient {
    async fn complete(
        &self,
        messages: &[ChatMessage],
        tools: &[ToolDefinition],
    ) -> Result<ChatMessage, LlmError> {
        let body = request_body(&self.model, messages, tools);
        let mut attempt = 0u32;

        loop {
            match self.send_once(&body).await {
                Ok(response) => return parse_response(&response),
                Err(error) if attempt < self.max_retries && is_retryable(&error) => {
                    let delay = RETRY_BASE_DELAY_MS.saturating_mul(1 << attempt.min(6));
                    warn!(
                        event_name = "agent.llm.retry",
                        attempt = attempt + 1,
                        delay_ms = delay,
                        error = %error,
                        "retrying chat completion"
                    );
                    tokio::time::sleep(Duration::from_millis(delay)).await;
                    attempt += 1;
                }
                Err(error) => return Err(error),
            }
        }
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

fn chat_endpoint(config: &LlmConfig) -> Result<String, LlmError> {
    let base = config.base_url.as_deref().map(|url| url.trim().trim_end_matches('/'));

    match config.provider {
        LlmProvider::OpenAi => {
            Ok(format!("{}/chat/completions", base.unwrap_or(OPENAI_BASE_URL)))
        }
        LlmProvider::Ollama => {
            Ok(format!("{}/chat/completions", base.unwrap_or(OLLAMA_BASE_URL)))
        }
        LlmProvider::AzureOpenAi => {
            let base = base.filter(|url| !url.is_empty()).ok_or_else(|| {
                LlmError::Configuration("azure_openai requires the resource endpoint".to_string())
            })?;
            let api_version = config.api_version.as_deref().unwrap_or(AZURE_DEFAULT_API_VERSION);
            Ok(format!(
                "{base}/openai/deployments/{}/chat/completions?api-version={api_version}",
                config.model
            ))
        }
    }
}

fn request_body(model: &str, messages: &[ChatMessage], tools: &[ToolDefinition]) -> Value {
    let mut body = json!({
        "model": model,
        "messages": messages.iter().map(wire_message).collect::<Vec<_>>(),
        "temperature": 0.2,
    });

    if !tools.is_empty() {
        body["tools"] = tools
            .iter()
            .map(|tool| {
                json!({
                    "type": "function",
                    "function": {
                        "name": tool.name,
                        "description": tool.description,
                        "parameters": tool.parameters,
                    }
                })
            })
            .collect();
        body["tool_choice"] = json!("auto");
    }

    body
}

fn wire_message(message: &ChatMessage) -> Value {
    match message.role {
        Role::System => json!({ "role": "system", "content": message.text() }),
        Role::User => json!({ "role": "user", "content": message.text() }),
        Role::Tool => json!({
            "role": "tool",
            "tool_call_id": message.tool_call_id.as_deref().unwrap_or_default(),
            "content": message.text(),
        }),
        Role::Assistant if message.has_tool_calls() => json!({
            "role": "assistant",
            "content": message.content,
            "tool_calls": message.tool_calls.iter().map(|call| json!({
                "id": call.id,
                "type": "function",
                "function": { "name": call.name, "arguments": call.arguments.to_string() },
            })).collect::<Vec<_>>(),
        }),
        Role::Assistant => json!({ "role": "assistant", "content": message.text() }),
    }
}

#[derive(Deserialize)]
struct WireFunction {
    name: String,
    #[serde(default)]
    arguments: Value,
}

#[derive(Deserialize)]
struct WireToolCall {
    #[serde(default)]
    id: Option<String>,
    function: WireFunction,
}

#[derive(Deserialize)]
struct WireMessage {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    tool_calls: Option<Vec<WireToolCall>>,
}

#[derive(Deserialize)]
struct WireChoice {
    message: WireMessage,
}

#[derive(Deserialize)]
struct WireResponse {
    choices: Vec<WireChoice>,
}

fn parse_response(body: &Value) -> Result<ChatMessage, LlmError> {
    let response: WireResponse = serde_json::from_value(body.clone())
        .map_err(|error| LlmError::Decode(format!("unexpected response shape: {error}")))?;
    let message = response
        .choices
        .into_iter()
        .next()
        .map(|choice| choice.message)
        .ok_or_else(|| LlmError::Decode("response contained no choices".to_string()))?;

    let tool_calls: Vec<ToolCall> = message
        .tool_calls
        .unwrap_or_default()
        .into_iter()
        .enumerate()
        .map(|(index, call)| ToolCall {
            id: call.id.unwrap_or_else(|| format!("call_{index}")),
            name: call.function.name,
            arguments: decode_arguments(call.function.arguments),
        })
        .collect();

    debug!(
        event_name = "agent.llm.response",
        tool_calls = tool_calls.len(),
        has_content = message.content.as_deref().is_some_and(|text| !text.trim().is_empty()),
        "chat completion received"
    );

    Ok(ChatMessage {
        role: Role::Assistant,
        content: message.content,
        tool_calls,
        tool_call_id: None,
        name: None,
    })
}

/// OpenAI sends arguments as a JSON string; Ollama sometimes sends an object.
fn decode_arguments(raw: Value) -> Value {
    match raw {
        Value::String(text) if text.trim().is_empty() => json!({}),
        Value::String(text) => serde_json::from_str(&text).unwrap_or(Value::String(text)),
        Value::Null => json!({}),
        other => other,
    }
}

fn is_retryable(error: &LlmError) -> bool {
    match error {
        LlmError::Transport(_) => true,
        LlmError::Status { status, .. } => *status == 429 || *status >= 500,
        _ => false,
    }
}

fn truncate(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}

/// Replays canned assistant messages in order and records what it was asked.
#[derive(Default)]
pub struct ScriptedChatClient {
    responses: Mutex<VecDeque<ChatMessage>>,
    requests: Mutex<Vec<RecordedRequest>>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct RecordedRequest {
    pub messages: Vec<ChatMessage>,
    pub tool_names: Vec<String>,
}

impl ScriptedChatClient {
    pub fn new(responses: impl IntoIterator<Item = ChatMessage>) -> Self {
        Self { responses: Mutex::new(responses.into_iter().collect()), requests: Mutex::default() }
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().map(|requests| requests.clone()).unwrap_or_default()
    }

    pub fn remaining(&self) -> usize {
        self.responses.lock().map(|responses| responses.len()).unwrap_or_default()
    }
}

/// Builds a tool call the way a model would, for scripting.
pub fn scripted_call(id: &str, name: &str, arguments: Value) -> ToolCall {
    ToolCall { id: id.to_string(), name: name.to_string(), arguments }
}

#[async_trait]
impl ChatCompletionClient for ScriptedChatClient {
    async fn complete(
        &self,
        messages: &[ChatMessage],
        tools: &[ToolDefinition],
    ) -> Result<ChatMessage, LlmError> {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(RecordedRequest {
                messages: messages.to_vec(),
                tool_names: tools.iter().map(|tool| tool.name.clone()).collect(),
            });
        }

        self.responses
            .lock()
            .map_err(|_| LlmError::Transport("scripted client lock poisoned".to_string()))?
            .pop_front()
            .ok_or(LlmError::Exhausted)
    }

    fn model_name(&self) -> &str {
        "scripted"
    }
}

#[cfg(test)]
mod tests {
    use concierge_core::config::{LlmConfig, LlmProvider};
    use serde_json::json;

    use super::{
        chat_endpoint, decode_arguments, is_retryable, parse_response, request_body,
        scripted_call, ChatCompletionClient, ChatMessage, LlmError, OpenAiCompatibleClient,
        ScriptedChatClient, ToolDefinition,
    };

    fn config(provider: LlmProvider, base_url: Option<&str>) -> LlmConfig {
        LlmConfig {
            provider,
            api_key: Some("test-key".to_string().into()),
            base_url: base_url.map(str::to_string),
            model: "gpt-4o".to_string(),
            api_version: None,
            timeout_secs: 10,
            max_retries: 1,
        }
    }

    #[test]
    fn endpoints_follow_provider_conventions() {
        assert_eq!(
            chat_endpoint(&config(LlmProvider::OpenAi, None)).expect("openai"),
            "https://api.openai.com/v1/chat/completions"
        );
        assert_eq!(
            chat_endpoint(&config(LlmProvider::Ollama, Some("http://gpu-box:11434/v1/")))
                .expect("ollama"),
            "http://gpu-box:11434/v1/chat/completions"
        );
        assert_eq!(
            chat_endpoint(&config(
                LlmProvider::AzureOpenAi,
                Some("https://contoso.openai.azure.com")
            ))
            .expect("azure"),
            "https://contoso.openai.azure.com/openai/deployments/gpt-4o/chat/completions?api-version=2024-10-21"
        );
        assert!(matches!(
            chat_endpoint(&config(LlmProvider::AzureOpenAi, None)),
            Err(LlmError::Configuration(_))
        ));
    }

    #[test]
    fn openai_client_requires_api_key() {
        let mut missing_key = config(LlmProvider::OpenAi, None);
        missing_key.api_key = None;
        assert!(matches!(
            OpenAiCompatibleClient::from_config(&missing_key),
            Err(LlmError::Configuration(_))
        ));

        let mut ollama = config(LlmProvider::Ollama, None);
        ollama.api_key = None;
        let client = OpenAiCompatibleClient::from_config(&ollama).expect("ollama needs no key");
        assert_eq!(client.endpoint(), "http://localhost:11434/v1/chat/completions");
    }

    #[test]
    fn request_body_carries_tools_and_tool_results() {
        let call = scripted_call("call_1", "get_guest_profile", json!({ "guest_id": 1 }));
        let messages = vec![
            ChatMessage::system("be helpful"),
            ChatMessage::user("who am I?"),
            ChatMessage::assistant_tool_calls(vec![call.clone()]),
            ChatMessage::tool_result(&call, &json!({ "name": "Maria" })),
        ];
        let tools = vec![ToolDefinition {
            name: "get_guest_profile".to_string(),
            description: "profile".to_string(),
            parameters: json!({ "type": "object" }),
        }];

        let body = request_body("gpt-4o", &messages, &tools);

        assert_eq!(body["tools"][0]["function"]["name"], "get_guest_profile");
        assert_eq!(body["tool_choice"], "auto");
        assert_eq!(body["messages"][2]["tool_calls"][0]["function"]["arguments"], "{\"guest_id\":1}");
        assert_eq!(body["messages"][3]["role"], "tool");
        assert_eq!(body["messages"][3]["tool_call_id"], "call_1");

        let without_tools = request_body("gpt-4o", &messages[..2], &[]);
        assert!(without_tools.get("tools").is_none());
    }

    #[test]
    fn response_parsing_decodes_string_arguments() {
        let message = parse_response(&json!({
            "choices": [{
                "message": {
                    "role": "assistant",
                    "content": null,
                    "tool_calls": [{
                        "id": "call_9",
                        "type": "function",
                        "function": { "name": "transfer_to_housekeeping", "arguments": "{\"reason\":\"towels\"}" }
                    }]
                }
            }]
        }))
        .expect("parse");

        assert!(message.has_tool_calls());
        assert_eq!(message.tool_calls[0].arguments, json!({ "reason": "towels" }));

        let text = parse_response(&json!({
            "choices": [{ "message": { "role": "assistant", "content": "Hello!" } }]
        }))
        .expect("parse text");
        assert_eq!(text.text(), "Hello!");

        assert!(matches!(parse_response(&json!({ "choices": [] })), Err(LlmError::Decode(_))));
    }

    #[test]
    fn argument_decoding_tolerates_objects_and_blanks() {
        assert_eq!(decode_arguments(json!("")), json!({}));
        assert_eq!(decode_arguments(json!({ "a": 1 })), json!({ "a": 1 }));
        assert_eq!(decode_arguments(json!("not json")), json!("not json"));
    }

    #[test]
    fn only_throttling_and_server_errors_are_retried() {
        assert!(is_retryable(&LlmError::Status { status: 429, body: String::new() }));
        assert!(is_retryable(&LlmError::Status { status: 503, body: String::new() }));
        assert!(!is_retryable(&LlmError::Status { status: 400, body: String::new() }));
        assert!(!is_retryable(&LlmError::Decode("bad".to_string())));
    }

    #[tokio::test]
    async fn scripted_client_replays_and_records() {
        let client = ScriptedChatClient::new(vec![ChatMessage::assistant("first")]);

        let reply = client.complete(&[ChatMessage::user("hi")], &[]).await.expect("reply");
        assert_eq!(reply.text(), "first");
        assert_eq!(client.requests().len(), 1);
        assert!(matches!(client.complete(&[], &[]).await, Err(LlmError::Exhausted)));
    }
}
