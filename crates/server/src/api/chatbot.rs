use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    Json,
};
use concierge_agent::{AgentKind, ToolContext};
use concierge_core::domain::customer::CustomerId;
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use super::{new_correlation_id, ApiError, ApiResult, AppState};

const EMPTY_MESSAGE: &str = "Message cannot be empty.";
const CHAT_FAILED: &str = "An error occurred while processing your request.";
const INVALID_BODY: &str = "Invalid request body.";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    #[serde(default, alias = "Message")]
    pub message: Option<String>,
    #[serde(default, alias = "GuestName")]
    pub guest_name: Option<String>,
    #[serde(default, alias = "GuestId")]
    pub guest_id: i64,
}

#[derive(Debug, PartialEq, Eq, Serialize)]
pub struct ChatResponse {
    pub message: String,
}

pub async fn message(
    State(state): State<AppState>,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> ApiResult<Json<ChatResponse>> {
    respond(&state, AgentKind::Orchestrator, chat_request(payload)?).await
}

pub async fn housekeeping_message(
    State(state): State<AppState>,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> ApiResult<Json<ChatResponse>> {
    respond(&state, AgentKind::Housekeeping, chat_request(payload)?).await
}

pub async fn room_service_message(
    State(state): State<AppState>,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> ApiResult<Json<ChatResponse>> {
    respond(&state, AgentKind::RoomService, chat_request(payload)?).await
}

fn chat_request(payload: Result<Json<ChatRequest>, JsonRejection>) -> ApiResult<ChatRequest> {
    payload.map(|Json(request)| request).map_err(|rejection| {
        warn!(
            event_name = "api.chatbot.invalid_body",
            error = %rejection.body_text(),
            "chat request body rejected"
        );
        ApiError::new(rejection.status(), INVALID_BODY)
    })
}

async fn respond(
    state: &AppState,
    kind: AgentKind,
    request: ChatRequest,
) -> ApiResult<Json<ChatResponse>> {
    let message = request.message.as_deref().map(str::trim).unwrap_or_default();
    if message.is_empty() {
        warn!(event_name = "api.chatbot.empty_message", guest_id = request.guest_id, "empty chat message");
        return Err(ApiError::bad_request(EMPTY_MESSAGE));
    }

    let guest_name = request.guest_name.as_deref().map(str::trim).unwrap_or_default();
    let correlation_id = new_correlation_id();
    let context = ToolContext::new(CustomerId(request.guest_id), guest_name)
        .with_correlation_id(correlation_id.clone());

    info!(
        event_name = "api.chatbot.message_received",
        correlation_id = %correlation_id,
        guest_id = request.guest_id,
        agent = kind.agent_name(),
        "chat message received"
    );

    match state.agent_runtime.run(kind, &context, message).await {
        Ok(result) => Ok(Json(ChatResponse { message: result.reply })),
        Err(error) => {
            error!(
                event_name = "api.chatbot.failed",
                correlation_id = %correlation_id,
                guest_id = request.guest_id,
                error = %error,
                "error processing chat message"
            );
            Err(ApiError::new(StatusCode::INTERNAL_SERVER_ERROR, CHAT_FAILED))
        }
    }
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use concierge_agent::llm::scripted_call;
    use concierge_agent::ChatMessage;
    use serde_json::json;

    use crate::api::test_support::{app, app_with_replies, send};

    #[tokio::test]
    async fn blank_message_is_a_bad_request() {
        let (app, _stay) = app().await;

        let (status, body) = send(
            &app,
            "POST",
            "/api/Chatbot/message",
            Some(json!({ "message": "   ", "guestName": "Maria Garcia", "guestId": 1 })),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, json!({ "message": "Message cannot be empty." }));
    }

    #[tokio::test]
    async fn malformed_body_gets_a_json_error() {
        let (app, _stay) = app().await;

        let (status, body) = send(
            &app,
            "POST",
            "/api/Chatbot/message",
            Some(json!({ "message": "towels please", "guestId": null })),
        )
        .await;
        assert!(status.is_client_error(), "unexpected status {status}");
        assert_eq!(body["message"], "Invalid request body.");

        let (status, body) = send(
            &app,
            "POST",
            "/api/Chatbot/roomservice/message",
            Some(json!(["not", "an", "object"])),
        )
        .await;
        assert!(status.is_client_error(), "unexpected status {status}");
        assert_eq!(body["message"], "Invalid request body.");
    }

    #[tokio::test]
    async fn reply_comes_from_the_orchestration() {
        let (app, _stay, client) = app_with_replies(vec![
            ChatMessage::assistant_tool_calls(vec![scripted_call(
                "call-1",
                "transfer_to_housekeeping",
                json!({}),
            )]),
            ChatMessage::assistant("Fresh towels are on their way, Maria."),
        ])
        .await;

        let (status, body) = send(
            &app,
            "POST",
            "/api/Chatbot/message",
            Some(json!({ "message": "More towels please", "guestName": "Maria Garcia", "guestId": 1 })),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "Fresh towels are on their way, Maria.");
        assert_eq!(client.requests().len(), 2);
    }

    #[tokio::test]
    async fn variants_open_at_their_own_agent() {
        let (app, _stay, client) =
            app_with_replies(vec![ChatMessage::assistant("Your order is on its way.")]).await;

        let (status, _) = send(
            &app,
            "POST",
            "/api/Chatbot/roomservice/message",
            Some(json!({ "Message": "Where is my sandwich?", "GuestName": "Maria", "GuestId": 1 })),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        let first = &client.requests()[0];
        assert!(first.tool_names.contains(&"create_room_service_order".to_string()));
    }

    #[tokio::test]
    async fn orchestration_failure_is_a_generic_500() {
        let (app, _stay) = app().await;

        let (status, body) = send(
            &app,
            "POST",
            "/api/Chatbot/housekeeping/message",
            Some(json!({ "message": "hello", "guestName": "Maria", "guestId": 1 })),
        )
        .await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body, json!({ "message": "An error occurred while processing your request." }));
    }
}
