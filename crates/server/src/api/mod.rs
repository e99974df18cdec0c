//! REST surface: chat endpoints, customer lookup, housekeeping and room
//! service records, and per-guest reports.

pub mod chatbot;
pub mod customer_info;
pub mod housekeeping;
pub mod reports;
pub mod room_service;

use std::path::Path;
use std::sync::Arc;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use concierge_agent::{AgentRuntime, HotelRepositories};
use concierge_core::errors::{ApplicationError, InterfaceError};
use concierge_db::DbPool;
use serde::Serialize;
use tower_http::{services::ServeDir, trace::TraceLayer};
use tracing::{error, warn};
use uuid::Uuid;

use crate::health;

#[derive(Clone)]
pub struct AppState {
    pub db_pool: DbPool,
    pub repositories: HotelRepositories,
    pub agent_runtime: Arc<AgentRuntime>,
}

impl AppState {
    pub fn new(db_pool: DbPool, agent_runtime: Arc<AgentRuntime>) -> Self {
        Self { repositories: HotelRepositories::sql(db_pool.clone()), db_pool, agent_runtime }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiMessage {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub correlation_id: Option<String>,
}

#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    body: ApiMessage,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self { status, body: ApiMessage { message: message.into(), correlation_id: None } }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }

    /// Maps an application failure to a response, logging anything that is
    /// not the caller's fault.
    pub fn from_application(error: ApplicationError, event_name: &'static str) -> Self {
        let correlation_id = new_correlation_id();
        let interface = error.into_interface(correlation_id.clone());

        let (status, message) = match &interface {
            InterfaceError::BadRequest { message, .. } => {
                warn!(event_name, correlation_id = %correlation_id, error = %message, "request rejected");
                (StatusCode::BAD_REQUEST, message.clone())
            }
            InterfaceError::NotFound { message, .. } => (StatusCode::NOT_FOUND, capitalize(message)),
            InterfaceError::ServiceUnavailable { message, .. } => {
                error!(event_name, correlation_id = %correlation_id, error = %message, "request failed");
                (StatusCode::SERVICE_UNAVAILABLE, interface.user_message().to_string())
            }
            InterfaceError::Internal { message, .. } => {
                error!(event_name, correlation_id = %correlation_id, error = %message, "request failed");
                (StatusCode::INTERNAL_SERVER_ERROR, interface.user_message().to_string())
            }
        };

        Self { status, body: ApiMessage { message, correlation_id: Some(correlation_id) } }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

pub fn new_correlation_id() -> String {
    Uuid::new_v4().to_string()
}

fn capitalize(message: &str) -> String {
    let mut chars = message.chars();
    match chars.next() {
        Some(first) => format!("{}{}.", first.to_uppercase(), chars.as_str()),
        None => String::new(),
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/Chatbot/message", post(chatbot::message))
        .route("/api/Chatbot/housekeeping/message", post(chatbot::housekeeping_message))
        .route("/api/Chatbot/roomservice/message", post(chatbot::room_service_message))
        .route("/api/CustomerInfo/customer/{email}", get(customer_info::customer_by_email))
        .route("/api/Housekeeping", get(housekeeping::list).post(housekeeping::create))
        .route("/api/Housekeeping/{id}/status", put(housekeeping::update_status))
        .route("/api/RoomService", get(room_service::list).post(room_service::create))
        .route("/api/RoomService/{id}/status", put(room_service::update_status))
        .route("/api/Reports/guest/{guest_id}", get(reports::guest_report))
        .with_state(state)
}

/// The full application: API, health check, optional static front end and
/// request tracing.
pub fn app(state: AppState, static_dir: Option<&Path>) -> Router {
    let mut app = router(state.clone()).merge(health::router(state));
    if let Some(dir) = static_dir {
        app = app.fallback_service(ServeDir::new(dir));
    }
    app.layer(TraceLayer::new_for_http())
}


#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use concierge_core::errors::{ApplicationError, DomainError};

    use super::{capitalize, ApiError};

    #[test]
    fn application_errors_map_to_statuses() {
        let missing =
            ApiError::from_application(ApplicationError::NotFound("booking 9".into()), "test.error");
        assert_eq!(missing.status(), StatusCode::NOT_FOUND);
        assert_eq!(missing.body.message, "Booking 9 not found.");
        assert!(missing.body.correlation_id.is_some());

        let invalid = ApiError::from_application(
            ApplicationError::Domain(DomainError::InvariantViolation("price".into())),
            "test.error",
        );
        assert_eq!(invalid.status(), StatusCode::BAD_REQUEST);

        let storage =
            ApiError::from_application(ApplicationError::Persistence("locked".into()), "test.error");
        assert_eq!(storage.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert!(!storage.body.message.contains("locked"));
    }

    #[test]
    fn capitalize_adds_a_full_stop() {
        assert_eq!(capitalize("room service order 4 not found"), "Room service order 4 not found.");
        assert_eq!(capitalize(""), "");
    }
}
