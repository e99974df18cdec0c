//! `GET /health`: the service is ready when the database answers and its
//! schema is at the version this binary ships with.

use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use chrono::Utc;
use concierge_db::{migrations, ping, DbPool};
use serde::Serialize;
use tracing::warn;

use crate::api::AppState;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Readiness {
    Ready,
    Degraded,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DatabaseHealth {
    pub reachable: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SchemaHealth {
    pub applied_version: Option<i64>,
    pub expected_version: Option<i64>,
    pub current: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthReport {
    pub status: Readiness,
    pub database: DatabaseHealth,
    pub schema: SchemaHealth,
    pub model: String,
    pub checked_at: String,
}

pub fn router(state: AppState) -> Router {
    Router::new().route("/health", get(health)).with_state(state)
}

pub async fn health(State(state): State<AppState>) -> (StatusCode, Json<HealthReport>) {
    let report = HealthReport {
        status: Readiness::Degraded,
        database: database_health(&state.db_pool).await,
        schema: schema_health(&state.db_pool).await,
        model: state.agent_runtime.model_name().to_string(),
        checked_at: Utc::now().to_rfc3339(),
    };

    if report.database.reachable && report.schema.current {
        return (StatusCode::OK, Json(HealthReport { status: Readiness::Ready, ..report }));
    }

    warn!(
        event_name = "system.health.degraded",
        correlation_id = "health",
        database_reachable = report.database.reachable,
        applied_version = ?report.schema.applied_version,
        expected_version = ?report.schema.expected_version,
        "health check degraded"
    );
    (StatusCode::SERVICE_UNAVAILABLE, Json(report))
}

async fn database_health(pool: &DbPool) -> DatabaseHealth {
    match ping(pool).await {
        Ok(()) => DatabaseHealth { reachable: true, error: None },
        Err(error) => DatabaseHealth { reachable: false, error: Some(error.to_string()) },
    }
}

async fn schema_health(pool: &DbPool) -> SchemaHealth {
    let expected_version = migrations::latest_version();
    let applied_version = migrations::applied_version(pool).await.ok().flatten();
    SchemaHealth { applied_version, expected_version, current: applied_version >= expected_version }
}
