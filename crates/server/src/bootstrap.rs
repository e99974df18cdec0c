use std::sync::Arc;

use concierge_agent::{AgentRuntime, OrchestrationError};
use concierge_core::config::AppConfig;
use concierge_db::{connect_with_config, migrations, DbPool};
use thiserror::Error;
use tracing::info;

use crate::api::AppState;

pub struct Application {
    pub config: AppConfig,
    pub db_pool: DbPool,
    pub agent_runtime: Arc<AgentRuntime>,
}

impl Application {
    pub fn state(&self) -> AppState {
        AppState::new(self.db_pool.clone(), self.agent_runtime.clone())
    }
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error("database connection failed: {0}")]
    DatabaseConnect(#[source] sqlx::Error),
    #[error("database migration failed: {0}")]
    Migration(#[source] sqlx::migrate::MigrateError),
    #[error("agent runtime could not be initialized: {0}")]
    Agent(#[source] OrchestrationError),
}

pub async fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    info!(
        event_name = "system.bootstrap.start",
        correlation_id = "bootstrap",
        "starting application bootstrap"
    );

    let db_pool =
        connect_with_config(&config.database).await.map_err(BootstrapError::DatabaseConnect)?;
    info!(
        event_name = "system.bootstrap.database_connected",
        correlation_id = "bootstrap",
        "database connection established"
    );

    migrations::run_pending(&db_pool).await.map_err(BootstrapError::Migration)?;
    info!(
        event_name = "system.bootstrap.migrations_applied",
        correlation_id = "bootstrap",
        "database migrations applied"
    );

    let agent_runtime =
        AgentRuntime::from_config(&config, db_pool.clone()).map_err(BootstrapError::Agent)?;
    info!(
        event_name = "system.bootstrap.agents_ready",
        correlation_id = "bootstrap",
        provider = ?config.llm.provider,
        model = %agent_runtime.model_name(),
        "agent runtime initialized"
    );

    Ok(Application { config, db_pool, agent_runtime: Arc::new(agent_runtime) })
}

#[cfg(test)]
mod tests {
    use concierge_core::config::{AppConfig, ConfigOverrides, LlmProvider, LoadOptions};

    use crate::bootstrap::{bootstrap_with_config, BootstrapError};

    fn config(database_url: &str) -> AppConfig {
        AppConfig::load(LoadOptions {
            overrides: ConfigOverrides {
                database_url: Some(database_url.to_string()),
                llm_provider: Some(LlmProvider::Ollama),
                llm_base_url: Some("http://localhost:11434/v1".to_string()),
                llm_model: Some("llama3.1".to_string()),
                ..ConfigOverrides::default()
            },
            ..LoadOptions::default()
        })
        .expect("overrides form a valid config")
    }

    #[tokio::test]
    async fn unreachable_database_stops_bootstrap() {
        let result =
            bootstrap_with_config(config("sqlite:///nonexistent-dir/concierge.db?mode=ro")).await;

        assert!(matches!(result, Err(BootstrapError::DatabaseConnect(_))));
    }

    #[tokio::test]
    async fn bootstrap_migrates_and_builds_the_runtime() {
        let app = bootstrap_with_config(config("sqlite::memory:"))
            .await
            .expect("bootstrap should succeed with valid overrides");

        let (table_count,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM sqlite_master \
             WHERE type = 'table' AND name IN ('customer', 'room', 'booking', \
             'housekeeping_request', 'room_service')",
        )
        .fetch_one(&app.db_pool)
        .await
        .expect("count hotel tables");
        assert_eq!(table_count, 5);
        assert_eq!(app.agent_runtime.model_name(), "llama3.1");

        app.db_pool.close().await;
    }
}
