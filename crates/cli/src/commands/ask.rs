use concierge_agent::AgentRuntime;
use concierge_core::config::{AppConfig, LoadOptions};
use concierge_core::domain::customer::CustomerId;
use concierge_db::{connect_with_config, migrations};
use serde_json::json;

use crate::commands::CommandResult;

pub fn run(guest_id: i64, guest_name: &str, message: &str) -> CommandResult {
    if message.trim().is_empty() {
        return CommandResult::failure("ask", "invalid_input", "message cannot be empty", 2);
    }

    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult::failure(
                "ask",
                "config_validation",
                format!("configuration issue: {error}"),
                2,
            );
        }
    };

    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(error) => {
            return CommandResult::failure(
                "ask",
                "runtime_init",
                format!("failed to initialize async runtime: {error}"),
                3,
            );
        }
    };

    let result = runtime.block_on(async {
        let pool = connect_with_config(&config.database)
            .await
            .map_err(|error| ("db_connectivity", error.to_string(), 4u8))?;
        migrations::run_pending(&pool)
            .await
            .map_err(|error| ("migration", error.to_string(), 5u8))?;

        let agents = AgentRuntime::from_config(&config, pool.clone())
            .map_err(|error| ("agent", error.to_string(), 6u8))?;
        let outcome = agents
            .handle_guest_query(CustomerId(guest_id), guest_name, message)
            .await
            .map_err(|error| ("agent", error.to_string(), 6u8));

        pool.close().await;
        outcome
    });

    match result {
        Ok(outcome) => CommandResult::success_with(
            "ask",
            outcome.reply,
            json!({
                "guest_id": guest_id,
                "final_agent": outcome.final_agent,
                "path": outcome.path,
                "tool_calls": outcome.tool_calls,
            }),
        ),
        Err((error_class, message, exit_code)) => {
            CommandResult::failure("ask", error_class, message, exit_code)
        }
    }
}
