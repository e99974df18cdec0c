use std::env;
use std::sync::{Mutex, OnceLock};

use concierge_cli::commands::{ask, config, doctor, migrate};
use serde_json::Value;

const MEMORY_DB: (&str, &str) = ("CONCIERGE_DATABASE_URL", "sqlite::memory:");
// Nothing listens on the discard port, so agent calls fail fast.
const UNREACHABLE_LLM: (&str, &str) = ("CONCIERGE_LLM_BASE_URL", "http://127.0.0.1:9/v1");

#[test]
fn migrate_returns_success_with_valid_env() {
    with_env(&[MEMORY_DB], || {
        let result = migrate::run();
        assert_eq!(result.exit_code, 0, "expected successful migrate run");

        let payload = parse_payload(&result.output);
        assert_eq!(payload["command"], "migrate");
        assert_eq!(payload["status"], "ok");
        assert!(payload["message"].as_str().is_some_and(|message| message.contains("version")));
    });
}

#[test]
fn migrate_returns_config_failure_for_openai_without_key() {
    with_env(&[MEMORY_DB, ("CONCIERGE_LLM_PROVIDER", "open_ai")], || {
        let result = migrate::run();
        assert_eq!(result.exit_code, 2, "expected config validation failure code");

        let payload = parse_payload(&result.output);
        assert_eq!(payload["status"], "error");
        assert_eq!(payload["error_class"], "config_validation");
    });
}

#[test]
fn migrate_reports_unreachable_database() {
    with_env(
        &[("CONCIERGE_DATABASE_URL", "sqlite:///nonexistent-dir/concierge.db?mode=ro")],
        || {
            let result = migrate::run();
            assert_eq!(result.exit_code, 4, "expected db connectivity failure code");

            let payload = parse_payload(&result.output);
            assert_eq!(payload["error_class"], "db_connectivity");
        },
    );
}

#[test]
fn doctor_json_flags_pending_migrations_on_a_fresh_database() {
    with_env(&[MEMORY_DB], || {
        let report = parse_payload(&doctor::run(true));

        assert_eq!(report["overall_status"], "fail");
        let status_of = |name: &str| {
            report["checks"]
                .as_array()
                .and_then(|checks| checks.iter().find(|check| check["name"] == name))
                .map(|check| check["status"].clone())
                .unwrap_or(Value::Null)
        };
        assert_eq!(status_of("config_validation"), "pass");
        assert_eq!(status_of("llm_configuration"), "pass");
        assert_eq!(status_of("database_connectivity"), "pass");
        assert_eq!(status_of("migrations_current"), "fail");
    });
}

#[test]
fn doctor_skips_dependent_checks_when_config_is_invalid() {
    with_env(&[MEMORY_DB, ("CONCIERGE_DATABASE_MAX_CONNECTIONS", "0")], || {
        let output = doctor::run(false);

        assert!(output.starts_with("doctor: one or more readiness checks failed"));
        assert!(output.contains("- [fail] config_validation"));
        assert!(output.contains("- [skip] database_connectivity"));
        assert!(output.contains("- [skip] migrations_current"));
    });
}

#[test]
fn config_redacts_api_key_and_attributes_env_sources() {
    with_env(
        &[
            MEMORY_DB,
            ("CONCIERGE_LLM_PROVIDER", "open_ai"),
            ("CONCIERGE_LLM_API_KEY", "sk-test-secret-value"),
            ("CONCIERGE_LOG_LEVEL", "debug"),
        ],
        || {
            let output = config::run();

            assert!(output.contains("- llm.api_key = sk-*** (source: env (CONCIERGE_LLM_API_KEY))"));
            assert!(!output.contains("secret-value"));
            assert!(output.contains(
                "- database.url = sqlite::memory: (source: env (CONCIERGE_DATABASE_URL))"
            ));
            assert!(output.contains("- logging.level = debug (source: env (CONCIERGE_LOG_LEVEL))"));
            assert!(output.contains("- agents.max_handoffs = 4 (source: default)"));
        },
    );
}

#[test]
fn ask_returns_agent_failure_when_the_model_is_unreachable() {
    with_env(&[MEMORY_DB, UNREACHABLE_LLM, ("CONCIERGE_LLM_MAX_RETRIES", "0")], || {
        let result = ask::run(1, "Maria", "Can I get fresh towels?");
        assert_eq!(result.exit_code, 6, "expected agent failure code");

        let payload = parse_payload(&result.output);
        assert_eq!(payload["command"], "ask");
        assert_eq!(payload["status"], "error");
        assert_eq!(payload["error_class"], "agent");
    });
}

#[test]
fn ask_rejects_blank_messages_before_loading_anything() {
    with_env(&[], || {
        let result = ask::run(1, "Maria", "   ");
        assert_eq!(result.exit_code, 2, "blank input is a usage error, not an agent failure");

        let payload = parse_payload(&result.output);
        assert_eq!(payload["error_class"], "invalid_input");
    });
}

fn parse_payload(output: &str) -> Value {
    serde_json::from_str(output).expect("command output should be valid JSON")
}

fn with_env(vars: &[(&str, &str)], test_fn: impl FnOnce()) {
    static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();
    let _guard =
        ENV_LOCK.get_or_init(|| Mutex::new(())).lock().expect("env mutex should not be poisoned");

    let keys = [
        "CONCIERGE_DATABASE_URL",
        "CONCIERGE_DATABASE_MAX_CONNECTIONS",
        "CONCIERGE_DATABASE_TIMEOUT_SECS",
        "CONCIERGE_LLM_PROVIDER",
        "CONCIERGE_LLM_API_KEY",
        "CONCIERGE_LLM_API_VERSION",
        "CONCIERGE_LLM_BASE_URL",
        "CONCIERGE_LLM_MODEL",
        "CONCIERGE_LLM_TIMEOUT_SECS",
        "CONCIERGE_LLM_MAX_RETRIES",
        "CONCIERGE_AGENTS_MAX_TOOL_ROUNDS",
        "CONCIERGE_AGENTS_MAX_HANDOFFS",
        "CONCIERGE_SERVER_BIND_ADDRESS",
        "CONCIERGE_SERVER_PORT",
        "CONCIERGE_SERVER_GRACEFUL_SHUTDOWN_SECS",
        "CONCIERGE_SERVER_STATIC_DIR",
        "CONCIERGE_LOGGING_LEVEL",
        "CONCIERGE_LOGGING_FORMAT",
        "CONCIERGE_LOG_LEVEL",
        "CONCIERGE_LOG_FORMAT",
    ];

    let previous_values: Vec<(&str, Option<String>)> =
        keys.iter().map(|key| (*key, env::var(key).ok())).collect();

    for key in &keys {
        env::remove_var(key);
    }
    for (key, value) in vars {
        env::set_var(key, value);
    }

    test_fn();

    for (key, value) in previous_values {
        if let Some(value) = value {
            env::set_var(key, value);
        } else {
            env::remove_var(key);
        }
    }
}
