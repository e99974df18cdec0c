use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use concierge_core::config::{resolve_config_path, AppConfig, LoadOptions};
use secrecy::ExposeSecret;
use toml::Value;

type Entry = (&'static str, &'static [&'static str], String);

fn entry(key_path: &'static str, env_keys: &'static [&'static str], value: String) -> Entry {
    (key_path, env_keys, value)
}

struct ConfigFile {
    path: PathBuf,
    doc: Value,
}

pub fn run() -> String {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => return format!("config validation failed: {error}"),
    };

    let config_file = resolve_config_path(None).and_then(|path| load_config_file(&path));
    let entries = effective_entries(&config);

    let mut lines = vec!["effective config (source precedence: env > file > default):".to_string()];
    for (key_path, env_keys, value) in entries {
        let source = field_source(key_path, env_keys, config_file.as_ref());
        lines.push(render_line(key_path, &value, source));
    }

    lines.join("\n")
}

fn effective_entries(config: &AppConfig) -> Vec<Entry> {
    let optional = |value: Option<&str>| value.unwrap_or("<unset>").to_string();
    let api_key = match config.llm.api_key.as_ref() {
        Some(key) => redact_secret(key.expose_secret()),
        None => "<unset>".to_string(),
    };

    vec![
        entry("database.url", &["CONCIERGE_DATABASE_URL"], config.database.url.clone()),
        entry(
            "database.max_connections",
            &["CONCIERGE_DATABASE_MAX_CONNECTIONS"],
            config.database.max_connections.to_string(),
        ),
        entry(
            "database.timeout_secs",
            &["CONCIERGE_DATABASE_TIMEOUT_SECS"],
            config.database.timeout_secs.to_string(),
        ),
        entry("llm.provider", &["CONCIERGE_LLM_PROVIDER"], format!("{:?}", config.llm.provider)),
        entry("llm.model", &["CONCIERGE_LLM_MODEL"], config.llm.model.clone()),
        entry("llm.base_url", &["CONCIERGE_LLM_BASE_URL"], optional(config.llm.base_url.as_deref())),
        entry("llm.api_key", &["CONCIERGE_LLM_API_KEY"], api_key),
        entry(
            "llm.api_version",
            &["CONCIERGE_LLM_API_VERSION"],
            optional(config.llm.api_version.as_deref()),
        ),
        entry("llm.timeout_secs", &["CONCIERGE_LLM_TIMEOUT_SECS"], config.llm.timeout_secs.to_string()),
        entry("llm.max_retries", &["CONCIERGE_LLM_MAX_RETRIES"], config.llm.max_retries.to_string()),
        entry(
            "agents.max_tool_rounds",
            &["CONCIERGE_AGENTS_MAX_TOOL_ROUNDS"],
            config.agents.max_tool_rounds.to_string(),
        ),
        entry(
            "agents.max_handoffs",
            &["CONCIERGE_AGENTS_MAX_HANDOFFS"],
            config.agents.max_handoffs.to_string(),
        ),
        entry(
            "server.bind_address",
            &["CONCIERGE_SERVER_BIND_ADDRESS"],
            config.server.bind_address.clone(),
        ),
        entry("server.port", &["CONCIERGE_SERVER_PORT"], config.server.port.to_string()),
        entry(
            "server.graceful_shutdown_secs",
            &["CONCIERGE_SERVER_GRACEFUL_SHUTDOWN_SECS"],
            config.server.graceful_shutdown_secs.to_string(),
        ),
        entry(
            "server.static_dir",
            &["CONCIERGE_SERVER_STATIC_DIR"],
            config
                .server
                .static_dir
                .as_ref()
                .map(|path| path.display().to_string())
                .unwrap_or_else(|| "<unset>".to_string()),
        ),
        entry(
            "logging.level",
            &["CONCIERGE_LOGGING_LEVEL", "CONCIERGE_LOG_LEVEL"],
            config.logging.level.clone(),
        ),
        entry(
            "logging.format",
            &["CONCIERGE_LOGGING_FORMAT", "CONCIERGE_LOG_FORMAT"],
            format!("{:?}", config.logging.format),
        ),
    ]
}

fn load_config_file(path: &Path) -> Option<ConfigFile> {
    let raw = fs::read_to_string(path).ok()?;
    let doc = raw.parse::<Value>().ok()?;
    Some(ConfigFile { path: path.to_path_buf(), doc })
}

fn field_source(key_path: &str, env_keys: &[&str], config_file: Option<&ConfigFile>) -> String {
    if let Some(env_key) = env_keys.iter().find(|key| env::var_os(key).is_some()) {
        return format!("env ({env_key})");
    }

    if let Some(file) = config_file {
        if contains_path(&file.doc, key_path) {
            return format!("file ({})", file.path.display());
        }
    }

    "default".to_string()
}

fn contains_path(root: &Value, key_path: &str) -> bool {
    let mut current = root;
    for key in key_path.split('.') {
        let Some(next) = current.get(key) else {
            return false;
        };
        current = next;
    }
    true
}

fn render_line(key: &str, value: &str, source: String) -> String {
    format!("- {key} = {value} (source: {source})")
}

fn redact_secret(secret: &str) -> String {
    let trimmed = secret.trim();
    if trimmed.is_empty() {
        return "<empty>".to_string();
    }

    if let Some((prefix, _)) = trimmed.split_once('-') {
        return format!("{prefix}-***");
    }

    "<redacted>".to_string()
}

#[cfg(test)]
mod tests {
    use toml::Value;

    use super::{contains_path, redact_secret};

    #[test]
    fn secrets_keep_only_their_vendor_prefix() {
        assert_eq!(redact_secret("sk-live-abc123"), "sk-***");
        assert_eq!(redact_secret("plainsecret"), "<redacted>");
        assert_eq!(redact_secret("   "), "<empty>");
    }

    #[test]
    fn nested_keys_are_found_in_file_documents() {
        let doc: Value = "[llm]\nmodel = \"gpt-4o\"\n".parse().expect("valid toml");

        assert!(contains_path(&doc, "llm.model"));
        assert!(!contains_path(&doc, "llm.base_url"));
        assert!(!contains_path(&doc, "server.port"));
    }
}
