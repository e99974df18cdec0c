use concierge_core::config::{AppConfig, LlmProvider, LoadOptions};
use concierge_db::{connect_with_config, migrations, ping};
use serde::Serialize;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
enum CheckStatus {
    Pass,
    Fail,
    Skipped,
}

#[derive(Debug, Serialize)]
struct DoctorCheck {
    name: &'static str,
    status: CheckStatus,
    details: String,
}

impl DoctorCheck {
    fn skipped(name: &'static str, reason: &str) -> Self {
        Self { name, status: CheckStatus::Skipped, details: format!("skipped because {reason}") }
    }
}

#[derive(Debug, Serialize)]
struct DoctorReport {
    overall_status: CheckStatus,
    summary: String,
    checks: Vec<DoctorCheck>,
}

pub fn run(json_output: bool) -> String {
    let report = build_report();

    if json_output {
        return serde_json::to_string_pretty(&report).unwrap_or_else(|error| {
            format!(
                "{{\"overall_status\":\"fail\",\"summary\":\"doctor serialization failed\",\"error\":\"{}\"}}",
                escape_json(&error.to_string())
            )
        });
    }

    render_human(&report)
}

fn build_report() -> DoctorReport {
    let mut checks = Vec::new();

    match AppConfig::load(LoadOptions::default()) {
        Ok(config) => {
            checks.push(DoctorCheck {
                name: "config_validation",
                status: CheckStatus::Pass,
                details: "configuration loaded and validated".to_string(),
            });
            checks.push(check_llm_configuration(&config));
            checks.extend(check_database(&config));
        }
        Err(error) => {
            checks.push(DoctorCheck {
                name: "config_validation",
                status: CheckStatus::Fail,
                details: error.to_string(),
            });
            for name in ["llm_configuration", "database_connectivity", "migrations_current"] {
                checks.push(DoctorCheck::skipped(name, "configuration did not load"));
            }
        }
    }

    let all_pass = checks.iter().all(|check| check.status == CheckStatus::Pass);
    let overall_status = if all_pass { CheckStatus::Pass } else { CheckStatus::Fail };
    let summary = if all_pass {
        "doctor: all readiness checks passed".to_string()
    } else {
        "doctor: one or more readiness checks failed".to_string()
    };

    DoctorReport { overall_status, summary, checks }
}

fn check_llm_configuration(config: &AppConfig) -> DoctorCheck {
    let llm = &config.llm;
    let endpoint = llm.base_url.as_deref().unwrap_or("<provider default>");
    let key = match (llm.provider, llm.api_key.is_some()) {
        (LlmProvider::Ollama, false) => "no api key",
        (_, true) => "api key set",
        (_, false) => {
            return DoctorCheck {
                name: "llm_configuration",
                status: CheckStatus::Fail,
                details: format!("{:?} requires llm.api_key", llm.provider),
            };
        }
    };

    DoctorCheck {
        name: "llm_configuration",
        status: CheckStatus::Pass,
        details: format!("{:?} model `{}` at {endpoint} ({key})", llm.provider, llm.model),
    }
}

fn check_database(config: &AppConfig) -> Vec<DoctorCheck> {
    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(error) => {
            return vec![
                DoctorCheck {
                    name: "database_connectivity",
                    status: CheckStatus::Fail,
                    details: format!("failed to initialize async runtime: {error}"),
                },
                DoctorCheck::skipped("migrations_current", "the async runtime did not start"),
            ];
        }
    };

    runtime.block_on(async {
        let pool = match connect_with_config(&config.database).await {
            Ok(pool) => pool,
            Err(error) => {
                return vec![
                    DoctorCheck {
                        name: "database_connectivity",
                        status: CheckStatus::Fail,
                        details: format!("failed to connect to database: {error}"),
                    },
                    DoctorCheck::skipped("migrations_current", "the database is unreachable"),
                ];
            }
        };

        let connectivity = match ping(&pool).await {
            Ok(()) => DoctorCheck {
                name: "database_connectivity",
                status: CheckStatus::Pass,
                details: format!("connected using `{}`", config.database.url),
            },
            Err(error) => DoctorCheck {
                name: "database_connectivity",
                status: CheckStatus::Fail,
                details: format!("database query failed: {error}"),
            },
        };
        let schema = check_migrations(
            migrations::applied_version(&pool).await.map_err(|error| error.to_string()),
        );

        pool.close().await;
        vec![connectivity, schema]
    })
}

fn check_migrations(applied: Result<Option<i64>, String>) -> DoctorCheck {
    let latest = migrations::latest_version();
    let (status, details) = match applied {
        Err(error) => (CheckStatus::Fail, format!("could not read migration history: {error}")),
        Ok(applied) if applied >= latest => {
            (CheckStatus::Pass, format!("schema at version {}", render_version(applied)))
        }
        Ok(applied) => (
            CheckStatus::Fail,
            format!(
                "schema at version {}, binary ships {}; run `concierge migrate`",
                render_version(applied),
                render_version(latest)
            ),
        ),
    };

    DoctorCheck { name: "migrations_current", status, details }
}

fn render_version(version: Option<i64>) -> String {
    version.map(|version| version.to_string()).unwrap_or_else(|| "none".to_string())
}

fn render_human(report: &DoctorReport) -> String {
    let mut lines = Vec::new();
    lines.push(report.summary.clone());

    for check in &report.checks {
        let marker = match check.status {
            CheckStatus::Pass => "ok",
            CheckStatus::Fail => "fail",
            CheckStatus::Skipped => "skip",
        };
        lines.push(format!("- [{marker}] {}: {}", check.name, check.details));
    }

    lines.join("\n")
}

fn escape_json(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}
