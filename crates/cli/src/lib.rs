pub mod commands;

use clap::{Parser, Subcommand};
use std::process::ExitCode;

#[derive(Debug, Parser)]
#[command(
    name = "concierge",
    about = "Concierge operator CLI",
    long_about = "Operate the hotel concierge runtime: migrations, readiness checks, config inspection, and one-off agent queries.",
    after_help = "Examples:\n  concierge doctor --json\n  concierge config\n  concierge ask --guest-id 1 --guest-name Maria \"Can I get fresh towels?\""
)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Apply pending database migrations and return structured status output")]
    Migrate,
    #[command(
        about = "Inspect effective configuration values with source attribution and redaction"
    )]
    Config,
    #[command(about = "Validate config, database connectivity, migrations, and LLM settings")]
    Doctor {
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
    #[command(about = "Send one guest message through the agent orchestration")]
    Ask {
        #[arg(long, help = "Customer id the conversation is scoped to")]
        guest_id: i64,
        #[arg(long, default_value = "Guest", help = "Name the agents address the guest by")]
        guest_name: String,
        #[arg(required = true, help = "Guest message")]
        message: Vec<String>,
    },
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Migrate => commands::migrate::run(),
        Command::Config => {
            commands::CommandResult { exit_code: 0, output: commands::config::run() }
        }
        Command::Doctor { json } => {
            commands::CommandResult { exit_code: 0, output: commands::doctor::run(json) }
        }
        Command::Ask { guest_id, guest_name, message } => {
            commands::ask::run(guest_id, &guest_name, &message.join(" "))
        }
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}
