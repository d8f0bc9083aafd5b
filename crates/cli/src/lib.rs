pub mod commands;

use clap::{Parser, Subcommand};
use std::process::ExitCode;

#[derive(Debug, Parser)]
#[command(
    name = "pulse",
    about = "PulseBot operator CLI",
    long_about = "Inspect PulseBot configuration, check runtime readiness, and preview digests offline.",
    after_help = "Examples:\n  pulse doctor --json\n  pulse config\n  pulse preview --role crypto --interest DeFi"
)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(
        about = "Inspect effective configuration values with source attribution and redaction"
    )]
    Config,
    #[command(about = "Validate config, Slack token readiness, and LLM endpoint readiness")]
    Doctor {
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
    #[command(about = "Render a digest for a hypothetical profile using the built-in catalog")]
    Preview {
        #[arg(long, help = "Role: engineering, design, product, business, ai_ml, crypto")]
        role: String,
        #[arg(long = "interest", help = "Interest keyword; repeat for several")]
        interests: Vec<String>,
        #[arg(long, help = "Maximum number of articles")]
        max: Option<usize>,
    },
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Config => commands::config::run(),
        Command::Doctor { json } => commands::doctor::run(json),
        Command::Preview { role, interests, max } => {
            commands::preview::run(&role, &interests, max)
        }
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}
