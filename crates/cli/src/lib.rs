pub mod commands;
pub mod logging;
pub mod speech;

use clap::{Parser, Subcommand};
use std::process::ExitCode;

#[derive(Debug, Parser)]
#[command(
    name = "stowaway",
    about = "Talk to your storage containers",
    long_about = "Manage numbered storage containers by typing commands or scanning photos of their contents.",
    after_help = "Examples:\n  stowaway\n  stowaway chat --speak\n  stowaway doctor --json\n  stowaway config"
)]
pub struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Start an interactive assistant session (default)")]
    Chat {
        #[arg(long, help = "Read assistant replies aloud")]
        speak: bool,
    },
    #[command(
        about = "Inspect effective configuration values with source attribution and redaction"
    )]
    Config,
    #[command(about = "Validate config, API key presence, and speech command availability")]
    Doctor {
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command.unwrap_or(Command::Chat { speak: false }) {
        Command::Chat { speak } => commands::chat::run(speak),
        Command::Config => commands::CommandResult::completed(commands::config::run()),
        Command::Doctor { json } => commands::doctor::run(json),
    };

    if !result.output.is_empty() {
        println!("{}", result.output);
    }
    ExitCode::from(result.exit_code)
}
