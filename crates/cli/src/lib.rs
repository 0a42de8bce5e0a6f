pub mod commands;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(
    name = "dealbot",
    about = "Dealbot operator CLI",
    long_about = "Inspect configuration, check reference data, resolve catalog prices, and \
                  drive the product dialog locally.",
    after_help = "Examples:\n  dealbot doctor --json\n  dealbot config\n  \
                  dealbot resolve --product sme.net --scope 13\n  dealbot chat < turns.jsonl"
)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Inspect effective configuration values with source attribution")]
    Config,
    #[command(about = "Validate config and reference data files")]
    Doctor {
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
    #[command(about = "Normalize raw slot values and resolve them against the catalog")]
    Resolve {
        #[arg(long)]
        product: Option<String>,
        #[arg(long)]
        organization: Option<String>,
        #[arg(long)]
        package: Option<String>,
        #[arg(long)]
        scope: Option<String>,
    },
    #[command(about = "Run a local conversation from JSON lines or /intent payloads on stdin")]
    Chat {
        #[arg(long, default_value = "cli", help = "Sender id for the conversation")]
        sender: String,
        #[arg(long, help = "Read turns from a file instead of stdin")]
        input: Option<PathBuf>,
    },
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Config => {
            commands::CommandResult { exit_code: 0, output: commands::config::run() }
        }
        Command::Doctor { json } => commands::doctor::run(json),
        Command::Resolve { product, organization, package, scope } => {
            commands::resolve::run(commands::resolve::ResolveArgs {
                product,
                organization,
                package,
                scope,
            })
        }
        Command::Chat { sender, input } => commands::chat::run(&sender, input.as_deref()),
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}
