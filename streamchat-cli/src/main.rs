//! Main entry point for the Streamchat terminal client.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use clap_complete::Shell;
use dotenv::dotenv;
use tracing_subscriber::{EnvFilter, fmt};

mod commands;
mod id_store;

/// Streamchat CLI
#[derive(Parser)]
#[command(name = "Streamchat CLI")]
#[command(about = "Command-line client for the Streamchat agent", long_about = None)]
struct Cli {
    /// Backend base URL (e.g., http://localhost:8000); overrides the configuration file
    #[arg(long, global = true)]
    server: Option<String>,

    /// Path to a TOML client configuration file
    #[arg(long, short, global = true)]
    config: Option<PathBuf>,

    /// File holding the active conversation identity
    #[arg(long, global = true)]
    id_file: Option<PathBuf>,

    /// Log diagnostics to stderr (overridden by RUST_LOG)
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Subcommands for the Streamchat CLI
#[derive(Subcommand)]
enum Commands {
    /// Send a message and stream the agent's reply
    Ask(commands::ask::AskArgs),

    /// Show the persisted history of the active conversation
    History,

    /// Show follow-up suggestions for the active conversation
    Suggestions,

    /// Delete the active conversation and forget its identity
    Clear,

    /// Check that the backend is reachable and its agent is ready
    Health,

    /// Generate shell completion scripts for the CLI
    Completion {
        /// The shell type for which to generate the completion script (e.g., bash, zsh, fish, powershell)
        #[arg(long, short, value_enum)]
        shell: Shell,
    },
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    dotenv().ok();
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Commands::Completion { shell } = cli.command {
        commands::completion::generate_completion(shell);
        return Ok(());
    }

    let context = commands::Context::load(
        cli.config.as_deref(),
        cli.server.as_deref(),
        cli.id_file,
    )?;

    match cli.command {
        Commands::Ask(args) => commands::ask::run(&context, args).await,
        Commands::History => commands::history::run(&context).await,
        Commands::Suggestions => commands::suggestions::run(&context).await,
        Commands::Clear => commands::clear::run(&context).await,
        Commands::Health => commands::health::run(&context).await,
        Commands::Completion { .. } => Ok(()),
    }
}
