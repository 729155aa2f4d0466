//! Recall CLI
//!
//! Main entry point for the recall command-line tool.
//! Ingests documents and images into the remote-backed index and answers
//! queries, including follow-up selections from the previous results.

mod commands;

use clap::{Parser, Subcommand};
use commands::{ChatCommand, IngestCommand, QueryCommand, StatsCommand};
use recall_core::{config::AppConfig, logging, AppResult};
use std::path::PathBuf;
use tracing::Instrument;

/// Recall - conversational retrieval over documents and images
#[derive(Parser, Debug)]
#[command(name = "recall")]
#[command(about = "Conversational retrieval over documents and images", long_about = None)]
#[command(version)]
struct Cli {
    /// Path to workspace directory (default: current directory)
    #[arg(short, long, global = true, env = "RECALL_WORKSPACE")]
    workspace: Option<PathBuf>,

    /// Path to config file
    #[arg(short, long, global = true, env = "RECALL_CONFIG")]
    config: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, global = true, env = "RUST_LOG")]
    log_level: Option<String>,

    /// Enable verbose output (sets log level to debug)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Disable colored output
    #[arg(long, global = true, env = "NO_COLOR")]
    no_color: bool,

    /// LLM provider for the llm classifier and summarizer
    #[arg(short, long, global = true, env = "RECALL_PROVIDER")]
    provider: Option<String>,

    /// Completion model identifier
    #[arg(short, long, global = true, env = "RECALL_MODEL")]
    model: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Store and index documents or images
    Ingest(IngestCommand),

    /// Run a single query
    Query(QueryCommand),

    /// Interactive session: search, then pick results by position
    Chat(ChatCommand),

    /// Show collection sizes and blob store usage
    Stats(StatsCommand),
}

impl Commands {
    fn name(&self) -> &'static str {
        match self {
            Commands::Ingest(_) => "ingest",
            Commands::Query(_) => "query",
            Commands::Chat(_) => "chat",
            Commands::Stats(_) => "stats",
        }
    }

    /// Run the command inside a `command` span.
    async fn run(self, config: &AppConfig) -> AppResult<()> {
        let span = tracing::info_span!("command", name = self.name());
        async {
            match self {
                Commands::Ingest(cmd) => cmd.execute(config).await,
                Commands::Query(cmd) => cmd.execute(config).await,
                Commands::Chat(cmd) => cmd.execute(config).await,
                Commands::Stats(cmd) => cmd.execute(config).await,
            }
        }
        .instrument(span)
        .await
    }
}

#[tokio::main]
async fn main() -> AppResult<()> {
    // Parse command-line arguments first (needed for logging config)
    let cli = Cli::parse();

    let config = AppConfig::load()?.with_overrides(
        cli.workspace,
        cli.config,
        cli.provider,
        cli.model,
        cli.log_level,
        cli.verbose,
        cli.no_color,
    );

    logging::init_logging(config.log_level.as_deref(), config.no_color)?;

    tracing::info!("Recall CLI starting");
    tracing::debug!("Workspace: {:?}", config.workspace);
    tracing::debug!("Provider: {} ({})", config.provider, config.model);

    config.ensure_recall_dir()?;

    let result = cli.command.run(&config).await;

    match &result {
        Ok(_) => tracing::info!("Command completed successfully"),
        Err(e) => tracing::error!("Command failed: {}", e),
    }

    result
}
