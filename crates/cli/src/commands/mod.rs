//! Command handlers for the Recall CLI.
//!
//! This module organizes all CLI commands into separate submodules.

pub mod chat;
pub mod ingest;
pub mod query;
pub mod stats;

// Re-export command types for convenience
pub use chat::ChatCommand;
pub use ingest::IngestCommand;
pub use query::QueryCommand;
pub use stats::StatsCommand;

use recall_core::{config::AppConfig, AppResult};
use recall_index::{load_config, QueryResponse, Retrieval, Scalar};

/// Build the retrieval engine from the workspace's `.recall/retrieval.yaml`.
pub(crate) fn open_retrieval(config: &AppConfig) -> AppResult<Retrieval> {
    let retrieval_config = load_config(&config.workspace)?;
    Retrieval::from_config(config, &retrieval_config)
}

/// Print a query response for humans.
pub(crate) fn print_response(response: &QueryResponse) {
    if let Some(error) = &response.error {
        println!("No results ({})", error);
        return;
    }

    let intent = response.intent.as_deref().unwrap_or("NEW_SEARCH");
    if response.results.is_empty() {
        println!("{}: no results", intent);
        return;
    }

    println!("{}: {} result(s)", intent, response.results.len());
    for (position, result) in response.results.iter().enumerate() {
        let name = result
            .metadata
            .get("name")
            .map(Scalar::to_string)
            .unwrap_or_else(|| result.external_ref.clone());
        println!(
            "{:>2}. [{:.3}] {} ({})",
            position + 1,
            result.score,
            name,
            result.external_ref
        );
        println!("    {}", preview(&result.content, 120));
    }
}

/// First `max_chars` characters on a single line.
fn preview(text: &str, max_chars: usize) -> String {
    let flat = text.split_whitespace().collect::<Vec<_>>().join(" ");
    match flat.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}...", &flat[..cut]),
        None => flat,
    }
}
