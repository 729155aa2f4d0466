//! Chat command handler.
//!
//! Line-oriented loop over stdin. Every line goes through the query router
//! with the same session, so follow-ups can select from the last results.

use super::{open_retrieval, print_response};
use clap::Args;
use recall_core::{config::AppConfig, AppResult};
use recall_index::CollectionKind;
use std::io::Write;
use tokio::io::{AsyncBufReadExt, BufReader};

/// Interactive session: search, then pick results by position
#[derive(Args, Debug)]
pub struct ChatCommand {
    /// Collection to search (documents, images)
    #[arg(long, default_value = "documents")]
    pub collection: CollectionKind,

    /// Session id
    #[arg(long, default_value = "chat")]
    pub session: String,

    /// Number of results per search (default from retrieval.yaml)
    #[arg(short = 'k', long)]
    pub top_k: Option<usize>,
}

fn prompt() -> AppResult<()> {
    print!("> ");
    std::io::stdout().flush()?;
    Ok(())
}

impl ChatCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!(
            "Starting chat on {} (session '{}')",
            self.collection,
            self.session
        );

        let retrieval = open_retrieval(config)?;
        println!(
            "Searching {}. Ask for something, then pick a result (\"the second one\"). \
             Type 'exit' to quit.",
            self.collection
        );

        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        prompt()?;

        while let Some(line) = lines.next_line().await? {
            let line = line.trim();
            if matches!(line, "exit" | "quit") {
                break;
            }
            if !line.is_empty() {
                let response = retrieval
                    .query(&self.session, self.collection, line, self.top_k)
                    .await;
                print_response(&response);
            }
            prompt()?;
        }

        retrieval.slots().clear(&self.session);
        Ok(())
    }
}
