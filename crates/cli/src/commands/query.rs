//! Query command handler.

use super::{open_retrieval, print_response};
use clap::Args;
use recall_core::{config::AppConfig, AppResult};
use recall_index::CollectionKind;

/// Run a single query.
///
/// Result slots live in memory, so a selection ("the second one") only has
/// something to pick from inside `recall chat`. Here it runs as a search.
#[derive(Args, Debug)]
pub struct QueryCommand {
    /// Query text
    pub text: String,

    /// Collection to search (documents, images)
    #[arg(long, default_value = "documents")]
    pub collection: CollectionKind,

    /// Session id
    #[arg(long, default_value = "default")]
    pub session: String,

    /// Number of results (default from retrieval.yaml)
    #[arg(short = 'k', long)]
    pub top_k: Option<usize>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl QueryCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing query command on {}", self.collection);

        let retrieval = open_retrieval(config)?;
        let response = retrieval
            .query(&self.session, self.collection, &self.text, self.top_k)
            .await;

        if self.json {
            println!("{}", serde_json::to_string_pretty(&response)?);
        } else {
            print_response(&response);
        }

        Ok(())
    }
}
