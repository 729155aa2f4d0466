//! Stats command handler.

use super::open_retrieval;
use clap::Args;
use recall_core::{config::AppConfig, AppResult};

/// Show collection sizes and blob store usage
#[derive(Args, Debug)]
pub struct StatsCommand {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl StatsCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing stats command");

        let retrieval = open_retrieval(config)?;
        let stats = retrieval.stats().await?;

        if self.json {
            println!("{}", serde_json::to_string_pretty(&stats)?);
        } else {
            println!("Documents: {}", stats.documents);
            println!("Images:    {}", stats.images);
            println!(
                "Blobs:     {} ({} bytes)",
                stats.blob_count, stats.blob_bytes
            );
        }

        Ok(())
    }
}
