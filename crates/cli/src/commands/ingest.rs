//! Ingest command handler.
//!
//! Stores each file in the blob store and indexes it into a collection.

use super::open_retrieval;
use anyhow::{bail, Context};
use clap::Args;
use recall_core::{config::AppConfig, AppError, AppResult};
use recall_index::{CollectionKind, Metadata, Scalar};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Store and index documents or images
#[derive(Args, Debug)]
pub struct IngestCommand {
    /// Target collection (documents, images)
    #[arg(long, default_value = "documents")]
    pub collection: CollectionKind,

    /// Extra metadata applied to every file (key=value, repeatable)
    #[arg(long = "meta", value_parser = parse_meta)]
    pub meta: Vec<(String, Scalar)>,

    /// Files or directories to ingest
    #[arg(required = true)]
    pub paths: Vec<PathBuf>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

/// Parse a `key=value` metadata pair.
fn parse_meta(raw: &str) -> anyhow::Result<(String, Scalar)> {
    let (key, value) = raw
        .split_once('=')
        .with_context(|| format!("expected key=value, got '{}'", raw))?;
    let key = key.trim();
    if key.is_empty() {
        bail!("metadata key must not be empty in '{}'", raw);
    }
    Ok((key.to_string(), Scalar::parse_loose(value.trim())))
}

/// Expand directories into the files beneath them, skipping hidden entries.
fn collect_files(paths: &[PathBuf]) -> Vec<PathBuf> {
    let mut files = Vec::new();
    for path in paths {
        if path.is_dir() {
            files.extend(
                WalkDir::new(path)
                    .follow_links(false)
                    .sort_by_file_name()
                    .into_iter()
                    .filter_entry(|e| {
                        e.depth() == 0 || !e.file_name().to_string_lossy().starts_with('.')
                    })
                    .filter_map(|e| e.ok())
                    .filter(|e| e.file_type().is_file())
                    .map(|e| e.into_path()),
            );
        } else {
            files.push(path.clone());
        }
    }
    files
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

impl IngestCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing ingest command for {}", self.collection);

        let retrieval = open_retrieval(config)?;
        let files = collect_files(&self.paths);

        let mut ingested = Vec::new();
        let mut failed = Vec::new();

        for path in &files {
            let name = file_name(path);
            let mut metadata: Metadata = self.meta.iter().cloned().collect();
            metadata.insert("path".to_string(), Scalar::from(path.display().to_string()));

            let outcome = match tokio::fs::read(path).await {
                Ok(bytes) => {
                    metadata.insert("size_bytes".to_string(), Scalar::Int(bytes.len() as i64));
                    retrieval
                        .ingest(self.collection, &bytes, &name, metadata)
                        .await
                }
                Err(e) => Err(AppError::Io(e)),
            };

            match outcome {
                Ok(external_ref) => {
                    if !self.json {
                        println!("+ {} -> {}", path.display(), external_ref);
                    }
                    ingested.push(serde_json::json!({
                        "path": path.display().to_string(),
                        "externalRef": external_ref,
                    }));
                }
                Err(e) => {
                    tracing::warn!("Failed to ingest {:?}: {}", path, e);
                    if !self.json {
                        println!("! {}: {}", path.display(), e);
                    }
                    failed.push(serde_json::json!({
                        "path": path.display().to_string(),
                        "error": e.to_string(),
                    }));
                }
            }
        }

        if self.json {
            let output = serde_json::json!({
                "collection": self.collection,
                "ingested": ingested,
                "failed": failed,
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        } else {
            println!(
                "Ingested {} of {} file(s) into {}",
                ingested.len(),
                files.len(),
                self.collection
            );
        }

        if !failed.is_empty() {
            return Err(AppError::Other(format!(
                "{} of {} file(s) failed to ingest",
                failed.len(),
                files.len()
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_parse_meta() {
        assert_eq!(
            parse_meta("pages=12").unwrap(),
            ("pages".to_string(), Scalar::Int(12))
        );
        assert_eq!(
            parse_meta(" author = Ada ").unwrap(),
            ("author".to_string(), Scalar::from("Ada"))
        );
        assert!(parse_meta("no-equals").is_err());
        assert!(parse_meta("=value").is_err());
    }

    #[test]
    fn test_collect_files_skips_hidden() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join("b.txt"), "b").unwrap();
        std::fs::write(temp.path().join("a.txt"), "a").unwrap();
        std::fs::create_dir(temp.path().join(".recall")).unwrap();
        std::fs::write(temp.path().join(".recall").join("blobs.sqlite"), "x").unwrap();

        let files = collect_files(&[temp.path().to_path_buf()]);
        let names: Vec<String> = files.iter().map(|p| file_name(p)).collect();
        assert_eq!(names, vec!["a.txt", "b.txt"]);
    }
}
