//! Retrieval configuration management.
//!
//! Stored at `.recall/retrieval.yaml`; every field has a default so a
//! missing or partial file is fine.

use crate::embeddings::EmbeddingSettings;
use recall_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Where bundles and original assets are stored.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BlobStoreSettings {
    /// "sqlite" or "memory"
    #[serde(default = "default_blob_kind")]
    pub kind: String,

    /// SQLite database path, relative to the workspace. Defaults to
    /// `.recall/blobs.sqlite`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,

    /// Folder scoping every blob name
    #[serde(default = "default_folder")]
    pub folder: String,
}

fn default_blob_kind() -> String {
    "sqlite".to_string()
}

fn default_folder() -> String {
    "recall".to_string()
}

impl Default for BlobStoreSettings {
    fn default() -> Self {
        Self {
            kind: default_blob_kind(),
            path: None,
            folder: default_folder(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SummarizerSettings {
    /// "truncate" or "llm"
    #[serde(default = "default_summarizer_kind")]
    pub kind: String,

    #[serde(default = "default_max_chars")]
    pub max_chars: usize,
}

fn default_summarizer_kind() -> String {
    "truncate".to_string()
}

fn default_max_chars() -> usize {
    2000
}

impl Default for SummarizerSettings {
    fn default() -> Self {
        Self {
            kind: default_summarizer_kind(),
            max_chars: default_max_chars(),
        }
    }
}

/// Retrieval engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RetrievalConfig {
    #[serde(default)]
    pub blob_store: BlobStoreSettings,

    #[serde(default)]
    pub embedding: EmbeddingSettings,

    #[serde(default = "default_documents_collection")]
    pub documents_collection: String,

    #[serde(default = "default_images_collection")]
    pub images_collection: String,

    /// Intent classifier: "rule" or "llm"
    #[serde(default = "default_classifier")]
    pub classifier: String,

    #[serde(default)]
    pub summarizer: SummarizerSettings,

    /// Seconds a result slot stays selectable; 0 keeps it until replaced
    #[serde(default = "default_slot_ttl_secs")]
    pub slot_ttl_secs: u64,

    #[serde(default = "default_top_k")]
    pub default_top_k: usize,
}

fn default_documents_collection() -> String {
    "documents".to_string()
}

fn default_images_collection() -> String {
    "images".to_string()
}

fn default_classifier() -> String {
    "rule".to_string()
}

fn default_slot_ttl_secs() -> u64 {
    900
}

fn default_top_k() -> usize {
    5
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            blob_store: BlobStoreSettings::default(),
            embedding: EmbeddingSettings::default(),
            documents_collection: default_documents_collection(),
            images_collection: default_images_collection(),
            classifier: default_classifier(),
            summarizer: SummarizerSettings::default(),
            slot_ttl_secs: default_slot_ttl_secs(),
            default_top_k: default_top_k(),
        }
    }
}

impl RetrievalConfig {
    /// Reject values no component accepts.
    pub fn validate(&self) -> AppResult<()> {
        self.embedding.validate()?;

        if !matches!(self.blob_store.kind.as_str(), "sqlite" | "memory") {
            return Err(AppError::Config(format!(
                "Unknown blob store '{}'. Supported: sqlite, memory",
                self.blob_store.kind
            )));
        }
        if !matches!(self.classifier.as_str(), "rule" | "llm") {
            return Err(AppError::Config(format!(
                "Unknown classifier '{}'. Supported: rule, llm",
                self.classifier
            )));
        }
        if !matches!(self.summarizer.kind.as_str(), "truncate" | "llm") {
            return Err(AppError::Config(format!(
                "Unknown summarizer '{}'. Supported: truncate, llm",
                self.summarizer.kind
            )));
        }
        if self.documents_collection.trim().is_empty() || self.images_collection.trim().is_empty()
        {
            return Err(AppError::Config(
                "Collection names must not be empty".to_string(),
            ));
        }
        if self.documents_collection == self.images_collection {
            return Err(AppError::Config(format!(
                "Documents and images cannot share the collection name '{}'",
                self.documents_collection
            )));
        }
        if self.default_top_k == 0 {
            return Err(AppError::Config(
                "default_top_k must be greater than zero".to_string(),
            ));
        }

        Ok(())
    }

    /// Absolute path of the SQLite blob database.
    pub fn blob_path(&self, workspace: &Path) -> PathBuf {
        match &self.blob_store.path {
            Some(path) if path.is_absolute() => path.clone(),
            Some(path) => workspace.join(path),
            None => workspace.join(".recall").join("blobs.sqlite"),
        }
    }
}

/// Load retrieval configuration.
///
/// Loads from `.recall/retrieval.yaml` if it exists, otherwise returns defaults.
pub fn load_config(workspace: &Path) -> AppResult<RetrievalConfig> {
    let config_path = get_config_path(workspace);

    if config_path.exists() {
        let content = fs::read_to_string(&config_path).map_err(|e| {
            AppError::Config(format!("Failed to read config at {:?}: {}", config_path, e))
        })?;

        let config: RetrievalConfig = serde_yaml::from_str(&content).map_err(|e| {
            AppError::Config(format!("Failed to parse config at {:?}: {}", config_path, e))
        })?;

        tracing::debug!("Loaded retrieval config from {:?}", config_path);
        Ok(config)
    } else {
        tracing::debug!("Using default retrieval config (no config file found)");
        Ok(RetrievalConfig::default())
    }
}

/// Save retrieval configuration.
pub fn save_config(workspace: &Path, config: &RetrievalConfig) -> AppResult<()> {
    let config_path = get_config_path(workspace);

    if let Some(parent) = config_path.parent() {
        fs::create_dir_all(parent)
            .map_err(|e| AppError::Config(format!("Failed to create config directory: {}", e)))?;
    }

    let yaml = serde_yaml::to_string(config)?;

    fs::write(&config_path, yaml).map_err(|e| {
        AppError::Config(format!("Failed to write config to {:?}: {}", config_path, e))
    })?;

    tracing::debug!("Saved retrieval config to {:?}", config_path);
    Ok(())
}

/// Get the path to the retrieval config file.
pub fn get_config_path(workspace: &Path) -> PathBuf {
    workspace.join(".recall").join("retrieval.yaml")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_load_default_config() {
        let temp = TempDir::new().unwrap();
        let config = load_config(temp.path()).unwrap();

        assert_eq!(config, RetrievalConfig::default());
        assert_eq!(config.blob_store.kind, "sqlite");
        assert_eq!(config.slot_ttl_secs, 900);
        assert_eq!(config.default_top_k, 5);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_save_and_load_config() {
        let temp = TempDir::new().unwrap();
        let mut config = RetrievalConfig::default();
        config.classifier = "llm".to_string();
        config.blob_store.folder = "team-drive".to_string();
        config.default_top_k = 8;

        save_config(temp.path(), &config).unwrap();

        let loaded = load_config(temp.path()).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let temp = TempDir::new().unwrap();
        let path = get_config_path(temp.path());
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, "classifier: llm\nembedding:\n  dimensions: 64\n").unwrap();

        let config = load_config(temp.path()).unwrap();
        assert_eq!(config.classifier, "llm");
        assert_eq!(config.embedding.dimensions, 64);
        assert_eq!(config.embedding.provider, "mock");
        assert_eq!(config.images_collection, "images");
    }

    #[test]
    fn test_invalid_yaml_is_config_error() {
        let temp = TempDir::new().unwrap();
        let path = get_config_path(temp.path());
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, "slot_ttl_secs: [not a number").unwrap();

        assert!(matches!(
            load_config(temp.path()),
            Err(AppError::Config(_))
        ));
    }

    #[test]
    fn test_validate_rejects_unknowns() {
        let mut config = RetrievalConfig::default();
        config.classifier = "magic".to_string();
        assert!(config.validate().is_err());

        let mut config = RetrievalConfig::default();
        config.blob_store.kind = "s3".to_string();
        assert!(config.validate().is_err());

        let mut config = RetrievalConfig::default();
        config.images_collection = "documents".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_blob_path_resolution() {
        let workspace = Path::new("/work");
        let mut config = RetrievalConfig::default();
        assert_eq!(
            config.blob_path(workspace),
            PathBuf::from("/work/.recall/blobs.sqlite")
        );

        config.blob_store.path = Some(PathBuf::from("data/blobs.db"));
        assert_eq!(
            config.blob_path(workspace),
            PathBuf::from("/work/data/blobs.db")
        );
    }
}
