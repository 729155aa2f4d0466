//! Embedding backend trait and factory.

use crate::embeddings::config::EmbeddingSettings;
use crate::types::EmbeddingVector;
use recall_core::{AppError, AppResult};
use std::sync::Arc;

/// Trait for embedding backends.
///
/// Text and image inputs share one vector space per backend, so a text query
/// can be scored against image vectors.
#[async_trait::async_trait]
pub trait EmbeddingBackend: Send + Sync + std::fmt::Debug {
    /// Get backend name (e.g., "mock", "ollama")
    fn backend_name(&self) -> &str;

    /// Get model identifier
    fn model_name(&self) -> &str;

    /// Get embedding dimensions
    fn dimensions(&self) -> usize;

    /// Embed a piece of text.
    async fn embed_text(&self, text: &str) -> AppResult<EmbeddingVector>;

    /// Embed raw image bytes.
    async fn embed_image(&self, image: &[u8]) -> AppResult<EmbeddingVector>;
}

/// Create an embedding backend based on settings.
pub fn create_backend(settings: &EmbeddingSettings) -> AppResult<Arc<dyn EmbeddingBackend>> {
    settings.validate()?;

    match settings.provider.as_str() {
        "mock" | "hash" => {
            let backend = super::providers::hash::HashEmbedder::new(settings.dimensions);
            Ok(Arc::new(backend))
        }

        "ollama" => {
            let backend = super::providers::ollama::OllamaEmbedder::new(settings)?;
            Ok(Arc::new(backend))
        }

        _ => Err(AppError::Config(format!(
            "Unknown embedding provider: '{}'. Supported providers: mock, ollama",
            settings.provider
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_mock_backend() {
        let settings = EmbeddingSettings::default();
        let backend = create_backend(&settings).unwrap();
        assert_eq!(backend.backend_name(), "mock");
        assert_eq!(backend.model_name(), "hash-v1");
        assert_eq!(backend.dimensions(), 384);
    }

    #[test]
    fn test_create_ollama_backend() {
        let settings = EmbeddingSettings {
            provider: "ollama".to_string(),
            model: "nomic-embed-text".to_string(),
            dimensions: 768,
            endpoint: Some("http://localhost:11434".to_string()),
        };
        let backend = create_backend(&settings).unwrap();
        assert_eq!(backend.backend_name(), "ollama");
        assert_eq!(backend.dimensions(), 768);
    }

    #[test]
    fn test_create_unknown_backend() {
        let settings = EmbeddingSettings {
            provider: "unknown".to_string(),
            ..Default::default()
        };

        let result = create_backend(&settings);
        assert!(result.is_err());
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("Unknown embedding provider"));
    }

    #[tokio::test]
    async fn test_backend_embed_text() {
        let backend = create_backend(&EmbeddingSettings::default()).unwrap();
        let embedding = backend.embed_text("quarterly revenue report").await.unwrap();
        assert_eq!(embedding.dimension(), 384);
    }
}
