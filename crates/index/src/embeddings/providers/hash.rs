//! Deterministic hashing embedder for offline use and tests.

use crate::embeddings::provider::EmbeddingBackend;
use crate::types::EmbeddingVector;
use recall_core::AppResult;
use std::collections::{HashMap, HashSet};

const STOP_WORDS: &[&str] = &[
    "the", "is", "at", "which", "on", "a", "an", "as", "are", "was", "were", "for", "to", "of",
    "in", "and", "or", "but", "with", "by", "from", "this", "that", "be", "have", "has", "had",
    "it", "its", "their", "they", "them",
];

/// Hashing embedder.
///
/// Text is embedded from word and character-trigram hashes; images from
/// byte-trigram hashes. Not semantically meaningful, but deterministic and
/// content-dependent, which is what the index needs offline.
#[derive(Debug)]
pub struct HashEmbedder {
    dimensions: usize,
}

impl HashEmbedder {
    /// Create a new hashing embedder with specified dimensions.
    pub fn new(dimensions: usize) -> Self {
        Self { dimensions }
    }

    fn bucket(&self, hash: u64) -> usize {
        (hash % self.dimensions as u64) as usize
    }

    fn text_features(&self, text: &str) -> Vec<f32> {
        let mut embedding = vec![0.0; self.dimensions];
        let stop_words: HashSet<&str> = STOP_WORDS.iter().copied().collect();

        let lower = text.to_lowercase();
        let mut word_freq: HashMap<&str, u32> = HashMap::new();
        for word in lower
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !stop_words.contains(w) && w.chars().count() > 2)
        {
            *word_freq.entry(word).or_insert(0) += 1;
        }

        for (word, freq) in &word_freq {
            let chars: Vec<char> = word.chars().collect();
            for window in chars.windows(3) {
                let trigram_hash = window
                    .iter()
                    .fold(0u64, |acc, c| acc.wrapping_mul(37).wrapping_add(*c as u64));
                let dim = self.bucket(trigram_hash);
                embedding[dim] += (*freq as f32).sqrt();
            }

            let word_hash = word
                .bytes()
                .fold(0u64, |acc, b| acc.wrapping_mul(31).wrapping_add(b as u64));
            let dim = self.bucket(word_hash);
            embedding[dim] += *freq as f32;
        }

        embedding
    }

    fn image_features(&self, image: &[u8]) -> Vec<f32> {
        let mut embedding = vec![0.0; self.dimensions];
        for window in image.windows(3) {
            let hash = window
                .iter()
                .fold(0u64, |acc, b| acc.wrapping_mul(257).wrapping_add(*b as u64));
            let dim = self.bucket(hash);
            embedding[dim] += 1.0;
        }
        embedding
    }
}

#[async_trait::async_trait]
impl EmbeddingBackend for HashEmbedder {
    fn backend_name(&self) -> &str {
        "mock"
    }

    fn model_name(&self) -> &str {
        "hash-v1"
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    async fn embed_text(&self, text: &str) -> AppResult<EmbeddingVector> {
        EmbeddingVector::normalized(self.text_features(text))
    }

    async fn embed_image(&self, image: &[u8]) -> AppResult<EmbeddingVector> {
        EmbeddingVector::normalized(self.image_features(image))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn norm(v: &EmbeddingVector) -> f32 {
        v.as_slice().iter().map(|x| x * x).sum::<f32>().sqrt()
    }

    #[tokio::test]
    async fn test_hash_embedder_dimensions() {
        let backend = HashEmbedder::new(128);
        assert_eq!(backend.dimensions(), 128);
        assert_eq!(backend.backend_name(), "mock");
        assert_eq!(backend.model_name(), "hash-v1");
    }

    #[tokio::test]
    async fn test_text_is_normalized() {
        let backend = HashEmbedder::new(384);
        let embedding = backend.embed_text("annual budget planning").await.unwrap();

        assert_eq!(embedding.dimension(), 384);
        assert!((norm(&embedding) - 1.0).abs() < 0.001);
    }

    #[tokio::test]
    async fn test_deterministic() {
        let backend = HashEmbedder::new(384);
        let first = backend.embed_text("deterministic test").await.unwrap();
        let second = backend.embed_text("deterministic test").await.unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_different_texts_differ() {
        let backend = HashEmbedder::new(384);
        let a = backend.embed_text("hello world").await.unwrap();
        let b = backend.embed_text("goodbye world").await.unwrap();
        assert_ne!(a, b);
    }

    #[tokio::test]
    async fn test_shared_vocabulary_scores_higher() {
        let backend = HashEmbedder::new(384);
        let doc = backend
            .embed_text("invoice payment overdue invoice")
            .await
            .unwrap();
        let related = backend.embed_text("overdue invoice").await.unwrap();
        let unrelated = backend.embed_text("mountain hiking trail").await.unwrap();

        assert!(doc.dot(&related) > doc.dot(&unrelated));
    }

    #[tokio::test]
    async fn test_empty_text_is_zero_vector() {
        let backend = HashEmbedder::new(64);
        let embedding = backend.embed_text("").await.unwrap();
        assert!(embedding.as_slice().iter().all(|&x| x == 0.0));
    }

    #[tokio::test]
    async fn test_utf8_safety() {
        let backend = HashEmbedder::new(384);
        let embedding = backend
            .embed_text("Relatório técnico 🎮 de análise")
            .await
            .unwrap();
        assert!((norm(&embedding) - 1.0).abs() < 0.001);
    }

    #[tokio::test]
    async fn test_image_is_normalized() {
        let backend = HashEmbedder::new(256);
        let bytes: Vec<u8> = (0..=255u8).cycle().take(4096).collect();
        let embedding = backend.embed_image(&bytes).await.unwrap();
        assert!((norm(&embedding) - 1.0).abs() < 0.001);
    }
}
