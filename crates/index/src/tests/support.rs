//! Deterministic collaborators shared by the test modules.

use crate::blob::{BlobEntry, BlobId, BlobStore, MemoryBlobStore};
use crate::classifier::IntentClassifier;
use crate::embeddings::EmbeddingBackend;
use crate::types::EmbeddingVector;
use recall_core::{AppError, AppResult};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

const KEYWORDS: &[&str] = &[
    "apple", "banana", "cherry", "invoice", "contract", "report", "sunset", "mountain", "ocean",
];

/// One dimension per keyword, weighted by occurrence count.
///
/// Image bytes are read as (lossy) UTF-8 so tests can describe an image by
/// its "pixels".
#[derive(Debug)]
pub struct KeywordEmbedder {
    keywords: Vec<String>,
}

impl Default for KeywordEmbedder {
    fn default() -> Self {
        Self {
            keywords: KEYWORDS.iter().map(|k| k.to_string()).collect(),
        }
    }
}

impl KeywordEmbedder {
    fn features(&self, text: &str) -> AppResult<EmbeddingVector> {
        let lower = text.to_lowercase();
        let words: Vec<&str> = lower.split(|c: char| !c.is_alphanumeric()).collect();
        let values = self
            .keywords
            .iter()
            .map(|k| words.iter().filter(|w| *w == k).count() as f32)
            .collect();
        EmbeddingVector::normalized(values)
    }
}

#[async_trait::async_trait]
impl EmbeddingBackend for KeywordEmbedder {
    fn backend_name(&self) -> &str {
        "keyword"
    }

    fn model_name(&self) -> &str {
        "keyword-test"
    }

    fn dimensions(&self) -> usize {
        self.keywords.len()
    }

    async fn embed_text(&self, text: &str) -> AppResult<EmbeddingVector> {
        self.features(text)
    }

    async fn embed_image(&self, image: &[u8]) -> AppResult<EmbeddingVector> {
        self.features(&String::from_utf8_lossy(image))
    }
}

/// Backend that is always down.
#[derive(Debug)]
pub struct FailingEmbedder;

#[async_trait::async_trait]
impl EmbeddingBackend for FailingEmbedder {
    fn backend_name(&self) -> &str {
        "failing"
    }

    fn model_name(&self) -> &str {
        "none"
    }

    fn dimensions(&self) -> usize {
        KEYWORDS.len()
    }

    async fn embed_text(&self, _text: &str) -> AppResult<EmbeddingVector> {
        Err(AppError::BackendUnavailable("embedding service down".to_string()))
    }

    async fn embed_image(&self, _image: &[u8]) -> AppResult<EmbeddingVector> {
        Err(AppError::BackendUnavailable("embedding service down".to_string()))
    }
}

/// Classifier replaying canned labels and recording what it was asked.
#[derive(Debug, Default)]
pub struct ScriptedClassifier {
    labels: Mutex<Vec<String>>,
    pub seen: Mutex<Vec<(String, bool)>>,
}

impl ScriptedClassifier {
    pub fn new(labels: &[&str]) -> Self {
        Self {
            labels: Mutex::new(labels.iter().rev().map(|l| l.to_string()).collect()),
            seen: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait::async_trait]
impl IntentClassifier for ScriptedClassifier {
    async fn classify(&self, query: &str, has_pending_slot: bool) -> AppResult<String> {
        self.seen
            .lock()
            .unwrap()
            .push((query.to_string(), has_pending_slot));
        self.labels
            .lock()
            .unwrap()
            .pop()
            .ok_or_else(|| AppError::BackendUnavailable("classifier script exhausted".to_string()))
    }
}

/// Blob store that loses its connection on one chosen upload or update.
#[derive(Debug, Default)]
pub struct FlakyBlobStore {
    pub inner: Arc<MemoryBlobStore>,
    attempts: AtomicUsize,
    fail_on: AtomicUsize,
}

impl FlakyBlobStore {
    pub fn new(inner: Arc<MemoryBlobStore>) -> Self {
        Self {
            inner,
            ..Self::default()
        }
    }

    /// Fail the `n`-th upload/update from now (1 = the next one).
    pub fn fail_write(&self, n: usize) {
        let attempts = self.attempts.load(Ordering::SeqCst);
        self.fail_on.store(attempts + n, Ordering::SeqCst);
    }

    fn attempt(&self) -> AppResult<()> {
        let attempt = self.attempts.fetch_add(1, Ordering::SeqCst) + 1;
        if attempt == self.fail_on.load(Ordering::SeqCst) {
            return Err(AppError::Storage("connection reset".to_string()));
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl BlobStore for FlakyBlobStore {
    async fn find(&self, name: &str) -> AppResult<Option<BlobId>> {
        self.inner.find(name).await
    }

    async fn download(&self, id: &str) -> AppResult<Vec<u8>> {
        self.inner.download(id).await
    }

    async fn upload(&self, name: &str, bytes: &[u8]) -> AppResult<BlobId> {
        self.attempt()?;
        self.inner.upload(name, bytes).await
    }

    async fn update(&self, id: &str, bytes: &[u8]) -> AppResult<()> {
        self.attempt()?;
        self.inner.update(id, bytes).await
    }

    async fn delete(&self, id: &str) -> AppResult<()> {
        self.inner.delete(id).await
    }

    async fn list(&self) -> AppResult<Vec<BlobEntry>> {
        self.inner.list().await
    }
}
