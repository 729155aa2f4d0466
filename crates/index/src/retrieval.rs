//! Retrieval facade: the two collections, ingestion and routed queries.

use crate::blob::{BlobStore, MemoryBlobStore, SqliteBlobStore};
use crate::classifier::{IntentClassifier, LlmClassifier, RuleClassifier};
use crate::config::RetrievalConfig;
use crate::embeddings::{create_backend, EmbeddingBackend};
use crate::router::{QueryRouter, RouterState};
use crate::slot::SlotCache;
use crate::store::{Asset, ItemContent, SyncIndexStore};
use crate::summarizer::{LlmSummarizer, Summarizer, TruncatingSummarizer};
use crate::types::{CollectionKind, Metadata, Scalar, SearchResult};
use chrono::Utc;
use recall_core::{AppConfig, AppError, AppResult};
use recall_llm::{create_client, LlmClient};
use serde::Serialize;
use std::sync::Arc;

/// Answer to one query. Failures surface as an empty result set with `error` set.
#[derive(Debug, Clone, Serialize)]
pub struct QueryResponse {
    pub collection: CollectionKind,

    /// `NEW_SEARCH` or `SELECT(i)`; absent when the query failed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub intent: Option<String>,

    pub state: RouterState,
    pub results: Vec<SearchResult>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Per-collection sizes plus blob store usage.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct RetrievalStats {
    pub documents: usize,
    pub images: usize,
    pub blob_count: usize,
    pub blob_bytes: u64,
}

/// Ingestion and query entry point over the documents and images collections.
pub struct Retrieval {
    blobs: Arc<dyn BlobStore>,
    documents: SyncIndexStore,
    images: SyncIndexStore,
    summarizer: Arc<dyn Summarizer>,
    router: QueryRouter,
    slots: Arc<SlotCache>,
    default_top_k: usize,
}

impl Retrieval {
    /// Assemble from explicit collaborators.
    pub fn new(
        config: &RetrievalConfig,
        blobs: Arc<dyn BlobStore>,
        backend: Arc<dyn EmbeddingBackend>,
        summarizer: Arc<dyn Summarizer>,
        classifier: Arc<dyn IntentClassifier>,
    ) -> Self {
        let slots = Arc::new(SlotCache::new(config.slot_ttl_secs));

        Self {
            documents: SyncIndexStore::new(
                &config.documents_collection,
                CollectionKind::Documents,
                blobs.clone(),
                backend.clone(),
            ),
            images: SyncIndexStore::new(
                &config.images_collection,
                CollectionKind::Images,
                blobs.clone(),
                backend,
            ),
            blobs,
            summarizer,
            router: QueryRouter::new(classifier, slots.clone()),
            slots,
            default_top_k: config.default_top_k,
        }
    }

    /// Build every collaborator from configuration.
    ///
    /// The LLM client is only created when the classifier or summarizer
    /// needs one.
    pub fn from_config(app: &AppConfig, config: &RetrievalConfig) -> AppResult<Self> {
        config.validate()?;

        let blobs: Arc<dyn BlobStore> = match config.blob_store.kind.as_str() {
            "memory" => Arc::new(MemoryBlobStore::new()),
            _ => Arc::new(SqliteBlobStore::open(
                &config.blob_path(&app.workspace),
                &config.blob_store.folder,
            )?),
        };

        let backend = create_backend(&config.embedding)?;

        let llm: Option<Arc<dyn LlmClient>> =
            if config.classifier == "llm" || config.summarizer.kind == "llm" {
                app.validate()?;
                let endpoint = app.provider_endpoint();
                Some(create_client(&app.provider, endpoint.as_deref())?)
            } else {
                None
            };

        let classifier: Arc<dyn IntentClassifier> = match &llm {
            Some(client) if config.classifier == "llm" => {
                Arc::new(LlmClassifier::new(client.clone(), &app.model))
            }
            _ => Arc::new(RuleClassifier::new()),
        };

        let summarizer: Arc<dyn Summarizer> = match &llm {
            Some(client) if config.summarizer.kind == "llm" => Arc::new(LlmSummarizer::new(
                client.clone(),
                &app.model,
                config.summarizer.max_chars,
            )),
            _ => Arc::new(TruncatingSummarizer::new(config.summarizer.max_chars)),
        };

        tracing::info!(
            "Retrieval ready: blob store '{}' (folder '{}'), embeddings {}:{}, classifier {}, summarizer {}",
            config.blob_store.kind,
            config.blob_store.folder,
            backend.backend_name(),
            backend.model_name(),
            config.classifier,
            config.summarizer.kind
        );

        Ok(Self::new(config, blobs, backend, summarizer, classifier))
    }

    pub fn store(&self, collection: CollectionKind) -> &SyncIndexStore {
        match collection {
            CollectionKind::Documents => &self.documents,
            CollectionKind::Images => &self.images,
        }
    }

    pub fn slots(&self) -> &SlotCache {
        &self.slots
    }

    pub fn default_top_k(&self) -> usize {
        self.default_top_k
    }

    /// Store an asset and index it; returns the asset's external ref.
    ///
    /// Documents are read as UTF-8 text and summarized before embedding;
    /// images are embedded from their bytes. `name` and `ingested_at` are
    /// added to the metadata unless the caller set them.
    pub async fn ingest(
        &self,
        collection: CollectionKind,
        content: &[u8],
        name: &str,
        mut metadata: Metadata,
    ) -> AppResult<String> {
        metadata
            .entry("name".to_string())
            .or_insert_with(|| Scalar::from(name));
        metadata
            .entry("ingested_at".to_string())
            .or_insert_with(|| Scalar::from(Utc::now().to_rfc3339()));

        let asset = Asset {
            name,
            bytes: content,
        };
        let store = self.store(collection);

        let external_ref = match collection {
            CollectionKind::Documents => {
                let text = String::from_utf8_lossy(content);
                if text.trim().is_empty() {
                    return Err(AppError::Other(format!(
                        "Document '{}' has no text to index",
                        name
                    )));
                }
                let summary = self.summarizer.summarize(&text).await?;
                store.add(ItemContent::Text(&summary), asset, metadata).await?
            }
            CollectionKind::Images => store.add(ItemContent::Image(content), asset, metadata).await?,
        };

        tracing::info!(
            "Ingested '{}' into {} as {}",
            name,
            store.collection_id(),
            external_ref
        );

        Ok(external_ref)
    }

    /// Route a query for `session` against one collection.
    ///
    /// Never fails: errors are logged and answered with an empty result set.
    pub async fn query(
        &self,
        session: &str,
        collection: CollectionKind,
        text: &str,
        k: Option<usize>,
    ) -> QueryResponse {
        let k = k.unwrap_or(self.default_top_k);
        let store = self.store(collection);

        match self.router.route(session, text, k, store).await {
            Ok(outcome) => QueryResponse {
                collection,
                intent: Some(outcome.intent.to_string()),
                state: outcome.state,
                results: outcome.results,
                error: None,
            },
            Err(e) => {
                tracing::warn!(
                    "Query '{}' on {} failed, answering with no results: {}",
                    text,
                    store.collection_id(),
                    e
                );
                QueryResponse {
                    collection,
                    intent: None,
                    state: self.router.state(session),
                    results: Vec::new(),
                    error: Some(e.to_string()),
                }
            }
        }
    }

    /// Item counts per collection and blob store usage.
    pub async fn stats(&self) -> AppResult<RetrievalStats> {
        let (documents, images, listing) = futures::try_join!(
            self.documents.len(),
            self.images.len(),
            self.blobs.list()
        )?;

        Ok(RetrievalStats {
            documents,
            images,
            blob_count: listing.len(),
            blob_bytes: listing.iter().map(|b| b.size_bytes).sum(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::support::{FailingEmbedder, KeywordEmbedder};
    use tempfile::TempDir;

    fn retrieval_with(backend: Arc<dyn EmbeddingBackend>) -> Retrieval {
        Retrieval::new(
            &RetrievalConfig::default(),
            Arc::new(MemoryBlobStore::new()),
            backend,
            Arc::new(TruncatingSummarizer::default()),
            Arc::new(RuleClassifier::new()),
        )
    }

    #[tokio::test]
    async fn test_ingest_adds_default_metadata() {
        let retrieval = retrieval_with(Arc::new(KeywordEmbedder::default()));
        let mut metadata = Metadata::new();
        metadata.insert("pages".to_string(), Scalar::Int(4));

        let external_ref = retrieval
            .ingest(
                CollectionKind::Documents,
                b"invoice for apple crates",
                "invoice.pdf",
                metadata,
            )
            .await
            .unwrap();

        let bundle = retrieval.store(CollectionKind::Documents).load().await.unwrap();
        let record = &bundle.items[&0];
        assert_eq!(record.external_ref, external_ref);
        assert_eq!(record.metadata["name"], Scalar::from("invoice.pdf"));
        assert_eq!(record.metadata["pages"], Scalar::Int(4));
        assert!(record.metadata.contains_key("ingested_at"));
        assert_eq!(record.content, "invoice for apple crates");
    }

    #[tokio::test]
    async fn test_ingest_keeps_caller_name() {
        let retrieval = retrieval_with(Arc::new(KeywordEmbedder::default()));
        let mut metadata = Metadata::new();
        metadata.insert("name".to_string(), Scalar::from("Q3 report"));

        retrieval
            .ingest(CollectionKind::Images, b"sunset", "IMG_0042.png", metadata)
            .await
            .unwrap();

        let bundle = retrieval.store(CollectionKind::Images).load().await.unwrap();
        assert_eq!(bundle.items[&0].metadata["name"], Scalar::from("Q3 report"));
        assert_eq!(bundle.items[&0].content, "IMG_0042.png");
    }

    #[tokio::test]
    async fn test_ingest_rejects_empty_document() {
        let retrieval = retrieval_with(Arc::new(KeywordEmbedder::default()));
        assert!(retrieval
            .ingest(CollectionKind::Documents, b"  \n", "blank.txt", Metadata::new())
            .await
            .is_err());
        assert_eq!(retrieval.stats().await.unwrap().blob_count, 0);
    }

    #[tokio::test]
    async fn test_query_failure_is_empty_response() {
        let retrieval = retrieval_with(Arc::new(KeywordEmbedder::default()));
        retrieval
            .ingest(CollectionKind::Documents, b"apple", "a.txt", Metadata::new())
            .await
            .unwrap();

        let broken = Retrieval::new(
            &RetrievalConfig::default(),
            retrieval.blobs.clone(),
            Arc::new(FailingEmbedder),
            Arc::new(TruncatingSummarizer::default()),
            Arc::new(RuleClassifier::new()),
        );

        let response = broken
            .query("s", CollectionKind::Documents, "apple", None)
            .await;
        assert!(response.results.is_empty());
        assert!(response.intent.is_none());
        assert!(response.error.is_some());
        assert_eq!(response.state, RouterState::Idle);
    }

    #[tokio::test]
    async fn test_stats_counts_collections_and_blobs() {
        let retrieval = retrieval_with(Arc::new(KeywordEmbedder::default()));
        retrieval
            .ingest(CollectionKind::Documents, b"apple", "a.txt", Metadata::new())
            .await
            .unwrap();
        retrieval
            .ingest(CollectionKind::Images, b"ocean", "o.png", Metadata::new())
            .await
            .unwrap();

        let stats = retrieval.stats().await.unwrap();
        assert_eq!(stats.documents, 1);
        assert_eq!(stats.images, 1);
        // 2 assets, 2 manifests, documents.rix, images.matrix, images.map.json
        assert_eq!(stats.blob_count, 7);
        assert!(stats.blob_bytes > 0);
    }

    #[tokio::test]
    async fn test_from_config_sqlite_persists() {
        let temp = TempDir::new().unwrap();
        let app = AppConfig {
            workspace: temp.path().to_path_buf(),
            ..AppConfig::default()
        };
        let config = RetrievalConfig::default();

        {
            let retrieval = Retrieval::from_config(&app, &config).unwrap();
            retrieval
                .ingest(
                    CollectionKind::Documents,
                    b"Mountain cabin rental contract",
                    "contract.txt",
                    Metadata::new(),
                )
                .await
                .unwrap();
        }

        let reopened = Retrieval::from_config(&app, &config).unwrap();
        assert_eq!(reopened.stats().await.unwrap().documents, 1);
        assert!(temp.path().join(".recall").join("blobs.sqlite").exists());
    }

    #[test]
    fn test_from_config_rejects_invalid() {
        let mut config = RetrievalConfig::default();
        config.classifier = "oracle".to_string();
        assert!(Retrieval::from_config(&AppConfig::default(), &config).is_err());
    }
}
