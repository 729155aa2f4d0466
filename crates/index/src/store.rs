//! Synchronizing index store.
//!
//! One store per collection. Every mutation is a full read-merge-write
//! against the blob store: fetch the persisted bundle, merge the new item,
//! encode, upload a new generation and switch the manifest to it. Mutations
//! are serialized in-process by a per-store lock; separate processes writing
//! the same collection are last-write-wins.
//!
//! Assets are stored under `assets/`, bundle blobs under `index/`, so no
//! asset name can shadow a bundle part.

use crate::blob::{BlobId, BlobStore};
use crate::bundle::{self, BundleCodec, BundleManifest, ManifestEntry};
use crate::embeddings::EmbeddingBackend;
use crate::types::{
    CollectionKind, EmbeddingVector, IndexBundle, IndexedItem, Metadata, SearchResult,
};
use recall_core::{AppError, AppResult};
use std::sync::Arc;
use tokio::sync::Mutex;

/// Name prefix for uploaded original assets.
pub const ASSET_PREFIX: &str = "assets/";

/// Content handed to the embedding backend for a new item.
#[derive(Debug, Clone, Copy)]
pub enum ItemContent<'a> {
    /// Text to embed and keep as the item's content (a document summary)
    Text(&'a str),
    /// Raw image bytes; the asset name becomes the item's content
    Image(&'a [u8]),
}

/// The original asset stored alongside the vector.
#[derive(Debug, Clone, Copy)]
pub struct Asset<'a> {
    pub name: &'a str,
    pub bytes: &'a [u8],
}

/// Anything the query router can run a fresh similarity search against.
#[async_trait::async_trait]
pub trait Searchable: Send + Sync {
    async fn search(&self, query: &str, k: usize) -> AppResult<Vec<SearchResult>>;
}

/// The live manifest and the blob it is stored in.
struct Current {
    blob_id: BlobId,
    manifest: BundleManifest,
}

/// Bundle read back from the blob store along with the manifest it came from.
struct Loaded {
    bundle: IndexBundle,
    current: Option<Current>,
}

/// Remote-backed, incrementally updated vector index for one collection.
pub struct SyncIndexStore {
    collection_id: String,
    kind: CollectionKind,
    blobs: Arc<dyn BlobStore>,
    backend: Arc<dyn EmbeddingBackend>,
    codec: Box<dyn BundleCodec>,
    write_lock: Mutex<()>,
}

impl SyncIndexStore {
    /// Create a store using the codec its collection kind persists with.
    pub fn new(
        collection_id: impl Into<String>,
        kind: CollectionKind,
        blobs: Arc<dyn BlobStore>,
        backend: Arc<dyn EmbeddingBackend>,
    ) -> Self {
        Self::with_codec(collection_id, kind, blobs, backend, bundle::codec_for(kind))
    }

    pub fn with_codec(
        collection_id: impl Into<String>,
        kind: CollectionKind,
        blobs: Arc<dyn BlobStore>,
        backend: Arc<dyn EmbeddingBackend>,
        codec: Box<dyn BundleCodec>,
    ) -> Self {
        Self {
            collection_id: collection_id.into(),
            kind,
            blobs,
            backend,
            codec,
            write_lock: Mutex::new(()),
        }
    }

    pub fn collection_id(&self) -> &str {
        &self.collection_id
    }

    pub fn kind(&self) -> CollectionKind {
        self.kind
    }

    /// Fetch the latest persisted bundle, or an empty one if none exists yet.
    pub async fn load(&self) -> AppResult<IndexBundle> {
        Ok(self.load_current().await?.bundle)
    }

    async fn load_current(&self) -> AppResult<Loaded> {
        let manifest_name = BundleManifest::blob_name(&self.collection_id);
        let Some(blob_id) = self.blobs.find(&manifest_name).await? else {
            tracing::debug!(
                "No bundle for '{}' yet, starting empty",
                self.collection_id
            );
            return Ok(Loaded {
                bundle: IndexBundle::empty(&self.collection_id),
                current: None,
            });
        };

        let manifest =
            BundleManifest::from_bytes(&self.collection_id, &self.blobs.download(&blob_id).await?)?;
        let ids = manifest.ids_for(&self.codec.part_names(&self.collection_id))?;

        let mut parts = Vec::with_capacity(ids.len());
        for id in &ids {
            let bytes = self.blobs.download(id).await.map_err(|e| match e {
                AppError::NotFound(_) => AppError::CorruptBundle(format!(
                    "manifest for '{}' points at missing part {}",
                    self.collection_id, id
                )),
                other => other,
            })?;
            parts.push(bytes);
        }

        let bundle = self.codec.decode(&self.collection_id, &parts)?;
        tracing::debug!(
            "Loaded '{}' bundle generation {}: {} item(s), {} byte(s)",
            self.collection_id,
            manifest.generation,
            bundle.len(),
            parts.iter().map(Vec::len).sum::<usize>()
        );

        Ok(Loaded {
            bundle,
            current: Some(Current { blob_id, manifest }),
        })
    }

    /// Embed, store the asset, merge and persist the whole bundle.
    ///
    /// Returns the external ref of the uploaded asset. A corrupt prior bundle
    /// or an embedding failure aborts before anything is written. A failed
    /// upload leaves the previous generation live and removes what this call
    /// uploaded.
    pub async fn add(
        &self,
        content: ItemContent<'_>,
        asset: Asset<'_>,
        metadata: Metadata,
    ) -> AppResult<String> {
        let _guard = self.write_lock.lock().await;

        let Loaded { bundle, current } = self.load_current().await?;
        let ordinal = bundle.len();

        let (vector, text) = match content {
            ItemContent::Text(text) => (self.backend.embed_text(text).await?, text.to_string()),
            ItemContent::Image(bytes) => {
                (self.backend.embed_image(bytes).await?, asset.name.to_string())
            }
        };
        self.check_dimension(&bundle, &vector)?;

        let external_ref = self
            .blobs
            .upload(&format!("{}{}", ASSET_PREFIX, asset.name), asset.bytes)
            .await?;
        let mut staged = vec![external_ref.clone()];

        let incoming = IndexBundle::from_items(
            &self.collection_id,
            vec![IndexedItem {
                ordinal: 0,
                vector,
                external_ref: external_ref.clone(),
                content: text,
                metadata,
            }],
        );

        let total = match self
            .commit(bundle, incoming, current.as_ref(), &mut staged)
            .await
        {
            Ok(total) => total,
            Err(e) => {
                tracing::warn!(
                    "Persisting '{}' failed, keeping the previous bundle: {}",
                    self.collection_id,
                    e
                );
                self.discard(&staged).await;
                return Err(e);
            }
        };

        if let Some(previous) = current {
            self.discard(&previous.manifest.part_ids()).await;
        }

        tracing::info!(
            "Persisted '{}' bundle with item {} ({} total)",
            self.collection_id,
            ordinal,
            total
        );

        Ok(external_ref)
    }

    /// Merge, upload the next generation's parts, then switch the manifest.
    ///
    /// Every blob uploaded here is pushed onto `staged` first so the caller
    /// can remove them if a later step fails.
    async fn commit(
        &self,
        bundle: IndexBundle,
        incoming: IndexBundle,
        current: Option<&Current>,
        staged: &mut Vec<BlobId>,
    ) -> AppResult<usize> {
        let merged = bundle::merge(bundle, incoming)?;
        let parts = self.codec.encode(&merged)?;
        let generation = current.map_or(0, |c| c.manifest.generation + 1);

        let mut entries = Vec::with_capacity(parts.len());
        for part in &parts {
            let name = BundleManifest::part_blob_name(&self.collection_id, generation, &part.name);
            let id = self.blobs.upload(&name, &part.bytes).await?;
            staged.push(id.clone());
            entries.push(ManifestEntry {
                name: part.name.clone(),
                id,
            });
        }

        let manifest = BundleManifest {
            collection_id: self.collection_id.clone(),
            generation,
            parts: entries,
        };
        let bytes = manifest.to_bytes()?;

        match current {
            Some(current) => self.blobs.update(&current.blob_id, &bytes).await?,
            None => {
                let name = BundleManifest::blob_name(&self.collection_id);
                self.blobs.upload(&name, &bytes).await?;
            }
        }

        Ok(merged.len())
    }

    /// Delete blobs nothing points at any more. Failures only leave garbage.
    async fn discard(&self, ids: &[BlobId]) {
        for id in ids {
            if let Err(e) = self.blobs.delete(id).await {
                tracing::warn!("Could not remove unreferenced blob {}: {}", id, e);
            }
        }
    }

    fn check_dimension(&self, bundle: &IndexBundle, vector: &EmbeddingVector) -> AppResult<()> {
        match bundle.dimension() {
            Some(dimension) if dimension != vector.dimension() => Err(AppError::Config(format!(
                "Collection '{}' holds {}-dimensional vectors but backend '{}' produced {}",
                self.collection_id,
                dimension,
                self.backend.backend_name(),
                vector.dimension()
            ))),
            _ => Ok(()),
        }
    }

    /// Top-`k` items by cosine similarity, ties broken by ascending ordinal.
    pub async fn search(&self, query: &str, k: usize) -> AppResult<Vec<SearchResult>> {
        let bundle = self.load().await?;
        if bundle.is_empty() || k == 0 {
            return Ok(Vec::new());
        }

        let query_vector = self.backend.embed_text(query).await?;
        self.check_dimension(&bundle, &query_vector)?;

        let mut scored: Vec<(u64, f32)> = bundle
            .vectors
            .iter()
            .enumerate()
            .map(|(ordinal, vector)| (ordinal as u64, query_vector.dot(vector)))
            .collect();

        scored.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));
        scored.truncate(k);

        let results: Vec<SearchResult> = scored
            .into_iter()
            .filter_map(|(ordinal, score)| {
                bundle.items.get(&ordinal).map(|record| SearchResult {
                    ordinal,
                    score,
                    external_ref: record.external_ref.clone(),
                    content: record.content.clone(),
                    metadata: record.metadata.clone(),
                })
            })
            .collect();

        tracing::debug!(
            "Search on '{}' returned {} of {} item(s) (requested top-{}), scores: {:?}",
            self.collection_id,
            results.len(),
            bundle.len(),
            k,
            results.iter().map(|r| r.score).collect::<Vec<_>>()
        );

        Ok(results)
    }

    /// Download the original asset behind an external ref.
    pub async fn fetch_asset(&self, external_ref: &str) -> AppResult<Vec<u8>> {
        self.blobs.download(external_ref).await
    }

    /// Number of items in the persisted bundle.
    pub async fn len(&self) -> AppResult<usize> {
        Ok(self.load().await?.len())
    }

    pub async fn is_empty(&self) -> AppResult<bool> {
        Ok(self.len().await? == 0)
    }
}

#[async_trait::async_trait]
impl Searchable for SyncIndexStore {
    async fn search(&self, query: &str, k: usize) -> AppResult<Vec<SearchResult>> {
        SyncIndexStore::search(self, query, k).await
    }
}
