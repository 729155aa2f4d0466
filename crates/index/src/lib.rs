//! Remote-backed incremental vector index with conversational retrieval.
//!
//! Two collections (document summaries and images) live as bundles in a blob
//! store. Each ingestion reads the current bundle, merges one item and writes
//! the whole bundle back. Queries go through a router that either starts a
//! new similarity search or picks an item from the session's last results.

pub mod blob;
pub mod bundle;
pub mod classifier;
pub mod config;
pub mod embeddings;
mod prompt;
pub mod retrieval;
pub mod router;
pub mod slot;
pub mod store;
pub mod summarizer;
pub mod types;

#[cfg(test)]
mod tests;

// Re-export commonly used types
pub use blob::{BlobStore, MemoryBlobStore, SqliteBlobStore};
pub use bundle::{merge, BundleCodec, BundleManifest, MatrixCodec, PackedCodec};
pub use classifier::{Intent, IntentClassifier, LlmClassifier, RuleClassifier};
pub use config::{load_config, save_config, RetrievalConfig};
pub use embeddings::{create_backend, EmbeddingBackend, EmbeddingSettings};
pub use retrieval::{QueryResponse, Retrieval, RetrievalStats};
pub use router::{QueryRouter, RouteOutcome, RouterState};
pub use slot::{ResultSlot, SlotCache};
pub use store::{Asset, ItemContent, Searchable, SyncIndexStore};
pub use summarizer::{LlmSummarizer, Summarizer, TruncatingSummarizer};
pub use types::{
    CollectionKind, EmbeddingVector, IndexBundle, IndexedItem, ItemRecord, Metadata, Ordinal,
    Scalar, SearchResult,
};
