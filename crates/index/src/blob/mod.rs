//! Blob store abstraction.
//!
//! The durable home of every bundle and every original asset. The contract is
//! small: look up by name, download, upload, overwrite or delete by id.
//! There are no transactions and no locks; absence from `find` is a normal
//! `None`, never an error.

pub mod memory;
pub mod sqlite;

pub use memory::MemoryBlobStore;
pub use sqlite::SqliteBlobStore;

use recall_core::AppResult;
use serde::{Deserialize, Serialize};

/// Opaque blob identifier assigned by the store.
pub type BlobId = String;

/// Listing entry for a stored blob.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlobEntry {
    pub id: BlobId,
    pub name: String,
    pub size_bytes: u64,
}

/// Trait for blob store backends.
#[async_trait::async_trait]
pub trait BlobStore: Send + Sync {
    /// Find the blob with this name, newest first if names repeat.
    async fn find(&self, name: &str) -> AppResult<Option<BlobId>>;

    /// Download a blob's bytes. Unknown ids are `AppError::NotFound`.
    async fn download(&self, id: &str) -> AppResult<Vec<u8>>;

    /// Store a new blob and return its id.
    async fn upload(&self, name: &str, bytes: &[u8]) -> AppResult<BlobId>;

    /// Overwrite an existing blob in place. Unknown ids are `AppError::NotFound`.
    async fn update(&self, id: &str, bytes: &[u8]) -> AppResult<()>;

    /// Remove a blob. Unknown ids are `AppError::NotFound`.
    async fn delete(&self, id: &str) -> AppResult<()>;

    /// List every blob in the store's folder.
    async fn list(&self) -> AppResult<Vec<BlobEntry>>;
}
