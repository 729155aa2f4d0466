//! In-process blob store.

use super::{BlobEntry, BlobId, BlobStore};
use recall_core::{AppError, AppResult};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};

#[derive(Debug, Clone)]
struct StoredBlob {
    name: String,
    data: Vec<u8>,
}

/// Blob store kept entirely in memory.
///
/// Ids are sequential (`mem-1`, `mem-2`, ...). Write calls are counted so
/// callers can assert how many writes an operation performed.
#[derive(Debug, Default)]
pub struct MemoryBlobStore {
    blobs: Mutex<BTreeMap<u64, StoredBlob>>,
    next_id: Mutex<u64>,
    writes: AtomicUsize,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of `upload`, `update` and `delete` calls served so far.
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    fn lock(&self) -> AppResult<MutexGuard<'_, BTreeMap<u64, StoredBlob>>> {
        self.blobs
            .lock()
            .map_err(|_| AppError::Storage("memory blob store lock poisoned".to_string()))
    }

    fn parse_id(id: &str) -> AppResult<u64> {
        id.strip_prefix("mem-")
            .and_then(|n| n.parse().ok())
            .ok_or_else(|| AppError::NotFound(format!("blob '{}'", id)))
    }
}

#[async_trait::async_trait]
impl BlobStore for MemoryBlobStore {
    async fn find(&self, name: &str) -> AppResult<Option<BlobId>> {
        let blobs = self.lock()?;
        Ok(blobs
            .iter()
            .rev()
            .find(|(_, blob)| blob.name == name)
            .map(|(id, _)| format!("mem-{}", id)))
    }

    async fn download(&self, id: &str) -> AppResult<Vec<u8>> {
        let key = Self::parse_id(id)?;
        let blobs = self.lock()?;
        blobs
            .get(&key)
            .map(|blob| blob.data.clone())
            .ok_or_else(|| AppError::NotFound(format!("blob '{}'", id)))
    }

    async fn upload(&self, name: &str, bytes: &[u8]) -> AppResult<BlobId> {
        let key = {
            let mut next = self
                .next_id
                .lock()
                .map_err(|_| AppError::Storage("memory blob id lock poisoned".to_string()))?;
            *next += 1;
            *next
        };

        self.lock()?.insert(
            key,
            StoredBlob {
                name: name.to_string(),
                data: bytes.to_vec(),
            },
        );
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(format!("mem-{}", key))
    }

    async fn update(&self, id: &str, bytes: &[u8]) -> AppResult<()> {
        let key = Self::parse_id(id)?;
        let mut blobs = self.lock()?;
        let blob = blobs
            .get_mut(&key)
            .ok_or_else(|| AppError::NotFound(format!("blob '{}'", id)))?;
        blob.data = bytes.to_vec();
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn delete(&self, id: &str) -> AppResult<()> {
        let key = Self::parse_id(id)?;
        self.lock()?
            .remove(&key)
            .ok_or_else(|| AppError::NotFound(format!("blob '{}'", id)))?;
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn list(&self) -> AppResult<Vec<BlobEntry>> {
        let blobs = self.lock()?;
        Ok(blobs
            .iter()
            .map(|(id, blob)| BlobEntry {
                id: format!("mem-{}", id),
                name: blob.name.clone(),
                size_bytes: blob.data.len() as u64,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_find_absent_is_none() {
        let store = MemoryBlobStore::new();
        assert_eq!(store.find("documents.rix").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_upload_find_download() {
        let store = MemoryBlobStore::new();
        let id = store.upload("report.pdf", b"%PDF-1.7").await.unwrap();

        assert_eq!(store.find("report.pdf").await.unwrap(), Some(id.clone()));
        assert_eq!(store.download(&id).await.unwrap(), b"%PDF-1.7");
        assert_eq!(store.write_count(), 1);
    }

    #[tokio::test]
    async fn test_update_overwrites() {
        let store = MemoryBlobStore::new();
        let id = store.upload("images.matrix", b"v1").await.unwrap();
        store.update(&id, b"v2").await.unwrap();

        assert_eq!(store.download(&id).await.unwrap(), b"v2");
        assert_eq!(store.list().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_unknown_id_not_found() {
        let store = MemoryBlobStore::new();
        assert!(matches!(
            store.download("mem-42").await,
            Err(AppError::NotFound(_))
        ));
        assert!(matches!(
            store.update("garbage", b"x").await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_delete_removes_blob() {
        let store = MemoryBlobStore::new();
        let id = store.upload("index/images/0/images.matrix", b"RMX1").await.unwrap();
        store.delete(&id).await.unwrap();

        assert_eq!(store.find("index/images/0/images.matrix").await.unwrap(), None);
        assert!(matches!(store.delete(&id).await, Err(AppError::NotFound(_))));
        assert_eq!(store.write_count(), 2);
    }

    #[tokio::test]
    async fn test_find_prefers_newest_duplicate() {
        let store = MemoryBlobStore::new();
        store.upload("cover.png", b"old").await.unwrap();
        let newer = store.upload("cover.png", b"new").await.unwrap();
        assert_eq!(store.find("cover.png").await.unwrap(), Some(newer));
    }
}
