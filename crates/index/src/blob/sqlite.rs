//! SQLite-backed blob store.
//!
//! A durable local stand-in for the remote drive: blobs live in one table,
//! scoped by folder, addressed by UUID.

use super::{BlobEntry, BlobId, BlobStore};
use chrono::Utc;
use recall_core::{AppError, AppResult};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

/// Blob store persisted in a SQLite database file.
pub struct SqliteBlobStore {
    conn: Mutex<Connection>,
    folder: String,
}

impl SqliteBlobStore {
    /// Open (or create) the database at `db_path`, scoped to `folder`.
    pub fn open(db_path: &Path, folder: impl Into<String>) -> AppResult<Self> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                AppError::Storage(format!("Failed to create blob store directory: {}", e))
            })?;
        }

        let conn = Connection::open(db_path)
            .map_err(|e| AppError::Storage(format!("Failed to open blob store: {}", e)))?;

        Self::with_connection(conn, folder)
    }

    /// In-memory database, mostly for tests.
    pub fn open_in_memory(folder: impl Into<String>) -> AppResult<Self> {
        let conn = Connection::open_in_memory()
            .map_err(|e| AppError::Storage(format!("Failed to open blob store: {}", e)))?;
        Self::with_connection(conn, folder)
    }

    fn with_connection(conn: Connection, folder: impl Into<String>) -> AppResult<Self> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS blobs (
                id TEXT PRIMARY KEY,
                folder TEXT NOT NULL,
                name TEXT NOT NULL,
                data BLOB NOT NULL,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_blobs_folder_name ON blobs(folder, name);
            "#,
        )
        .map_err(|e| AppError::Storage(format!("Failed to create blob table: {}", e)))?;

        let folder = folder.into();
        tracing::debug!("Opened SQLite blob store (folder '{}')", folder);

        Ok(Self {
            conn: Mutex::new(conn),
            folder,
        })
    }

    pub fn folder(&self) -> &str {
        &self.folder
    }

    fn conn(&self) -> AppResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| AppError::Storage("blob store connection lock poisoned".to_string()))
    }
}

#[async_trait::async_trait]
impl BlobStore for SqliteBlobStore {
    async fn find(&self, name: &str) -> AppResult<Option<BlobId>> {
        let conn = self.conn()?;
        conn.query_row(
            "SELECT id FROM blobs WHERE folder = ?1 AND name = ?2
             ORDER BY created_at DESC, rowid DESC LIMIT 1",
            params![self.folder, name],
            |row| row.get::<_, String>(0),
        )
        .optional()
        .map_err(|e| AppError::Storage(format!("Failed to look up blob '{}': {}", name, e)))
    }

    async fn download(&self, id: &str) -> AppResult<Vec<u8>> {
        let conn = self.conn()?;
        conn.query_row(
            "SELECT data FROM blobs WHERE folder = ?1 AND id = ?2",
            params![self.folder, id],
            |row| row.get::<_, Vec<u8>>(0),
        )
        .optional()
        .map_err(|e| AppError::Storage(format!("Failed to download blob '{}': {}", id, e)))?
        .ok_or_else(|| AppError::NotFound(format!("blob '{}'", id)))
    }

    async fn upload(&self, name: &str, bytes: &[u8]) -> AppResult<BlobId> {
        let id = uuid::Uuid::new_v4().to_string();
        let now = Utc::now().to_rfc3339();

        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO blobs (id, folder, name, data, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?5)",
            params![id, self.folder, name, bytes, now],
        )
        .map_err(|e| AppError::Storage(format!("Failed to upload blob '{}': {}", name, e)))?;

        tracing::debug!("Uploaded blob '{}' ({} bytes) as {}", name, bytes.len(), id);
        Ok(id)
    }

    async fn update(&self, id: &str, bytes: &[u8]) -> AppResult<()> {
        let conn = self.conn()?;
        let changed = conn
            .execute(
                "UPDATE blobs SET data = ?1, updated_at = ?2 WHERE folder = ?3 AND id = ?4",
                params![bytes, Utc::now().to_rfc3339(), self.folder, id],
            )
            .map_err(|e| AppError::Storage(format!("Failed to update blob '{}': {}", id, e)))?;

        if changed == 0 {
            return Err(AppError::NotFound(format!("blob '{}'", id)));
        }

        tracing::debug!("Updated blob {} ({} bytes)", id, bytes.len());
        Ok(())
    }

    async fn delete(&self, id: &str) -> AppResult<()> {
        let conn = self.conn()?;
        let changed = conn
            .execute(
                "DELETE FROM blobs WHERE folder = ?1 AND id = ?2",
                params![self.folder, id],
            )
            .map_err(|e| AppError::Storage(format!("Failed to delete blob '{}': {}", id, e)))?;

        if changed == 0 {
            return Err(AppError::NotFound(format!("blob '{}'", id)));
        }

        tracing::debug!("Deleted blob {}", id);
        Ok(())
    }

    async fn list(&self) -> AppResult<Vec<BlobEntry>> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare(
                "SELECT id, name, length(data) FROM blobs WHERE folder = ?1
                 ORDER BY created_at, rowid",
            )
            .map_err(|e| AppError::Storage(format!("Failed to prepare listing: {}", e)))?;

        let rows = stmt
            .query_map(params![self.folder], |row| {
                Ok(BlobEntry {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    size_bytes: row.get::<_, i64>(2)? as u64,
                })
            })
            .map_err(|e| AppError::Storage(format!("Failed to list blobs: {}", e)))?;

        rows.collect::<Result<Vec<_>, _>>()
            .map_err(|e| AppError::Storage(format!("Failed to read blob listing: {}", e)))
    }
}
