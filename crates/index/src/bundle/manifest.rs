//! Generation manifest.
//!
//! Bundle parts are uploaded under generation-tagged names and become live
//! only when the collection's manifest blob is switched to point at them.
//! The manifest is a single blob, so a reader sees either the previous
//! generation or the new one, never a mix.
//!
//! ```text
//! index/<collection>.manifest.json
//! index/<collection>/<generation>/<part name>
//! ```

use crate::blob::BlobId;
use recall_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};

/// Name prefix reserved for manifests and bundle parts.
pub const INDEX_PREFIX: &str = "index/";

/// One bundle part of a generation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestEntry {
    /// Codec part name (`documents.rix`, `images.matrix`, ...)
    pub name: String,
    pub id: BlobId,
}

/// Pointer from a collection to its live bundle generation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BundleManifest {
    pub collection_id: String,
    pub generation: u64,
    pub parts: Vec<ManifestEntry>,
}

impl BundleManifest {
    /// Blob name of a collection's manifest.
    pub fn blob_name(collection_id: &str) -> String {
        format!("{}{}.manifest.json", INDEX_PREFIX, collection_id)
    }

    /// Blob name of one part within a generation.
    pub fn part_blob_name(collection_id: &str, generation: u64, part_name: &str) -> String {
        format!("{}{}/{}/{}", INDEX_PREFIX, collection_id, generation, part_name)
    }

    pub fn part_ids(&self) -> Vec<BlobId> {
        self.parts.iter().map(|part| part.id.clone()).collect()
    }

    /// Part ids in the order of `names`. Any difference is corruption.
    pub fn ids_for(&self, names: &[String]) -> AppResult<Vec<BlobId>> {
        let listed: Vec<&str> = self.parts.iter().map(|p| p.name.as_str()).collect();
        if listed != names.iter().map(String::as_str).collect::<Vec<_>>() {
            return Err(AppError::CorruptBundle(format!(
                "manifest for '{}' lists parts {:?}, expected {:?}",
                self.collection_id, listed, names
            )));
        }
        Ok(self.part_ids())
    }

    pub fn to_bytes(&self) -> AppResult<Vec<u8>> {
        Ok(serde_json::to_vec_pretty(self)?)
    }

    pub fn from_bytes(collection_id: &str, bytes: &[u8]) -> AppResult<Self> {
        let manifest: Self = serde_json::from_slice(bytes).map_err(|e| {
            AppError::CorruptBundle(format!("manifest for '{}': {}", collection_id, e))
        })?;

        if manifest.collection_id != collection_id {
            return Err(AppError::CorruptBundle(format!(
                "manifest for '{}' belongs to '{}'",
                collection_id, manifest.collection_id
            )));
        }

        Ok(manifest)
    }
}
