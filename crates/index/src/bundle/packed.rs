//! Packed single-file encoding used by the documents collection.
//!
//! Layout (little-endian):
//!
//! ```text
//! "RIX1" | dim: u32 | count: u64 | count * dim f32 | json_len: u64 | json items
//! ```

use super::{declared_len, push_f32s, BundleCodec, BundlePart, ByteReader};
use crate::types::{EmbeddingVector, IndexBundle, ItemRecord};
use recall_core::{AppError, AppResult};
use std::collections::BTreeMap;

const MAGIC: &[u8; 4] = b"RIX1";

/// Codec writing vectors and item records into one `<collection>.rix` blob.
#[derive(Debug, Clone, Copy, Default)]
pub struct PackedCodec;

impl BundleCodec for PackedCodec {
    fn part_names(&self, collection_id: &str) -> Vec<String> {
        vec![format!("{}.rix", collection_id)]
    }

    fn encode(&self, bundle: &IndexBundle) -> AppResult<Vec<BundlePart>> {
        bundle.validate()?;

        let dimension = bundle.dimension().unwrap_or(0);
        let dimension = u32::try_from(dimension).map_err(|_| {
            AppError::Serialization(format!("dimension {} does not fit the header", dimension))
        })?;

        let records: Vec<&ItemRecord> = bundle.items.values().collect();
        let json = serde_json::to_vec(&records)?;

        let mut out = Vec::with_capacity(
            24 + bundle.len() * dimension as usize * 4 + json.len(),
        );
        out.extend_from_slice(MAGIC);
        out.extend_from_slice(&dimension.to_le_bytes());
        out.extend_from_slice(&(bundle.len() as u64).to_le_bytes());
        for vector in &bundle.vectors {
            push_f32s(&mut out, vector.as_slice());
        }
        out.extend_from_slice(&(json.len() as u64).to_le_bytes());
        out.extend_from_slice(&json);

        Ok(vec![BundlePart {
            name: format!("{}.rix", bundle.collection_id),
            bytes: out,
        }])
    }

    fn decode(&self, collection_id: &str, parts: &[Vec<u8>]) -> AppResult<IndexBundle> {
        let [bytes] = parts else {
            return Err(AppError::CorruptBundle(format!(
                "packed bundle for '{}' expects 1 part, got {}",
                collection_id,
                parts.len()
            )));
        };

        let label = format!("{}.rix", collection_id);
        let mut reader = ByteReader::new(bytes, &label);
        reader.expect_magic(MAGIC)?;

        let dimension = reader.u32()? as usize;
        let count = declared_len(reader.u64()?, &label)?;

        let vectors: Vec<EmbeddingVector> = reader
            .f32_rows(count, dimension)?
            .into_iter()
            .map(EmbeddingVector::from_normalized)
            .collect();

        let json_len = declared_len(reader.u64()?, &label)?;
        let records: Vec<ItemRecord> = serde_json::from_slice(reader.take(json_len)?)
            .map_err(|e| AppError::CorruptBundle(format!("{} item records: {}", label, e)))?;
        reader.finish()?;

        if records.len() != vectors.len() {
            return Err(AppError::CorruptBundle(format!(
                "{} holds {} vectors but {} item records",
                label,
                vectors.len(),
                records.len()
            )));
        }

        let items: BTreeMap<_, _> = records.into_iter().map(|r| (r.ordinal, r)).collect();
        let bundle = IndexBundle {
            collection_id: collection_id.to_string(),
            vectors,
            items,
        };
        bundle.validate()?;

        Ok(bundle)
    }
}
