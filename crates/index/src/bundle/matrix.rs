//! Matrix + map encoding used by the images collection.
//!
//! `<collection>.matrix` holds the row-major vector matrix:
//!
//! ```text
//! "RMX1" | rows: u64 | cols: u32 | rows * cols f32
//! ```
//!
//! `<collection>.map.json` maps each ordinal to its item record. Decoding a
//! matrix and a map from different generations fails on the row/entry count.

use super::{declared_len, push_f32s, BundleCodec, BundlePart, ByteReader};
use crate::types::{EmbeddingVector, IndexBundle, ItemRecord, Ordinal};
use recall_core::{AppError, AppResult};
use std::collections::BTreeMap;

const MAGIC: &[u8; 4] = b"RMX1";

/// Codec writing a vector matrix blob and a JSON map blob.
#[derive(Debug, Clone, Copy, Default)]
pub struct MatrixCodec;

impl MatrixCodec {
    fn matrix_name(collection_id: &str) -> String {
        format!("{}.matrix", collection_id)
    }

    fn map_name(collection_id: &str) -> String {
        format!("{}.map.json", collection_id)
    }
}

impl BundleCodec for MatrixCodec {
    fn part_names(&self, collection_id: &str) -> Vec<String> {
        vec![
            Self::matrix_name(collection_id),
            Self::map_name(collection_id),
        ]
    }

    fn encode(&self, bundle: &IndexBundle) -> AppResult<Vec<BundlePart>> {
        bundle.validate()?;

        let cols = bundle.dimension().unwrap_or(0);
        let cols = u32::try_from(cols).map_err(|_| {
            AppError::Serialization(format!("dimension {} does not fit the header", cols))
        })?;

        let mut matrix = Vec::with_capacity(16 + bundle.len() * cols as usize * 4);
        matrix.extend_from_slice(MAGIC);
        matrix.extend_from_slice(&(bundle.len() as u64).to_le_bytes());
        matrix.extend_from_slice(&cols.to_le_bytes());
        for vector in &bundle.vectors {
            push_f32s(&mut matrix, vector.as_slice());
        }

        let map = serde_json::to_vec_pretty(&bundle.items)?;

        Ok(vec![
            BundlePart {
                name: Self::matrix_name(&bundle.collection_id),
                bytes: matrix,
            },
            BundlePart {
                name: Self::map_name(&bundle.collection_id),
                bytes: map,
            },
        ])
    }

    fn decode(&self, collection_id: &str, parts: &[Vec<u8>]) -> AppResult<IndexBundle> {
        let [matrix, map] = parts else {
            return Err(AppError::CorruptBundle(format!(
                "matrix bundle for '{}' expects 2 parts, got {}",
                collection_id,
                parts.len()
            )));
        };

        let label = Self::matrix_name(collection_id);
        let mut reader = ByteReader::new(matrix, &label);
        reader.expect_magic(MAGIC)?;
        let rows = declared_len(reader.u64()?, &label)?;
        let cols = reader.u32()? as usize;

        let vectors: Vec<EmbeddingVector> = reader
            .f32_rows(rows, cols)?
            .into_iter()
            .map(EmbeddingVector::from_normalized)
            .collect();
        reader.finish()?;

        let items: BTreeMap<Ordinal, ItemRecord> = serde_json::from_slice(map).map_err(|e| {
            AppError::CorruptBundle(format!("{}: {}", Self::map_name(collection_id), e))
        })?;

        if items.len() != vectors.len() {
            return Err(AppError::CorruptBundle(format!(
                "'{}' matrix has {} rows but its map has {} entries",
                collection_id,
                vectors.len(),
                items.len()
            )));
        }

        let bundle = IndexBundle {
            collection_id: collection_id.to_string(),
            vectors,
            items,
        };
        bundle.validate()?;

        Ok(bundle)
    }
}
