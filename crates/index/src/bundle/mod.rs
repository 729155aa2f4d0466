//! Bundle (de)serialization and merging.
//!
//! A bundle is persisted as one or more named blobs. Documents use a single
//! packed file; images use a matrix file plus a JSON map. Both decoders
//! refuse any byte stream that yields `len(vectors) != len(items)`. The
//! manifest decides which generation of parts is live.

pub mod manifest;
pub mod matrix;
pub mod merge;
pub mod packed;

pub use manifest::{BundleManifest, ManifestEntry};
pub use matrix::MatrixCodec;
pub use merge::merge;
pub use packed::PackedCodec;

use crate::types::{CollectionKind, IndexBundle};
use recall_core::{AppError, AppResult};

/// One named blob of an encoded bundle.
#[derive(Debug, Clone, PartialEq)]
pub struct BundlePart {
    pub name: String,
    pub bytes: Vec<u8>,
}

/// Converts a bundle to and from its persisted blobs.
pub trait BundleCodec: Send + Sync + std::fmt::Debug {
    /// Blob names for a collection, in the order `encode` emits them and
    /// `decode` expects them.
    fn part_names(&self, collection_id: &str) -> Vec<String>;

    /// Encode the whole bundle. Nothing is written until every part is ready.
    fn encode(&self, bundle: &IndexBundle) -> AppResult<Vec<BundlePart>>;

    /// Decode parts (ordered like `part_names`) and validate the result.
    fn decode(&self, collection_id: &str, parts: &[Vec<u8>]) -> AppResult<IndexBundle>;
}

/// The codec each collection kind persists with.
pub fn codec_for(kind: CollectionKind) -> Box<dyn BundleCodec> {
    match kind {
        CollectionKind::Documents => Box::new(PackedCodec),
        CollectionKind::Images => Box::new(MatrixCodec),
    }
}

/// Little-endian cursor over an encoded part.
pub(crate) struct ByteReader<'a> {
    bytes: &'a [u8],
    offset: usize,
    label: &'a str,
}

impl<'a> ByteReader<'a> {
    pub(crate) fn new(bytes: &'a [u8], label: &'a str) -> Self {
        Self {
            bytes,
            offset: 0,
            label,
        }
    }

    pub(crate) fn take(&mut self, len: usize) -> AppResult<&'a [u8]> {
        let end = self
            .offset
            .checked_add(len)
            .filter(|end| *end <= self.bytes.len())
            .ok_or_else(|| {
                AppError::CorruptBundle(format!(
                    "{} truncated: wanted {} bytes at offset {}, have {}",
                    self.label,
                    len,
                    self.offset,
                    self.bytes.len()
                ))
            })?;
        let slice = &self.bytes[self.offset..end];
        self.offset = end;
        Ok(slice)
    }

    pub(crate) fn expect_magic(&mut self, magic: &[u8; 4]) -> AppResult<()> {
        if self.take(4)? != magic {
            return Err(AppError::CorruptBundle(format!(
                "{} has an unknown header",
                self.label
            )));
        }
        Ok(())
    }

    pub(crate) fn u32(&mut self) -> AppResult<u32> {
        let raw = self.take(4)?;
        Ok(u32::from_le_bytes([raw[0], raw[1], raw[2], raw[3]]))
    }

    pub(crate) fn u64(&mut self) -> AppResult<u64> {
        let raw = self.take(8)?;
        let mut buf = [0u8; 8];
        buf.copy_from_slice(raw);
        Ok(u64::from_le_bytes(buf))
    }

    pub(crate) fn f32s(&mut self, count: usize) -> AppResult<Vec<f32>> {
        let byte_len = count.checked_mul(4).ok_or_else(|| {
            AppError::CorruptBundle(format!("{} declares an impossible size", self.label))
        })?;
        let raw = self.take(byte_len)?;
        Ok(raw
            .chunks_exact(4)
            .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
            .collect())
    }

    /// Read `rows` vectors of `dim` floats each. The declared shape must fit
    /// in the bytes left before anything is allocated.
    pub(crate) fn f32_rows(&mut self, rows: usize, dim: usize) -> AppResult<Vec<Vec<f32>>> {
        if rows > 0 && dim == 0 {
            return Err(AppError::CorruptBundle(format!(
                "{} declares {} rows of zero width",
                self.label, rows
            )));
        }

        let remaining = self.bytes.len() - self.offset;
        let fits = rows
            .checked_mul(dim)
            .and_then(|n| n.checked_mul(4))
            .is_some_and(|n| n <= remaining);
        if !fits {
            return Err(AppError::CorruptBundle(format!(
                "{} declares {} x {} floats but only {} bytes remain",
                self.label, rows, dim, remaining
            )));
        }

        (0..rows).map(|_| self.f32s(dim)).collect()
    }

    pub(crate) fn finish(self) -> AppResult<()> {
        if self.offset != self.bytes.len() {
            return Err(AppError::CorruptBundle(format!(
                "{} has {} trailing bytes",
                self.label,
                self.bytes.len() - self.offset
            )));
        }
        Ok(())
    }
}

pub(crate) fn push_f32s(out: &mut Vec<u8>, values: &[f32]) {
    for value in values {
        out.extend_from_slice(&value.to_le_bytes());
    }
}

/// Convert a declared count to `usize` or report corruption.
pub(crate) fn declared_len(value: u64, label: &str) -> AppResult<usize> {
    usize::try_from(value)
        .map_err(|_| AppError::CorruptBundle(format!("{} declares {} entries", label, value)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reader_roundtrip() {
        let mut out = Vec::new();
        out.extend_from_slice(b"RIX1");
        out.extend_from_slice(&7u32.to_le_bytes());
        out.extend_from_slice(&3u64.to_le_bytes());
        push_f32s(&mut out, &[0.5, -1.25]);

        let mut reader = ByteReader::new(&out, "test part");
        reader.expect_magic(b"RIX1").unwrap();
        assert_eq!(reader.u32().unwrap(), 7);
        assert_eq!(reader.u64().unwrap(), 3);
        assert_eq!(reader.f32s(2).unwrap(), vec![0.5, -1.25]);
        reader.finish().unwrap();
    }

    #[test]
    fn test_reader_truncated_is_corrupt() {
        let mut reader = ByteReader::new(&[1, 2, 3], "short part");
        assert!(matches!(reader.u32(), Err(AppError::CorruptBundle(_))));
    }

    #[test]
    fn test_reader_trailing_bytes() {
        let mut reader = ByteReader::new(b"RIX1!", "part");
        reader.expect_magic(b"RIX1").unwrap();
        assert!(reader.finish().is_err());
    }

    #[test]
    fn test_zero_width_rows_are_corrupt() {
        let mut reader = ByteReader::new(&[], "matrix part");
        assert!(matches!(
            reader.f32_rows(1 << 40, 0),
            Err(AppError::CorruptBundle(_))
        ));
        assert!(reader.f32_rows(0, 0).unwrap().is_empty());
    }

    #[test]
    fn test_oversized_shape_is_corrupt() {
        let mut out = Vec::new();
        push_f32s(&mut out, &[1.0, 2.0, 3.0, 4.0]);

        let mut reader = ByteReader::new(&out, "packed part");
        assert!(matches!(
            reader.f32_rows(usize::MAX / 2, 2),
            Err(AppError::CorruptBundle(_))
        ));
        assert!(matches!(
            reader.f32_rows(3, 2),
            Err(AppError::CorruptBundle(_))
        ));
        assert_eq!(
            reader.f32_rows(2, 2).unwrap(),
            vec![vec![1.0, 2.0], vec![3.0, 4.0]]
        );
    }

    #[test]
    fn test_codec_for_kind() {
        assert_eq!(
            codec_for(CollectionKind::Documents).part_names("documents"),
            vec!["documents.rix".to_string()]
        );
        assert_eq!(codec_for(CollectionKind::Images).part_names("images").len(), 2);
    }
}
