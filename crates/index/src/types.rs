//! Retrieval type definitions.

use recall_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Stable 0-based position of an item within its collection.
pub type Ordinal = u64;

/// Per-item metadata: filename, page count, creation date, cover-image ref...
pub type Metadata = BTreeMap<String, Scalar>;

/// The two collections the engine maintains.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CollectionKind {
    /// Document-summary vectors, stored as a single packed index blob
    Documents,
    /// Image vectors, stored as a matrix blob plus a map blob
    Images,
}

impl CollectionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            CollectionKind::Documents => "documents",
            CollectionKind::Images => "images",
        }
    }
}

impl fmt::Display for CollectionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CollectionKind {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "documents" | "document" | "docs" | "pdf" => Ok(CollectionKind::Documents),
            "images" | "image" | "img" => Ok(CollectionKind::Images),
            other => Err(AppError::Config(format!(
                "Unknown collection '{}'. Supported: documents, images",
                other
            ))),
        }
    }
}

/// A scalar metadata value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Scalar {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl Scalar {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Scalar::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Parse a CLI-style value, preferring the narrowest scalar type.
    pub fn parse_loose(raw: &str) -> Self {
        if let Ok(b) = raw.parse::<bool>() {
            Scalar::Bool(b)
        } else if let Ok(i) = raw.parse::<i64>() {
            Scalar::Int(i)
        } else if let Ok(f) = raw.parse::<f64>() {
            if f.is_finite() {
                Scalar::Float(f)
            } else {
                Scalar::Text(raw.to_string())
            }
        } else {
            Scalar::Text(raw.to_string())
        }
    }
}

impl From<&str> for Scalar {
    fn from(value: &str) -> Self {
        Scalar::Text(value.to_string())
    }
}

impl From<String> for Scalar {
    fn from(value: String) -> Self {
        Scalar::Text(value)
    }
}

impl From<i64> for Scalar {
    fn from(value: i64) -> Self {
        Scalar::Int(value)
    }
}

impl From<bool> for Scalar {
    fn from(value: bool) -> Self {
        Scalar::Bool(value)
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Bool(b) => write!(f, "{}", b),
            Scalar::Int(i) => write!(f, "{}", i),
            Scalar::Float(x) => write!(f, "{}", x),
            Scalar::Text(s) => f.write_str(s),
        }
    }
}

/// Fixed-dimension embedding, unit length unless it is the zero vector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EmbeddingVector(Vec<f32>);

impl EmbeddingVector {
    /// L2-normalize raw backend output.
    ///
    /// An all-zero vector is kept as is; it scores 0 against everything.
    pub fn normalized(mut values: Vec<f32>) -> AppResult<Self> {
        if values.is_empty() {
            return Err(AppError::BackendUnavailable(
                "Backend returned an empty embedding".to_string(),
            ));
        }
        if values.iter().any(|v| !v.is_finite()) {
            return Err(AppError::BackendUnavailable(
                "Backend returned a non-finite embedding value".to_string(),
            ));
        }

        let norm: f32 = values.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            for v in &mut values {
                *v /= norm;
            }
        }

        Ok(Self(values))
    }

    /// Wrap values that are already normalized (decoded from a bundle).
    pub fn from_normalized(values: Vec<f32>) -> Self {
        Self(values)
    }

    pub fn dimension(&self) -> usize {
        self.0.len()
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.0
    }

    pub fn into_inner(self) -> Vec<f32> {
        self.0
    }

    /// Cosine similarity; both sides are pre-normalized so this is a dot product.
    pub fn dot(&self, other: &EmbeddingVector) -> f32 {
        self.0.iter().zip(other.0.iter()).map(|(a, b)| a * b).sum()
    }
}

/// Per-ordinal metadata as persisted in a bundle (everything but the vector).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemRecord {
    pub ordinal: Ordinal,

    /// Blob id of the original asset
    pub external_ref: String,

    /// Text that was embedded (document summary) or the asset name (image)
    #[serde(default)]
    pub content: String,

    #[serde(default)]
    pub metadata: Metadata,
}

/// One indexed item: its vector plus provenance.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexedItem {
    pub ordinal: Ordinal,
    pub vector: EmbeddingVector,
    pub external_ref: String,
    pub content: String,
    pub metadata: Metadata,
}

impl IndexedItem {
    fn into_parts(self) -> (EmbeddingVector, ItemRecord) {
        (
            self.vector,
            ItemRecord {
                ordinal: self.ordinal,
                external_ref: self.external_ref,
                content: self.content,
                metadata: self.metadata,
            },
        )
    }
}

/// The durable unit for one collection.
///
/// `vectors` and `items` are two views of the same ordinal space: there is
/// exactly one record per vector, keyed by the vector's position.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexBundle {
    pub collection_id: String,
    pub vectors: Vec<EmbeddingVector>,
    pub items: BTreeMap<Ordinal, ItemRecord>,
}

impl IndexBundle {
    pub fn empty(collection_id: impl Into<String>) -> Self {
        Self {
            collection_id: collection_id.into(),
            vectors: Vec::new(),
            items: BTreeMap::new(),
        }
    }

    /// Build a bundle from items, renumbering them 0..n in the given order.
    pub fn from_items(collection_id: impl Into<String>, items: Vec<IndexedItem>) -> Self {
        let mut bundle = Self::empty(collection_id);
        for (position, item) in items.into_iter().enumerate() {
            let (vector, mut record) = item.into_parts();
            record.ordinal = position as Ordinal;
            bundle.vectors.push(vector);
            bundle.items.insert(record.ordinal, record);
        }
        bundle
    }

    pub fn len(&self) -> usize {
        self.vectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vectors.is_empty()
    }

    /// Dimension of the stored vectors, `None` while the bundle is empty.
    pub fn dimension(&self) -> Option<usize> {
        self.vectors.first().map(EmbeddingVector::dimension)
    }

    /// Assemble the full item at `ordinal`.
    pub fn item(&self, ordinal: Ordinal) -> Option<IndexedItem> {
        let vector = self.vectors.get(usize::try_from(ordinal).ok()?)?;
        let record = self.items.get(&ordinal)?;
        Some(IndexedItem {
            ordinal,
            vector: vector.clone(),
            external_ref: record.external_ref.clone(),
            content: record.content.clone(),
            metadata: record.metadata.clone(),
        })
    }

    /// Check `len(vectors) == len(items)`, ordinal coverage and a uniform dimension.
    pub fn validate(&self) -> AppResult<()> {
        if self.vectors.len() != self.items.len() {
            return Err(AppError::CorruptBundle(format!(
                "collection '{}' has {} vectors but {} item records",
                self.collection_id,
                self.vectors.len(),
                self.items.len()
            )));
        }

        for (position, (ordinal, record)) in self.items.iter().enumerate() {
            if *ordinal != position as Ordinal || record.ordinal != *ordinal {
                return Err(AppError::CorruptBundle(format!(
                    "collection '{}' has a gap or mismatch at ordinal {} (record says {})",
                    self.collection_id, position, record.ordinal
                )));
            }
        }

        if let Some(dimension) = self.dimension() {
            if let Some(bad) = self.vectors.iter().position(|v| v.dimension() != dimension) {
                return Err(AppError::CorruptBundle(format!(
                    "collection '{}' vector {} has dimension {}, expected {}",
                    self.collection_id,
                    bad,
                    self.vectors[bad].dimension(),
                    dimension
                )));
            }
        }

        Ok(())
    }
}

/// One ranked hit: content plus provenance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    pub ordinal: Ordinal,
    pub score: f32,
    pub external_ref: String,
    pub content: String,
    pub metadata: Metadata,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(external_ref: &str, values: Vec<f32>) -> IndexedItem {
        IndexedItem {
            ordinal: 99,
            vector: EmbeddingVector::normalized(values).unwrap(),
            external_ref: external_ref.to_string(),
            content: format!("content of {}", external_ref),
            metadata: Metadata::new(),
        }
    }

    #[test]
    fn test_normalized_is_unit_length() {
        let v = EmbeddingVector::normalized(vec![3.0, 4.0]).unwrap();
        assert_eq!(v.as_slice(), &[0.6, 0.8]);
        assert!((v.dot(&v) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_normalized_rejects_empty_and_nan() {
        assert!(matches!(
            EmbeddingVector::normalized(vec![]),
            Err(AppError::BackendUnavailable(_))
        ));
        assert!(EmbeddingVector::normalized(vec![1.0, f32::NAN]).is_err());
    }

    #[test]
    fn test_zero_vector_stays_zero() {
        let v = EmbeddingVector::normalized(vec![0.0; 4]).unwrap();
        assert!(v.as_slice().iter().all(|&x| x == 0.0));
    }

    #[test]
    fn test_from_items_renumbers() {
        let bundle = IndexBundle::from_items(
            "documents",
            vec![item("a", vec![1.0, 0.0]), item("b", vec![0.0, 1.0])],
        );
        assert_eq!(bundle.len(), 2);
        assert_eq!(bundle.items[&0].external_ref, "a");
        assert_eq!(bundle.items[&1].ordinal, 1);
        assert!(bundle.validate().is_ok());
    }

    #[test]
    fn test_validate_length_mismatch() {
        let mut bundle = IndexBundle::from_items("documents", vec![item("a", vec![1.0, 0.0])]);
        bundle
            .vectors
            .push(EmbeddingVector::from_normalized(vec![0.0, 1.0]));
        assert!(matches!(
            bundle.validate(),
            Err(AppError::CorruptBundle(_))
        ));
    }

    #[test]
    fn test_validate_ordinal_gap() {
        let mut bundle = IndexBundle::from_items(
            "documents",
            vec![item("a", vec![1.0, 0.0]), item("b", vec![0.0, 1.0])],
        );
        let record = bundle.items.remove(&1).unwrap();
        bundle.items.insert(5, ItemRecord { ordinal: 5, ..record });
        assert!(bundle.validate().is_err());
    }

    #[test]
    fn test_validate_mixed_dimensions() {
        let bundle = IndexBundle::from_items(
            "images",
            vec![item("a", vec![1.0, 0.0]), item("b", vec![0.0, 1.0, 0.0])],
        );
        assert!(bundle.validate().is_err());
    }

    #[test]
    fn test_item_lookup() {
        let bundle = IndexBundle::from_items("images", vec![item("cover.png", vec![1.0, 1.0])]);
        let found = bundle.item(0).unwrap();
        assert_eq!(found.external_ref, "cover.png");
        assert!(bundle.item(1).is_none());
    }

    #[test]
    fn test_collection_kind_parse() {
        assert_eq!(
            "Images".parse::<CollectionKind>().unwrap(),
            CollectionKind::Images
        );
        assert_eq!(
            "docs".parse::<CollectionKind>().unwrap(),
            CollectionKind::Documents
        );
        assert!("video".parse::<CollectionKind>().is_err());
    }

    #[test]
    fn test_scalar_parse_loose() {
        assert_eq!(Scalar::parse_loose("12"), Scalar::Int(12));
        assert_eq!(Scalar::parse_loose("true"), Scalar::Bool(true));
        assert_eq!(Scalar::parse_loose("2.5"), Scalar::Float(2.5));
        assert_eq!(
            Scalar::parse_loose("report.pdf"),
            Scalar::Text("report.pdf".to_string())
        );
    }

    #[test]
    fn test_scalar_json_shape() {
        let mut metadata = Metadata::new();
        metadata.insert("pages".to_string(), Scalar::Int(12));
        metadata.insert("name".to_string(), Scalar::from("report.pdf"));
        let json = serde_json::to_string(&metadata).unwrap();
        assert_eq!(json, r#"{"name":"report.pdf","pages":12}"#);

        let back: Metadata = serde_json::from_str(&json).unwrap();
        assert_eq!(back, metadata);
    }
}
