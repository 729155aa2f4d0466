//! Ordinal-continuing bundle merge.

use crate::types::{IndexBundle, Ordinal};
use recall_core::{AppError, AppResult};

/// Append `incoming` after `existing`.
///
/// Incoming ordinals are renumbered to continue from `existing.len()`;
/// external refs are carried over untouched. Either input failing
/// `validate()` aborts the merge with `CorruptBundle`, nothing is truncated.
pub fn merge(existing: IndexBundle, incoming: IndexBundle) -> AppResult<IndexBundle> {
    existing.validate()?;
    incoming.validate()?;

    if existing.collection_id != incoming.collection_id {
        return Err(AppError::Config(format!(
            "Cannot merge collection '{}' into '{}'",
            incoming.collection_id, existing.collection_id
        )));
    }

    if let (Some(have), Some(got)) = (existing.dimension(), incoming.dimension()) {
        if have != got {
            return Err(AppError::Config(format!(
                "Collection '{}' stores {}-dimensional vectors, got {}. \
                 The embedding model must not change for the lifetime of a collection",
                existing.collection_id, have, got
            )));
        }
    }

    let base = existing.len() as Ordinal;
    let mut merged = existing;

    merged.vectors.extend(incoming.vectors);
    for (ordinal, mut record) in incoming.items {
        record.ordinal = base + ordinal;
        merged.items.insert(record.ordinal, record);
    }

    merged.validate()?;

    tracing::debug!(
        "Merged {} item(s) into '{}' ({} total)",
        merged.len() - base as usize,
        merged.collection_id,
        merged.len()
    );

    Ok(merged)
}
