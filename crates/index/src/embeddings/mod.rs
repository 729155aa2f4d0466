//! Embedding backends.
//!
//! Every backend returns a plain, L2-normalized [`EmbeddingVector`]. Any
//! provider-specific unwrapping of raw model output stays inside the adapter.
//!
//! [`EmbeddingVector`]: crate::types::EmbeddingVector

pub mod config;
pub mod provider;
pub mod providers;

pub use config::EmbeddingSettings;
pub use provider::{create_backend, EmbeddingBackend};
