//! Vector index abstraction.
//!
//! The service delegates all similarity search to an external managed index;
//! [`VectorIndex`] is the seam. [`qdrant::QdrantIndex`] talks to a Qdrant
//! instance over its REST API; [`memory::MemoryIndex`] is a local stand-in
//! used by the tests.

pub mod memory;
pub mod qdrant;

pub use memory::MemoryIndex;
pub use qdrant::QdrantIndex;

use async_trait::async_trait;
use serde::Serialize;

use crate::error::PipelineError;

/// One ranked hit from a top-k query.
#[derive(Debug, Clone, Serialize)]
pub struct SearchMatch {
    /// Document id (the filename used at upsert time).
    pub id: String,
    /// Cosine similarity, in [-1, 1].
    pub score: f32,
    /// Record payload (`{"text": ...}`), present when requested.
    pub metadata: Option<serde_json::Value>,
}

#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Provision the index if it does not exist yet. Called once at startup.
    async fn ensure_index(&self) -> Result<(), PipelineError>;

    /// Write or overwrite exactly one record, keyed by `id`.
    async fn upsert(
        &self,
        id: &str,
        vector: &[f32],
        metadata: serde_json::Value,
    ) -> Result<(), PipelineError>;

    /// Up to `top_k` nearest records in descending similarity order.
    async fn query(
        &self,
        vector: &[f32],
        top_k: usize,
        include_metadata: bool,
    ) -> Result<Vec<SearchMatch>, PipelineError>;
}
