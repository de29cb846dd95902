//! In-memory [`VectorIndex`] with local cosine ranking.
//!
//! Backs the test suite; keeps the same overwrite-by-id and top-k contract
//! as the Qdrant implementation.

use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::RwLock;

use crate::error::PipelineError;
use crate::store::{SearchMatch, VectorIndex};

#[derive(Debug, Clone)]
struct Record {
    vector: Vec<f32>,
    metadata: Value,
}

#[derive(Default)]
pub struct MemoryIndex {
    records: RwLock<HashMap<String, Record>>,
}

impl MemoryIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.read().expect("index lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl VectorIndex for MemoryIndex {
    async fn ensure_index(&self) -> Result<(), PipelineError> {
        Ok(())
    }

    async fn upsert(
        &self,
        id: &str,
        vector: &[f32],
        metadata: Value,
    ) -> Result<(), PipelineError> {
        self.records.write().expect("index lock poisoned").insert(
            id.to_string(),
            Record {
                vector: vector.to_vec(),
                metadata,
            },
        );
        Ok(())
    }

    async fn query(
        &self,
        vector: &[f32],
        top_k: usize,
        include_metadata: bool,
    ) -> Result<Vec<SearchMatch>, PipelineError> {
        let records = self.records.read().expect("index lock poisoned");

        let mut matches: Vec<SearchMatch> = records
            .iter()
            .map(|(id, record)| SearchMatch {
                id: id.clone(),
                score: cosine_similarity(vector, &record.vector),
                metadata: include_metadata.then(|| record.metadata.clone()),
            })
            .collect();

        matches.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        matches.truncate(top_k);

        Ok(matches)
    }
}

/// Cosine similarity in [-1, 1]. Returns 0.0 for empty or mismatched vectors.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;

    for (x, y) in a.iter().zip(b.iter()) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom < f32::EPSILON {
        return 0.0;
    }

    dot / denom
}
