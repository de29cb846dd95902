//! Document-to-answer pipeline: ingest, search, chat.
//!
//! Each operation is a straight-line sequence over injected clients — no
//! retries, no fan-out, no partial-success handling. A file persisted before
//! a downstream failure stays on disk. Two concurrent uploads of the same
//! filename race; the last upsert wins at the external index.

use serde_json::json;
use std::sync::Arc;
use tracing::{info, warn};

use crate::config::Config;
use crate::embedding::Embedder;
use crate::error::PipelineError;
use crate::extract;
use crate::generation::Generator;
use crate::store::{SearchMatch, VectorIndex};

/// Returned by chat when retrieval yields nothing above threshold;
/// generation is never invoked in that case.
pub const NO_CONTEXT_ANSWER: &str =
    "I don't have enough context to answer this question. Please upload relevant documents first.";

pub struct Pipeline {
    config: Arc<Config>,
    embedder: Arc<dyn Embedder>,
    generator: Arc<dyn Generator>,
    index: Arc<dyn VectorIndex>,
}

impl Pipeline {
    pub fn new(
        config: Arc<Config>,
        embedder: Arc<dyn Embedder>,
        generator: Arc<dyn Generator>,
        index: Arc<dyn VectorIndex>,
    ) -> Self {
        Self {
            config,
            embedder,
            generator,
            index,
        }
    }

    pub fn default_min_score(&self) -> f32 {
        self.config.retrieval.min_score
    }

    /// Persist the upload, extract its text, embed it, and upsert one record
    /// keyed by the filename. Re-uploading the same filename overwrites both
    /// the stored file and the index record.
    pub async fn ingest(&self, filename: &str, bytes: &[u8]) -> Result<(), PipelineError> {
        tokio::fs::create_dir_all(&self.config.storage.uploads_dir).await?;
        let path = self.config.storage.uploads_dir.join(filename);
        tokio::fs::write(&path, bytes).await?;

        let text = extract::extract_text(&path)?;
        let vector = self.embedder.embed(&text).await?;
        self.index
            .upsert(filename, &vector, json!({ "text": text }))
            .await?;

        info!(filename, chars = text.len(), "document indexed");
        Ok(())
    }

    /// Embed the query, fetch top-k neighbours, and drop everything below
    /// `min_score`. Store ranking order is preserved through the filter.
    pub async fn search(
        &self,
        query: &str,
        min_score: f32,
    ) -> Result<Vec<SearchMatch>, PipelineError> {
        let vector = self.embedder.embed(query).await?;
        let matches = self
            .index
            .query(&vector, self.config.retrieval.top_k, true)
            .await?;
        Ok(filter_by_score(matches, min_score))
    }

    /// Search with the default threshold, then answer from the retrieved
    /// context. With no context the fixed fallback is returned instead of
    /// calling the generation service.
    pub async fn chat(&self, query: &str) -> Result<String, PipelineError> {
        let results = self.search(query, self.default_min_score()).await?;

        if results.is_empty() {
            warn!(query, "no documents above threshold, returning fallback answer");
            return Ok(NO_CONTEXT_ANSWER.to_string());
        }

        let context = assemble_context(&results);
        let prompt = build_prompt(&context, query);
        self.generator.generate(&prompt).await
    }
}

/// Inclusive threshold filter: `score == min_score` survives.
pub fn filter_by_score(matches: Vec<SearchMatch>, min_score: f32) -> Vec<SearchMatch> {
    matches
        .into_iter()
        .filter(|m| m.score >= min_score)
        .collect()
}

/// Each surviving result's `text` metadata, one per line, in search order.
pub fn assemble_context(results: &[SearchMatch]) -> String {
    results
        .iter()
        .filter_map(|m| {
            m.metadata
                .as_ref()?
                .get("text")?
                .as_str()
                .map(String::from)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn build_prompt(context: &str, query: &str) -> String {
    format!("Answer based on context:\n{context}\n\nUser: {query}\nAnswer:")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn score_only(id: &str, score: f32) -> SearchMatch {
        SearchMatch {
            id: id.to_string(),
            score,
            metadata: Some(json!({ "text": id })),
        }
    }

    #[test]
    fn threshold_is_inclusive() {
        let matches = vec![
            score_only("a", 0.95),
            score_only("b", 0.60),
            score_only("c", 0.59),
        ];
        let kept = filter_by_score(matches, 0.60);
        let ids: Vec<&str> = kept.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b"]);
    }

    #[test]
    fn filter_preserves_store_order() {
        // Order comes from the store's ranking; the filter must not re-sort.
        let matches = vec![
            score_only("first", 0.9),
            score_only("second", 0.8),
            score_only("third", 0.7),
        ];
        let kept = filter_by_score(matches, 0.75);
        let ids: Vec<&str> = kept.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, vec!["first", "second"]);
    }

    #[test]
    fn context_is_one_text_per_line_in_order() {
        let results = vec![
            SearchMatch {
                id: "one.txt".to_string(),
                score: 0.9,
                metadata: Some(json!({ "text": "A" })),
            },
            SearchMatch {
                id: "two.txt".to_string(),
                score: 0.8,
                metadata: Some(json!({ "text": "B" })),
            },
        ];
        assert_eq!(assemble_context(&results), "A\nB");
    }

    #[test]
    fn results_without_text_metadata_are_skipped() {
        let results = vec![
            SearchMatch {
                id: "one.txt".to_string(),
                score: 0.9,
                metadata: None,
            },
            SearchMatch {
                id: "two.txt".to_string(),
                score: 0.8,
                metadata: Some(json!({ "text": "B" })),
            },
        ];
        assert_eq!(assemble_context(&results), "B");
    }

    #[test]
    fn prompt_places_context_before_user_marker() {
        let prompt = build_prompt("A\nB", "What?");
        let context_pos = prompt.find("A\nB").unwrap();
        let user_pos = prompt.find("User: What?").unwrap();
        assert!(context_pos < user_pos);
        assert!(prompt.starts_with("Answer based on context:\n"));
        assert!(prompt.ends_with("\nAnswer:"));
    }
}
