//! Embedding client for an Ollama-compatible service.
//!
//! One call per text: `POST {url}/api/embeddings` with `{model, prompt}`,
//! returning the `embedding` array. Document text and query text go through
//! the same call; no asymmetric encoding. Transport failures map to
//! [`PipelineError::ServiceUnavailable`] and are not retried.

use anyhow::Result;
use async_trait::async_trait;
use std::time::Duration;

use crate::config::EmbeddingConfig;
use crate::error::PipelineError;

/// Seam for embedding backends, so tests can substitute a fake.
#[async_trait]
pub trait Embedder: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, PipelineError>;
}

pub struct OllamaEmbedder {
    url: String,
    model: String,
    client: reqwest::Client,
}

impl OllamaEmbedder {
    pub fn new(config: &EmbeddingConfig) -> Result<Self> {
        let mut builder = reqwest::Client::builder();
        if let Some(secs) = config.timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }

        Ok(Self {
            url: config.url.clone(),
            model: config.model.clone(),
            client: builder.build()?,
        })
    }
}

#[async_trait]
impl Embedder for OllamaEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, PipelineError> {
        let response = self
            .client
            .post(format!("{}/api/embeddings", self.url))
            .json(&serde_json::json!({
                "model": self.model,
                "prompt": text,
            }))
            .send()
            .await
            .map_err(|error| PipelineError::unavailable("embedding", error))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(PipelineError::unavailable(
                "embedding",
                format!("{status}: {body}"),
            ));
        }

        let json: serde_json::Value = response
            .json()
            .await
            .map_err(|error| PipelineError::unavailable("embedding", error))?;

        parse_embedding(&json)
    }
}

/// Extract the `embedding` array from an Ollama response. The vector's
/// dimensionality is not validated against the index here.
fn parse_embedding(json: &serde_json::Value) -> Result<Vec<f32>, PipelineError> {
    let values = json
        .get("embedding")
        .and_then(|e| e.as_array())
        .ok_or_else(|| PipelineError::invalid_response("embedding", "missing embedding array"))?;

    Ok(values
        .iter()
        .map(|v| v.as_f64().unwrap_or(0.0) as f32)
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_embedding_array() {
        let json = serde_json::json!({ "embedding": [0.25, -1.0, 3.5] });
        assert_eq!(parse_embedding(&json).unwrap(), vec![0.25, -1.0, 3.5]);
    }

    #[test]
    fn missing_embedding_field_is_invalid() {
        let json = serde_json::json!({ "vector": [1.0] });
        let err = parse_embedding(&json).unwrap_err();
        assert!(matches!(err, PipelineError::InvalidResponse { .. }));
    }

    #[tokio::test]
    async fn connection_failure_maps_to_service_unavailable() {
        // Nothing listens on port 1; the connect fails immediately.
        let embedder = OllamaEmbedder::new(&EmbeddingConfig {
            url: "http://127.0.0.1:1".to_string(),
            ..EmbeddingConfig::default()
        })
        .unwrap();

        let err = embedder.embed("hello").await.unwrap_err();
        match err {
            PipelineError::ServiceUnavailable { service, .. } => {
                assert_eq!(service, "embedding")
            }
            other => panic!("expected ServiceUnavailable, got {:?}", other),
        }
    }
}
