//! Qdrant-backed [`VectorIndex`] over the REST API.
//!
//! Records are keyed by document filename. Qdrant point ids must be integers
//! or UUIDs, so the point id is a deterministic UUIDv5 of the filename and
//! the filename rides along in the payload; upserting the same filename
//! twice therefore overwrites the same point.

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::config::IndexConfig;
use crate::error::PipelineError;
use crate::store::{SearchMatch, VectorIndex};

const SERVICE: &str = "vector index";

pub struct QdrantIndex {
    url: String,
    collection: String,
    dimension: usize,
    api_key: Option<String>,
    client: Client,
}

impl QdrantIndex {
    pub fn new(config: &IndexConfig) -> Self {
        Self {
            url: config.url.clone(),
            collection: config.name.clone(),
            dimension: config.dimension,
            api_key: config.resolved_api_key(),
            client: Client::new(),
        }
    }

    fn request(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.api_key {
            Some(key) => builder.header("api-key", key),
            None => builder,
        }
    }

    async fn check(response: reqwest::Response) -> Result<reqwest::Response, PipelineError> {
        let status = response.status();
        if status.is_success() {
            Ok(response)
        } else {
            let body = response.text().await.unwrap_or_default();
            Err(PipelineError::unavailable(
                SERVICE,
                format!("{status}: {body}"),
            ))
        }
    }
}

/// Deterministic point id for a document filename.
fn point_id(filename: &str) -> String {
    Uuid::new_v5(&Uuid::NAMESPACE_URL, filename.as_bytes()).to_string()
}

#[async_trait]
impl VectorIndex for QdrantIndex {
    async fn ensure_index(&self) -> Result<(), PipelineError> {
        let response = self
            .request(self.client.get(format!("{}/collections", self.url)))
            .send()
            .await
            .map_err(|error| PipelineError::unavailable(SERVICE, error))?;
        let response = Self::check(response).await?;

        let listing: Value = response
            .json()
            .await
            .map_err(|error| PipelineError::unavailable(SERVICE, error))?;
        let exists = listing
            .pointer("/result/collections")
            .and_then(Value::as_array)
            .map(|collections| {
                collections.iter().any(|c| {
                    c.get("name").and_then(Value::as_str) == Some(self.collection.as_str())
                })
            })
            .unwrap_or(false);

        if exists {
            return Ok(());
        }

        let response = self
            .request(
                self.client
                    .put(format!("{}/collections/{}", self.url, self.collection)),
            )
            .json(&json!({
                "vectors": {
                    "size": self.dimension,
                    "distance": "Cosine",
                }
            }))
            .send()
            .await
            .map_err(|error| PipelineError::unavailable(SERVICE, error))?;
        Self::check(response).await?;

        Ok(())
    }

    async fn upsert(
        &self,
        id: &str,
        vector: &[f32],
        metadata: Value,
    ) -> Result<(), PipelineError> {
        let mut payload = metadata;
        if let Some(object) = payload.as_object_mut() {
            object.insert("filename".to_string(), Value::String(id.to_string()));
        }

        let response = self
            .request(self.client.put(format!(
                "{}/collections/{}/points?wait=true",
                self.url, self.collection
            )))
            .json(&json!({
                "points": [{
                    "id": point_id(id),
                    "vector": vector,
                    "payload": payload,
                }]
            }))
            .send()
            .await
            .map_err(|error| PipelineError::unavailable(SERVICE, error))?;
        Self::check(response).await?;

        Ok(())
    }

    async fn query(
        &self,
        vector: &[f32],
        top_k: usize,
        include_metadata: bool,
    ) -> Result<Vec<SearchMatch>, PipelineError> {
        let response = self
            .request(self.client.post(format!(
                "{}/collections/{}/points/search",
                self.url, self.collection
            )))
            .json(&json!({
                "vector": vector,
                "limit": top_k,
                // The payload carries the filename id, so it is always
                // requested; `include_metadata` only controls what callers
                // get back.
                "with_payload": true,
            }))
            .send()
            .await
            .map_err(|error| PipelineError::unavailable(SERVICE, error))?;
        let response = Self::check(response).await?;

        let parsed: Value = response
            .json()
            .await
            .map_err(|error| PipelineError::unavailable(SERVICE, error))?;
        parse_hits(&parsed, include_metadata)
    }
}

/// Maps a search response body to matches. The point's public id is the
/// `filename` payload field, with the raw point id as a fallback; the
/// filename key is stripped from returned metadata.
fn parse_hits(parsed: &Value, include_metadata: bool) -> Result<Vec<SearchMatch>, PipelineError> {
    let hits = parsed
        .pointer("/result")
        .and_then(Value::as_array)
        .ok_or_else(|| PipelineError::invalid_response(SERVICE, "missing result array"))?;

    let mut matches = Vec::with_capacity(hits.len());
    for hit in hits {
        let score = hit.pointer("/score").and_then(Value::as_f64).unwrap_or(0.0) as f32;

        let mut payload = hit.get("payload").cloned().unwrap_or(Value::Null);
        let id = payload
            .get("filename")
            .and_then(Value::as_str)
            .map(|f| f.to_string())
            .or_else(|| hit.get("id").and_then(Value::as_str).map(|s| s.to_string()))
            .unwrap_or_default();

        let metadata = if include_metadata {
            if let Some(object) = payload.as_object_mut() {
                object.remove("filename");
            }
            Some(payload)
        } else {
            None
        };

        matches.push(SearchMatch {
            id,
            score,
            metadata,
        });
    }

    Ok(matches)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn point_id_is_deterministic_per_filename() {
        assert_eq!(point_id("notes.txt"), point_id("notes.txt"));
        assert_ne!(point_id("notes.txt"), point_id("other.txt"));
    }

    #[test]
    fn point_id_is_a_uuid() {
        assert!(Uuid::parse_str(&point_id("report.pdf")).is_ok());
    }

    fn hit_body() -> Value {
        json!({
            "result": [{
                "id": point_id("notes.txt"),
                "score": 0.87,
                "payload": { "filename": "notes.txt", "text": "The sky is blue." },
            }]
        })
    }

    #[test]
    fn id_resolves_from_payload_even_without_metadata() {
        let matches = parse_hits(&hit_body(), false).unwrap();
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].id, "notes.txt");
        assert!(matches[0].metadata.is_none());
    }

    #[test]
    fn metadata_excludes_the_filename_key() {
        let matches = parse_hits(&hit_body(), true).unwrap();
        assert_eq!(matches[0].id, "notes.txt");
        assert_eq!(
            matches[0].metadata,
            Some(json!({ "text": "The sky is blue." }))
        );
    }

    #[test]
    fn missing_result_array_is_an_invalid_response() {
        let err = parse_hits(&json!({ "status": "ok" }), true).unwrap_err();
        assert!(matches!(err, PipelineError::InvalidResponse { .. }));
    }
}
