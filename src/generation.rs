//! Generation client for an Ollama-compatible service.
//!
//! Single non-streaming completion: `POST {url}/api/generate` with
//! `{model, prompt, stream: false}`, returning the `response` string whole.
//! Failure mapping matches the embedding client: transport errors become
//! [`PipelineError::ServiceUnavailable`], never retried.

use anyhow::Result;
use async_trait::async_trait;
use std::time::Duration;

use crate::config::GenerationConfig;
use crate::error::PipelineError;

/// Seam for generation backends, so tests can substitute a fake.
#[async_trait]
pub trait Generator: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String, PipelineError>;
}

pub struct OllamaGenerator {
    url: String,
    model: String,
    client: reqwest::Client,
}

impl OllamaGenerator {
    pub fn new(config: &GenerationConfig) -> Result<Self> {
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
impl Generator for OllamaGenerator {
    async fn generate(&self, prompt: &str) -> Result<String, PipelineError> {
        let response = self
            .client
            .post(format!("{}/api/generate", self.url))
            .json(&serde_json::json!({
                "model": self.model,
                "prompt": prompt,
                "stream": false,
            }))
            .send()
            .await
            .map_err(|error| PipelineError::unavailable("generation", error))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(PipelineError::unavailable(
                "generation",
                format!("{status}: {body}"),
            ));
        }

        let json: serde_json::Value = response
            .json()
            .await
            .map_err(|error| PipelineError::unavailable("generation", error))?;

        json.get("response")
            .and_then(|r| r.as_str())
            .map(|r| r.to_string())
            .ok_or_else(|| PipelineError::invalid_response("generation", "missing response field"))
    }
}
