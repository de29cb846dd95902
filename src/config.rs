//! TOML configuration for the docqa service.
//!
//! Every section has defaults, so the service can boot without a config file
//! (local Ollama on 11434, local Qdrant on 6333). The index API key may come
//! from the config file or the `DOCQA_INDEX_API_KEY` environment variable;
//! the environment wins.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub index: IndexConfig,
    pub embedding: EmbeddingConfig,
    pub generation: GenerationConfig,
    pub retrieval: RetrievalConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0:8000".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct StorageConfig {
    /// Directory where uploaded files are persisted, keyed by filename.
    /// Files are never cleaned up by this service.
    pub uploads_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            uploads_dir: PathBuf::from("uploads"),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct IndexConfig {
    /// Qdrant base URL.
    pub url: String,
    /// Collection name.
    pub name: String,
    /// Declared vector dimensionality. Must match the embedding model's output.
    pub dimension: usize,
    /// Optional `api-key` header value. `DOCQA_INDEX_API_KEY` overrides this.
    pub api_key: Option<String>,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:6333".to_string(),
            name: "documents".to_string(),
            dimension: 768,
            api_key: None,
        }
    }
}

impl IndexConfig {
    pub fn resolved_api_key(&self) -> Option<String> {
        std::env::var("DOCQA_INDEX_API_KEY")
            .ok()
            .filter(|key| !key.trim().is_empty())
            .or_else(|| self.api_key.clone())
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct EmbeddingConfig {
    /// Ollama-compatible base URL (`POST {url}/api/embeddings`).
    pub url: String,
    pub model: String,
    /// Outbound request timeout. Unset means no timeout: an unresponsive
    /// service stalls the request.
    pub timeout_secs: Option<u64>,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:11434".to_string(),
            model: "nomic-embed-text".to_string(),
            timeout_secs: None,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct GenerationConfig {
    /// Ollama-compatible base URL (`POST {url}/api/generate`).
    pub url: String,
    pub model: String,
    pub timeout_secs: Option<u64>,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:11434".to_string(),
            model: "llama3".to_string(),
            timeout_secs: None,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct RetrievalConfig {
    /// Nearest neighbours requested from the index per query.
    pub top_k: usize,
    /// Inclusive similarity floor applied to query results.
    pub min_score: f32,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: 3,
            min_score: 0.60,
        }
    }
}

/// Load and validate configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;
    validate(&config)?;
    Ok(config)
}

/// Load the config file if it exists, otherwise fall back to defaults.
pub fn load_config_or_default(path: &Path) -> Result<Config> {
    if path.exists() {
        load_config(path)
    } else {
        Ok(Config::default())
    }
}

fn validate(config: &Config) -> Result<()> {
    if config.index.dimension == 0 {
        anyhow::bail!("index.dimension must be > 0");
    }

    if config.retrieval.top_k < 1 {
        anyhow::bail!("retrieval.top_k must be >= 1");
    }

    // Cosine similarity lives in [-1, 1].
    if !(-1.0..=1.0).contains(&config.retrieval.min_score) {
        anyhow::bail!("retrieval.min_score must be in [-1.0, 1.0]");
    }

    if config.embedding.model.trim().is_empty() {
        anyhow::bail!("embedding.model must not be empty");
    }

    if config.generation.model.trim().is_empty() {
        anyhow::bail!("generation.model must not be empty");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_are_valid() {
        let config = Config::default();
        assert!(validate(&config).is_ok());
        assert_eq!(config.index.dimension, 768);
        assert_eq!(config.retrieval.top_k, 3);
        assert!((config.retrieval.min_score - 0.60).abs() < f32::EPSILON);
        assert_eq!(config.embedding.model, "nomic-embed-text");
        assert_eq!(config.generation.model, "llama3");
    }

    #[test]
    fn partial_file_fills_in_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
[index]
name = "my-docs"

[retrieval]
min_score = 0.75
"#
        )
        .unwrap();

        let config = load_config(file.path()).unwrap();
        assert_eq!(config.index.name, "my-docs");
        assert_eq!(config.index.dimension, 768);
        assert!((config.retrieval.min_score - 0.75).abs() < f32::EPSILON);
        assert_eq!(config.retrieval.top_k, 3);
        assert_eq!(config.server.bind, "0.0.0.0:8000");
    }

    #[test]
    fn rejects_zero_dimension() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[index]\ndimension = 0").unwrap();
        assert!(load_config(file.path()).is_err());
    }

    #[test]
    fn rejects_out_of_range_min_score() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[retrieval]\nmin_score = 1.5").unwrap();
        assert!(load_config(file.path()).is_err());
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let config = load_config_or_default(Path::new("/nonexistent/docqa.toml")).unwrap();
        assert_eq!(config.index.name, "documents");
    }
}
