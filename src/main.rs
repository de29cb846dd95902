use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use docqa::config::load_config_or_default;
use docqa::embedding::OllamaEmbedder;
use docqa::generation::OllamaGenerator;
use docqa::pipeline::Pipeline;
use docqa::server::run_server;
use docqa::store::{QdrantIndex, VectorIndex};

/// Document Q&A service: upload documents, semantic search, and chat over a
/// managed vector index.
#[derive(Parser)]
#[command(name = "docqa", version)]
struct Cli {
    /// Path to configuration file (TOML). Defaults apply when absent.
    #[arg(long, default_value = "./docqa.toml")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(fmt::layer())
        .init();

    let cli = Cli::parse();
    let config = Arc::new(load_config_or_default(&cli.config)?);

    info!(
        version = env!("CARGO_PKG_VERSION"),
        index_url = %config.index.url,
        index_name = %config.index.name,
        embedding_url = %config.embedding.url,
        embedding_model = %config.embedding.model,
        generation_model = %config.generation.model,
        "docqa boot"
    );

    let embedder = Arc::new(OllamaEmbedder::new(&config.embedding)?);
    let generator = Arc::new(OllamaGenerator::new(&config.generation)?);
    let index = Arc::new(QdrantIndex::new(&config.index));

    // Provision the collection once at startup, not per request.
    index
        .ensure_index()
        .await
        .map_err(|error| anyhow::anyhow!(error.to_string()))?;
    info!(collection = %config.index.name, dimension = config.index.dimension, "index ready");

    let bind = config.server.bind.clone();
    let pipeline = Arc::new(Pipeline::new(config, embedder, generator, index));

    run_server(&bind, pipeline).await
}
