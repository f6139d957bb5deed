//! One-shot knowledge-base indexer.
//!
//! Chunks the corpus, embeds every chunk, and persists the vector index.
//! Run with `--force` to discard an existing index and rebuild it.

use anyhow::{bail, Context};
use async_openai::config::OpenAIConfig;
use std::sync::Arc;
use teller_api::config::Config;
use teller_core::retrieval::embedding::OpenAICompatibleEmbedder;
use teller_core::retrieval::store::VectorStore;
use teller_core::retrieval::RetrievalService;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let force = std::env::args().any(|arg| arg == "--force");

    let config = Config::from_env().context("Failed to load configuration")?;
    tracing_subscriber::fmt()
        .with_max_level(config.log_level)
        .with_timer(tracing_subscriber::fmt::time::ChronoLocal::rfc_3339())
        .init();

    if !config.use_vector_store {
        bail!("USE_VECTOR_STORE is false; nothing to index");
    }

    let store = Arc::new(VectorStore::open(&config.vector_store_dir)?);
    let embedder_config = OpenAIConfig::new()
        .with_api_key(config.embedding_api_key.clone().unwrap_or_default())
        .with_api_base(config.embedding_endpoint.clone().unwrap_or_default());
    let embedder = Arc::new(OpenAICompatibleEmbedder::new(
        embedder_config,
        config.embedding_model.clone(),
    ));
    let retrieval = RetrievalService::with_vector_store(
        &config.knowledge_base_path,
        store,
        embedder,
        config.embedding_model.clone(),
    );

    let count = retrieval
        .ensure_indexed(force)
        .await
        .context("indexing failed")?;
    info!(chunks = count, force, "index build complete");
    Ok(())
}
