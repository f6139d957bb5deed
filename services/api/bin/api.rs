//! Main Entrypoint for the Teller Gateway
//!
//! This binary is responsible for:
//! 1. Loading configuration from the environment.
//! 2. Loading and validating the agent personas.
//! 3. Initializing the retrieval service (vector store indexing runs in the
//!    background so startup is not blocked).
//! 4. Constructing the Axum router and applying middleware.
//! 5. Starting the web server and handling graceful shutdown.

use anyhow::Context;
use async_openai::config::OpenAIConfig;
use axum::http::HeaderValue;
use std::sync::Arc;
use teller_api::{config::Config, router::create_router, state::AppState};
use teller_core::backend::AccountApi;
use teller_core::persona::PersonaSet;
use teller_core::retrieval::embedding::OpenAICompatibleEmbedder;
use teller_core::retrieval::store::VectorStore;
use teller_core::retrieval::RetrievalService;
use teller_core::tools::ToolRegistry;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tracing::{info, warn};

/// Listens for the `Ctrl+C` signal to gracefully shut down the server.
async fn shutdown_signal() {
    tokio::signal::ctrl_c()
        .await
        .expect("Failed to install Ctrl+C handler");
    info!("Received shutdown signal. Shutting down gracefully...");
}

fn build_retrieval(config: &Config) -> Arc<RetrievalService> {
    if !config.use_vector_store {
        info!("vector store disabled, retrieval will use keyword search");
        return Arc::new(RetrievalService::keyword_only(&config.knowledge_base_path));
    }

    let store = match VectorStore::open(&config.vector_store_dir) {
        Ok(store) => Arc::new(store),
        Err(e) => {
            warn!(error = %e, "could not open vector store, falling back to keyword search");
            return Arc::new(RetrievalService::keyword_only(&config.knowledge_base_path));
        }
    };

    let embedder_config = OpenAIConfig::new()
        .with_api_key(config.embedding_api_key.clone().unwrap_or_default())
        .with_api_base(config.embedding_endpoint.clone().unwrap_or_default());
    let embedder = Arc::new(OpenAICompatibleEmbedder::new(
        embedder_config,
        config.embedding_model.clone(),
    ));

    Arc::new(RetrievalService::with_vector_store(
        &config.knowledge_base_path,
        store,
        embedder,
        config.embedding_model.clone(),
    ))
}

fn build_cors(config: &Config) -> CorsLayer {
    if config.cors_allowed_origins.is_empty() {
        return CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);
    }
    let origins: Vec<HeaderValue> = config
        .cors_allowed_origins
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();
    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods(Any)
        .allow_headers(Any)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // --- 1. Load Configuration ---
    let config = Config::from_env().context("Failed to load configuration")?;

    // --- 2. Initialize Logging ---
    tracing_subscriber::fmt()
        .with_max_level(config.log_level)
        .with_timer(tracing_subscriber::fmt::time::ChronoLocal::rfc_3339())
        .init();
    info!("Configuration loaded. Initializing application state...");

    // --- 3. Load Personas ---
    let personas = Arc::new(
        PersonaSet::load(&config.persona_dir).context("Failed to load agent personas")?,
    );
    info!(dir = %config.persona_dir.display(), "Agent personas loaded and validated.");

    // --- 4. Initialize Retrieval and Tools ---
    let retrieval = build_retrieval(&config);
    if config.use_vector_store {
        // Index in the background; queries fall back to keyword search until
        // the index is ready.
        let indexing = retrieval.clone();
        tokio::spawn(async move {
            match indexing.ensure_indexed(false).await {
                Ok(count) => info!(chunks = count, "vector index ready"),
                Err(e) => warn!(error = %e, "vector indexing failed, keyword fallback stays active"),
            }
        });
    }

    let account = Arc::new(AccountApi::new(config.backend_api_base.clone()));
    let tools = Arc::new(ToolRegistry::standard(retrieval.clone(), account));
    info!(tools = ?tools.names(), "Tool registry initialized.");

    let app_state = Arc::new(AppState {
        config: Arc::new(config.clone()),
        personas,
        retrieval,
        tools,
    });

    // --- 5. Create Router and Apply Middleware ---
    let app = create_router(app_state).layer(build_cors(&config));

    // --- 6. Start Server ---
    info!(
        bind_address = %config.bind_address,
        upstream = %config.upstream_endpoint,
        "Gateway configured. Starting server..."
    );
    let listener = tokio::net::TcpListener::bind(config.bind_address).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server has shut down.");
    Ok(())
}
