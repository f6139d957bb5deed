//! Axum Handlers for the REST API
//!
//! The REST surface is small: a health probe and a knowledge-base stats
//! endpoint. It uses `utoipa` doc comments to generate OpenAPI documentation.

use axum::extract::State;
use axum::response::Json;
use serde::Serialize;
use std::sync::Arc;
use utoipa::ToSchema;

use crate::state::AppState;

#[derive(Serialize, ToSchema)]
pub struct HealthResponse {
    #[schema(example = "ok")]
    pub status: &'static str,
    pub service: &'static str,
    pub version: &'static str,
}

#[derive(Serialize, ToSchema)]
pub struct KnowledgeStats {
    /// Active retrieval mode: `vector` or `keyword`.
    #[schema(example = "vector")]
    pub mode: String,
    pub indexed_chunks: usize,
    pub persist_dir: Option<String>,
    pub embedding_model: Option<String>,
    pub corpus_path: String,
}

/// Health check endpoint.
#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Service is running", body = HealthResponse)
    )
)]
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        service: "teller",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Current state of the knowledge-base retrieval service.
#[utoipa::path(
    get,
    path = "/api/knowledge/stats",
    responses(
        (status = 200, description = "Retrieval service statistics", body = KnowledgeStats)
    )
)]
pub async fn knowledge_stats(State(state): State<Arc<AppState>>) -> Json<KnowledgeStats> {
    let stats = state.retrieval.stats();
    Json(KnowledgeStats {
        mode: stats.mode.to_string(),
        indexed_chunks: stats.indexed_chunks,
        persist_dir: stats.persist_dir,
        embedding_model: stats.embedding_model,
        corpus_path: stats.corpus_path,
    })
}
