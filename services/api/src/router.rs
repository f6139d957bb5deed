//! Axum Router Configuration
//!
//! This module defines the complete HTTP routing for the gateway: the REST
//! surface, the WebSocket endpoint, and OpenAPI documentation.

use crate::handlers::{self, HealthResponse, KnowledgeStats};
use crate::state::AppState;
use crate::ws::ws_handler;

use axum::{routing::get, Router};
use std::sync::Arc;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    paths(handlers::health, handlers::knowledge_stats),
    components(schemas(HealthResponse, KnowledgeStats)),
    tags(
        (name = "Teller API", description = "Realtime voice-agent gateway")
    )
)]
pub struct ApiDoc;

/// Creates the main Axum router for the application.
pub fn create_router(app_state: Arc<AppState>) -> Router {
    let api_router = Router::new()
        .route("/health", get(handlers::health))
        .route("/api/knowledge/stats", get(handlers::knowledge_stats))
        .route("/ws/chat", get(ws_handler))
        .with_state(app_state);

    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .merge(api_router)
}
