//! REST surface behaviour: health probe and knowledge stats.

use std::path::PathBuf;
use std::sync::Arc;
use teller_api::config::Config;
use teller_api::router::create_router;
use teller_api::state::AppState;
use teller_core::backend::AccountApi;
use teller_core::persona::{Persona, PersonaSet};
use teller_core::retrieval::RetrievalService;
use teller_core::tools::ToolRegistry;
use tokio::net::TcpListener;

fn persona(role: &str) -> Persona {
    serde_json::from_value(serde_json::json!({
        "role": role,
        "voice": "shimmer",
        "intro_utterance": "Hello.",
        "instructions": "Help the caller.",
        "vad": { "threshold": 0.5, "prefix_padding_ms": 200, "silence_duration_ms": 400 }
    }))
    .unwrap()
}

async fn serve_app() -> String {
    let corpus = std::env::temp_dir().join(format!("teller-rest-{}.txt", uuid::Uuid::new_v4()));
    std::fs::write(&corpus, "SOURCE: s\nTITLE: t\n\nSome help content for testing.").unwrap();

    let config = Config {
        bind_address: "127.0.0.1:0".parse().unwrap(),
        upstream_endpoint: "http://127.0.0.1:9".to_string(),
        upstream_api_key: "key".to_string(),
        upstream_deployment: "deployment".to_string(),
        embedding_endpoint: None,
        embedding_api_key: None,
        embedding_model: "text-embedding-ada-002".to_string(),
        backend_api_base: "http://127.0.0.1:9".to_string(),
        use_vector_store: false,
        knowledge_base_path: corpus.clone(),
        vector_store_dir: PathBuf::from("./vector_store"),
        persona_dir: PathBuf::from("./personas"),
        cors_allowed_origins: Vec::new(),
        log_level: tracing::Level::INFO,
    };
    let retrieval = Arc::new(RetrievalService::keyword_only(&corpus));
    let account = Arc::new(AccountApi::new(config.backend_api_base.clone()));
    let state = Arc::new(AppState {
        config: Arc::new(config),
        personas: Arc::new(PersonaSet::from_personas(persona("A"), persona("B")).unwrap()),
        retrieval: retrieval.clone(),
        tools: Arc::new(ToolRegistry::standard(retrieval, account)),
    });

    let app = create_router(state);
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

#[tokio::test]
async fn health_reports_ok() {
    let base = serve_app().await;
    let body: serde_json::Value = reqwest::get(format!("{base}/health"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["status"], "ok");
    assert_eq!(body["service"], "teller");
}

#[tokio::test]
async fn knowledge_stats_reports_keyword_mode() {
    let base = serve_app().await;
    let body: serde_json::Value = reqwest::get(format!("{base}/api/knowledge/stats"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["mode"], "keyword");
    assert_eq!(body["indexed_chunks"], 0);
}

#[tokio::test]
async fn openapi_document_is_served() {
    let base = serve_app().await;
    let body: serde_json::Value = reqwest::get(format!("{base}/api-docs/openapi.json"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(body["paths"]["/health"].is_object());
    assert!(body["paths"]["/api/knowledge/stats"].is_object());
}
