use std::net::SocketAddr;
use std::path::PathBuf;
use tracing::Level;

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingVar(String),
    #[error("Invalid value for environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub bind_address: SocketAddr,
    /// Base URL of the upstream realtime endpoint (https or wss).
    pub upstream_endpoint: String,
    /// Credential sent as an auxiliary header, never in the URL.
    pub upstream_api_key: String,
    pub upstream_deployment: String,
    pub embedding_endpoint: Option<String>,
    pub embedding_api_key: Option<String>,
    pub embedding_model: String,
    pub backend_api_base: String,
    pub use_vector_store: bool,
    pub knowledge_base_path: PathBuf,
    pub vector_store_dir: PathBuf,
    pub persona_dir: PathBuf,
    /// Exact allowed origins; empty means any origin.
    pub cors_allowed_origins: Vec<String>,
    pub log_level: Level,
}

impl Config {
    /// Loads configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Only load from .env in non-test mode to avoid contamination
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }

        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
        let port = std::env::var("PORT").unwrap_or_else(|_| "8003".to_string());
        let bind_address = format!("{host}:{port}")
            .parse::<SocketAddr>()
            .map_err(|e| ConfigError::InvalidValue("HOST/PORT".to_string(), e.to_string()))?;

        let upstream_endpoint = std::env::var("UPSTREAM_REALTIME_ENDPOINT")
            .map_err(|_| ConfigError::MissingVar("UPSTREAM_REALTIME_ENDPOINT".to_string()))?;
        let upstream_api_key = std::env::var("UPSTREAM_API_KEY")
            .map_err(|_| ConfigError::MissingVar("UPSTREAM_API_KEY".to_string()))?;
        let upstream_deployment = std::env::var("UPSTREAM_DEPLOYMENT_NAME")
            .map_err(|_| ConfigError::MissingVar("UPSTREAM_DEPLOYMENT_NAME".to_string()))?;

        let use_vector_store = match std::env::var("USE_VECTOR_STORE") {
            Ok(raw) => match raw.to_lowercase().as_str() {
                "true" | "1" | "yes" => true,
                "false" | "0" | "no" => false,
                other => {
                    return Err(ConfigError::InvalidValue(
                        "USE_VECTOR_STORE".to_string(),
                        format!("'{other}' is not a boolean"),
                    ));
                }
            },
            Err(_) => true,
        };

        let embedding_endpoint = std::env::var("EMBEDDING_ENDPOINT").ok();
        let embedding_api_key = std::env::var("EMBEDDING_API_KEY").ok();
        let embedding_model = std::env::var("EMBEDDING_MODEL")
            .unwrap_or_else(|_| "text-embedding-ada-002".to_string());

        if use_vector_store {
            if embedding_endpoint.is_none() {
                return Err(ConfigError::MissingVar(
                    "EMBEDDING_ENDPOINT must be set when USE_VECTOR_STORE is true".to_string(),
                ));
            }
            if embedding_api_key.is_none() {
                return Err(ConfigError::MissingVar(
                    "EMBEDDING_API_KEY must be set when USE_VECTOR_STORE is true".to_string(),
                ));
            }
        }

        let backend_api_base = std::env::var("BACKEND_API_BASE")
            .unwrap_or_else(|_| "http://localhost:8004".to_string());

        let knowledge_base_path = std::env::var("KNOWLEDGE_BASE_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("./knowledge/help_consolidated.txt"));
        let vector_store_dir = std::env::var("VECTOR_STORE_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("./vector_store"));
        let persona_dir = std::env::var("PERSONA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("./personas"));

        let cors_allowed_origins = std::env::var("CORS_ALLOWED_ORIGINS")
            .unwrap_or_default()
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect();

        let log_level_str = std::env::var("RUST_LOG").unwrap_or_else(|_| "INFO".to_string());
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        Ok(Self {
            bind_address,
            upstream_endpoint,
            upstream_api_key,
            upstream_deployment,
            embedding_endpoint,
            embedding_api_key,
            embedding_model,
            backend_api_base,
            use_vector_store,
            knowledge_base_path,
            vector_store_dir,
            persona_dir,
            cors_allowed_origins,
            log_level,
        })
    }
}
