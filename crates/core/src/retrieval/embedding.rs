//! Embedding service client.

use async_openai::{config::OpenAIConfig, types::CreateEmbeddingRequestArgs, Client};
use async_trait::async_trait;

/// Failure talking to the embedding service.
#[derive(Debug, thiserror::Error)]
pub enum EmbeddingError {
    #[error("embedding request failed: {0}")]
    Request(String),
    #[error("embedding response is missing a vector for input {0}")]
    MissingVector(usize),
}

/// A service that turns text into fixed-dimension dense vectors.
#[async_trait]
pub trait EmbeddingClient: Send + Sync {
    /// Embeds a batch of texts, returning one vector per input in order.
    async fn embed(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>, EmbeddingError>;
}

/// An `EmbeddingClient` backed by any OpenAI-compatible embeddings endpoint.
pub struct OpenAICompatibleEmbedder {
    client: Client<OpenAIConfig>,
    model: String,
}

impl OpenAICompatibleEmbedder {
    /// Creates a new embedder.
    ///
    /// # Arguments
    ///
    /// * `config` - Client configuration, including API key and base URL.
    /// * `model` - The embedding model identifier (e.g. "text-embedding-ada-002").
    pub fn new(config: OpenAIConfig, model: String) -> Self {
        Self {
            client: Client::with_config(config),
            model,
        }
    }
}

#[async_trait]
impl EmbeddingClient for OpenAICompatibleEmbedder {
    async fn embed(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        let expected = texts.len();
        let request = CreateEmbeddingRequestArgs::default()
            .model(&self.model)
            .input(texts)
            .build()
            .map_err(|e| EmbeddingError::Request(e.to_string()))?;

        let response = self
            .client
            .embeddings()
            .create(request)
            .await
            .map_err(|e| EmbeddingError::Request(e.to_string()))?;

        let mut vectors: Vec<Option<Vec<f32>>> = vec![None; expected];
        for item in response.data {
            let index = item.index as usize;
            if index < expected {
                vectors[index] = Some(item.embedding);
            }
        }
        vectors
            .into_iter()
            .enumerate()
            .map(|(i, v)| v.ok_or(EmbeddingError::MissingVector(i)))
            .collect()
    }
}
