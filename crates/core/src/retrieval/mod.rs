//! Knowledge-base retrieval service.
//!
//! Semantic search over an embedded chunk index, with a keyword-scoring
//! fallback that keeps the gateway answering when the vector store is
//! disabled, still indexing, or the embedding service is down.

pub mod chunker;
pub mod embedding;
pub mod keyword;
pub mod store;

use embedding::{EmbeddingClient, EmbeddingError};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use store::{IndexError, VectorStore};
use tracing::{info, warn};

/// Default number of results returned to a tool call.
pub const DEFAULT_RESULTS: usize = 3;

const NO_RESULTS_MESSAGE: &str =
    "No information found for this query. Please check the help center directly.";
const CORPUS_MISSING_MESSAGE: &str =
    "The knowledge base is not available right now. Please try again later.";

/// Fatal retrieval error. Only indexing surfaces these; queries always
/// degrade to the fallback and return text.
#[derive(Debug, thiserror::Error)]
pub enum RetrievalError {
    #[error("corpus file {} is missing", .0.display())]
    CorpusMissing(PathBuf),
    #[error(transparent)]
    Index(#[from] IndexError),
}

/// Snapshot of the service for the stats endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct RetrievalStats {
    pub mode: &'static str,
    pub indexed_chunks: usize,
    pub persist_dir: Option<String>,
    pub embedding_model: Option<String>,
    pub corpus_path: String,
}

/// The retrieval service. Cheap to share; read-only after construction apart
/// from the one-shot index build.
pub struct RetrievalService {
    corpus_path: PathBuf,
    semantic: Option<SemanticBackend>,
}

struct SemanticBackend {
    store: Arc<VectorStore>,
    embedder: Arc<dyn EmbeddingClient>,
    model: String,
}

impl RetrievalService {
    /// A service that only ever uses the keyword fallback.
    pub fn keyword_only(corpus_path: impl Into<PathBuf>) -> Self {
        Self {
            corpus_path: corpus_path.into(),
            semantic: None,
        }
    }

    /// A service backed by a vector store, falling back to keywords when the
    /// store or the embedding service is unavailable.
    pub fn with_vector_store(
        corpus_path: impl Into<PathBuf>,
        store: Arc<VectorStore>,
        embedder: Arc<dyn EmbeddingClient>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            corpus_path: corpus_path.into(),
            semantic: Some(SemanticBackend {
                store,
                embedder,
                model: model.into(),
            }),
        }
    }

    pub fn corpus_path(&self) -> &Path {
        &self.corpus_path
    }

    /// Builds the vector index if this service has one. A missing corpus file
    /// is fatal here, as is any embedding failure during indexing.
    pub async fn ensure_indexed(&self, force_reindex: bool) -> Result<usize, RetrievalError> {
        if !self.corpus_path.exists() {
            return Err(RetrievalError::CorpusMissing(self.corpus_path.clone()));
        }
        let Some(semantic) = &self.semantic else {
            return Ok(0);
        };
        let count = semantic
            .store
            .index_corpus(&self.corpus_path, semantic.embedder.as_ref(), force_reindex)
            .await?;
        Ok(count)
    }

    /// Answers a query with up to `k` formatted passages. Never fails: any
    /// semantic-path problem downgrades to the keyword fallback, and an empty
    /// result becomes a fixed no-results message.
    pub async fn search(&self, query: &str, k: usize) -> String {
        let k = k.max(1);
        if let Some(semantic) = &self.semantic {
            if !semantic.store.is_empty() {
                match self.semantic_search(semantic, query, k).await {
                    Ok(Some(text)) => return text,
                    Ok(None) => return NO_RESULTS_MESSAGE.to_string(),
                    Err(e) => {
                        warn!(error = %e, "semantic search failed, using keyword fallback");
                    }
                }
            }
        }
        self.fallback_search(query, k)
    }

    async fn semantic_search(
        &self,
        semantic: &SemanticBackend,
        query: &str,
        k: usize,
    ) -> Result<Option<String>, EmbeddingError> {
        let mut vectors = semantic.embedder.embed(vec![query.to_string()]).await?;
        let query_vec = vectors.pop().ok_or(EmbeddingError::MissingVector(0))?;

        // Over-fetch so exact-duplicate chunks can be dropped.
        let hits = semantic.store.top_matches(&query_vec, k * 2);
        let mut results: Vec<String> = Vec::new();
        let mut seen: Vec<&str> = Vec::new();
        for hit in &hits {
            if seen.contains(&hit.record.text.as_str()) {
                continue;
            }
            seen.push(hit.record.text.as_str());
            let formatted = if hit.record.metadata.title.is_empty() {
                hit.record.text.clone()
            } else {
                format!("[{}]\n{}", hit.record.metadata.title, hit.record.text)
            };
            results.push(formatted);
            if results.len() >= k {
                break;
            }
        }
        if results.is_empty() {
            return Ok(None);
        }
        info!(results = results.len(), "semantic search served query");
        Ok(Some(results.join("\n\n---\n\n")))
    }

    fn fallback_search(&self, query: &str, k: usize) -> String {
        let corpus = match std::fs::read_to_string(&self.corpus_path) {
            Ok(corpus) => corpus,
            Err(e) => {
                warn!(path = %self.corpus_path.display(), error = %e, "corpus unreadable");
                return CORPUS_MISSING_MESSAGE.to_string();
            }
        };
        match keyword::keyword_search(&corpus, query, k) {
            Some(text) => text,
            None => NO_RESULTS_MESSAGE.to_string(),
        }
    }

    pub fn stats(&self) -> RetrievalStats {
        match &self.semantic {
            Some(semantic) => RetrievalStats {
                mode: if semantic.store.is_empty() {
                    "keyword"
                } else {
                    "vector"
                },
                indexed_chunks: semantic.store.len(),
                persist_dir: Some(semantic.store.persist_dir().display().to_string()),
                embedding_model: Some(semantic.model.clone()),
                corpus_path: self.corpus_path.display().to_string(),
            },
            None => RetrievalStats {
                mode: "keyword",
                indexed_chunks: 0,
                persist_dir: None,
                embedding_model: None,
                corpus_path: self.corpus_path.display().to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::chunker::section_delimiter;
    use super::embedding::{EmbeddingClient, EmbeddingError};
    use super::store::VectorStore;
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, Ordering};

    /// Deterministic embedder: projects text onto fixed keyword axes so
    /// related texts land near each other without a real service.
    struct FakeEmbedder {
        fail: AtomicBool,
    }

    impl FakeEmbedder {
        fn new() -> Self {
            Self {
                fail: AtomicBool::new(false),
            }
        }

        fn fail_next(&self) {
            self.fail.store(true, Ordering::SeqCst);
        }

        fn vector_for(text: &str) -> Vec<f32> {
            let lower = text.to_lowercase();
            let axes = ["freeze", "card", "savings", "interest", "delivery"];
            axes.iter()
                .map(|axis| lower.matches(axis).count() as f32)
                .collect()
        }
    }

    #[async_trait]
    impl EmbeddingClient for FakeEmbedder {
        async fn embed(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>, EmbeddingError> {
            if self.fail.swap(false, Ordering::SeqCst) {
                return Err(EmbeddingError::Request("service offline".into()));
            }
            Ok(texts.iter().map(|t| Self::vector_for(t)).collect())
        }
    }

    fn write_corpus(dir: &Path) -> PathBuf {
        let delimiter = section_delimiter();
        let corpus = [
            (
                "How to freeze your card",
                "You can freeze your card instantly from the app. A frozen card blocks all new \
                 transactions until you unfreeze it. Freeze and unfreeze as often as you like.",
            ),
            (
                "Savings interest",
                "Savings pockets earn interest daily and pay monthly. The savings interest rate \
                 is published in the app and may change with notice at any time.",
            ),
        ]
        .iter()
        .map(|(title, body)| format!("SOURCE: https://help.example.com\nTITLE: {title}\n\n{body}"))
        .collect::<Vec<_>>()
        .join(&format!("\n{delimiter}\n"));
        let path = dir.join("corpus.txt");
        std::fs::write(&path, corpus).unwrap();
        path
    }

    fn temp_dir() -> PathBuf {
        let dir = std::env::temp_dir().join(format!("teller-retrieval-{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[tokio::test]
    async fn semantic_search_returns_titled_passages() {
        let dir = temp_dir();
        let corpus = write_corpus(&dir);
        let store = Arc::new(VectorStore::open(dir.join("index")).unwrap());
        let embedder = Arc::new(FakeEmbedder::new());
        let service = RetrievalService::with_vector_store(
            &corpus,
            store,
            embedder,
            "text-embedding-ada-002",
        );
        service.ensure_indexed(false).await.unwrap();

        let answer = service.search("freeze card", 3).await;
        assert!(answer.starts_with("[How to freeze your card]"), "got: {answer}");
        std::fs::remove_dir_all(&dir).ok();
    }

    #[tokio::test]
    async fn reindexing_twice_is_deterministic() {
        let dir = temp_dir();
        let corpus = write_corpus(&dir);
        let store = Arc::new(VectorStore::open(dir.join("index")).unwrap());
        let embedder = Arc::new(FakeEmbedder::new());
        let service = RetrievalService::with_vector_store(
            &corpus,
            store.clone(),
            embedder,
            "text-embedding-ada-002",
        );

        let first = service.ensure_indexed(true).await.unwrap();
        let answer_one = service.search("savings interest", 2).await;
        let second = service.ensure_indexed(true).await.unwrap();
        let answer_two = service.search("savings interest", 2).await;

        assert_eq!(first, second);
        assert_eq!(answer_one, answer_two);
        std::fs::remove_dir_all(&dir).ok();
    }

    #[tokio::test]
    async fn embedding_failure_at_query_time_falls_back() {
        let dir = temp_dir();
        let corpus = write_corpus(&dir);
        let store = Arc::new(VectorStore::open(dir.join("index")).unwrap());
        let embedder = Arc::new(FakeEmbedder::new());
        let service = RetrievalService::with_vector_store(
            &corpus,
            store,
            embedder.clone(),
            "text-embedding-ada-002",
        );
        service.ensure_indexed(false).await.unwrap();

        embedder.fail_next();
        let answer = service.search("freeze card", 3).await;
        // Keyword fallback still finds the right section.
        assert!(answer.contains("freeze your card"), "got: {answer}");
        std::fs::remove_dir_all(&dir).ok();
    }

    #[tokio::test]
    async fn keyword_only_service_answers_from_corpus() {
        let dir = temp_dir();
        let corpus = write_corpus(&dir);
        let service = RetrievalService::keyword_only(&corpus);
        let answer = service.search("savings interest rate", 3).await;
        assert!(answer.contains("[Savings interest]"), "got: {answer}");
        std::fs::remove_dir_all(&dir).ok();
    }

    #[tokio::test]
    async fn missing_corpus_is_fatal_for_indexing_only() {
        let dir = temp_dir();
        let service = RetrievalService::keyword_only(dir.join("missing.txt"));
        assert!(matches!(
            service.ensure_indexed(false).await,
            Err(RetrievalError::CorpusMissing(_))
        ));
        // Queries degrade to a message instead of failing.
        let answer = service.search("anything", 3).await;
        assert_eq!(answer, CORPUS_MISSING_MESSAGE);
        std::fs::remove_dir_all(&dir).ok();
    }

    #[tokio::test]
    async fn unknown_topic_returns_no_results_message() {
        let dir = temp_dir();
        let corpus = write_corpus(&dir);
        let service = RetrievalService::keyword_only(&corpus);
        let answer = service.search("cryptocurrency futures", 3).await;
        assert_eq!(answer, NO_RESULTS_MESSAGE);
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn stats_reflect_mode() {
        let service = RetrievalService::keyword_only("corpus.txt");
        let stats = service.stats();
        assert_eq!(stats.mode, "keyword");
        assert_eq!(stats.indexed_chunks, 0);
    }
}
