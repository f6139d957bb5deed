//! On-disk vector store with in-memory cosine search.
//!
//! The store is an owned handle injected into the retrieval service at boot.
//! Indexing writes once; afterwards the record set is read-only and searched
//! concurrently by sessions.

use super::chunker::{chunk_corpus, ChunkMetadata};
use super::embedding::{EmbeddingClient, EmbeddingError};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::RwLock;
use tracing::info;

/// Embedding batches never exceed this many chunks per request.
pub const EMBED_BATCH_SIZE: usize = 50;

const INDEX_FILE: &str = "index.json";

/// Indexing failure. Any embedding error during indexing is fatal for the
/// indexing pass; the store keeps whatever index it had before.
#[derive(Debug, thiserror::Error)]
pub enum IndexError {
    #[error("failed to read corpus file {}", .0.display())]
    CorpusRead(PathBuf, #[source] std::io::Error),
    #[error(transparent)]
    Embedding(#[from] EmbeddingError),
    #[error("failed to persist index to {}", .0.display())]
    Persist(PathBuf, #[source] std::io::Error),
    #[error("failed to encode index")]
    Encode(#[source] serde_json::Error),
}

/// One indexed chunk: id, text, dense vector, and provenance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkRecord {
    pub id: String,
    pub text: String,
    pub embedding: Vec<f32>,
    pub metadata: ChunkMetadata,
}

/// A scored search hit.
#[derive(Debug, Clone)]
pub struct ScoredChunk {
    pub score: f32,
    pub record: ChunkRecord,
}

pub struct VectorStore {
    persist_dir: PathBuf,
    records: RwLock<Vec<ChunkRecord>>,
}

impl VectorStore {
    /// Opens the store at `persist_dir`, loading a previously persisted index
    /// when one exists.
    pub fn open(persist_dir: impl Into<PathBuf>) -> std::io::Result<Self> {
        let persist_dir = persist_dir.into();
        std::fs::create_dir_all(&persist_dir)?;
        let index_path = persist_dir.join(INDEX_FILE);
        let records = if index_path.exists() {
            let raw = std::fs::read_to_string(&index_path)?;
            match serde_json::from_str::<Vec<ChunkRecord>>(&raw) {
                Ok(records) => {
                    info!(count = records.len(), "loaded persisted vector index");
                    records
                }
                Err(e) => {
                    tracing::warn!(error = %e, "persisted index unreadable, starting empty");
                    Vec::new()
                }
            }
        } else {
            Vec::new()
        };
        Ok(Self {
            persist_dir,
            records: RwLock::new(records),
        })
    }

    pub fn len(&self) -> usize {
        self.records.read().expect("store lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn persist_dir(&self) -> &Path {
        &self.persist_dir
    }

    /// Chunks and embeds the corpus, then persists the index. A populated
    /// store is left untouched unless `force_reindex` is set. Returns the
    /// number of indexed chunks.
    pub async fn index_corpus(
        &self,
        corpus_path: &Path,
        embedder: &dyn EmbeddingClient,
        force_reindex: bool,
    ) -> Result<usize, IndexError> {
        let existing = self.len();
        if existing > 0 && !force_reindex {
            info!(count = existing, "vector index already populated, skipping");
            return Ok(existing);
        }

        let corpus = std::fs::read_to_string(corpus_path)
            .map_err(|e| IndexError::CorpusRead(corpus_path.to_path_buf(), e))?;
        let chunks = chunk_corpus(&corpus);
        info!(chunks = chunks.len(), "chunked corpus for indexing");

        let mut records = Vec::with_capacity(chunks.len());
        for batch in chunks.chunks(EMBED_BATCH_SIZE) {
            let texts: Vec<String> = batch.iter().map(|c| c.text.clone()).collect();
            let vectors = embedder.embed(texts).await?;
            for (chunk, embedding) in batch.iter().zip(vectors) {
                records.push(ChunkRecord {
                    id: chunk.id.clone(),
                    text: chunk.text.clone(),
                    embedding,
                    metadata: chunk.metadata.clone(),
                });
            }
        }

        let encoded = serde_json::to_string(&records).map_err(IndexError::Encode)?;
        let index_path = self.persist_dir.join(INDEX_FILE);
        std::fs::write(&index_path, encoded)
            .map_err(|e| IndexError::Persist(index_path.clone(), e))?;

        let count = records.len();
        *self.records.write().expect("store lock poisoned") = records;
        info!(count, path = %index_path.display(), "vector index persisted");
        Ok(count)
    }

    /// Returns the `n` records nearest to `query` by cosine similarity,
    /// most similar first.
    pub fn top_matches(&self, query: &[f32], n: usize) -> Vec<ScoredChunk> {
        let records = self.records.read().expect("store lock poisoned");
        let mut scored: Vec<ScoredChunk> = records
            .iter()
            .map(|record| ScoredChunk {
                score: cosine_similarity(query, &record.embedding),
                record: record.clone(),
            })
            .collect();
        scored.sort_by(|a, b| b.score.total_cmp(&a.score));
        scored.truncate(n);
        scored
    }
}

/// Cosine similarity of two vectors; zero when either has no magnitude.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let len = a.len().min(b.len());
    let mut dot = 0.0f64;
    let mut norm_a = 0.0f64;
    let mut norm_b = 0.0f64;
    for i in 0..len {
        dot += f64::from(a[i]) * f64::from(b[i]);
        norm_a += f64::from(a[i]) * f64::from(a[i]);
        norm_b += f64::from(b[i]) * f64::from(b[i]);
    }
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    (dot / (norm_a.sqrt() * norm_b.sqrt())) as f32
}
