//! Append-only in-memory semantic index using cosine similarity.
//!
//! [`SemanticIndex`] keeps `(chunk, vector)` entries in a `Vec` behind a
//! `tokio::sync::RwLock`. Queries take the read lock; ingestion takes the
//! write lock only to append, after all embedding calls have finished.
//!
//! The index is built once by [`initialize`] and handed to the pipeline
//! explicitly, usually wrapped in an `Arc`.

use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::{debug, error, info};

use crate::chunking::chunker_for;
use crate::config::RagConfig;
use crate::document::{Chunk, Document, SearchResult};
use crate::embedding::EmbeddingProvider;
use crate::error::{RagError, Result};

/// Default number of results returned by [`SemanticIndex::search`].
pub const DEFAULT_TOP_K: usize = 4;

struct IndexEntry {
    chunk: Chunk,
    vector: Vec<f32>,
}

/// A nearest-neighbour index over chunk embeddings.
///
/// Membership only grows: there is no update or delete path, and identical
/// text added twice is stored twice.
///
/// # Example
///
/// ```rust,ignore
/// use serene_rag::SemanticIndex;
///
/// let index = SemanticIndex::new(embedder);
/// index.add(&chunks).await?;
/// let hits = index.search("how can I calm down?", 4).await?;
/// ```
pub struct SemanticIndex {
    embedder: Arc<dyn EmbeddingProvider>,
    entries: RwLock<Vec<IndexEntry>>,
}

impl std::fmt::Debug for SemanticIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SemanticIndex").field("embedder", &self.embedder.name()).finish()
    }
}

/// Compute cosine similarity between two vectors.
///
/// Returns 0.0 if either vector has zero magnitude.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

impl SemanticIndex {
    /// Create an empty index that embeds with `embedder`.
    pub fn new(embedder: Arc<dyn EmbeddingProvider>) -> Self {
        Self { embedder, entries: RwLock::new(Vec::new()) }
    }

    /// Embed and append `chunks`. Returns the number of entries added.
    ///
    /// # Errors
    ///
    /// Propagates the embedding provider's error; nothing is appended when
    /// any chunk fails to embed.
    pub async fn add(&self, chunks: &[Chunk]) -> Result<usize> {
        if chunks.is_empty() {
            return Ok(0);
        }

        let texts: Vec<&str> = chunks.iter().map(|c| c.text.as_str()).collect();
        let vectors = self.embedder.embed_batch(&texts).await.map_err(|e| {
            error!(provider = self.embedder.name(), error = %e, "embedding failed during add");
            e
        })?;

        if vectors.len() != chunks.len() {
            return Err(RagError::EmbeddingError {
                provider: self.embedder.name().to_string(),
                message: format!("expected {} vectors, received {}", chunks.len(), vectors.len()),
            });
        }

        let mut entries = self.entries.write().await;
        entries.extend(
            chunks.iter().cloned().zip(vectors).map(|(chunk, vector)| IndexEntry { chunk, vector }),
        );
        debug!(added = chunks.len(), total = entries.len(), "index grew");
        Ok(chunks.len())
    }

    /// Return up to `top_k` chunks most similar to `query`, best first.
    ///
    /// Ties keep insertion order. An empty index yields an empty result
    /// without calling the embedding provider.
    ///
    /// # Errors
    ///
    /// Propagates the embedding provider's error rather than returning an
    /// empty result.
    pub async fn search(&self, query: &str, top_k: usize) -> Result<Vec<SearchResult>> {
        if self.is_empty().await {
            return Ok(Vec::new());
        }

        let query_vector = self.embedder.embed(query).await.map_err(|e| {
            error!(provider = self.embedder.name(), error = %e, "embedding failed during search");
            e
        })?;

        let entries = self.entries.read().await;
        let mut scored: Vec<SearchResult> = entries
            .iter()
            .map(|entry| SearchResult {
                chunk: entry.chunk.clone(),
                score: cosine_similarity(&entry.vector, &query_vector),
            })
            .collect();

        scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(top_k);
        Ok(scored)
    }

    /// Number of stored entries.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    /// Whether the index holds no entries.
    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    /// Snapshot of every stored chunk, in insertion order.
    pub async fn chunks(&self) -> Vec<Chunk> {
        self.entries.read().await.iter().map(|e| e.chunk.clone()).collect()
    }
}

/// Chunk every document with the strategy in `config` and embed the chunks
/// into a fresh [`SemanticIndex`].
///
/// Called once by the process entry point before any query is served.
///
/// # Errors
///
/// Returns [`RagError::ConfigError`] for an invalid chunk configuration and
/// the embedding provider's error if any document fails to embed.
pub async fn initialize(
    documents: &[Document],
    config: &RagConfig,
    embedder: Arc<dyn EmbeddingProvider>,
) -> Result<SemanticIndex> {
    config.validate()?;
    let chunker = chunker_for(config)?;
    let index = SemanticIndex::new(embedder);

    for document in documents {
        let chunks = chunker.chunk(document);
        let added = index.add(&chunks).await.map_err(|e| {
            error!(document.id = %document.id, error = %e, "ingestion failed");
            e
        })?;
        info!(
            document.id = %document.id,
            source = %document.source,
            chunk_count = added,
            "ingested document"
        );
    }

    info!(documents = documents.len(), entries = index.len().await, "semantic index ready");
    Ok(index)
}
