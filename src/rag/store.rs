//! RagStore trait — abstract interface for the retrieval index.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::core::errors::ApiError;

/// A stored document chunk. Immutable once written.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredChunk {
    /// Unique chunk identifier.
    pub chunk_id: String,
    /// The text content of the chunk.
    pub content: String,
    /// Source identifier (file path the chunk came from).
    pub source: String,
}

/// Result of a similarity search.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkSearchResult {
    pub chunk: StoredChunk,
    /// Cosine similarity (higher = better).
    pub score: f32,
}

/// Abstract trait for retrieval-index backends.
///
/// The index is written once at ingest time and read-only during queries.
#[async_trait]
pub trait RagStore: Send + Sync {
    /// Insert chunks with their embedding vectors in one batch.
    async fn insert_batch(&self, items: Vec<(StoredChunk, Vec<f32>)>) -> Result<(), ApiError>;

    /// Search for the chunks most similar to the query embedding,
    /// best score first.
    async fn search(
        &self,
        query_embedding: &[f32],
        limit: usize,
    ) -> Result<Vec<ChunkSearchResult>, ApiError>;

    /// Total number of stored chunks.
    async fn count(&self) -> Result<usize, ApiError>;

    /// Drop all stored chunks (used before a corpus rebuild).
    async fn clear(&self) -> Result<(), ApiError>;
}
