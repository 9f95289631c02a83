//! Retrieval engine: ingests a text corpus into the vector store and
//! answers top-k similarity lookups for the comparison path.

use std::path::Path;
use std::sync::Arc;

use uuid::Uuid;
use walkdir::WalkDir;

use super::splitter::split_into_chunks;
use super::store::{ChunkSearchResult, RagStore, StoredChunk};
use crate::core::config::RetrievalSettings;
use crate::core::errors::ApiError;
use crate::llm::LlmProvider;

/// Number of chunks embedded per provider call during ingest.
const EMBED_BATCH: usize = 32;

#[derive(Clone)]
pub struct RagEngine {
    store: Arc<dyn RagStore>,
    provider: Arc<dyn LlmProvider>,
    embedding_model: String,
    chunk_size: usize,
    chunk_overlap: usize,
}

impl RagEngine {
    pub fn new(
        store: Arc<dyn RagStore>,
        provider: Arc<dyn LlmProvider>,
        embedding_model: String,
        retrieval: &RetrievalSettings,
    ) -> Self {
        Self {
            store,
            provider,
            embedding_model,
            chunk_size: retrieval.chunk_size,
            chunk_overlap: retrieval.chunk_overlap,
        }
    }

    /// Walks `dir` for `.txt` files, splits them into overlapping chunks,
    /// embeds each chunk, and writes everything to the store. Returns the
    /// number of chunks ingested.
    pub async fn ingest_dir(&self, dir: &Path) -> Result<usize, ApiError> {
        let mut documents = 0usize;
        let mut chunks = Vec::new();

        for entry in WalkDir::new(dir).into_iter().filter_map(|e| e.ok()) {
            let path = entry.path();
            if !path.is_file() || path.extension().and_then(|e| e.to_str()) != Some("txt") {
                continue;
            }

            let text = match tokio::fs::read_to_string(path).await {
                Ok(text) => text,
                Err(err) => {
                    tracing::warn!("Skipping unreadable file {}: {}", path.display(), err);
                    continue;
                }
            };

            documents += 1;
            let source = path.display().to_string();
            chunks.extend(split_into_chunks(
                &text,
                &source,
                self.chunk_size,
                self.chunk_overlap,
            ));
        }

        let total = chunks.len();
        for batch in chunks.chunks(EMBED_BATCH) {
            let inputs: Vec<String> = batch.iter().map(|c| c.text.clone()).collect();
            let embeddings = self
                .provider
                .embed(&inputs, &self.embedding_model)
                .await?;

            if embeddings.len() != batch.len() {
                return Err(ApiError::Internal(format!(
                    "Embedding count mismatch: {} chunks, {} vectors",
                    batch.len(),
                    embeddings.len()
                )));
            }

            let items = batch
                .iter()
                .zip(embeddings)
                .map(|(chunk, embedding)| {
                    let stored = StoredChunk {
                        chunk_id: Uuid::new_v4().to_string(),
                        content: chunk.text.clone(),
                        source: chunk.source.clone(),
                    };
                    (stored, embedding)
                })
                .collect();

            self.store.insert_batch(items).await?;
        }

        tracing::info!("Loaded {} documents, created {} chunks", documents, total);
        Ok(total)
    }

    /// Drops the existing index and ingests `dir` from scratch.
    pub async fn rebuild_from_dir(&self, dir: &Path) -> Result<usize, ApiError> {
        self.store.clear().await?;
        self.ingest_dir(dir).await
    }

    /// Embeds the question and returns the k most similar stored chunks.
    pub async fn retrieve(
        &self,
        question: &str,
        k: usize,
    ) -> Result<Vec<ChunkSearchResult>, ApiError> {
        let embeddings = self
            .provider
            .embed(&[question.to_string()], &self.embedding_model)
            .await?;

        let query_embedding = embeddings
            .first()
            .ok_or_else(|| ApiError::Internal("Empty embedding response".to_string()))?;

        self.store.search(query_embedding, k).await
    }

    pub async fn chunk_count(&self) -> Result<usize, ApiError> {
        self.store.count().await
    }
}
