//! Test doubles for the provider and store seams, shared across modules.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::core::errors::ApiError;
use crate::llm::types::ProviderModel;
use crate::llm::{ChatRequest, LlmProvider};
use crate::rag::{ChunkSearchResult, RagStore, StoredChunk};

/// Provider with scripted per-model answers, failures, and delays.
/// Counts chat and embed calls so tests can observe what ran.
#[derive(Default)]
pub struct ScriptedProvider {
    pub answers: HashMap<String, String>,
    pub failing: Vec<String>,
    pub delays_ms: HashMap<String, u64>,
    pub chat_calls: AtomicUsize,
    pub embed_calls: AtomicUsize,
}

#[async_trait]
impl LlmProvider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn health_check(&self) -> Result<bool, ApiError> {
        Ok(true)
    }

    async fn list_models(&self) -> Result<Vec<ProviderModel>, ApiError> {
        Ok(vec![])
    }

    async fn chat(&self, _request: ChatRequest, model_id: &str) -> Result<String, ApiError> {
        self.chat_calls.fetch_add(1, Ordering::SeqCst);

        if let Some(ms) = self.delays_ms.get(model_id) {
            tokio::time::sleep(Duration::from_millis(*ms)).await;
        }
        if self.failing.iter().any(|m| m == model_id) {
            return Err(ApiError::Internal(format!("model {} exploded", model_id)));
        }

        Ok(self
            .answers
            .get(model_id)
            .cloned()
            .unwrap_or_else(|| format!("answer from {}", model_id)))
    }

    async fn embed(&self, inputs: &[String], _model_id: &str) -> Result<Vec<Vec<f32>>, ApiError> {
        self.embed_calls.fetch_add(1, Ordering::SeqCst);
        Ok(vec![vec![1.0, 0.0]; inputs.len()])
    }
}

/// In-memory store returning stored chunks in insertion order.
#[derive(Default)]
pub struct MemoryStore {
    pub chunks: RwLock<Vec<StoredChunk>>,
}

#[async_trait]
impl RagStore for MemoryStore {
    async fn insert_batch(&self, items: Vec<(StoredChunk, Vec<f32>)>) -> Result<(), ApiError> {
        let mut chunks = self.chunks.write().await;
        chunks.extend(items.into_iter().map(|(chunk, _)| chunk));
        Ok(())
    }

    async fn search(
        &self,
        _query_embedding: &[f32],
        limit: usize,
    ) -> Result<Vec<ChunkSearchResult>, ApiError> {
        let chunks = self.chunks.read().await;
        Ok(chunks
            .iter()
            .take(limit)
            .map(|chunk| ChunkSearchResult {
                chunk: chunk.clone(),
                score: 1.0,
            })
            .collect())
    }

    async fn count(&self) -> Result<usize, ApiError> {
        Ok(self.chunks.read().await.len())
    }

    async fn clear(&self) -> Result<(), ApiError> {
        self.chunks.write().await.clear();
        Ok(())
    }
}
