//! The comparison engine: one question, N models, one result per model.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use tokio::task::JoinSet;

use super::types::{ComparisonResults, ModelResult};
use crate::core::errors::ApiError;
use crate::llm::{ChatMessage, ChatRequest, LlmProvider};
use crate::rag::RagEngine;

/// Maximum characters of a retrieved chunk returned as a source excerpt.
const SOURCE_EXCERPT_CHARS: usize = 200;

/// Stateless orchestrator bound to an ordered model list and a pre-built
/// retrieval engine. Cheap to construct per request.
#[derive(Clone)]
pub struct ModelComparison {
    models: Vec<String>,
    rag: RagEngine,
    provider: Arc<dyn LlmProvider>,
}

impl ModelComparison {
    pub fn new(models: Vec<String>, rag: RagEngine, provider: Arc<dyn LlmProvider>) -> Self {
        Self {
            models,
            rag,
            provider,
        }
    }

    pub fn models(&self) -> &[String] {
        &self.models
    }

    /// Queries one model and always produces a result: any store or provider
    /// error becomes a degraded entry instead of aborting the batch.
    pub async fn query_single_model(&self, model: &str, question: &str, k: usize) -> ModelResult {
        let start = Instant::now();

        match self.run_query(model, question, k).await {
            Ok((answer, sources)) => {
                let elapsed = start.elapsed().as_secs_f64();
                ModelResult::from_answer(model, answer, elapsed, sources)
            }
            Err(err) => {
                tracing::warn!("Model {} failed: {}", model, err);
                ModelResult::failure(model, err.message())
            }
        }
    }

    async fn run_query(
        &self,
        model: &str,
        question: &str,
        k: usize,
    ) -> Result<(String, Vec<String>), ApiError> {
        let hits = self.rag.retrieve(question, k).await?;

        let context = hits
            .iter()
            .map(|hit| hit.chunk.content.as_str())
            .collect::<Vec<_>>()
            .join("\n\n");

        let prompt = format!(
            "Answer the question based on the following context:\n\n\
             Context:\n{context}\n\n\
             Question: {question}\n\n\
             Answer:"
        );

        let request = ChatRequest::new(vec![ChatMessage::user(prompt)]);
        let answer = self.provider.chat(request, model).await?;

        let sources = hits
            .iter()
            .map(|hit| truncate_chars(&hit.chunk.content, SOURCE_EXCERPT_CHARS))
            .collect();

        Ok((answer, sources))
    }

    /// Runs the full batch. Concurrent mode launches one task per model and
    /// re-orders completions back to the input list order; sequential mode
    /// walks the list one model at a time.
    pub async fn compare(&self, question: &str, k: usize, parallel: bool) -> ComparisonResults {
        if parallel {
            self.compare_parallel(question, k).await
        } else {
            self.compare_sequential(question, k).await
        }
    }

    async fn compare_parallel(&self, question: &str, k: usize) -> ComparisonResults {
        let mut set = JoinSet::new();

        for model in self.models.clone() {
            let engine = self.clone();
            let question = question.to_string();
            set.spawn(async move { engine.query_single_model(&model, &question, k).await });
        }

        let mut by_model: HashMap<String, ModelResult> = HashMap::new();
        while let Some(joined) = set.join_next().await {
            match joined {
                Ok(result) => {
                    tracing::info!("Completed: {} in {}s", result.model, result.time);
                    by_model.insert(result.model.clone(), result);
                }
                Err(err) => {
                    tracing::error!("Comparison worker failed to join: {}", err);
                }
            }
        }

        // Completion order is non-deterministic; restore the caller's order.
        let ordered = self
            .models
            .iter()
            .map(|model| {
                by_model
                    .remove(model)
                    .unwrap_or_else(|| ModelResult::failure(model, "worker panicked"))
            })
            .collect();

        ComparisonResults::new(ordered)
    }

    async fn compare_sequential(&self, question: &str, k: usize) -> ComparisonResults {
        let mut results = Vec::with_capacity(self.models.len());

        for model in &self.models {
            tracing::info!("Querying {}...", model);
            results.push(self.query_single_model(model, question, k).await);
        }

        ComparisonResults::new(results)
    }
}

fn truncate_chars(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}
