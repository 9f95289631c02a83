use std::sync::Arc;
use std::time::Instant;

use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::compare::types::round2;
use crate::compare::{ComparisonResults, ModelComparison};
use crate::core::errors::ApiError;
use crate::state::AppState;

const DEFAULT_K: usize = 3;

#[derive(Debug, Deserialize)]
pub struct QueryRequest {
    pub question: String,
    pub models: Option<Vec<String>>,
    pub k: Option<usize>,
    pub parallel: Option<bool>,
    pub track: Option<bool>,
}

#[derive(Debug, Serialize)]
pub struct QueryResponse {
    pub question: String,
    pub results: ComparisonResults,
    pub total_time: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub run_id: Option<String>,
}

pub async fn query(
    State(state): State<Arc<AppState>>,
    Json(request): Json<QueryRequest>,
) -> Result<Json<QueryResponse>, ApiError> {
    // Request-level validation happens before any retrieval or inference.
    validate_question(&request.question)?;
    let k = validate_k(request.k)?;
    let models = resolve_models(request.models, &state.settings.models.compare);
    let parallel = request.parallel.unwrap_or(true);
    let track = request.track.unwrap_or(true);

    let comparison = ModelComparison::new(models, state.rag.clone(), state.provider.clone());

    let start = Instant::now();
    let results = comparison.compare(&request.question, k, parallel).await;
    let total_time = round2(start.elapsed().as_secs_f64());

    for result in results.iter() {
        state.metrics.record(&result.model, result.time);
    }

    let run_id = if track {
        match state
            .tracker
            .log_run(&request.question, k, parallel, &results, total_time)
            .await
        {
            Ok(run_id) => Some(run_id),
            Err(err) => {
                tracing::warn!("Failed to record run: {}", err);
                None
            }
        }
    } else {
        None
    };

    Ok(Json(QueryResponse {
        question: request.question,
        results,
        total_time,
        run_id,
    }))
}

fn validate_question(question: &str) -> Result<(), ApiError> {
    if question.trim().is_empty() {
        return Err(ApiError::BadRequest("Question cannot be empty".to_string()));
    }
    Ok(())
}

fn validate_k(k: Option<usize>) -> Result<usize, ApiError> {
    match k {
        None => Ok(DEFAULT_K),
        Some(0) => Err(ApiError::BadRequest("k must be positive".to_string())),
        Some(k) => Ok(k),
    }
}

fn resolve_models(requested: Option<Vec<String>>, configured: &[String]) -> Vec<String> {
    match requested {
        Some(models) if !models.is_empty() => models,
        _ => configured.to_vec(),
    }
}
