use std::sync::Arc;

use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;

use crate::state::AppState;

pub async fn index(State(_state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(json!({
        "message": "RAG Multi-LLM Comparison API",
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": {
            "/query": "POST - Query documents with multiple LLMs",
            "/models": "GET - List configured models",
            "/health": "GET - Health check",
            "/metrics": "GET - Prometheus metrics"
        }
    }))
}

pub async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let chunks = state.rag.chunk_count().await.unwrap_or(0);
    let ollama = state.provider.health_check().await.unwrap_or(false);

    Json(json!({
        "status": "healthy",
        "vectorstore_chunks": chunks,
        "ollama_reachable": ollama,
        "started_at": state.started_at.to_rfc3339(),
    }))
}
