use std::sync::Arc;

use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;

use crate::state::AppState;

/// Lists the configured comparison models, plus whatever the inference
/// daemon currently has installed (empty when it is unreachable).
pub async fn list_models(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let installed: Vec<String> = match state.provider.list_models().await {
        Ok(models) => models.into_iter().map(|m| m.id).collect(),
        Err(err) => {
            tracing::warn!("Failed to list provider models: {}", err);
            Vec::new()
        }
    };

    Json(json!({
        "models": state.settings.models.compare,
        "installed": installed,
    }))
}
