//! Health check endpoint

use axum::{extract::State, Json};
use serde::Serialize;

use crate::state::SharedState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub model_loaded: bool,
}

/// GET /health - reports whether the model is loaded.
///
/// O(1), never touches the model, never fails once the process accepts
/// traffic.
pub async fn health_check(State(state): State<SharedState>) -> Json<HealthResponse> {
    let model_loaded = state.model_loaded();
    Json(HealthResponse {
        status: if model_loaded { "healthy" } else { "unhealthy" }.to_string(),
        model_loaded,
    })
}
