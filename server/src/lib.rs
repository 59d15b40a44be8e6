//! Cats vs Dogs Inference Service
//!
//! Serves a trained checkpoint behind `/predict`, `/predict/batch`,
//! `/health` and `/metrics`. Exactly one checkpoint is loaded before the
//! service accepts predict traffic; if none is found the service stays up,
//! reports `model_loaded: false` and answers predicts with a not-ready
//! error until restarted with a valid checkpoint.

pub mod metrics;
pub mod routes;
pub mod state;

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::state::SharedState;

/// Maximum accepted upload size (covers large photos)
const MAX_UPLOAD_BYTES: usize = 16 * 1024 * 1024;

/// Build the service router over the shared state
pub fn router(state: SharedState) -> Router {
    Router::new()
        .route("/health", get(routes::health::health_check))
        .route("/predict", post(routes::predict::predict))
        .route("/predict/batch", post(routes::predict::predict_batch))
        .route("/metrics", get(routes::metrics::metrics))
        .with_state(state)
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
}
