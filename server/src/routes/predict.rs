//! Prediction endpoints
//!
//! `POST /predict` accepts a multipart image upload and returns the
//! predicted class with the full probability distribution.
//! `POST /predict/batch` applies the same prediction to every uploaded
//! file independently: one bad file never aborts the others.

use std::collections::BTreeMap;
use std::time::Instant;

use axum::{
    extract::{Multipart, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use tracing::{info, warn};

use catsdogs::inference::predictor::PredictionResult;
use catsdogs::utils::error::CatsDogsError;

use crate::state::SharedState;

/// Error responses of the prediction endpoints
#[derive(Debug)]
pub enum ApiError {
    /// The upload could not be decoded as an image (client error)
    Decode(String),
    /// No checkpoint is loaded; the service is not ready to predict
    NotReady,
    /// Unexpected server-side failure
    Internal(String),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::Decode(_) => StatusCode::BAD_REQUEST,
            ApiError::NotReady => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn message(&self) -> String {
        match self {
            ApiError::Decode(msg) => format!("invalid image: {msg}"),
            ApiError::NotReady => "model not loaded".to_string(),
            ApiError::Internal(msg) => msg.clone(),
        }
    }
}

impl From<CatsDogsError> for ApiError {
    fn from(err: CatsDogsError) -> Self {
        match err {
            CatsDogsError::Decode(msg) => ApiError::Decode(msg),
            CatsDogsError::NotReady => ApiError::NotReady,
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(serde_json::json!({ "error": self.message() }));
        (self.status(), body).into_response()
    }
}

/// Response body of a successful prediction
#[derive(Debug, Serialize)]
pub struct PredictionResponse {
    pub prediction: String,
    pub class_probabilities: BTreeMap<String, f32>,
    pub confidence: f32,
}

impl PredictionResponse {
    fn new(result: &PredictionResult, class_names: &[String]) -> Self {
        let class_probabilities = class_names
            .iter()
            .cloned()
            .zip(result.probabilities.iter().copied())
            .collect();

        Self {
            prediction: result.label.clone(),
            class_probabilities,
            confidence: result.confidence,
        }
    }
}

/// POST /predict - classify one uploaded image
pub async fn predict(
    State(state): State<SharedState>,
    multipart: Multipart,
) -> Result<Json<PredictionResponse>, ApiError> {
    let start = Instant::now();
    state.metrics.inc_requests();

    let predictor = state.predictor.as_ref().ok_or(ApiError::NotReady)?;

    let (_, bytes) = read_file_field(multipart).await?;
    let result = predictor.predict_bytes(&bytes)?;

    let latency = start.elapsed().as_secs_f64();
    state.metrics.observe_latency(latency);
    state.metrics.inc_prediction(result.class_index);

    info!(
        "Prediction: {}, confidence: {:.4}, latency: {:.4}s",
        result.label, result.confidence, latency
    );

    Ok(Json(PredictionResponse::new(&result, predictor.class_names())))
}

/// One entry in a batch prediction response
#[derive(Debug, Serialize)]
pub struct BatchItem {
    pub filename: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prediction: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub class_probabilities: Option<BTreeMap<String, f32>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Response body of a batch prediction
#[derive(Debug, Serialize)]
pub struct BatchResponse {
    pub results: Vec<BatchItem>,
}

/// POST /predict/batch - classify every uploaded file independently
pub async fn predict_batch(
    State(state): State<SharedState>,
    mut multipart: Multipart,
) -> Result<Json<BatchResponse>, ApiError> {
    let predictor = state.predictor.as_ref().ok_or(ApiError::NotReady)?;

    let mut results = Vec::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::Decode(e.to_string()))?
    {
        let filename = field
            .file_name()
            .unwrap_or("upload")
            .to_string();

        let bytes = match field.bytes().await {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!("Failed to read upload '{}': {}", filename, e);
                results.push(error_item(filename, e.to_string()));
                continue;
            }
        };

        match predictor.predict_bytes(&bytes) {
            Ok(result) => {
                state.metrics.inc_prediction(result.class_index);
                let response = PredictionResponse::new(&result, predictor.class_names());
                results.push(BatchItem {
                    filename,
                    prediction: Some(response.prediction),
                    class_probabilities: Some(response.class_probabilities),
                    confidence: Some(response.confidence),
                    error: None,
                });
            }
            Err(e) => {
                warn!("Failed to predict '{}': {}", filename, e);
                results.push(error_item(filename, e.to_string()));
            }
        }
    }

    Ok(Json(BatchResponse { results }))
}

fn error_item(filename: String, error: String) -> BatchItem {
    BatchItem {
        filename,
        prediction: None,
        class_probabilities: None,
        confidence: None,
        error: Some(error),
    }
}

/// Read the uploaded file from the multipart body: the `file` field if
/// present, otherwise the first field carrying data.
async fn read_file_field(mut multipart: Multipart) -> Result<(String, Vec<u8>), ApiError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::Decode(e.to_string()))?
    {
        let name = field.name().unwrap_or_default().to_string();
        let filename = field.file_name().unwrap_or("upload").to_string();

        if name == "file" || name.is_empty() || field.file_name().is_some() {
            let bytes = field
                .bytes()
                .await
                .map_err(|e| ApiError::Decode(e.to_string()))?;
            return Ok((filename, bytes.to_vec()));
        }
    }

    Err(ApiError::Decode("missing file field".to_string()))
}
