//! Application state for the inference service
//!
//! One owned state instance is constructed at startup and shared with every
//! handler through an `Arc`: the loaded model (or its absence), the metrics
//! registry, and the server configuration. There is no global mutable
//! state; the model parameters are read-only after load.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use catsdogs::backend::DefaultBackend;
use catsdogs::inference::predictor::Predictor;

use crate::metrics::InferenceMetrics;

/// Server configuration
#[derive(Clone, Debug)]
pub struct ServerConfig {
    /// Directory the checkpoint is loaded from at startup
    pub model_dir: PathBuf,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            model_dir: PathBuf::from("output/models"),
        }
    }
}

/// Shared application state
pub struct AppState {
    /// Server configuration
    pub config: ServerConfig,
    /// The loaded model; `None` means the service reports not-ready on
    /// every predict until restarted with a valid checkpoint
    pub predictor: Option<Predictor<DefaultBackend>>,
    /// Request/latency/prediction counters
    pub metrics: InferenceMetrics,
    /// Server start time
    pub started_at: Instant,
}

impl AppState {
    pub fn new(config: ServerConfig, predictor: Option<Predictor<DefaultBackend>>) -> Self {
        Self {
            config,
            predictor,
            metrics: InferenceMetrics::new(),
            started_at: Instant::now(),
        }
    }

    /// Whether a checkpoint was loaded at startup
    pub fn model_loaded(&self) -> bool {
        self.predictor.is_some()
    }

    /// Uptime in seconds
    pub fn uptime_seconds(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }
}

pub type SharedState = Arc<AppState>;
