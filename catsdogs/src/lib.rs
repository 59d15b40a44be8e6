//! # Cats vs Dogs Classifier
//!
//! A Rust library for training and serving a binary image classifier
//! (cats vs dogs) using the Burn framework.
//!
//! ## Modules
//!
//! - `dataset`: enumeration, deterministic splitting, augmentation and
//!   tensor batching of the labeled image data
//! - `model`: CNN architecture and configuration
//! - `training`: training loop, checkpointing and experiment logging
//! - `inference`: checkpoint loading and prediction
//! - `utils`: error taxonomy, metrics, logging helpers
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use catsdogs::backend::TrainingBackend;
//! use catsdogs::training::{run_training, RunConfig};
//!
//! let config = RunConfig::new(
//!     "data/raw".into(),
//!     "data/processed".into(),
//!     "output".into(),
//! );
//! let summary = run_training::<TrainingBackend>(&config, Default::default())?;
//! ```

pub mod backend;
pub mod dataset;
pub mod inference;
pub mod model;
pub mod training;
pub mod utils;

pub use dataset::loader::{CatsDogsDataset, ImageSample};
pub use dataset::split::{DatasetSplits, SplitConfig};
pub use dataset::{CLASS_DIRS, CLASS_NAMES, DEFAULT_IMAGE_SIZE, NUM_CLASSES};
pub use inference::predictor::{PredictionResult, Predictor};
pub use model::cnn::CatDogClassifier;
pub use model::config::{ModelConfig, TrainingConfig};
pub use training::run::{run_training, RunConfig, RunSummary};
pub use utils::error::{CatsDogsError, Result};
pub use utils::metrics::{ConfusionMatrix, Metrics};

/// Version of the library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
