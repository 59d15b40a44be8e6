//! Model Checkpointing
//!
//! A checkpoint is the serialized model parameters plus a metadata sidecar:
//! the epoch and validation accuracy that justified saving it, and the
//! architecture configuration the inference service needs to rebuild the
//! exact same model before loading the weights.

use std::path::{Path, PathBuf};

use burn::module::Module;
use burn::record::CompactRecorder;
use burn::tensor::backend::Backend;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::dataset::CLASS_NAMES;
use crate::model::cnn::CatDogClassifier;
use crate::model::config::ModelConfig;
use crate::utils::error::{CatsDogsError, Result};

/// File stem of the persisted best model (burn appends `.mpk`)
pub const CHECKPOINT_FILE_STEM: &str = "best_model";

/// File name of the metadata sidecar
pub const CHECKPOINT_META_FILE: &str = "best_model.meta.json";

/// Metadata persisted next to the model parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckpointMeta {
    /// Epoch (0-indexed) at which this checkpoint was saved
    pub epoch: usize,
    /// Validation accuracy that justified the save
    pub val_accuracy: f64,
    /// Architecture configuration of the saved parameters
    pub model: ModelConfig,
    /// Class names in label order
    pub class_names: Vec<String>,
    /// Save timestamp
    pub saved_at: DateTime<Utc>,
}

impl CheckpointMeta {
    /// Metadata for the current training state
    pub fn new(epoch: usize, val_accuracy: f64, model: ModelConfig) -> Self {
        Self {
            epoch,
            val_accuracy,
            model,
            class_names: CLASS_NAMES.iter().map(|s| s.to_string()).collect(),
            saved_at: Utc::now(),
        }
    }
}

/// Save model parameters and metadata into `dir`, overwriting the previous
/// best checkpoint of the run.
pub fn save<B: Backend>(
    model: &CatDogClassifier<B>,
    meta: &CheckpointMeta,
    dir: &Path,
) -> Result<PathBuf> {
    std::fs::create_dir_all(dir)?;

    let stem = dir.join(CHECKPOINT_FILE_STEM);
    model
        .clone()
        .save_file(stem.clone(), &CompactRecorder::new())
        .map_err(|e| CatsDogsError::Checkpoint(format!("failed to save model: {e:?}")))?;

    let meta_json = serde_json::to_string_pretty(meta)?;
    std::fs::write(dir.join(CHECKPOINT_META_FILE), meta_json)?;

    info!(
        "Checkpoint saved to {:?} (epoch {}, val accuracy {:.2}%)",
        dir,
        meta.epoch + 1,
        meta.val_accuracy * 100.0
    );

    Ok(stem.with_extension("mpk"))
}

/// Load the metadata sidecar from a checkpoint directory
pub fn load_meta(dir: &Path) -> Result<CheckpointMeta> {
    let meta_path = dir.join(CHECKPOINT_META_FILE);
    if !meta_path.exists() {
        return Err(CatsDogsError::Checkpoint(format!(
            "no checkpoint found at {}",
            dir.display()
        )));
    }

    let json = std::fs::read_to_string(meta_path)?;
    Ok(serde_json::from_str(&json)?)
}

/// Load a checkpoint: rebuild the architecture from the metadata, then load
/// the persisted parameters into it.
pub fn load<B: Backend>(
    dir: &Path,
    device: &B::Device,
) -> Result<(CatDogClassifier<B>, CheckpointMeta)> {
    let meta = load_meta(dir)?;
    meta.model.validate()?;

    let model = CatDogClassifier::<B>::new(&meta.model, device)
        .load_file(dir.join(CHECKPOINT_FILE_STEM), &CompactRecorder::new(), device)
        .map_err(|e| CatsDogsError::Checkpoint(format!("failed to load model: {e:?}")))?;

    info!(
        "Checkpoint loaded from {:?} (epoch {}, val accuracy {:.2}%)",
        dir,
        meta.epoch + 1,
        meta.val_accuracy * 100.0
    );

    Ok((model, meta))
}
