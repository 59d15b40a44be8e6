//! Training Run Orchestration
//!
//! The full training state machine:
//! Init -> (TrainEpoch -> ValidateEpoch)* -> Finalize.
//!
//! Init enumerates and splits the dataset, materializes processed data and
//! opens the experiment log. Each TrainEpoch re-shuffles the train split,
//! assembles augmented batches lazily and applies one optimizer step per
//! batch. Each ValidateEpoch evaluates in inference mode and overwrites the
//! best checkpoint on strict improvement. Finalize evaluates the best
//! parameters on the held-out test split, writes the confusion-matrix
//! artifact and the run record.

use std::path::{Path, PathBuf};

use burn::data::dataloader::batcher::Batcher;
use burn::module::AutodiffModule;
use burn::optim::{decay::WeightDecayConfig, AdamConfig};
use burn::tensor::backend::{AutodiffBackend, Backend};
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;
use serde::Serialize;
use tracing::{info, warn};

use crate::dataset::batcher::{CatsDogsBatch, CatsDogsBatcher, CatsDogsItem};
use crate::dataset::loader::{CatsDogsDataset, ImageSample};
use crate::dataset::split::{DatasetSplits, SplitConfig};
use crate::dataset::{materialize_splits, AugmentConfig, Augmenter, CLASS_NAMES, NUM_CLASSES};
use crate::model::cnn::CatDogClassifier;
use crate::model::config::{ModelConfig, TrainingConfig};
use crate::training::checkpoint::{self, CheckpointMeta};
use crate::training::experiment::{EpochRecord, ExperimentLog, RunParams, RunRecord, TestRecord};
use crate::training::trainer::{evaluate, train_step, TrainingState};
use crate::utils::error::{CatsDogsError, Result};
use crate::utils::metrics::Metrics;

/// Configuration of one training invocation
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Directory with raw `cats/` and `dogs/` class directories
    pub raw_data_dir: PathBuf,
    /// Directory where resized split copies are materialized
    pub processed_data_dir: PathBuf,
    /// Output directory (checkpoints under `models/`, records under `runs/`)
    pub output_dir: PathBuf,
    /// Model architecture
    pub model: ModelConfig,
    /// Training hyperparameters
    pub training: TrainingConfig,
    /// Split ratios and seed
    pub split: SplitConfig,
    /// Whether to apply train-time augmentation
    pub augment: bool,
}

impl RunConfig {
    /// Standard configuration for the given directories
    pub fn new(raw_data_dir: PathBuf, processed_data_dir: PathBuf, output_dir: PathBuf) -> Self {
        Self {
            raw_data_dir,
            processed_data_dir,
            output_dir,
            model: ModelConfig::default(),
            training: TrainingConfig::default(),
            split: SplitConfig::default(),
            augment: true,
        }
    }

    /// Validate the whole configuration before any work starts
    pub fn validate(&self) -> Result<()> {
        self.model.validate()?;
        self.training.validate()?;
        self.split.validate()
    }
}

/// Result of a completed training run
#[derive(Debug, Clone)]
pub struct RunSummary {
    /// The full run record, as persisted
    pub record: RunRecord,
    /// Path of the persisted run record
    pub record_path: PathBuf,
    /// Directory holding the best checkpoint (if one was saved)
    pub checkpoint_dir: PathBuf,
}

/// Execute a full training run
pub fn run_training<B: AutodiffBackend>(config: &RunConfig, device: B::Device) -> Result<RunSummary> {
    config.validate()?;

    // ---- Init -------------------------------------------------------------

    let dataset = CatsDogsDataset::new(&config.raw_data_dir)?;
    info!("{}", dataset.stats());

    let splits = DatasetSplits::from_samples(dataset.samples, config.split.clone())?;
    info!("{}", splits.stats());

    let splits = materialize_splits(
        &splits,
        &config.processed_data_dir,
        config.model.input_size as u32,
    )?;

    let mut log = ExperimentLog::start(
        &config.output_dir,
        RunParams {
            epochs: config.training.epochs,
            batch_size: config.training.batch_size,
            learning_rate: config.training.learning_rate,
            weight_decay: config.training.weight_decay,
            seed: config.training.seed,
            train_samples: splits.train.len(),
            val_samples: splits.validation.len(),
            test_samples: splits.test.len(),
        },
    )?;

    let image_size = config.model.input_size;
    let batcher = CatsDogsBatcher::<B>::new(device.clone(), image_size);
    let eval_batcher = CatsDogsBatcher::<B::InnerBackend>::new(device.clone(), image_size);

    let augmenter = config
        .augment
        .then(|| Augmenter::new(AugmentConfig::for_output_size(image_size as u32)));

    let mut model = CatDogClassifier::<B>::new(&config.model, &device);
    let mut optimizer = AdamConfig::new()
        .with_weight_decay(Some(WeightDecayConfig::new(
            config.training.weight_decay as f32,
        )))
        .init();

    let mut state = TrainingState::default();

    // Evaluation batches are fixed for the whole run
    let val_batches = build_eval_batches(&splits.validation, &eval_batcher, &device, config)?;
    let test_batches = build_eval_batches(&splits.test, &eval_batcher, &device, config)?;

    let checkpoint_dir = config.output_dir.join("models");

    // ---- TrainEpoch / ValidateEpoch ---------------------------------------

    for epoch in 0..config.training.epochs {
        state.epoch = epoch;

        let mut order: Vec<usize> = (0..splits.train.len()).collect();
        let mut epoch_rng =
            ChaCha8Rng::seed_from_u64(config.training.seed.wrapping_add(epoch as u64 + 1));
        order.shuffle(&mut epoch_rng);

        let mut epoch_loss = 0.0;
        let mut correct = 0usize;
        let mut total = 0usize;
        let mut num_batches = 0usize;

        for (batch_idx, chunk) in order.chunks(config.training.batch_size).enumerate() {
            let items = load_train_items(chunk, &splits.train, config, augmenter.as_ref(), epoch)?;
            if items.is_empty() {
                return Err(CatsDogsError::Dataset(format!(
                    "batch {} of epoch {} contained no readable images",
                    batch_idx,
                    epoch + 1
                )));
            }

            let batch = batcher.batch(items, &device);
            let (updated, stats) = train_step(
                model,
                &mut optimizer,
                &batch,
                config.training.learning_rate,
                &mut state,
                batch_idx,
            )?;
            model = updated;

            epoch_loss += stats.loss;
            correct += stats.correct;
            total += stats.total;
            num_batches += 1;
        }

        let train_loss = epoch_loss / num_batches.max(1) as f64;
        let train_accuracy = correct as f64 / total.max(1) as f64;

        let val_metrics = evaluate(&model.valid(), &val_batches, NUM_CLASSES);

        log.log_epoch(EpochRecord {
            epoch,
            train_loss,
            train_accuracy,
            val_loss: val_metrics.loss.unwrap_or(0.0),
            val_accuracy: val_metrics.accuracy,
            val_precision: val_metrics.weighted_precision,
            val_recall: val_metrics.weighted_recall,
            val_f1: val_metrics.weighted_f1,
        });

        if state.update_best(val_metrics.accuracy) {
            let meta = CheckpointMeta::new(epoch, val_metrics.accuracy, config.model.clone());
            let path = checkpoint::save(&model.valid(), &meta, &checkpoint_dir)?;
            log.set_checkpoint(path, val_metrics.accuracy, epoch);
        }
    }

    // ---- Finalize ----------------------------------------------------------

    let test_metrics = if log.record().checkpoint.is_some() {
        let (best_model, _meta) = checkpoint::load::<B::InnerBackend>(&checkpoint_dir, &device)?;
        evaluate(&best_model, &test_batches, NUM_CLASSES)
    } else {
        warn!("No checkpoint was saved during the run; evaluating the final parameters");
        evaluate(&model.valid(), &test_batches, NUM_CLASSES)
    };

    let cm_path = write_confusion_matrix(&test_metrics, &config.output_dir)?;
    log.log_artifact(cm_path);

    let (record, record_path) = log.finish(TestRecord {
        accuracy: test_metrics.accuracy,
        precision: test_metrics.weighted_precision,
        recall: test_metrics.weighted_recall,
        f1: test_metrics.weighted_f1,
        loss: test_metrics.loss.unwrap_or(0.0),
    })?;

    info!(
        "Training complete: best val accuracy {:.2}% (epoch {:?}), test accuracy {:.2}%",
        record.best_val_accuracy * 100.0,
        record.best_epoch.map(|e| e + 1),
        record.test.as_ref().map(|t| t.accuracy * 100.0).unwrap_or(0.0)
    );

    Ok(RunSummary {
        record,
        record_path,
        checkpoint_dir,
    })
}

/// Load the items of one training batch.
///
/// Unreadable images are skipped with a warning; the caller treats a fully
/// empty batch as fatal. With augmentation enabled, each sample draws from
/// an RNG derived from (run seed, epoch, sample id), so two epochs see
/// different variants of the same image while a re-run reproduces them.
fn load_train_items(
    chunk: &[usize],
    train: &[ImageSample],
    config: &RunConfig,
    augmenter: Option<&Augmenter>,
    epoch: usize,
) -> Result<Vec<CatsDogsItem>> {
    let mut items = Vec::with_capacity(chunk.len());

    for &index in chunk {
        let sample = &train[index];

        let loaded = match augmenter {
            Some(augmenter) => {
                let mut rng = sample_rng(config.training.seed, epoch, sample.id);
                CatsDogsItem::from_path_augmented(&sample.path, sample.label, augmenter, &mut rng)
            }
            None => CatsDogsItem::from_path(&sample.path, sample.label, config.model.input_size),
        };

        match loaded {
            Ok(item) => items.push(item),
            Err(e) => warn!("Skipping sample: {}", e),
        }
    }

    Ok(items)
}

/// Derive a per-sample RNG from the run seed, epoch and sample id
fn sample_rng(seed: u64, epoch: usize, sample_id: u64) -> ChaCha8Rng {
    let mixed = seed
        ^ (epoch as u64 + 1).wrapping_mul(0x9E37_79B9_7F4A_7C15)
        ^ sample_id.wrapping_mul(0xC2B2_AE3D_27D4_EB4F);
    ChaCha8Rng::seed_from_u64(mixed)
}

/// Assemble fixed evaluation batches for a split
fn build_eval_batches<B: Backend>(
    samples: &[ImageSample],
    batcher: &CatsDogsBatcher<B>,
    device: &B::Device,
    config: &RunConfig,
) -> Result<Vec<CatsDogsBatch<B>>> {
    let mut batches = Vec::new();

    for chunk in samples.chunks(config.training.batch_size) {
        let mut items = Vec::with_capacity(chunk.len());
        for sample in chunk {
            match CatsDogsItem::from_path(&sample.path, sample.label, config.model.input_size) {
                Ok(item) => items.push(item),
                Err(e) => warn!("Skipping sample: {}", e),
            }
        }

        if items.is_empty() {
            return Err(CatsDogsError::Dataset(
                "evaluation batch contained no readable images".to_string(),
            ));
        }

        batches.push(batcher.batch(items, device));
    }

    Ok(batches)
}

/// Confusion-matrix artifact as written next to the run outputs
#[derive(Debug, Serialize)]
struct ConfusionMatrixArtifact<'a> {
    class_names: &'a [&'a str],
    /// rows = actual class, columns = predicted class
    matrix: Vec<Vec<usize>>,
}

fn write_confusion_matrix(metrics: &Metrics, output_dir: &Path) -> Result<PathBuf> {
    let cm = &metrics.confusion_matrix;
    let matrix: Vec<Vec<usize>> = (0..cm.num_classes)
        .map(|row| (0..cm.num_classes).map(|col| cm.get(row, col)).collect())
        .collect();

    let artifact = ConfusionMatrixArtifact {
        class_names: &CLASS_NAMES,
        matrix,
    };

    std::fs::create_dir_all(output_dir)?;
    let path = output_dir.join("confusion_matrix.json");
    std::fs::write(&path, serde_json::to_string_pretty(&artifact)?)?;

    info!("Confusion matrix written to {:?}", path);
    Ok(path)
}
