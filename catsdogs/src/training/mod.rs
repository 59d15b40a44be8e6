//! Training module
//!
//! This module provides:
//! - The per-batch training step and inference-mode evaluation
//! - The full run state machine (train, validate, checkpoint, finalize)
//! - Checkpoint persistence with metadata
//! - The experiment log (one run record per invocation)

pub mod checkpoint;
pub mod experiment;
pub mod run;
pub mod trainer;

pub use checkpoint::{CheckpointMeta, CHECKPOINT_FILE_STEM, CHECKPOINT_META_FILE};
pub use experiment::{EpochRecord, ExperimentLog, RunParams, RunRecord, TestRecord};
pub use run::{run_training, RunConfig, RunSummary};
pub use trainer::{evaluate, train_step, BatchStats, TrainingState};
