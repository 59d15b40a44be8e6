//! Experiment Logging
//!
//! One Run Record per training invocation: the configuration, the per-epoch
//! metrics, the final test metrics, and the produced artifacts. Records are
//! written as JSON files into a `runs/` directory, which acts as the
//! experiment log sink consumed by external tooling.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Local, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::utils::error::Result;

/// Parameters of one training invocation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunParams {
    pub epochs: usize,
    pub batch_size: usize,
    pub learning_rate: f64,
    pub weight_decay: f64,
    pub seed: u64,
    pub train_samples: usize,
    pub val_samples: usize,
    pub test_samples: usize,
}

/// Metrics of one completed epoch
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EpochRecord {
    pub epoch: usize,
    pub train_loss: f64,
    pub train_accuracy: f64,
    pub val_loss: f64,
    pub val_accuracy: f64,
    pub val_precision: f64,
    pub val_recall: f64,
    pub val_f1: f64,
}

/// Final metrics over the test split
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestRecord {
    pub accuracy: f64,
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    pub loss: f64,
}

/// The complete record of one training run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunRecord {
    pub run_id: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub params: RunParams,
    pub epochs: Vec<EpochRecord>,
    pub test: Option<TestRecord>,
    pub best_val_accuracy: f64,
    pub best_epoch: Option<usize>,
    pub checkpoint: Option<PathBuf>,
    pub artifacts: Vec<PathBuf>,
}

/// Writer accumulating a run record and persisting it at the end
pub struct ExperimentLog {
    runs_dir: PathBuf,
    record: RunRecord,
}

impl ExperimentLog {
    /// Open the experiment log for a new run under `<output_dir>/runs/`
    pub fn start(output_dir: &Path, params: RunParams) -> Result<Self> {
        let runs_dir = output_dir.join("runs");
        std::fs::create_dir_all(&runs_dir)?;

        let run_id = format!("run_{}", Local::now().format("%Y%m%d_%H%M%S"));
        info!("Experiment log opened: {}", run_id);

        let record = RunRecord {
            run_id,
            started_at: Utc::now(),
            finished_at: None,
            params,
            epochs: Vec::new(),
            test: None,
            best_val_accuracy: 0.0,
            best_epoch: None,
            checkpoint: None,
            artifacts: Vec::new(),
        };

        Ok(Self { runs_dir, record })
    }

    /// Record the metrics of a completed epoch
    pub fn log_epoch(&mut self, epoch: EpochRecord) {
        info!(
            "Epoch {}: train_loss = {:.4}, train_acc = {:.2}%, val_loss = {:.4}, val_acc = {:.2}%",
            epoch.epoch + 1,
            epoch.train_loss,
            epoch.train_accuracy * 100.0,
            epoch.val_loss,
            epoch.val_accuracy * 100.0
        );
        self.record.epochs.push(epoch);
    }

    /// Record the best checkpoint of the run
    pub fn set_checkpoint(&mut self, path: PathBuf, val_accuracy: f64, epoch: usize) {
        self.record.checkpoint = Some(path);
        self.record.best_val_accuracy = val_accuracy;
        self.record.best_epoch = Some(epoch);
    }

    /// Record a produced artifact (e.g. the confusion matrix)
    pub fn log_artifact(&mut self, path: PathBuf) {
        self.record.artifacts.push(path);
    }

    /// The record accumulated so far
    pub fn record(&self) -> &RunRecord {
        &self.record
    }

    /// Path the run record will be written to
    pub fn path(&self) -> PathBuf {
        self.runs_dir.join(format!("{}.json", self.record.run_id))
    }

    /// Write the final record with test metrics and return it
    pub fn finish(mut self, test: TestRecord) -> Result<(RunRecord, PathBuf)> {
        self.record.test = Some(test);
        self.record.finished_at = Some(Utc::now());

        let path = self.path();
        let json = serde_json::to_string_pretty(&self.record)?;
        std::fs::write(&path, json)?;

        info!("Run record written to {:?}", path);
        Ok((self.record, path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn test_params() -> RunParams {
        RunParams {
            epochs: 2,
            batch_size: 4,
            learning_rate: 0.001,
            weight_decay: 1e-4,
            seed: 42,
            train_samples: 16,
            val_samples: 2,
            test_samples: 2,
        }
    }

    #[test]
    fn test_run_record_written_on_finish() {
        let dir = TempDir::new().unwrap();
        let mut log = ExperimentLog::start(dir.path(), test_params()).unwrap();

        log.log_epoch(EpochRecord {
            epoch: 0,
            train_loss: 0.7,
            train_accuracy: 0.5,
            val_loss: 0.69,
            val_accuracy: 0.5,
            val_precision: 0.5,
            val_recall: 0.5,
            val_f1: 0.5,
        });
        log.set_checkpoint(PathBuf::from("best_model.mpk"), 0.5, 0);

        let (record, path) = log
            .finish(TestRecord {
                accuracy: 0.5,
                precision: 0.5,
                recall: 0.5,
                f1: 0.5,
                loss: 0.69,
            })
            .unwrap();

        assert!(path.exists());
        assert_eq!(record.epochs.len(), 1);
        assert!(record.finished_at.is_some());

        // The written file deserializes back into the same record
        let json = std::fs::read_to_string(&path).unwrap();
        let loaded: RunRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(loaded.run_id, record.run_id);
        assert_eq!(loaded.epochs.len(), 1);
        assert!(loaded.test.is_some());
    }
}
