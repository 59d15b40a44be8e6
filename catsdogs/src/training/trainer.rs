//! Training Step and Evaluation Mechanics
//!
//! Per-batch forward/backward/step with divergence detection, the
//! inference-mode evaluation pass, and the strict-improvement tracking
//! that drives the checkpoint policy.

use burn::{
    nn::loss::CrossEntropyLossConfig,
    optim::{GradientsParams, Optimizer},
    tensor::backend::{AutodiffBackend, Backend},
    tensor::ElementConversion,
};
use tracing::{debug, info};

use crate::dataset::batcher::CatsDogsBatch;
use crate::model::cnn::CatDogClassifier;
use crate::utils::error::{CatsDogsError, Result};
use crate::utils::metrics::Metrics;

/// Statistics from a single optimizer step
#[derive(Debug, Clone, Copy)]
pub struct BatchStats {
    /// Cross-entropy loss of the batch
    pub loss: f64,
    /// Correct predictions in the batch
    pub correct: usize,
    /// Samples in the batch
    pub total: usize,
}

/// Mutable training progress, tracked across epochs
#[derive(Debug, Clone)]
pub struct TrainingState {
    /// Current epoch (0-indexed)
    pub epoch: usize,
    /// Total optimizer steps taken
    pub iteration: usize,
    /// Total training samples seen
    pub samples_seen: usize,
    /// Best validation accuracy seen so far in the run
    pub best_val_accuracy: f64,
    /// Epoch of the best validation accuracy
    pub best_epoch: Option<usize>,
}

impl Default for TrainingState {
    fn default() -> Self {
        Self {
            epoch: 0,
            iteration: 0,
            samples_seen: 0,
            best_val_accuracy: 0.0,
            best_epoch: None,
        }
    }
}

impl TrainingState {
    /// Record a validation accuracy; returns true on strict improvement.
    ///
    /// Ties are not improvements: an equal accuracy never replaces the
    /// checkpoint that first reached it.
    pub fn update_best(&mut self, val_accuracy: f64) -> bool {
        if val_accuracy > self.best_val_accuracy {
            info!(
                "New best model: accuracy improved {:.2}% -> {:.2}%",
                self.best_val_accuracy * 100.0,
                val_accuracy * 100.0
            );
            self.best_val_accuracy = val_accuracy;
            self.best_epoch = Some(self.epoch);
            true
        } else {
            debug!(
                "No improvement at epoch {} (best: {:.2}%)",
                self.epoch + 1,
                self.best_val_accuracy * 100.0
            );
            false
        }
    }
}

/// Run one forward/backward/optimizer step over a batch.
///
/// Takes the model by value and returns the updated one, matching the
/// ownership contract of Burn optimizers. A non-finite loss aborts the run
/// with a divergence error before any parameter update.
pub fn train_step<B, O>(
    model: CatDogClassifier<B>,
    optimizer: &mut O,
    batch: &CatsDogsBatch<B>,
    learning_rate: f64,
    state: &mut TrainingState,
    batch_idx: usize,
) -> Result<(CatDogClassifier<B>, BatchStats)>
where
    B: AutodiffBackend,
    O: Optimizer<CatDogClassifier<B>, B>,
{
    let output = model.forward(batch.images.clone());

    let loss = CrossEntropyLossConfig::new()
        .init(&output.device())
        .forward(output.clone(), batch.targets.clone());

    let loss_value: f64 = loss.clone().into_scalar().elem();
    if !loss_value.is_finite() {
        return Err(CatsDogsError::Divergence {
            epoch: state.epoch,
            batch: batch_idx,
        });
    }

    let predictions = output.argmax(1).squeeze::<1>(1);
    let correct: i64 = predictions
        .equal(batch.targets.clone())
        .int()
        .sum()
        .into_scalar()
        .elem();
    let total = batch.targets.dims()[0];

    let grads = GradientsParams::from_grads(loss.backward(), &model);
    let model = optimizer.step(learning_rate, model, grads);

    state.iteration += 1;
    state.samples_seen += total;

    Ok((
        model,
        BatchStats {
            loss: loss_value,
            correct: correct as usize,
            total,
        },
    ))
}

/// Evaluate a model over a set of batches in inference mode.
///
/// The caller passes a non-autodiff model (`model.valid()` during
/// training); no gradients are computed and dropout is inactive.
pub fn evaluate<B: Backend>(
    model: &CatDogClassifier<B>,
    batches: &[CatsDogsBatch<B>],
    num_classes: usize,
) -> Metrics {
    let mut total_loss = 0.0;
    let mut all_predictions: Vec<usize> = Vec::new();
    let mut all_targets: Vec<usize> = Vec::new();

    for batch in batches {
        let output = model.forward(batch.images.clone());

        let loss = CrossEntropyLossConfig::new()
            .init(&output.device())
            .forward(output.clone(), batch.targets.clone());
        let loss_value: f64 = loss.into_scalar().elem();
        total_loss += loss_value;

        let predictions = output.argmax(1).squeeze::<1>(1);
        let pred_vec: Vec<i64> = predictions.into_data().to_vec().unwrap();
        let target_vec: Vec<i64> = batch.targets.clone().into_data().to_vec().unwrap();

        all_predictions.extend(pred_vec.iter().map(|&p| p as usize));
        all_targets.extend(target_vec.iter().map(|&t| t as usize));
    }

    let mut metrics = Metrics::from_predictions(&all_predictions, &all_targets, num_classes);
    metrics.loss = Some(total_loss / batches.len().max(1) as f64);

    info!(
        "Evaluation: loss = {:.4}, accuracy = {:.2}%, samples = {}",
        metrics.loss.unwrap_or(0.0),
        metrics.accuracy * 100.0,
        metrics.total_samples
    );

    metrics
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_update_best_strict_improvement() {
        let mut state = TrainingState::default();

        state.epoch = 0;
        assert!(state.update_best(0.6));
        assert_eq!(state.best_epoch, Some(0));

        // A tie is not an improvement
        state.epoch = 1;
        assert!(!state.update_best(0.6));
        assert_eq!(state.best_epoch, Some(0));

        state.epoch = 2;
        assert!(state.update_best(0.75));
        assert_eq!(state.best_epoch, Some(2));

        // A regression is not an improvement
        state.epoch = 3;
        assert!(!state.update_best(0.5));
        assert!((state.best_val_accuracy - 0.75).abs() < 1e-9);
    }

    #[test]
    fn test_update_best_zero_accuracy_never_improves() {
        let mut state = TrainingState::default();
        assert!(!state.update_best(0.0));
        assert_eq!(state.best_epoch, None);
    }
}
