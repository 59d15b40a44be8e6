//! Metrics Module for Model Evaluation
//!
//! Provides the evaluation metrics reported per epoch and at finalization:
//! - Accuracy
//! - Precision, recall, F1 (weighted by class support, per class as well)
//! - Confusion matrix

use serde::{Deserialize, Serialize};

/// Evaluation metrics over one pass of a dataset split
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Metrics {
    /// Total number of samples evaluated
    pub total_samples: usize,

    /// Number of correct predictions
    pub correct_predictions: usize,

    /// Overall accuracy (correct / total)
    pub accuracy: f64,

    /// Average loss over the evaluated batches, set by the trainer
    pub loss: Option<f64>,

    /// Precision weighted by class support
    pub weighted_precision: f64,

    /// Recall weighted by class support
    pub weighted_recall: f64,

    /// F1-score weighted by class support
    pub weighted_f1: f64,

    /// Per-class metrics
    pub per_class: Vec<ClassMetrics>,

    /// Confusion matrix
    pub confusion_matrix: ConfusionMatrix,
}

impl Metrics {
    /// Create metrics from predicted and ground-truth label vectors
    pub fn from_predictions(
        predictions: &[usize],
        ground_truth: &[usize],
        num_classes: usize,
    ) -> Self {
        assert_eq!(
            predictions.len(),
            ground_truth.len(),
            "Predictions and ground truth must have same length"
        );

        let total_samples = predictions.len();
        if total_samples == 0 {
            return Self::default();
        }

        let confusion_matrix =
            ConfusionMatrix::from_predictions(predictions, ground_truth, num_classes);

        let correct_predictions = confusion_matrix.correct();
        let accuracy = correct_predictions as f64 / total_samples as f64;

        let per_class: Vec<ClassMetrics> = (0..num_classes)
            .map(|class_idx| ClassMetrics::from_confusion_matrix(&confusion_matrix, class_idx))
            .collect();

        // Support-weighted averages (what the final report quotes)
        let total_support: usize = per_class.iter().map(|m| m.support).sum();
        let weighted = |f: fn(&ClassMetrics) -> f64| -> f64 {
            if total_support > 0 {
                per_class
                    .iter()
                    .map(|m| f(m) * m.support as f64)
                    .sum::<f64>()
                    / total_support as f64
            } else {
                0.0
            }
        };

        Self {
            total_samples,
            correct_predictions,
            accuracy,
            loss: None,
            weighted_precision: weighted(|m| m.precision),
            weighted_recall: weighted(|m| m.recall),
            weighted_f1: weighted(|m| m.f1),
            per_class,
            confusion_matrix,
        }
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self {
            total_samples: 0,
            correct_predictions: 0,
            accuracy: 0.0,
            loss: None,
            weighted_precision: 0.0,
            weighted_recall: 0.0,
            weighted_f1: 0.0,
            per_class: Vec::new(),
            confusion_matrix: ConfusionMatrix::default(),
        }
    }
}

impl std::fmt::Display for Metrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Evaluation over {} samples:", self.total_samples)?;
        writeln!(f, "  Accuracy:  {:.2}%", self.accuracy * 100.0)?;
        writeln!(f, "  Precision: {:.2}%", self.weighted_precision * 100.0)?;
        writeln!(f, "  Recall:    {:.2}%", self.weighted_recall * 100.0)?;
        writeln!(f, "  F1:        {:.2}%", self.weighted_f1 * 100.0)?;
        if let Some(loss) = self.loss {
            writeln!(f, "  Loss:      {:.4}", loss)?;
        }
        Ok(())
    }
}

/// Per-class metrics
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClassMetrics {
    /// Class index
    pub class_idx: usize,

    /// True positives
    pub true_positives: usize,

    /// False positives
    pub false_positives: usize,

    /// False negatives
    pub false_negatives: usize,

    /// Precision = TP / (TP + FP)
    pub precision: f64,

    /// Recall = TP / (TP + FN)
    pub recall: f64,

    /// F1 = 2 * (precision * recall) / (precision + recall)
    pub f1: f64,

    /// Number of actual samples of this class
    pub support: usize,
}

impl ClassMetrics {
    /// Calculate metrics for one class from a confusion matrix
    pub fn from_confusion_matrix(cm: &ConfusionMatrix, class_idx: usize) -> Self {
        let true_positives = cm.get(class_idx, class_idx);

        let false_positives: usize = (0..cm.num_classes)
            .filter(|&i| i != class_idx)
            .map(|i| cm.get(i, class_idx))
            .sum();

        let false_negatives: usize = (0..cm.num_classes)
            .filter(|&i| i != class_idx)
            .map(|i| cm.get(class_idx, i))
            .sum();

        let support = true_positives + false_negatives;

        let precision = if true_positives + false_positives > 0 {
            true_positives as f64 / (true_positives + false_positives) as f64
        } else {
            0.0
        };

        let recall = if support > 0 {
            true_positives as f64 / support as f64
        } else {
            0.0
        };

        let f1 = if precision + recall > 0.0 {
            2.0 * precision * recall / (precision + recall)
        } else {
            0.0
        };

        Self {
            class_idx,
            true_positives,
            false_positives,
            false_negatives,
            precision,
            recall,
            f1,
            support,
        }
    }
}

/// Confusion matrix (row = actual, column = predicted)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfusionMatrix {
    /// Number of classes
    pub num_classes: usize,

    /// Matrix data stored flat in row-major order
    pub matrix: Vec<usize>,
}

impl Default for ConfusionMatrix {
    fn default() -> Self {
        Self::new(0)
    }
}

impl ConfusionMatrix {
    /// Create a new empty confusion matrix
    pub fn new(num_classes: usize) -> Self {
        Self {
            num_classes,
            matrix: vec![0; num_classes * num_classes],
        }
    }

    /// Create a confusion matrix from predictions and ground truth
    pub fn from_predictions(
        predictions: &[usize],
        ground_truth: &[usize],
        num_classes: usize,
    ) -> Self {
        let mut cm = Self::new(num_classes);
        for (&pred, &actual) in predictions.iter().zip(ground_truth.iter()) {
            cm.add(actual, pred);
        }
        cm
    }

    /// Add a single prediction to the matrix
    pub fn add(&mut self, actual: usize, predicted: usize) {
        if actual < self.num_classes && predicted < self.num_classes {
            self.matrix[actual * self.num_classes + predicted] += 1;
        }
    }

    /// Get the count at (actual, predicted)
    pub fn get(&self, actual: usize, predicted: usize) -> usize {
        if actual < self.num_classes && predicted < self.num_classes {
            self.matrix[actual * self.num_classes + predicted]
        } else {
            0
        }
    }

    /// Total number of recorded predictions
    pub fn total(&self) -> usize {
        self.matrix.iter().sum()
    }

    /// Number of correct predictions (diagonal sum)
    pub fn correct(&self) -> usize {
        (0..self.num_classes).map(|i| self.get(i, i)).sum()
    }

    /// Overall accuracy
    pub fn accuracy(&self) -> f64 {
        let total = self.total();
        if total > 0 {
            self.correct() as f64 / total as f64
        } else {
            0.0
        }
    }

    /// Row sums (actual class counts)
    pub fn row_sums(&self) -> Vec<usize> {
        (0..self.num_classes)
            .map(|row| (0..self.num_classes).map(|col| self.get(row, col)).sum())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_confusion_matrix_counts() {
        //             predicted
        // actual cat: 3 cat, 1 dog
        // actual dog: 2 cat, 4 dog
        let predictions = vec![0, 0, 0, 1, 0, 0, 1, 1, 1, 1];
        let ground_truth = vec![0, 0, 0, 0, 1, 1, 1, 1, 1, 1];

        let cm = ConfusionMatrix::from_predictions(&predictions, &ground_truth, 2);

        assert_eq!(cm.get(0, 0), 3);
        assert_eq!(cm.get(0, 1), 1);
        assert_eq!(cm.get(1, 0), 2);
        assert_eq!(cm.get(1, 1), 4);
        assert_eq!(cm.total(), 10);
        assert_eq!(cm.correct(), 7);
    }

    #[test]
    fn test_metrics_from_known_matrix() {
        let predictions = vec![0, 0, 0, 1, 0, 0, 1, 1, 1, 1];
        let ground_truth = vec![0, 0, 0, 0, 1, 1, 1, 1, 1, 1];

        let metrics = Metrics::from_predictions(&predictions, &ground_truth, 2);

        assert_eq!(metrics.total_samples, 10);
        assert!((metrics.accuracy - 0.7).abs() < 1e-9);

        // Class 0: TP=3, FP=2, FN=1 -> precision 0.6, recall 0.75
        let cat = &metrics.per_class[0];
        assert!((cat.precision - 0.6).abs() < 1e-9);
        assert!((cat.recall - 0.75).abs() < 1e-9);
        assert_eq!(cat.support, 4);

        // Class 1: TP=4, FP=1, FN=2 -> precision 0.8, recall 4/6
        let dog = &metrics.per_class[1];
        assert!((dog.precision - 0.8).abs() < 1e-9);
        assert!((dog.recall - 4.0 / 6.0).abs() < 1e-9);
        assert_eq!(dog.support, 6);

        // Weighted recall equals overall accuracy for full-coverage labels
        assert!((metrics.weighted_recall - 0.7).abs() < 1e-9);
    }

    #[test]
    fn test_perfect_predictions() {
        let labels = vec![0, 1, 0, 1, 1];
        let metrics = Metrics::from_predictions(&labels, &labels, 2);

        assert!((metrics.accuracy - 1.0).abs() < 1e-9);
        assert!((metrics.weighted_f1 - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_empty_predictions() {
        let metrics = Metrics::from_predictions(&[], &[], 2);
        assert_eq!(metrics.total_samples, 0);
        assert_eq!(metrics.accuracy, 0.0);
    }
}
