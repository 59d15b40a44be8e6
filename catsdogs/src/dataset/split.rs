//! Deterministic train/validation/test splitting
//!
//! Splits the enumerated samples into three disjoint sets using a seeded
//! shuffle, stratified per class so both classes keep the configured
//! proportions. Re-running with the same seed and input set reproduces the
//! exact same assignment.

use rand::prelude::*;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use crate::dataset::loader::ImageSample;
use crate::dataset::NUM_CLASSES;
use crate::utils::error::{CatsDogsError, Result};

/// The three dataset splits
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Split {
    Train,
    Validation,
    Test,
}

impl Split {
    /// Directory name used when materializing processed data
    pub fn dir_name(&self) -> &'static str {
        match self {
            Split::Train => "train",
            Split::Validation => "val",
            Split::Test => "test",
        }
    }
}

/// Configuration for dataset splitting
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SplitConfig {
    /// Fraction of data for the train split
    pub train_fraction: f64,
    /// Fraction of data for the validation split
    pub validation_fraction: f64,
    /// Fraction of data for the held-out test split
    pub test_fraction: f64,
    /// Random seed for reproducibility
    pub seed: u64,
}

impl Default for SplitConfig {
    fn default() -> Self {
        Self {
            train_fraction: 0.80,
            validation_fraction: 0.10,
            test_fraction: 0.10,
            seed: 42,
        }
    }
}

impl SplitConfig {
    /// Create a split configuration with custom fractions
    pub fn new(
        train_fraction: f64,
        validation_fraction: f64,
        test_fraction: f64,
        seed: u64,
    ) -> Result<Self> {
        let config = Self {
            train_fraction,
            validation_fraction,
            test_fraction,
            seed,
        };
        config.validate()?;
        Ok(config)
    }

    /// Validate the fractions: each in (0, 1), summing to 1
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("train_fraction", self.train_fraction),
            ("validation_fraction", self.validation_fraction),
            ("test_fraction", self.test_fraction),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(CatsDogsError::Config(format!(
                    "{} must be between 0.0 and 1.0, got {}",
                    name, value
                )));
            }
        }

        let sum = self.train_fraction + self.validation_fraction + self.test_fraction;
        if (sum - 1.0).abs() > 1e-6 {
            return Err(CatsDogsError::Config(format!(
                "split fractions must sum to 1.0, got {}",
                sum
            )));
        }

        Ok(())
    }
}

/// Complete dataset splits
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetSplits {
    /// Train split, augmented during training
    pub train: Vec<ImageSample>,

    /// Validation split, drives the checkpoint policy
    pub validation: Vec<ImageSample>,

    /// Test split, evaluated once at finalization
    pub test: Vec<ImageSample>,

    /// Configuration used to create these splits
    pub config: SplitConfig,

    /// Total number of samples across all splits
    pub total_samples: usize,
}

impl DatasetSplits {
    /// Split samples deterministically by the configured fractions.
    ///
    /// Stratified per class: every class is shuffled with the seeded RNG and
    /// apportioned separately, so class balance carries into each split.
    /// Validation and test take `floor(n * fraction)` samples per class; the
    /// remainder goes to the train split, so any odd total still partitions
    /// with no sample dropped or duplicated.
    pub fn from_samples(samples: Vec<ImageSample>, config: SplitConfig) -> Result<Self> {
        config.validate()?;

        if samples.is_empty() {
            return Err(CatsDogsError::Dataset(
                "no samples provided for splitting".to_string(),
            ));
        }

        let total_samples = samples.len();
        let mut rng = ChaCha8Rng::seed_from_u64(config.seed);

        // Group by label; fixed class order keeps the shared RNG stream
        // deterministic across runs.
        let mut by_class: Vec<Vec<ImageSample>> = vec![Vec::new(); NUM_CLASSES];
        for sample in samples {
            by_class[sample.label].push(sample);
        }

        let mut train = Vec::new();
        let mut validation = Vec::new();
        let mut test = Vec::new();

        for mut class_samples in by_class {
            class_samples.shuffle(&mut rng);

            let n = class_samples.len();
            let n_val = (n as f64 * config.validation_fraction).floor() as usize;
            let n_test = (n as f64 * config.test_fraction).floor() as usize;

            let mut iter = class_samples.into_iter();
            validation.extend(iter.by_ref().take(n_val));
            test.extend(iter.by_ref().take(n_test));
            train.extend(iter);
        }

        Ok(Self {
            train,
            validation,
            test,
            config,
            total_samples,
        })
    }

    /// Statistics about the splits
    pub fn stats(&self) -> SplitStats {
        SplitStats {
            total_samples: self.total_samples,
            train_size: self.train.len(),
            validation_size: self.validation.len(),
            test_size: self.test.len(),
        }
    }

    /// Save splits to a JSON file for reproducibility
    pub fn save(&self, path: &std::path::Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Load splits from a JSON file
    pub fn load(path: &std::path::Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&json)?)
    }
}

/// Statistics about dataset splits
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SplitStats {
    pub total_samples: usize,
    pub train_size: usize,
    pub validation_size: usize,
    pub test_size: usize,
}

impl std::fmt::Display for SplitStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Dataset split statistics:")?;
        writeln!(f, "  Total samples: {}", self.total_samples)?;
        for (name, size) in [
            ("Train", self.train_size),
            ("Validation", self.validation_size),
            ("Test", self.test_size),
        ] {
            writeln!(
                f,
                "  {:<11} {:>6} ({:.1}%)",
                name,
                size,
                100.0 * size as f64 / self.total_samples.max(1) as f64
            )?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::path::PathBuf;

    fn create_test_samples(cats: usize, dogs: usize) -> Vec<ImageSample> {
        let mut samples = Vec::new();
        let mut id = 0;
        for (label, (dir, count)) in [("cats", cats), ("dogs", dogs)].iter().enumerate() {
            for i in 0..*count {
                samples.push(ImageSample {
                    path: PathBuf::from(format!("{}/img_{}.jpg", dir, i)),
                    label,
                    class_name: crate::dataset::CLASS_NAMES[label].to_string(),
                    id,
                });
                id += 1;
            }
        }
        samples
    }

    #[test]
    fn test_partition_exact_no_loss_no_duplication() {
        // Odd counts on purpose
        let samples = create_test_samples(53, 47);
        let splits =
            DatasetSplits::from_samples(samples, SplitConfig::default()).unwrap();

        let stats = splits.stats();
        assert_eq!(
            stats.train_size + stats.validation_size + stats.test_size,
            100
        );

        let ids: HashSet<u64> = splits
            .train
            .iter()
            .chain(splits.validation.iter())
            .chain(splits.test.iter())
            .map(|s| s.id)
            .collect();
        assert_eq!(ids.len(), 100);
    }

    #[test]
    fn test_remainder_goes_to_train() {
        // 7 per class: floor(0.1 * 7) = 0 for val and test, so everything
        // lands in train and nothing is dropped.
        let samples = create_test_samples(7, 7);
        let splits =
            DatasetSplits::from_samples(samples, SplitConfig::default()).unwrap();

        assert_eq!(splits.train.len(), 14);
        assert_eq!(splits.validation.len(), 0);
        assert_eq!(splits.test.len(), 0);
    }

    #[test]
    fn test_stratified_class_balance() {
        let samples = create_test_samples(100, 100);
        let splits =
            DatasetSplits::from_samples(samples, SplitConfig::default()).unwrap();

        for split in [&splits.validation, &splits.test] {
            let cats = split.iter().filter(|s| s.label == 0).count();
            let dogs = split.iter().filter(|s| s.label == 1).count();
            assert_eq!(cats, 10);
            assert_eq!(dogs, 10);
        }
    }

    #[test]
    fn test_same_seed_reproduces_assignment() {
        let samples = create_test_samples(40, 40);
        let config = SplitConfig::default();

        let a = DatasetSplits::from_samples(samples.clone(), config.clone()).unwrap();
        let b = DatasetSplits::from_samples(samples, config).unwrap();

        let ids = |set: &[ImageSample]| set.iter().map(|s| s.id).collect::<Vec<_>>();
        assert_eq!(ids(&a.train), ids(&b.train));
        assert_eq!(ids(&a.validation), ids(&b.validation));
        assert_eq!(ids(&a.test), ids(&b.test));
    }

    #[test]
    fn test_different_seed_changes_assignment() {
        let samples = create_test_samples(40, 40);

        let a = DatasetSplits::from_samples(
            samples.clone(),
            SplitConfig { seed: 1, ..Default::default() },
        )
        .unwrap();
        let b = DatasetSplits::from_samples(
            samples,
            SplitConfig { seed: 2, ..Default::default() },
        )
        .unwrap();

        let ids = |set: &[ImageSample]| set.iter().map(|s| s.id).collect::<Vec<_>>();
        assert_ne!(ids(&a.validation), ids(&b.validation));
    }

    #[test]
    fn test_invalid_fractions_rejected() {
        assert!(SplitConfig::new(0.8, 0.1, 0.2, 42).is_err());
        assert!(SplitConfig::new(0.8, 0.3, -0.1, 42).is_err());
        assert!(SplitConfig::new(0.8, 0.1, 0.1, 42).is_ok());
    }

    #[test]
    fn test_empty_input_rejected() {
        let err =
            DatasetSplits::from_samples(Vec::new(), SplitConfig::default()).unwrap_err();
        assert!(matches!(err, CatsDogsError::Dataset(_)));
    }
}
