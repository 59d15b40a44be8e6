//! Model and Training Configuration
//!
//! Configuration structures for the CNN architecture and the training
//! hyperparameters, with validation and JSON persistence.

use serde::{Deserialize, Serialize};

use crate::dataset::NUM_CLASSES;
use crate::utils::error::{CatsDogsError, Result};

/// Configuration for the CNN architecture
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Number of output classes (2: cat and dog)
    pub num_classes: usize,

    /// Input image size (width and height, assumed square)
    pub input_size: usize,

    /// Number of input channels (3 for RGB)
    pub input_channels: usize,

    /// Dropout rate applied between the fully connected layers
    pub dropout_rate: f64,

    /// Filters for the four convolutional blocks
    pub conv_filters: [usize; 4],

    /// Kernel size for convolutional layers
    pub kernel_size: usize,

    /// Units of the two hidden fully connected layers
    pub fc_units: [usize; 2],
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            num_classes: NUM_CLASSES,
            input_size: 224,
            input_channels: 3,
            dropout_rate: 0.5,
            conv_filters: [32, 64, 128, 256],
            kernel_size: 3,
            fc_units: [512, 128],
        }
    }
}

impl ModelConfig {
    /// Configuration with a custom input size
    pub fn with_input_size(input_size: usize) -> Self {
        Self {
            input_size,
            ..Default::default()
        }
    }

    /// Small configuration for fast tests and smoke runs
    pub fn tiny() -> Self {
        Self {
            num_classes: NUM_CLASSES,
            input_size: 32,
            input_channels: 3,
            dropout_rate: 0.25,
            conv_filters: [4, 8, 16, 16],
            kernel_size: 3,
            fc_units: [32, 16],
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.num_classes != NUM_CLASSES {
            return Err(CatsDogsError::Config(format!(
                "num_classes must be {} for the binary classifier, got {}",
                NUM_CLASSES, self.num_classes
            )));
        }

        // Four pooling stages each halve the spatial size
        if self.input_size == 0 || self.input_size % 16 != 0 {
            return Err(CatsDogsError::Config(format!(
                "input_size must be a positive multiple of 16, got {}",
                self.input_size
            )));
        }

        if !(0.0..1.0).contains(&self.dropout_rate) {
            return Err(CatsDogsError::Config(format!(
                "dropout_rate must be in [0.0, 1.0), got {}",
                self.dropout_rate
            )));
        }

        if self.kernel_size == 0 || self.kernel_size % 2 == 0 {
            return Err(CatsDogsError::Config(format!(
                "kernel_size must be a positive odd number, got {}",
                self.kernel_size
            )));
        }

        if self.conv_filters.iter().any(|&f| f == 0) || self.fc_units.iter().any(|&u| u == 0) {
            return Err(CatsDogsError::Config(
                "layer sizes must be non-zero".to_string(),
            ));
        }

        Ok(())
    }

    /// Number of features after the conv blocks are flattened
    pub fn flattened_features(&self) -> usize {
        let spatial = self.input_size / 16;
        self.conv_filters[3] * spatial * spatial
    }

    /// Save configuration to a JSON file
    pub fn save(&self, path: &std::path::Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Load configuration from a JSON file
    pub fn load(path: &std::path::Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&json)?)
    }
}

/// Training hyperparameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingConfig {
    /// Number of training epochs
    pub epochs: usize,

    /// Batch size
    pub batch_size: usize,

    /// Learning rate for the Adam optimizer
    pub learning_rate: f64,

    /// Weight decay (L2 regularization)
    pub weight_decay: f64,

    /// Random seed for splits, epoch shuffles and augmentation draws
    pub seed: u64,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            epochs: 10,
            batch_size: 32,
            learning_rate: 0.001,
            weight_decay: 1e-4,
            seed: 42,
        }
    }
}

impl TrainingConfig {
    /// Validate the hyperparameters
    pub fn validate(&self) -> Result<()> {
        if self.epochs == 0 {
            return Err(CatsDogsError::Config("epochs must be at least 1".to_string()));
        }
        if self.batch_size == 0 {
            return Err(CatsDogsError::Config(
                "batch_size must be at least 1".to_string(),
            ));
        }
        if self.learning_rate <= 0.0 {
            return Err(CatsDogsError::Config(format!(
                "learning_rate must be positive, got {}",
                self.learning_rate
            )));
        }
        Ok(())
    }
}
