//! Error Handling Module
//!
//! Defines the error taxonomy for the cats-vs-dogs pipeline.
//! Uses thiserror for ergonomic error definitions.

use std::path::PathBuf;

use thiserror::Error;

/// Main error type for cats-vs-dogs operations
#[derive(Error, Debug)]
pub enum CatsDogsError {
    /// Invalid or unusable configuration (missing class directory,
    /// bad split ratios, malformed model settings). Fatal at startup.
    #[error("Configuration error: {0}")]
    Config(String),

    /// A single image could not be read or decoded. Callers skip the
    /// sample and continue unless the failure empties a whole batch.
    #[error("Failed to read image at '{0}': {1}")]
    Data(PathBuf, String),

    /// Error with dataset-level operations (empty batch, bad split state)
    #[error("Dataset error: {0}")]
    Dataset(String),

    /// Training produced a non-finite loss. Aborts the run; the last
    /// good checkpoint on disk is preserved.
    #[error("Training diverged: non-finite loss at epoch {epoch}, batch {batch}")]
    Divergence { epoch: usize, batch: usize },

    /// A prediction input could not be decoded as an image.
    /// Reported to the caller as a client-side failure.
    #[error("Failed to decode input image: {0}")]
    Decode(String),

    /// No model checkpoint is loaded; prediction is unavailable until
    /// the process is restarted with a valid checkpoint.
    #[error("No model checkpoint loaded")]
    NotReady,

    /// Error saving or loading a model checkpoint
    #[error("Checkpoint error: {0}")]
    Checkpoint(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Convenience Result type for cats-vs-dogs operations
pub type Result<T> = std::result::Result<T, CatsDogsError>;
