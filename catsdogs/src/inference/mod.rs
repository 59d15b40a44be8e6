//! Inference module: checkpoint loading and prediction

pub mod predictor;

pub use predictor::{PredictionResult, Predictor};
