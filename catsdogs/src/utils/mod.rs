//! Utilities module for logging, metrics, and error handling

pub mod error;
pub mod logging;
pub mod metrics;

pub use error::{CatsDogsError, Result};
pub use logging::init_logging;
pub use metrics::{ConfusionMatrix, Metrics};
