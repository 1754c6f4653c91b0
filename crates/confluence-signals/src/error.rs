//! Error types for signal models.

use thiserror::Error;

/// Result type for signal operations.
pub type Result<T> = std::result::Result<T, SignalError>;

/// Invalid model parameters or observations.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SignalError {
    /// A scalar parameter is out of its allowed range
    #[error("invalid {name}: {value}")]
    InvalidParameter { name: &'static str, value: f64 },

    /// Phase centroids are malformed
    #[error("invalid phase centroids: {0}")]
    InvalidCentroids(String),

    /// Feature vector length does not match the emission model
    #[error("feature vector has {got} components, model expects {expected}")]
    FeatureDimension { expected: usize, got: usize },

    /// NaN or infinite input
    #[error("non-finite {0}")]
    NonFinite(&'static str),
}
