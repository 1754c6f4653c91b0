//! Error types for geodesy.

use thiserror::Error;

/// Result type for geodesy operations.
pub type Result<T> = std::result::Result<T, GeoError>;

/// Invalid geometric input.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GeoError {
    /// Latitude outside [-90, 90] degrees
    #[error("latitude {0} outside [-90, 90]")]
    InvalidLatitude(f64),

    /// Longitude outside [-180, 180] degrees
    #[error("longitude {0} outside [-180, 180]")]
    InvalidLongitude(f64),

    /// A component was NaN or infinite
    #[error("non-finite {0}")]
    NonFinite(&'static str),
}
