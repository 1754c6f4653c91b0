//! Error types for the sensor.

use confluence_geodesy::GeoError;
use confluence_select::SelectError;
use confluence_signals::SignalError;
use thiserror::Error;

use crate::{EntityId, WindowStage};

/// Result type for sensor operations.
pub type Result<T> = std::result::Result<T, SensorError>;

/// An observation refused at ingestion. Sensor state is unchanged.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    /// Event names no entity
    #[error("event references no entities")]
    NoEntities,

    /// Entity identifier is empty
    #[error("empty entity identifier")]
    EmptyEntityId,

    /// Same entity listed twice in one event
    #[error("entity {0} referenced more than once")]
    DuplicateEntity(EntityId),

    /// Entity has no category label
    #[error("entity {0} has an empty category")]
    EmptyCategory(EntityId),

    /// NaN or infinite number
    #[error("non-finite {0}")]
    NonFinite(&'static str),

    /// Timestamp outside the accepted range
    #[error("timestamp {timestamp} outside [{min}, {max}]")]
    TimestampOutOfRange { timestamp: f64, min: f64, max: f64 },

    /// Feature vector of the wrong length
    #[error("feature vector has {got} components, expected {expected}")]
    FeatureDimension { expected: usize, got: usize },

    /// Invalid coordinates
    #[error("invalid position for {entity}: {source}")]
    InvalidPosition {
        entity: EntityId,
        #[source]
        source: GeoError,
    },

    /// Pending buffer is full
    #[error("pending buffer full ({capacity} events)")]
    PendingFull { capacity: usize },
}

/// Configuration that cannot be loaded or is out of range.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Config file could not be read
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Config document is not valid JSON for `SensorConfig`
    #[error("Parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// A numeric field is out of range
    #[error("invalid {field}: {reason}")]
    Invalid { field: &'static str, reason: String },

    /// Hawkes or phase parameters rejected
    #[error(transparent)]
    Signal(#[from] SignalError),

    /// Capacity tables rejected
    #[error(transparent)]
    Select(#[from] SelectError),
}

impl ConfigError {
    pub(crate) fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        ConfigError::Invalid {
            field,
            reason: reason.into(),
        }
    }
}

/// Errors surfaced by the sensor.
#[derive(Debug, Error)]
pub enum SensorError {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    #[error("Selection error: {0}")]
    Select(#[from] SelectError),

    #[error("Signal error: {0}")]
    Signal(#[from] SignalError),

    /// Window deadline passed before `stage`
    #[error("window budget exceeded before {stage}")]
    BudgetExceeded { stage: WindowStage },

    /// Caller cancelled the window before `stage`
    #[error("window cancelled before {stage}")]
    Cancelled { stage: WindowStage },

    /// Report could not be serialized for fingerprinting
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
