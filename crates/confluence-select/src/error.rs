//! Error types for constraint construction.

use thiserror::Error;

/// Result type for constraint construction.
pub type Result<T> = std::result::Result<T, SelectError>;

/// A constraint family that cannot be built.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SelectError {
    /// Group tag in a capacity table is empty
    #[error("empty group name in capacity table")]
    EmptyGroup,

    /// Laminar set has an empty name
    #[error("laminar set with empty name")]
    EmptySetName,

    /// Laminar set covers no groups
    #[error("laminar set '{0}' covers no groups")]
    EmptyScope(String),

    /// Two laminar sets share a name
    #[error("duplicate laminar set '{0}'")]
    DuplicateSetName(String),

    /// Two sets partially overlap
    #[error("laminar sets '{first}' and '{second}' partially overlap")]
    NotLaminar { first: String, second: String },
}
