//! Confluence Sensor
//!
//! A synchronous, windowed convergence-detection sensor. Observations are
//! queued with [`Sensor::ingest`] and scored together by
//! [`Sensor::run_window`]:
//!
//! ```text
//! Observation → graph update → {entropy, intensity, phase} → score blend
//!             → geometric attenuation → candidates → constrained selection
//! ```
//!
//! # Determinism
//!
//! Every collection is ordered, events apply in (timestamp, arrival) order and
//! the graph clock comes from the data. Identical inputs and configuration
//! give bit-identical reports and fingerprints.
//!
//! # Atomicity
//!
//! A window either commits completely or not at all. Errors and exhausted
//! budgets leave the previous graph in place.

pub mod config;
mod error;
pub mod geo;
pub mod graph;
mod model;
pub mod scoring;
mod sensor;
mod snapshot;
mod window;

pub use config::{
    BlendConfig, GeoConfig, IngestConfig, RetentionConfig, SelectionConfig, SensorConfig,
    CONFIG_ENV,
};
pub use error::{ConfigError, Result, SensorError, ValidationError};
pub use graph::{EdgeKey, EdgeKind, Eviction, WorkingGraph};
pub use model::{EntityId, EntityRef, Event, Position};
pub use scoring::ConvergenceScore;
pub use sensor::{fingerprint, Candidate, Sensor, WindowReport};
pub use snapshot::{EdgeSnapshot, EntitySnapshot, GraphSnapshot};
pub use window::{WindowBudget, WindowStage};

// Re-exported so callers can build configs and read reports without
// depending on the component crates directly.
pub use confluence_geodesy as geodesy;
pub use confluence_select as select;
pub use confluence_signals as signals;
