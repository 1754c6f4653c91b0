//! Sensor configuration.
//!
//! Every section is `#[serde(default)]`, so a JSON document only needs the
//! fields it changes:
//!
//! ```json
//! { "selection": { "convergence_threshold": 0.7, "default_capacity": 2 } }
//! ```

use std::collections::BTreeMap;
use std::path::Path;

use confluence_geodesy::{Geodetic, LocalFrame};
use confluence_select::{ConstraintSet, LaminarSet};
use confluence_signals::{HawkesParams, PhaseConfig, PhaseModel};
use serde::{Deserialize, Serialize};

use crate::ConfigError;

/// Environment variable naming a JSON config file.
pub const CONFIG_ENV: &str = "CONFLUENCE_CONFIG";

/// Complete, immutable sensor configuration.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SensorConfig {
    pub hawkes: HawkesParams,
    pub phase: PhaseConfig,
    pub blend: BlendConfig,
    pub geo: GeoConfig,
    pub retention: RetentionConfig,
    pub ingest: IngestConfig,
    pub selection: SelectionConfig,
}

/// How the signals combine into one score.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BlendConfig {
    /// Weight of Hawkes saturation in H2
    pub intensity_weight: f64,
    /// Weight of phase confidence in H2
    pub phase_weight: f64,
    /// Weight of H1 in the weighted composite
    pub structural_weight: f64,
    /// Weight of H2 in the weighted composite
    pub behavioral_weight: f64,
    /// Above this gap between simple and weighted composites the weighted one is used
    pub disagreement_delta: f64,
}

impl Default for BlendConfig {
    fn default() -> Self {
        Self {
            intensity_weight: 0.6,
            phase_weight: 0.4,
            structural_weight: 0.6,
            behavioral_weight: 0.4,
            disagreement_delta: 0.1,
        }
    }
}

/// Geometric attenuation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeoConfig {
    /// Distance at which proximity confidence falls to 1/e
    pub proximity_scale_m: f64,
    /// Miss distance at one sigma of intercept confidence
    pub intercept_scale_m: f64,
    /// Intercepts further ahead than this are ignored
    pub horizon_s: f64,
    /// Smallest geometric factor; the score is never cut below `floor × composite`
    pub floor: f64,
    /// Origin of the local frame that `Position::Local` coordinates use
    pub origin: Option<Geodetic>,
}

impl Default for GeoConfig {
    fn default() -> Self {
        Self {
            proximity_scale_m: 1_000.0,
            intercept_scale_m: 250.0,
            horizon_s: 3_600.0,
            floor: 0.5,
            origin: None,
        }
    }
}

impl GeoConfig {
    pub fn frame(&self) -> Option<LocalFrame> {
        self.origin.map(LocalFrame::new)
    }
}

/// Working graph bounds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetentionConfig {
    /// Entities and edges idle longer than this are evicted
    pub horizon_s: f64,
    pub max_entities: usize,
    pub max_edges: usize,
    /// Exponential edge decay rate per second
    pub edge_decay: f64,
    /// Edges decayed below this weight are dropped
    pub min_edge_weight: f64,
    /// Events this close in time may form a temporal edge
    pub co_occurrence_tolerance_s: f64,
    /// Minimum feature cosine similarity for a temporal edge
    pub similarity_threshold: f64,
}

impl Default for RetentionConfig {
    fn default() -> Self {
        Self {
            horizon_s: 3_600.0,
            max_entities: 10_000,
            max_edges: 100_000,
            edge_decay: 0.001,
            min_edge_weight: 0.01,
            co_occurrence_tolerance_s: 5.0,
            similarity_threshold: 0.8,
        }
    }
}

/// Ingestion limits.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestConfig {
    pub min_timestamp: f64,
    pub max_timestamp: f64,
    pub max_pending_events: usize,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            min_timestamp: 0.0,
            // Year 2286 in Unix seconds
            max_timestamp: 1e10,
            max_pending_events: 100_000,
        }
    }
}

/// Alert threshold and capacity tables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectionConfig {
    /// Adjusted scores strictly above this become candidates
    pub convergence_threshold: f64,
    pub group_capacities: BTreeMap<String, usize>,
    /// Capacity for groups not in `group_capacities`; absent means unbounded
    pub default_capacity: Option<usize>,
    pub laminar: Vec<LaminarSet>,
}

impl Default for SelectionConfig {
    fn default() -> Self {
        Self {
            convergence_threshold: 0.6,
            group_capacities: BTreeMap::new(),
            default_capacity: None,
            laminar: Vec::new(),
        }
    }
}

impl SelectionConfig {
    pub fn constraints(&self) -> Result<ConstraintSet, ConfigError> {
        Ok(ConstraintSet::from_parts(
            self.group_capacities.clone(),
            self.default_capacity,
            self.laminar.clone(),
        )?)
    }
}

/// Models built once from a validated config.
#[derive(Debug, Clone)]
pub(crate) struct Resolved {
    pub phase: PhaseModel,
    pub constraints: ConstraintSet,
    pub frame: Option<LocalFrame>,
}

impl SensorConfig {
    /// Parse a JSON document over the defaults.
    pub fn from_json_str(s: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a JSON file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    /// Load the file named by `CONFLUENCE_CONFIG`, or defaults when unset.
    pub fn from_env() -> Result<Self, ConfigError> {
        match std::env::var(CONFIG_ENV) {
            Ok(path) if !path.trim().is_empty() => Self::from_file(path.trim()),
            _ => Ok(Self::default()),
        }
    }

    /// Check every field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.resolve().map(|_| ())
    }

    pub(crate) fn resolve(&self) -> Result<Resolved, ConfigError> {
        self.hawkes.validate()?;
        let phase = PhaseModel::new(&self.phase)?;

        let b = &self.blend;
        for (field, w) in [
            ("blend.intensity_weight", b.intensity_weight),
            ("blend.phase_weight", b.phase_weight),
            ("blend.structural_weight", b.structural_weight),
            ("blend.behavioral_weight", b.behavioral_weight),
        ] {
            unit(field, w)?;
        }
        if b.intensity_weight + b.phase_weight <= 0.0 {
            return Err(ConfigError::invalid("blend", "intensity and phase weights are both zero"));
        }
        if b.structural_weight + b.behavioral_weight <= 0.0 {
            return Err(ConfigError::invalid(
                "blend",
                "structural and behavioral weights are both zero",
            ));
        }
        unit("blend.disagreement_delta", b.disagreement_delta)?;

        let g = &self.geo;
        positive("geo.proximity_scale_m", g.proximity_scale_m)?;
        positive("geo.intercept_scale_m", g.intercept_scale_m)?;
        positive("geo.horizon_s", g.horizon_s)?;
        unit("geo.floor", g.floor)?;
        if let Some(origin) = &g.origin {
            origin
                .validate()
                .map_err(|e| ConfigError::invalid("geo.origin", e.to_string()))?;
        }

        let r = &self.retention;
        positive("retention.horizon_s", r.horizon_s)?;
        if r.max_entities == 0 {
            return Err(ConfigError::invalid("retention.max_entities", "must be at least 1"));
        }
        if !(r.edge_decay.is_finite() && r.edge_decay >= 0.0) {
            return Err(ConfigError::invalid(
                "retention.edge_decay",
                format!("{} is not a non-negative rate", r.edge_decay),
            ));
        }
        if !(r.min_edge_weight.is_finite() && r.min_edge_weight >= 0.0) {
            return Err(ConfigError::invalid(
                "retention.min_edge_weight",
                format!("{} is negative or non-finite", r.min_edge_weight),
            ));
        }
        if !(r.co_occurrence_tolerance_s.is_finite() && r.co_occurrence_tolerance_s >= 0.0) {
            return Err(ConfigError::invalid(
                "retention.co_occurrence_tolerance_s",
                format!("{} is negative or non-finite", r.co_occurrence_tolerance_s),
            ));
        }
        if !(r.similarity_threshold.is_finite() && (-1.0..=1.0).contains(&r.similarity_threshold)) {
            return Err(ConfigError::invalid(
                "retention.similarity_threshold",
                format!("{} is outside [-1, 1]", r.similarity_threshold),
            ));
        }

        let i = &self.ingest;
        if !(i.min_timestamp.is_finite() && i.max_timestamp.is_finite()) {
            return Err(ConfigError::invalid("ingest", "timestamp bounds must be finite"));
        }
        if i.min_timestamp > i.max_timestamp {
            return Err(ConfigError::invalid(
                "ingest",
                format!("min_timestamp {} > max_timestamp {}", i.min_timestamp, i.max_timestamp),
            ));
        }
        if i.max_pending_events == 0 {
            return Err(ConfigError::invalid("ingest.max_pending_events", "must be at least 1"));
        }

        unit("selection.convergence_threshold", self.selection.convergence_threshold)?;
        let constraints = self.selection.constraints()?;

        Ok(Resolved {
            phase,
            constraints,
            frame: self.geo.frame(),
        })
    }
}

fn unit(field: &'static str, v: f64) -> Result<(), ConfigError> {
    if v.is_finite() && (0.0..=1.0).contains(&v) {
        Ok(())
    } else {
        Err(ConfigError::invalid(field, format!("{} is outside [0, 1]", v)))
    }
}

fn positive(field: &'static str, v: f64) -> Result<(), ConfigError> {
    if v.is_finite() && v > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::invalid(field, format!("{} is not positive", v)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use confluence_select::SetScope;
    use tempfile::tempdir;

    #[test]
    fn defaults_validate() {
        let config = SensorConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.hawkes, HawkesParams::new(0.1, 0.5, 1.0));
        assert_eq!(config.selection.convergence_threshold, 0.6);
        assert_eq!(config.blend.disagreement_delta, 0.1);
    }

    #[test]
    fn partial_json_overlays_defaults() {
        let config = SensorConfig::from_json_str(
            r#"{
                "hawkes": {"mu": 0.2},
                "selection": {
                    "default_capacity": 2,
                    "group_capacities": {"host": 1},
                    "laminar": [{"name": "all", "scope": "all", "capacity": 5}]
                }
            }"#,
        )
        .unwrap();
        assert_eq!(config.hawkes.mu, 0.2);
        assert_eq!(config.hawkes.alpha, 0.5);
        assert_eq!(config.selection.default_capacity, Some(2));
        assert_eq!(config.selection.laminar[0].scope, SetScope::All);
        assert_eq!(config.retention, RetentionConfig::default());
        assert_eq!(config.selection.constraints().unwrap().constraints().len(), 2);
    }

    #[test]
    fn empty_document_is_default() {
        assert_eq!(SensorConfig::from_json_str("{}").unwrap(), SensorConfig::default());
    }

    #[test]
    fn rejects_out_of_range_fields() {
        for doc in [
            r#"{"hawkes": {"beta": 0.0}}"#,
            r#"{"phase": {"stay": [0.6, 0.5, 1.5, 0.9]}}"#,
            r#"{"blend": {"intensity_weight": 0.0, "phase_weight": 0.0}}"#,
            r#"{"blend": {"disagreement_delta": -0.1}}"#,
            r#"{"geo": {"floor": 1.5}}"#,
            r#"{"geo": {"origin": {"lat_deg": 95.0, "lon_deg": 0.0}}}"#,
            r#"{"retention": {"max_entities": 0}}"#,
            r#"{"ingest": {"min_timestamp": 10.0, "max_timestamp": 1.0}}"#,
            r#"{"selection": {"convergence_threshold": 2.0}}"#,
            r#"{"selection": {"laminar": [
                {"name": "x", "scope": {"groups": ["a", "b"]}, "capacity": 1},
                {"name": "y", "scope": {"groups": ["b", "c"]}, "capacity": 1}
            ]}}"#,
        ] {
            assert!(SensorConfig::from_json_str(doc).is_err(), "accepted {}", doc);
        }
    }

    #[test]
    fn malformed_json_is_parse_error() {
        assert!(matches!(
            SensorConfig::from_json_str("{not json"),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn missing_file_is_io_error() {
        assert!(matches!(
            SensorConfig::from_file("/nonexistent/confluence.json"),
            Err(ConfigError::Io(_))
        ));
    }

    #[test]
    fn from_file_round_trip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("confluence.json");
        std::fs::write(&path, r#"{"retention": {"horizon_s": 60.0}}"#).unwrap();
        let config = SensorConfig::from_file(&path).unwrap();
        assert_eq!(config.retention.horizon_s, 60.0);
    }

    #[test]
    fn invalid_file_contents_refused() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("confluence.json");
        std::fs::write(&path, r#"{"hawkes": {"beta": 0.0}}"#).unwrap();
        assert!(SensorConfig::from_file(&path).is_err());
    }
}
