//! The convergence sensor.
//!
//! # Window
//!
//! ```text
//! Idle → GraphUpdated → Scored → Adjusted → Selected → Emitted
//! ```
//!
//! A window works on a staged copy of the graph. Only a fully emitted window
//! replaces the committed graph; any failure or exhausted budget drops the
//! staged copy together with the window's observations.

use std::collections::{BTreeMap, BTreeSet};

use confluence_select::{select, SelectionResult, Weighted};
use confluence_signals::{entropy_report, structural_entropy, EntropyReport};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::{Resolved, SensorConfig};
use crate::geo;
use crate::graph::{Eviction, WorkingGraph};
use crate::scoring::ConvergenceScore;
use crate::snapshot::GraphSnapshot;
use crate::window::{WindowBudget, WindowRun, WindowStage};
use crate::{EntityId, Event, Result, ValidationError};

/// An entity proposed for alerting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    pub entity: EntityId,
    pub category: String,
    pub score: ConvergenceScore,
}

impl Weighted for Candidate {
    fn id(&self) -> &str {
        self.entity.as_str()
    }

    fn weight(&self) -> f64 {
        self.score.adjusted
    }

    fn group(&self) -> &str {
        &self.category
    }
}

/// Output of one window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WindowReport {
    /// Zero-based index of this window
    pub window: u64,
    /// Graph clock the window was scored at
    pub evaluated_at: Option<f64>,
    /// Observations applied
    pub events: usize,
    pub eviction: Eviction,
    /// Whole-graph entropy
    pub graph: EntropyReport,
    /// Every retained entity's scores
    pub scores: BTreeMap<EntityId, ConvergenceScore>,
    pub selection: SelectionResult<Candidate>,
    /// Hex blake3 digest of the JSON-serialized selection
    pub fingerprint: String,
}

/// Hex blake3 digest of the JSON serialization of `value`.
pub fn fingerprint<T: Serialize>(value: &T) -> Result<String> {
    let bytes = serde_json::to_vec(value)?;
    Ok(hex::encode(blake3::hash(&bytes).as_bytes()))
}

/// One sensor instance. Owns its graph, histories and beliefs.
#[derive(Debug)]
pub struct Sensor {
    config: SensorConfig,
    resolved: Resolved,
    graph: WorkingGraph,
    pending: Vec<Event>,
    windows: u64,
    last_scores: BTreeMap<EntityId, ConvergenceScore>,
}

impl Sensor {
    /// Build a sensor; the configuration is validated once and then frozen.
    pub fn new(config: SensorConfig) -> Result<Self> {
        let resolved = config.resolve()?;
        let graph = WorkingGraph::new(config.retention, config.hawkes);
        info!(
            "Sensor ready (threshold {}, {} constraint families)",
            config.selection.convergence_threshold,
            resolved.constraints.constraints().len()
        );
        Ok(Self {
            config,
            resolved,
            graph,
            pending: Vec::new(),
            windows: 0,
            last_scores: BTreeMap::new(),
        })
    }

    pub fn config(&self) -> &SensorConfig {
        &self.config
    }

    /// Committed working graph.
    pub fn graph(&self) -> &WorkingGraph {
        &self.graph
    }

    /// Observations waiting for the next window.
    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    /// Windows emitted so far.
    pub fn windows(&self) -> u64 {
        self.windows
    }

    /// Queue an observation for the next window. Invalid observations are
    /// refused and nothing changes.
    pub fn ingest(&mut self, event: Event) -> std::result::Result<(), ValidationError> {
        self.validate(&event)?;
        self.pending.push(event);
        Ok(())
    }

    fn validate(&self, event: &Event) -> std::result::Result<(), ValidationError> {
        let limits = &self.config.ingest;
        if self.pending.len() >= limits.max_pending_events {
            return Err(ValidationError::PendingFull {
                capacity: limits.max_pending_events,
            });
        }

        if !event.timestamp.is_finite() {
            return Err(ValidationError::NonFinite("timestamp"));
        }
        if event.timestamp < limits.min_timestamp || event.timestamp > limits.max_timestamp {
            return Err(ValidationError::TimestampOutOfRange {
                timestamp: event.timestamp,
                min: limits.min_timestamp,
                max: limits.max_timestamp,
            });
        }

        if event.entities.is_empty() {
            return Err(ValidationError::NoEntities);
        }
        let mut seen = BTreeSet::new();
        for r in &event.entities {
            if r.id.as_str().is_empty() {
                return Err(ValidationError::EmptyEntityId);
            }
            if !seen.insert(&r.id) {
                return Err(ValidationError::DuplicateEntity(r.id.clone()));
            }
            if r.category.is_empty() {
                return Err(ValidationError::EmptyCategory(r.id.clone()));
            }
            if let Some(position) = &r.position {
                position
                    .validate()
                    .map_err(|source| ValidationError::InvalidPosition {
                        entity: r.id.clone(),
                        source,
                    })?;
            }
            if let Some(v) = &r.velocity {
                if !(v.east.is_finite() && v.north.is_finite() && v.up.is_finite()) {
                    return Err(ValidationError::NonFinite("velocity"));
                }
            }
        }

        if event.features.iter().any(|x| !x.is_finite()) {
            return Err(ValidationError::NonFinite("feature"));
        }
        let expected = self.resolved.phase.feature_dim();
        if !event.features.is_empty() && event.features.len() != expected {
            return Err(ValidationError::FeatureDimension {
                expected,
                got: event.features.len(),
            });
        }
        Ok(())
    }

    /// Run one window over everything pending.
    ///
    /// On success the staged graph is committed and the report returned. On
    /// any error the committed graph is untouched and the window's
    /// observations are discarded.
    pub fn run_window(&mut self, budget: &WindowBudget) -> Result<WindowReport> {
        let pending = std::mem::take(&mut self.pending);
        let count = pending.len();

        match self.evaluate(pending, budget) {
            Ok((graph, report)) => {
                self.graph = graph;
                self.last_scores = report.scores.clone();
                self.windows += 1;
                info!(
                    "Window {} emitted: {} events, {} entities, {} selected ({})",
                    report.window,
                    report.events,
                    report.scores.len(),
                    report.selection.selected.len(),
                    report.fingerprint.get(..12).unwrap_or_default()
                );
                Ok(report)
            }
            Err(e) => {
                warn!("Window {} aborted, {} events discarded: {}", self.windows, count, e);
                Err(e)
            }
        }
    }

    fn evaluate(
        &self,
        mut pending: Vec<Event>,
        budget: &WindowBudget,
    ) -> Result<(WorkingGraph, WindowReport)> {
        let mut run = WindowRun::new(budget, self.windows);

        // 1. Graph update on a staged copy
        run.check()?;
        pending.sort_by(|a, b| a.timestamp.total_cmp(&b.timestamp));
        let mut staged = self.graph.clone();
        for event in &pending {
            staged.apply(event, &self.resolved.phase)?;
        }
        let eviction = staged.evict();
        run.advance()?;

        // 2-4. H1, H2 and composite per entity
        let now = staged.clock().unwrap_or(0.0);
        let components = staged.components();
        let mut scores = BTreeMap::new();
        for component in &components {
            let h1 = structural_entropy(component);
            for id in &component.members {
                let Some(entity) = staged.entity(id) else {
                    continue;
                };
                let phase = entity.phase().map(|e| (e.phase, e.confidence));
                let score = ConvergenceScore::blend(
                    h1,
                    entity.hawkes().saturation(now),
                    phase,
                    &self.config.blend,
                );
                scores.insert(id.clone(), score);
            }
        }
        run.advance()?;

        // 5. Geometry may only attenuate
        let frame = self.resolved.frame.as_ref();
        for component in &components {
            if component.len() < 2 {
                continue;
            }
            let peers: Vec<_> = component
                .members
                .iter()
                .filter_map(|id| staged.entity(id))
                .collect();
            for entity in &peers {
                let Some(support) =
                    geo::support(entity, peers.iter().copied(), now, &self.config.geo, frame)
                else {
                    continue;
                };
                if let Some(score) = scores.get_mut(&entity.id) {
                    *score = score.with_geo_factor(geo::factor(support, self.config.geo.floor));
                }
            }
        }
        run.advance()?;

        // 6-7. Candidates above threshold, constrained selection
        let threshold = self.config.selection.convergence_threshold;
        let candidates: Vec<Candidate> = scores
            .iter()
            .filter(|(_, s)| s.adjusted > threshold)
            .filter_map(|(id, s)| {
                staged.entity(id).map(|e| Candidate {
                    entity: id.clone(),
                    category: e.category.clone(),
                    score: *s,
                })
            })
            .collect();
        debug!(
            candidates = candidates.len(),
            threshold, "building selection"
        );
        let selection = select(candidates, &self.resolved.constraints);
        run.advance()?;

        // 8. Emit
        let report = WindowReport {
            window: self.windows,
            evaluated_at: staged.clock(),
            events: pending.len(),
            eviction,
            graph: entropy_report(&staged),
            fingerprint: fingerprint(&selection)?,
            scores,
            selection,
        };
        run.advance()?;
        debug_assert_eq!(run.stage(), WindowStage::Emitted);

        Ok((staged, report))
    }

    /// Owned, serializable copy of the committed graph and last scores.
    pub fn snapshot(&self) -> GraphSnapshot {
        GraphSnapshot::capture(&self.graph, &self.last_scores, self.windows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{EntityRef, Position, SensorError};
    use confluence_geodesy::Geodetic;
    use std::sync::atomic::AtomicBool;
    use std::sync::Arc;

    fn sensor() -> Sensor {
        Sensor::new(SensorConfig::default()).unwrap()
    }

    fn single(t: f64, id: &str, features: &[f64]) -> Event {
        Event::new(t, vec![EntityRef::new(id, "host")], features.to_vec())
    }

    #[test]
    fn sensor_is_send() {
        fn assert_send<T: Send>() {}
        assert_send::<Sensor>();
    }

    #[test]
    fn ingest_validation() {
        let mut s = sensor();
        let cases = vec![
            (Event::new(1.0, vec![], vec![]), "no entities"),
            (single(f64::NAN, "a", &[]), "nan timestamp"),
            (single(-1.0, "a", &[]), "before min"),
            (single(1e11, "a", &[]), "after max"),
            (single(1.0, "", &[]), "empty id"),
            (
                Event::new(1.0, vec![EntityRef::new("a", "x"), EntityRef::new("a", "y")], vec![]),
                "duplicate",
            ),
            (Event::new(1.0, vec![EntityRef::new("a", "")], vec![]), "empty category"),
            (single(1.0, "a", &[1.0, 0.0]), "wrong dimension"),
            (single(1.0, "a", &[f64::INFINITY, 0.0, 0.0, 0.0]), "infinite feature"),
            (
                Event::new(
                    1.0,
                    vec![EntityRef::new("a", "x").at(Position::Geodetic(Geodetic {
                        lat_deg: 91.0,
                        lon_deg: 0.0,
                        alt_m: 0.0,
                    }))],
                    vec![],
                ),
                "bad latitude",
            ),
        ];
        for (event, label) in cases {
            assert!(s.ingest(event).is_err(), "accepted {}", label);
        }
        assert_eq!(s.pending(), 0);
        assert!(s.ingest(single(1.0, "a", &[])).is_ok());
        assert_eq!(s.pending(), 1);
    }

    #[test]
    fn pending_buffer_is_bounded() {
        let mut config = SensorConfig::default();
        config.ingest.max_pending_events = 2;
        let mut s = Sensor::new(config).unwrap();
        s.ingest(single(1.0, "a", &[])).unwrap();
        s.ingest(single(2.0, "b", &[])).unwrap();
        assert_eq!(
            s.ingest(single(3.0, "c", &[])),
            Err(ValidationError::PendingFull { capacity: 2 })
        );
    }

    #[test]
    fn invalid_config_refused() {
        let mut config = SensorConfig::default();
        config.hawkes.beta = -1.0;
        assert!(matches!(Sensor::new(config), Err(SensorError::Config(_))));
    }

    #[test]
    fn empty_window_emits_empty_report() {
        let mut s = sensor();
        let report = s.run_window(&WindowBudget::unlimited()).unwrap();
        assert_eq!(report.window, 0);
        assert_eq!(report.evaluated_at, None);
        assert!(report.selection.selected.is_empty());
        assert_eq!(report.fingerprint.len(), 64);
        assert_eq!(s.windows(), 1);
    }

    #[test]
    fn converging_pair_selected_isolated_entity_not() {
        let mut s = sensor();
        s.ingest(single(100.0, "a", &[0.9, 0.1, 0.0, 0.0])).unwrap();
        s.ingest(single(100.0, "b", &[0.85, 0.15, 0.0, 0.0])).unwrap();
        s.ingest(single(100.0, "loner", &[0.0, 0.0, 0.0, 1.0])).unwrap();

        let report = s.run_window(&WindowBudget::unlimited()).unwrap();
        assert_eq!(report.selection.selected_ids(), vec!["a", "b"]);
        assert_eq!(report.events, 3);
        assert_eq!(report.evaluated_at, Some(100.0));

        let a = report.scores[&EntityId::from("a")];
        assert!((a.structural - 1.0).abs() < 1e-12);
        assert!(a.adjusted > 0.6);
        assert_eq!(a.geo_factor, None);
        assert!(report.scores[&EntityId::from("loner")].adjusted < 0.6);
    }

    #[test]
    fn featureless_cold_pair_not_selected() {
        let mut s = sensor();
        for t in 0..10 {
            s.ingest(Event::new(
                t as f64,
                vec![EntityRef::new("a", "host"), EntityRef::new("b", "host")],
                vec![],
            ))
            .unwrap();
        }
        s.ingest(single(1000.0, "z", &[])).unwrap();

        let report = s.run_window(&WindowBudget::unlimited()).unwrap();
        let a = report.scores[&EntityId::from("a")];
        assert_eq!(a.phase, None);
        assert_eq!(a.phase_confidence, 0.0);
        assert_eq!(a.behavioral, 0.0);
        assert!(a.adjusted <= 0.6);
        assert!(report.selection.selected.is_empty());
    }

    #[test]
    fn cancelled_window_leaves_state_untouched() {
        let mut s = sensor();
        s.ingest(single(1.0, "a", &[])).unwrap();
        s.run_window(&WindowBudget::unlimited()).unwrap();
        let before = s.snapshot();

        s.ingest(single(2.0, "b", &[])).unwrap();
        let flag = Arc::new(AtomicBool::new(true));
        let err = s
            .run_window(&WindowBudget::unlimited().with_cancel_flag(flag))
            .unwrap_err();
        assert!(matches!(err, SensorError::Cancelled { .. }));

        assert_eq!(s.snapshot(), before);
        assert_eq!(s.pending(), 0);
        assert_eq!(s.windows(), 1);
        assert!(s.graph().entity(&EntityId::from("b")).is_none());
    }

    #[test]
    fn geometry_attenuates_distant_pair() {
        let mut s = sensor();
        let near = |id: &str, east: f64| {
            Event::new(
                5.0,
                vec![EntityRef::new(id, "uav").at(Position::Local(confluence_geodesy::Enu::new(
                    east, 0.0, 0.0,
                )))],
                vec![0.9, 0.1, 0.0, 0.0],
            )
        };
        s.ingest(near("a", 0.0)).unwrap();
        s.ingest(near("b", 100_000.0)).unwrap();

        let report = s.run_window(&WindowBudget::unlimited()).unwrap();
        let a = report.scores[&EntityId::from("a")];
        let factor = a.geo_factor.unwrap();
        assert!((factor - 0.5).abs() < 1e-6);
        assert!((a.adjusted - a.composite * factor).abs() < 1e-12);
        assert!(report.selection.selected.is_empty());
    }

    #[test]
    fn events_applied_in_timestamp_order() {
        let mut s = sensor();
        s.ingest(single(10.0, "a", &[])).unwrap();
        s.ingest(single(5.0, "a", &[])).unwrap();
        s.run_window(&WindowBudget::unlimited()).unwrap();
        let a = s.graph().entity(&EntityId::from("a")).unwrap();
        assert_eq!(a.first_seen, 5.0);
        assert_eq!(a.last_seen, 10.0);
    }

    #[test]
    fn fingerprint_is_stable() {
        let run = || {
            let mut s = sensor();
            s.ingest(single(1.0, "x", &[0.0, 1.0, 0.0, 0.0])).unwrap();
            s.ingest(single(1.5, "y", &[0.0, 1.0, 0.1, 0.0])).unwrap();
            s.run_window(&WindowBudget::unlimited()).unwrap()
        };
        let one = run();
        let two = run();
        assert_eq!(one.fingerprint, two.fingerprint);
        assert_eq!(one, two);
    }
}
