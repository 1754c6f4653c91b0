//! Read-only export of the committed graph.

use std::collections::BTreeMap;

use confluence_geodesy::Enu;
use confluence_signals::Phase;
use serde::{Deserialize, Serialize};

use crate::graph::{EdgeKind, WorkingGraph};
use crate::scoring::ConvergenceScore;
use crate::{EntityId, Position};

/// One entity as of the last committed window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntitySnapshot {
    pub id: EntityId,
    pub category: String,
    pub position: Option<Position>,
    pub velocity: Option<Enu>,
    /// Time of the position fix
    pub position_seen: Option<f64>,
    pub first_seen: f64,
    pub last_seen: f64,
    pub observations: u64,
    /// Retained event times
    pub history: usize,
    pub intensity: Option<f64>,
    pub phase: Option<Phase>,
    pub phase_confidence: Option<f64>,
    pub score: Option<ConvergenceScore>,
}

/// One relationship, weight decayed to the graph clock.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EdgeSnapshot {
    pub a: EntityId,
    pub b: EntityId,
    pub kind: EdgeKind,
    pub weight: f64,
    pub updated: f64,
}

/// Owned copy of the sensor's state.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct GraphSnapshot {
    /// Windows emitted before this snapshot
    pub windows: u64,
    pub clock: Option<f64>,
    pub entities: Vec<EntitySnapshot>,
    pub edges: Vec<EdgeSnapshot>,
}

impl GraphSnapshot {
    pub(crate) fn capture(
        graph: &WorkingGraph,
        scores: &BTreeMap<EntityId, ConvergenceScore>,
        windows: u64,
    ) -> Self {
        let clock = graph.clock();
        let decay = graph.edge_decay();

        let entities = graph
            .entities()
            .map(|e| EntitySnapshot {
                id: e.id.clone(),
                category: e.category.clone(),
                position: e.position,
                velocity: e.velocity,
                position_seen: e.position_seen,
                first_seen: e.first_seen,
                last_seen: e.last_seen,
                observations: e.observations,
                history: e.hawkes().len(),
                intensity: clock.map(|t| e.hawkes().intensity(t)),
                phase: e.phase().map(|p| p.phase),
                phase_confidence: e.phase().map(|p| p.confidence),
                score: scores.get(&e.id).copied(),
            })
            .collect();

        let edges = graph
            .edges()
            .map(|(k, e)| EdgeSnapshot {
                a: k.a.clone(),
                b: k.b.clone(),
                kind: k.kind,
                weight: clock.map_or(0.0, |t| e.weight_at(t, decay)),
                updated: e.updated(),
            })
            .collect();

        Self {
            windows,
            clock,
            entities,
            edges,
        }
    }

    pub fn entity(&self, id: &EntityId) -> Option<&EntitySnapshot> {
        self.entities.iter().find(|e| &e.id == id)
    }

    /// Pretty JSON.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}
