//! Bounded working graph of entities and typed relationships.
//!
//! The graph's clock is the latest timestamp it has applied; all decay and
//! eviction is measured against that clock, never wall time. Every map is
//! ordered so iteration, eviction ties and component numbering are stable.

use std::collections::{BTreeMap, BTreeSet, VecDeque};

use confluence_geodesy::Enu;
use confluence_signals::{
    Belief, HawkesParams, HawkesProcess, PhaseEstimate, PhaseModel, SignalError, Topology,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::RetentionConfig;
use crate::model::cosine_similarity;
use crate::{EntityId, Event, Position};

/// Relationship type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgeKind {
    /// Both entities were named by the same event
    CoEvent,
    /// Distinct events close in time with similar features
    Temporal,
}

/// Undirected edge identity; `a < b` always.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EdgeKey {
    pub a: EntityId,
    pub b: EntityId,
    pub kind: EdgeKind,
}

impl EdgeKey {
    pub fn new(x: EntityId, y: EntityId, kind: EdgeKind) -> Self {
        let (a, b) = if x <= y { (x, y) } else { (y, x) };
        Self { a, b, kind }
    }
}

/// Edge weight with exponential decay since its last reinforcement.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    weight: f64,
    updated: f64,
}

impl Edge {
    /// Weight as of `now`.
    pub fn weight_at(&self, now: f64, decay: f64) -> f64 {
        self.weight * (-decay * (now - self.updated).max(0.0)).exp()
    }

    /// Time of the latest reinforcement.
    pub fn updated(&self) -> f64 {
        self.updated
    }

    fn reinforce(&mut self, delta: f64, t: f64, decay: f64) {
        if t >= self.updated {
            self.weight = self.weight_at(t, decay) + delta;
            self.updated = t;
        } else {
            // Late observation: decay the increment up to the edge's own clock
            self.weight += delta * (-decay * (self.updated - t)).exp();
        }
    }
}

/// Everything the sensor tracks about one entity.
#[derive(Debug, Clone)]
pub struct EntityState {
    pub id: EntityId,
    pub category: String,
    pub position: Option<Position>,
    pub velocity: Option<Enu>,
    /// Time of the fix `position` came from
    pub position_seen: Option<f64>,
    pub first_seen: f64,
    pub last_seen: f64,
    pub observations: u64,
    hawkes: HawkesProcess,
    belief: Option<Belief>,
    phase: Option<PhaseEstimate>,
}

impl EntityState {
    fn new(id: EntityId, category: String, t: f64, params: HawkesParams) -> Self {
        Self {
            id,
            category,
            position: None,
            velocity: None,
            position_seen: None,
            first_seen: t,
            last_seen: t,
            observations: 0,
            hawkes: HawkesProcess::new(params),
            belief: None,
            phase: None,
        }
    }

    pub fn hawkes(&self) -> &HawkesProcess {
        &self.hawkes
    }

    /// Latest phase estimate; `None` until an event carries features.
    pub fn phase(&self) -> Option<&PhaseEstimate> {
        self.phase.as_ref()
    }
}

/// Counts of what one eviction pass removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Eviction {
    pub stale_entities: usize,
    pub stale_edges: usize,
    pub overflow_entities: usize,
    pub overflow_edges: usize,
}

impl Eviction {
    pub fn total(&self) -> usize {
        self.stale_entities + self.stale_edges + self.overflow_entities + self.overflow_edges
    }
}

#[derive(Debug, Clone)]
struct RecentEvent {
    timestamp: f64,
    entities: Vec<EntityId>,
    features: Vec<f64>,
}

/// A connected component, with the degree and category data entropy needs.
#[derive(Debug, Clone, PartialEq)]
pub struct Component {
    pub members: Vec<EntityId>,
    degrees: Vec<u64>,
    categories: BTreeMap<String, u64>,
}

impl Component {
    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

impl Topology for Component {
    fn degree_sequence(&self) -> Vec<u64> {
        self.degrees.clone()
    }

    fn category_counts(&self) -> Vec<u64> {
        self.categories.values().copied().collect()
    }
}

/// In-memory entities and relationships for the current analysis horizon.
#[derive(Debug, Clone)]
pub struct WorkingGraph {
    retention: RetentionConfig,
    hawkes: HawkesParams,
    entities: BTreeMap<EntityId, EntityState>,
    edges: BTreeMap<EdgeKey, Edge>,
    recent: VecDeque<RecentEvent>,
    clock: Option<f64>,
}

impl WorkingGraph {
    pub fn new(retention: RetentionConfig, hawkes: HawkesParams) -> Self {
        Self {
            retention,
            hawkes,
            entities: BTreeMap::new(),
            edges: BTreeMap::new(),
            recent: VecDeque::new(),
            clock: None,
        }
    }

    /// Latest applied timestamp.
    pub fn clock(&self) -> Option<f64> {
        self.clock
    }

    pub fn entity(&self, id: &EntityId) -> Option<&EntityState> {
        self.entities.get(id)
    }

    pub fn entities(&self) -> impl Iterator<Item = &EntityState> {
        self.entities.values()
    }

    pub fn edges(&self) -> impl Iterator<Item = (&EdgeKey, &Edge)> {
        self.edges.iter()
    }

    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn edge_decay(&self) -> f64 {
        self.retention.edge_decay
    }

    /// Current weight of an edge, decayed to the graph clock.
    pub fn edge_weight(&self, key: &EdgeKey) -> Option<f64> {
        let now = self.clock?;
        self.edges
            .get(key)
            .map(|e| e.weight_at(now, self.retention.edge_decay))
    }

    /// Apply one validated event: update entity state, intensity history and
    /// phase belief, then link co-event and temporal edges.
    pub fn apply(&mut self, event: &Event, phase: &PhaseModel) -> Result<(), SignalError> {
        let t = event.timestamp;
        self.clock = Some(self.clock.map_or(t, |c| c.max(t)));

        for r in &event.entities {
            let params = self.hawkes;
            let entity = self
                .entities
                .entry(r.id.clone())
                .or_insert_with(|| EntityState::new(r.id.clone(), r.category.clone(), t, params));

            entity.hawkes.record(t)?;
            // No features, no behavioural evidence: the belief stays put
            if !event.features.is_empty() {
                let estimate = phase.update(entity.belief.as_ref(), &event.features)?;
                entity.belief = Some(estimate.belief);
                entity.phase = Some(estimate);
            }
            entity.observations += 1;
            entity.first_seen = entity.first_seen.min(t);

            if t >= entity.last_seen {
                entity.last_seen = t;
                entity.category = r.category.clone();
            }
            if r.position.is_some() && entity.position_seen.map_or(true, |seen| t >= seen) {
                entity.position = r.position;
                entity.position_seen = Some(t);
                if r.velocity.is_some() {
                    entity.velocity = r.velocity;
                }
            }
        }

        let ids: Vec<EntityId> = event.entities.iter().map(|r| r.id.clone()).collect();

        for (i, a) in ids.iter().enumerate() {
            for b in &ids[i + 1..] {
                self.reinforce(a, b, EdgeKind::CoEvent, 1.0, t);
            }
        }

        let tolerance = self.retention.co_occurrence_tolerance_s;
        let threshold = self.retention.similarity_threshold;
        let mut temporal = Vec::new();
        for prior in &self.recent {
            if (prior.timestamp - t).abs() > tolerance {
                continue;
            }
            let Some(similarity) = cosine_similarity(&prior.features, &event.features) else {
                continue;
            };
            if similarity < threshold || similarity <= 0.0 {
                continue;
            }
            for a in &ids {
                for b in &prior.entities {
                    if a != b {
                        temporal.push((a.clone(), b.clone(), similarity, prior.timestamp.max(t)));
                    }
                }
            }
        }
        for (a, b, similarity, at) in temporal {
            self.reinforce(&a, &b, EdgeKind::Temporal, similarity, at);
        }

        self.recent.push_back(RecentEvent {
            timestamp: t,
            entities: ids,
            features: event.features.clone(),
        });
        if let Some(clock) = self.clock {
            let cutoff = clock - tolerance;
            self.recent.retain(|r| r.timestamp >= cutoff);
        }

        Ok(())
    }

    fn reinforce(&mut self, a: &EntityId, b: &EntityId, kind: EdgeKind, delta: f64, t: f64) {
        let key = EdgeKey::new(a.clone(), b.clone(), kind);
        let decay = self.retention.edge_decay;
        self.edges
            .entry(key)
            .and_modify(|e| e.reinforce(delta, t, decay))
            .or_insert(Edge {
                weight: delta,
                updated: t,
            });
    }

    /// Drop stale state and enforce size bounds.
    ///
    /// Entities idle past the retention horizon go first, then edges that
    /// are stale, too weak, or dangling. Over-bound entities are evicted
    /// oldest-then-weakest with ties by identifier; over-bound edges the same
    /// way by last reinforcement and weight.
    pub fn evict(&mut self) -> Eviction {
        let mut stats = Eviction::default();
        let Some(now) = self.clock else {
            return stats;
        };
        let horizon = now - self.retention.horizon_s;
        let decay = self.retention.edge_decay;

        let before = self.entities.len();
        self.entities.retain(|_, e| e.last_seen >= horizon);
        stats.stale_entities = before - self.entities.len();
        for entity in self.entities.values_mut() {
            entity.hawkes.prune_before(horizon);
        }

        let before = self.edges.len();
        let entities = &self.entities;
        let min_weight = self.retention.min_edge_weight;
        self.edges.retain(|k, e| {
            e.updated >= horizon
                && e.weight_at(now, decay) >= min_weight
                && entities.contains_key(&k.a)
                && entities.contains_key(&k.b)
        });
        stats.stale_edges = before - self.edges.len();

        if self.entities.len() > self.retention.max_entities {
            let excess = self.entities.len() - self.retention.max_entities;
            let strength = self.strengths(now);
            let mut ranked: Vec<(&EntityId, f64, f64)> = self
                .entities
                .values()
                .map(|e| (&e.id, e.last_seen, strength.get(&e.id).copied().unwrap_or(0.0)))
                .collect();
            ranked.sort_by(|x, y| {
                x.1.total_cmp(&y.1)
                    .then(x.2.total_cmp(&y.2))
                    .then_with(|| x.0.cmp(y.0))
            });
            let doomed: BTreeSet<EntityId> =
                ranked.into_iter().take(excess).map(|(id, _, _)| id.clone()).collect();

            warn!(
                "Working graph over entity bound ({} > {}), evicting {}",
                self.entities.len(),
                self.retention.max_entities,
                doomed.len()
            );
            self.entities.retain(|id, _| !doomed.contains(id));
            self.edges
                .retain(|k, _| !doomed.contains(&k.a) && !doomed.contains(&k.b));
            stats.overflow_entities = doomed.len();
        }

        if self.edges.len() > self.retention.max_edges {
            let excess = self.edges.len() - self.retention.max_edges;
            let mut ranked: Vec<(&EdgeKey, f64, f64)> = self
                .edges
                .iter()
                .map(|(k, e)| (k, e.updated, e.weight_at(now, decay)))
                .collect();
            ranked.sort_by(|x, y| {
                x.1.total_cmp(&y.1)
                    .then(x.2.total_cmp(&y.2))
                    .then_with(|| x.0.cmp(y.0))
            });
            let doomed: Vec<EdgeKey> = ranked.into_iter().take(excess).map(|(k, _, _)| k.clone()).collect();

            warn!(
                "Working graph over edge bound ({} > {}), evicting {}",
                self.edges.len(),
                self.retention.max_edges,
                doomed.len()
            );
            for key in &doomed {
                self.edges.remove(key);
            }
            stats.overflow_edges = doomed.len();
        }

        if stats.total() > 0 {
            debug!(?stats, "evicted");
        }
        stats
    }

    /// Sum of incident edge weights at `now`.
    fn strengths(&self, now: f64) -> BTreeMap<EntityId, f64> {
        let decay = self.retention.edge_decay;
        let mut out: BTreeMap<EntityId, f64> = BTreeMap::new();
        for (k, e) in &self.edges {
            let w = e.weight_at(now, decay);
            *out.entry(k.a.clone()).or_insert(0.0) += w;
            *out.entry(k.b.clone()).or_insert(0.0) += w;
        }
        out
    }

    /// Number of incident edges per entity, isolated entities included.
    pub fn degrees(&self) -> BTreeMap<&EntityId, u64> {
        let mut degrees: BTreeMap<&EntityId, u64> =
            self.entities.keys().map(|id| (id, 0)).collect();
        for k in self.edges.keys() {
            if let Some(d) = degrees.get_mut(&k.a) {
                *d += 1;
            }
            if let Some(d) = degrees.get_mut(&k.b) {
                *d += 1;
            }
        }
        degrees
    }

    /// Connected components, ordered by their smallest member.
    pub fn components(&self) -> Vec<Component> {
        let mut adjacency: BTreeMap<&EntityId, BTreeSet<&EntityId>> =
            self.entities.keys().map(|id| (id, BTreeSet::new())).collect();
        for k in self.edges.keys() {
            if let Some(n) = adjacency.get_mut(&k.a) {
                n.insert(&k.b);
            }
            if let Some(n) = adjacency.get_mut(&k.b) {
                n.insert(&k.a);
            }
        }
        let degrees = self.degrees();

        let mut visited: BTreeSet<&EntityId> = BTreeSet::new();
        let mut components = Vec::new();
        for start in self.entities.keys() {
            if !visited.insert(start) {
                continue;
            }
            let mut members = BTreeSet::new();
            let mut queue = VecDeque::from([start]);
            while let Some(id) = queue.pop_front() {
                members.insert(id);
                for &n in adjacency.get(id).into_iter().flatten() {
                    if visited.insert(n) {
                        queue.push_back(n);
                    }
                }
            }

            let mut categories = BTreeMap::new();
            for id in &members {
                if let Some(e) = self.entities.get(*id) {
                    *categories.entry(e.category.clone()).or_insert(0) += 1;
                }
            }
            components.push(Component {
                degrees: members
                    .iter()
                    .map(|id| degrees.get(id).copied().unwrap_or(0))
                    .collect(),
                members: members.into_iter().cloned().collect(),
                categories,
            });
        }
        components
    }
}

impl Topology for WorkingGraph {
    fn degree_sequence(&self) -> Vec<u64> {
        self.degrees().into_values().collect()
    }

    fn category_counts(&self) -> Vec<u64> {
        let mut counts: BTreeMap<&str, u64> = BTreeMap::new();
        for e in self.entities.values() {
            *counts.entry(e.category.as_str()).or_insert(0) += 1;
        }
        counts.into_values().collect()
    }
}
