//! Observation data model.

use std::fmt;

use confluence_geodesy::{Enu, GeoError, Geodetic, LocalFrame};
use serde::{Deserialize, Serialize};

/// Stable entity identifier.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(pub String);

impl EntityId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for EntityId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Where an entity was observed.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "frame", rename_all = "snake_case")]
pub enum Position {
    /// Latitude/longitude/altitude on WGS-84
    Geodetic(Geodetic),
    /// East/north/up metres in the sensor's local frame
    Local(Enu),
}

impl Position {
    pub(crate) fn validate(&self) -> Result<(), GeoError> {
        match self {
            Position::Geodetic(g) => g.validate(),
            Position::Local(e) => {
                if e.east.is_finite() && e.north.is_finite() && e.up.is_finite() {
                    Ok(())
                } else {
                    Err(GeoError::NonFinite("local position"))
                }
            }
        }
    }

    /// Express two positions in one local frame.
    ///
    /// Local positions are taken to share the sensor frame. Geodetic
    /// positions project into `origin` when configured, otherwise into a
    /// frame anchored at `self`. A local and a geodetic position are only
    /// comparable through a configured origin.
    pub fn common_frame(&self, other: &Position, origin: Option<&LocalFrame>) -> Option<(Enu, Enu)> {
        match (self, other) {
            (Position::Local(a), Position::Local(b)) => Some((*a, *b)),
            (Position::Geodetic(a), Position::Geodetic(b)) => {
                let frame = origin.copied().unwrap_or_else(|| LocalFrame::new(*a));
                Some((frame.to_enu(a), frame.to_enu(b)))
            }
            (Position::Geodetic(a), Position::Local(b)) => origin.map(|f| (f.to_enu(a), *b)),
            (Position::Local(a), Position::Geodetic(b)) => origin.map(|f| (*a, f.to_enu(b))),
        }
    }
}

/// One entity named by an event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityRef {
    pub id: EntityId,
    pub category: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<Position>,
    /// Local-frame velocity in m/s
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub velocity: Option<Enu>,
}

impl EntityRef {
    pub fn new(id: impl Into<String>, category: impl Into<String>) -> Self {
        Self {
            id: EntityId::new(id),
            category: category.into(),
            position: None,
            velocity: None,
        }
    }

    pub fn at(mut self, position: Position) -> Self {
        self.position = Some(position);
        self
    }

    pub fn moving(mut self, velocity: Enu) -> Self {
        self.velocity = Some(velocity);
        self
    }
}

/// A timestamped observation about one or more entities.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    /// Seconds on the caller's clock
    pub timestamp: f64,
    pub entities: Vec<EntityRef>,
    /// Phase-model features; empty means "no behavioural evidence"
    #[serde(default)]
    pub features: Vec<f64>,
}

impl Event {
    pub fn new(timestamp: f64, entities: Vec<EntityRef>, features: Vec<f64>) -> Self {
        Self {
            timestamp,
            entities,
            features,
        }
    }
}

/// Cosine similarity of two feature vectors; `None` if either has zero
/// norm or the lengths differ.
pub(crate) fn cosine_similarity(a: &[f64], b: &[f64]) -> Option<f64> {
    if a.is_empty() || a.len() != b.len() {
        return None;
    }
    let (mut dot, mut na, mut nb) = (0.0, 0.0, 0.0);
    for (x, y) in a.iter().zip(b) {
        dot += x * y;
        na += x * x;
        nb += y * y;
    }
    if na == 0.0 || nb == 0.0 {
        return None;
    }
    Some((dot / (na.sqrt() * nb.sqrt())).clamp(-1.0, 1.0))
}
