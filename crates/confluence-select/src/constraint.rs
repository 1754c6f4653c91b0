//! Constraint families and rejection reasons.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{LaminarFamily, LaminarSet, Partition, Result};

/// One matroid constraint family.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Constraint {
    Partition(Partition),
    Laminar(LaminarFamily),
}

/// Why a candidate was not selected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum RejectReason {
    /// Partition group already holds `capacity` selections
    GroupFull { group: String, capacity: usize },
    /// The innermost laminar set containing the candidate is full
    SetFull { set: String, capacity: usize },
    /// An enclosing laminar set is full
    AncestorFull { set: String, capacity: usize },
    /// Weight is NaN or infinite
    NonFiniteWeight,
    /// A higher-ranked candidate already used this identifier
    DuplicateId,
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RejectReason::GroupFull { group, capacity } => {
                write!(f, "group {} at capacity ({})", group, capacity)
            }
            RejectReason::SetFull { set, capacity } => {
                write!(f, "laminar set '{}' at capacity ({})", set, capacity)
            }
            RejectReason::AncestorFull { set, capacity } => {
                write!(f, "laminar ancestor '{}' at capacity ({})", set, capacity)
            }
            RejectReason::NonFiniteWeight => write!(f, "non-finite weight"),
            RejectReason::DuplicateId => write!(f, "duplicate identifier"),
        }
    }
}

/// All constraint families a selection must satisfy.
///
/// Resolved once; each `select` call keeps its own counters.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ConstraintSet {
    constraints: Vec<Constraint>,
}

impl ConstraintSet {
    /// No constraints: every finite, unique candidate is selected.
    pub fn unconstrained() -> Self {
        Self::default()
    }

    pub fn with(mut self, constraint: Constraint) -> Self {
        self.constraints.push(constraint);
        self
    }

    /// Build from a capacity table and a laminar family description. Empty
    /// parts add no constraint.
    pub fn from_parts(
        group_capacities: BTreeMap<String, usize>,
        default_capacity: Option<usize>,
        laminar: Vec<LaminarSet>,
    ) -> Result<Self> {
        let mut set = Self::default();
        if !group_capacities.is_empty() || default_capacity.is_some() {
            set = set.with(Constraint::Partition(Partition::new(
                group_capacities,
                default_capacity,
            )?));
        }
        if !laminar.is_empty() {
            set = set.with(Constraint::Laminar(LaminarFamily::new(laminar)?));
        }
        Ok(set)
    }

    pub fn constraints(&self) -> &[Constraint] {
        &self.constraints
    }

    pub fn is_empty(&self) -> bool {
        self.constraints.is_empty()
    }

    pub(crate) fn tally(&self) -> Tally {
        Tally {
            counts: self
                .constraints
                .iter()
                .map(|c| match c {
                    Constraint::Partition(_) => Counter::Groups(BTreeMap::new()),
                    Constraint::Laminar(f) => Counter::Sets(vec![0; f.sets().len()]),
                })
                .collect(),
        }
    }

    /// First violated constraint, in declaration order.
    pub(crate) fn check(&self, tally: &Tally, group: &str) -> Option<RejectReason> {
        self.constraints
            .iter()
            .zip(&tally.counts)
            .find_map(|(c, counter)| match (c, counter) {
                (Constraint::Partition(p), Counter::Groups(g)) => p.check(g, group),
                (Constraint::Laminar(f), Counter::Sets(s)) => f.check(s, group),
                _ => None,
            })
    }

    pub(crate) fn admit(&self, tally: &mut Tally, group: &str) {
        for (c, counter) in self.constraints.iter().zip(tally.counts.iter_mut()) {
            match (c, counter) {
                (Constraint::Partition(_), Counter::Groups(g)) => Partition::admit(g, group),
                (Constraint::Laminar(f), Counter::Sets(s)) => f.admit(s, group),
                _ => {}
            }
        }
    }
}

/// Per-call usage counters, parallel to `ConstraintSet::constraints`.
#[derive(Debug, Clone)]
pub(crate) struct Tally {
    counts: Vec<Counter>,
}

#[derive(Debug, Clone)]
enum Counter {
    Groups(BTreeMap<String, usize>),
    Sets(Vec<usize>),
}
