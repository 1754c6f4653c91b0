//! Deterministic greedy selection.
//!
//! # Algorithm
//!
//! ```text
//! sort candidates by (weight desc, id asc)
//! for c in sorted:
//!     if every constraint admits c: select c
//!     else: reject c with the first violated constraint
//! ```
//!
//! For a single matroid (partition-only or laminar-only) this greedy pass
//! returns a maximum-weight independent set. For the intersection of both it
//! is the usual greedy heuristic: always feasible, not always optimal.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::{ConstraintSet, RejectReason};

/// Anything the selector can rank.
pub trait Weighted {
    /// Stable identifier; breaks weight ties in ascending order.
    fn id(&self) -> &str;
    /// Priority weight, higher first.
    fn weight(&self) -> f64;
    /// Group tag the capacity constraints apply to.
    fn group(&self) -> &str;
}

/// A plain weighted, tagged candidate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionEvent {
    pub id: String,
    pub weight: f64,
    pub group: String,
}

impl ActionEvent {
    pub fn new(id: impl Into<String>, weight: f64, group: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            weight,
            group: group.into(),
        }
    }
}

impl Weighted for ActionEvent {
    fn id(&self) -> &str {
        &self.id
    }

    fn weight(&self) -> f64 {
        self.weight
    }

    fn group(&self) -> &str {
        &self.group
    }
}

/// A candidate that was not selected.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rejection<T> {
    pub item: T,
    pub reason: RejectReason,
}

/// Outcome of one selection call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectionResult<T> {
    /// Accepted candidates in selection order
    pub selected: Vec<T>,
    /// Rejected candidates in processing order; non-finite weights last
    pub rejected: Vec<Rejection<T>>,
    /// Sum of selected weights
    pub total_weight: f64,
}

impl<T> Default for SelectionResult<T> {
    fn default() -> Self {
        Self {
            selected: Vec::new(),
            rejected: Vec::new(),
            total_weight: 0.0,
        }
    }
}

impl<T: Weighted> SelectionResult<T> {
    pub fn selected_ids(&self) -> Vec<&str> {
        self.selected.iter().map(Weighted::id).collect()
    }

    pub fn is_selected(&self, id: &str) -> bool {
        self.selected.iter().any(|c| c.id() == id)
    }

    pub fn rejection(&self, id: &str) -> Option<&RejectReason> {
        self.rejected
            .iter()
            .find(|r| r.item.id() == id)
            .map(|r| &r.reason)
    }
}

/// Sort key for a finite weight; `-0.0` ranks as `0.0`.
fn rank_weight<T: Weighted>(item: &T) -> f64 {
    item.weight() + 0.0
}

/// Rank candidates and admit them greedily under `constraints`.
pub fn select<T: Weighted>(candidates: Vec<T>, constraints: &ConstraintSet) -> SelectionResult<T> {
    let (mut ranked, mut invalid): (Vec<T>, Vec<T>) =
        candidates.into_iter().partition(|c| c.weight().is_finite());

    ranked.sort_by(|a, b| {
        rank_weight(b)
            .total_cmp(&rank_weight(a))
            .then_with(|| a.id().cmp(b.id()))
    });
    invalid.sort_by(|a, b| a.id().cmp(b.id()));

    let mut result = SelectionResult::default();
    let mut seen = BTreeSet::new();
    let mut tally = constraints.tally();

    for candidate in ranked {
        if !seen.insert(candidate.id().to_string()) {
            result.rejected.push(Rejection {
                item: candidate,
                reason: RejectReason::DuplicateId,
            });
            continue;
        }

        match constraints.check(&tally, candidate.group()) {
            Some(reason) => {
                trace!(id = candidate.id(), %reason, "candidate rejected");
                result.rejected.push(Rejection {
                    item: candidate,
                    reason,
                });
            }
            None => {
                constraints.admit(&mut tally, candidate.group());
                result.total_weight += candidate.weight();
                result.selected.push(candidate);
            }
        }
    }

    result.rejected.extend(invalid.into_iter().map(|item| Rejection {
        item,
        reason: RejectReason::NonFiniteWeight,
    }));

    result
}
