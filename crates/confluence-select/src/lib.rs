//! Confluence Select
//!
//! Bounded, deterministic alert selection under capacity constraints.
//!
//! # Constraint Families
//!
//! - **Partition**: disjoint groups, each with a capacity
//! - **Laminar**: named sets over groups, pairwise nested or disjoint, each
//!   with a capacity
//!
//! Both are matroids, so a single family is solved exactly by the greedy
//! selector. Combining them is a matroid intersection and the same greedy
//! pass is used as an approximation.
//!
//! # Determinism
//!
//! Candidates are ranked by weight descending, then identifier ascending.
//! No state survives between calls.

mod constraint;
mod error;
mod laminar;
mod partition;
mod selector;

pub use constraint::{Constraint, ConstraintSet, RejectReason};
pub use error::{Result, SelectError};
pub use laminar::{LaminarFamily, LaminarSet, SetScope};
pub use partition::Partition;
pub use selector::{select, ActionEvent, Rejection, SelectionResult, Weighted};
