//! Confluence Signals
//!
//! The three independent behavioural and structural signals the convergence
//! sensor blends each window:
//!
//! - **Structural entropy**: how evenly edges spread over a topology.
//! - **Self-exciting intensity**: Hawkes λ(t) over an entity's event times.
//! - **Phase inference**: forward-only four-state hidden model over the
//!   Recon → Staging → Execution → Exfiltration lifecycle.
//!
//! All three are deterministic: sums run in a fixed order and no state is
//! shared between instances.

mod entropy;
mod error;
mod hawkes;
mod phase;

pub use entropy::{
    entropy_report, normalized_entropy, shannon_entropy, structural_entropy, EntropyReport,
    Topology,
};
pub use error::{Result, SignalError};
pub use hawkes::{HawkesParams, HawkesProcess};
pub use phase::{Belief, Phase, PhaseConfig, PhaseEstimate, PhaseModel, PHASE_COUNT};

/// Tolerance for probability vectors summing to one.
pub const PROBABILITY_TOLERANCE: f64 = 1e-9;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert!(HawkesParams::default().validate().is_ok());
        assert!(PhaseModel::new(&PhaseConfig::default()).is_ok());
    }
}
