//! Forward-only phase inference.
//!
//! Four ordered hidden states, each either held or advanced by one step per
//! observation. A belief over the states is pushed through the transition
//! matrix and reweighted by a Gaussian emission likelihood around each
//! phase's centroid feature profile.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{Result, SignalError, PROBABILITY_TOLERANCE};

/// Number of hidden phases.
pub const PHASE_COUNT: usize = 4;

/// Smallest emission likelihood, so one outlier never zeroes a belief.
const LIKELIHOOD_FLOOR: f64 = 1e-300;

/// Lifecycle stage of a converging activity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Recon,
    Staging,
    Execution,
    Exfiltration,
}

impl Phase {
    pub const ALL: [Phase; PHASE_COUNT] = [
        Phase::Recon,
        Phase::Staging,
        Phase::Execution,
        Phase::Exfiltration,
    ];

    pub const fn index(self) -> usize {
        self as usize
    }

    pub const fn from_index(i: usize) -> Option<Phase> {
        match i {
            0 => Some(Phase::Recon),
            1 => Some(Phase::Staging),
            2 => Some(Phase::Execution),
            3 => Some(Phase::Exfiltration),
            _ => None,
        }
    }

    /// The phase one step later, if any.
    pub const fn next(self) -> Option<Phase> {
        Self::from_index(self.index() + 1)
    }

    pub const fn is_terminal(self) -> bool {
        matches!(self, Phase::Exfiltration)
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::Recon => "recon",
            Phase::Staging => "staging",
            Phase::Execution => "execution",
            Phase::Exfiltration => "exfiltration",
        };
        f.write_str(name)
    }
}

/// Tunable phase model parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PhaseConfig {
    /// Probability of remaining in each phase for one step
    pub stay: [f64; PHASE_COUNT],
    /// Centroid feature profile per phase
    pub centroids: Vec<Vec<f64>>,
    /// Emission bandwidth σ
    pub bandwidth: f64,
}

impl Default for PhaseConfig {
    fn default() -> Self {
        let centroids = (0..PHASE_COUNT)
            .map(|i| {
                let mut c = vec![0.0; PHASE_COUNT];
                c[i] = 1.0;
                c
            })
            .collect();
        Self {
            stay: [0.6, 0.5, 0.6, 0.9],
            centroids,
            bandwidth: 0.35,
        }
    }
}

/// Probability distribution over the four phases.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Belief([f64; PHASE_COUNT]);

impl Default for Belief {
    fn default() -> Self {
        Self::uniform()
    }
}

impl Belief {
    pub const fn uniform() -> Self {
        Self([1.0 / PHASE_COUNT as f64; PHASE_COUNT])
    }

    /// All mass on one phase.
    pub fn certain(phase: Phase) -> Self {
        let mut p = [0.0; PHASE_COUNT];
        p[phase.index()] = 1.0;
        Self(p)
    }

    /// Normalize arbitrary non-negative weights into a belief.
    pub fn from_weights(weights: [f64; PHASE_COUNT]) -> Result<Self> {
        if weights.iter().any(|w| !w.is_finite() || *w < 0.0) {
            return Err(SignalError::NonFinite("belief weight"));
        }
        let total: f64 = weights.iter().sum();
        if total <= 0.0 {
            return Err(SignalError::InvalidParameter {
                name: "belief total",
                value: total,
            });
        }
        Ok(Self(weights.map(|w| w / total)))
    }

    pub fn probabilities(&self) -> &[f64; PHASE_COUNT] {
        &self.0
    }

    pub fn probability(&self, phase: Phase) -> f64 {
        self.0[phase.index()]
    }

    pub fn sum(&self) -> f64 {
        self.0.iter().sum()
    }

    /// Arg-max phase and its probability; ties resolve to the earliest phase.
    pub fn most_likely(&self) -> (Phase, f64) {
        let mut best = 0;
        for i in 1..PHASE_COUNT {
            if self.0[i] > self.0[best] {
                best = i;
            }
        }
        (Phase::ALL[best], self.0[best])
    }

    fn is_normalized(&self) -> bool {
        (self.sum() - 1.0).abs() <= PROBABILITY_TOLERANCE
    }
}

/// Result of one forward update.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PhaseEstimate {
    pub phase: Phase,
    pub confidence: f64,
    pub belief: Belief,
}

/// Validated transition matrix and emission model.
#[derive(Debug, Clone, PartialEq)]
pub struct PhaseModel {
    transition: [[f64; PHASE_COUNT]; PHASE_COUNT],
    centroids: Vec<Vec<f64>>,
    bandwidth: f64,
}

impl PhaseModel {
    pub fn new(config: &PhaseConfig) -> Result<Self> {
        for &s in &config.stay {
            if !(s.is_finite() && s > 0.0 && s <= 1.0) {
                return Err(SignalError::InvalidParameter {
                    name: "stay probability",
                    value: s,
                });
            }
        }
        if !(config.bandwidth.is_finite() && config.bandwidth > 0.0) {
            return Err(SignalError::InvalidParameter {
                name: "phase bandwidth",
                value: config.bandwidth,
            });
        }
        if config.centroids.len() != PHASE_COUNT {
            return Err(SignalError::InvalidCentroids(format!(
                "expected {} centroids, got {}",
                PHASE_COUNT,
                config.centroids.len()
            )));
        }
        let dim = config.centroids[0].len();
        if dim == 0 {
            return Err(SignalError::InvalidCentroids("empty centroid".into()));
        }
        for (i, c) in config.centroids.iter().enumerate() {
            if c.len() != dim {
                return Err(SignalError::InvalidCentroids(format!(
                    "centroid {} has {} components, expected {}",
                    i,
                    c.len(),
                    dim
                )));
            }
            if c.iter().any(|x| !x.is_finite()) {
                return Err(SignalError::NonFinite("phase centroid"));
            }
        }

        let mut transition = [[0.0; PHASE_COUNT]; PHASE_COUNT];
        for phase in Phase::ALL {
            let i = phase.index();
            match phase.next() {
                Some(next) => {
                    transition[i][i] = config.stay[i];
                    transition[i][next.index()] = 1.0 - config.stay[i];
                }
                // Terminal row renormalized to an absorbing stay
                None => transition[i][i] = 1.0,
            }
        }

        Ok(Self {
            transition,
            centroids: config.centroids.clone(),
            bandwidth: config.bandwidth,
        })
    }

    /// Length of feature vectors this model accepts (besides empty).
    pub fn feature_dim(&self) -> usize {
        self.centroids[0].len()
    }

    pub fn transition(&self, from: Phase, to: Phase) -> f64 {
        self.transition[from.index()][to.index()]
    }

    /// Check a feature vector without updating anything.
    pub fn check_features(&self, features: &[f64]) -> Result<()> {
        if features.is_empty() {
            return Ok(());
        }
        if features.len() != self.feature_dim() {
            return Err(SignalError::FeatureDimension {
                expected: self.feature_dim(),
                got: features.len(),
            });
        }
        if features.iter().any(|x| !x.is_finite()) {
            return Err(SignalError::NonFinite("feature"));
        }
        Ok(())
    }

    /// Emission likelihood of `features` under each phase.
    pub fn likelihoods(&self, features: &[f64]) -> Result<[f64; PHASE_COUNT]> {
        self.check_features(features)?;
        if features.is_empty() {
            return Ok([1.0; PHASE_COUNT]);
        }
        let two_sigma_sq = 2.0 * self.bandwidth * self.bandwidth;
        let mut out = [0.0; PHASE_COUNT];
        for (slot, centroid) in out.iter_mut().zip(&self.centroids) {
            let dist_sq: f64 = centroid
                .iter()
                .zip(features)
                .map(|(c, x)| (x - c) * (x - c))
                .sum();
            *slot = (-dist_sq / two_sigma_sq).exp().max(LIKELIHOOD_FLOOR);
        }
        Ok(out)
    }

    /// Push a belief one step through the transition matrix.
    pub fn predict(&self, belief: &Belief) -> Belief {
        let mut predicted = [0.0; PHASE_COUNT];
        for (j, slot) in predicted.iter_mut().enumerate() {
            *slot = (0..PHASE_COUNT)
                .map(|i| belief.0[i] * self.transition[i][j])
                .sum();
        }
        Belief(predicted)
    }

    /// One forward step. `prior = None` starts from the uniform belief.
    pub fn update(&self, prior: Option<&Belief>, features: &[f64]) -> Result<PhaseEstimate> {
        let likelihood = self.likelihoods(features)?;
        let prior = prior.copied().unwrap_or_default();
        let predicted = self.predict(&prior);

        let mut posterior = [0.0; PHASE_COUNT];
        for i in 0..PHASE_COUNT {
            posterior[i] = predicted.0[i] * likelihood[i];
        }
        let total: f64 = posterior.iter().sum();

        let belief = if total > 0.0 && total.is_finite() {
            Belief(posterior.map(|p| p / total))
        } else {
            // Every reachable state underflowed; fall back to the prediction
            let mass = predicted.sum();
            Belief(predicted.0.map(|p| p / mass))
        };
        debug_assert!(belief.is_normalized());

        let (phase, confidence) = belief.most_likely();
        Ok(PhaseEstimate {
            phase,
            confidence,
            belief,
        })
    }
}
