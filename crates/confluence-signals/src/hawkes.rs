//! Self-exciting point process intensity.
//!
//! λ(t) = μ + Σ_{tᵢ ≤ t} α·e^(−β(t − tᵢ))
//!
//! Each recorded event raises the intensity by α, which then decays back
//! towards the baseline μ at rate β. Event times are kept sorted so the sum
//! always runs oldest-first.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::{Result, SignalError};

/// Parameters of the exponential-kernel Hawkes process.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HawkesParams {
    /// Baseline intensity μ
    pub mu: f64,
    /// Jump per event α
    pub alpha: f64,
    /// Decay rate β
    pub beta: f64,
}

impl Default for HawkesParams {
    fn default() -> Self {
        Self {
            mu: 0.1,
            alpha: 0.5,
            beta: 1.0,
        }
    }
}

impl HawkesParams {
    pub const fn new(mu: f64, alpha: f64, beta: f64) -> Self {
        Self { mu, alpha, beta }
    }

    /// μ ≥ 0, α ≥ 0, β > 0, all finite.
    pub fn validate(&self) -> Result<()> {
        if !(self.mu.is_finite() && self.mu >= 0.0) {
            return Err(SignalError::InvalidParameter {
                name: "hawkes mu",
                value: self.mu,
            });
        }
        if !(self.alpha.is_finite() && self.alpha >= 0.0) {
            return Err(SignalError::InvalidParameter {
                name: "hawkes alpha",
                value: self.alpha,
            });
        }
        if !(self.beta.is_finite() && self.beta > 0.0) {
            return Err(SignalError::InvalidParameter {
                name: "hawkes beta",
                value: self.beta,
            });
        }
        Ok(())
    }

    /// Expected number of direct offspring per event, α/β.
    pub fn branching_ratio(&self) -> f64 {
        self.alpha / self.beta
    }

    /// A process with branching ratio below one does not explode.
    pub fn is_stationary(&self) -> bool {
        self.branching_ratio() < 1.0
    }
}

/// Event history of a single entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HawkesProcess {
    params: HawkesParams,
    events: VecDeque<f64>,
}

impl HawkesProcess {
    pub fn new(params: HawkesParams) -> Self {
        Self {
            params,
            events: VecDeque::new(),
        }
    }

    pub fn params(&self) -> &HawkesParams {
        &self.params
    }

    /// Record an event. Late arrivals are inserted in sorted position.
    pub fn record(&mut self, t: f64) -> Result<()> {
        if !t.is_finite() {
            return Err(SignalError::NonFinite("event timestamp"));
        }
        match self.events.back() {
            Some(&last) if t < last => {
                let idx = self.events.partition_point(|&e| e <= t);
                self.events.insert(idx, t);
            }
            _ => self.events.push_back(t),
        }
        Ok(())
    }

    /// Drop events strictly older than `cutoff`. Returns how many were removed.
    pub fn prune_before(&mut self, cutoff: f64) -> usize {
        let mut removed = 0;
        while let Some(&front) = self.events.front() {
            if front >= cutoff {
                break;
            }
            self.events.pop_front();
            removed += 1;
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Most recent event time.
    pub fn last_event(&self) -> Option<f64> {
        self.events.back().copied()
    }

    /// Event times, oldest first.
    pub fn events(&self) -> impl Iterator<Item = f64> + '_ {
        self.events.iter().copied()
    }

    /// The self-excited part of the intensity, λ(t) − μ.
    pub fn excitation(&self, t: f64) -> f64 {
        let HawkesParams { alpha, beta, .. } = self.params;
        self.events
            .iter()
            .take_while(|&&ti| ti <= t)
            .fold(0.0, |acc, &ti| acc + alpha * (-beta * (t - ti)).exp())
    }

    /// λ(t). Exactly μ when no event precedes `t`.
    pub fn intensity(&self, t: f64) -> f64 {
        self.params.mu + self.excitation(t)
    }

    /// excitation / (excitation + α) ∈ [0, 1).
    ///
    /// One fresh event gives 0.5; a burst pushes towards 1; a quiet entity
    /// decays to 0.
    pub fn saturation(&self, t: f64) -> f64 {
        let e = self.excitation(t);
        let denom = e + self.params.alpha;
        if denom <= 0.0 || !denom.is_finite() {
            return 0.0;
        }
        (e / denom).clamp(0.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn process(events: &[f64]) -> HawkesProcess {
        let mut p = HawkesProcess::new(HawkesParams::default());
        for &t in events {
            p.record(t).unwrap();
        }
        p
    }

    #[test]
    fn no_history_is_baseline() {
        let p = process(&[]);
        for t in [0.0, 1.0, 1e9, -5.0] {
            assert_eq!(p.intensity(t), 0.1);
        }
        assert_eq!(p.saturation(10.0), 0.0);
    }

    #[test]
    fn future_events_do_not_count() {
        let p = process(&[10.0]);
        assert_eq!(p.intensity(9.999), 0.1);
    }

    #[test]
    fn jump_at_event() {
        let p = process(&[5.0]);
        assert!((p.intensity(5.0) - 0.6).abs() < 1e-12);
        assert!((p.saturation(5.0) - 0.5).abs() < 1e-12);
    }

    #[test]
    fn decays_towards_baseline() {
        let p = process(&[0.0]);
        let expected = 0.1 + 0.5 * (-3.0f64).exp();
        assert!((p.intensity(3.0) - expected).abs() < 1e-12);
        assert!(p.intensity(100.0) - 0.1 < 1e-12);
    }

    #[test]
    fn out_of_order_inserted_sorted() {
        let p = process(&[3.0, 1.0, 2.0, 2.5]);
        let times: Vec<_> = p.events().collect();
        assert_eq!(times, vec![1.0, 2.0, 2.5, 3.0]);
        assert_eq!(p.last_event(), Some(3.0));
    }

    #[test]
    fn prune_removes_old_events() {
        let mut p = process(&[1.0, 2.0, 3.0, 4.0]);
        assert_eq!(p.prune_before(2.5), 2);
        assert_eq!(p.len(), 2);
        assert_eq!(p.prune_before(0.0), 0);
        assert_eq!(p.prune_before(10.0), 2);
        assert!(p.is_empty());
    }

    #[test]
    fn rejects_non_finite_timestamp() {
        let mut p = process(&[]);
        assert!(p.record(f64::NAN).is_err());
        assert!(p.record(f64::INFINITY).is_err());
        assert!(p.is_empty());
    }

    #[test]
    fn parameter_validation() {
        assert!(HawkesParams::new(0.0, 0.0, 0.1).validate().is_ok());
        assert!(HawkesParams::new(-0.1, 0.5, 1.0).validate().is_err());
        assert!(HawkesParams::new(0.1, -0.5, 1.0).validate().is_err());
        assert!(HawkesParams::new(0.1, 0.5, 0.0).validate().is_err());
        assert!(HawkesParams::new(f64::NAN, 0.5, 1.0).validate().is_err());
    }

    #[test]
    fn branching_ratio() {
        let p = HawkesParams::default();
        assert_eq!(p.branching_ratio(), 0.5);
        assert!(p.is_stationary());
        assert!(!HawkesParams::new(0.1, 2.0, 1.0).is_stationary());
    }

    #[test]
    fn partial_json_overlays_defaults() {
        let p: HawkesParams = serde_json::from_str(r#"{"alpha": 0.8}"#).unwrap();
        assert_eq!(p, HawkesParams::new(0.1, 0.8, 1.0));
    }

    proptest! {
        #[test]
        fn strictly_decreasing_after_last_event(
            mut times in proptest::collection::vec(0.0f64..100.0, 1..20),
            gap in 0.001f64..10.0,
            step in 0.001f64..10.0,
        ) {
            times.sort_by(|a, b| a.partial_cmp(b).unwrap());
            let p = process(&times);
            let last = *times.last().unwrap();
            let t1 = last + gap;
            let t2 = t1 + step;
            prop_assert!(p.intensity(t2) < p.intensity(t1));
            prop_assert!(p.intensity(t2) >= 0.1);
        }

        #[test]
        fn each_event_adds_alpha(
            times in proptest::collection::vec(0.0f64..100.0, 0..20),
            t in 100.0f64..200.0,
        ) {
            let p = process(&times);
            let before = p.intensity(t);
            let mut q = p.clone();
            q.record(t).unwrap();
            prop_assert!((q.intensity(t) - before - 0.5).abs() < 1e-9);
        }

        #[test]
        fn saturation_in_unit_interval(
            times in proptest::collection::vec(0.0f64..100.0, 0..50),
            t in 0.0f64..200.0,
        ) {
            let s = process(&times).saturation(t);
            prop_assert!((0.0..1.0).contains(&s));
        }
    }
}
