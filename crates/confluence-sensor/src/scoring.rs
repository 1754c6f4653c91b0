//! Convergence score blending.
//!
//! ```text
//! H1        = structural entropy of the entity's component
//! H2        = wᵢ·saturation + wₚ·phase confidence
//! simple    = (H1 + H2) / 2
//! weighted  = w_s·H1 + w_b·H2
//! composite = weighted   if |simple − weighted| > delta
//!             simple     otherwise
//! ```
//!
//! Weight pairs are normalized by their sum, so `0.6/0.4` and `3/2` blend
//! the same way.

use confluence_signals::Phase;
use serde::{Deserialize, Serialize};

use crate::config::BlendConfig;

/// Per-entity scores for one window.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConvergenceScore {
    /// H1: structural entropy of the entity's component
    pub structural: f64,
    /// H2: intensity and phase blend
    pub behavioral: f64,
    /// Hawkes saturation at evaluation time
    pub intensity: f64,
    /// Most likely phase, if the entity has any observation
    pub phase: Option<Phase>,
    pub phase_confidence: f64,
    /// Blended H1/H2
    pub composite: f64,
    /// Whether the weighted blend overrode the simple average
    pub weighted_authoritative: bool,
    /// Geometric attenuation applied, if any geometry was comparable
    pub geo_factor: Option<f64>,
    /// Final score: `composite × geo_factor`
    pub adjusted: f64,
}

/// H2 from Hawkes saturation and phase confidence.
pub fn behavioral(saturation: f64, phase_confidence: f64, blend: &BlendConfig) -> f64 {
    weigh(
        saturation,
        phase_confidence,
        blend.intensity_weight,
        blend.phase_weight,
    )
}

/// Composite of H1 and H2, and whether the weighted blend was used.
pub fn composite(h1: f64, h2: f64, blend: &BlendConfig) -> (f64, bool) {
    let simple = ((h1 + h2) / 2.0).clamp(0.0, 1.0);
    let weighted = weigh(h1, h2, blend.structural_weight, blend.behavioral_weight);
    if (simple - weighted).abs() > blend.disagreement_delta {
        (weighted, true)
    } else {
        (simple, false)
    }
}

fn weigh(x: f64, y: f64, wx: f64, wy: f64) -> f64 {
    let total = wx + wy;
    if total <= 0.0 || !total.is_finite() {
        return 0.0;
    }
    ((wx * x + wy * y) / total).clamp(0.0, 1.0)
}

impl ConvergenceScore {
    /// Score from the three raw signals, before geometry.
    pub fn blend(
        structural: f64,
        intensity: f64,
        phase: Option<(Phase, f64)>,
        blend: &BlendConfig,
    ) -> Self {
        let phase_confidence = phase.map_or(0.0, |(_, c)| c);
        let h2 = behavioral(intensity, phase_confidence, blend);
        let (composite, weighted_authoritative) = composite(structural, h2, blend);
        Self {
            structural,
            behavioral: h2,
            intensity,
            phase: phase.map(|(p, _)| p),
            phase_confidence,
            composite,
            weighted_authoritative,
            geo_factor: None,
            adjusted: composite,
        }
    }

    /// Attenuate by a geometric factor in [0, 1].
    pub fn with_geo_factor(mut self, factor: f64) -> Self {
        let factor = factor.clamp(0.0, 1.0);
        self.geo_factor = Some(factor);
        self.adjusted = self.composite * factor;
        self
    }
}
