//! Separation-to-confidence mappings.
//!
//! Every function here returns a value in `[0, 1]` that never increases as
//! separation grows. Negative separations count as zero; NaN or infinite
//! separations map to zero confidence. A non-positive or non-finite scale
//! collapses the curve to a step at zero.

use std::f64::consts::PI;

use crate::{haversine_distance, Geodetic};

/// A circular region on the Earth's surface.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Region {
    pub center: Geodetic,
    pub radius_m: f64,
}

impl Region {
    pub const fn new(center: Geodetic, radius_m: f64) -> Self {
        Self { center, radius_m }
    }

    /// Whether a point lies inside or on the boundary.
    pub fn contains(&self, point: &Geodetic) -> bool {
        haversine_distance(&self.center, point) <= sanitize_radius(self.radius_m)
    }
}

/// Exponential proximity confidence: exp(−d / scale).
pub fn proximity_confidence(distance_m: f64, scale_m: f64) -> f64 {
    let d = sanitize_separation(distance_m);
    if !(scale_m.is_finite() && scale_m > 0.0) {
        return step(d);
    }
    (-d / scale_m).exp().clamp(0.0, 1.0)
}

/// Gaussian intercept confidence: exp(−½ (miss / scale)²).
pub fn intercept_confidence(miss_distance_m: f64, scale_m: f64) -> f64 {
    let d = sanitize_separation(miss_distance_m);
    if !(scale_m.is_finite() && scale_m > 0.0) {
        return step(d);
    }
    let z = d / scale_m;
    (-0.5 * z * z).exp().clamp(0.0, 1.0)
}

/// Fraction of the smaller region's area covered by the intersection of two
/// circular regions (planar approximation over the great-circle separation).
///
/// 1 when one region contains the other, 0 when they are disjoint.
pub fn overlap_confidence(a: &Region, b: &Region) -> f64 {
    let d = sanitize_separation(haversine_distance(&a.center, &b.center));
    let r1 = sanitize_radius(a.radius_m);
    let r2 = sanitize_radius(b.radius_m);
    let (small, large) = if r1 <= r2 { (r1, r2) } else { (r2, r1) };

    if !d.is_finite() || !large.is_finite() {
        return 0.0;
    }
    if d >= small + large {
        // Disjoint, or two points apart
        return if d == 0.0 { 1.0 } else { 0.0 };
    }
    if d <= large - small {
        return 1.0;
    }

    let lens = lens_area(d, small, large);
    (lens / (PI * small * small)).clamp(0.0, 1.0)
}

/// Area of intersection of two circles with radii r1, r2 at distance d,
/// for |r1 − r2| < d < r1 + r2.
fn lens_area(d: f64, r1: f64, r2: f64) -> f64 {
    let alpha = ((d * d + r1 * r1 - r2 * r2) / (2.0 * d * r1)).clamp(-1.0, 1.0).acos();
    let beta = ((d * d + r2 * r2 - r1 * r1) / (2.0 * d * r2)).clamp(-1.0, 1.0).acos();
    let kite = ((-d + r1 + r2) * (d + r1 - r2) * (d - r1 + r2) * (d + r1 + r2)).max(0.0);
    r1 * r1 * alpha + r2 * r2 * beta - 0.5 * kite.sqrt()
}

fn sanitize_separation(x: f64) -> f64 {
    if x.is_nan() {
        f64::INFINITY
    } else {
        x.max(0.0)
    }
}

fn sanitize_radius(x: f64) -> f64 {
    if x.is_nan() {
        0.0
    } else {
        x.max(0.0)
    }
}

fn step(d: f64) -> f64 {
    if d == 0.0 {
        1.0
    } else {
        0.0
    }
}
