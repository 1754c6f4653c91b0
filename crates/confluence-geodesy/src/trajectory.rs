//! Straight-line trajectories and closest approach.
//!
//! Two constant-velocity tracks in a shared Cartesian frame. With relative
//! position r and relative velocity v at the query time, separation is
//! minimised at τ = −(r·v)/|v|². A track pair only has an intercept when
//! τ ≥ 0 and |v| is non-negligible.

use crate::{Vec3, PARALLEL_EPSILON};

/// A track with constant velocity.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Trajectory {
    /// Position at `epoch`, metres
    pub position: Vec3,
    /// Velocity, metres/second
    pub velocity: Vec3,
    /// Time at which `position` was observed, seconds
    pub epoch: f64,
}

impl Trajectory {
    pub const fn new(position: Vec3, velocity: Vec3, epoch: f64) -> Self {
        Self {
            position,
            velocity,
            epoch,
        }
    }

    /// Extrapolated position at time `t`.
    pub fn position_at(&self, t: f64) -> Vec3 {
        self.position + self.velocity * (t - self.epoch)
    }

    pub fn is_finite(&self) -> bool {
        self.position.is_finite() && self.velocity.is_finite() && self.epoch.is_finite()
    }
}

/// Point of closest approach between two trajectories.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Intercept {
    /// Absolute time of closest approach
    pub time: f64,
    /// Seconds from the query time until closest approach
    pub time_to_go: f64,
    /// Separation at closest approach, metres
    pub miss_distance: f64,
    /// Position of the first track at closest approach
    pub point_a: Vec3,
    /// Position of the second track at closest approach
    pub point_b: Vec3,
}

/// Closest approach of `a` and `b` at or after `now`.
///
/// Returns `None` ("no intercept") when:
/// - the relative velocity is negligible (parallel, identical velocity),
/// - the tracks are already diverging (closest approach in the past),
/// - closest approach is later than `now + horizon` when a horizon is given,
/// - any input is non-finite.
pub fn closest_approach(
    a: &Trajectory,
    b: &Trajectory,
    now: f64,
    horizon: Option<f64>,
) -> Option<Intercept> {
    if !a.is_finite() || !b.is_finite() || !now.is_finite() {
        return None;
    }

    let pa = a.position_at(now);
    let pb = b.position_at(now);
    let r = pa - pb;
    let v = a.velocity - b.velocity;

    let vv = v.norm_squared();
    if vv <= PARALLEL_EPSILON {
        return None;
    }

    let tau = -r.dot(&v) / vv;
    if tau < 0.0 {
        return None;
    }
    if let Some(limit) = horizon {
        if tau > limit {
            return None;
        }
    }

    let point_a = pa + a.velocity * tau;
    let point_b = pb + b.velocity * tau;
    Some(Intercept {
        time: now + tau,
        time_to_go: tau,
        miss_distance: (point_a - point_b).norm(),
        point_a,
        point_b,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn head_on_collision() {
        let a = Trajectory::new(Vec3::new(-100.0, 0.0, 0.0), Vec3::new(10.0, 0.0, 0.0), 0.0);
        let b = Trajectory::new(Vec3::new(100.0, 0.0, 0.0), Vec3::new(-10.0, 0.0, 0.0), 0.0);

        let hit = closest_approach(&a, &b, 0.0, None).unwrap();
        assert!((hit.time - 10.0).abs() < 1e-9);
        assert!(hit.miss_distance < 1e-9);
    }

    #[test]
    fn crossing_with_offset() {
        // a moves east along y = 0, b moves north along x = 0 starting 50 m
        // behind and 30 m to the side
        let a = Trajectory::new(Vec3::new(-50.0, 0.0, 0.0), Vec3::new(5.0, 0.0, 0.0), 0.0);
        let b = Trajectory::new(Vec3::new(0.0, -50.0, 30.0), Vec3::new(0.0, 5.0, 0.0), 0.0);

        let hit = closest_approach(&a, &b, 0.0, None).unwrap();
        assert!((hit.time_to_go - 10.0).abs() < 1e-9);
        assert!((hit.miss_distance - 30.0).abs() < 1e-9);
    }

    #[test]
    fn identical_velocity_has_no_intercept() {
        let v = Vec3::new(3.0, -2.0, 1.0);
        let a = Trajectory::new(Vec3::new(0.0, 0.0, 0.0), v, 0.0);
        let b = Trajectory::new(Vec3::new(500.0, 20.0, 0.0), v, 0.0);
        assert_eq!(closest_approach(&a, &b, 0.0, None), None);
    }

    #[test]
    fn diverging_tracks_have_no_intercept() {
        let a = Trajectory::new(Vec3::new(-10.0, 0.0, 0.0), Vec3::new(-1.0, 0.0, 0.0), 0.0);
        let b = Trajectory::new(Vec3::new(10.0, 0.0, 0.0), Vec3::new(1.0, 0.0, 0.0), 0.0);
        assert_eq!(closest_approach(&a, &b, 0.0, None), None);
    }

    #[test]
    fn closest_approach_already_passed() {
        let a = Trajectory::new(Vec3::new(-100.0, 0.0, 0.0), Vec3::new(10.0, 0.0, 0.0), 0.0);
        let b = Trajectory::new(Vec3::new(100.0, 0.0, 0.0), Vec3::new(-10.0, 0.0, 0.0), 0.0);
        // They met at t = 10; querying from t = 20 finds nothing ahead
        assert_eq!(closest_approach(&a, &b, 20.0, None), None);
    }

    #[test]
    fn horizon_limits_lookahead() {
        let a = Trajectory::new(Vec3::new(-100.0, 0.0, 0.0), Vec3::new(1.0, 0.0, 0.0), 0.0);
        let b = Trajectory::new(Vec3::new(100.0, 0.0, 0.0), Vec3::new(-1.0, 0.0, 0.0), 0.0);
        assert!(closest_approach(&a, &b, 0.0, Some(200.0)).is_some());
        assert_eq!(closest_approach(&a, &b, 0.0, Some(50.0)), None);
    }

    #[test]
    fn epochs_are_aligned() {
        // b was observed 5 s later than a but describes the same motion
        let a = Trajectory::new(Vec3::new(0.0, 0.0, 0.0), Vec3::new(1.0, 0.0, 0.0), 0.0);
        let b = Trajectory::new(Vec3::new(30.0, 0.0, 0.0), Vec3::new(-1.0, 0.0, 0.0), 5.0);
        // At t=5: a at 5, b at 30 → closing at 2 m/s, meet 12.5 s later
        let hit = closest_approach(&a, &b, 5.0, None).unwrap();
        assert!((hit.time - 17.5).abs() < 1e-9);
    }

    #[test]
    fn non_finite_input_has_no_intercept() {
        let a = Trajectory::new(Vec3::new(f64::NAN, 0.0, 0.0), Vec3::new(1.0, 0.0, 0.0), 0.0);
        let b = Trajectory::new(Vec3::ZERO, Vec3::new(-1.0, 0.0, 0.0), 0.0);
        assert_eq!(closest_approach(&a, &b, 0.0, None), None);
    }

    proptest! {
        #[test]
        fn miss_distance_never_exceeds_current_separation(
            ax in -1e4f64..1e4, ay in -1e4f64..1e4,
            bx in -1e4f64..1e4, by in -1e4f64..1e4,
            avx in -50.0f64..50.0, avy in -50.0f64..50.0,
            bvx in -50.0f64..50.0, bvy in -50.0f64..50.0,
        ) {
            let a = Trajectory::new(Vec3::new(ax, ay, 0.0), Vec3::new(avx, avy, 0.0), 0.0);
            let b = Trajectory::new(Vec3::new(bx, by, 0.0), Vec3::new(bvx, bvy, 0.0), 0.0);
            if let Some(hit) = closest_approach(&a, &b, 0.0, None) {
                let now_sep = a.position.distance(&b.position);
                prop_assert!(hit.time_to_go >= 0.0);
                prop_assert!(hit.miss_distance <= now_sep + 1e-6);
            }
        }
    }
}
