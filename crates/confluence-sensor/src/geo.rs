//! Geometric attenuation of convergence scores.
//!
//! factor = floor + (1 − floor) · max over peers of max(proximity, intercept)
//!
//! Only peers whose position can be expressed in a common frame with the
//! entity take part. Without any such peer there is no factor at all, and the
//! score passes through untouched.
//!
//! Moving tracks are extrapolated from the time of their own position fix to
//! the graph clock before separation and closest approach are measured.

use confluence_geodesy::{
    closest_approach, intercept_confidence, proximity_confidence, LocalFrame, Trajectory,
};

use crate::config::GeoConfig;
use crate::graph::EntityState;

/// Best geometric support `entity` has from any of `peers`.
pub fn support<'a>(
    entity: &EntityState,
    peers: impl IntoIterator<Item = &'a EntityState>,
    now: f64,
    geo: &GeoConfig,
    frame: Option<&LocalFrame>,
) -> Option<f64> {
    let own = entity.position?;
    let mut best: Option<f64> = None;

    for peer in peers {
        if peer.id == entity.id {
            continue;
        }
        let Some(theirs) = peer.position else {
            continue;
        };
        let Some((a, b)) = own.common_frame(&theirs, frame) else {
            continue;
        };

        if entity.velocity.is_none() && peer.velocity.is_none() {
            let separation = (a.to_vec3() - b.to_vec3()).norm();
            let confidence = proximity_confidence(separation, geo.proximity_scale_m);
            best = Some(best.map_or(confidence, |b| b.max(confidence)));
            continue;
        }

        // Each track extrapolates from the time of its own fix
        let ta = Trajectory::new(
            a.to_vec3(),
            entity.velocity.unwrap_or_default().to_vec3(),
            entity.position_seen.unwrap_or(entity.last_seen),
        );
        let tb = Trajectory::new(
            b.to_vec3(),
            peer.velocity.unwrap_or_default().to_vec3(),
            peer.position_seen.unwrap_or(peer.last_seen),
        );
        let separation = ta.position_at(now).distance(&tb.position_at(now));
        let mut confidence = proximity_confidence(separation, geo.proximity_scale_m);
        if let Some(hit) = closest_approach(&ta, &tb, now, Some(geo.horizon_s)) {
            confidence = confidence.max(intercept_confidence(
                hit.miss_distance,
                geo.intercept_scale_m,
            ));
        }

        best = Some(best.map_or(confidence, |b| b.max(confidence)));
    }

    best
}

/// Turn a support value into the multiplicative factor.
pub fn factor(support: f64, floor: f64) -> f64 {
    let floor = floor.clamp(0.0, 1.0);
    (floor + (1.0 - floor) * support.clamp(0.0, 1.0)).clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{RetentionConfig, SensorConfig};
    use crate::graph::WorkingGraph;
    use crate::{EntityId, EntityRef, Event, Position};
    use confluence_geodesy::{Enu, Geodetic};
    use confluence_signals::{HawkesParams, PhaseModel};

    fn build(refs: Vec<EntityRef>, t: f64) -> WorkingGraph {
        let mut g = WorkingGraph::new(RetentionConfig::default(), HawkesParams::default());
        let phase = PhaseModel::new(&SensorConfig::default().phase).unwrap();
        for r in refs {
            g.apply(&Event::new(t, vec![r], vec![]), &phase).unwrap();
        }
        g
    }

    fn support_of(g: &WorkingGraph, id: &str) -> Option<f64> {
        let entity = g.entity(&EntityId::from(id)).unwrap();
        support(entity, g.entities(), g.clock().unwrap(), &GeoConfig::default(), None)
    }

    fn local(e: f64, n: f64) -> Position {
        Position::Local(Enu::new(e, n, 0.0))
    }

    #[test]
    fn no_geometry_no_support() {
        let g = build(vec![EntityRef::new("a", "c"), EntityRef::new("b", "c")], 0.0);
        assert_eq!(support_of(&g, "a"), None);

        let g = build(
            vec![EntityRef::new("a", "c").at(local(0.0, 0.0)), EntityRef::new("b", "c")],
            0.0,
        );
        assert_eq!(support_of(&g, "a"), None);
    }

    #[test]
    fn colocated_entities_fully_supported() {
        let g = build(
            vec![
                EntityRef::new("a", "c").at(local(10.0, 10.0)),
                EntityRef::new("b", "c").at(local(10.0, 10.0)),
            ],
            0.0,
        );
        assert_eq!(support_of(&g, "a"), Some(1.0));
        assert_eq!(factor(1.0, 0.5), 1.0);
    }

    #[test]
    fn distant_entities_fall_to_floor() {
        let g = build(
            vec![
                EntityRef::new("a", "c").at(local(0.0, 0.0)),
                EntityRef::new("b", "c").at(local(50_000.0, 0.0)),
            ],
            0.0,
        );
        let s = support_of(&g, "a").unwrap();
        assert!(s < 1e-6);
        assert!((factor(s, 0.5) - 0.5).abs() < 1e-6);
    }

    #[test]
    fn converging_tracks_supported_by_intercept() {
        let g = build(
            vec![
                EntityRef::new("a", "c")
                    .at(local(-5_000.0, 0.0))
                    .moving(Enu::new(10.0, 0.0, 0.0)),
                EntityRef::new("b", "c")
                    .at(local(5_000.0, 0.0))
                    .moving(Enu::new(-10.0, 0.0, 0.0)),
            ],
            0.0,
        );
        let s = support_of(&g, "a").unwrap();
        assert!((s - 1.0).abs() < 1e-9, "support {}", s);
    }

    #[test]
    fn parallel_tracks_rely_on_proximity() {
        let g = build(
            vec![
                EntityRef::new("a", "c")
                    .at(local(0.0, 0.0))
                    .moving(Enu::new(10.0, 0.0, 0.0)),
                EntityRef::new("b", "c")
                    .at(local(0.0, 1_000.0))
                    .moving(Enu::new(10.0, 0.0, 0.0)),
            ],
            0.0,
        );
        let s = support_of(&g, "a").unwrap();
        assert!((s - (-1.0f64).exp()).abs() < 1e-9);
    }

    #[test]
    fn geodetic_neighbours_compare_without_origin() {
        let here = Geodetic::surface(52.0, 4.0).unwrap();
        let g = build(
            vec![
                EntityRef::new("a", "c").at(Position::Geodetic(here)),
                EntityRef::new("b", "c").at(Position::Geodetic(here)),
            ],
            0.0,
        );
        assert!((support_of(&g, "a").unwrap() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn extrapolation_starts_at_the_fix() {
        // Closing at 20 m/s from 10 km apart: they pass at t=500
        let mut g = build(
            vec![
                EntityRef::new("a", "c")
                    .at(local(-5_000.0, 0.0))
                    .moving(Enu::new(10.0, 0.0, 0.0)),
                EntityRef::new("b", "c")
                    .at(local(5_000.0, 0.0))
                    .moving(Enu::new(-10.0, 0.0, 0.0)),
            ],
            0.0,
        );
        let phase = PhaseModel::new(&SensorConfig::default().phase).unwrap();
        g.apply(
            &Event::new(600.0, vec![EntityRef::new("a", "c"), EntityRef::new("b", "c")], vec![]),
            &phase,
        )
        .unwrap();

        // At t=600 the tracks are 2 km apart and diverging
        let s = support_of(&g, "a").unwrap();
        assert!((s - (-2.0f64).exp()).abs() < 1e-9, "support {}", s);
        assert!((factor(s, 0.5) - 0.5677).abs() < 1e-4);
    }

    #[test]
    fn factor_bounds() {
        assert_eq!(factor(0.0, 0.5), 0.5);
        assert_eq!(factor(2.0, 0.5), 1.0);
        assert_eq!(factor(-1.0, 0.5), 0.5);
        assert_eq!(factor(0.5, 0.0), 0.5);
    }
}
