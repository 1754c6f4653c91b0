//! Confluence Geodesy
//!
//! Pure coordinate math for the convergence sensor: WGS-84 transforms,
//! surface distances, local tangent frames, straight-line trajectory
//! intercepts, and separation-to-confidence mappings.
//!
//! # Frames
//!
//! - **Geodetic**: latitude/longitude in degrees, altitude in metres above the
//!   ellipsoid.
//! - **ECEF**: Earth-centred, Earth-fixed Cartesian metres ([`Vec3`]).
//! - **ENU**: east/north/up metres relative to a caller-supplied origin
//!   ([`LocalFrame`]).
//!
//! # Confidence Contract
//!
//! Everything in this crate either returns a measurement or a confidence in
//! `[0, 1]`. Geometry never decides identity, ordering, or capacity; callers
//! may only use it to scale a confidence they already hold. Degenerate inputs
//! (coincident points, parallel trajectories) produce `None`, never a panic.

mod confidence;
mod distance;
mod ellipsoid;
mod enu;
mod error;
mod geodetic;
mod trajectory;
mod vector;

pub use confidence::{intercept_confidence, overlap_confidence, proximity_confidence, Region};
pub use distance::{
    destination, haversine_distance, initial_bearing, midpoint, normalize_bearing,
    normalize_longitude, vincenty_inverse, VincentyInverse,
};
pub use ellipsoid::Ellipsoid;
pub use enu::{Enu, LocalFrame, LookAngles};
pub use error::{GeoError, Result};
pub use geodetic::Geodetic;
pub use trajectory::{closest_approach, Intercept, Trajectory};
pub use vector::Vec3;

/// Mean Earth radius (IUGG R1) used for spherical computations, in metres.
pub const MEAN_EARTH_RADIUS_M: f64 = 6_371_008.8;

/// Relative speeds below this (m/s, squared) are treated as parallel motion.
pub const PARALLEL_EPSILON: f64 = 1e-12;

/// Points closer than this (metres) are treated as coincident.
pub const COINCIDENT_EPSILON_M: f64 = 1e-6;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wgs84_is_default_ellipsoid() {
        let e = Ellipsoid::default();
        assert_eq!(e, Ellipsoid::WGS84);
        assert!(e.semi_minor() < e.semi_major);
    }

    #[test]
    fn mean_radius_between_axes() {
        let e = Ellipsoid::WGS84;
        assert!(MEAN_EARTH_RADIUS_M < e.semi_major);
        assert!(MEAN_EARTH_RADIUS_M > e.semi_minor());
    }
}
