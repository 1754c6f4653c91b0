//! Surface distance, bearing, and projection.
//!
//! Haversine treats the Earth as a sphere of mean radius and is accurate to
//! roughly 0.5%. Vincenty's inverse solves on the ellipsoid to sub-millimetre
//! accuracy but may fail to converge for nearly antipodal points, in which
//! case it returns `None`.

use crate::{Ellipsoid, Geodetic, COINCIDENT_EPSILON_M, MEAN_EARTH_RADIUS_M};

/// Iteration cap for Vincenty's lambda refinement.
const VINCENTY_MAX_ITERATIONS: usize = 200;

/// Lambda convergence threshold in radians (≈ 0.006 mm on the ground).
const VINCENTY_TOLERANCE: f64 = 1e-12;

/// Result of Vincenty's inverse problem.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct VincentyInverse {
    /// Ellipsoidal surface distance in metres
    pub distance_m: f64,
    /// Forward azimuth at the start point, degrees in [0, 360)
    pub initial_bearing_deg: f64,
    /// Forward azimuth at the end point, degrees in [0, 360)
    pub final_bearing_deg: f64,
    /// Iterations used
    pub iterations: usize,
}

/// Normalize a longitude into [-180, 180).
pub fn normalize_longitude(lon_deg: f64) -> f64 {
    (lon_deg + 180.0).rem_euclid(360.0) - 180.0
}

/// Normalize a bearing into [0, 360).
pub fn normalize_bearing(bearing_deg: f64) -> f64 {
    let b = bearing_deg.rem_euclid(360.0);
    // rem_euclid can round up to exactly 360 for tiny negative inputs
    if b >= 360.0 {
        0.0
    } else {
        b
    }
}

/// Great-circle distance in metres on a sphere of mean Earth radius.
///
/// Altitude is ignored.
pub fn haversine_distance(a: &Geodetic, b: &Geodetic) -> f64 {
    let (lat1, lat2) = (a.lat_rad(), b.lat_rad());
    let dlat = lat2 - lat1;
    let dlon = b.lon_rad() - a.lon_rad();

    let h = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
    let h = h.clamp(0.0, 1.0);
    2.0 * MEAN_EARTH_RADIUS_M * h.sqrt().atan2((1.0 - h).sqrt())
}

/// Initial great-circle bearing from `a` toward `b`, degrees in [0, 360).
///
/// Returns `None` for coincident points, where bearing is undefined.
pub fn initial_bearing(a: &Geodetic, b: &Geodetic) -> Option<f64> {
    if haversine_distance(a, b) < COINCIDENT_EPSILON_M {
        return None;
    }

    let (lat1, lat2) = (a.lat_rad(), b.lat_rad());
    let dlon = b.lon_rad() - a.lon_rad();

    let y = dlon.sin() * lat2.cos();
    let x = lat1.cos() * lat2.sin() - lat1.sin() * lat2.cos() * dlon.cos();
    Some(normalize_bearing(y.atan2(x).to_degrees()))
}

/// Point reached by travelling `distance_m` along a great circle from
/// `start` with initial bearing `bearing_deg`. Altitude is carried over.
pub fn destination(start: &Geodetic, bearing_deg: f64, distance_m: f64) -> Geodetic {
    let delta = distance_m / MEAN_EARTH_RADIUS_M;
    let theta = bearing_deg.to_radians();
    let (lat1, lon1) = (start.lat_rad(), start.lon_rad());

    let sin_lat2 = (lat1.sin() * delta.cos() + lat1.cos() * delta.sin() * theta.cos()).clamp(-1.0, 1.0);
    let lat2 = sin_lat2.asin();
    let lon2 = lon1
        + (theta.sin() * delta.sin() * lat1.cos()).atan2(delta.cos() - lat1.sin() * sin_lat2);

    Geodetic {
        lat_deg: lat2.to_degrees(),
        lon_deg: normalize_longitude(lon2.to_degrees()),
        alt_m: start.alt_m,
    }
}

/// Great-circle midpoint. Altitude is the mean of both endpoints.
pub fn midpoint(a: &Geodetic, b: &Geodetic) -> Geodetic {
    let (lat1, lat2) = (a.lat_rad(), b.lat_rad());
    let dlon = b.lon_rad() - a.lon_rad();

    let bx = lat2.cos() * dlon.cos();
    let by = lat2.cos() * dlon.sin();
    let lat_m = (lat1.sin() + lat2.sin()).atan2(((lat1.cos() + bx).powi(2) + by * by).sqrt());
    let lon_m = a.lon_rad() + by.atan2(lat1.cos() + bx);

    Geodetic {
        lat_deg: lat_m.to_degrees(),
        lon_deg: normalize_longitude(lon_m.to_degrees()),
        alt_m: (a.alt_m + b.alt_m) / 2.0,
    }
}

/// Vincenty's inverse formula on the given ellipsoid.
///
/// Returns `None` if lambda fails to converge (nearly antipodal points).
/// Coincident points yield a zero distance with zero bearings.
pub fn vincenty_inverse(a: &Geodetic, b: &Geodetic, ellipsoid: &Ellipsoid) -> Option<VincentyInverse> {
    let f = ellipsoid.flattening;
    let major = ellipsoid.semi_major;
    let minor = ellipsoid.semi_minor();

    let l = (b.lon_deg - a.lon_deg).to_radians();
    let u1 = ((1.0 - f) * a.lat_rad().tan()).atan();
    let u2 = ((1.0 - f) * b.lat_rad().tan()).atan();
    let (sin_u1, cos_u1) = u1.sin_cos();
    let (sin_u2, cos_u2) = u2.sin_cos();

    let mut lambda = l;
    for iteration in 1..=VINCENTY_MAX_ITERATIONS {
        let (sin_lambda, cos_lambda) = lambda.sin_cos();
        let sin_sigma = ((cos_u2 * sin_lambda).powi(2)
            + (cos_u1 * sin_u2 - sin_u1 * cos_u2 * cos_lambda).powi(2))
        .sqrt();

        if sin_sigma == 0.0 {
            return Some(VincentyInverse {
                distance_m: 0.0,
                initial_bearing_deg: 0.0,
                final_bearing_deg: 0.0,
                iterations: iteration,
            });
        }

        let cos_sigma = sin_u1 * sin_u2 + cos_u1 * cos_u2 * cos_lambda;
        let sigma = sin_sigma.atan2(cos_sigma);
        let sin_alpha = cos_u1 * cos_u2 * sin_lambda / sin_sigma;
        let cos_sq_alpha = 1.0 - sin_alpha * sin_alpha;
        // Equatorial lines have cos²α = 0
        let cos_2sigma_m = if cos_sq_alpha != 0.0 {
            cos_sigma - 2.0 * sin_u1 * sin_u2 / cos_sq_alpha
        } else {
            0.0
        };
        let c = f / 16.0 * cos_sq_alpha * (4.0 + f * (4.0 - 3.0 * cos_sq_alpha));

        let previous = lambda;
        lambda = l
            + (1.0 - c)
                * f
                * sin_alpha
                * (sigma
                    + c * sin_sigma
                        * (cos_2sigma_m + c * cos_sigma * (-1.0 + 2.0 * cos_2sigma_m * cos_2sigma_m)));

        if (lambda - previous).abs() < VINCENTY_TOLERANCE {
            let u_sq = cos_sq_alpha * (major * major - minor * minor) / (minor * minor);
            let big_a = 1.0 + u_sq / 16384.0 * (4096.0 + u_sq * (-768.0 + u_sq * (320.0 - 175.0 * u_sq)));
            let big_b = u_sq / 1024.0 * (256.0 + u_sq * (-128.0 + u_sq * (74.0 - 47.0 * u_sq)));
            let delta_sigma = big_b
                * sin_sigma
                * (cos_2sigma_m
                    + big_b / 4.0
                        * (cos_sigma * (-1.0 + 2.0 * cos_2sigma_m * cos_2sigma_m)
                            - big_b / 6.0
                                * cos_2sigma_m
                                * (-3.0 + 4.0 * sin_sigma * sin_sigma)
                                * (-3.0 + 4.0 * cos_2sigma_m * cos_2sigma_m)));

            let (sin_lambda, cos_lambda) = lambda.sin_cos();
            let alpha1 = (cos_u2 * sin_lambda).atan2(cos_u1 * sin_u2 - sin_u1 * cos_u2 * cos_lambda);
            let alpha2 = (cos_u1 * sin_lambda).atan2(-sin_u1 * cos_u2 + cos_u1 * sin_u2 * cos_lambda);

            return Some(VincentyInverse {
                distance_m: minor * big_a * (sigma - delta_sigma),
                initial_bearing_deg: normalize_bearing(alpha1.to_degrees()),
                final_bearing_deg: normalize_bearing(alpha2.to_degrees()),
                iterations: iteration,
            });
        }
    }

    None
}
