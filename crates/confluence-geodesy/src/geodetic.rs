//! Geodetic coordinates and the Earth-centred, Earth-fixed transform.
//!
//! The inverse transform iterates on latitude using the height form
//! h = p·cosφ + (z + e²N·sinφ)·sinφ − N, which stays well-conditioned at
//! the poles where p → 0.

use crate::error::{GeoError, Result};
use crate::{Ellipsoid, Vec3};

/// Iteration cap for the ECEF → geodetic latitude solve.
const MAX_LATITUDE_ITERATIONS: usize = 16;

/// Convergence tolerance on latitude, in radians.
const LATITUDE_TOLERANCE_RAD: f64 = 1e-14;

/// A position on or above the ellipsoid.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Geodetic {
    /// Latitude in degrees, positive north
    pub lat_deg: f64,
    /// Longitude in degrees, positive east
    pub lon_deg: f64,
    /// Height above the ellipsoid in metres
    #[cfg_attr(feature = "serde", serde(default))]
    pub alt_m: f64,
}

impl Geodetic {
    /// Create a validated geodetic position.
    pub fn new(lat_deg: f64, lon_deg: f64, alt_m: f64) -> Result<Self> {
        let point = Self {
            lat_deg,
            lon_deg,
            alt_m,
        };
        point.validate()?;
        Ok(point)
    }

    /// Create a position on the ellipsoid surface.
    pub fn surface(lat_deg: f64, lon_deg: f64) -> Result<Self> {
        Self::new(lat_deg, lon_deg, 0.0)
    }

    /// Check ranges and finiteness (for values built field-by-field or
    /// deserialized).
    pub fn validate(&self) -> Result<()> {
        if !self.lat_deg.is_finite() {
            return Err(GeoError::NonFinite("latitude"));
        }
        if !self.lon_deg.is_finite() {
            return Err(GeoError::NonFinite("longitude"));
        }
        if !self.alt_m.is_finite() {
            return Err(GeoError::NonFinite("altitude"));
        }
        if !(-90.0..=90.0).contains(&self.lat_deg) {
            return Err(GeoError::InvalidLatitude(self.lat_deg));
        }
        if !(-180.0..=180.0).contains(&self.lon_deg) {
            return Err(GeoError::InvalidLongitude(self.lon_deg));
        }
        Ok(())
    }

    #[inline]
    pub fn lat_rad(&self) -> f64 {
        self.lat_deg.to_radians()
    }

    #[inline]
    pub fn lon_rad(&self) -> f64 {
        self.lon_deg.to_radians()
    }

    /// Convert to ECEF on WGS-84.
    pub fn to_ecef(&self) -> Vec3 {
        self.to_ecef_on(&Ellipsoid::WGS84)
    }

    /// Convert to ECEF on a given ellipsoid.
    pub fn to_ecef_on(&self, ellipsoid: &Ellipsoid) -> Vec3 {
        let (sin_lat, cos_lat) = self.lat_rad().sin_cos();
        let (sin_lon, cos_lon) = self.lon_rad().sin_cos();
        let n = ellipsoid.prime_vertical_radius(self.lat_rad());
        let e2 = ellipsoid.eccentricity_squared();

        Vec3 {
            x: (n + self.alt_m) * cos_lat * cos_lon,
            y: (n + self.alt_m) * cos_lat * sin_lon,
            z: (n * (1.0 - e2) + self.alt_m) * sin_lat,
        }
    }

    /// Convert an ECEF position back to geodetic on WGS-84.
    pub fn from_ecef(ecef: Vec3) -> Self {
        Self::from_ecef_on(ecef, &Ellipsoid::WGS84)
    }

    /// Convert an ECEF position back to geodetic on a given ellipsoid.
    pub fn from_ecef_on(ecef: Vec3, ellipsoid: &Ellipsoid) -> Self {
        let e2 = ellipsoid.eccentricity_squared();
        let p = (ecef.x * ecef.x + ecef.y * ecef.y).sqrt();
        let lon = ecef.y.atan2(ecef.x);

        // The centre has no latitude of its own; report it under the equator
        if p == 0.0 && ecef.z == 0.0 {
            return Self {
                lat_deg: 0.0,
                lon_deg: lon.to_degrees(),
                alt_m: -ellipsoid.semi_major,
            };
        }

        // Initial guess ignores height
        let mut lat = ecef.z.atan2(p * (1.0 - e2));

        for _ in 0..MAX_LATITUDE_ITERATIONS {
            let (sin_lat, cos_lat) = lat.sin_cos();
            let n = ellipsoid.prime_vertical_radius(lat);
            let height = p * cos_lat + (ecef.z + e2 * n * sin_lat) * sin_lat - n;
            let next = ecef.z.atan2(p * (1.0 - e2 * n / (n + height)));
            let delta = (next - lat).abs();
            lat = next;
            if delta < LATITUDE_TOLERANCE_RAD {
                break;
            }
        }

        // Height from the settled latitude
        let (sin_lat, cos_lat) = lat.sin_cos();
        let n = ellipsoid.prime_vertical_radius(lat);
        let height = p * cos_lat + (ecef.z + e2 * n * sin_lat) * sin_lat - n;

        Self {
            lat_deg: lat.to_degrees(),
            lon_deg: lon.to_degrees(),
            alt_m: height,
        }
    }
}

impl std::fmt::Display for Geodetic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({:.6}°, {:.6}°, {:.1} m)", self.lat_deg, self.lon_deg, self.alt_m)
    }
}
