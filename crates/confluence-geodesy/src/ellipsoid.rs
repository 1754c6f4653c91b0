//! Reference ellipsoids.

/// An oblate reference ellipsoid defined by semi-major axis and flattening.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Ellipsoid {
    /// Equatorial radius in metres
    pub semi_major: f64,
    /// Flattening (a - b) / a
    pub flattening: f64,
}

impl Ellipsoid {
    /// World Geodetic System 1984.
    pub const WGS84: Self = Self {
        semi_major: 6_378_137.0,
        flattening: 1.0 / 298.257_223_563,
    };

    /// Polar radius b = a(1 - f).
    pub fn semi_minor(&self) -> f64 {
        self.semi_major * (1.0 - self.flattening)
    }

    /// First eccentricity squared, e² = f(2 - f).
    pub fn eccentricity_squared(&self) -> f64 {
        self.flattening * (2.0 - self.flattening)
    }

    /// Prime vertical radius of curvature N(φ) for latitude in radians.
    pub fn prime_vertical_radius(&self, lat_rad: f64) -> f64 {
        let s = lat_rad.sin();
        self.semi_major / (1.0 - self.eccentricity_squared() * s * s).sqrt()
    }
}

impl Default for Ellipsoid {
    fn default() -> Self {
        Self::WGS84
    }
}
