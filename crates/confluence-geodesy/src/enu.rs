//! Local tangent plane (east/north/up) frames.
//!
//! A [`LocalFrame`] is anchored at a geodetic origin. Points are expressed
//! as ECEF offsets from the origin rotated into the origin's horizon plane.

use crate::{Ellipsoid, Geodetic, Vec3, COINCIDENT_EPSILON_M};

/// East/north/up offset in metres from a frame origin.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Enu {
    pub east: f64,
    pub north: f64,
    pub up: f64,
}

impl Enu {
    pub const fn new(east: f64, north: f64, up: f64) -> Self {
        Self { east, north, up }
    }

    /// As a Cartesian vector (x = east, y = north, z = up).
    pub fn to_vec3(self) -> Vec3 {
        Vec3::new(self.east, self.north, self.up)
    }

    pub fn from_vec3(v: Vec3) -> Self {
        Self::new(v.x, v.y, v.z)
    }

    /// Straight-line distance from the frame origin.
    pub fn slant_range(&self) -> f64 {
        self.to_vec3().norm()
    }

    /// Horizontal distance from the frame origin.
    pub fn ground_range(&self) -> f64 {
        self.east.hypot(self.north)
    }
}

/// Azimuth, elevation and slant range from a frame origin to a target.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LookAngles {
    /// Clockwise from north, degrees in [0, 360)
    pub azimuth_deg: f64,
    /// Above the local horizon, degrees in [-90, 90]
    pub elevation_deg: f64,
    /// Straight-line distance in metres
    pub slant_range_m: f64,
}

/// A local tangent plane anchored at a geodetic origin.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LocalFrame {
    origin: Geodetic,
    origin_ecef: Vec3,
    ellipsoid: Ellipsoid,
    sin_lat: f64,
    cos_lat: f64,
    sin_lon: f64,
    cos_lon: f64,
}

impl LocalFrame {
    /// Frame anchored at `origin` on WGS-84.
    pub fn new(origin: Geodetic) -> Self {
        Self::on(origin, Ellipsoid::WGS84)
    }

    /// Frame anchored at `origin` on a given ellipsoid.
    pub fn on(origin: Geodetic, ellipsoid: Ellipsoid) -> Self {
        let (sin_lat, cos_lat) = origin.lat_rad().sin_cos();
        let (sin_lon, cos_lon) = origin.lon_rad().sin_cos();
        Self {
            origin,
            origin_ecef: origin.to_ecef_on(&ellipsoid),
            ellipsoid,
            sin_lat,
            cos_lat,
            sin_lon,
            cos_lon,
        }
    }

    pub fn origin(&self) -> Geodetic {
        self.origin
    }

    /// Rotate an ECEF offset into the local frame.
    pub fn rotate_to_enu(&self, d: Vec3) -> Enu {
        Enu {
            east: -self.sin_lon * d.x + self.cos_lon * d.y,
            north: -self.sin_lat * self.cos_lon * d.x - self.sin_lat * self.sin_lon * d.y
                + self.cos_lat * d.z,
            up: self.cos_lat * self.cos_lon * d.x + self.cos_lat * self.sin_lon * d.y
                + self.sin_lat * d.z,
        }
    }

    /// Rotate a local-frame offset back into ECEF axes.
    pub fn rotate_to_ecef(&self, e: Enu) -> Vec3 {
        Vec3 {
            x: -self.sin_lon * e.east - self.sin_lat * self.cos_lon * e.north
                + self.cos_lat * self.cos_lon * e.up,
            y: self.cos_lon * e.east - self.sin_lat * self.sin_lon * e.north
                + self.cos_lat * self.sin_lon * e.up,
            z: self.cos_lat * e.north + self.sin_lat * e.up,
        }
    }

    /// Express a geodetic point in this frame.
    pub fn to_enu(&self, point: &Geodetic) -> Enu {
        self.rotate_to_enu(point.to_ecef_on(&self.ellipsoid) - self.origin_ecef)
    }

    /// Convert a local-frame point back to geodetic.
    pub fn to_geodetic(&self, enu: Enu) -> Geodetic {
        Geodetic::from_ecef_on(self.origin_ecef + self.rotate_to_ecef(enu), &self.ellipsoid)
    }

    /// Look angles from the origin toward a geodetic target.
    ///
    /// `None` when the target coincides with the origin.
    pub fn look_angles(&self, target: &Geodetic) -> Option<LookAngles> {
        look_angles_of(self.to_enu(target))
    }

    /// Azimuth toward a target in degrees, clockwise from north.
    pub fn azimuth(&self, target: &Geodetic) -> Option<f64> {
        self.look_angles(target).map(|l| l.azimuth_deg)
    }

    /// Elevation toward a target in degrees above the horizon.
    pub fn elevation(&self, target: &Geodetic) -> Option<f64> {
        self.look_angles(target).map(|l| l.elevation_deg)
    }

    /// Straight-line range to a target in metres.
    pub fn slant_range(&self, target: &Geodetic) -> f64 {
        self.to_enu(target).slant_range()
    }
}

/// Look angles for a local-frame offset. `None` at zero range.
fn look_angles_of(enu: Enu) -> Option<LookAngles> {
    let range = enu.slant_range();
    if range < COINCIDENT_EPSILON_M {
        return None;
    }
    let azimuth = crate::normalize_bearing(enu.east.atan2(enu.north).to_degrees());
    let elevation = enu.up.atan2(enu.ground_range()).to_degrees();
    Some(LookAngles {
        azimuth_deg: azimuth,
        elevation_deg: elevation,
        slant_range_m: range,
    })
}
