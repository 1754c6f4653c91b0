//! Three-component Cartesian vector.
//!
//! Used for ECEF positions, local-frame positions, and velocities. Plain
//! `f64` components; no unit is implied beyond "metres" or "metres/second"
//! by the caller's convention.

use std::ops::{Add, Mul, Neg, Sub};

/// A Cartesian vector.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Vec3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vec3 {
    /// The zero vector.
    pub const ZERO: Self = Self { x: 0.0, y: 0.0, z: 0.0 };

    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    #[inline]
    pub fn dot(&self, other: &Self) -> f64 {
        self.x * other.x + self.y * other.y + self.z * other.z
    }

    #[inline]
    pub fn norm_squared(&self) -> f64 {
        self.dot(self)
    }

    #[inline]
    pub fn norm(&self) -> f64 {
        self.norm_squared().sqrt()
    }

    /// Euclidean distance to another vector.
    pub fn distance(&self, other: &Self) -> f64 {
        (*self - *other).norm()
    }

    /// True when every component is finite.
    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }
}

impl Add for Vec3 {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        Self {
            x: self.x + other.x,
            y: self.y + other.y,
            z: self.z + other.z,
        }
    }
}

impl Sub for Vec3 {
    type Output = Self;

    #[inline]
    fn sub(self, other: Self) -> Self {
        Self {
            x: self.x - other.x,
            y: self.y - other.y,
            z: self.z - other.z,
        }
    }
}

impl Neg for Vec3 {
    type Output = Self;

    #[inline]
    fn neg(self) -> Self {
        Self {
            x: -self.x,
            y: -self.y,
            z: -self.z,
        }
    }
}

impl Mul<f64> for Vec3 {
    type Output = Self;

    #[inline]
    fn mul(self, k: f64) -> Self {
        Self {
            x: self.x * k,
            y: self.y * k,
            z: self.z * k,
        }
    }
}

impl std::fmt::Display for Vec3 {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {}, {})", self.x, self.y, self.z)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn addition_subtraction() {
        let a = Vec3::new(1.0, 2.0, 3.0);
        let b = Vec3::new(4.0, -1.0, 2.0);

        assert_eq!(a + b, Vec3::new(5.0, 1.0, 5.0));
        assert_eq!(a - b, Vec3::new(-3.0, 3.0, 1.0));
        assert_eq!(a + (-b), a - b);
    }

    #[test]
    fn dot_and_norm() {
        let v = Vec3::new(3.0, 4.0, 12.0);
        assert_eq!(v.norm_squared(), 169.0);
        assert_eq!(v.norm(), 13.0);
        assert_eq!(Vec3::new(1.0, 0.0, 0.0).dot(&Vec3::new(0.0, 1.0, 0.0)), 0.0);
    }

    #[test]
    fn scaling() {
        assert_eq!(Vec3::new(1.0, -2.0, 0.5) * 2.0, Vec3::new(2.0, -4.0, 1.0));
    }

    #[test]
    fn finiteness() {
        assert!(Vec3::ZERO.is_finite());
        assert!(!Vec3::new(f64::NAN, 0.0, 0.0).is_finite());
        assert!(!Vec3::new(0.0, f64::INFINITY, 0.0).is_finite());
    }
}
