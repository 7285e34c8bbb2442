//! Point types
//!
//! `Point2` doubles as a complex number for plane rotations: multiplying by a
//! unit direction rotates, multiplying by its conjugate rotates back.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, Mul, Neg, Sub};

/// Lengths at or below this are treated as zero.
pub const EPSILON: f64 = 1e-9;

/// A point or vector in the XY plane
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point2 {
    pub x: f64,
    pub y: f64,
}

impl Point2 {
    /// Create a new point
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Unit vector at `angle` radians from +X
    pub fn from_angle(angle: f64) -> Self {
        Self::new(angle.cos(), angle.sin())
    }

    pub fn length(self) -> f64 {
        self.x.hypot(self.y)
    }

    pub fn length_squared(self) -> f64 {
        self.x * self.x + self.y * self.y
    }

    pub fn distance(self, other: Self) -> f64 {
        (self - other).length()
    }

    pub fn distance_squared(self, other: Self) -> f64 {
        (self - other).length_squared()
    }

    pub fn dot(self, other: Self) -> f64 {
        self.x * other.x + self.y * other.y
    }

    /// Z component of the 3D cross product
    pub fn cross(self, other: Self) -> f64 {
        self.x * other.y - self.y * other.x
    }

    /// Unit vector in the same direction, or `None` for a zero vector
    pub fn normalized(self) -> Option<Self> {
        let length = self.length();
        if length <= EPSILON {
            None
        } else {
            Some(self * (1.0 / length))
        }
    }

    /// Complex multiplication by `plane_angle`
    pub fn rotate_by(self, plane_angle: Self) -> Self {
        Self::new(
            self.x * plane_angle.x - self.y * plane_angle.y,
            self.x * plane_angle.y + self.y * plane_angle.x,
        )
    }

    /// Mirror in Y; the inverse rotation of a unit direction
    pub fn conjugate(self) -> Self {
        Self::new(self.x, -self.y)
    }

    /// Quarter turn widdershins
    pub fn left_normal(self) -> Self {
        Self::new(-self.y, self.x)
    }

    /// Angle from +X in radians
    pub fn angle(self) -> f64 {
        self.y.atan2(self.x)
    }

    /// Lift into 3D at height `z`
    pub fn with_z(self, z: f64) -> Point3 {
        Point3::new(self.x, self.y, z)
    }
}

/// Signed angle that rotates `from` onto `to`, in `(-PI, PI]`
pub fn angle_difference(to: Point2, from: Point2) -> f64 {
    to.rotate_by(from.conjugate()).angle()
}

impl Add for Point2 {
    type Output = Self;
    fn add(self, rhs: Self) -> Self {
        Self::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl Sub for Point2 {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self {
        Self::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl Mul<f64> for Point2 {
    type Output = Self;
    fn mul(self, rhs: f64) -> Self {
        Self::new(self.x * rhs, self.y * rhs)
    }
}

impl Neg for Point2 {
    type Output = Self;
    fn neg(self) -> Self {
        Self::new(-self.x, -self.y)
    }
}

/// A toolpath position
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Point3 {
    /// Create a new point
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Drop Z
    pub fn xy(self) -> Point2 {
        Point2::new(self.x, self.y)
    }

    pub fn length(self) -> f64 {
        (self.x * self.x + self.y * self.y + self.z * self.z).sqrt()
    }

    pub fn distance(self, other: Self) -> f64 {
        (self - other).length()
    }

    /// Unit vector in the same direction, or `None` for a zero vector
    pub fn normalized(self) -> Option<Self> {
        let length = self.length();
        if length <= EPSILON {
            None
        } else {
            Some(self * (1.0 / length))
        }
    }

    /// Point `length` along `direction`, which need not be normalized
    pub fn plus_segment_with_length(self, length: f64, direction: Self) -> Self {
        match direction.normalized() {
            Some(unit) => self + unit * length,
            None => self,
        }
    }
}

impl Add for Point3 {
    type Output = Self;
    fn add(self, rhs: Self) -> Self {
        Self::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl Sub for Point3 {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self {
        Self::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

impl Mul<f64> for Point3 {
    type Output = Self;
    fn mul(self, rhs: f64) -> Self {
        Self::new(self.x * rhs, self.y * rhs, self.z * rhs)
    }
}

impl Neg for Point3 {
    type Output = Self;
    fn neg(self) -> Self {
        Self::new(-self.x, -self.y, -self.z)
    }
}

impl fmt::Display for Point3 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.x, self.y, self.z)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::FRAC_PI_2;

    #[test]
    fn test_rotate_by_conjugate_restores_point() {
        let direction = Point2::new(3.0, 4.0).normalized().unwrap();
        let p = Point2::new(1.5, -2.0);
        let back = p.rotate_by(direction.conjugate()).rotate_by(direction);
        assert!((back.x - p.x).abs() < 1e-12);
        assert!((back.y - p.y).abs() < 1e-12);
    }

    #[test]
    fn test_conjugate_aligns_direction_with_x_axis() {
        let direction = Point2::new(1.0, 1.0).normalized().unwrap();
        let aligned = direction.rotate_by(direction.conjugate());
        assert!((aligned.x - 1.0).abs() < 1e-12);
        assert!(aligned.y.abs() < 1e-12);
    }

    #[test]
    fn test_angle_difference_sign() {
        let east = Point2::new(1.0, 0.0);
        let north = Point2::new(0.0, 1.0);
        assert!((angle_difference(north, east) - FRAC_PI_2).abs() < 1e-12);
        assert!((angle_difference(east, north) + FRAC_PI_2).abs() < 1e-12);
    }

    #[test]
    fn test_normalized_zero_is_none() {
        assert!(Point2::default().normalized().is_none());
        assert!(Point3::default().normalized().is_none());
    }

    #[test]
    fn test_plus_segment_with_length() {
        let p = Point3::new(1.0, 1.0, 0.2);
        let moved = p.plus_segment_with_length(2.0, Point3::new(0.0, 5.0, 0.0));
        assert_eq!(moved, Point3::new(1.0, 3.0, 0.2));
    }
}
