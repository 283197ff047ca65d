//! Vector math
//!
//! Small fixed-size vector types used for object positions, velocities and
//! node coordinates. World positions are measured in units of `BS` per node.

use std::fmt;
use std::ops::{Add, AddAssign, Div, Mul, MulAssign, Neg, Sub, SubAssign};

use serde::{Deserialize, Serialize};

/// World units per node
pub const BS: f32 = 10.0;

/// 3D float vector
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct V3f {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl V3f {
    pub const ZERO: V3f = V3f::new(0.0, 0.0, 0.0);

    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    pub fn length(&self) -> f32 {
        (self.x * self.x + self.y * self.y + self.z * self.z).sqrt()
    }

    pub fn distance_to(&self, other: V3f) -> f32 {
        (*self - other).length()
    }

    /// Length of the horizontal (x/z) component
    pub fn horizontal_length(&self) -> f32 {
        (self.x * self.x + self.z * self.z).sqrt()
    }

    /// Component by axis index (0 = x, 1 = y, 2 = z)
    pub fn axis(&self, axis: usize) -> f32 {
        match axis {
            0 => self.x,
            1 => self.y,
            _ => self.z,
        }
    }

    pub fn set_axis(&mut self, axis: usize, value: f32) {
        match axis {
            0 => self.x = value,
            1 => self.y = value,
            _ => self.z = value,
        }
    }

    /// Node containing this world position
    pub fn to_node(&self) -> V3s16 {
        V3s16::new(
            world_to_node(self.x),
            world_to_node(self.y),
            world_to_node(self.z),
        )
    }
}

/// Node coordinate containing a world coordinate (nodes are centered on multiples of BS)
pub fn world_to_node(v: f32) -> i16 {
    ((v + BS / 2.0) / BS).floor().clamp(i16::MIN as f32, i16::MAX as f32) as i16
}

impl Add for V3f {
    type Output = V3f;
    fn add(self, rhs: V3f) -> V3f {
        V3f::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl AddAssign for V3f {
    fn add_assign(&mut self, rhs: V3f) {
        *self = *self + rhs;
    }
}

impl Sub for V3f {
    type Output = V3f;
    fn sub(self, rhs: V3f) -> V3f {
        V3f::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

impl SubAssign for V3f {
    fn sub_assign(&mut self, rhs: V3f) {
        *self = *self - rhs;
    }
}

impl Mul<f32> for V3f {
    type Output = V3f;
    fn mul(self, rhs: f32) -> V3f {
        V3f::new(self.x * rhs, self.y * rhs, self.z * rhs)
    }
}

impl Mul<V3f> for f32 {
    type Output = V3f;
    fn mul(self, rhs: V3f) -> V3f {
        rhs * self
    }
}

impl MulAssign<f32> for V3f {
    fn mul_assign(&mut self, rhs: f32) {
        *self = *self * rhs;
    }
}

impl Div<f32> for V3f {
    type Output = V3f;
    fn div(self, rhs: f32) -> V3f {
        V3f::new(self.x / rhs, self.y / rhs, self.z / rhs)
    }
}

impl Neg for V3f {
    type Output = V3f;
    fn neg(self) -> V3f {
        V3f::new(-self.x, -self.y, -self.z)
    }
}

impl fmt::Display for V3f {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({},{},{})", self.x, self.y, self.z)
    }
}

/// 2D float vector
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct V2f {
    pub x: f32,
    pub y: f32,
}

impl V2f {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// 2D short vector (sprite coordinates)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct V2s16 {
    pub x: i16,
    pub y: i16,
}

impl V2s16 {
    pub const fn new(x: i16, y: i16) -> Self {
        Self { x, y }
    }
}

/// 3D short vector (node coordinates)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct V3s16 {
    pub x: i16,
    pub y: i16,
    pub z: i16,
}

impl V3s16 {
    pub const fn new(x: i16, y: i16, z: i16) -> Self {
        Self { x, y, z }
    }

    /// World position of the node center
    pub fn to_world(&self) -> V3f {
        V3f::new(self.x as f32 * BS, self.y as f32 * BS, self.z as f32 * BS)
    }
}

impl fmt::Display for V3s16 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({},{},{})", self.x, self.y, self.z)
    }
}

/// Axis-aligned bounding box
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Aabb3f {
    pub min: V3f,
    pub max: V3f,
}

impl Aabb3f {
    pub const fn new(min: V3f, max: V3f) -> Self {
        Self { min, max }
    }

    /// Box scaled about the origin
    pub fn scaled(&self, factor: f32) -> Self {
        Self::new(self.min * factor, self.max * factor)
    }

    /// Box moved by an offset
    pub fn translated(&self, offset: V3f) -> Self {
        Self::new(self.min + offset, self.max + offset)
    }

    /// Strict overlap test (touching faces do not intersect)
    pub fn intersects(&self, other: &Aabb3f) -> bool {
        self.min.x < other.max.x
            && self.max.x > other.min.x
            && self.min.y < other.max.y
            && self.max.y > other.min.y
            && self.min.z < other.max.z
            && self.max.z > other.min.z
    }
}

impl Default for Aabb3f {
    fn default() -> Self {
        Self::new(V3f::new(-0.5, -0.5, -0.5), V3f::new(0.5, 0.5, 0.5))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vector_arithmetic() {
        let a = V3f::new(1.0, 2.0, 3.0);
        let b = V3f::new(0.5, 0.5, 0.5);
        assert_eq!(a + b, V3f::new(1.5, 2.5, 3.5));
        assert_eq!(a - b, V3f::new(0.5, 1.5, 2.5));
        assert_eq!(a * 2.0, V3f::new(2.0, 4.0, 6.0));
        assert_eq!(2.0 * a, a * 2.0);
        assert_eq!(a / 2.0, V3f::new(0.5, 1.0, 1.5));
    }

    #[test]
    fn test_distance() {
        let a = V3f::new(0.0, 0.0, 0.0);
        let b = V3f::new(3.0, 100.0, 4.0);
        assert!(((b - a).horizontal_length() - 5.0).abs() < 1e-6);
        assert!((V3f::new(3.0, 4.0, 0.0).distance_to(a) - 5.0).abs() < 1e-6);
    }

    #[test]
    fn test_world_to_node() {
        assert_eq!(world_to_node(0.0), 0);
        assert_eq!(world_to_node(4.9), 0);
        assert_eq!(world_to_node(5.0), 1);
        assert_eq!(world_to_node(-5.1), -1);
        assert_eq!(V3f::new(12.0, -12.0, 25.0).to_node(), V3s16::new(1, -1, 3));
    }

    #[test]
    fn test_aabb_intersection() {
        let a = Aabb3f::default();
        let b = a.translated(V3f::new(1.0, 0.0, 0.0));
        assert!(!a.intersects(&b));
        let c = a.translated(V3f::new(0.9, 0.0, 0.0));
        assert!(a.intersects(&c));
        assert_eq!(a.scaled(BS).max, V3f::new(5.0, 5.0, 5.0));
    }
}
