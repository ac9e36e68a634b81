//! Fixed-Point 2D Vector
//!
//! Deterministic 2D vector operations for the simulation. Components are
//! Q16.16 fixed-point; y grows downward (screen convention), so gravity is
//! +y and a jump is a negative y velocity.

use std::fmt;
use std::ops::{Add, Neg, Sub};

use serde::{Deserialize, Serialize};

use super::fixed::{fixed_clamp, fixed_mul, Fixed, FIXED_ONE, FIXED_SCALE};

/// 2D vector with fixed-point components.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct FixedVec2 {
    /// X component (Q16.16 fixed-point)
    pub x: Fixed,
    /// Y component (Q16.16 fixed-point), positive = down
    pub y: Fixed,
}

impl FixedVec2 {
    /// Zero vector
    pub const ZERO: Self = Self { x: 0, y: 0 };

    /// Unit vector pointing right (+X)
    pub const RIGHT: Self = Self { x: FIXED_ONE, y: 0 };

    /// Unit vector pointing left (-X)
    pub const LEFT: Self = Self { x: -FIXED_ONE, y: 0 };

    /// Unit vector pointing down (+Y)
    pub const DOWN: Self = Self { x: 0, y: FIXED_ONE };

    /// Unit vector pointing up (-Y)
    pub const UP: Self = Self { x: 0, y: -FIXED_ONE };

    /// Create a new vector from fixed-point components.
    #[inline]
    pub const fn new(x: Fixed, y: Fixed) -> Self {
        Self { x, y }
    }

    /// Create a vector from integer world-unit components.
    #[inline]
    pub const fn from_ints(x: i32, y: i32) -> Self {
        Self {
            x: x << FIXED_SCALE,
            y: y << FIXED_SCALE,
        }
    }

    /// Add another vector.
    #[inline]
    pub fn add(self, other: Self) -> Self {
        Self {
            x: self.x.wrapping_add(other.x),
            y: self.y.wrapping_add(other.y),
        }
    }

    /// Subtract another vector.
    #[inline]
    pub fn sub(self, other: Self) -> Self {
        Self {
            x: self.x.wrapping_sub(other.x),
            y: self.y.wrapping_sub(other.y),
        }
    }

    /// Scale by a fixed-point scalar.
    #[inline]
    pub fn scale(self, scalar: Fixed) -> Self {
        Self {
            x: fixed_mul(self.x, scalar),
            y: fixed_mul(self.y, scalar),
        }
    }

    /// Squared length. No square root is ever taken in simulation code;
    /// range comparisons use squared distances.
    #[inline]
    pub fn length_squared(self) -> Fixed {
        fixed_mul(self.x, self.x).wrapping_add(fixed_mul(self.y, self.y))
    }

    /// Squared distance to another point.
    #[inline]
    pub fn distance_squared(self, other: Self) -> Fixed {
        let dx = self.x.wrapping_sub(other.x);
        let dy = self.y.wrapping_sub(other.y);
        fixed_mul(dx, dx).wrapping_add(fixed_mul(dy, dy))
    }

    /// Dot product with another vector.
    #[inline]
    pub fn dot(self, other: Self) -> Fixed {
        fixed_mul(self.x, other.x).wrapping_add(fixed_mul(self.y, other.y))
    }

    /// Clamp both components to a range.
    #[inline]
    pub fn clamp(self, min: Fixed, max: Fixed) -> Self {
        Self {
            x: fixed_clamp(self.x, min, max),
            y: fixed_clamp(self.y, min, max),
        }
    }

    /// Negate both components.
    #[inline]
    pub fn negate(self) -> Self {
        Self {
            x: self.x.wrapping_neg(),
            y: self.y.wrapping_neg(),
        }
    }

    /// Convert to a float tuple for rendering.
    #[inline]
    pub fn to_floats(self) -> (f32, f32) {
        (
            self.x as f32 / FIXED_ONE as f32,
            self.y as f32 / FIXED_ONE as f32,
        )
    }
}

// Operator overloads for ergonomics
impl Add for FixedVec2 {
    type Output = Self;
    #[inline]
    fn add(self, rhs: Self) -> Self {
        self.add(rhs)
    }
}

impl Sub for FixedVec2 {
    type Output = Self;
    #[inline]
    fn sub(self, rhs: Self) -> Self {
        self.sub(rhs)
    }
}

impl Neg for FixedVec2 {
    type Output = Self;
    #[inline]
    fn neg(self) -> Self {
        self.negate()
    }
}

impl fmt::Debug for FixedVec2 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (fx, fy) = self.to_floats();
        write!(f, "Vec2({:.3}, {:.3})", fx, fy)
    }
}

impl fmt::Display for FixedVec2 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (fx, fy) = self.to_floats();
        write!(f, "({:.3}, {:.3})", fx, fy)
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::fixed::to_fixed;

    #[test]
    fn test_vec2_constants() {
        assert_eq!(FixedVec2::ZERO.x, 0);
        assert_eq!(FixedVec2::ZERO.y, 0);
        assert_eq!(FixedVec2::RIGHT.x, FIXED_ONE);
        // y-down convention: DOWN is positive y
        assert_eq!(FixedVec2::DOWN.y, FIXED_ONE);
        assert_eq!(FixedVec2::UP.y, -FIXED_ONE);
    }

    #[test]
    fn test_vec2_add_sub() {
        let a = FixedVec2::new(to_fixed(3.0), to_fixed(4.0));
        let b = FixedVec2::new(to_fixed(1.0), to_fixed(2.0));

        let sum = a + b;
        assert_eq!(sum.x, to_fixed(4.0));
        assert_eq!(sum.y, to_fixed(6.0));

        let diff = a - b;
        assert_eq!(diff.x, to_fixed(2.0));
        assert_eq!(diff.y, to_fixed(2.0));
    }

    #[test]
    fn test_vec2_scale() {
        let v = FixedVec2::new(to_fixed(2.0), to_fixed(3.0));
        let result = v.scale(to_fixed(2.0));
        assert_eq!(result.x, to_fixed(4.0));
        assert_eq!(result.y, to_fixed(6.0));
    }

    #[test]
    fn test_vec2_distance_squared() {
        // 3-4-5 triangle
        let a = FixedVec2::ZERO;
        let b = FixedVec2::new(to_fixed(3.0), to_fixed(4.0));
        assert_eq!(a.distance_squared(b), to_fixed(25.0));
        assert_eq!(b.length_squared(), to_fixed(25.0));
    }

    #[test]
    fn test_vec2_dot() {
        let a = FixedVec2::new(to_fixed(2.0), to_fixed(3.0));
        let b = FixedVec2::new(to_fixed(4.0), to_fixed(5.0));
        // 2*4 + 3*5 = 23
        assert_eq!(a.dot(b), to_fixed(23.0));
    }

    #[test]
    fn test_vec2_determinism() {
        let a = FixedVec2::new(12345678, 87654321);
        let b = FixedVec2::new(11111111, 22222222);

        for _ in 0..1000 {
            assert_eq!(a + b, a + b);
            assert_eq!(a.distance_squared(b), a.distance_squared(b));
        }
    }
}
