use glam::Vec2 as GlamVec2;
use serde::{Deserialize, Serialize};

/// 2D vector type used throughout Stage2D.
///
/// World space has X growing to the right and Y growing upward.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Vec2 {
    pub x: f32,
    pub y: f32,
}

impl Vec2 {
    pub const ZERO: Self = Self { x: 0.0, y: 0.0 };
    pub const ONE: Self = Self { x: 1.0, y: 1.0 };
    pub const HALF: Self = Self { x: 0.5, y: 0.5 };

    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Vector with both components set to `value`.
    pub fn splat(value: f32) -> Self {
        Self { x: value, y: value }
    }

    pub fn length(&self) -> f32 {
        (self.x * self.x + self.y * self.y).sqrt()
    }

    /// True when both components are exactly zero.
    pub fn is_zero(&self) -> bool {
        self.x == 0.0 && self.y == 0.0
    }

    /// Component-wise product.
    pub fn mul_elements(self, rhs: Self) -> Self {
        Self::new(self.x * rhs.x, self.y * rhs.y)
    }

    /// Component-wise rounding to the nearest integer.
    pub fn round(self) -> Self {
        Self::new(self.x.round(), self.y.round())
    }

    pub fn abs(self) -> Self {
        Self::new(self.x.abs(), self.y.abs())
    }

    pub fn to_glam(&self) -> GlamVec2 {
        GlamVec2::new(self.x, self.y)
    }
}

impl From<(f32, f32)> for Vec2 {
    fn from(value: (f32, f32)) -> Self {
        Self {
            x: value.0,
            y: value.1,
        }
    }
}

impl From<GlamVec2> for Vec2 {
    fn from(value: GlamVec2) -> Self {
        Self::new(value.x, value.y)
    }
}

impl std::ops::Add for Vec2 {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Self::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl std::ops::AddAssign for Vec2 {
    fn add_assign(&mut self, rhs: Self) {
        self.x += rhs.x;
        self.y += rhs.y;
    }
}

impl std::ops::Sub for Vec2 {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self::Output {
        Self::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl std::ops::Mul<f32> for Vec2 {
    type Output = Self;

    fn mul(self, rhs: f32) -> Self::Output {
        Self::new(self.x * rhs, self.y * rhs)
    }
}

impl std::ops::Div<f32> for Vec2 {
    type Output = Self;

    fn div(self, rhs: f32) -> Self::Output {
        Self::new(self.x / rhs, self.y / rhs)
    }
}

impl std::ops::Neg for Vec2 {
    type Output = Self;

    fn neg(self) -> Self::Output {
        Self::new(-self.x, -self.y)
    }
}

/// Axis-aligned rectangle in world space, described by its four edges.
///
/// `top` is the larger Y value since world Y grows upward.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Bounds {
    pub top: f32,
    pub bottom: f32,
    pub left: f32,
    pub right: f32,
}

impl Bounds {
    /// Build bounds centered on `center` with the given half extents.
    pub fn from_center(center: Vec2, half_extents: Vec2) -> Self {
        Self {
            top: center.y + half_extents.y,
            bottom: center.y - half_extents.y,
            left: center.x - half_extents.x,
            right: center.x + half_extents.x,
        }
    }

    pub fn width(&self) -> f32 {
        self.right - self.left
    }

    pub fn height(&self) -> f32 {
        self.top - self.bottom
    }

    /// Same rectangle moved by `offset`.
    pub fn translated(&self, offset: Vec2) -> Self {
        Self {
            top: self.top + offset.y,
            bottom: self.bottom + offset.y,
            left: self.left + offset.x,
            right: self.right + offset.x,
        }
    }

    /// Overlap test. Touching edges count as overlapping.
    pub fn overlaps(&self, other: &Bounds) -> bool {
        self.right.min(other.right) - self.left.max(other.left) >= 0.0
            && self.top.min(other.top) - self.bottom.max(other.bottom) >= 0.0
    }
}
