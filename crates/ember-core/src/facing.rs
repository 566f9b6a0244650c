//! 16-bit turn-unit headings
//!
//! A full turn is 65536 units, so additions wrap for free and template
//! spread values can be applied with plain integer math. Facing 0 points
//! along +x; angles grow counter-clockwise.

use crate::types::Vec3;
use serde::{Deserialize, Serialize};
use std::f32::consts::TAU;

/// A heading in turn units (65536 per revolution)
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Facing(pub u16);

impl Facing {
    pub const ZERO: Self = Self(0);

    pub const fn new(raw: u16) -> Self {
        Self(raw)
    }

    pub fn raw(&self) -> u16 {
        self.0
    }

    pub fn to_radians(&self) -> f32 {
        self.0 as f32 / 65536.0 * TAU
    }

    pub fn from_radians(angle: f32) -> Self {
        let turns = angle / TAU;
        let frac = turns - turns.floor();
        Self((frac * 65536.0) as u16)
    }

    /// Unit vector in the horizontal plane
    pub fn unit(&self) -> Vec3 {
        let a = self.to_radians();
        Vec3::new(a.cos(), a.sin(), 0.0)
    }

    /// Heading of an (x, y) direction. Degenerate input maps to zero.
    pub fn from_vector(x: f32, y: f32) -> Self {
        if x.abs() < 1e-6 && y.abs() < 1e-6 {
            return Self::ZERO;
        }
        Self::from_radians(y.atan2(x))
    }

    /// Add a signed turn delta, wrapping
    pub fn turned(&self, delta: i32) -> Self {
        Self(self.0.wrapping_add(delta as u16))
    }

    /// Mirror across the y axis (x component of the heading negates)
    pub fn flipped_x(&self) -> Self {
        Self(0x8000u16.wrapping_sub(self.0))
    }

    /// Mirror across the x axis (y component of the heading negates)
    pub fn flipped_y(&self) -> Self {
        Self(self.0.wrapping_neg())
    }
}
