//! Slope twist codes and the precomputed surface-normal table
//!
//! A twist packs a tile's slope into one byte: the low nibble is the
//! x slope, the high nibble the y slope, each offset so 7 means level.
//! All 256 normals are precomputed once so per-tick floor physics is a
//! table lookup.

use ember_core::Vec3;

/// The twist code of a level tile (slope nibbles 7, 7)
pub const TWIST_FLAT: u8 = 119;

/// Surfaces steeper than this z component stop counting as flat,
/// so almost-flat floors do not creep objects downhill
const FLAT_NRM_Z: f32 = 1.0 - 0.08;

/// Slope nibbles per world unit of corner height differential
const SLOPE_GAIN: f32 = 4.125 / 50.0;

/// Precomputed normals and flatness for all 256 twist codes
pub struct TwistTable {
    normals: [Vec3; 256],
    flat: [bool; 256],
}

impl TwistTable {
    pub fn new() -> Self {
        let mut normals = [Vec3::UP; 256];
        let mut flat = [false; 256];

        for code in 0..256usize {
            let x = (code & 15) as f32 - 7.0; // -7 to 8
            let y = (code >> 4) as f32 - 7.0; // -7 to 8

            let mut fx = x;
            let mut fy = y;
            let fz;

            // slope nibbles parametrize a hemisphere of radius 11;
            // anything outside it is a sheer face
            let d2 = fx * fx + fy * fy;
            if d2 > 121.0 {
                fz = 0.0;
                let d = d2.sqrt();
                fx /= d;
                fy /= d;
            } else {
                fz = (1.0 - d2 / 121.0).sqrt();
                fx /= 11.0;
                fy /= 11.0;
            }

            normals[code] = Vec3::new(fx, -fy, fz).normalized();
            flat[code] = fz > FLAT_NRM_Z;
        }

        Self { normals, flat }
    }

    /// Surface normal for a twist code, unit length, z always >= 0
    pub fn normal(&self, twist: u8) -> Vec3 {
        self.normals[twist as usize]
    }

    /// Whether the twist counts as level ground
    pub fn is_flat(&self, twist: u8) -> bool {
        self.flat[twist as usize]
    }
}

impl Default for TwistTable {
    fn default() -> Self {
        Self::new()
    }
}

/// Pack x and y slope values into a twist code, clamping to the
/// representable -7..=8 nibble range
pub fn twist_from_slopes(zx: i32, zy: i32) -> u8 {
    let x = zx.clamp(-7, 8) + 7;
    let y = zy.clamp(-7, 8) + 7;
    ((y as u8) << 4) | (x as u8)
}

/// Derive a tile's twist code from its four corner heights.
///
/// Corners are ordered (x, y), (x+1, y), (x+1, y+1), (x, y+1). The x
/// slope compares the left edge against the right, the y slope the far
/// edge against the near one.
pub fn twist_from_corner_heights(z0: f32, z1: f32, z2: f32, z3: f32) -> u8 {
    let zx = ((z0 + z3 - z1 - z2) * SLOPE_GAIN).round() as i32;
    let zy = ((z2 + z3 - z0 - z1) * SLOPE_GAIN).round() as i32;
    twist_from_slopes(zx, zy)
}
