//! Simulation tuning parameters

use ember_core::Vec3;

/// Gravity assumed by the buoyancy derivation at spawn time. Kept apart
/// from the live `SimParams::gravity` so a tuned gravity shifts particles
/// relative to their neutral float point instead of re-deriving it.
pub const STANDARD_GRAVITY: f32 = -1.0;

/// Global knobs for the particle simulation.
///
/// The defaults are the values the motion model was balanced against;
/// hosts normally tweak only `gravity`, `capacity`, and `seed`.
#[derive(Debug, Clone)]
pub struct SimParams {
    /// Vertical acceleration per tick, negative is down
    pub gravity: f32,

    /// Per-tick velocity retention in open air
    pub fluid_air_friction: f32,
    /// Per-tick velocity retention under water
    pub water_friction: f32,

    /// Horizontal slipping threshold on normal ground
    pub noslip_friction: f32,
    /// Horizontal slipping threshold on slippy tiles
    pub slippy_friction: f32,
    /// How strongly slippy slopes defeat traction
    pub hillslide: f32,

    /// Grip particles keep on a moving platform, 0 to 1
    pub platform_stick: f32,
    /// Vertical reach of a platform surface, in world units
    pub platform_tolerance: f32,

    /// Vertical speed below which a bounce settles instead
    pub stop_bounce: f32,

    /// Ambient air current applied through fluid drag
    pub wind: Vec3,
    /// Ambient water current applied through fluid drag
    pub water_current: Vec3,

    /// Pool slot count
    pub capacity: usize,
    /// RNG seed; runs with equal seeds and inputs replay exactly
    pub seed: u32,
}

impl Default for SimParams {
    fn default() -> Self {
        Self {
            gravity: STANDARD_GRAVITY,
            fluid_air_friction: 0.9868,
            water_friction: 0.80,
            noslip_friction: 0.91,
            slippy_friction: 1.0,
            hillslide: 1.0,
            platform_stick: 0.5,
            platform_tolerance: 50.0,
            stop_bounce: 5.0,
            wind: Vec3::ZERO,
            water_current: Vec3::ZERO,
            capacity: 512,
            seed: 0xE4B17,
        }
    }
}
