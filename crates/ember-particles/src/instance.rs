//! Live particle state

use ember_actor::Entity;
use ember_core::{Facing, Vec3};
use ember_pool::SlotKey;
use ember_template::{ParticleTemplate, SpriteKind, TemplateId};
use ember_terrain::TWIST_FLAT;

use crate::spawn::SpawnRequest;

/// Alpha value for alpha-blended sprites
pub const PRT_TRANS: u8 = 0x80;

/// Sprite size ceiling in world units
const MAX_SIZE: f32 = 256.0;

/// Forces gathered over one tick and applied in one integration step.
///
/// Split the way the physics wants to consume them: `avel` changes
/// velocity, the two position accumulators teleport without imparting
/// speed. Platform and collision displacement stay separate so a bounce
/// can be re-integrated without re-applying platform lift.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ForceAccumulator {
    pub avel: Vec3,
    pub apos_plat: Vec3,
    pub apos_coll: Vec3,
}

impl ForceAccumulator {
    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

/// Terrain and fluid readings cached at the start of the move phase.
#[derive(Debug, Clone, Copy)]
pub struct EnvSnapshot {
    /// Mesh floor height under the particle
    pub grid_level: f32,
    /// Floor height including any platform underfoot
    pub floor_level: f32,
    /// `grid_level` lifted by the sprite size; mesh bounces test this
    pub grid_adj: f32,
    /// `floor_level` lifted by the sprite size
    pub adj_level: f32,
    /// 0 resting on the floor, 1 at platform tolerance above it
    pub floor_lerp: f32,
    /// Slope code of the supporting tile
    pub twist: u8,
    pub is_watery: bool,
    pub is_slippy: bool,
    pub is_slipping: bool,
    /// Grip against the supporting surface
    pub traction: f32,
    pub fluid_friction_hrz: f32,
    pub fluid_friction_vrt: f32,
    /// Slipping threshold for this tick
    pub friction_hrz: f32,
    /// Acceleration observed over the previous tick
    pub acc: Vec3,
}

impl Default for EnvSnapshot {
    fn default() -> Self {
        Self {
            grid_level: 0.0,
            floor_level: 0.0,
            grid_adj: 0.0,
            adj_level: 0.0,
            floor_lerp: 0.0,
            twist: TWIST_FLAT,
            is_watery: false,
            is_slippy: false,
            is_slipping: false,
            traction: 1.0,
            fluid_friction_hrz: 1.0,
            fluid_friction_vrt: 1.0,
            friction_hrz: 1.0,
            acc: Vec3::ZERO,
        }
    }
}

/// One pooled particle.
///
/// A freed slot is reset by `construct`; only the pending `spawn`
/// request survives the reset, everything else restarts from here.
#[derive(Debug, Clone)]
pub struct ParticleInstance {
    /// Set once `initialize` has accepted the spawn request
    pub template: Option<TemplateId>,
    /// Request parked by the engine between allocation and activation
    pub spawn: Option<SpawnRequest>,

    pub owner: Option<Entity>,
    pub target: Option<Entity>,
    pub attached_to: Option<Entity>,
    /// Platform underfoot, re-detected every tick
    pub platform: Option<Entity>,
    /// Particle that spawned this one; one hop of attribution, never
    /// followed further
    pub parent: Option<SlotKey>,
    pub team: u8,

    pub pos: Vec3,
    pub pos_old: Vec3,
    pub pos_stt: Vec3,
    pub vel: Vec3,
    pub vel_old: Vec3,
    pub vel_stt: Vec3,
    /// Vertical lift rolled at spawn; held particles carry the request's
    /// attach offset here instead
    pub offset_z: f32,

    pub facing: Facing,
    pub rotate: Facing,
    pub rotate_add: i32,
    /// Frame counter in 1/256 frame steps
    pub image: u32,
    pub image_add: u32,
    pub image_max: u32,
    pub size: f32,
    pub size_add: f32,
    pub sprite: SpriteKind,
    pub alpha: u8,

    pub dyna_on: bool,
    pub dyna_level: f32,
    pub dyna_falloff: f32,

    pub lifetime_total: u32,
    pub lifetime_remaining: u32,
    pub eternal: bool,
    /// Ticks of upkeep this particle has received
    pub updates: u32,
    pub contspawn_timer: u32,

    pub is_homing: bool,
    pub hidden: bool,
    pub in_water: bool,

    /// Lift that balances gravity at the template's terminal velocity
    pub buoyancy: f32,
    /// Share of fluid drag this particle feels, 0 to 1
    pub air_resistance: f32,

    /// Last known position clear of walls
    pub safe_pos: Vec3,
    pub safe_valid: bool,

    /// End spawn and end sound fire once, then this disarms
    pub end_armed: bool,
    pub force: bool,

    pub env: EnvSnapshot,
    pub phys: ForceAccumulator,
}

impl Default for ParticleInstance {
    fn default() -> Self {
        Self {
            template: None,
            spawn: None,
            owner: None,
            target: None,
            attached_to: None,
            platform: None,
            parent: None,
            team: 0,
            pos: Vec3::ZERO,
            pos_old: Vec3::ZERO,
            pos_stt: Vec3::ZERO,
            vel: Vec3::ZERO,
            vel_old: Vec3::ZERO,
            vel_stt: Vec3::ZERO,
            offset_z: 0.0,
            facing: Facing::ZERO,
            rotate: Facing::ZERO,
            rotate_add: 0,
            image: 0,
            image_add: 0,
            image_max: 0,
            size: 0.0,
            size_add: 0.0,
            sprite: SpriteKind::Solid,
            alpha: 0,
            dyna_on: false,
            dyna_level: 0.0,
            dyna_falloff: 0.0,
            lifetime_total: 0,
            lifetime_remaining: 0,
            eternal: false,
            updates: 0,
            contspawn_timer: 0,
            is_homing: false,
            hidden: false,
            in_water: false,
            buoyancy: 0.0,
            air_resistance: 0.0,
            safe_pos: Vec3::ZERO,
            safe_valid: false,
            end_armed: false,
            force: false,
            env: EnvSnapshot::default(),
            phys: ForceAccumulator::default(),
        }
    }
}

impl ParticleInstance {
    /// Whole frame index for rendering
    pub fn image_frame(&self, tpl: &ParticleTemplate) -> u32 {
        tpl.image_base + (self.image >> 8)
    }

    /// Advance the sprite animation by one tick: frame counter, sprite
    /// spin, size growth, and the template's facing spin. Runs in limbo
    /// too, so dying particles keep animating.
    pub fn animate(&mut self, tpl: &ParticleTemplate) {
        self.image += self.image_add;
        if self.image >= self.image_max {
            self.image = 0;
        }

        self.rotate = self.rotate.turned(self.rotate_add);

        if self.size_add != 0.0 {
            self.size = (self.size + self.size_add).clamp(0.0, MAX_SIZE);
        }

        self.facing = self.facing.turned(tpl.facing_add);
    }

    /// Fade the dynamic light. The level never crosses zero from either
    /// side; a level starting at zero drifts freely.
    pub fn animate_light(&mut self, tpl: &ParticleTemplate) {
        let add = tpl.dynalight.level_add;
        if self.dyna_level > 0.0 {
            self.dyna_level += add;
            if self.dyna_level < 0.0 {
                self.dyna_level = 0.0;
            }
        } else if self.dyna_level < 0.0 {
            self.dyna_level += add;
            if self.dyna_level > 0.0 {
                self.dyna_level = 0.0;
            }
        } else {
            self.dyna_level += add;
        }

        self.dyna_falloff += tpl.dynalight.falloff_add;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ember_template::ParticleTemplate;

    #[test]
    fn animation_wraps_past_the_last_frame() {
        let tpl = ParticleTemplate::default();
        let mut prt = ParticleInstance {
            image_add: 0x100,
            image_max: 0x300,
            ..Default::default()
        };

        prt.animate(&tpl);
        assert_eq!(prt.image, 0x100);
        prt.animate(&tpl);
        assert_eq!(prt.image, 0x200);
        prt.animate(&tpl);
        assert_eq!(prt.image, 0);
    }

    #[test]
    fn size_growth_clamps() {
        let tpl = ParticleTemplate::default();
        let mut prt = ParticleInstance {
            size: 255.0,
            size_add: 10.0,
            image_max: 0x100,
            ..Default::default()
        };
        prt.animate(&tpl);
        assert_eq!(prt.size, MAX_SIZE);

        prt.size = 3.0;
        prt.size_add = -10.0;
        prt.animate(&tpl);
        assert_eq!(prt.size, 0.0);
    }

    #[test]
    fn light_level_sticks_at_zero_crossing() {
        let mut tpl = ParticleTemplate::default();
        tpl.dynalight.level_add = -2.0;

        let mut prt = ParticleInstance {
            dyna_level: 3.0,
            ..Default::default()
        };
        prt.animate_light(&tpl);
        assert_eq!(prt.dyna_level, 1.0);
        prt.animate_light(&tpl);
        assert_eq!(prt.dyna_level, 0.0);

        // zero keeps moving with the add
        prt.animate_light(&tpl);
        assert_eq!(prt.dyna_level, -2.0);
    }
}
