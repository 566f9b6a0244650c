//! Actor components and spawn-time configuration

use ember_core::Vec3;

/// World position, z up
#[derive(Clone, Copy, Debug, Default)]
pub struct Position(pub Vec3);

/// World velocity per tick
#[derive(Clone, Copy, Debug, Default)]
pub struct Velocity(pub Vec3);

/// Collision footprint: a cylinder of `bump_size` radius and
/// `bump_height` height standing on the actor's position
#[derive(Clone, Copy, Debug)]
pub struct Stature {
    pub bump_size: f32,
    pub bump_height: f32,
}

/// Health and liveness. `alive` flips off when life runs out and
/// nothing here flips it back.
#[derive(Clone, Copy, Debug)]
pub struct Vitals {
    pub life: f32,
    pub max_life: f32,
    pub alive: bool,
}

/// Team tag for friendly-fire checks
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Team(pub u8);

/// How well this actor guides the projectiles it owns, 0 to 1.
/// Scales homing dither down and homing reach up.
#[derive(Clone, Copy, Debug)]
pub struct Aim(pub f32);

/// Incoming damage multiplier per `DamageKind`, in kind order.
/// 1 passes damage through, 0 grants immunity, negative values heal.
#[derive(Clone, Copy, Debug)]
pub struct DamageResist(pub [f32; 8]);

/// Marker: other objects may stand on this actor's top surface
#[derive(Clone, Copy, Debug, Default)]
pub struct Platform;

/// Marker: excluded from bump interactions while present
#[derive(Clone, Copy, Debug, Default)]
pub struct Hidden;

/// Spawn-time description of an actor
#[derive(Clone, Debug)]
pub struct ActorInfo {
    pub pos: Vec3,
    pub vel: Vec3,
    pub bump_size: f32,
    pub bump_height: f32,
    pub team: u8,
    pub life: f32,
    pub aim: f32,
    pub resist: [f32; 8],
    pub platform: bool,
    pub hidden: bool,
}

impl Default for ActorInfo {
    fn default() -> Self {
        Self {
            pos: Vec3::ZERO,
            vel: Vec3::ZERO,
            bump_size: 30.0,
            bump_height: 60.0,
            team: 0,
            life: 50.0,
            aim: 0.5,
            resist: [1.0; 8],
            platform: false,
            hidden: false,
        }
    }
}

impl ActorInfo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn at(mut self, pos: Vec3) -> Self {
        self.pos = pos;
        self
    }

    pub fn with_velocity(mut self, vel: Vec3) -> Self {
        self.vel = vel;
        self
    }

    pub fn with_bump(mut self, size: f32, height: f32) -> Self {
        self.bump_size = size;
        self.bump_height = height;
        self
    }

    pub fn with_team(mut self, team: u8) -> Self {
        self.team = team;
        self
    }

    pub fn with_life(mut self, life: f32) -> Self {
        self.life = life;
        self
    }

    pub fn with_aim(mut self, aim: f32) -> Self {
        self.aim = aim.clamp(0.0, 1.0);
        self
    }

    pub fn with_resist(mut self, resist: [f32; 8]) -> Self {
        self.resist = resist;
        self
    }

    pub fn as_platform(mut self) -> Self {
        self.platform = true;
        self
    }

    pub fn hidden(mut self) -> Self {
        self.hidden = true;
        self
    }
}
