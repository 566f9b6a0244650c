//! Particle template definition (parsed from TOML)

use ember_core::{DamageKind, RandPair};

use crate::registry::TemplateId;

/// How the sprite blends when drawn
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpriteKind {
    /// Opaque billboard, collides with the floor normally
    Solid,
    /// Alpha-blended
    Alpha,
    /// Additive glow; ignores fluid drag and floor normal forces
    Light,
}

/// Dynamic light emission mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DynaMode {
    Off,
    On,
    /// Only lights up when near the viewer
    Local,
}

/// Dynamic light attached to a particle
#[derive(Debug, Clone, Copy)]
pub struct DynaLight {
    pub mode: DynaMode,
    pub level: f32,
    pub level_add: f32,
    pub falloff: f32,
    pub falloff_add: f32,
}

impl Default for DynaLight {
    fn default() -> Self {
        Self {
            mode: DynaMode::Off,
            level: 0.0,
            level_add: 0.0,
            falloff: 0.0,
            falloff_add: 0.0,
        }
    }
}

/// Child particles emitted every `delay` ticks while the parent lives
#[derive(Debug, Clone, Default)]
pub struct ContSpawn {
    pub delay: u32,
    pub amount: u8,
    pub facing_add: i32,
    /// Child template by name; resolved to an id by the registry
    pub child: Option<String>,
    pub child_id: Option<TemplateId>,
}

/// Child particles emitted once when the parent dies
#[derive(Debug, Clone, Default)]
pub struct EndSpawn {
    pub amount: u8,
    pub facing_add: i32,
    pub child: Option<String>,
    pub child_id: Option<TemplateId>,
}

/// Everything a particle inherits from its template.
///
/// Templates are immutable once registered; instances copy what they
/// need at spawn and roll the `RandPair` fields per spawn.
#[derive(Debug, Clone)]
pub struct ParticleTemplate {
    /// Template name, normally the file stem
    pub name: String,

    // Appearance
    pub sprite: SpriteKind,
    pub image_base: u32,
    pub image_count: u32,
    pub image_add: RandPair,
    pub rotate: RandPair,
    pub rotate_add: i32,
    pub size_base: f32,
    pub size_add: f32,
    pub facing_add: i32,
    pub dynalight: DynaLight,

    // Lifetime in ticks; 0 lives forever
    pub lifetime: u32,
    pub end_on_last_frame: bool,

    // Spawn-time rolls
    pub facing: RandPair,
    pub spacing_hrz: RandPair,
    pub spacing_vrt: RandPair,
    pub vel_hrz: RandPair,
    pub vel_vrt: RandPair,

    // Motion
    /// Terminal velocity; negative values float, positive ones sink
    pub speed_limit: f32,
    /// Velocity kept after a bounce, 0 to 1
    pub dampen: f32,
    pub rotate_to_face: bool,
    pub homing: bool,
    pub homing_accel: f32,
    pub homing_friction: f32,
    /// Extra initial z velocity granted to lob at the target
    pub zaim_speed: f32,

    // Targeting
    pub needs_target: bool,
    pub target_caster: bool,
    pub start_on_target: bool,

    // Bump interactions
    pub bump_size: f32,
    pub bump_height: f32,
    pub allow_push: bool,
    pub friendly_fire: bool,
    pub damage_base: f32,
    pub damage_rand: f32,
    pub damage_kind: DamageKind,

    // Ending conditions
    pub end_in_water: bool,
    pub end_on_bump: bool,
    pub end_on_ground: bool,
    pub end_on_wall: bool,

    // Child spawning
    pub contspawn: ContSpawn,
    pub endspawn: EndSpawn,

    // Sound cue indices
    pub sound_spawn: Option<u32>,
    pub sound_end: Option<u32>,
    pub sound_floor: Option<u32>,
    pub sound_wall: Option<u32>,

    /// Priority particles may evict others when the pool is full
    pub force: bool,
}

impl Default for ParticleTemplate {
    fn default() -> Self {
        Self {
            name: String::new(),
            sprite: SpriteKind::Solid,
            image_base: 0,
            image_count: 1,
            image_add: RandPair::default(),
            rotate: RandPair::default(),
            rotate_add: 0,
            size_base: 8.0,
            size_add: 0.0,
            facing_add: 0,
            dynalight: DynaLight::default(),
            lifetime: 0,
            end_on_last_frame: false,
            facing: RandPair::default(),
            spacing_hrz: RandPair::default(),
            spacing_vrt: RandPair::default(),
            vel_hrz: RandPair::default(),
            vel_vrt: RandPair::default(),
            speed_limit: 0.0,
            dampen: 0.0,
            rotate_to_face: false,
            homing: false,
            homing_accel: 0.0,
            homing_friction: 0.0,
            zaim_speed: 0.0,
            needs_target: false,
            target_caster: false,
            start_on_target: false,
            bump_size: 8.0,
            bump_height: 8.0,
            allow_push: true,
            friendly_fire: false,
            damage_base: 0.0,
            damage_rand: 0.0,
            damage_kind: DamageKind::Slash,
            end_in_water: false,
            end_on_bump: false,
            end_on_ground: false,
            end_on_wall: false,
            contspawn: ContSpawn::default(),
            endspawn: EndSpawn::default(),
            sound_spawn: None,
            sound_end: None,
            sound_floor: None,
            sound_wall: None,
            force: false,
        }
    }
}

impl ParticleTemplate {
    /// Parse a template from a flat TOML table. Unknown keys are
    /// ignored, missing ones keep their defaults, and `end_on_wall`
    /// follows `end_on_ground` unless set explicitly.
    pub fn from_toml(name: impl Into<String>, table: &toml::value::Table) -> Self {
        let mut t = Self::default();
        t.name = name.into();

        if let Some(v) = table.get("force") {
            t.force = v.as_bool().unwrap_or(false);
        }
        if let Some(v) = table.get("sprite") {
            t.sprite = match v.as_str().unwrap_or("solid") {
                "light" => SpriteKind::Light,
                "alpha" => SpriteKind::Alpha,
                _ => SpriteKind::Solid,
            };
        }
        if let Some(v) = table.get("image_base") {
            t.image_base = v.as_integer().unwrap_or(0).max(0) as u32;
        }
        if let Some(v) = table.get("image_count") {
            t.image_count = v.as_integer().unwrap_or(1).max(1) as u32;
        }
        if let Some(v) = table.get("image_add") {
            t.image_add = toml_pair(v, t.image_add);
        }
        if let Some(v) = table.get("rotate") {
            t.rotate = toml_pair(v, t.rotate);
        }
        if let Some(v) = table.get("rotate_add") {
            t.rotate_add = v.as_integer().unwrap_or(0) as i32;
        }
        if let Some(v) = table.get("size_base") {
            t.size_base = toml_f32(v, t.size_base).max(0.0);
        }
        if let Some(v) = table.get("size_add") {
            t.size_add = toml_f32(v, t.size_add);
        }
        if let Some(v) = table.get("facing_add") {
            t.facing_add = v.as_integer().unwrap_or(0) as i32;
        }
        if let Some(v) = table.get("speed_limit") {
            t.speed_limit = toml_f32(v, t.speed_limit);
        }

        if let Some(v) = table.get("end_in_water") {
            t.end_in_water = v.as_bool().unwrap_or(false);
        }
        if let Some(v) = table.get("end_on_bump") {
            t.end_on_bump = v.as_bool().unwrap_or(false);
        }
        if let Some(v) = table.get("end_on_ground") {
            t.end_on_ground = v.as_bool().unwrap_or(false);
        }
        if let Some(v) = table.get("end_on_last_frame") {
            t.end_on_last_frame = v.as_bool().unwrap_or(false);
        }
        if let Some(v) = table.get("lifetime") {
            t.lifetime = v.as_integer().unwrap_or(0).max(0) as u32;
        }

        if let Some(v) = table.get("dampen") {
            t.dampen = toml_f32(v, t.dampen).clamp(0.0, 1.0);
        }
        if let Some(v) = table.get("bump_size") {
            t.bump_size = toml_f32(v, t.bump_size).max(0.0);
        }
        if let Some(v) = table.get("bump_height") {
            t.bump_height = toml_f32(v, t.bump_height).max(0.0);
        }
        if let Some(v) = table.get("damage") {
            let (base, rand) = toml_f32_pair(v, (t.damage_base, t.damage_rand));
            t.damage_base = base.max(0.0);
            t.damage_rand = rand.max(0.0);
        }
        if let Some(v) = table.get("damage_kind") {
            if let Some(s) = v.as_str() {
                if let Ok(kind) = s.parse() {
                    t.damage_kind = kind;
                }
            }
        }

        if let Some(v) = table.get("dynalight_mode") {
            t.dynalight.mode = match v.as_str().unwrap_or("off") {
                "on" => DynaMode::On,
                "local" => DynaMode::Local,
                _ => DynaMode::Off,
            };
        }
        if let Some(v) = table.get("dynalight_level") {
            t.dynalight.level = toml_f32(v, 0.0);
        }
        if let Some(v) = table.get("dynalight_level_add") {
            t.dynalight.level_add = toml_f32(v, 0.0);
        }
        if let Some(v) = table.get("dynalight_falloff") {
            t.dynalight.falloff = toml_f32(v, 0.0);
        }
        if let Some(v) = table.get("dynalight_falloff_add") {
            t.dynalight.falloff_add = toml_f32(v, 0.0);
        }

        if let Some(v) = table.get("facing") {
            t.facing = toml_pair(v, t.facing);
        }
        if let Some(v) = table.get("spacing_hrz") {
            t.spacing_hrz = toml_pair(v, t.spacing_hrz);
        }
        if let Some(v) = table.get("spacing_vrt") {
            t.spacing_vrt = toml_pair(v, t.spacing_vrt);
        }
        if let Some(v) = table.get("vel_hrz") {
            t.vel_hrz = toml_pair(v, t.vel_hrz);
        }
        if let Some(v) = table.get("vel_vrt") {
            t.vel_vrt = toml_pair(v, t.vel_vrt);
        }

        if let Some(v) = table.get("contspawn_delay") {
            t.contspawn.delay = v.as_integer().unwrap_or(0).max(0) as u32;
        }
        if let Some(v) = table.get("contspawn_amount") {
            t.contspawn.amount = v.as_integer().unwrap_or(0).clamp(0, 255) as u8;
        }
        if let Some(v) = table.get("contspawn_facing_add") {
            t.contspawn.facing_add = v.as_integer().unwrap_or(0) as i32;
        }
        if let Some(v) = table.get("contspawn_child") {
            t.contspawn.child = v.as_str().map(|s| s.to_string());
        }

        if let Some(v) = table.get("endspawn_amount") {
            t.endspawn.amount = v.as_integer().unwrap_or(0).clamp(0, 255) as u8;
        }
        if let Some(v) = table.get("endspawn_facing_add") {
            t.endspawn.facing_add = v.as_integer().unwrap_or(0) as i32;
        }
        if let Some(v) = table.get("endspawn_child") {
            t.endspawn.child = v.as_str().map(|s| s.to_string());
        }

        if let Some(v) = table.get("needs_target") {
            t.needs_target = v.as_bool().unwrap_or(false);
        }
        if let Some(v) = table.get("target_caster") {
            t.target_caster = v.as_bool().unwrap_or(false);
        }
        if let Some(v) = table.get("start_on_target") {
            t.start_on_target = v.as_bool().unwrap_or(false);
        }
        if let Some(v) = table.get("friendly_fire") {
            t.friendly_fire = v.as_bool().unwrap_or(false);
        }

        t.sound_spawn = toml_sound(table.get("sound_spawn"));
        t.sound_end = toml_sound(table.get("sound_end"));
        t.sound_floor = toml_sound(table.get("sound_floor"));
        t.sound_wall = toml_sound(table.get("sound_wall"));

        if let Some(v) = table.get("homing") {
            t.homing = v.as_bool().unwrap_or(false);
        }
        if let Some(v) = table.get("homing_friction") {
            t.homing_friction = toml_f32(v, 0.0);
        }
        if let Some(v) = table.get("homing_accel") {
            t.homing_accel = toml_f32(v, 0.0);
        }
        if let Some(v) = table.get("rotate_to_face") {
            t.rotate_to_face = v.as_bool().unwrap_or(false);
        }
        if let Some(v) = table.get("zaim_speed") {
            t.zaim_speed = toml_f32(v, 0.0).max(0.0);
        }
        if let Some(v) = table.get("allow_push") {
            t.allow_push = v.as_bool().unwrap_or(true);
        }

        // walls stop what the ground stops, unless told otherwise
        t.end_on_wall = match table.get("end_on_wall") {
            Some(v) => v.as_bool().unwrap_or(t.end_on_ground),
            None => t.end_on_ground,
        };

        t
    }

    /// Lives forever unless something ends it
    pub fn is_eternal(&self) -> bool {
        self.lifetime == 0 && !self.end_on_last_frame
    }
}

// TOML helpers: template files write numbers as integers or floats

fn toml_f32(v: &toml::Value, default: f32) -> f32 {
    v.as_float()
        .map(|f| f as f32)
        .or_else(|| v.as_integer().map(|i| i as f32))
        .unwrap_or(default)
}

fn toml_pair(v: &toml::Value, default: RandPair) -> RandPair {
    if let Some(arr) = v.as_array() {
        if arr.len() >= 2 {
            let base = arr[0].as_integer().unwrap_or(default.base as i64) as i32;
            let rand = arr[1].as_integer().unwrap_or(default.rand as i64).max(0) as u32;
            return RandPair::new(base, rand);
        }
    }
    default
}

fn toml_f32_pair(v: &toml::Value, default: (f32, f32)) -> (f32, f32) {
    if let Some(arr) = v.as_array() {
        if arr.len() >= 2 {
            return (toml_f32(&arr[0], default.0), toml_f32(&arr[1], default.1));
        }
    }
    default
}

fn toml_sound(v: Option<&toml::Value>) -> Option<u32> {
    let idx = v?.as_integer()?;
    if idx < 0 {
        return None;
    }
    Some(idx as u32)
}
