//! Lifecycle handlers wiring `ParticleInstance` into the slot pool

use ember_actor::ActorWorld;
use ember_core::{Facing, GameRng, RandPair};
use ember_pool::{Lifecycle, SlotKey, Transition};
use ember_template::{DynaMode, SpriteKind, TemplateRegistry};
use ember_terrain::TerrainMesh;

use crate::collision::STOP_BITS;
use crate::instance::{ParticleInstance, PRT_TRANS};
use crate::params::{SimParams, STANDARD_GRAVITY};
use crate::spawn::{SoundEvent, SpawnRequest};

/// Everything one simulation tick threads through the lifecycle
/// handlers and the physics phases.
pub struct TickCtx<'a> {
    pub params: &'a SimParams,
    pub registry: &'a TemplateRegistry,
    pub terrain: &'a TerrainMesh,
    pub actors: &'a mut ActorWorld,
    pub rng: &'a mut GameRng,
    pub sounds: &'a mut Vec<SoundEvent>,
    pub requests: &'a mut Vec<SpawnRequest>,
    pub tick: u32,
    pub dt: f32,
}

impl<'a> Lifecycle<TickCtx<'a>> for ParticleInstance {
    /// Reset the slot. The parked spawn request is the only state that
    /// survives into `initialize`.
    fn construct(&mut self, _ctx: &mut TickCtx<'a>) -> Transition {
        *self = Self {
            spawn: self.spawn.take(),
            ..Self::default()
        };
        Transition::Advance
    }

    fn initialize(&mut self, ctx: &mut TickCtx<'a>) -> Transition {
        let Some(req) = self.spawn.take() else {
            return Transition::Terminate;
        };
        let Some(tpl) = ctx.registry.get(req.template) else {
            eprintln!(
                "Warning: discarding spawn for unknown template {:?}",
                req.template
            );
            return Transition::Terminate;
        };

        self.template = Some(req.template);
        self.owner = req.owner;
        self.parent = req.parent;
        self.team = req.team;
        self.attached_to = req.attached_to.filter(|h| ctx.actors.contains(*h));
        self.force = tpl.force;

        self.sprite = tpl.sprite;
        self.alpha = match tpl.sprite {
            SpriteKind::Alpha => PRT_TRANS,
            _ => u8::MAX,
        };

        // Only the first particle of a burst carries the light
        self.dyna_on = req.multispawn == 0 && tpl.dynalight.mode == DynaMode::On;
        self.dyna_level = tpl.dynalight.level;
        self.dyna_falloff = tpl.dynalight.falloff;

        let mut facing = req.facing.turned(tpl.facing.base);
        let mut pos = req.pos;

        self.offset_z = tpl.spacing_vrt.roll_centered(ctx.rng) as f32;
        pos.z += self.offset_z;

        let speed = tpl.vel_hrz.roll(ctx.rng) as f32;

        self.target = req.target;
        if tpl.target_caster {
            self.target = req.owner;
        }

        // Lob the launch at the target's midriff when zaim grants extra z
        let mut vel_z = 0.0f32;
        if tpl.zaim_speed > 0.0 && speed > 0.0 {
            if let Some(tgt) = self.target.filter(|t| ctx.actors.contains(*t)) {
                if let (Some(tpos), Some(theight)) =
                    (ctx.actors.position(tgt), ctx.actors.bump_height(tgt))
                {
                    let dx = tpos.x - pos.x;
                    let dy = tpos.y - pos.y;
                    let flight = (dx * dx + dy * dy).sqrt() / speed;
                    if flight > 0.0 {
                        vel_z = ((tpos.z + theight * 0.5 - pos.z) / flight)
                            .clamp(-tpl.zaim_speed * 0.5, tpl.zaim_speed);
                    }
                }
            }
        }

        // Aim spread; skilled owners scatter less
        let aim = self
            .owner
            .and_then(|o| ctx.actors.aim(o))
            .unwrap_or(0.5);
        let spread = RandPair::new(0, tpl.facing.rand).roll_centered(ctx.rng) as f32 * (1.0 - aim);
        facing = facing.turned(spread as i32);

        if tpl.needs_target && !self.target.map_or(false, |t| ctx.actors.contains(t)) {
            return Transition::Terminate;
        }

        if tpl.start_on_target {
            if let Some(tpos) = self.target.and_then(|t| ctx.actors.position(t)) {
                pos.x = tpos.x;
                pos.y = tpos.y;
            }
        }

        let unit = facing.unit();
        let spread_hrz = tpl.spacing_hrz.roll(ctx.rng) as f32;
        pos.x += unit.x * spread_hrz;
        pos.y += unit.y * spread_hrz;
        pos = ctx.terrain.clamp_point(pos);

        self.pos = pos;
        self.pos_old = pos;
        self.pos_stt = pos;

        let mut vel = unit * speed;
        vel.z = vel_z + tpl.vel_vrt.roll_centered(ctx.rng) as f32;
        self.vel = vel;
        self.vel_old = vel;
        self.vel_stt = vel;

        self.facing = facing;
        self.rotate = Facing::new(tpl.rotate.roll(ctx.rng) as u16);
        self.rotate_add = tpl.rotate_add;
        self.image = 0;
        self.image_add = tpl.image_add.roll(ctx.rng).max(0) as u32;
        self.image_max = tpl.image_count << 8;
        self.size = tpl.size_base;
        self.size_add = tpl.size_add;

        // Lifetime, latched to the animation length when requested
        let mut life = tpl.lifetime;
        if tpl.end_on_last_frame && self.image_add != 0 {
            let frames = (self.image_max / self.image_add).saturating_sub(1);
            life = if tpl.lifetime == 0 {
                frames
            } else {
                tpl.lifetime.saturating_mul(frames)
            };
        }
        if life == 0 {
            self.eternal = true;
            self.lifetime_total = 0;
            self.lifetime_remaining = u32::MAX;
        } else {
            self.eternal = false;
            self.lifetime_total = life;
            self.lifetime_remaining = life;
        }

        self.updates = 0;
        self.contspawn_timer = tpl.contspawn.delay;
        if self.contspawn_timer != 0 {
            // Fire the first wave on the next upkeep; held particles wait
            // one extra tick so the holder's swing carries them first
            self.contspawn_timer = 1;
            if self.attached_to.is_some() {
                self.contspawn_timer += 1;
            }
        }

        self.is_homing = tpl.homing
            && self.attached_to.is_none()
            && self.target.map_or(false, |t| ctx.actors.contains(t));

        // Buoyancy that balances gravity at the template's terminal
        // velocity, and the matching share of fluid drag
        let mut spd_limit = tpl.speed_limit;
        if spd_limit == 0.0 {
            spd_limit = -STANDARD_GRAVITY / (1.0 - ctx.params.fluid_air_friction);
        }
        self.buoyancy = (-spd_limit * (1.0 - ctx.params.fluid_air_friction) - STANDARD_GRAVITY)
            .clamp(0.0, 2.0 * STANDARD_GRAVITY.abs());
        if spd_limit >= 0.0 {
            self.buoyancy *= 0.5;
        }
        self.air_resistance = if spd_limit != 0.0 {
            (1.0 - (self.buoyancy + STANDARD_GRAVITY) / -spd_limit).clamp(0.0, 1.0)
        } else {
            0.0
        };
        self.air_resistance = (self.air_resistance / ctx.params.fluid_air_friction).clamp(0.0, 1.0);

        if let Some(sound) = tpl.sound_spawn {
            ctx.sounds.push(SoundEvent {
                sound,
                pos: self.pos,
            });
        }

        if !ctx.terrain.test_wall(self.pos, tpl.bump_size, STOP_BITS) {
            self.safe_pos = self.pos;
            self.safe_valid = true;
        }

        // Held particles snap to the holder, lifted by the request offset
        if let Some(holder) = self.attached_to {
            if let Some(mut hpos) = ctx.actors.position(holder) {
                self.offset_z = req.zoff;
                hpos.z += req.zoff;
                self.pos = hpos;
                self.pos_old = hpos;
                self.pos_stt = hpos;
            }
            self.hidden = ctx.actors.is_hidden(holder);
        }

        self.end_armed = true;
        Transition::Advance
    }

    fn deinitialize(&mut self, _ctx: &mut TickCtx<'a>) -> Transition {
        self.target = None;
        self.attached_to = None;
        self.platform = None;
        Transition::Advance
    }

    fn destruct(&mut self, _ctx: &mut TickCtx<'a>) -> Transition {
        Transition::Advance
    }

    /// Runs exactly once as the slot is freed: the end spawn burst and
    /// the end sound. Particles that never finished `initialize` stay
    /// disarmed and emit nothing.
    fn on_final_free(&mut self, key: SlotKey, ctx: &mut TickCtx<'a>) {
        if !self.end_armed {
            return;
        }
        self.end_armed = false;

        let Some(tpl) = self.template.and_then(|id| ctx.registry.get(id)) else {
            return;
        };

        if tpl.endspawn.amount > 0 {
            if let Some(child) = tpl.endspawn.child_id {
                let mut facing = self.facing;
                for n in 0..tpl.endspawn.amount as u32 {
                    let mut req = SpawnRequest::new(child, self.pos_old)
                        .facing(facing)
                        .parent(key)
                        .team(self.team)
                        .multispawn(n);
                    req.owner = self.owner;
                    req.target = self.target;
                    ctx.requests.push(req);
                    facing = facing.turned(tpl.endspawn.facing_add);
                }
            }
        }

        if let Some(sound) = tpl.sound_end {
            ctx.sounds.push(SoundEvent {
                sound,
                pos: self.pos_old,
            });
        }
    }

    fn time_left(&self) -> u32 {
        if self.eternal {
            u32::MAX
        } else {
            self.lifetime_remaining
        }
    }

    fn protected(&self) -> bool {
        self.force
    }
}
