//! Per-tick upkeep behaviors that reach outside a single particle:
//! water entry and exit, continuous child spawning, and the damage a
//! stuck particle deals to whatever it is stuck in.

use ember_actor::ActorWorld;
use ember_core::{GameRng, Vec3};
use ember_pool::SlotKey;
use ember_template::{ParticleTemplate, SpriteKind, TemplateRegistry};
use ember_terrain::{tile_fx, TerrainMesh};

use crate::instance::ParticleInstance;
use crate::spawn::SpawnRequest;

/// Floating solids re-ripple when the stagger counter hits this mask.
const RIPPLE_MASK: u32 = 31;

/// Stuck particles re-damage their holder on the same cadence.
const BUMP_MASK: u32 = 31;

/// What the water check decided for this particle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WaterOutcome {
    Keep,
    Terminate,
}

/// Track the water line and spawn surface effects around it.
///
/// A particle is in water when it sits below the surface level on a
/// water tile. Crossing in spawns a splash (solid sprites) or a ripple
/// (everything else) at the surface, and solids that keep floating
/// there ripple again every few ticks. Splash and ripple effects spawn
/// with no owner, and an ownerless splash or ripple never spawns
/// another one, so the surface chatter cannot feed on itself.
pub fn update_water(
    prt: &mut ParticleInstance,
    tpl: &ParticleTemplate,
    registry: &TemplateRegistry,
    terrain: &TerrainMesh,
    requests: &mut Vec<SpawnRequest>,
    stagger: u32,
) -> WaterOutcome {
    let surface = terrain.water.surface_level;
    let inwater_now =
        prt.pos.z < surface && terrain.tile_has_flag(prt.pos.x, prt.pos.y, tile_fx::WATER);

    if !inwater_now {
        prt.in_water = false;
        return WaterOutcome::Keep;
    }

    if terrain.water.is_water && tpl.end_in_water {
        return WaterOutcome::Terminate;
    }

    if !prt.in_water {
        let is_surface_fx = match prt.template {
            Some(id) => Some(id) == registry.splash || Some(id) == registry.ripple,
            None => false,
        };
        if !(prt.owner.is_none() && is_surface_fx) {
            let fx = if prt.sprite == SpriteKind::Solid {
                registry.splash
            } else {
                registry.ripple
            };
            if let Some(fx) = fx {
                requests.push(SpawnRequest::new(
                    fx,
                    Vec3::new(prt.pos.x, prt.pos.y, surface),
                ));
            }
        }
        if terrain.water.is_water {
            prt.in_water = true;
        }
    } else if prt.sprite == SpriteKind::Solid && prt.attached_to.is_none() {
        let straddles =
            prt.pos.z - tpl.bump_height < surface && prt.pos.z + tpl.bump_height > surface;
        if straddles && stagger & RIPPLE_MASK == 0 {
            if let Some(fx) = registry.ripple {
                requests.push(SpawnRequest::new(
                    fx,
                    Vec3::new(prt.pos.x, prt.pos.y, surface),
                ));
            }
        }
    }

    WaterOutcome::Keep
}

/// Emit this particle's continuous children when its timer runs out.
///
/// The timer is decremented by the caller; once it reaches zero the
/// whole batch spawns at the particle's current position and the timer
/// rewinds to the template delay. Children fan out by the configured
/// facing step and inherit owner, target, and team, but not velocity;
/// `parent` is stamped on each child for attribution.
pub fn contspawn(
    prt: &mut ParticleInstance,
    tpl: &ParticleTemplate,
    parent: Option<SlotKey>,
    requests: &mut Vec<SpawnRequest>,
) {
    if tpl.contspawn.amount == 0 {
        return;
    }
    let Some(child) = tpl.contspawn.child_id else {
        return;
    };
    if prt.contspawn_timer > 0 {
        return;
    }

    prt.contspawn_timer = tpl.contspawn.delay;

    let mut facing = prt.facing;
    for n in 0..tpl.contspawn.amount as u32 {
        let mut req = SpawnRequest::new(child, prt.pos)
            .facing(facing)
            .team(prt.team)
            .multispawn(n);
        req.owner = prt.owner;
        req.target = prt.target;
        req.parent = parent;
        requests.push(req);
        facing = facing.turned(tpl.contspawn.facing_add);
    }
}

/// Damage the actor a particle is stuck in.
///
/// Runs on the ripple cadence rather than every tick. Limited-lifetime
/// particles spread their rolled damage across the whole lifetime so a
/// long-burning effect does not multiply its total. A stuck particle
/// with no launch speed also drags on its holder.
pub fn bump_damage(
    prt: &ParticleInstance,
    tpl: &ParticleTemplate,
    actors: &mut ActorWorld,
    rng: &mut GameRng,
    stagger: u32,
) {
    if stagger & BUMP_MASK != 0 {
        return;
    }
    let Some(holder) = prt.attached_to else {
        return;
    };
    if !actors.contains(holder) {
        return;
    }
    if prt.owner == Some(holder) {
        return;
    }

    if tpl.allow_push && tpl.vel_hrz.base == 0 {
        if let Some(vel) = actors.velocity(holder) {
            actors
                .set_velocity(holder, Vec3::new(vel.x * 0.5, vel.y * 0.5, vel.z))
                .ok();
        }
    }

    let mut amount = tpl.damage_base + rng.next_f32() * tpl.damage_rand;
    if !prt.eternal && prt.lifetime_total > 0 {
        amount /= prt.lifetime_total as f32;
    }
    if amount <= 0.0 {
        return;
    }

    if !tpl.friendly_fire {
        if let Some(owner) = prt.owner {
            if actors.same_team(owner, holder) {
                return;
            }
        }
    }

    actors.apply_damage(holder, amount, tpl.damage_kind);
}
