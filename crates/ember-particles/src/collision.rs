//! Accumulator integration and terrain collision response.
//!
//! The move phase only gathers forces; this module turns them into a
//! trial position, bounces the trial off the floor and the walls, and
//! commits the result. Collision corrections are themselves written
//! into the accumulators, so a bounced particle is re-integrated from
//! its original state rather than nudged after the fact.

use ember_actor::ActorWorld;
use ember_core::{Facing, Vec3};
use ember_template::ParticleTemplate;
use ember_terrain::{tile_fx, TerrainMesh};

use crate::instance::{ForceAccumulator, ParticleInstance};
use crate::params::SimParams;
use crate::spawn::SoundEvent;

/// Tile flags that stop particles
pub(crate) const STOP_BITS: u8 = tile_fx::IMPASS | tile_fx::WALL;

/// Settle epsilon keeping a resting particle just clear of the floor
const REST_LIFT: f32 = 0.0001;

#[derive(Debug, Clone, Copy, Default)]
pub struct BumpOutcome {
    /// The accumulators changed; the caller should re-integrate
    pub bumped: bool,
    /// A terminal flag fired; the caller should kill the particle
    pub terminate: bool,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct FinalizeOutcome {
    pub terminate: bool,
    pub bumped: bool,
}

/// Apply the accumulated displacement and acceleration to a trial
/// position and velocity, leaving the accumulators untouched.
pub fn integrate(pos: Vec3, vel: Vec3, phys: &ForceAccumulator, dt: f32) -> (Vec3, Vec3) {
    if dt == 0.0 {
        return (pos, vel);
    }

    let displacement = phys.apos_plat + phys.apos_coll;
    let new_pos = pos + vel * dt + displacement;
    let new_vel = vel + phys.avel * dt;
    (new_pos, new_vel)
}

/// Bounce the trial position off the floor. Corrections go into the
/// accumulators; `bumped` reports whether any were written.
pub fn bump_mesh(
    prt: &mut ParticleInstance,
    tpl: &ParticleTemplate,
    params: &SimParams,
    terrain: &TerrainMesh,
    sounds: &mut Vec<SoundEvent>,
    test_pos: Vec3,
    test_vel: Vec3,
    dt: f32,
) -> BumpOutcome {
    if prt.attached_to.is_some() {
        return bump_mesh_attached(prt, tpl, sounds, test_pos);
    }

    let save_apos_coll = prt.phys.apos_coll;
    let save_avel = prt.phys.avel;
    let old_pos = prt.pos;

    let mut final_vel = test_vel;
    let mut final_pos = test_pos;
    let mut hit = false;
    let mut touch = false;
    let mut nrm_total = Vec3::ZERO;

    let level = prt.env.grid_adj;
    if test_pos.z < level {
        touch = true;

        let tile_twist = terrain.tile_twist(prt.pos.x, prt.pos.y);
        let floor_nrm = if !terrain.twist_is_flat(tile_twist) {
            terrain.twist_normal(prt.env.twist)
        } else {
            Vec3::UP
        };

        let vel_dot = floor_nrm.dot(&test_vel);
        let vel_perp = floor_nrm * vel_dot;
        let vel_para = test_vel - vel_perp;

        if vel_dot < -params.stop_bounce {
            nrm_total += floor_nrm;
            final_pos.z = old_pos.z;
            hit = true;
        } else if vel_dot > 0.0 {
            // not bouncing, just at the wrong height
            final_pos.z = level;
        } else {
            // inside the stop-bounce zone; shed the into-floor speed
            final_pos.z = level + REST_LIFT;
            final_vel = vel_para;
        }
    }

    if hit {
        if let Some(sound) = tpl.sound_floor {
            sounds.push(SoundEvent {
                sound,
                pos: test_pos,
            });
        }
    }

    if touch && tpl.end_on_ground {
        return BumpOutcome {
            bumped: false,
            terminate: true,
        };
    }

    if hit {
        if test_vel.z * nrm_total.z < 0.0 {
            let nrm = nrm_total.normalized();
            let vdot = nrm.dot(&test_vel);
            let mut vperp = nrm * vdot;
            let mut vpara = test_vel - vperp;

            vperp = vperp * -tpl.dampen;

            // fake the friction on the parallel part
            if nrm.y != 0.0 || nrm.z != 0.0 {
                vpara.x *= tpl.dampen;
            }
            if nrm.x != 0.0 || nrm.z != 0.0 {
                vpara.y *= tpl.dampen;
            }
            if nrm.x != 0.0 || nrm.y != 0.0 {
                vpara.z *= tpl.dampen;
            }

            final_vel = vpara + vperp;
        }

        if nrm_total.z != 0.0 && final_vel.z.abs() < params.stop_bounce {
            // this is the very last bounce
            final_vel.z = 0.0;
            final_pos.z = level + REST_LIFT;
        }
    }

    prt.phys.avel += (final_vel - test_vel) * (1.0 / dt);
    prt.phys.apos_coll += final_pos - test_pos;

    let bumped = prt.phys.apos_coll != save_apos_coll || prt.phys.avel != save_avel;
    BumpOutcome {
        bumped,
        terminate: false,
    }
}

/// Held particles cannot move away from the floor, so a floor contact
/// only plays the sound and honors the kill flag.
fn bump_mesh_attached(
    prt: &ParticleInstance,
    tpl: &ParticleTemplate,
    sounds: &mut Vec<SoundEvent>,
    test_pos: Vec3,
) -> BumpOutcome {
    let hit = test_pos.z < prt.env.grid_adj;

    if hit {
        if let Some(sound) = tpl.sound_floor {
            sounds.push(SoundEvent {
                sound,
                pos: test_pos,
            });
        }
        if tpl.end_on_ground {
            return BumpOutcome {
                bumped: false,
                terminate: true,
            };
        }
    }

    BumpOutcome::default()
}

/// Bounce the trial position off blocking tiles. The horizontal motion
/// reverts to the last good spot, the velocity reflects, and the sprite
/// heading mirrors so arrows visually ricochet.
pub fn bump_grid(
    prt: &mut ParticleInstance,
    tpl: &ParticleTemplate,
    terrain: &TerrainMesh,
    sounds: &mut Vec<SoundEvent>,
    test_pos: Vec3,
    test_vel: Vec3,
    dt: f32,
) -> BumpOutcome {
    if prt.attached_to.is_some() {
        return bump_grid_attached(tpl, terrain, sounds, test_pos, test_vel);
    }

    let save_apos_coll = prt.phys.apos_coll;
    let save_avel = prt.phys.avel;
    let old_pos = prt.pos;

    let mut final_vel = test_vel;
    let mut final_pos = test_pos;
    let mut hit = false;
    let mut touch = false;
    let mut nrm_total = Vec3::ZERO;

    if !terrain.test_wall(test_pos, tpl.bump_size, STOP_BITS) {
        return BumpOutcome::default();
    }

    if let Some(wall) = terrain.hit_wall(test_pos, tpl.bump_size, STOP_BITS) {
        if wall.bits != 0 {
            touch = true;

            final_pos.x = old_pos.x;
            final_pos.y = old_pos.y;

            nrm_total.x += wall.normal.x;
            nrm_total.y += wall.normal.y;

            hit = test_vel.x * wall.normal.x + test_vel.y * wall.normal.y < 0.0;
        }
    }

    if hit {
        if let Some(sound) = tpl.sound_wall {
            sounds.push(SoundEvent {
                sound,
                pos: test_pos,
            });
        }
    }

    if touch && (tpl.end_on_wall || tpl.end_on_bump) {
        return BumpOutcome {
            bumped: false,
            terminate: true,
        };
    }

    if hit {
        if test_vel.x * nrm_total.x + test_vel.y * nrm_total.y < 0.0 {
            let nrm = nrm_total.normalized();
            let vdot = nrm.dot(&test_vel);
            let mut vperp = nrm * vdot;
            let mut vpara = test_vel - vperp;

            vperp = vperp * -tpl.dampen;

            if nrm.y != 0.0 || nrm.z != 0.0 {
                vpara.x *= tpl.dampen;
            }
            if nrm.x != 0.0 || nrm.z != 0.0 {
                vpara.y *= tpl.dampen;
            }
            if nrm.x != 0.0 || nrm.y != 0.0 {
                vpara.z *= tpl.dampen;
            }

            final_vel = vpara + vperp;
        }

        // mirror the sprite heading off the wall
        let unit = prt.facing.unit();
        let fx = if nrm_total.x != 0.0 { -unit.x } else { unit.x };
        let fy = if nrm_total.y != 0.0 { -unit.y } else { unit.y };
        prt.facing = Facing::from_vector(fx, fy);
    }

    prt.phys.avel += (final_vel - test_vel) * (1.0 / dt);
    prt.phys.apos_coll += final_pos - test_pos;

    let bumped = prt.phys.apos_coll != save_apos_coll || prt.phys.avel != save_avel;
    BumpOutcome {
        bumped,
        terminate: false,
    }
}

fn bump_grid_attached(
    tpl: &ParticleTemplate,
    terrain: &TerrainMesh,
    sounds: &mut Vec<SoundEvent>,
    test_pos: Vec3,
    test_vel: Vec3,
) -> BumpOutcome {
    let mut hit = false;

    if test_vel.horizontal().length_abs() > 0.0
        && terrain.test_wall(test_pos, tpl.bump_size, STOP_BITS)
    {
        if let Some(wall) = terrain.hit_wall(test_pos, tpl.bump_size, STOP_BITS) {
            hit = wall.bits != 0;
        }
    }

    if hit {
        if let Some(sound) = tpl.sound_wall {
            sounds.push(SoundEvent {
                sound,
                pos: test_pos,
            });
        }
        if tpl.end_on_wall || tpl.end_on_bump {
            return BumpOutcome {
                bumped: false,
                terminate: true,
            };
        }
    }

    BumpOutcome::default()
}

/// Re-cache the last known good position when the current one is clear
/// of blocking tiles.
pub(crate) fn update_safe(prt: &mut ParticleInstance, tpl: &ParticleTemplate, terrain: &TerrainMesh) {
    if terrain.hit_wall(prt.pos, tpl.bump_size, STOP_BITS).is_none() {
        prt.safe_pos = prt.pos;
        prt.safe_valid = true;
    }
}

/// Integrate, bounce, and commit one particle for this tick. `stagger`
/// is a per-particle hash mixed with the tick counter, used to spread
/// periodic safe-position checks across the pool.
pub fn finalize_motion(
    prt: &mut ParticleInstance,
    tpl: &ParticleTemplate,
    params: &SimParams,
    terrain: &TerrainMesh,
    actors: &ActorWorld,
    sounds: &mut Vec<SoundEvent>,
    stagger: u32,
    dt: f32,
) -> FinalizeOutcome {
    // a held particle stays where its holder put it; only the touch
    // checks run
    let (mut test_pos, mut test_vel) = if prt.attached_to.is_some() {
        (prt.pos, prt.vel)
    } else {
        integrate(prt.pos, prt.vel, &prt.phys, dt)
    };

    let mesh = bump_mesh(prt, tpl, params, terrain, sounds, test_pos, test_vel, dt);
    if mesh.terminate {
        return FinalizeOutcome {
            terminate: true,
            bumped: mesh.bumped,
        };
    }
    if mesh.bumped {
        // re-integrate so the correction cannot push through the floor
        let (p, v) = integrate(prt.pos, prt.vel, &prt.phys, dt);
        test_pos = p;
        test_vel = v;
    }

    let grid = bump_grid(prt, tpl, terrain, sounds, test_pos, test_vel, dt);
    if grid.terminate {
        return FinalizeOutcome {
            terminate: true,
            bumped: mesh.bumped,
        };
    }
    if grid.bumped {
        let (p, v) = integrate(prt.pos, prt.vel, &prt.phys, dt);
        test_pos = p;
        test_vel = v;
    }

    // homing particles never fall into pits
    if prt.is_homing && test_pos.z < 0.0 {
        test_pos.z = 0.0;
    }

    if prt.attached_to.is_none() && tpl.rotate_to_face {
        if test_vel.horizontal().length_abs() > 1e-6 {
            prt.facing = Facing::from_vector(test_vel.x, test_vel.y);
        } else if let Some(tpos) = prt.target.and_then(|t| actors.position(t)) {
            prt.facing = Facing::from_vector(tpos.x - test_pos.x, tpos.y - test_pos.y);
        }
    }

    let bumped = mesh.bumped || grid.bumped;

    prt.pos = test_pos;
    prt.vel = test_vel;

    // revalidate the safe spot on a bump, or every 8 ticks regardless
    if bumped || stagger & 7 == 0 {
        update_safe(prt, tpl, terrain);
    }

    FinalizeOutcome {
        terminate: false,
        bumped,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn free_particle(pos: Vec3) -> ParticleInstance {
        ParticleInstance {
            pos,
            pos_old: pos,
            ..Default::default()
        }
    }

    #[test]
    fn fast_impact_bounces_with_exact_restitution() {
        let mut tpl = ParticleTemplate::default();
        tpl.dampen = 0.5;
        let params = SimParams::default();
        let terrain = TerrainMesh::flat(4, 4, 0.0);
        let mut sounds = Vec::new();

        let mut prt = free_particle(Vec3::new(200.0, 200.0, 19.0));
        prt.vel = Vec3::new(3.0, 0.0, -20.0);

        let (test_pos, test_vel) = integrate(prt.pos, prt.vel, &prt.phys, 1.0);
        assert!(test_pos.z < 0.0);

        let out = bump_mesh(
            &mut prt, &tpl, &params, &terrain, &mut sounds, test_pos, test_vel, 1.0,
        );
        assert!(out.bumped);
        assert!(!out.terminate);

        // the correction plays back through the accumulators
        let (_, vel) = integrate(prt.pos, prt.vel, &prt.phys, 1.0);
        assert!((vel.z - 10.0).abs() < 1e-4);
        assert!((vel.x - 1.5).abs() < 1e-4);
    }

    #[test]
    fn slow_contact_settles_to_zero_vertical_speed() {
        let tpl = ParticleTemplate::default();
        let params = SimParams::default();
        let terrain = TerrainMesh::flat(4, 4, 0.0);
        let mut sounds = Vec::new();

        let mut prt = free_particle(Vec3::new(200.0, 200.0, 2.5));
        prt.vel = Vec3::new(0.0, 0.0, -3.0);

        let (test_pos, test_vel) = integrate(prt.pos, prt.vel, &prt.phys, 1.0);
        assert_eq!(test_pos.z, -0.5);

        let out = bump_mesh(
            &mut prt, &tpl, &params, &terrain, &mut sounds, test_pos, test_vel, 1.0,
        );
        assert!(out.bumped);

        // below the settle threshold the rebound is exactly zero and the
        // particle comes to rest just above the floor
        let (pos, vel) = integrate(prt.pos, prt.vel, &prt.phys, 1.0);
        assert_eq!(vel.z, 0.0);
        assert_eq!(prt.phys.avel.z, 3.0);
        assert!((pos.z - REST_LIFT).abs() < 1e-3);
    }

    #[test]
    fn ground_kill_flag_terminates_on_touch() {
        let mut tpl = ParticleTemplate::default();
        tpl.end_on_ground = true;
        let params = SimParams::default();
        let terrain = TerrainMesh::flat(4, 4, 0.0);
        let mut sounds = Vec::new();

        let mut prt = free_particle(Vec3::new(200.0, 200.0, 2.0));
        let out = bump_mesh(
            &mut prt,
            &tpl,
            &params,
            &terrain,
            &mut sounds,
            Vec3::new(200.0, 200.0, -0.5),
            Vec3::new(0.0, 0.0, -1.0),
            1.0,
        );

        assert!(out.terminate);
        // no corrections are written for a terminated particle
        assert_eq!(prt.phys, ForceAccumulator::default());
    }

    #[test]
    fn wall_bump_reverts_and_reflects() {
        let mut tpl = ParticleTemplate::default();
        tpl.dampen = 0.5;
        tpl.bump_size = 0.0;
        let terrain = {
            let mut t = TerrainMesh::flat(4, 4, 0.0);
            t.add_fx_border(tile_fx::IMPASS);
            t
        };
        let mut sounds = Vec::new();

        let mut prt = free_particle(Vec3::new(140.0, 200.0, 10.0));
        prt.facing = Facing::from_vector(-1.0, 0.0);

        let test_pos = Vec3::new(100.0, 200.0, 10.0);
        let test_vel = Vec3::new(-5.0, 0.0, 0.0);

        let out = bump_grid(&mut prt, &tpl, &terrain, &mut sounds, test_pos, test_vel, 1.0);
        assert!(out.bumped);
        assert!(!out.terminate);

        // position reverted to the last good x
        assert!((prt.phys.apos_coll.x - 40.0).abs() < 1e-4);

        // velocity reflected off the wall with restitution
        let (_, vel) = integrate(prt.pos, test_vel, &prt.phys, 1.0);
        assert!(vel.x > 0.0);

        // the sprite heading mirrored
        let unit = prt.facing.unit();
        assert!(unit.x > 0.0);
    }

    #[test]
    fn wall_kill_flag_terminates() {
        let mut tpl = ParticleTemplate::default();
        tpl.end_on_wall = true;
        tpl.bump_size = 0.0;
        let terrain = {
            let mut t = TerrainMesh::flat(4, 4, 0.0);
            t.add_fx_border(tile_fx::IMPASS);
            t
        };
        let mut sounds = Vec::new();

        let mut prt = free_particle(Vec3::new(140.0, 200.0, 10.0));
        let out = bump_grid(
            &mut prt,
            &tpl,
            &terrain,
            &mut sounds,
            Vec3::new(100.0, 200.0, 10.0),
            Vec3::new(-5.0, 0.0, 0.0),
            1.0,
        );

        assert!(out.terminate);
    }

    #[test]
    fn clear_path_leaves_accumulators_untouched() {
        let tpl = ParticleTemplate::default();
        let terrain = TerrainMesh::flat(4, 4, 0.0);
        let mut sounds = Vec::new();

        let mut prt = free_particle(Vec3::new(200.0, 200.0, 50.0));
        let out = bump_grid(
            &mut prt,
            &tpl,
            &terrain,
            &mut sounds,
            Vec3::new(210.0, 200.0, 50.0),
            Vec3::new(10.0, 0.0, 0.0),
            1.0,
        );

        assert!(!out.bumped);
        assert_eq!(prt.phys, ForceAccumulator::default());
        assert!(sounds.is_empty());
    }
}
