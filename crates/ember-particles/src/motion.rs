//! Force accumulation for the move phase.
//!
//! Each helper inspects one aspect of the environment and deposits
//! accelerations into the particle's accumulators. Nothing here moves
//! the particle; integration happens later in the collision step so
//! that bounces can rewind and replay the same forces.

use ember_actor::ActorWorld;
use ember_core::{GameRng, Vec3};
use ember_template::{ParticleTemplate, SpriteKind};
use ember_terrain::TerrainMesh;

use crate::instance::{ForceAccumulator, ParticleInstance};
use crate::params::{SimParams, STANDARD_GRAVITY};

/// Drag toward the ambient fluid current. Homing particles steer
/// themselves and glow sprites ride above the weather; both skip it.
pub fn fluid_friction(prt: &mut ParticleInstance, params: &SimParams) {
    if prt.is_homing {
        return;
    }

    let mut fluid_acc = Vec3::ZERO;
    if prt.sprite != SpriteKind::Light {
        let keep = prt.env.fluid_friction_hrz * prt.air_resistance;
        let current = if prt.in_water {
            params.water_current
        } else {
            params.wind
        };
        fluid_acc = (current - prt.vel) * (1.0 - keep);
    }

    prt.phys.avel += fluid_acc;
}

/// Steer a homing particle toward its target.
///
/// Returns true when the target is present but dead, which is the one
/// case that kills the missile; a vanished target just leaves it
/// coasting until upkeep clears the homing flag.
#[must_use]
pub fn homing(
    prt: &mut ParticleInstance,
    tpl: &ParticleTemplate,
    actors: &ActorWorld,
    rng: &mut GameRng,
) -> bool {
    if !prt.is_homing {
        return false;
    }
    let Some(target) = prt.target else {
        return false;
    };
    if !actors.contains(target) {
        return false;
    }
    if !actors.is_alive(target) {
        return true;
    }
    if prt.attached_to.is_some() {
        return false;
    }
    let Some(tpos) = actors.position(target) else {
        return false;
    };
    let theight = actors.bump_height(target).unwrap_or(0.0);

    let mut vdiff = tpos - prt.pos;
    vdiff.z += theight * 0.5;

    // The owner's aim sets both the pull strength and the scatter
    let aim = prt.owner.and_then(|o| actors.aim(o)).unwrap_or(0.5);
    let min_length = 2560.0 * aim;
    let uncertainty = 256.0 * (1.0 - aim);

    let mut vdither = Vec3::new(
        (rng.next_f32() * 2.0 - 1.0) * uncertainty,
        (rng.next_f32() * 2.0 - 1.0) * uncertainty,
        (rng.next_f32() * 2.0 - 1.0) * uncertainty,
    );

    // take away any dithering along the direction of motion
    let vlen = prt.vel.dot(&prt.vel);
    if vlen > 0.0 {
        let vdot = vdither.dot(&prt.vel) / vlen;
        vdither -= vdiff * (vdot / vlen);
    }

    vdiff += vdither;

    // Re-scale the pull to a fixed length so the chase never slows to
    // a crawl right next to the target
    let len = vdiff.length_abs();
    if len != 0.0 {
        vdiff = vdiff * (min_length / len);
    }

    prt.phys.avel +=
        prt.vel * (tpl.homing_friction - 1.0) + vdiff * (tpl.homing_accel * tpl.homing_friction);

    false
}

/// Gravity and buoyancy. Both fade out near the ground where the
/// normal force takes over, except for genuinely floating particles
/// which keep their lift all the way down.
pub fn z_motion(prt: &mut ParticleInstance, params: &SimParams) {
    if prt.is_homing || prt.attached_to.is_some() {
        return;
    }

    let zlerp = prt.env.floor_lerp.clamp(0.0, 1.0);

    if prt.buoyancy > 0.0 {
        let mut lift = prt.buoyancy + (STANDARD_GRAVITY - params.gravity);

        if zlerp < 1.0 {
            if prt.buoyancy + params.gravity < 0.0 {
                lift *= zlerp;
            } else {
                lift += zlerp * params.gravity;
            }
        }

        prt.phys.avel.z += lift;
    }

    prt.phys.avel.z += zlerp * params.gravity;
}

/// Friction against whatever the particle rests on, plus the surface's
/// normal force. Only solid sprites scrub speed on the floor; the
/// normal force supports everything except glow sprites.
pub fn floor_friction(
    prt: &mut ParticleInstance,
    params: &SimParams,
    terrain: &TerrainMesh,
    actors: &ActorWorld,
) {
    if prt.attached_to.is_some() {
        return;
    }

    let platform = prt.platform.filter(|p| actors.contains(*p));

    let vup = if platform.is_some() {
        Vec3::UP
    } else if !terrain.twist_is_flat(prt.env.twist) {
        terrain.twist_normal(prt.env.twist)
    } else {
        Vec3::new(0.0, 0.0, -params.gravity.signum())
    };

    let mut is_slipping = false;
    if !prt.is_homing && prt.sprite == SpriteKind::Solid {
        let mut temp_friction_xy;
        let mut floor_acc;
        if let Some(plat) = platform {
            // Ride along with the platform instead of grinding on it
            temp_friction_xy = params.platform_stick;
            let pvel = actors.velocity(plat).unwrap_or(Vec3::ZERO);
            floor_acc = pvel - prt.vel;
        } else {
            temp_friction_xy = 0.5;
            floor_acc = -prt.vel;
        }

        let grip = (1.0 - prt.env.floor_lerp) * (1.0 - temp_friction_xy) * prt.env.traction;
        let mut fric_floor = floor_acc * grip;
        let mut fric = fric_floor + prt.env.acc;

        // limit the friction to whatever is horizontal to the mesh
        if terrain.twist_is_flat(prt.env.twist) {
            floor_acc.z = 0.0;
            fric.z = 0.0;
        } else {
            let mesh_up = terrain.twist_normal(prt.env.twist);

            let dot = floor_acc.dot(&mesh_up);
            floor_acc -= mesh_up * dot;

            let dot = fric.dot(&mesh_up);
            fric -= mesh_up * dot;
        }

        // more "friction" than the surface supplies means slipping
        is_slipping = fric.length_abs() > prt.env.friction_hrz;
        if is_slipping {
            prt.env.traction *= 0.5;
            temp_friction_xy = temp_friction_xy.sqrt();

            let grip = (1.0 - prt.env.floor_lerp) * (1.0 - temp_friction_xy) * prt.env.traction;
            fric_floor = floor_acc * grip;
        }

        prt.phys.avel += fric_floor;
    }
    prt.env.is_slipping = is_slipping;

    if prt.sprite != SpriteKind::Light {
        apply_normal_acceleration(&mut prt.phys, vup, 1.0, prt.env.floor_lerp, params.gravity);
    }
}

/// Scale the accumulated accelerations against the surface normal.
/// The platform accumulator is exempt so a descending platform can
/// keep pulling its riders down with it.
fn apply_normal_acceleration(
    phys: &mut ForceAccumulator,
    nrm: Vec3,
    para_factor: f32,
    perp_factor: f32,
    gravity: f32,
) {
    phys.apos_coll = scale_against_normal(phys.apos_coll, nrm, para_factor, perp_factor, gravity);
    phys.avel = scale_against_normal(phys.avel, nrm, para_factor, perp_factor, gravity);
}

/// Break `acc` into parts parallel and perpendicular to `nrm` and scale
/// them separately. Only the into-surface part shrinks; a normal force
/// pushes back but never pulls.
fn scale_against_normal(
    acc: Vec3,
    nrm: Vec3,
    para_factor: f32,
    perp_factor: f32,
    gravity: f32,
) -> Vec3 {
    if acc.length_abs() == 0.0 {
        return acc;
    }
    if para_factor == 1.0 && perp_factor == 1.0 {
        return acc;
    }
    if para_factor == 0.0 && perp_factor == 0.0 {
        return Vec3::ZERO;
    }

    let nrm = if nrm.length_abs() == 0.0 {
        Vec3::new(0.0, 0.0, -gravity.signum())
    } else {
        nrm
    };

    let dot;
    let mut perp;
    let mut para;
    if nrm.z.abs() == 1.0 {
        dot = acc.z * nrm.z;
        perp = Vec3::new(0.0, 0.0, dot);
        para = Vec3::new(acc.x, acc.y, acc.z - perp.z);
    } else {
        dot = acc.dot(&nrm);
        perp = nrm * dot;
        para = acc - perp;
    }

    if dot < 0.0 && perp_factor != 1.0 {
        perp = perp * perp_factor;
    }
    if para_factor != 1.0 {
        para = para * para_factor;
    }

    para + perp
}

#[cfg(test)]
mod tests {
    use super::*;
    use ember_actor::{ActorInfo, ActorWorld};

    fn solid_on_floor() -> ParticleInstance {
        let mut prt = ParticleInstance {
            sprite: SpriteKind::Solid,
            air_resistance: 1.0,
            ..Default::default()
        };
        prt.env.fluid_friction_hrz = 0.9868;
        prt.env.fluid_friction_vrt = 0.9868;
        prt.env.friction_hrz = 0.91;
        prt
    }

    #[test]
    fn fluid_drag_pulls_toward_still_air() {
        let params = SimParams::default();
        let mut prt = solid_on_floor();
        prt.vel = Vec3::new(10.0, 0.0, 0.0);

        fluid_friction(&mut prt, &params);

        assert!(prt.phys.avel.x < 0.0);
        assert!((prt.phys.avel.x - (-10.0 * (1.0 - 0.9868))).abs() < 1e-4);
    }

    #[test]
    fn glow_sprites_ignore_fluid_drag() {
        let params = SimParams::default();
        let mut prt = solid_on_floor();
        prt.sprite = SpriteKind::Light;
        prt.vel = Vec3::new(10.0, 0.0, 0.0);

        fluid_friction(&mut prt, &params);

        assert_eq!(prt.phys.avel, Vec3::ZERO);
    }

    #[test]
    fn gravity_fades_out_at_the_floor() {
        let params = SimParams::default();

        let mut airborne = solid_on_floor();
        airborne.env.floor_lerp = 1.0;
        z_motion(&mut airborne, &params);
        assert!((airborne.phys.avel.z - params.gravity).abs() < 1e-6);

        let mut grounded = solid_on_floor();
        grounded.env.floor_lerp = 0.0;
        z_motion(&mut grounded, &params);
        assert_eq!(grounded.phys.avel.z, 0.0);
    }

    #[test]
    fn homing_dies_on_a_dead_target() {
        let tpl = ParticleTemplate::default();
        let params = SimParams::default();
        let mut rng = GameRng::new(params.seed);

        let mut actors = ActorWorld::new();
        let victim = actors
            .spawn("victim", ActorInfo::new().with_life(10.0))
            .unwrap();
        actors.apply_damage(victim, 100.0, ember_core::DamageKind::Slash);
        assert!(!actors.is_alive(victim));

        let mut prt = solid_on_floor();
        prt.is_homing = true;
        prt.target = Some(victim);

        assert!(homing(&mut prt, &tpl, &actors, &mut rng));
    }

    #[test]
    fn homing_accelerates_toward_a_live_target() {
        let mut tpl = ParticleTemplate::default();
        tpl.homing = true;
        tpl.homing_accel = 0.5;
        tpl.homing_friction = 0.9;

        let params = SimParams::default();
        let mut rng = GameRng::new(params.seed);

        let mut actors = ActorWorld::new();
        let quarry = actors
            .spawn(
                "quarry",
                ActorInfo::new()
                    .at(Vec3::new(500.0, 0.0, 0.0))
                    .with_aim(1.0),
            )
            .unwrap();

        let mut prt = solid_on_floor();
        prt.is_homing = true;
        prt.target = Some(quarry);
        prt.owner = Some(quarry);

        assert!(!homing(&mut prt, &tpl, &actors, &mut rng));
        // perfect aim means zero dither, so the pull points straight +x
        assert!(prt.phys.avel.x > 0.0);
    }

    #[test]
    fn normal_force_cancels_downward_pull_on_the_floor() {
        let params = SimParams::default();
        let terrain = TerrainMesh::flat(4, 4, 0.0);
        let actors = ActorWorld::new();

        let mut prt = solid_on_floor();
        prt.env.floor_lerp = 0.0;
        prt.phys.avel = Vec3::new(0.0, 0.0, -1.0);

        floor_friction(&mut prt, &params, &terrain, &actors);

        assert_eq!(prt.phys.avel.z, 0.0);
    }

    #[test]
    fn sliding_solid_starts_slipping() {
        let params = SimParams::default();
        let terrain = TerrainMesh::flat(4, 4, 0.0);
        let actors = ActorWorld::new();

        let mut prt = solid_on_floor();
        prt.vel = Vec3::new(10.0, 0.0, 0.0);
        prt.env.floor_lerp = 0.0;
        prt.env.traction = 1.0;

        floor_friction(&mut prt, &params, &terrain, &actors);

        assert!(prt.env.is_slipping);
        // friction still points against the motion
        assert!(prt.phys.avel.x < 0.0);
    }
}
