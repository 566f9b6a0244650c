//! Terrain, fluid, and platform readings for the move phase

use ember_actor::{ActorWorld, Entity};
use ember_core::Vec3;
use ember_template::ParticleTemplate;
use ember_terrain::{tile_fx, TerrainMesh};

use crate::instance::{EnvSnapshot, ParticleInstance};
use crate::params::SimParams;

/// Read the world under a particle into a fresh snapshot. `acc` is the
/// acceleration measured over the previous tick, captured by the caller
/// before it rolls the velocity history.
pub fn sample(
    prt: &ParticleInstance,
    params: &SimParams,
    terrain: &TerrainMesh,
    actors: &ActorWorld,
    acc: Vec3,
) -> EnvSnapshot {
    let mut env = EnvSnapshot {
        acc,
        ..EnvSnapshot::default()
    };

    env.grid_level = terrain.floor_level(prt.pos.x, prt.pos.y);
    env.floor_level = env.grid_level;
    if let Some(plat) = prt.platform {
        if let Some(top) = actors.platform_top(plat) {
            env.floor_level = env.floor_level.max(top);
        }
    }

    // The sprite bottom, not its center, rides the floor
    let lift = prt.size.max(prt.offset_z * 0.5);
    env.grid_adj = env.grid_level + lift;
    env.adj_level = env.floor_level + lift;
    env.floor_lerp = ((prt.pos.z - env.adj_level) / params.platform_tolerance).clamp(0.0, 1.0);

    // Slope comes from whatever the particle stands on
    env.twist = match prt.attached_to.and_then(|h| actors.position(h)) {
        Some(hp) => terrain.tile_twist(hp.x, hp.y),
        None => terrain.tile_twist(prt.pos.x, prt.pos.y),
    };

    env.is_watery = terrain.water.is_water && prt.in_water;
    env.is_slippy = !env.is_watery && terrain.tile_has_flag(prt.pos.x, prt.pos.y, tile_fx::SLIPPY);

    if prt.is_homing {
        env.traction = 1.0;
    } else {
        let up_z = if prt.platform.is_some() {
            1.0
        } else {
            terrain.twist_normal(env.twist).z
        };
        env.traction = up_z.abs() * (1.0 - env.floor_lerp) + 0.25 * env.floor_lerp;
        if env.is_slippy {
            env.traction /= params.hillslide * (1.0 - env.floor_lerp) + env.floor_lerp;
        }
    }

    if env.is_watery {
        env.fluid_friction_hrz = params.water_friction;
        env.fluid_friction_vrt = params.water_friction;
    } else {
        env.fluid_friction_hrz = params.fluid_air_friction;
        env.fluid_friction_vrt = params.fluid_air_friction;
    }

    env.friction_hrz = if prt.is_homing {
        1.0
    } else if env.is_slippy {
        params.slippy_friction
    } else {
        params.noslip_friction
    };

    env
}

/// Find the platform a free particle rides this tick: footprints overlap
/// in xy and the particle sits above the surface's reach. The highest
/// top wins. Held particles never ride platforms.
pub fn detect_platform(
    prt: &ParticleInstance,
    tpl: &ParticleTemplate,
    params: &SimParams,
    actors: &ActorWorld,
) -> Option<Entity> {
    if prt.attached_to.is_some() {
        return None;
    }

    let mut best: Option<(Entity, f32)> = None;
    for plat in actors.platforms() {
        let Some(ppos) = actors.position(plat) else {
            continue;
        };
        let Some(psize) = actors.bump_size(plat) else {
            continue;
        };
        let Some(top) = actors.platform_top(plat) else {
            continue;
        };

        let reach = psize + tpl.bump_size;
        if (prt.pos.x - ppos.x).abs() > reach || (prt.pos.y - ppos.y).abs() > reach {
            continue;
        }
        if prt.pos.z < top - params.platform_tolerance {
            continue;
        }

        match best {
            Some((_, t)) if t >= top => {}
            _ => best = Some((plat, top)),
        }
    }

    best.map(|(e, _)| e)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ember_actor::ActorInfo;

    #[test]
    fn floor_lerp_spans_the_tolerance_band() {
        let terrain = TerrainMesh::flat(4, 4, 0.0);
        let actors = ActorWorld::new();
        let params = SimParams::default();

        let mut prt = ParticleInstance {
            pos: Vec3::new(200.0, 200.0, 0.0),
            size: 0.0,
            ..Default::default()
        };

        let env = sample(&prt, &params, &terrain, &actors, Vec3::ZERO);
        assert_eq!(env.floor_lerp, 0.0);

        prt.pos.z = params.platform_tolerance * 0.5;
        let env = sample(&prt, &params, &terrain, &actors, Vec3::ZERO);
        assert!((env.floor_lerp - 0.5).abs() < 1e-6);

        prt.pos.z = params.platform_tolerance * 4.0;
        let env = sample(&prt, &params, &terrain, &actors, Vec3::ZERO);
        assert_eq!(env.floor_lerp, 1.0);
    }

    #[test]
    fn platform_raises_the_floor() {
        let terrain = TerrainMesh::flat(4, 4, 0.0);
        let params = SimParams::default();

        let mut actors = ActorWorld::new();
        let table = actors
            .spawn(
                "table",
                ActorInfo::new()
                    .at(Vec3::new(200.0, 200.0, 0.0))
                    .with_bump(60.0, 40.0)
                    .as_platform(),
            )
            .unwrap();

        let prt = ParticleInstance {
            pos: Vec3::new(200.0, 200.0, 45.0),
            platform: Some(table),
            ..Default::default()
        };

        let env = sample(&prt, &params, &terrain, &actors, Vec3::ZERO);
        assert_eq!(env.grid_level, 0.0);
        assert_eq!(env.floor_level, 40.0);
    }

    #[test]
    fn highest_platform_wins_detection() {
        let params = SimParams::default();
        let tpl = ParticleTemplate::default();

        let mut actors = ActorWorld::new();
        let low = actors
            .spawn(
                "low",
                ActorInfo::new()
                    .at(Vec3::new(100.0, 100.0, 0.0))
                    .with_bump(50.0, 20.0)
                    .as_platform(),
            )
            .unwrap();
        let high = actors
            .spawn(
                "high",
                ActorInfo::new()
                    .at(Vec3::new(100.0, 100.0, 0.0))
                    .with_bump(50.0, 35.0)
                    .as_platform(),
            )
            .unwrap();

        let prt = ParticleInstance {
            pos: Vec3::new(110.0, 100.0, 40.0),
            ..Default::default()
        };

        let found = detect_platform(&prt, &tpl, &params, &actors);
        assert_eq!(found, Some(high));
        assert_ne!(found, Some(low));
    }

    #[test]
    fn particles_far_below_do_not_ride() {
        let params = SimParams::default();
        let tpl = ParticleTemplate::default();

        let mut actors = ActorWorld::new();
        actors
            .spawn(
                "ledge",
                ActorInfo::new()
                    .at(Vec3::new(100.0, 100.0, 200.0))
                    .with_bump(50.0, 30.0)
                    .as_platform(),
            )
            .unwrap();

        let prt = ParticleInstance {
            pos: Vec3::new(100.0, 100.0, 10.0),
            ..Default::default()
        };

        assert_eq!(detect_platform(&prt, &tpl, &params, &actors), None);
    }
}
