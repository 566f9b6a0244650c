//! The engine that owns the particle pool and drives a tick end to end

use std::mem;

use ember_actor::ActorWorld;
use ember_core::GameRng;
use ember_pool::{LifeState, SlotKey, SlotPool, SlotView};
use ember_template::TemplateRegistry;
use ember_terrain::TerrainMesh;
use serde::Serialize;

use crate::collision;
use crate::coordinator::{self, WaterOutcome};
use crate::environment;
use crate::instance::ParticleInstance;
use crate::lifecycle::TickCtx;
use crate::motion;
use crate::params::SimParams;
use crate::spawn::{SoundEvent, SpawnRequest};

/// Effects spawned this tick may queue effects of their own; the drain
/// loop stops after this many generations so a cyclic template chain
/// cannot spin forever.
const MAX_SPAWN_WAVES: u32 = 4;

/// Running totals over the engine's whole life
#[derive(Clone, Copy, Debug, Default, Serialize)]
pub struct EngineStats {
    pub spawned: u64,
    pub freed: u64,
    pub denied: u64,
}

/// Owns the particle pool, the template registry, and the simulation
/// parameters, and advances the whole population one tick at a time.
///
/// Terrain and actors stay outside: they are borrowed per call, so one
/// engine can serve whatever world the caller is currently simulating.
pub struct ParticleEngine {
    params: SimParams,
    registry: TemplateRegistry,
    pool: SlotPool<ParticleInstance>,
    rng: GameRng,
    /// Spawns queued by live effects, drained in waves each tick
    pending: Vec<SpawnRequest>,
    /// Sound events queued for the caller since the last drain
    sounds: Vec<SoundEvent>,
    tick: u32,
    stats: EngineStats,
}

impl ParticleEngine {
    pub fn new(params: SimParams, registry: TemplateRegistry) -> Self {
        let capacity = params.capacity;
        let seed = params.seed;
        Self {
            params,
            registry,
            pool: SlotPool::new(capacity),
            rng: GameRng::new(seed),
            pending: Vec::new(),
            sounds: Vec::new(),
            tick: 0,
            stats: EngineStats::default(),
        }
    }

    /// Spawn one particle immediately.
    ///
    /// The template decides whether the spawn may evict under load.
    /// Returns the key of the live particle, or `None` when the request
    /// was denied; denials are normal under pressure and are counted
    /// rather than reported as errors.
    pub fn spawn(
        &mut self,
        terrain: &TerrainMesh,
        actors: &mut ActorWorld,
        req: SpawnRequest,
    ) -> Option<SlotKey> {
        let Self {
            params,
            registry,
            pool,
            rng,
            pending,
            sounds,
            tick,
            stats,
        } = self;
        let mut ctx = TickCtx {
            params,
            registry,
            terrain,
            actors,
            rng,
            sounds,
            requests: pending,
            tick: *tick,
            dt: 0.0,
        };
        Self::spawn_in(pool, &mut ctx, stats, req)
    }

    fn spawn_in(
        pool: &mut SlotPool<ParticleInstance>,
        ctx: &mut TickCtx<'_>,
        stats: &mut EngineStats,
        req: SpawnRequest,
    ) -> Option<SlotKey> {
        let Some(tpl) = ctx.registry.get(req.template) else {
            eprintln!(
                "Warning: discarding spawn for unknown template {:?}",
                req.template
            );
            stats.denied += 1;
            return None;
        };
        let force = tpl.force;

        let Some(key) = pool.allocate(force, ctx) else {
            stats.denied += 1;
            return None;
        };
        if let Some(prt) = pool.get_mut(key) {
            prt.spawn = Some(req);
        }
        if !pool.activate(key, ctx, 100) {
            stats.denied += 1;
            return None;
        }
        stats.spawned += 1;
        Some(key)
    }

    /// Request an end for one particle. Idempotent and stale-safe; the
    /// slot survives until the next sweep so its final frame can draw.
    pub fn terminate(&mut self, key: SlotKey) -> bool {
        self.pool.request_terminate(key)
    }

    /// Advance every particle one tick.
    ///
    /// Upkeep runs first so holders have already moved this frame, then
    /// queued spawns join, forces accumulate, and the bump pass commits
    /// positions. The sweep reclaims ended slots last, and anything the
    /// dying spawned joins the population before the tick closes.
    pub fn update_all(&mut self, dt: f32, terrain: &TerrainMesh, actors: &mut ActorWorld) {
        if dt <= 0.0 {
            return;
        }
        self.tick = self.tick.wrapping_add(1);

        self.upkeep(dt, terrain, actors);
        self.drain_pending(dt, terrain, actors);

        self.prepare_forces(actors);
        self.move_particles(terrain, actors);
        self.finalize_particles(dt, terrain, actors);

        self.sweep(dt, terrain, actors);
        self.drain_pending(dt, terrain, actors);
    }

    /// Animation, water, timers, and child spawning for every slot
    fn upkeep(&mut self, dt: f32, terrain: &TerrainMesh, actors: &mut ActorWorld) {
        let Self {
            params,
            registry,
            pool,
            rng,
            pending,
            sounds,
            tick,
            ..
        } = self;
        let mut ctx = TickCtx {
            params,
            registry,
            terrain,
            actors,
            rng,
            sounds,
            requests: pending,
            tick: *tick,
            dt,
        };

        for key in pool.keys() {
            let Some(state) = pool.run(key, &mut ctx) else {
                continue;
            };

            if pool.is_waiting(key) {
                // one last visible frame keeps animating
                if pool.is_on(key) {
                    if let Some(prt) = pool.get_mut(key) {
                        if !prt.hidden {
                            if let Some(tpl) = prt.template.and_then(|id| ctx.registry.get(id)) {
                                prt.animate(tpl);
                                prt.animate_light(tpl);
                            }
                        }
                    }
                }
                continue;
            }
            if state != LifeState::Processing {
                continue;
            }

            let stagger = stagger_phase(ctx.tick, key);
            let mut terminate = false;
            {
                let Some(prt) = pool.get_mut(key) else {
                    continue;
                };
                let Some(tpl) = prt.template.and_then(|id| ctx.registry.get(id)) else {
                    continue;
                };

                // the holder has already moved this frame
                if let Some(holder) = prt.attached_to {
                    if !ctx.actors.contains(holder) {
                        prt.attached_to = None;
                    } else {
                        prt.hidden = ctx.actors.is_hidden(holder);
                        if let Some(hpos) = ctx.actors.position(holder) {
                            prt.pos = hpos;
                            prt.pos.z += prt.offset_z;
                        }
                    }
                }

                prt.is_homing = tpl.homing
                    && prt.attached_to.is_none()
                    && prt.target.map_or(false, |t| ctx.actors.contains(t));

                if !prt.hidden {
                    let water = coordinator::update_water(
                        prt,
                        tpl,
                        ctx.registry,
                        ctx.terrain,
                        ctx.requests,
                        stagger,
                    );
                    if water == WaterOutcome::Terminate {
                        terminate = true;
                    } else {
                        prt.animate(tpl);
                        prt.animate_light(tpl);

                        if !prt.eternal {
                            prt.lifetime_remaining = prt.lifetime_remaining.saturating_sub(1);
                        }
                        prt.contspawn_timer = prt.contspawn_timer.saturating_sub(1);
                        coordinator::contspawn(prt, tpl, Some(key), ctx.requests);
                        coordinator::bump_damage(prt, tpl, ctx.actors, ctx.rng, stagger);
                    }
                }

                if !terminate {
                    prt.updates += 1;
                    if !prt.eternal && prt.updates > 0 && prt.lifetime_remaining == 0 {
                        terminate = true;
                    }
                }
            }
            if terminate {
                pool.request_terminate(key);
            }
        }
    }

    /// Give every queued spawn request its slot, in waves
    fn drain_pending(&mut self, dt: f32, terrain: &TerrainMesh, actors: &mut ActorWorld) {
        let mut waves = 0;
        while !self.pending.is_empty() && waves < MAX_SPAWN_WAVES {
            waves += 1;
            let batch = mem::take(&mut self.pending);

            let Self {
                params,
                registry,
                pool,
                rng,
                pending,
                sounds,
                tick,
                stats,
            } = self;
            let mut ctx = TickCtx {
                params,
                registry,
                terrain,
                actors: &mut *actors,
                rng,
                sounds,
                requests: pending,
                tick: *tick,
                dt,
            };
            for req in batch {
                Self::spawn_in(pool, &mut ctx, stats, req);
            }
        }
        // leftovers wait for the next tick
    }

    /// Reset force accumulators and find this tick's platform rides
    fn prepare_forces(&mut self, actors: &ActorWorld) {
        let Self {
            params,
            registry,
            pool,
            ..
        } = self;
        for key in pool.keys() {
            let live = pool.state(key) == Some(LifeState::Processing) && !pool.is_waiting(key);
            let Some(prt) = pool.get_mut(key) else {
                continue;
            };
            prt.phys.clear();
            if !live || prt.hidden {
                continue;
            }
            let Some(tpl) = prt.template.and_then(|id| registry.get(id)) else {
                continue;
            };
            prt.platform = environment::detect_platform(prt, tpl, params, actors);
        }
    }

    /// Sample the environment and accumulate this tick's forces
    fn move_particles(&mut self, terrain: &TerrainMesh, actors: &ActorWorld) {
        let Self {
            params,
            registry,
            pool,
            rng,
            ..
        } = self;
        for key in pool.keys() {
            if pool.state(key) != Some(LifeState::Processing) || pool.is_waiting(key) {
                continue;
            }
            let mut terminate = false;
            {
                let Some(prt) = pool.get_mut(key) else {
                    continue;
                };
                if prt.hidden {
                    continue;
                }
                let Some(tpl) = prt.template.and_then(|id| registry.get(id)) else {
                    continue;
                };

                // roll the history; held particles take their observed
                // velocity from the holder's drag
                let acc = prt.vel - prt.vel_old;
                if prt.attached_to.is_some() {
                    prt.vel = prt.pos - prt.pos_old;
                }
                prt.pos_old = prt.pos;
                prt.vel_old = prt.vel;

                prt.env = environment::sample(prt, params, terrain, actors, acc);

                motion::fluid_friction(prt, params);
                if motion::homing(prt, tpl, actors, rng) {
                    terminate = true;
                } else {
                    motion::z_motion(prt, params);
                    motion::floor_friction(prt, params, terrain, actors);
                }
            }
            if terminate {
                pool.request_terminate(key);
            }
        }
    }

    /// Integrate, bounce, and commit every live particle
    fn finalize_particles(&mut self, dt: f32, terrain: &TerrainMesh, actors: &ActorWorld) {
        let Self {
            params,
            registry,
            pool,
            sounds,
            tick,
            ..
        } = self;
        let tick = *tick;
        for key in pool.keys() {
            if pool.state(key) != Some(LifeState::Processing) || pool.is_waiting(key) {
                continue;
            }
            let mut terminate = false;
            {
                let Some(prt) = pool.get_mut(key) else {
                    continue;
                };
                if prt.hidden {
                    continue;
                }
                let Some(tpl) = prt.template.and_then(|id| registry.get(id)) else {
                    continue;
                };

                let stagger = stagger_phase(tick, key);
                let out =
                    collision::finalize_motion(prt, tpl, params, terrain, actors, sounds, stagger, dt);
                if out.terminate {
                    terminate = true;
                }
            }
            if terminate {
                pool.request_terminate(key);
            }
        }
    }

    /// The deferred-free sweep; dying particles may queue end effects
    fn sweep(&mut self, dt: f32, terrain: &TerrainMesh, actors: &mut ActorWorld) {
        let Self {
            params,
            registry,
            pool,
            rng,
            pending,
            sounds,
            tick,
            stats,
        } = self;
        let mut ctx = TickCtx {
            params,
            registry,
            terrain,
            actors,
            rng,
            sounds,
            requests: pending,
            tick: *tick,
            dt,
        };
        stats.freed += pool.cleanup(&mut ctx) as u64;
    }

    /// Particles a renderer should draw this frame
    pub fn visible(&self) -> impl Iterator<Item = SlotView<'_, ParticleInstance>> {
        self.pool
            .iter()
            .filter(|v| v.on && v.state.is_processing() && !v.body.hidden)
    }

    /// Hand the queued sound events to the caller and start fresh
    pub fn drain_sounds(&mut self) -> Vec<SoundEvent> {
        mem::take(&mut self.sounds)
    }

    pub fn registry(&self) -> &TemplateRegistry {
        &self.registry
    }

    pub fn params(&self) -> &SimParams {
        &self.params
    }

    pub fn capacity(&self) -> usize {
        self.pool.capacity()
    }

    pub fn live_count(&self) -> usize {
        self.pool.used_count()
    }

    pub fn tick(&self) -> u32 {
        self.tick
    }

    pub fn stats(&self) -> EngineStats {
        self.stats
    }

    pub fn contains(&self, key: SlotKey) -> bool {
        self.pool.contains(key)
    }

    pub fn state(&self, key: SlotKey) -> Option<LifeState> {
        self.pool.state(key)
    }

    pub fn get(&self, key: SlotKey) -> Option<&ParticleInstance> {
        self.pool.get(key)
    }
}

/// Per-slot phase for staggered periodic work. Mixing the generation in
/// keeps a reused slot from inheriting its predecessor's cadence.
fn stagger_phase(tick: u32, key: SlotKey) -> u32 {
    tick.wrapping_add(key.index()).wrapping_add(key.generation())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ember_core::Vec3;
    use ember_template::{ParticleTemplate, TemplateId};

    fn named(name: &str) -> ParticleTemplate {
        let mut t = ParticleTemplate::default();
        t.name = name.to_string();
        t
    }

    fn rig(capacity: usize) -> (TerrainMesh, ActorWorld, ParticleEngine) {
        let terrain = TerrainMesh::flat(8, 8, 0.0);
        let actors = ActorWorld::new();

        let mut registry = TemplateRegistry::new();
        registry.register(named("spark")).unwrap();

        let mut flash = named("flash");
        flash.lifetime = 1;
        registry.register(flash).unwrap();

        let mut fountain = named("fountain");
        fountain.contspawn.delay = 5;
        fountain.contspawn.amount = 3;
        fountain.contspawn.child = Some("spark".to_string());
        registry.register(fountain).unwrap();

        let mut mortar = named("mortar");
        mortar.lifetime = 3;
        mortar.endspawn.amount = 2;
        mortar.endspawn.child = Some("spark".to_string());
        registry.register(mortar).unwrap();

        let mut vip = named("vip");
        vip.force = true;
        registry.register(vip).unwrap();

        let mut chirp = named("chirp");
        chirp.sound_spawn = Some(3);
        registry.register(chirp).unwrap();

        registry.resolve_children();

        let mut params = SimParams::default();
        params.capacity = capacity;
        (terrain, actors, ParticleEngine::new(params, registry))
    }

    fn burst(
        engine: &mut ParticleEngine,
        terrain: &TerrainMesh,
        actors: &mut ActorWorld,
        name: &str,
    ) -> Option<SlotKey> {
        let id = engine.registry().id_by_name(name)?;
        engine.spawn(
            terrain,
            actors,
            SpawnRequest::new(id, Vec3::new(100.0, 100.0, 50.0)),
        )
    }

    #[test]
    fn unknown_template_is_denied() {
        let (terrain, mut actors, mut engine) = rig(8);
        let req = SpawnRequest::new(TemplateId::from_raw(9999), Vec3::new(100.0, 100.0, 50.0));

        assert!(engine.spawn(&terrain, &mut actors, req).is_none());
        assert_eq!(engine.live_count(), 0);
        assert_eq!(engine.stats().denied, 1);
    }

    #[test]
    fn one_tick_flash_gets_a_final_frame_then_frees() {
        let (terrain, mut actors, mut engine) = rig(8);
        let key = burst(&mut engine, &terrain, &mut actors, "flash").unwrap();
        assert_eq!(engine.visible().count(), 1);

        // lifetime expires, but the last frame still draws
        engine.update_all(1.0, &terrain, &mut actors);
        assert!(engine.contains(key));
        assert_eq!(engine.visible().count(), 1);

        engine.update_all(1.0, &terrain, &mut actors);
        assert!(!engine.contains(key));
        assert_eq!(engine.live_count(), 0);
        assert_eq!(engine.stats().freed, 1);
    }

    #[test]
    fn zero_lifetime_particles_never_expire() {
        let (terrain, mut actors, mut engine) = rig(8);
        let key = burst(&mut engine, &terrain, &mut actors, "spark").unwrap();

        for _ in 0..50 {
            engine.update_all(1.0, &terrain, &mut actors);
        }
        assert!(engine.contains(key));
        assert_eq!(engine.live_count(), 1);
    }

    #[test]
    fn fountain_emits_on_its_cadence() {
        let (terrain, mut actors, mut engine) = rig(64);
        burst(&mut engine, &terrain, &mut actors, "fountain").unwrap();

        // first wave on tick 1, then every 5 ticks: 3 waves in 15
        for _ in 0..15 {
            engine.update_all(1.0, &terrain, &mut actors);
        }
        assert_eq!(engine.live_count(), 10);
        assert_eq!(engine.stats().spawned, 10);
        assert_eq!(engine.stats().denied, 0);
    }

    #[test]
    fn death_spawn_fires_exactly_once() {
        let (terrain, mut actors, mut engine) = rig(64);
        burst(&mut engine, &terrain, &mut actors, "mortar").unwrap();

        for _ in 0..8 {
            engine.update_all(1.0, &terrain, &mut actors);
        }
        // the mortar is gone and left exactly its two children
        assert_eq!(engine.live_count(), 2);
        assert_eq!(engine.stats().spawned, 3);
        assert_eq!(engine.stats().freed, 1);
    }

    #[test]
    fn pool_never_exceeds_capacity_under_pressure() {
        let (terrain, mut actors, mut engine) = rig(8);

        // ordinary spawns respect the reserve headroom
        let mut granted = 0;
        for _ in 0..8 {
            if burst(&mut engine, &terrain, &mut actors, "spark").is_some() {
                granted += 1;
            }
        }
        assert_eq!(granted, 6);
        assert_eq!(engine.stats().denied, 2);

        // priority spawns fill the reserve, then evict
        for _ in 0..6 {
            assert!(burst(&mut engine, &terrain, &mut actors, "vip").is_some());
        }
        assert_eq!(engine.live_count(), engine.capacity());
    }

    #[test]
    fn double_terminate_frees_once() {
        let (terrain, mut actors, mut engine) = rig(8);
        let key = burst(&mut engine, &terrain, &mut actors, "spark").unwrap();

        assert!(engine.terminate(key));
        assert!(engine.terminate(key));

        engine.update_all(1.0, &terrain, &mut actors);
        assert_eq!(engine.live_count(), 1);
        engine.update_all(1.0, &terrain, &mut actors);
        assert_eq!(engine.live_count(), 0);
        assert_eq!(engine.stats().freed, 1);
        assert!(!engine.contains(key));
    }

    #[test]
    fn spawn_sound_is_queued_once() {
        let (terrain, mut actors, mut engine) = rig(8);
        burst(&mut engine, &terrain, &mut actors, "chirp").unwrap();

        let sounds = engine.drain_sounds();
        assert_eq!(sounds.len(), 1);
        assert_eq!(sounds[0].sound, 3);
        assert!(engine.drain_sounds().is_empty());
    }

    #[test]
    fn zero_dt_update_is_a_no_op() {
        let (terrain, mut actors, mut engine) = rig(8);
        let key = burst(&mut engine, &terrain, &mut actors, "flash").unwrap();

        engine.update_all(0.0, &terrain, &mut actors);
        assert_eq!(engine.tick(), 0);
        assert!(engine.contains(key));
        assert_eq!(engine.visible().count(), 1);
    }

    #[test]
    fn held_particle_tracks_its_holder_with_lift() {
        use ember_actor::ActorInfo;

        let (terrain, mut actors, mut engine) = rig(8);
        let holder = actors
            .spawn("bearer", ActorInfo::new().at(Vec3::new(100.0, 100.0, 20.0)))
            .unwrap();

        let id = engine.registry().id_by_name("spark").unwrap();
        let req = SpawnRequest::new(id, Vec3::new(100.0, 100.0, 20.0))
            .attached_to(holder)
            .zoff(6.0);
        let key = engine.spawn(&terrain, &mut actors, req).unwrap();

        // snapped onto the holder, lifted by the attach offset
        let prt = engine.get(key).unwrap();
        assert_eq!(prt.pos, Vec3::new(100.0, 100.0, 26.0));
        assert_eq!(prt.offset_z, 6.0);

        actors
            .set_position(holder, Vec3::new(130.0, 100.0, 20.0))
            .unwrap();
        engine.update_all(1.0, &terrain, &mut actors);

        // the ride keeps the lift; integration never moves a held particle
        let prt = engine.get(key).unwrap();
        assert_eq!(prt.pos, Vec3::new(130.0, 100.0, 26.0));
        assert!(engine.contains(key));
    }
}
