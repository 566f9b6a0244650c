//! ActorWorld - actor storage with named lookup
//!
//! Wraps hecs::World with a name registry and the handful of accessors
//! the simulation needs. Actors are driven by the host; this crate only
//! stores their state and applies incoming damage.

use std::collections::HashMap;

use ember_core::{DamageKind, EmberError, Result, Vec3};
use hecs::Entity;

use crate::actor::{
    ActorInfo, Aim, DamageResist, Hidden, Platform, Position, Stature, Team, Velocity, Vitals,
};

pub struct ActorWorld {
    world: hecs::World,
    name_map: HashMap<String, Entity>,
}

impl Default for ActorWorld {
    fn default() -> Self {
        Self::new()
    }
}

impl ActorWorld {
    /// Create a new empty world
    pub fn new() -> Self {
        Self {
            world: hecs::World::new(),
            name_map: HashMap::new(),
        }
    }

    /// Spawn an actor with a unique name
    pub fn spawn(&mut self, name: impl Into<String>, info: ActorInfo) -> Result<Entity> {
        let name = name.into();

        if self.name_map.contains_key(&name) {
            return Err(EmberError::DuplicateActorName(name));
        }

        let entity = self.world.spawn((
            Position(info.pos),
            Velocity(info.vel),
            Stature {
                bump_size: info.bump_size,
                bump_height: info.bump_height,
            },
            Vitals {
                life: info.life,
                max_life: info.life,
                alive: info.life > 0.0,
            },
            Team(info.team),
            Aim(info.aim.clamp(0.0, 1.0)),
            DamageResist(info.resist),
        ));
        if info.platform {
            let _ = self.world.insert_one(entity, Platform);
        }
        if info.hidden {
            let _ = self.world.insert_one(entity, Hidden);
        }

        self.name_map.insert(name, entity);
        Ok(entity)
    }

    /// Remove an actor entirely
    pub fn despawn(&mut self, actor: Entity) -> Result<()> {
        self.world
            .despawn(actor)
            .map_err(|_| EmberError::ActorNotFound(format!("{actor:?}")))?;
        self.name_map.retain(|_, v| *v != actor);
        Ok(())
    }

    pub fn lookup(&self, name: &str) -> Option<Entity> {
        self.name_map.get(name).copied()
    }

    pub fn contains(&self, actor: Entity) -> bool {
        self.world.contains(actor)
    }

    pub fn len(&self) -> usize {
        self.world.len() as usize
    }

    pub fn is_empty(&self) -> bool {
        self.world.len() == 0
    }

    /// Iterate (name, entity) pairs in no particular order
    pub fn names(&self) -> impl Iterator<Item = (&str, Entity)> {
        self.name_map.iter().map(|(n, e)| (n.as_str(), *e))
    }

    /// Alive means present and not out of life
    pub fn is_alive(&self, actor: Entity) -> bool {
        self.world
            .get::<&Vitals>(actor)
            .map(|v| v.alive)
            .unwrap_or(false)
    }

    pub fn position(&self, actor: Entity) -> Option<Vec3> {
        self.world.get::<&Position>(actor).map(|p| p.0).ok()
    }

    pub fn velocity(&self, actor: Entity) -> Option<Vec3> {
        self.world.get::<&Velocity>(actor).map(|v| v.0).ok()
    }

    pub fn set_position(&mut self, actor: Entity, pos: Vec3) -> Result<()> {
        let mut p = self
            .world
            .get::<&mut Position>(actor)
            .map_err(|_| EmberError::ActorNotFound(format!("{actor:?}")))?;
        p.0 = pos;
        Ok(())
    }

    pub fn set_velocity(&mut self, actor: Entity, vel: Vec3) -> Result<()> {
        let mut v = self
            .world
            .get::<&mut Velocity>(actor)
            .map_err(|_| EmberError::ActorNotFound(format!("{actor:?}")))?;
        v.0 = vel;
        Ok(())
    }

    pub fn bump_size(&self, actor: Entity) -> Option<f32> {
        self.world.get::<&Stature>(actor).map(|s| s.bump_size).ok()
    }

    pub fn bump_height(&self, actor: Entity) -> Option<f32> {
        self.world
            .get::<&Stature>(actor)
            .map(|s| s.bump_height)
            .ok()
    }

    pub fn team(&self, actor: Entity) -> Option<u8> {
        self.world.get::<&Team>(actor).map(|t| t.0).ok()
    }

    pub fn same_team(&self, a: Entity, b: Entity) -> bool {
        match (self.team(a), self.team(b)) {
            (Some(ta), Some(tb)) => ta == tb,
            _ => false,
        }
    }

    pub fn aim(&self, actor: Entity) -> Option<f32> {
        self.world.get::<&Aim>(actor).map(|a| a.0).ok()
    }

    pub fn life(&self, actor: Entity) -> Option<f32> {
        self.world.get::<&Vitals>(actor).map(|v| v.life).ok()
    }

    pub fn is_platform(&self, actor: Entity) -> bool {
        self.world.get::<&Platform>(actor).is_ok()
    }

    /// Height of the standing surface a platform offers
    pub fn platform_top(&self, actor: Entity) -> Option<f32> {
        if !self.is_platform(actor) {
            return None;
        }
        let pos = self.position(actor)?;
        let height = self.bump_height(actor)?;
        Some(pos.z + height)
    }

    /// All entities currently offering a platform surface
    pub fn platforms(&self) -> Vec<Entity> {
        self.world
            .query::<&Platform>()
            .iter()
            .map(|(e, _)| e)
            .collect()
    }

    pub fn is_hidden(&self, actor: Entity) -> bool {
        self.world.get::<&Hidden>(actor).is_ok()
    }

    pub fn set_hidden(&mut self, actor: Entity, hidden: bool) -> Result<()> {
        if !self.world.contains(actor) {
            return Err(EmberError::ActorNotFound(format!("{actor:?}")));
        }
        if hidden {
            let _ = self.world.insert_one(actor, Hidden);
        } else {
            let _ = self.world.remove_one::<Hidden>(actor);
        }
        Ok(())
    }

    /// Apply typed damage through the actor's resistances. Returns the
    /// life actually removed; dead and missing actors take nothing.
    pub fn apply_damage(&mut self, actor: Entity, amount: f32, kind: DamageKind) -> f32 {
        let resist = self
            .world
            .get::<&DamageResist>(actor)
            .map(|r| r.0[kind as usize])
            .unwrap_or(1.0);

        let Ok(mut vitals) = self.world.get::<&mut Vitals>(actor) else {
            return 0.0;
        };
        if !vitals.alive {
            return 0.0;
        }

        let scaled = amount.max(0.0) * resist;
        let before = vitals.life;
        vitals.life = (vitals.life - scaled).clamp(0.0, vitals.max_life);
        if vitals.life <= 0.0 {
            vitals.alive = false;
        }
        before - vitals.life
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spawn_and_lookup_by_name() {
        let mut world = ActorWorld::new();
        let imp = world
            .spawn("imp", ActorInfo::new().at(Vec3::new(100.0, 50.0, 0.0)))
            .unwrap();

        assert_eq!(world.lookup("imp"), Some(imp));
        assert!(world.is_alive(imp));
        assert_eq!(world.position(imp), Some(Vec3::new(100.0, 50.0, 0.0)));
    }

    #[test]
    fn duplicate_names_are_rejected() {
        let mut world = ActorWorld::new();
        world.spawn("imp", ActorInfo::new()).unwrap();
        assert!(matches!(
            world.spawn("imp", ActorInfo::new()),
            Err(EmberError::DuplicateActorName(_))
        ));
    }

    #[test]
    fn damage_respects_resistances_and_kills() {
        let mut world = ActorWorld::new();
        let mut resist = [1.0; 8];
        resist[DamageKind::Fire as usize] = 0.5;
        let imp = world
            .spawn("imp", ActorInfo::new().with_life(20.0).with_resist(resist))
            .unwrap();

        let dealt = world.apply_damage(imp, 10.0, DamageKind::Fire);
        assert!((dealt - 5.0).abs() < 0.001);
        assert_eq!(world.life(imp), Some(15.0));

        world.apply_damage(imp, 100.0, DamageKind::Crush);
        assert!(!world.is_alive(imp));

        // the dead take no further damage
        assert_eq!(world.apply_damage(imp, 10.0, DamageKind::Crush), 0.0);
    }

    #[test]
    fn platform_top_sits_on_the_bump_box() {
        let mut world = ActorWorld::new();
        let raft = world
            .spawn(
                "raft",
                ActorInfo::new()
                    .at(Vec3::new(0.0, 0.0, 10.0))
                    .with_bump(40.0, 25.0)
                    .as_platform(),
            )
            .unwrap();
        let imp = world.spawn("imp", ActorInfo::new()).unwrap();

        assert_eq!(world.platform_top(raft), Some(35.0));
        assert_eq!(world.platform_top(imp), None);
    }

    #[test]
    fn team_checks() {
        let mut world = ActorWorld::new();
        let a = world.spawn("a", ActorInfo::new().with_team(1)).unwrap();
        let b = world.spawn("b", ActorInfo::new().with_team(1)).unwrap();
        let c = world.spawn("c", ActorInfo::new().with_team(2)).unwrap();

        assert!(world.same_team(a, b));
        assert!(!world.same_team(a, c));
    }

    #[test]
    fn despawn_removes_name_and_entity() {
        let mut world = ActorWorld::new();
        let imp = world.spawn("imp", ActorInfo::new()).unwrap();
        world.despawn(imp).unwrap();

        assert!(!world.contains(imp));
        assert_eq!(world.lookup("imp"), None);
        assert!(world.despawn(imp).is_err());
    }

    #[test]
    fn hidden_flag_toggles() {
        let mut world = ActorWorld::new();
        let imp = world.spawn("imp", ActorInfo::new()).unwrap();
        assert!(!world.is_hidden(imp));
        world.set_hidden(imp, true).unwrap();
        assert!(world.is_hidden(imp));
        world.set_hidden(imp, false).unwrap();
        assert!(!world.is_hidden(imp));
    }
}
