//! Spawn requests and deferred engine output events

use ember_actor::Entity;
use ember_core::{Facing, Vec3};
use ember_pool::SlotKey;
use ember_template::TemplateId;

/// Everything the engine needs to bring one particle to life.
///
/// Requests are cheap to build and are also queued internally for
/// continuous and end spawns, so child particles go through exactly the
/// same path as host spawns.
#[derive(Debug, Clone)]
pub struct SpawnRequest {
    pub template: TemplateId,
    pub pos: Vec3,
    pub facing: Facing,
    /// Actor credited with the particle's damage
    pub owner: Option<Entity>,
    /// Homing and aiming reference
    pub target: Option<Entity>,
    /// Holder the particle rides on; attached particles skip free motion
    pub attached_to: Option<Entity>,
    /// Lift above the holder's position while attached
    pub zoff: f32,
    /// Particle that spawned this one, kept for one hop of attribution
    pub parent: Option<SlotKey>,
    pub team: u8,
    /// Index within a multi-particle burst; only the first carries the
    /// template's dynamic light
    pub multispawn: u32,
}

impl SpawnRequest {
    pub fn new(template: TemplateId, pos: Vec3) -> Self {
        Self {
            template,
            pos,
            facing: Facing::ZERO,
            owner: None,
            target: None,
            attached_to: None,
            zoff: 0.0,
            parent: None,
            team: 0,
            multispawn: 0,
        }
    }

    pub fn facing(mut self, facing: Facing) -> Self {
        self.facing = facing;
        self
    }

    pub fn owner(mut self, owner: Entity) -> Self {
        self.owner = Some(owner);
        self
    }

    pub fn target(mut self, target: Entity) -> Self {
        self.target = Some(target);
        self
    }

    pub fn attached_to(mut self, holder: Entity) -> Self {
        self.attached_to = Some(holder);
        self
    }

    pub fn zoff(mut self, zoff: f32) -> Self {
        self.zoff = zoff;
        self
    }

    pub fn parent(mut self, parent: SlotKey) -> Self {
        self.parent = Some(parent);
        self
    }

    pub fn team(mut self, team: u8) -> Self {
        self.team = team;
        self
    }

    pub fn multispawn(mut self, index: u32) -> Self {
        self.multispawn = index;
        self
    }
}

/// A sound cue the host should play. The engine only queues these;
/// `ParticleEngine::drain_sounds` hands them over once per frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SoundEvent {
    /// Template-local sound index
    pub sound: u32,
    pub pos: Vec3,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_fills_fields() {
        let req = SpawnRequest::new(TemplateId::from_raw(3), Vec3::new(1.0, 2.0, 3.0))
            .facing(Facing::new(0x4000))
            .team(2)
            .multispawn(4);

        assert_eq!(req.pos.y, 2.0);
        assert_eq!(req.facing.raw(), 0x4000);
        assert_eq!(req.team, 2);
        assert_eq!(req.multispawn, 4);
        assert!(req.owner.is_none());
        assert!(req.attached_to.is_none());
    }
}
