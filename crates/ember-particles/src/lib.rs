//! Ember Particles - the particle simulation engine
//!
//! Ties the slot pool, template registry, terrain queries, and actor
//! world together into one engine: spawn requests go in, and each call
//! to `update_all` runs upkeep, force accumulation, and the bump pass
//! over every live particle. Rendering and audio stay outside; the
//! engine exposes the visible population and a queue of sound events.

pub mod collision;
pub mod coordinator;
pub mod engine;
pub mod environment;
pub mod instance;
pub mod lifecycle;
pub mod motion;
pub mod params;
pub mod spawn;

pub use engine::{EngineStats, ParticleEngine};
pub use instance::{EnvSnapshot, ForceAccumulator, ParticleInstance, PRT_TRANS};
pub use lifecycle::TickCtx;
pub use params::{SimParams, STANDARD_GRAVITY};
pub use spawn::{SoundEvent, SpawnRequest};

/// Handle to one live particle slot
pub type ParticleKey = ember_pool::SlotKey;
