//! Ember Actor - the bodies particles target, damage, and ride
//!
//! A thin hecs-backed world of named actors. The simulation reads
//! positions, teams, and bump boxes from here, aims homing projectiles
//! at entities, and routes impact damage through `apply_damage`. Actor
//! movement itself is the host's job.

pub mod actor;
pub mod world;

pub use actor::{ActorInfo, Aim, DamageResist, Hidden, Platform, Position, Stature, Team, Velocity, Vitals};
pub use hecs::Entity;
pub use world::ActorWorld;
