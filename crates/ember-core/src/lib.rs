//! Ember Core - Foundational types for the Ember particle engine
//!
//! This crate provides the types every other Ember crate depends on:
//! - `Vec3` - Spatial math (z is up)
//! - `Facing` - 16-bit turn-unit heading
//! - `GameRng`, `RandPair` - Seeded randomness and base+spread ranges
//! - `DamageKind` - Damage classification
//! - Error types and Result alias

mod damage;
mod error;
mod facing;
mod rand;
mod types;

pub use damage::DamageKind;
pub use error::{EmberError, Result};
pub use facing::Facing;
pub use rand::{GameRng, RandPair};
pub use types::Vec3;
