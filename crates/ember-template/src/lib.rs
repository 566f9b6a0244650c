//! Ember Template - particle definitions loaded from flat TOML files
//!
//! A template file holds one particle definition as flat key/value
//! pairs, with `[base, spread]` arrays for randomized quantities. The
//! registry assigns dense ids in load order, resolves child-template
//! names, and binds the well-known `splash` and `ripple` effects.

pub mod registry;
pub mod template;

pub use registry::{TemplateId, TemplateRegistry};
pub use template::{ContSpawn, DynaLight, DynaMode, EndSpawn, ParticleTemplate, SpriteKind};
