//! Ember Terrain - tile-grid world queries for the simulation
//!
//! Provides heightmap loading, a tile mesh with per-tile flag bitfields
//! and slope twist codes, bilinear floor sampling, and the wall queries
//! the physics step collides against. Does not depend on any renderer;
//! everything here answers point and footprint queries.

pub mod heightmap;
pub mod mesh;
pub mod twist;
pub mod wall;

pub use heightmap::Heightmap;
pub use mesh::{tile_fx, MeshConfig, TerrainMesh, Water};
pub use twist::{twist_from_corner_heights, twist_from_slopes, TwistTable, TWIST_FLAT};
pub use wall::WallHit;
