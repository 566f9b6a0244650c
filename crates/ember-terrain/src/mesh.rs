//! Tile-grid terrain: vertex heights, per-tile flags, and floor queries

use ember_core::Vec3;

use crate::heightmap::Heightmap;
use crate::twist::{twist_from_corner_heights, TwistTable, TWIST_FLAT};

/// Per-tile behavior flags, ORed into one bitfield per tile
pub mod tile_fx {
    /// Water surface covers this tile
    pub const WATER: u8 = 1 << 3;
    /// Wall: blocks anything that tests against it
    pub const WALL: u8 = 1 << 4;
    /// Impassable to everything, walls included
    pub const IMPASS: u8 = 1 << 5;
    /// Touching the floor here causes damage
    pub const DAMAGE: u8 = 1 << 6;
    /// Icy: reduced traction
    pub const SLIPPY: u8 = 1 << 7;
}

/// Positions get clamped this far inside the mesh edges
const EDGE_MARGIN: f32 = 2.0;

/// World-wide water state. Tiles flagged WATER interact with objects
/// below the surface once `is_water` is set; lava-style modules leave
/// it unset so nothing swims.
#[derive(Clone, Copy, Debug)]
pub struct Water {
    pub is_water: bool,
    pub surface_level: f32,
}

impl Default for Water {
    fn default() -> Self {
        Self {
            is_water: false,
            surface_level: 0.0,
        }
    }
}

/// Settings for building a mesh from a heightmap
pub struct MeshConfig {
    /// World units per tile edge
    pub tile_size: f32,
    /// Heightmap value 1.0 maps to this height
    pub height_scale: f32,
}

impl Default for MeshConfig {
    fn default() -> Self {
        Self {
            tile_size: 128.0,
            height_scale: 256.0,
        }
    }
}

/// A rectangular grid of tiles with a vertex height field.
///
/// Heights live on the (tiles_x + 1) by (tiles_y + 1) vertex grid and
/// are sampled bilinearly. Each tile carries a flag bitfield and a
/// slope twist code derived from its corner heights.
pub struct TerrainMesh {
    pub(crate) tiles_x: u32,
    pub(crate) tiles_y: u32,
    pub(crate) tile_size: f32,
    /// Row-major, (tiles_x + 1) * (tiles_y + 1) entries
    vertex_z: Vec<f32>,
    pub(crate) fx: Vec<u8>,
    twist: Vec<u8>,
    table: TwistTable,
    pub water: Water,
}

impl TerrainMesh {
    /// A level mesh at the given height with no flags set
    pub fn flat(tiles_x: u32, tiles_y: u32, level: f32) -> Self {
        let tiles_x = tiles_x.max(1);
        let tiles_y = tiles_y.max(1);
        let vert_count = ((tiles_x + 1) * (tiles_y + 1)) as usize;
        let tile_count = (tiles_x * tiles_y) as usize;
        Self {
            tiles_x,
            tiles_y,
            tile_size: 128.0,
            vertex_z: vec![level; vert_count],
            fx: vec![0; tile_count],
            twist: vec![TWIST_FLAT; tile_count],
            table: TwistTable::new(),
            water: Water::default(),
        }
    }

    /// Build a mesh with one tile per heightmap quad. Vertex heights
    /// come straight from the pixels, scaled by `height_scale`.
    pub fn from_heightmap(hm: &Heightmap, config: &MeshConfig) -> Self {
        let tiles_x = hm.width - 1;
        let tiles_y = hm.depth - 1;
        let mut mesh = Self::flat(tiles_x, tiles_y, 0.0);
        mesh.tile_size = config.tile_size;

        for iy in 0..=tiles_y {
            for ix in 0..=tiles_x {
                let u = ix as f32 / tiles_x as f32;
                let v = iy as f32 / tiles_y as f32;
                let z = hm.sample(u, v) * config.height_scale;
                mesh.vertex_z[(iy * (tiles_x + 1) + ix) as usize] = z;
            }
        }

        mesh.recompute_twist();
        mesh
    }

    pub fn tiles_x(&self) -> u32 {
        self.tiles_x
    }

    pub fn tiles_y(&self) -> u32 {
        self.tiles_y
    }

    pub fn tile_size(&self) -> f32 {
        self.tile_size
    }

    /// World-space extent along x
    pub fn edge_x(&self) -> f32 {
        self.tiles_x as f32 * self.tile_size
    }

    /// World-space extent along y
    pub fn edge_y(&self) -> f32 {
        self.tiles_y as f32 * self.tile_size
    }

    pub fn in_bounds(&self, x: f32, y: f32) -> bool {
        x >= 0.0 && x < self.edge_x() && y >= 0.0 && y < self.edge_y()
    }

    /// Clamp a point just inside the mesh edges, leaving z alone
    pub fn clamp_point(&self, p: Vec3) -> Vec3 {
        Vec3::new(
            p.x.clamp(0.0, self.edge_x() - EDGE_MARGIN),
            p.y.clamp(0.0, self.edge_y() - EDGE_MARGIN),
            p.z,
        )
    }

    fn tile_at(&self, x: f32, y: f32) -> Option<usize> {
        let ix = (x / self.tile_size).floor() as i64;
        let iy = (y / self.tile_size).floor() as i64;
        if ix < 0 || iy < 0 || ix >= self.tiles_x as i64 || iy >= self.tiles_y as i64 {
            return None;
        }
        Some((iy as u32 * self.tiles_x + ix as u32) as usize)
    }

    /// Flag bits of the tile under (x, y). Off-mesh positions answer
    /// as solid so nothing escapes the grid.
    pub fn tile_fx(&self, x: f32, y: f32) -> u8 {
        match self.tile_at(x, y) {
            Some(i) => self.fx[i],
            None => tile_fx::IMPASS | tile_fx::WALL,
        }
    }

    pub fn tile_has_flag(&self, x: f32, y: f32, bits: u8) -> bool {
        self.tile_fx(x, y) & bits != 0
    }

    /// OR flags onto one tile, by tile coordinates
    pub fn add_fx(&mut self, tx: u32, ty: u32, bits: u8) {
        if tx < self.tiles_x && ty < self.tiles_y {
            self.fx[(ty * self.tiles_x + tx) as usize] |= bits;
        }
    }

    /// OR flags onto every tile on the outer ring
    pub fn add_fx_border(&mut self, bits: u8) {
        for ty in 0..self.tiles_y {
            for tx in 0..self.tiles_x {
                if tx == 0 || ty == 0 || tx == self.tiles_x - 1 || ty == self.tiles_y - 1 {
                    self.fx[(ty * self.tiles_x + tx) as usize] |= bits;
                }
            }
        }
    }

    /// Set one vertex height. Call `recompute_twist` after editing.
    pub fn set_vertex_z(&mut self, ix: u32, iy: u32, z: f32) {
        if ix <= self.tiles_x && iy <= self.tiles_y {
            self.vertex_z[(iy * (self.tiles_x + 1) + ix) as usize] = z;
        }
    }

    fn vertex(&self, ix: u32, iy: u32) -> f32 {
        self.vertex_z[(iy * (self.tiles_x + 1) + ix) as usize]
    }

    /// Rebuild every tile's twist code from its corner heights
    pub fn recompute_twist(&mut self) {
        for ty in 0..self.tiles_y {
            for tx in 0..self.tiles_x {
                let z0 = self.vertex(tx, ty);
                let z1 = self.vertex(tx + 1, ty);
                let z2 = self.vertex(tx + 1, ty + 1);
                let z3 = self.vertex(tx, ty + 1);
                self.twist[(ty * self.tiles_x + tx) as usize] =
                    twist_from_corner_heights(z0, z1, z2, z3);
            }
        }
    }

    /// Bilinear floor height under (x, y). Queries outside the mesh
    /// are clamped to the nearest edge.
    pub fn floor_level(&self, x: f32, y: f32) -> f32 {
        let fx = (x / self.tile_size).clamp(0.0, self.tiles_x as f32);
        let fy = (y / self.tile_size).clamp(0.0, self.tiles_y as f32);

        let ix = (fx as u32).min(self.tiles_x - 1);
        let iy = (fy as u32).min(self.tiles_y - 1);
        let tx = fx - ix as f32;
        let ty = fy - iy as f32;

        let z00 = self.vertex(ix, iy);
        let z10 = self.vertex(ix + 1, iy);
        let z01 = self.vertex(ix, iy + 1);
        let z11 = self.vertex(ix + 1, iy + 1);

        let z0 = z00 * (1.0 - tx) + z10 * tx;
        let z1 = z01 * (1.0 - tx) + z11 * tx;

        z0 * (1.0 - ty) + z1 * ty
    }

    /// Slope code of the tile under (x, y); off-mesh reads as level
    pub fn tile_twist(&self, x: f32, y: f32) -> u8 {
        match self.tile_at(x, y) {
            Some(i) => self.twist[i],
            None => TWIST_FLAT,
        }
    }

    /// Surface normal for a twist code
    pub fn twist_normal(&self, twist: u8) -> Vec3 {
        self.table.normal(twist)
    }

    /// Whether a twist code counts as level ground
    pub fn twist_is_flat(&self, twist: u8) -> bool {
        self.table.is_flat(twist)
    }
}
