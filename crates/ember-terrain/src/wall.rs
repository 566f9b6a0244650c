//! Wall queries: bitfield tests and collision normals over the tile grid

use ember_core::Vec3;

use crate::mesh::{tile_fx, TerrainMesh};

/// Result of a positive wall collision query
#[derive(Clone, Copy, Debug)]
pub struct WallHit {
    /// The flag bits actually hit, masked by the caller's bits
    pub bits: u8,
    /// Horizontal push-out direction, unit length or zero when the
    /// tile contributions cancel
    pub normal: Vec3,
    /// How much of the query footprint overlaps blocked tiles
    pub pressure: f32,
}

struct ScanRect {
    fx_min: f32,
    fx_max: f32,
    fy_min: f32,
    fy_max: f32,
    ix_min: i64,
    ix_max: i64,
    iy_min: i64,
    iy_max: i64,
}

impl TerrainMesh {
    fn scan_rect(&self, pos: Vec3, radius: f32) -> ScanRect {
        let r = radius.abs();
        let (fx_min, fx_max) = (pos.x - r, pos.x + r);
        let (fy_min, fy_max) = (pos.y - r, pos.y + r);
        ScanRect {
            fx_min,
            fx_max,
            fy_min,
            fy_max,
            ix_min: (fx_min / self.tile_size).floor() as i64,
            ix_max: (fx_max / self.tile_size).floor() as i64,
            iy_min: (fy_min / self.tile_size).floor() as i64,
            iy_max: (fy_max / self.tile_size).floor() as i64,
        }
    }

    /// Test whether any tile under the query square carries one of
    /// `bits`. Off-mesh area counts as IMPASS plus WALL.
    pub fn test_wall(&self, pos: Vec3, radius: f32, bits: u8) -> bool {
        if bits == 0 {
            return false;
        }
        let rect = self.scan_rect(pos, radius);
        let mut pass = 0u8;

        if rect.iy_min < 0 || rect.iy_max >= self.tiles_y as i64 {
            pass |= tile_fx::IMPASS | tile_fx::WALL;
            if pass & bits != 0 {
                return true;
            }
        }
        if rect.ix_min < 0 || rect.ix_max >= self.tiles_x as i64 {
            pass |= tile_fx::IMPASS | tile_fx::WALL;
            if pass & bits != 0 {
                return true;
            }
        }

        let ix_min = rect.ix_min.max(0);
        let ix_max = rect.ix_max.min(self.tiles_x as i64 - 1);
        let iy_min = rect.iy_min.max(0);
        let iy_max = rect.iy_max.min(self.tiles_y as i64 - 1);

        for iy in iy_min..=iy_max {
            for ix in ix_min..=ix_max {
                pass |= self.fx[(iy as u32 * self.tiles_x + ix as u32) as usize];
                if pass & bits != 0 {
                    return true;
                }
            }
        }

        pass & bits != 0
    }

    /// Like `test_wall`, but on a hit also reports the flags struck, a
    /// horizontal push-out normal, and an overlap pressure.
    ///
    /// The normal sums `pos - tile_center` over every blocking tile,
    /// then snaps to the axis when only one axis contributes.
    pub fn hit_wall(&self, pos: Vec3, radius: f32, bits: u8) -> Option<WallHit> {
        if !self.test_wall(pos, radius, bits) {
            return None;
        }

        let rect = self.scan_rect(pos, radius);
        let mut pass = 0u8;
        let mut nrm = Vec3::ZERO;

        for iy in rect.iy_min..=rect.iy_max {
            let ty_mid = (iy as f32 + 0.5) * self.tile_size;
            let mut invalid = false;

            if iy < 0 || iy >= self.tiles_y as i64 {
                pass |= tile_fx::IMPASS | tile_fx::WALL;
                nrm.y += pos.y - ty_mid;
                invalid = true;
            }

            for ix in rect.ix_min..=rect.ix_max {
                let tx_mid = (ix as f32 + 0.5) * self.tile_size;

                if ix < 0 || ix >= self.tiles_x as i64 {
                    pass |= tile_fx::IMPASS | tile_fx::WALL;
                    nrm.x += pos.x - tx_mid;
                    invalid = true;
                }

                if !invalid {
                    let fx = self.fx[(iy as u32 * self.tiles_x + ix as u32) as usize];
                    if fx & bits != 0 {
                        pass |= fx;
                        nrm.x += pos.x - tx_mid;
                        nrm.y += pos.y - ty_mid;
                    }
                }
            }
        }

        let hit = pass & bits;
        if hit == 0 {
            return None;
        }

        // single-axis pushes snap to the axis; balanced contributions
        // leave a zero normal but still report pressure
        if nrm.x != 0.0 || nrm.y != 0.0 {
            if nrm.x == 0.0 {
                nrm.y = nrm.y.signum();
            } else if nrm.y == 0.0 {
                nrm.x = nrm.x.signum();
            } else {
                let dist = (nrm.x * nrm.x + nrm.y * nrm.y).sqrt();
                nrm.x /= dist;
                nrm.y /= dist;
            }
        }

        Some(WallHit {
            bits: hit,
            normal: nrm,
            pressure: self.wall_pressure(pos, radius, bits),
        })
    }

    /// Fraction of the query footprint overlapping blocked tiles,
    /// summed per tile against the smaller of tile and footprint area
    fn wall_pressure(&self, pos: Vec3, radius: f32, bits: u8) -> f32 {
        let tile_area = self.tile_size * self.tile_size;
        let r = radius.abs();
        let rect = self.scan_rect(pos, radius);
        let obj_area = (rect.fx_max - rect.fx_min) * (rect.fy_max - rect.fy_min);

        let mut pressure = 0.0;
        for iy in rect.iy_min..=rect.iy_max {
            let ty_min = iy as f32 * self.tile_size;
            let ty_max = ty_min + self.tile_size;

            for ix in rect.ix_min..=rect.ix_max {
                let tx_min = ix as f32 * self.tile_size;
                let tx_max = tx_min + self.tile_size;

                let in_bounds = ix >= 0
                    && iy >= 0
                    && ix < self.tiles_x as i64
                    && iy < self.tiles_y as i64;
                let blocked = if in_bounds {
                    self.fx[(iy as u32 * self.tiles_x + ix as u32) as usize] & bits != 0
                } else {
                    true
                };
                if !blocked {
                    continue;
                }

                if r == 0.0 {
                    pressure += 1.0;
                    continue;
                }

                let ovl_x = rect.fx_max.min(tx_max) - rect.fx_min.max(tx_min);
                let ovl_y = rect.fy_max.min(ty_max) - rect.fy_min.max(ty_min);
                if ovl_x <= 0.0 || ovl_y <= 0.0 {
                    continue;
                }

                let min_area = tile_area.min(obj_area);
                if min_area > 0.0 {
                    pressure += (ovl_x * ovl_y) / min_area;
                }
            }
        }

        pressure
    }
}
