//! Heightmap loading and sampling

use std::path::Path;

use ember_core::{EmberError, Result};

/// A grayscale heightmap with bilinear sampling
pub struct Heightmap {
    /// Row-major height values normalized to [0..1]
    heights: Vec<f32>,
    /// Width in pixels
    pub width: u32,
    /// Depth in pixels
    pub depth: u32,
}

impl Heightmap {
    /// Load a heightmap from a grayscale PNG file.
    /// Values are normalized to [0..1] regardless of bit depth.
    pub fn from_png(path: &Path) -> Result<Self> {
        let img = image::open(path).map_err(|e| {
            EmberError::HeightmapError(format!(
                "Failed to load heightmap '{}': {}",
                path.display(),
                e
            ))
        })?;

        let gray = img.into_luma16();
        let width = gray.width();
        let depth = gray.height();

        if width < 2 || depth < 2 {
            return Err(EmberError::HeightmapError(format!(
                "Heightmap '{}' must be at least 2x2 pixels, got {}x{}",
                path.display(),
                width,
                depth
            )));
        }

        let heights: Vec<f32> = gray.pixels().map(|p| p.0[0] as f32 / 65535.0).collect();

        Ok(Self {
            heights,
            width,
            depth,
        })
    }

    /// Create a heightmap from raw float data (for testing)
    pub fn from_raw(heights: Vec<f32>, width: u32, depth: u32) -> Self {
        assert_eq!(heights.len(), (width * depth) as usize);
        Self {
            heights,
            width,
            depth,
        }
    }

    /// Bilinear sample at normalized UV coordinates (0..1, 0..1).
    /// Returns interpolated height in [0..1].
    pub fn sample(&self, u: f32, v: f32) -> f32 {
        let u = u.clamp(0.0, 1.0);
        let v = v.clamp(0.0, 1.0);

        let fx = u * (self.width - 1) as f32;
        let fy = v * (self.depth - 1) as f32;

        let x0 = (fx as u32).min(self.width - 2);
        let y0 = (fy as u32).min(self.depth - 2);
        let x1 = x0 + 1;
        let y1 = y0 + 1;

        let tx = fx - x0 as f32;
        let ty = fy - y0 as f32;

        let h00 = self.get(x0, y0);
        let h10 = self.get(x1, y0);
        let h01 = self.get(x0, y1);
        let h11 = self.get(x1, y1);

        let h0 = h00 * (1.0 - tx) + h10 * tx;
        let h1 = h01 * (1.0 - tx) + h11 * tx;

        h0 * (1.0 - ty) + h1 * ty
    }

    fn get(&self, x: u32, y: u32) -> f32 {
        self.heights[(y * self.width + x) as usize]
    }
}
