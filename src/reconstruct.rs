//! Fuses a color raster and a pixel-aligned depth raster into a colored point set.

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::{
    error::{Error, Result},
    types::RasterImage,
};

pub const VIBRANCY_BOOST: f32 = 1.3;
pub const SATURATION_BOOST: f32 = 1.3;
pub const PALETTE_LEVELS: f32 = 8.0;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StylizationMode {
    /// Photographic point cloud with boosted colors.
    #[default]
    PointCloud,
    /// Depth snapped to integer terraces, colors posterized.
    Voxel,
}

impl StylizationMode {
    /// Voxel output stays on the full pixel grid whatever the density.
    fn samples(self) -> bool {
        matches!(self, StylizationMode::PointCloud)
    }

    fn depth(self, z: f32) -> f32 {
        match self {
            StylizationMode::PointCloud => z,
            StylizationMode::Voxel => z.round(),
        }
    }

    fn color(self, rgb: [f32; 3]) -> [f32; 3] {
        match self {
            StylizationMode::PointCloud => rgb.map(|c| (c * VIBRANCY_BOOST).clamp(0.0, 1.0)),
            StylizationMode::Voxel => saturate(posterize(rgb)),
        }
    }
}

/// Quantizes each channel to one of `{0/8, 1/8, ..., 7/8}`.
pub fn posterize(rgb: [f32; 3]) -> [f32; 3] {
    rgb.map(|c| (c * PALETTE_LEVELS).floor().clamp(0.0, PALETTE_LEVELS - 1.0) / PALETTE_LEVELS)
}

/// Pushes each channel away from the pixel luminance, then clamps.
pub fn saturate(rgb: [f32; 3]) -> [f32; 3] {
    let luma = 0.299 * rgb[0] + 0.587 * rgb[1] + 0.114 * rgb[2];
    rgb.map(|c| (luma + (c - luma) * SATURATION_BOOST).clamp(0.0, 1.0))
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ReconstructOptions {
    /// Fraction of pixels kept in point-cloud mode, clamped to `[0, 1]`.
    pub density: f32,
    pub mode: StylizationMode,
    /// Skip pixels whose normalised depth falls below this value.
    #[serde(default)]
    pub background_threshold: Option<f32>,
}

impl Default for ReconstructOptions {
    fn default() -> Self {
        Self {
            density: 1.0,
            mode: StylizationMode::PointCloud,
            background_threshold: None,
        }
    }
}

impl ReconstructOptions {
    pub fn effective_density(&self) -> f32 {
        if self.density.is_nan() {
            1.0
        } else {
            self.density.clamp(0.0, 1.0)
        }
    }
}

/// Flat, index-aligned position and color buffers.
#[derive(Clone, Debug, PartialEq)]
pub struct PointCloud {
    positions: Vec<f32>,
    colors: Vec<f32>,
    count: usize,
    width: u32,
    height: u32,
}

impl PointCloud {
    pub fn positions(&self) -> &[f32] {
        &self.positions
    }

    pub fn colors(&self) -> &[f32] {
        &self.colors
    }

    pub fn count(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn position(&self, i: usize) -> [f32; 3] {
        [
            self.positions[3 * i],
            self.positions[3 * i + 1],
            self.positions[3 * i + 2],
        ]
    }

    pub fn color(&self, i: usize) -> [f32; 3] {
        [self.colors[3 * i], self.colors[3 * i + 1], self.colors[3 * i + 2]]
    }

    /// Scale that fits the source raster into a unit-sized view.
    pub fn normalization_scale(&self) -> f32 {
        1.0 / self.width.max(self.height).max(1) as f32
    }

    /// Axis-aligned `(min, max)` over all points.
    pub fn bounds(&self) -> Option<([f32; 3], [f32; 3])> {
        if self.count == 0 {
            return None;
        }
        let mut min = [f32::MAX; 3];
        let mut max = [f32::MIN; 3];
        for p in self.positions.chunks_exact(3) {
            for axis in 0..3 {
                min[axis] = min[axis].min(p[axis]);
                max[axis] = max[axis].max(p[axis]);
            }
        }
        Some((min, max))
    }
}

pub fn reconstruct(
    color: &RasterImage,
    depth: &RasterImage,
    options: &ReconstructOptions,
) -> Result<PointCloud> {
    reconstruct_with_rng(color, depth, options, &mut rand::thread_rng())
}

/// Same as [`reconstruct`] with an injectable random source for the sampling gate.
pub fn reconstruct_with_rng<R: Rng>(
    color: &RasterImage,
    depth: &RasterImage,
    options: &ReconstructOptions,
    rng: &mut R,
) -> Result<PointCloud> {
    if color.dimensions() != depth.dimensions() {
        return Err(Error::DimensionMismatch {
            color: color.dimensions(),
            depth: depth.dimensions(),
        });
    }

    let (width, height) = color.dimensions();
    let density = options.effective_density();
    let mode = options.mode;
    let sampling = density < 1.0 && mode.samples();

    let cx = width as f32 / 2.0;
    let cy = height as f32 / 2.0;
    let depth_scale = width.max(height) as f32 * 0.5;

    let capacity = (width as usize) * (height as usize) * 3;
    let mut positions = Vec::with_capacity(capacity);
    let mut colors = Vec::with_capacity(capacity);
    let mut count = 0usize;

    let color_px = color.as_rgba().chunks_exact(4);
    let depth_px = depth.as_rgba().chunks_exact(4);
    for (i, (rgba, d)) in color_px.zip(depth_px).enumerate() {
        if sampling && rng.r#gen::<f32>() > density {
            continue;
        }

        let depth_norm = d[0] as f32 / 255.0;
        if let Some(threshold) = options.background_threshold {
            if depth_norm < threshold {
                continue;
            }
        }

        let x = (i % width as usize) as f32;
        let y = (i / width as usize) as f32;
        let z = mode.depth((depth_norm - 0.5) * depth_scale);
        positions.extend_from_slice(&[x - cx, -(y - cy), z]);

        let rgb = [
            rgba[0] as f32 / 255.0,
            rgba[1] as f32 / 255.0,
            rgba[2] as f32 / 255.0,
        ];
        colors.extend_from_slice(&mode.color(rgb));
        count += 1;
    }

    positions.shrink_to_fit();
    colors.shrink_to_fit();

    log::debug!(
        "reconstructed {count} points from {width}x{height} ({mode:?}, density {density:.2})"
    );

    Ok(PointCloud {
        positions,
        colors,
        count,
        width,
        height,
    })
}
