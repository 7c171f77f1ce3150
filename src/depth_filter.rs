//! Tone mapping for the on-screen depth preview.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::{error::Result, types::RasterImage};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DepthFilter {
    pub contrast: f32,
    pub intensity: f32,
    pub colorize: bool,
}

impl Default for DepthFilter {
    fn default() -> Self {
        Self {
            contrast: 1.0,
            intensity: 1.0,
            colorize: false,
        }
    }
}

impl DepthFilter {
    #[inline]
    pub fn tone(&self, v: u8) -> f32 {
        (((v as f32 - 128.0) * self.contrast + 128.0) * self.intensity).clamp(0.0, 255.0)
    }

    pub fn apply(&self, depth: &RasterImage) -> Result<RasterImage> {
        let mut rgba = depth.as_rgba().to_vec();
        rgba.par_chunks_mut(4).for_each(|px| {
            let v = self.tone(px[0]);
            let rgb = if self.colorize {
                heatmap(v / 255.0)
            } else {
                let g = v.round() as u8;
                [g, g, g]
            };
            px[..3].copy_from_slice(&rgb);
        });
        RasterImage::new(depth.width(), depth.height(), rgba)
    }
}

pub fn colorize(
    depth: &RasterImage,
    contrast: f32,
    intensity: f32,
    colorize: bool,
) -> Result<RasterImage> {
    DepthFilter {
        contrast,
        intensity,
        colorize,
    }
    .apply(depth)
}

/// Black → purple → orange → yellow → white.
pub fn heatmap(t: f32) -> [u8; 3] {
    let t = t.clamp(0.0, 1.0);
    let (r, g, b) = if t < 0.33 {
        let u = t / 0.33;
        (100.0 * u, 0.0, 100.0 * u)
    } else if t < 0.66 {
        let u = (t - 0.33) / 0.33;
        (100.0 + 155.0 * u, 0.0, 100.0 * (1.0 - u))
    } else if t < 0.9 {
        let u = (t - 0.66) / 0.24;
        (255.0, 255.0 * u, 0.0)
    } else {
        let u = ((t - 0.9) / 0.1).min(1.0);
        (255.0, 255.0, 255.0 * u)
    };
    [to_u8(r), to_u8(g), to_u8(b)]
}

fn to_u8(v: f32) -> u8 {
    v.round().clamp(0.0, 255.0) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_settings_keep_gray() {
        let depth = RasterImage::from_gray(3, 1, &[0, 128, 255]).unwrap();
        let out = colorize(&depth, 1.0, 1.0, false).unwrap();
        assert_eq!(out, depth);
    }

    #[test]
    fn contrast_pivots_around_mid_gray() {
        let filter = DepthFilter {
            contrast: 2.0,
            intensity: 1.0,
            colorize: false,
        };
        assert_eq!(filter.tone(128), 128.0);
        assert_eq!(filter.tone(138), 148.0);
        assert_eq!(filter.tone(10), 0.0);
        assert_eq!(filter.tone(250), 255.0);
    }

    #[test]
    fn intensity_scales_after_contrast() {
        let filter = DepthFilter {
            contrast: 1.0,
            intensity: 0.5,
            colorize: false,
        };
        assert_eq!(filter.tone(200), 100.0);
    }

    #[test]
    fn heatmap_band_edges() {
        assert_eq!(heatmap(0.0), [0, 0, 0]);
        assert_eq!(heatmap(0.33), [100, 0, 100]);
        assert_eq!(heatmap(0.66), [255, 0, 0]);
        assert_eq!(heatmap(0.72), [255, 64, 0]);
        assert_eq!(heatmap(0.9), [255, 255, 0]);
        assert_eq!(heatmap(1.0), [255, 255, 255]);
    }

    #[test]
    fn colorize_preserves_alpha() {
        let depth = RasterImage::new(1, 1, vec![255, 255, 255, 40]).unwrap();
        let out = colorize(&depth, 1.0, 1.0, true).unwrap();
        assert_eq!(out.pixel(0, 0), [255, 255, 255, 40]);
    }
}
