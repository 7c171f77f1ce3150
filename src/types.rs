use std::time::Instant;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

pub const NUM_LANDMARKS: usize = 21;

pub const WRIST: usize = 0;
pub const THUMB_TIP: usize = 4;
pub const INDEX_TIP: usize = 8;
pub const MIDDLE_MCP: usize = 9;

/// A raw camera frame in RGBA8.
#[derive(Clone, Debug)]
pub struct Frame {
    pub rgba: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub timestamp: Instant,
}

/// Row-major RGBA8 raster. Grayscale sources are expanded to R=G=B.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RasterImage {
    width: u32,
    height: u32,
    rgba: Vec<u8>,
}

impl RasterImage {
    pub fn new(width: u32, height: u32, rgba: Vec<u8>) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(Error::InvalidImage { width, height });
        }
        let expected = (width as usize) * (height as usize) * 4;
        if rgba.len() != expected {
            return Err(Error::Decode(format!(
                "rgba buffer size mismatch: got {}, expected {expected}",
                rgba.len()
            )));
        }
        Ok(Self {
            width,
            height,
            rgba,
        })
    }

    pub fn from_gray(width: u32, height: u32, luma: &[u8]) -> Result<Self> {
        let expected = (width as usize) * (height as usize);
        if luma.len() != expected {
            return Err(Error::Decode(format!(
                "gray buffer size mismatch: got {}, expected {expected}",
                luma.len()
            )));
        }
        let rgba = luma.iter().flat_map(|&v| [v, v, v, 255]).collect();
        Self::new(width, height, rgba)
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn as_rgba(&self) -> &[u8] {
        &self.rgba
    }

    pub fn into_rgba(self) -> Vec<u8> {
        self.rgba
    }

    #[inline]
    pub fn pixel(&self, x: u32, y: u32) -> [u8; 4] {
        let idx = ((y as usize) * (self.width as usize) + x as usize) * 4;
        [
            self.rgba[idx],
            self.rgba[idx + 1],
            self.rgba[idx + 2],
            self.rgba[idx + 3],
        ]
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Handedness {
    Left,
    Right,
    Unknown,
}

impl Handedness {
    pub fn label(&self) -> &'static str {
        match self {
            Handedness::Left => "Left",
            Handedness::Right => "Right",
            Handedness::Unknown => "Unknown",
        }
    }

    /// Maps the handpose model's handedness output to a label.
    pub fn from_score(score: f32) -> Self {
        if score >= 0.5 {
            Handedness::Right
        } else if score > 0.0 {
            Handedness::Left
        } else {
            Handedness::Unknown
        }
    }
}

/// Landmark in normalised image coordinates (`x`, `y` in `[0, 1]`) plus relative depth.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Landmark {
    pub x: f32,
    pub y: f32,
    #[serde(default)]
    pub z: f32,
}

impl Landmark {
    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    pub fn distance(&self, other: &Landmark) -> f32 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        let dz = self.z - other.z;
        (dx * dx + dy * dy + dz * dz).sqrt()
    }

    pub fn mirrored(&self) -> Self {
        Self {
            x: 1.0 - self.x,
            ..*self
        }
    }
}

/// One detected hand for a single camera frame.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct HandSkeleton {
    pub landmarks: [Landmark; NUM_LANDMARKS],
    pub handedness: Handedness,
    #[serde(default = "default_confidence")]
    pub confidence: f32,
}

fn default_confidence() -> f32 {
    1.0
}

impl HandSkeleton {
    pub fn from_landmarks(
        landmarks: &[Landmark],
        handedness: Handedness,
        confidence: f32,
    ) -> Option<Self> {
        let landmarks: [Landmark; NUM_LANDMARKS] = landmarks.try_into().ok()?;
        Some(Self {
            landmarks,
            handedness,
            confidence,
        })
    }

    pub fn landmark(&self, idx: usize) -> &Landmark {
        &self.landmarks[idx]
    }

    pub fn mirrored(&self) -> Self {
        Self {
            landmarks: self.landmarks.map(|l| l.mirrored()),
            handedness: self.handedness,
            confidence: self.confidence,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gray_expands_to_rgba() {
        let img = RasterImage::from_gray(2, 1, &[10, 200]).unwrap();
        assert_eq!(img.as_rgba(), &[10, 10, 10, 255, 200, 200, 200, 255]);
        assert_eq!(img.pixel(1, 0), [200, 200, 200, 255]);
    }

    #[test]
    fn zero_sized_raster_is_invalid() {
        assert!(matches!(
            RasterImage::new(0, 4, Vec::new()),
            Err(Error::InvalidImage { width: 0, height: 4 })
        ));
    }

    #[test]
    fn handedness_from_model_score() {
        assert_eq!(Handedness::from_score(0.9), Handedness::Right);
        assert_eq!(Handedness::from_score(0.2), Handedness::Left);
        assert_eq!(Handedness::from_score(0.0), Handedness::Unknown);
    }

    #[test]
    fn skeleton_requires_all_landmarks() {
        let short = vec![Landmark::default(); 20];
        assert!(HandSkeleton::from_landmarks(&short, Handedness::Left, 1.0).is_none());
        let full = vec![Landmark::new(0.25, 0.5, 0.0); NUM_LANDMARKS];
        let hand = HandSkeleton::from_landmarks(&full, Handedness::Left, 1.0).unwrap();
        assert_eq!(hand.mirrored().landmark(WRIST).x, 0.75);
    }
}
