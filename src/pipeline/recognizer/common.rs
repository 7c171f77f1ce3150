use anyhow::{Context, Result, anyhow};
use fast_image_resize as fir;
use ndarray::Array4;
use rayon::prelude::*;

use crate::types::{Frame, HandSkeleton, Handedness, Landmark, NUM_LANDMARKS};

pub const INPUT_SIZE: u32 = 224;
pub const MIN_HAND_CONFIDENCE: f32 = 0.2;

#[derive(Clone, Debug)]
pub struct LetterboxInfo {
    pub scale: f32,
    pub pad_x: f32,
    pub pad_y: f32,
    pub orig_w: u32,
    pub orig_h: u32,
}

/// Letterboxes the frame into a square model input in NHWC `[0, 1]` floats.
pub fn prepare_frame(frame: &Frame) -> Result<(Array4<f32>, LetterboxInfo)> {
    let expected_len = (frame.width as usize)
        .saturating_mul(frame.height as usize)
        .saturating_mul(4);
    if frame.rgba.len() != expected_len {
        return Err(anyhow!(
            "frame buffer size mismatch: got {}, expected {}",
            frame.rgba.len(),
            expected_len
        ));
    }

    let scale = INPUT_SIZE as f32 / (frame.width.max(frame.height) as f32);
    let new_w = ((frame.width as f32 * scale).round() as u32).clamp(1, INPUT_SIZE);
    let new_h = ((frame.height as f32 * scale).round() as u32).clamp(1, INPUT_SIZE);

    let src_image = fir::images::Image::from_vec_u8(
        frame.width,
        frame.height,
        frame.rgba.clone(),
        fir::PixelType::U8x4,
    )?;
    let mut dst_image = fir::images::Image::new(new_w, new_h, fir::PixelType::U8x4);
    let resize_options = fir::ResizeOptions::new()
        .resize_alg(fir::ResizeAlg::Interpolation(fir::FilterType::Bilinear));
    fir::Resizer::new()
        .resize(&src_image, &mut dst_image, Some(&resize_options))
        .context("fast resize failed")?;
    let resized = dst_image.into_vec();

    let pad_x = ((INPUT_SIZE - new_w) / 2) as usize;
    let pad_y = ((INPUT_SIZE - new_h) / 2) as usize;
    let side = INPUT_SIZE as usize;
    let mut canvas = vec![0u8; side * side * 4];
    let src_stride = new_w as usize * 4;
    for row in 0..(new_h as usize) {
        let dst_offset = ((pad_y + row) * side + pad_x) * 4;
        canvas[dst_offset..dst_offset + src_stride]
            .copy_from_slice(&resized[row * src_stride..(row + 1) * src_stride]);
    }

    let normalized: Vec<f32> = canvas
        .par_chunks_exact(4)
        .flat_map_iter(|px| {
            [
                px[0] as f32 / 255.0,
                px[1] as f32 / 255.0,
                px[2] as f32 / 255.0,
            ]
        })
        .collect();
    let input = Array4::<f32>::from_shape_vec((1, side, side, 3), normalized)
        .map_err(|err| anyhow!("failed to build input tensor: {err}"))?;

    let letterbox = LetterboxInfo {
        scale,
        pad_x: pad_x as f32,
        pad_y: pad_y as f32,
        orig_w: frame.width,
        orig_h: frame.height,
    };

    Ok((input, letterbox))
}

pub fn decode_landmarks(flat: &[f32]) -> Result<Vec<[f32; 3]>> {
    if flat.len() < NUM_LANDMARKS * 3 {
        return Err(anyhow!(
            "unexpected landmarks length: got {}, need {}",
            flat.len(),
            NUM_LANDMARKS * 3
        ));
    }

    Ok(flat
        .chunks_exact(3)
        .take(NUM_LANDMARKS)
        .map(|c| [c[0], c[1], c[2]])
        .collect())
}

/// Maps model-space landmarks back to normalised frame coordinates.
pub fn normalize_landmarks(landmarks: &[[f32; 3]], letterbox: &LetterboxInfo) -> Vec<Landmark> {
    let max_x = letterbox.orig_w.saturating_sub(1).max(1) as f32;
    let max_y = letterbox.orig_h.saturating_sub(1).max(1) as f32;
    landmarks
        .iter()
        .map(|[x, y, z]| {
            let px = ((x - letterbox.pad_x) / letterbox.scale).clamp(0.0, max_x);
            let py = ((y - letterbox.pad_y) / letterbox.scale).clamp(0.0, max_y);
            Landmark::new(px / max_x, py / max_y, z / INPUT_SIZE as f32)
        })
        .collect()
}

pub fn to_skeleton(
    landmarks: &[Landmark],
    confidence: f32,
    handedness_score: f32,
) -> Option<HandSkeleton> {
    if confidence < MIN_HAND_CONFIDENCE {
        return None;
    }
    HandSkeleton::from_landmarks(
        landmarks,
        Handedness::from_score(handedness_score),
        confidence,
    )
}
