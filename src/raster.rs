//! Decoding and resampling of source and depth rasters.

use std::{io::Cursor, path::Path};

use base64::{Engine as _, engine::general_purpose::STANDARD};
use fast_image_resize as fir;

use crate::{
    error::{Error, Result},
    types::RasterImage,
};

/// Working resolution used when the caller does not pick one.
pub const DEFAULT_MAX_DIMENSION: u32 = 256;

#[derive(Clone, Debug)]
pub struct SamplerConfig {
    pub max_dimension: u32,
}

impl Default for SamplerConfig {
    fn default() -> Self {
        Self {
            max_dimension: DEFAULT_MAX_DIMENSION,
        }
    }
}

/// Decodes encoded image bytes or a base64 `data:` URI.
pub fn load(source: &[u8]) -> Result<RasterImage> {
    let decoded;
    let bytes = if source.starts_with(b"data:") {
        decoded = decode_data_uri(source)?;
        decoded.as_slice()
    } else {
        source
    };

    let rgba = image::load_from_memory(bytes)?.to_rgba8();
    let (width, height) = rgba.dimensions();
    RasterImage::new(width, height, rgba.into_raw())
}

pub fn load_path(path: &Path) -> Result<RasterImage> {
    let bytes = std::fs::read(path)?;
    load(&bytes)
}

fn decode_data_uri(uri: &[u8]) -> Result<Vec<u8>> {
    let comma = uri
        .iter()
        .position(|&b| b == b',')
        .ok_or_else(|| Error::Decode("data URI has no payload".into()))?;
    let header = &uri[..comma];
    if !header.ends_with(b";base64") {
        return Err(Error::Decode("only base64 data URIs are supported".into()));
    }
    let payload: Vec<u8> = uri[comma + 1..]
        .iter()
        .copied()
        .filter(|b| !b.is_ascii_whitespace())
        .collect();
    STANDARD
        .decode(payload)
        .map_err(|err| Error::Decode(format!("bad base64 payload: {err}")))
}

/// Scales the longer side to `max_dimension`, keeping the aspect ratio.
pub fn resize(image: &RasterImage, max_dimension: u32) -> Result<RasterImage> {
    let (width, height) = image.dimensions();
    if width == 0 || height == 0 || max_dimension == 0 {
        return Err(Error::InvalidImage { width, height });
    }

    let scale = max_dimension as f32 / width.max(height) as f32;
    let new_w = (width as f32 * scale).round().max(1.0) as u32;
    let new_h = (height as f32 * scale).round().max(1.0) as u32;
    resize_exact(image, new_w, new_h)
}

/// Resamples to an exact size, e.g. to pixel-align a depth map with its color source.
pub fn resize_exact(image: &RasterImage, width: u32, height: u32) -> Result<RasterImage> {
    if width == 0 || height == 0 {
        return Err(Error::InvalidImage { width, height });
    }
    if image.dimensions() == (width, height) {
        return Ok(image.clone());
    }

    let src_image = fir::images::Image::from_vec_u8(
        image.width(),
        image.height(),
        image.as_rgba().to_vec(),
        fir::PixelType::U8x4,
    )
    .map_err(|err| Error::Resize(err.to_string()))?;
    let mut dst_image = fir::images::Image::new(width, height, fir::PixelType::U8x4);
    let mut resizer = fir::Resizer::new();
    let resize_options = fir::ResizeOptions::new()
        .resize_alg(fir::ResizeAlg::Convolution(fir::FilterType::Lanczos3));
    resizer
        .resize(&src_image, &mut dst_image, Some(&resize_options))
        .map_err(|err| Error::Resize(err.to_string()))?;

    log::debug!(
        "resized raster {}x{} -> {width}x{height}",
        image.width(),
        image.height()
    );
    RasterImage::new(width, height, dst_image.into_vec())
}

pub fn encode_png(image: &RasterImage) -> Result<Vec<u8>> {
    let buffer = image::RgbaImage::from_raw(image.width(), image.height(), image.as_rgba().to_vec())
        .ok_or_else(|| Error::InvalidImage {
            width: image.width(),
            height: image.height(),
        })?;
    let mut out = Vec::new();
    image::DynamicImage::ImageRgba8(buffer)
        .write_to(&mut Cursor::new(&mut out), image::ImageFormat::Png)?;
    Ok(out)
}

pub fn to_data_uri(image: &RasterImage) -> Result<String> {
    let png = encode_png(image)?;
    Ok(format!("data:image/png;base64,{}", STANDARD.encode(png)))
}
