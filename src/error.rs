use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid image dimensions {width}x{height}")]
    InvalidImage { width: u32, height: u32 },

    #[error("failed to decode image: {0}")]
    Decode(String),

    #[error(
        "color raster is {}x{} but depth raster is {}x{}",
        color.0, color.1, depth.0, depth.1
    )]
    DimensionMismatch { color: (u32, u32), depth: (u32, u32) },

    #[error("resize failed: {0}")]
    Resize(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed session record: {0}")]
    Session(String),
}

impl From<image::ImageError> for Error {
    fn from(err: image::ImageError) -> Self {
        Error::Decode(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
