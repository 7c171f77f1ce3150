//! Turns a color image plus a depth map into a stylised point cloud, and drives
//! the view with hand gestures tracked from a webcam.

pub mod depth_filter;
pub mod error;
pub mod gesture;
#[cfg(feature = "handpose-ort")]
pub mod model_download;
pub mod pipeline;
pub mod raster;
pub mod reconstruct;
pub mod session;
pub mod types;
pub mod view;

pub use error::{Error, Result};
pub use gesture::{GestureSignal, GestureTracker, TrackerConfig};
pub use reconstruct::{PointCloud, ReconstructOptions, StylizationMode};
pub use types::{HandSkeleton, RasterImage};
