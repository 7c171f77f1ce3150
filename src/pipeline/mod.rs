#[cfg(feature = "camera-nokhwa")]
pub mod camera;
pub mod device;
pub mod reconstruct_worker;
pub mod recognizer;
pub mod signal;
pub mod tracking;

// Re-exports for convenience
#[cfg(feature = "camera-nokhwa")]
pub use camera::{CameraDevice, available_cameras, start_camera_stream};
pub use reconstruct_worker::{ReconstructJob, ReconstructionWorker};
pub use recognizer::{HandposeEngine, TrackerCommand, run_worker_loop};
pub use signal::{SceneMessage, SignalPublisher, SignalReader, signal_channel};
pub use tracking::{CommandKeys, TrackingAvailability, TrackingSession, start_tracking};
