use std::{
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    thread,
    time::{Duration, Instant},
};

use anyhow::Result;
use crossbeam_channel::Sender;
use nokhwa::{
    Camera,
    pixel_format::RgbFormat,
    query,
    utils::{ApiBackend, CameraIndex, RequestedFormat, RequestedFormatType},
};

use super::device::spawn_opened;
use crate::types::Frame;

// Hand tracking does not need the full sensor rate.
const TRACKING_TARGET_FPS: u64 = 15;
const TRACKING_FRAME_INTERVAL: Duration = Duration::from_millis(1_000 / TRACKING_TARGET_FPS);

#[derive(Clone, Debug)]
pub struct CameraDevice {
    pub index: u32,
    pub label: String,
}

pub fn available_cameras() -> Result<Vec<CameraDevice>> {
    let cameras = query(ApiBackend::Auto)?;
    Ok(cameras
        .into_iter()
        .enumerate()
        .map(|(position, info)| CameraDevice {
            index: info.index().as_index().unwrap_or(position as u32),
            label: info.human_name(),
        })
        .collect())
}

fn build_camera(index: u32) -> Result<Camera> {
    let requested = RequestedFormat::new::<RgbFormat>(RequestedFormatType::None);
    let mut camera = Camera::new(CameraIndex::Index(index), requested)?;
    camera.open_stream()?;
    Ok(camera)
}

/// Opens the camera and streams RGBA frames until `stop` is raised.
/// Returns an error when the device cannot be opened; frames are dropped
/// whenever the consumer is still busy.
pub fn start_camera_stream(
    index: u32,
    frame_tx: Sender<Frame>,
    stop: Arc<AtomicBool>,
) -> Result<thread::JoinHandle<()>> {
    spawn_opened(
        "camera",
        move || build_camera(index),
        move |camera| capture_loop(camera, index, frame_tx, stop),
    )
}

fn capture_loop(mut camera: Camera, index: u32, frame_tx: Sender<Frame>, stop: Arc<AtomicBool>) {
    let mut last_sent = Instant::now() - TRACKING_FRAME_INTERVAL;

    while !stop.load(Ordering::Relaxed) {
        let frame = match camera.frame() {
            Ok(frame) => frame,
            Err(err) => {
                log::warn!("camera frame read failed: {err:?}");
                continue;
            }
        };
        if last_sent.elapsed() < TRACKING_FRAME_INTERVAL {
            continue;
        }

        let decoded = match frame.decode_image::<RgbFormat>() {
            Ok(img) => img,
            Err(err) => {
                log::warn!("failed to decode camera frame: {err:?}");
                continue;
            }
        };

        let (width, height) = decoded.dimensions();
        let rgb = decoded.into_raw();
        if rgb.is_empty() {
            continue;
        }

        let mut rgba = Vec::with_capacity(rgb.len() / 3 * 4);
        for chunk in rgb.chunks_exact(3) {
            rgba.extend_from_slice(&[chunk[0], chunk[1], chunk[2], 255]);
        }

        last_sent = Instant::now();
        let _ = frame_tx.try_send(Frame {
            rgba,
            width,
            height,
            timestamp: last_sent,
        });
    }

    if let Err(err) = camera.stop_stream() {
        log::warn!("failed to stop camera stream: {err:?}");
    }
    log::info!("camera {index} released");
}
