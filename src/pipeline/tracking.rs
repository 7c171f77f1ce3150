use std::{
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    thread,
};

use crossbeam_channel::Sender;

use super::{recognizer::TrackerCommand, signal::SignalPublisher};
use crate::gesture::TrackerConfig;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TrackingAvailability {
    Available,
    Unavailable(String),
}

impl TrackingAvailability {
    pub fn is_available(&self) -> bool {
        matches!(self, TrackingAvailability::Available)
    }
}

/// Maps typed lines to tracker commands: `e` toggles the explode trigger,
/// `r` restores the baseline zoom.
#[derive(Clone, Debug, Default)]
pub struct CommandKeys {
    exploding: bool,
}

impl CommandKeys {
    pub fn map(&mut self, line: &str) -> Option<TrackerCommand> {
        match line.trim() {
            "e" | "explode" => {
                self.exploding = !self.exploding;
                Some(TrackerCommand::SetExploding(self.exploding))
            }
            "r" | "reset" => Some(TrackerCommand::Reset),
            _ => None,
        }
    }
}

/// Live capture plus inference threads. Dropping the session stops both.
pub struct TrackingSession {
    stop: Arc<AtomicBool>,
    command_tx: Sender<TrackerCommand>,
    threads: Vec<thread::JoinHandle<()>>,
}

impl TrackingSession {
    pub fn send(&self, command: TrackerCommand) {
        if self.command_tx.send(command).is_err() {
            log::debug!("tracking worker gone, dropped {command:?}");
        }
    }

    /// Extra handle for command sources living on other threads.
    pub fn commands(&self) -> Sender<TrackerCommand> {
        self.command_tx.clone()
    }

    pub fn reset(&self) {
        self.send(TrackerCommand::Reset);
    }

    pub fn set_exploding(&self, held: bool) {
        self.send(TrackerCommand::SetExploding(held));
    }

    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        self.stop.store(true, Ordering::SeqCst);
        for handle in self.threads.drain(..) {
            let _ = handle.join();
        }
    }
}

impl Drop for TrackingSession {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Starts camera capture and hand tracking. Failures are reported through
/// [`TrackingAvailability::Unavailable`] rather than as errors.
#[cfg(all(feature = "camera-nokhwa", feature = "handpose-ort"))]
pub fn start_tracking(
    camera_index: u32,
    config: TrackerConfig,
    publisher: SignalPublisher,
) -> (TrackingAvailability, Option<TrackingSession>) {
    use crossbeam_channel::{bounded, unbounded};

    use super::{
        camera::start_camera_stream,
        recognizer::{RecognizerBackend, start_recognizer},
    };
    use crate::gesture::GestureTracker;

    let stop = Arc::new(AtomicBool::new(false));
    let (frame_tx, frame_rx) = bounded(1);
    let (command_tx, command_rx) = unbounded();

    let camera = match start_camera_stream(camera_index, frame_tx, stop.clone()) {
        Ok(handle) => handle,
        Err(err) => {
            log::error!("camera {camera_index} unavailable: {err:?}");
            return (TrackingAvailability::Unavailable(format!("{err:#}")), None);
        }
    };

    let recognizer = match start_recognizer(
        RecognizerBackend::default(),
        frame_rx,
        command_rx,
        GestureTracker::new(config),
        publisher,
        stop.clone(),
    ) {
        Ok(handle) => handle,
        Err(err) => {
            log::error!("hand tracking unavailable: {err:?}");
            stop.store(true, Ordering::SeqCst);
            let _ = camera.join();
            return (TrackingAvailability::Unavailable(format!("{err:#}")), None);
        }
    };

    let session = TrackingSession {
        stop,
        command_tx,
        threads: vec![camera, recognizer],
    };
    (TrackingAvailability::Available, Some(session))
}

#[cfg(not(all(feature = "camera-nokhwa", feature = "handpose-ort")))]
pub fn start_tracking(
    camera_index: u32,
    config: TrackerConfig,
    publisher: SignalPublisher,
) -> (TrackingAvailability, Option<TrackingSession>) {
    let _ = (config, publisher);
    log::warn!("camera {camera_index} requested but live tracking is not compiled in");
    (
        TrackingAvailability::Unavailable("built without live support".to_string()),
        None,
    )
}
