#[cfg(feature = "handpose-ort")]
mod common;
#[cfg(feature = "handpose-ort")]
mod ort;

use std::{
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    time::Duration,
};

use crossbeam_channel::{Receiver, select};

#[cfg(feature = "handpose-ort")]
pub use self::ort::{RecognizerBackend, start_recognizer};
use super::signal::SignalPublisher;
use crate::{
    gesture::{GestureSignal, GestureTracker},
    types::{Frame, HandSkeleton},
};

const STOP_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Hand landmark inference for one camera frame.
pub trait HandposeEngine: Send + 'static {
    fn infer(&mut self, frame: &Frame) -> anyhow::Result<Vec<HandSkeleton>>;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TrackerCommand {
    Reset,
    SetExploding(bool),
}

impl TrackerCommand {
    pub fn apply(self, tracker: &mut GestureTracker) -> GestureSignal {
        match self {
            TrackerCommand::Reset => tracker.reset(),
            TrackerCommand::SetExploding(held) => tracker.set_exploding(held),
        }
    }
}

/// Runs inference on the newest frame, steps the tracker and publishes the signal.
/// Returns once `stop` is raised or either input channel closes.
pub fn run_worker_loop<E: HandposeEngine>(
    mut engine: E,
    frame_rx: Receiver<Frame>,
    command_rx: Receiver<TrackerCommand>,
    mut tracker: GestureTracker,
    publisher: SignalPublisher,
    stop: Arc<AtomicBool>,
) {
    publisher.publish(tracker.signal());

    while !stop.load(Ordering::SeqCst) {
        select! {
            recv(command_rx) -> command => {
                let Ok(command) = command else { break };
                publisher.publish(command.apply(&mut tracker));
            }
            recv(frame_rx) -> frame => {
                let Ok(mut frame) = frame else { break };
                while let Ok(newer) = frame_rx.try_recv() {
                    frame = newer;
                }
                if stop.load(Ordering::SeqCst) {
                    break;
                }

                let hands = engine.infer(&frame).unwrap_or_else(|err| {
                    log::warn!("handpose inference failed: {err:?}");
                    Vec::new()
                });
                if stop.load(Ordering::SeqCst) {
                    break;
                }
                publisher.publish(tracker.update(&hands));
            }
            default(STOP_POLL_INTERVAL) => {}
        }
    }

    publisher.publish(tracker.update(&[]));
    log::info!("gesture worker stopped");
}
