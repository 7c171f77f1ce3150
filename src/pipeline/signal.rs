use crossbeam_channel::{Receiver, Sender, TrySendError, bounded};
use serde::{Deserialize, Serialize};

use crate::gesture::GestureSignal;

/// Message forwarded to an embedded scene: `{"type":"gesture","data":{...}}`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "lowercase")]
pub enum SceneMessage {
    Gesture(GestureSignal),
}

impl SceneMessage {
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

pub fn signal_channel(capacity: usize) -> (SignalPublisher, SignalReader) {
    let (tx, rx) = bounded(capacity.max(1));
    (
        SignalPublisher {
            tx,
            evict_rx: rx.clone(),
        },
        SignalReader {
            rx,
            latest: GestureSignal::default(),
        },
    )
}

/// Producer side; never blocks the capture loop.
#[derive(Clone)]
pub struct SignalPublisher {
    tx: Sender<GestureSignal>,
    evict_rx: Receiver<GestureSignal>,
}

impl SignalPublisher {
    pub fn publish(&self, signal: GestureSignal) {
        let mut pending = signal;
        loop {
            match self.tx.try_send(pending) {
                Ok(()) => return,
                Err(TrySendError::Full(back)) => {
                    // Drop the oldest queued signal to make room for the newest.
                    let _ = self.evict_rx.try_recv();
                    pending = back;
                }
                Err(TrySendError::Disconnected(_)) => return,
            }
        }
    }
}

/// Consumer side for the render loop.
pub struct SignalReader {
    rx: Receiver<GestureSignal>,
    latest: GestureSignal,
}

impl SignalReader {
    /// Most recently published signal, or the last one seen when nothing new arrived.
    pub fn latest(&mut self) -> GestureSignal {
        while let Ok(signal) = self.rx.try_recv() {
            self.latest = signal;
        }
        self.latest
    }
}
