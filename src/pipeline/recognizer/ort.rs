use std::{
    path::{Path, PathBuf},
    sync::{Arc, atomic::AtomicBool},
    thread,
};

use anyhow::{Context, Result, anyhow};
use crossbeam_channel::Receiver;
use ort::session::{Session, builder::GraphOptimizationLevel};
use ort::value::Tensor;

use super::{HandposeEngine, TrackerCommand, common, run_worker_loop};
use crate::{
    gesture::GestureTracker,
    model_download::{default_handpose_model_path, ensure_handpose_model_ready},
    pipeline::signal::SignalPublisher,
    types::{Frame, HandSkeleton},
};

#[derive(Clone, Debug)]
pub struct RecognizerBackend {
    model_path: PathBuf,
}

impl RecognizerBackend {
    pub fn new(model_path: PathBuf) -> Self {
        Self { model_path }
    }

    pub fn model_path(&self) -> &Path {
        &self.model_path
    }

    pub fn label(&self) -> &'static str {
        "ort"
    }
}

impl Default for RecognizerBackend {
    fn default() -> Self {
        Self {
            model_path: default_handpose_model_path(),
        }
    }
}

/// Loads the model up front so a missing or broken model is reported before
/// the worker thread starts.
pub fn start_recognizer(
    backend: RecognizerBackend,
    frame_rx: Receiver<Frame>,
    command_rx: Receiver<TrackerCommand>,
    tracker: GestureTracker,
    publisher: SignalPublisher,
    stop: Arc<AtomicBool>,
) -> Result<thread::JoinHandle<()>> {
    log::info!("starting handpose backend: {}", backend.label());

    ensure_handpose_model_ready(backend.model_path(), |_evt| {}).with_context(|| {
        format!(
            "failed to prepare handpose model at {}",
            backend.model_path().display()
        )
    })?;
    let engine = OrtEngine::new(backend.model_path())?;
    log::info!(
        "handpose ORT backend ready using {}",
        backend.model_path().display()
    );

    Ok(thread::spawn(move || {
        run_worker_loop(engine, frame_rx, command_rx, tracker, publisher, stop);
    }))
}

/// Full-frame estimator without palm detection, so it reports at most one
/// hand per frame and rotate and zoom never run at the same time.
struct OrtEngine {
    session: Session,
}

impl OrtEngine {
    fn new(model_path: &Path) -> Result<Self> {
        let session = Session::builder()?
            .with_optimization_level(GraphOptimizationLevel::Level3)?
            .with_intra_threads(2)?
            .commit_from_file(model_path)
            .with_context(|| format!("failed to load ORT session from {}", model_path.display()))?;

        Ok(Self { session })
    }
}

impl HandposeEngine for OrtEngine {
    fn infer(&mut self, frame: &Frame) -> Result<Vec<HandSkeleton>> {
        let (input, letterbox) = common::prepare_frame(frame)?;
        let tensor = Tensor::from_array(input)?;
        let outputs = self
            .session
            .run(ort::inputs![tensor])
            .context("failed to run ORT session")?;

        if outputs.len() < 1 {
            return Err(anyhow!("model returned no outputs"));
        }

        let coords = outputs[0].try_extract_array::<f32>()?;
        let flattened: Vec<f32> = coords.iter().copied().collect();
        let landmarks = common::decode_landmarks(&flattened)?;

        let scalar_output = |idx: usize| {
            if outputs.len() > idx {
                outputs[idx]
                    .try_extract_array::<f32>()
                    .ok()
                    .and_then(|arr| arr.iter().next().copied())
                    .unwrap_or(0.0)
            } else {
                0.0
            }
        };
        let confidence = scalar_output(1).clamp(0.0, 1.0);
        let handedness = scalar_output(2);

        let normalized = common::normalize_landmarks(&landmarks, &letterbox);
        Ok(common::to_skeleton(&normalized, confidence, handedness)
            .into_iter()
            .collect())
    }
}
