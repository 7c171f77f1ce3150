use std::{
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
    thread,
    time::{Duration, Instant},
};

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, unbounded};

use crate::{
    error::Result,
    reconstruct::{self, PointCloud, ReconstructOptions},
    types::RasterImage,
};

#[derive(Clone, Debug)]
pub struct ReconstructJob {
    pub color: Arc<RasterImage>,
    pub depth: Arc<RasterImage>,
    pub options: ReconstructOptions,
}

struct Request {
    generation: u64,
    job: ReconstructJob,
}

struct Outcome {
    generation: u64,
    result: Result<Arc<PointCloud>>,
}

/// Rebuilds point clouds off the render thread. A newer request supersedes any
/// older one; results for superseded requests are never delivered.
pub struct ReconstructionWorker {
    request_tx: Option<Sender<Request>>,
    result_rx: Receiver<Outcome>,
    latest: Arc<AtomicU64>,
    handle: Option<thread::JoinHandle<()>>,
}

impl ReconstructionWorker {
    pub fn spawn() -> Self {
        let (request_tx, request_rx) = unbounded::<Request>();
        let (result_tx, result_rx) = unbounded::<Outcome>();
        let latest = Arc::new(AtomicU64::new(0));
        let latest_flag = latest.clone();

        let handle = thread::spawn(move || {
            while let Some(request) = recv_latest_request(&request_rx) {
                if request.generation < latest_flag.load(Ordering::SeqCst) {
                    continue;
                }

                let started = Instant::now();
                let job = &request.job;
                let result =
                    reconstruct::reconstruct(&job.color, &job.depth, &job.options).map(Arc::new);

                if request.generation < latest_flag.load(Ordering::SeqCst) {
                    log::debug!(
                        "discarding superseded reconstruction #{}",
                        request.generation
                    );
                    continue;
                }
                log::debug!(
                    "reconstruction #{} finished in {:?}",
                    request.generation,
                    started.elapsed()
                );

                let outcome = Outcome {
                    generation: request.generation,
                    result,
                };
                if result_tx.send(outcome).is_err() {
                    break;
                }
            }
        });

        Self {
            request_tx: Some(request_tx),
            result_rx,
            latest,
            handle: Some(handle),
        }
    }

    /// Queues a rebuild and returns its generation number.
    pub fn request(&self, job: ReconstructJob) -> u64 {
        let generation = self.latest.fetch_add(1, Ordering::SeqCst) + 1;
        if let Some(tx) = &self.request_tx {
            if tx.send(Request { generation, job }).is_err() {
                log::warn!("reconstruction worker gone, dropped request #{generation}");
            }
        }
        generation
    }

    pub fn latest_generation(&self) -> u64 {
        self.latest.load(Ordering::SeqCst)
    }

    /// Non-blocking poll for the result of the newest request.
    pub fn try_latest(&self) -> Option<Result<Arc<PointCloud>>> {
        let mut newest = None;
        while let Ok(outcome) = self.result_rx.try_recv() {
            if outcome.generation == self.latest_generation() {
                newest = Some(outcome.result);
            }
        }
        newest
    }

    /// Blocks up to `timeout` for the result of the newest request.
    pub fn wait_latest(&self, timeout: Duration) -> Option<Result<Arc<PointCloud>>> {
        let deadline = Instant::now() + timeout;
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match self.result_rx.recv_timeout(remaining) {
                Ok(outcome) if outcome.generation == self.latest_generation() => {
                    return Some(outcome.result);
                }
                Ok(_) => continue,
                Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => {
                    return None;
                }
            }
        }
    }
}

impl Drop for ReconstructionWorker {
    fn drop(&mut self) {
        self.request_tx.take();
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

fn recv_latest_request(request_rx: &Receiver<Request>) -> Option<Request> {
    let mut request = request_rx.recv().ok()?;
    while let Ok(newer) = request_rx.try_recv() {
        request = newer;
    }
    Some(request)
}
