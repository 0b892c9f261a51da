//! Pipeline thread supervision.
//!
//! The whole pipeline runs on one dedicated OS thread that owns the
//! tracker, ledger handle, and gallery — the single-writer discipline the
//! presence state machine requires. The stop flag is observed at frame
//! boundaries; a blocked read is only interrupted by the feed itself
//! ending.

use anyhow::anyhow;
use roster_core::{FramePipeline, FrameSource, PipelineReport, RecognitionEngine};
use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;

/// Clone-safe handle used to request a pipeline stop.
#[derive(Clone)]
pub struct StopHandle(Arc<AtomicBool>);

impl StopHandle {
    pub fn request_stop(&self) {
        self.0.store(true, Ordering::Relaxed);
    }
}

/// Owns the pipeline thread.
pub struct PipelineRunner {
    stop: Arc<AtomicBool>,
    handle: JoinHandle<PipelineReport>,
}

/// Spawn the pipeline on a named thread.
pub fn spawn<S, E>(pipeline: FramePipeline<S, E>) -> io::Result<PipelineRunner>
where
    S: FrameSource + Send + 'static,
    E: RecognitionEngine<Frame = S::Frame> + Send + 'static,
{
    let stop = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&stop);
    let handle = std::thread::Builder::new()
        .name("roster-pipeline".into())
        .spawn(move || {
            tracing::info!("pipeline thread started");
            let report = pipeline.run(&flag);
            tracing::info!("pipeline thread exiting");
            report
        })?;

    Ok(PipelineRunner { stop, handle })
}

impl PipelineRunner {
    pub fn stop_handle(&self) -> StopHandle {
        StopHandle(Arc::clone(&self.stop))
    }

    /// Wait for the pipeline to finish and return its run report.
    pub fn join(self) -> anyhow::Result<PipelineReport> {
        self.handle
            .join()
            .map_err(|_| anyhow!("pipeline thread panicked"))
    }
}
