//! Frame pipeline driver: acquire, detect, match, track, tick.
//!
//! One frame is fully processed before the next is pulled, and the whole
//! pipeline (tracker, ledger handle, gallery) is owned by a single caller,
//! so presence mutation is serialized by construction.

use crate::gallery::Gallery;
use crate::matcher::{MatchResult, Matcher};
use crate::ports::{AttendanceLedger, IdentityDirectory};
use crate::tracker::{Presence, PresenceTracker};
use crate::types::{AccuracyMode, Detection, IdentityId};
use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicBool, Ordering};
use thiserror::Error;

/// Consecutive acquisition failures after which the capture source is
/// treated as unrecoverable and the loop stops.
const MAX_CONSECUTIVE_READ_FAILURES: u32 = 30;

#[derive(Debug, Error)]
pub enum AcquisitionError {
    /// A single frame was lost; the loop keeps running.
    #[error("frame read failed: {0}")]
    ReadFailed(String),
    /// The capture source is gone; the loop stops.
    #[error("capture source failed: {0}")]
    Unrecoverable(String),
}

/// A single frame's detection/encoding pass failed; the frame is skipped.
#[derive(Debug, Error)]
#[error("detection failed: {0}")]
pub struct DetectionError(String);

impl DetectionError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// Source of frames to process. The frame type is opaque to the pipeline:
/// only the source and its paired engine interpret it.
pub trait FrameSource {
    type Frame;

    /// Pull the next frame. `Ok(None)` means the stream ended cleanly.
    fn next_frame(&mut self) -> Result<Option<Self::Frame>, AcquisitionError>;
}

/// The external detection+encoding capability: one frame in, zero or more
/// `(bounding box, descriptor)` pairs out.
pub trait RecognitionEngine {
    type Frame;

    fn detect_and_encode(
        &mut self,
        frame: &Self::Frame,
        mode: AccuracyMode,
    ) -> Result<Vec<Detection>, DetectionError>;
}

/// Time source for sighting and timeout decisions.
pub trait Clock {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time.
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Counters for one pipeline run, logged at shutdown.
#[derive(Debug, Default, Clone, Copy)]
pub struct PipelineReport {
    /// Frames acquired from the source.
    pub frames: u64,
    /// Acquired frames skipped because detection failed.
    pub frames_skipped: u64,
    /// Frames lost to recoverable acquisition errors.
    pub acquisition_failures: u64,
    /// Detections that resolved to a known identity.
    pub sightings: u64,
    /// Detections that resolved to no known identity.
    pub unmatched: u64,
    pub arrivals: u64,
    pub departures: u64,
}

/// Per-frame orchestration loop.
///
/// Owns every mutable collaborator, so running it on one thread gives the
/// single-writer discipline the presence tracker requires. Stopping (stream
/// end, unrecoverable source, or the stop flag) leaves open sessions open:
/// the ledger records "still present, observation stopped", not a
/// departure.
pub struct FramePipeline<S, E> {
    source: S,
    engine: E,
    gallery: Gallery,
    matcher: Box<dyn Matcher + Send>,
    tracker: PresenceTracker,
    ledger: Box<dyn AttendanceLedger + Send>,
    directory: Option<Box<dyn IdentityDirectory + Send>>,
    clock: Box<dyn Clock + Send>,
    accuracy_mode: AccuracyMode,
    report: PipelineReport,
}

impl<S, E> FramePipeline<S, E>
where
    S: FrameSource,
    E: RecognitionEngine<Frame = S::Frame>,
{
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        source: S,
        engine: E,
        gallery: Gallery,
        matcher: Box<dyn Matcher + Send>,
        tracker: PresenceTracker,
        ledger: Box<dyn AttendanceLedger + Send>,
        directory: Option<Box<dyn IdentityDirectory + Send>>,
        clock: Box<dyn Clock + Send>,
        accuracy_mode: AccuracyMode,
    ) -> Self {
        Self {
            source,
            engine,
            gallery,
            matcher,
            tracker,
            ledger,
            directory,
            clock,
            accuracy_mode,
            report: PipelineReport::default(),
        }
    }

    /// Run until the source ends, the source fails unrecoverably, or `stop`
    /// is set. The stop flag is observed at frame boundaries.
    pub fn run(mut self, stop: &AtomicBool) -> PipelineReport {
        let mut consecutive_read_failures = 0u32;

        loop {
            if stop.load(Ordering::Relaxed) {
                tracing::info!("stop requested; open sessions are left open");
                break;
            }

            match self.source.next_frame() {
                Ok(Some(frame)) => {
                    consecutive_read_failures = 0;
                    self.process_frame(&frame);
                }
                Ok(None) => {
                    tracing::info!("capture source exhausted; open sessions are left open");
                    break;
                }
                Err(AcquisitionError::ReadFailed(reason)) => {
                    consecutive_read_failures += 1;
                    self.report.acquisition_failures += 1;
                    tracing::warn!(reason = %reason, "frame acquisition failed");
                    if consecutive_read_failures >= MAX_CONSECUTIVE_READ_FAILURES {
                        tracing::error!(
                            failures = consecutive_read_failures,
                            "capture source looks unrecoverable; stopping"
                        );
                        break;
                    }
                    // A lost frame still advances the timeout clock.
                    let now = self.clock.now();
                    self.sweep_departures(now);
                }
                Err(AcquisitionError::Unrecoverable(reason)) => {
                    self.report.acquisition_failures += 1;
                    tracing::error!(reason = %reason, "capture source failed; stopping");
                    break;
                }
            }
        }

        self.report
    }

    /// Detect, resolve, and track one frame, then tick exactly once.
    fn process_frame(&mut self, frame: &S::Frame) {
        self.report.frames += 1;
        let now = self.clock.now();

        match self.engine.detect_and_encode(frame, self.accuracy_mode) {
            Ok(detections) => {
                for detection in &detections {
                    self.resolve_detection(detection, now);
                }
            }
            Err(error) => {
                self.report.frames_skipped += 1;
                tracing::warn!(error = %error, "detection failed; skipping frame");
            }
        }

        self.sweep_departures(now);
    }

    fn resolve_detection(&mut self, detection: &Detection, now: DateTime<Utc>) {
        match self.matcher.resolve(&self.gallery, &detection.descriptor) {
            MatchResult::Matched { identity, distance } => {
                self.report.sightings += 1;
                match self.tracker.on_seen(&mut *self.ledger, identity, now) {
                    Ok(Presence::Arrived) => {
                        self.report.arrivals += 1;
                        self.announce_arrival(identity, distance);
                    }
                    Ok(Presence::Refreshed) => {}
                    Err(error) => {
                        tracing::warn!(
                            identity = %identity,
                            error = %error,
                            "ledger open failed; presence kept, open will be retried"
                        );
                    }
                }
            }
            MatchResult::Unmatched => {
                self.report.unmatched += 1;
                tracing::debug!(
                    confidence = detection.bbox.confidence,
                    "unmatched detection"
                );
            }
        }
    }

    /// Presentation only: a directory miss or failure never affects tracking.
    fn announce_arrival(&self, identity: IdentityId, distance: f32) {
        let info = self
            .directory
            .as_ref()
            .and_then(|directory| directory.lookup(identity));
        match info {
            Some(info) => tracing::info!(
                identity = %identity,
                name = %info.name,
                department = %info.department,
                authorized = info.is_authorized(),
                distance,
                "identity arrived"
            ),
            None => tracing::info!(identity = %identity, distance, "identity arrived"),
        }
    }

    fn sweep_departures(&mut self, now: DateTime<Utc>) {
        for departure in self.tracker.on_tick(&mut *self.ledger, now) {
            self.report.departures += 1;
            match departure.ledger_error {
                Some(error) => tracing::warn!(
                    identity = %departure.identity,
                    error = %error,
                    "ledger close failed; session may remain open in the ledger"
                ),
                None => tracing::info!(identity = %departure.identity, "identity departed"),
            }
        }
    }
}
