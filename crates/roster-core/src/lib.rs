//! roster-core — Identity matching and attendance session tracking.
//!
//! Turns noisy per-frame recognition output into de-duplicated attendance
//! sessions: a gallery of known descriptors, a nearest-neighbor matcher,
//! and a presence state machine that opens and closes ledger sessions
//! around a sighting timeout. Detection and encoding are consumed through
//! the [`pipeline::RecognitionEngine`] capability; persistence goes through
//! the [`ports`] traits.

pub mod gallery;
pub mod matcher;
pub mod pipeline;
pub mod ports;
pub mod tracker;
pub mod types;

pub use gallery::{Gallery, GalleryEntry, GalleryError};
pub use matcher::{DistanceMatcher, MatchResult, Matcher};
pub use pipeline::{
    AcquisitionError, Clock, DetectionError, FramePipeline, FrameSource, PipelineReport,
    RecognitionEngine, SystemClock,
};
pub use ports::{
    AttendanceLedger, IdentityDirectory, IdentityInfo, LedgerError, SessionHandle,
};
pub use tracker::{Departure, Presence, PresenceTracker};
pub use types::{AccuracyMode, BoundingBox, Descriptor, Detection, IdentityId};
