//! Detection feed: the in-tree capture backend.
//!
//! Consumes the output of an external recognition engine process as
//! newline-delimited JSON, one line per frame:
//!
//! ```text
//! {"detections":[{"bbox":{"x":12.0,"y":8.0,"width":96.0,"height":96.0,"confidence":0.93},"descriptor":[0.01,-0.12,...]}]}
//! ```
//!
//! The source hands each raw line to the pipeline as an opaque frame; the
//! paired engine decodes it. A malformed line is a per-frame detection
//! error (skipped, loop continues); an I/O failure is unrecoverable; EOF is
//! a clean end of stream.

use roster_core::{
    AccuracyMode, AcquisitionError, Detection, DetectionError, FrameSource, RecognitionEngine,
};
use serde::Deserialize;
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;

/// One undecoded feed line.
pub struct FeedFrame {
    pub sequence: u64,
    pub line: String,
}

/// Reads feed lines from a file or stdin.
pub struct DetectionFeed<R> {
    reader: R,
    sequence: u64,
}

impl<R: BufRead> DetectionFeed<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            sequence: 0,
        }
    }
}

impl DetectionFeed<Box<dyn BufRead + Send>> {
    /// Open the feed at `path`; "-" means stdin.
    pub fn open(path: &Path) -> io::Result<Self> {
        let reader: Box<dyn BufRead + Send> = if path == Path::new("-") {
            Box::new(BufReader::new(io::stdin()))
        } else {
            Box::new(BufReader::new(File::open(path)?))
        };
        Ok(Self::new(reader))
    }
}

impl<R: BufRead> FrameSource for DetectionFeed<R> {
    type Frame = FeedFrame;

    fn next_frame(&mut self) -> Result<Option<FeedFrame>, AcquisitionError> {
        let mut line = String::new();
        loop {
            line.clear();
            let read = self
                .reader
                .read_line(&mut line)
                .map_err(|e| AcquisitionError::Unrecoverable(e.to_string()))?;
            if read == 0 {
                return Ok(None);
            }
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            self.sequence += 1;
            return Ok(Some(FeedFrame {
                sequence: self.sequence,
                line: trimmed.to_string(),
            }));
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct FeedRecord {
    #[serde(default)]
    detections: Vec<Detection>,
}

/// Decodes feed lines. The accuracy mode is accepted for contract parity
/// but has no effect here: the feed replays already-encoded output.
pub struct FeedEngine;

impl RecognitionEngine for FeedEngine {
    type Frame = FeedFrame;

    fn detect_and_encode(
        &mut self,
        frame: &FeedFrame,
        _mode: AccuracyMode,
    ) -> Result<Vec<Detection>, DetectionError> {
        let record: FeedRecord = serde_json::from_str(&frame.line)
            .map_err(|e| DetectionError::new(format!("feed frame {}: {e}", frame.sequence)))?;
        Ok(record.detections)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    const GOOD_LINE: &str = r#"{"detections":[{"bbox":{"x":1.0,"y":2.0,"width":10.0,"height":10.0,"confidence":0.9},"descriptor":[0.5,0.5]}]}"#;

    #[test]
    fn test_reads_lines_as_frames_and_skips_blanks() {
        let input = format!("{GOOD_LINE}\n\n{GOOD_LINE}\n");
        let mut feed = DetectionFeed::new(Cursor::new(input));

        let first = feed.next_frame().unwrap().unwrap();
        let second = feed.next_frame().unwrap().unwrap();
        assert_eq!(first.sequence, 1);
        assert_eq!(second.sequence, 2);
        assert!(feed.next_frame().unwrap().is_none());
    }

    #[test]
    fn test_engine_decodes_detections() {
        let frame = FeedFrame {
            sequence: 1,
            line: GOOD_LINE.to_string(),
        };
        let detections = FeedEngine
            .detect_and_encode(&frame, AccuracyMode::Fast)
            .unwrap();

        assert_eq!(detections.len(), 1);
        assert_eq!(detections[0].descriptor.values(), &[0.5, 0.5]);
        assert_eq!(detections[0].bbox.confidence, 0.9);
    }

    #[test]
    fn test_engine_treats_empty_object_as_no_detections() {
        let frame = FeedFrame {
            sequence: 1,
            line: "{}".to_string(),
        };
        let detections = FeedEngine
            .detect_and_encode(&frame, AccuracyMode::Fast)
            .unwrap();
        assert!(detections.is_empty());
    }

    #[test]
    fn test_malformed_line_is_a_detection_error() {
        let frame = FeedFrame {
            sequence: 3,
            line: "{broken".to_string(),
        };
        let err = FeedEngine
            .detect_and_encode(&frame, AccuracyMode::Fast)
            .unwrap_err();
        assert!(err.to_string().contains("feed frame 3"));
    }
}
