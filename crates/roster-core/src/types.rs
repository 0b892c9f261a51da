use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Identifier of a known individual, owned by the external identity store.
///
/// The core references identities but never mutates them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct IdentityId(pub i64);

impl fmt::Display for IdentityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Fixed-length face descriptor produced by an external encoding engine.
///
/// Immutable once produced; many descriptors may map to the same identity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Descriptor {
    values: Vec<f32>,
}

impl Descriptor {
    pub fn new(values: Vec<f32>) -> Self {
        Self { values }
    }

    pub fn values(&self) -> &[f32] {
        &self.values
    }

    /// Number of dimensions in the descriptor.
    pub fn dim(&self) -> usize {
        self.values.len()
    }

    /// Compute Euclidean distance between two descriptors.
    pub fn euclidean_distance(&self, other: &Descriptor) -> f32 {
        self.values
            .iter()
            .zip(other.values.iter())
            .map(|(a, b)| (a - b).powi(2))
            .sum::<f32>()
            .sqrt()
    }
}

/// Bounding box for a detected face in frame coordinates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub confidence: f32,
}

/// One detection produced by the recognition engine for a frame: where the
/// face was and what it encodes to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    pub bbox: BoundingBox,
    pub descriptor: Descriptor,
}

/// Detector quality/latency trade-off requested from the recognition engine.
///
/// Both modes are equivalent in contract; they differ only in call cost and
/// false-negative rate.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccuracyMode {
    #[default]
    Fast,
    Accurate,
}

#[derive(Debug, Error)]
#[error("unknown accuracy mode {0:?} (expected \"fast\" or \"accurate\")")]
pub struct ParseAccuracyModeError(String);

impl FromStr for AccuracyMode {
    type Err = ParseAccuracyModeError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "fast" => Ok(Self::Fast),
            "accurate" => Ok(Self::Accurate),
            other => Err(ParseAccuracyModeError(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_euclidean_distance_identical() {
        let a = Descriptor::new(vec![1.0, 2.0, 3.0]);
        let b = Descriptor::new(vec![1.0, 2.0, 3.0]);
        assert!(a.euclidean_distance(&b).abs() < 1e-6);
    }

    #[test]
    fn test_euclidean_distance_unit_apart() {
        let a = Descriptor::new(vec![0.0, 0.0]);
        let b = Descriptor::new(vec![1.0, 0.0]);
        assert!((a.euclidean_distance(&b) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_euclidean_distance_symmetric() {
        let a = Descriptor::new(vec![0.5, -0.5, 2.0]);
        let b = Descriptor::new(vec![-1.0, 0.25, 0.0]);
        assert_eq!(a.euclidean_distance(&b), b.euclidean_distance(&a));
    }

    #[test]
    fn test_accuracy_mode_parse() {
        assert_eq!("fast".parse::<AccuracyMode>().unwrap(), AccuracyMode::Fast);
        assert_eq!(
            " Accurate ".parse::<AccuracyMode>().unwrap(),
            AccuracyMode::Accurate
        );
        assert!("cnn".parse::<AccuracyMode>().is_err());
    }

    #[test]
    fn test_descriptor_serializes_as_bare_array() {
        let d = Descriptor::new(vec![0.25, -1.0]);
        let json = serde_json::to_string(&d).unwrap();
        assert_eq!(json, "[0.25,-1.0]");
        let back: Descriptor = serde_json::from_str(&json).unwrap();
        assert_eq!(back, d);
    }
}
