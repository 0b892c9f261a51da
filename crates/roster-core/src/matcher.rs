//! Nearest-neighbor identity resolution over the gallery.

use crate::gallery::Gallery;
use crate::types::{Descriptor, IdentityId};

/// Result of resolving a probe descriptor against the gallery.
#[derive(Debug, Clone, PartialEq)]
pub enum MatchResult {
    Matched { identity: IdentityId, distance: f32 },
    Unmatched,
}

/// Strategy for resolving a probe descriptor to a gallery identity.
pub trait Matcher {
    fn resolve(&self, gallery: &Gallery, probe: &Descriptor) -> MatchResult;
}

/// Euclidean nearest-neighbor matcher with a strict distance threshold.
///
/// Always iterates every gallery entry. On a distance tie the entry seen
/// first in gallery order wins, so results are deterministic and stable.
#[derive(Debug, Clone, Copy)]
pub struct DistanceMatcher {
    threshold: f32,
}

impl DistanceMatcher {
    /// Default acceptance threshold. Lower is stricter.
    pub const DEFAULT_THRESHOLD: f32 = 0.45;

    pub fn new(threshold: f32) -> Self {
        Self { threshold }
    }

    pub fn threshold(&self) -> f32 {
        self.threshold
    }
}

impl Default for DistanceMatcher {
    fn default() -> Self {
        Self::new(Self::DEFAULT_THRESHOLD)
    }
}

impl Matcher for DistanceMatcher {
    fn resolve(&self, gallery: &Gallery, probe: &Descriptor) -> MatchResult {
        let mut best: Option<(usize, f32)> = None;

        for (index, entry) in gallery.entries().iter().enumerate() {
            let distance = probe.euclidean_distance(&entry.descriptor);
            let better = match best {
                None => true,
                // Strict < keeps the earliest entry on a tie.
                Some((_, best_distance)) => distance < best_distance,
            };
            if better {
                best = Some((index, distance));
            }
        }

        match best {
            Some((index, distance)) if distance < self.threshold => MatchResult::Matched {
                identity: gallery.entries()[index].identity,
                distance,
            },
            _ => MatchResult::Unmatched,
        }
    }
}
