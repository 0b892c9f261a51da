//! Gallery of known identity descriptors.
//!
//! Built once at startup from persisted descriptors; immutable afterwards.
//! Augmentation returns a new view, it never mutates in place.

use crate::types::{Descriptor, IdentityId};
use std::collections::HashSet;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum GalleryError {
    #[error("descriptor and identity counts differ: {descriptors} descriptors vs {identities} identities")]
    LengthMismatch {
        descriptors: usize,
        identities: usize,
    },
    #[error("descriptor {index} is empty")]
    EmptyDescriptor { index: usize },
    #[error("descriptor {index} has {got} dimensions, expected {expected}")]
    DimensionMismatch {
        index: usize,
        expected: usize,
        got: usize,
    },
}

/// One gallery entry: a descriptor and the identity it belongs to.
#[derive(Debug, Clone)]
pub struct GalleryEntry {
    pub descriptor: Descriptor,
    pub identity: IdentityId,
}

/// Collection of known descriptors paired with identity labels.
///
/// An empty gallery is valid but useless: every probe goes unmatched.
#[derive(Debug, Clone, Default)]
pub struct Gallery {
    entries: Vec<GalleryEntry>,
}

impl Gallery {
    /// Build a gallery from parallel descriptor and identity sequences.
    ///
    /// The sequences must have equal lengths and every descriptor must be
    /// non-empty with a consistent dimension.
    pub fn load(
        descriptors: Vec<Descriptor>,
        identities: Vec<IdentityId>,
    ) -> Result<Self, GalleryError> {
        if descriptors.len() != identities.len() {
            return Err(GalleryError::LengthMismatch {
                descriptors: descriptors.len(),
                identities: identities.len(),
            });
        }

        let expected = descriptors.first().map(Descriptor::dim).unwrap_or(0);
        for (index, descriptor) in descriptors.iter().enumerate() {
            if descriptor.dim() == 0 {
                return Err(GalleryError::EmptyDescriptor { index });
            }
            if descriptor.dim() != expected {
                return Err(GalleryError::DimensionMismatch {
                    index,
                    expected,
                    got: descriptor.dim(),
                });
            }
        }

        let entries = descriptors
            .into_iter()
            .zip(identities)
            .map(|(descriptor, identity)| GalleryEntry {
                descriptor,
                identity,
            })
            .collect();

        Ok(Self { entries })
    }

    /// Gallery with no known identities.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> &[GalleryEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of distinct identities represented in the gallery.
    pub fn identity_count(&self) -> usize {
        self.entries
            .iter()
            .map(|entry| entry.identity)
            .collect::<HashSet<_>>()
            .len()
    }

    /// Replicate every entry once per angle marker, each replica keeping its
    /// original identity.
    ///
    /// Replication does not perturb descriptor values; it only raises the
    /// density of identical entries per identity, which biases nearest-neighbor
    /// tie-breaking toward identities with more variants. A tuning knob, not a
    /// pose model. An empty marker set leaves the gallery unchanged.
    pub fn augmented(&self, angle_markers: &[i32]) -> Gallery {
        if angle_markers.is_empty() {
            return self.clone();
        }

        let mut entries = Vec::with_capacity(self.entries.len() * angle_markers.len());
        for entry in &self.entries {
            for _marker in angle_markers {
                entries.push(entry.clone());
            }
        }

        Gallery { entries }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn descriptor(values: &[f32]) -> Descriptor {
        Descriptor::new(values.to_vec())
    }

    #[test]
    fn test_load_pairs_descriptors_with_identities() {
        let gallery = Gallery::load(
            vec![descriptor(&[1.0, 0.0]), descriptor(&[0.0, 1.0])],
            vec![IdentityId(7), IdentityId(9)],
        )
        .unwrap();

        assert_eq!(gallery.len(), 2);
        assert_eq!(gallery.entries()[0].identity, IdentityId(7));
        assert_eq!(gallery.entries()[1].identity, IdentityId(9));
    }

    #[test]
    fn test_load_rejects_length_mismatch() {
        let err = Gallery::load(vec![descriptor(&[1.0])], vec![]).unwrap_err();
        assert!(matches!(
            err,
            GalleryError::LengthMismatch {
                descriptors: 1,
                identities: 0
            }
        ));
    }

    #[test]
    fn test_load_rejects_empty_descriptor() {
        let err = Gallery::load(
            vec![descriptor(&[1.0]), descriptor(&[])],
            vec![IdentityId(1), IdentityId(2)],
        )
        .unwrap_err();
        assert!(matches!(err, GalleryError::EmptyDescriptor { index: 1 }));
    }

    #[test]
    fn test_load_rejects_inconsistent_dimensions() {
        let err = Gallery::load(
            vec![descriptor(&[1.0, 2.0]), descriptor(&[1.0])],
            vec![IdentityId(1), IdentityId(2)],
        )
        .unwrap_err();
        assert!(matches!(
            err,
            GalleryError::DimensionMismatch {
                index: 1,
                expected: 2,
                got: 1
            }
        ));
    }

    #[test]
    fn test_empty_inputs_are_a_valid_useless_gallery() {
        let gallery = Gallery::load(vec![], vec![]).unwrap();
        assert!(gallery.is_empty());
        assert_eq!(gallery.identity_count(), 0);
    }

    #[test]
    fn test_augmented_replicates_per_marker() {
        let gallery = Gallery::load(
            vec![descriptor(&[1.0]), descriptor(&[2.0])],
            vec![IdentityId(7), IdentityId(9)],
        )
        .unwrap();

        let augmented = gallery.augmented(&[-10, 0, 10]);

        assert_eq!(augmented.len(), 6);
        assert_eq!(augmented.identity_count(), 2);
        // Replicas keep their identity and exact descriptor values.
        for chunk in augmented.entries().chunks(3) {
            assert!(chunk
                .iter()
                .all(|e| e.identity == chunk[0].identity && e.descriptor == chunk[0].descriptor));
        }
    }

    #[test]
    fn test_augmented_with_no_markers_is_unchanged() {
        let gallery = Gallery::load(vec![descriptor(&[1.0])], vec![IdentityId(7)]).unwrap();
        assert_eq!(gallery.augmented(&[]).len(), 1);
    }
}
