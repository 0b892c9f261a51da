//! JSON gallery file: the persisted `(descriptors, identity_labels)` pair
//! the recognition gallery is built from at startup.
//!
//! Length validation belongs to `Gallery::load`; this module only moves the
//! pair between disk and memory.

use roster_core::{Descriptor, IdentityId};
use serde::{Deserialize, Serialize};
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum GalleryFileError {
    #[error("gallery file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("gallery file {path}: invalid format: {source}")]
    Format {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// On-disk shape of the gallery: two parallel arrays.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GalleryFile {
    pub descriptors: Vec<Descriptor>,
    pub identities: Vec<IdentityId>,
}

/// Read and parse the gallery file at `path`.
pub fn load(path: &Path) -> Result<GalleryFile, GalleryFileError> {
    let raw = std::fs::read_to_string(path).map_err(|source| GalleryFileError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&raw).map_err(|source| GalleryFileError::Format {
        path: path.to_path_buf(),
        source,
    })
}

/// Write the gallery file at `path`, creating parent directories.
pub fn save(path: &Path, gallery: &GalleryFile) -> Result<(), GalleryFileError> {
    let io_err = |source| GalleryFileError::Io {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).map_err(io_err)?;
        }
    }
    let raw = serde_json::to_string_pretty(gallery).map_err(|source| GalleryFileError::Format {
        path: path.to_path_buf(),
        source,
    })?;
    std::fs::write(path, raw).map_err(io_err)
}

/// Append one descriptor for `identity`, creating the file if missing.
pub fn append(
    path: &Path,
    descriptor: Descriptor,
    identity: IdentityId,
) -> Result<(), GalleryFileError> {
    let mut gallery = if path.exists() {
        load(path)?
    } else {
        GalleryFile::default()
    };
    gallery.descriptors.push(descriptor);
    gallery.identities.push(identity);
    save(path, &gallery)
}
