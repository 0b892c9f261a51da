//! roster-store — SQLite persistence for attendance and identities, plus the
//! JSON gallery file the recognition gallery is loaded from.
//!
//! Implements the ledger and directory ports from `roster-core`; the core
//! never touches SQL or the filesystem itself.

pub mod gallery_file;
pub mod store;

pub use gallery_file::{GalleryFile, GalleryFileError};
pub use store::{NewIdentity, SessionRecord, Store, StoreError};

use std::path::PathBuf;

/// Data directory: `$XDG_DATA_HOME/roster`, falling back to
/// `~/.local/share/roster`.
pub fn default_data_dir() -> PathBuf {
    std::env::var("XDG_DATA_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
            PathBuf::from(home).join(".local/share")
        })
        .join("roster")
}

/// Default path of the attendance database.
pub fn default_db_path() -> PathBuf {
    default_data_dir().join("attendance.db")
}

/// Default path of the gallery file.
pub fn default_gallery_path() -> PathBuf {
    default_data_dir().join("gallery.json")
}
