//! Local persistence for drafts.
//!
//! Drafts live in a single serialized blob under one well-known key of a
//! [`KeyValueStore`]. The file-backed store is what the CLI uses; the
//! in-memory store backs tests and embedders that bring their own persistence.

mod drafts;
mod kv;

pub use drafts::{DraftStore, DRAFTS_KEY};
pub use kv::{FileKeyValueStore, KeyValueStore, MemoryKeyValueStore};

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur reading or writing local storage.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("I/O error for {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The stored bytes are not a readable value.
    #[error("Malformed value in {}: {reason}", .path.display())]
    Malformed { path: PathBuf, reason: String },

    #[error("Failed to serialize drafts: {0}")]
    Serialize(#[from] serde_json::Error),
}
