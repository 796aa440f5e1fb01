//! Local-first synchronization between the draft store and the remote
//! repository.
//!
//! Edits land in the [`DraftStore`](crate::storage::DraftStore) immediately.
//! `pull` merges the remote listing into it (local edits win), `push` sends
//! every unsynced draft to the gateway. Both are best-effort batches: each
//! post succeeds or fails on its own and the outcome is reported per post.

#[cfg(test)]
mod fake;
mod reconciler;
mod report;

pub use reconciler::Reconciler;
pub use report::{DeleteOutcome, PullOutcome, PullReport, PushOutcome, PushReport};

use thiserror::Error;

use crate::remote::GatewayError;
use crate::storage::StorageError;

/// Errors that abort a sync operation as a whole.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Gateway(#[from] GatewayError),

    #[error("Draft not found: {0}")]
    NotFound(String),
}
