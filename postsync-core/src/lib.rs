//! postsync core library
//!
//! Local-first editing of Markdown blog posts: a front-matter codec, a local
//! draft store, a gateway to a Git host's contents API, and the reconciler
//! that moves drafts between them.

pub mod frontmatter;
pub mod models;
pub mod remote;
pub mod storage;
pub mod sync;

pub use models::{FrontMatter, FrontMatterValue, Post, PostStatus, SyncState};
pub use remote::{
    ContentGateway, GatewayError, Provider, RemoteEntry, RemotePost, RepoClient, RepoTarget,
};
pub use storage::{DraftStore, FileKeyValueStore, KeyValueStore, MemoryKeyValueStore, StorageError};
pub use sync::{
    DeleteOutcome, PullOutcome, PullReport, PushOutcome, PushReport, Reconciler, SyncError,
};

pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
