use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::FrontMatter;

/// A locally held copy of a blog post, keyed by filename.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Post {
    pub filename: String,
    /// Markdown body, without the front-matter block.
    pub content: String,
    pub front_matter: FrontMatter,
    /// Content SHA last seen on the remote; `None` for posts never synced.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revision_token: Option<String>,
    pub last_modified: DateTime<Utc>,
    pub synced: bool,
    /// Message of the last failed push, cleared by an edit or a successful push.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub push_error: Option<String>,
}

/// Per-post synchronization state, derived from the stored fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncState {
    LocalOnly,
    Synced,
    LocalDirty,
    PushFailed,
}

impl fmt::Display for SyncState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyncState::LocalOnly => write!(f, "local-only"),
            SyncState::Synced => write!(f, "synced"),
            SyncState::LocalDirty => write!(f, "modified"),
            SyncState::PushFailed => write!(f, "push-failed"),
        }
    }
}

/// Summary of one draft for status listings.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PostStatus {
    pub filename: String,
    pub title: Option<String>,
    pub state: SyncState,
    pub last_modified: DateTime<Utc>,
    pub push_error: Option<String>,
}

impl From<Post> for PostStatus {
    fn from(post: Post) -> Self {
        Self {
            state: post.state(),
            title: post.title().map(str::to_string),
            filename: post.filename,
            last_modified: post.last_modified,
            push_error: post.push_error,
        }
    }
}

impl Post {
    /// Creates a never-synced draft.
    pub fn new(
        filename: impl Into<String>,
        content: impl Into<String>,
        front_matter: FrontMatter,
    ) -> Self {
        Self {
            filename: filename.into(),
            content: content.into(),
            front_matter,
            revision_token: None,
            last_modified: Utc::now(),
            synced: false,
            push_error: None,
        }
    }

    /// Creates a post mirroring the remote copy identified by `revision_token`.
    pub fn from_remote(
        filename: impl Into<String>,
        content: impl Into<String>,
        front_matter: FrontMatter,
        revision_token: impl Into<String>,
    ) -> Self {
        Self {
            filename: filename.into(),
            content: content.into(),
            front_matter,
            revision_token: Some(revision_token.into()),
            last_modified: Utc::now(),
            synced: true,
            push_error: None,
        }
    }

    /// Applies a local edit. The post needs a push afterwards.
    pub fn edit(&mut self, content: impl Into<String>, front_matter: FrontMatter) {
        self.content = content.into();
        self.front_matter = front_matter;
        self.touch();
    }

    /// Marks the post as locally modified without changing its fields.
    pub fn touch(&mut self) {
        self.last_modified = Utc::now();
        self.synced = false;
        self.push_error = None;
    }

    pub fn title(&self) -> Option<&str> {
        self.front_matter.title()
    }

    pub fn state(&self) -> SyncState {
        if self.synced {
            SyncState::Synced
        } else if self.push_error.is_some() {
            SyncState::PushFailed
        } else if self.revision_token.is_none() {
            SyncState::LocalOnly
        } else {
            SyncState::LocalDirty
        }
    }
}
