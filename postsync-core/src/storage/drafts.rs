use std::collections::BTreeMap;

use super::{KeyValueStore, StorageError};
use crate::models::{FrontMatter, Post, PostStatus};

/// Key under which the whole draft collection is stored.
pub const DRAFTS_KEY: &str = "postsync.drafts";

/// Local draft store: filename -> [`Post`].
///
/// Every mutation rewrites the full collection. A stored blob that cannot be
/// parsed is treated as absent, so the next write replaces it.
#[derive(Debug)]
pub struct DraftStore<S: KeyValueStore> {
    backend: S,
}

impl<S: KeyValueStore> DraftStore<S> {
    pub fn new(backend: S) -> Self {
        Self { backend }
    }

    pub fn backend(&self) -> &S {
        &self.backend
    }

    /// Returns all drafts, sorted by filename.
    pub fn list(&self) -> Result<Vec<Post>, StorageError> {
        Ok(self.load()?.into_values().collect())
    }

    pub fn get(&self, filename: &str) -> Result<Option<Post>, StorageError> {
        Ok(self.load()?.remove(filename))
    }

    /// Inserts `post`, replacing any draft with the same filename.
    pub fn put(&self, post: Post) -> Result<(), StorageError> {
        let mut posts = self.load()?;
        posts.insert(post.filename.clone(), post);
        self.save(&posts)
    }

    /// Applies a local edit to `filename`, creating the draft if it does not
    /// exist yet. The draft is left unsynced.
    pub fn save_draft(
        &self,
        filename: &str,
        content: &str,
        front_matter: FrontMatter,
    ) -> Result<Post, StorageError> {
        let post = match self.get(filename)? {
            Some(mut existing) => {
                existing.edit(content, front_matter);
                existing
            }
            None => Post::new(filename, content, front_matter),
        };

        self.put(post.clone())?;
        Ok(post)
    }

    /// Every draft with its derived sync state, sorted by filename.
    pub fn status(&self) -> Result<Vec<PostStatus>, StorageError> {
        Ok(self.list()?.into_iter().map(PostStatus::from).collect())
    }

    /// Removes a draft. Returns whether it existed.
    pub fn delete(&self, filename: &str) -> Result<bool, StorageError> {
        let mut posts = self.load()?;
        if posts.remove(filename).is_none() {
            return Ok(false);
        }
        self.save(&posts)?;
        Ok(true)
    }

    fn load(&self) -> Result<BTreeMap<String, Post>, StorageError> {
        let blob = match self.backend.get(DRAFTS_KEY) {
            Ok(Some(blob)) => blob,
            Ok(None) => return Ok(BTreeMap::new()),
            Err(StorageError::Malformed { reason, .. }) => {
                tracing::warn!("Ignoring unreadable draft storage: {}", reason);
                return Ok(BTreeMap::new());
            }
            Err(e) => return Err(e),
        };

        match serde_json::from_str::<Vec<Post>>(&blob) {
            Ok(posts) => Ok(posts
                .into_iter()
                .map(|post| (post.filename.clone(), post))
                .collect()),
            Err(e) => {
                tracing::warn!("Ignoring malformed draft storage: {}", e);
                Ok(BTreeMap::new())
            }
        }
    }

    fn save(&self, posts: &BTreeMap<String, Post>) -> Result<(), StorageError> {
        let list: Vec<&Post> = posts.values().collect();
        let blob = serde_json::to_string(&list)?;
        self.backend.set(DRAFTS_KEY, &blob)
    }
}
