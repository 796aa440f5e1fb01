//! Remote content gateway.
//!
//! Posts live as files under a fixed directory of a Git repository and are
//! read and written through the hosting provider's contents API. Every write
//! becomes a commit, and the commit message is the only audit trail, so the
//! message formats below are kept stable.

mod client;
mod error;
mod provider;

pub use client::RepoClient;
pub use error::GatewayError;
pub use provider::{Provider, RepoTarget};

use crate::models::FrontMatter;

/// File suffixes listed as posts.
pub const POST_EXTENSIONS: [&str; 2] = [".md", ".mdx"];

/// A post file as seen in a directory listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteEntry {
    pub filename: String,
    /// Repository-relative path.
    pub path: String,
    pub revision_token: String,
    pub size: u64,
}

/// A fetched and decoded post.
#[derive(Debug, Clone, PartialEq)]
pub struct RemotePost {
    pub filename: String,
    pub content: String,
    pub front_matter: FrontMatter,
    pub revision_token: String,
}

/// Access to posts stored in a remote repository.
///
/// `revision_token` is the provider's content SHA. Updates and deletes must
/// supply the current one; a stale token fails with
/// [`GatewayError::Conflict`] instead of overwriting.
#[allow(async_fn_in_trait)]
pub trait ContentGateway {
    async fn list_posts(&self) -> Result<Vec<RemoteEntry>, GatewayError>;

    async fn get_post(&self, filename: &str) -> Result<RemotePost, GatewayError>;

    /// Creates the post when `revision_token` is `None`, updates it otherwise.
    /// Returns the new revision token.
    async fn upsert_post(
        &self,
        filename: &str,
        content: &str,
        front_matter: &FrontMatter,
        revision_token: Option<&str>,
    ) -> Result<String, GatewayError>;

    async fn delete_post(&self, filename: &str, revision_token: &str)
        -> Result<(), GatewayError>;
}

/// Commit message used for creates and updates.
pub fn update_message(filename: &str) -> String {
    format!("Update post: {}", filename)
}

/// Commit message used for deletes.
pub fn delete_message(filename: &str) -> String {
    format!("Delete post: {}", filename)
}

/// Returns true if `name` has a post suffix.
pub fn is_post_filename(name: &str) -> bool {
    POST_EXTENSIONS.iter().any(|ext| name.ends_with(ext))
}

/// Checks that `filename` is a bare post file name (no directories).
pub fn validate_filename(filename: &str) -> Result<(), GatewayError> {
    let valid = !filename.is_empty()
        && filename != "."
        && filename != ".."
        && !filename.contains(['/', '\\'])
        && is_post_filename(filename)
        && POST_EXTENSIONS.iter().all(|ext| filename != *ext);

    if valid {
        Ok(())
    } else {
        Err(GatewayError::InvalidFilename(filename.to_string()))
    }
}
