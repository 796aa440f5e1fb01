use std::collections::{HashMap, HashSet};
use std::pin::pin;

use futures::stream::{self, FuturesUnordered, StreamExt};

use super::report::{DeleteOutcome, PullOutcome, PullReport, PushOutcome, PushReport};
use super::SyncError;
use crate::models::{FrontMatter, Post, PostStatus};
use crate::remote::{validate_filename, ContentGateway, GatewayError, RemotePost};
use crate::storage::{DraftStore, KeyValueStore};

/// Reconciles the local draft store with a remote content gateway.
pub struct Reconciler<G: ContentGateway, S: KeyValueStore> {
    gateway: G,
    drafts: DraftStore<S>,
}

impl<G: ContentGateway, S: KeyValueStore> Reconciler<G, S> {
    pub fn new(gateway: G, drafts: DraftStore<S>) -> Self {
        Self { gateway, drafts }
    }

    pub fn gateway(&self) -> &G {
        &self.gateway
    }

    pub fn drafts(&self) -> &DraftStore<S> {
        &self.drafts
    }

    /// Records a local edit, creating the draft if needed.
    pub fn save_draft(
        &self,
        filename: &str,
        content: &str,
        front_matter: FrontMatter,
    ) -> Result<Post, SyncError> {
        validate_filename(filename)?;

        let post = self.drafts.save_draft(filename, content, front_matter)?;
        tracing::debug!("Saved draft {} ({})", filename, post.state());
        Ok(post)
    }

    /// Lists every draft with its sync state.
    pub fn status(&self) -> Result<Vec<PostStatus>, SyncError> {
        Ok(self.drafts.status()?)
    }

    /// Merges the remote listing into the draft store.
    ///
    /// Remote posts unknown locally are inserted as synced. Synced drafts are
    /// replaced when the remote revision changed. Drafts with pending edits
    /// keep their content and front matter; only their stored revision token
    /// is refreshed, and they stay unsynced.
    pub async fn pull(&self) -> Result<PullReport, SyncError> {
        let entries = self.gateway.list_posts().await?;
        let local: HashMap<String, Post> = self
            .drafts
            .list()?
            .into_iter()
            .map(|post| (post.filename.clone(), post))
            .collect();

        let mut report = PullReport::default();
        let mut to_fetch = Vec::new();

        for entry in &entries {
            let Some(post) = local.get(&entry.filename) else {
                to_fetch.push(entry.filename.as_str());
                continue;
            };

            let same_revision =
                post.revision_token.as_deref() == Some(entry.revision_token.as_str());

            if !post.synced {
                if !same_revision {
                    let mut kept = post.clone();
                    kept.revision_token = Some(entry.revision_token.clone());
                    self.drafts.put(kept)?;
                }
                tracing::debug!("Keeping local edits for {}", entry.filename);
                report
                    .outcomes
                    .insert(entry.filename.clone(), PullOutcome::KeptLocal);
            } else if same_revision {
                report
                    .outcomes
                    .insert(entry.filename.clone(), PullOutcome::Unchanged);
            } else {
                to_fetch.push(entry.filename.as_str());
            }
        }

        let mut fetches: FuturesUnordered<_> = to_fetch
            .into_iter()
            .map(|filename| async move { (filename, self.gateway.get_post(filename).await) })
            .collect();

        while let Some((filename, result)) = fetches.next().await {
            let outcome = match result {
                Ok(remote) => self.apply_pulled(remote, local.contains_key(filename))?,
                Err(e) => {
                    tracing::warn!("Failed to fetch {}: {}", filename, e);
                    PullOutcome::Failed(e)
                }
            };
            report.outcomes.insert(filename.to_string(), outcome);
        }

        let remote_names: HashSet<&str> = entries.iter().map(|e| e.filename.as_str()).collect();
        report.missing_remotely = local
            .values()
            .filter(|post| {
                post.revision_token.is_some() && !remote_names.contains(post.filename.as_str())
            })
            .map(|post| post.filename.clone())
            .collect();
        report.missing_remotely.sort();

        tracing::info!(
            "Pulled {} remote post(s): {} inserted, {} updated, {} kept local",
            entries.len(),
            report.count(&PullOutcome::Inserted),
            report.count(&PullOutcome::Updated),
            report.count(&PullOutcome::KeptLocal)
        );
        Ok(report)
    }

    fn apply_pulled(&self, remote: RemotePost, existed: bool) -> Result<PullOutcome, SyncError> {
        // Guard against an edit that landed while the fetch was in flight.
        if let Some(current) = self.drafts.get(&remote.filename)? {
            if !current.synced {
                return Ok(PullOutcome::KeptLocal);
            }
        }

        let post = Post::from_remote(
            remote.filename,
            remote.content,
            remote.front_matter,
            remote.revision_token,
        );
        self.drafts.put(post)?;

        Ok(if existed {
            PullOutcome::Updated
        } else {
            PullOutcome::Inserted
        })
    }

    /// Sends every unsynced draft to the gateway.
    ///
    /// Uploads go out one at a time: providers commit each write on the
    /// branch head and reject concurrent writes to the same branch. Each
    /// result is written back as soon as it arrives, so abandoning the
    /// returned future leaves every draft either fully pushed or still
    /// unsynced.
    pub async fn push(&self) -> Result<PushReport, SyncError> {
        let pending: Vec<Post> = self
            .drafts
            .list()?
            .into_iter()
            .filter(|post| !post.synced)
            .collect();

        let mut report = PushReport::default();
        if pending.is_empty() {
            return Ok(report);
        }

        let mut uploads = pin!(stream::iter(pending).then(|post| async move {
            let result = self
                .gateway
                .upsert_post(
                    &post.filename,
                    &post.content,
                    &post.front_matter,
                    post.revision_token.as_deref(),
                )
                .await;
            (post, result)
        }));

        while let Some((pushed, result)) = uploads.next().await {
            let outcome = self.apply_pushed(&pushed, result)?;
            report.outcomes.insert(pushed.filename, outcome);
        }

        tracing::info!(
            "Pushed {} of {} draft(s)",
            report.pushed().count(),
            report.outcomes.len()
        );
        Ok(report)
    }

    fn apply_pushed(
        &self,
        pushed: &Post,
        result: Result<String, GatewayError>,
    ) -> Result<PushOutcome, SyncError> {
        let current = self.drafts.get(&pushed.filename)?;

        match result {
            Ok(token) => {
                if let Some(mut current) = current {
                    // Only content that actually reached the remote counts as synced.
                    if current.last_modified == pushed.last_modified {
                        current.synced = true;
                        current.push_error = None;
                    }
                    current.revision_token = Some(token.clone());
                    self.drafts.put(current)?;
                }
                tracing::debug!("Pushed {} at {}", pushed.filename, token);
                Ok(PushOutcome::Pushed {
                    revision_token: token,
                })
            }
            Err(e) => {
                tracing::warn!("Failed to push {}: {}", pushed.filename, e);
                if let Some(mut current) = current {
                    current.push_error = Some(e.to_string());
                    self.drafts.put(current)?;
                }
                Ok(PushOutcome::Failed(e))
            }
        }
    }

    /// Deletes a draft, removing the remote file first when it was synced.
    ///
    /// On any gateway error the draft stays in the store.
    pub async fn delete(&self, filename: &str) -> Result<DeleteOutcome, SyncError> {
        let post = self
            .drafts
            .get(filename)?
            .ok_or_else(|| SyncError::NotFound(filename.to_string()))?;

        let outcome = match &post.revision_token {
            Some(token) => {
                self.gateway.delete_post(filename, token).await?;
                DeleteOutcome::Remote
            }
            None => DeleteOutcome::LocalOnly,
        };

        self.drafts.delete(filename)?;
        tracing::debug!("Deleted draft {} ({:?})", filename, outcome);
        Ok(outcome)
    }
}
