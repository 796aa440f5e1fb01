//! In-memory gateway used by reconciler tests.

use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::rc::Rc;

use crate::frontmatter;
use crate::models::FrontMatter;
use crate::remote::{ContentGateway, GatewayError, RemoteEntry, RemotePost};
use crate::storage::{KeyValueStore, StorageError};

/// Lets a test and a reconciler see the same backend.
impl<S: KeyValueStore> KeyValueStore for Rc<S> {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        (**self).set(key, value)
    }
}

type ReplyHook = Box<dyn Fn(&str)>;

#[derive(Default)]
pub struct FakeGateway {
    /// filename -> (raw document, sha)
    files: RefCell<BTreeMap<String, (String, String)>>,
    list_failure: RefCell<Option<GatewayError>>,
    get_failures: RefCell<HashMap<String, GatewayError>>,
    upsert_failures: RefCell<HashMap<String, GatewayError>>,
    /// Runs while a get or upsert is in flight, before it answers.
    before_reply: RefCell<Option<ReplyHook>>,
    next_tokens: RefCell<VecDeque<String>>,
    counter: Cell<u32>,
    pub gets: Cell<usize>,
    pub upserts: Cell<usize>,
    pub deletes: Cell<usize>,
    in_flight: Cell<usize>,
    /// Most upserts ever awaiting at the same time.
    pub max_concurrent_upserts: Cell<usize>,
}

impl FakeGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Places a file on the remote as if committed by someone else.
    pub fn put_remote(&self, filename: &str, raw: &str, sha: &str) {
        self.files
            .borrow_mut()
            .insert(filename.to_string(), (raw.to_string(), sha.to_string()));
    }

    pub fn remote_raw(&self, filename: &str) -> Option<String> {
        self.files.borrow().get(filename).map(|(raw, _)| raw.clone())
    }

    pub fn remote_sha(&self, filename: &str) -> Option<String> {
        self.files.borrow().get(filename).map(|(_, sha)| sha.clone())
    }

    pub fn fail_list(&self, error: GatewayError) {
        *self.list_failure.borrow_mut() = Some(error);
    }

    pub fn fail_get(&self, filename: &str, error: GatewayError) {
        self.get_failures
            .borrow_mut()
            .insert(filename.to_string(), error);
    }

    pub fn before_reply(&self, hook: impl Fn(&str) + 'static) {
        *self.before_reply.borrow_mut() = Some(Box::new(hook));
    }

    fn run_hook(&self, filename: &str) {
        if let Some(hook) = self.before_reply.borrow().as_ref() {
            hook(filename);
        }
    }

    pub fn fail_upsert(&self, filename: &str, error: GatewayError) {
        self.upsert_failures
            .borrow_mut()
            .insert(filename.to_string(), error);
    }

    /// Tokens returned by upcoming successful writes, in order.
    pub fn queue_tokens(&self, tokens: &[&str]) {
        self.next_tokens
            .borrow_mut()
            .extend(tokens.iter().map(|t| t.to_string()));
    }

    fn next_token(&self) -> String {
        if let Some(token) = self.next_tokens.borrow_mut().pop_front() {
            return token;
        }
        self.counter.set(self.counter.get() + 1);
        format!("sha{}", self.counter.get())
    }
}

impl ContentGateway for FakeGateway {
    async fn list_posts(&self) -> Result<Vec<RemoteEntry>, GatewayError> {
        if let Some(error) = self.list_failure.borrow().clone() {
            return Err(error);
        }
        Ok(self
            .files
            .borrow()
            .iter()
            .map(|(name, (raw, sha))| RemoteEntry {
                filename: name.clone(),
                path: format!("posts/{}", name),
                revision_token: sha.clone(),
                size: raw.len() as u64,
            })
            .collect())
    }

    async fn get_post(&self, filename: &str) -> Result<RemotePost, GatewayError> {
        self.gets.set(self.gets.get() + 1);
        if let Some(error) = self.get_failures.borrow().get(filename) {
            return Err(error.clone());
        }
        self.run_hook(filename);

        let files = self.files.borrow();
        let (raw, sha) = files
            .get(filename)
            .ok_or_else(|| GatewayError::NotFound(filename.to_string()))?;
        let (front_matter, content) = frontmatter::decode(raw);
        Ok(RemotePost {
            filename: filename.to_string(),
            content,
            front_matter,
            revision_token: sha.clone(),
        })
    }

    async fn upsert_post(
        &self,
        filename: &str,
        content: &str,
        front_matter: &FrontMatter,
        revision_token: Option<&str>,
    ) -> Result<String, GatewayError> {
        self.upserts.set(self.upserts.get() + 1);
        self.in_flight.set(self.in_flight.get() + 1);
        self.max_concurrent_upserts
            .set(self.max_concurrent_upserts.get().max(self.in_flight.get()));
        tokio::task::yield_now().await;
        self.in_flight.set(self.in_flight.get() - 1);

        if let Some(error) = self.upsert_failures.borrow().get(filename) {
            return Err(error.clone());
        }

        let current = self.remote_sha(filename);
        if current.as_deref() != revision_token {
            return Err(GatewayError::Conflict(filename.to_string()));
        }

        let token = self.next_token();
        self.run_hook(filename);
        self.put_remote(filename, &frontmatter::encode(front_matter, content), &token);
        Ok(token)
    }

    async fn delete_post(
        &self,
        filename: &str,
        revision_token: &str,
    ) -> Result<(), GatewayError> {
        self.deletes.set(self.deletes.get() + 1);
        let current = self
            .remote_sha(filename)
            .ok_or_else(|| GatewayError::NotFound(filename.to_string()))?;
        if current != revision_token {
            return Err(GatewayError::Conflict(filename.to_string()));
        }
        self.files.borrow_mut().remove(filename);
        Ok(())
    }
}
