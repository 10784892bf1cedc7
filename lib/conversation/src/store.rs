//! Message store contract and the in-process implementation.
//!
//! The store is the only state shared between concurrent turns. Appends to
//! one thread must be atomic and totally ordered; no retries happen here.

use crate::error::StoreError;
use crate::message::{Speaker, StoredTurn};
use crate::thread::{Thread, ThreadSummary, sort_most_recent_first};
use async_trait::async_trait;
use healthfirst_core::{OwnerId, ThreadId};
use rootcause::Report;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, instrument};

/// Durable, append-only log of turns keyed by thread.
#[async_trait]
pub trait MessageStore: Send + Sync {
    /// Appends a turn to the end of `thread_id`, creating the thread if
    /// absent. A supplied owner stamps (or overwrites) the thread's owner.
    async fn append(
        &self,
        thread_id: &ThreadId,
        speaker: Speaker,
        content: &str,
        owner: Option<&OwnerId>,
    ) -> Result<(), Report<StoreError>>;

    /// Lists threads, most recently updated first. With an owner, only that
    /// owner's threads; without, every thread.
    async fn list_threads(
        &self,
        owner: Option<&OwnerId>,
    ) -> Result<Vec<ThreadSummary>, Report<StoreError>>;

    /// Returns the turns of `thread_id` in commit order.
    ///
    /// Empty if the thread does not exist or, with an owner, belongs to
    /// someone else.
    async fn read_turns(
        &self,
        thread_id: &ThreadId,
        owner: Option<&OwnerId>,
    ) -> Result<Vec<StoredTurn>, Report<StoreError>>;

    /// Creates an empty thread if it does not exist yet. Returns whether it
    /// was created.
    ///
    /// An existing unowned thread is stamped with a supplied owner. An
    /// existing owner is never replaced.
    async fn create_thread(
        &self,
        thread_id: &ThreadId,
        owner: Option<&OwnerId>,
    ) -> Result<bool, Report<StoreError>>;

    /// Returns the owner stamped on `thread_id`, or `None` if the thread is
    /// absent or unowned.
    async fn thread_owner(&self, thread_id: &ThreadId)
    -> Result<Option<OwnerId>, Report<StoreError>>;
}

#[async_trait]
impl<T: MessageStore + ?Sized> MessageStore for Arc<T> {
    async fn append(
        &self,
        thread_id: &ThreadId,
        speaker: Speaker,
        content: &str,
        owner: Option<&OwnerId>,
    ) -> Result<(), Report<StoreError>> {
        (**self).append(thread_id, speaker, content, owner).await
    }

    async fn list_threads(
        &self,
        owner: Option<&OwnerId>,
    ) -> Result<Vec<ThreadSummary>, Report<StoreError>> {
        (**self).list_threads(owner).await
    }

    async fn read_turns(
        &self,
        thread_id: &ThreadId,
        owner: Option<&OwnerId>,
    ) -> Result<Vec<StoredTurn>, Report<StoreError>> {
        (**self).read_turns(thread_id, owner).await
    }

    async fn create_thread(
        &self,
        thread_id: &ThreadId,
        owner: Option<&OwnerId>,
    ) -> Result<bool, Report<StoreError>> {
        (**self).create_thread(thread_id, owner).await
    }

    async fn thread_owner(
        &self,
        thread_id: &ThreadId,
    ) -> Result<Option<OwnerId>, Report<StoreError>> {
        (**self).thread_owner(thread_id).await
    }
}

/// [`MessageStore`] held in process memory.
///
/// Every write takes the map's write lock, which gives each thread a total
/// append order.
#[derive(Default)]
pub struct InMemoryMessageStore {
    threads: RwLock<HashMap<ThreadId, Thread>>,
}

impl InMemoryMessageStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads a thread verbatim, replacing any thread with the same id.
    ///
    /// Used to bring in records written by older deployments.
    pub async fn import_thread(&self, thread: Thread) {
        self.threads
            .write()
            .await
            .insert(thread.thread_id.clone(), thread);
    }

    /// Returns the number of threads held.
    pub async fn thread_count(&self) -> usize {
        self.threads.read().await.len()
    }
}

#[async_trait]
impl MessageStore for InMemoryMessageStore {
    #[instrument(skip(self, content), fields(thread_id = %thread_id))]
    async fn append(
        &self,
        thread_id: &ThreadId,
        speaker: Speaker,
        content: &str,
        owner: Option<&OwnerId>,
    ) -> Result<(), Report<StoreError>> {
        let mut threads = self.threads.write().await;
        let thread = threads
            .entry(thread_id.clone())
            .or_insert_with(|| Thread::new(thread_id.clone(), None));
        thread.append(speaker, content, owner);
        debug!(turns = thread.turns.len(), "Appended turn");
        Ok(())
    }

    async fn list_threads(
        &self,
        owner: Option<&OwnerId>,
    ) -> Result<Vec<ThreadSummary>, Report<StoreError>> {
        let threads = self.threads.read().await;
        let mut summaries: Vec<ThreadSummary> = threads
            .values()
            .filter(|thread| thread.is_visible_to(owner))
            .map(Thread::summary)
            .collect();
        sort_most_recent_first(&mut summaries);
        Ok(summaries)
    }

    async fn read_turns(
        &self,
        thread_id: &ThreadId,
        owner: Option<&OwnerId>,
    ) -> Result<Vec<StoredTurn>, Report<StoreError>> {
        let threads = self.threads.read().await;
        Ok(threads
            .get(thread_id)
            .filter(|thread| thread.is_visible_to(owner))
            .map(|thread| thread.turns.clone())
            .unwrap_or_default())
    }

    async fn create_thread(
        &self,
        thread_id: &ThreadId,
        owner: Option<&OwnerId>,
    ) -> Result<bool, Report<StoreError>> {
        let mut threads = self.threads.write().await;
        if let Some(thread) = threads.get_mut(thread_id) {
            if thread.owner.is_none() {
                thread.owner = owner.cloned();
            }
            return Ok(false);
        }
        threads.insert(
            thread_id.clone(),
            Thread::new(thread_id.clone(), owner.cloned()),
        );
        Ok(true)
    }

    async fn thread_owner(
        &self,
        thread_id: &ThreadId,
    ) -> Result<Option<OwnerId>, Report<StoreError>> {
        let threads = self.threads.read().await;
        Ok(threads.get(thread_id).and_then(|thread| thread.owner.clone()))
    }
}
