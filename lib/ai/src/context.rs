//! Per-thread execution contexts.
//!
//! Every generation for a thread runs under that thread's context. A context
//! holds bookkeeping only: invocation count, the longest conversation seen
//! and the last invocation time. It carries no conversation memory; every
//! call gets its full history rebuilt from the message store, and the
//! generator reads the context only to warn when a conversation shrinks.
//!
//! Contexts are created on first use and live until evicted. Without a
//! capacity bound they live for the process lifetime.

use chrono::{DateTime, Utc};
use healthfirst_core::ThreadId;
use std::collections::HashMap;
use std::num::NonZeroUsize;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::debug;

/// Generator-side state for one thread.
#[derive(Debug)]
pub struct ExecutionContext {
    thread_id: ThreadId,
    state: Mutex<ContextState>,
}

#[derive(Debug)]
struct ContextState {
    invocations: u64,
    high_water: usize,
    last_invoked_at: Option<DateTime<Utc>>,
}

/// Point-in-time view of an [`ExecutionContext`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContextSnapshot {
    /// Thread this context belongs to.
    pub thread_id: ThreadId,
    /// Number of generations run under this context.
    pub invocations: u64,
    /// Longest conversation seen so far.
    pub high_water: usize,
    /// When the last generation started.
    pub last_invoked_at: Option<DateTime<Utc>>,
}

/// Outcome of recording an invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    /// Sequence number of this invocation within the thread, starting at 1.
    pub sequence: u64,
    /// Set when the conversation is shorter than one previously seen.
    pub shrunk_from: Option<usize>,
}

impl ExecutionContext {
    fn new(thread_id: ThreadId) -> Self {
        Self {
            thread_id,
            state: Mutex::new(ContextState {
                invocations: 0,
                high_water: 0,
                last_invoked_at: None,
            }),
        }
    }

    /// Returns the thread this context is keyed by.
    #[must_use]
    pub fn thread_id(&self) -> &ThreadId {
        &self.thread_id
    }

    /// Records a generation over a conversation of `conversation_len` messages.
    pub async fn record_invocation(&self, conversation_len: usize) -> Invocation {
        let mut state = self.state.lock().await;
        state.invocations += 1;
        state.last_invoked_at = Some(Utc::now());

        let shrunk_from = (conversation_len < state.high_water).then_some(state.high_water);
        state.high_water = state.high_water.max(conversation_len);

        Invocation {
            sequence: state.invocations,
            shrunk_from,
        }
    }

    /// Returns a snapshot of the current state.
    pub async fn snapshot(&self) -> ContextSnapshot {
        let state = self.state.lock().await;
        ContextSnapshot {
            thread_id: self.thread_id.clone(),
            invocations: state.invocations,
            high_water: state.high_water,
            last_invoked_at: state.last_invoked_at,
        }
    }
}

struct Entry {
    context: Arc<ExecutionContext>,
    last_access: u64,
}

#[derive(Default)]
struct Registry {
    clock: u64,
    entries: HashMap<ThreadId, Entry>,
}

/// Idempotent get-or-create store of execution contexts keyed by thread.
pub struct ExecutionContextRegistry {
    capacity: Option<NonZeroUsize>,
    inner: Mutex<Registry>,
}

impl Default for ExecutionContextRegistry {
    fn default() -> Self {
        Self::unbounded()
    }
}

impl ExecutionContextRegistry {
    /// Creates a registry that never evicts.
    #[must_use]
    pub fn unbounded() -> Self {
        Self {
            capacity: None,
            inner: Mutex::new(Registry::default()),
        }
    }

    /// Creates a registry holding at most `capacity` contexts, evicting the
    /// least recently used one when full.
    #[must_use]
    pub fn with_capacity(capacity: NonZeroUsize) -> Self {
        Self {
            capacity: Some(capacity),
            inner: Mutex::new(Registry::default()),
        }
    }

    /// Creates a registry from an optional capacity, `None` meaning unbounded.
    #[must_use]
    pub fn from_capacity(capacity: Option<usize>) -> Self {
        match capacity.and_then(NonZeroUsize::new) {
            Some(capacity) => Self::with_capacity(capacity),
            None => Self::unbounded(),
        }
    }

    /// Returns the context for `thread_id`, creating it if absent.
    ///
    /// Calling this repeatedly for one thread always yields the same context
    /// until it is evicted.
    pub async fn context(&self, thread_id: &ThreadId) -> Arc<ExecutionContext> {
        let mut registry = self.inner.lock().await;
        registry.clock += 1;
        let now = registry.clock;

        if let Some(entry) = registry.entries.get_mut(thread_id) {
            entry.last_access = now;
            return Arc::clone(&entry.context);
        }

        if let Some(capacity) = self.capacity
            && registry.entries.len() >= capacity.get()
        {
            let oldest = registry
                .entries
                .iter()
                .min_by_key(|(_, entry)| entry.last_access)
                .map(|(id, _)| id.clone());
            if let Some(oldest) = oldest {
                registry.entries.remove(&oldest);
                debug!(evicted = %oldest, "Evicted least recently used execution context");
            }
        }

        let context = Arc::new(ExecutionContext::new(thread_id.clone()));
        registry.entries.insert(
            thread_id.clone(),
            Entry {
                context: Arc::clone(&context),
                last_access: now,
            },
        );
        debug!(thread_id = %thread_id, "Created execution context");
        context
    }

    /// Returns true if a context exists for `thread_id`.
    pub async fn contains(&self, thread_id: &ThreadId) -> bool {
        self.inner.lock().await.entries.contains_key(thread_id)
    }

    /// Returns the number of live contexts.
    pub async fn len(&self) -> usize {
        self.inner.lock().await.entries.len()
    }

    /// Returns true if no contexts are live.
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}
