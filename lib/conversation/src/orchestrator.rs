//! Conversation orchestrator.
//!
//! Runs one turn end to end:
//! 1. Resolve the owner scope
//! 2. Rebuild the thread's conversation and append the new user text
//! 3. Generate a reply under the thread's execution context
//! 4. Normalise the reply for display
//! 5. Commit the user turn, then the assistant turn
//!
//! Concurrent turns on the same thread are not coordinated. Both may read
//! the same history and both commit; the store decides the final order.

use crate::error::TurnError;
use crate::format::format_response;
use crate::history::{HistoryReconstructor, UnknownSenderPolicy};
use crate::message::Speaker;
use crate::scope::ScopePolicy;
use crate::store::MessageStore;
use crate::thread::ThreadSummary;
use chrono::{DateTime, Utc};
use healthfirst_ai::{DEFAULT_DIRECTIVE, ResponseGenerator};
use healthfirst_core::{OwnerId, ThreadId};
use rootcause::Report;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, instrument, warn};

/// Orchestrator settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationConfig {
    /// Behavioural directive sent ahead of every conversation.
    #[serde(default = "default_directive")]
    pub directive: String,
    /// Allow operations without an owner identity.
    #[serde(default = "default_allow_unscoped")]
    pub allow_unscoped: bool,
    /// Persist the user turn even when generation fails.
    #[serde(default = "default_record_unanswered_turns")]
    pub record_unanswered_turns: bool,
    /// Handling of stored turns with an unrecognised sender.
    #[serde(default)]
    pub unknown_sender: UnknownSenderPolicy,
    /// Upper bound on live execution contexts; unbounded when absent.
    #[serde(default)]
    pub context_capacity: Option<usize>,
}

fn default_directive() -> String {
    DEFAULT_DIRECTIVE.to_string()
}

fn default_allow_unscoped() -> bool {
    true
}

fn default_record_unanswered_turns() -> bool {
    true
}

impl Default for ConversationConfig {
    fn default() -> Self {
        Self {
            directive: default_directive(),
            allow_unscoped: default_allow_unscoped(),
            record_unanswered_turns: default_record_unanswered_turns(),
            unknown_sender: UnknownSenderPolicy::default(),
            context_capacity: None,
        }
    }
}

/// What a successful turn returns to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TurnOutcome {
    /// The user's text as submitted.
    pub user_message: String,
    /// The formatted reply, identical to the persisted assistant turn.
    pub bot_message: String,
}

/// Result of an explicit thread creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CreatedThread {
    /// The (possibly generated) thread identifier.
    pub thread_id: ThreadId,
    /// Always `"created"`.
    pub status: &'static str,
}

/// One entry of a thread's history as shown to callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    /// Stored sender value.
    pub sender: String,
    /// Turn text, empty if the record carries none.
    pub content: String,
    /// When the turn was committed.
    pub timestamp: DateTime<Utc>,
}

/// Composes the store, history reconstruction and generation.
pub struct ConversationOrchestrator<S, G> {
    store: S,
    generator: G,
    history: HistoryReconstructor,
    scope: ScopePolicy,
    config: ConversationConfig,
}

impl<S: MessageStore, G: ResponseGenerator> ConversationOrchestrator<S, G> {
    /// Creates an orchestrator over the given collaborators.
    #[must_use]
    pub fn new(store: S, generator: G, config: ConversationConfig) -> Self {
        Self {
            store,
            generator,
            history: HistoryReconstructor::new(config.unknown_sender),
            scope: ScopePolicy {
                allow_unscoped: config.allow_unscoped,
            },
            config,
        }
    }

    /// Returns the store.
    #[must_use]
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Rejects writes to a thread stamped with a different owner.
    async fn ensure_writable(
        &self,
        thread_id: &ThreadId,
        owner: Option<&OwnerId>,
    ) -> Result<(), Report<TurnError>> {
        let Some(owner) = owner else {
            return Ok(());
        };
        let stamped = self
            .store
            .thread_owner(thread_id)
            .await
            .map_err(|report| report.context(TurnError::Storage { operation: "lookup" }))?;
        match stamped {
            Some(stamped) if &stamped != owner => {
                warn!(thread_id = %thread_id, "Rejected access to a thread owned by someone else");
                Err(TurnError::OwnerMismatch {
                    thread_id: thread_id.clone(),
                }
                .into())
            }
            _ => Ok(()),
        }
    }

    /// Processes one user message and returns the exchanged pair.
    ///
    /// On success the thread gains exactly two turns, user then assistant.
    ///
    /// # Errors
    ///
    /// - Validation if `user_text` is empty or only whitespace; nothing is
    ///   read or written. Whitespace-only text is rejected as well, which is
    ///   stricter than the legacy API that only refused an empty string.
    /// - Authorization if the owner is missing (and required) or foreign.
    /// - Generation if the generator fails. The user turn is still recorded
    ///   when `record_unanswered_turns` is set.
    /// - Storage if a read or write fails. A failure between the two
    ///   appends leaves an unanswered user turn behind.
    #[instrument(skip_all, fields(thread_id = %thread_id, scoped = owner.is_some()))]
    pub async fn handle_turn(
        &self,
        thread_id: &ThreadId,
        owner: Option<&OwnerId>,
        user_text: &str,
    ) -> Result<TurnOutcome, Report<TurnError>> {
        if user_text.trim().is_empty() {
            return Err(TurnError::EmptyMessage.into());
        }
        let owner = self.scope.resolve(owner)?;
        self.ensure_writable(thread_id, owner).await?;

        let conversation = self
            .history
            .reconstruct(&self.store, thread_id, owner, user_text)
            .await
            .map_err(|report| report.context(TurnError::Storage { operation: "read" }))?;

        let raw = match self
            .generator
            .generate(thread_id, &self.config.directive, &conversation)
            .await
        {
            Ok(raw) => raw,
            Err(report) => {
                debug!(error = %report, "Response generation failed");
                if self.config.record_unanswered_turns
                    && let Err(store_report) = self
                        .store
                        .append(thread_id, Speaker::User, user_text, owner)
                        .await
                {
                    error!(error = %store_report, "Failed to record unanswered user turn");
                }
                return Err(report.context(TurnError::Generation {
                    thread_id: thread_id.clone(),
                }));
            }
        };
        let bot_message = format_response(&raw);

        self.store
            .append(thread_id, Speaker::User, user_text, owner)
            .await
            .map_err(|report| report.context(TurnError::Storage { operation: "append" }))?;
        self.store
            .append(thread_id, Speaker::Assistant, &bot_message, owner)
            .await
            .map_err(|report| report.context(TurnError::Storage { operation: "append" }))?;

        info!(history = conversation.len(), "Committed turn");
        Ok(TurnOutcome {
            user_message: user_text.to_string(),
            bot_message,
        })
    }

    /// Lists the caller's threads, most recently updated first.
    ///
    /// # Errors
    ///
    /// Returns an error if scope resolution or the store read fails.
    #[instrument(skip_all, fields(scoped = owner.is_some()))]
    pub async fn list_threads(
        &self,
        owner: Option<&OwnerId>,
    ) -> Result<Vec<ThreadSummary>, Report<TurnError>> {
        let owner = self.scope.resolve(owner)?;
        self.store
            .list_threads(owner)
            .await
            .map_err(|report| report.context(TurnError::Storage { operation: "list" }))
    }

    /// Creates an empty thread, minting an identifier when none is given.
    ///
    /// Creating a thread that already exists under the same owner succeeds
    /// without touching it. An existing unowned thread is claimed by the
    /// caller's owner.
    ///
    /// # Errors
    ///
    /// Returns an error if the owner is missing (and required) or foreign, or
    /// if the store write fails.
    #[instrument(skip_all, fields(scoped = owner.is_some()))]
    pub async fn create_thread(
        &self,
        thread_id: Option<ThreadId>,
        owner: Option<&OwnerId>,
    ) -> Result<CreatedThread, Report<TurnError>> {
        let owner = self.scope.resolve(owner)?;
        let thread_id = thread_id.unwrap_or_else(ThreadId::generate);
        self.ensure_writable(&thread_id, owner).await?;

        let created = self
            .store
            .create_thread(&thread_id, owner)
            .await
            .map_err(|report| report.context(TurnError::Storage { operation: "create" }))?;
        info!(thread_id = %thread_id, created, "Thread ready");

        Ok(CreatedThread {
            thread_id,
            status: "created",
        })
    }

    /// Returns the turns of a thread as visible to the caller.
    ///
    /// # Errors
    ///
    /// Returns an error if scope resolution or the store read fails.
    #[instrument(skip_all, fields(thread_id = %thread_id, scoped = owner.is_some()))]
    pub async fn get_history(
        &self,
        thread_id: &ThreadId,
        owner: Option<&OwnerId>,
    ) -> Result<Vec<HistoryEntry>, Report<TurnError>> {
        let owner = self.scope.resolve(owner)?;
        let turns = self
            .store
            .read_turns(thread_id, owner)
            .await
            .map_err(|report| report.context(TurnError::Storage { operation: "read" }))?;

        Ok(turns
            .into_iter()
            .map(|turn| HistoryEntry {
                content: turn.text().unwrap_or_default().to_string(),
                sender: turn.sender,
                timestamp: turn.timestamp,
            })
            .collect())
    }
}
