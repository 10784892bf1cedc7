//! Persisted conversation threads.

use crate::message::{Speaker, StoredTurn};
use chrono::{DateTime, Utc};
use healthfirst_core::{OwnerId, ThreadId};
use serde::{Deserialize, Serialize};

/// Display format for `last_updated` in thread listings.
pub const LAST_UPDATED_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// A conversation thread and its append-only turn log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Thread {
    /// Thread identifier.
    pub thread_id: ThreadId,
    /// Owner stamp, absent for threads written without an identity.
    pub owner: Option<OwnerId>,
    /// Turns in commit order.
    pub turns: Vec<StoredTurn>,
    /// When the thread was created.
    pub created_at: DateTime<Utc>,
    /// When the last turn was appended (or creation time if none).
    pub last_updated: DateTime<Utc>,
}

impl Thread {
    /// Creates an empty thread.
    #[must_use]
    pub fn new(thread_id: ThreadId, owner: Option<OwnerId>) -> Self {
        let now = Utc::now();
        Self {
            thread_id,
            owner,
            turns: Vec::new(),
            created_at: now,
            last_updated: now,
        }
    }

    /// Appends a turn, bumping `last_updated`. A supplied owner overwrites
    /// the current stamp.
    pub fn append(&mut self, speaker: Speaker, content: &str, owner: Option<&OwnerId>) {
        let turn = StoredTurn::new(speaker, content);
        self.last_updated = turn.timestamp;
        self.turns.push(turn);
        if let Some(owner) = owner {
            self.owner = Some(owner.clone());
        }
    }

    /// Returns true if a read scoped to `owner` may see this thread.
    ///
    /// Unscoped reads see everything. Scoped reads only see threads
    /// stamped with exactly that owner.
    #[must_use]
    pub fn is_visible_to(&self, owner: Option<&OwnerId>) -> bool {
        match owner {
            None => true,
            Some(owner) => self.owner.as_ref() == Some(owner),
        }
    }

    /// Returns the listing entry for this thread.
    #[must_use]
    pub fn summary(&self) -> ThreadSummary {
        ThreadSummary {
            thread_id: self.thread_id.clone(),
            last_updated: self.last_updated,
        }
    }
}

/// One row of a thread listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThreadSummary {
    /// Thread identifier.
    pub thread_id: ThreadId,
    /// When the thread last changed.
    pub last_updated: DateTime<Utc>,
}

impl ThreadSummary {
    /// Returns `last_updated` as `YYYY-MM-DD HH:MM:SS`.
    #[must_use]
    pub fn formatted_last_updated(&self) -> String {
        self.last_updated.format(LAST_UPDATED_FORMAT).to_string()
    }
}

/// Sorts summaries most recently updated first.
pub fn sort_most_recent_first(summaries: &mut [ThreadSummary]) {
    summaries.sort_by(|a, b| {
        b.last_updated
            .cmp(&a.last_updated)
            .then_with(|| a.thread_id.cmp(&b.thread_id))
    });
}
