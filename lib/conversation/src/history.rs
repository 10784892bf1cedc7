//! Rebuilds the generator's view of a thread from persisted turns.
//!
//! The conversation is rebuilt on every turn and never cached: storage is
//! the only source of truth and other processes may be writing to it.

use crate::error::StoreError;
use crate::message::{Speaker, StoredTurn};
use crate::store::MessageStore;
use healthfirst_ai::LlmMessage;
use healthfirst_core::{OwnerId, ThreadId};
use rootcause::Report;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

/// What to do with a turn whose sender is neither user nor assistant.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnknownSenderPolicy {
    /// Treat it as an assistant message.
    #[default]
    AsAssistant,
    /// Leave it out of the conversation.
    Skip,
}

/// Turns stored turns into role-tagged messages.
#[derive(Debug, Clone, Copy, Default)]
pub struct HistoryReconstructor {
    unknown_sender: UnknownSenderPolicy,
}

impl HistoryReconstructor {
    /// Creates a reconstructor with the given policy for unknown senders.
    #[must_use]
    pub fn new(unknown_sender: UnknownSenderPolicy) -> Self {
        Self { unknown_sender }
    }

    /// Reads `thread_id` under `owner` and returns its conversation with
    /// `user_text` appended as the final user message.
    ///
    /// # Errors
    ///
    /// Returns an error if the store read fails.
    pub async fn reconstruct<S: MessageStore + ?Sized>(
        &self,
        store: &S,
        thread_id: &ThreadId,
        owner: Option<&OwnerId>,
        user_text: &str,
    ) -> Result<Vec<LlmMessage>, Report<StoreError>> {
        let turns = store.read_turns(thread_id, owner).await?;
        let mut conversation = self.rebuild(&turns);
        conversation.push(LlmMessage::user(user_text));
        debug!(
            thread_id = %thread_id,
            stored = turns.len(),
            messages = conversation.len(),
            "Reconstructed conversation"
        );
        Ok(conversation)
    }

    /// Converts stored turns to messages, in order.
    ///
    /// Turns with no text in either field are dropped.
    #[must_use]
    pub fn rebuild(&self, turns: &[StoredTurn]) -> Vec<LlmMessage> {
        turns
            .iter()
            .filter_map(|turn| self.to_message(turn))
            .collect()
    }

    fn to_message(&self, turn: &StoredTurn) -> Option<LlmMessage> {
        let Some(text) = turn.text() else {
            trace!(sender = %turn.sender, "Skipping turn without text");
            return None;
        };
        match turn.speaker() {
            Some(Speaker::User) => Some(LlmMessage::user(text)),
            Some(Speaker::Assistant) => Some(LlmMessage::assistant(text)),
            None => match self.unknown_sender {
                UnknownSenderPolicy::AsAssistant => Some(LlmMessage::assistant(text)),
                UnknownSenderPolicy::Skip => None,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryMessageStore;
    use crate::thread::Thread;
    use chrono::Utc;
    use healthfirst_ai::MessageRole;

    fn stored(sender: &str, content: Option<&str>, legacy: Option<&str>) -> StoredTurn {
        StoredTurn {
            sender: sender.to_string(),
            content: content.map(str::to_string),
            legacy_content: legacy.map(str::to_string),
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn rebuild_keeps_order_and_roles() {
        let turns = vec![
            stored("user", Some("I have a headache"), None),
            stored("bot", Some("Drink water"), None),
        ];
        let messages = HistoryReconstructor::default().rebuild(&turns);
        assert_eq!(
            messages,
            vec![
                LlmMessage::user("I have a headache"),
                LlmMessage::assistant("Drink water"),
            ]
        );
    }

    #[test]
    fn legacy_field_is_used_when_primary_missing() {
        let turns = vec![stored("user", None, Some("legacy text"))];
        let messages = HistoryReconstructor::default().rebuild(&turns);
        assert_eq!(messages, vec![LlmMessage::user("legacy text")]);
    }

    #[test]
    fn turns_without_text_are_skipped() {
        let turns = vec![
            stored("user", None, None),
            stored("user", Some(""), Some("")),
            stored("user", Some("kept"), None),
        ];
        let messages = HistoryReconstructor::default().rebuild(&turns);
        assert_eq!(messages.len(), 1);
    }

    #[test]
    fn unknown_sender_policy() {
        let turns = vec![stored("system", Some("odd"), None)];

        let lenient = HistoryReconstructor::default().rebuild(&turns);
        assert_eq!(lenient[0].role, MessageRole::Assistant);

        let strict = HistoryReconstructor::new(UnknownSenderPolicy::Skip).rebuild(&turns);
        assert!(strict.is_empty());
    }

    #[tokio::test]
    async fn reconstruct_appends_new_user_text() {
        let store = InMemoryMessageStore::new();
        let thread_id = ThreadId::parse("T1").expect("id");
        let mut thread = Thread::new(thread_id.clone(), None);
        thread.turns.push(stored("user", None, Some("old question")));
        thread.turns.push(stored("bot", Some("old answer"), None));
        store.import_thread(thread).await;

        let conversation = HistoryReconstructor::default()
            .reconstruct(&store, &thread_id, None, "new question")
            .await
            .expect("reconstruct");

        assert_eq!(conversation.len(), 3);
        assert_eq!(conversation[0], LlmMessage::user("old question"));
        assert_eq!(conversation[2], LlmMessage::user("new question"));
    }
}
