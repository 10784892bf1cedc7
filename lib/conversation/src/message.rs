//! Turn types for persisted conversations.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Who produced a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Speaker {
    /// The person talking to the assistant.
    #[serde(rename = "user")]
    User,
    /// The assistant. Persisted as `"bot"`, the sender value existing
    /// threads already carry.
    #[serde(rename = "bot", alias = "assistant")]
    Assistant,
}

impl Speaker {
    /// Returns the sender value written to storage.
    #[must_use]
    pub const fn as_sender(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "bot",
        }
    }

    /// Parses a stored sender value. Returns `None` for unrecognised values.
    #[must_use]
    pub fn from_sender(sender: &str) -> Option<Self> {
        match sender {
            "user" => Some(Self::User),
            "bot" | "assistant" => Some(Self::Assistant),
            _ => None,
        }
    }
}

impl fmt::Display for Speaker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_sender())
    }
}

/// A turn exactly as it sits in storage.
///
/// Older records kept their text under `messages` instead of `content`.
/// Both are read; [`StoredTurn::text`] pins the precedence. New turns only
/// ever write `content`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredTurn {
    /// Raw sender value (`"user"`, `"bot"`, or anything a legacy writer used).
    pub sender: String,
    /// Primary text field.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    /// Legacy text field.
    #[serde(default, rename = "messages", skip_serializing_if = "Option::is_none")]
    pub legacy_content: Option<String>,
    /// Server-assigned creation time.
    pub timestamp: DateTime<Utc>,
}

impl StoredTurn {
    /// Creates a turn stamped with the current time.
    #[must_use]
    pub fn new(speaker: Speaker, content: impl Into<String>) -> Self {
        Self {
            sender: speaker.as_sender().to_string(),
            content: Some(content.into()),
            legacy_content: None,
            timestamp: Utc::now(),
        }
    }

    /// Returns the turn's text: `content` when non-empty, else the legacy
    /// `messages` field when non-empty, else `None`.
    #[must_use]
    pub fn text(&self) -> Option<&str> {
        self.content
            .as_deref()
            .filter(|s| !s.is_empty())
            .or_else(|| self.legacy_content.as_deref().filter(|s| !s.is_empty()))
    }

    /// Returns the parsed speaker, if the sender value is recognised.
    #[must_use]
    pub fn speaker(&self) -> Option<Speaker> {
        Speaker::from_sender(&self.sender)
    }
}
