//! Error types for the conversation crate.
//!
//! Errors are designed for layered context using rootcause:
//! - `StoreError`: Errors from message store operations
//! - `TurnError`: Caller-facing errors, also used as context wrappers
//!   around store and generation reports

use healthfirst_core::{ErrorKind, ThreadId};
use std::fmt;

/// Errors from message store operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// The backing storage could not be reached.
    Unavailable { reason: String },
    /// A read or write was rejected by the backing storage.
    QueryFailed { reason: String },
    /// A persisted record could not be decoded.
    CorruptRecord { thread_id: ThreadId, reason: String },
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unavailable { reason } => write!(f, "message store unavailable: {reason}"),
            Self::QueryFailed { reason } => write!(f, "message store query failed: {reason}"),
            Self::CorruptRecord { thread_id, reason } => {
                write!(f, "corrupt record in thread {thread_id}: {reason}")
            }
        }
    }
}

impl std::error::Error for StoreError {}

/// Errors surfaced by the conversation orchestrator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnError {
    /// The user message was empty.
    EmptyMessage,
    /// No owner identity was supplied and unscoped access is disabled.
    MissingIdentity,
    /// The thread is stamped with a different owner.
    OwnerMismatch { thread_id: ThreadId },
    /// Store operation context (use as context wrapper).
    Storage { operation: &'static str },
    /// Generation context (use as context wrapper).
    Generation { thread_id: ThreadId },
}

impl TurnError {
    /// Returns the caller-facing kind of this error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::EmptyMessage => ErrorKind::Validation,
            Self::MissingIdentity | Self::OwnerMismatch { .. } => ErrorKind::Authorization,
            Self::Storage { .. } => ErrorKind::Storage,
            Self::Generation { .. } => ErrorKind::Generation,
        }
    }
}

impl fmt::Display for TurnError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyMessage => write!(f, "no message provided"),
            Self::MissingIdentity => write!(f, "not authenticated"),
            Self::OwnerMismatch { thread_id } => {
                write!(f, "thread {thread_id} belongs to another owner")
            }
            Self::Storage { operation } => write!(f, "message store {operation} failed"),
            Self::Generation { thread_id } => {
                write!(f, "response generation failed for thread {thread_id}")
            }
        }
    }
}

impl std::error::Error for TurnError {}
