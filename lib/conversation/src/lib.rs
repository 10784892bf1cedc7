//! Session-scoped conversation orchestration for the healthfirst assistant.
//!
//! This crate provides:
//!
//! - **Message Store**: append-only per-thread turn log, optionally owner scoped
//! - **History Reconstructor**: persisted turns to an ordered, role-tagged conversation
//! - **Conversation Orchestrator**: one turn end to end, from scope resolution to commit

pub mod error;
pub mod format;
pub mod history;
pub mod message;
pub mod orchestrator;
pub mod scope;
pub mod store;
pub mod thread;

pub use error::{StoreError, TurnError};
pub use format::format_response;
pub use history::{HistoryReconstructor, UnknownSenderPolicy};
pub use message::{Speaker, StoredTurn};
pub use orchestrator::{
    ConversationConfig, ConversationOrchestrator, CreatedThread, HistoryEntry, TurnOutcome,
};
pub use scope::ScopePolicy;
pub use store::{InMemoryMessageStore, MessageStore};
pub use thread::{Thread, ThreadSummary};
