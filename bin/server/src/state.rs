//! Shared application state.

use axum::http::HeaderName;
use healthfirst_ai::ResponseGenerator;
use healthfirst_conversation::{ConversationOrchestrator, MessageStore};
use std::sync::Arc;

/// Orchestrator over type-erased collaborators.
pub type Orchestrator =
    ConversationOrchestrator<Arc<dyn MessageStore>, Arc<dyn ResponseGenerator>>;

/// Shared application state.
pub struct AppState {
    /// Conversation orchestrator.
    pub orchestrator: Orchestrator,
    /// Header carrying the caller's identity.
    pub owner_header: HeaderName,
}

impl AppState {
    /// Creates a new application state.
    pub fn new(orchestrator: Orchestrator, owner_header: HeaderName) -> Self {
        Self {
            orchestrator,
            owner_header,
        }
    }
}
