//! HTTP API routes.

use crate::error::ApiError;
use crate::identity::ResolvedOwner;
use crate::state::AppState;
use axum::{
    Json, Router,
    extract::{Path, State},
    routing::get,
};
use healthfirst_conversation::{HistoryEntry, ThreadSummary};
use healthfirst_core::ThreadId;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

/// Builds the API router.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/sessions", get(list_sessions).post(create_session))
        .route(
            "/api/sessions/{session_id}/messages",
            get(get_messages).post(send_message),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// A thread as listed to clients.
#[derive(Debug, Serialize, Deserialize)]
pub struct SessionView {
    pub session_id: String,
    /// `YYYY-MM-DD HH:MM:SS`, UTC.
    pub last_updated: String,
}

impl From<ThreadSummary> for SessionView {
    fn from(summary: ThreadSummary) -> Self {
        Self {
            last_updated: summary.formatted_last_updated(),
            session_id: summary.thread_id.into(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct CreateSessionRequest {
    #[serde(default)]
    pub session_id: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CreateSessionResponse {
    pub session_id: String,
    pub status: String,
}

#[derive(Debug, Deserialize)]
pub struct SendMessageRequest {
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SendMessageResponse {
    pub user_message: String,
    pub bot_response: String,
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

async fn list_sessions(
    State(state): State<Arc<AppState>>,
    owner: ResolvedOwner,
) -> Result<Json<Vec<SessionView>>, ApiError> {
    let threads = state.orchestrator.list_threads(owner.owner()).await?;
    Ok(Json(threads.into_iter().map(SessionView::from).collect()))
}

async fn create_session(
    State(state): State<Arc<AppState>>,
    owner: ResolvedOwner,
    Json(request): Json<CreateSessionRequest>,
) -> Result<Json<CreateSessionResponse>, ApiError> {
    let thread_id = request.session_id.map(ThreadId::parse).transpose()?;
    let created = state
        .orchestrator
        .create_thread(thread_id, owner.owner())
        .await?;
    Ok(Json(CreateSessionResponse {
        session_id: created.thread_id.into(),
        status: created.status.to_string(),
    }))
}

async fn get_messages(
    State(state): State<Arc<AppState>>,
    owner: ResolvedOwner,
    Path(session_id): Path<String>,
) -> Result<Json<Vec<HistoryEntry>>, ApiError> {
    let thread_id = ThreadId::parse(session_id)?;
    let history = state
        .orchestrator
        .get_history(&thread_id, owner.owner())
        .await?;
    Ok(Json(history))
}

async fn send_message(
    State(state): State<Arc<AppState>>,
    owner: ResolvedOwner,
    Path(session_id): Path<String>,
    Json(request): Json<SendMessageRequest>,
) -> Result<Json<SendMessageResponse>, ApiError> {
    let thread_id = ThreadId::parse(session_id)?;
    let outcome = state
        .orchestrator
        .handle_turn(&thread_id, owner.owner(), &request.message)
        .await?;
    Ok(Json(SendMessageResponse {
        user_message: outcome.user_message,
        bot_response: outcome.bot_message,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use axum::body::{Body, to_bytes};
    use axum::http::{HeaderName, Request, StatusCode};
    use healthfirst_ai::{GenerationError, LlmMessage, ResponseGenerator};
    use healthfirst_conversation::{
        ConversationConfig, ConversationOrchestrator, InMemoryMessageStore, MessageStore,
    };
    use rootcause::Report;
    use tower::ServiceExt;

    /// Generator that echoes the last user message.
    struct EchoGenerator {
        fail: bool,
    }

    #[async_trait]
    impl ResponseGenerator for EchoGenerator {
        async fn generate(
            &self,
            thread_id: &ThreadId,
            _directive: &str,
            conversation: &[LlmMessage],
        ) -> Result<String, Report<GenerationError>> {
            if self.fail {
                return Err(GenerationError::EmptyResponse {
                    thread_id: thread_id.clone(),
                }
                .into());
            }
            let last = conversation.last().map(|m| m.content.as_str()).unwrap_or("");
            Ok(format!("You said: {last} \u{2022} rest"))
        }
    }

    fn app_with(allow_unscoped: bool, fail: bool) -> (Router, Arc<InMemoryMessageStore>) {
        let store = Arc::new(InMemoryMessageStore::new());
        let orchestrator = ConversationOrchestrator::new(
            Arc::clone(&store) as Arc<dyn MessageStore>,
            Arc::new(EchoGenerator { fail }) as Arc<dyn ResponseGenerator>,
            ConversationConfig {
                allow_unscoped,
                ..ConversationConfig::default()
            },
        );
        let state = Arc::new(AppState::new(
            orchestrator,
            HeaderName::from_static("x-user-email"),
        ));
        (router(state), store)
    }

    fn app() -> (Router, Arc<InMemoryMessageStore>) {
        app_with(false, false)
    }

    fn request(method: &str, uri: &str, owner: Option<&str>, body: Option<Value>) -> Request<Body> {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(owner) = owner {
            builder = builder.header("x-user-email", owner);
        }
        match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        }
    }

    async fn json_body(response: axum::response::Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn health_is_ok() {
        let (app, _) = app();
        let response = app
            .oneshot(request("GET", "/health", None, None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn send_message_returns_pair_and_persists() {
        let (app, store) = app();

        let response = app
            .clone()
            .oneshot(request(
                "POST",
                "/api/sessions/T1/messages",
                Some("a@x.com"),
                Some(json!({ "message": "I have a headache" })),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["user_message"], "I have a headache");
        assert_eq!(
            body["bot_response"],
            "You said: I have a headache \n\u{2022} rest"
        );

        let response = app
            .oneshot(request(
                "GET",
                "/api/sessions/T1/messages",
                Some("a@x.com"),
                None,
            ))
            .await
            .unwrap();
        let history = json_body(response).await;
        assert_eq!(history.as_array().map(Vec::len), Some(2));
        assert_eq!(history[0]["sender"], "user");
        assert_eq!(history[1]["sender"], "bot");
        assert_eq!(store.thread_count().await, 1);
    }

    #[tokio::test]
    async fn empty_message_is_bad_request() {
        let (app, store) = app();
        let response = app
            .oneshot(request(
                "POST",
                "/api/sessions/T1/messages",
                Some("a@x.com"),
                Some(json!({})),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json_body(response).await["error"], "No message provided");
        assert_eq!(store.thread_count().await, 0);
    }

    #[tokio::test]
    async fn missing_identity_is_unauthorized() {
        let (app, _) = app();
        let response = app
            .oneshot(request("GET", "/api/sessions", None, None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn unscoped_mode_accepts_anonymous_callers() {
        let (app, _) = app_with(true, false);
        let response = app
            .oneshot(request("GET", "/api/sessions", None, None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn sessions_are_listed_per_owner() {
        let (app, _) = app();
        for (owner, id) in [("a@x.com", "A1"), ("a@x.com", "A2"), ("b@x.com", "B1")] {
            let response = app
                .clone()
                .oneshot(request(
                    "POST",
                    "/api/sessions",
                    Some(owner),
                    Some(json!({ "session_id": id })),
                ))
                .await
                .unwrap();
            let body = json_body(response).await;
            assert_eq!(body["session_id"], id);
            assert_eq!(body["status"], "created");
        }

        let response = app
            .oneshot(request("GET", "/api/sessions", Some("a@x.com"), None))
            .await
            .unwrap();
        let sessions = json_body(response).await;
        let ids: Vec<_> = sessions
            .as_array()
            .unwrap()
            .iter()
            .map(|s| s["session_id"].as_str().unwrap().to_string())
            .collect();
        assert_eq!(ids.len(), 2);
        assert!(ids.contains(&"A1".to_string()));
        assert!(ids.contains(&"A2".to_string()));
        assert_eq!(
            sessions[0]["last_updated"].as_str().map(str::len),
            Some("2025-01-01 00:00:00".len())
        );
    }

    #[tokio::test]
    async fn create_session_without_id_generates_one() {
        let (app, _) = app();
        let response = app
            .oneshot(request(
                "POST",
                "/api/sessions",
                Some("a@x.com"),
                Some(json!({})),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        let id = body["session_id"].as_str().unwrap();
        assert_eq!(id.len(), 20);
        assert!(id.chars().all(|c| c.is_ascii_digit()));
    }

    #[tokio::test]
    async fn foreign_thread_is_rejected() {
        let (app, _) = app();
        app.clone()
            .oneshot(request(
                "POST",
                "/api/sessions",
                Some("a@x.com"),
                Some(json!({ "session_id": "T" })),
            ))
            .await
            .unwrap();

        let response = app
            .oneshot(request(
                "POST",
                "/api/sessions/T/messages",
                Some("b@x.com"),
                Some(json!({ "message": "hi" })),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(json_body(response).await["error"], "Session not found");
    }

    #[tokio::test]
    async fn generation_failure_is_bad_gateway() {
        let (app, store) = app_with(false, true);
        let response = app
            .oneshot(request(
                "POST",
                "/api/sessions/T1/messages",
                Some("a@x.com"),
                Some(json!({ "message": "hello" })),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        let body = json_body(response).await;
        assert_eq!(body["error"], "Failed to generate a response");
        let owner = healthfirst_core::OwnerId::parse("a@x.com").unwrap();
        let thread_id = ThreadId::parse("T1").unwrap();
        let turns = store.read_turns(&thread_id, Some(&owner)).await.unwrap();
        assert_eq!(turns.len(), 1);
    }
}
