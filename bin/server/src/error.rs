//! HTTP error responses.
//!
//! Domain errors are mapped to a status code and a user-safe message.
//! The full report is logged and never sent to the client. A thread owned
//! by someone else is reported as not found, so its existence is not
//! confirmed to other callers.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use healthfirst_conversation::TurnError;
use healthfirst_core::{ErrorKind, ParseIdError};
use rootcause::Report;
use serde_json::json;
use std::fmt;

/// Errors returned by API handlers.
#[derive(Debug)]
pub enum ApiError {
    /// The session id in the path or body was not a valid thread id.
    InvalidThreadId(ParseIdError),
    /// The orchestrator rejected or failed the operation.
    Turn(Report<TurnError>),
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidThreadId(err) => write!(f, "{err}"),
            Self::Turn(report) => write!(f, "{report}"),
        }
    }
}

impl From<Report<TurnError>> for ApiError {
    fn from(report: Report<TurnError>) -> Self {
        Self::Turn(report)
    }
}

impl From<ParseIdError> for ApiError {
    fn from(err: ParseIdError) -> Self {
        Self::InvalidThreadId(err)
    }
}

impl ApiError {
    /// Returns the status code and user-safe message for this error.
    pub fn status_and_message(&self) -> (StatusCode, &'static str) {
        match self {
            Self::InvalidThreadId(_) => (StatusCode::BAD_REQUEST, "Invalid session id"),
            Self::Turn(report) => {
                let context = report.current_context();
                match context.kind() {
                    ErrorKind::Validation => (StatusCode::BAD_REQUEST, "No message provided"),
                    ErrorKind::Authorization => match context {
                        TurnError::OwnerMismatch { .. } => {
                            (StatusCode::NOT_FOUND, "Session not found")
                        }
                        _ => (StatusCode::UNAUTHORIZED, "Not authenticated. Please log in."),
                    },
                    ErrorKind::Storage => (StatusCode::INTERNAL_SERVER_ERROR, "Storage error"),
                    ErrorKind::Generation => {
                        (StatusCode::BAD_GATEWAY, "Failed to generate a response")
                    }
                }
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = self.status_and_message();
        if status.is_server_error() {
            tracing::error!(status = %status, error = %self, "Request failed");
        } else {
            tracing::debug!(status = %status, error = %self, "Request rejected");
        }
        (status, Json(json!({ "error": message }))).into_response()
    }
}
