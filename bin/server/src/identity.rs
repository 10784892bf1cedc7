//! Identity scope resolution for Axum routes.
//!
//! Authentication happens upstream. The proxy in front of this server
//! verifies the caller and forwards their identity in a trusted header.

use axum::extract::{FromRef, FromRequestParts};
use axum::http::request::Parts;
use healthfirst_core::OwnerId;
use std::convert::Infallible;
use std::sync::Arc;

use crate::state::AppState;

/// Extractor for the caller's owner identity, if any.
///
/// A missing, non-UTF-8 or blank header yields `None`. Whether `None` is
/// acceptable is decided by the orchestrator's scope policy.
pub struct ResolvedOwner(pub Option<OwnerId>);

impl ResolvedOwner {
    /// Borrows the resolved owner.
    pub fn owner(&self) -> Option<&OwnerId> {
        self.0.as_ref()
    }
}

impl<S> FromRequestParts<S> for ResolvedOwner
where
    Arc<AppState>: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let app_state = Arc::<AppState>::from_ref(state);
        let owner = parts
            .headers
            .get(&app_state.owner_header)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| OwnerId::parse(value.trim()).ok());
        Ok(Self(owner))
    }
}
