//! healthfirst HTTP server.
//!
//! This crate exposes the conversation orchestrator over a JSON API and
//! provides the Postgres-backed message store.

pub mod config;
pub mod db;
pub mod error;
pub mod identity;
pub mod routes;
pub mod state;

pub use routes::router;
pub use state::AppState;
