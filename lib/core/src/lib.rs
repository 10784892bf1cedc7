//! Core domain types and utilities for the healthfirst assistant.
//!
//! This crate provides the foundational identifier types and error
//! handling shared by the conversation, AI, and server crates.

pub mod error;
pub mod id;

pub use error::ErrorKind;
pub use id::{OwnerId, ParseIdError, ThreadId};
