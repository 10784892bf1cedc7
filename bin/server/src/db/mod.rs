//! Database repositories for the healthfirst server.
//!
//! This module provides data access for:
//! - Conversation threads and their turns

pub mod thread;

pub use thread::PgMessageStore;
