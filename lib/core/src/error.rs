//! Error handling foundation for the healthfirst assistant.
//!
//! This module provides the coarse [`ErrorKind`] taxonomy that every
//! surfaced failure maps onto.
//! Each crate defines its own domain-specific error types in their own
//! error modules, using rootcause's `.context()` to add layer-appropriate
//! context as errors propagate up the stack.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The kind of failure a caller sees.
///
/// Callers branch on this, never on the message text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// A required field was missing or empty. Nothing was mutated.
    Validation,
    /// The caller's identity is absent or does not own the thread.
    Authorization,
    /// The message store failed to read or write.
    Storage,
    /// The response generator failed.
    Generation,
}

impl ErrorKind {
    /// Returns the stable machine-readable name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Validation => "validation",
            Self::Authorization => "authorization",
            Self::Storage => "storage",
            Self::Generation => "generation",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_kind_serializes_snake_case() {
        let json = serde_json::to_string(&ErrorKind::Authorization).expect("serialize");
        assert_eq!(json, "\"authorization\"");
        assert_eq!(ErrorKind::Generation.to_string(), "generation");
    }
}
