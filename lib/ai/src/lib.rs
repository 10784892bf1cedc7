//! Response generation for the healthfirst assistant.
//!
//! This crate provides:
//!
//! - **LLM Backend**: provider-agnostic chat-completion interface and an
//!   OpenAI-compatible HTTP implementation (Groq by default)
//! - **Execution Contexts**: generator-side state isolated per thread
//! - **Response Generator**: directive + conversation in, one reply out

pub mod backend;
pub mod context;
pub mod error;
pub mod generator;
pub mod openai;

pub use backend::{
    LlmBackend, LlmBackendConfig, LlmMessage, LlmProvider, LlmRequest, LlmResponse, MessageRole,
    TokenUsage,
};
pub use context::{ContextSnapshot, ExecutionContext, ExecutionContextRegistry};
pub use error::{GenerationError, LlmError};
pub use generator::{DEFAULT_DIRECTIVE, LlmResponseGenerator, ResponseGenerator};
pub use openai::OpenAiCompatibleBackend;
