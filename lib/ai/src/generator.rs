//! Response generation under a per-thread execution context.

use crate::backend::{LlmBackend, LlmMessage, LlmRequest};
use crate::context::ExecutionContextRegistry;
use crate::error::GenerationError;
use async_trait::async_trait;
use healthfirst_core::ThreadId;
use rootcause::Report;
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, instrument, warn};

/// Directive sent ahead of every conversation unless configured otherwise.
pub const DEFAULT_DIRECTIVE: &str = "You are a healthcare bot. Your job is to advice homely \
remedies to patients who contact you. If the query seems too serious you should advice to seek \
professional help.";

/// Produces one reply for an ordered conversation.
///
/// Implementations must run the call under the execution context keyed by
/// `thread_id`.
#[async_trait]
pub trait ResponseGenerator: Send + Sync {
    /// Generates the assistant's next message.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying model call fails or yields no text.
    async fn generate(
        &self,
        thread_id: &ThreadId,
        directive: &str,
        conversation: &[LlmMessage],
    ) -> Result<String, Report<GenerationError>>;
}

#[async_trait]
impl<T: ResponseGenerator + ?Sized> ResponseGenerator for Arc<T> {
    async fn generate(
        &self,
        thread_id: &ThreadId,
        directive: &str,
        conversation: &[LlmMessage],
    ) -> Result<String, Report<GenerationError>> {
        (**self).generate(thread_id, directive, conversation).await
    }
}

/// [`ResponseGenerator`] backed by an [`LlmBackend`].
pub struct LlmResponseGenerator<B> {
    backend: B,
    contexts: Arc<ExecutionContextRegistry>,
    temperature: Option<f32>,
    max_tokens: Option<u32>,
}

impl<B: LlmBackend> LlmResponseGenerator<B> {
    /// Creates a generator over `backend`, sharing `contexts`.
    #[must_use]
    pub fn new(backend: B, contexts: Arc<ExecutionContextRegistry>) -> Self {
        Self {
            backend,
            contexts,
            temperature: None,
            max_tokens: None,
        }
    }

    /// Sets sampling options forwarded to every call.
    #[must_use]
    pub fn with_sampling(mut self, temperature: Option<f32>, max_tokens: Option<u32>) -> Self {
        self.temperature = temperature;
        self.max_tokens = max_tokens;
        self
    }
}

#[async_trait]
impl<B: LlmBackend> ResponseGenerator for LlmResponseGenerator<B> {
    #[instrument(skip_all, fields(thread_id = %thread_id, messages = conversation.len()))]
    async fn generate(
        &self,
        thread_id: &ThreadId,
        directive: &str,
        conversation: &[LlmMessage],
    ) -> Result<String, Report<GenerationError>> {
        let context = self.contexts.context(thread_id).await;
        let invocation = context.record_invocation(conversation.len()).await;
        if let Some(previous) = invocation.shrunk_from {
            warn!(
                previous,
                current = conversation.len(),
                "Conversation is shorter than one previously generated for this thread"
            );
        }

        let request = LlmRequest::new(conversation.to_vec())
            .with_system(directive)
            .with_temperature(self.temperature)
            .with_max_tokens(self.max_tokens);

        let started = Instant::now();
        let response = self.backend.generate(&request).await.map_err(|report| {
            report.context(GenerationError::Invocation {
                thread_id: thread_id.clone(),
            })
        })?;

        info!(
            sequence = invocation.sequence,
            model = %response.model,
            tokens = response.usage.total(),
            latency_ms = started.elapsed().as_millis() as u64,
            "Generated response"
        );

        if response.content.trim().is_empty() {
            return Err(GenerationError::EmptyResponse {
                thread_id: thread_id.clone(),
            }
            .into());
        }

        Ok(response.content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{LlmProvider, LlmResponse, MessageRole, TokenUsage};
    use crate::error::LlmError;
    use std::sync::Mutex;

    /// Backend that echoes how many messages it saw and records requests.
    #[derive(Default)]
    struct RecordingBackend {
        requests: Mutex<Vec<LlmRequest>>,
        reply: Option<String>,
        fail: bool,
    }

    #[async_trait]
    impl LlmBackend for RecordingBackend {
        async fn generate(&self, request: &LlmRequest) -> Result<LlmResponse, Report<LlmError>> {
            self.requests.lock().unwrap().push(request.clone());
            if self.fail {
                return Err(LlmError::Timeout.into());
            }
            Ok(LlmResponse {
                content: self
                    .reply
                    .clone()
                    .unwrap_or_else(|| format!("saw {}", request.messages.len())),
                usage: TokenUsage::default(),
                model: "test".to_string(),
            })
        }

        fn provider(&self) -> LlmProvider {
            LlmProvider::OpenAiCompatible
        }

        fn model(&self) -> &str {
            "test"
        }
    }

    fn tid(s: &str) -> ThreadId {
        ThreadId::parse(s).expect("valid id")
    }

    #[tokio::test]
    async fn sends_directive_and_conversation() {
        let contexts = Arc::new(ExecutionContextRegistry::unbounded());
        let generator = LlmResponseGenerator::new(RecordingBackend::default(), contexts)
            .with_sampling(Some(0.5), None);

        let reply = generator
            .generate(&tid("T1"), "be kind", &[LlmMessage::user("hello")])
            .await
            .expect("generate");

        assert_eq!(reply, "saw 1");
        let requests = generator.backend.requests.lock().unwrap();
        assert_eq!(requests[0].system.as_deref(), Some("be kind"));
        assert_eq!(requests[0].messages[0].role, MessageRole::User);
        assert_eq!(requests[0].temperature, Some(0.5));
    }

    #[tokio::test]
    async fn invocations_are_keyed_by_thread() {
        let contexts = Arc::new(ExecutionContextRegistry::unbounded());
        let generator =
            LlmResponseGenerator::new(RecordingBackend::default(), Arc::clone(&contexts));

        for _ in 0..2 {
            generator
                .generate(&tid("T1"), DEFAULT_DIRECTIVE, &[LlmMessage::user("a")])
                .await
                .expect("generate");
        }
        generator
            .generate(&tid("T2"), DEFAULT_DIRECTIVE, &[LlmMessage::user("b")])
            .await
            .expect("generate");

        let t1 = contexts.context(&tid("T1")).await.snapshot().await;
        let t2 = contexts.context(&tid("T2")).await.snapshot().await;
        assert_eq!(t1.invocations, 2);
        assert_eq!(t2.invocations, 1);
    }

    #[tokio::test]
    async fn backend_failure_becomes_generation_error() {
        let backend = RecordingBackend {
            fail: true,
            ..RecordingBackend::default()
        };
        let generator =
            LlmResponseGenerator::new(backend, Arc::new(ExecutionContextRegistry::unbounded()));

        let err = generator
            .generate(&tid("T1"), DEFAULT_DIRECTIVE, &[LlmMessage::user("a")])
            .await
            .unwrap_err();
        assert!(matches!(
            err.current_context(),
            GenerationError::Invocation { .. }
        ));
    }

    #[tokio::test]
    async fn blank_reply_is_rejected() {
        let backend = RecordingBackend {
            reply: Some("  ".to_string()),
            ..RecordingBackend::default()
        };
        let generator =
            LlmResponseGenerator::new(backend, Arc::new(ExecutionContextRegistry::unbounded()));

        let err = generator
            .generate(&tid("T1"), DEFAULT_DIRECTIVE, &[LlmMessage::user("a")])
            .await
            .unwrap_err();
        assert!(matches!(
            err.current_context(),
            GenerationError::EmptyResponse { .. }
        ));
    }
}
