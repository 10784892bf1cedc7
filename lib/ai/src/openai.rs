//! OpenAI-compatible chat completions backend.
//!
//! Groq, OpenAI and most self-hosted gateways accept the same
//! `/chat/completions` request shape, so one client covers all of them.

use crate::backend::{
    LlmBackend, LlmBackendConfig, LlmProvider, LlmRequest, LlmResponse, MessageRole, TokenUsage,
};
use crate::error::LlmError;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use rootcause::Report;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, instrument, warn};

/// Backend that speaks the OpenAI chat completions protocol.
pub struct OpenAiCompatibleBackend {
    config: LlmBackendConfig,
    client: Client,
}

impl OpenAiCompatibleBackend {
    /// Creates a backend from configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the base URL is blank or the HTTP client cannot be built.
    pub fn new(config: LlmBackendConfig) -> Result<Self, Report<LlmError>> {
        if config.base_url.trim().is_empty() {
            return Err(LlmError::InvalidConfig {
                reason: "base_url must not be empty".to_string(),
            }
            .into());
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| LlmError::InvalidConfig {
                reason: e.to_string(),
            })?;

        Ok(Self { config, client })
    }

    fn chat_completions_url(&self) -> String {
        let base = self.config.base_url.trim_end_matches('/');
        if base.ends_with("/chat/completions") {
            base.to_string()
        } else {
            format!("{base}/chat/completions")
        }
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    model: Option<String>,
    choices: Vec<Choice>,
    #[serde(default)]
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Usage {
    #[serde(default)]
    prompt_tokens: u32,
    #[serde(default)]
    completion_tokens: u32,
}

fn role_name(role: MessageRole) -> &'static str {
    match role {
        MessageRole::User => "user",
        MessageRole::Assistant => "assistant",
        MessageRole::System => "system",
    }
}

/// Builds the wire request: system directive first, then the conversation.
fn build_chat_request<'a>(model: &'a str, request: &'a LlmRequest) -> ChatRequest<'a> {
    let mut messages = Vec::with_capacity(request.messages.len() + 1);
    if let Some(system) = request.system.as_deref() {
        messages.push(ChatMessage {
            role: "system",
            content: system,
        });
    }
    messages.extend(request.messages.iter().map(|m| ChatMessage {
        role: role_name(m.role),
        content: &m.content,
    }));

    ChatRequest {
        model,
        messages,
        temperature: request.temperature,
        max_tokens: request.max_tokens,
    }
}

fn parse_chat_response(body: &str, requested_model: &str) -> Result<LlmResponse, LlmError> {
    let parsed: ChatResponse =
        serde_json::from_str(body).map_err(|e| LlmError::ResponseParseFailed {
            reason: e.to_string(),
        })?;

    let content = parsed
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .ok_or_else(|| LlmError::ResponseParseFailed {
            reason: "response contained no message content".to_string(),
        })?;

    let usage = parsed
        .usage
        .map(|u| TokenUsage {
            input_tokens: u.prompt_tokens,
            output_tokens: u.completion_tokens,
        })
        .unwrap_or_default();

    Ok(LlmResponse {
        content,
        usage,
        model: parsed.model.unwrap_or_else(|| requested_model.to_string()),
    })
}

#[async_trait]
impl LlmBackend for OpenAiCompatibleBackend {
    #[instrument(skip_all, fields(model = %self.config.model, messages = request.messages.len()))]
    async fn generate(&self, request: &LlmRequest) -> Result<LlmResponse, Report<LlmError>> {
        let url = self.chat_completions_url();
        let body = build_chat_request(&self.config.model, request);

        let mut http_request = self.client.post(&url).json(&body);
        if let Some(api_key) = self.config.api_key.as_deref()
            && !api_key.is_empty()
        {
            http_request = http_request.bearer_auth(api_key);
        }

        let response = http_request.send().await.map_err(|e| {
            warn!(error = %e, endpoint = %url, "Failed to reach LLM endpoint");
            if e.is_timeout() {
                LlmError::Timeout
            } else {
                LlmError::ProviderUnavailable {
                    provider: self.config.provider.as_str().to_string(),
                    reason: e.to_string(),
                }
            }
        })?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after_secs = response
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse().ok());
            return Err(LlmError::RateLimited { retry_after_secs }.into());
        }

        let text = response.text().await.map_err(|e| LlmError::RequestFailed {
            reason: e.to_string(),
        })?;

        if !status.is_success() {
            warn!(status = %status, body = %text, "LLM endpoint returned error");
            return Err(LlmError::RequestFailed {
                reason: format!("HTTP {status}: {text}"),
            }
            .into());
        }

        let parsed = parse_chat_response(&text, &self.config.model)?;
        debug!(
            input_tokens = parsed.usage.input_tokens,
            output_tokens = parsed.usage.output_tokens,
            "LLM call completed"
        );
        Ok(parsed)
    }

    fn provider(&self) -> LlmProvider {
        self.config.provider
    }

    fn model(&self) -> &str {
        &self.config.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::LlmMessage;

    #[test]
    fn directive_precedes_conversation() {
        let request = LlmRequest::new(vec![
            LlmMessage::user("I have a headache"),
            LlmMessage::assistant("Drink water."),
            LlmMessage::user("Still hurts"),
        ])
        .with_system("You are a healthcare bot.")
        .with_temperature(Some(0.2));

        let wire = serde_json::to_value(build_chat_request("m", &request)).expect("serialize");
        let messages = wire["messages"].as_array().expect("messages array");

        assert_eq!(messages.len(), 4);
        assert_eq!(messages[0]["role"], "system");
        assert_eq!(messages[1]["role"], "user");
        assert_eq!(messages[2]["role"], "assistant");
        assert_eq!(messages[3]["content"], "Still hurts");
        assert!(wire.get("max_tokens").is_none());
    }

    #[test]
    fn parses_first_choice_and_usage() {
        let body = r#"{
            "model": "llama-3.3-70b-versatile",
            "choices": [{"message": {"role": "assistant", "content": "Rest well."}}],
            "usage": {"prompt_tokens": 12, "completion_tokens": 3}
        }"#;

        let response = parse_chat_response(body, "fallback").expect("parse");
        assert_eq!(response.content, "Rest well.");
        assert_eq!(response.usage.total(), 15);
        assert_eq!(response.model, "llama-3.3-70b-versatile");
    }

    #[test]
    fn missing_choice_is_parse_failure() {
        let err = parse_chat_response(r#"{"choices": []}"#, "m").unwrap_err();
        assert!(matches!(err, LlmError::ResponseParseFailed { .. }));
    }

    #[test]
    fn url_accepts_full_endpoint() {
        let backend = OpenAiCompatibleBackend::new(LlmBackendConfig::openai_compatible(
            "http://localhost:8080/v1/chat/completions/",
            "local",
        ))
        .expect("backend");
        assert_eq!(
            backend.chat_completions_url(),
            "http://localhost:8080/v1/chat/completions"
        );

        let groq = OpenAiCompatibleBackend::new(LlmBackendConfig::default()).expect("backend");
        assert_eq!(
            groq.chat_completions_url(),
            "https://api.groq.com/openai/v1/chat/completions"
        );
    }

    #[test]
    fn blank_base_url_rejected() {
        let result = OpenAiCompatibleBackend::new(LlmBackendConfig::openai_compatible(" ", "m"));
        assert!(result.is_err());
    }
}
