//! Provider-agnostic chat completion capability.
//!
//! Call sites hold an `Arc<dyn ChatProvider>` and never branch on the backend;
//! [`build_provider`] picks the concrete service from [`LlmModelConfig::provider`].

use std::{future::Future, pin::Pin, sync::Arc};

use serde::Serialize;

use crate::{
    config::{llm_model_config::LlmModelConfig, llm_provider::LlmProvider},
    error_handler::AiLlmError,
    services::{ollama_service::OllamaService, open_ai_service::OpenAiService},
};

/// Boxed future returned by [`ChatProvider::complete`].
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Author of a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    System,
    User,
    Assistant,
}

/// One chat message as sent on the wire by both providers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }
}

/// Token accounting reported by the provider, when available.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TokenUsage {
    pub prompt_tokens: Option<u32>,
    pub completion_tokens: Option<u32>,
}

/// Assistant reply of a single non-streaming chat call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChatCompletion {
    /// Raw assistant text (may be empty).
    pub content: String,
    pub usage: TokenUsage,
}

/// A backend able to answer one chat request.
///
/// Implementations perform exactly one HTTP request per call: no retries,
/// no streaming.
pub trait ChatProvider: Send + Sync {
    /// Backend kind, for logs.
    fn kind(&self) -> LlmProvider;

    /// Model identifier sent with each request.
    fn model(&self) -> &str;

    /// Sends `messages` and returns the assistant reply.
    fn complete<'a>(
        &'a self,
        messages: &'a [ChatMessage],
    ) -> BoxFuture<'a, Result<ChatCompletion, AiLlmError>>;
}

/// Builds the provider selected by `cfg.provider`.
///
/// # Errors
/// Propagates constructor validation errors of the concrete service.
pub fn build_provider(cfg: LlmModelConfig) -> Result<Arc<dyn ChatProvider>, AiLlmError> {
    Ok(match cfg.provider {
        LlmProvider::OpenAI => Arc::new(OpenAiService::new(cfg)?),
        LlmProvider::Ollama => Arc::new(OllamaService::new(cfg)?),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roles_serialize_lowercase() {
        let msg = ChatMessage::system("be calm");
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json, serde_json::json!({"role": "system", "content": "be calm"}));
    }

    #[test]
    fn builds_provider_from_config() {
        let cfg = LlmModelConfig::new(LlmProvider::Ollama, "qwen3", "http://localhost:11434");
        let provider = build_provider(cfg).unwrap();
        assert_eq!(provider.kind(), LlmProvider::Ollama);
        assert_eq!(provider.model(), "qwen3");

        let cfg = LlmModelConfig::new(LlmProvider::OpenAI, "qwen3", "ftp://nope");
        assert!(build_provider(cfg).is_err());
    }
}
