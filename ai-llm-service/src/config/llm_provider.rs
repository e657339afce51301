use std::str::FromStr;

use crate::error_handler::ConfigError;

/// Represents the chat backend used for inference.
///
/// Both local servers (LocalAI, llama.cpp, vLLM) and hosted APIs speak the
/// OpenAI-compatible protocol, so [`LlmProvider::OpenAI`] covers all of them.
/// [`LlmProvider::Ollama`] uses Ollama's native `/api/chat` endpoint.
///
/// # Examples
///
/// ```
/// use ai_llm_service::config::llm_provider::LlmProvider;
///
/// let kind: LlmProvider = "ollama".parse().unwrap();
/// assert_eq!(kind, LlmProvider::Ollama);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LlmProvider {
    /// Native Ollama runtime (`POST /api/chat`).
    Ollama,
    /// OpenAI-compatible chat completions (`POST /chat/completions`).
    OpenAI,
}

impl FromStr for LlmProvider {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ollama" => Ok(LlmProvider::Ollama),
            "openai" | "openai-compatible" | "localai" | "chatgpt" => Ok(LlmProvider::OpenAI),
            other => Err(ConfigError::UnsupportedProvider(other.to_string())),
        }
    }
}
