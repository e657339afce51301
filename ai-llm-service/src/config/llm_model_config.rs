use std::time::Duration;

use crate::config::llm_provider::LlmProvider;

/// Sampling temperature used for every triage request.
pub const DEFAULT_TEMPERATURE: f32 = 0.2;

/// Default request timeout. Local inference can be slow, so this is generous.
pub const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// Configuration for one chat model invocation.
///
/// # Fields
///
/// - `provider`: Which backend to call (OpenAI-compatible or Ollama).
/// - `model`: The model identifier (e.g., `"qwen3"`, `"llama3.1:8b"`).
/// - `endpoint`: Base URL. For OpenAI-compatible servers it already includes
///   the version segment (`http://localhost:8080/v1`); for Ollama it is the
///   server root (`http://localhost:11434`).
/// - `api_key`: Optional key sent as `Authorization: Bearer <key>`.
/// - `max_tokens`: Optional generation cap (if supported).
/// - `temperature`: Sampling temperature.
/// - `timeout_secs`: Request timeout in seconds.
///
/// # Examples
///
/// ```
/// use ai_llm_service::config::llm_model_config::LlmModelConfig;
/// use ai_llm_service::config::llm_provider::LlmProvider;
///
/// let cfg = LlmModelConfig::new(LlmProvider::Ollama, "qwen3", "http://localhost:11434");
/// assert_eq!(cfg.timeout().as_secs(), 120);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct LlmModelConfig {
    /// The LLM provider/backend.
    pub provider: LlmProvider,

    /// Model identifier string.
    pub model: String,

    /// Base URL of the chat server.
    pub endpoint: String,

    /// Optional API key for authentication.
    pub api_key: Option<String>,

    /// Maximum number of tokens to generate.
    pub max_tokens: Option<u32>,

    /// Sampling temperature.
    pub temperature: Option<f32>,

    /// Optional request timeout (in seconds).
    pub timeout_secs: Option<u64>,
}

impl LlmModelConfig {
    /// Builds a config with the triage defaults (`temperature = 0.2`, 120s timeout).
    pub fn new(provider: LlmProvider, model: impl Into<String>, endpoint: impl Into<String>) -> Self {
        Self {
            provider,
            model: model.into(),
            endpoint: endpoint.into(),
            api_key: None,
            max_tokens: None,
            temperature: Some(DEFAULT_TEMPERATURE),
            timeout_secs: Some(DEFAULT_TIMEOUT_SECS),
        }
    }

    /// Effective request timeout.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS))
    }

    /// API key with surrounding whitespace removed, `None` when blank.
    pub fn api_key(&self) -> Option<&str> {
        self.api_key
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty())
    }

    /// Endpoint without trailing slashes.
    pub fn base_url(&self) -> &str {
        self.endpoint.trim().trim_end_matches('/')
    }
}
