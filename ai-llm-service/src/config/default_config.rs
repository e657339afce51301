//! Chat model config loaded from environment variables.
//!
//! # Environment variables
//!
//! - `LLM_KIND`          = `openai` (default, any OpenAI-compatible server) or `ollama`
//! - `LLM_BASE_URL`      = base URL; defaults to `http://localhost:8080/v1` (openai)
//!                         or `http://localhost:11434` (ollama). `OLLAMA_URL` is
//!                         accepted as a fallback for Ollama.
//! - `LLM_MODEL`         = model name (default `qwen3`)
//! - `LLM_API_KEY`       = optional API key
//! - `LLM_TIMEOUT_SECS`  = request timeout in seconds (default 120)
//! - `LLM_MAX_TOKENS`    = optional generation cap

use crate::{
    config::{llm_model_config::LlmModelConfig, llm_provider::LlmProvider},
    error_handler::{AiLlmError, ConfigError, validate_http_endpoint},
};

const DEFAULT_OPENAI_URL: &str = "http://localhost:8080/v1";
const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";
const DEFAULT_MODEL: &str = "qwen3";

/// Loads the chat config from the process environment.
///
/// # Errors
/// See [`config_from_lookup`].
pub fn config_from_env() -> Result<LlmModelConfig, AiLlmError> {
    config_from_lookup(|name| std::env::var(name).ok())
}

/// Loads the chat config through an arbitrary variable lookup.
///
/// Blank values count as unset.
///
/// # Errors
/// - [`ConfigError::UnsupportedProvider`] for an unknown `LLM_KIND`
/// - [`ConfigError::InvalidFormat`] if the base URL has no http(s) scheme
/// - [`ConfigError::InvalidNumber`] for non-numeric timeout/max tokens
pub fn config_from_lookup<F>(lookup: F) -> Result<LlmModelConfig, AiLlmError>
where
    F: Fn(&str) -> Option<String>,
{
    let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

    let provider = match get("LLM_KIND") {
        Some(kind) => kind.parse::<LlmProvider>()?,
        None => LlmProvider::OpenAI,
    };

    let endpoint = match provider {
        LlmProvider::OpenAI => get("LLM_BASE_URL").unwrap_or_else(|| DEFAULT_OPENAI_URL.into()),
        LlmProvider::Ollama => get("LLM_BASE_URL")
            .or_else(|| get("OLLAMA_URL"))
            .unwrap_or_else(|| DEFAULT_OLLAMA_URL.into()),
    };
    validate_http_endpoint("LLM_BASE_URL", &endpoint)?;

    let model = get("LLM_MODEL")
        .map(|m| m.trim().to_string())
        .unwrap_or_else(|| DEFAULT_MODEL.into());

    let mut cfg = LlmModelConfig::new(provider, model, endpoint.trim());
    cfg.api_key = get("LLM_API_KEY");
    if let Some(raw) = get("LLM_TIMEOUT_SECS") {
        let secs = raw
            .trim()
            .parse::<u64>()
            .ok()
            .filter(|s| *s > 0)
            .ok_or(ConfigError::InvalidNumber {
                var: "LLM_TIMEOUT_SECS",
                reason: "expected a positive number of seconds",
            })?;
        cfg.timeout_secs = Some(secs);
    }
    if let Some(raw) = get("LLM_MAX_TOKENS") {
        let max = raw
            .trim()
            .parse::<u32>()
            .map_err(|_| ConfigError::InvalidNumber {
                var: "LLM_MAX_TOKENS",
                reason: "expected u32",
            })?;
        cfg.max_tokens = Some(max);
    }

    Ok(cfg)
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn defaults_to_local_openai_compatible_server() {
        let cfg = config_from_lookup(lookup(&[])).unwrap();
        assert_eq!(cfg.provider, LlmProvider::OpenAI);
        assert_eq!(cfg.endpoint, "http://localhost:8080/v1");
        assert_eq!(cfg.model, "qwen3");
        assert_eq!(cfg.timeout_secs, Some(120));
        assert_eq!(cfg.temperature, Some(0.2));
        assert!(cfg.api_key.is_none());
    }

    #[test]
    fn ollama_falls_back_to_ollama_url() {
        let cfg = config_from_lookup(lookup(&[
            ("LLM_KIND", "ollama"),
            ("OLLAMA_URL", "http://gpu-box:11434"),
            ("LLM_MODEL", "llama3.1:8b"),
            ("LLM_TIMEOUT_SECS", "300"),
            ("LLM_API_KEY", "  "),
        ]))
        .unwrap();
        assert_eq!(cfg.provider, LlmProvider::Ollama);
        assert_eq!(cfg.endpoint, "http://gpu-box:11434");
        assert_eq!(cfg.model, "llama3.1:8b");
        assert_eq!(cfg.timeout_secs, Some(300));
        assert!(cfg.api_key.is_none());
    }

    #[test]
    fn rejects_bad_values() {
        assert!(config_from_lookup(lookup(&[("LLM_KIND", "bard")])).is_err());
        assert!(config_from_lookup(lookup(&[("LLM_BASE_URL", "localhost:8080")])).is_err());
        assert!(config_from_lookup(lookup(&[("LLM_TIMEOUT_SECS", "soon")])).is_err());
        assert!(config_from_lookup(lookup(&[("LLM_TIMEOUT_SECS", "0")])).is_err());
        assert!(config_from_lookup(lookup(&[("LLM_MAX_TOKENS", "-1")])).is_err());
    }
}
