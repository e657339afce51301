//! Chat completion client for OpenAI-compatible servers and Ollama.
//!
//! - [`provider::ChatProvider`] is the single capability call sites depend on.
//! - [`provider::build_provider`] selects the backend from configuration.
//! - [`config::default_config`] loads the config from `LLM_*` variables.
//! - [`telemetry`] installs the `tracing` subscriber used by the binary.

pub mod config;
pub mod error_handler;
pub mod provider;
pub mod services;
pub mod telemetry;

pub use config::default_config::{config_from_env, config_from_lookup};
pub use config::llm_model_config::LlmModelConfig;
pub use config::llm_provider::LlmProvider;
pub use error_handler::{AiLlmError, ConfigError};
pub use provider::{
    BoxFuture, ChatCompletion, ChatMessage, ChatProvider, ChatRole, TokenUsage, build_provider,
};
