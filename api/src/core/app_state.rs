use std::{fmt, str::FromStr, sync::Arc};

use ai_llm_service::ChatProvider;
use triage_store::Store;

use crate::{error_handler::AppError, triage_service::TriageService};

pub const DEFAULT_API_ADDRESS: &str = "127.0.0.1:8000";
pub const DEFAULT_DATABASE_PATH: &str = "quick_catch.db";

/// When the model call happens relative to the submit request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TriageMode {
    /// The request waits for the model and returns the finished run.
    #[default]
    Sync,
    /// The request returns a placeholder run; a background task completes it.
    Deferred,
}

impl FromStr for TriageMode {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "sync" => Ok(TriageMode::Sync),
            "deferred" | "background" => Ok(TriageMode::Deferred),
            other => Err(AppError::InvalidEnv {
                var: "TRIAGE_MODE",
                reason: format!("unknown mode `{other}` (expected sync or deferred)"),
            }),
        }
    }
}

impl fmt::Display for TriageMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            TriageMode::Sync => "sync",
            TriageMode::Deferred => "deferred",
        })
    }
}

/// Server settings outside the LLM block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub api_address: String,
    pub database_path: String,
    pub triage_mode: TriageMode,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, AppError> {
        Self::from_lookup(|k| std::env::var(k).ok())
    }

    /// Reads `API_ADDRESS`, `DATABASE_PATH` and `TRIAGE_MODE` through `get`.
    pub fn from_lookup<F>(get: F) -> Result<Self, AppError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_blank = |k: &str| get(k).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        Ok(Self {
            api_address: non_blank("API_ADDRESS").unwrap_or_else(|| DEFAULT_API_ADDRESS.into()),
            database_path: non_blank("DATABASE_PATH")
                .unwrap_or_else(|| DEFAULT_DATABASE_PATH.into()),
            triage_mode: non_blank("TRIAGE_MODE")
                .map(|v| v.parse())
                .transpose()?
                .unwrap_or_default(),
        })
    }
}

/// Shared state for all HTTP handlers.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<Store>,
    pub triage: TriageService,
}

impl AppState {
    pub fn new(store: Arc<Store>, provider: Arc<dyn ChatProvider>, mode: TriageMode) -> Self {
        Self {
            triage: TriageService::new(store.clone(), provider, mode),
            store,
        }
    }
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
        move |k| map.get(k).cloned()
    }

    #[test]
    fn defaults_apply_when_unset() {
        let cfg = AppConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(cfg.api_address, DEFAULT_API_ADDRESS);
        assert_eq!(cfg.database_path, DEFAULT_DATABASE_PATH);
        assert_eq!(cfg.triage_mode, TriageMode::Sync);
    }

    #[test]
    fn reads_overrides_and_rejects_unknown_mode() {
        let cfg = AppConfig::from_lookup(lookup(&[
            ("API_ADDRESS", "0.0.0.0:9000"),
            ("DATABASE_PATH", " /tmp/qc.db "),
            ("TRIAGE_MODE", "Deferred"),
        ]))
        .unwrap();
        assert_eq!(cfg.api_address, "0.0.0.0:9000");
        assert_eq!(cfg.database_path, "/tmp/qc.db");
        assert_eq!(cfg.triage_mode, TriageMode::Deferred);

        assert!(AppConfig::from_lookup(lookup(&[("TRIAGE_MODE", "later")])).is_err());
    }
}
