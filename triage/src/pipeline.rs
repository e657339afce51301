//! One triage pass: prompt → chat call → parse → map.

use std::time::Instant;

use ai_llm_service::{ChatProvider, TokenUsage};
use serde::Serialize;
use tracing::{debug, instrument, warn};

use crate::{
    mapper::TriageOutcome,
    parser::{PARSE_FAILED_MARKER, parse_model_json},
    prompt::build_messages,
};

/// Version tag of [`crate::prompt::SYSTEM_PROMPT`]; one run per dump and version.
pub const PROMPT_VERSION: &str = "v1";

/// Sampling temperature recorded on every run.
pub const TRIAGE_TEMPERATURE: f32 = 0.2;

/// Why a pass produced a fallback outcome instead of a mapped one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum TriageFailure {
    /// Request never produced a reply.
    Transport(String),
    /// Reply arrived but was not a usable JSON object.
    Parse(String),
}

impl TriageFailure {
    /// Short text persisted as the run's `error_detail`.
    pub fn marker(&self) -> &str {
        match self {
            TriageFailure::Transport(e) => e,
            TriageFailure::Parse(_) => PARSE_FAILED_MARKER,
        }
    }
}

/// Everything a store needs to persist one run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TriageResult {
    pub outcome: TriageOutcome,
    pub model_name: String,
    pub prompt_version: &'static str,
    pub temperature: f32,
    /// Unset when the request failed in transport.
    pub latency_ms: Option<u64>,
    #[serde(skip)]
    pub raw_content: String,
    #[serde(skip)]
    pub usage: TokenUsage,
    pub failure: Option<TriageFailure>,
}

impl TriageResult {
    fn new(provider: &dyn ChatProvider, outcome: TriageOutcome) -> Self {
        Self {
            outcome,
            model_name: provider.model().to_string(),
            prompt_version: PROMPT_VERSION,
            temperature: TRIAGE_TEMPERATURE,
            latency_ms: None,
            raw_content: String::new(),
            usage: TokenUsage::default(),
            failure: None,
        }
    }

    pub fn is_failure(&self) -> bool {
        self.failure.is_some()
    }
}

/// Runs a single triage pass against `provider`.
///
/// Never fails: transport and content errors are folded into the returned
/// [`TriageResult`] (see [`TriageResult::failure`]).
#[instrument(
    name = "triage.run",
    skip_all,
    fields(model = %provider.model(), provider = ?provider.kind(), dump_chars = dump_text.len())
)]
pub async fn run_triage(
    provider: &dyn ChatProvider,
    dump_text: &str,
    energy_label: &str,
) -> TriageResult {
    let messages = build_messages(dump_text, energy_label);

    let started = Instant::now();
    let completion = match provider.complete(&messages).await {
        Ok(c) => c,
        Err(e) => {
            warn!(error = %e, timeout = e.is_timeout(), "triage request failed");
            let mut result = TriageResult::new(provider, TriageOutcome::transport_failure(&e));
            result.failure = Some(TriageFailure::Transport(e.to_string()));
            return result;
        }
    };
    let latency_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);

    let raw = completion.content.trim().to_string();
    let (outcome, failure) = match parse_model_json(&raw) {
        Ok(map) => (TriageOutcome::from_value(&map), None),
        Err(e) => {
            warn!(latency_ms, raw_chars = raw.len(), reason = %e.reason, "model reply was not usable JSON");
            (
                TriageOutcome::parse_failure(&raw),
                Some(TriageFailure::Parse(e.reason)),
            )
        }
    };

    debug!(
        latency_ms,
        tasks = outcome.tasks.len(),
        top3 = outcome.top_3_indices.len(),
        blockers = outcome.blockers.len(),
        "triage pass finished"
    );

    TriageResult {
        latency_ms: Some(latency_ms),
        raw_content: raw,
        usage: completion.usage,
        failure,
        ..TriageResult::new(provider, outcome)
    }
}
