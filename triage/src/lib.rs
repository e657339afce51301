//! Brain-dump triage: turn one unstructured dump into tasks, a top 3,
//! blockers and a short action plan using a single chat completion.
//!
//! Flow: [`prompt`] → [`ai_llm_service::ChatProvider`] → [`parser`] → [`mapper`],
//! wired together by [`pipeline::run_triage`].

pub mod energy;
pub mod errors;
pub mod mapper;
pub mod parser;
pub mod pipeline;
pub mod prompt;

pub use energy::{EnergyLevel, InvalidEnergyLevel};
pub use errors::{TriageError, validate_dump_text};
pub use mapper::{EvidenceSpan, ExtractedTask, TriageOutcome};
pub use parser::{ParseFailure, parse_model_json};
pub use pipeline::{PROMPT_VERSION, TRIAGE_TEMPERATURE, TriageFailure, TriageResult, run_triage};
