use serde::{Deserialize, Serialize};
use triage_store::{BrainDump, Source};

use crate::triage_service::DumpView;

/// Body of `POST /dumps`.
#[derive(Debug, Deserialize)]
pub struct SubmitDumpRequest {
    pub input_text: String,
    /// `low | medium | high`; the profile default when omitted.
    #[serde(default)]
    pub energy_level: Option<String>,
    #[serde(default)]
    pub source: Option<Source>,
}

/// Query of `GET /dumps`.
#[derive(Debug, Deserialize)]
pub struct ListDumpsQuery {
    pub limit: Option<usize>,
}

/// Response of `POST /dumps/{id}/retriage`.
#[derive(Debug, Serialize)]
pub struct RetriageResponse {
    /// True when the existing run was returned without calling the model.
    pub reused: bool,
    #[serde(flatten)]
    pub view: DumpView,
}

/// One row of the history list.
#[derive(Debug, Serialize)]
pub struct DumpListItem {
    #[serde(flatten)]
    pub dump: BrainDump,
    /// First line of the dump, shortened for list display.
    pub preview: String,
}

const PREVIEW_CHARS: usize = 80;

impl From<BrainDump> for DumpListItem {
    fn from(dump: BrainDump) -> Self {
        let first_line = dump.input_text.lines().next().unwrap_or_default().trim();
        let preview = match first_line.char_indices().nth(PREVIEW_CHARS) {
            Some((idx, _)) => format!("{}…", &first_line[..idx]),
            None => first_line.to_string(),
        };
        Self { dump, preview }
    }
}
